use crate::frame::{
    toggle_mask, FrameHead, FrameHeadParseError, ProtocolViolation, WsControlFrame,
    WsControlFrameKind, OPCODE_CLOSE, OPCODE_CONTINUATION, OPCODE_PING, OPCODE_PONG,
};
use crate::reader::{IllegalState, WsReadError};
use crate::WsRole;
use futures::AsyncRead;
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

// Stateful data about the frame currently being consumed.
#[derive(Debug)]
pub(crate) struct FrameState {
    pub opcode: u8,
    pub fin: bool,
    pub mask: Option<[u8; 4]>,
    pub remaining: u64,
    // Payload bytes consumed so far; its low two bits are the running mask
    // key offset across partial reads.
    pub consumed: u64,
}

#[derive(Copy, Clone, Debug)]
enum Phase {
    // Accumulating head bytes of the next frame.
    Head,
    // Draining a control frame payload into the inline buffer.
    Control {
        kind: WsControlFrameKind,
        filled: usize,
    },
    // Positioned in a data frame payload.
    Data,
}

pub(crate) struct ReaderInner<T> {
    pub transport: T,
    pub role: WsRole,
    pub closed: bool,
    pub message_closed: bool,
    pub frame: FrameState,
    // Control frames seen since the listener last had control. Delivered to
    // the listener hooks once `read_message` can touch it again.
    pub controls: VecDeque<WsControlFrame>,
    // Typed error recorded when a failure has to surface through the
    // `io::Error`-only payload stream.
    pub failure: Option<WsReadError>,
    phase: Phase,
    draining: bool,
    head_buf: [u8; 14],
    head_filled: usize,
    control_buf: [u8; 125],
    scratch: [u8; 2048],
}

impl<T: AsyncRead + Unpin> ReaderInner<T> {
    pub fn new(role: WsRole, transport: T) -> Self {
        Self {
            transport,
            role,
            closed: false,
            message_closed: true,
            frame: FrameState {
                opcode: OPCODE_CONTINUATION,
                fin: true,
                mask: None,
                remaining: 0,
                consumed: 0,
            },
            controls: VecDeque::new(),
            failure: None,
            phase: Phase::Head,
            draining: false,
            head_buf: [0u8; 14],
            head_filled: 0,
            control_buf: [0u8; 125],
            scratch: [0u8; 2048],
        }
    }

    // Parses frame heads until a data frame head has been consumed, draining
    // and queueing any control frames on the way. Leaves the reader
    // positioned at the start of the data frame's payload.
    pub fn poll_next_data_frame(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), WsReadError>> {
        if self.closed {
            return Poll::Ready(Err(IllegalState::Closed.into()));
        }
        if let Phase::Data = self.phase {
            debug_assert_eq!(self.frame.remaining, 0);
            self.phase = Phase::Head;
            self.head_filled = 0;
        }
        loop {
            match self.phase {
                Phase::Head => {
                    let min = match FrameHead::parse(&self.head_buf[..self.head_filled], self.role)
                    {
                        Ok(head) => {
                            self.head_filled = 0;
                            self.frame = FrameState {
                                opcode: head.opcode,
                                fin: head.fin,
                                mask: head.mask,
                                remaining: head.payload_len,
                                consumed: 0,
                            };
                            match head.is_control() {
                                true => {
                                    let kind = match head.opcode {
                                        OPCODE_CLOSE => WsControlFrameKind::Close,
                                        OPCODE_PING => WsControlFrameKind::Ping,
                                        OPCODE_PONG => WsControlFrameKind::Pong,
                                        opcode => {
                                            return Poll::Ready(Err(
                                                IllegalState::UnknownControlOpcode(opcode).into(),
                                            ))
                                        }
                                    };
                                    self.phase = Phase::Control { kind, filled: 0 };
                                }
                                false => {
                                    self.phase = Phase::Data;
                                    return Poll::Ready(Ok(()));
                                }
                            }
                            continue;
                        }
                        Err(FrameHeadParseError::Incomplete(min)) => min,
                        Err(FrameHeadParseError::Protocol(violation)) => {
                            return Poll::Ready(Err(violation.into()))
                        }
                    };
                    let filled = self.head_filled;
                    match Pin::new(&mut self.transport)
                        .poll_read(cx, &mut self.head_buf[filled..min])
                    {
                        Poll::Ready(Ok(0)) => {
                            return Poll::Ready(Err(io::Error::from(
                                io::ErrorKind::UnexpectedEof,
                            )
                            .into()))
                        }
                        Poll::Ready(Ok(n)) => self.head_filled += n,
                        Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
                        Poll::Pending => return Poll::Pending,
                    }
                }
                Phase::Control { kind, filled } => {
                    let len = self.frame.remaining as usize;
                    if filled < len {
                        match Pin::new(&mut self.transport)
                            .poll_read(cx, &mut self.control_buf[filled..len])
                        {
                            Poll::Ready(Ok(0)) => {
                                return Poll::Ready(Err(io::Error::from(
                                    io::ErrorKind::UnexpectedEof,
                                )
                                .into()))
                            }
                            Poll::Ready(Ok(n)) => {
                                self.phase = Phase::Control {
                                    kind,
                                    filled: filled + n,
                                }
                            }
                            Poll::Ready(Err(err)) => return Poll::Ready(Err(err.into())),
                            Poll::Pending => return Poll::Pending,
                        }
                        continue;
                    }
                    if let Some(mask) = self.frame.mask {
                        toggle_mask(mask, 0, &mut self.control_buf[..len]);
                    }
                    let control = WsControlFrame::new(kind, &self.control_buf[..len]);
                    log::trace!("queued {:?} control frame ({}B)", kind, control.payload().len());
                    self.controls.push_back(control);
                    self.frame.remaining = 0;
                    self.phase = Phase::Head;
                    self.head_filled = 0;
                }
                Phase::Data => unreachable!(),
            }
        }
    }

    // Serves the message payload pull stream: bytes of the current frame,
    // then across continuation frames until the final one is exhausted.
    pub fn poll_read_payload(
        &mut self,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        if self.closed {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "Closed")));
        }
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        loop {
            if self.frame.remaining == 0 {
                if self.frame.fin {
                    return Poll::Ready(Ok(0));
                }
                match self.poll_next_data_frame(cx) {
                    Poll::Ready(Ok(())) => {
                        if self.frame.opcode != OPCODE_CONTINUATION {
                            let opcode = self.frame.opcode;
                            return Poll::Ready(Err(self.fail(
                                ProtocolViolation::ExpectedContinuation(opcode).into(),
                            )));
                        }
                    }
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(self.fail(err))),
                    Poll::Pending => return Poll::Pending,
                }
                continue;
            }
            let min = match usize::try_from(self.frame.remaining) {
                Ok(remaining) => remaining.min(buf.len()),
                Err(_) => buf.len(),
            };
            return match Pin::new(&mut self.transport).poll_read(cx, &mut buf[..min]) {
                Poll::Ready(Ok(0)) => {
                    Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof)))
                }
                Poll::Ready(Ok(n)) => {
                    if let Some(mask) = self.frame.mask {
                        toggle_mask(mask, (self.frame.consumed & 3) as usize, &mut buf[..n]);
                    }
                    self.frame.consumed += n as u64;
                    self.frame.remaining -= n as u64;
                    Poll::Ready(Ok(n))
                }
                p => p,
            };
        }
    }

    // Closes the message payload stream: marks it closed, then skips the
    // rest of the current frame and every continuation through the final
    // one, still queueing control frames found between fragments.
    pub fn poll_close_message(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        if !self.draining {
            if self.message_closed {
                return Poll::Ready(Ok(()));
            }
            self.message_closed = true;
            if self.closed {
                return Poll::Ready(Ok(()));
            }
            self.draining = true;
        }
        loop {
            while self.frame.remaining > 0 {
                let min = self.frame.remaining.min(self.scratch.len() as u64) as usize;
                match Pin::new(&mut self.transport).poll_read(cx, &mut self.scratch[..min]) {
                    Poll::Ready(Ok(0)) => {
                        return Poll::Ready(Err(io::Error::from(io::ErrorKind::UnexpectedEof)))
                    }
                    Poll::Ready(Ok(n)) => {
                        self.frame.consumed += n as u64;
                        self.frame.remaining -= n as u64;
                    }
                    Poll::Ready(Err(err)) => return Poll::Ready(Err(err)),
                    Poll::Pending => return Poll::Pending,
                }
            }
            if self.frame.fin {
                self.draining = false;
                return Poll::Ready(Ok(()));
            }
            match self.poll_next_data_frame(cx) {
                Poll::Ready(Ok(())) => {}
                Poll::Ready(Err(err)) => return Poll::Ready(Err(self.fail(err))),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    // Records the typed error so `read_message` can surface it, and returns
    // an `io::Error` carrying the same message for the stream surface.
    fn fail(&mut self, err: WsReadError) -> io::Error {
        let io_err = io::Error::new(io::ErrorKind::InvalidData, err.to_string());
        self.failure = Some(err);
        io_err
    }
}
