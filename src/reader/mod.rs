mod inner;
mod payload;

pub use payload::*;

use crate::frame::{ProtocolViolation, WsControlFrameKind, OPCODE_BINARY, OPCODE_TEXT};
use crate::message::WsMessageKind;
use crate::WsRole;
use futures::future::poll_fn;
use futures::AsyncRead;
use inner::ReaderInner;
use std::io;

/// Session-layer hooks invoked by the reader. `on_message` receives the
/// message payload as a pull stream and must drain or close it before
/// returning.
#[allow(async_fn_in_trait)]
pub trait WsListener<T: AsyncRead + Unpin> {
    async fn on_message(
        &mut self,
        payload: MessagePayload<'_, T>,
        kind: WsMessageKind,
    ) -> io::Result<()>;
    fn on_ping(&mut self, _payload: &[u8]) {}
    fn on_pong(&mut self, _payload: &[u8]) {}
    fn on_close(&mut self, _code: u16, _reason: &[u8]) {}
}

pub struct WsFrameReader<T: AsyncRead + Unpin, L: WsListener<T>> {
    inner: ReaderInner<T>,
    listener: L,
}

impl<T: AsyncRead + Unpin, L: WsListener<T>> WsFrameReader<T, L> {
    pub fn new(role: WsRole, transport: T, listener: L) -> Self {
        Self {
            inner: ReaderInner::new(role, transport),
            listener,
        }
    }

    /// Reads one message from the transport, consuming any control frames
    /// that precede or are interleaved between its fragments. Results in
    /// exactly one `on_message` call on the listener.
    pub async fn read_message(&mut self) -> Result<(), WsReadError> {
        let result = poll_fn(|cx| self.inner.poll_next_data_frame(cx)).await;
        self.deliver_controls();
        result?;
        let kind = match self.inner.frame.opcode {
            OPCODE_TEXT => WsMessageKind::Text,
            OPCODE_BINARY => WsMessageKind::Binary,
            opcode => return Err(IllegalState::UnknownOpcode(opcode).into()),
        };
        self.inner.message_closed = false;
        let Self { inner, listener } = self;
        let result = listener.on_message(MessagePayload { inner }, kind).await;
        self.deliver_controls();
        if let Some(err) = self.inner.failure.take() {
            return Err(err);
        }
        result?;
        if !self.inner.message_closed {
            return Err(IllegalState::MessageNotClosed.into());
        }
        Ok(())
    }

    /// Marks the reader terminally closed. Subsequent reads fail with an
    /// illegal-state error.
    pub fn close(&mut self) {
        self.inner.closed = true;
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_inner(self) -> (T, L) {
        (self.inner.transport, self.listener)
    }

    fn deliver_controls(&mut self) {
        while let Some(control) = self.inner.controls.pop_front() {
            let data = control.payload();
            match control.kind() {
                WsControlFrameKind::Ping => self.listener.on_ping(data),
                WsControlFrameKind::Pong => self.listener.on_pong(data),
                WsControlFrameKind::Close => match data.len() < 2 {
                    true => self.listener.on_close(0, &[]),
                    false => self
                        .listener
                        .on_close(u16::from_be_bytes([data[0], data[1]]), &data[2..]),
                },
            }
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WsReadError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolViolation),
    #[error("{0}")]
    IllegalState(#[from] IllegalState),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalState {
    #[error("Closed")]
    Closed,
    #[error("Unknown opcode: {0:x}")]
    UnknownOpcode(u8),
    #[error("Unknown control opcode: {0:x}")]
    UnknownControlOpcode(u8),
    #[error("Listener failed to call close on message payload.")]
    MessageNotClosed,
}
