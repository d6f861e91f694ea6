#![allow(dead_code)]

use futures::io::AsyncReadExt;
use futures::AsyncRead;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use ws_framing::message::WsMessageKind;
use ws_framing::reader::{MessagePayload, WsListener};

/// Listener recording everything the reader delivers.
#[derive(Default)]
pub struct RecordingListener {
    pub messages: Vec<(WsMessageKind, Vec<u8>)>,
    pub pings: Vec<Vec<u8>>,
    pub pongs: Vec<Vec<u8>>,
    pub closes: Vec<(u16, Vec<u8>)>,
    /// Read only this many payload bytes before closing the stream.
    pub read_limit: Option<usize>,
    /// Violate the close contract on purpose.
    pub skip_close: bool,
}

impl<T: AsyncRead + Unpin> WsListener<T> for RecordingListener {
    async fn on_message(
        &mut self,
        mut payload: MessagePayload<'_, T>,
        kind: WsMessageKind,
    ) -> io::Result<()> {
        let mut data = Vec::new();
        match self.read_limit {
            Some(limit) => {
                data.resize(limit, 0);
                let mut filled = 0;
                while filled < limit {
                    match payload.read(&mut data[filled..]).await? {
                        0 => break,
                        n => filled += n,
                    }
                }
                data.truncate(filled);
            }
            None => {
                payload.read_to_end(&mut data).await?;
            }
        }
        if !self.skip_close {
            payload.close().await?;
        }
        self.messages.push((kind, data));
        Ok(())
    }

    fn on_ping(&mut self, payload: &[u8]) {
        self.pings.push(payload.to_vec());
    }

    fn on_pong(&mut self, payload: &[u8]) {
        self.pongs.push(payload.to_vec());
    }

    fn on_close(&mut self, code: u16, reason: &[u8]) {
        self.closes.push((code, reason.to_vec()));
    }
}

/// Serves at most `chunk` bytes per read, so payload and header reads land
/// at arbitrary offsets within frames.
pub struct ChunkedTransport {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
}

impl ChunkedTransport {
    pub fn new(data: Vec<u8>, chunk: usize) -> Self {
        Self {
            data,
            pos: 0,
            chunk,
        }
    }
}

impl AsyncRead for ChunkedTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let n = buf.len().min(this.chunk).min(this.data.len() - this.pos);
        buf[..n].copy_from_slice(&this.data[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(n))
    }
}
