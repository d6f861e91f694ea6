use crate::frame::WsOpcode;
use crate::message::WsMessageKind;
use crate::writer::{IllegalState, WriterShared, WsWriteError};
use futures::io::AsyncWriteExt;
use futures::AsyncWrite;
use std::mem::replace;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Streamed-message handle. Each `write` emits one non-final fragment; the
/// first fragment carries the message opcode, later ones the continuation
/// opcode. `close` emits the empty final fragment and releases the writer.
#[derive(Debug)]
pub struct WsMessageWriter<T: AsyncWrite + Unpin> {
    kind: WsMessageKind,
    shared: Option<Arc<WriterShared<T>>>,
    first_frame: bool,
}

impl<T: AsyncWrite + Unpin> WsMessageWriter<T> {
    pub(crate) fn new(kind: WsMessageKind, shared: Arc<WriterShared<T>>) -> Self {
        Self {
            kind,
            shared: Some(shared),
            first_frame: true,
        }
    }

    pub fn kind(&self) -> WsMessageKind {
        self.kind
    }

    /// Emits one non-final fragment carrying `payload`.
    pub async fn write(&mut self, payload: &[u8]) -> Result<(), WsWriteError> {
        let shared = self.shared()?.clone();
        let opcode = self.next_opcode();
        let mut sink = shared.sink.lock().await;
        sink.write_frame(opcode, false, shared.mask, payload).await?;
        Ok(())
    }

    /// Flushes the underlying sink.
    pub async fn flush(&mut self) -> Result<(), WsWriteError> {
        let shared = self.shared()?.clone();
        let mut sink = shared.sink.lock().await;
        sink.sink.flush().await?;
        Ok(())
    }

    /// Emits the zero-length final fragment, flushes, and releases the
    /// writer so a new message can start.
    pub async fn close(mut self) -> Result<(), WsWriteError> {
        {
            let shared = self.shared()?.clone();
            let mut sink = shared.sink.lock().await;
            sink.write_frame(WsOpcode::Continuation, true, shared.mask, &[])
                .await?;
            sink.sink.flush().await?;
        }
        self.release();
        Ok(())
    }

    fn shared(&self) -> Result<&Arc<WriterShared<T>>, WsWriteError> {
        match &self.shared {
            Some(shared) if !shared.closed.load(Ordering::SeqCst) => Ok(shared),
            _ => Err(IllegalState::Closed.into()),
        }
    }

    fn next_opcode(&mut self) -> WsOpcode {
        match replace(&mut self.first_frame, false) {
            true => self.kind.opcode(),
            false => WsOpcode::Continuation,
        }
    }

    fn release(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.active_writer.store(false, Ordering::SeqCst);
        }
    }
}

impl<T: AsyncWrite + Unpin> Drop for WsMessageWriter<T> {
    fn drop(&mut self) {
        self.release();
    }
}
