mod encode;
mod message;

pub use message::*;

use crate::frame::{WsOpcode, MAX_CONTROL_PAYLOAD};
use crate::message::WsMessageKind;
use crate::WsRole;
use encode::FrameSink;
use futures::io::AsyncWriteExt;
use futures::lock::Mutex;
use futures::AsyncWrite;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub(crate) struct WriterShared<T> {
    pub mask: bool,
    pub sink: Mutex<FrameSink<T>>,
    pub closed: AtomicBool,
    pub active_writer: AtomicBool,
}

pub struct WsFrameWriter<T: AsyncWrite + Unpin> {
    shared: Arc<WriterShared<T>>,
}

impl<T: AsyncWrite + Unpin> WsFrameWriter<T> {
    pub fn new(role: WsRole, sink: T) -> Self {
        Self {
            shared: Arc::new(WriterShared {
                mask: role.is_client(),
                sink: Mutex::new(FrameSink::new(sink)),
                closed: AtomicBool::new(false),
                active_writer: AtomicBool::new(false),
            }),
        }
    }

    pub async fn write_ping(&self, payload: &[u8]) -> Result<(), WsWriteError> {
        self.write_control(WsOpcode::Ping, payload).await
    }

    pub async fn write_pong(&self, payload: &[u8]) -> Result<(), WsWriteError> {
        self.write_control(WsOpcode::Pong, payload).await
    }

    /// Emits a close frame, closes the sink and poisons the writer. The
    /// payload is empty for `code` 0, otherwise the big-endian code followed
    /// by the UTF-8 `reason`; a `reason` without a code is rejected.
    pub async fn write_close(&self, code: u16, reason: Option<&str>) -> Result<(), WsWriteError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(IllegalState::Closed.into());
        }
        let mut payload = Vec::new();
        match (code, reason) {
            (0, None) => {}
            (0, Some(_)) => return Err(IllegalArgument::ReasonWithoutCode.into()),
            (code, reason) => {
                payload.extend_from_slice(&code.to_be_bytes());
                if let Some(reason) = reason {
                    payload.extend_from_slice(reason.as_bytes());
                }
            }
        }
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(IllegalArgument::OversizedControlPayload.into());
        }
        let mut sink = self.shared.sink.lock().await;
        log::debug!("sending close frame, code: {}", code);
        sink.write_frame(WsOpcode::Close, true, self.shared.mask, &payload)
            .await?;
        sink.sink.close().await?;
        self.shared.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Emits one single-frame message with the FIN bit set.
    pub async fn send_message(
        &self,
        payload: &[u8],
        kind: WsMessageKind,
    ) -> Result<(), WsWriteError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(IllegalState::Closed.into());
        }
        if self.shared.active_writer.load(Ordering::SeqCst) {
            return Err(IllegalState::SendWhileWriterActive.into());
        }
        let mut sink = self.shared.sink.lock().await;
        sink.write_frame(kind.opcode(), true, self.shared.mask, payload)
            .await?;
        Ok(())
    }

    /// Starts a streamed message. One non-final fragment is emitted per
    /// `write` call on the returned writer; its `close` terminates the
    /// message and releases the slot.
    pub fn message_writer(&self, kind: WsMessageKind) -> Result<WsMessageWriter<T>, WsWriteError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(IllegalState::Closed.into());
        }
        if self.shared.active_writer.swap(true, Ordering::SeqCst) {
            return Err(IllegalState::WriterActive.into());
        }
        Ok(WsMessageWriter::new(kind, self.shared.clone()))
    }

    /// Recovers the sink. Returns `None` while a message writer still holds
    /// a reference.
    pub fn into_inner(self) -> Option<T> {
        Arc::try_unwrap(self.shared)
            .ok()
            .map(|shared| shared.sink.into_inner().sink)
    }

    async fn write_control(&self, opcode: WsOpcode, payload: &[u8]) -> Result<(), WsWriteError> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(IllegalState::Closed.into());
        }
        if payload.len() > MAX_CONTROL_PAYLOAD {
            return Err(IllegalArgument::OversizedControlPayload.into());
        }
        let mut sink = self.shared.sink.lock().await;
        sink.write_frame(opcode, true, self.shared.mask, payload)
            .await?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum WsWriteError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    IllegalState(#[from] IllegalState),
    #[error("{0}")]
    IllegalArgument(#[from] IllegalArgument),
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalState {
    #[error("Closed")]
    Closed,
    #[error("Another message writer is active. Did you call close()?")]
    WriterActive,
    #[error("A message writer is active. Did you call close()?")]
    SendWhileWriterActive,
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalArgument {
    #[error("Control frame payload must be less than 125B.")]
    OversizedControlPayload,
    #[error("Code required to include reason.")]
    ReasonWithoutCode,
}
