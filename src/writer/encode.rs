use crate::frame::{toggle_mask, FrameHead, WsOpcode};
use futures::io::AsyncWriteExt;
use futures::AsyncWrite;
use rand::prelude::*;
use std::io;

#[derive(Debug)]
pub(crate) struct FrameSink<T> {
    pub sink: T,
    scratch: [u8; 2048],
}

impl<T: AsyncWrite + Unpin> FrameSink<T> {
    pub fn new(sink: T) -> Self {
        Self {
            sink,
            scratch: [0u8; 2048],
        }
    }

    // Emits one complete frame. The caller must hold the sink lock for the
    // whole call so frame bytes stay contiguous on the wire.
    pub async fn write_frame(
        &mut self,
        opcode: WsOpcode,
        fin: bool,
        mask: bool,
        payload: &[u8],
    ) -> io::Result<()> {
        let head = FrameHead {
            fin,
            opcode: opcode.bits(),
            mask: match mask {
                true => Some(thread_rng().next_u32().to_ne_bytes()),
                false => None,
            },
            payload_len: payload.len() as u64,
        };
        let mut head_buf = [0u8; 14];
        head.encode(&mut head_buf);
        self.sink.write_all(&head_buf[..head.len_bytes()]).await?;
        match head.mask {
            Some(key) => {
                let mut offset = 0usize;
                for chunk in payload.chunks(self.scratch.len()) {
                    let scratch = &mut self.scratch[..chunk.len()];
                    scratch.copy_from_slice(chunk);
                    toggle_mask(key, offset, scratch);
                    self.sink.write_all(scratch).await?;
                    offset += chunk.len();
                }
            }
            None => self.sink.write_all(payload).await?,
        }
        Ok(())
    }
}
