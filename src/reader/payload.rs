use crate::reader::inner::ReaderInner;
use futures::future::poll_fn;
use futures::AsyncRead;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Pull stream for one message payload. Reads span continuation fragments
/// and skip interleaved control frames; the stream must be closed before
/// the listener returns from `on_message`.
pub struct MessagePayload<'a, T: AsyncRead + Unpin> {
    pub(crate) inner: &'a mut ReaderInner<T>,
}

impl<T: AsyncRead + Unpin> MessagePayload<'_, T> {
    /// Skips whatever remains of the message, through the frame carrying the
    /// FIN bit. Closing an already-closed stream is a no-op.
    pub async fn close(&mut self) -> io::Result<()> {
        poll_fn(|cx| self.inner.poll_close_message(cx)).await
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for MessagePayload<'_, T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut [u8],
    ) -> Poll<io::Result<usize>> {
        self.get_mut().inner.poll_read_payload(cx, buf)
    }
}
