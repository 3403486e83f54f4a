use crate::domains::IoError;
use crate::domains::interface::{TRead, TWrite};
use crate::domains::query_io::QueryIO;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

impl<T: AsyncReadExt + std::marker::Unpin + Send> TRead for T {
    // TCP doesn't delimit messages, a frame may arrive split over several reads.
    // Callers keep the buffer between calls and decode once enough has arrived.
    async fn read_bytes(&mut self, buf: &mut BytesMut) -> Result<usize, IoError> {
        self.read_buf(buf).await.map_err(IoError::from)
    }
}

impl<T: AsyncWriteExt + std::marker::Unpin + Send> TWrite for T {
    async fn write_io(&mut self, io: QueryIO) -> Result<(), IoError> {
        self.write_all(&io.serialize()).await.map_err(IoError::from)?;
        self.flush().await.map_err(IoError::from)
    }
}
