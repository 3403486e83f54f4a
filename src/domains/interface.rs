use crate::domains::{IoError, query_io::QueryIO};
use bytes::BytesMut;

pub trait TRead {
    /// Appends whatever is available to `buf`. `Ok(0)` means the peer closed the stream.
    fn read_bytes(
        &mut self,
        buf: &mut BytesMut,
    ) -> impl std::future::Future<Output = Result<usize, IoError>> + Send;
}

pub trait TWrite {
    fn write_io(
        &mut self,
        io: QueryIO,
    ) -> impl std::future::Future<Output = Result<(), IoError>> + Send;
}
