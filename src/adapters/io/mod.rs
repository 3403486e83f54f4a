pub mod tokio_stream;
