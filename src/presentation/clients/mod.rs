pub mod controller;
pub mod request;
pub mod stream;
pub(crate) use controller::ClientController;
pub(crate) use stream::ClientStream;
