pub mod client;
pub mod connection;
pub mod error;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::ApiClient;
pub use connection::{
    ByteStream, DisconnectHandle, HttpStreamOpener, StreamConnection, StreamOpener,
};
pub use error::{ApiError, StreamError};
pub use stream::NdjsonParser;
