use crate::codec::Framing;
use crate::error::Result;

pub mod tcp;

pub use self::tcp::{TcpTransport, TcpTransportBuilder};

/// One request, one reply, over a fresh connection.
///
/// Implementations own the connection for the duration of the call and
/// release it on every exit path.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends `payload` to `address` (`host:port`) and reads until `framing`
    /// says the reply is complete.
    async fn request_reply(&self, address: &str, payload: &[u8], framing: Framing)
        -> Result<Vec<u8>>;
}
