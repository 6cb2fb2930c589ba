//! Triprotocol Fabric - codecs, transport and session driver
//!
//! Provides the three wire codecs (pipe-delimited text, JSON, length-prefixed
//! protobuf), a TCP request-reply transport that reads until each codec's
//! framing is satisfied, and [`AppLayerClient`], which sequences
//! Auth -> Operation -> Logout on top of them.
//!
//! # Example
//!
//! ```no_run
//! use triprotocol_core::operation::{EchoRequest, EchoResponse};
//! use triprotocol_fabric::{codec::Protocol, AppLayerClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AppLayerClient::tcp(Protocol::Json.codec());
//!
//! // Full session in one call
//! let echo: EchoResponse = client
//!     .session("127.0.0.1:8081", "538349", &EchoRequest::new("ola mundo"))
//!     .await?;
//! println!("{}", echo.echo_message);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod request;
pub mod transport;

// Re-exports for convenience
pub use client::AppLayerClient;
pub use codec::{AnyCodec, Codec, FrameScanner, Framing, Protocol};
pub use error::{Error, Result};
pub use transport::{TcpTransport, Transport};
