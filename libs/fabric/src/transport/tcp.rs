use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::codec::{FrameScanner, Framing, MAX_FRAME_SIZE};
use crate::error::{Error, Result};
use crate::transport::Transport;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(10);

const READ_CHUNK: usize = 64 * 1024;

/// TCP request-reply transport
///
/// Every call dials, writes the whole request, then reads until the codec's
/// framing is satisfied. Each phase has its own deadline.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    connect_timeout: Duration,
    send_timeout: Duration,
    receive_timeout: Duration,
    max_response_size: usize,
    cancel: Option<CancellationToken>,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TcpTransport {
    /// Transport with the default 30s/10s/10s deadlines
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::new()
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    pub fn receive_timeout(&self) -> Duration {
        self.receive_timeout
    }

    async fn exchange(&self, address: &str, payload: &[u8], framing: Framing) -> Result<Vec<u8>> {
        debug!(address, "Connecting to TCP server");
        let mut stream = timeout(self.connect_timeout, TcpStream::connect(address))
            .await
            .map_err(|_| Error::Timeout("Connect"))?
            .map_err(|source| Error::Connect {
                address: address.to_string(),
                source,
            })?;

        let result = self.round_trip(&mut stream, address, payload, framing).await;
        // Best effort; the stream is dropped either way.
        let _ = stream.shutdown().await;
        result
    }

    async fn round_trip(
        &self,
        stream: &mut TcpStream,
        address: &str,
        payload: &[u8],
        framing: Framing,
    ) -> Result<Vec<u8>> {
        debug!(address, bytes = payload.len(), "Sending request to TCP server");
        let send_op = async {
            stream.write_all(payload).await?;
            stream.flush().await?;
            Ok::<(), Error>(())
        };
        timeout(self.send_timeout, send_op)
            .await
            .map_err(|_| Error::Timeout("Send"))??;

        let reply = timeout(
            self.receive_timeout,
            read_frame(stream, framing, self.max_response_size),
        )
        .await
        .map_err(|_| Error::Timeout("Receive"))??;

        debug!(address, bytes = reply.len(), "Received response from TCP server");
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn request_reply(&self, address: &str, payload: &[u8], framing: Framing) -> Result<Vec<u8>> {
        let exchange = self.exchange(address, payload, framing);
        let result = match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                result = exchange => result,
            },
            None => exchange.await,
        };

        if let Err(err) = &result {
            error!(address, error = %err, "TCP request failed");
        }
        result
    }
}

/// Reads from `reader` until `framing` reports a complete frame.
pub async fn read_frame<R>(reader: &mut R, framing: Framing, max_size: usize) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut scanner = FrameScanner::new(framing);
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Err(Error::ConnectionClosed);
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(len) = scanner.frame_len(&buf)? {
            buf.truncate(len);
            return Ok(buf);
        }
        if buf.len() > max_size {
            return Err(Error::InvalidFrame(format!(
                "Message too large: more than {max_size} bytes without a complete frame"
            )));
        }
    }
}

/// Builder for configuring TCP transport
#[derive(Debug, Clone)]
pub struct TcpTransportBuilder {
    connect_timeout: Duration,
    send_timeout: Duration,
    receive_timeout: Duration,
    max_response_size: usize,
    cancel: Option<CancellationToken>,
}

impl Default for TcpTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            max_response_size: MAX_FRAME_SIZE,
            cancel: None,
        }
    }
}

impl TcpTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Set the receive timeout, which bounds the whole read loop
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Apply one timeout to every phase
    pub fn timeout(self, timeout: Duration) -> Self {
        self.connect_timeout(timeout)
            .send_timeout(timeout)
            .receive_timeout(timeout)
    }

    /// Cap on buffered response bytes, at most the codec frame limit
    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes.min(MAX_FRAME_SIZE);
        self
    }

    /// Abort in-flight calls with `Error::Cancelled` once `token` fires
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn build(self) -> TcpTransport {
        TcpTransport {
            connect_timeout: self.connect_timeout,
            send_timeout: self.send_timeout,
            receive_timeout: self.receive_timeout,
            max_response_size: self.max_response_size,
            cancel: self.cancel,
        }
    }
}
