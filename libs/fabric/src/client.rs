//! Session driver: Auth, then operations under the issued token, then Logout.

use tracing::{debug, info, instrument, warn};
use triprotocol_core::operation::{AuthRequest, AuthResponse, LogoutRequest, LogoutResponse};
use triprotocol_core::{OperationRequest, OperationResponse, RequestEnvelope};

use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::request::request_reply;
use crate::transport::{TcpTransport, Transport};

/// Drives session commands and operations against one server.
///
/// Stateless between calls: the token returned by [`auth`](Self::auth) is
/// handed back by the caller, and each call opens its own connection.
#[derive(Debug, Clone)]
pub struct AppLayerClient<C, T = TcpTransport> {
    codec: C,
    transport: T,
}

impl<C: Codec> AppLayerClient<C, TcpTransport> {
    /// Client over TCP with the default deadlines
    pub fn tcp(codec: C) -> Self {
        Self::new(codec, TcpTransport::default())
    }
}

impl<C: Codec, T: Transport> AppLayerClient<C, T> {
    pub fn new(codec: C, transport: T) -> Self {
        Self { codec, transport }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[instrument(skip(self, request), fields(student_id = %request.student_id))]
    pub async fn auth(&self, address: &str, request: &AuthRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self.exchange(address, request, None).await?;
        info!(address, name = %response.name, "Authenticated");
        Ok(response)
    }

    /// Runs one generic operation under `token`.
    #[instrument(skip(self, request, token), fields(command = %Q::COMMAND))]
    pub async fn perform<Q, R>(&self, address: &str, request: &Q, token: &str) -> Result<R>
    where
        Q: OperationRequest + Clone,
        R: OperationResponse,
    {
        self.exchange(address, request, Some(token)).await
    }

    /// Like [`perform`](Self::perform), writing into a caller-supplied shape.
    /// `response` is left untouched on failure.
    pub async fn perform_into<Q, R>(
        &self,
        address: &str,
        request: &Q,
        response: &mut R,
        token: &str,
    ) -> Result<()>
    where
        Q: OperationRequest + Clone,
        R: OperationResponse,
    {
        *response = self.perform(address, request, token).await?;
        Ok(())
    }

    #[instrument(skip(self, request, token))]
    pub async fn logout(
        &self,
        address: &str,
        request: &LogoutRequest,
        token: &str,
    ) -> Result<LogoutResponse> {
        let response: LogoutResponse = self.exchange(address, request, Some(token)).await?;
        info!(address, message = %response.message, "Logged out");
        Ok(response)
    }

    /// Auth, one operation, Logout.
    ///
    /// Logout is attempted even when the operation fails; the operation's
    /// outcome is what gets returned and a failed logout is only logged.
    #[instrument(skip(self, request), fields(command = %Q::COMMAND))]
    pub async fn session<Q, R>(&self, address: &str, student_id: &str, request: &Q) -> Result<R>
    where
        Q: OperationRequest + Clone,
        R: OperationResponse,
    {
        request.validate()?;
        let auth = self.auth(address, &AuthRequest::new(student_id)).await?;

        let outcome = self.perform(address, request, &auth.token).await;
        if let Err(err) = &outcome {
            warn!(error = %err, "Operation failed, logging out anyway");
        }

        if let Err(err) = self.logout(address, &LogoutRequest, &auth.token).await {
            warn!(error = %err, "Logout failed");
        }
        outcome
    }

    async fn exchange<Q, R>(&self, address: &str, request: &Q, token: Option<&str>) -> Result<R>
    where
        Q: OperationRequest + Clone,
        R: OperationResponse,
    {
        request.validate()?;

        let envelope = RequestEnvelope {
            token: token.map(str::to_string),
            body: request.clone(),
        };
        debug!(address, command = %Q::COMMAND, "Dispatching request");
        let response = request_reply(&self.transport, address, &envelope, &self.codec).await?;

        response.into_result().map_err(|err| {
            warn!(
                address,
                command = %Q::COMMAND,
                status = err.status.code(),
                message = %err.message,
                "Server rejected request"
            );
            Error::Service(err)
        })
    }
}
