use triprotocol_core::{OperationRequest, OperationResponse, RequestEnvelope, ResponseEnvelope};

use crate::codec::Codec;
use crate::error::Result;
use crate::transport::{TcpTransport, Transport};

/// Perform a one-off request/response over the given transport
///
/// Encodes the envelope, waits for one framed reply and decodes it. A
/// server-side failure comes back as the envelope's error payload, not as
/// `Err`.
pub async fn request_reply<Q, R, C, T>(
    transport: &T,
    address: &str,
    request: &RequestEnvelope<Q>,
    codec: &C,
) -> Result<ResponseEnvelope<R>>
where
    Q: OperationRequest,
    R: OperationResponse,
    C: Codec,
    T: Transport,
{
    let payload = codec.encode(request)?;
    let reply = transport
        .request_reply(address, &payload, codec.framing())
        .await?;
    codec.decode(&reply)
}

/// Perform a one-off TCP request/response with the default deadlines
pub async fn request_tcp<Q, R, C>(
    address: &str,
    request: &RequestEnvelope<Q>,
    codec: &C,
) -> Result<ResponseEnvelope<R>>
where
    Q: OperationRequest,
    R: OperationResponse,
    C: Codec,
{
    request_reply(&TcpTransport::default(), address, request, codec).await
}
