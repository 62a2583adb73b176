//! HTTP client for the availability gateway, with exactly three logical operations: fetch batch
//! data (nullable), fetch the configured order-tree height (optional on older gateways), and
//! submit a committee signature.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
pub use reqwest::StatusCode;
use reqwest::{Certificate, Client, Identity};
use starkex_objects::availability::{BatchDataResponse, BatchId, CommitteeSignature, StateUpdate};
use tracing::debug;
use url::Url;


pub const GET_BATCH_DATA_PATH: &str = "/availability_gateway/get_batch_data";
pub const ORDER_TREE_HEIGHT_PATH: &str = "/availability_gateway/order_tree_height";
pub const APPROVE_NEW_ROOTS_PATH: &str = "/availability_gateway/approve_new_roots";

/// The exact acknowledgement the gateway returns for an accepted signature. Anything else is a
/// protocol error.
pub const SIGNATURE_ACCEPTED_ACK: &str = "signature accepted";

#[derive(thiserror::Error, Debug)]
pub enum GatewayClientError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Url(#[from] url::ParseError),
    #[error("HTTP error occurred. Status: {status}. Text: {text}")]
    BadStatus { status: StatusCode, text: String },
    #[error("Failed to parse the gateway response: {0}")]
    Parse(String),
    #[error("Signature for batch {batch_id} was not accepted; unexpected response: {response:?}")]
    SignatureNotAccepted { batch_id: BatchId, response: String },
    #[error("Failed to load client certificates from {path}: {reason}")]
    Certificates { path: String, reason: String },
}

pub type GatewayClientResult<T> = Result<T, GatewayClientError>;

/// The gateway operations the committee depends on, behind a trait for substitutability in
/// tests.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait AvailabilityGateway: Send + Sync {
    /// The state update of the given batch, or `None` while the gateway does not have it yet.
    async fn get_batch_data(&self, batch_id: BatchId) -> GatewayClientResult<Option<StateUpdate>>;

    /// The order-tree height the gateway is configured with. Gateways predating this API answer
    /// with a 4xx, surfaced as [`GatewayClientError::BadStatus`]; callers treat that as "no
    /// override".
    async fn order_tree_height(&self) -> GatewayClientResult<usize>;

    /// Submits the signature and requires the exact-text acknowledgement.
    async fn send_signature(&self, signature: CommitteeSignature) -> GatewayClientResult<()>;
}

pub struct AvailabilityGatewayClient {
    gateway_url: Url,
    client: Client,
}

impl AvailabilityGatewayClient {
    /// Creates a client for the given gateway. When `certificates_path` is set, the directory
    /// must hold `user.crt`, `user.key` and `server.crt`, and the connection uses mutual TLS.
    pub fn new(gateway_url: Url, certificates_path: Option<&Path>) -> GatewayClientResult<Self> {
        let mut builder = Client::builder();
        if let Some(path) = certificates_path {
            let read = |name: &str| {
                fs::read(path.join(name)).map_err(|error| GatewayClientError::Certificates {
                    path: path.join(name).display().to_string(),
                    reason: error.to_string(),
                })
            };
            let mut identity_pem = read("user.crt")?;
            identity_pem.extend_from_slice(&read("user.key")?);
            let identity = Identity::from_pem(&identity_pem)?;
            let server_certificate = Certificate::from_pem(&read("server.crt")?)?;
            builder = builder.identity(identity).add_root_certificate(server_certificate);
        }
        Ok(Self { gateway_url, client: builder.build()? })
    }

    async fn get_text(&self, url: Url) -> GatewayClientResult<String> {
        let response = self.client.get(url).send().await?;
        Self::text_of_ok_response(response).await
    }

    async fn text_of_ok_response(response: reqwest::Response) -> GatewayClientResult<String> {
        let status = response.status();
        let text = response.text().await?;
        if status != StatusCode::OK {
            return Err(GatewayClientError::BadStatus { status, text });
        }
        Ok(text)
    }
}

#[async_trait]
impl AvailabilityGateway for AvailabilityGatewayClient {
    async fn get_batch_data(&self, batch_id: BatchId) -> GatewayClientResult<Option<StateUpdate>> {
        let mut url = self.gateway_url.join(GET_BATCH_DATA_PATH)?;
        url.set_query(Some(&format!("batch_id={batch_id}")));
        let text = self.get_text(url).await?;
        let response: BatchDataResponse = serde_json::from_str(&text)
            .map_err(|error| GatewayClientError::Parse(error.to_string()))?;
        Ok(response.update)
    }

    async fn order_tree_height(&self) -> GatewayClientResult<usize> {
        let text = self.get_text(self.gateway_url.join(ORDER_TREE_HEIGHT_PATH)?).await?;
        text.trim().parse().map_err(|error| {
            GatewayClientError::Parse(format!("order tree height {text:?}: {error}"))
        })
    }

    async fn send_signature(&self, signature: CommitteeSignature) -> GatewayClientResult<()> {
        let batch_id = signature.batch_id;
        let url = self.gateway_url.join(APPROVE_NEW_ROOTS_PATH)?;
        let response = self.client.post(url).json(&signature).send().await?;
        let text = Self::text_of_ok_response(response).await?;
        if text != SIGNATURE_ACCEPTED_ACK {
            return Err(GatewayClientError::SignatureNotAccepted { batch_id, response: text });
        }
        debug!("Signature for batch {batch_id} was sent successfully");
        Ok(())
    }
}
