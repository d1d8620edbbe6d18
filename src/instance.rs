//! Cloud instance identity, looked up through the `IMDSv2` metadata protocol.
//!
//! The lookup is informational only. Every failure collapses into
//! [`INSTANCE_ID_UNAVAILABLE`] and never reaches the chat flow.

use reqwest::blocking::Client;
use thiserror::Error;

use crate::chat::core::config::MetadataConfig;

/// Shown when no instance id can be retrieved.
pub const INSTANCE_ID_UNAVAILABLE: &str =
    "Instance ID not available (running locally or error in retrieval)";

const TOKEN_PATH: &str = "/latest/api/token";
const INSTANCE_ID_PATH: &str = "/latest/meta-data/instance-id";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const TOKEN_TTL_SECS: &str = "21600";

/// Errors from the metadata service.
#[derive(Debug, Error)]
pub enum InstanceLookupError {
    /// Transport failure, including timeouts.
    #[error("metadata request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success answer.
    #[error("metadata service returned {0}")]
    Status(u16),
}

/// Metadata service client.
pub struct InstanceIdentity {
    client: Option<Client>,
    endpoint: String,
}

impl InstanceIdentity {
    /// Build a lookup from settings. A disabled lookup, or one whose HTTP
    /// client cannot be built, always reports the placeholder.
    #[must_use]
    pub fn new(config: &MetadataConfig) -> Self {
        let client = if config.enabled {
            Client::builder()
                .timeout(config.timeout)
                .connect_timeout(config.timeout)
                .build()
                .map_err(|err| tracing::warn!("metadata client unavailable: {err}"))
                .ok()
        } else {
            None
        };
        Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// A lookup that never contacts anything.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            client: None,
            endpoint: String::new(),
        }
    }

    /// Instance id, or [`INSTANCE_ID_UNAVAILABLE`] on any failure.
    #[must_use]
    pub fn instance_id(&self) -> String {
        let Some(client) = &self.client else {
            return INSTANCE_ID_UNAVAILABLE.to_string();
        };
        match self.lookup(client) {
            Ok(id) => {
                tracing::info!(instance_id = %id, "resolved instance identity");
                id
            }
            Err(err) => {
                tracing::debug!("instance identity unavailable: {err}");
                INSTANCE_ID_UNAVAILABLE.to_string()
            }
        }
    }

    fn lookup(&self, client: &Client) -> Result<String, InstanceLookupError> {
        let token = client
            .put(format!("{}{TOKEN_PATH}", self.endpoint))
            .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS)
            .send()?;
        let token = ensure_success(token)?.text()?;

        let id = client
            .get(format!("{}{INSTANCE_ID_PATH}", self.endpoint))
            .header(TOKEN_HEADER, token.trim())
            .send()?;
        let id = ensure_success(id)?.text()?;
        Ok(id.trim().to_string())
    }
}

fn ensure_success(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, InstanceLookupError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(InstanceLookupError::Status(status.as_u16()))
    }
}
