//! Blocking [`HttpExchange`] over `ureq`.

use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use super::error::TransportError;
use super::http::{HttpExchange, HttpRequest, HttpResponse};

/// Largest response body accepted from the server.
const MAX_RESPONSE_BODY: u64 = 64 * 1024 * 1024;

/// HTTP exchanger backed by a `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqExchange {
    agent: ureq::Agent,
}

impl UreqExchange {
    /// Create an exchanger whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

impl Default for UreqExchange {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl HttpExchange for UreqExchange {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(&request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let mut response = builder
            .send(&request.body[..])
            .map_err(|e| TransportError::Io(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BODY)
            .read_to_vec()
            .map_err(|e| TransportError::Io(format!("failed to read response: {e}")))?;

        debug!(status, len = body.len(), "mapi/http exchange complete");
        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }
}
