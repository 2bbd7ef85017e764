use async_trait::async_trait;
use reqwest::multipart::{Form as Multipart, Part};

use crate::consts::{SUMMARIZE_PATH, join_url};
use crate::form::{FieldValue, FormData};

use super::{Endpoint, EndpointError, SummaryResult, decode};

/// Posts submissions to a summarizer over HTTP as `multipart/form-data`.
pub struct HttpEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpEndpoint {
    /// Target `<base_url>/summarize`.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: join_url(base_url, SUMMARIZE_PATH),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn build_body(payload: FormData) -> Multipart {
        payload
            .into_iter()
            .fold(Multipart::new(), |body, entry| match entry.value {
                FieldValue::Text(value) => body.text(entry.name, value),
                FieldValue::File { file_name, bytes } => {
                    body.part(entry.name, Part::bytes(bytes).file_name(file_name))
                }
            })
    }
}

#[async_trait]
impl Endpoint for HttpEndpoint {
    async fn submit(&self, payload: FormData) -> Result<SummaryResult, EndpointError> {
        let body = Self::build_body(payload);

        let resp = self
            .client
            .post(&self.url)
            .multipart(body)
            .send()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;

        // The service reports failures as JSON with a 4xx/5xx status, so the
        // status is informational only.
        let status = resp.status();
        tracing::debug!(%status, url = %self.url, "summarizer responded");

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| EndpointError::Transport(e.to_string()))?;

        decode(&bytes)
    }
}
