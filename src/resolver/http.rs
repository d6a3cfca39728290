use super::{EntityType, Resolution, ResolvedEntity, ResultResolver, ScanSubmission};
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

const CSRF_HEADER: &str = "X-CSRFToken";

/// Thin request utility: form posts with the anti-forgery header attached
pub struct RequestClient {
    client: Client,
    base_url: String,
    csrf_token: Option<String>,
}

impl RequestClient {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolutionError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ResolutionError::Transport {
                details: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            csrf_token: config.csrf_token.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// POST form fields to `path` and decode the JSON body
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        fields: &[(&str, &str)],
    ) -> Result<T, ResolutionError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url).form(fields);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }

        let response = request.send().await.map_err(|e| {
            error!("Request to {} failed: {}", url, e);
            ResolutionError::Transport {
                details: e.to_string(),
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Request to {} returned {} - {}", url, status, body);

            // The server explains refusals (stale token, bad input) in an `error` field
            if let Some(message) = rejection_message(&body) {
                return Err(ResolutionError::Rejected { message });
            }
            return Err(ResolutionError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        response.json::<T>().await.map_err(|e| ResolutionError::Malformed {
            details: e.to_string(),
        })
    }
}

fn rejection_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .as_str()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}

/// JSON body returned by the scan processing endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScanResponse {
    pub fn into_resolution(self) -> Result<Resolution, ResolutionError> {
        if !self.success {
            return Ok(Resolution::Unrecognized {
                error_message: self
                    .error
                    .unwrap_or_else(|| "Unknown code".to_string()),
            });
        }

        let navigate_to = self.redirect_url.ok_or_else(|| ResolutionError::Malformed {
            details: "successful response without redirect_url".to_string(),
        })?;
        let display_id = match self.id {
            Some(serde_json::Value::String(id)) => id,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        Ok(Resolution::Recognized(ResolvedEntity {
            entity_type: self
                .entity_type
                .as_deref()
                .map(EntityType::from_server)
                .unwrap_or(EntityType::Other),
            display_name: self.name.unwrap_or_else(|| display_id.clone()),
            display_id,
            navigate_to,
        }))
    }
}

/// Resolver backed by the workshop server's scan endpoint
pub struct HttpResolver {
    client: RequestClient,
    process_path: String,
}

impl HttpResolver {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolutionError> {
        Ok(Self {
            client: RequestClient::new(config)?,
            process_path: config.process_path.clone(),
        })
    }
}

#[async_trait]
impl ResultResolver for HttpResolver {
    async fn resolve(&self, submission: &ScanSubmission) -> Result<Resolution, ResolutionError> {
        info!(
            "Submitting code '{}' ({}) to {}",
            submission.code,
            submission.scan_type,
            self.client.url(&self.process_path)
        );

        let response: ScanResponse = self
            .client
            .post_form(
                &self.process_path,
                &[
                    ("code", submission.code.as_str()),
                    ("scan_type", submission.scan_type.as_str()),
                ],
            )
            .await?;

        debug!("Scan response: {:?}", response);
        response.into_resolution()
    }
}
