use log::error;
use reqwest::Client;
use serde_json::json;

use crate::config::Config;
use crate::models::Prediction;
use crate::utils::ApiError;

/// Upstream diagnostic bodies are truncated to this many bytes before being
/// attached to an error response.
const ERROR_BODY_LIMIT: usize = 500;

pub struct ReplicateService;

impl ReplicateService {
    fn client() -> Client {
        Client::new()
    }

    fn api_token() -> Result<String, ApiError> {
        Config::replicate_api_token().ok_or_else(|| {
            error!("replicate_api_token is not configured");
            ApiError::internal_error("Server configuration error: API token not set")
        })
    }

    /// Submit a generation job and return the prediction the service created.
    /// The API token never leaves this process.
    pub async fn create_prediction(image: &str, video: &str) -> Result<Prediction, ApiError> {
        let token = Self::api_token()?;

        let body = json!({
            "version": Config::replicate_model_version(),
            "input": {
                "image": image,
                "video": video,
            }
        });

        let res = Self::client()
            .post(format!("{}/v1/predictions", Config::replicate_api_base()))
            .header("Authorization", format!("Token {}", token))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ApiError::internal_error(format!("Generation service request failed: {}", e))
            })?;

        let text = Self::handle_response(res).await?;
        Self::parse_prediction(&text)
    }

    /// Typed status lookup used by the polling loop.
    pub async fn get_prediction(id: &str) -> Result<Prediction, ApiError> {
        let text = Self::fetch_status_body(id).await?;
        Self::parse_prediction(&text)
    }

    /// Raw passthrough for the status endpoint: callers see the service's own
    /// job object untouched.
    pub async fn get_prediction_raw(id: &str) -> Result<serde_json::Value, ApiError> {
        let text = Self::fetch_status_body(id).await?;
        serde_json::from_str(&text).map_err(|e| {
            error!("failed to parse generation service response: {}", e);
            ApiError::internal_error("Failed to parse generation service response")
                .with_details(json!(truncate_body(&text)))
        })
    }

    async fn fetch_status_body(id: &str) -> Result<String, ApiError> {
        let token = Self::api_token()?;

        let res = Self::client()
            .get(format!(
                "{}/v1/predictions/{}",
                Config::replicate_api_base(),
                id
            ))
            .header("Authorization", format!("Token {}", token))
            .send()
            .await
            .map_err(|e| {
                ApiError::internal_error(format!("Generation service request failed: {}", e))
            })?;

        Self::handle_response(res).await
    }

    /// Propagates non-2xx upstream statuses with the diagnostic body the
    /// service returned: parsed JSON when possible, else truncated raw text.
    async fn handle_response(res: reqwest::Response) -> Result<String, ApiError> {
        let status = res.status();
        let text = res.text().await.map_err(|e| {
            ApiError::internal_error(format!("Failed to read generation service response: {}", e))
        })?;

        if !status.is_success() {
            error!(
                "generation service returned {}: {}",
                status,
                truncate_body(&text)
            );
            let details = match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(body) => body,
                Err(_) => json!(truncate_body(&text)),
            };
            return Err(ApiError::upstream(
                status.as_u16(),
                format!(
                    "Generation service error: {}",
                    status.canonical_reason().unwrap_or("request rejected")
                ),
                Some(details),
            ));
        }

        Ok(text)
    }

    fn parse_prediction(text: &str) -> Result<Prediction, ApiError> {
        serde_json::from_str(text).map_err(|e| {
            error!("failed to parse generation service response: {}", e);
            ApiError::internal_error("Failed to parse generation service response")
                .with_details(json!(truncate_body(text)))
        })
    }
}

pub(crate) fn truncate_body(s: &str) -> &str {
    if s.len() <= ERROR_BODY_LIMIT {
        return s;
    }
    let mut end = ERROR_BODY_LIMIT;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncate_body("hello"), "hello");
    }

    #[test]
    fn long_bodies_are_bounded() {
        let long = "x".repeat(2 * ERROR_BODY_LIMIT);
        assert_eq!(truncate_body(&long).len(), ERROR_BODY_LIMIT);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Each 'é' is two bytes; the cut lands mid-character and must back up.
        let long = "é".repeat(ERROR_BODY_LIMIT);
        let cut = truncate_body(&long);
        assert!(cut.len() <= ERROR_BODY_LIMIT);
        assert!(cut.chars().all(|c| c == 'é'));
    }
}
