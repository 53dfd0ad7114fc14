use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    #[serde(alias = "starting")]
    Queued,
    Processing,
    Succeeded,
    Failed,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PredictionStatus::Succeeded | PredictionStatus::Failed)
    }
}

/// A job as reported by the generation service. Never persisted locally;
/// the server holds a read-through view of the service's own state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Prediction {
    /// Artifact URL of a finished job. The service returns either a plain
    /// string or a one-element array depending on the model version.
    pub fn output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            serde_json::Value::String(url) => Some(url.clone()),
            serde_json::Value::Array(items) => {
                items.first().and_then(|v| v.as_str()).map(str::to_string)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_service_status_strings() {
        let p: Prediction =
            serde_json::from_str(r#"{"id":"abc","status":"starting"}"#).unwrap();
        assert_eq!(p.status, PredictionStatus::Queued);
        assert!(!p.status.is_terminal());

        let p: Prediction =
            serde_json::from_str(r#"{"id":"abc","status":"succeeded","output":"https://x/y.mp4"}"#)
                .unwrap();
        assert!(p.status.is_terminal());
        assert_eq!(p.output_url().as_deref(), Some("https://x/y.mp4"));
    }

    #[test]
    fn output_url_handles_array_output() {
        let p: Prediction = serde_json::from_str(
            r#"{"id":"abc","status":"succeeded","output":["https://x/a.mp4"]}"#,
        )
        .unwrap();
        assert_eq!(p.output_url().as_deref(), Some("https://x/a.mp4"));
    }

    #[test]
    fn failed_job_carries_error_message() {
        let p: Prediction =
            serde_json::from_str(r#"{"id":"abc","status":"failed","error":"bad input"}"#).unwrap();
        assert_eq!(p.status, PredictionStatus::Failed);
        assert_eq!(p.error.as_deref(), Some("bad input"));
    }
}
