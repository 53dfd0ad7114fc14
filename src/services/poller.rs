use std::time::Duration;

use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::models::{Prediction, PredictionStatus};
use crate::services::ReplicateService;
use crate::utils::ApiError;

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl PollConfig {
    pub fn from_config() -> Self {
        PollConfig {
            interval: Duration::from_secs(Config::poll_interval_secs()),
            max_attempts: Config::poll_max_attempts(),
        }
    }
}

/// Where the poll loop reads job state from. The live implementation hits the
/// generation service; tests script the responses.
#[rocket::async_trait]
pub trait PredictionSource: Sync {
    async fn fetch(&self, id: &str) -> Result<Prediction, ApiError>;
}

pub struct ReplicateSource;

#[rocket::async_trait]
impl PredictionSource for ReplicateSource {
    async fn fetch(&self, id: &str) -> Result<Prediction, ApiError> {
        ReplicateService::get_prediction(id).await
    }
}

/// Queries job status until it reaches a terminal state and returns the
/// artifact URL. Checks once immediately, then sleeps `interval` between
/// attempts, up to `max_attempts` total status checks. The token aborts the
/// loop at the next wait.
pub async fn poll_until_done(
    source: &impl PredictionSource,
    id: &str,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> Result<String, ApiError> {
    for attempt in 1..=config.max_attempts {
        let prediction = source.fetch(id).await?;

        match prediction.status {
            PredictionStatus::Succeeded => {
                info!("prediction {} succeeded after {} status checks", id, attempt);
                return prediction.output_url().ok_or_else(|| {
                    ApiError::internal_error("Generation succeeded but no output was returned")
                });
            }
            PredictionStatus::Failed => {
                return Err(ApiError::generation_failed(
                    prediction
                        .error
                        .unwrap_or_else(|| "Generation failed".to_string()),
                ));
            }
            PredictionStatus::Queued | PredictionStatus::Processing => {
                if attempt == config.max_attempts {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("polling for prediction {} cancelled", id);
                        return Err(ApiError::request_timeout("Generation polling was cancelled"));
                    }
                    _ = tokio::time::sleep(config.interval) => {}
                }
            }
        }
    }

    Err(ApiError::gateway_timeout(format!(
        "Job did not finish after {} status checks",
        config.max_attempts
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::http::Status;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedSource {
        responses: Mutex<VecDeque<Prediction>>,
        fetches: AtomicU32,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Prediction>) -> Self {
            ScriptedSource {
                responses: Mutex::new(responses.into()),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[rocket::async_trait]
    impl PredictionSource for ScriptedSource {
        async fn fetch(&self, _id: &str) -> Result<Prediction, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left"))
        }
    }

    fn in_flight() -> Prediction {
        Prediction {
            id: "job".into(),
            status: PredictionStatus::Processing,
            output: None,
            error: None,
        }
    }

    fn succeeded(output: &str) -> Prediction {
        Prediction {
            id: "job".into(),
            status: PredictionStatus::Succeeded,
            output: Some(serde_json::Value::String(output.into())),
            error: None,
        }
    }

    fn failed(message: &str) -> Prediction {
        Prediction {
            id: "job".into(),
            status: PredictionStatus::Failed,
            output: None,
            error: Some(message.into()),
        }
    }

    fn config(max_attempts: u32) -> PollConfig {
        PollConfig {
            interval: Duration::from_secs(3),
            max_attempts,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_output_after_success() {
        let source = ScriptedSource::new(vec![in_flight(), in_flight(), succeeded("X")]);
        let started = tokio::time::Instant::now();

        let output = poll_until_done(&source, "job", &config(10), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(output, "X");
        assert_eq!(source.fetch_count(), 3);
        // Slept once after each of the two in-flight responses
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn surfaces_failure_message_on_first_terminal_response() {
        let source = ScriptedSource::new(vec![failed("bad input")]);

        let err = poll_until_done(&source, "job", &config(10), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.message, "bad input");
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let source = ScriptedSource::new(vec![in_flight(), in_flight(), in_flight()]);

        let err = poll_until_done(&source, "job", &config(3), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status, Status::GatewayTimeout);
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_aborts_the_next_wait() {
        let source = ScriptedSource::new(vec![in_flight()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = poll_until_done(&source, "job", &config(10), &cancel)
            .await
            .unwrap_err();

        assert_eq!(err.status, Status::RequestTimeout);
        assert_eq!(source.fetch_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeded_without_output_is_an_error() {
        let mut response = succeeded("X");
        response.output = None;
        let source = ScriptedSource::new(vec![response]);

        let err = poll_until_done(&source, "job", &config(10), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.status, Status::InternalServerError);
    }
}
