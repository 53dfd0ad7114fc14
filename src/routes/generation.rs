use log::warn;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::Animation;
use crate::services::{
    PollConfig, QuotaService, ReplicateService, ReplicateSource, poll_until_done,
};
use crate::utils::{ApiError, ApiResponse, validate_media_payload};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateAnimationDto {
    /// Reference photo, base64 or data-URI encoded.
    pub image: String,
    /// Driving video, base64 or data-URI encoded.
    pub video: String,
}

#[openapi(tag = "Generation")]
#[post("/generation/submit", data = "<dto>")]
pub async fn submit_generation(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<GenerateAnimationDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    // Client-side eligibility hints are never trusted; every submission is
    // re-checked here.
    let eligibility = QuotaService::can_generate(db, &auth.user_id).await;
    if !eligibility.allowed {
        return Err(ApiError::too_many_requests(
            eligibility
                .message
                .unwrap_or_else(|| "Generation limit reached".to_string()),
        ));
    }

    if dto.image.is_empty() || dto.video.is_empty() {
        return Err(ApiError::bad_request("Image and video are required"));
    }

    let max_bytes = Config::max_payload_bytes();
    if dto.image.len() > max_bytes || dto.video.len() > max_bytes {
        return Err(ApiError::payload_too_large(format!(
            "File size exceeds the limit ({}MB)",
            max_bytes / (1024 * 1024)
        )));
    }

    if !validate_media_payload(&dto.image) {
        return Err(ApiError::bad_request("Image payload is not valid base64"));
    }
    if !validate_media_payload(&dto.video) {
        return Err(ApiError::bad_request("Video payload is not valid base64"));
    }

    let prediction = ReplicateService::create_prediction(&dto.image, &dto.video).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "id": prediction.id,
        "status": prediction.status,
    }))))
}

/// Raw passthrough of the generation service's job object, so the client's
/// own polling loop sees `{id, status, output, error}` untouched.
#[openapi(tag = "Generation")]
#[get("/generation/status?<id>")]
pub async fn generation_status(
    _auth: AuthGuard,
    id: Option<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Prediction ID is required"))?;

    let prediction = ReplicateService::get_prediction_raw(&id).await?;
    Ok(Json(prediction))
}

/// Server-side completion flow: polls the job to a terminal state, then
/// consumes quota and records the animation in the user's history.
#[openapi(tag = "Generation")]
#[post("/generation/wait?<id>")]
pub async fn wait_for_generation(
    db: &State<DbConn>,
    auth: AuthGuard,
    id: Option<String>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let id = id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Prediction ID is required"))?;

    let cancel = CancellationToken::new();
    let output_url =
        poll_until_done(&ReplicateSource, &id, &PollConfig::from_config(), &cancel).await?;

    // Quota is consumed only by successful output. Bookkeeping failures must
    // not discard an artifact that was already produced.
    if let Err(e) = QuotaService::record_usage(db, &auth.user_id).await {
        warn!("failed to record usage for {}: {}", auth.user_id, e.message);
    }

    let animation = Animation::new(&auth.user_id, &output_url, "AI Animation");
    if let Err(e) = db
        .collection::<Animation>("animations")
        .insert_one(&animation, None)
        .await
    {
        warn!(
            "failed to save animation history for {}: {}",
            auth.user_id, e
        );
    }

    let remaining = QuotaService::load_usage(db, &auth.user_id)
        .await
        .map(|usage| usage.remaining_animations())
        .unwrap_or_default();

    Ok(Json(ApiResponse::success_with_message(
        "Animation generated".to_string(),
        serde_json::json!({
            "output_url": output_url,
            "remaining_animations": remaining,
        }),
    )))
}
