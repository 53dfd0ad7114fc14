use mongodb::bson::doc;
use mongodb::options::FindOptions;
use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::Animation;
use crate::utils::{ApiError, ApiResponse};

#[openapi(tag = "Animation")]
#[get("/animation/history?<limit>")]
pub async fn get_animation_history(
    db: &State<DbConn>,
    auth: AuthGuard,
    limit: Option<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let limit = limit.unwrap_or(20).clamp(1, 50);

    let find_options = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .limit(limit)
        .build();

    let mut cursor = db
        .collection::<Animation>("animations")
        .find(doc! { "user_id": &auth.user_id }, find_options)
        .await
        .map_err(|e| ApiError::internal_error(format!("Database error: {}", e)))?;

    let mut animations = Vec::new();
    while cursor
        .advance()
        .await
        .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
    {
        let animation = cursor
            .deserialize_current()
            .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;
        animations.push(animation);
    }

    Ok(Json(ApiResponse::success(serde_json::json!({
        "animations": animations,
    }))))
}
