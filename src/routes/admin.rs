use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Deserialize;

use crate::db::DbConn;
use crate::guards::AdminGuard;
use crate::models::PlanType;
use crate::services::QuotaService;
use crate::utils::{ApiError, ApiResponse};

/// Scheduler entry point for the monthly refill. Safe to invoke daily: a
/// user already reset this calendar month is left untouched.
#[openapi(tag = "Admin")]
#[post("/admin/reset-quota")]
pub async fn reset_monthly_quota(
    db: &State<DbConn>,
    _admin: AdminGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let reset_count = QuotaService::reset_monthly_quota(db).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "reset_count": reset_count,
    }))))
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SetQuotaDto {
    pub user_id: String,
    pub plan_type: PlanType,
}

/// Support override: restore one user's counter to their plan's allocation.
#[openapi(tag = "Admin")]
#[post("/admin/set-quota", data = "<dto>")]
pub async fn set_quota(
    db: &State<DbConn>,
    _admin: AdminGuard,
    dto: Json<SetQuotaDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if dto.user_id.is_empty() {
        return Err(ApiError::bad_request("Missing user_id"));
    }

    let new_limit = QuotaService::set_quota(db, &dto.user_id, dto.plan_type).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "new_limit": new_limit,
    }))))
}
