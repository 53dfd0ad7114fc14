use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::services::{Eligibility, QuotaService};
use crate::utils::{ApiError, ApiResponse};

/// Single source of truth for "can this user generate right now". The
/// client may cache the answer as a short-lived hint, but submission always
/// re-checks server-side.
#[openapi(tag = "Usage")]
#[get("/usage/eligibility")]
pub async fn check_eligibility(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<Eligibility>>, ApiError> {
    Ok(Json(ApiResponse::success(
        QuotaService::can_generate(db, &auth.user_id).await,
    )))
}
