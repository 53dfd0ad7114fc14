use rocket::State;
use rocket::serde::json::Json;
use rocket_okapi::openapi;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;
use serde::Deserialize;

use crate::db::DbConn;
use crate::guards::AuthGuard;
use crate::models::PlanType;
use crate::services::{CreemService, QuotaService};
use crate::utils::{ApiError, ApiResponse};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActivatePlanDto {
    /// Checkout/payment id handed back by the hosted checkout redirect.
    pub payment_id: String,
    pub plan_type: PlanType,
    /// Provider signature over the redirect payload, when supplied.
    pub signature: Option<String>,
}

#[openapi(tag = "Subscription")]
#[post("/subscription/activate", data = "<dto>")]
pub async fn activate_subscription(
    db: &State<DbConn>,
    auth: AuthGuard,
    dto: Json<ActivatePlanDto>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    if !dto.plan_type.is_paid() {
        return Err(ApiError::bad_request(
            "Invalid plan. Choose 'basic' or 'pro'",
        ));
    }

    if dto.payment_id.is_empty() {
        return Err(ApiError::bad_request("Payment ID is required"));
    }

    if let Some(signature) = &dto.signature {
        CreemService::verify_signature(&dto.payment_id, dto.plan_type, signature)?;
    }

    // The redirect back from checkout is a UX flow, not proof of payment.
    CreemService::verify_payment(&dto.payment_id, dto.plan_type).await?;

    let plan = QuotaService::apply_plan_change(
        db,
        &auth.user_id,
        dto.plan_type,
        Some(dto.payment_id.clone()),
    )
    .await?;
    let usage = QuotaService::load_usage(db, &auth.user_id).await?;

    Ok(Json(ApiResponse::success_with_message(
        "Subscription activated".to_string(),
        serde_json::json!({
            "plan_type": plan.plan_type,
            "expire_date": plan.expire_date.map(|d| d.to_chrono().to_rfc3339()),
            "animations_left": usage.animations_left,
        }),
    )))
}

#[openapi(tag = "Subscription")]
#[get("/subscription/status")]
pub async fn get_subscription_status(
    db: &State<DbConn>,
    auth: AuthGuard,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let (plan, usage) = QuotaService::subscription_status(db, &auth.user_id).await?;

    Ok(Json(ApiResponse::success(serde_json::json!({
        "plan_type": plan.plan_type,
        "is_paid_user": plan.plan_type.is_paid(),
        "subscribe_date": plan.subscribe_date.map(|d| d.to_chrono().to_rfc3339()),
        "expire_date": plan.expire_date.map(|d| d.to_chrono().to_rfc3339()),
        "remaining_animations": usage.remaining_animations(),
    }))))
}
