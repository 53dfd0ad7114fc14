use chrono::{DateTime as ChronoDateTime, Duration, Utc};
use log::{info, warn};
use mongodb::Database;
use mongodb::bson::{doc, DateTime};
use mongodb::options::{ReplaceOptions, UpdateOptions};
use serde::Serialize;
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

use crate::config::Config;
use crate::models::{PlanType, SubscriptionPlan, UsageRecord, month_start};
use crate::utils::ApiError;

pub const USAGE_COLLECTION: &str = "usage_stats";
pub const PLAN_COLLECTION: &str = "user_plans";

/// Result of an eligibility check. When blocked, `message` carries the
/// user-facing prompt (free-tier and paid-tier exhaustion read differently).
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct Eligibility {
    pub allowed: bool,
    pub plan_type: PlanType,
    pub remaining_animations: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct QuotaService;

impl QuotaService {
    /// Entitlement check for a new generation. A store failure fails open
    /// (allowed, one remaining) by product policy; the fallback is logged,
    /// never silent.
    pub async fn can_generate(db: &Database, user_id: &str) -> Eligibility {
        match Self::evaluate(db, user_id).await {
            Ok(eligibility) => eligibility,
            Err(e) => {
                warn!(
                    "quota store unavailable for {}: {}; failing open with one generation",
                    user_id, e.message
                );
                Eligibility {
                    allowed: true,
                    plan_type: PlanType::Free,
                    remaining_animations: 1,
                    message: None,
                }
            }
        }
    }

    async fn evaluate(db: &Database, user_id: &str) -> Result<Eligibility, ApiError> {
        let now = Utc::now();
        let mut plan = Self::load_plan(db, user_id).await?;

        // Lapsed paid plans revert to free before eligibility is evaluated.
        if plan.plan_type.is_paid() && plan.is_expired(now) {
            plan = Self::downgrade_expired(db, user_id).await?;
        }

        let usage = Self::load_usage(db, user_id).await?;
        Ok(eligibility_of(plan.plan_type, &usage, now))
    }

    pub async fn load_plan(db: &Database, user_id: &str) -> Result<SubscriptionPlan, ApiError> {
        let plan = db
            .collection::<SubscriptionPlan>(PLAN_COLLECTION)
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        Ok(plan.unwrap_or_else(|| SubscriptionPlan::free(user_id)))
    }

    pub async fn load_usage(db: &Database, user_id: &str) -> Result<UsageRecord, ApiError> {
        let usage = db
            .collection::<UsageRecord>(USAGE_COLLECTION)
            .find_one(doc! { "user_id": user_id }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        Ok(usage.unwrap_or_else(|| UsageRecord::fresh(user_id)))
    }

    async fn downgrade_expired(db: &Database, user_id: &str) -> Result<SubscriptionPlan, ApiError> {
        info!("subscription for {} lapsed; reverting to free tier", user_id);
        let now = DateTime::now();

        db.collection::<SubscriptionPlan>(PLAN_COLLECTION)
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "plan_type": "free", "expire_date": null, "updated_at": now } },
                None,
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        db.collection::<UsageRecord>(USAGE_COLLECTION)
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "is_paid_user": false, "animations_left": 0 } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        Self::load_plan(db, user_id).await
    }

    /// Consumes quota after a job succeeded. Paid counters use a conditional
    /// decrement at the store so concurrent completions cannot drive the
    /// counter below zero. Never called for failed or abandoned jobs.
    pub async fn record_usage(db: &Database, user_id: &str) -> Result<(), ApiError> {
        let now = DateTime::now();
        let usage = db.collection::<UsageRecord>(USAGE_COLLECTION);

        let decremented = usage
            .update_one(
                doc! {
                    "user_id": user_id,
                    "is_paid_user": true,
                    "animations_left": { "$gt": 0 },
                },
                doc! {
                    "$inc": { "animations_left": -1 },
                    "$set": { "last_generated_at": now, "last_used": now },
                },
                None,
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        // Free user (or a paid counter already at zero): stamp the window only.
        if decremented.matched_count == 0 {
            usage
                .update_one(
                    doc! { "user_id": user_id },
                    doc! { "$set": { "last_generated_at": now, "last_used": now } },
                    UpdateOptions::builder().upsert(true).build(),
                )
                .await
                .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;
        }

        Ok(())
    }

    /// The only path that grants or restores quota: rewrites the plan record
    /// and the usage allocation in the same logical operation. Callers must
    /// have verified the payment before invoking this.
    pub async fn apply_plan_change(
        db: &Database,
        user_id: &str,
        plan_type: PlanType,
        payment_id: Option<String>,
    ) -> Result<SubscriptionPlan, ApiError> {
        let now = Utc::now();
        let expire_date = if plan_type.is_paid() {
            Some(DateTime::from_chrono(now + Duration::days(30)))
        } else {
            None
        };

        let plan = SubscriptionPlan {
            user_id: user_id.to_string(),
            plan_type,
            subscribe_date: Some(DateTime::from_chrono(now)),
            expire_date,
            payment_id,
            updated_at: DateTime::from_chrono(now),
        };

        db.collection::<SubscriptionPlan>(PLAN_COLLECTION)
            .replace_one(
                doc! { "user_id": user_id },
                &plan,
                ReplaceOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        let allocation = allocation_for(plan_type);
        db.collection::<UsageRecord>(USAGE_COLLECTION)
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": {
                    "is_paid_user": plan_type.is_paid(),
                    "animations_left": allocation,
                    "last_reset_at": DateTime::from_chrono(now),
                } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        info!(
            "plan for {} set to {} ({} animations)",
            user_id,
            plan_type.as_str(),
            allocation
        );

        Ok(plan)
    }

    /// Refills paid counters once per calendar month. The per-user
    /// `last_reset_at` comparison makes a second run within the same month a
    /// no-op, which doubles as the overlap guard for the external scheduler.
    /// Free-plan users are skipped. Returns the number of users refilled.
    pub async fn reset_monthly_quota(db: &Database) -> Result<u64, ApiError> {
        let now = Utc::now();
        let period_start = DateTime::from_chrono(month_start(now));
        let stamp = DateTime::from_chrono(now);

        let mut cursor = db
            .collection::<SubscriptionPlan>(PLAN_COLLECTION)
            .find(doc! { "plan_type": { "$in": ["basic", "pro"] } }, None)
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        let mut reset_count: u64 = 0;
        while cursor
            .advance()
            .await
            .map_err(|e| ApiError::internal_error(format!("Cursor error: {}", e)))?
        {
            let plan = cursor
                .deserialize_current()
                .map_err(|e| ApiError::internal_error(format!("Deserialization error: {}", e)))?;

            let allocation = allocation_for(plan.plan_type);
            let updated = db
                .collection::<UsageRecord>(USAGE_COLLECTION)
                .update_one(
                    doc! {
                        "user_id": &plan.user_id,
                        "$or": [
                            { "last_reset_at": null },
                            { "last_reset_at": { "$lt": period_start } },
                        ],
                    },
                    doc! { "$set": {
                        "is_paid_user": true,
                        "animations_left": allocation,
                        "last_reset_at": stamp,
                    } },
                    None,
                )
                .await
                .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

            if updated.modified_count > 0 {
                info!(
                    "monthly reset for {}: {} animations",
                    plan.user_id, allocation
                );
                reset_count += 1;
            }
        }

        info!("monthly reset complete: {} users refilled", reset_count);
        Ok(reset_count)
    }

    /// Admin override: restore one user's counter to the plan's allocation.
    pub async fn set_quota(
        db: &Database,
        user_id: &str,
        plan_type: PlanType,
    ) -> Result<i32, ApiError> {
        let allocation = allocation_for(plan_type);

        db.collection::<UsageRecord>(USAGE_COLLECTION)
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": {
                    "is_paid_user": plan_type.is_paid(),
                    "animations_left": allocation,
                    "last_reset_at": DateTime::now(),
                } },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| ApiError::internal_error(format!("Quota store error: {}", e)))?;

        Ok(allocation)
    }

    /// Derived view for the status endpoint. Applies the expiry downgrade on
    /// read so a lapsed plan is never reported as active.
    pub async fn subscription_status(
        db: &Database,
        user_id: &str,
    ) -> Result<(SubscriptionPlan, UsageRecord), ApiError> {
        let now = Utc::now();
        let mut plan = Self::load_plan(db, user_id).await?;

        if plan.plan_type.is_paid() && plan.is_expired(now) {
            plan = Self::downgrade_expired(db, user_id).await?;
        }

        let usage = Self::load_usage(db, user_id).await?;
        Ok((plan, usage))
    }
}

pub fn allocation_for(plan_type: PlanType) -> i32 {
    match plan_type {
        PlanType::Free => 0,
        PlanType::Basic => Config::basic_monthly_allocation(),
        PlanType::Pro => Config::pro_monthly_allocation(),
    }
}

fn eligibility_of(
    plan_type: PlanType,
    usage: &UsageRecord,
    now: ChronoDateTime<Utc>,
) -> Eligibility {
    let allowed = usage.is_eligible(now);
    let message = if allowed {
        None
    } else if usage.is_paid_user {
        Some(
            "You have used all your animations for this month. Your allocation refills next month."
                .to_string(),
        )
    } else {
        Some(
            "You've already used your free animation this week. Upgrade to keep generating."
                .to_string(),
        )
    };

    Eligibility {
        allowed,
        plan_type,
        remaining_animations: usage.remaining_animations(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::DateTime as BsonDateTime;

    fn now() -> ChronoDateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 12, 0, 0).unwrap()
    }

    #[test]
    fn default_allocations_follow_plan() {
        assert_eq!(allocation_for(PlanType::Free), 0);
        assert_eq!(allocation_for(PlanType::Basic), 10);
        assert_eq!(allocation_for(PlanType::Pro), 50);
    }

    #[test]
    fn fresh_free_user_is_allowed_without_message() {
        let usage = UsageRecord::fresh("u1");
        let e = eligibility_of(PlanType::Free, &usage, now());
        assert!(e.allowed);
        assert!(e.message.is_none());
        assert_eq!(e.remaining_animations, 0);
    }

    #[test]
    fn blocked_free_user_gets_upgrade_prompt() {
        let mut usage = UsageRecord::fresh("u1");
        usage.last_generated_at = Some(BsonDateTime::from_chrono(
            Utc.with_ymd_and_hms(2025, 6, 10, 9, 0, 0).unwrap(),
        ));
        let e = eligibility_of(PlanType::Free, &usage, now());
        assert!(!e.allowed);
        assert!(e.message.as_deref().unwrap().contains("Upgrade"));
    }

    #[test]
    fn exhausted_paid_user_gets_refill_prompt() {
        let mut usage = UsageRecord::fresh("u1");
        usage.is_paid_user = true;
        usage.animations_left = 0;
        let e = eligibility_of(PlanType::Pro, &usage, now());
        assert!(!e.allowed);
        assert!(e.message.as_deref().unwrap().contains("next month"));
    }

    #[test]
    fn paid_user_with_counter_is_allowed() {
        let mut usage = UsageRecord::fresh("u1");
        usage.is_paid_user = true;
        usage.animations_left = 7;
        let e = eligibility_of(PlanType::Basic, &usage, now());
        assert!(e.allowed);
        assert_eq!(e.remaining_animations, 7);
    }
}
