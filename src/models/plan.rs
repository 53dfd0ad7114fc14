use chrono::{DateTime as ChronoDateTime, Utc};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use rocket_okapi::okapi::schemars;
use rocket_okapi::okapi::schemars::JsonSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Free,
    Basic,
    Pro,
}

impl PlanType {
    pub fn is_paid(self) -> bool {
        !matches!(self, PlanType::Free)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PlanType::Free => "free",
            PlanType::Basic => "basic",
            PlanType::Pro => "pro",
        }
    }
}

/// Subscription record, one document per user in `user_plans`.
/// `expire_date` is set only for paid plans (subscribe date + 30 days).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub user_id: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub subscribe_date: Option<DateTime>,
    #[serde(default)]
    pub expire_date: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub updated_at: DateTime,
}

impl SubscriptionPlan {
    /// Default plan for a user with no subscription document.
    pub fn free(user_id: &str) -> Self {
        SubscriptionPlan {
            user_id: user_id.to_string(),
            plan_type: PlanType::Free,
            subscribe_date: None,
            expire_date: None,
            payment_id: None,
            updated_at: DateTime::now(),
        }
    }

    pub fn is_expired(&self, now: ChronoDateTime<Utc>) -> bool {
        match self.expire_date {
            Some(expire) => expire.to_chrono() < now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn free_plan_never_expires() {
        let plan = SubscriptionPlan::free("u1");
        assert!(!plan.is_expired(Utc.with_ymd_and_hms(2100, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn paid_plan_expires_after_expire_date() {
        let mut plan = SubscriptionPlan::free("u1");
        plan.plan_type = PlanType::Basic;
        plan.expire_date = Some(DateTime::from_chrono(
            Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap(),
        ));

        assert!(!plan.is_expired(Utc.with_ymd_and_hms(2025, 5, 31, 0, 0, 0).unwrap()));
        assert!(plan.is_expired(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn plan_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PlanType::Pro).unwrap(), "\"pro\"");
        assert_eq!(PlanType::Basic.as_str(), "basic");
        assert!(PlanType::Pro.is_paid());
        assert!(!PlanType::Free.is_paid());
    }
}
