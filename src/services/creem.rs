use hmac::{Hmac, Mac};
use log::{error, info};
use reqwest::Client;
use sha2::Sha256;

use crate::config::Config;
use crate::models::PlanType;
use crate::utils::ApiError;

pub struct CreemService;

impl CreemService {
    fn client() -> Client {
        Client::new()
    }

    fn api_key() -> Result<String, ApiError> {
        Config::creem_api_key().ok_or_else(|| {
            error!("creem_api_key is not configured");
            ApiError::internal_error("Server configuration error: payment API key not set")
        })
    }

    /// Confirms a checkout with the payment provider before any plan is
    /// activated. Return-URL parameters alone are never treated as an
    /// authorization signal.
    pub async fn verify_payment(payment_id: &str, plan_type: PlanType) -> Result<(), ApiError> {
        let res = Self::client()
            .get(format!(
                "{}/v1/checkouts/{}",
                Config::creem_api_base(),
                payment_id
            ))
            .header("x-api-key", Self::api_key()?)
            .send()
            .await
            .map_err(|e| {
                ApiError::internal_error(format!("Payment provider request failed: {}", e))
            })?;

        if !res.status().is_success() {
            error!(
                "payment lookup for {} returned {}",
                payment_id,
                res.status()
            );
            return Err(ApiError::bad_request("Payment could not be verified"));
        }

        let checkout: serde_json::Value = res.json().await.map_err(|e| {
            ApiError::internal_error(format!("Failed to parse payment provider response: {}", e))
        })?;

        let status = checkout
            .get("status")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if status != "completed" && status != "paid" {
            error!(
                "checkout {} has status '{}'; refusing activation",
                payment_id, status
            );
            return Err(ApiError::bad_request("Payment is not completed"));
        }

        // When the checkout carries the purchased plan, it must match the
        // plan the client asked to activate.
        if let Some(purchased) = checkout.pointer("/metadata/plan_type").and_then(|v| v.as_str()) {
            if purchased != plan_type.as_str() {
                error!(
                    "checkout {} was for plan '{}', not '{}'",
                    payment_id,
                    purchased,
                    plan_type.as_str()
                );
                return Err(ApiError::bad_request("Payment does not match the requested plan"));
            }
        }

        info!("payment {} verified for {} plan", payment_id, plan_type.as_str());
        Ok(())
    }

    /// Signature check for redirect/webhook payloads, when the provider
    /// supplies one.
    pub fn verify_signature(
        payment_id: &str,
        plan_type: PlanType,
        signature: &str,
    ) -> Result<(), ApiError> {
        let secret = Config::creem_webhook_secret().ok_or_else(|| {
            error!("creem_webhook_secret is not configured");
            ApiError::internal_error("Server configuration error: webhook secret not set")
        })?;

        let payload = format!("{}|{}", payment_id, plan_type.as_str());
        if compute_signature(&secret, &payload)? != signature {
            return Err(ApiError::bad_request("Invalid payment signature"));
        }

        Ok(())
    }
}

fn compute_signature(secret: &str, payload: &str) -> Result<String, ApiError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::internal_error("Invalid HMAC key"))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_matches_known_vector() {
        // RFC-style test vector for HMAC-SHA256
        let sig = compute_signature("key", "The quick brown fox jumps over the lazy dog").unwrap();
        assert_eq!(
            sig,
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn different_payloads_produce_different_signatures() {
        let a = compute_signature("key", "pay_1|basic").unwrap();
        let b = compute_signature("key", "pay_1|pro").unwrap();
        assert_ne!(a, b);
    }
}
