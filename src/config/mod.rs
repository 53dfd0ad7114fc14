use rocket::figment::{Figment, providers::{Env, Format, Toml}};
use rocket::Config as RocketConfig;
use std::env;

/// Default LivePortrait model version pinned on the generation service.
const DEFAULT_MODEL_VERSION: &str =
    "a6ea89def8d2125215e4d2f920d608b171866840f8b5bff3be46c4c1ce9b259b";

pub struct Config;

impl Config {
    fn figment() -> Figment {
        // Get the current profile
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());

        Figment::from(RocketConfig::default())
            .merge(Toml::file("Rocket.toml").nested())
            .select(&profile)
            .merge(Env::prefixed("ROCKET_"))
    }

    pub fn jwt_secret() -> String {
        Self::figment()
            .extract_inner("jwt_secret")
            .unwrap_or_else(|_| "default-secret".to_string())
    }

    pub fn mongodb_uri() -> String {
        Self::figment()
            .extract_inner("mongodb_uri")
            .unwrap_or_else(|_| "mongodb://localhost:27017/facemojo".to_string())
    }

    pub fn replicate_api_token() -> Option<String> {
        Self::figment()
            .extract_inner("replicate_api_token")
            .ok()
    }

    pub fn replicate_api_base() -> String {
        Self::figment()
            .extract_inner("replicate_api_base")
            .unwrap_or_else(|_| "https://api.replicate.com".to_string())
    }

    pub fn replicate_model_version() -> String {
        Self::figment()
            .extract_inner("replicate_model_version")
            .unwrap_or_else(|_| DEFAULT_MODEL_VERSION.to_string())
    }

    /// Maximum accepted size of one base64-encoded media payload.
    pub fn max_payload_bytes() -> usize {
        Self::figment()
            .extract_inner("max_payload_bytes")
            .unwrap_or(10 * 1024 * 1024)
    }

    pub fn poll_interval_secs() -> u64 {
        Self::figment()
            .extract_inner("poll_interval_secs")
            .unwrap_or(3)
    }

    pub fn poll_max_attempts() -> u32 {
        Self::figment()
            .extract_inner("poll_max_attempts")
            .unwrap_or(100)
    }

    pub fn basic_monthly_allocation() -> i32 {
        Self::figment()
            .extract_inner("basic_monthly_allocation")
            .unwrap_or(10)
    }

    pub fn pro_monthly_allocation() -> i32 {
        Self::figment()
            .extract_inner("pro_monthly_allocation")
            .unwrap_or(50)
    }

    pub fn creem_api_key() -> Option<String> {
        Self::figment()
            .extract_inner("creem_api_key")
            .ok()
    }

    pub fn creem_api_base() -> String {
        Self::figment()
            .extract_inner("creem_api_base")
            .unwrap_or_else(|_| "https://api.creem.io".to_string())
    }

    pub fn creem_webhook_secret() -> Option<String> {
        Self::figment()
            .extract_inner("creem_webhook_secret")
            .ok()
    }

    pub fn admin_key() -> Option<String> {
        Self::figment()
            .extract_inner("admin_key")
            .ok()
    }

    pub fn is_development() -> bool {
        let profile = env::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
        profile == "development"
    }

    pub fn is_replicate_enabled() -> bool {
        Self::replicate_api_token().is_some()
    }

    pub fn is_creem_enabled() -> bool {
        Self::creem_api_key().is_some()
    }
}
