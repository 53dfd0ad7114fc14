use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by tokens the identity provider issues. The server only
/// validates them; it never mints sessions of its own.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

pub struct JwtService;

impl JwtService {
    pub fn verify_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let secret = crate::config::Config::jwt_secret();

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_with_exp(exp: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".to_string(),
            email: "user@example.com".to_string(),
            exp,
            iat: now,
        };
        let secret = crate::config::Config::jwt_secret();
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_a_valid_token() {
        let token = token_with_exp(chrono::Utc::now().timestamp() + 900);
        let claims = JwtService::verify_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.email, "user@example.com");
    }

    #[test]
    fn rejects_an_expired_token() {
        let token = token_with_exp(chrono::Utc::now().timestamp() - 3600);
        assert!(JwtService::verify_token(&token).is_err());
    }
}
