use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use crate::config::{JwtConfig, MAX_TOKEN_EXPIRE_HOURS};
use crate::error::Result;
use crate::models::Claims;

/// Outcome of validating a session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    Valid { username: String },
    Expired,
    Invalid,
}

/// Issues and validates HS256 session tokens. Holds no session state.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Self {
        // Config::validate rejects larger values; clamp so the cast cannot wrap
        let hours = config.token_expire_hours.clamp(1, MAX_TOKEN_EXPIRE_HOURS) as i64;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            lifetime: Duration::hours(hours),
        }
    }

    /// Issue a token for `username` expiring one lifetime from now
    pub fn issue(&self, username: &str) -> Result<String> {
        let claims = Claims {
            username: username.to_string(),
            exp: (Utc::now() + self.lifetime).timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?;
        Ok(token)
    }

    /// Validate a token. Fails closed on anything but a well-formed, signed, unexpired token.
    pub fn validate(&self, token: &str) -> TokenStatus {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) if !data.claims.username.is_empty() => TokenStatus::Valid {
                username: data.claims.username,
            },
            Ok(_) => TokenStatus::Invalid,
            Err(e) => match e.kind() {
                ErrorKind::ExpiredSignature => TokenStatus::Expired,
                _ => {
                    tracing::debug!("Rejected token: {:?}", e);
                    TokenStatus::Invalid
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codec(secret: &str) -> TokenCodec {
        TokenCodec::new(&JwtConfig {
            secret: secret.to_string(),
            ..JwtConfig::default()
        })
    }

    fn sign_json(secret: &str, claims: serde_json::Value) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_then_validate() {
        let codec = codec("secret");
        let token = codec.issue("alice").unwrap();
        assert_eq!(
            codec.validate(&token),
            TokenStatus::Valid {
                username: "alice".to_string()
            }
        );
    }

    #[test]
    fn test_expiry_is_a_day_out() {
        let codec = codec("secret");
        let token = codec.issue("alice").unwrap();
        let data = decode::<Claims>(&token, &codec.decoding, &codec.validation).unwrap();
        let remaining = data.claims.exp - Utc::now().timestamp();
        assert!(remaining > 23 * 3600 && remaining <= 24 * 3600, "{}", remaining);
    }

    #[test]
    fn test_oversized_lifetime_still_issues_live_tokens() {
        for hours in [u64::MAX, i64::MAX as u64 + 1, MAX_TOKEN_EXPIRE_HOURS + 1] {
            let codec = TokenCodec::new(&JwtConfig {
                secret: "secret".to_string(),
                token_expire_hours: hours,
                ..JwtConfig::default()
            });
            let token = codec.issue("alice").unwrap();
            assert_eq!(
                codec.validate(&token),
                TokenStatus::Valid {
                    username: "alice".to_string()
                },
                "{} hours",
                hours
            );
        }
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let codec = codec("secret");
        for seconds_ago in [1, 60, 86_400] {
            let token = codec
                .sign(&Claims {
                    username: "alice".to_string(),
                    exp: Utc::now().timestamp() - seconds_ago,
                })
                .unwrap();
            assert_eq!(codec.validate(&token), TokenStatus::Expired);
        }
    }

    #[test]
    fn test_wrong_secret_is_invalid() {
        let token = codec("one").issue("alice").unwrap();
        assert_eq!(codec("two").validate(&token), TokenStatus::Invalid);
    }

    #[test]
    fn test_malformed_tokens_are_invalid() {
        let codec = codec("secret");
        for token in ["", "garbage", "a.b.c", "eyJhbGciOiJIUzI1NiJ9..sig"] {
            assert_eq!(codec.validate(token), TokenStatus::Invalid, "{:?}", token);
        }
    }

    #[test]
    fn test_tampered_payload_is_invalid() {
        let codec = codec("secret");
        let token = codec.issue("alice").unwrap();
        let forged = sign_json("other", json!({"username": "mallory", "exp": 4_000_000_000i64}));
        let forged_payload = forged.split('.').nth(1).unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        parts[1] = forged_payload;
        assert_eq!(codec.validate(&parts.join(".")), TokenStatus::Invalid);
    }

    #[test]
    fn test_bad_username_claims_are_invalid() {
        let codec = codec("secret");
        let exp = Utc::now().timestamp() + 3600;
        let cases = [
            json!({ "exp": exp }),
            json!({ "username": 42, "exp": exp }),
            json!({ "username": null, "exp": exp }),
            json!({ "username": "", "exp": exp }),
        ];
        for claims in cases {
            let token = sign_json("secret", claims.clone());
            assert_eq!(codec.validate(&token), TokenStatus::Invalid, "{}", claims);
        }
    }

    #[test]
    fn test_missing_exp_is_invalid() {
        let codec = codec("secret");
        let token = sign_json("secret", json!({ "username": "alice" }));
        assert_eq!(codec.validate(&token), TokenStatus::Invalid);
    }
}
