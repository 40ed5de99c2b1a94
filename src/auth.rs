use actix_web::{dev::Payload, web, Error, FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::models::{Id, Identity};

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Numeric user id, as a string.
    pub sub: String,
    pub name: String,
    pub exp: usize,
    pub roles: Vec<Role>,
}

impl Claims {
    pub fn has_role(&self, pred: impl Fn(&Role) -> bool) -> bool {
        self.roles.iter().any(pred)
    }

    pub fn is_moderator(&self) -> bool {
        self.has_role(|r| matches!(r, Role::Moderator | Role::Admin))
    }

    /// `None` when the subject is not a user id.
    pub fn identity(&self) -> Option<Identity> {
        let user_id: Id = self.sub.parse().ok()?;
        Some(Identity {
            user_id,
            name: self.name.clone(),
            admin: self.has_role(|r| matches!(r, Role::Admin)),
        })
    }
}

/// HMAC secret used to sign and verify tokens, registered as app data.
#[derive(Clone)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }
}

/// Validate a JWT and return its claims.
fn decode_jwt(secret: &JwtSecret, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.0.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Extractor yielding validated `Claims`.
pub struct Auth(pub Claims);

impl FromRequest for Auth {
    type Error = Error;
    type Future = Ready<Result<Self, Error>>;

    fn from_request(req: &HttpRequest, pl: &mut Payload) -> Self::Future {
        let Some(secret) = req.app_data::<web::Data<JwtSecret>>() else {
            tracing::error!("JwtSecret missing from app data");
            return ready(Err(ApiError::Internal.into()));
        };
        // Delegate to BearerAuth to parse the header.
        if let Ok(bearer) = BearerAuth::from_request(req, pl).into_inner() {
            return ready(match decode_jwt(secret, bearer.token()) {
                Ok(claims) => Ok(Auth(claims)),
                Err(e) => {
                    tracing::debug!(error = %e, "rejected bearer token");
                    Err(ApiError::Unauthorized.into())
                }
            });
        }
        ready(Err(ApiError::Unauthorized.into()))
    }
}

/// Create a JWT for a user
pub fn create_jwt(
    secret: &JwtSecret,
    user_id: Id,
    name: &str,
    roles: Vec<Role>,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (chrono::Utc::now() + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        exp: expiration,
        roles,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.0.as_bytes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_to_identity() {
        let secret = JwtSecret::new("unit-test-secret-0123456789abcdefghij");
        let token = create_jwt(&secret, 12, "han", vec![Role::Admin]).unwrap();
        let claims = decode_jwt(&secret, &token).unwrap();
        let id = claims.identity().unwrap();
        assert_eq!(id.user_id, 12);
        assert_eq!(id.name, "han");
        assert!(id.admin);
        assert!(claims.is_moderator());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_jwt(&JwtSecret::new("a".repeat(32)), 1, "x", vec![Role::User]).unwrap();
        assert!(decode_jwt(&JwtSecret::new("b".repeat(32)), &token).is_err());
    }

    #[test]
    fn non_numeric_subject_has_no_identity() {
        let claims = Claims { sub: "btc:abc".into(), name: "n".into(), exp: 0, roles: vec![] };
        assert!(claims.identity().is_none());
    }
}
