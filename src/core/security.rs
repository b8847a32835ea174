use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::config::Settings;

const ACCESS_TOKEN_TYPE: &str = "access";

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("jwt decoding failed")]
    JwtDecoding,
    #[error("token is not an access token")]
    WrongTokenType,
    #[error("token subject is not a user id: {0}")]
    InvalidSubject(String),
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[cfg(test)]
    #[error("jwt encoding failed")]
    JwtEncoding,
}

/// Claims issued by the account service. Only the fields this service reads are modelled.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) exp: i64,
    #[serde(default)]
    pub(crate) is_verified: bool,
    #[serde(rename = "type")]
    pub(crate) token_type: String,
}

/// The authenticated caller. `is_verified` unlocks teacher capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Principal {
    pub(crate) id: i64,
    pub(crate) is_verified: bool,
}

pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Principal, SecurityError> {
    let algorithm = algorithm_from_settings(settings)?;
    let mut validation = Validation::new(algorithm);
    validation.validate_exp = true;
    validation.required_spec_claims.insert("exp".to_string());
    validation.required_spec_claims.insert("sub".to_string());

    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.security().secret_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| SecurityError::JwtDecoding)?;

    if claims.token_type != ACCESS_TOKEN_TYPE {
        return Err(SecurityError::WrongTokenType);
    }

    let id = claims.sub.parse::<i64>().map_err(|_| SecurityError::InvalidSubject(claims.sub))?;

    Ok(Principal { id, is_verified: claims.is_verified })
}

#[cfg(test)]
pub(crate) fn create_token(
    user_id: i64,
    is_verified: bool,
    token_type: &str,
    settings: &Settings,
) -> Result<String, SecurityError> {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::{Duration, OffsetDateTime};

    let algorithm = algorithm_from_settings(settings)?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (OffsetDateTime::now_utc() + Duration::minutes(30)).unix_timestamp(),
        is_verified,
        token_type: token_type.to_string(),
    };

    encode(
        &Header::new(algorithm),
        &claims,
        &EncodingKey::from_secret(settings.security().secret_key.as_bytes()),
    )
    .map_err(|_| SecurityError::JwtEncoding)
}

fn algorithm_from_settings(settings: &Settings) -> Result<Algorithm, SecurityError> {
    match settings.security().algorithm.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        other => Err(SecurityError::UnsupportedAlgorithm(other.to_string())),
    }
}
