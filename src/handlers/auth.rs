//! Bearer token codec.
//!
//! Tokens are decoded on the client to drive routing and display. Unless a
//! shared secret is configured the signature is not checked, so nothing here
//! is an authorization boundary: the API re-validates every privileged call.

use crate::errors::DecodeError;
use crate::models::all_models::{
    AdminDetails, CompanyDetails, DeliveryPersonDetails, EmployeeDetails, HomeChefDetails,
    RoleDetails, UserProfile, UserRole,
};
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use log::{error, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Subject identifier claims, in lookup order.
const ID_CLAIMS: [&str; 3] = ["sub", "userId", "id"];

/// Decodes bearer tokens into user profiles and judges their validity.
#[derive(Clone, Default)]
pub struct TokenCodec {
    verifier: Option<SignatureVerifier>,
}

#[derive(Clone)]
struct SignatureVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additionally require an HMAC signature made with `secret`.
    pub fn with_secret(mut self, secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // expiry is checked by `check_at`
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        self.verifier = Some(SignatureVerifier {
            key: DecodingKey::from_secret(secret),
            validation,
        });
        self
    }

    pub fn is_valid(&self, token: &str) -> bool {
        self.is_valid_at(token, Utc::now())
    }

    /// True iff the token carries a numeric `exp` later than `now`.
    /// Never fails: any decode problem means "not valid".
    pub fn is_valid_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.check_at(token, now).is_ok()
    }

    pub fn check(&self, token: &str) -> Result<(), DecodeError> {
        self.check_at(token, Utc::now())
    }

    pub fn check_at(&self, token: &str, now: DateTime<Utc>) -> Result<(), DecodeError> {
        let claims = decode_claims(token)?;
        let exp = claims
            .get("exp")
            .ok_or(DecodeError::MissingClaim("exp"))?
            .as_f64()
            .ok_or(DecodeError::InvalidClaim("exp"))?;
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        if exp <= now_secs {
            return Err(DecodeError::Expired);
        }
        if let Some(verifier) = &self.verifier {
            jsonwebtoken::decode::<Value>(token, &verifier.key, &verifier.validation)?;
        }
        Ok(())
    }

    /// Expiration instant claimed by the token.
    pub fn expires_at(&self, token: &str) -> Option<DateTime<Utc>> {
        let exp = decode_claims(token).ok()?.get("exp")?.as_f64()?;
        DateTime::from_timestamp_millis((exp * 1000.0) as i64)
    }

    /// Profile carried by the token, or `None` when it cannot be decoded.
    /// Failures are logged here and not reported to the caller.
    pub fn decode_profile(&self, token: &str) -> Option<UserProfile> {
        match self.try_decode_profile(token) {
            Ok(profile) => Some(profile),
            Err(e) => {
                error!("Error parsing token: {}", e);
                None
            }
        }
    }

    pub fn try_decode_profile(&self, token: &str) -> Result<UserProfile, DecodeError> {
        let claims = decode_claims(token)?;

        let user_id = ID_CLAIMS
            .iter()
            .filter_map(|name| claims.get(*name))
            .find(|v| !is_unset_identifier(v))
            .ok_or(DecodeError::MissingClaim("sub"))
            .and_then(|v| coerce_identifier(v).ok_or(DecodeError::InvalidClaim("sub")))?;

        let email = claims
            .get("email")
            .ok_or(DecodeError::MissingClaim("email"))?
            .as_str()
            .ok_or(DecodeError::InvalidClaim("email"))?
            .to_string();

        let role_name = claims
            .get("role")
            .ok_or(DecodeError::MissingClaim("role"))?
            .as_str()
            .ok_or(DecodeError::InvalidClaim("role"))?;
        let role: UserRole = role_name
            .parse()
            .map_err(|_| DecodeError::UnknownRole(role_name.to_string()))?;

        // Every embedded profile must parse, but only the one matching the
        // role is kept.
        let mut details = None;
        for candidate in UserRole::ALL {
            let Some(parsed) = parse_role_details(&claims, candidate)? else {
                continue;
            };
            if candidate == role {
                details = Some(parsed);
            } else {
                warn!(
                    "Ignoring `{}` profile embedded in a {} token",
                    candidate.profile_claim(),
                    role
                );
            }
        }

        Ok(UserProfile {
            user_id,
            email,
            role,
            details,
        })
    }
}

fn decode_claims(token: &str) -> Result<Map<String, Value>, DecodeError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(DecodeError::Malformed),
    };
    let bytes = decode_segment(payload)?;
    match serde_json::from_slice::<Value>(&bytes)? {
        Value::Object(claims) => Ok(claims),
        _ => Err(DecodeError::InvalidClaim("payload")),
    }
}

/// Base64url as issued, but tolerate padding and the standard alphabet.
fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let trimmed = segment.trim_end_matches('=');
    match URL_SAFE_NO_PAD.decode(trimmed) {
        Ok(bytes) => Ok(bytes),
        Err(url_err) => STANDARD_NO_PAD.decode(trimmed).map_err(|_| url_err.into()),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Identifier claims fall through on null, `false`, `0` and `""`.
fn is_unset_identifier(value: &Value) -> bool {
    match value {
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        other => is_blank(other),
    }
}

/// Integer view of an identifier claim: fractional numbers truncate, strings
/// contribute their leading integer (`"42abc"` is 42).
fn coerce_identifier(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits.len());
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

fn parse_role_details(
    claims: &Map<String, Value>,
    role: UserRole,
) -> Result<Option<RoleDetails>, DecodeError> {
    let claim = role.profile_claim();
    let Some(raw) = claims.get(claim).filter(|v| !is_blank(v)) else {
        return Ok(None);
    };
    let details = match role {
        UserRole::Admin => RoleDetails::Admin(parse_embedded::<AdminDetails>(claim, raw)?),
        UserRole::Company => RoleDetails::Company(parse_embedded::<CompanyDetails>(claim, raw)?),
        UserRole::Employee => {
            RoleDetails::Employee(parse_embedded::<EmployeeDetails>(claim, raw)?)
        }
        UserRole::Chef => RoleDetails::Chef(parse_embedded::<HomeChefDetails>(claim, raw)?),
        UserRole::DeliveryPerson => {
            RoleDetails::DeliveryPerson(parse_embedded::<DeliveryPersonDetails>(claim, raw)?)
        }
    };
    Ok(Some(details))
}

/// Role profiles are issued as JSON strings; plain objects are accepted too.
fn parse_embedded<T: DeserializeOwned>(
    claim: &'static str,
    raw: &Value,
) -> Result<T, DecodeError> {
    let parsed = match raw {
        Value::String(s) => serde_json::from_str(s),
        other => serde_json::from_value(other.clone()),
    };
    parsed.map_err(|source| DecodeError::RoleProfile { claim, source })
}
