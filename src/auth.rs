use crate::error::ApiError;
use crate::schemas::{ParticipantId, Trip};
use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures::future::{ready, Ready};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::ParseIntError;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, PartialEq)]
pub enum AuthorizationLevel {
    Service,
    Member(ParticipantId),
}

impl AuthorizationLevel {
    pub fn can_access(&self, trip: &Trip) -> bool {
        match self {
            AuthorizationLevel::Service => true,
            AuthorizationLevel::Member(id) => trip.has_participant(id),
        }
    }
}

/// Login payload issued to a participant, sent as JSON in the
/// `Authorization` header.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SignedLogin {
    pub participant_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub issued_at: String,
    pub hash: String,
}

#[derive(Clone)]
pub struct AuthConfig {
    service_token: String,
}

impl AuthConfig {
    pub fn new(service_token: impl Into<String>) -> Self {
        AuthConfig {
            service_token: service_token.into(),
        }
    }
}

pub fn check_authorization_level(
    authorization: &str,
    config: &AuthConfig,
) -> Option<AuthorizationLevel> {
    if authorization == config.service_token {
        return Some(AuthorizationLevel::Service);
    }
    let login: SignedLogin = serde_json::from_str(authorization).ok()?;
    let hash = login
        .hash
        .chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|n| u8::from_str_radix(&String::from_iter(n), 16))
        .collect::<Result<Vec<u8>, ParseIntError>>()
        .ok()?;
    let hasher = login_hasher(&login, &config.service_token)?;
    hasher.verify_slice(&hash).ok()?;
    Some(AuthorizationLevel::Member(login.participant_id))
}

/// Issues a login for a participant, signed with the service token.
pub fn sign_login(
    participant_id: &str,
    name: Option<&str>,
    issued_at: &str,
    config: &AuthConfig,
) -> Option<SignedLogin> {
    let mut login = SignedLogin {
        participant_id: participant_id.to_string(),
        name: name.map(str::to_string),
        issued_at: issued_at.to_string(),
        hash: String::new(),
    };
    let hash = login_hasher(&login, &config.service_token)?
        .finalize()
        .into_bytes();
    login.hash = hash.iter().map(|b| format!("{b:02x}")).collect();
    Some(login)
}

fn login_hasher(login: &SignedLogin, service_token: &str) -> Option<HmacSha256> {
    let hash_content = [
        ("issued_at", Some(login.issued_at.as_str())),
        ("name", login.name.as_deref()),
        ("participant_id", Some(login.participant_id.as_str())),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|val| format!("{key}={val}")))
    .collect::<Vec<_>>()
    .join("\n");

    let mut sha256_hasher = Sha256::new();
    sha256_hasher.update(service_token.as_bytes());
    let token_hash = sha256_hasher.finalize();

    let mut hmac_hasher = HmacSha256::new_from_slice(&token_hash).ok()?;
    hmac_hasher.update(hash_content.as_bytes());
    Some(hmac_hasher)
}

impl FromRequest for AuthorizationLevel {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authorize(request))
    }
}

fn authorize(request: &HttpRequest) -> Result<AuthorizationLevel, ApiError> {
    let Some(config) = request.app_data::<web::Data<AuthConfig>>() else {
        tracing::error!("no auth configuration registered on the app");
        return Err(ApiError::Unauthorized);
    };
    let authorization = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;
    check_authorization_level(authorization, config).ok_or_else(|| {
        tracing::debug!(path = request.path(), "rejected credentials");
        ApiError::Unauthorized
    })
}
