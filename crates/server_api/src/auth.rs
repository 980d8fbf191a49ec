//! Credentials, session tokens and the login/registration operations.
//!
//! Passwords are stored as Argon2id PHC strings. A session is an HS256 JWT
//! carried in the [`SESSION_COOKIE`] cookie; it names the phone number and the
//! role resolved at login time.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{
    domain::Role,
    error::{ApiError, ErrorCode},
    protocol::{LoginForm, LoginResponse, RegisterForm, CHECKBOX_ON},
};

use crate::{internal, ApiContext};

pub const SESSION_COOKIE: &str = "hoa_session";

pub const WRONG_FORMAT: &str =
    "wrong format: the data provided is <5 or >30 symbols or some symbols are not ascii";
pub const NO_ROLE: &str = "error registering a user: no role specified";
const LOGIN_FAILED: &str = "user not found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub exp: u64,
}

impl SessionClaims {
    pub fn phone(&self) -> &str {
        &self.sub
    }
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: u64,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_seconds: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds,
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue(&self, phone: &str, role: Option<Role>) -> Result<String, ApiError> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let claims = SessionClaims {
            sub: phone.to_string(),
            role,
            exp: now.saturating_add(self.ttl_seconds),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|err| {
            tracing::error!(error = %err, "failed to sign session token");
            ApiError::internal("failed to save session")
        })
    }

    /// `None` for tampered, foreign or expired tokens.
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                tracing::debug!(error = %err, "session token rejected");
                None
            }
        }
    }
}

/// Digits only, 5 to 40 characters.
pub fn valid_phone(phone: &str) -> bool {
    (5..=40).contains(&phone.len()) && phone.bytes().all(|b| b.is_ascii_digit())
}

/// ASCII letters and digits only, 5 to 30 characters.
pub fn valid_password(password: &str) -> bool {
    (5..=30).contains(&password.len()) && password.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub async fn hash_password(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || {
        let salt_bytes: [u8; 16] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes)?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "password hash task failed");
        ApiError::internal("password hashing failed")
    })?
    .map_err(|err| {
        tracing::error!(error = %err, "failed to hash password");
        ApiError::internal("password hashing failed")
    })
}

pub async fn verify_password(password: String, stored_hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || match PasswordHash::new(&stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            tracing::warn!(error = %err, "stored password hash is malformed");
            false
        }
    })
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "password verify task failed");
        ApiError::internal("password verification failed")
    })
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub response: LoginResponse,
    pub token: String,
}

pub async fn login(ctx: &ApiContext, form: &LoginForm) -> Result<LoginOutcome, ApiError> {
    if !valid_phone(&form.phone_number) || !valid_password(&form.password) {
        return Err(ApiError::validation(WRONG_FORMAT));
    }

    let stored_hash = ctx
        .storage
        .password_hash_for(&form.phone_number)
        .await
        .map_err(internal("failed to authorize user"))?;
    let Some(stored_hash) = stored_hash else {
        tracing::debug!(phone = %form.phone_number, "login for unknown phone");
        return Err(ApiError::new(ErrorCode::Unauthorized, LOGIN_FAILED));
    };
    if !verify_password(form.password.clone(), stored_hash).await? {
        tracing::debug!(phone = %form.phone_number, "password mismatch");
        return Err(ApiError::new(ErrorCode::Unauthorized, LOGIN_FAILED));
    }

    let role = resolve_role(ctx, &form.phone_number).await?;
    let token = ctx.sessions.issue(&form.phone_number, role)?;
    tracing::info!(phone = %form.phone_number, ?role, "user logged in");

    Ok(LoginOutcome {
        response: LoginResponse::for_phone(&form.phone_number),
        token,
    })
}

/// Staff takes precedence over resident when a phone holds both.
async fn resolve_role(ctx: &ApiContext, phone: &str) -> Result<Option<Role>, ApiError> {
    let staff = ctx
        .storage
        .staff_member_by_phone(phone)
        .await
        .map_err(internal("failed to look up staff member"))?;
    if staff.is_some() {
        return Ok(Some(Role::Staff));
    }
    let resident = ctx
        .storage
        .resident_by_phone(phone)
        .await
        .map_err(internal("failed to look up resident"))?;
    Ok(resident.map(|_| Role::Resident))
}

/// Creates the account, then each requested role record. Role failures do
/// not undo the account; they are reported in the response's `error`.
pub async fn register(ctx: &ApiContext, form: &RegisterForm) -> Result<LoginResponse, ApiError> {
    let phone = form.phone_number.as_str();
    let full_name = form.full_name.trim();
    if full_name.is_empty() || !valid_phone(phone) || !valid_password(&form.password) {
        return Err(ApiError::validation(WRONG_FORMAT));
    }

    let as_resident = form.is_resident == CHECKBOX_ON;
    let as_staff = form.is_staff_member == CHECKBOX_ON;
    if !as_resident && !as_staff {
        return Err(ApiError::validation(NO_ROLE));
    }

    let password_hash = hash_password(form.password.clone()).await?;
    let created = ctx
        .storage
        .create_user(phone, &password_hash)
        .await
        .map_err(internal("failed to register user"))?;
    if !created {
        return Err(ApiError::conflict("user already exists"));
    }

    let mut failures = Vec::new();
    if as_resident {
        match ctx.storage.create_resident(phone, full_name).await {
            Ok(Some(resident)) => tracing::info!(resident_id = %resident.id, "resident registered"),
            Ok(None) => failures.push("resident already exists"),
            Err(err) => {
                tracing::error!(error = %err, "register resident failed");
                failures.push("register resident fail");
            }
        }
    }
    if as_staff {
        match ctx.storage.create_staff_member(phone, full_name).await {
            Ok(Some(member)) => tracing::info!(member_id = %member.id, "staff member registered"),
            Ok(None) => failures.push("staff member already exists"),
            Err(err) => {
                tracing::error!(error = %err, "register staff member failed");
                failures.push("error creating a new member");
            }
        }
    }

    let mut response = LoginResponse::for_phone(phone);
    if !failures.is_empty() {
        response.error = Some(failures.join("\n"));
    }
    Ok(response)
}
