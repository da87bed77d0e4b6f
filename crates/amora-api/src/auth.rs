use anyhow::anyhow;
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use tracing::warn;
use uuid::Uuid;

use amora_db::models::{NewUser, encode_qualities};
use amora_types::api::{
    AuthResponse, Claims, LoginRequest, ResendCodeRequest, ResendCodeResponse, SignupRequest,
    SignupResponse, VerifyRequest,
};

use crate::error::ApiError;
use crate::profiles::public_profile;
use crate::state::AppState;

/// Six-digit OTP, inclusive range — never leads with a zero.
fn generate_otp() -> String {
    rand::rng().random_range(100_000..=999_999).to_string()
}

fn create_token(secret: &str, user_id: &str, email: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: (Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::BadRequest("Missing fields".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let code = generate_otp();
    let email = req.email.trim().to_string();
    let joined = Utc::now().to_rfc3339();

    // Conflict check, Argon2id hash, and insert all run off the async runtime.
    let db = state.clone();
    let new_id = id.clone();
    let new_code = code.clone();
    let new_email = email.clone();
    tokio::task::spawn_blocking(move || {
        if db.db.get_user_by_email(&new_email)?.is_some() {
            return Err(ApiError::Conflict("User already exists".to_string()));
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| ApiError::Internal(anyhow!("password hashing failed: {}", e)))?
            .to_string();

        let qualities = encode_qualities(req.qualities.as_deref().unwrap_or(&[]));
        db.db.create_user(&NewUser {
            id: &new_id,
            name: req.name.trim(),
            email: &new_email,
            password_hash: &password_hash,
            location: req.location.as_deref(),
            profession: req.profession.as_deref(),
            about: req.about.as_deref(),
            qualities: &qualities,
            looking_for: req.looking_for.as_deref(),
            joined: &joined,
            dob: req.dob.as_deref(),
            verification_code: &new_code,
        })?;
        Ok(())
    })
    .await??;

    // The account exists either way; a failed dispatch just reroutes the
    // code through the debug channel.
    let email_sent = match state.mailer.send_verification_code(&email, &code).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Verification mail to {} failed: {:#}", email, e);
            false
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id,
            email,
            email_sent,
            debug_code: if email_sent { None } else { Some(code) },
        }),
    ))
}

pub async fn verify(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        let user = db
            .db
            .get_user_by_email(&req.email)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        // Exact string match against the currently stored code. A stale code
        // from before a resend (or an already-cleared one) never passes.
        match user.verification_code.as_deref() {
            Some(stored) if stored == req.code => {}
            _ => return Err(ApiError::InvalidCode),
        }

        db.db.mark_verified(&req.email)?;
        db.db
            .get_user_by_email(&req.email)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await??;

    let token = create_token(&state.jwt_secret, &user.id, &user.email)?;

    Ok(Json(AuthResponse {
        user: public_profile(user),
        token,
    }))
}

pub async fn resend_code(
    State(state): State<AppState>,
    Json(req): Json<ResendCodeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Fresh independent draw; not derived from the old code.
    let code = generate_otp();
    let email = req.email.clone();

    let db = state.clone();
    let new_code = code.clone();
    tokio::task::spawn_blocking(move || {
        let user = db
            .db
            .get_user_by_email(&req.email)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

        if user.is_verified {
            return Err(ApiError::BadRequest("Account already verified".to_string()));
        }

        db.db.set_verification_code(&req.email, &new_code)?;
        Ok(())
    })
    .await??;

    let email_sent = match state.mailer.send_verification_code(&email, &code).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Verification mail to {} failed: {:#}", email, e);
            false
        }
    };

    Ok(Json(ResendCodeResponse {
        email_sent,
        debug_code: if email_sent { None } else { Some(code) },
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || {
        let user = db
            .db
            .get_user_by_email(&req.email)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        // Verification gates the account before the password is compared.
        if !user.is_verified {
            return Err(ApiError::Forbidden("Account not verified".to_string()));
        }

        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| ApiError::Internal(anyhow!("stored hash unparseable: {}", e)))?;

        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized("Invalid credentials".to_string()))?;

        Ok(user)
    })
    .await??;

    let token = create_token(&state.jwt_secret, &user.id, &user.email)?;

    Ok(Json(AuthResponse {
        user: public_profile(user),
        token,
    }))
}
