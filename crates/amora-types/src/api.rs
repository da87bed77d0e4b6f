use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// JWT claims shared between amora-api (bearer middleware) and the handlers
/// that mint tokens. Canonical definition lives here in amora-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

// -- Profiles --

/// A user record with the password hash and verification code stripped.
///
/// Field names mirror the column names the web client binds to, which is why
/// `lookingFor`/`showAge`/`showPhoto` are camelCase while `is_verified` is not.
#[derive(Debug, Clone, Serialize)]
pub struct PublicProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub location: Option<String>,
    pub profession: Option<String>,
    pub about: Option<String>,
    pub qualities: Vec<String>,
    #[serde(rename = "lookingFor")]
    pub looking_for: Option<String>,
    pub joined: String,
    pub photo: Option<String>,
    pub dob: Option<String>,
    #[serde(rename = "showAge")]
    pub show_age: bool,
    #[serde(rename = "showPhoto")]
    pub show_photo: bool,
    pub is_verified: bool,
    /// Derived from `dob`; absent when the user hides their age.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub location: Option<String>,
    pub profession: Option<String>,
    pub about: Option<String>,
    pub qualities: Option<Vec<String>>,
    #[serde(rename = "lookingFor")]
    pub looking_for: Option<String>,
    pub dob: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: String,
    pub email: String,
    /// False when OTP dispatch failed; the account still exists and the code
    /// can be fetched via resend or the debug channel below.
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResendCodeRequest {
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ResendCodeResponse {
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: PublicProfile,
    pub token: String,
}

// -- Profile updates --

/// Partial update; only these allow-listed fields are ever applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub profession: Option<String>,
    pub about: Option<String>,
    pub qualities: Option<Vec<String>>,
    #[serde(rename = "lookingFor")]
    pub looking_for: Option<String>,
    pub photo: Option<String>,
    pub dob: Option<String>,
    #[serde(rename = "showAge")]
    pub show_age: Option<bool>,
    #[serde(rename = "showPhoto")]
    pub show_photo: Option<bool>,
}

// -- Messaging --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub content: String,
}

/// Message as delivered to an authorized reader: content is plaintext here,
/// never on disk.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub timestamp: String,
    pub is_read: bool,
}

/// One counterparty in the viewer's inbox, with the number of unread
/// messages they have sent the viewer.
#[derive(Debug, Serialize)]
pub struct ConversationEntry {
    pub id: String,
    pub name: String,
    pub photo: Option<String>,
    pub unread: i64,
    pub last_activity: String,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: i64,
}

// -- Photos --

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}
