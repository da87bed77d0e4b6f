use axum::{
    Extension, Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use chrono::{Datelike, NaiveDate, Utc};
use serde_json::json;
use tracing::warn;

use amora_db::models::{ProfileUpdate, UserRow, decode_qualities};
use amora_types::api::{Claims, PublicProfile, UpdateProfileRequest};

use crate::error::ApiError;
use crate::photos;
use crate::state::AppState;

/// Strip a user row down to what may leave the server: no password hash,
/// no verification code, age derived only when the user shows it.
pub fn public_profile(row: UserRow) -> PublicProfile {
    let age = if row.show_age {
        row.dob.as_deref().and_then(derive_age)
    } else {
        None
    };

    PublicProfile {
        id: row.id,
        name: row.name,
        email: row.email,
        location: row.location,
        profession: row.profession,
        about: row.about,
        qualities: decode_qualities(row.qualities.as_deref()),
        looking_for: row.looking_for,
        joined: row.joined,
        photo: row.photo,
        dob: row.dob,
        show_age: row.show_age,
        show_photo: row.show_photo,
        is_verified: row.is_verified,
        age,
    }
}

fn derive_age(dob: &str) -> Option<u32> {
    let dob = NaiveDate::parse_from_str(dob, "%Y-%m-%d").ok()?;
    let today = Utc::now().date_naive();

    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }
    u32::try_from(age).ok()
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_users()).await??;

    let profiles: Vec<PublicProfile> = rows.into_iter().map(public_profile).collect();
    Ok(Json(profiles))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Response, ApiError> {
    if claims.sub != id {
        return Err(ApiError::Forbidden(
            "Cannot update another user's profile".to_string(),
        ));
    }

    let update = ProfileUpdate {
        name: req.name,
        location: req.location,
        profession: req.profession,
        about: req.about,
        qualities: req.qualities,
        looking_for: req.looking_for,
        photo: req.photo,
        dob: req.dob,
        show_age: req.show_age,
        show_photo: req.show_photo,
    };

    // Zero recognized fields is a no-op success, not an error.
    if update.is_empty() {
        return Ok(Json(json!({})).into_response());
    }

    let db = state.clone();
    let target = id.clone();
    let user = tokio::task::spawn_blocking(move || {
        let changes = db.db.update_user_profile(&target, &update)?;
        if changes == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        db.db
            .get_user_by_id(&target)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await??;

    Ok(Json(public_profile(user)).into_response())
}

pub async fn delete_account(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub;

    let db = state.clone();
    let lookup = viewer.clone();
    let user = tokio::task::spawn_blocking(move || {
        db.db
            .get_user_by_id(&lookup)?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    })
    .await??;

    // Photo file first; a failed unlink never blocks the deletion.
    if let Some(reference) = user.photo.as_deref() {
        if let Some(name) = photos::basename(reference) {
            let path = state.upload_dir.join(name);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove photo {}: {}", path.display(), e);
                }
            }
        }
    }

    // Messages before the user row: a crash in between leaves an orphaned
    // account, not orphaned messages. Not transactional.
    let db = state.clone();
    let target = viewer.clone();
    tokio::task::spawn_blocking(move || {
        db.db.delete_messages_for(&target)?;
        db.db.delete_user(&target)?;
        Ok::<_, ApiError>(())
    })
    .await??;

    Ok(Json(json!({ "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> UserRow {
        UserRow {
            id: "u1".to_string(),
            name: "Aarav".to_string(),
            email: "aarav@x.np".to_string(),
            password: "$argon2id$secret-hash".to_string(),
            location: Some("Kathmandu".to_string()),
            profession: None,
            about: None,
            qualities: Some(r#"["Honest","Adventurous"]"#.to_string()),
            looking_for: Some("Kindness".to_string()),
            joined: "2026-01-01T00:00:00Z".to_string(),
            photo: None,
            dob: Some("2000-01-01".to_string()),
            show_age: true,
            show_photo: true,
            is_verified: true,
            verification_code: None,
        }
    }

    #[test]
    fn profile_never_carries_secrets() {
        let json = serde_json::to_value(public_profile(sample_row())).unwrap();
        let obj = json.as_object().unwrap();

        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("verification_code"));
        assert_eq!(obj["lookingFor"], "Kindness");
        assert_eq!(obj["is_verified"], true);
        assert_eq!(obj["qualities"][0], "Honest");
    }

    #[test]
    fn age_derives_from_dob() {
        let profile = public_profile(sample_row());
        let age = profile.age.unwrap();
        assert!((25..=27).contains(&age), "unexpected age {}", age);
    }

    #[test]
    fn age_hidden_when_flag_is_off() {
        let mut row = sample_row();
        row.show_age = false;
        assert!(public_profile(row).age.is_none());
    }

    #[test]
    fn unparseable_dob_yields_no_age() {
        let mut row = sample_row();
        row.dob = Some("sometime in spring".to_string());
        assert!(public_profile(row).age.is_none());

        let mut row = sample_row();
        row.dob = None;
        assert!(public_profile(row).age.is_none());
    }
}
