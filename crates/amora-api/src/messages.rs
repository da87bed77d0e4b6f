use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::warn;

use amora_types::api::{
    Claims, ConversationEntry, MessageResponse, SendMessageRequest, UnreadCountResponse,
};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sender_id = claims.sub;
    let receiver_id = req.receiver_id.trim().to_string();
    let content = req.content;

    if receiver_id.is_empty() || content.is_empty() {
        return Err(ApiError::BadRequest(
            "Missing sender, receiver, or content".to_string(),
        ));
    }

    let token = state.codec.encrypt_text(&content)?;
    let timestamp = Utc::now().to_rfc3339();

    let db = state.clone();
    let sid = sender_id.clone();
    let rid = receiver_id.clone();
    let ts = timestamp.clone();
    let id = tokio::task::spawn_blocking(move || {
        // Check the receiver up front; the bare FK violation would surface
        // as an opaque 500.
        if db.db.get_user_by_id(&rid)?.is_none() {
            return Err(ApiError::NotFound("Receiver not found".to_string()));
        }
        Ok(db.db.insert_message(&sid, &rid, &token, &ts)?)
    })
    .await??;

    // The sender already knows the plaintext — echo it back without a
    // decrypt round-trip.
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            id,
            sender_id,
            receiver_id,
            content,
            timestamp,
            is_read: false,
        }),
    ))
}

/// GET /api/messages/{other_id} — the decrypted thread, oldest first.
/// Fetching it is what flips the other side's messages to read.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(other_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let viewer = claims.sub;

    let db = state.clone();
    let v = viewer.clone();
    let o = other_id.clone();
    let rows = tokio::task::spawn_blocking(move || {
        let rows = db.db.get_thread(&v, &o)?;

        // Best-effort: a failed read-state write logs and the thread still
        // returns.
        if let Err(e) = db.db.mark_thread_read(&v, &o) {
            warn!("Failed to mark thread {} -> {} read: {:#}", o, v, e);
        }

        Ok::<_, ApiError>(rows)
    })
    .await??;

    let messages: Vec<MessageResponse> = rows
        .into_iter()
        .map(|row| MessageResponse {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            content: state.codec.decrypt_text(&row.content).into_string(),
            timestamp: row.timestamp,
            is_read: row.is_read,
        })
        .collect();

    Ok(Json(messages))
}

/// GET /api/conversations — counterparties with unread counts, newest
/// exchange first.
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let viewer = claims.sub;
    let rows = tokio::task::spawn_blocking(move || db.db.list_conversations(&viewer)).await??;

    let entries: Vec<ConversationEntry> = rows
        .into_iter()
        .map(|r| ConversationEntry {
            id: r.counterparty_id,
            name: r.name,
            photo: r.photo,
            unread: r.unread,
            last_activity: r.last_activity,
        })
        .collect();

    Ok(Json(entries))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let viewer = claims.sub;
    let count = tokio::task::spawn_blocking(move || db.db.unread_total(&viewer)).await??;

    Ok(Json(UnreadCountResponse { count }))
}
