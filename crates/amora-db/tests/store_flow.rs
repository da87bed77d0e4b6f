//! End-to-end store scenarios: the signup/verify lifecycle columns, the
//! message round-trip through the codec, and unread bookkeeping.

use amora_crypto::{Codec, TextPayload, derive_key};
use amora_db::Database;
use amora_db::models::NewUser;

fn seed(db: &Database, id: &str, name: &str, email: &str, code: &str) {
    db.create_user(&NewUser {
        id,
        name,
        email,
        password_hash: "$argon2id$stub",
        location: None,
        profession: None,
        about: None,
        qualities: "[]",
        looking_for: None,
        joined: "2026-01-01T00:00:00Z",
        dob: None,
        verification_code: code,
    })
    .unwrap();
}

#[test]
fn verification_lifecycle_with_resend() {
    let db = Database::open_in_memory().unwrap();
    seed(&db, "u1", "Aarav", "aarav@x.np", "111111");

    // A resend invalidates the old code: only the stored one matches.
    db.set_verification_code("aarav@x.np", "222222").unwrap();
    let user = db.get_user_by_email("aarav@x.np").unwrap().unwrap();
    assert_ne!(user.verification_code.as_deref(), Some("111111"));
    assert_eq!(user.verification_code.as_deref(), Some("222222"));

    db.mark_verified("aarav@x.np").unwrap();
    let user = db.get_user_by_email("aarav@x.np").unwrap().unwrap();
    assert!(user.is_verified);
    assert!(user.verification_code.is_none());
}

#[test]
fn encrypted_message_round_trips_for_both_parties() {
    let db = Database::open_in_memory().unwrap();
    let codec = Codec::new(derive_key("store-flow-secret"));
    seed(&db, "a", "A", "a@x.np", "111111");
    seed(&db, "b", "B", "b@x.np", "222222");

    let token = codec.encrypt_text("hi").unwrap();
    db.insert_message("a", "b", &token, "2026-01-01T10:00:00Z").unwrap();

    // Never plaintext at rest.
    let stored = db.get_thread("a", "b").unwrap();
    assert_ne!(stored[0].content, "hi");

    for viewer in ["a", "b"] {
        let other = if viewer == "a" { "b" } else { "a" };
        let thread = db.get_thread(viewer, other).unwrap();
        assert_eq!(
            codec.decrypt_text(&thread[0].content),
            TextPayload::Plain("hi".to_string())
        );
    }
}

#[test]
fn unread_badge_drops_after_the_thread_is_read() {
    let db = Database::open_in_memory().unwrap();
    seed(&db, "a", "A", "a@x.np", "111111");
    seed(&db, "b", "B", "b@x.np", "222222");

    db.insert_message("a", "b", "tok", "2026-01-01T10:00:00Z").unwrap();
    assert_eq!(db.unread_total("b").unwrap(), 1);

    let marked = db.mark_thread_read("b", "a").unwrap();
    assert_eq!(marked, 1);
    assert_eq!(db.unread_total("b").unwrap(), 0);
}

#[test]
fn pre_encryption_rows_read_back_verbatim() {
    let db = Database::open_in_memory().unwrap();
    let codec = Codec::new(derive_key("store-flow-secret"));
    seed(&db, "a", "A", "a@x.np", "111111");
    seed(&db, "b", "B", "b@x.np", "222222");

    // A row from before encryption landed: raw plaintext in the column.
    db.insert_message("a", "b", "plain old message", "2026-01-01T10:00:00Z")
        .unwrap();

    let thread = db.get_thread("b", "a").unwrap();
    assert_eq!(
        codec.decrypt_text(&thread[0].content),
        TextPayload::Fallback("plain old message".to_string())
    );
}

#[test]
fn account_deletion_wipes_both_directions() {
    let db = Database::open_in_memory().unwrap();
    seed(&db, "a", "A", "a@x.np", "111111");
    seed(&db, "b", "B", "b@x.np", "222222");
    seed(&db, "c", "C", "c@x.np", "333333");

    db.insert_message("a", "b", "t1", "2026-01-01T10:00:00Z").unwrap();
    db.insert_message("b", "a", "t2", "2026-01-01T10:01:00Z").unwrap();
    let kept = db.insert_message("b", "c", "t3", "2026-01-01T10:02:00Z").unwrap();

    db.delete_messages_for("a").unwrap();
    db.delete_user("a").unwrap();

    assert!(db.get_thread("b", "a").unwrap().is_empty());
    assert!(db.list_conversations("a").unwrap().is_empty());

    // Unrelated history survives.
    assert!(db.get_message(kept).unwrap().is_some());
    assert_eq!(db.list_conversations("b").unwrap().len(), 1);
}
