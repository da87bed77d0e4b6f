use crate::Database;
use crate::models::{ConversationRow, MessageRow, NewUser, ProfileUpdate, UserRow};
use anyhow::Result;
use rusqlite::{Row, types::Value};

const USER_COLUMNS: &str = "id, name, email, password, location, profession, about, qualities, \
     looking_for, joined, photo, dob, show_age, show_photo, is_verified, verification_code";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, location, profession, about, \
                 qualities, looking_for, joined, dob, verification_code, is_verified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.location,
                    user.profession,
                    user.about,
                    user.qualities,
                    user.looking_for,
                    user.joined,
                    user.dob,
                    user.verification_code,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([email], user_from_row).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_row([id], user_from_row).optional()
        })
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users ORDER BY joined", USER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Store a fresh verification code for an unverified account.
    pub fn set_verification_code(&self, email: &str, code: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE users SET verification_code = ?1 WHERE email = ?2",
                rusqlite::params![code, email],
            )?;
            Ok(changes)
        })
    }

    /// Flip the account to verified. The code is cleared in the same
    /// statement — the two columns never drift apart.
    pub fn mark_verified(&self, email: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE users SET is_verified = 1, verification_code = NULL WHERE email = ?1",
                [email],
            )?;
            Ok(changes)
        })
    }

    /// Apply a partial profile update. Column names come from the allow-list
    /// below, never from the request; only values are bound.
    /// Returns the number of rows affected (0 = no such user).
    pub fn update_user_profile(&self, id: &str, update: &ProfileUpdate) -> Result<usize> {
        let mut fields: Vec<(&str, Value)> = Vec::new();
        if let Some(v) = &update.name {
            fields.push(("name", Value::Text(v.clone())));
        }
        if let Some(v) = &update.location {
            fields.push(("location", Value::Text(v.clone())));
        }
        if let Some(v) = &update.profession {
            fields.push(("profession", Value::Text(v.clone())));
        }
        if let Some(v) = &update.about {
            fields.push(("about", Value::Text(v.clone())));
        }
        if let Some(v) = &update.qualities {
            fields.push(("qualities", Value::Text(crate::models::encode_qualities(v))));
        }
        if let Some(v) = &update.looking_for {
            fields.push(("looking_for", Value::Text(v.clone())));
        }
        if let Some(v) = &update.photo {
            fields.push(("photo", Value::Text(v.clone())));
        }
        if let Some(v) = &update.dob {
            fields.push(("dob", Value::Text(v.clone())));
        }
        if let Some(v) = update.show_age {
            fields.push(("show_age", Value::Integer(v as i64)));
        }
        if let Some(v) = update.show_photo {
            fields.push(("show_photo", Value::Integer(v as i64)));
        }

        if fields.is_empty() {
            return Ok(0);
        }

        let set_clause = fields
            .iter()
            .enumerate()
            .map(|(i, (col, _))| format!("{} = ?{}", col, i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE users SET {} WHERE id = ?{}",
            set_clause,
            fields.len() + 1
        );

        let id = id.to_string();
        self.with_conn_mut(|conn| {
            let mut params: Vec<&dyn rusqlite::types::ToSql> =
                fields.iter().map(|(_, v)| v as &dyn rusqlite::types::ToSql).collect();
            params.push(&id);

            let changes = conn.execute(&sql, params.as_slice())?;
            Ok(changes)
        })
    }

    pub fn delete_user(&self, id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changes)
        })
    }

    // -- Messages --

    /// Insert a message (content already encrypted) and return its rowid.
    pub fn insert_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        timestamp: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO messages (sender_id, receiver_id, content, timestamp) \
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender_id, receiver_id, content, timestamp],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, content, timestamp, is_read \
                 FROM messages WHERE id = ?1",
            )?;
            stmt.query_row([id], message_from_row).optional()
        })
    }

    /// All messages between two parties, oldest first.
    pub fn get_thread(&self, viewer_id: &str, other_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, sender_id, receiver_id, content, timestamp, is_read
                 FROM messages
                 WHERE (sender_id = ?1 AND receiver_id = ?2)
                    OR (sender_id = ?2 AND receiver_id = ?1)
                 ORDER BY timestamp, id",
            )?;
            let rows = stmt
                .query_map([viewer_id, other_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark everything `other_id` sent the viewer as read.
    /// Returns how many rows flipped.
    pub fn mark_thread_read(&self, viewer_id: &str, other_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "UPDATE messages SET is_read = 1 \
                 WHERE sender_id = ?1 AND receiver_id = ?2 AND is_read = 0",
                [other_id, viewer_id],
            )?;
            Ok(changes)
        })
    }

    /// Distinct counterparties of the viewer with per-counterparty unread
    /// counts, newest conversation first. Computed on demand — the inbox is
    /// never materialized.
    pub fn list_conversations(&self, viewer_id: &str) -> Result<Vec<ConversationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.name, u.photo,
                        SUM(CASE WHEN m.receiver_id = ?1 AND m.is_read = 0 THEN 1 ELSE 0 END),
                        MAX(m.timestamp)
                 FROM messages m
                 JOIN users u
                   ON u.id = CASE WHEN m.sender_id = ?1 THEN m.receiver_id ELSE m.sender_id END
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 GROUP BY u.id, u.name, u.photo
                 ORDER BY MAX(m.timestamp) DESC, u.id",
            )?;
            let rows = stmt
                .query_map([viewer_id], |row| {
                    Ok(ConversationRow {
                        counterparty_id: row.get(0)?,
                        name: row.get(1)?,
                        photo: row.get(2)?,
                        unread: row.get(3)?,
                        last_activity: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Total unread addressed to the viewer, across all senders.
    pub fn unread_total(&self, viewer_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE receiver_id = ?1 AND is_read = 0",
                [viewer_id],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Wipe both directions of a user's message history.
    pub fn delete_messages_for(&self, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let changes = conn.execute(
                "DELETE FROM messages WHERE sender_id = ?1 OR receiver_id = ?1",
                [user_id],
            )?;
            Ok(changes)
        })
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        location: row.get(4)?,
        profession: row.get(5)?,
        about: row.get(6)?,
        qualities: row.get(7)?,
        looking_for: row.get(8)?,
        joined: row.get(9)?,
        photo: row.get(10)?,
        dob: row.get(11)?,
        show_age: row.get::<_, Option<i64>>(12)?.unwrap_or(1) != 0,
        show_photo: row.get::<_, Option<i64>>(13)?.unwrap_or(1) != 0,
        is_verified: row.get::<_, Option<i64>>(14)?.unwrap_or(0) != 0,
        verification_code: row.get(15)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        timestamp: row.get(4)?,
        is_read: row.get::<_, i64>(5)? != 0,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn seed_user(db: &Database, id: &str, name: &str, email: &str) {
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
            verification_code: "123456",
        })
        .unwrap();
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        seed_user(&db, "u1", "Aarav", "aarav@x.np");

        let err = db.create_user(&NewUser {
            id: "u2",
            name: "Other",
            email: "aarav@x.np",
            password_hash: "$argon2id$stub",
            location: None,
            profession: None,
            about: None,
            qualities: "[]",
            looking_for: None,
            joined: "2026-01-02T00:00:00Z",
            dob: None,
            verification_code: "654321",
        });
        assert!(err.is_err());

        // No second row appeared.
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn verification_clears_the_code() {
        let db = db();
        seed_user(&db, "u1", "Aarav", "aarav@x.np");

        let user = db.get_user_by_email("aarav@x.np").unwrap().unwrap();
        assert!(!user.is_verified);
        assert_eq!(user.verification_code.as_deref(), Some("123456"));

        assert_eq!(db.mark_verified("aarav@x.np").unwrap(), 1);

        let user = db.get_user_by_email("aarav@x.np").unwrap().unwrap();
        assert!(user.is_verified);
        assert!(user.verification_code.is_none());
    }

    #[test]
    fn resend_replaces_the_stored_code() {
        let db = db();
        seed_user(&db, "u1", "Aarav", "aarav@x.np");

        assert_eq!(db.set_verification_code("aarav@x.np", "987654").unwrap(), 1);
        let user = db.get_user_by_email("aarav@x.np").unwrap().unwrap();
        assert_eq!(user.verification_code.as_deref(), Some("987654"));

        // Unknown email touches nothing.
        assert_eq!(db.set_verification_code("ghost@x.np", "111111").unwrap(), 0);
    }

    #[test]
    fn thread_is_ordered_and_read_marking_counts() {
        let db = db();
        seed_user(&db, "a", "A", "a@x.np");
        seed_user(&db, "b", "B", "b@x.np");

        db.insert_message("a", "b", "tok1", "2026-01-01T10:00:00Z").unwrap();
        db.insert_message("b", "a", "tok2", "2026-01-01T10:01:00Z").unwrap();
        db.insert_message("a", "b", "tok3", "2026-01-01T10:02:00Z").unwrap();

        let thread = db.get_thread("b", "a").unwrap();
        assert_eq!(thread.len(), 3);
        assert_eq!(thread[0].content, "tok1");
        assert_eq!(thread[2].content, "tok3");
        assert!(thread.iter().all(|m| !m.is_read));

        assert_eq!(db.unread_total("b").unwrap(), 2);

        // B reads the thread with A: exactly A→B messages flip.
        assert_eq!(db.mark_thread_read("b", "a").unwrap(), 2);
        assert_eq!(db.unread_total("b").unwrap(), 0);
        assert_eq!(db.unread_total("a").unwrap(), 1);

        // Second pass flips nothing.
        assert_eq!(db.mark_thread_read("b", "a").unwrap(), 0);

        let thread = db.get_thread("b", "a").unwrap();
        assert!(thread.iter().filter(|m| m.sender_id == "a").all(|m| m.is_read));
    }

    #[test]
    fn conversations_aggregate_and_order_by_recency() {
        let db = db();
        seed_user(&db, "v", "Viewer", "v@x.np");
        seed_user(&db, "x", "Xena", "x@x.np");
        seed_user(&db, "y", "Yuri", "y@x.np");
        seed_user(&db, "z", "Zoe", "z@x.np");

        db.insert_message("x", "v", "m1", "2026-01-01T09:00:00Z").unwrap();
        db.insert_message("x", "v", "m2", "2026-01-01T09:05:00Z").unwrap();
        db.insert_message("v", "y", "m3", "2026-01-01T09:10:00Z").unwrap();

        let convs = db.list_conversations("v").unwrap();
        assert_eq!(convs.len(), 2); // z never messaged: absent

        // Most recent exchange first.
        assert_eq!(convs[0].counterparty_id, "y");
        assert_eq!(convs[0].unread, 0); // v sent it; nothing unread for v
        assert_eq!(convs[1].counterparty_id, "x");
        assert_eq!(convs[1].unread, 2);
        assert_eq!(convs[1].name, "Xena");
        assert_eq!(convs[1].last_activity, "2026-01-01T09:05:00Z");
    }

    #[test]
    fn deleting_a_user_cascades_to_messages() {
        let db = db();
        seed_user(&db, "a", "A", "a@x.np");
        seed_user(&db, "b", "B", "b@x.np");

        let mid = db.insert_message("a", "b", "tok", "2026-01-01T10:00:00Z").unwrap();
        db.insert_message("b", "a", "tok", "2026-01-01T10:01:00Z").unwrap();

        db.delete_messages_for("a").unwrap();
        assert_eq!(db.delete_user("a").unwrap(), 1);

        assert!(db.get_message(mid).unwrap().is_none());
        assert!(db.get_thread("b", "a").unwrap().is_empty());
        assert_eq!(db.unread_total("b").unwrap(), 0);
    }

    #[test]
    fn partial_update_touches_only_named_columns() {
        let db = db();
        seed_user(&db, "u1", "Aarav", "aarav@x.np");

        let update = ProfileUpdate {
            location: Some("Kathmandu".to_string()),
            show_age: Some(false),
            qualities: Some(vec!["Honest".to_string()]),
            ..ProfileUpdate::default()
        };
        assert_eq!(db.update_user_profile("u1", &update).unwrap(), 1);

        let user = db.get_user_by_id("u1").unwrap().unwrap();
        assert_eq!(user.location.as_deref(), Some("Kathmandu"));
        assert!(!user.show_age);
        assert_eq!(user.name, "Aarav");
        assert_eq!(
            crate::models::decode_qualities(user.qualities.as_deref()),
            vec!["Honest".to_string()]
        );

        // Unknown id: zero rows.
        assert_eq!(db.update_user_profile("ghost", &update).unwrap(), 0);

        // Empty field set: no-op.
        assert_eq!(
            db.update_user_profile("u1", &ProfileUpdate::default()).unwrap(),
            0
        );
    }
}
