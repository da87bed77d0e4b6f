use anyhow::Result;
use rusqlite::Connection;
use tracing::{debug, info};

/// Additive column migrations. Older deployments predate the privacy flags
/// and verification columns; re-running an ALTER on a current schema is
/// expected and its "duplicate column" error is swallowed.
const COLUMN_ADDS: &[&str] = &[
    "ALTER TABLE users ADD COLUMN show_age INTEGER DEFAULT 1",
    "ALTER TABLE users ADD COLUMN show_photo INTEGER DEFAULT 1",
    "ALTER TABLE users ADD COLUMN is_verified INTEGER DEFAULT 0",
    "ALTER TABLE users ADD COLUMN verification_code TEXT",
];

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            location    TEXT,
            profession  TEXT,
            about       TEXT,
            qualities   TEXT,
            looking_for TEXT,
            joined      TEXT NOT NULL,
            photo       TEXT,
            dob         TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            sender_id   TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            receiver_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content     TEXT NOT NULL,
            timestamp   TEXT NOT NULL,
            is_read     INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_messages_receiver
            ON messages(receiver_id, is_read);

        CREATE INDEX IF NOT EXISTS idx_messages_pair
            ON messages(sender_id, receiver_id);
        ",
    )?;

    for sql in COLUMN_ADDS {
        if let Err(e) = conn.execute(sql, []) {
            if !e.to_string().contains("duplicate column") {
                return Err(e.into());
            }
            debug!("Skipping migration (column exists): {}", sql);
        }
    }

    info!("Database migrations complete");
    Ok(())
}
