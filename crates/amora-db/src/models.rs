//! Database row types — these map directly to SQLite rows.
//! Distinct from the amora-types wire models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub location: Option<String>,
    pub profession: Option<String>,
    pub about: Option<String>,
    pub qualities: Option<String>,
    pub looking_for: Option<String>,
    pub joined: String,
    pub photo: Option<String>,
    pub dob: Option<String>,
    pub show_age: bool,
    pub show_photo: bool,
    pub is_verified: bool,
    pub verification_code: Option<String>,
}

/// Insert payload for signup. Privacy flags take their column defaults.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub location: Option<&'a str>,
    pub profession: Option<&'a str>,
    pub about: Option<&'a str>,
    pub qualities: &'a str,
    pub looking_for: Option<&'a str>,
    pub joined: &'a str,
    pub dob: Option<&'a str>,
    pub verification_code: &'a str,
}

/// Partial profile update. Only these allow-listed fields ever reach the
/// UPDATE statement; anything else a client submits is dropped upstream.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub location: Option<String>,
    pub profession: Option<String>,
    pub about: Option<String>,
    pub qualities: Option<Vec<String>>,
    pub looking_for: Option<String>,
    pub photo: Option<String>,
    pub dob: Option<String>,
    pub show_age: Option<bool>,
    pub show_photo: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.location.is_none()
            && self.profession.is_none()
            && self.about.is_none()
            && self.qualities.is_none()
            && self.looking_for.is_none()
            && self.photo.is_none()
            && self.dob.is_none()
            && self.show_age.is_none()
            && self.show_photo.is_none()
    }
}

pub struct MessageRow {
    pub id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    /// Encrypted token as stored; decryption happens at the API layer.
    pub content: String,
    pub timestamp: String,
    pub is_read: bool,
}

/// One aggregated inbox entry: a counterparty plus the viewer's unread count.
pub struct ConversationRow {
    pub counterparty_id: String,
    pub name: String,
    pub photo: Option<String>,
    pub unread: i64,
    pub last_activity: String,
}

/// Serialize a qualities list for the TEXT column.
pub fn encode_qualities(qualities: &[String]) -> String {
    serde_json::to_string(qualities).unwrap_or_else(|_| "[]".to_string())
}

/// Read a qualities column back. Rows written before the JSON format landed
/// hold comma-separated text; those still parse.
pub fn decode_qualities(raw: Option<&str>) -> Vec<String> {
    let raw = match raw {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Vec::new(),
    };

    if let Ok(list) = serde_json::from_str::<Vec<String>>(raw) {
        return list;
    }

    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
