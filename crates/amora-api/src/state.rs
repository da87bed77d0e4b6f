use std::path::PathBuf;
use std::sync::Arc;

use amora_crypto::Codec;
use amora_db::Database;

use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub codec: Codec,
    pub mailer: Mailer,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}
