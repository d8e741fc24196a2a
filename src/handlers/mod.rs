mod admin;
mod files;
mod health;
mod messages;
mod util;

pub use admin::{grant_admin, list_admins, revoke_admin};
pub use files::{delete_file, download_file, list_files, upload_file};
pub use health::{health_check, me, readiness_check, stats};
pub use messages::{delete_message, get_message, list_messages, send_message};
