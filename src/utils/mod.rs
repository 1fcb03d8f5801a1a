pub mod config;
pub mod logger;
pub mod passphrase;
pub mod settings;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use passphrase::get_passphrase;
pub use settings::{Settings, SettingsOverrides};
