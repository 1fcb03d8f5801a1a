//! `rowfeed.toml` settings. The library takes a [`Settings`]; the CLI loads it from disk
//! and applies flag overrides on top.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::utils::config::{AclConsts, FeedConsts};

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub database: DatabaseSection,
    pub key: KeySection,
    #[serde(default)]
    pub sql: SqlSection,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub metadata: MetadataSection,
    #[serde(default)]
    pub acl: AclSection,
    pub mode: ModeSection,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    /// SQLite file. Relative paths are resolved against the settings file's directory.
    pub path: PathBuf,
    /// SQLCipher-encrypted; the passphrase is read at startup.
    #[serde(default)]
    pub encrypted: bool,
    /// Read each result fully before handing rows over.
    #[serde(default)]
    pub disable_streaming: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeySection {
    /// `name[:type], ...`
    pub columns: String,
    #[serde(default)]
    pub doc_id_is_url: bool,
    #[serde(default)]
    pub content_sql_columns: String,
    #[serde(default)]
    pub acl_sql_columns: String,
    #[serde(default)]
    pub metadata_sql_columns: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SqlSection {
    #[serde(default)]
    pub every_doc_id: String,
    /// Incremental query; its single `?` receives the watermark.
    #[serde(default)]
    pub update: String,
    #[serde(default)]
    pub single_doc_content: String,
    #[serde(default)]
    pub acl: String,
    #[serde(default)]
    pub metadata: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedSection {
    pub max_ids_per_batch: usize,
    /// Where feed files are written. Default: `rowfeed-feeds` next to the settings file.
    pub output_dir: Option<PathBuf>,
    pub action_column: String,
    pub change_tracking_column: String,
    /// `+HH:MM` offset used to read and bind naive timestamps. Blank is UTC.
    pub timestamp_offset: String,
    pub watch_interval_secs: u64,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            max_ids_per_batch: FeedConsts::DEFAULT_MAX_IDS_PER_BATCH,
            output_dir: None,
            action_column: FeedConsts::DEFAULT_ACTION_COLUMN.to_string(),
            change_tracking_column: FeedConsts::DEFAULT_CHANGE_TRACKING_COLUMN.to_string(),
            timestamp_offset: String::new(),
            watch_interval_secs: FeedConsts::DEFAULT_WATCH_INTERVAL_SECS,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataSection {
    /// `column[:key], ...`
    pub columns: String,
    pub include_all_columns: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AclSection {
    /// Literal separator between principal names in one cell, not a regular expression.
    /// Empty keeps the whole cell as one name.
    pub principal_delimiter: String,
    pub namespace: String,
    pub permit_users_column: String,
    pub deny_users_column: String,
    pub permit_groups_column: String,
    pub deny_groups_column: String,
}

impl Default for AclSection {
    fn default() -> Self {
        Self {
            principal_delimiter: AclConsts::DEFAULT_DELIMITER.to_string(),
            namespace: AclConsts::DEFAULT_NAMESPACE.to_string(),
            permit_users_column: AclConsts::PERMIT_USERS.to_string(),
            deny_users_column: AclConsts::DENY_USERS.to_string(),
            permit_groups_column: AclConsts::PERMIT_GROUPS.to_string(),
            deny_groups_column: AclConsts::DENY_GROUPS.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeSection {
    pub name: String,
    pub column_name: Option<String>,
    pub content_type_override: Option<String>,
    pub content_type_col: Option<String>,
}

/// Flag values that take precedence over the file. `None` keeps the file value.
#[derive(Clone, Debug, Default)]
pub struct SettingsOverrides {
    pub max_ids_per_batch: Option<usize>,
    pub disable_streaming: Option<bool>,
    pub output_dir: Option<PathBuf>,
    pub watch_interval_secs: Option<u64>,
}

/// Overwrite a settings field when the override is present.
macro_rules! apply_override {
    ($over:expr, $section:expr, $field:ident) => {
        if let Some(v) = $over.$field.clone() {
            $section.$field = v;
        }
    };
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Settings> {
        toml::from_str(s).map_err(|e| Error::config(format!("invalid settings: {e}")))
    }

    /// Read settings from `path`; relative database and output paths are anchored at its directory.
    pub fn load(path: &Path) -> Result<Settings> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read settings {}", path.display()), e))?;
        let mut settings: Settings = toml::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))?;
        let base = path.parent().unwrap_or(Path::new("."));
        if settings.database.path.is_relative() {
            settings.database.path = base.join(&settings.database.path);
        }
        if let Some(dir) = settings.feed.output_dir.as_mut()
            && dir.is_relative()
        {
            *dir = base.join(&*dir);
        }
        Ok(settings)
    }

    pub fn apply_overrides(&mut self, over: &SettingsOverrides) {
        apply_override!(over, self.feed, max_ids_per_batch);
        apply_override!(over, self.database, disable_streaming);
        apply_override!(over, self.feed, watch_interval_secs);
        if let Some(dir) = &over.output_dir {
            self.feed.output_dir = Some(dir.clone());
        }
    }
}
