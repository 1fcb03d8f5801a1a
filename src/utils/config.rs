//! Application configuration constants.
//! Defaults and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    config_filename: String,
    feed_dir_name: String,
    env_key: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                config_filename: format!("{pkg}.toml"),
                feed_dir_name: format!("{pkg}-feeds"),
                env_key: format!("{}_DB_KEY", pkg.to_uppercase()),
            }
        })
    }

    /// Default settings file, looked up in the working directory.
    pub fn config_filename(&self) -> &str {
        &self.config_filename
    }

    /// Default output directory for feed batch files.
    pub fn feed_dir_name(&self) -> &str {
        &self.feed_dir_name
    }

    /// Environment variable holding the SQLCipher passphrase.
    pub fn env_key(&self) -> &str {
        &self.env_key
    }
}

// ---- Source database ----

pub struct SourceConsts;

impl SourceConsts {
    /// Wait this long on a locked database before failing a read.
    pub const BUSY_TIMEOUT_MS: u64 = 5_000;
}

// ---- Feed / batching ----

pub struct FeedConsts;

impl FeedConsts {
    /// Records per delivered batch.
    pub const DEFAULT_MAX_IDS_PER_BATCH: usize = 5_000;
    /// Result column whose value `delete` marks a record for removal; empty disables.
    pub const DEFAULT_ACTION_COLUMN: &'static str = "";
    /// Result column tracked by incremental passes.
    pub const DEFAULT_CHANGE_TRACKING_COLUMN: &'static str = "CHANGE_TIMESTAMP";
    /// Action value that removes a document from the index.
    pub const DELETE_ACTION: &'static str = "delete";
    /// Seconds between incremental passes in watch mode.
    pub const DEFAULT_WATCH_INTERVAL_SECS: u64 = 900;
}

// ---- Access control ----

pub struct AclConsts;

impl AclConsts {
    pub const PERMIT_USERS: &'static str = "PERMIT_USERS";
    pub const DENY_USERS: &'static str = "DENY_USERS";
    pub const PERMIT_GROUPS: &'static str = "PERMIT_GROUPS";
    pub const DENY_GROUPS: &'static str = "DENY_GROUPS";
    pub const DEFAULT_DELIMITER: &'static str = ",";
    pub const DEFAULT_NAMESPACE: &'static str = "Default";
}

// ---- Content ----

pub struct ContentConsts;

impl ContentConsts {
    /// File size above which filepath content is memory-mapped (bytes). 64 MB.
    pub const MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;
    pub const TEXT_CONTENT_TYPE: &'static str = "text/plain; charset=utf-8";
    pub const BINARY_CONTENT_TYPE: &'static str = "application/octet-stream";
}

// ---- Progress ----

/// Records between progress bar refreshes (reduce lock and redraw cost).
pub const PROGRESS_UPDATE_BATCH_SIZE: usize = 100;
