use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Temporary sibling used while writing `path`.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "feed".to_string());
    path.parent()
        .unwrap_or(Path::new("."))
        .join(format!(".{name}.tmp"))
}

/// Write `bytes` to a temp file next to `path`, fsync, then rename over `path`.
/// Readers never observe a partially written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let temp = temp_path_for(path);
    let result = (|| {
        let mut file = fs::File::create(&temp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&temp, path)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}
