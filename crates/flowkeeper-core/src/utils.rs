//! Shared utility functions for Flowkeeper crates

use camino::Utf8PathBuf;

/// Get the user's home directory
///
/// Prefers the HOME environment variable over `dirs::home_dir()` so that
/// containerised Node-RED installs with a remapped HOME resolve the same
/// directories as the shell scripts that launch them.
pub fn get_home_dir() -> Option<Utf8PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        if !home.is_empty() {
            return Some(Utf8PathBuf::from(home));
        }
    }

    dirs::home_dir().and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
}

/// Formats bytes as a human-readable string.
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.2} {}", size, UNITS[unit_index])
    }
}
