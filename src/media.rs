//! Screenshot discovery for `--latest-screenshot`

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Screenshot folders in lookup order; the first existing one wins
fn screenshot_dirs() -> Vec<PathBuf> {
    let Some(home) = dirs::home_dir() else {
        return Vec::new();
    };
    vec![
        home.join("Pictures").join("Screenshots"),
        home.join("Pictures"),
    ]
}

/// Newest screenshot by modification time, or `None` if no folder or no
/// image file exists
pub fn latest_screenshot() -> Option<PathBuf> {
    let dir = screenshot_dirs().into_iter().find(|d| d.is_dir())?;
    newest_image_in(&dir)
}

fn newest_image_in(dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;

    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
            .unwrap_or(false);
        if !path.is_file() || !is_image {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };

        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }

    if let Some((_, path)) = &newest {
        debug!("Latest screenshot: {}", path.display());
    }
    newest.map(|(_, path)| path)
}
