//! Small filesystem helpers shared by the pipeline stages.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Replaces spaces and special characters in a filename with underscores,
/// collapsing runs of them. The directory part is left untouched.
pub fn sanitize_filename(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let special = Regex::new(r"[^\w\-]").unwrap();
    let runs = Regex::new(r"_+").unwrap();
    let clean = runs
        .replace_all(&special.replace_all(&stem, "_"), "_")
        .to_string();

    match path.parent() {
        Some(parent) => parent.join(format!("{}{}", clean, ext)),
        None => PathBuf::from(format!("{}{}", clean, ext)),
    }
}

/// Lowercase, underscore-joined slug used for the run directory name.
pub fn slugify(name: &str) -> String {
    let special = Regex::new(r"[^\w]+").unwrap();
    special
        .replace_all(name.trim(), "_")
        .to_lowercase()
        .trim_matches('_')
        .to_string()
}

/// Cheap sanity check that a produced file looks like a usable image:
/// it exists, is not a truncated stub, and carries an image extension.
pub fn validate_image_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if meta.len() < 1024 {
        return false;
    }
    matches!(
        path.extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .as_deref(),
        Some("jpg") | Some("jpeg") | Some("png")
    )
}
