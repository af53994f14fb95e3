//! Supported document formats and folder discovery.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Extensions accepted by the OCR service, with their MIME types.
const SUPPORTED: [(&str, &str); 7] = [
    ("pdf", "application/pdf"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("avif", "image/avif"),
];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// MIME type for a supported file, `None` otherwise.
pub fn mime_type(path: &Path) -> Option<&'static str> {
    let ext = extension(path)?;
    SUPPORTED
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

pub fn is_supported(path: &Path) -> bool {
    mime_type(path).is_some()
}

pub fn is_image(path: &Path) -> bool {
    mime_type(path).is_some_and(|mime| mime.starts_with("image/"))
}

/// File name for display and result naming; falls back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Supported files directly inside `folder`, sorted by path.
pub fn discover(folder: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read folder: {:?}", folder))?
    {
        let path = entry?.path();
        if path.is_file() && is_supported(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_type_case_insensitive() {
        assert_eq!(mime_type(Path::new("a.PDF")), Some("application/pdf"));
        assert_eq!(mime_type(Path::new("scan.Jpeg")), Some("image/jpeg"));
        assert_eq!(mime_type(Path::new("notes.txt")), None);
        assert_eq!(mime_type(Path::new("no_extension")), None);
    }

    #[test]
    fn test_is_image() {
        assert!(is_image(Path::new("receipt.png")));
        assert!(is_image(Path::new("photo.avif")));
        assert!(!is_image(Path::new("slides.pptx")));
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.pdf", "a.PNG", "readme.txt", "c.docx"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = discover(dir.path())
            .unwrap()
            .iter()
            .map(|p| display_name(p))
            .collect();
        assert_eq!(names, vec!["a.PNG", "b.pdf", "c.docx"]);
    }

    #[test]
    fn test_discover_missing_folder() {
        assert!(discover(Path::new("/definitely/not/here")).is_err());
    }
}
