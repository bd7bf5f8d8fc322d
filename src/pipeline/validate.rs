//! Pre-flight checks on an uploaded document.
//!
//! Nothing here touches the file contents; checks run on the name, the
//! byte length and the declared MIME type. A failure means the model must
//! not be called.

use crate::error::ValidationError;
use std::path::Path;

/// Extensions the pipeline can hand to the model.
pub const ALLOWED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "pdf"];

/// Lower-cased extension of `file_name`.
pub fn file_extension(file_name: &str) -> Result<String, ValidationError> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| ValidationError::MissingExtension {
            file_name: file_name.to_string(),
        })
}

pub fn validate_extension(ext: &str) -> Result<(), ValidationError> {
    let ext = ext.to_ascii_lowercase();
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedExtension {
            extension: ext,
            allowed: ALLOWED_EXTENSIONS.join(", "),
        })
    }
}

/// `0 < size <= max`.
pub fn validate_size(file_name: &str, size: u64, max: u64) -> Result<(), ValidationError> {
    if size == 0 {
        return Err(ValidationError::EmptyFile {
            file_name: file_name.to_string(),
        });
    }
    if size > max {
        return Err(ValidationError::FileTooLarge { size, max });
    }
    Ok(())
}

/// Strip parameters (`image/jpeg; charset=binary` → `image/jpeg`) and lower-case.
pub fn normalize_mime_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or(declared)
        .trim()
        .to_ascii_lowercase()
}

/// Check a declared MIME type against the upload allow-list.
pub fn validate_mime_type(declared: &str, allowed: &[String]) -> Result<(), ValidationError> {
    let normalized = normalize_mime_type(declared);
    if allowed.iter().any(|a| a.eq_ignore_ascii_case(&normalized)) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedMimeType {
            mime_type: declared.to_string(),
        })
    }
}

/// Extraction-stage validation: extension, then size.
///
/// Returns the lower-cased extension on success.
pub fn validate_document(file_name: &str, size: u64, max: u64) -> Result<String, ValidationError> {
    let ext = file_extension(file_name)?;
    validate_extension(&ext)?;
    validate_size(file_name, size, max)?;
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: u64 = 20 * 1024 * 1024;

    #[test]
    fn accepts_every_allowed_extension() {
        for ext in ALLOWED_EXTENSIONS {
            let name = format!("scan.{ext}");
            assert_eq!(validate_document(&name, 10, MAX).unwrap(), ext);
        }
    }

    #[test]
    fn extension_is_case_insensitive() {
        assert_eq!(validate_document("SCAN.JPG", 10, MAX).unwrap(), "jpg");
    }

    #[test]
    fn rejects_other_extensions() {
        for name in ["cv.docx", "id.tiff", "payload.exe", "archive.tar.gz", "notes.txt"] {
            let err = validate_document(name, 10, MAX).unwrap_err();
            assert!(
                matches!(err, ValidationError::UnsupportedExtension { .. }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn rejects_missing_extension() {
        assert!(matches!(
            validate_document("passport", 10, MAX),
            Err(ValidationError::MissingExtension { .. })
        ));
        assert!(matches!(
            validate_document(".png", 10, MAX),
            Err(ValidationError::MissingExtension { .. })
        ));
    }

    #[test]
    fn zero_bytes_fails_for_any_extension() {
        for name in ["a.png", "a.pdf", "a.webp"] {
            assert!(matches!(
                validate_document(name, 0, MAX),
                Err(ValidationError::EmptyFile { .. })
            ));
        }
        assert!(validate_document("a.docx", 0, MAX).is_err());
    }

    #[test]
    fn size_ceiling_is_inclusive() {
        assert!(validate_size("a.png", MAX, MAX).is_ok());
        assert_eq!(
            validate_size("a.png", MAX + 1, MAX),
            Err(ValidationError::FileTooLarge {
                size: MAX + 1,
                max: MAX
            })
        );
    }

    #[test]
    fn mime_allow_list() {
        let allowed: Vec<String> = ["image/jpeg", "image/png", "application/pdf"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(validate_mime_type("image/jpeg", &allowed).is_ok());
        assert!(validate_mime_type("Image/PNG; charset=binary", &allowed).is_ok());
        assert!(validate_mime_type("application/pdf", &allowed).is_ok());

        let err = validate_mime_type("image/gif", &allowed).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedMimeType {
                mime_type: "image/gif".into()
            }
        );
        assert!(validate_mime_type("text/plain", &allowed).is_err());
    }
}
