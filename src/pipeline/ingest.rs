//! Ingest: persist an upload verbatim under its declared filename.
//!
//! Bytes are written to a temporary file inside the upload directory and
//! renamed over `<upload_dir>/<filename>`, so a reader never sees a
//! half-written upload. Two uploads with the same name still race; the last
//! rename wins.

use crate::error::StampError;
use crate::output::{StagedUpload, UploadedAsset};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Check that `name` can be used as a file name inside a flat directory.
///
/// Only rejects what would escape the directory; everything else (case,
/// spaces, unicode, missing extension) is kept as-is.
pub fn validate_filename(name: &str) -> Result<(), StampError> {
    let invalid = |reason| StampError::InvalidFilename {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(StampError::EmptyFilename);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(invalid("path separators are not allowed"));
    }
    if name == "." || name == ".." {
        return Err(invalid("relative path components are not allowed"));
    }
    if name.contains('\0') {
        return Err(invalid("NUL bytes are not allowed"));
    }
    Ok(())
}

/// Write `upload` to `<upload_dir>/<filename>`, replacing any previous file.
///
/// `None` means the request carried no file; nothing is written.
pub fn stage_upload(
    upload_dir: &Path,
    upload: Option<&UploadedAsset>,
) -> Result<StagedUpload, StampError> {
    let asset = upload.ok_or(StampError::MissingFile)?;
    validate_filename(&asset.filename)?;

    let path = upload_dir.join(&asset.filename);
    let write_failed = |source| StampError::StagingWriteFailed {
        path: path.clone(),
        source,
    };

    let mut tmp = NamedTempFile::new_in(upload_dir).map_err(write_failed)?;
    tmp.write_all(&asset.bytes).map_err(write_failed)?;
    tmp.flush().map_err(write_failed)?;
    tmp.persist(&path).map_err(|e| write_failed(e.error))?;

    debug!("Staged {} bytes → {}", asset.bytes.len(), path.display());

    Ok(StagedUpload {
        path,
        filename: asset.filename.clone(),
        bytes_written: asset.bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        for name in ["a.png", "Holiday Photo.JPG", "no_extension", "café.png", ".hidden.png"] {
            validate_filename(name).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn rejects_empty_name_as_no_selected_file() {
        assert!(matches!(validate_filename(""), Err(StampError::EmptyFilename)));
    }

    #[test]
    fn rejects_traversal() {
        for name in ["../a.png", "a/b.png", "..\\a.png", "..", ".", "a\0.png"] {
            let err = validate_filename(name).unwrap_err();
            assert!(err.is_invalid_input(), "{name:?} gave {err}");
        }
    }

    #[test]
    fn missing_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let err = stage_upload(dir.path(), None).unwrap_err();
        assert!(matches!(err, StampError::MissingFile));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn stages_bytes_verbatim_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let first = UploadedAsset::new("a.png", b"first".to_vec());
        let staged = stage_upload(dir.path(), Some(&first)).unwrap();
        assert_eq!(staged.path, dir.path().join("a.png"));
        assert_eq!(staged.bytes_written, 5);
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"first");

        let second = UploadedAsset::new("a.png", b"second!".to_vec());
        stage_upload(dir.path(), Some(&second)).unwrap();
        assert_eq!(std::fs::read(&staged.path).unwrap(), b"second!");

        // No temp files left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_is_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("nope");
        let asset = UploadedAsset::new("a.png", b"x".to_vec());
        let err = stage_upload(&gone, Some(&asset)).unwrap_err();
        assert!(matches!(err, StampError::StagingWriteFailed { .. }));
        assert!(!err.is_invalid_input());
    }
}
