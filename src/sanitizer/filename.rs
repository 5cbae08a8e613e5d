use std::io;
use std::path::{Path, PathBuf};

use super::{SanitizationError, SanitizationErrorKind, Sanitizer, ValidationResult};
use crate::{Tainted, Verified};

/// A file inside the upload root, resolved and checked by [`FilenameSanitizer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPath {
    path: PathBuf,
    file_name: String,
}

impl UploadPath {
    /// Canonical absolute path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sanitized final segment the caller asked for.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Confines user-supplied filenames to a single directory.
///
/// 1. Keep only the last segment after splitting on `/` and `\`, and reject
///    it if it is empty, `.`, contains `..`, or contains NUL.
/// 2. Join it to the canonical upload root.
/// 3. Canonicalize the result (following symlinks) and require it to be a
///    regular file whose path starts with the root.
///
/// Every failure, including a missing file, is reported as `PathEscape` so
/// the response does not reveal which files exist.
#[derive(Debug, Clone)]
pub struct FilenameSanitizer {
    root: PathBuf,
}

impl FilenameSanitizer {
    /// Creates a sanitizer for `root`, which must already exist.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from canonicalizing `root`.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = std::fs::canonicalize(root)?;
        Ok(Self { root })
    }

    /// Canonical upload root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn final_segment(raw: &str) -> Option<&str> {
        let segment = raw.rsplit(['/', '\\']).next().unwrap_or_default();

        let forbidden = segment.is_empty()
            || segment == "."
            || segment.contains("..")
            || segment.contains('\0');

        (!forbidden).then_some(segment)
    }

    fn escape(message: &'static str) -> SanitizationError {
        SanitizationError::new(SanitizationErrorKind::PathEscape, message)
    }
}

impl Sanitizer<String> for FilenameSanitizer {
    type Output = UploadPath;

    fn sanitize(&self, input: Tainted<String>) -> ValidationResult<UploadPath> {
        let raw = input.into_inner();

        let segment =
            Self::final_segment(&raw).ok_or_else(|| Self::escape("invalid file name"))?;

        let joined = self.root.join(segment);
        let resolved =
            std::fs::canonicalize(&joined).map_err(|_| Self::escape("file not available"))?;

        if !resolved.starts_with(&self.root) || !resolved.is_file() {
            return Err(Self::escape("file not available"));
        }

        Ok(Verified::new_unchecked(UploadPath {
            path: resolved,
            file_name: segment.to_string(),
        }))
    }
}
