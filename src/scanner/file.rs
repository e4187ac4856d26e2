//! Signature inspection of a single local file.

use crate::core::error::Error;
use crate::core::types::CommandResponse;
use crate::detection::signature::ByteSignature;
use crate::scanner::target::validate_target;
use std::path::Path;

pub const MSG_INVALID_SIGNATURE: &str = "invalid signature";

/// Searches local files for byte signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileInspector;

impl FileInspector {
    /// Create a new inspector.
    pub fn new() -> Self {
        Self
    }

    /// Inspect `file_path` for every occurrence of `signature_hex`.
    ///
    /// Validation failures and unreadable files come back as error responses;
    /// no match is a successful response with no offsets.
    pub fn inspect(&self, file_path: &str, signature_hex: &str) -> CommandResponse {
        let path = match validate_target(file_path) {
            Ok(path) => path,
            Err(reason) => {
                log::debug!("Rejected inspect target {:?}: {}", file_path, reason);
                return CommandResponse::error(reason.message());
            }
        };

        let signature = match ByteSignature::from_hex(signature_hex) {
            Ok(signature) => signature,
            Err(e) => {
                log::warn!("{}", e);
                return CommandResponse::error(MSG_INVALID_SIGNATURE);
            }
        };
        if signature.is_empty() {
            log::debug!("Empty signature for {:?}; nothing can match", path);
        }

        match Self::scan_file(&path, &signature) {
            Ok(offsets) => {
                log::info!(
                    "Signature {} found {} time(s) in {:?}",
                    signature,
                    offsets.len(),
                    path
                );
                CommandResponse::Offsets(offsets)
            }
            Err(e) => {
                log::error!("{}", e);
                CommandResponse::error(format!("failed to read file: {}", e))
            }
        }
    }

    /// Read the whole file and return every signature offset.
    pub fn scan_file(path: &Path, signature: &ByteSignature) -> Result<Vec<u64>, Error> {
        let content = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
        Ok(signature.matcher().find_all(&content))
    }
}
