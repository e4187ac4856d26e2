//! File quarantine operations.
//!
//! Quarantine is a plain rename into a holding directory. The file keeps its
//! base name and the directory is created on demand. A file already holding
//! that name is never replaced; the move fails instead. Whatever the platform
//! says about the move is reported back verbatim.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::core::error::Error;
use crate::core::types::CommandResponse;
use crate::scanner::target::validate_target;
use crate::utils::hash::HashCalculator;

pub const MSG_QUARANTINED: &str = "file moved to quarantine successfully";

/// Moves files into a quarantine directory.
#[derive(Debug, Clone)]
pub struct QuarantineOperations {
    quarantine_dir: PathBuf,
}

impl QuarantineOperations {
    /// Create a quarantine manager for the given directory.
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> Self {
        Self {
            quarantine_dir: quarantine_dir.into(),
        }
    }

    /// The quarantine directory.
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Destination for `source` inside the quarantine directory.
    pub fn destination_for(&self, source: &Path) -> PathBuf {
        match source.file_name() {
            Some(name) => self.quarantine_dir.join(name),
            None => self.quarantine_dir.clone(),
        }
    }

    /// Quarantine a client-supplied path.
    pub fn quarantine(&self, file_path: &str) -> CommandResponse {
        let source = match validate_target(file_path) {
            Ok(path) => path,
            Err(reason) => {
                log::debug!("Rejected quarantine target {:?}: {}", file_path, reason);
                return CommandResponse::error(reason.message());
            }
        };

        if let Err(e) = self.ensure_dir() {
            log::error!("{}", e);
            return CommandResponse::error(format!(
                "failed to create quarantine directory, error code: {}",
                error_code(&e)
            ));
        }

        if log::log_enabled!(log::Level::Debug) {
            match HashCalculator::sha256_file(&source) {
                Ok(digest) => log::debug!("Quarantining {:?} (sha256: {})", source, digest),
                Err(e) => log::debug!("Could not hash {:?}: {}", source, e),
            }
        }

        let dest = self.destination_for(&source);
        log::debug!("Moving {:?} -> {:?}", source, dest);

        match self.move_file(&source, &dest) {
            Ok(()) => {
                log::info!("Quarantined {:?} as {:?}", source, dest);
                CommandResponse::success(MSG_QUARANTINED)
            }
            Err(Error::QuarantineFailed { path, source: err }) => {
                let code = error_code(&err);
                log::error!("Failed to quarantine {:?}: {} (code {})", path, err, code);
                CommandResponse::error(format!(
                    "failed to quarantine file, error code: {}",
                    code
                ))
            }
            Err(e) => {
                log::error!("{}", e);
                CommandResponse::error("failed to quarantine file, error code: -1")
            }
        }
    }

    /// Create the quarantine directory and any missing parents.
    fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.quarantine_dir)
    }

    /// Rename `source` to `dest` without replacing an existing file.
    ///
    /// The destination name is claimed with an exclusive create first, so an
    /// occupied name fails with the platform's "already exists" code. A
    /// failed move leaves the source untouched.
    pub fn move_file(&self, source: &Path, dest: &Path) -> Result<(), Error> {
        let failed = |e: io::Error| Error::QuarantineFailed {
            path: source.to_path_buf(),
            source: e,
        };

        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dest)
            .map_err(failed)?;

        if let Err(e) = fs::rename(source, dest) {
            if let Err(cleanup) = fs::remove_file(dest) {
                log::warn!("Failed to release {:?}: {}", dest, cleanup);
            }
            return Err(failed(e));
        }
        Ok(())
    }
}

/// Platform error code for an I/O failure, or -1 when there is none.
fn error_code(err: &io::Error) -> i32 {
    err.raw_os_error().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_quarantine_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let file_path = create_test_file(temp_dir.path(), "malware.exe", b"payload");
        let vault = temp_dir.path().join("nested").join("quarantine");

        let ops = QuarantineOperations::new(&vault);
        let response = ops.quarantine(file_path.to_str().unwrap());

        assert_eq!(response, CommandResponse::success(MSG_QUARANTINED));
        assert!(!file_path.exists());
        assert_eq!(fs::read(vault.join("malware.exe")).unwrap(), b"payload");
    }

    #[test]
    fn test_quarantine_existing_dir_is_fine() {
        let temp_dir = TempDir::new().unwrap();
        let vault = temp_dir.path().join("quarantine");
        fs::create_dir_all(&vault).unwrap();
        let file_path = create_test_file(temp_dir.path(), "a.bin", b"a");

        let ops = QuarantineOperations::new(&vault);
        assert!(!ops.quarantine(file_path.to_str().unwrap()).is_error());
        assert!(vault.join("a.bin").exists());
    }

    #[test]
    fn test_quarantine_validation_errors() {
        let temp_dir = TempDir::new().unwrap();
        let ops = QuarantineOperations::new(temp_dir.path().join("quarantine"));

        assert_eq!(ops.quarantine(""), CommandResponse::error("file path is empty"));
        assert_eq!(
            ops.quarantine(temp_dir.path().to_str().unwrap()),
            CommandResponse::error("file is a directory")
        );
        let missing = temp_dir.path().join("missing.exe");
        assert_eq!(
            ops.quarantine(missing.to_str().unwrap()),
            CommandResponse::error("file not found")
        );
        assert!(!temp_dir.path().join("quarantine").exists());
    }

    #[test]
    fn test_quarantine_dir_creation_failure() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = create_test_file(temp_dir.path(), "blocker", b"");
        let file_path = create_test_file(temp_dir.path(), "target.bin", b"x");

        let ops = QuarantineOperations::new(blocker.join("quarantine"));
        match ops.quarantine(file_path.to_str().unwrap()) {
            CommandResponse::Error(msg) => {
                assert!(msg.starts_with("failed to create quarantine directory, error code: "))
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert!(file_path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_move_reports_code_and_keeps_source() {
        let temp_dir = TempDir::new().unwrap();
        let vault = temp_dir.path().join("quarantine");
        // A directory already holding the name makes the move fail.
        fs::create_dir_all(vault.join("sample.bin").join("inner")).unwrap();
        let file_path = create_test_file(temp_dir.path(), "sample.bin", b"keep me");

        let ops = QuarantineOperations::new(&vault);
        match ops.quarantine(file_path.to_str().unwrap()) {
            CommandResponse::Error(msg) => {
                assert!(msg.starts_with("failed to quarantine file, error code: "));
                assert!(!msg.ends_with("-1"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
        assert_eq!(fs::read(&file_path).unwrap(), b"keep me");
    }

    #[test]
    fn test_existing_quarantined_file_is_never_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let vault = temp_dir.path().join("quarantine");
        fs::create_dir_all(&vault).unwrap();
        fs::write(vault.join("s.bin"), b"first sample").unwrap();
        let file_path = create_test_file(temp_dir.path(), "s.bin", b"second sample");

        let ops = QuarantineOperations::new(&vault);
        match ops.quarantine(file_path.to_str().unwrap()) {
            CommandResponse::Error(msg) => {
                assert!(msg.starts_with("failed to quarantine file, error code: "));
                // The code the platform reports for an occupied name.
                let code = fs::OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(vault.join("s.bin"))
                    .unwrap_err()
                    .raw_os_error()
                    .unwrap();
                assert!(msg.ends_with(&format!(": {}", code)));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        assert_eq!(fs::read(vault.join("s.bin")).unwrap(), b"first sample");
        assert_eq!(fs::read(&file_path).unwrap(), b"second sample");
    }

    #[test]
    fn test_move_file_into_free_name() {
        let temp_dir = TempDir::new().unwrap();
        let source = create_test_file(temp_dir.path(), "a.bin", b"a");
        let dest = temp_dir.path().join("b.bin");

        let ops = QuarantineOperations::new(temp_dir.path());
        ops.move_file(&source, &dest).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"a");

        let again = create_test_file(temp_dir.path(), "a.bin", b"again");
        let err = ops.move_file(&again, &dest).unwrap_err();
        match err {
            Error::QuarantineFailed { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::AlreadyExists)
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(fs::read(&dest).unwrap(), b"a");
    }

    #[cfg(unix)]
    #[test]
    fn test_unhashable_file_is_still_quarantined() {
        use std::os::unix::fs::PermissionsExt;

        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();

        let temp_dir = TempDir::new().unwrap();
        let file_path = create_test_file(temp_dir.path(), "locked.bin", b"locked");
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o000)).unwrap();
        let vault = temp_dir.path().join("quarantine");

        let ops = QuarantineOperations::new(&vault);
        let response = ops.quarantine(file_path.to_str().unwrap());

        assert_eq!(response, CommandResponse::success(MSG_QUARANTINED));
        assert!(!file_path.exists());
        assert!(vault.join("locked.bin").exists());
    }

    #[test]
    fn test_destination_uses_base_name() {
        let ops = QuarantineOperations::new("/q");
        assert_eq!(
            ops.destination_for(Path::new("/home/user/evil.dll")),
            PathBuf::from("/q/evil.dll")
        );
    }
}
