//! `qpdf`-backed verifier and decryptor.

use super::{DocumentDecryptor, check_pdf_document, decrypted_output_path};
use crate::error::{DecryptError, VerifyError};
use crate::search::CredentialVerifier;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

pub const QPDF: &str = "qpdf";

/// qpdf exit code for "succeeded with warnings".
const EXIT_WARNINGS: i32 = 3;

/// Opens the document with `qpdf --password=<candidate> --show-npages`.
#[derive(Debug, Clone)]
pub struct QpdfVerifier {
    program: PathBuf,
}

impl QpdfVerifier {
    pub fn new() -> Self {
        Self::with_program(QPDF)
    }

    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for QpdfVerifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialVerifier for QpdfVerifier {
    fn prepare(&self, document: &Path) -> Result<(), VerifyError> {
        check_pdf_document(document)?;

        let output = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                VerifyError::Setup(format!("cannot run {}: {}", self.program.display(), e))
            })?;
        if !output.status.success() {
            return Err(VerifyError::Setup(format!(
                "{} --version exited with {}",
                self.program.display(),
                output.status
            )));
        }
        log::debug!(
            "using {}",
            String::from_utf8_lossy(&output.stdout).lines().next().unwrap_or("qpdf")
        );
        Ok(())
    }

    fn verify(&self, document: &Path, candidate: &str) -> Result<bool, VerifyError> {
        let output = Command::new(&self.program)
            .arg(format!("--password={}", candidate))
            .arg("--show-npages")
            .arg(document)
            .stdin(Stdio::null())
            .output();

        match output {
            Ok(output) => classify(&output),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(VerifyError::Setup(format!(
                "cannot run {}: {}",
                self.program.display(),
                e
            ))),
            // Includes arguments qpdf cannot receive, such as embedded NULs.
            Err(e) => Err(VerifyError::Transient(e.to_string())),
        }
    }
}

fn classify(output: &Output) -> Result<bool, VerifyError> {
    classify_exit(output.status.code(), &String::from_utf8_lossy(&output.stderr))
}

fn classify_exit(code: Option<i32>, stderr: &str) -> Result<bool, VerifyError> {
    let stderr_lower = stderr.to_lowercase();
    match code {
        Some(0) | Some(EXIT_WARNINGS) => Ok(true),
        _ if stderr_lower.contains("invalid password") => Ok(false),
        _ if stderr_lower.contains("no such file") => {
            Err(VerifyError::Setup(stderr.trim().to_string()))
        }
        Some(code) => Err(VerifyError::Transient(format!(
            "qpdf exited with {}: {}",
            code,
            stderr.trim()
        ))),
        None => Err(VerifyError::Transient("qpdf killed by signal".to_string())),
    }
}

/// How a password-less rewrite went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unrestricted {
    Clean,
    WithWarnings,
}

/// Writes `<stem>_decrypted.pdf` with `qpdf --decrypt` and checks that the
/// result opens without a password.
#[derive(Debug, Clone)]
pub struct QpdfDecryptor {
    program: PathBuf,
}

impl QpdfDecryptor {
    pub fn new() -> Self {
        Self::with_program(QPDF)
    }

    pub fn with_program<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `qpdf --show-encryption` report for `document`.
    pub fn encryption_status(&self, document: &Path) -> Result<String, DecryptError> {
        let output = self.run(&[OsStr::new("--show-encryption"), document.as_os_str()])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Rewrite `input` to `output` with `qpdf --decrypt` and no password.
    ///
    /// This lifts owner-password restrictions and encryption that opens with
    /// an empty user password. Documents that need a real password fail.
    /// Success means a non-empty `output` was written.
    pub fn remove_restrictions(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<Unrestricted, DecryptError> {
        // A leftover from an earlier run must not count as success.
        match std::fs::remove_file(output) {
            Err(e) if e.kind() != ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }

        let result = self.run(&[OsStr::new("--decrypt"), input.as_os_str(), output.as_os_str()])?;
        let stderr = String::from_utf8_lossy(&result.stderr);
        let written = std::fs::metadata(output).is_ok_and(|meta| meta.len() > 0);
        if !written {
            let reason = match stderr.trim() {
                "" => "failed to create output file".to_string(),
                message => message.to_string(),
            };
            return Err(DecryptError::Failed(reason));
        }

        if stderr.contains("WARNING") {
            Ok(Unrestricted::WithWarnings)
        } else {
            Ok(Unrestricted::Clean)
        }
    }

    fn run(&self, args: &[&OsStr]) -> Result<Output, DecryptError> {
        Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    DecryptError::ToolUnavailable(format!("{}: {}", self.program.display(), e))
                }
                _ => DecryptError::Io(e),
            })
    }
}

impl Default for QpdfDecryptor {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentDecryptor for QpdfDecryptor {
    fn decrypt(&self, document: &Path, credential: &str) -> Result<PathBuf, DecryptError> {
        let output_path = decrypted_output_path(document);
        let password = format!("--password={}", credential);

        let output = self.run(&[
            OsStr::new(&password),
            OsStr::new("--decrypt"),
            document.as_os_str(),
            output_path.as_os_str(),
        ])?;
        if !matches!(output.status.code(), Some(0) | Some(EXIT_WARNINGS)) {
            return Err(DecryptError::Failed(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        // Exit 0 from --requires-password means a password is still needed.
        let check = self.run(&[OsStr::new("--requires-password"), output_path.as_os_str()])?;
        if check.status.code() == Some(0) {
            return Err(DecryptError::StillEncrypted(output_path));
        }

        log::info!("Decrypted copy written to {}", output_path.display());
        Ok(output_path)
    }
}
