//! Adapters for the protected document: opening it with a candidate,
//! writing a decrypted copy, and handing it to an external cracker.

pub mod hashcat;
pub mod qpdf;

pub use hashcat::HashcatSolver;
pub use qpdf::{QpdfDecryptor, QpdfVerifier, Unrestricted};

use crate::error::{DecryptError, VerifyError};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// How far into the file the `%PDF-` marker may appear.
pub const HEADER_SEARCH_LEN: usize = 1024;

/// Writes an unprotected copy of a document once the password is known.
pub trait DocumentDecryptor {
    /// Returns the path of the decrypted copy.
    fn decrypt(&self, document: &Path, credential: &str) -> Result<PathBuf, DecryptError>;
}

/// `<dir>/<stem>_decrypted.pdf` next to the input.
pub fn decrypted_output_path(document: &Path) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    document.with_file_name(format!("{}_decrypted.pdf", stem))
}

pub fn has_pdf_header(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_LEN)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Fails with a setup error unless `document` is a readable PDF file.
pub fn check_pdf_document(document: &Path) -> Result<(), VerifyError> {
    let mut file = File::open(document)
        .map_err(|e| VerifyError::Setup(format!("cannot open {}: {}", document.display(), e)))?;

    let mut header = Vec::with_capacity(HEADER_SEARCH_LEN);
    file.by_ref()
        .take(HEADER_SEARCH_LEN as u64)
        .read_to_end(&mut header)
        .map_err(|e| VerifyError::Setup(format!("cannot read {}: {}", document.display(), e)))?;

    if !has_pdf_header(&header) {
        return Err(VerifyError::Setup(format!(
            "{} is not a PDF document",
            document.display()
        )));
    }
    Ok(())
}

/// Locate an executable on `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
