//! End-to-end runs against a real encrypted document. Skipped when `qpdf`
//! is not installed.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdfcrack"))
}

/// Write an AES-256 PDF with user password `password` into `dir`.
fn encrypted_pdf(dir: &Path, password: &str) -> Option<PathBuf> {
    let path = dir.join("locked.pdf");
    let status = Command::new("qpdf")
        .args(["--empty", "--encrypt", password, "owner-secret", "256", "--"])
        .arg(&path)
        .status()
        .ok()?;
    if status.success() && path.is_file() {
        Some(path)
    } else {
        None
    }
}

fn crack(document: &Path, extra: &[&str]) -> Output {
    Command::new(get_binary_path())
        .arg("crack")
        .arg(document)
        .args(["--no-progress", "-j", "2"])
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute pdfcrack")
}

#[test]
fn test_crack_finds_numeric_password() {
    let dir = tempfile::tempdir().unwrap();
    let Some(pdf) = encrypted_pdf(dir.path(), "42") else {
        eprintln!("qpdf not available, skipping");
        return;
    };

    let output = crack(&pdf, &["--mode", "quick", "--yes", "--no-decrypt"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        output.status.success(),
        "status: {:?}\nstdout: {}\nstderr: {}",
        output.status,
        stdout,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Password found: '42'"));
    assert!(stdout.contains("Strategy: numeric 1-6 digits"));
    assert!(!dir.path().join("locked_decrypted.pdf").exists());
}

#[test]
fn test_crack_writes_decrypted_copy() {
    let dir = tempfile::tempdir().unwrap();
    let Some(pdf) = encrypted_pdf(dir.path(), "admin") else {
        eprintln!("qpdf not available, skipping");
        return;
    };

    let output = crack(&pdf, &["--mode", "quick", "--yes"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {}", stdout);
    assert!(stdout.contains("Password found: 'admin'"));

    let decrypted = dir.path().join("locked_decrypted.pdf");
    assert!(stdout.contains("Decrypted PDF saved as"));
    assert!(decrypted.is_file());

    let check = Command::new("qpdf")
        .arg("--requires-password")
        .arg(&decrypted)
        .status()
        .unwrap();
    assert_ne!(check.code(), Some(0));
}

#[test]
fn test_crack_exhausted_plan_exits_one() {
    let dir = tempfile::tempdir().unwrap();
    let Some(pdf) = encrypted_pdf(dir.path(), "not-in-the-plan") else {
        eprintln!("qpdf not available, skipping");
        return;
    };

    let plan = dir.path().join("plan.json");
    fs::write(
        &plan,
        r#"{ "strategies": [
            { "kind": "list", "name": "guesses", "candidates": ["a", "b", "c"] },
            { "kind": "numeric", "min_len": 1, "max_len": 1 }
        ] }"#,
    )
    .unwrap();

    let output = crack(&pdf, &["--plan", plan.to_str().unwrap(), "--no-confirm"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stdout: {}", stdout);
    assert!(stdout.contains("Password not found."));
    assert!(stdout.contains("Tested 13 candidates"));
    assert!(stdout.contains("Recommendations:"));
}
