use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn get_binary_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_pdfcrack"))
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(get_binary_path())
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute pdfcrack")
}

#[test]
fn test_estimate_default_table() {
    let output = run(&["estimate"]);
    assert!(output.status.success(), "status: {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("6,567,200 candidates/sec"));
    assert!(stdout.contains("Numeric passwords (1-8 digits)"));
    assert!(stdout.contains("Combinations: 111,111,110"));
    assert!(stdout.contains("Time: 16.9 seconds"));
    assert!(stdout.contains("Alphanumeric + symbols (1-4 chars)"));
}

#[test]
fn test_estimate_custom_rate_and_length() {
    let output = run(&["estimate", "--rate", "1000", "--max-length", "3"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Numeric (1-3 chars)"));
    assert!(stdout.contains("Combinations: 1,110"));
    assert!(stdout.contains("Time: 1.1 seconds"));
}

#[test]
fn test_estimate_rejects_zero_rate() {
    let output = run(&["estimate", "--rate", "0"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_plan_lists_quick_strategies() {
    let output = run(&["plan", "--mode", "quick", "Case_File.pdf"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plan (5 strategies)"));
    assert!(stdout.contains("common (30 candidates)"));
    assert!(stdout.contains("filename variants of 'Case_File.pdf'"));
    assert!(stdout.contains("numeric 1-6 digits"));
    assert!(stdout.contains("1,111,110"));
}

#[test]
fn test_plan_brute_alias() {
    let output = run(&["plan", "--mode", "brute", "--max-length", "2"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("numeric 1-2 digits"));
    assert!(stdout.contains("lowercase 1-2 chars over 26 symbols"));
}

#[test]
fn test_plan_json_round_trips_through_plan_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run(&["plan", "--mode", "dates", "--json"]);
    assert!(output.status.success());

    let plan_path = dir.path().join("plan.json");
    fs::write(&plan_path, &output.stdout).unwrap();

    let output = run(&["plan", "--plan", plan_path.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plan (1 strategies)"));
    assert!(stdout.contains("dates 1980-01-01 to"));
}

#[test]
fn test_crack_missing_document_is_fatal() {
    let output = run(&[
        "crack",
        "/nonexistent/locked.pdf",
        "--mode",
        "quick",
        "--no-progress",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Verifier setup failed"), "stderr: {}", stderr);
}

#[test]
fn test_crack_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.pdf");
    fs::write(&notes, "definitely not a pdf").unwrap();

    let output = run(&[
        "crack",
        notes.to_str().unwrap(),
        "--mode",
        "quick",
        "--no-progress",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not a PDF document"), "stderr: {}", stderr);
}

#[test]
fn test_crack_bad_plan_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.json");
    fs::write(&plan, r#"{ "strategies": [ { "kind": "numeric", "min_len": 6, "max_len": 2 } ] }"#)
        .unwrap();

    let output = run(&[
        "crack",
        "whatever.pdf",
        "--plan",
        plan.to_str().unwrap(),
        "--no-progress",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Configuration error"), "stderr: {}", stderr);
}

#[test]
fn test_crack_zero_batch_size_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("locked.pdf");
    fs::write(&pdf, "%PDF-1.4\n").unwrap();

    let output = run(&[
        "crack",
        pdf.to_str().unwrap(),
        "--mode",
        "quick",
        "--batch-size",
        "0",
        "--no-progress",
    ]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid batch size"), "stderr: {}", stderr);
}

#[test]
fn test_yes_conflicts_with_no_confirm() {
    let output = run(&["crack", "x.pdf", "--yes", "--no-confirm"]);
    assert!(!output.status.success());
}

#[test]
fn test_decrypt_missing_input_dir_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let output_dir = dir.path().join("out");
    let output = run(&[
        "decrypt",
        "/nonexistent/restricted",
        output_dir.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {}", stderr);
}

#[test]
fn test_decrypt_directory_without_pdfs() {
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("in");
    let output_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    fs::write(input_dir.join("notes.txt"), "not a document").unwrap();

    let output = run(&[
        "decrypt",
        input_dir.to_str().unwrap(),
        output_dir.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "status: {:?}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("No PDF files found in"), "stdout: {}", stdout);
    assert!(output_dir.is_dir());
}

fn qpdf_available() -> bool {
    Command::new("qpdf")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn qpdf_encrypt(path: &Path, user_password: &str) {
    let status = Command::new("qpdf")
        .args(["--empty", "--encrypt", user_password, "owner-secret", "256", "--"])
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn test_decrypt_directory_lifts_restrictions() {
    if !qpdf_available() {
        eprintln!("qpdf not available, skipping");
        return;
    }
    let dir = tempfile::tempdir().unwrap();
    let input_dir = dir.path().join("in");
    let output_dir = dir.path().join("out");
    fs::create_dir(&input_dir).unwrap();
    // Owner restrictions only: opens with an empty user password.
    qpdf_encrypt(&input_dir.join("restricted.pdf"), "");
    // Needs a real password, so it cannot be rewritten.
    qpdf_encrypt(&input_dir.join("locked.pdf"), "hunter2");

    let output = run(&[
        "decrypt",
        input_dir.to_str().unwrap(),
        output_dir.to_str().unwrap(),
    ]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(1), "stdout: {}", stdout);

    assert!(stdout.contains("Found 2 PDF files to process"));
    assert!(stdout.contains("[BEFORE] restricted.pdf encryption status:"));
    assert!(stdout.contains("Successfully decrypted/unrestricted"));
    assert!(stdout.contains("[AFTER] restricted.pdf encryption status:"));
    assert!(stdout.contains("Error decrypting/unrestricting locked.pdf"));
    assert!(stdout.contains("Successfully decrypted: 1/2 files"));

    assert!(output_dir.join("restricted.pdf").is_file());
    assert!(!output_dir.join("locked.pdf").exists());
    let check = Command::new("qpdf")
        .arg("--is-encrypted")
        .arg(output_dir.join("restricted.pdf"))
        .status()
        .unwrap();
    // Exit 2 means not encrypted.
    assert_eq!(check.code(), Some(2));
}
