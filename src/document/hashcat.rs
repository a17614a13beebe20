//! GPU cracking through `pdf2john.py` and `hashcat`.
//!
//! The solver extracts the document's hash, writes it and a generated
//! dictionary into a scratch directory, and runs a straight dictionary
//! attack under a wall-clock budget. Anything that goes wrong is reported
//! as a [`SolverError`]; the coordinator then falls back to its own
//! strategies.

use super::find_in_path;
use crate::error::SolverError;
use crate::search::{ExternalSolver, Strategy};
use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub const HASHCAT: &str = "hashcat";
pub const PDF2JOHN: &str = "pdf2john.py";

/// Directories searched for `pdf2john.py` before `PATH`.
pub const PDF2JOHN_DIRS: &[&str] = &[
    "/usr/share/john",
    "/opt/homebrew/share/john",
    "/usr/local/share/john",
];

/// Substrings of `hashcat -I` output that indicate a usable backend.
pub const GPU_BACKENDS: &[&str] = &["OpenCL", "CUDA", "Metal", "HIP"];

pub const DEFAULT_SOLVER_TIMEOUT: Duration = Duration::from_secs(300);

/// hashcat mode for PDF 1.4-1.6 (Acrobat 5-8), used when the hash header
/// is not recognised.
pub const DEFAULT_HASH_MODE: u32 = 10500;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// hashcat exit code when the attack finished without cracking.
const EXIT_EXHAUSTED: i32 = 1;

#[derive(Debug, Clone)]
pub struct HashcatSolver {
    wordlist: Vec<Strategy>,
    timeout: Duration,
    hashcat: PathBuf,
}

impl HashcatSolver {
    /// `wordlist` strategies are expanded into the dictionary file.
    pub fn new(wordlist: Vec<Strategy>) -> Self {
        Self {
            wordlist,
            timeout: DEFAULT_SOLVER_TIMEOUT,
            hashcat: PathBuf::from(HASHCAT),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn has_gpu_backend(&self) -> bool {
        match Command::new(&self.hashcat)
            .arg("-I")
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                let info = String::from_utf8_lossy(&output.stdout);
                GPU_BACKENDS.iter().any(|backend| info.contains(backend))
            }
            Ok(output) => {
                log::debug!("hashcat -I exited with {}", output.status);
                false
            }
            Err(e) => {
                log::debug!("hashcat not runnable: {}", e);
                false
            }
        }
    }
}

impl ExternalSolver for HashcatSolver {
    fn is_available(&self) -> bool {
        find_pdf2john().is_some() && self.has_gpu_backend()
    }

    fn solve(&self, document: &Path, cancel: &AtomicBool) -> Result<Option<String>, SolverError> {
        let script = find_pdf2john()
            .ok_or_else(|| SolverError::Unavailable(format!("{} not found", PDF2JOHN)))?;
        let hash = extract_hash(&script, document)?;
        let mode = hash_mode_for(&hash);

        let scratch = tempfile::tempdir()?;
        let hash_path = scratch.path().join("document.hash");
        let wordlist_path = scratch.path().join("wordlist.txt");
        let cracked_path = scratch.path().join("cracked.txt");

        std::fs::write(&hash_path, format!("{}\n", hash))?;
        let words = write_wordlist(&self.wordlist, &wordlist_path)?;
        log::info!(
            "Running hashcat (mode {}) with {} candidates, timeout {:?}",
            mode,
            words,
            self.timeout
        );

        let mode_arg = mode.to_string();
        let mut child = Command::new(&self.hashcat)
            .args(["-m", mode_arg.as_str(), "-a", "0"])
            .args(["--force", "--potfile-disable", "--quiet"])
            .args(["--outfile-format", "2", "-o"])
            .arg(&cracked_path)
            .arg(&hash_path)
            .arg(&wordlist_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => SolverError::Unavailable(format!("{}: {}", HASHCAT, e)),
                _ => SolverError::Io(e),
            })?;

        let status = wait_with_timeout(&mut child, self.timeout, cancel)?;
        match status.code() {
            Some(0) | Some(EXIT_EXHAUSTED) => {}
            _ => return Err(SolverError::Failed(format!("hashcat exited with {}", status))),
        }

        read_cracked(&cracked_path)
    }
}

/// First `pdf2john.py` found in the known install locations, then `PATH`.
pub fn find_pdf2john() -> Option<PathBuf> {
    PDF2JOHN_DIRS
        .iter()
        .map(|dir| Path::new(dir).join(PDF2JOHN))
        .find(|path| path.is_file())
        .or_else(|| find_in_path(PDF2JOHN))
}

fn extract_hash(script: &Path, document: &Path) -> Result<String, SolverError> {
    let output = Command::new("python3")
        .arg(script)
        .arg(document)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => SolverError::Unavailable(format!("python3: {}", e)),
            _ => SolverError::Io(e),
        })?;

    if !output.status.success() {
        return Err(SolverError::HashExtraction(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    parse_pdf2john_output(&String::from_utf8_lossy(&output.stdout))
        .ok_or_else(|| SolverError::HashExtraction("no $pdf$ hash in pdf2john output".to_string()))
}

/// Pull the `$pdf$...` hash out of pdf2john's `name:hash` output.
pub fn parse_pdf2john_output(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.find("$pdf$").map(|start| {
            let hash = &line[start..];
            // john appends `:::...` fields on some versions.
            let end = hash.find(':').unwrap_or(hash.len());
            hash[..end].trim_end().to_string()
        })
    })
}

/// hashcat mode for a `$pdf$V*R*...` hash.
pub fn hash_mode_for(hash: &str) -> u32 {
    let mut fields = hash.trim_start_matches("$pdf$").split('*');
    let version = fields.next().and_then(|v| v.parse::<u32>().ok());
    let revision = fields.next().and_then(|r| r.parse::<u32>().ok());

    match (version, revision) {
        (Some(1), Some(2)) => 10400,
        (Some(2 | 4), Some(3 | 4)) => 10500,
        (Some(5), Some(5)) => 10600,
        (Some(5), Some(6)) => 10700,
        _ => DEFAULT_HASH_MODE,
    }
}

/// Expand every strategy into `path`, one candidate per line. Returns the
/// number of lines written.
pub fn write_wordlist(strategies: &[Strategy], path: &Path) -> Result<u64, SolverError> {
    let mut out = BufWriter::new(File::create(path)?);
    let mut written = 0u64;
    for strategy in strategies {
        let candidates = strategy
            .candidates()
            .map_err(|e| SolverError::Failed(format!("wordlist: {}", e)))?;
        for candidate in candidates {
            writeln!(out, "{}", candidate)?;
            written += 1;
        }
    }
    out.flush()?;
    Ok(written)
}

/// Wait for `child`, killing it once `timeout` has elapsed or `cancel` is
/// raised.
pub fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    cancel: &AtomicBool,
) -> Result<ExitStatus, SolverError> {
    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        let error = if cancel.load(Ordering::SeqCst) {
            SolverError::Cancelled
        } else if start.elapsed() >= timeout {
            SolverError::Timeout(timeout)
        } else {
            std::thread::sleep(POLL_INTERVAL.min(timeout));
            continue;
        };
        let _ = child.kill();
        let _ = child.wait();
        return Err(error);
    }
}

fn read_cracked(path: &Path) -> Result<Option<String>, SolverError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(content
        .lines()
        .next()
        .map(|line| line.trim_end_matches('\r').to_string()))
}
