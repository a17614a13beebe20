use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

mod document;
mod error;
mod estimate;
mod prompt;
mod search;
mod telemetry;

use document::{DocumentDecryptor, HashcatSolver, QpdfDecryptor, QpdfVerifier, Unrestricted};
use error::{DecryptError, SearchError};
use estimate::{DEFAULT_RATE, format_crack_time, format_number, plan_size, scenarios};
use prompt::{AlwaysConfirm, ConfirmationPrompt, NeverConfirm, StdinPrompt};
use search::batch::DEFAULT_BATCH_SIZE;
use search::parallel::config::DEFAULT_CONFIRM_THRESHOLD;
use search::parallel::{Collaborators, ParallelConfig, run_parallel_search};
use search::plan::{Mode, PlanFile, PlanOptions, build_plan, load_plan_file, solver_wordlist};
use search::{ExternalSolver, SearchOutcome, Strategy};
use telemetry::{LogSink, ProgressBarSink, TelemetrySink};

const EXIT_FOUND: i32 = 0;
const EXIT_NOT_FOUND: i32 = 1;
const EXIT_FATAL: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

// --- Command Line Arguments ---

#[derive(Parser)]
#[command(name = "pdfcrack")]
#[command(about = "pdfcrack - parallel password recovery for protected PDF documents")]
#[command(version)]
#[command(subcommand_required = true)]
#[command(arg_required_else_help = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliMode {
    /// GPU solver if available, then the optimized preset
    Auto,
    /// Common passwords, numbers up to 6 digits, years and day/month codes
    Quick,
    /// Extended dictionary, keyboard patterns and word variations
    Optimized,
    /// Charset brute force and structured number patterns
    #[value(alias = "brute")]
    Exhaustive,
    /// Every date since 1980 in common formats
    Dates,
    /// hashcat only
    Gpu,
}

impl From<CliMode> for Mode {
    fn from(cli: CliMode) -> Self {
        match cli {
            CliMode::Auto => Mode::Auto,
            CliMode::Quick => Mode::Quick,
            CliMode::Optimized => Mode::Optimized,
            CliMode::Exhaustive => Mode::Exhaustive,
            CliMode::Dates => Mode::Dates,
            CliMode::Gpu => Mode::Gpu,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Search for the password of a protected PDF
    Crack {
        /// Path to the protected document
        document: PathBuf,

        // --- Plan selection ---
        /// Preset strategy plan
        #[arg(long, value_enum, default_value = "auto")]
        mode: CliMode,
        /// JSON plan file; replaces the preset
        #[arg(long)]
        plan: Option<PathBuf>,
        /// Extra dictionary file (repeatable)
        #[arg(long = "wordlist")]
        wordlists: Vec<PathBuf>,
        /// Longest brute-force length for the exhaustive preset
        #[arg(long)]
        max_length: Option<usize>,

        // --- Parallelism ---
        /// Number of verifier threads (default: one per CPU)
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Candidates per batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
        /// Maximum batches outstanding (default: 2 x jobs)
        #[arg(long)]
        queue_depth: Option<usize>,

        // --- Confirmation gate ---
        /// Strategies larger than this need confirmation
        #[arg(long, default_value_t = DEFAULT_CONFIRM_THRESHOLD)]
        confirm_threshold: u64,
        /// Run large strategies without asking
        #[arg(long, conflicts_with = "no_confirm")]
        yes: bool,
        /// Skip large strategies without asking
        #[arg(long)]
        no_confirm: bool,

        // --- Output ---
        /// Do not write a decrypted copy after success
        #[arg(long)]
        no_decrypt: bool,
        /// Log progress lines instead of drawing a progress bar
        #[arg(long)]
        no_progress: bool,
        /// Wall-clock budget for the GPU solver, in seconds
        #[arg(long, default_value = "300")]
        solver_timeout: u64,
    },
    /// Print the strategy plan for a mode with size estimates
    Plan {
        /// Document the plan is for (used for file name variants)
        document: Option<PathBuf>,
        #[arg(long, value_enum, default_value = "auto")]
        mode: CliMode,
        /// Show a JSON plan file instead of a preset
        #[arg(long)]
        plan: Option<PathBuf>,
        #[arg(long = "wordlist")]
        wordlists: Vec<PathBuf>,
        #[arg(long)]
        max_length: Option<usize>,
        /// Emit the plan as JSON, usable with `crack --plan`
        #[arg(long)]
        json: bool,
    },
    /// Strip restrictions from every PDF in a directory that opens without
    /// a password
    Decrypt {
        /// Directory holding the restricted documents
        input_dir: PathBuf,
        /// Where the unrestricted copies are written (created if missing)
        output_dir: PathBuf,
    },
    /// Estimate exhaustive search times at a given hash rate
    Estimate {
        /// Candidates per second
        #[arg(long, default_value_t = DEFAULT_RATE)]
        rate: f64,
        /// Add brute-force rows up to this length
        #[arg(long)]
        max_length: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfirmPolicy {
    Ask,
    Always,
    Never,
}

struct CrackOptions {
    mode: Mode,
    plan_file: Option<PathBuf>,
    wordlists: Vec<PathBuf>,
    max_length: Option<usize>,
    parallel: ParallelConfig,
    confirm: ConfirmPolicy,
    decrypt: bool,
    progress: bool,
    solver_timeout: Duration,
}

// --- Crack ---

fn crack_document(document: &Path, options: &CrackOptions) -> Result<i32> {
    let solver = Arc::new(
        HashcatSolver::new(solver_wordlist(document)).with_timeout(options.solver_timeout),
    );

    let plan = match &options.plan_file {
        Some(path) => {
            let mut plan = load_plan_file(path, document).map_err(SearchError::from)?;
            plan.extend(
                options
                    .wordlists
                    .iter()
                    .map(|path| Strategy::Wordlist { path: path.clone() }),
            );
            plan
        }
        None => {
            let solver_available = options.mode == Mode::Auto && solver.is_available();
            if options.mode == Mode::Auto {
                log::info!(
                    "GPU solver {}",
                    if solver_available { "detected" } else { "not available, using CPU strategies" }
                );
            }
            let plan_options = PlanOptions::default()
                .with_max_length(options.max_length)
                .with_wordlists(options.wordlists.clone())
                .with_solver_available(solver_available);
            build_plan(options.mode, document, &plan_options)
        }
    };

    if options.max_length.is_some_and(|max| max >= 5) && options.mode == Mode::Exhaustive {
        log::warn!("Brute forcing passwords longer than 4 characters may take a very long time");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        eprintln!("\n[!] Stopping after in-flight batches...");
        cancel_flag.store(true, Ordering::SeqCst);
    })
    .ok();

    let prompt: Box<dyn ConfirmationPrompt> = match options.confirm {
        ConfirmPolicy::Ask => Box::new(StdinPrompt),
        ConfirmPolicy::Always => Box::new(AlwaysConfirm),
        ConfirmPolicy::Never => Box::new(NeverConfirm),
    };
    let sink: Box<dyn TelemetrySink> = if options.progress {
        Box::new(ProgressBarSink::new())
    } else {
        Box::new(LogSink::default())
    };
    let collaborators = Collaborators::new(Arc::new(QpdfVerifier::new()))
        .with_prompt(prompt)
        .with_solver(solver)
        .with_sink(sink)
        .with_cancel_token(cancel);

    println!("Target: {}", document.display());
    println!(
        "Plan: {} strategies, {} workers",
        plan.len(),
        options.parallel.num_workers
    );

    let outcome = run_parallel_search(document, &plan, collaborators, &options.parallel)?;

    println!();
    print!("{}", outcome);
    log::debug!("\n{}", outcome.statistics().format_summary());

    log::info!(
        "Search finished after {} candidates in {:.2?}",
        outcome.total_tested(),
        outcome.elapsed()
    );

    if let Some(password) = outcome.found() {
        if options.decrypt {
            decrypt_copy(document, password);
        }
        return Ok(EXIT_FOUND);
    }
    if let SearchOutcome::Interrupted { .. } = outcome {
        return Ok(EXIT_INTERRUPTED);
    }
    print_recommendations(options.mode);
    Ok(EXIT_NOT_FOUND)
}

/// Decryption failures are reported but never change the exit status.
fn decrypt_copy(document: &Path, password: &str) {
    match QpdfDecryptor::new().decrypt(document, password) {
        Ok(path) => println!("Decrypted PDF saved as: {}", path.display()),
        Err(e) => {
            log::warn!("Could not write a decrypted copy: {}", e);
            eprintln!("Warning: could not write a decrypted copy: {}", e);
        }
    }
}

fn print_recommendations(mode: Mode) {
    println!("\nRecommendations:");
    match mode {
        Mode::Quick | Mode::Auto | Mode::Optimized => {
            println!("  - Try --mode exhaustive for short brute-force passwords");
            println!("  - Try --mode dates if the password may be a date");
        }
        Mode::Exhaustive => {
            println!("  - Raise --max-length (each extra character multiplies the work)");
        }
        Mode::Dates | Mode::Gpu => {
            println!("  - Try --mode optimized for dictionary and pattern candidates");
        }
    }
    println!("  - Supply a targeted dictionary with --wordlist");
    println!("  - The password may be longer or more complex than these strategies cover");
}

// --- Plan ---

fn show_plan(
    document: Option<&Path>,
    mode: Mode,
    plan_file: Option<&Path>,
    wordlists: Vec<PathBuf>,
    max_length: Option<usize>,
    json: bool,
) -> Result<()> {
    let document = document.unwrap_or(Path::new(""));
    let strategies = match plan_file {
        Some(path) => load_plan_file(path, document).map_err(SearchError::from)?,
        None => {
            let solver_available =
                mode == Mode::Auto && HashcatSolver::new(Vec::new()).is_available();
            let options = PlanOptions::default()
                .with_max_length(max_length)
                .with_wordlists(wordlists)
                .with_solver_available(solver_available);
            build_plan(mode, document, &options)
        }
    };

    if json {
        let rendered = serde_json::to_string_pretty(&PlanFile { strategies })
            .context("Failed to serialize plan")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Plan ({} strategies):", strategies.len());
    for (i, strategy) in strategies.iter().enumerate() {
        let size = strategy
            .estimated_count()
            .map(format_number)
            .unwrap_or_else(|| "?".to_string());
        println!("  {:>2}. {:<50} {:>15}", i + 1, strategy.to_string(), size);
    }
    let (total, unknown) = plan_size(&strategies);
    println!(
        "Total: {}{} candidates",
        format_number(total),
        if unknown { "+" } else { "" }
    );
    Ok(())
}

// --- Decrypt ---

/// Exit status is 0 when every document was rewritten, 1 otherwise.
fn decrypt_directory(input_dir: &Path, output_dir: &Path) -> Result<i32> {
    anyhow::ensure!(
        input_dir.is_dir(),
        "Input directory '{}' does not exist",
        input_dir.display()
    );
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut documents = Vec::new();
    for entry in std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read {}", input_dir.display()))?
    {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "pdf") {
            documents.push(path);
        }
    }
    documents.sort();

    if documents.is_empty() {
        println!("No PDF files found in {}", input_dir.display());
        return Ok(EXIT_FOUND);
    }
    println!("Found {} PDF files to process", documents.len());

    let decryptor = QpdfDecryptor::new();
    let mut successful = 0;
    for input in &documents {
        let Some(file_name) = input.file_name() else {
            continue;
        };
        let output = output_dir.join(file_name);
        let name = file_name.to_string_lossy();

        print_encryption_status(&decryptor, input, "BEFORE")?;
        match decryptor.remove_restrictions(input, &output) {
            Ok(Unrestricted::Clean) => println!("Successfully decrypted/unrestricted: {}", name),
            Ok(Unrestricted::WithWarnings) => {
                println!("Successfully decrypted/unrestricted with warnings: {}", name)
            }
            Err(e @ DecryptError::ToolUnavailable(_)) => return Err(e.into()),
            Err(e) => {
                log::debug!("{}: {}", input.display(), e);
                println!("Error decrypting/unrestricting {}: {}", name, e);
                continue;
            }
        }
        successful += 1;
        print_encryption_status(&decryptor, &output, "AFTER")?;
    }

    println!("\nProcessing complete:");
    println!("Successfully decrypted: {}/{} files", successful, documents.len());
    Ok(if successful == documents.len() {
        EXIT_FOUND
    } else {
        EXIT_NOT_FOUND
    })
}

fn print_encryption_status(decryptor: &QpdfDecryptor, document: &Path, label: &str) -> Result<()> {
    let name = document
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    match decryptor.encryption_status(document) {
        Ok(status) => {
            println!("[{}] {} encryption status:", label, name);
            println!("{}", status);
        }
        Err(e @ DecryptError::ToolUnavailable(_)) => return Err(e.into()),
        Err(e) => println!("Error checking encryption status for {}: {}", name, e),
    }
    Ok(())
}

// --- Estimate ---

fn show_estimates(rate: f64, max_length: Option<usize>) -> Result<()> {
    anyhow::ensure!(rate > 0.0, "Rate must be positive, got {}", rate);

    println!("Crack time estimates at {} candidates/sec", format_number(rate as u64));
    println!();
    for scenario in scenarios(max_length) {
        println!("{}", scenario.name);
        println!("   Combinations: {}", format_number(scenario.combinations));
        println!("   Time: {}", format_crack_time(scenario.seconds_at(rate)));
        println!();
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

// --- Main Function ---
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let result = match args.command {
        Commands::Crack {
            document,
            mode,
            plan,
            wordlists,
            max_length,
            jobs,
            batch_size,
            queue_depth,
            confirm_threshold,
            yes,
            no_confirm,
            no_decrypt,
            no_progress,
            solver_timeout,
        } => {
            let confirm = if yes {
                ConfirmPolicy::Always
            } else if no_confirm {
                ConfirmPolicy::Never
            } else {
                ConfirmPolicy::Ask
            };
            let options = CrackOptions {
                mode: mode.into(),
                plan_file: plan,
                wordlists,
                max_length,
                parallel: ParallelConfig::default()
                    .with_workers_option(jobs)
                    .with_batch_size(batch_size)
                    .with_queue_depth_option(queue_depth)
                    .with_confirm_threshold(confirm_threshold),
                confirm,
                decrypt: !no_decrypt,
                progress: !no_progress,
                solver_timeout: Duration::from_secs(solver_timeout),
            };
            crack_document(&document, &options)
        }
        Commands::Plan {
            document,
            mode,
            plan,
            wordlists,
            max_length,
            json,
        } => show_plan(
            document.as_deref(),
            mode.into(),
            plan.as_deref(),
            wordlists,
            max_length,
            json,
        )
        .map(|()| EXIT_FOUND),
        Commands::Decrypt {
            input_dir,
            output_dir,
        } => decrypt_directory(&input_dir, &output_dir),
        Commands::Estimate { rate, max_length } => {
            show_estimates(rate, max_length).map(|()| EXIT_FOUND)
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(EXIT_FATAL);
        }
    }
}
