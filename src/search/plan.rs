//! Strategy plans: built-in presets and JSON plan files

use crate::error::ConfigError;
use crate::search::config::{DateFormat, DayMonthOrder, LETTERS, LOWERCASE, Strategy};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Passwords people actually put on shared documents.
pub const COMMON_PASSWORDS: &[&str] = &[
    "", "password", "123456", "password123", "admin", "user", "guest", "police", "Police",
    "POLICE", "document", "pdf", "secret", "unlock", "open", "test", "demo", "sample", "default",
    "qwerty", "abc123", "123123", "111111", "000000", "root", "toor", "pass", "1234", "12345",
    "1234567890",
];

/// Added on top of [`COMMON_PASSWORDS`] by the broader presets.
pub const EXTRA_COMMON_PASSWORDS: &[&str] = &["letmein", "welcome", "monkey", "dragon", "master"];

pub const KEYBOARD_PATTERNS: &[&str] = &[
    "qwerty", "asdf", "zxcv", "123qwe", "qwe123", "asd123", "qwerty123", "123456789",
    "987654321", "abcdef", "fedcba",
];

pub const BASE_WORDS: &[&str] = &["password", "admin", "user", "test", "demo", "police"];
pub const AFFIXES: &[&str] = &["123", "1", "!", "@", "#", "2024", "2025"];

/// Longest brute-force length for the exhaustive preset unless overridden.
pub const DEFAULT_EXHAUSTIVE_MAX_LENGTH: usize = 4;

/// Preset plan selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// External solver when available, then the optimized preset
    #[default]
    Auto,
    /// Common passwords, short numbers and date fragments
    Quick,
    /// Broader dictionary and pattern mix
    Optimized,
    /// Charset brute force plus structured number patterns
    Exhaustive,
    /// Every calendar date since 1980
    Dates,
    /// External solver only
    Gpu,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Auto => write!(f, "auto"),
            Mode::Quick => write!(f, "quick"),
            Mode::Optimized => write!(f, "optimized"),
            Mode::Exhaustive => write!(f, "exhaustive"),
            Mode::Dates => write!(f, "dates"),
            Mode::Gpu => write!(f, "gpu"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "quick" => Ok(Mode::Quick),
            "optimized" | "optimised" => Ok(Mode::Optimized),
            "exhaustive" | "brute" => Ok(Mode::Exhaustive),
            "dates" => Ok(Mode::Dates),
            "gpu" => Ok(Mode::Gpu),
            _ => Err(format!(
                "Unknown mode: '{}'. Valid options: auto, quick, optimized, exhaustive, dates, gpu",
                s
            )),
        }
    }
}

/// Inputs that shape a preset beyond the mode itself.
#[derive(Debug, Clone)]
pub struct PlanOptions {
    /// Upper brute-force length for the exhaustive preset.
    pub max_length: Option<usize>,
    /// Extra dictionaries, tried after the cheap list phases.
    pub wordlists: Vec<PathBuf>,
    /// Reference date for year ranges and the dates preset.
    pub today: NaiveDate,
    /// Whether `auto` should lead with the external solver.
    pub solver_available: bool,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            max_length: None,
            wordlists: Vec::new(),
            today: chrono::Local::now().date_naive(),
            solver_available: false,
        }
    }
}

impl PlanOptions {
    pub fn with_max_length(mut self, max_length: Option<usize>) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_wordlists(mut self, wordlists: Vec<PathBuf>) -> Self {
        self.wordlists = wordlists;
        self
    }

    pub fn with_solver_available(mut self, available: bool) -> Self {
        self.solver_available = available;
        self
    }
}

/// Build the ordered plan for `mode` against `document`.
///
/// Wordlists from `options` run after the preset's list phases and before
/// its generated phases.
pub fn build_plan(mode: Mode, document: &Path, options: &PlanOptions) -> Vec<Strategy> {
    let (head, tail) = match mode {
        Mode::Auto => {
            let (mut head, tail) = optimized(document, options.today);
            if options.solver_available {
                head.insert(0, Strategy::ExternalSolver);
            }
            (head, tail)
        }
        Mode::Quick => quick(document),
        Mode::Optimized => optimized(document, options.today),
        Mode::Exhaustive => (
            Vec::new(),
            exhaustive(options.max_length.unwrap_or(DEFAULT_EXHAUSTIVE_MAX_LENGTH)),
        ),
        Mode::Dates => (Vec::new(), vec![dates_since_1980(options.today)]),
        Mode::Gpu => (vec![Strategy::ExternalSolver], Vec::new()),
    };

    let wordlists = options
        .wordlists
        .iter()
        .map(|path| Strategy::Wordlist { path: path.clone() });

    head.into_iter().chain(wordlists).chain(tail).collect()
}

/// Candidate strategies fed to the external solver's dictionary.
pub fn solver_wordlist(document: &Path) -> Vec<Strategy> {
    vec![
        common_list(true),
        filename_variants(document),
        Strategy::Numeric {
            min_len: 1,
            max_len: 6,
        },
        Strategy::Years {
            start: 1950,
            end: 2029,
            two_digit: true,
        },
        Strategy::MonthDay {
            orders: both_orders(),
            suffixes: suffixes(&["", "24", "25"]),
        },
    ]
}

fn quick(document: &Path) -> (Vec<Strategy>, Vec<Strategy>) {
    let head = vec![common_list(false), filename_variants(document)];
    let tail = vec![
        Strategy::Numeric {
            min_len: 1,
            max_len: 6,
        },
        Strategy::Years {
            start: 1950,
            end: 2029,
            two_digit: false,
        },
        Strategy::MonthDay {
            orders: both_orders(),
            suffixes: suffixes(&["", "21", "22", "23", "24", "25"]),
        },
    ];
    (head, tail)
}

fn optimized(document: &Path, today: NaiveDate) -> (Vec<Strategy>, Vec<Strategy>) {
    let year = today.year();
    let head = vec![
        common_list(true),
        filename_variants(document),
        Strategy::list("keyboard", KEYBOARD_PATTERNS),
        word_variations(),
    ];

    let repeated: Vec<String> = (5..=8)
        .flat_map(|len| ["0", "1", "2", "9"].map(|digit| digit.repeat(len)))
        .collect();
    let year_suffixes = vec![
        String::new(),
        year.to_string(),
        format!("{:02}", year.rem_euclid(100)),
    ];

    let tail = vec![
        Strategy::Numeric {
            min_len: 1,
            max_len: 4,
        },
        Strategy::List {
            name: "repeated digits".to_string(),
            candidates: repeated,
        },
        Strategy::Years {
            start: 1950,
            end: year + 9,
            two_digit: true,
        },
        Strategy::MonthDay {
            orders: both_orders(),
            suffixes: year_suffixes,
        },
    ];
    (head, tail)
}

fn exhaustive(max_length: usize) -> Vec<Strategy> {
    let mut plan = Vec::new();
    if max_length > 0 {
        plan.push(Strategy::Numeric {
            min_len: 1,
            max_len: max_length.min(6),
        });
        plan.push(Strategy::charset("lowercase", LOWERCASE, 1, max_length.min(4)));
        plan.push(Strategy::charset("letters", LETTERS, 1, max_length.min(3)));
    }

    // Structured numbers: fixed-width 2-4 digit codes, years, phone and
    // SSN shapes.
    plan.push(Strategy::Numeric {
        min_len: 2,
        max_len: 4,
    });
    plan.push(Strategy::Years {
        start: 1940,
        end: 2029,
        two_digit: true,
    });
    plan.push(Strategy::List {
        name: "phone numbers".to_string(),
        candidates: joined_patterns(&[
            &["123", "555", "000", "911"],
            &["123", "555", "000"],
            &["0000", "1234", "5678"],
        ]),
    });
    plan.push(Strategy::List {
        name: "ssn".to_string(),
        candidates: joined_patterns(&[
            &["123", "555", "000", "111", "222"],
            &["12", "34", "56", "00", "11"],
            &["1234", "5678", "0000", "1111"],
        ]),
    });
    plan
}

fn dates_since_1980(today: NaiveDate) -> Strategy {
    let start = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap_or(NaiveDate::MIN);
    Strategy::Dates {
        start,
        end: today.max(start),
        formats: vec![
            DateFormat::Ymd,
            DateFormat::YmdDash,
            DateFormat::DmyDot,
            DateFormat::DmyDash,
            DateFormat::Dmy,
        ],
    }
}

fn common_list(extended: bool) -> Strategy {
    let mut candidates: Vec<String> = COMMON_PASSWORDS.iter().map(|p| p.to_string()).collect();
    if extended {
        candidates.extend(EXTRA_COMMON_PASSWORDS.iter().map(|p| p.to_string()));
    }
    Strategy::List {
        name: "common".to_string(),
        candidates,
    }
}

fn filename_variants(document: &Path) -> Strategy {
    Strategy::FilenameVariants {
        file_name: document_file_name(document),
    }
}

fn document_file_name(document: &Path) -> String {
    document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `word+affix`, `affix+word` and `Word+affix` for every base word.
fn word_variations() -> Strategy {
    let mut candidates = Vec::with_capacity(BASE_WORDS.len() * AFFIXES.len() * 3);
    for word in BASE_WORDS {
        let mut capitalized = word[..1].to_uppercase();
        capitalized.push_str(&word[1..]);
        for affix in AFFIXES {
            candidates.push(format!("{}{}", word, affix));
            candidates.push(format!("{}{}", affix, word));
            candidates.push(format!("{}{}", capitalized, affix));
        }
    }
    Strategy::List {
        name: "word variations".to_string(),
        candidates,
    }
}

/// Every combination of the parts, both run together and dash-separated.
fn joined_patterns(parts: &[&[&str]; 3]) -> Vec<String> {
    let mut out = Vec::new();
    for a in parts[0] {
        for b in parts[1] {
            for c in parts[2] {
                out.push(format!("{}{}{}", a, b, c));
                out.push(format!("{}-{}-{}", a, b, c));
            }
        }
    }
    out
}

fn both_orders() -> Vec<DayMonthOrder> {
    vec![DayMonthOrder::DayMonth, DayMonthOrder::MonthDay]
}

fn suffixes(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// On-disk plan: `{ "strategies": [ { "kind": "numeric", ... }, ... ] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFile {
    pub strategies: Vec<Strategy>,
}

/// Load and validate a JSON plan. `filename_variants` entries without a
/// file name take the document's.
pub fn load_plan_file(path: &Path, document: &Path) -> Result<Vec<Strategy>, ConfigError> {
    let plan_error = |message: String| ConfigError::PlanFile {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| plan_error(e.to_string()))?;
    let file: PlanFile = serde_json::from_str(&content).map_err(|e| plan_error(e.to_string()))?;
    if file.strategies.is_empty() {
        return Err(ConfigError::EmptyPlan);
    }

    let strategies: Vec<Strategy> = file
        .strategies
        .into_iter()
        .map(|strategy| match strategy {
            Strategy::FilenameVariants { file_name } if file_name.is_empty() => {
                filename_variants(document)
            }
            other => other,
        })
        .collect();

    for strategy in &strategies {
        strategy.validate()?;
    }
    Ok(strategies)
}
