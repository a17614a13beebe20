//! Strategy definitions for candidate generation

use crate::error::ConfigError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest candidate a charset or numeric strategy may produce.
pub const MAX_CANDIDATE_LENGTH: usize = 32;

pub const DIGITS: &str = "0123456789";
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
pub const LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Day/month pairs are taken from the full 31 x 12 grid, so impossible
/// dates such as `3102` are included.
pub const MONTH_DAY_DAYS: u32 = 31;
pub const MONTH_DAY_MONTHS: u32 = 12;
pub const MONTH_DAY_PAIRS: u64 = (MONTH_DAY_DAYS * MONTH_DAY_MONTHS) as u64;

/// Rendering of a full calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `YYYYMMDD`
    Ymd,
    /// `YYYY-MM-DD`
    YmdDash,
    /// `DD.MM.YYYY`
    DmyDot,
    /// `DD-MM-YYYY`
    DmyDash,
    /// `DDMMYYYY`
    Dmy,
    /// `MMDDYYYY`
    Mdy,
    /// `DDMMYY`
    DmyShort,
    /// `MMDDYY`
    MdyShort,
}

impl DateFormat {
    fn pattern(self) -> &'static str {
        match self {
            DateFormat::Ymd => "%Y%m%d",
            DateFormat::YmdDash => "%Y-%m-%d",
            DateFormat::DmyDot => "%d.%m.%Y",
            DateFormat::DmyDash => "%d-%m-%Y",
            DateFormat::Dmy => "%d%m%Y",
            DateFormat::Mdy => "%m%d%Y",
            DateFormat::DmyShort => "%d%m%y",
            DateFormat::MdyShort => "%m%d%y",
        }
    }

    pub fn render(self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }
}

impl std::fmt::Display for DateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DateFormat::Ymd => "YYYYMMDD",
            DateFormat::YmdDash => "YYYY-MM-DD",
            DateFormat::DmyDot => "DD.MM.YYYY",
            DateFormat::DmyDash => "DD-MM-YYYY",
            DateFormat::Dmy => "DDMMYYYY",
            DateFormat::Mdy => "MMDDYYYY",
            DateFormat::DmyShort => "DDMMYY",
            DateFormat::MdyShort => "MMDDYY",
        };
        write!(f, "{}", label)
    }
}

/// Ordering of a day/month pair without a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayMonthOrder {
    /// `DDMM`
    DayMonth,
    /// `MMDD`
    MonthDay,
}

impl DayMonthOrder {
    pub fn render(self, day: u32, month: u32) -> String {
        match self {
            DayMonthOrder::DayMonth => format!("{:02}{:02}", day, month),
            DayMonthOrder::MonthDay => format!("{:02}{:02}", month, day),
        }
    }
}

/// A named generation policy producing an ordered candidate sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// Explicit candidates, tried in insertion order.
    List {
        name: String,
        candidates: Vec<String>,
    },
    /// Dictionary file with one candidate per line.
    Wordlist { path: PathBuf },
    /// Every digit string with a length in `min_len..=max_len`.
    Numeric { min_len: usize, max_len: usize },
    /// Every string over `charset` with a length in `min_len..=max_len`.
    Charset {
        name: String,
        charset: String,
        min_len: usize,
        max_len: usize,
    },
    /// Four-digit years, optionally followed by their two-digit form.
    Years {
        start: i32,
        end: i32,
        #[serde(default)]
        two_digit: bool,
    },
    /// Day/month pairs over the 31 x 12 grid, each followed by every suffix.
    /// An empty suffix list yields the bare pairs.
    MonthDay {
        orders: Vec<DayMonthOrder>,
        #[serde(default)]
        suffixes: Vec<String>,
    },
    /// Every date in `start..=end`, rendered in each format.
    Dates {
        start: NaiveDate,
        end: NaiveDate,
        formats: Vec<DateFormat>,
    },
    /// Variants of the document's file name.
    FilenameVariants {
        #[serde(default)]
        file_name: String,
    },
    /// Hand the search to an external solver.
    ExternalSolver,
}

impl Strategy {
    pub fn list<S: Into<String>>(name: S, candidates: &[&str]) -> Self {
        Strategy::List {
            name: name.into(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn charset<S: Into<String>>(name: S, charset: &str, min_len: usize, max_len: usize) -> Self {
        Strategy::Charset {
            name: name.into(),
            charset: charset.to_string(),
            min_len,
            max_len,
        }
    }

    /// Short machine-friendly name used in logs and telemetry.
    pub fn name(&self) -> &str {
        match self {
            Strategy::List { name, .. } => name,
            Strategy::Wordlist { .. } => "wordlist",
            Strategy::Numeric { .. } => "numeric",
            Strategy::Charset { name, .. } => name,
            Strategy::Years { .. } => "years",
            Strategy::MonthDay { .. } => "month-day",
            Strategy::Dates { .. } => "dates",
            Strategy::FilenameVariants { .. } => "filename",
            Strategy::ExternalSolver => "external-solver",
        }
    }

    /// Check the parameters before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Strategy::Numeric { min_len, max_len } => {
                validate_lengths(self.name(), *min_len, *max_len)
            }
            Strategy::Charset {
                name,
                charset,
                min_len,
                max_len,
            } => {
                validate_lengths(name, *min_len, *max_len)?;
                if charset.is_empty() && *max_len > 0 {
                    return Err(ConfigError::EmptyCharset(name.clone()));
                }
                Ok(())
            }
            Strategy::Years { start, end, .. } => {
                if start > end || *start < 0 || *end > 9999 {
                    return Err(ConfigError::InvalidRange {
                        strategy: self.name().to_string(),
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
                Ok(())
            }
            Strategy::MonthDay { orders, .. } => {
                if orders.is_empty() {
                    return Err(ConfigError::NoFormats(self.name().to_string()));
                }
                Ok(())
            }
            Strategy::Dates {
                start,
                end,
                formats,
            } => {
                if start > end {
                    return Err(ConfigError::InvalidRange {
                        strategy: self.name().to_string(),
                        start: start.to_string(),
                        end: end.to_string(),
                    });
                }
                if formats.is_empty() {
                    return Err(ConfigError::NoFormats(self.name().to_string()));
                }
                Ok(())
            }
            Strategy::Wordlist { path } => std::fs::File::open(path)
                .map(|_| ())
                .map_err(|source| ConfigError::Wordlist {
                    path: path.clone(),
                    source,
                }),
            Strategy::List { .. } | Strategy::FilenameVariants { .. } | Strategy::ExternalSolver => {
                Ok(())
            }
        }
    }

    /// Upper bound on the number of candidates, saturating at `u64::MAX`.
    /// `None` when the size is not known up front.
    pub fn estimated_count(&self) -> Option<u64> {
        match self {
            Strategy::List { candidates, .. } => Some(candidates.len() as u64),
            Strategy::Wordlist { .. } | Strategy::ExternalSolver => None,
            Strategy::Numeric { min_len, max_len } => {
                Some(combinations(DIGITS.len() as u64, *min_len, *max_len))
            }
            Strategy::Charset {
                charset,
                min_len,
                max_len,
                ..
            } => Some(combinations(
                unique_chars(charset).len() as u64,
                *min_len,
                *max_len,
            )),
            Strategy::Years {
                start,
                end,
                two_digit,
            } => {
                let years = (i64::from(*end) - i64::from(*start) + 1).max(0) as u64;
                Some(if *two_digit { years * 2 } else { years })
            }
            Strategy::MonthDay { orders, suffixes } => {
                Some(MONTH_DAY_PAIRS * orders.len() as u64 * suffixes.len().max(1) as u64)
            }
            Strategy::Dates {
                start,
                end,
                formats,
            } => {
                let days = (*end - *start).num_days() + 1;
                Some(days.max(0) as u64 * formats.len() as u64)
            }
            Strategy::FilenameVariants { .. } => Some(FILENAME_VARIANT_COUNT),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::List { name, candidates } => {
                write!(f, "{} ({} candidates)", name, candidates.len())
            }
            Strategy::Wordlist { path } => write!(f, "wordlist {}", path.display()),
            Strategy::Numeric { min_len, max_len } => {
                write!(f, "numeric {}-{} digits", min_len, max_len)
            }
            Strategy::Charset {
                name,
                charset,
                min_len,
                max_len,
            } => write!(
                f,
                "{} {}-{} chars over {} symbols",
                name,
                min_len,
                max_len,
                unique_chars(charset).len()
            ),
            Strategy::Years {
                start,
                end,
                two_digit,
            } => {
                write!(f, "years {}-{}", start, end)?;
                if *two_digit {
                    write!(f, " (+ two-digit)")?;
                }
                Ok(())
            }
            Strategy::MonthDay { orders, suffixes } => {
                let orders: Vec<&str> = orders
                    .iter()
                    .map(|o| match o {
                        DayMonthOrder::DayMonth => "DDMM",
                        DayMonthOrder::MonthDay => "MMDD",
                    })
                    .collect();
                write!(f, "month-day {}", orders.join("/"))?;
                if !suffixes.is_empty() {
                    write!(f, " x {} suffixes", suffixes.len())?;
                }
                Ok(())
            }
            Strategy::Dates {
                start,
                end,
                formats,
            } => {
                let formats: Vec<String> = formats.iter().map(|d| d.to_string()).collect();
                write!(f, "dates {} to {} as {}", start, end, formats.join(", "))
            }
            Strategy::FilenameVariants { file_name } => {
                write!(f, "filename variants of '{}'", file_name)
            }
            Strategy::ExternalSolver => write!(f, "external solver"),
        }
    }
}

/// Number of variants derived from a file name (before de-duplication).
pub const FILENAME_VARIANT_COUNT: u64 = 7;

fn validate_lengths(strategy: &str, min_len: usize, max_len: usize) -> Result<(), ConfigError> {
    if min_len > max_len {
        return Err(ConfigError::InvalidLengthRange {
            strategy: strategy.to_string(),
            min: min_len,
            max: max_len,
        });
    }
    if max_len > MAX_CANDIDATE_LENGTH {
        return Err(ConfigError::LengthTooLarge(max_len));
    }
    Ok(())
}

/// Characters of `charset` in first-appearance order, duplicates removed.
pub fn unique_chars(charset: &str) -> Vec<char> {
    let mut chars: Vec<char> = Vec::with_capacity(charset.len());
    for c in charset.chars() {
        if !chars.contains(&c) {
            chars.push(c);
        }
    }
    chars
}

/// Sum of `base^len` over `min_len..=max_len`. Lengths start at 1.
pub fn combinations(base: u64, min_len: usize, max_len: usize) -> u64 {
    (min_len.max(1)..=max_len).fold(0u64, |total, len| {
        let count = u32::try_from(len)
            .ok()
            .and_then(|len| base.checked_pow(len))
            .unwrap_or(u64::MAX);
        total.saturating_add(count)
    })
}
