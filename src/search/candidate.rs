//! Lazy candidate generation for each strategy
//!
//! Every generator is a plain `Iterator<Item = String>`. Charset and numeric
//! generators keep only an odometer of indices, so memory stays O(length)
//! no matter how large the search space is. Derived patterns (dates, years,
//! file names) are small and finite; they pass through [`Unique`] so a
//! strategy never yields the same candidate twice.

use crate::error::ConfigError;
use crate::search::config::{
    DIGITS, DateFormat, DayMonthOrder, MONTH_DAY_DAYS, MONTH_DAY_MONTHS, Strategy, unique_chars,
};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Boxed candidate stream handed to the batcher.
pub type CandidateIter = Box<dyn Iterator<Item = String> + Send>;

impl Strategy {
    /// Start a fresh pass over this strategy's candidates.
    ///
    /// Calling this again restarts the sequence from the beginning.
    pub fn candidates(&self) -> Result<CandidateIter, ConfigError> {
        let iter: CandidateIter = match self {
            Strategy::List { candidates, .. } => {
                Box::new(Unique::new(candidates.clone().into_iter()))
            }
            Strategy::Wordlist { path } => Box::new(wordlist_lines(path)?),
            Strategy::Numeric { min_len, max_len } => {
                Box::new(CharsetProduct::new(DIGITS, *min_len, *max_len))
            }
            Strategy::Charset {
                charset,
                min_len,
                max_len,
                ..
            } => Box::new(CharsetProduct::new(charset, *min_len, *max_len)),
            Strategy::Years {
                start,
                end,
                two_digit,
            } => Box::new(Unique::new(years(*start, *end, *two_digit))),
            Strategy::MonthDay { orders, suffixes } => Box::new(Unique::new(month_days(
                orders.clone(),
                suffixes.clone(),
            ))),
            Strategy::Dates {
                start,
                end,
                formats,
            } => Box::new(Unique::new(dates(*start, *end, formats.clone()))),
            Strategy::FilenameVariants { file_name } => {
                Box::new(Unique::new(filename_variants(file_name).into_iter()))
            }
            Strategy::ExternalSolver => Box::new(std::iter::empty()),
        };
        Ok(iter)
    }
}

/// Odometer over every string of `charset` with a length in `min_len..=max_len`.
///
/// Lengths ascend; within a length the order is lexicographic by charset
/// position. Length 0 is never produced.
#[derive(Debug, Clone)]
pub struct CharsetProduct {
    charset: Vec<char>,
    max_len: usize,
    indices: Vec<usize>,
    exhausted: bool,
}

impl CharsetProduct {
    pub fn new(charset: &str, min_len: usize, max_len: usize) -> Self {
        let charset = unique_chars(charset);
        let min_len = min_len.max(1);
        let exhausted = charset.is_empty() || min_len > max_len;
        Self {
            charset,
            max_len,
            indices: vec![0; min_len],
            exhausted,
        }
    }

    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.charset.len() {
                return;
            }
            self.indices[pos] = 0;
        }

        // Every position wrapped: move to the next length.
        if self.indices.len() >= self.max_len {
            self.exhausted = true;
        } else {
            self.indices.push(0);
        }
    }
}

impl Iterator for CharsetProduct {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }
        let candidate: String = self.indices.iter().map(|&i| self.charset[i]).collect();
        self.advance();
        Some(candidate)
    }
}

/// Drops candidates already produced earlier in the same stream.
pub struct Unique<I> {
    inner: I,
    seen: HashSet<String>,
}

impl<I> Unique<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            seen: HashSet::new(),
        }
    }
}

impl<I: Iterator<Item = String>> Iterator for Unique<I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            let candidate = self.inner.next()?;
            if self.seen.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
    }
}

/// Stream a wordlist file line by line. Blank lines are skipped and
/// invalid UTF-8 is replaced rather than rejected. A read error ends the
/// stream early with a warning.
fn wordlist_lines(path: &Path) -> Result<impl Iterator<Item = String> + Send, ConfigError> {
    let file = File::open(path).map_err(|source| ConfigError::Wordlist {
        path: path.to_path_buf(),
        source,
    })?;
    let source = path.to_path_buf();
    let lines = BufReader::new(file)
        .split(b'\n')
        .map_while(move |line| match line {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::warn!(
                    "Stopped reading wordlist {}, remaining lines skipped: {}",
                    source.display(),
                    e
                );
                None
            }
        })
        .map(|bytes| {
            let mut line = String::from_utf8_lossy(&bytes).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            line
        })
        .filter(|line| !line.is_empty());
    Ok(lines)
}

fn years(start: i32, end: i32, two_digit: bool) -> impl Iterator<Item = String> + Send {
    (start..=end).flat_map(move |year| {
        let full = format!("{:04}", year);
        let short = two_digit.then(|| full[full.len() - 2..].to_string());
        std::iter::once(full).chain(short)
    })
}

/// `(day, month)` for day 1..=31 and month 1..=12, day-major.
fn day_month_grid() -> impl Iterator<Item = (u32, u32)> + Send {
    (1..=MONTH_DAY_DAYS).flat_map(|day| (1..=MONTH_DAY_MONTHS).map(move |month| (day, month)))
}

fn month_days(
    orders: Vec<DayMonthOrder>,
    suffixes: Vec<String>,
) -> impl Iterator<Item = String> + Send {
    let suffixes = if suffixes.is_empty() {
        vec![String::new()]
    } else {
        suffixes
    };
    day_month_grid().flat_map(move |(day, month)| {
        let mut out = Vec::with_capacity(orders.len() * suffixes.len());
        for suffix in &suffixes {
            for order in &orders {
                out.push(format!("{}{}", order.render(day, month), suffix));
            }
        }
        out
    })
}

fn dates(
    start: NaiveDate,
    end: NaiveDate,
    formats: Vec<DateFormat>,
) -> impl Iterator<Item = String> + Send {
    start
        .iter_days()
        .take_while(move |date| *date <= end)
        .flat_map(move |date| {
            formats
                .iter()
                .map(|format| format.render(date))
                .collect::<Vec<_>>()
        })
}

/// Candidates derived from a document's file name, in a fixed order:
/// stem, stem without separators (plain, lower, upper, title), full name,
/// lowercase full name.
pub fn filename_variants(file_name: &str) -> Vec<String> {
    if file_name.is_empty() {
        return Vec::new();
    }
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let compact: String = stem.chars().filter(|c| *c != '_' && *c != '-').collect();

    vec![
        stem,
        compact.clone(),
        compact.to_lowercase(),
        compact.to_uppercase(),
        title_case(&compact),
        file_name.to_string(),
        file_name.to_lowercase(),
    ]
}

/// Upper-case the first letter of every alphabetic run, lower-case the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}
