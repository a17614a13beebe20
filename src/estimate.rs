//! Crack-time estimates for common password shapes.

use crate::search::Strategy;
use crate::search::config::{DIGITS, combinations};
use chrono::NaiveDate;

/// Benchmark throughput of a single fast GPU against PDF 1.4-1.6 hashes.
pub const DEFAULT_RATE: f64 = 6_567_200.0;

const MINUTE: f64 = 60.0;
const HOUR: f64 = 3_600.0;
const DAY: f64 = 86_400.0;
const MONTH: f64 = 2_592_000.0;
const YEAR: f64 = 31_536_000.0;

/// One line of the estimate table.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub combinations: u64,
}

impl Scenario {
    fn new<S: Into<String>>(name: S, combinations: u64) -> Self {
        Self {
            name: name.into(),
            combinations,
        }
    }

    pub fn seconds_at(&self, rate: f64) -> f64 {
        seconds_for(self.combinations, rate)
    }
}

/// Days from the first of `start_year` to the last day of `end_year`,
/// times four renderings (`DDMMYYYY`, `MMDDYYYY`, `DDMMYY`, `MMDDYY`).
pub fn date_combinations(start_year: i32, end_year: i32) -> u64 {
    let start = NaiveDate::from_ymd_opt(start_year, 1, 1);
    let end = NaiveDate::from_ymd_opt(end_year.saturating_add(1), 1, 1);
    match (start, end) {
        (Some(start), Some(end)) if start < end => (end - start).num_days() as u64 * 4,
        _ => 0,
    }
}

/// The standard table, plus brute-force rows up to `max_length` if given.
pub fn scenarios(max_length: Option<usize>) -> Vec<Scenario> {
    let digits = DIGITS.len() as u64;
    let mut table = vec![
        Scenario::new(
            "Dates since 1900 (DDMMYYYY, MMDDYYYY, DDMMYY, MMDDYY)",
            date_combinations(1900, 2025),
        ),
        Scenario::new("Numeric passwords (1-8 digits)", combinations(digits, 1, 8)),
        Scenario::new("Numeric passwords (1-12 digits)", combinations(digits, 1, 12)),
        Scenario::new("Alphanumeric lowercase (1-6 chars)", combinations(36, 1, 6)),
        Scenario::new("Alphanumeric mixed case (1-5 chars)", combinations(62, 1, 5)),
        Scenario::new("Alphanumeric + symbols (1-4 chars)", combinations(95, 1, 4)),
    ];

    if let Some(max) = max_length {
        for (label, base) in [
            ("Numeric", digits),
            ("Alphanumeric lowercase", 36),
            ("Alphanumeric mixed case", 62),
            ("Alphanumeric + symbols", 95),
        ] {
            table.push(Scenario::new(
                format!("{} (1-{} chars)", label, max),
                combinations(base, 1, max),
            ));
        }
    }
    table
}

/// Sum of the known strategy sizes, and whether any size was unknown.
pub fn plan_size(plan: &[Strategy]) -> (u64, bool) {
    plan.iter()
        .fold((0u64, false), |(total, unknown), strategy| {
            match strategy.estimated_count() {
                Some(n) => (total.saturating_add(n), unknown),
                None => (total, true),
            }
        })
}

pub fn seconds_for(combinations: u64, rate: f64) -> f64 {
    if rate <= 0.0 {
        return f64::INFINITY;
    }
    combinations as f64 / rate
}

/// Render seconds as the largest sensible unit, one decimal place.
pub fn format_crack_time(seconds: f64) -> String {
    if !seconds.is_finite() {
        "forever".to_string()
    } else if seconds < MINUTE {
        format!("{:.1} seconds", seconds)
    } else if seconds < HOUR {
        format!("{:.1} minutes", seconds / MINUTE)
    } else if seconds < DAY {
        format!("{:.1} hours", seconds / HOUR)
    } else if seconds < MONTH {
        format!("{:.1} days", seconds / DAY)
    } else if seconds < YEAR {
        format!("{:.1} months", seconds / MONTH)
    } else {
        format!("{:.1} years", seconds / YEAR)
    }
}

/// Format large numbers with commas
pub fn format_number(num: u64) -> String {
    let num_str = num.to_string();
    let mut result = String::with_capacity(num_str.len() + num_str.len() / 3);
    for (i, c) in num_str.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
