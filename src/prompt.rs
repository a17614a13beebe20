//! Confirmation gate for very large strategies

use std::io::{self, BufRead, Write};

/// Asked before a strategy whose estimated size exceeds the configured
/// threshold. Returning `false` skips that strategy.
pub trait ConfirmationPrompt {
    fn confirm(&self, description: &str, estimated: u64) -> bool;
}

/// Accepts every strategy (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

impl ConfirmationPrompt for AlwaysConfirm {
    fn confirm(&self, _description: &str, _estimated: u64) -> bool {
        true
    }
}

/// Declines every gated strategy (non-interactive runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

impl ConfirmationPrompt for NeverConfirm {
    fn confirm(&self, description: &str, estimated: u64) -> bool {
        log::warn!(
            "Skipping '{}' ({} candidates) without confirmation",
            description,
            estimated
        );
        false
    }
}

/// Asks on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn confirm(&self, description: &str, estimated: u64) -> bool {
        ask(&mut io::stdin().lock(), &mut io::stdout(), description, estimated)
    }
}

fn ask<R: BufRead, W: Write>(input: &mut R, output: &mut W, description: &str, estimated: u64) -> bool {
    let _ = write!(
        output,
        "Strategy '{}' will test about {} passwords. Continue? (y/N): ",
        description, estimated
    );
    let _ = output.flush();

    let mut answer = String::new();
    match input.read_line(&mut answer) {
        Ok(_) => is_yes(&answer),
        Err(_) => false,
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
