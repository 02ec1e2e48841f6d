// UI layer: yes/no prompts via `dialoguer`, progress via `indicatif` and a
// little `crossterm` colour for status markers. Commands print their results
// with `println!`; everything here is the interactive garnish around that.

use anyhow::Result;
use crossterm::style::Stylize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Display;
use std::time::Duration;

/// Ask a yes/no question that defaults to "no". `assume_yes` answers
/// without prompting (the `--yes` flag).
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let answer = Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(answer)
}

/// A bar counting files through a transfer.
pub fn progress_bar(len: u64, action: &str) -> ProgressBar {
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::with_template("{spinner} {prefix} [{bar:30}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
    bar.set_style(style);
    bar.set_prefix(action.to_string());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

/// A spinner for transfers whose size is not known up front.
pub fn spinner(msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner} {msg} ({pos} files)")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// ✓ or ✗, coloured.
pub fn status_mark(ok: bool) -> String {
    if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}

pub fn warning(msg: impl Display) {
    println!("{} {}", "Warning:".yellow().bold(), msg);
}

/// Print at most `limit` items as an indented list, then a count of the
/// rest.
pub fn print_truncated<T: Display>(items: &[T], limit: usize) {
    for item in items.iter().take(limit) {
        println!("  - {}", item);
    }
    if items.len() > limit {
        println!("  ... and {} more", items.len() - limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assume_yes_skips_the_prompt() {
        assert!(confirm("Continue?", true).unwrap());
    }

    #[test]
    fn status_mark_contains_symbol() {
        assert!(status_mark(true).contains('✓'));
        assert!(status_mark(false).contains('✗'));
    }
}
