use glimpse_core::{BOLD, Summary};
use owo_colors::OwoColorize;

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!("\n{} {} {}", "Glimpse".bold().bright_blue(), "v".dimmed(), VERSION.dimmed());
    eprintln!("{}", "Summarize links the way the bot would\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a dimmed notice that a link produced nothing
pub fn print_no_summary(url: &str) {
    eprintln!("{} {}", "·".dimmed(), format!("no summary for {}", url).dimmed());
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message.bright_red());
}

/// Print timing information for one link
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let indicator = if ms < 1500.0 { "fast".dimmed().to_string() } else { "slow".bright_yellow().to_string() };
    eprintln!("  {} {:>8.2}ms ({})", format!("{}:", label).dimmed(), ms, indicator);
}

/// Renders bold toggles as terminal bold, or leaves them untouched when `raw`.
pub fn render_line(line: &str, raw: bool) -> String {
    if raw {
        return line.to_string();
    }

    line.split(BOLD)
        .enumerate()
        .map(|(i, part)| if i % 2 == 1 { part.bold().to_string() } else { part.to_string() })
        .collect()
}

/// Print every line of a summary to stdout
pub fn print_summary(summary: &Summary, raw: bool) {
    for line in summary.lines() {
        println!("{}", render_line(line, raw));
    }
}
