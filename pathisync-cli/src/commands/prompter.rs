//! Terminal answers for reconciliation prompts.

use colored::Colorize;
use dialoguer::{Confirm, Input, Select};

use pathisync_sync::{Interaction, SyncError};

/// [`Interaction`] on stdin/stdout; narration is coloured, diffs per line.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Interaction for TerminalPrompter {
    fn notice(&mut self, message: &str) {
        for line in message.lines() {
            println!("{}", paint(line));
        }
    }

    fn choose(&mut self, prompt: &str, options: &[String]) -> Result<usize, SyncError> {
        Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()
            .map_err(prompt_err)
    }

    fn input(&mut self, prompt: &str) -> Result<String, SyncError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(prompt_err)
    }

    fn confirm(&mut self, prompt: &str) -> Result<bool, SyncError> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(prompt_err)
    }
}

fn prompt_err(err: dialoguer::Error) -> SyncError {
    SyncError::Prompt(err.to_string())
}

fn paint(line: &str) -> colored::ColoredString {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold()
    } else if line.starts_with('+') {
        line.green()
    } else if line.starts_with('-') {
        line.red()
    } else if line.starts_with("@@") {
        line.cyan()
    } else {
        line.yellow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_lines_are_coloured_by_side() {
        colored::control::set_override(true);
        assert_eq!(paint("+  \"a\": 1").to_string(), "+  \"a\": 1".green().to_string());
        assert_eq!(paint("-  \"a\": 2").to_string(), "-  \"a\": 2".red().to_string());
        assert_eq!(paint("--- remote/x").to_string(), "--- remote/x".bold().to_string());
        assert_eq!(
            paint("There is a difference").to_string(),
            "There is a difference".yellow().to_string()
        );
        colored::control::unset_override();
    }
}
