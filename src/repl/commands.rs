//! Shell commands recognized before a line reaches the statement buffer

use crate::util::config::ShellConfig;

/// Command result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// End the session and start a fresh one
    Exit,
    /// Nothing to do; prompt again
    Continue,
}

/// Recognize a command. Commands only exist between statements: while a
/// statement is open every line, `quit` included, is statement text.
pub fn recognize(
    config: &ShellConfig,
    line: &str,
    statement_open: bool,
) -> Option<CommandResult> {
    if statement_open {
        return None;
    }
    if config.is_exit_command(line) {
        return Some(CommandResult::Exit);
    }
    if line.trim().is_empty() {
        return Some(CommandResult::Continue);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_only_between_statements() {
        let config = ShellConfig::default();
        assert_eq!(recognize(&config, "quit", false), Some(CommandResult::Exit));
        assert_eq!(recognize(&config, " exit ", false), Some(CommandResult::Exit));
        assert_eq!(recognize(&config, "quit", true), None);
    }

    #[test]
    fn test_blank_line_is_skipped_only_between_statements() {
        let config = ShellConfig::default();
        assert_eq!(recognize(&config, "  ", false), Some(CommandResult::Continue));
        assert_eq!(recognize(&config, "", true), None);
    }

    #[test]
    fn test_code_is_not_a_command() {
        let config = ShellConfig::default();
        assert_eq!(recognize(&config, "quit_now = 1", false), None);
        assert_eq!(recognize(&config, "puts 'quit'", false), None);
    }

    #[test]
    fn test_custom_exit_commands() {
        let config = ShellConfig {
            exit_commands: vec!["bye".into()],
            ..ShellConfig::default()
        };
        assert_eq!(recognize(&config, "bye", false), Some(CommandResult::Exit));
        assert_eq!(recognize(&config, "quit", false), None);
    }
}
