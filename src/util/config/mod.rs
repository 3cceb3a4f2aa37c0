//! IAS shell configuration
//!
//! The shell has a single always-on interactive mode, so configuration is a
//! plain value handed to the session by whoever boots it. Defaults reproduce
//! the device firmware; [`ShellConfig::host`] is the preset used when the shell
//! runs on a desktop terminal.
//!
//! # Usage
//!
//! ```rust
//! use ias::util::config::ShellConfig;
//!
//! let config = ShellConfig::from_ron_str(r#"(continuation_prompt: ".. ")"#).unwrap();
//! assert_eq!(config.prompt, "> ");
//! assert_eq!(config.continuation_prompt, ".. ");
//! ```

use serde::{Deserialize, Serialize};

/// Carriage return, the device line terminator
pub const CR: u8 = 0x0D;
/// Line feed
pub const LF: u8 = 0x0A;

/// Environment variable holding a RON document that overrides the host preset
pub const CONFIG_ENV: &str = "IAS_CONFIG";

/// Shell configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Prompt shown when no statement is open
    pub prompt: String,
    /// Prompt shown while a statement spans several lines
    pub continuation_prompt: String,
    /// Prefix written before the inspected result of a statement
    pub result_prefix: String,
    /// Prefix written before a syntax error message
    pub syntax_error_prefix: String,
    /// Lines that end the session when no statement is open
    pub exit_commands: Vec<String>,
    /// Line printed when the session ends
    pub farewell: String,
    /// Bytes that terminate an input line
    pub terminators: Vec<u8>,
    /// Echo received bytes back to the transport
    pub echo: bool,
    /// Line ending written for every `\n` of output
    pub line_ending: String,
    /// Maximum number of bytes kept per input line
    pub max_line_len: usize,
    /// Print the greeting after every runtime (re)initialization
    pub banner: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: "> ".to_string(),
            continuation_prompt: "* ".to_string(),
            result_prefix: " => ".to_string(),
            syntax_error_prefix: "Syntax Error: ".to_string(),
            exit_commands: vec!["quit".to_string(), "exit".to_string()],
            farewell: "Bye!".to_string(),
            terminators: vec![CR],
            echo: true,
            line_ending: "\r\n".to_string(),
            max_line_len: 1024,
            banner: true,
        }
    }
}

impl ShellConfig {
    /// Preset for a desktop terminal: the terminal echoes and sends LF.
    pub fn host() -> Self {
        Self {
            terminators: vec![CR, LF],
            echo: false,
            line_ending: "\n".to_string(),
            ..Self::default()
        }
    }

    /// Host preset with the overrides from `IAS_CONFIG`, if it is set.
    /// The variable holds the document itself; nothing is read from disk.
    pub fn host_from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV) {
            Ok(source) => Self::host().with_ron_overrides(&source),
            Err(_) => Ok(Self::host()),
        }
    }

    /// Parse a RON document; missing fields keep their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        Self::default().with_ron_overrides(source)
    }

    /// Replace the fields named in a RON document, keep the rest.
    pub fn with_ron_overrides(
        mut self,
        source: &str,
    ) -> Result<Self, ConfigError> {
        let overrides: Overrides = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(source)
            .map_err(ConfigError::ParseError)?;
        overrides.apply(&mut self);
        self.validate()?;
        Ok(self)
    }

    /// Render the configuration as RON.
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(ConfigError::SerializeError)
    }

    /// Check the invariants the line reader relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.terminators.is_empty() {
            return Err(ConfigError::Invalid("at least one line terminator is required".into()));
        }
        if self.max_line_len == 0 {
            return Err(ConfigError::Invalid("max_line_len must be positive".into()));
        }
        Ok(())
    }

    /// Whether `byte` ends an input line
    #[inline]
    pub fn is_terminator(
        &self,
        byte: u8,
    ) -> bool {
        self.terminators.contains(&byte)
    }

    /// Whether `line` is one of the exit commands
    pub fn is_exit_command(
        &self,
        line: &str,
    ) -> bool {
        let line = line.trim();
        self.exit_commands.iter().any(|cmd| cmd == line)
    }
}

/// Fields a RON document may set. Absent fields leave the base untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct Overrides {
    prompt: Option<String>,
    continuation_prompt: Option<String>,
    result_prefix: Option<String>,
    syntax_error_prefix: Option<String>,
    exit_commands: Option<Vec<String>>,
    farewell: Option<String>,
    terminators: Option<Vec<u8>>,
    echo: Option<bool>,
    line_ending: Option<String>,
    max_line_len: Option<usize>,
    banner: Option<bool>,
}

impl Overrides {
    fn apply(
        self,
        config: &mut ShellConfig,
    ) {
        macro_rules! set {
            ($($field:ident),*) => {
                $(if let Some(value) = self.$field {
                    config.$field = value;
                })*
            };
        }
        set!(
            prompt,
            continuation_prompt,
            result_prefix,
            syntax_error_prefix,
            exit_commands,
            farewell,
            terminators,
            echo,
            line_ending,
            max_line_len,
            banner
        );
    }
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_device_firmware() {
        let config = ShellConfig::default();
        assert_eq!(config.prompt, "> ");
        assert_eq!(config.continuation_prompt, "* ");
        assert_eq!(config.terminators, vec![CR]);
        assert_eq!(config.max_line_len, 1024);
        assert!(config.echo);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = ShellConfig::from_ron_str(r#"(farewell: "ciao", echo: false)"#).unwrap();
        assert_eq!(config.farewell, "ciao");
        assert!(!config.echo);
        assert_eq!(config.result_prefix, " => ");
    }

    #[test]
    fn overrides_apply_on_top_of_host_preset() {
        let config = ShellConfig::host()
            .with_ron_overrides(r#"(prompt: "ias> ", banner: false)"#)
            .unwrap();
        assert_eq!(config.prompt, "ias> ");
        assert!(!config.banner);
        assert!(!config.echo);
        assert_eq!(config.line_ending, "\n");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = ShellConfig::host().with_ron_overrides("(promt: \"x\")").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn renders_back_to_ron() {
        let text = ShellConfig::host().to_ron_string().unwrap();
        assert_eq!(ShellConfig::from_ron_str(&text).unwrap(), ShellConfig::host());
    }

    #[test]
    fn rejects_empty_terminators() {
        let err = ShellConfig::from_ron_str("(terminators: [])").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn exit_commands_ignore_surrounding_space() {
        let config = ShellConfig::default();
        assert!(config.is_exit_command("  quit "));
        assert!(config.is_exit_command("exit"));
        assert!(!config.is_exit_command("quit!"));
    }

    #[test]
    fn host_preset_accepts_lf() {
        let config = ShellConfig::host();
        assert!(config.is_terminator(LF));
        assert!(config.is_terminator(CR));
        assert_eq!(config.line_ending, "\n");
    }
}
