use colored::Colorize;
use std::fmt;
use std::process;

/// Exit codes for the CLI.
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
/// `check` found an index that must be rebuilt.
pub const EXIT_STALE: i32 = 3;

/// Unified error type for CLI operations.
pub enum CliError {
    /// Error from the index layer.
    Index(gribx_index::IndexError),
    /// Config file issues.
    Config(String),
    /// Bad file path, unreadable input, parse failure.
    Input(String),
    /// Group, value or record not found.
    NotFound(String),
    /// Argument / usage errors.
    Usage(String),
    /// Index exists but is out of date.
    Stale(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Index(e) if e.is_corrupt() => write!(
                f,
                "{} {e}\n  {} rebuild it with 'gribx build'",
                "error:".red().bold(),
                "help:".cyan().bold(),
            ),
            CliError::Index(e) => write!(f, "{} {e}", "error:".red().bold()),
            CliError::Config(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Input(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::NotFound(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Usage(msg) => write!(f, "{} {msg}", "error:".red().bold()),
            CliError::Stale(msg) => write!(f, "{} {msg}", "stale:".yellow().bold()),
        }
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<gribx_index::IndexError> for CliError {
    fn from(e: gribx_index::IndexError) -> Self {
        CliError::Index(e)
    }
}

impl From<gribx_core::Error> for CliError {
    fn from(e: gribx_core::Error) -> Self {
        CliError::Index(e.into())
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Input(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Input(format!("JSON parse error: {e}"))
    }
}

impl From<toml::de::Error> for CliError {
    fn from(e: toml::de::Error) -> Self {
        CliError::Config(format!("TOML parse error: {e}"))
    }
}

/// Print error and exit with the appropriate code.
pub fn exit_with_error(err: CliError) -> ! {
    eprintln!("{err}");
    let code = match &err {
        CliError::Usage(_) => EXIT_USAGE,
        CliError::Stale(_) => EXIT_STALE,
        _ => EXIT_ERROR,
    };
    process::exit(code)
}

pub type CliResult<T> = std::result::Result<T, CliError>;
