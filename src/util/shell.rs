//! User-facing diagnostics.
//!
//! All status output goes through a process-wide shell configured once at
//! startup from the CLI flags. Status headers are right-aligned to a
//! 12-column field in bold green; errors and warnings carry `Error:` /
//! `Warning:` prefixes. The decision whether a stream supports color is
//! made once, not per call, so child-process output interleaves predictably.

use std::fmt::Display;
use std::io::{self, IsTerminal};
use std::sync::OnceLock;

/// Width of the right-aligned status header column.
const HEADER_WIDTH: usize = 12;

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice `{}`; expected `auto`, `always`, or `never`",
                s
            )),
        }
    }
}

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Verbosity {
    /// --quiet: no output at all
    Quiet,
    /// Default: status messages
    #[default]
    Normal,
    /// --verbose: adds debug lines
    Verbose,
    /// -vv: adds trace lines
    VeryVerbose,
}

#[derive(Debug)]
struct ShellState {
    verbosity: Verbosity,
    stderr_color: bool,
}

static STATE: OnceLock<ShellState> = OnceLock::new();

fn state() -> &'static ShellState {
    STATE.get_or_init(|| ShellState {
        verbosity: Verbosity::Normal,
        stderr_color: io::stderr().is_terminal(),
    })
}

/// Initialize the shell from CLI flags. Must be called before any output;
/// later calls are ignored.
pub fn init(verbosity: Verbosity, color: ColorChoice) {
    let stderr_color = match color {
        ColorChoice::Auto => io::stderr().is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };
    let _ = STATE.set(ShellState {
        verbosity,
        stderr_color,
    });
}

/// Resolve the color choice from an explicit flag and `CABIN_TERM_COLOR`.
pub fn resolve_color(flag: Option<ColorChoice>) -> ColorChoice {
    if let Some(choice) = flag {
        return choice;
    }
    std::env::var("CABIN_TERM_COLOR")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

pub fn is_quiet() -> bool {
    state().verbosity == Verbosity::Quiet
}

pub fn is_verbose() -> bool {
    state().verbosity >= Verbosity::Verbose
}

pub fn is_very_verbose() -> bool {
    state().verbosity >= Verbosity::VeryVerbose
}

pub fn verbosity() -> Verbosity {
    state().verbosity
}

/// Print a status line: a bold green header right-aligned to 12 columns,
/// then the message.
pub fn status(header: impl Display, msg: impl Display) {
    if is_quiet() {
        return;
    }
    let st = state();
    if st.stderr_color {
        eprintln!(
            "\x1b[1;32m{:>width$}\x1b[0m {}",
            header,
            msg,
            width = HEADER_WIDTH
        );
    } else {
        eprintln!("{:>width$} {}", header, msg, width = HEADER_WIDTH);
    }
}

/// Print a warning to stderr.
pub fn warn(msg: impl Display) {
    if is_quiet() {
        return;
    }
    if state().stderr_color {
        eprintln!("\x1b[1;33mWarning:\x1b[0m {}", msg);
    } else {
        eprintln!("Warning: {}", msg);
    }
}

/// Print an error to stderr.
pub fn error(msg: impl Display) {
    if is_quiet() {
        return;
    }
    if state().stderr_color {
        eprintln!("\x1b[1;31mError:\x1b[0m {}", msg);
    } else {
        eprintln!("Error: {}", msg);
    }
}
