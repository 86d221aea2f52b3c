//! # agentos-cli
//!
//! Administrative CLI for the governance kernel:
//! - `agentos init` — scaffold a state root with a default policy document.
//! - `agentos validate` — parse & type-check policy documents.
//! - `agentos check` — static sandbox scan over source files.
//! - `agentos audit` — dump recent flight recorder entries.
//! - `agentos status` — print kernel version and loaded policy summary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// AgentOS governance kernel CLI.
#[derive(Parser)]
#[command(name = "agentos", version, about)]
struct Cli {
    /// Kernel state root (policy/, recorder/, memory/). Defaults to
    /// `AGENTOS_STATE_ROOT` or `.agentos` under the current directory.
    #[arg(long, global = true)]
    state_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write default policy and state-root layout.
    Init {
        /// Starting posture for the generated policy document.
        #[arg(long, default_value = "permissive")]
        template: commands::init::Template,
    },
    /// Parse & type-check policy documents.
    Validate {
        /// Policy files to validate (defaults to `<state_root>/policy/active.yaml`).
        files: Vec<PathBuf>,
        /// Treat advisory findings (out-of-range scores, empty rule sets) as errors.
        #[arg(long)]
        strict: bool,
    },
    /// Static sandbox scan over source files.
    Check {
        /// Source files to scan.
        files: Vec<PathBuf>,
        /// Read file list from stdin, one path per line (for pre-commit hooks).
        #[arg(long)]
        staged: bool,
        /// Emit machine-readable progress suited to CI logs (no color, one line per file).
        #[arg(long)]
        ci: bool,
        #[arg(long, default_value = "text")]
        format: commands::check::Format,
    },
    /// Dump recent flight recorder entries.
    Audit {
        #[arg(long, default_value = "text")]
        format: commands::audit::Format,
        /// Number of entries to show.
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
        /// Verify the hash chain instead of dumping entries.
        #[arg(long)]
        verify: bool,
    },
    /// Print kernel version and loaded policy summary.
    Status,
}

/// Exit codes: 0 success, 1 policy violation found, 2 configuration error,
/// 3 runtime error.
#[repr(i32)]
pub(crate) enum ExitCode {
    Success = 0,
    ViolationFound = 1,
    ConfigError = 2,
    RuntimeError = 3,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("AGENTOS_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let state_root = cli.state_root.unwrap_or_else(default_state_root);

    let outcome = match &cli.command {
        Commands::Init { template } => commands::init::execute(&state_root, *template),
        Commands::Validate { files, strict } => commands::validate::execute(&state_root, files, *strict),
        Commands::Check { files, staged, ci, format } => {
            commands::check::execute(files, *staged, *ci, *format)
        }
        Commands::Audit { format, limit, verify } => {
            commands::audit::execute(&state_root, *format, *limit, *verify)
        }
        Commands::Status => commands::status::execute(&state_root),
    };

    match outcome {
        Ok(code) => std::process::exit(code as i32),
        Err(err) => {
            eprintln!("Error: {err:#}");
            std::process::exit(ExitCode::RuntimeError as i32);
        }
    }
}

/// `AGENTOS_STATE_ROOT` (not in spec §6's enumerated list but consistent
/// with its other `AGENTOS_*` variables) takes precedence over the
/// `.agentos` default; `--state-root` (handled in `main`) takes precedence
/// over both.
fn default_state_root() -> PathBuf {
    std::env::var_os("AGENTOS_STATE_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".agentos"))
}
