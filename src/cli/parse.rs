//! CLI parse: clap types for Clausecraft. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Clausecraft CLI - streaming contract drafting
#[derive(Parser)]
#[command(name = "clausecraft")]
#[command(about = "Plan-then-write contract generation with live streaming and cancellation")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where config/ is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

/// How a streamed job is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StreamFormat {
    /// Plain text as it arrives
    Text,
    /// The same server-sent-event frames the HTTP API emits
    Sse,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,
        /// Port (overrides server.port)
        #[arg(long)]
        port: Option<u16>,
        /// Allow cross-origin requests from any origin
        #[arg(long)]
        cors: bool,
    },
    /// Generate a contract from a prompt, streaming it to stdout. Ctrl-C cancels.
    Generate {
        /// What the contract should cover
        prompt: String,
        #[arg(long, value_enum, default_value = "text")]
        format: StreamFormat,
    },
    /// Rewrite an existing contract according to an instruction
    Edit {
        /// File holding the contract text
        #[arg(long)]
        file: PathBuf,
        /// Contract title (default: the file name)
        #[arg(long)]
        title: Option<String>,
        /// The change to make
        instruction: String,
        #[arg(long, value_enum, default_value = "text")]
        format: StreamFormat,
    },
    /// Suggest edits for an existing contract
    Suggest {
        /// File holding the contract text
        #[arg(long)]
        file: PathBuf,
        /// Contract title (default: the file name)
        #[arg(long)]
        title: Option<String>,
    },
}
