// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `run`: Start the server (default)
//! - `validate`: Validate the configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Main CLI Structure
// =============================================================================

/// CONTROLS - industrial telemetry server
///
/// Publishes a simulated process address space, dispatches method calls and
/// reports session activity.
#[derive(Parser, Debug)]
#[command(
    name = "ctrl",
    author = "Sylvex <contact@sylvex.io>",
    version = ctrl_core::VERSION,
    about = "Industrial telemetry server",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        default_value = "ctrl.yaml",
        env = "CTRL_CONFIG",
        global = true
    )]
    pub config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config file
    #[arg(short, long, env = "CTRL_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Log format; defaults to the config file
    #[arg(long, env = "CTRL_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    /// Enable quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the server
    ///
    /// This is the default command when no subcommand is specified. A missing
    /// configuration file selects the built-in defaults.
    Run(RunArgs),

    /// Validate the configuration file
    ///
    /// Parses and validates the configuration without starting the server.
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `run` command.
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Accept peers whose certificate issuer is not trusted
    #[arg(long)]
    pub auto_accept: bool,

    /// Delete and regenerate the application certificate before starting
    #[arg(long)]
    pub renew_certificate: bool,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Output format for validation results
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

impl From<ctrl_config::LogFormat> for LogFormat {
    fn from(format: ctrl_config::LogFormat) -> Self {
        match format {
            ctrl_config::LogFormat::Text => LogFormat::Text,
            ctrl_config::LogFormat::Compact => LogFormat::Compact,
            ctrl_config::LogFormat::Json => LogFormat::Json,
        }
    }
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective command, defaulting to `Run` if none specified.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Run(RunArgs::default()))
    }

    /// Returns the level forced by flags, if any.
    ///
    /// `-q` wins over `-v`, which wins over `-l`.
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["ctrl"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Run(_)));
    }

    #[test]
    fn test_run_flags() {
        let cli = Cli::parse_from(["ctrl", "run", "--auto-accept", "--renew-certificate"]);
        match cli.command {
            Some(Commands::Run(args)) => {
                assert!(args.auto_accept);
                assert!(args.renew_certificate);
            }
            other => panic!("Expected Run command, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_command() {
        let cli = Cli::parse_from(["ctrl", "validate", "--show-config", "--format", "json"]);
        if let Some(Commands::Validate(args)) = cli.command {
            assert!(args.show_config);
            assert_eq!(args.format, OutputFormat::Json);
        } else {
            panic!("Expected Validate command");
        }
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["ctrl", "-c", "/etc/ctrl/ctrl.toml"]);
        assert_eq!(cli.config, PathBuf::from("/etc/ctrl/ctrl.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["ctrl", "validate", "-l", "trace", "--log-format", "json"]);
        assert_eq!(cli.effective_log_level(), Some("trace"));
        assert_eq!(cli.log_format, Some(LogFormat::Json));
    }

    #[test]
    fn test_quiet_beats_verbose() {
        let cli = Cli::parse_from(["ctrl", "-q", "-v"]);
        assert_eq!(cli.effective_log_level(), Some("warn"));

        let cli = Cli::parse_from(["ctrl", "-v", "-l", "error"]);
        assert_eq!(cli.effective_log_level(), Some("debug"));
    }
}
