// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.

mod run;
mod validate;
mod version;

pub use run::run;
pub use validate::validate;
pub use version::version;

use ctrl_config::{ConfigLoader, LoggingConfig};

use crate::cli::{Cli, Commands, LogFormat};
use crate::error::BinResult;

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Run(args) => run::run(&cli, args).await,
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
    }
}

/// Resolves the log level and format before logging is initialized.
///
/// Flags win; otherwise the config file decides. A file that cannot be read
/// yields the defaults here and reports its error later, once logging works.
pub fn log_settings(cli: &Cli) -> (String, LogFormat) {
    let configured = if cli.config.exists() {
        ConfigLoader::new()
            .load(&cli.config)
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        LoggingConfig::default()
    };

    let level = cli
        .effective_log_level()
        .map(String::from)
        .unwrap_or_else(|| configured.level.as_str().to_string());
    let format = cli.log_format.unwrap_or_else(|| configured.format.into());
    (level, format)
}
