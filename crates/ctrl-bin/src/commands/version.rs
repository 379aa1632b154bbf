// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("CONTROLS - industrial telemetry server");
    println!();
    println!("Version Information:");
    println!("  ctrl-bin:    {}", env!("CARGO_PKG_VERSION"));
    println!("  ctrl-core:   {}", ctrl_core::VERSION);
    println!("  ctrl-server: {}", ctrl_server::VERSION);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
