// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CONTROLS - industrial telemetry server
//!
//! Main binary entry point.

use ctrl_bin::{commands, error::report_error_and_exit, init_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    let (level, format) = commands::log_settings(&cli);
    init_logging(&level, format);

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
