// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use ctrl_config::ServerConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};

/// Executes the `validate` command.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    let config_path = &cli.config;

    if !config_path.exists() {
        return Err(BinError::Configuration(format!(
            "Configuration file not found: {}",
            config_path.display()
        )));
    }

    let config = ctrl_config::load_config(config_path)
        .map_err(|e| BinError::from(e).with_context("Configuration validation failed"))?;
    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Application: {}", config.application.name);
            println!("  URI:         {}", config.application.application_uri());
            println!("  Namespace:   {}", config.address_space.namespace_uri);
            println!("  Endpoints:   {}", config.endpoints.join(", "));
            println!(
                "  Trust:       {}",
                if config.security.auto_accept_untrusted { "auto-accept" } else { "manual-review" }
            );
            println!("  Certificate: {}", config.security.certificate.path.display());
            println!(
                "  Simulation:  {}",
                if config.address_space.simulation.enabled { "enabled" } else { "disabled" }
            );

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", to_json(&config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "application": config.application.name,
                    "application_uri": config.application.application_uri(),
                    "namespace_uri": config.address_space.namespace_uri,
                    "endpoints": config.endpoints,
                    "auto_accept_untrusted": config.security.auto_accept_untrusted,
                    "simulation_enabled": config.address_space.simulation.enabled,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", to_json(&output)?);
        }
    }

    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> BinResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BinError::runtime(format!("cannot serialize configuration: {}", e)))
}

/// Settings that are valid but probably not intended.
pub(crate) fn collect_warnings(config: &ServerConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let certificate = &config.security.certificate;

    if config.security.auto_accept_untrusted {
        warnings.push("Untrusted peer certificates are accepted automatically".to_string());
    }
    if !certificate.create_if_missing && !certificate.path.exists() {
        warnings.push(format!(
            "Certificate {} does not exist and will not be created",
            certificate.path.display()
        ));
    }
    if config.security.renew_certificate {
        warnings.push("The application certificate is regenerated on every start".to_string());
    }
    if !config.address_space.simulation.enabled {
        warnings.push("Simulation is disabled; variables keep their initial values".to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_no_warnings() {
        assert!(collect_warnings(&ServerConfig::default()).is_empty());
    }

    #[test]
    fn test_warnings() {
        let mut config = ServerConfig::default();
        config.security.auto_accept_untrusted = true;
        config.security.certificate.create_if_missing = false;
        config.security.certificate.path = "/nonexistent/own.pem".into();
        config.address_space.simulation.enabled = false;
        assert_eq!(collect_warnings(&config).len(), 3);
    }
}
