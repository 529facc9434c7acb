//! Config command implementation.
//!
//! View configuration settings. Config file is located at
//! ~/.config/feedsift/config.toml.

use feedsift::config::get_config_path;
use owo_colors::OwoColorize;

use super::{CommandContext, Result};

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let config = &ctx.config;
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if !ctx.quiet {
        let header = "Configuration";
        if ctx.use_colors {
            println!("{}\n", header.green().bold());
        } else {
            println!("{}\n", header);
        }

        println!("File: {}", path.display());
        println!("Exists: {}\n", path.exists());

        println!("Settings:");
        println!("  version: {}", config.version);

        println!("\n[server]");
        println!("  port: {}", config.server.port);

        println!("\n[fetch]");
        println!("  timeout_secs: {}", config.fetch.timeout_secs);

        println!("\n[output]");
        match config.output.color {
            Some(color) => println!("  color: {}", color),
            None => println!("  color: (auto)"),
        }
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        let output = serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}
