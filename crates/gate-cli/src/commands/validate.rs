//! `launch-gate validate`

use anyhow::{Context, Result, bail};
use gate_config::{Resolution, ResolutionContext, build_workspace, parser, resolver};
use std::path::Path;

/// Check a configuration file and print what was found
///
/// In strict mode unset environment variables without a default are errors.
pub fn run(config_path: &Path, strict: bool) -> Result<()> {
    println!("Validating {}...", config_path.display());

    let config = parser::parse_file(config_path).context("Failed to parse configuration")?;
    let warnings = parser::validate(&config)?;

    let context = ResolutionContext::new();
    let missing = resolver::missing_variables(&config, &context);
    if strict && !missing.is_empty() {
        bail!(
            "Undefined environment variables: {}",
            missing.join(", ")
        );
    }
    build_workspace(&config, &context, Resolution::Lenient)
        .context("Failed to build configurations")?;

    println!("✓ Configuration valid");
    println!("  Version: {}", config.version);
    if let Some(name) = &config.name {
        println!("  Name: {}", name);
    }
    println!("  Targets: {}", config.targets.len());
    println!("  Configurations: {}", config.configurations.len());

    for warning in &warnings {
        println!("  ⚠ {}", warning);
    }
    if !missing.is_empty() {
        println!(
            "  ⚠ Undefined environment variables: {}",
            missing.join(", ")
        );
    }

    Ok(())
}
