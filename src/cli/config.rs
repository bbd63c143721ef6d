//! `edgepulse config init`
//!
//! Writes the annotated example config. The template is compiled in, so the
//! file written always matches the settings this binary understands.

use crate::cli::ConfigInitArgs;
use crate::config::EdgePulseConfig;
use std::fs;

const EXAMPLE_CONFIG: &str = include_str!("../../edgepulse.example.toml");

/// Writes the example config to `args.output`, creating missing parent
/// directories. An existing file is only replaced with `--force`.
pub fn handle_config_init(args: &ConfigInitArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.output.exists() && !args.force {
        return Err(format!(
            "File already exists: {}. Use --force to overwrite.",
            args.output.display()
        )
        .into());
    }

    let template: EdgePulseConfig = toml::from_str(EXAMPLE_CONFIG)?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.output, EXAMPLE_CONFIG)?;

    println!("✓ Configuration file created: {}", args.output.display());
    println!("  Event stream: {}", template.stream.url);
    println!("  Polling API:  {}", template.polling.base_url);
    println!(
        "  Point both at your backend, then run: edgepulse watch --config {}",
        args.output.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(output: &std::path::Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
        handle_config_init(&ConfigInitArgs {
            output: output.to_path_buf(),
            force,
        })
    }

    #[test]
    fn test_config_init_writes_loadable_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("edgepulse.toml");

        init(&output_path, false).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[stream]"));
        assert!(content.contains("[polling]"));

        let config = EdgePulseConfig::load(Some(&output_path)).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.alerts.capacity, 50);
    }

    #[test]
    fn test_config_init_creates_parent_dirs() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("etc").join("edgepulse").join("edgepulse.toml");

        init(&output_path, false).unwrap();
        assert!(output_path.exists());
    }

    #[test]
    fn test_config_init_keeps_existing_without_force() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("edgepulse.toml");
        std::fs::write(&output_path, "existing").unwrap();

        let err = init(&output_path, false).unwrap_err();
        assert!(err.to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&output_path).unwrap(), "existing");
    }

    #[test]
    fn test_config_init_force_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("edgepulse.toml");
        std::fs::write(&output_path, "old content").unwrap();

        init(&output_path, true).unwrap();

        let content = std::fs::read_to_string(&output_path).unwrap();
        assert!(content.contains("[stream]"));
    }

    #[test]
    fn test_example_template_parses() {
        let config: EdgePulseConfig = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.stream.url.starts_with("ws://"));
    }
}
