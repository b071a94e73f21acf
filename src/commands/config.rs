use anyhow::Result;
use tracing::info;

use sparkcache::cli::ConfigCommands;
use sparkcache::config::SparkCacheConfig;

/// `config` is the effective configuration, only needed by `show`
pub fn run(command: ConfigCommands, config: Result<SparkCacheConfig>) -> Result<()> {
    match command {
        ConfigCommands::Validate { path } => validate(&path),
        ConfigCommands::Generate => generate(),
        ConfigCommands::Show { .. } => show(config?),
    }
}

fn validate(path: &str) -> Result<()> {
    info!("Validating config file: {}", path);

    let config = SparkCacheConfig::from_file(path)?;
    config.validate()?;

    println!("✓ Configuration file is valid: {}", path);
    println!("\nSummary:");
    println!(
        "  - Cache directory: {}",
        config.cache.dir.as_deref().unwrap_or("<home>/sparkcache/<session>")
    );
    println!("  - Filesystem backend: {:?}", config.filesystem.backend);
    println!("  - On cell error: {:?}", config.cache.on_cell_error);

    Ok(())
}

fn generate() -> Result<()> {
    println!("{}", SparkCacheConfig::example());
    Ok(())
}

fn show(config: SparkCacheConfig) -> Result<()> {
    info!("Showing effective configuration");

    println!("Effective Configuration:\n");
    println!("{}", toml::to_string_pretty(&config)?);

    Ok(())
}
