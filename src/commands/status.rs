use anyhow::Result;
use tracing::info;

use sparkcache::cli::StatusArgs;
use sparkcache::config::SparkCacheConfig;
use sparkcache::engine::clean_vars;
use sparkcache::store::variable_path;

use super::Context;

pub fn run(args: &StatusArgs, config: SparkCacheConfig) -> Result<()> {
    let ctx = Context::load(&args.common, &config)?;
    let vars = clean_vars(&args.vars);
    if vars.is_empty() {
        anyhow::bail!("At least one variable name is required");
    }

    info!(path = %ctx.dir.display(), backend = ctx.fs.name(), "Checking cache status");

    println!("Cache directory: {} ({})", ctx.dir.display(), ctx.fs.name());

    let mut missing = Vec::new();
    for var in &vars {
        if ctx.fs.exists(&variable_path(&ctx.dir, var)) {
            println!("  ✓ {}", var);
        } else {
            println!("  ✗ {}", var);
            missing.push(var.as_str());
        }
    }

    if !missing.is_empty() {
        anyhow::bail!("Not cached: {}", missing.join(", "));
    }

    println!("All {} variable(s) cached", vars.len());
    Ok(())
}
