use anyhow::Result;

use sparkcache::cli::InspectArgs;
use sparkcache::config::SparkCacheConfig;
use sparkcache::engine::clean_vars;
use sparkcache::store::{ParquetTableStore, VariableStore};

use super::Context;

pub fn run(args: &InspectArgs, config: SparkCacheConfig) -> Result<()> {
    let ctx = Context::load(&args.common, &config)?;
    let vars = clean_vars(&args.vars);
    if vars.is_empty() {
        anyhow::bail!("At least one variable name is required");
    }

    let store = VariableStore::new(ParquetTableStore::with_filesystem(ctx.fs.clone()));
    let tables = store.load(&ctx.dir, &vars)?;

    println!("Cache directory: {} ({})", ctx.dir.display(), ctx.fs.name());
    for (name, table) in &tables {
        println!(
            "\n{}: {} rows, {} columns",
            name,
            table.num_rows(),
            table.num_columns()
        );
        for field in table.schema().fields() {
            println!(
                "  - {}: {}{}",
                field.name(),
                field.data_type(),
                if field.is_nullable() { " (nullable)" } else { "" }
            );
        }
    }

    Ok(())
}
