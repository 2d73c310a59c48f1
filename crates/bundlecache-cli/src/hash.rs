//! Hash list creation command.

use anyhow::{Context, Result};
use bundlecache_bundle::HashListBuilder;
use std::path::{Path, PathBuf};

/// Scan `dir` and write its hash list.
pub fn run(
    dir: &Path,
    master: &str,
    revision: &str,
    output: Option<PathBuf>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = crate::config::load(config_path)?;
    let hash_file = config.hash_file();

    println!("Hashing bundles in {}", dir.display());

    let list = HashListBuilder::new(master, revision)
        .exclude(&hash_file)
        .build(dir)
        .with_context(|| format!("Failed to build hash list for {}", dir.display()))?;

    let output = output.unwrap_or_else(|| dir.join(&hash_file));
    list.write_to(&output)
        .with_context(|| format!("Failed to write hash list: {}", output.display()))?;

    println!("  Master: {} ({} bytes)", list.platform_master.name, list.platform_master.content_size);
    println!("  Bundles: {}", list.assets.len());
    println!("  Total size: {} bytes", list.total_size());
    println!("Hash list written: {}", output.display());
    Ok(())
}
