//! Cache diff command.

use anyhow::{Context, Result};
use bundlecache_bundle::BundleCache;
use std::path::Path;

/// Print the files whose on-disk size differs from the hash list.
pub fn run(cache_dir: &Path, platform: Option<&str>, config_path: Option<&Path>, check: bool) -> Result<()> {
    let config = crate::config::load(config_path)?;
    let platform = crate::config::platform(&config, platform)?;
    let cache = BundleCache::new(cache_dir, platform);

    let list = cache
        .read_hash_list(&config.hash_file())
        .with_context(|| format!("Failed to read hash list in {}", cache.platform_dir().display()))?;
    let diff = cache.compute_diff(&list);

    if diff.is_empty() {
        println!("Cache is up to date ({} bundles)", list.assets.len() + 1);
        return Ok(());
    }

    println!("{} files differ:", diff.len());
    for name in &diff {
        println!("  {name}");
    }

    if check {
        anyhow::bail!("{} files differ from the hash list", diff.len());
    }
    Ok(())
}
