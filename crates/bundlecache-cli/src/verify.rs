//! Strict cache verification command.

use anyhow::{Context, Result};
use bundlecache_bundle::{BundleCache, CipherContext};
use std::path::Path;

/// Check every hash-list entry's size, CRC32 and SHA-256.
pub fn run(cache_dir: &Path, platform: Option<&str>, config_path: Option<&Path>) -> Result<()> {
    let config = crate::config::load(config_path)?;
    let platform = crate::config::platform(&config, platform)?;
    let cipher = CipherContext::from_config(&config.encryption)
        .context("Invalid encryption key material")?;
    let cache = BundleCache::new(cache_dir, platform);

    let list = cache
        .read_hash_list(&config.hash_file())
        .with_context(|| format!("Failed to read hash list in {}", cache.platform_dir().display()))?;

    println!("Verifying {} ({platform})", cache.platform_dir().display());

    let mut failed = 0usize;
    for info in list.all_entries() {
        match cache.verify_entry(info, cipher.as_ref()) {
            Ok(()) => println!("  ok      {}", info.name),
            Err(e) => {
                failed += 1;
                println!("  FAILED  {}: {e}", info.name);
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} bundles failed verification");
    }

    println!("All bundles verified");
    Ok(())
}
