//! Encrypted mirror command.

use anyhow::{Context, Result};
use bundlecache_bundle::{CipherContext, write_encrypted_mirror};
use std::path::Path;

/// Copy `src` to `dst`, encrypting every bundle file.
///
/// Hash lists and companion manifests stay plain so that the registry can
/// diff the encrypted cache without the key.
pub fn run(src: &Path, dst: &Path, config_path: &Path) -> Result<()> {
    let config = crate::config::from_file(config_path)?;
    let ctx = CipherContext::from_config(&config.encryption)
        .context("Invalid encryption key material")?
        .with_context(|| {
            format!(
                "No [encryption] table in {}; nothing to encrypt with",
                config_path.display()
            )
        })?;

    if dst.starts_with(src) {
        anyhow::bail!(
            "Destination {} must not be inside the source {}",
            dst.display(),
            src.display()
        );
    }

    println!("Encrypting {} -> {}", src.display(), dst.display());

    let hash_file = config.hash_file();
    let count = write_encrypted_mirror(src, dst, &ctx, &[hash_file.as_str()])
        .with_context(|| format!("Failed to write encrypted copy to {}", dst.display()))?;

    println!("Encrypted {count} bundle files");
    Ok(())
}
