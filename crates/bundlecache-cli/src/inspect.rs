//! Hash list inspection command.

use anyhow::{Context, Result};
use bundlecache_bundle::BundleHashList;
use std::path::Path;

/// Print a hash list summary, or its JSON.
pub fn run(path: &Path, json: bool) -> Result<()> {
    let list = BundleHashList::read_from(path)
        .with_context(|| format!("Failed to read hash list: {}", path.display()))?;

    if json {
        println!("{}", list.to_json()?);
        return Ok(());
    }

    println!("Hash list: {}", path.display());
    println!("  Revision: {}", list.source_revision);
    println!("  Created:  {}", list.created_at_utc.to_rfc3339());
    println!(
        "  Master:   {} ({} bytes)",
        list.platform_master.name, list.platform_master.content_size
    );
    println!("  Total:    {} bytes", list.total_size());
    println!();
    println!("Bundles ({}):", list.assets.len());

    let mut names: Vec<&String> = list.assets.keys().collect();
    names.sort();
    for name in names {
        let info = list.get_asset(name);
        let hash = match info.content_hash.as_str() {
            "" => "-",
            full => full.get(..12).unwrap_or(full),
        };
        println!(
            "  {name:<32} {:>10} bytes  crc {:08x}  sha {hash}",
            info.content_size, info.crc32
        );
    }

    Ok(())
}
