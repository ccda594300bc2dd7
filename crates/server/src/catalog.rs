//! Share directory enumeration.

use std::path::Path;

use shareport_protocol::CatalogEntry;

/// Lists the regular files directly under `share_dir`.
///
/// Non-recursive; subdirectories and non-regular files are skipped, as are
/// names that are not valid UTF-8 (they could not be requested over the
/// wire). The listing is recomputed on every call, so a catalog snapshot
/// can go stale between enumeration and a later request; request
/// resolution re-stats the file rather than trusting the snapshot.
pub fn scan_share_dir(share_dir: &Path) -> std::io::Result<Vec<CatalogEntry>> {
    let mut entries: Vec<CatalogEntry> = std::fs::read_dir(share_dir)?
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let name = entry.file_name().to_str()?.to_string();
            Some(CatalogEntry {
                name,
                size: metadata.len(),
            })
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}
