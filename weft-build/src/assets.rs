//! Built-asset enumeration.

use std::path::Path;

use walkdir::WalkDir;

/// Recursively enumerate the files a build produced, excluding the root
/// `index.html` entry document. Paths come back relative to the distribution
/// root, sorted for stable manifests.
pub fn collect_assets(resource_dir: &Path, dist_root: &Path) -> Vec<String> {
    let mut assets: Vec<String> = WalkDir::new(resource_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| !(entry.depth() == 1 && entry.file_name() == "index.html"))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(dist_root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    assets.sort();
    assets
}
