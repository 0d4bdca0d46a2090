//! Directory listing under the music root

use crate::error::{Error, Result};
use crate::status::{FileInfo, Listing, TagInfo};
use aircat_common::media::MediaBackend;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Extensions of the files shown in listings, lowercase
pub const MEDIA_EXTENSIONS: &[&str] = &["mp3", "m4a", "mp4", "aac", "ogg", "wav"];

/// Whether the file has a playable extension (case-insensitive)
pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| MEDIA_EXTENSIONS.iter().any(|m| ext.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

/// Collect subdirectories and media files of `dir`.
///
/// Hidden entries are skipped. Entries that cannot be inspected and media
/// files whose tags cannot be parsed are left out rather than failing the
/// listing. Both lists are sorted by name.
pub fn list_directory(dir: &Path, media: &dyn MediaBackend) -> Result<Listing> {
    let entries = fs::read_dir(dir).map_err(Error::Listing)?;
    let mut listing = Listing::default();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let path = entry.path();
        // Follows symlinks
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        if metadata.is_dir() {
            listing.directories.push(name);
        } else if metadata.is_file() && is_media_file(&path) {
            match media.parse_tags(&path, true) {
                Ok(tags) => listing.files.push(FileInfo {
                    file: name,
                    tags: Some(TagInfo::with_picture(&tags)),
                }),
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
    }

    listing.directories.sort();
    listing.files.sort_by(|a, b| a.file.cmp(&b.file));

    debug!(
        "Listed {}: {} directories, {} files",
        dir.display(),
        listing.directories.len(),
        listing.files.len()
    );
    Ok(listing)
}
