//! Tag reader using lofty

use aircat_common::media::{Picture, Tags};
use aircat_common::{Error, Result};
use lofty::file::TaggedFileExt;
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use tracing::debug;

/// Read the primary tag (or the first one found) of a file.
///
/// Files without any tag give empty [`Tags`]. Only the first embedded
/// picture is kept, and only when `with_picture` is set.
pub fn read_tags(path: &Path, with_picture: bool) -> Result<Tags> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::Media(format!("Failed to open {}: {}", path.display(), e)))?
        .read()
        .map_err(|e| Error::Media(format!("Failed to read tags of {}: {}", path.display(), e)))?;

    let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
        debug!("No tags in {}", path.display());
        return Ok(Tags::default());
    };

    let picture = if with_picture {
        tag.pictures().first().map(|p| Picture {
            data: p.data().to_vec(),
            mime: p.mime_type().map(|m| m.as_str().to_string()),
        })
    } else {
        None
    };

    Ok(Tags {
        title: tag.title().map(|s| s.to_string()),
        artist: tag.artist().map(|s| s.to_string()),
        album: tag.album().map(|s| s.to_string()),
        comment: tag.comment().map(|s| s.to_string()),
        genre: tag.genre().map(|s| s.to_string()),
        track: tag.track().unwrap_or(0),
        year: tag.year().unwrap_or(0),
        picture,
    })
}
