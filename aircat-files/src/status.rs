//! JSON views of the playlist, the playback status and directory listings
//!
//! Views are built from data copied out of the engine, so encoding the
//! artwork and serializing never happen under the engine lock.

use aircat_common::media::{Picture, Tags};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

/// Metadata fields shared by every view
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    pub track: u32,
    pub year: u32,
    /// Base64 encoded cover art
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
}

impl TagInfo {
    /// Text fields only; the artwork is attached separately
    pub fn from_tags(tags: &Tags) -> Self {
        Self {
            title: tags.title.clone(),
            artist: tags.artist.clone(),
            album: tags.album.clone(),
            comment: tags.comment.clone(),
            genre: tags.genre.clone(),
            track: tags.track,
            year: tags.year,
            picture: None,
            mime: tags.picture.as_ref().and_then(|p| p.mime.clone()),
        }
    }

    /// Text fields plus base64 encoded artwork
    pub fn with_picture(tags: &Tags) -> Self {
        let mut info = Self::from_tags(tags);
        info.picture = tags.picture.as_ref().map(encode_picture);
        info
    }
}

pub fn encode_picture(picture: &Picture) -> String {
    STANDARD.encode(&picture.data)
}

/// A file with its metadata, as found in the playlist and in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    /// File name, without directories
    pub file: String,
    #[serde(flatten)]
    pub tags: Option<TagInfo>,
}

/// Playback status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Status {
    Stopped {
        /// Always `null`
        file: Option<String>,
    },
    Active {
        #[serde(flatten)]
        info: FileInfo,
        /// Position in seconds
        pos: u64,
        /// Length in seconds
        length: u64,
    },
}

impl Status {
    pub fn stopped() -> Self {
        Status::Stopped { file: None }
    }
}

/// Content of one directory under the music root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    #[serde(rename = "directory")]
    pub directories: Vec<String>,
    #[serde(rename = "file")]
    pub files: Vec<FileInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags() -> Tags {
        Tags {
            title: Some("Song".into()),
            artist: Some("Band".into()),
            track: 3,
            year: 1999,
            picture: Some(Picture {
                data: vec![1, 2, 3],
                mime: Some("image/png".into()),
            }),
            ..Tags::default()
        }
    }

    #[test]
    fn test_stopped_status_is_null_file() {
        let value = serde_json::to_value(Status::stopped()).unwrap();
        assert_eq!(value, json!({"file": null}));
    }

    #[test]
    fn test_active_status_flattens_tags() {
        let status = Status::Active {
            info: FileInfo {
                file: "a.mp3".into(),
                tags: Some(TagInfo::from_tags(&tags())),
            },
            pos: 12,
            length: 240,
        };
        let value = serde_json::to_value(status).unwrap();
        assert_eq!(
            value,
            json!({
                "file": "a.mp3",
                "title": "Song",
                "artist": "Band",
                "track": 3,
                "year": 1999,
                "mime": "image/png",
                "pos": 12,
                "length": 240
            })
        );
    }

    #[test]
    fn test_picture_is_base64() {
        let info = TagInfo::with_picture(&tags());
        assert_eq!(info.picture.as_deref(), Some("AQID"));
    }

    #[test]
    fn test_file_without_tags_has_name_only() {
        let info = FileInfo {
            file: "x.wav".into(),
            tags: None,
        };
        assert_eq!(serde_json::to_value(info).unwrap(), json!({"file": "x.wav"}));
    }

    #[test]
    fn test_listing_keys() {
        let listing = Listing {
            directories: vec!["rock".into()],
            files: vec![],
        };
        assert_eq!(
            serde_json::to_value(listing).unwrap(),
            json!({"directory": ["rock"], "file": []})
        );
    }
}
