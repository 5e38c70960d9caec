//! Track listing parser for music documents.
//!
//! The fourth segment of a music document lists tracks as alternating
//! `title:` / `file:` lines. Blank lines are ignored; anything else is a
//! named error rather than a silently dropped track.

use serde::{Deserialize, Serialize};

use crate::error::{ContentError, Result};

/// One playable track of a music collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub title: String,
    pub file: String,
}

enum State {
    ExpectTitle,
    ExpectFile { title: String },
}

/// Parse the track listing segment into an ordered list of [`Track`]s.
pub fn parse_track_listing(listing: &str, path: &str) -> Result<Vec<Track>> {
    let malformed = |reason: String| ContentError::MalformedTrackListing {
        path: path.to_string(),
        reason,
    };

    let mut tracks = Vec::new();
    let mut state = State::ExpectTitle;

    for (idx, line) in listing.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once(':')
            .map(|(k, v)| (k.trim(), v.trim()))
            .ok_or_else(|| malformed(format!("line {} has no `:`: {:?}", idx + 1, line)))?;

        state = match (state, key) {
            (State::ExpectTitle, "title") => State::ExpectFile {
                title: value.to_string(),
            },
            (State::ExpectFile { title }, "file") => {
                tracks.push(Track {
                    title,
                    file: value.to_string(),
                });
                State::ExpectTitle
            }
            (State::ExpectTitle, other) => {
                return Err(malformed(format!(
                    "line {}: expected `title`, found `{}`",
                    idx + 1,
                    other
                )))
            }
            (State::ExpectFile { .. }, other) => {
                return Err(malformed(format!(
                    "line {}: expected `file`, found `{}`",
                    idx + 1,
                    other
                )))
            }
        };
    }

    match state {
        State::ExpectTitle => Ok(tracks),
        State::ExpectFile { title } => Err(malformed(format!(
            "track {:?} has no matching `file` line",
            title
        ))),
    }
}
