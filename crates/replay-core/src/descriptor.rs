//! Replay filename descriptors
//!
//! Replay files are named `YYYY_MM_DD-HH_MM-round_<digits>.zip`, for example
//! `2025_01_03-11_59-round_42.zip`. The round number is the only part the
//! catalog depends on; the timestamp is carried along for display.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Extension every replay file carries (without the dot)
pub const REPLAY_EXTENSION: &str = "zip";

/// Exact replay filename grammar, anchored at both ends
///
/// ASCII digits only: `\d` would also match other Unicode digits.
static REPLAY_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9]{4}_[0-9]{2}_[0-9]{2}-[0-9]{2}_[0-9]{2})-round_([0-9]+)\.zip$")
        .expect("replay file name pattern is valid")
});

/// Decoded replay filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundDescriptor {
    /// Raw timestamp part (`YYYY_MM_DD-HH_MM`), informational only
    pub timestamp: String,
    /// Round identifier used to look up participants
    pub round_number: u32,
}

impl RoundDescriptor {
    /// Parse a replay file name
    ///
    /// Returns `None` when the name does not follow the replay grammar or
    /// when the round number does not fit the roster store's integer range
    /// (`0..=i32::MAX`). `name` is a bare file name; paths are rejected.
    pub fn parse(name: &str) -> Option<Self> {
        let captures = REPLAY_FILE_NAME.captures(name)?;

        let round: i32 = captures.get(2)?.as_str().parse().ok()?;
        let round_number = u32::try_from(round).ok()?;

        Some(Self {
            timestamp: captures.get(1)?.as_str().to_string(),
            round_number,
        })
    }
}

/// Whether a path carries the replay extension
pub fn has_replay_extension(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == REPLAY_EXTENSION)
}
