//! Split entry names into comparable tokens.

use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::entry::Entry;

/// Noise removed before splitting: bracketed and parenthesized groups,
/// episode markers like `s01e02` or `s01x02`, resolutions like `720p` or `1920x1080`,
/// and any remaining run of digits.
static RE_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*?\]|\(.*?\)|s[0-9]{1,2}[ex][0-9]{1,2}|[0-9]{3,4}p\b|[0-9]{3,4}x[0-9]{3,4}|[0-9]+")
        .expect("Failed to compile noise regex")
});

/// Characters treated as word separators.
pub const SEPARATORS: &[char] = &[
    ' ', '_', '-', '+', '~', '.', '·', ':', ';', '(', ')', '[', ']', '¡', '!', '¿', '?', '<', '>', '"', '\'', '`',
];

/// Release and media jargon that never identifies a group.
/// Matched against whole tokens only, all entries are lowercase.
const STOP_WORDS: &[&str] = &[
    "dvd",
    "bdrip",
    "dvdrip",
    "xvid",
    "divx",
    "x264",
    "h264",
    "aac",
    "mp3",
    "ova",
    "hdtv",
    "vtv",
    "notv",
    "2hd",
    "hd",
    "720p1080p",
    "lol",
    "fqm",
    "oav",
    "episode",
    "season",
    "volume",
    "vol",
    "volumen",
    "extra",
    "episodio",
    "temporada",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> = LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// Get the lowercase token set for an entry.
///
/// Files have their extension removed first.
/// Order carries no meaning, only membership is compared.
#[must_use]
pub fn tokenize(entry: &Entry) -> HashSet<String> {
    let lowercase = entry.name.to_lowercase();
    let name = if entry.is_dir {
        lowercase.as_str()
    } else {
        strip_extension(&lowercase)
    };

    let cleaned = RE_NOISE.replace_all(name, " ");
    split_words(&cleaned)
        .filter(|word| !STOP_WORD_SET.contains(word))
        .map(ToString::to_string)
        .collect()
}

/// Split a name on separator characters, keeping the original case and order.
pub fn split_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|word| !word.is_empty())
}

fn strip_extension(name: &str) -> &str {
    Path::new(name).file_stem().and_then(|stem| stem.to_str()).unwrap_or(name)
}
