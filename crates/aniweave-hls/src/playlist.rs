//! Line-oriented HLS playlist model.
//!
//! A playlist is kept as an ordered list of lines rather than a parsed tag
//! tree. The rewriter only ever touches URIs, so keeping every other byte
//! verbatim is both simpler and safer than re-serializing tags.

use std::fmt;

/// One line of a playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistLine {
    /// Empty or whitespace-only line, kept verbatim.
    Blank(String),
    /// Tag or comment line (starts with `#`).
    Directive(String),
    /// Segment or variant-playlist reference.
    Uri(String),
}

impl PlaylistLine {
    fn classify(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            PlaylistLine::Blank(raw.to_string())
        } else if trimmed.starts_with('#') {
            PlaylistLine::Directive(raw.to_string())
        } else {
            PlaylistLine::Uri(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PlaylistLine::Blank(s) | PlaylistLine::Directive(s) | PlaylistLine::Uri(s) => s,
        }
    }
}

/// An ordered sequence of playlist lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistDocument {
    lines: Vec<PlaylistLine>,
    trailing_newline: bool,
}

impl PlaylistDocument {
    /// Split `text` into lines. Accepts `\n` and `\r\n` endings; never fails.
    pub fn parse(text: &str) -> Self {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let lines = text.lines().map(PlaylistLine::classify).collect();
        Self {
            lines,
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub(crate) fn from_parts(lines: Vec<PlaylistLine>, trailing_newline: bool) -> Self {
        Self {
            lines,
            trailing_newline,
        }
    }

    pub fn lines(&self) -> &[PlaylistLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub(crate) fn trailing_newline(&self) -> bool {
        self.trailing_newline
    }

    /// Whether the playlist references variant streams rather than segments.
    pub fn is_master(&self) -> bool {
        self.lines.iter().any(|l| {
            matches!(l, PlaylistLine::Directive(d) if d.trim_start().starts_with("#EXT-X-STREAM-INF"))
        })
    }

    /// Render back to text with `\n` line endings.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(line.as_str());
        }
        if self.trailing_newline && !self.lines.is_empty() {
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for PlaylistDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Whether a response body looks like an HLS playlist.
pub fn is_playlist(body: &str) -> bool {
    body.trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with("#EXTM3U")
}
