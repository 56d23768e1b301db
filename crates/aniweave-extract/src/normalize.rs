//! Pure normalization rules for the upstream formats.
//!
//! Every rule here has per-format unit tests; upstream sites change their
//! markup often and these are the pieces that break first.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

static FRACTIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[.,]\d").expect("valid fractional regex"));
static ORDINAL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(episodio|episode|capitolo|chapter|ep|cap|ch)\b\.?\s*")
        .expect("valid ordinal prefix regex")
});
static TITLE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*[-|]?\s*(sub\s*ita|streaming(\s*(&|e)\s*download)?)\s*$")
        .expect("valid title suffix regex")
});
static QUALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3,4})").expect("valid quality regex"));

/// Collapse runs of whitespace (including NBSP) into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Turn a raw ordinal hint into a canonical ordinal.
///
/// Non-digit characters are stripped (`"Episodio 01"` is 1). Fractional
/// specials (`"12.5"`), zero, empty and overflowing hints are unparseable.
pub fn parse_ordinal(hint: &str) -> Option<u32> {
    if FRACTIONAL.is_match(hint) {
        return None;
    }
    let digits: String = hint.chars().filter(char::is_ascii_digit).collect();
    match digits.parse::<u32>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(n),
    }
}

/// Strip an `Episodio`/`Capitolo`/`Chapter`/`Ep.` prefix from a label.
pub fn strip_ordinal_prefix(label: &str) -> String {
    collapse_whitespace(&ORDINAL_PREFIX.replace(label, ""))
}

/// The part of a label after its last `Episode`/`Episodio` word.
///
/// `"Mob Psycho 100 Episode 5"` yields `"5"`; labels without the word come
/// back unchanged.
pub fn trailing_episode_label(label: &str) -> String {
    let lower = label.to_lowercase();
    let cut = ["episodio", "episode"]
        .iter()
        .filter_map(|w| lower.rfind(w).map(|i| i + w.len()))
        .max();
    match cut {
        Some(i) if label.is_char_boundary(i) => collapse_whitespace(&label[i..]),
        _ => collapse_whitespace(label),
    }
}

/// Collapse whitespace and drop trailing site boilerplate ("Sub ITA",
/// "Streaming", ...) from a series title.
pub fn clean_title(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw);
    collapse_whitespace(&TITLE_SUFFIX.replace(&collapsed, ""))
}

fn italian_month(name: &str) -> Option<u32> {
    let n = name.trim_end_matches('.').to_lowercase();
    let months = [
        "gennaio", "febbraio", "marzo", "aprile", "maggio", "giugno", "luglio", "agosto",
        "settembre", "ottobre", "novembre", "dicembre",
    ];
    months
        .iter()
        .position(|m| *m == n || (n.len() >= 3 && m.starts_with(&n)))
        .map(|i| i as u32 + 1)
}

/// Parse Italian long/short dates such as `"12 Gennaio 2024"` or `"3 set 2023"`.
pub fn parse_italian_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = collapse_whitespace(raw);
    let mut parts = cleaned.split(' ').filter(|p| !p.is_empty());
    let day: u32 = parts.next()?.trim_end_matches(',').parse().ok()?;
    let month = italian_month(parts.next()?)?;
    let year: i32 = parts.next()?.trim_end_matches(',').parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Best-effort date normalization to `YYYY-MM-DD`.
///
/// Accepts ISO dates, `YYYY-MM-DD HH:MM:SS` timestamps, `DD/MM/YYYY` and the
/// Italian formats above. Returns `None` rather than guessing.
pub fn normalize_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(s, "%d/%m/%Y").ok())
        .or_else(|| parse_italian_date(s))?;
    Some(date.format("%Y-%m-%d").to_string())
}

/// Map a human-readable language label to an ISO-639-1 code.
///
/// Handles labels such as `"English"`, `"Italiano"`, and
/// `"Portuguese - Portuguese(Brazil)"`. Two-letter inputs pass through.
pub fn language_code(label: &str) -> Option<String> {
    let head = label
        .split(&['-', '(', ',', '['][..])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let code = match head.as_str() {
        "english" | "inglese" => "en",
        "italian" | "italiano" | "ita" => "it",
        "spanish" | "español" | "espanol" | "castilian" => "es",
        "portuguese" | "português" | "portugues" => "pt",
        "french" | "français" | "francais" => "fr",
        "german" | "deutsch" => "de",
        "arabic" => "ar",
        "japanese" | "giapponese" | "jpn" => "ja",
        "russian" => "ru",
        "indonesian" => "id",
        "thai" => "th",
        "vietnamese" => "vi",
        "chinese" => "zh",
        "korean" => "ko",
        "turkish" => "tr",
        "polish" => "pl",
        "malay" => "ms",
        other if other.len() == 2 && other.chars().all(|c| c.is_ascii_alphabetic()) => {
            return Some(other.to_string())
        }
        _ => return None,
    };
    Some(code.to_string())
}

/// Vertical resolution from a quality label (`"1080p"`, `"720"`, `"1280x720"`).
pub fn parse_quality(label: &str) -> Option<u32> {
    let label = label.rsplit('x').next().unwrap_or(label);
    QUALITY.captures(label)?.get(1)?.as_str().parse().ok()
}
