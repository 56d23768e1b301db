//! Unpacker for `eval(function(p,a,c,k,e,d){...})` packed scripts.
//!
//! Several video hosts hide the media URL inside a script compressed with
//! Dean Edwards' packer: a payload of base-N word indices plus a `|`-separated
//! dictionary. Unpacking substitutes each index with its dictionary word.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PACKED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)\}\s*\(\s*'(.*)'\s*,\s*(\d+)\s*,\s*(\d+)\s*,\s*'([^']*)'\.split\(\s*'\|'\s*\)"#)
        .expect("valid packer regex")
});
static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w+\b").expect("valid word regex"));
static M3U8: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https?://[^"'\s\\]+\.m3u8[^"'\s\\]*"#).expect("valid m3u8 regex")
});

const ALPHABET: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn decode_word(word: &str, radix: u32) -> Option<usize> {
    if !(2..=62).contains(&radix) {
        return None;
    }
    word.chars().try_fold(0usize, |acc, c| {
        let digit = ALPHABET.find(c)? as u32;
        if digit >= radix {
            return None;
        }
        acc.checked_mul(radix as usize)?.checked_add(digit as usize)
    })
}

/// Whether `script` contains a packed payload.
pub fn is_packed(script: &str) -> bool {
    PACKED.is_match(script)
}

/// Unpack the first packed payload in `script`.
pub fn unpack(script: &str) -> Option<String> {
    let caps = PACKED.captures(script)?;
    let payload = caps[1].replace("\\'", "'").replace("\\\\", "\\");
    let radix: u32 = caps[2].parse().ok()?;
    let count: usize = caps[3].parse().ok()?;
    let dict: Vec<&str> = caps.get(4)?.as_str().split('|').collect();

    let out = WORD.replace_all(&payload, |c: &Captures<'_>| {
        let word = &c[0];
        decode_word(word, radix)
            .filter(|i| *i < count)
            .and_then(|i| dict.get(i).copied())
            .filter(|w| !w.is_empty())
            .unwrap_or(word)
            .to_string()
    });
    Some(out.into_owned())
}

/// First `.m3u8` URL in a page, looking inside packed scripts as well.
pub fn find_manifest_url(page: &str) -> Option<String> {
    if let Some(m) = M3U8.find(page) {
        return Some(m.as_str().to_string());
    }
    let unpacked = unpack(page)?;
    M3U8.find(&unpacked).map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKED_PAGE: &str = r#"<script>eval(function(p,a,c,k,e,d){e=function(c){return c};if(!''.replace(/^/,String)){while(c--){d[c]=k[c]||c}k=[function(e){return d[e]}];e=function(){return'\\w+'};c=1};while(c--){if(k[c]){p=p.replace(new RegExp('\\b'+e(c)+'\\b','g'),k[c])}}return p}('2 1=\'0://3.4/5.6\';7.8(1)',10,9,'https|source|const|cdn|example|video|m3u8|player|load'.split('|'),0,{}))</script>"#;

    #[test]
    fn decodes_base62_words() {
        assert_eq!(decode_word("z", 62), Some(35));
        assert_eq!(decode_word("Z", 62), Some(61));
        assert_eq!(decode_word("10", 36), Some(36));
        assert_eq!(decode_word("a", 10), None);
        assert_eq!(decode_word("1", 99), None);
    }

    #[test]
    fn unpacks_payload() {
        assert!(is_packed(PACKED_PAGE));
        let js = unpack(PACKED_PAGE).unwrap();
        assert_eq!(js, "const source='https://cdn.example/video.m3u8';player.load(source)");
    }

    #[test]
    fn finds_manifest_in_packed_or_plain_page() {
        assert_eq!(
            find_manifest_url(PACKED_PAGE).as_deref(),
            Some("https://cdn.example/video.m3u8")
        );
        assert_eq!(
            find_manifest_url("var f = \"https://x.example/a/index.m3u8?t=1\";").as_deref(),
            Some("https://x.example/a/index.m3u8?t=1")
        );
        assert_eq!(find_manifest_url("<html></html>"), None);
    }
}
