//! Proxy-routing manifest rewriter.
//!
//! Every URI line and every `URI="..."` attribute is resolved against the
//! manifest's own URL and replaced with a proxy URL carrying the absolute
//! target percent-encoded in `url=`. Blank lines and directives without a
//! `URI` attribute pass through untouched, so the output has exactly as many
//! lines as the input.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::playlist::{PlaylistDocument, PlaylistLine};

static URI_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"URI="([^"]*)""#).expect("valid URI attribute regex"));

/// What the proxy is being asked to fetch, carried in its `type=` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Progressive media file.
    File,
    /// HLS playlist; the proxy rewrites the body before returning it.
    Manifest,
    Segment,
    /// Encryption key or init map referenced from a `URI=` attribute.
    Key,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::File => "mp4",
            ResourceKind::Manifest => "m3u8",
            ResourceKind::Segment => "segment",
            ResourceKind::Key => "key",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mp4" | "file" => Ok(ResourceKind::File),
            "m3u8" | "manifest" => Ok(ResourceKind::Manifest),
            "segment" | "ts" => Ok(ResourceKind::Segment),
            "key" => Ok(ResourceKind::Key),
            other => Err(format!("unknown proxy resource type: {other}")),
        }
    }
}

/// Build `{endpoint}?url={percent-encoded target}&type={kind}`.
pub fn proxy_url(endpoint: &str, target: &str, kind: ResourceKind) -> String {
    let sep = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{endpoint}{sep}url={}&type={}",
        urlencoding::encode(target),
        kind.as_str()
    )
}

/// Rewrite `document` so every referenced resource goes through `proxy_endpoint`.
///
/// References that cannot be resolved against `base_url` (malformed URIs) are
/// left as they are; the line is still emitted.
pub fn rewrite(document: &PlaylistDocument, base_url: &Url, proxy_endpoint: &str) -> PlaylistDocument {
    let lines = document
        .lines()
        .iter()
        .map(|line| match line {
            PlaylistLine::Blank(_) => line.clone(),
            PlaylistLine::Directive(text) => {
                PlaylistLine::Directive(rewrite_uri_attributes(text, base_url, proxy_endpoint))
            }
            PlaylistLine::Uri(text) => {
                let reference = text.trim();
                match base_url.join(reference) {
                    Ok(abs) => PlaylistLine::Uri(proxy_url(
                        proxy_endpoint,
                        abs.as_str(),
                        ResourceKind::Segment,
                    )),
                    Err(_) => line.clone(),
                }
            }
        })
        .collect();
    PlaylistDocument::from_parts(lines, document.trailing_newline())
}

/// Convenience wrapper: parse, rewrite, render.
pub fn rewrite_text(text: &str, base_url: &Url, proxy_endpoint: &str) -> String {
    rewrite(&PlaylistDocument::parse(text), base_url, proxy_endpoint).render()
}

fn rewrite_uri_attributes(line: &str, base_url: &Url, proxy_endpoint: &str) -> String {
    if !line.contains("URI=\"") {
        return line.to_string();
    }
    URI_ATTR
        .replace_all(line, |caps: &Captures<'_>| match base_url.join(&caps[1]) {
            Ok(abs) => format!(
                "URI=\"{}\"",
                proxy_url(proxy_endpoint, abs.as_str(), ResourceKind::Key)
            ),
            Err(_) => caps[0].to_string(),
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://cdn.example/hls/show/ep1/index.m3u8").unwrap()
    }

    #[test]
    fn proxy_url_encodes_target() {
        let u = proxy_url("/api/proxy", "https://a.example/x?y=1&z=2", ResourceKind::Segment);
        assert_eq!(
            u,
            "/api/proxy?url=https%3A%2F%2Fa.example%2Fx%3Fy%3D1%26z%3D2&type=segment"
        );
        let u = proxy_url("https://me.example/p?k=v", "https://a.example/", ResourceKind::Manifest);
        assert!(u.starts_with("https://me.example/p?k=v&url="));
        assert!(u.ends_with("&type=m3u8"));
    }

    #[test]
    fn rewrites_relative_and_absolute_segments() {
        let src = "#EXTM3U\n#EXTINF:4,\nseg0.ts\n#EXTINF:4,\n/root/seg1.ts\n#EXTINF:4,\nhttps://other.example/seg2.ts\n";
        let out = rewrite_text(src, &base(), "/api/proxy");
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(
            lines[2],
            "/api/proxy?url=https%3A%2F%2Fcdn.example%2Fhls%2Fshow%2Fep1%2Fseg0.ts&type=segment"
        );
        assert_eq!(
            lines[4],
            "/api/proxy?url=https%3A%2F%2Fcdn.example%2Froot%2Fseg1.ts&type=segment"
        );
        assert_eq!(
            lines[6],
            "/api/proxy?url=https%3A%2F%2Fother.example%2Fseg2.ts&type=segment"
        );
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn rewrites_key_and_map_attributes() {
        let src = "#EXTM3U\n#EXT-X-KEY:METHOD=AES-128,URI=\"key.bin\",IV=0x1\n#EXT-X-MAP:URI=\"init.mp4\"\n";
        let out = rewrite_text(src, &base(), "/api/proxy");
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines[1],
            "#EXT-X-KEY:METHOD=AES-128,URI=\"/api/proxy?url=https%3A%2F%2Fcdn.example%2Fhls%2Fshow%2Fep1%2Fkey.bin&type=key\",IV=0x1"
        );
        assert!(lines[2].starts_with("#EXT-X-MAP:URI=\"/api/proxy?url="));
        assert!(lines[2].ends_with("&type=key\""));
    }

    #[test]
    fn plain_directives_and_blanks_untouched() {
        let src = "#EXTM3U\n\n#EXT-X-TARGETDURATION:10\n";
        assert_eq!(rewrite_text(src, &base(), "/api/proxy"), src);
    }

    #[test]
    fn master_variants_are_proxied() {
        let src = "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000,RESOLUTION=1280x720\n720p/index.m3u8\n";
        let out = rewrite_text(src, &base(), "/api/proxy");
        assert!(out
            .lines()
            .nth(2)
            .unwrap()
            .starts_with("/api/proxy?url=https%3A%2F%2Fcdn.example%2Fhls%2Fshow%2Fep1%2F720p%2Findex.m3u8"));
    }

    #[test]
    fn resource_kind_parsing() {
        assert_eq!("m3u8".parse::<ResourceKind>().unwrap(), ResourceKind::Manifest);
        assert_eq!("MP4".parse::<ResourceKind>().unwrap(), ResourceKind::File);
        assert!("exe".parse::<ResourceKind>().is_err());
    }
}
