//! Aniweave-HLS: playlist model and manifest rewriting.
//!
//! Upstream HLS manifests are usually geo- or referer-restricted, so every
//! URI they contain must be fetched by the server rather than the player.
//! This crate rewrites a playlist so that each segment, key, init map and
//! variant reference points at the aniweave proxy endpoint.
//!
//! # Modules
//!
//! - `playlist` - line-oriented [`PlaylistDocument`] parsing and rendering
//! - `rewrite` - the proxy-routing [`rewrite`] pass and [`proxy_url`] builder
//!
//! # Example
//!
//! ```
//! use aniweave_hls::{rewrite, PlaylistDocument};
//! use url::Url;
//!
//! let doc = PlaylistDocument::parse("#EXTM3U\n#EXTINF:4.0,\nseg0.ts\n");
//! let base = Url::parse("https://cdn.example/show/index.m3u8").unwrap();
//! let out = rewrite(&doc, &base, "/api/proxy");
//!
//! assert_eq!(out.len(), doc.len());
//! assert_eq!(
//!     out.render(),
//!     "#EXTM3U\n#EXTINF:4.0,\n/api/proxy?url=https%3A%2F%2Fcdn.example%2Fshow%2Fseg0.ts&type=segment\n"
//! );
//! ```

pub mod playlist;
pub mod rewrite;

pub use playlist::{is_playlist, PlaylistDocument, PlaylistLine};
pub use rewrite::{proxy_url, rewrite, ResourceKind};
