//! Allow-listed CORS/Range egress proxy.
//!
//! Players cannot fetch most upstream media directly: CDNs check the
//! referer, and HLS playlists reference segments and keys on hosts the
//! browser would block. The proxy fetches on the client's behalf, but only
//! from hosts on the [`AllowList`].

mod allowlist;
mod handler;

pub use allowlist::AllowList;
pub use handler::{ProxyRequest, ProxyService};
