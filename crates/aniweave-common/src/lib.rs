//! Aniweave-Common: shared provider ids, data model, and errors.
//!
//! This crate provides the vocabulary used across aniweave:
//!
//! - **Provider ids**: the closed set of upstream sources ([`ProviderId`])
//! - **Data model**: extractor records, reconciled slots, stream descriptors
//! - **Error Handling**: the unified [`Error`] taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use aniweave_common::{Error, ProviderId, Result};
//!
//! let provider: ProviderId = "AW".parse().unwrap();
//! assert_eq!(provider, ProviderId::AnimeWorld);
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found(ProviderId::AnimeSaturn, "/anime/missing"))
//! }
//! assert_eq!(example().unwrap_err().http_status(), 404);
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{Error, ParseError, Result};
pub use ids::*;
pub use types::*;
