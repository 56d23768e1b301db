//! Embedded player messaging.
//!
//! Players post [`PlayerMessage`]s to the server; the [`PlayerEventBus`] fans
//! them out to every subscribed client (SSE).

pub mod events;

pub use events::{PlayerEvent, PlayerEventBus, PlayerMessage, PlayerMessageType};
