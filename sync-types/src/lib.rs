//! # sync-types
//!
//! Data types shared by every clicker-sync crate:
//! - [`Counter`] - the versioned counter value and its comparison rule
//! - [`Settings`] / [`ClickerColor`] - local-only display settings
//! - [`Payload`] / [`ApplicationContext`] - the flat mapping shape used for
//!   persistence and for the context channel
//! - [`DecodeError`] - payload decode failures

#![warn(missing_docs)]
#![warn(clippy::all)]

mod counter;
mod error;
mod payload;
mod settings;

pub use counter::Counter;
pub use error::DecodeError;
pub use payload::{context_entry, wrap_context, ApplicationContext, Payload};
pub use settings::{ClickerColor, Settings};

/// Key the counter is persisted and published under.
pub const COUNTER_KEY: &str = "clicker";

/// Key the settings are persisted under.
pub const SETTINGS_KEY: &str = "settings";
