//! # Oshin Core
//! Shared traits, types, configuration and time utilities.

pub mod config;
pub mod error;
pub mod routing;
pub mod time;
pub mod traits;
pub mod types;

pub use config::OshinConfig;
pub use error::{OshinError, Result};
pub use routing::{Credential, RoutingConfig, RoutingRule};
