//! # Oshin Gateway
//! Thin HTTP surface: status submission endpoints plus health and info.

pub mod routes;
pub mod server;

pub use server::{AppState, build_router, serve};
