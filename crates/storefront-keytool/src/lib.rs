//! Operator tooling for storefront-security
//!
//! Exposes the same primitives the request layer uses, driven from the
//! command line with configuration loaded once at startup.

pub mod commands;

pub use commands::{run, Command};
