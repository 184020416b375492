//! Shared test utilities for the WFS client workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Capabilities and exception report XML fixtures
//! - A scriptable mock WFS server bound to an ephemeral port
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, MockWfsServer};
//! ```

pub mod fixtures;
pub mod server;

// Re-export commonly used items at the crate root
pub use fixtures::{capabilities_xml, FeatureTypeFixture};
pub use server::{MockReply, MockWfsServer, RecordedRequest};
