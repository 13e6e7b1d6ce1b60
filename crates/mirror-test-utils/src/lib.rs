//! Shared test utilities for the mirrorsync workspace.
//!
//! This crate provides standardised test fixtures for source and
//! destination trees. It is a dev-dependency only and never published.
//!
//! # Modules
//!
//! - [`tree`]: [`TestTree`] builder with controlled contents and mtimes

pub mod tree;

pub use tree::TestTree;
