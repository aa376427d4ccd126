//! Shared test utilities for the dirmirror workspace.
//!
//! This crate provides standardised fixtures so every crate builds its
//! source and backup trees the same way. It is a dev-dependency only,
//! never published.
//!
//! # Modules
//!
//! - [`tree`]: [`tree::TestTree`] builder for a source root and its mirror

pub mod tree;
