//! Shared test utilities for the converge workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each invent their own managed target. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`target`]: [`FakeTarget`], an in-memory managed target
//! - [`bundle`]: [`BundleWriter`], rule bundles on disk

pub mod bundle;
pub mod target;

pub use bundle::BundleWriter;
pub use target::FakeTarget;
