//! Value trees, paths, and leaf-path diffing for converge
//!
//! Provides the data model shared by every layer of the reconciler: the
//! hierarchical [`ValueTree`], [`Path`] addressing, the flattened
//! [`PathIndex`], [`PathPattern`] matching, and [`compute_difference`].

pub mod diff;
pub mod error;
pub mod index;
pub mod loader;
pub mod path;
pub mod pattern;
pub mod value;

pub use diff::{Action, Diff, compute_difference};
pub use error::{Error, Result};
pub use index::PathIndex;
pub use loader::{DocumentFormat, InputDocument, load_document, parse_document};
pub use path::{Path, Segment, parse_path};
pub use pattern::{PathPattern, PatternSegment};
pub use value::{Mapping, Scalar, ValueTree};
