//! Exporters for aggregated [`stackfold_core`] call trees.
//!
//! Everything here is a [`stackfold_core::TreeVisitor`] implementation plus a
//! convenience function that drives it over a finished
//! [`stackfold_core::SampleTree`]:
//!
//! - [`hot_path`] — reduce the tree to its single hottest stack.
//! - [`metadata`] — verbose nested JSON objects, for debugging payloads.
//! - [`collapsed`] — Brendan Gregg collapsed stack lines for flamegraph
//!   tooling.
//!
//! [`format`] holds the shared type-name and duration formatting.

pub mod collapsed;
pub mod format;
pub mod hot_path;
pub mod metadata;

pub use collapsed::{CollapsedVisitor, to_collapsed};
pub use format::{TypeNameFormat, format_time_ns, write_time_ns};
pub use hot_path::{HotFrame, HotPathVisitor, hottest_path};
pub use metadata::{MetadataVisitor, tree_to_json};
