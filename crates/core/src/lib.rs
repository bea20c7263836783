//! Aggregation core for stack-sampling profilers.
//!
//! A sampler repeatedly captures the call stack of a thread and feeds each
//! captured stack into a [`SampleTree`]. Stacks are merged frame by frame into
//! a weighted call tree: each [`SampleNode`] is a unique (type, method) pair
//! at one position in the merged call graph, annotated with how many samples
//! passed through it and how much cumulative time they represent.
//!
//! The interesting part is the per-node [`ChildStore`]: a node starts as a
//! childless leaf, holds a single child directly once one frame has been
//! observed below it, and switches to an inline linear-probing hash table once
//! a second distinct child appears. Long non-branching call chains (framework
//! entry points, thread run loops) therefore allocate no container at all,
//! while branching hot methods keep near-O(1) child lookup.
//!
//! Stack capture, sampling schedules, and report formats are external:
//! a sampler drives [`SampleTree::record_sample`], an exporter drives
//! [`TreeVisitor`] once sampling has stopped.

pub mod frame;
pub mod node;
pub mod store;
pub mod visit;

pub use frame::{FrameError, FrameId, FrameStr, Interner};
pub use node::{SampleNode, SampleTree, TreeError};
pub use store::{ChildIter, ChildStore, MAX_PROBE_DISTANCE};
pub use visit::TreeVisitor;
