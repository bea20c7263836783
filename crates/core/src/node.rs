use std::fmt;

use serde::ser::{Serialize, SerializeSeq, SerializeStruct, Serializer};
use thiserror::Error;

use crate::frame::{FrameError, FrameId};
use crate::store::{ChildIter, ChildStore};
use crate::visit::TreeVisitor;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The child store broke one of its own structural invariants. Indicates
    /// a defect in the tree itself; never user-recoverable.
    #[error("child store invariant violated: {0}")]
    Invariant(&'static str),
}

/// One merged stack frame at one position in the aggregated call tree.
///
/// Children are exclusively owned by their parent; there are no back
/// references and no sharing between branches. Nodes are never removed — the
/// tree grows monotonically during a sampling session and is dropped
/// wholesale afterwards.
#[derive(Debug)]
pub struct SampleNode {
    frame: FrameId,
    /// Samples that passed through or terminated at this node.
    pub sample_count: u64,
    /// Aggregated duration attributed to this node, in nanoseconds.
    pub total_time_ns: u64,
    children: ChildStore,
}

impl SampleNode {
    pub(crate) fn new(frame: FrameId) -> Self {
        SampleNode {
            frame,
            sample_count: 0,
            total_time_ns: 0,
            children: ChildStore::Empty,
        }
    }

    pub fn frame(&self) -> &FrameId {
        &self.frame
    }

    pub fn type_name(&self) -> &str {
        self.frame.type_name()
    }

    pub fn method_name(&self) -> &str {
        self.frame.method_name()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn children(&self) -> &ChildStore {
        &self.children
    }

    /// Look up or create the child for `(type_name, method_name)`.
    ///
    /// The sole mutation primitive. The sampler walks one captured stack
    /// root-to-leaf, calling this at each level and recording counters on the
    /// returned node. Names must be non-empty; anything else about them
    /// (interning, canonical form) is the sampler's business.
    pub fn child(
        &mut self,
        type_name: &str,
        method_name: &str,
    ) -> Result<&mut SampleNode, TreeError> {
        if type_name.is_empty() {
            return Err(FrameError::EmptyTypeName.into());
        }
        if method_name.is_empty() {
            return Err(FrameError::EmptyMethodName.into());
        }
        self.children.ensure(type_name, method_name)
    }

    /// Attribute one observed sample and its elapsed time to this node.
    pub fn record(&mut self, elapsed_ns: u64) {
        self.sample_count += 1;
        self.total_time_ns += elapsed_ns;
    }

    /// Walk this subtree depth-first, reporting every node to `visitor`.
    ///
    /// Childless nodes go through `visit_leaf`; branching nodes get an
    /// `open_branch`/`close_branch` pair around their children. Sibling
    /// order is arbitrary (table slot order).
    pub fn accept<V: TreeVisitor>(&self, visitor: &mut V, parent: &mut V::Token) {
        if !self.has_children() {
            visitor.visit_leaf(
                self.type_name(),
                self.method_name(),
                self.sample_count,
                self.total_time_ns,
                parent,
            );
            return;
        }

        let mut token = visitor.open_branch(
            self.type_name(),
            self.method_name(),
            self.sample_count,
            self.total_time_ns,
            parent,
        );
        for child in self.children.iter() {
            child.accept(visitor, &mut token);
        }
        visitor.close_branch(token, parent);
    }
}

impl PartialEq for SampleNode {
    fn eq(&self, other: &Self) -> bool {
        self.frame == other.frame
    }
}

impl Eq for SampleNode {}

impl fmt::Display for SampleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.frame.fmt(f)
    }
}

impl Serialize for SampleNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SampleNode", 5)?;
        state.serialize_field("type", self.type_name())?;
        state.serialize_field("method", self.method_name())?;
        state.serialize_field("samples", &self.sample_count)?;
        state.serialize_field("time_ns", &self.total_time_ns)?;
        let children: Vec<&SampleNode> = self.children.iter().collect();
        state.serialize_field("children", &children)?;
        state.end()
    }
}

/// Root of one aggregated sampling session.
///
/// Holds a synthetic root node that corresponds to no real frame; observed
/// stacks hang below it. Exactly one writer mutates the tree through
/// `&mut self` during sampling; exporters read through `&self` afterwards.
/// The borrow checker enforces that phase separation — there is no internal
/// locking, by design.
#[derive(Debug)]
pub struct SampleTree {
    root: SampleNode,
}

impl SampleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one captured stack into the tree.
    ///
    /// `frames` is `(type_name, method_name)` pairs ordered root-to-leaf —
    /// the order every sample must use. `elapsed_ns` is the duration
    /// attributed to this sample; it is added at every level of the path.
    pub fn record_sample<'a, I>(&mut self, frames: I, elapsed_ns: u64) -> Result<(), TreeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut node = &mut self.root;
        for (type_name, method_name) in frames {
            node = node.child(type_name, method_name)?;
            node.record(elapsed_ns);
        }
        Ok(())
    }

    /// Look up or create a bottom-of-stack frame, for samplers that drive the
    /// walk themselves instead of going through [`record_sample`](Self::record_sample).
    pub fn root_child(
        &mut self,
        type_name: &str,
        method_name: &str,
    ) -> Result<&mut SampleNode, TreeError> {
        self.root.child(type_name, method_name)
    }

    /// Whether any sample has been recorded.
    pub fn has_samples(&self) -> bool {
        self.root.has_children()
    }

    /// The bottom-of-stack frames, in arbitrary order.
    pub fn roots(&self) -> ChildIter<'_> {
        self.root.children().iter()
    }

    /// Drive `visitor` over every recorded stack. `token` plays the parent
    /// token for the bottom-of-stack frames; sampling must have ceased.
    pub fn visit<V: TreeVisitor>(&self, visitor: &mut V, token: &mut V::Token) {
        for root in self.roots() {
            root.accept(visitor, token);
        }
    }
}

impl Default for SampleTree {
    fn default() -> Self {
        SampleTree {
            root: SampleNode::new(FrameId::root()),
        }
    }
}

impl Serialize for SampleTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for root in self.roots() {
            seq.serialize_element(root)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_is_stable_across_lookups() {
        let mut tree = SampleTree::new();
        tree.root_child("a.A", "f").unwrap().record(1);
        tree.root_child("a.A", "f").unwrap().record(1);
        let child = tree.roots().next().unwrap();
        assert_eq!(child.sample_count, 2);
        assert_eq!(tree.roots().count(), 1);
    }

    #[test]
    fn deep_chain_stays_single_per_level() {
        let mut tree = SampleTree::new();
        let stack = [("a.A", "f"), ("b.B", "g"), ("c.C", "h")];
        tree.record_sample(stack, 100).unwrap();
        tree.record_sample(stack, 100).unwrap();

        let mut node = tree.roots().next().unwrap();
        let mut depth = 1;
        while node.has_children() {
            assert!(matches!(node.children(), ChildStore::Single(_)));
            node = node.children().iter().next().unwrap();
            depth += 1;
        }
        assert_eq!(depth, 3);
        assert_eq!(node.method_name(), "h");
        assert_eq!(node.sample_count, 2);
        assert_eq!(node.total_time_ns, 200);
    }

    #[test]
    fn rejects_empty_names() {
        let mut tree = SampleTree::new();
        assert_eq!(
            tree.root_child("", "f"),
            Err(TreeError::Frame(FrameError::EmptyTypeName))
        );
        assert_eq!(
            tree.root_child("a.A", ""),
            Err(TreeError::Frame(FrameError::EmptyMethodName))
        );
        assert!(!tree.has_samples());
    }

    #[test]
    fn record_sample_counts_every_level() {
        let mut tree = SampleTree::new();
        tree.record_sample([("a.A", "f"), ("b.B", "g")], 10).unwrap();
        tree.record_sample([("a.A", "f"), ("b.B", "h")], 20).unwrap();

        let a = tree.roots().next().unwrap();
        assert_eq!(a.sample_count, 2);
        assert_eq!(a.total_time_ns, 30);
        assert_eq!(a.children().len(), 2);
        assert_eq!(a.children().find("b.B", "g").unwrap().total_time_ns, 10);
        assert_eq!(a.children().find("b.B", "h").unwrap().total_time_ns, 20);
    }

    #[test]
    fn node_equality_is_frame_identity() {
        let mut left = SampleTree::new();
        let mut right = SampleTree::new();
        left.root_child("a.A", "f").unwrap().record(5);
        right.root_child("a.A", "f").unwrap();
        assert_eq!(left.roots().next(), right.roots().next());
    }

    #[test]
    fn display_is_type_colon_method() {
        let mut tree = SampleTree::new();
        tree.root_child("android.os.Looper", "loop").unwrap();
        let node = tree.roots().next().unwrap();
        assert_eq!(node.to_string(), "android.os.Looper:loop");
    }

    #[test]
    fn serializes_to_nested_json() {
        let mut tree = SampleTree::new();
        tree.record_sample([("a.A", "f"), ("b.B", "g")], 50).unwrap();

        let json = serde_json::to_value(&tree).unwrap();
        let roots = json.as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["type"], "a.A");
        assert_eq!(roots[0]["method"], "f");
        assert_eq!(roots[0]["samples"], 1);
        assert_eq!(roots[0]["time_ns"], 50);
        let children = roots[0]["children"].as_array().unwrap();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0]["method"], "g");
        assert_eq!(children[0]["children"].as_array().unwrap().len(), 0);
    }
}
