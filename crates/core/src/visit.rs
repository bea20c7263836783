//! Traversal protocol for finished sample trees.

/// Depth-first consumer of an aggregated call tree.
///
/// The walk threads an opaque `Token` from each branch down to its children,
/// so an exporter can carry partially built output — a JSON object, an indent
/// level, a path prefix — without any shared mutable state. The traversal
/// produces one token per branch: `open_branch` creates it, every direct
/// child receives it as `parent`, and the matching `close_branch` consumes
/// it.
///
/// Sibling visit order is undefined beyond the walk being depth-first: the
/// child table reports occupants in slot order. Any ordering belongs in the
/// visitor.
///
/// Visiting is only safe once mutation has ceased; taking the tree by `&self`
/// makes the compiler enforce that.
pub trait TreeVisitor {
    /// Contextual state passed from a branch to its descendants.
    type Token;

    /// Called before a branching node's children are visited. The returned
    /// token is handed to every direct child and then to the matching
    /// [`close_branch`](Self::close_branch).
    fn open_branch(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        parent: &mut Self::Token,
    ) -> Self::Token;

    /// Called exactly once for every childless node.
    fn visit_leaf(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        parent: &mut Self::Token,
    );

    /// Called after all of a branch's children have been visited, symmetric
    /// with [`open_branch`](Self::open_branch). Defaults to a no-op.
    fn close_branch(&mut self, token: Self::Token, parent: &mut Self::Token) {
        let _ = (token, parent);
    }
}
