use stackfold_core::{SampleTree, TreeVisitor};

use crate::format::TypeNameFormat;

/// Folds a sample tree into Brendan Gregg's collapsed stack format: one
/// `frame;frame;... count` line per distinct stack, ready for flamegraph
/// tooling.
///
/// A leaf contributes its full sample count. A branch contributes only its
/// residual — the samples that terminated at the branch itself rather than
/// continuing into a child — so the per-line counts sum back to the number
/// of recorded samples.
#[derive(Debug, Default)]
pub struct CollapsedVisitor {
    format: TypeNameFormat,
    lines: Vec<String>,
}

/// Path prefix plus the counts needed to compute the residual on close.
#[derive(Debug, Default)]
pub struct CollapsedToken {
    path: String,
    sample_count: u64,
    child_samples: u64,
}

impl CollapsedVisitor {
    pub fn new(format: TypeNameFormat) -> Self {
        CollapsedVisitor {
            format,
            lines: Vec::new(),
        }
    }

    /// The emitted lines, in traversal order (arbitrary between siblings).
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn extend_path(&self, parent: &CollapsedToken, type_name: &str, method_name: &str) -> String {
        let mut path =
            String::with_capacity(parent.path.len() + type_name.len() + method_name.len() + 2);
        path.push_str(&parent.path);
        if !path.is_empty() {
            path.push(';');
        }
        self.format.write_frame_name(&mut path, type_name, method_name);
        path
    }

    fn emit(&mut self, path: &str, count: u64) {
        let mut line = String::with_capacity(path.len() + 8);
        line.push_str(path);
        line.push(' ');
        line.push_str(&count.to_string());
        self.lines.push(line);
    }
}

impl TreeVisitor for CollapsedVisitor {
    type Token = CollapsedToken;

    fn open_branch(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        _total_time_ns: u64,
        parent: &mut CollapsedToken,
    ) -> CollapsedToken {
        CollapsedToken {
            path: self.extend_path(parent, type_name, method_name),
            sample_count,
            child_samples: 0,
        }
    }

    fn visit_leaf(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        _total_time_ns: u64,
        parent: &mut CollapsedToken,
    ) {
        let path = self.extend_path(parent, type_name, method_name);
        self.emit(&path, sample_count);
        parent.child_samples += sample_count;
    }

    fn close_branch(&mut self, token: CollapsedToken, parent: &mut CollapsedToken) {
        let residual = token.sample_count.saturating_sub(token.child_samples);
        if residual > 0 {
            self.emit(&token.path, residual);
        }
        parent.child_samples += token.sample_count;
    }
}

/// Collapse the whole tree into newline-joined stack lines. Lines are sorted
/// because sibling visit order is undefined.
pub fn to_collapsed(tree: &SampleTree) -> String {
    let mut visitor = CollapsedVisitor::new(TypeNameFormat::Full);
    let mut token = CollapsedToken::default();
    tree.visit(&mut visitor, &mut token);
    let mut lines = visitor.into_lines();
    lines.sort_unstable();
    lines.join("\n")
}
