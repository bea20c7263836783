use std::fmt;

use serde::Serialize;
use stackfold_core::{SampleTree, TreeVisitor};

use crate::format::{TypeNameFormat, write_time_ns};

/// One frame on the hottest path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotFrame {
    pub name: String,
    pub sample_count: u64,
    pub total_time_ns: u64,
}

impl fmt::Display for HotFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut time = String::new();
        write_time_ns(&mut time, self.total_time_ns);
        write!(f, "{} {} {}", self.name, self.sample_count, time)
    }
}

/// Best path found below one branch, threaded as the traversal token.
#[derive(Debug, Default)]
pub struct HotPathToken {
    frame: Option<HotFrame>,
    best: Vec<HotFrame>,
}

impl HotPathToken {
    pub fn into_path(self) -> Vec<HotFrame> {
        self.best
    }
}

/// Reduces a sample tree to its single hottest path: at every branch only
/// the child seen in the most samples survives.
///
/// Useful when an application tends to be blocked by one method at a time —
/// file IO or a lock wait on the main thread — and the full tree would be
/// noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct HotPathVisitor {
    pub format: TypeNameFormat,
}

impl HotPathVisitor {
    pub fn new(format: TypeNameFormat) -> Self {
        HotPathVisitor { format }
    }

    fn frame(
        &self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
    ) -> HotFrame {
        HotFrame {
            name: self.format.frame_name(type_name, method_name),
            sample_count,
            total_time_ns,
        }
    }
}

/// Keep `path` if it starts hotter than the incumbent. Ties keep the
/// incumbent, so the first sibling visited wins among equals.
fn offer(parent: &mut HotPathToken, path: Vec<HotFrame>) {
    let Some(head) = path.first() else { return };
    let incumbent = parent.best.first().map_or(0, |f| f.sample_count);
    if parent.best.is_empty() || head.sample_count > incumbent {
        parent.best = path;
    }
}

impl TreeVisitor for HotPathVisitor {
    type Token = HotPathToken;

    fn open_branch(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        _parent: &mut HotPathToken,
    ) -> HotPathToken {
        HotPathToken {
            frame: Some(self.frame(type_name, method_name, sample_count, total_time_ns)),
            best: Vec::new(),
        }
    }

    fn visit_leaf(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        parent: &mut HotPathToken,
    ) {
        offer(
            parent,
            vec![self.frame(type_name, method_name, sample_count, total_time_ns)],
        );
    }

    fn close_branch(&mut self, mut token: HotPathToken, parent: &mut HotPathToken) {
        if let Some(frame) = token.frame.take() {
            let mut path = Vec::with_capacity(token.best.len() + 1);
            path.push(frame);
            path.append(&mut token.best);
            offer(parent, path);
        }
    }
}

/// Walk `tree` and return its hottest root-to-leaf path, outermost frame
/// first. Empty when no sample has been recorded.
pub fn hottest_path(tree: &SampleTree, format: TypeNameFormat) -> Vec<HotFrame> {
    let mut visitor = HotPathVisitor::new(format);
    let mut token = HotPathToken::default();
    tree.visit(&mut visitor, &mut token);
    token.into_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follows_the_heaviest_branch() {
        let mut tree = SampleTree::new();
        let hot = [
            ("com.android.internal.os.RuntimeInit", "main"),
            ("java.lang.Thread", "run"),
            ("com.example.FakeClass", "testMethod2"),
        ];
        let cold = [
            ("com.android.internal.os.RuntimeInit", "main"),
            ("java.lang.Thread", "run"),
            ("com.example.FakeClass", "testMethod"),
        ];
        for _ in 0..12 {
            tree.record_sample(hot, 10_000).unwrap();
        }
        for _ in 0..5 {
            tree.record_sample(cold, 10_000).unwrap();
        }

        let path = hottest_path(&tree, TypeNameFormat::Full);
        let names: Vec<&str> = path.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            [
                "com.android.internal.os.RuntimeInit.main",
                "java.lang.Thread.run",
                "com.example.FakeClass.testMethod2",
            ]
        );
        assert_eq!(path[0].sample_count, 17);
        assert_eq!(path[2].sample_count, 12);
    }

    #[test]
    fn heavier_sibling_wins_at_the_root() {
        let mut tree = SampleTree::new();
        tree.record_sample([("a.A", "idle")], 1).unwrap();
        for _ in 0..3 {
            tree.record_sample([("b.B", "busy"), ("c.C", "spin")], 1).unwrap();
        }

        let path = hottest_path(&tree, TypeNameFormat::SimpleName);
        let names: Vec<&str> = path.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["B.busy", "C.spin"]);
    }

    #[test]
    fn empty_tree_has_no_path() {
        let tree = SampleTree::new();
        assert!(hottest_path(&tree, TypeNameFormat::Full).is_empty());
    }

    #[test]
    fn display_matches_breadcrumb_format() {
        let frame = HotFrame {
            name: "java.lang.Thread.run".into(),
            sample_count: 5,
            total_time_ns: 423_000,
        };
        assert_eq!(frame.to_string(), "java.lang.Thread.run 5 .4ms");
    }
}
