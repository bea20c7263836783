use serde_json::{Map, Value};
use stackfold_core::{SampleTree, TreeVisitor};

use crate::format::{TypeNameFormat, write_time_ns};

/// Extremely verbose but readable export, mostly suitable for debugging:
/// every branch becomes a JSON object keyed by `Type.method [count time]`,
/// every leaf a `"Type.method": "count time"` string entry.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataVisitor {
    pub format: TypeNameFormat,
}

impl MetadataVisitor {
    pub fn new(format: TypeNameFormat) -> Self {
        MetadataVisitor { format }
    }

    fn branch_label(
        &self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
    ) -> String {
        let mut label = String::new();
        self.format.write_frame_name(&mut label, type_name, method_name);
        label.push_str(" [");
        label.push_str(&sample_count.to_string());
        label.push(' ');
        write_time_ns(&mut label, total_time_ns);
        label.push(']');
        label
    }
}

/// A branch object under construction, labelled for insertion into its
/// parent on close.
#[derive(Debug, Default)]
pub struct MetadataToken {
    label: String,
    entries: Map<String, Value>,
}

impl MetadataToken {
    pub fn into_value(self) -> Value {
        Value::Object(self.entries)
    }
}

impl TreeVisitor for MetadataVisitor {
    type Token = MetadataToken;

    fn open_branch(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        _parent: &mut MetadataToken,
    ) -> MetadataToken {
        MetadataToken {
            label: self.branch_label(type_name, method_name, sample_count, total_time_ns),
            entries: Map::new(),
        }
    }

    fn visit_leaf(
        &mut self,
        type_name: &str,
        method_name: &str,
        sample_count: u64,
        total_time_ns: u64,
        parent: &mut MetadataToken,
    ) {
        let name = self.format.frame_name(type_name, method_name);
        let mut value = sample_count.to_string();
        value.push(' ');
        write_time_ns(&mut value, total_time_ns);
        parent.entries.insert(name, Value::String(value));
    }

    fn close_branch(&mut self, token: MetadataToken, parent: &mut MetadataToken) {
        parent.entries.insert(token.label, Value::Object(token.entries));
    }
}

/// Export the whole tree as one nested JSON object.
pub fn tree_to_json(tree: &SampleTree, format: TypeNameFormat) -> Value {
    let mut visitor = MetadataVisitor::new(format);
    let mut root = MetadataToken::default();
    tree.visit(&mut visitor, &mut root);
    root.into_value()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_objects_mirror_the_stack() {
        // Drive the visitor by hand, as an exporter would.
        let mut visitor = MetadataVisitor::new(TypeNameFormat::Full);
        let mut root = MetadataToken::default();

        let mut main = visitor.open_branch(
            "com.android.internal.os.RuntimeInit",
            "main",
            1,
            3_123_000,
            &mut root,
        );
        let mut run = visitor.open_branch("java.lang.Thread", "run", 1, 423_000, &mut main);

        visitor.visit_leaf("com.example.FakeClass", "testMethod", 10, 10, &mut run);
        visitor.visit_leaf("com.example.FakeClass", "testMethod2", 10, 82_300, &mut run);

        visitor.close_branch(run, &mut main);
        visitor.close_branch(main, &mut root);

        assert_eq!(
            root.into_value(),
            json!({
                "com.android.internal.os.RuntimeInit.main [1 3ms]": {
                    "java.lang.Thread.run [1 .4ms]": {
                        "com.example.FakeClass.testMethod": "10 10ns",
                        "com.example.FakeClass.testMethod2": "10 .08ms",
                    }
                }
            })
        );
    }

    #[test]
    fn tree_to_json_round_trip() {
        let mut tree = SampleTree::new();
        tree.record_sample([("app.Main", "main"), ("app.Io", "read")], 5_000_000)
            .unwrap();
        tree.record_sample([("app.Main", "main"), ("app.Io", "read")], 5_000_000)
            .unwrap();

        let value = tree_to_json(&tree, TypeNameFormat::SimpleName);
        assert_eq!(
            value,
            json!({
                "Main.main [2 10ms]": {
                    "Io.read": "2 10ms",
                }
            })
        );
    }

    #[test]
    fn empty_tree_exports_an_empty_object() {
        let tree = SampleTree::new();
        assert_eq!(tree_to_json(&tree, TypeNameFormat::Full), json!({}));
    }
}
