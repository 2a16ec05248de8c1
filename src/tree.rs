//! Collapsible tree view of a JSON document, used by row detail panels.

use serde_json::Value;

use crate::render::escape_html;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Object,
    Array,
    /// Scalar value (string, number, bool or null).
    Leaf(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    label: Option<String>,
    kind: NodeKind,
    children: Vec<TreeNode>,
    expanded: bool,
}

impl TreeNode {
    fn from_value(label: Option<String>, value: &Value) -> Self {
        let (kind, children) = match value {
            Value::Object(map) => {
                let mut entries: Vec<_> = map.iter().collect();
                entries.sort_by(|a, b| a.0.cmp(b.0));
                (
                    NodeKind::Object,
                    entries
                        .into_iter()
                        .map(|(key, child)| TreeNode::from_value(Some(key.clone()), child))
                        .collect(),
                )
            }
            Value::Array(items) => (
                NodeKind::Array,
                items
                    .iter()
                    .enumerate()
                    .map(|(index, child)| TreeNode::from_value(Some(index.to_string()), child))
                    .collect(),
            ),
            scalar => (NodeKind::Leaf(scalar.clone()), Vec::new()),
        };
        Self {
            label,
            kind,
            children,
            expanded: false,
        }
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    pub fn is_container(&self) -> bool {
        !matches!(self.kind, NodeKind::Leaf(_))
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    fn set_expanded(&mut self, expanded: bool) {
        if self.is_container() {
            self.expanded = expanded;
        }
        for child in &mut self.children {
            child.set_expanded(expanded);
        }
    }

    fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }

    fn summary(&self) -> String {
        match &self.kind {
            NodeKind::Object => format!("{{{}}}", self.children.len()),
            NodeKind::Array => format!("[{}]", self.children.len()),
            NodeKind::Leaf(value) => value.to_string(),
        }
    }

    fn heading(&self) -> String {
        match &self.label {
            Some(label) => format!("{label}: {}", self.summary()),
            None => self.summary(),
        }
    }

    fn write_text(&self, depth: usize, out: &mut Vec<String>) {
        let marker = match (self.is_container(), self.expanded) {
            (false, _) => "",
            (true, true) => "▾ ",
            (true, false) => "▸ ",
        };
        out.push(format!("{}{marker}{}", INDENT.repeat(depth), self.heading()));
        if self.expanded {
            for child in &self.children {
                child.write_text(depth + 1, out);
            }
        }
    }

    fn write_html(&self, out: &mut String) {
        let state = match (self.is_container(), self.expanded) {
            (false, _) => "jsontree-leaf",
            (true, true) => "jsontree-node expanded",
            (true, false) => "jsontree-node",
        };
        out.push_str(&format!(
            r#"<li class="{state}"><span class="jsontree-label">{}</span>"#,
            escape_html(&self.heading())
        ));
        if self.expanded && !self.children.is_empty() {
            out.push_str("<ul>");
            for child in &self.children {
                child.write_html(out);
            }
            out.push_str("</ul>");
        }
        out.push_str("</li>");
    }
}

/// A JSON document as a tree of collapsible nodes. New trees start collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonTree {
    root: TreeNode,
}

impl JsonTree {
    pub fn create(value: &Value) -> Self {
        Self {
            root: TreeNode::from_value(None, value),
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::create(&value))
    }

    /// Expands every node.
    pub fn expand(&mut self) -> &mut Self {
        self.root.set_expanded(true);
        self
    }

    /// Collapses every node.
    pub fn collapse(&mut self) -> &mut Self {
        self.root.set_expanded(false);
        self
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    pub fn render_text(&self) -> String {
        let mut lines = Vec::new();
        self.root.write_text(0, &mut lines);
        lines.join("\n")
    }

    pub fn render_html(&self) -> String {
        let mut html = String::from(r#"<ul class="jsontree">"#);
        self.root.write_html(&mut html);
        html.push_str("</ul>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "hostname": "web01",
            "tags": ["a", "b"],
            "meta": {"cpu": 4, "up": true, "rack": null}
        })
    }

    #[test]
    fn create_starts_collapsed() {
        let tree = JsonTree::create(&sample());
        assert!(!tree.root().is_expanded());
        assert_eq!(tree.render_text(), "▸ {3}");
        assert_eq!(tree.node_count(), 9);
    }

    #[test]
    fn expand_renders_every_level() {
        let mut tree = JsonTree::create(&sample());
        tree.expand();
        let text = tree.render_text();
        let expected = [
            "▾ {3}",
            "  hostname: \"web01\"",
            "  ▾ meta: {3}",
            "    cpu: 4",
            "    rack: null",
            "    up: true",
            "  ▾ tags: [2]",
            "    0: \"a\"",
            "    1: \"b\"",
        ]
        .join("\n");
        assert_eq!(text, expected);
    }

    #[test]
    fn collapse_hides_children_again() {
        let mut tree = JsonTree::create(&sample());
        tree.expand().collapse();
        assert!(tree.root().children().iter().all(|child| !child.is_expanded()));
        assert_eq!(tree.render_text().lines().count(), 1);
    }

    #[test]
    fn scalar_documents_are_single_leaves() {
        let tree = JsonTree::parse("\"just text\"").unwrap();
        assert!(!tree.root().is_container());
        assert_eq!(tree.render_text(), "\"just text\"");
    }

    #[test]
    fn html_escapes_labels() {
        let mut tree = JsonTree::create(&json!({"<b>": "x & y"}));
        tree.expand();
        let html = tree.render_html();
        assert!(html.starts_with(r#"<ul class="jsontree"><li class="jsontree-node expanded">"#));
        assert!(html.contains("&lt;b&gt;: &quot;x &amp; y&quot;"));
    }

    #[test]
    fn parse_rejects_malformed_json() {
        assert!(JsonTree::parse("{\"a\":").is_err());
    }
}
