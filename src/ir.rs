use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// A flow between two nodes, referenced by id. `value` falls back to 1 when
/// omitted or zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(alias = "target")]
    pub target_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

/// Caller-supplied column of a pre-partitioned graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub nodes: Vec<String>,
    /// Half-open `[lo, hi)` window of rows that are shown.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_rows: Option<(usize, usize)>,
    #[serde(default)]
    pub right_padding: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<Column>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_node(&mut self, id: &str, label: Option<String>) {
        if let Some(node) = self.nodes.iter_mut().find(|node| node.id == id) {
            if label.is_some() {
                node.label = label;
            }
            return;
        }
        self.nodes.push(Node {
            id: id.to_string(),
            label,
        });
    }

    /// Adds a link, creating either endpoint if it is not known yet.
    pub fn add_link(&mut self, source: &str, target: &str, value: Option<f64>) {
        self.ensure_node(source, None);
        self.ensure_node(target, None);
        self.links.push(Link {
            source_id: source.to_string(),
            target_id: target.to_string(),
            value,
        });
    }

    pub fn node_label<'a>(&'a self, id: &'a str) -> &'a str {
        self.nodes
            .iter()
            .find(|node| node.id == id)
            .and_then(|node| node.label.as_deref())
            .unwrap_or(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_link_creates_endpoints_once() {
        let mut graph = Graph::new();
        graph.add_link("A", "B", Some(3.0));
        graph.add_link("A", "C", None);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.links.len(), 2);
        assert_eq!(graph.links[1].value, None);
    }

    #[test]
    fn ensure_node_keeps_existing_label() {
        let mut graph = Graph::new();
        graph.ensure_node("A", Some("Alpha".to_string()));
        graph.ensure_node("A", None);
        assert_eq!(graph.node_label("A"), "Alpha");
        assert_eq!(graph.node_label("missing"), "missing");
    }

    #[test]
    fn deserializes_prewired_link_names() {
        let json = r#"{
            "nodes": [{"id": "A"}, {"id": "B", "label": "Beta"}],
            "links": [{"source": "A", "target": "B", "value": 2}],
            "columns": [
                {"nodes": ["A"], "visibleRows": [0, 1], "rightPadding": 12},
                {"nodes": ["B"]}
            ]
        }"#;
        let graph: Graph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.links[0].source_id, "A");
        assert_eq!(graph.links[0].value, Some(2.0));
        let columns = graph.columns.unwrap();
        assert_eq!(columns[0].visible_rows, Some((0, 1)));
        assert_eq!(columns[0].right_padding, 12.0);
        assert_eq!(columns[1].visible_rows, None);
    }
}
