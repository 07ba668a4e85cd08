use crate::config::SankeyConfig;

use super::types::{RankedGraph, VisibleGraph, Visibility};

/// Marks nodes outside their column's row window, or too far from the middle
/// rank when `visibleColumnsFromCenter` is set, as hidden. Links touching a
/// hidden node are hidden too. Nothing is removed.
pub fn filter_visible(graph: RankedGraph, config: &SankeyConfig) -> VisibleGraph {
    let mut hidden = Visibility {
        nodes: vec![false; graph.nodes.len()],
        links: vec![false; graph.links.len()],
    };

    for column in &graph.columns {
        for (row, &node) in column.nodes.iter().enumerate() {
            if !column.visible_rows.contains(&row) {
                hidden.nodes[node] = true;
            }
        }
    }

    if let Some(distance) = config.visible_columns_from_center {
        let threshold = graph.max_depth() as f64 / 2.0 - distance;
        for (node, rank) in graph.ranks.iter().enumerate() {
            let from_source = rank.depth as f64 > threshold;
            let from_sink = rank.inverse_depth as f64 > threshold;
            if !(from_source && from_sink) {
                hidden.nodes[node] = true;
            }
        }
    }

    for (idx, link) in graph.links.iter().enumerate() {
        hidden.links[idx] = hidden.nodes[link.source] || hidden.nodes[link.target];
    }

    log::debug!(
        "{} of {} nodes hidden",
        hidden.hidden_node_count(),
        graph.nodes.len()
    );

    VisibleGraph {
        ranked: graph,
        hidden,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;
    use crate::layout::{assign_ranks, wire_graph};

    fn chain() -> ir::Graph {
        let mut graph = ir::Graph::new();
        graph.add_link("A", "B", Some(1.0));
        graph.add_link("B", "C", Some(1.0));
        graph
    }

    fn visible(graph: &ir::Graph, config: &SankeyConfig) -> VisibleGraph {
        let ranked = assign_ranks(wire_graph(graph).unwrap(), config).unwrap();
        filter_visible(ranked, config)
    }

    #[test]
    fn everything_visible_by_default() {
        let visible = visible(&chain(), &SankeyConfig::default());
        assert_eq!(visible.hidden.hidden_node_count(), 0);
        assert!(visible.hidden.links.iter().all(|hidden| !hidden));
    }

    #[test]
    fn center_distance_keeps_only_the_middle() {
        let config = SankeyConfig {
            visible_columns_from_center: Some(0.5),
            ..Default::default()
        };
        let visible = visible(&chain(), &config);
        assert_eq!(visible.hidden.nodes, vec![true, false, true]);
        assert_eq!(visible.hidden.links, vec![true, true]);
        assert_eq!(visible.visible_column(1), vec![1]);
        assert!(visible.visible_column(0).is_empty());
    }

    #[test]
    fn wide_center_distance_hides_nothing() {
        let config = SankeyConfig {
            visible_columns_from_center: Some(2.0),
            ..Default::default()
        };
        let visible = visible(&chain(), &config);
        assert_eq!(visible.hidden.hidden_node_count(), 0);
    }

    #[test]
    fn row_window_hides_rows_and_their_links() {
        let mut graph = ir::Graph::new();
        graph.add_link("A", "D", Some(1.0));
        graph.add_link("B", "D", Some(1.0));
        graph.add_link("C", "D", Some(1.0));
        let config = SankeyConfig {
            max_visible_rows: Some(2),
            ..Default::default()
        };
        let visible = visible(&graph, &config);
        // arena order is A, D, B, C
        assert_eq!(visible.hidden.nodes, vec![false, false, false, true]);
        assert_eq!(visible.hidden.links, vec![false, false, true]);
    }

    #[test]
    fn explicit_window_on_supplied_columns() {
        let mut graph = chain();
        graph.columns = Some(vec![
            ir::Column {
                nodes: vec!["A".to_string()],
                visible_rows: Some((0, 0)),
                ..Default::default()
            },
            ir::Column {
                nodes: vec!["B".to_string()],
                ..Default::default()
            },
            ir::Column {
                nodes: vec!["C".to_string()],
                visible_rows: Some((0, 0)),
                ..Default::default()
            },
        ]);
        let visible = visible(&graph, &SankeyConfig::default());
        assert_eq!(visible.hidden.nodes, vec![true, false, true]);
        assert_eq!(visible.hidden.links, vec![true, true]);
    }
}
