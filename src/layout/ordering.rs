use std::cmp::Ordering;

use super::types::{Partition, RankedGraph};
use super::LayoutError;

/// Reorders every column by the barycenter of its outbound targets in the
/// next column, sweeping left to right `passes` times. On the last pass each
/// node's outbound links are sorted by target row so a node never crosses
/// its own links.
///
/// A caller-supplied partition must keep every link between adjacent
/// columns, checked once up front even when `passes` is zero; derived
/// columns may skip columns, and such links do not pull on the barycenter.
pub fn minimize_crossings(mut graph: RankedGraph, passes: usize) -> Result<RankedGraph, LayoutError> {
    if graph.partition == Partition::Supplied {
        check_adjacency(&graph)?;
    }
    let column_count = graph.columns.len();
    if column_count < 2 {
        return Ok(graph);
    }

    let mut next_row: Vec<Option<usize>> = vec![None; graph.nodes.len()];
    for pass in 0..passes {
        let last_pass = pass + 1 == passes;
        for column_idx in 0..column_count - 1 {
            next_row.fill(None);
            for (row, &node) in graph.columns[column_idx + 1].nodes.iter().enumerate() {
                next_row[node] = Some(row);
            }

            let mut keyed = Vec::with_capacity(graph.columns[column_idx].nodes.len());
            for &node in &graph.columns[column_idx].nodes {
                keyed.push((barycenter(&graph, node, &next_row), node));
            }
            keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
            graph.columns[column_idx].nodes = keyed.into_iter().map(|(_, node)| node).collect();

            if last_pass {
                sort_links_by_target_row(&mut graph, column_idx, &next_row);
            }
        }
    }

    log::debug!("ordered {column_count} columns over {passes} passes");
    Ok(graph)
}

/// Every link of a supplied partition must step exactly one column right.
fn check_adjacency(graph: &RankedGraph) -> Result<(), LayoutError> {
    for link in &graph.links {
        let column = graph.node_column[link.source];
        if graph.node_column[link.target] != column + 1 {
            return Err(LayoutError::DisconnectedNeighbor {
                source_id: graph.nodes[link.source].id.clone(),
                target_id: graph.nodes[link.target].id.clone(),
                column,
            });
        }
    }
    Ok(())
}

fn barycenter(graph: &RankedGraph, node: usize, next_row: &[Option<usize>]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for &link_idx in &graph.nodes[node].outbound {
        if let Some(row) = next_row[graph.links[link_idx].target] {
            sum += row as f64;
            count += 1;
        }
    }
    if count == 0 {
        f64::INFINITY
    } else {
        sum / count as f64
    }
}

fn sort_links_by_target_row(graph: &mut RankedGraph, column: usize, next_row: &[Option<usize>]) {
    let RankedGraph {
        nodes,
        links,
        columns,
        ..
    } = graph;
    for &node in &columns[column].nodes {
        nodes[node].outbound.sort_by(|&a, &b| {
            match (next_row[links[a].target], next_row[links[b].target]) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SankeyConfig;
    use crate::ir;
    use crate::layout::{assign_ranks, wire_graph};

    fn partitioned(links: &[(&str, &str)], columns: &[&[&str]]) -> ir::Graph {
        let mut graph = ir::Graph::new();
        for column in columns {
            for id in *column {
                graph.ensure_node(id, None);
            }
        }
        for (source, target) in links {
            graph.add_link(source, target, Some(1.0));
        }
        graph.columns = Some(
            columns
                .iter()
                .map(|ids| ir::Column {
                    nodes: ids.iter().map(|id| id.to_string()).collect(),
                    ..Default::default()
                })
                .collect(),
        );
        graph
    }

    fn ordered(graph: &ir::Graph, passes: usize) -> Result<RankedGraph, LayoutError> {
        let ranked = assign_ranks(wire_graph(graph)?, &SankeyConfig::default())?;
        minimize_crossings(ranked, passes)
    }

    fn ids(graph: &RankedGraph, column: usize) -> Vec<&str> {
        graph.columns[column]
            .nodes
            .iter()
            .map(|&node| graph.nodes[node].id.as_str())
            .collect()
    }

    #[test]
    fn untangles_a_simple_cross() {
        let graph = partitioned(&[("A", "D"), ("B", "C")], &[&["A", "B"], &["C", "D"]]);
        let ordered = ordered(&graph, 6).unwrap();
        assert_eq!(ids(&ordered, 0), vec!["B", "A"]);
        assert_eq!(ids(&ordered, 1), vec!["C", "D"]);
    }

    #[test]
    fn nodes_without_targets_sink_to_the_bottom() {
        let graph = partitioned(&[("A", "C")], &[&["X", "A"], &["C"]]);
        let ordered = ordered(&graph, 1).unwrap();
        assert_eq!(ids(&ordered, 0), vec!["A", "X"]);
    }

    #[test]
    fn equal_barycenters_keep_their_order() {
        let graph = partitioned(
            &[("A", "C"), ("B", "C"), ("D", "C")],
            &[&["B", "D", "A"], &["C"]],
        );
        let ordered = ordered(&graph, 3).unwrap();
        assert_eq!(ids(&ordered, 0), vec!["B", "D", "A"]);
    }

    #[test]
    fn supplied_partition_must_be_adjacent() {
        let graph = partitioned(&[("A", "B"), ("A", "C")], &[&["A"], &["B"], &["C"]]);
        let err = ordered(&graph, 1).unwrap_err();
        assert_eq!(
            err,
            LayoutError::DisconnectedNeighbor {
                source_id: "A".to_string(),
                target_id: "C".to_string(),
                column: 0,
            }
        );
    }

    #[test]
    fn adjacency_is_checked_without_passes() {
        let graph = partitioned(&[("A", "B"), ("A", "C")], &[&["A"], &["B"], &["C"]]);
        assert!(matches!(
            ordered(&graph, 0),
            Err(LayoutError::DisconnectedNeighbor { column: 0, .. })
        ));
    }

    #[test]
    fn last_column_cannot_link_back() {
        let graph = partitioned(&[("A", "B"), ("B", "C")], &[&["A"], &["B", "C"]]);
        assert_eq!(
            ordered(&graph, 6).unwrap_err(),
            LayoutError::DisconnectedNeighbor {
                source_id: "B".to_string(),
                target_id: "C".to_string(),
                column: 1,
            }
        );
    }

    #[test]
    fn derived_columns_tolerate_skipping_links() {
        let mut graph = ir::Graph::new();
        graph.add_link("A", "B", Some(1.0));
        graph.add_link("B", "C", Some(1.0));
        graph.add_link("A", "C", Some(1.0));
        let ordered = ordered(&graph, 2).unwrap();
        assert_eq!(ordered.partition, Partition::Derived);
        assert_eq!(ids(&ordered, 2), vec!["C"]);
    }

    #[test]
    fn last_pass_sorts_outbound_links_by_target_row() {
        let graph = partitioned(&[("A", "D"), ("A", "C")], &[&["A"], &["C", "D"]]);
        let ordered = ordered(&graph, 1).unwrap();
        let a = ordered.nodes.iter().position(|node| node.id == "A").unwrap();
        let targets: Vec<&str> = ordered.nodes[a]
            .outbound
            .iter()
            .map(|&link| ordered.nodes[ordered.links[link].target].id.as_str())
            .collect();
        assert_eq!(targets, vec!["C", "D"]);
    }

    #[test]
    fn zero_passes_is_a_no_op() {
        let graph = partitioned(&[("A", "D"), ("B", "C")], &[&["A", "B"], &["C", "D"]]);
        let ordered = ordered(&graph, 0).unwrap();
        assert_eq!(ids(&ordered, 0), vec!["A", "B"]);
    }
}
