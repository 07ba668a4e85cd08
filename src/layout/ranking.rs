use crate::config::{AlignNode, SankeyConfig};

use super::types::{Column, Link, Node, Partition, Rank, RankedGraph, WiredGraph};
use super::LayoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sweep {
    /// Sources towards sinks along outbound links.
    Forward,
    /// Sinks towards sources along inbound links.
    Backward,
}

/// Assigns depth and inverse depth to every node and builds the column
/// partition, keeping a caller-supplied one as is.
pub fn assign_ranks(graph: WiredGraph, config: &SankeyConfig) -> Result<RankedGraph, LayoutError> {
    let WiredGraph {
        nodes,
        links,
        partition,
    } = graph;

    let depths = layer_depths(&nodes, &links, Sweep::Forward)?;
    let inverse_depths = layer_depths(&nodes, &links, Sweep::Backward)?;
    let ranks: Vec<Rank> = depths
        .iter()
        .zip(&inverse_depths)
        .map(|(&depth, &inverse_depth)| Rank {
            depth,
            inverse_depth,
        })
        .collect();

    let (columns, partition) = match partition {
        Some(columns) => (columns, Partition::Supplied),
        None => (derive_columns(&nodes, &links, &ranks, config), Partition::Derived),
    };

    let mut node_column = vec![0usize; nodes.len()];
    for (column_idx, column) in columns.iter().enumerate() {
        for &node in &column.nodes {
            node_column[node] = column_idx;
        }
    }

    log::debug!(
        "ranked {} nodes into {} columns (max depth {})",
        nodes.len(),
        columns.len(),
        depths.iter().copied().max().unwrap_or(0)
    );

    Ok(RankedGraph {
        nodes,
        links,
        ranks,
        columns,
        node_column,
        partition,
    })
}

/// Breadth-first layering: every node starts on the frontier at layer 0 and
/// is re-stamped each round it is reached again, so a node ends one layer past
/// its deepest predecessor. A frontier still alive after `n + 1` rounds means
/// a cycle.
fn layer_depths(nodes: &[Node], links: &[Link], sweep: Sweep) -> Result<Vec<usize>, LayoutError> {
    let node_count = nodes.len();
    let mut depths = vec![0usize; node_count];
    let mut current: Vec<usize> = (0..node_count).collect();
    let mut queued = vec![false; node_count];
    let mut layer = 0usize;

    while !current.is_empty() {
        let mut next = Vec::new();
        queued.fill(false);
        for &node in &current {
            depths[node] = layer;
            let adjacent = match sweep {
                Sweep::Forward => &nodes[node].outbound,
                Sweep::Backward => &nodes[node].inbound,
            };
            for &link_idx in adjacent {
                let link = &links[link_idx];
                let neighbor = match sweep {
                    Sweep::Forward => link.target,
                    Sweep::Backward => link.source,
                };
                if !queued[neighbor] {
                    queued[neighbor] = true;
                    next.push(neighbor);
                }
            }
        }
        layer += 1;
        if layer > node_count {
            return Err(LayoutError::CircularLink {
                node: nodes[current[0]].id.clone(),
            });
        }
        current = next;
    }

    Ok(depths)
}

fn derive_columns(
    nodes: &[Node],
    links: &[Link],
    ranks: &[Rank],
    config: &SankeyConfig,
) -> Vec<Column> {
    if nodes.is_empty() {
        return Vec::new();
    }
    let column_count = ranks.iter().map(|rank| rank.depth).max().unwrap_or(0) + 1;
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); column_count];
    for (idx, node) in nodes.iter().enumerate() {
        let align_node = AlignNode {
            depth: ranks[idx].depth,
            inverse_depth: ranks[idx].inverse_depth,
            inbound: node.inbound.len(),
            outbound: node.outbound.len(),
            min_target_depth: node
                .outbound
                .iter()
                .map(|&link| ranks[links[link].target].depth)
                .min(),
        };
        let column = config.align.column(&align_node, column_count);
        members[column].push(idx);
    }

    members
        .into_iter()
        .enumerate()
        .map(|(column_idx, nodes)| {
            let padding = config.column_padding.get(&column_idx).copied().unwrap_or(0.0);
            let mut column = Column::new(nodes, padding);
            if let Some(max_rows) = config.max_visible_rows {
                column.visible_rows = 0..column.nodes.len().min(max_rows);
            }
            column
        })
        .collect()
}
