use std::collections::HashMap;

use crate::ir;

use super::types::{Column, Link, Node, WiredGraph};
use super::LayoutError;

/// Resolves id-keyed links into the index arena and derives per-node
/// inbound/outbound lists and flow values.
pub fn wire_graph(graph: &ir::Graph) -> Result<WiredGraph, LayoutError> {
    let mut id_to_idx: HashMap<&str, usize> = HashMap::with_capacity(graph.nodes.len());
    let mut nodes = Vec::with_capacity(graph.nodes.len());
    for (idx, node) in graph.nodes.iter().enumerate() {
        if id_to_idx.insert(node.id.as_str(), idx).is_some() {
            return Err(LayoutError::DuplicateNode {
                id: node.id.clone(),
            });
        }
        nodes.push(Node {
            id: node.id.clone(),
            label: node.label.clone().unwrap_or_else(|| node.id.clone()),
            value: 0.0,
            outbound: Vec::new(),
            inbound: Vec::new(),
        });
    }

    let lookup = |link: Option<usize>, id: &str| {
        id_to_idx
            .get(id)
            .copied()
            .ok_or_else(|| LayoutError::MissingNodeReference {
                link,
                id: id.to_string(),
            })
    };

    let mut links = Vec::with_capacity(graph.links.len());
    let mut in_total = vec![0.0f64; nodes.len()];
    let mut out_total = vec![0.0f64; nodes.len()];
    for (link_idx, link) in graph.links.iter().enumerate() {
        let source = lookup(Some(link_idx), &link.source_id)?;
        let target = lookup(Some(link_idx), &link.target_id)?;
        let value = link_value(link_idx, link.value)?;
        nodes[source].outbound.push(link_idx);
        nodes[target].inbound.push(link_idx);
        out_total[source] += value;
        in_total[target] += value;
        links.push(Link {
            source,
            target,
            value,
        });
    }

    for (idx, node) in nodes.iter_mut().enumerate() {
        node.value = in_total[idx].max(out_total[idx]);
        if node.value == 0.0 {
            log::warn!("node `{}` carries no flow", node.id);
        }
    }

    let partition = match &graph.columns {
        Some(columns) => Some(resolve_partition(columns, &nodes, &lookup)?),
        None => None,
    };

    log::debug!(
        "wired {} nodes, {} links{}",
        nodes.len(),
        links.len(),
        if partition.is_some() { " (caller partition)" } else { "" }
    );

    Ok(WiredGraph {
        nodes,
        links,
        partition,
    })
}

fn link_value(link: usize, value: Option<f64>) -> Result<f64, LayoutError> {
    match value {
        None => Ok(1.0),
        Some(value) if !value.is_finite() || value < 0.0 => {
            Err(LayoutError::InvalidLinkValue { link, value })
        }
        Some(value) if value == 0.0 => Ok(1.0),
        Some(value) => Ok(value),
    }
}

fn resolve_partition(
    columns: &[ir::Column],
    nodes: &[Node],
    lookup: &impl Fn(Option<usize>, &str) -> Result<usize, LayoutError>,
) -> Result<Vec<Column>, LayoutError> {
    let mut seen = vec![false; nodes.len()];
    let mut resolved = Vec::with_capacity(columns.len());
    for (column_idx, column) in columns.iter().enumerate() {
        let mut members = Vec::with_capacity(column.nodes.len());
        for id in &column.nodes {
            let idx = lookup(None, id)?;
            if seen[idx] {
                return Err(LayoutError::InvalidPartition {
                    reason: format!("node `{id}` appears in more than one column slot"),
                });
            }
            seen[idx] = true;
            members.push(idx);
        }
        if !(column.right_padding.is_finite() && column.right_padding >= 0.0) {
            return Err(LayoutError::InvalidPartition {
                reason: format!(
                    "column {column_idx} has invalid right padding {}",
                    column.right_padding
                ),
            });
        }
        let mut resolved_column = Column::new(members, column.right_padding);
        if let Some((lo, hi)) = column.visible_rows {
            if lo > hi {
                return Err(LayoutError::InvalidPartition {
                    reason: format!("column {column_idx} has visible rows [{lo}, {hi})"),
                });
            }
            let len = resolved_column.nodes.len();
            resolved_column.visible_rows = lo.min(len)..hi.min(len);
        }
        resolved.push(resolved_column);
    }
    if let Some(missing) = seen.iter().position(|seen| !seen) {
        return Err(LayoutError::InvalidPartition {
            reason: format!("node `{}` is not assigned to any column", nodes[missing].id),
        });
    }
    Ok(resolved)
}
