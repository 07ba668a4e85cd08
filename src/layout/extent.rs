use crate::config::SankeyConfig;

use super::types::{Column, Node, NodeExtent, PositionedGraph, VisibleGraph};

/// Stacks visible nodes top to bottom at one scale shared by every column,
/// centers each column vertically, and places columns across the canvas.
pub fn solve_extents(graph: VisibleGraph, config: &SankeyConfig) -> PositionedGraph {
    let stacks: Vec<Vec<usize>> = (0..graph.ranked.columns.len())
        .map(|column| graph.visible_column(column))
        .collect();
    let VisibleGraph { ranked, hidden } = graph;

    let tallest = stacks.iter().map(Vec::len).max().unwrap_or(0);
    let padding = effective_padding(config.node_y_padding, config.height, tallest);
    let scale = global_scale(&stacks, &ranked.nodes, config.height, padding);
    let column_x = column_offsets(&ranked.columns, config);

    let mut extents: Vec<Option<NodeExtent>> = vec![None; ranked.nodes.len()];
    for (column, stack) in stacks.iter().enumerate() {
        let x0 = column_x[column];
        let mut y = 0.0;
        for &node in stack {
            let y1 = y + ranked.nodes[node].value * scale;
            extents[node] = Some(NodeExtent {
                x0,
                x1: x0 + config.node_width,
                y0: y,
                y1,
            });
            y = y1 + padding;
        }
        let slack = (config.height - y + padding) / (stack.len() + 1) as f64;
        for (row, &node) in stack.iter().enumerate() {
            if let Some(extent) = extents[node].as_mut() {
                extent.shift(slack * (row + 1) as f64);
            }
        }
    }

    let link_widths = ranked.links.iter().map(|link| link.value * scale).collect();

    log::debug!(
        "solved extents: scale {scale:.4}, padding {padding:.2}, {} columns",
        stacks.len()
    );

    let mut positioned = PositionedGraph {
        ranked,
        hidden,
        extents,
        link_widths,
        scale,
        padding,
        column_x,
        stacks,
    };
    for node in 0..positioned.ranked.nodes.len() {
        positioned.sort_outbound_by_breadth(node);
        positioned.sort_inbound_by_breadth(node);
    }
    positioned
}

/// Shrinks the configured gap so the tallest column's gaps alone never
/// exceed the canvas.
fn effective_padding(node_y_padding: f64, height: f64, tallest: usize) -> f64 {
    if tallest > 1 {
        node_y_padding.min(height / (tallest - 1) as f64)
    } else {
        node_y_padding
    }
}

/// Smallest per-column `(height - gaps) / value`; columns without flow do not
/// constrain it.
fn global_scale(stacks: &[Vec<usize>], nodes: &[Node], height: f64, padding: f64) -> f64 {
    stacks
        .iter()
        .filter_map(|stack| {
            let value: f64 = stack.iter().map(|&node| nodes[node].value).sum();
            if stack.is_empty() || value <= 0.0 {
                return None;
            }
            Some((height - (stack.len() - 1) as f64 * padding) / value)
        })
        .reduce(f64::min)
        .map_or(0.0, |scale| scale.max(0.0))
}

/// Left edge of every column. The first column sits at 0 and the last one
/// ends flush with the canvas; right paddings widen the gaps they follow.
fn column_offsets(columns: &[Column], config: &SankeyConfig) -> Vec<f64> {
    let count = columns.len();
    if count <= 1 {
        return vec![0.0; count];
    }
    let extra: f64 = columns[..count - 1].iter().map(|column| column.right_padding).sum();
    let step = (config.width - config.node_width - extra) / (count - 1) as f64;
    if step < config.node_width {
        log::warn!(
            "{count} columns overflow width {}: column step {step:.2} is narrower than nodes",
            config.width
        );
    }

    let mut offsets = Vec::with_capacity(count);
    let mut x = 0.0;
    for column in columns {
        offsets.push(x);
        x += step + column.right_padding;
    }
    offsets
}
