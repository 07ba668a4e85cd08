use crate::config::SankeyConfig;

use super::types::PositionedGraph;
use super::LayoutError;

const MIN_SHIFT: f64 = 1e-6;

/// Iteratively moves nodes toward the breadth their links imply, then pushes
/// overlapping nodes apart. `alpha` (how far a node follows its links) decays
/// as `0.99^i`; `beta` (how hard collisions are resolved) grows to 1 by the
/// final iteration so the last pass leaves every column inside the canvas.
pub fn relax(mut graph: PositionedGraph, config: &SankeyConfig) -> Result<PositionedGraph, LayoutError> {
    let iterations = config.iterations;
    for i in 0..iterations {
        let alpha = 0.99f64.powi(i as i32);
        let beta = (1.0 - alpha).max((i + 1) as f64 / iterations as f64);
        log::trace!("relaxation {i}: alpha {alpha:.4}, beta {beta:.4}");
        relax_right_to_left(&mut graph, alpha, beta, config.height)?;
        relax_left_to_right(&mut graph, alpha, beta, config.height)?;
    }

    for node in 0..graph.ranked.nodes.len() {
        graph.sort_outbound_by_breadth(node);
        graph.sort_inbound_by_breadth(node);
    }
    log::debug!("relaxed {} columns over {iterations} iterations", graph.stacks.len());
    Ok(graph)
}

// Reposition each node based on its inbound links.
fn relax_left_to_right(
    graph: &mut PositionedGraph,
    alpha: f64,
    beta: f64,
    height: f64,
) -> Result<(), LayoutError> {
    for column in 1..graph.stacks.len() {
        for row in 0..graph.stacks[column].len() {
            let target = graph.stacks[column][row];
            let mut y = 0.0;
            let mut w = 0.0;
            for &link_idx in &graph.ranked.nodes[target].inbound {
                if graph.hidden.link_hidden(link_idx) {
                    continue;
                }
                let source = graph.ranked.links[link_idx].source;
                let v = graph.ranked.links[link_idx].value * column_span(graph, source, target);
                y += target_top(graph, source, target)? * v;
                w += v;
            }
            if !(w > 0.0) {
                continue;
            }
            let extent = graph.extent_mut(target)?;
            let dy = (y / w - extent.y0) * alpha;
            extent.shift(dy);
            reorder_neighbor_links(graph, target);
        }
        sort_stack(graph, column);
        resolve_collisions(graph, column, beta, height)?;
    }
    Ok(())
}

// Reposition each node based on its outbound links.
fn relax_right_to_left(
    graph: &mut PositionedGraph,
    alpha: f64,
    beta: f64,
    height: f64,
) -> Result<(), LayoutError> {
    let columns = graph.stacks.len();
    for column in (0..columns.saturating_sub(1)).rev() {
        for row in 0..graph.stacks[column].len() {
            let source = graph.stacks[column][row];
            let mut y = 0.0;
            let mut w = 0.0;
            for &link_idx in &graph.ranked.nodes[source].outbound {
                if graph.hidden.link_hidden(link_idx) {
                    continue;
                }
                let target = graph.ranked.links[link_idx].target;
                let v = graph.ranked.links[link_idx].value * column_span(graph, source, target);
                y += source_top(graph, source, target)? * v;
                w += v;
            }
            if !(w > 0.0) {
                continue;
            }
            let extent = graph.extent_mut(source)?;
            let dy = (y / w - extent.y0) * alpha;
            extent.shift(dy);
            reorder_neighbor_links(graph, source);
        }
        sort_stack(graph, column);
        resolve_collisions(graph, column, beta, height)?;
    }
    Ok(())
}

fn column_span(graph: &PositionedGraph, source: usize, target: usize) -> f64 {
    graph.ranked.node_column[target] as f64 - graph.ranked.node_column[source] as f64
}

fn visible_degree(graph: &PositionedGraph, links: &[usize]) -> usize {
    links
        .iter()
        .filter(|&&link| !graph.hidden.link_hidden(link))
        .count()
}

/// The `target.y0` that would make the link from `source` leave and arrive
/// without bending.
fn target_top(graph: &PositionedGraph, source: usize, target: usize) -> Result<f64, LayoutError> {
    let padding = graph.padding;
    let outbound = &graph.ranked.nodes[source].outbound;
    let spread = visible_degree(graph, outbound) as f64 - 1.0;
    let mut y = graph.extent(source)?.y0 - spread * padding / 2.0;
    for &link in outbound {
        if graph.hidden.link_hidden(link) {
            continue;
        }
        if graph.ranked.links[link].target == target {
            break;
        }
        y += graph.link_widths[link] + padding;
    }
    for &link in &graph.ranked.nodes[target].inbound {
        if graph.hidden.link_hidden(link) {
            continue;
        }
        if graph.ranked.links[link].source == source {
            break;
        }
        y -= graph.link_widths[link];
    }
    Ok(y)
}

/// The `source.y0` that would make the link into `target` arrive without
/// bending.
fn source_top(graph: &PositionedGraph, source: usize, target: usize) -> Result<f64, LayoutError> {
    let padding = graph.padding;
    let inbound = &graph.ranked.nodes[target].inbound;
    let spread = visible_degree(graph, inbound) as f64 - 1.0;
    let mut y = graph.extent(target)?.y0 - spread * padding / 2.0;
    for &link in inbound {
        if graph.hidden.link_hidden(link) {
            continue;
        }
        if graph.ranked.links[link].source == source {
            break;
        }
        y += graph.link_widths[link] + padding;
    }
    for &link in &graph.ranked.nodes[source].outbound {
        if graph.hidden.link_hidden(link) {
            continue;
        }
        if graph.ranked.links[link].target == target {
            break;
        }
        y -= graph.link_widths[link];
    }
    Ok(y)
}

/// A moved node changes the link order of its neighbors.
fn reorder_neighbor_links(graph: &mut PositionedGraph, node: usize) {
    let entry = &graph.ranked.nodes[node];
    let sources: Vec<usize> = entry
        .inbound
        .iter()
        .map(|&link| graph.ranked.links[link].source)
        .collect();
    let targets: Vec<usize> = entry
        .outbound
        .iter()
        .map(|&link| graph.ranked.links[link].target)
        .collect();
    for source in sources {
        graph.sort_outbound_by_breadth(source);
    }
    for target in targets {
        graph.sort_inbound_by_breadth(target);
    }
}

fn sort_stack(graph: &mut PositionedGraph, column: usize) {
    let mut stack = std::mem::take(&mut graph.stacks[column]);
    stack.sort_by(|&a, &b| graph.breadth(a).total_cmp(&graph.breadth(b)));
    graph.stacks[column] = stack;
}

/// Pushes nodes apart outward from the median row, then clamps the column
/// into `[0, height]`.
fn resolve_collisions(
    graph: &mut PositionedGraph,
    column: usize,
    beta: f64,
    height: f64,
) -> Result<(), LayoutError> {
    let len = graph.stacks[column].len();
    if len == 0 {
        return Ok(());
    }
    let middle = len >> 1;
    let subject = graph.extent(graph.stacks[column][middle])?;
    let padding = graph.padding;
    push_up(graph, column, subject.y0 - padding, middle, beta)?;
    push_down(graph, column, subject.y1 + padding, middle + 1, beta)?;
    push_up(graph, column, height, len, beta)?;
    push_down(graph, column, 0.0, 0, beta)
}

/// Moves rows `below - 1` down to 0 up so each ends above `y`.
fn push_up(
    graph: &mut PositionedGraph,
    column: usize,
    mut y: f64,
    below: usize,
    beta: f64,
) -> Result<(), LayoutError> {
    let padding = graph.padding;
    for row in (0..below).rev() {
        let node = graph.stacks[column][row];
        let extent = graph.extent_mut(node)?;
        let dy = (extent.y1 - y) * beta;
        if dy > MIN_SHIFT {
            extent.shift(-dy);
        }
        y = extent.y0 - padding;
    }
    Ok(())
}

/// Moves rows `from..` down so each starts below `y`.
fn push_down(
    graph: &mut PositionedGraph,
    column: usize,
    mut y: f64,
    from: usize,
    beta: f64,
) -> Result<(), LayoutError> {
    let padding = graph.padding;
    for row in from..graph.stacks[column].len() {
        let node = graph.stacks[column][row];
        let extent = graph.extent_mut(node)?;
        let dy = (y - extent.y0) * beta;
        if dy > MIN_SHIFT {
            extent.shift(dy);
        }
        y = extent.y1 + padding;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir;
    use crate::layout::types::NodeExtent;
    use crate::layout::{assign_ranks, filter_visible, minimize_crossings, solve_extents, wire_graph};
    use float_cmp::approx_eq;

    fn relaxed(graph: &ir::Graph, config: &SankeyConfig) -> PositionedGraph {
        let ranked = assign_ranks(wire_graph(graph).unwrap(), config).unwrap();
        let ordered = minimize_crossings(ranked, config.ordering_passes).unwrap();
        let positioned = solve_extents(filter_visible(ordered, config), config);
        relax(positioned, config).unwrap()
    }

    fn extent(graph: &PositionedGraph, id: &str) -> NodeExtent {
        let idx = graph.ranked.nodes.iter().position(|node| node.id == id).unwrap();
        graph.extent(idx).unwrap()
    }

    fn fan() -> ir::Graph {
        let mut graph = ir::Graph::new();
        graph.add_link("A", "X", Some(5.0));
        graph.add_link("A", "Y", Some(1.0));
        graph.add_link("B", "Y", Some(3.0));
        graph.add_link("B", "Z", Some(2.0));
        graph.add_link("C", "Z", Some(4.0));
        graph.add_link("C", "X", Some(0.5));
        graph
    }

    #[test]
    fn balanced_layout_is_already_at_rest() {
        let mut graph = ir::Graph::new();
        graph.add_link("A", "C", Some(1.0));
        graph.add_link("B", "C", Some(1.0));
        let config = SankeyConfig {
            width: 10.0,
            height: 100.0,
            node_width: 1.0,
            node_y_padding: 6.0,
            ..Default::default()
        };
        let relaxed = relaxed(&graph, &config);
        assert!(approx_eq!(f64, extent(&relaxed, "A").y0, 0.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, extent(&relaxed, "B").y0, 53.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, extent(&relaxed, "C").y0, 3.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, extent(&relaxed, "C").y1, 97.0, epsilon = 1e-9));
    }

    #[test]
    fn columns_end_inside_the_canvas_without_overlap() {
        let config = SankeyConfig {
            height: 300.0,
            node_y_padding: 10.0,
            ..Default::default()
        };
        let relaxed = relaxed(&fan(), &config);
        for stack in &relaxed.stacks {
            let extents: Vec<NodeExtent> =
                stack.iter().map(|&node| relaxed.extent(node).unwrap()).collect();
            for extent in &extents {
                assert!(extent.y0 >= -1e-6);
                assert!(extent.y1 <= config.height + 1e-6);
            }
            for pair in extents.windows(2) {
                assert!(pair[1].y0 + 1e-6 >= pair[0].y1 + relaxed.padding);
            }
        }
    }

    #[test]
    fn heights_survive_relaxation() {
        let config = SankeyConfig::default();
        let relaxed = relaxed(&fan(), &config);
        for (idx, node) in relaxed.ranked.nodes.iter().enumerate() {
            let extent = relaxed.extent(idx).unwrap();
            assert!(approx_eq!(
                f64,
                extent.height(),
                node.value * relaxed.scale,
                epsilon = 1e-9
            ));
        }
    }

    #[test]
    fn links_end_sorted_by_neighbor_breadth() {
        let relaxed = relaxed(&fan(), &SankeyConfig::default());
        for node in &relaxed.ranked.nodes {
            let targets: Vec<f64> = node
                .outbound
                .iter()
                .map(|&link| relaxed.breadth(relaxed.ranked.links[link].target))
                .collect();
            assert!(targets.windows(2).all(|pair| pair[0] <= pair[1]));
        }
    }

    #[test]
    fn zero_iterations_leave_initial_stacking() {
        let config = SankeyConfig {
            iterations: 0,
            ..Default::default()
        };
        let ranked = assign_ranks(wire_graph(&fan()).unwrap(), &config).unwrap();
        let positioned = solve_extents(filter_visible(ranked, &config), &config);
        let before = positioned.extents.clone();
        let relaxed = relax(positioned, &config).unwrap();
        assert_eq!(relaxed.extents, before);
    }
}
