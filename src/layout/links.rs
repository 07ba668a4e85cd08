use crate::config::SankeyConfig;

use super::types::{
    ColumnFlows, LinkAnchor, PositionedGraph, SankeyColumn, SankeyLayout, SankeyLink, SankeyNode,
    Visibility,
};
use super::LayoutError;

/// Thinnest band a link is ever drawn with.
const MIN_BAND: f64 = 1.0;

/// Splits a node edge starting at `top` into consecutive bands, one per
/// width, taking a share of `padding` out of each.
///
/// Every band gives up `remaining / links_left` of the padding budget. A band
/// that would drop below [`MIN_BAND`] is drawn at exactly `MIN_BAND` instead
/// and only spends what it can spare, so later bands give up the rest. The
/// extra breadth of a band thinner than `MIN_BAND` comes out of the gap left
/// below the bands, never out of its siblings.
pub fn carve_bands(top: f64, widths: &[f64], padding: f64) -> Vec<(f64, f64)> {
    carve(top, widths, padding).bands
}

struct Carved {
    bands: Vec<(f64, f64)>,
    /// Total breadth the bands lost against their raw widths; negative when
    /// thin bands were widened beyond the padding they could spend.
    given_up: f64,
}

fn carve(top: f64, widths: &[f64], padding: f64) -> Carved {
    let mut bands = Vec::with_capacity(widths.len());
    let mut remaining = padding;
    let mut given_up = 0.0;
    let mut y0 = top;
    for (idx, &raw) in widths.iter().enumerate() {
        let share = remaining / (widths.len() - idx) as f64;
        let y1 = if raw - share >= MIN_BAND {
            remaining -= share;
            given_up += share;
            y0 + raw - share
        } else {
            remaining -= (raw - MIN_BAND).max(0.0).min(remaining);
            given_up += raw - MIN_BAND;
            y0 + MIN_BAND
        };
        bands.push((y0, y1));
        y0 = y1;
    }
    Carved { bands, given_up }
}

/// Anchors every visible link on both of its nodes and assembles the final
/// layout.
///
/// A node is drawn shorter by the padding its heavier edge gave up, so that
/// edge's bands cover it exactly.
pub fn position_links(graph: PositionedGraph, config: &SankeyConfig) -> Result<SankeyLayout, LayoutError> {
    let link_count = graph.ranked.links.len();
    let mut starts: Vec<Option<LinkAnchor>> = vec![None; link_count];
    let mut ends: Vec<Option<LinkAnchor>> = vec![None; link_count];
    let mut drawn = graph.extents.clone();

    for (idx, node) in graph.ranked.nodes.iter().enumerate() {
        if graph.hidden.node_hidden(idx) {
            continue;
        }
        let extent = graph.extent(idx)?;

        let outbound = visible_links(&node.outbound, &graph.hidden);
        let out_widths: Vec<f64> = outbound.iter().map(|&link| graph.link_widths[link]).collect();
        let out_carved = carve(extent.y0, &out_widths, config.link_y_padding);
        for (&link, &(y0, y1)) in outbound.iter().zip(&out_carved.bands) {
            starts[link] = Some(LinkAnchor {
                x: extent.x1 + config.link_x_padding,
                y0,
                y1,
            });
        }

        let inbound = visible_links(&node.inbound, &graph.hidden);
        let in_widths: Vec<f64> = inbound.iter().map(|&link| graph.link_widths[link]).collect();
        let in_carved = carve(extent.y0, &in_widths, config.link_y_padding);
        for (&link, &(y0, y1)) in inbound.iter().zip(&in_carved.bands) {
            ends[link] = Some(LinkAnchor {
                x: extent.x0 - config.link_x_padding,
                y0,
                y1,
            });
        }

        let heavier = if out_widths.iter().sum::<f64>() >= in_widths.iter().sum::<f64>() {
            &out_carved
        } else {
            &in_carved
        };
        let shrink = heavier.given_up.max(0.0);
        if shrink > 0.0 {
            if let Some(slot) = drawn[idx].as_mut() {
                let cut = shrink.min(slot.height());
                slot.y1 -= cut;
            }
        }
    }

    let PositionedGraph {
        ranked,
        hidden,
        link_widths,
        scale,
        padding,
        column_x,
        ..
    } = graph;

    let columns = ranked
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let len = column.nodes.len();
            let mut flows = ColumnFlows::default();
            for &node in &column.nodes {
                flows.total += ranked.nodes[node].value;
                if !hidden.node_hidden(node) {
                    flows.visible += ranked.nodes[node].value;
                }
            }
            SankeyColumn {
                nodes: column.nodes.clone(),
                visible_rows: (column.visible_rows.start, column.visible_rows.end),
                right_padding: column.right_padding,
                x0: column_x[idx],
                has_hidden_top: len > 0 && column.visible_rows.start > 0,
                has_hidden_bottom: len > 0 && column.visible_rows.end < len,
                flows,
            }
        })
        .collect();

    let links = ranked
        .links
        .iter()
        .enumerate()
        .map(|(idx, link)| SankeyLink {
            source: link.source,
            target: link.target,
            value: link.value,
            width: link_widths[idx],
            hidden: hidden.link_hidden(idx),
            start: starts[idx],
            end: ends[idx],
        })
        .collect();

    let nodes = ranked
        .nodes
        .into_iter()
        .enumerate()
        .map(|(idx, node)| SankeyNode {
            id: node.id,
            label: node.label,
            value: node.value,
            rank: ranked.ranks[idx],
            column: ranked.node_column[idx],
            hidden: hidden.node_hidden(idx),
            extent: drawn[idx],
            outbound: node.outbound,
            inbound: node.inbound,
        })
        .collect();

    Ok(SankeyLayout {
        width: config.width,
        height: config.height,
        node_width: config.node_width,
        scale,
        node_padding: padding,
        nodes,
        links,
        columns,
    })
}

fn visible_links(links: &[usize], hidden: &Visibility) -> Vec<usize> {
    links
        .iter()
        .copied()
        .filter(|&link| !hidden.link_hidden(link))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn assert_bands(actual: &[(f64, f64)], expected: &[(f64, f64)]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!(approx_eq!(f64, a.0, e.0, epsilon = 1e-9), "{actual:?} != {expected:?}");
            assert!(approx_eq!(f64, a.1, e.1, epsilon = 1e-9), "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn bands_follow_value_without_padding() {
        assert_bands(&carve_bands(0.0, &[10.0, 100.0], 0.0), &[(0.0, 10.0), (10.0, 110.0)]);
        assert_bands(&carve_bands(10.0, &[10.0, 100.0], 0.0), &[(10.0, 20.0), (20.0, 120.0)]);
    }

    #[test]
    fn padding_is_shared_between_bands() {
        assert_bands(&carve_bands(0.0, &[10.0, 100.0], 10.0), &[(0.0, 5.0), (5.0, 100.0)]);
    }

    #[test]
    fn thin_band_keeps_one_unit_and_carries_padding() {
        // 1.5 cannot give up a share of 5: it stays at 1 and uses 0.5
        let bands = carve_bands(0.0, &[1.5, 20.0], 10.0);
        assert_bands(&bands, &[(0.0, 1.0), (1.0, 11.5)]);
    }

    #[test]
    fn thin_first_band_leaves_siblings_alone() {
        let bands = carve_bands(0.0, &[0.01, 30.0], 0.0);
        assert_bands(&bands, &[(0.0, 1.0), (1.0, 31.0)]);
    }

    #[test]
    fn thin_last_band_leaves_siblings_alone() {
        let bands = carve_bands(0.0, &[30.0, 0.01], 0.0);
        assert_bands(&bands, &[(0.0, 30.0), (30.0, 31.0)]);
        assert!(bands.iter().all(|(y0, y1)| y1 > y0));
    }

    #[test]
    fn thin_band_widens_into_the_padding() {
        let carved = carve(0.0, &[30.0, 0.01], 4.0);
        assert_bands(&carved.bands, &[(0.0, 28.0), (28.0, 29.0)]);
        // 2 given up by the wide band, 0.99 handed back to the thin one
        assert!(approx_eq!(f64, carved.given_up, 1.01, epsilon = 1e-9));
        assert!(approx_eq!(f64, 30.01 - carved.given_up, 29.0, epsilon = 1e-9));
    }

    #[test]
    fn unpadded_bands_give_up_nothing() {
        assert_eq!(carve(0.0, &[0.5, 12.0, 0.2], 0.0).given_up.max(0.0), 0.0);
        assert_eq!(carve(0.0, &[12.0, 3.0], 0.0).given_up, 0.0);
    }

    #[test]
    fn padded_nodes_are_drawn_to_their_bands() {
        let mut graph = crate::ir::Graph::new();
        graph.add_link("A", "B", Some(3.0));
        graph.add_link("A", "C", Some(1.0));
        let config = SankeyConfig {
            link_y_padding: 10.0,
            ..Default::default()
        };
        let layout = crate::layout::compute_sankey(&graph, &config).unwrap();

        let a = layout.node_extent(0).unwrap();
        assert!(approx_eq!(f64, a.height(), 382.0, epsilon = 1e-9));
        let mut starts: Vec<LinkAnchor> = layout.nodes[0]
            .outbound
            .iter()
            .map(|&link| layout.links[link].start.unwrap())
            .collect();
        assert!(approx_eq!(f64, starts[0].y0, a.y0, epsilon = 1e-9));
        assert!(approx_eq!(f64, starts[1].y1, a.y1, epsilon = 1e-9));
        starts.sort_by(|x, y| x.breadth().total_cmp(&y.breadth()));
        assert!(approx_eq!(f64, starts[0].breadth(), 93.0, epsilon = 1e-9));
        assert!(approx_eq!(f64, starts[1].breadth(), 289.0, epsilon = 1e-9));

        let b = layout.node_extent(1).unwrap();
        assert!(approx_eq!(f64, b.height(), 284.0, epsilon = 1e-9));
        let (_, end) = layout.link_anchors(0).unwrap();
        assert!(approx_eq!(f64, end.y0, b.y0, epsilon = 1e-9));
        assert!(approx_eq!(f64, end.y1, b.y1, epsilon = 1e-9));
    }

    #[test]
    fn no_links_no_bands() {
        assert!(carve_bands(3.0, &[], 8.0).is_empty());
    }
}
