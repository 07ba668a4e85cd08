use std::ops::Range;

use serde::Serialize;

use super::LayoutError;

/// Node in the layout arena. `outbound`/`inbound` hold link indices; their
/// order is re-sorted by later stages and carries no identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub label: String,
    /// `max(sum(outbound), sum(inbound))`.
    pub value: f64,
    pub outbound: Vec<usize>,
    pub inbound: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub source: usize,
    pub target: usize,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub nodes: Vec<usize>,
    /// Row indices into `nodes` that are shown.
    pub visible_rows: Range<usize>,
    pub right_padding: f64,
}

impl Column {
    pub(crate) fn new(nodes: Vec<usize>, right_padding: f64) -> Self {
        let len = nodes.len();
        Self {
            nodes,
            visible_rows: 0..len,
            right_padding,
        }
    }
}

/// Where the column partition came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    /// Built from ranks by the configured alignment.
    Derived,
    /// Supplied by the caller alongside the graph.
    Supplied,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rank {
    pub depth: usize,
    pub inverse_depth: usize,
}

/// Links resolved to node indices.
#[derive(Debug, Clone)]
pub struct WiredGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub partition: Option<Vec<Column>>,
}

#[derive(Debug, Clone)]
pub struct RankedGraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub ranks: Vec<Rank>,
    pub columns: Vec<Column>,
    /// Column index of every node.
    pub node_column: Vec<usize>,
    pub partition: Partition,
}

impl RankedGraph {
    pub fn max_depth(&self) -> usize {
        self.ranks.iter().map(|rank| rank.depth).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visibility {
    pub nodes: Vec<bool>,
    pub links: Vec<bool>,
}

impl Visibility {
    pub fn node_hidden(&self, node: usize) -> bool {
        self.nodes.get(node).copied().unwrap_or(false)
    }

    pub fn link_hidden(&self, link: usize) -> bool {
        self.links.get(link).copied().unwrap_or(false)
    }

    pub fn hidden_node_count(&self) -> usize {
        self.nodes.iter().filter(|hidden| **hidden).count()
    }
}

#[derive(Debug, Clone)]
pub struct VisibleGraph {
    pub ranked: RankedGraph,
    pub hidden: Visibility,
}

impl VisibleGraph {
    /// Visible nodes of `column` in row order.
    pub fn visible_column(&self, column: usize) -> Vec<usize> {
        self.ranked.columns[column]
            .nodes
            .iter()
            .copied()
            .filter(|node| !self.hidden.node_hidden(*node))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NodeExtent {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl NodeExtent {
    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn shift(&mut self, dy: f64) {
        self.y0 += dy;
        self.y1 += dy;
    }
}

/// Vertical band where a link touches a node edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkAnchor {
    pub x: f64,
    pub y0: f64,
    pub y1: f64,
}

impl LinkAnchor {
    pub fn breadth(&self) -> f64 {
        self.y1 - self.y0
    }
}

#[derive(Debug, Clone)]
pub struct PositionedGraph {
    pub ranked: RankedGraph,
    pub hidden: Visibility,
    /// `None` for hidden nodes.
    pub extents: Vec<Option<NodeExtent>>,
    pub link_widths: Vec<f64>,
    /// Value to breadth factor shared by all columns.
    pub scale: f64,
    /// Effective vertical gap between sibling nodes.
    pub padding: f64,
    pub column_x: Vec<f64>,
    /// Visible nodes per column, in breadth order once relaxed.
    pub stacks: Vec<Vec<usize>>,
}

impl PositionedGraph {
    pub fn extent(&self, node: usize) -> Result<NodeExtent, LayoutError> {
        self.extents
            .get(node)
            .copied()
            .flatten()
            .ok_or_else(|| undefined_extent(self.ranked.nodes.get(node).map(|n| n.id.as_str())))
    }

    pub(crate) fn extent_mut(&mut self, node: usize) -> Result<&mut NodeExtent, LayoutError> {
        let nodes = &self.ranked.nodes;
        self.extents
            .get_mut(node)
            .and_then(|extent| extent.as_mut())
            .ok_or_else(|| undefined_extent(nodes.get(node).map(|n| n.id.as_str())))
    }

    /// Top edge of `node`; hidden nodes sort after everything.
    pub(crate) fn breadth(&self, node: usize) -> f64 {
        self.extents[node].map_or(f64::INFINITY, |extent| extent.y0)
    }

    /// Sorts `node`'s outbound links by target breadth, ties by link index.
    pub(crate) fn sort_outbound_by_breadth(&mut self, node: usize) {
        let mut outbound = std::mem::take(&mut self.ranked.nodes[node].outbound);
        outbound.sort_by(|&a, &b| {
            let (ta, tb) = (self.ranked.links[a].target, self.ranked.links[b].target);
            self.breadth(ta).total_cmp(&self.breadth(tb)).then(a.cmp(&b))
        });
        self.ranked.nodes[node].outbound = outbound;
    }

    /// Sorts `node`'s inbound links by source breadth, ties by link index.
    pub(crate) fn sort_inbound_by_breadth(&mut self, node: usize) {
        let mut inbound = std::mem::take(&mut self.ranked.nodes[node].inbound);
        inbound.sort_by(|&a, &b| {
            let (sa, sb) = (self.ranked.links[a].source, self.ranked.links[b].source);
            self.breadth(sa).total_cmp(&self.breadth(sb)).then(a.cmp(&b))
        });
        self.ranked.nodes[node].inbound = inbound;
    }
}

fn undefined_extent(id: Option<&str>) -> LayoutError {
    LayoutError::UndefinedGeometry {
        what: format!("extent of node `{}`", id.unwrap_or("<out of range>")),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyNode {
    pub id: String,
    pub label: String,
    pub value: f64,
    pub rank: Rank,
    pub column: usize,
    pub hidden: bool,
    pub extent: Option<NodeExtent>,
    pub outbound: Vec<usize>,
    pub inbound: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    /// Breadth at the global scale, before padding is carved out.
    pub width: f64,
    pub hidden: bool,
    pub start: Option<LinkAnchor>,
    pub end: Option<LinkAnchor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ColumnFlows {
    pub visible: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyColumn {
    pub nodes: Vec<usize>,
    pub visible_rows: (usize, usize),
    pub right_padding: f64,
    pub x0: f64,
    pub has_hidden_top: bool,
    pub has_hidden_bottom: bool,
    pub flows: ColumnFlows,
}

/// Final geometry of a layout run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SankeyLayout {
    pub width: f64,
    pub height: f64,
    pub node_width: f64,
    pub scale: f64,
    pub node_padding: f64,
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
    pub columns: Vec<SankeyColumn>,
}

impl SankeyLayout {
    pub fn node(&self, id: &str) -> Option<&SankeyNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    pub fn node_extent(&self, node: usize) -> Result<NodeExtent, LayoutError> {
        self.nodes
            .get(node)
            .and_then(|node| node.extent)
            .ok_or_else(|| undefined_extent(self.nodes.get(node).map(|n| n.id.as_str())))
    }

    /// `(start, end)` bands of a link; hidden links have none.
    pub fn link_anchors(&self, link: usize) -> Result<(LinkAnchor, LinkAnchor), LayoutError> {
        let Some(entry) = self.links.get(link) else {
            return Err(LayoutError::UndefinedGeometry {
                what: format!("link {link} is out of range"),
            });
        };
        match (entry.start, entry.end) {
            (Some(start), Some(end)) => Ok((start, end)),
            _ => Err(LayoutError::UndefinedGeometry {
                what: format!(
                    "anchors of link `{}` -> `{}`",
                    self.nodes[entry.source].id, self.nodes[entry.target].id
                ),
            }),
        }
    }

    pub fn visible_nodes(&self) -> impl Iterator<Item = &SankeyNode> {
        self.nodes.iter().filter(|node| !node.hidden)
    }

    pub fn visible_links(&self) -> impl Iterator<Item = &SankeyLink> {
        self.links.iter().filter(|link| !link.hidden)
    }
}
