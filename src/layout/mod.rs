mod error;
mod extent;
mod links;
mod ordering;
mod ranking;
mod relax;
pub(crate) mod types;
mod visibility;
mod wiring;

pub use error::LayoutError;
pub use extent::solve_extents;
pub use links::{carve_bands, position_links};
pub use ordering::minimize_crossings;
pub use ranking::assign_ranks;
pub use relax::relax;
pub use types::*;
pub use visibility::filter_visible;
pub use wiring::wire_graph;

use crate::config::SankeyConfig;
use crate::ir::Graph;

/// Runs the whole pipeline: wiring, ranking, crossing minimization,
/// visibility, extents, relaxation and link anchoring.
pub fn compute_sankey(graph: &Graph, config: &SankeyConfig) -> Result<SankeyLayout, LayoutError> {
    config.validate()?;
    let layout = wire_graph(graph)?
        .rank(config)?
        .order(config.ordering_passes)?
        .filter_visible(config)
        .solve_extents(config)
        .relax(config)?
        .position_links(config)?;
    log::debug!(
        "sankey layout: {} nodes ({} visible), {} links",
        layout.nodes.len(),
        layout.visible_nodes().count(),
        layout.links.len()
    );
    Ok(layout)
}

impl WiredGraph {
    pub fn rank(self, config: &SankeyConfig) -> Result<RankedGraph, LayoutError> {
        assign_ranks(self, config)
    }
}

impl RankedGraph {
    pub fn order(self, passes: usize) -> Result<RankedGraph, LayoutError> {
        minimize_crossings(self, passes)
    }

    pub fn filter_visible(self, config: &SankeyConfig) -> VisibleGraph {
        filter_visible(self, config)
    }
}

impl VisibleGraph {
    pub fn solve_extents(self, config: &SankeyConfig) -> PositionedGraph {
        solve_extents(self, config)
    }
}

impl PositionedGraph {
    pub fn relax(self, config: &SankeyConfig) -> Result<PositionedGraph, LayoutError> {
        relax(self, config)
    }

    pub fn position_links(self, config: &SankeyConfig) -> Result<SankeyLayout, LayoutError> {
        position_links(self, config)
    }
}
