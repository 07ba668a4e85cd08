#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod parser;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Align, Config, SankeyConfig};
pub use ir::Graph;
pub use layout::{compute_sankey, LayoutError, SankeyLayout};
pub use parser::{parse_graph_json, parse_sankey};
pub use render::{link_path, render_svg};
pub use theme::Theme;
