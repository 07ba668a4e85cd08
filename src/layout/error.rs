use thiserror::Error;

/// Why a layout run refused to produce geometry. Every kind points at
/// malformed input or a bypassed stage; none is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("circular link: rank assignment did not settle (still visiting `{node}`)")]
    CircularLink { node: String },

    #[error("{} references unknown node `{id}`", describe_link(.link))]
    MissingNodeReference { link: Option<usize>, id: String },

    #[error("geometry not computed yet: {what}")]
    UndefinedGeometry { what: String },

    #[error("link `{source_id}` -> `{target_id}` leaves column {column} but its target is not in column {}", .column + 1)]
    DisconnectedNeighbor {
        source_id: String,
        target_id: String,
        column: usize,
    },

    #[error("duplicate node id `{id}`")]
    DuplicateNode { id: String },

    #[error("link {link} has invalid value {value}")]
    InvalidLinkValue { link: usize, value: f64 },

    #[error("invalid column partition: {reason}")]
    InvalidPartition { reason: String },

    #[error("invalid layout config: {reason}")]
    InvalidConfig { reason: String },
}

fn describe_link(link: &Option<usize>) -> String {
    match link {
        Some(idx) => format!("link {idx}"),
        None => "column partition".to_string(),
    }
}
