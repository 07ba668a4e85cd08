use crate::layout::SankeyLayout;
use crate::render::link_path;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
    pub node_padding: f64,
    pub nodes: Vec<NodeDump>,
    pub links: Vec<LinkDump>,
    pub columns: Vec<ColumnDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub label: String,
    pub column: usize,
    pub depth: usize,
    pub inverse_depth: usize,
    pub value: f64,
    pub hidden: bool,
    /// `[x, y, width, height]`, absent for hidden nodes.
    pub bounds: Option<[f64; 4]>,
}

#[derive(Debug, Serialize)]
pub struct LinkDump {
    pub from: String,
    pub to: String,
    pub value: f64,
    pub width: f64,
    pub hidden: bool,
    /// `[x, y0, y1]` on the source edge.
    pub start: Option<[f64; 3]>,
    /// `[x, y0, y1]` on the target edge.
    pub end: Option<[f64; 3]>,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnDump {
    pub index: usize,
    pub x: f64,
    pub nodes: Vec<String>,
    pub visible_rows: [usize; 2],
    pub right_padding: f64,
    pub has_hidden_top: bool,
    pub has_hidden_bottom: bool,
    pub visible_flow: f64,
    pub total_flow: f64,
}

impl LayoutDump {
    pub fn from_layout(layout: &SankeyLayout) -> Self {
        let id_of = |idx: usize| layout.nodes[idx].id.clone();

        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                label: node.label.clone(),
                column: node.column,
                depth: node.rank.depth,
                inverse_depth: node.rank.inverse_depth,
                value: node.value,
                hidden: node.hidden,
                bounds: node
                    .extent
                    .map(|e| [e.x0, e.y0, e.x1 - e.x0, e.height()]),
            })
            .collect();

        let links = layout
            .links
            .iter()
            .map(|link| LinkDump {
                from: id_of(link.source),
                to: id_of(link.target),
                value: link.value,
                width: link.width,
                hidden: link.hidden,
                start: link.start.map(|a| [a.x, a.y0, a.y1]),
                end: link.end.map(|a| [a.x, a.y0, a.y1]),
                path: match (link.start, link.end) {
                    (Some(start), Some(end)) => Some(link_path(&start, &end)),
                    _ => None,
                },
            })
            .collect();

        let columns = layout
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| ColumnDump {
                index,
                x: column.x0,
                nodes: column.nodes.iter().map(|&idx| id_of(idx)).collect(),
                visible_rows: [column.visible_rows.0, column.visible_rows.1],
                right_padding: column.right_padding,
                has_hidden_top: column.has_hidden_top,
                has_hidden_bottom: column.has_hidden_bottom,
                visible_flow: column.flows.visible,
                total_flow: column.flows.total,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            scale: layout.scale,
            node_padding: layout.node_padding,
            nodes,
            links,
            columns,
        }
    }
}

pub fn write_layout_dump(path: Option<&Path>, layout: &SankeyLayout) -> anyhow::Result<()> {
    let dump = LayoutDump::from_layout(layout);
    match path {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            println!("{}", serde_json::to_string_pretty(&dump)?);
        }
    }
    Ok(())
}
