use crate::config::RenderConfig;
use crate::layout::{LinkAnchor, SankeyLayout};
use crate::theme::Theme;
use anyhow::Result;
use std::path::Path;

const LABEL_GAP: f64 = 6.0;

pub fn render_svg(layout: &SankeyLayout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = layout.width;
    let height = layout.height;

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<g class=\"links\">");
    for link in layout.visible_links() {
        let (Some(start), Some(end)) = (link.start, link.end) else {
            continue;
        };
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\" fill-opacity=\"{}\"><title>{} → {}: {}</title></path>",
            link_path(&start, &end),
            theme.node_color(link.source),
            theme.link_opacity,
            escape_xml(&layout.nodes[link.source].label),
            escape_xml(&layout.nodes[link.target].label),
            format_value(link.value)
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g class=\"nodes\">");
    for (idx, node) in layout.nodes.iter().enumerate() {
        let Some(extent) = node.extent.filter(|_| !node.hidden) else {
            continue;
        };
        svg.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" stroke=\"{}\"/>",
            extent.x0,
            extent.y0,
            extent.x1 - extent.x0,
            extent.height(),
            theme.node_color(idx),
            theme.node_stroke
        ));
    }
    svg.push_str("</g>");

    svg.push_str(&format!(
        "<g class=\"labels\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        escape_xml(&theme.font_family),
        theme.font_size,
        theme.text_color
    ));
    for node in layout.visible_nodes() {
        let Some(extent) = node.extent else {
            continue;
        };
        // left half labels sit right of the node, right half labels to its left
        let (x, anchor) = if extent.x0 < width / 2.0 {
            (extent.x1 + LABEL_GAP, "start")
        } else {
            (extent.x0 - LABEL_GAP, "end")
        };
        let y = (extent.y0 + extent.y1) / 2.0;
        let text = if theme.show_values {
            format!("{} {}", node.label, format_value(node.value))
        } else {
            node.label.clone()
        };
        svg.push_str(&format!(
            "<text x=\"{x:.2}\" y=\"{y:.2}\" dy=\"0.35em\" text-anchor=\"{anchor}\">{}</text>",
            escape_xml(&text)
        ));
    }
    svg.push_str("</g>");

    svg.push_str("</svg>");
    svg
}

/// Closed ribbon outline between two link anchors: a cubic along the top
/// edges, down the target side, and a cubic back along the bottom edges.
/// Control points sit at one and two thirds of the horizontal span.
pub fn link_path(start: &LinkAnchor, end: &LinkAnchor) -> String {
    let cp1 = start.x + (end.x - start.x) / 3.0;
    let cp2 = start.x + 2.0 * (end.x - start.x) / 3.0;
    format!(
        "M{:.2},{:.2} C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} L{:.2},{:.2} L{:.2},{:.2} C{:.2},{:.2} {:.2},{:.2} {:.2},{:.2} Z",
        start.x,
        start.y0,
        cp1,
        start.y0,
        cp2,
        end.y0,
        end.x,
        end.y0,
        end.x,
        end.y0,
        end.x,
        end.y1,
        cp2,
        end.y1,
        cp1,
        start.y1,
        start.x,
        start.y1
    )
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.default_size = usvg::Size::from_wh(render_cfg.width, render_cfg.height)
        .ok_or_else(|| anyhow::anyhow!("Invalid render size"))?;
    opt.font_family = "sans-serif".to_string();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;
    pixmap.fill(parse_background(&render_cfg.background));

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    log::debug!("wrote {}x{} png to {}", size.width(), size.height(), output.display());
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

#[cfg(feature = "png")]
fn parse_background(color: &str) -> resvg::tiny_skia::Color {
    let hex = color.trim_start_matches('#');
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range).and_then(|digits| u8::from_str_radix(digits, 16).ok())
    };
    match (hex.len(), channel(0..2), channel(2..4), channel(4..6)) {
        (6, Some(r), Some(g), Some(b)) => resvg::tiny_skia::Color::from_rgba8(r, g, b, 255),
        _ => resvg::tiny_skia::Color::WHITE,
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SankeyConfig;
    use crate::ir::Graph;
    use crate::layout::compute_sankey;

    #[test]
    fn render_svg_basic() {
        let mut graph = Graph::new();
        graph.ensure_node("A", Some("Alpha & Co".to_string()));
        graph.add_link("A", "B", Some(2.0));
        let layout = compute_sankey(&graph, &SankeyConfig::default()).unwrap();
        let svg = render_svg(&layout, &Theme::modern());
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Alpha &amp; Co"));
        assert_eq!(svg.matches("<path").count(), 1);
        assert_eq!(svg.matches("<rect").count(), 3);
    }

    #[test]
    fn hidden_elements_are_not_drawn() {
        let mut graph = Graph::new();
        graph.add_link("A", "B", Some(1.0));
        graph.add_link("B", "C", Some(1.0));
        let config = SankeyConfig {
            visible_columns_from_center: Some(0.5),
            ..Default::default()
        };
        let layout = compute_sankey(&graph, &config).unwrap();
        let svg = render_svg(&layout, &Theme::mermaid_default());
        assert_eq!(svg.matches("<path").count(), 0);
        // background plus B
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains(">B</text>"));
    }

    #[test]
    fn link_path_is_a_closed_ribbon() {
        let start = LinkAnchor {
            x: 10.0,
            y0: 0.0,
            y1: 20.0,
        };
        let end = LinkAnchor {
            x: 40.0,
            y0: 50.0,
            y1: 70.0,
        };
        assert_eq!(
            link_path(&start, &end),
            "M10.00,0.00 C20.00,0.00 30.00,50.00 40.00,50.00 L40.00,50.00 L40.00,70.00 C30.00,70.00 20.00,20.00 10.00,20.00 Z"
        );
    }

    #[test]
    fn values_print_without_noise() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(2.5), "2.50");
    }
}
