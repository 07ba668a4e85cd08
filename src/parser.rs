use crate::ir::Graph;
use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^sankey(-beta)?\s*$").unwrap());
static INIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^%%\{\s*init\s*:\s*(\{.*\})\s*\}%%").unwrap());

#[derive(Debug, Default)]
pub struct ParseOutput {
    pub graph: Graph,
    pub init_config: Option<serde_json::Value>,
}

/// Parses a Mermaid `sankey-beta` block: one `source,target,value` CSV row
/// per line after the header.
pub fn parse_sankey(input: &str) -> Result<ParseOutput> {
    let mut graph = Graph::new();
    let (lines, init_config) = preprocess_input(input);

    let mut seen_header = false;
    for (line_no, line) in lines {
        if !seen_header {
            if HEADER_RE.is_match(&line) {
                seen_header = true;
                continue;
            }
            return Err(anyhow::anyhow!(
                "line {line_no}: expected `sankey-beta` header, found `{line}`"
            ));
        }
        let fields = split_csv_row(&line);
        if fields.len() != 3 {
            return Err(anyhow::anyhow!(
                "line {line_no}: expected `source,target,value`, found {} field(s)",
                fields.len()
            ));
        }
        let source = &fields[0];
        let target = &fields[1];
        if source.is_empty() || target.is_empty() {
            return Err(anyhow::anyhow!("line {line_no}: empty node name"));
        }
        let value = parse_value(&fields[2])
            .ok_or_else(|| anyhow::anyhow!("line {line_no}: invalid value `{}`", fields[2]))?;
        graph.add_link(source, target, value);
    }

    if !seen_header {
        return Err(anyhow::anyhow!("No sankey diagram found in input"));
    }
    log::debug!(
        "parsed sankey: {} nodes, {} links",
        graph.nodes.len(),
        graph.links.len()
    );
    Ok(ParseOutput { graph, init_config })
}

/// Reads a graph document (`nodes`, `links`, optional `columns`) as JSON.
pub fn parse_graph_json(input: &str) -> Result<ParseOutput> {
    let graph: Graph = serde_json::from_str(input)
        .map_err(|err| anyhow::anyhow!("invalid graph document: {err}"))?;
    Ok(ParseOutput {
        graph,
        init_config: None,
    })
}

fn preprocess_input(input: &str) -> (Vec<(usize, String)>, Option<serde_json::Value>) {
    let mut init_config: Option<serde_json::Value> = None;
    let mut lines = Vec::new();

    for (idx, raw_line) in input.lines().enumerate() {
        let trimmed_line = raw_line.trim();
        if trimmed_line.is_empty() {
            continue;
        }
        if let Some(caps) = INIT_RE.captures(trimmed_line) {
            if let Some(json_str) = caps.get(1).map(|m| m.as_str()) {
                if let Ok(value) = serde_json::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                } else if let Ok(value) = json5::from_str::<serde_json::Value>(json_str) {
                    init_config = Some(value);
                } else {
                    log::warn!("line {}: ignoring unparsable init directive", idx + 1);
                }
            }
            continue;
        }
        if trimmed_line.starts_with("%%") {
            continue;
        }
        let without_comment = strip_trailing_comment(trimmed_line);
        if without_comment.is_empty() {
            continue;
        }
        lines.push((idx + 1, without_comment));
    }

    (lines, init_config)
}

fn strip_trailing_comment(line: &str) -> String {
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    let mut out = String::new();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            quoted = !quoted;
        }
        if !quoted && ch == '%' && chars.peek() == Some(&'%') {
            break;
        }
        out.push(ch);
    }
    out.trim().to_string()
}

/// Splits one CSV row. Double-quoted fields may hold commas and `""` for a
/// literal quote; surrounding whitespace is trimmed.
fn split_csv_row(input: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if quoted {
            if ch == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    quoted = false;
                }
            } else {
                current.push(ch);
            }
            continue;
        }
        match ch {
            '"' => quoted = true,
            ',' => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// `None` inside `Some` means "use the default flow".
fn parse_value(field: &str) -> Option<Option<f64>> {
    if field.is_empty() {
        return Some(None);
    }
    field.parse::<f64>().ok().map(Some)
}
