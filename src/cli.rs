use crate::config::{load_config, merge_init_config, Config};
use crate::layout::compute_sankey;
use crate::layout_dump::write_layout_dump;
use crate::parser::{parse_graph_json, parse_sankey, ParseOutput};
use crate::render::{render_svg, write_output_png, write_output_svg};
use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sankey", version, about = "Sankey diagram layout and rendering")]
pub struct Args {
    /// Input file (.mmd, .md or .json graph) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout for SVG and JSON if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config JSON file (themeVariables and a `sankey` section)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width, overrides the config file
    #[arg(short = 'w', long = "width")]
    pub width: Option<f64>,

    /// Canvas height, overrides the config file
    #[arg(short = 'H', long = "height")]
    pub height: Option<f64>,

    /// More log output (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
    /// Computed geometry as JSON
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    Sankey,
    Markdown,
    GraphJson,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut base_config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        base_config.layout.width = width;
    }
    if let Some(height) = args.height {
        base_config.layout.height = height;
    }

    let (input, kind) = read_input(args.input.as_deref())?;
    let diagrams = match kind {
        InputKind::Markdown => extract_mermaid_blocks(&input),
        InputKind::Sankey | InputKind::GraphJson => vec![input],
    };

    if diagrams.is_empty() {
        return Err(anyhow::anyhow!("No Mermaid diagrams found in input"));
    }

    if diagrams.len() == 1 {
        return render_one(&diagrams[0], kind, &base_config, args.output_format, args.output.as_deref());
    }

    // Multiple diagrams (Markdown input)
    let outputs = resolve_multi_outputs(args.output.as_deref(), args.output_format, diagrams.len())?;
    for (diagram, output) in diagrams.iter().zip(&outputs) {
        render_one(diagram, kind, &base_config, args.output_format, Some(output))?;
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    // a second init (e.g. in tests) is harmless
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn render_one(
    source: &str,
    kind: InputKind,
    base_config: &Config,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<()> {
    let parsed: ParseOutput = match kind {
        InputKind::GraphJson => parse_graph_json(source)?,
        InputKind::Sankey | InputKind::Markdown => parse_sankey(source)?,
    };
    let mut config = base_config.clone();
    if let Some(init_cfg) = parsed.init_config {
        config = merge_init_config(config, init_cfg)?;
    }
    config.render.width = config.layout.width as f32;
    config.render.height = config.layout.height as f32;

    let layout = compute_sankey(&parsed.graph, &config.layout)?;
    match format {
        OutputFormat::Svg => {
            let svg = render_svg(&layout, &config.theme);
            write_output_svg(&svg, output)?;
        }
        OutputFormat::Png => {
            let svg = render_svg(&layout, &config.theme);
            let output = ensure_output(output, "png")?;
            write_output_png(&svg, output, &config.render)?;
        }
        OutputFormat::Json => {
            write_layout_dump(output, &layout)?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<(String, InputKind)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, InputKind::Sankey));
        }
        let content = std::fs::read_to_string(path)?;
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some("md" | "markdown") => InputKind::Markdown,
            Some("json") => InputKind::GraphJson,
            _ => InputKind::Sankey,
        };
        return Ok((content, kind));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, InputKind::Sankey))
}

fn ensure_output<'a>(output: Option<&'a Path>, ext: &str) -> Result<&'a Path> {
    output.ok_or_else(|| anyhow::anyhow!("Output path required for {} output", ext))
}

fn extract_mermaid_blocks(input: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut in_block = false;
    let mut current = Vec::new();
    let mut fence = String::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if !in_block {
            if let Some(start_fence) = detect_mermaid_fence(trimmed) {
                in_block = true;
                fence = start_fence;
                continue;
            }
        } else if is_fence_end(trimmed, &fence) {
            in_block = false;
            blocks.push(current.join("\n"));
            current.clear();
            continue;
        }

        if in_block {
            current.push(line.to_string());
        }
    }

    blocks
}

fn detect_mermaid_fence(line: &str) -> Option<String> {
    for fence in ["```", "~~~", ":::"] {
        if let Some(rest) = line.strip_prefix(fence) {
            let marker = fence.chars().next().unwrap_or('`');
            if rest.trim_start_matches(marker).trim().starts_with("mermaid") {
                return Some(fence.to_string());
            }
        }
    }
    None
}

fn is_fence_end(line: &str, fence: &str) -> bool {
    match line.strip_prefix(fence) {
        Some(rest) => rest.trim().is_empty(),
        None => false,
    }
}

fn resolve_multi_outputs(
    output: Option<&Path>,
    format: OutputFormat,
    count: usize,
) -> Result<Vec<PathBuf>> {
    let ext = format.extension();
    let base = output.ok_or_else(|| anyhow::anyhow!("Output path required for markdown input"))?;
    if base.is_dir() {
        return Ok((0..count)
            .map(|idx| base.join(format!("diagram-{}.{}", idx + 1, ext)))
            .collect());
    }
    let stem = base.file_stem().and_then(|s| s.to_str()).unwrap_or("diagram");
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    Ok((0..count)
        .map(|idx| parent.join(format!("{}-{}.{}", stem, idx + 1, ext)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_mermaid_blocks() {
        let input = r#"
text
``` mermaid
sankey-beta
  A,B,1
```
more
~~~mermaid
sankey-beta
  X,Y,2
~~~
::: mermaid
sankey
  P,Q,3
:::
```rust
fn not_a_diagram() {}
```
"#;
        let blocks = extract_mermaid_blocks(input);
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].contains("A,B,1"));
        assert!(blocks[1].contains("X,Y,2"));
        assert!(blocks[2].contains("P,Q,3"));
    }

    #[test]
    fn multi_outputs_are_numbered() {
        let outputs =
            resolve_multi_outputs(Some(Path::new("out/flows.svg")), OutputFormat::Json, 2).unwrap();
        assert_eq!(
            outputs,
            vec![PathBuf::from("out/flows-1.json"), PathBuf::from("out/flows-2.json")]
        );
        assert!(resolve_multi_outputs(None, OutputFormat::Svg, 2).is_err());
    }

    #[test]
    fn png_needs_an_output_path() {
        assert!(ensure_output(None, "png").is_err());
        assert_eq!(
            ensure_output(Some(Path::new("a.png")), "png").unwrap(),
            Path::new("a.png")
        );
    }
}
