use sankey_layout::config::merge_init_config;
use sankey_layout::{Config, SankeyLayout, compute_sankey, parse_graph_json, parse_sankey, render_svg};
use wasm_bindgen::prelude::*;

/// Lays out `code`, a `sankey-beta` block or a JSON graph document.
/// `options_json` has the config file shape: `theme`, `themeVariables` and a
/// `sankey` section.
fn build_layout(code: &str, options_json: Option<String>) -> Result<(SankeyLayout, Config), String> {
    let mut config = Config::default();
    if let Some(raw_options) = options_json {
        let options: serde_json::Value =
            serde_json::from_str(&raw_options).map_err(|error| error.to_string())?;
        config = merge_init_config(config, options).map_err(|error| error.to_string())?;
    }

    let parsed = if code.trim_start().starts_with('{') {
        parse_graph_json(code)
    } else {
        parse_sankey(code)
    }
    .map_err(|error| error.to_string())?;
    if let Some(init_cfg) = parsed.init_config {
        config = merge_init_config(config, init_cfg).map_err(|error| error.to_string())?;
    }

    let layout = compute_sankey(&parsed.graph, &config.layout).map_err(|error| error.to_string())?;
    Ok((layout, config))
}

#[wasm_bindgen]
pub fn compute_sankey_json(code: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let (layout, _) = build_layout(code, options_json).map_err(|error| JsValue::from_str(&error))?;
    serde_json::to_string(&layout).map_err(|error| JsValue::from_str(&error.to_string()))
}

#[wasm_bindgen]
pub fn render_sankey_svg(code: &str, options_json: Option<String>) -> Result<String, JsValue> {
    let (layout, config) = build_layout(code, options_json).map_err(|error| JsValue::from_str(&error))?;
    Ok(render_svg(&layout, &config.theme))
}
