//! `shopchat config`: print the effective configuration.

use std::path::Path;

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use shopchat_infra::config::{api_key_from_env, API_KEY_VAR};
use shopchat_types::config::AppConfig;

const REDACTED: &str = "********";

/// Key/value rows of the effective configuration. The API key is only
/// reported as set or missing.
fn config_rows(config: &AppConfig, data_dir: &Path, api_key_set: bool) -> Vec<(&'static str, String)> {
    vec![
        ("data_dir", data_dir.display().to_string()),
        (
            "api_key",
            if api_key_set {
                REDACTED.to_string()
            } else {
                format!("(missing, set {API_KEY_VAR})")
            },
        ),
        ("mcp_server_url", config.mcp_server_url.clone()),
        ("model", config.model.clone()),
        ("max_tokens", config.max_tokens.to_string()),
        ("host", config.host.clone()),
        ("port", config.port.to_string()),
        ("max_conversations_per_user", config.max_conversations_per_user.to_string()),
        ("retention_days", config.retention_days.to_string()),
        ("default_owner_id", config.default_owner_id.to_string()),
        ("log_level", config.log_level.clone()),
        ("turn.max_message_length", config.turn.max_message_length.to_string()),
        ("turn.title_max_chars", config.turn.title_max_chars.to_string()),
        ("turn.progress_warmup_ms", config.turn.progress_warmup_ms.to_string()),
        ("turn.progress_interval_ms", config.turn.progress_interval_ms.to_string()),
        (
            "turn.recover_on_persist_failure",
            config.turn.recover_on_persist_failure.to_string(),
        ),
    ]
}

pub fn show_config(config: &AppConfig, data_dir: &Path, json: bool) -> Result<()> {
    let api_key_set = api_key_from_env().is_ok();

    if json {
        let mut value = serde_json::to_value(config)?;
        value["data_dir"] = serde_json::json!(data_dir);
        value["api_key"] = serde_json::json!(api_key_set.then_some(REDACTED));
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Setting").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);

    for (key, value) in config_rows(config, data_dir, api_key_set) {
        let value_cell = if key == "api_key" && !api_key_set {
            Cell::new(value).fg(Color::Red)
        } else {
            Cell::new(value).fg(Color::Cyan)
        };
        table.add_row(vec![Cell::new(key).fg(Color::White), value_cell]);
    }

    println!();
    println!("  {}", style("Effective configuration").bold());
    println!();
    println!("{table}");
    println!();

    Ok(())
}
