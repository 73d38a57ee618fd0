//! Conversation CLI commands: list and delete.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;
use uuid::Uuid;

use shopchat_core::chat::repository::ConversationRepository;

use crate::state::ConcreteChatService;

/// List an owner's conversations with title, activity and message count.
///
/// # Examples
///
/// ```bash
/// shopchat conversations list --owner 1
/// shopchat conversations list --json
/// ```
pub async fn list_conversations(
    service: &ConcreteChatService,
    owner_id: i64,
    limit: u32,
    json: bool,
) -> Result<()> {
    let conversations = service.list_for(owner_id, limit).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&conversations)?);
        return Ok(());
    }

    if conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations for owner {}.",
            style("i").blue().bold(),
            style(owner_id).cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("ID").fg(Color::White),
        Cell::new("Title").fg(Color::White),
        Cell::new("Messages").fg(Color::White),
        Cell::new("Last activity").fg(Color::White),
    ]);

    for conversation in &conversations {
        let count = service.message_count(&conversation.id).await?;
        table.add_row(vec![
            Cell::new(conversation.id).fg(Color::DarkGrey),
            Cell::new(&conversation.title).fg(Color::Cyan),
            Cell::new(count).fg(Color::White),
            Cell::new(conversation.updated_at.format("%Y-%m-%d %H:%M")).fg(Color::White),
        ]);
    }

    println!();
    println!("  Conversations for owner {}", style(owner_id).cyan().bold());
    println!();
    println!("{table}");
    println!();
    println!(
        "  {} conversation{}",
        style(conversations.len()).bold(),
        if conversations.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Delete a conversation regardless of owner.
pub async fn delete_conversation(service: &ConcreteChatService, id: Uuid, json: bool) -> Result<()> {
    let conversation = service
        .repo()
        .get_conversation(&id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Conversation '{id}' not found"))?;
    service.delete_for(conversation.owner_id, &id).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!(
            "  {} Deleted '{}' ({})",
            style("✓").green().bold(),
            style(&conversation.title).cyan(),
            style(id).dim()
        );
    }

    Ok(())
}
