//! Store maintenance: orphan cleanup and the retention sweep.

use anyhow::Result;
use console::style;

use crate::state::ConcreteChatService;

/// Counts from one maintenance pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct MaintenanceReport {
    pub orphan_messages: u64,
    pub expired_conversations: u64,
}

/// Remove orphaned messages, then conversations idle for `retention_days`.
///
/// Runs at server startup and from `shopchat sweep`.
pub async fn run_maintenance(
    service: &ConcreteChatService,
    retention_days: u32,
) -> Result<MaintenanceReport> {
    let orphan_messages = service.cleanup_orphans().await?;
    let expired_conversations = service.sweep(retention_days).await?;

    tracing::info!(
        orphan_messages,
        expired_conversations,
        retention_days,
        "Maintenance finished"
    );
    Ok(MaintenanceReport {
        orphan_messages,
        expired_conversations,
    })
}

/// `shopchat sweep [--days N]`
pub async fn sweep(service: &ConcreteChatService, retention_days: u32, json: bool) -> Result<()> {
    let report = run_maintenance(service, retention_days).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} Removed {} conversation{} inactive for more than {} days",
        style("✓").green().bold(),
        style(report.expired_conversations).bold(),
        if report.expired_conversations == 1 { "" } else { "s" },
        retention_days
    );
    if report.orphan_messages > 0 {
        println!(
            "  {} Removed {} orphaned message{}",
            style("✓").green().bold(),
            style(report.orphan_messages).bold(),
            if report.orphan_messages == 1 { "" } else { "s" }
        );
    }
    println!();

    Ok(())
}
