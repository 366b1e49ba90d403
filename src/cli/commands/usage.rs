use crate::config::Config;
use crate::db::Store;
use crate::services::{SeaOrmUsageService, UsageError, UsageService};

pub async fn cmd_usage(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let service = SeaOrmUsageService::new(store);

    let summary = match service.summary_for_email(email).await {
        Ok(summary) => summary,
        Err(UsageError::AgentNotFound) => {
            println!("No agent registered with email {email}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Usage for {email}:");
    println!("{:-<60}", "");
    println!("  Calls:  {}", summary.total_calls);
    println!("  Tokens: {}", summary.total_tokens);
    println!("  Cost:   ${:.4}", summary.total_cost);

    if summary.recent.is_empty() {
        println!("\nNo API calls recorded.");
        return Ok(());
    }

    println!("\nRecent calls:");
    for entry in &summary.recent {
        println!(
            "• {} {:<18} {:>6} tokens  ${:.4}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.endpoint,
            entry.tokens_used,
            entry.cost
        );
    }

    Ok(())
}
