use chrono::Utc;

use crate::config::Config;
use crate::db::Store;
use crate::domain::entitlement::EntitlementSnapshot;

pub async fn cmd_agent(config: &Config, email: &str) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;

    let Some(agent) = store.get_agent_by_email(&email.trim().to_lowercase()).await? else {
        println!("No agent registered with email {email}");
        return Ok(());
    };

    let fields = &agent.subscription;
    let snapshot = EntitlementSnapshot::evaluate(fields, Utc::now());

    println!("{} <{}> (ID: {})", agent.full_name(), agent.email, agent.id);
    println!("{:-<60}", "");
    println!("  Status:       {}", snapshot.status);
    println!(
        "  Trial:        {} → {} ({} days left)",
        fields.trial_start.format("%Y-%m-%d"),
        fields.trial_end.format("%Y-%m-%d"),
        snapshot.trial_days_remaining
    );

    if let Some(end) = fields.subscription_end {
        let start = fields
            .subscription_start
            .map_or_else(|| "?".to_string(), |s| s.format("%Y-%m-%d").to_string());
        println!("  Subscription: {start} → {}", end.format("%Y-%m-%d"));
    }
    if fields.cancel_at_period_end {
        println!("  Cancels at period end");
    }

    match snapshot.reason {
        None => println!("  Can generate: yes"),
        Some(reason) => println!("  Can generate: no ({})", reason.message()),
    }

    Ok(())
}
