//! List command - show all subscriptions

use anyhow::Result;
use colored::Colorize;

use super::{get_context, StoreResultExt};
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let subscriptions = ctx
        .subscriptions
        .list()
        .or_fail("Failed to list subscriptions")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "subscriptions": subscriptions,
                "count": subscriptions.len(),
            }))?
        );
        return Ok(());
    }

    if subscriptions.is_empty() {
        println!("No subscriptions found.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["ID", "Service", "Price", "User", "Start", "End"]);
    for sub in &subscriptions {
        table.add_row(vec![
            sub.id.to_string(),
            sub.service_name.clone(),
            sub.price.to_string(),
            sub.user_id.to_string(),
            sub.start_date.to_string(),
            output::format_end_date(sub),
        ]);
    }

    println!("{}", table);
    println!("{}", format!("{} subscription(s)", subscriptions.len()).dimmed());

    Ok(())
}
