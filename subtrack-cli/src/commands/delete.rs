//! Delete command - remove a subscription

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use super::{get_context, parse_id, StoreResultExt};

pub fn run(id: &str, force: bool, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let ctx = get_context()?;

    // Confirm removal unless --force (JSON callers are never prompted)
    if !force && !json {
        let sub = ctx
            .subscriptions
            .get(id)
            .or_fail("Failed to delete subscription")?;
        println!(
            "\n{}",
            format!("This will delete '{}' ({}).", sub.service_name, sub.id).yellow()
        );

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.subscriptions
        .delete(id)
        .or_fail("Failed to delete subscription")?;

    if json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("{} Subscription {} deleted", "✓".green(), id);
    }

    Ok(())
}
