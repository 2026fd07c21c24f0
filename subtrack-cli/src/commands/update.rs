//! Update command - replace a subscription's fields

use anyhow::Result;
use colored::Colorize;

use super::{get_context, parse_id, StoreResultExt, SubscriptionArgs};

pub fn run(id: &str, args: SubscriptionArgs, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let input = args.into_input()?;

    let ctx = get_context()?;
    ctx.subscriptions
        .update(id, &input)
        .or_fail("Failed to update subscription")?;

    if json {
        println!("{}", serde_json::json!({ "id": id }));
    } else {
        println!("{} Updated subscription {}", "✓".green(), id);
    }

    Ok(())
}
