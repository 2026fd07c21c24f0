//! Create command - add a subscription

use anyhow::Result;
use colored::Colorize;

use super::{get_context, StoreResultExt, SubscriptionArgs};

pub fn run(args: SubscriptionArgs, json: bool) -> Result<()> {
    let input = args.into_input()?;

    let ctx = get_context()?;
    let id = ctx
        .subscriptions
        .create(&input)
        .or_fail("Failed to create subscription")?;

    if json {
        println!("{}", serde_json::json!({ "sub_id": id }));
    } else {
        println!("{} Created subscription {}", "✓".green(), id.to_string().bold());
    }

    Ok(())
}
