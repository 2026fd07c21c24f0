//! Get command - show one subscription

use anyhow::Result;
use colored::Colorize;

use super::{get_context, parse_id, StoreResultExt};
use crate::output;

pub fn run(id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;

    let ctx = get_context()?;
    let sub = ctx
        .subscriptions
        .get(id)
        .or_fail("Failed to get subscription")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sub)?);
        return Ok(());
    }

    println!("{}", sub.service_name.bold());

    let mut table = output::create_table();
    table.add_row(vec!["ID", &sub.id.to_string()]);
    table.add_row(vec!["User", &sub.user_id.to_string()]);
    table.add_row(vec!["Price", &sub.price.to_string()]);
    table.add_row(vec!["Start", &sub.start_date.to_string()]);
    table.add_row(vec!["End", &output::format_end_date(&sub)]);
    println!("{}", table);

    Ok(())
}
