//! Total cost command - sum prices of subscriptions active in a period

use anyhow::Result;
use colored::Colorize;

use super::{get_context, parse_user_id, CommandError, StoreResultExt};

pub fn run(
    period_start: Option<String>,
    period_end: Option<String>,
    user_id: Option<String>,
    service_name: Option<String>,
    json: bool,
) -> Result<()> {
    let period_start = period_start
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CommandError::bad_input("period_start are required", "missing --period-start")
        })?;
    let user_id = parse_user_id(user_id.as_deref())?;

    let ctx = get_context()?;
    let total = ctx
        .subscriptions
        .total_cost(
            user_id,
            service_name.as_deref(),
            &period_start,
            period_end.as_deref(),
        )
        .or_fail("Failed to calculate total cost")?;

    if json {
        println!("{}", serde_json::json!({ "total_cost": total }));
    } else {
        let end = period_end.as_deref().filter(|s| !s.is_empty()).unwrap_or("12-2100");
        println!(
            "Total cost {} to {}: {}",
            period_start,
            end,
            total.to_string().bold()
        );
    }

    Ok(())
}
