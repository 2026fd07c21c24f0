//! CLI command implementations

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod logs;
pub mod total_cost;
pub mod update;

use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use subtrack_core::{Error, ErrorKind, NewSubscription, SubtrackContext};
use uuid::Uuid;

/// Exit code for malformed input (bad ids, bodies, dates)
pub const EXIT_BAD_INPUT: u8 = 2;
/// Exit code for an unusable configuration
pub const EXIT_CONFIG: u8 = 3;
/// Exit code for a missing subscription
pub const EXIT_NOT_FOUND: u8 = 4;

/// A failure with a fixed, user-facing message and an exit code
///
/// `detail` carries the underlying cause for text output only; JSON output
/// prints `message` alone.
#[derive(Debug)]
pub struct CommandError {
    pub exit_code: u8,
    pub message: &'static str,
    pub detail: Option<String>,
}

impl CommandError {
    pub fn bad_input(message: &'static str, detail: impl Into<String>) -> Self {
        Self {
            exit_code: EXIT_BAD_INPUT,
            message,
            detail: Some(detail.into()),
        }
    }

    /// Map a store error, using `failure` as the message for storage errors
    pub fn from_store(failure: &'static str, err: &Error) -> Self {
        let (exit_code, message) = match err.kind() {
            ErrorKind::InvalidDateFormat => {
                (EXIT_BAD_INPUT, "Invalid date format, expected MM-YYYY")
            }
            ErrorKind::NotFound => (EXIT_NOT_FOUND, "Subscription not found"),
            ErrorKind::Config => (EXIT_CONFIG, "Invalid configuration"),
            ErrorKind::Storage => (1, failure),
        };
        Self {
            exit_code,
            message,
            detail: Some(err.to_string()),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

impl std::error::Error for CommandError {}

/// Attach the boundary mapping to a store result
pub trait StoreResultExt<T> {
    fn or_fail(self, failure: &'static str) -> Result<T>;
}

impl<T> StoreResultExt<T> for subtrack_core::domain::result::Result<T> {
    fn or_fail(self, failure: &'static str) -> Result<T> {
        self.map_err(|e| CommandError::from_store(failure, &e).into())
    }
}

/// Get the data directory from environment or default
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("SUBTRACK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".subtrack"))
}

/// Get or create subtrack context
pub fn get_context() -> Result<SubtrackContext> {
    let data_dir = get_data_dir()?;

    // Create directory if it doesn't exist
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    SubtrackContext::new(&data_dir).context("Failed to open subscription store")
}

/// Parse a subscription id argument
pub fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id)
        .map_err(|e| CommandError::bad_input("Invalid ID format", e.to_string()).into())
}

/// Parse an optional owner id argument; an empty value means "any owner"
pub fn parse_user_id(user_id: Option<&str>) -> Result<Option<Uuid>> {
    match user_id {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s)
            .map(Some)
            .map_err(|e| CommandError::bad_input("Invalid user_id format", e.to_string()).into()),
    }
}

/// Subscription fields shared by `create` and `update`
#[derive(Args, Debug, Default)]
pub struct SubscriptionArgs {
    /// Service name, e.g. "Yandex Plus"
    #[arg(long)]
    pub service_name: Option<String>,
    /// Monthly price
    #[arg(long)]
    pub price: Option<u32>,
    /// Owning user id (UUID)
    #[arg(long)]
    pub user_id: Option<String>,
    /// First active month, MM-YYYY
    #[arg(long)]
    pub start_date: Option<String>,
    /// Last active month, MM-YYYY (omit for open-ended)
    #[arg(long)]
    pub end_date: Option<String>,
    /// Read the subscription as JSON from a file
    #[arg(
        short,
        long,
        conflicts_with_all = ["service_name", "price", "user_id", "start_date", "end_date"]
    )]
    pub file: Option<PathBuf>,
}

impl SubscriptionArgs {
    fn has_fields(&self) -> bool {
        self.service_name.is_some()
            || self.price.is_some()
            || self.user_id.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
    }

    /// Build the subscription input from: flags, file, or stdin
    pub fn into_input(self) -> Result<NewSubscription> {
        let input = if let Some(path) = self.file.as_deref() {
            parse_body(&read_file(path)?)?
        } else if !self.has_fields() && atty::isnt(atty::Stream::Stdin) {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read subscription from stdin")?;
            parse_body(&buffer)?
        } else {
            self.input_from_flags()?
        };

        input
            .validate()
            .map_err(|e| CommandError::bad_input("Invalid request body", e))?;
        Ok(input)
    }

    fn input_from_flags(self) -> Result<NewSubscription> {
        let missing = |flag: &str| {
            CommandError::bad_input("Invalid request body", format!("missing --{}", flag))
        };

        let service_name = self.service_name.ok_or_else(|| missing("service-name"))?;
        let price = self.price.ok_or_else(|| missing("price"))?;
        let user_id = self.user_id.ok_or_else(|| missing("user-id"))?;
        let start_date = self.start_date.ok_or_else(|| missing("start-date"))?;

        let user_id = Uuid::parse_str(&user_id)
            .map_err(|e| CommandError::bad_input("Invalid user_id format", e.to_string()))?;

        let input = NewSubscription::new(service_name, price, user_id, start_date);
        Ok(match self.end_date {
            Some(end_date) => input.with_end_date(end_date),
            None => input,
        })
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read subscription file: {:?}", path))
}

/// Decode a JSON subscription body
pub fn parse_body(body: &str) -> Result<NewSubscription> {
    serde_json::from_str(body)
        .map_err(|e| CommandError::bad_input("Invalid request body", e.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(err: anyhow::Error) -> (u8, &'static str) {
        let e = err.downcast::<CommandError>().unwrap();
        (e.exit_code, e.message)
    }

    #[test]
    fn test_store_errors_map_to_fixed_messages() {
        let invalid = Error::invalid_date("start_date", "2025-07");
        let e = CommandError::from_store("Failed to create subscription", &invalid);
        assert_eq!((e.exit_code, e.message), (2, "Invalid date format, expected MM-YYYY"));

        let missing = Error::NotFound(Uuid::nil());
        let e = CommandError::from_store("Failed to get subscription", &missing);
        assert_eq!((e.exit_code, e.message), (4, "Subscription not found"));

        let storage = Error::storage_msg("insert subscription", "disk full");
        let e = CommandError::from_store("Failed to create subscription", &storage);
        assert_eq!((e.exit_code, e.message), (1, "Failed to create subscription"));
        assert_eq!(e.to_string(), "Failed to create subscription");
        assert!(e.detail.unwrap().contains("disk full"));
    }

    #[test]
    fn test_parse_ids() {
        assert!(parse_id("60601fee-2bf1-4721-ae6f-7636e79a0cba").is_ok());
        assert_eq!(code(parse_id("abc").unwrap_err()), (2, "Invalid ID format"));

        assert_eq!(parse_user_id(None).unwrap(), None);
        assert_eq!(parse_user_id(Some("")).unwrap(), None);
        assert_eq!(
            code(parse_user_id(Some("nope")).unwrap_err()),
            (2, "Invalid user_id format")
        );
    }

    #[test]
    fn test_input_from_flags() {
        let args = SubscriptionArgs {
            service_name: Some("Yandex Plus".into()),
            price: Some(400),
            user_id: Some("60601fee-2bf1-4721-ae6f-7636e79a0cba".into()),
            start_date: Some("07-2025".into()),
            ..Default::default()
        };
        let input = args.into_input().unwrap();
        assert_eq!(input.service_name, "Yandex Plus");
        assert_eq!(input.end_date, None);

        let args = SubscriptionArgs {
            service_name: Some("Yandex Plus".into()),
            ..Default::default()
        };
        assert_eq!(code(args.into_input().unwrap_err()), (2, "Invalid request body"));
    }

    #[test]
    fn test_input_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.json");
        std::fs::write(
            &path,
            r#"{"service_name":"Netflix","price":999,
                "user_id":"60601fee-2bf1-4721-ae6f-7636e79a0cba",
                "start_date":"01-2024","end_date":"12-2024"}"#,
        )
        .unwrap();

        let args = SubscriptionArgs {
            file: Some(path.clone()),
            ..Default::default()
        };
        let input = args.into_input().unwrap();
        assert_eq!(input.end_date.as_deref(), Some("12-2024"));

        std::fs::write(
            &path,
            r#"{"service_name":"","price":1,
                "user_id":"60601fee-2bf1-4721-ae6f-7636e79a0cba","start_date":"01-2024"}"#,
        )
        .unwrap();
        let args = SubscriptionArgs {
            file: Some(path),
            ..Default::default()
        };
        assert_eq!(code(args.into_input().unwrap_err()), (2, "Invalid request body"));
    }

    #[test]
    fn test_malformed_body() {
        assert_eq!(code(parse_body("{").unwrap_err()), (2, "Invalid request body"));
        let bad_user = r#"{"service_name":"X","price":1,"user_id":"bad","start_date":"01-2024"}"#;
        assert_eq!(code(parse_body(bad_user).unwrap_err()), (2, "Invalid request body"));
    }
}
