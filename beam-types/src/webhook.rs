use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Subscription prefix that makes a worker unsubscribe (delete the server-side
/// cursor) instead of merely closing the consumer on cancellation.
///
/// The check is a literal string-prefix comparison, preserved verbatim from the
/// reference implementation: naming a subscription with this prefix unintentionally
/// is an operator error, not something this crate guards against.
pub const NON_RESUMABLE_PREFIX: &str = "NonResumable";

/// Broker subscription type, case-insensitive on the wire; empty defaults to `Exclusive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SubscriptionType {
    #[default]
    Exclusive,
    Shared,
    Keyshared,
    Failover,
}

/// Where a newly acquired consumer starts reading from; empty defaults to `Latest`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InitialPosition {
    #[default]
    Latest,
    Earliest,
}

/// One HTTP delivery target attached to a `TopicConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<String>,
    pub subscription: String,
    #[serde(default)]
    pub subscription_type: SubscriptionType,
    #[serde(default)]
    pub initial_position: InitialPosition,
    pub webhook_status: Status,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WebhookConfig {
    /// Parsed `"Name: value"` header entries; malformed entries (missing `:`) are
    /// silently skipped, matching the reference's tolerant header parsing.
    pub fn parsed_headers(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|line| {
                let (name, value) = line.split_once(':')?;
                Some((name.trim().to_owned(), value.trim().to_owned()))
            })
            .collect()
    }

    /// Whether the worker should call `Unsubscribe` before closing, per the
    /// preserved `NonResumable` literal-prefix quirk.
    pub fn is_non_resumable(&self) -> bool {
        self.subscription.starts_with(NON_RESUMABLE_PREFIX)
    }
}
