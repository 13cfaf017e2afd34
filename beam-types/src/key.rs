use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;

/// Content hash of `(TopicFullName, PulsarURL)`: stable, unique, hex-encoded SHA-1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(String);

impl Key {
    /// `Key = SHA1(TopicFullName || PulsarURL)`, matching the reference's plain
    /// string concatenation (no separator) before hashing.
    pub fn new(topic_full_name: &str, pulsar_url: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(topic_full_name.as_bytes());
        hasher.update(pulsar_url.as_bytes());
        Key(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Key(hex.into())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a live `WebhookWorker`: `Key || WebhookURL`.
///
/// Two webhooks on the same topic with the same target URL collide on purpose;
/// see the reference design notes on the subscription composite key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn new(key: &Key, webhook_url: &str) -> Self {
        SubscriptionKey(format!("{}{webhook_url}", key.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        let a = Key::new("persistent://t/n/a", "pulsar://h:6650");
        let b = Key::new("persistent://t/n/a", "pulsar://h:6650");
        assert_eq!(a, b);
    }

    #[test]
    fn key_distinguishes_broker_url() {
        let a = Key::new("persistent://t/n/a", "pulsar://h:1");
        let b = Key::new("persistent://t/n/a", "pulsar://h:2");
        assert_ne!(a, b);
    }

    #[test]
    fn subscription_key_includes_webhook_url() {
        let key = Key::new("persistent://t/n/a", "pulsar://h:6650");
        let sk1 = SubscriptionKey::new(&key, "http://sink-a/");
        let sk2 = SubscriptionKey::new(&key, "http://sink-b/");
        assert_ne!(sk1, sk2);
        assert!(sk1.as_str().starts_with(key.as_str()));
    }
}
