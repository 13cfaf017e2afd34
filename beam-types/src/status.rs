use serde::de::{self, Deserializer, Visitor};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Lifecycle status shared by `TopicConfig` and `WebhookConfig`.
///
/// Ordinal values intentionally do not follow the reference Go `iota` assignment
/// (which never had a `Deleted` variant); this enum follows the target spec instead:
/// `Deactivated = 0`, `Activated = 1`, `Suspended = 2`, `Deleted = 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "PascalCase")]
pub enum Status {
    Deactivated,
    Activated,
    Suspended,
    Deleted,
}

impl Status {
    /// Only `Activated` webhooks get a live worker, and only non-`Deleted` topics
    /// are visible to readers.
    pub fn is_activated(self) -> bool {
        matches!(self, Status::Activated)
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, Status::Deleted)
    }

    fn from_ordinal(v: u64) -> Option<Status> {
        match v {
            0 => Some(Status::Deactivated),
            1 => Some(Status::Activated),
            2 => Some(Status::Suspended),
            3 => Some(Status::Deleted),
            _ => None,
        }
    }
}

/// Serialized as its `PascalCase` name, matching every other field of
/// `TopicConfig`/`WebhookConfig`.
impl Serialize for Status {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Accepts either the `PascalCase` name or its integer ordinal: the persisted
/// wire contract documented in §6.3 traces back to the reference's `int`-typed
/// `Status` (`model/topic.go`), so a body encoding `WebhookStatus` as a bare
/// integer (e.g. `WebhookStatus:1`) must round-trip, not just the name form.
impl<'de> serde::Deserialize<'de> for Status {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StatusVisitor;

        impl Visitor<'_> for StatusVisitor {
            type Value = Status;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a status name or its ordinal (0=Deactivated,1=Activated,2=Suspended,3=Deleted)")
            }

            fn visit_str<E>(self, v: &str) -> Result<Status, E>
            where
                E: de::Error,
            {
                Status::from_str(v).map_err(|_| E::custom(format!("unknown status {v:?}")))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Status, E>
            where
                E: de::Error,
            {
                Status::from_ordinal(v).ok_or_else(|| E::custom(format!("unknown status ordinal {v}")))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Status, E>
            where
                E: de::Error,
            {
                if v < 0 {
                    return Err(E::custom(format!("unknown status ordinal {v}")));
                }
                self.visit_u64(v as u64)
            }
        }

        deserializer.deserialize_any(StatusVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_pascal_case_name() {
        let s: Status = serde_json::from_str("\"Activated\"").unwrap();
        assert_eq!(s, Status::Activated);
    }

    #[test]
    fn deserializes_integer_ordinal() {
        let s: Status = serde_json::from_str("1").unwrap();
        assert_eq!(s, Status::Activated);
    }

    #[test]
    fn rejects_unknown_ordinal() {
        assert!(serde_json::from_str::<Status>("9").is_err());
    }

    #[test]
    fn serializes_as_pascal_case_name() {
        assert_eq!(serde_json::to_string(&Status::Suspended).unwrap(), "\"Suspended\"");
    }

    #[test]
    fn round_trips_through_serialize_then_deserialize() {
        for s in [Status::Deactivated, Status::Activated, Status::Suspended, Status::Deleted] {
            let json = serde_json::to_string(&s).unwrap();
            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(s, back);
        }
    }
}
