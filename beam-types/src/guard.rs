use crate::error::HeaderError;
use http::HeaderMap;

/// Validates requested broker URLs against an allow-list (§4.10). Membership
/// is exact string match after trim; an empty allow-list accepts anything.
#[derive(Debug, Clone, Default)]
pub struct ClusterGuard {
    allowed: Vec<String>,
}

impl ClusterGuard {
    /// Builds the allow-list from a comma-separated string plus an optional
    /// primary broker URL prepended, matching the reference's `PulsarClusters`
    /// env var plus `PulsarBrokerURL` convention.
    pub fn new(primary_broker_url: Option<&str>, comma_separated_clusters: &str) -> Self {
        let mut allowed: Vec<String> = primary_broker_url
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .into_iter()
            .collect();
        allowed.extend(
            comma_separated_clusters
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty()),
        );
        ClusterGuard { allowed }
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.allowed.first().map(String::as_str)
    }

    pub fn contains(&self, url: &str) -> bool {
        let url = url.trim();
        self.allowed.iter().any(|a| a.trim() == url)
    }
}

/// The header contract shared by ingress, SSE, and echo (§4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverHeaders {
    pub token: String,
    pub topic_full_name: String,
    pub pulsar_url: String,
}

/// `token` is the `Authorization` header with the first literal occurrence of
/// `Bearer` replaced by nothing, then trimmed — preserved verbatim from the
/// reference's `strings.Replace(..., "Bearer", "", 1)`: a token that happens to
/// contain `Bearer` elsewhere is damaged by this, and that is the contract, not
/// a bug to silently fix (§9).
pub fn receiver_header(
    guard: &ClusterGuard,
    headers: &HeaderMap,
) -> Result<ReceiverHeaders, HeaderError> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .replacen("Bearer", "", 1)
        .trim()
        .to_owned();

    let topic_full_name = headers
        .get("TopicFn")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    let mut pulsar_url = headers
        .get("PulsarUrl")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    if !guard.is_empty() {
        if pulsar_url.is_empty() {
            pulsar_url = guard.first().unwrap_or_default().to_owned();
        } else if !guard.contains(&pulsar_url) {
            return Err(HeaderError::ClusterNotAllowed(pulsar_url));
        }
    }

    if topic_full_name.is_empty() || pulsar_url.is_empty() {
        return Err(HeaderError::MissingRequiredFields);
    }

    Ok(ReceiverHeaders {
        token,
        topic_full_name,
        pulsar_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn strips_only_first_bearer_occurrence() {
        let guard = ClusterGuard::new(None, "pulsar://h:6650");
        let h = headers(&[
            ("Authorization", "Bearer Bearer-token"),
            ("TopicFn", "persistent://a/b/c"),
        ]);
        let parsed = receiver_header(&guard, &h).unwrap();
        // Only the first literal "Bearer" is stripped; the second survives.
        assert_eq!(parsed.token, "-token");
    }

    #[test]
    fn defaults_pulsar_url_to_first_allowed_entry() {
        let guard = ClusterGuard::new(None, "pulsar://h:6650,pulsar://h2:6650");
        let h = headers(&[("TopicFn", "persistent://a/b/c")]);
        let parsed = receiver_header(&guard, &h).unwrap();
        assert_eq!(parsed.pulsar_url, "pulsar://h:6650");
    }

    #[test]
    fn empty_allow_list_and_header_is_an_error() {
        let guard = ClusterGuard::new(None, "");
        let h = headers(&[("TopicFn", "persistent://a/b/c")]);
        assert!(receiver_header(&guard, &h).is_err());
    }

    #[test]
    fn disallowed_cluster_is_rejected() {
        let guard = ClusterGuard::new(None, "pulsar://h:6650");
        let h = headers(&[
            ("TopicFn", "persistent://a/b/c"),
            ("PulsarUrl", "pulsar://evil:6650"),
        ]);
        assert!(matches!(
            receiver_header(&guard, &h),
            Err(HeaderError::ClusterNotAllowed(_))
        ));
    }
}
