use actix_web::http::header::HeaderMap;

/// The two-method external JWT issuance/verification contract consumed by the
/// control/token plane (§1, §6.4's `HTTPAuthImpl`). A real implementation signs
/// and verifies RSA JWTs; `NoAuth` satisfies the contract for `HTTPAuthImpl=noauth`
/// and for tests, matching the reference's `noauth` bypass.
pub trait TokenAuth: Send + Sync {
    /// Issues a signed token for `subject`. The token server route (§6.1) hands
    /// this back to callers as a bearer credential.
    fn issue(&self, subject: &str) -> anyhow::Result<String>;

    /// Verifies an already-Bearer-stripped token and returns its subject, or
    /// `None` if invalid/expired.
    fn verify(&self, token: &str) -> Option<String>;
}

/// Accepts any non-empty token, mapping it to itself as the subject. This is
/// the "weak auth" mode — it never fails verification so long as some token
/// was presented, mirroring the reference's `AuthHeaderRequired` convention.
pub struct NoAuth;

impl TokenAuth for NoAuth {
    fn issue(&self, subject: &str) -> anyhow::Result<String> {
        Ok(subject.to_owned())
    }

    fn verify(&self, token: &str) -> Option<String> {
        if token.len() > 1 {
            Some(token.to_owned())
        } else {
            None
        }
    }
}

/// Reads the raw bearer token off an `Authorization` header, applying the same
/// preserved first-occurrence-only `Bearer` strip as the ingress header contract.
pub fn bearer_token(headers: &HeaderMap) -> String {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .replacen("Bearer", "", 1)
        .trim()
        .to_owned()
}

/// The configured set of subjects allowed to bypass per-tenant scoping
/// (§6.4's `SuperRoles`).
#[derive(Debug, Clone, Default)]
pub struct SuperRoles(Vec<String>);

impl SuperRoles {
    pub fn new(comma_separated: &str) -> Self {
        SuperRoles(
            comma_separated
                .split(',')
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.0.iter().any(|s| s == subject)
    }
}
