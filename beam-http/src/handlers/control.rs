use actix_web::{web, HttpRequest, HttpResponse};
use pulsar_beam_types::{tenant_from_topic_full_name, Key, TopicConfig};
use serde::Deserialize;

use crate::auth::bearer_token;
use crate::error::PbProblem;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopicKeyBody {
    #[serde(rename = "TopicFullName")]
    pub topic_full_name: String,
    #[serde(rename = "PulsarURL")]
    pub pulsar_url: String,
}

/// Resolves a `Key` from either the path segment or a `TopicKeyBody` JSON body,
/// mirroring the reference's `getTopicKey` (§6.1's `/v2/topic[/{key}]`).
async fn resolve_key(
    path_key: Option<String>,
    body: Option<web::Bytes>,
) -> Result<Key, PbProblem> {
    if let Some(k) = path_key.filter(|k| !k.is_empty()) {
        return Ok(Key::from_hex(k));
    }

    let body = body.ok_or(PbProblem::MalformedRequest)?;
    let parsed: TopicKeyBody =
        serde_json::from_slice(&body).map_err(|_| PbProblem::MalformedRequest)?;
    Ok(Key::new(&parsed.topic_full_name, &parsed.pulsar_url))
}

/// Resolves the caller's subject from the `Authorization` header via the
/// injected `TokenAuth`. An unverifiable token resolves to the empty subject,
/// which cannot match any non-empty tenant (§7's Forbidden kind).
fn caller_subject(state: &AppState, req: &HttpRequest) -> String {
    let token = bearer_token(req.headers());
    let subject = state.token_auth.verify(&token).unwrap_or_default();
    if !subject.is_empty() {
        pulsar_beam_sentry_integration::set_user_from_subjects(&subject);
    }
    subject
}

/// Enforces the control-plane's subject/tenant scoping (§6.1's 403 rows, §7's
/// Forbidden kind): a super role may touch any tenant's records; anyone else
/// must match `tenant` exactly.
fn authorize_tenant(state: &AppState, req: &HttpRequest, tenant: &str) -> Result<(), PbProblem> {
    let subject = caller_subject(state, req);
    if state.super_roles.contains(&subject) || subject == tenant {
        Ok(())
    } else {
        Err(PbProblem::Forbidden)
    }
}

/// `GET /v2/topic[/{key}]` (§6.1).
pub async fn get_topic(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let key = resolve_key(Some(path.into_inner()), None).await?;
    let doc = state.store.get_by_key(&key).await?;
    authorize_tenant(&state, &req, &doc.tenant)?;
    Ok(HttpResponse::Ok().json(doc))
}

/// `GET /v2/topic` with the key carried in the JSON body instead of the path.
pub async fn get_topic_by_body(
    state: web::Data<AppState>,
    body: web::Bytes,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let key = resolve_key(None, Some(body)).await?;
    let doc = state.store.get_by_key(&key).await?;
    authorize_tenant(&state, &req, &doc.tenant)?;
    Ok(HttpResponse::Ok().json(doc))
}

/// `POST /v2/topic` (§6.1): upsert semantics via `Store::update`, which
/// delegates to `create` when the record is absent. The tenant check, like
/// GET/DELETE's check against the stored `doc.tenant`, is against the tenant
/// segment of `TopicFullName` rather than the posted `Tenant` field: `Tenant`
/// is informational (§3) and may be omitted by the caller, but the topic name
/// always carries its tenant. The parsed value also becomes the stored
/// `Tenant`, so later GET/DELETE authorize against the same authority.
pub async fn upsert_topic(
    state: web::Data<AppState>,
    body: web::Json<TopicConfig>,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let mut cfg = body.into_inner();
    let tenant = tenant_from_topic_full_name(&cfg.topic_full_name).ok_or(PbProblem::MalformedRequest)?;
    authorize_tenant(&state, &req, tenant)?;
    cfg.tenant = tenant.to_owned();
    let saved = state.store.update(cfg).await?;
    Ok(HttpResponse::Created().json(saved))
}

/// `DELETE /v2/topic[/{key}]` (§6.1).
pub async fn delete_topic(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let key = resolve_key(Some(path.into_inner()), None).await?;
    let existing = state.store.get_by_key(&key).await?;
    authorize_tenant(&state, &req, &existing.tenant)?;
    let doc = state.store.delete_by_key(&key).await?;
    Ok(HttpResponse::Ok().json(doc))
}

/// `DELETE /v2/topic` with the key carried in the JSON body.
pub async fn delete_topic_by_body(
    state: web::Data<AppState>,
    body: web::Bytes,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let key = resolve_key(None, Some(body)).await?;
    let existing = state.store.get_by_key(&key).await?;
    authorize_tenant(&state, &req, &existing.tenant)?;
    let doc = state.store.delete_by_key(&key).await?;
    Ok(HttpResponse::Ok().json(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{NoAuth, SuperRoles, TokenAuth};
    use crate::state::AppState;
    use pulsar_beam_pool::{ClientPool, ClientPoolConfig, ConsumerPool, ProducerPool};
    use pulsar_beam_store::{InMemoryStore, Store};
    use pulsar_beam_types::ClusterGuard;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    fn test_state() -> web::Data<AppState> {
        let clients = ClientPool::new(ClientPoolConfig::default());
        web::Data::new(AppState {
            store: InMemoryStore::new(),
            clients: clients.clone(),
            producers: ProducerPool::new(clients.clone(), Duration::from_secs(900), Duration::from_secs(60)),
            consumers: ConsumerPool::new(clients),
            guard: Arc::new(ClusterGuard::default()),
            token_auth: Arc::new(NoAuth),
            super_roles: SuperRoles::new("admin"),
            rate: Arc::new(Semaphore::new(8)),
        })
    }

    fn req_with_token(token: &str) -> HttpRequest {
        actix_web::test::TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_http_request()
    }

    #[test]
    fn matching_tenant_is_authorized() {
        let state = test_state();
        assert!(authorize_tenant(&state, &req_with_token("tenant-a"), "tenant-a").is_ok());
    }

    #[test]
    fn mismatched_tenant_is_forbidden() {
        let state = test_state();
        let err = authorize_tenant(&state, &req_with_token("tenant-a"), "tenant-b").unwrap_err();
        assert!(matches!(err, PbProblem::Forbidden));
    }

    #[test]
    fn super_role_bypasses_tenant_match() {
        let state = test_state();
        assert!(authorize_tenant(&state, &req_with_token("admin"), "tenant-b").is_ok());
    }

    fn body_without_tenant() -> TopicConfig {
        TopicConfig {
            topic_full_name: "persistent://t/n/x".into(),
            pulsar_url: "pulsar+ssl://h:6651".into(),
            token: "secret".into(),
            tenant: String::new(),
            notes: String::new(),
            key: String::new(),
            topic_status: pulsar_beam_types::Status::Activated,
            webhooks: vec![],
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    /// S2/S3: the posted body carries no `Tenant`; authorization must be
    /// decided by the tenant segment of `TopicFullName` (here "t"), not the
    /// empty body field.
    #[tokio::test]
    async fn upsert_authorizes_against_topic_name_tenant_not_body_tenant() {
        let state = test_state();

        let created = upsert_topic(state.clone(), web::Json(body_without_tenant()), req_with_token("t"))
            .await
            .expect("matching subject should be authorized");
        assert_eq!(created.status(), actix_web::http::StatusCode::CREATED);

        let err = upsert_topic(state, web::Json(body_without_tenant()), req_with_token("other"))
            .await
            .expect_err("mismatched subject should be forbidden");
        assert!(matches!(err, PbProblem::Forbidden));
    }

    #[tokio::test]
    async fn upsert_stores_the_parsed_tenant_so_later_reads_authorize_the_same_way() {
        let state = test_state();
        upsert_topic(state.clone(), web::Json(body_without_tenant()), req_with_token("t"))
            .await
            .unwrap();

        let key = Key::new("persistent://t/n/x", "pulsar+ssl://h:6651");
        let doc = state.store.get_by_key(&key).await.unwrap();
        assert_eq!(doc.tenant, "t");
    }
}
