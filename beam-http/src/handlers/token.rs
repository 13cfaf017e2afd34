use actix_web::{web, HttpResponse};

use crate::auth::bearer_token;
use crate::error::PbProblem;
use crate::state::AppState;

/// `GET /subject/{sub}` (§6.1): issues a signed token for `sub`, restricted to
/// subjects listed in `SuperRoles` — mirroring the reference's "only a super
/// role may mint tokens for arbitrary subjects" rule.
pub async fn issue_token(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: actix_web::HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let caller_token = bearer_token(req.headers());
    let caller_subject = state
        .token_auth
        .verify(&caller_token)
        .ok_or(PbProblem::Forbidden)?;

    if !state.super_roles.contains(&caller_subject) {
        return Err(PbProblem::Forbidden);
    }

    let subject = path.into_inner();
    let token = state
        .token_auth
        .issue(&subject)
        .map_err(PbProblem::Internal)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": token })))
}
