use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use http_api_problem::{HttpApiProblem, PROBLEM_JSON_MEDIA_TYPE};
use pulsar_beam_types::{HeaderError, StoreError};
use strum::Display;

/// HTTP-boundary error taxonomy (§7). Every component error variant maps onto
/// exactly one status code and is rendered as an RFC7807 problem response.
#[derive(Debug, Display, thiserror::Error)]
pub enum PbProblem {
    #[error("missing required token or topic or pulsarURL")]
    MissingRequiredFields,

    #[error("pulsar cluster {0} is not allowed")]
    ClusterNotAllowed(String),

    #[error("malformed request path or parameters")]
    MalformedRequest,

    #[error("tenant mismatch")]
    Forbidden,

    #[error("document not found")]
    NotFound,

    #[error("document already existed")]
    Conflict,

    #[error("the broker refused the request: {0}")]
    ServiceUnavailable(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<HeaderError> for PbProblem {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::MissingRequiredFields => PbProblem::MissingRequiredFields,
            HeaderError::ClusterNotAllowed(url) => PbProblem::ClusterNotAllowed(url),
        }
    }
}

impl From<StoreError> for PbProblem {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DocNotFound => PbProblem::NotFound,
            StoreError::DocAlreadyExisted => PbProblem::Conflict,
            StoreError::UnsupportedDb(msg) => PbProblem::Internal(anyhow::anyhow!(msg)),
            StoreError::Serde(e) => PbProblem::MalformedRequest.with_cause(e),
            StoreError::Transport(e) => PbProblem::ServiceUnavailable(e.to_string()),
        }
    }
}

impl PbProblem {
    fn with_cause(self, cause: impl std::fmt::Display) -> Self {
        log::error!("{self}: {cause}");
        self
    }

    fn problem_status(&self) -> StatusCode {
        match self {
            PbProblem::MissingRequiredFields
            | PbProblem::ClusterNotAllowed(_)
            | PbProblem::MalformedRequest => StatusCode::UNPROCESSABLE_ENTITY,
            PbProblem::Forbidden => StatusCode::FORBIDDEN,
            PbProblem::NotFound => StatusCode::NOT_FOUND,
            PbProblem::Conflict => StatusCode::CONFLICT,
            PbProblem::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PbProblem::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl ResponseError for PbProblem {
    fn status_code(&self) -> StatusCode {
        self.problem_status()
    }

    fn error_response(&self) -> HttpResponse {
        let problem = HttpApiProblem::new(self.status_code())
            .title(self.to_string())
            .detail(self.to_string());
        HttpResponse::build(self.status_code())
            .append_header((actix_web::http::header::CONTENT_TYPE, PROBLEM_JSON_MEDIA_TYPE))
            .body(problem.json_bytes())
    }
}
