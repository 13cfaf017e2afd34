use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpResponse};
use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Global in-flight-request cap, grounded in the reference's package-level
/// semaphore (`middleware.Rate`): acquiring a permit is non-blocking — if none
/// are free the request is rejected with 429 rather than queued.
pub struct RateLimit {
    semaphore: Arc<Semaphore>,
}

impl RateLimit {
    pub fn new(semaphore: Arc<Semaphore>) -> Self {
        RateLimit { semaphore }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddleware {
            service,
            semaphore: self.semaphore.clone(),
        }))
    }
}

pub struct RateLimitMiddleware<S> {
    service: S,
    semaphore: Arc<Semaphore>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                let fut = self.service.call(req);
                Box::pin(async move {
                    let _permit = permit;
                    fut.await.map(|res| res.map_into_left_body())
                })
            }
            Err(_) => {
                let (req, _) = req.into_parts();
                let response = HttpResponse::TooManyRequests().finish().map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(req, response)) })
            }
        }
    }
}
