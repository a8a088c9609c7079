use actix_web::body::EitherBody;
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::{header, Method};
use actix_web::{Error, HttpResponse};
use futures_util::future::{LocalBoxFuture, ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::ApiErrorBody;

const CSP: &str = "default-src 'self'; img-src 'self' data:; object-src 'none'; base-uri 'none'; frame-ancestors 'none'; form-action 'self'";

/// Response hardening headers plus an Origin check on state-changing requests.
#[derive(Clone, Default)]
pub struct SecurityHeaders {
    pub enable_hsts: bool,
    allowed_origins: Arc<Vec<String>>,
}

impl SecurityHeaders {
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::default()
            .with_hsts(cfg.enable_hsts)
            .allow_origin(&cfg.frontend_url)
    }

    pub fn with_hsts(mut self, enable: bool) -> Self {
        self.enable_hsts = enable;
        self
    }

    pub fn allow_origin(mut self, origin: &str) -> Self {
        Arc::make_mut(&mut self.allowed_origins).push(origin.trim_end_matches('/').to_string());
        self
    }

    /// Requests without an Origin header (curl, same-origin GET forms) pass.
    fn origin_allowed(&self, req: &ServiceRequest) -> bool {
        if matches!(*req.method(), Method::GET | Method::HEAD | Method::OPTIONS) {
            return true;
        }
        let Some(origin) = req.headers().get(header::ORIGIN) else { return true };
        let Ok(origin) = origin.to_str() else { return false };
        let origin = origin.trim_end_matches('/');
        if self.allowed_origins.iter().any(|o| o == origin) {
            return true;
        }
        // same host as the request itself
        let info = req.connection_info();
        origin == format!("{}://{}", info.scheme(), info.host())
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
            cfg: self.clone(),
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    cfg: SecurityHeaders,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let cfg = self.cfg.clone();
        Box::pin(async move {
            let is_docs = req.path().starts_with("/docs");
            let mut res = if cfg.origin_allowed(&req) {
                svc.call(req).await?.map_into_left_body()
            } else {
                log::warn!("rejected cross-origin {} {}", req.method(), req.path());
                let body = ApiErrorBody { error: "cross-origin request rejected".into() };
                req.into_response(HttpResponse::Forbidden().json(body)).map_into_right_body()
            };
            let headers = res.response_mut().headers_mut();
            // Swagger UI ships inline scripts
            if !is_docs && !headers.contains_key(header::CONTENT_SECURITY_POLICY) {
                headers.insert(header::CONTENT_SECURITY_POLICY, header::HeaderValue::from_static(CSP));
            }
            if !headers.contains_key(header::REFERRER_POLICY) {
                headers.insert(header::REFERRER_POLICY, header::HeaderValue::from_static("no-referrer"));
            }
            if !headers.contains_key(header::X_CONTENT_TYPE_OPTIONS) {
                headers.insert(header::X_CONTENT_TYPE_OPTIONS, header::HeaderValue::from_static("nosniff"));
            }
            if !headers.contains_key(header::X_FRAME_OPTIONS) {
                headers.insert(header::X_FRAME_OPTIONS, header::HeaderValue::from_static("DENY"));
            }
            if cfg.enable_hsts && !headers.contains_key(header::STRICT_TRANSPORT_SECURITY) {
                headers.insert(header::STRICT_TRANSPORT_SECURITY, header::HeaderValue::from_static("max-age=63072000; includeSubDomains"));
            }
            Ok(res)
        })
    }
}
