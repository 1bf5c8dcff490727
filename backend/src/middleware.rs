use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Instant;
use uuid::Uuid;

static TEST_REQUEST_SEQ: AtomicU64 = AtomicU64::new(0);

fn running_as_test() -> bool {
    cfg!(test)
        || std::env::var("RUST_ENV")
            .unwrap_or_default()
            .eq_ignore_ascii_case("test")
}

/// Correlation id for one request. Sequential ids keep test logs readable;
/// elsewhere a v4 UUID.
fn next_request_id() -> String {
    if running_as_test() {
        format!("req-{}", TEST_REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
    } else {
        Uuid::new_v4().to_string()
    }
}

/// Request logging with correlation ids. The id is stored in request
/// extensions for handlers, echoed back in `x-request-id`, and every
/// completed request is logged and counted at a level matching its status.
pub struct RequestLog;

impl<S, B> Transform<S, ServiceRequest> for RequestLog
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestLogService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLogService {
            inner: Rc::new(service),
        }))
    }
}

pub struct RequestLogService<S> {
    inner: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestLogService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let inner = self.inner.clone();
        let started = Instant::now();
        let method = req.method().to_string();
        let uri = req.uri().to_string();
        // Route pattern, not the concrete path, to keep label cardinality low.
        let endpoint = req
            .match_pattern()
            .unwrap_or_else(|| "unmatched".to_string());
        let peer = req
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let request_id = next_request_id();
        req.extensions_mut().insert(request_id.clone());

        if let Some(metrics) = crate::metrics::Metrics::global() {
            metrics.http_started();
        }

        Box::pin(async move {
            let mut res = inner.call(req).await?;

            let status = res.status().as_u16();
            let elapsed = started.elapsed();

            if let Ok(value) = HeaderValue::try_from(request_id.as_str()) {
                res.headers_mut()
                    .insert(HeaderName::from_static("x-request-id"), value);
            }

            if let Some(metrics) = crate::metrics::Metrics::global() {
                metrics.observe_http(&method, &endpoint, status, elapsed);
            }

            let level = match status {
                500.. => log::Level::Error,
                400..=499 => log::Level::Warn,
                _ => log::Level::Info,
            };
            log::log!(
                level,
                "request_id={} {} {} {} {}ms {}",
                request_id,
                method,
                uri,
                status,
                elapsed.as_millis(),
                peer
            );

            Ok(res)
        })
    }
}

pub fn cors_middleware() -> actix_cors::Cors {
    let mut allowed: Vec<&str> = vec!["http://localhost:50011", "http://127.0.0.1:50011"];
    if std::env::var("RUST_ENV").as_deref() == Ok("production") {
        allowed.extend(["https://trackline.app", "https://www.trackline.app"]);
    }

    let mut cors = actix_cors::Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::ACCEPT,
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::AUTHORIZATION,
            HeaderName::from_static("x-subject-id"),
        ])
        .supports_credentials()
        .max_age(3600);
    for origin in allowed {
        cors = cors.allowed_origin(origin);
    }
    cors
}

pub struct SecurityHeaders;

fn harden(res: &mut actix_web::http::header::HeaderMap, production: bool) {
    res.insert(
        HeaderName::from_static("x-content-type-options"),
        HeaderValue::from_static("nosniff"),
    );
    res.insert(
        HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    if production {
        res.insert(
            HeaderName::from_static("strict-transport-security"),
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersService {
            inner: Rc::new(service),
        }))
    }
}

pub struct SecurityHeadersService<S> {
    inner: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let inner = self.inner.clone();
        let production = std::env::var("RUST_ENV")
            .unwrap_or_default()
            .eq_ignore_ascii_case("production");

        Box::pin(async move {
            let mut res = inner.call(req).await?;
            harden(res.headers_mut(), production);
            Ok(res)
        })
    }
}
