use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::Request,
    http::{
        HeaderValue,
        header::{
            ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_HEADERS,
            ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
        },
    },
    response::Response,
    routing::{get, post},
    serve::Serve,
};
use tokio::net::TcpListener;
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{Span, info, info_span};
use uuid::Uuid;

use crate::{
    configuration::{CorsPolicy, Settings},
    email_client::EmailClient,
    routes::{health_check, method_not_allowed, preflight, submit_contact_form},
};

pub struct AppState {
    pub email_client: EmailClient,
    pub expose_error_details: bool,
}

/// Header values attached to every response for a given [`CorsPolicy`].
struct CorsHeaders {
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    allow_credentials: Option<HeaderValue>,
}

impl From<CorsPolicy> for CorsHeaders {
    fn from(policy: CorsPolicy) -> Self {
        match policy {
            CorsPolicy::Minimal => Self {
                allow_methods: HeaderValue::from_static("GET, POST, OPTIONS"),
                allow_headers: HeaderValue::from_static("Content-Type"),
                allow_credentials: None,
            },
            CorsPolicy::Extended => Self {
                allow_methods: HeaderValue::from_static("GET,OPTIONS,PATCH,DELETE,POST,PUT"),
                allow_headers: HeaderValue::from_static(
                    "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, \
                     Content-MD5, Content-Type, Date, X-Api-Version",
                ),
                allow_credentials: Some(HeaderValue::from_static("true")),
            },
        }
    }
}

pub fn run(
    listener: TcpListener,
    email_client: EmailClient,
    cors_policy: CorsPolicy,
    expose_error_details: bool,
) -> Serve<TcpListener, Router, Router> {
    let app_state = Arc::new(AppState {
        email_client,
        expose_error_details,
    });
    let cors = CorsHeaders::from(cors_policy);

    let app = Router::new()
        .route("/health_check", get(health_check))
        .route(
            "/api/contact",
            post(submit_contact_form)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(app_state)
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            cors.allow_methods,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            cors.allow_headers,
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            cors.allow_credentials,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        method = ?request.method(),
                        uri = ?request.uri(),
                        version = ?request.version(),
                        request_id = ?request_id,
                        status = tracing::field::Empty,
                    )
                })
                .on_response(|response: &Response, latency: Duration, span: &Span| {
                    let status = response.status();
                    span.record("status", status.as_u16());
                    info!(parent: span, ?status, ?latency, "Response sent");
                }),
        );

    axum::serve(listener, app)
}

pub struct Application {
    port: u16,
    server: Serve<TcpListener, Router, Router>,
}

impl Application {
    pub async fn build(configuration: Settings) -> anyhow::Result<Self> {
        let expose_error_details = configuration.expose_error_details();
        let cors_policy = configuration.application.cors_policy;
        let email_client = EmailClient::new(configuration.smtp)?;

        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host, configuration.application.port
        ))
        .await?;
        let port = listener.local_addr()?.port();
        info!(port, ?cors_policy, "Contact relay listening");

        let server = run(listener, email_client, cors_policy, expose_error_details);

        Ok(Self { server, port })
    }

    pub async fn run_until_stopped(self) -> anyhow::Result<()> {
        Ok(self.server.await?)
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}
