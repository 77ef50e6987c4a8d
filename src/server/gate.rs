//! Authorization gate: resolve the session and decide before any handler runs.

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use super::AppState;
use crate::error::AppError;
use crate::identity::{decide, AccessDecision, Requirement, RequestContext, Resolution, SessionCredentials};

pub async fn gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let policy = state.policy.policy_for(&path);
    // public routes run without a principal
    let resolution = if policy.requirement == Requirement::Public {
        Resolution::default()
    } else {
        let creds = SessionCredentials::from_headers(req.headers(), &state.config.cookies);
        match state.resolver.resolve(&creds).await {
            Ok(r) => r,
            Err(e) => {
                warn!(target: "gate", path = %path, "identity unavailable: {}", e);
                return AppError::from(e).into_response();
            }
        }
    };

    let ctx = RequestContext::new(resolution.principal.clone());
    let decision = decide(ctx.principal.as_ref(), policy);
    debug!(
        target: "gate",
        request_id = %ctx.request_id,
        path = %path,
        user_id = ctx.principal.as_ref().map(|p| p.user_id.as_str()).unwrap_or("-"),
        ?decision,
        "access decision"
    );

    let mut resp = match decision {
        AccessDecision::Allow => {
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        AccessDecision::Redirect { location } => {
            info!(target: "gate", request_id = %ctx.request_id, path = %path, "redirecting anonymous caller to {}", location);
            redirect(location)
        }
        AccessDecision::Deny => AppError::auth("unauthenticated", "sign in required").into_response(),
    };
    apply_cookies(&state, &resolution, &mut resp);
    resp
}

fn redirect(location: &'static str) -> Response {
    let mut resp = StatusCode::SEE_OTHER.into_response();
    resp.headers_mut().insert(header::LOCATION, HeaderValue::from_static(location));
    resp
}

fn apply_cookies(state: &AppState, resolution: &Resolution, resp: &mut Response) {
    let cookies = &state.config.cookies;
    let values = if let Some(tokens) = resolution.rotated.as_ref() {
        cookies.set_cookies(tokens)
    } else if resolution.clear_cookies {
        cookies.clear_cookies()
    } else {
        return;
    };
    for v in values {
        resp.headers_mut().append(header::SET_COOKIE, v);
    }
}
