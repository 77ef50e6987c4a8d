use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json};

use super::extract::Payload;
use super::{AppState, CHECK_IN_API};
use crate::catalog::{self, Role, RoleRequestPayload};
use crate::checkin::{self, CheckInPayload};
use crate::error::AppResult;
use crate::identity::{RequestContext, SIGN_IN_PATH};

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn sign_in_page() -> Html<&'static str> {
    Html(concat!(
        "<!doctype html><html><head><title>Sign in</title></head><body>",
        "<main><h1>Sign in</h1><p>Sign in to continue to inventory check-in.</p></main>",
        "</body></html>"
    ))
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub async fn check_in_page(Extension(ctx): Extension<RequestContext>) -> Response {
    // the gate redirects anonymous callers before this runs
    let Ok(principal) = ctx.require_principal() else {
        return (StatusCode::SEE_OTHER, [(axum::http::header::LOCATION, SIGN_IN_PATH)]).into_response();
    };
    let who = escape_html(principal.email.as_deref().unwrap_or(principal.user_id.as_str()));
    Html(format!(
        "<!doctype html><html><head><title>Check-in</title></head><body>\
         <main id=\"check-in\"><h1>Inventory check-in</h1>\
         <p>Signed in as {who}</p>\
         <form method=\"post\" action=\"{action}\" data-scanner=\"true\">\
         <label for=\"code\">Item code</label>\
         <input id=\"code\" name=\"code\" autocomplete=\"off\" autofocus maxlength=\"{max}\">\
         <button type=\"submit\">Check in</button></form></main></body></html>",
        who = who,
        action = CHECK_IN_API,
        max = checkin::MAX_CODE_LEN,
    ))
    .into_response()
}

pub async fn list_roles(State(state): State<AppState>) -> AppResult<Json<Vec<Role>>> {
    let roles = catalog::fetch_assignable_roles(state.catalog.as_ref(), &state.config.privileged_role).await?;
    Ok(Json(roles))
}

pub async fn create_check_in(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Payload(payload): Payload<CheckInPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let principal = ctx.require_principal()?;
    let stored = checkin::record_check_in(state.records.as_ref(), principal, &payload.code).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn create_role_request(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Payload(payload): Payload<RoleRequestPayload>,
) -> AppResult<(StatusCode, Json<serde_json::Value>)> {
    let principal = ctx.require_principal()?;
    let stored = catalog::request_role(
        state.catalog.as_ref(),
        state.records.as_ref(),
        principal,
        &state.config.privileged_role,
        &payload.role_id,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[cfg(test)]
mod tests {
    use super::escape_html;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
        assert_eq!(escape_html("ops@example.com"), "ops@example.com");
    }
}
