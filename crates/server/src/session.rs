//! Session cookie handling and the role guards in front of `/api/staff` and
//! `/api/resident`.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use server_api::SESSION_COOKIE;
use shared::{
    domain::Role,
    error::{ApiError, ErrorCode},
};

use crate::{app_state::AppState, error::reject};

/// The caller resolved from a valid session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionUser {
    pub(crate) phone: String,
    pub(crate) role: Option<Role>,
}

pub(crate) fn extract_cookie(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(name)?
                .strip_prefix('=')
                .map(str::to_string)
        })
}

fn session_user(state: &AppState, request: &Request) -> Option<SessionUser> {
    let token = extract_cookie(request, SESSION_COOKIE)?;
    let claims = state.api.sessions.verify(&token)?;
    Some(SessionUser {
        phone: claims.sub,
        role: claims.role,
    })
}

pub(crate) async fn require_staff(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    guard(&state, request, next, &[Role::Staff]).await
}

pub(crate) async fn require_resident(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    guard(&state, request, next, &[Role::Resident, Role::Staff]).await
}

async fn guard(state: &AppState, mut request: Request, next: Next, allowed: &[Role]) -> Response {
    let Some(user) = session_user(state, &request) else {
        return reject(ApiError::new(ErrorCode::Unauthorized, "unauthorized")).into_response();
    };
    if !user.role.is_some_and(|role| allowed.contains(&role)) {
        tracing::debug!(
            phone = %user.phone,
            role = ?user.role,
            path = %request.uri().path(),
            "session role not allowed"
        );
        return reject(ApiError::new(ErrorCode::Forbidden, "forbidden")).into_response();
    }
    request.extensions_mut().insert(user);
    next.run(request).await
}

pub(crate) fn session_cookie(token: &str, max_age: u64, secure: bool) -> String {
    let mut cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub(crate) async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cleared = session_cookie("", 0, state.secure_cookies);
    ([(header::SET_COOKIE, cleared)], Redirect::to("/login")).into_response()
}
