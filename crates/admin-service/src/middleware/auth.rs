//! JWT 认证中间件
//!
//! 验证 Bearer Token 并将 Claims 注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::reject;
use crate::state::AppState;

/// 无需认证的路径前缀
const PUBLIC_PATHS: [&str; 4] = ["/health", "/ready", "/api/auth/login", "/static/"];

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path();
    if PUBLIC_PATHS.iter().any(|p| path.starts_with(p)) {
        return next.run(request).await;
    }

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return reject(
            StatusCode::UNAUTHORIZED,
            "UNAUTHORIZED",
            "Debe iniciar sesión para acceder",
        );
    };

    match state.jwt_manager.verify_token(token) {
        Ok(claims) => {
            debug!(user = %claims.username, path = %path, "Request authenticated");
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => reject(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", &e.to_string()),
    }
}
