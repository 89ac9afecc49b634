//! 权限检查中间件

use std::future::Future;
use std::pin::Pin;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::reject;
use crate::auth::Claims;

/// 权限检查中间件工厂
///
/// ```ignore
/// .route_layer(axum::middleware::from_fn(require_permission("inventario:reporte:read")))
/// ```
pub fn require_permission(
    permission: &'static str,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response> + Send>>
+ Clone
+ Send
+ Sync
+ 'static {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move { check_permission(request, next, permission).await })
    }
}

async fn check_permission(request: Request<Body>, next: Next, required: &str) -> Response {
    let Some(claims) = request.extensions().get::<Claims>() else {
        return reject(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", "No autenticado");
    };

    if claims.has_permission(required) {
        return next.run(request).await;
    }

    warn!(user = %claims.username, permission = required, "Permission denied");
    reject(
        StatusCode::FORBIDDEN,
        "FORBIDDEN",
        "No tiene permisos para realizar esta acción",
    )
}
