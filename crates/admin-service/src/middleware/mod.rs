//! 中间件模块
//!
//! 提供认证、权限检查和安全响应头

mod auth;
mod permission;
mod security;

pub use auth::auth_middleware;
pub use permission::require_permission;
pub use security::security_headers;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// 中间件直接返回的错误响应，格式与 ApiError 一致
fn reject(status: StatusCode, code: &str, message: &str) -> Response {
    let body = json!({
        "success": false,
        "code": code,
        "message": message,
        "data": null
    });

    (status, Json(body)).into_response()
}
