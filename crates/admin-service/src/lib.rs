//! 物资申请与企业库存管理服务
//!
//! 提供物资申请审批、退回、异常上报以及企业库存分配与报表的 REST API。
//!
//! ## 模块结构
//!
//! - `auth`: JWT、密码哈希与角色权限
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `middleware`: 认证、权限与安全头中间件
//! - `models`: 领域模型与状态规则
//! - `repository`: PostgreSQL 数据访问
//! - `service`: 业务编排
//! - `routes` / `state`: 路由与共享状态
//! - `upload`: 异常图片存储

pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod upload;

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::HeaderValue,
    middleware::from_fn,
    middleware::from_fn_with_state,
    routing::get,
};
use suministros_shared::{config::AppConfig, observability::middleware as obs_middleware};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
};
use tracing::{info, warn};

pub use error::{ApiError, Result};
pub use state::AppState;

/// 请求体上限在图片上限之外为其余表单字段预留的空间
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 组装完整应用：API、静态图片、探针与全局中间件
pub fn build_app(state: AppState, config: &AppConfig) -> Router {
    let static_route = format!("/static/{}", config.uploads.public_prefix.trim_matches('/'));

    Router::new()
        .nest("/api", routes::api_routes())
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest_service(&static_route, ServeDir::new(&config.uploads.dir))
        .layer(DefaultBodyLimit::max(
            config.uploads.max_bytes + FORM_OVERHEAD_BYTES,
        ))
        .layer(from_fn(middleware::security_headers))
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .layer(cors_layer(config))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(from_fn(obs_middleware::http_tracing))
        .layer(from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// CORS：逗号分隔的来源列表，`*` 表示放开全部来源
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config.server.cors_origins.trim();

    if allowed_origins == "*" {
        if config.is_production() {
            warn!("cors_origins=\"*\" is unsafe in production, set explicit origins");
        }
        info!("CORS allowed_origins: * (all origins)");
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    info!(allowed_origins, "CORS configured");
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// 存活探针
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "suministros-admin-service"
    }))
}

/// 就绪探针：检查数据库连接
async fn readiness_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    Json(serde_json::json!({
        "status": if db_ok { "ok" } else { "degraded" },
        "service": "suministros-admin-service",
        "checks": {
            "database": if db_ok { "ok" } else { "fail" }
        }
    }))
}
