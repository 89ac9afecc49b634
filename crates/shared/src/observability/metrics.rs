//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 收集指标，
//! 通过独立 HTTP 端口暴露 `/metrics` 供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 安装 recorder 并启动指标 HTTP 服务器
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "solicitud_transitions_total",
        "Material request state transitions by action and outcome"
    );
    metrics::describe_counter!(
        "novedad_events_total",
        "Incident registrations and resolutions"
    );
    metrics::describe_counter!(
        "inventory_assignments_total",
        "Corporate inventory assignments to offices"
    );
    metrics::describe_counter!(
        "inventory_assigned_units_total",
        "Units moved from corporate stock to offices"
    );
    metrics::describe_counter!("login_attempts_total", "Login attempts by outcome");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录申请单状态流转（approve / approve_partial / reject / return）
#[inline]
pub fn record_solicitud_transition(action: &str, outcome: &str) {
    metrics::counter!(
        "solicitud_transitions_total",
        "action" => action.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// 记录异常上报事件（register / accept / reject / update）
#[inline]
pub fn record_novedad_event(action: &str) {
    metrics::counter!("novedad_events_total", "action" => action.to_string()).increment(1);
}

/// 记录库存分配
#[inline]
pub fn record_inventory_assignment(oficina_id: i64, cantidad: i32) {
    metrics::counter!(
        "inventory_assignments_total",
        "oficina_id" => oficina_id.to_string()
    )
    .increment(1);
    metrics::counter!("inventory_assigned_units_total").increment(cantidad.max(0) as u64);
}

/// 记录登录结果（success / invalid_credentials / locked / disabled）
#[inline]
pub fn record_login_attempt(outcome: &str) {
    metrics::counter!("login_attempts_total", "outcome" => outcome.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // 未安装 recorder 时记录应为空操作
    #[test]
    fn test_record_without_recorder() {
        record_http_request("GET", "/api/solicitudes", 200, 0.01);
        record_solicitud_transition("approve", "success");
        record_novedad_event("register");
        record_inventory_assignment(3, 10);
        record_login_attempt("success");
        assert!(get_handle().is_none());
    }
}
