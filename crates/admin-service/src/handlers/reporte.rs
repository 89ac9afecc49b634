//! 库存报表 API

use axum::{
    Json,
    extract::{Query, State},
};

use crate::dto::{ApiResponse, MovimientosQuery};
use crate::error::Result;
use crate::models::{
    AlertaStock, AsignacionesPorOficina, EstadisticasInventario, MovimientoInventario,
    ProductosPorOficina, StockPorCategoria, ValorInventario,
};
use crate::state::AppState;

/// GET /api/inventario/reportes/stock-categorias
pub async fn stock_por_categoria(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<StockPorCategoria>>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.stock_por_categoria().await?,
    )))
}

/// GET /api/inventario/reportes/valor-inventario
pub async fn valor_inventario(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ValorInventario>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.valor_inventario().await?,
    )))
}

/// GET /api/inventario/reportes/asignaciones-oficina
pub async fn asignaciones_por_oficina(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AsignacionesPorOficina>>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.asignaciones_por_oficina().await?,
    )))
}

/// 各机构持有数量，未分配部分计入 Sede Principal
///
/// GET /api/inventario/reportes/productos-oficina
pub async fn productos_por_oficina(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<ProductosPorOficina>>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.productos_por_oficina().await?,
    )))
}

/// 库存为 0（Crítico）或不高于最低库存（Bajo）的产品
///
/// GET /api/inventario/reportes/stock-bajo
pub async fn stock_bajo(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<AlertaStock>>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.alertas_stock().await?,
    )))
}

/// 最近流水，默认 50 条，最多 500 条
///
/// GET /api/inventario/reportes/movimientos
pub async fn movimientos(
    State(state): State<AppState>,
    Query(query): Query<MovimientosQuery>,
) -> Result<Json<ApiResponse<Vec<MovimientoInventario>>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.movimientos(query.limite).await?,
    )))
}

/// GET /api/inventario/estadisticas
pub async fn estadisticas(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<EstadisticasInventario>>> {
    Ok(Json(ApiResponse::success(
        state.inventario.estadisticas().await?,
    )))
}
