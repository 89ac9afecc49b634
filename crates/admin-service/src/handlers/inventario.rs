//! 企业库存 API
//!
//! 产品维护、目录数据、向分支机构分配与流水查询

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{
    ApiResponse, AsignarProductoRequest, CreateProductoRequest, ProductoCreadoDto, ProductoQuery,
    UpdateProductoRequest,
};
use crate::error::Result;
use crate::models::{CatalogoItem, MovimientoInventario, Producto};
use crate::state::AppState;

/// 产品列表，`oficinaId` 限定为分配给该机构的产品
///
/// GET /api/inventario/productos
pub async fn list_productos(
    State(state): State<AppState>,
    Query(query): Query<ProductoQuery>,
) -> Result<Json<ApiResponse<Vec<Producto>>>> {
    let productos = state.inventario.productos(query.oficina_id).await?;
    Ok(Json(ApiResponse::success(productos)))
}

/// 全部产品及其当前所在机构
///
/// GET /api/inventario/productos/con-oficina
pub async fn list_productos_con_oficina(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Producto>>>> {
    let productos = state.inventario.productos(None).await?;
    Ok(Json(ApiResponse::success(productos)))
}

/// 尚未分配的产品
///
/// GET /api/inventario/productos/sede-principal
pub async fn list_productos_sede_principal(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Producto>>>> {
    let productos = state.inventario.productos_sede_principal().await?;
    Ok(Json(ApiResponse::success(productos)))
}

/// GET /api/inventario/productos/oficinas-servicio
pub async fn list_productos_oficinas_servicio(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Producto>>>> {
    let productos = state.inventario.productos_oficinas_servicio().await?;
    Ok(Json(ApiResponse::success(productos)))
}

/// GET /api/inventario/productos/{id}
pub async fn get_producto(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Producto>>> {
    let producto = state.inventario.producto(id).await?;
    Ok(Json(ApiResponse::success(producto)))
}

/// 创建产品，未提供编码时自动生成
///
/// POST /api/inventario/productos
pub async fn create_producto(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateProductoRequest>,
) -> Result<Json<ApiResponse<ProductoCreadoDto>>> {
    req.validate()?;

    let nuevo = req.into_nuevo(claims.oficina_id, claims.nombre_visible());
    let (id, codigo_unico) = state.inventario.crear(nuevo).await?;

    Ok(Json(ApiResponse::success_with_message(
        ProductoCreadoDto { id, codigo_unico },
        "Producto creado exitosamente",
    )))
}

/// PUT /api/inventario/productos/{id}
pub async fn update_producto(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateProductoRequest>,
) -> Result<Json<ApiResponse<Producto>>> {
    req.validate()?;

    let producto = state.inventario.actualizar(id, req.into()).await?;
    Ok(Json(ApiResponse::success_with_message(
        producto,
        "Producto actualizado",
    )))
}

/// 逻辑删除并写入 BAJA_PRODUCTO 流水
///
/// DELETE /api/inventario/productos/{id}
pub async fn delete_producto(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<()>>> {
    state.inventario.dar_de_baja(&claims, id).await?;
    Ok(Json(ApiResponse::success_empty("Producto dado de baja")))
}

/// 分配到分支机构
///
/// POST /api/inventario/productos/{id}/asignar
pub async fn asignar_producto(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<AsignarProductoRequest>,
) -> Result<Json<ApiResponse<()>>> {
    req.validate()?;

    state
        .inventario
        .asignar(
            &claims,
            id,
            req.oficina_id,
            req.cantidad,
            req.usuario_asignado_id,
        )
        .await?;
    Ok(Json(ApiResponse::success_empty(format!(
        "Se asignaron {} unidades",
        req.cantidad
    ))))
}

/// GET /api/inventario/productos/{id}/historial
pub async fn get_historial(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<MovimientoInventario>>>> {
    let historial = state.inventario.historial(id).await?;
    Ok(Json(ApiResponse::success(historial)))
}

// ============ 目录 ============

/// GET /api/inventario/categorias
pub async fn list_categorias(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogoItem>>>> {
    Ok(Json(ApiResponse::success(state.inventario.categorias().await?)))
}

/// GET /api/inventario/proveedores
pub async fn list_proveedores(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogoItem>>>> {
    Ok(Json(ApiResponse::success(state.inventario.proveedores().await?)))
}

/// GET /api/inventario/oficinas
pub async fn list_oficinas(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CatalogoItem>>>> {
    Ok(Json(ApiResponse::success(state.inventario.oficinas().await?)))
}
