//! 物资申请 API
//!
//! 列表、创建、审批、拒绝与退回

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{
    ApiResponse, AprobarParcialRequest, CreateSolicitudRequest, CreatedResponse, DevolucionDto,
    DevolucionRequest, InfoDevolucionDto, ObservacionRequest, PageResponse,
    SolicitudDetallesDto, SolicitudDto, SolicitudListQuery, SolicitudListResponse, TransicionDto,
};
use crate::error::Result;
use crate::models::{Material, Novedad, SolicitudEstado};
use crate::state::AppState;

/// 申请列表
///
/// GET /api/solicitudes
pub async fn list_solicitudes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<SolicitudListQuery>,
) -> Result<Json<ApiResponse<SolicitudListResponse>>> {
    let pagination = query.pagination();
    let listado = state
        .solicitudes
        .listar(&claims, query.filtro()?, pagination.limit(), pagination.offset())
        .await?;

    let items = listado.items.into_iter().map(SolicitudDto::from).collect();
    Ok(Json(ApiResponse::success(SolicitudListResponse {
        page: PageResponse::new(items, listado.total, pagination.page(), pagination.limit()),
        resumen: listado.resumen,
        oficinas: listado.oficinas,
    })))
}

/// 可申请的物资
///
/// GET /api/solicitudes/materiales
pub async fn list_materiales(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Material>>>> {
    let materiales = state.solicitudes.materiales().await?;
    Ok(Json(ApiResponse::success(materiales)))
}

/// 创建申请
///
/// POST /api/solicitudes
pub async fn create_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSolicitudRequest>,
) -> Result<Json<ApiResponse<CreatedResponse>>> {
    req.validate()?;

    let id = state
        .solicitudes
        .crear(&claims, req.material_id, req.cantidad, req.observacion)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        CreatedResponse { id },
        "Solicitud creada exitosamente",
    )))
}

/// GET /api/solicitudes/{id}
pub async fn get_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SolicitudDto>>> {
    let solicitud = state.solicitudes.detalle(&claims, id).await?;
    Ok(Json(ApiResponse::success(solicitud.into())))
}

/// 申请及其全部异常
///
/// GET /api/solicitudes/{id}/detalles
pub async fn get_solicitud_detalles(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<SolicitudDetallesDto>>> {
    let (solicitud, novedades) = state.novedades.detalles_solicitud(&claims, id).await?;
    Ok(Json(ApiResponse::success(SolicitudDetallesDto {
        solicitud: solicitud.into(),
        novedades,
    })))
}

/// 最近一次异常
///
/// GET /api/solicitudes/{id}/novedad
pub async fn get_ultima_novedad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Option<Novedad>>>> {
    let novedad = state.novedades.ultima_de_solicitud(&claims, id).await?;
    Ok(Json(ApiResponse::success(novedad)))
}

/// 全额审批
///
/// POST /api/solicitudes/{id}/aprobar
pub async fn aprobar_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Option<Json<ObservacionRequest>>,
) -> Result<Json<ApiResponse<TransicionDto>>> {
    let Json(req) = body.unwrap_or_default();
    req.validate()?;

    let estado = state.solicitudes.aprobar(&claims, id, req.observacion).await?;
    Ok(Json(ApiResponse::success_with_message(
        TransicionDto::new(id, estado),
        "Solicitud aprobada",
    )))
}

/// 部分审批
///
/// POST /api/solicitudes/{id}/aprobar-parcial
pub async fn aprobar_parcial_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<AprobarParcialRequest>,
) -> Result<Json<ApiResponse<TransicionDto>>> {
    req.validate()?;

    let estado = state
        .solicitudes
        .aprobar_parcial(&claims, id, req.cantidad_aprobada, req.observacion)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        TransicionDto::new(id, estado),
        format!("Solicitud aprobada con {} unidades", req.cantidad_aprobada),
    )))
}

/// POST /api/solicitudes/{id}/rechazar
pub async fn rechazar_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    body: Option<Json<ObservacionRequest>>,
) -> Result<Json<ApiResponse<TransicionDto>>> {
    let Json(req) = body.unwrap_or_default();
    req.validate()?;

    state.solicitudes.rechazar(&claims, id, req.observacion).await?;
    Ok(Json(ApiResponse::success_with_message(
        TransicionDto::new(id, SolicitudEstado::Rechazada),
        "Solicitud rechazada",
    )))
}

/// 登记退回
///
/// POST /api/solicitudes/{id}/devolucion
pub async fn devolver_solicitud(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<DevolucionRequest>,
) -> Result<Json<ApiResponse<DevolucionDto>>> {
    req.validate()?;

    let devolucion = state
        .solicitudes
        .devolver(&claims, id, req.cantidad_devuelta, req.observacion)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        devolucion.into(),
        "Devolución registrada",
    )))
}

/// 退回前的数量信息
///
/// GET /api/solicitudes/{id}/info-devolucion
pub async fn get_info_devolucion(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<InfoDevolucionDto>>> {
    let solicitud = state.solicitudes.detalle(&claims, id).await?;
    Ok(Json(ApiResponse::success(InfoDevolucionDto::from(&solicitud))))
}
