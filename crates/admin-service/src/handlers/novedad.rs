//! 异常上报 API
//!
//! 登记（multipart，可附图片）、处理、状态更新与统计

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
};
use tracing::warn;
use validator::Validate;

use crate::auth::Claims;
use crate::dto::{
    ActualizarNovedadRequest, ApiResponse, GestionarNovedadRequest, NovedadGestionadaDto,
    NovedadListResponse, NovedadQuery, NovedadRegistradaDto,
};
use crate::error::{ApiError, Result};
use crate::models::{Novedad, NovedadStats, Prioridad};
use crate::service::RegistroNovedad;
use crate::state::AppState;

/// 登记表单中的图片
struct Imagen {
    nombre: String,
    contenido: Bytes,
}

/// 登记表单原始字段
#[derive(Default)]
struct FormularioNovedad {
    solicitud_id: Option<String>,
    tipo_novedad: Option<String>,
    descripcion: Option<String>,
    cantidad_afectada: Option<String>,
    prioridad: Option<String>,
    imagen: Option<Imagen>,
}

impl FormularioNovedad {
    async fn leer(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(format!("Formulario inválido: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();
            if name == "imagen_novedad" {
                let nombre = field.file_name().unwrap_or_default().to_string();
                let contenido = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::FileProcessingError(e.to_string()))?;
                // 未选择文件时浏览器仍会提交空字段
                if !nombre.is_empty() && !contenido.is_empty() {
                    form.imagen = Some(Imagen { nombre, contenido });
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| ApiError::Validation(format!("Campo {} inválido: {}", name, e)))?;
            match name.as_str() {
                "solicitud_id" => form.solicitud_id = Some(value),
                "tipo_novedad" => form.tipo_novedad = Some(value),
                "descripcion" => form.descripcion = Some(value),
                "cantidad_afectada" => form.cantidad_afectada = Some(value),
                "prioridad" => form.prioridad = Some(value),
                _ => {}
            }
        }
        Ok(form)
    }
}

fn campo_numerico<T: std::str::FromStr>(campo: &str, valor: Option<String>) -> Result<T> {
    valor
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::Validation(format!("El campo {} es obligatorio", campo)))?
        .parse()
        .map_err(|_| ApiError::Validation(format!("El campo {} debe ser numérico", campo)))
}

/// 登记异常
///
/// POST /api/solicitudes/novedades
pub async fn registrar_novedad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<NovedadRegistradaDto>>> {
    let form = FormularioNovedad::leer(multipart).await?;

    let solicitud_id: i64 = campo_numerico("solicitud_id", form.solicitud_id)?;
    let cantidad_afectada: i32 = campo_numerico("cantidad_afectada", form.cantidad_afectada)?;
    let prioridad = form
        .prioridad
        .as_deref()
        .unwrap_or_default()
        .parse::<Prioridad>()
        .map_err(ApiError::Validation)?;

    let ruta_imagen = match &form.imagen {
        Some(imagen) => Some(state.images.save(&imagen.nombre, &imagen.contenido).await?),
        None => None,
    };

    let registro = RegistroNovedad {
        solicitud_id,
        tipo_novedad: form.tipo_novedad.unwrap_or_default(),
        descripcion: form.descripcion.unwrap_or_default(),
        cantidad_afectada,
        prioridad,
        ruta_imagen: ruta_imagen.clone(),
    };

    let novedad_id = match state.novedades.registrar(&claims, registro).await {
        Ok(id) => id,
        Err(e) => {
            if let Some(ruta) = &ruta_imagen {
                warn!(solicitud_id, "Discarding image of failed novedad registration");
                state.images.remove(ruta).await;
            }
            return Err(e);
        }
    };

    Ok(Json(ApiResponse::success_with_message(
        NovedadRegistradaDto {
            novedad_id,
            solicitud_id,
            ruta_imagen,
        },
        "Novedad registrada exitosamente",
    )))
}

/// 接受或驳回申请单最近一条未关闭的异常
///
/// POST /api/solicitudes/novedades/gestionar
pub async fn gestionar_novedad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<GestionarNovedadRequest>,
) -> Result<Json<ApiResponse<NovedadGestionadaDto>>> {
    req.validate()?;

    let novedad_id = state
        .novedades
        .gestionar(&claims, req.solicitud_id, req.accion, req.observaciones)
        .await?;

    Ok(Json(ApiResponse::success_with_message(
        NovedadGestionadaDto {
            novedad_id,
            solicitud_id: req.solicitud_id,
            estado: req.accion.estado_novedad(),
        },
        "Novedad gestionada",
    )))
}

/// 异常列表、统计与类型
///
/// GET /api/novedades
pub async fn list_novedades(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NovedadQuery>,
) -> Result<Json<ApiResponse<NovedadListResponse>>> {
    let (novedades, estadisticas, tipos) =
        state.novedades.listar(&claims, query.estado()?).await?;
    Ok(Json(ApiResponse::success(NovedadListResponse {
        novedades,
        estadisticas,
        tipos,
    })))
}

/// GET /api/novedades/pendientes
pub async fn list_pendientes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<Vec<Novedad>>>> {
    let novedades = state.novedades.pendientes(&claims).await?;
    Ok(Json(ApiResponse::success(novedades)))
}

/// GET /api/novedades/estadisticas
pub async fn get_estadisticas(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<NovedadStats>>> {
    let stats = state.novedades.estadisticas(&claims).await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// GET /api/novedades/tipos
pub async fn list_tipos(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<String>>>> {
    let tipos = state.novedades.tipos().await?;
    Ok(Json(ApiResponse::success(tipos)))
}

/// GET /api/novedades/{id}
pub async fn get_novedad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Novedad>>> {
    let novedad = state.novedades.detalle(&claims, id).await?;
    Ok(Json(ApiResponse::success(novedad)))
}

/// PUT /api/novedades/{id}
pub async fn update_novedad(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(req): Json<ActualizarNovedadRequest>,
) -> Result<Json<ApiResponse<Novedad>>> {
    req.validate()?;

    let novedad = state
        .novedades
        .actualizar(&claims, id, req.estado, req.observaciones)
        .await?;
    Ok(Json(ApiResponse::success_with_message(
        novedad,
        "Novedad actualizada",
    )))
}
