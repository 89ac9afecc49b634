//! 响应 DTO 定义

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    DevolucionSolicitud, Novedad, NovedadEstado, NovedadStats, ResumenSolicitudes, Solicitud,
    SolicitudEstado,
};

/// API 统一响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "Operación exitosa")
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: None,
        }
    }
}

/// 分页响应
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

impl<T> PageResponse<T> {
    pub fn new(items: Vec<T>, total: i64, page: i64, page_size: i64) -> Self {
        let total_pages = if page_size > 0 {
            (total + page_size - 1) / page_size
        } else {
            0
        };

        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResponse {
    pub id: i64,
}

// ============ 认证 ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub role: String,
    pub oficina_id: Option<i64>,
    pub oficina_nombre: Option<String>,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

// ============ 物资申请 ============

/// 申请单
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudDto {
    pub id: i64,
    pub estado_id: i32,
    pub estado: &'static str,
    pub material_id: i64,
    pub material_nombre: String,
    pub cantidad_solicitada: i32,
    pub cantidad_entregada: i32,
    pub cantidad_devuelta: i32,
    pub cantidad_pendiente_devolucion: i32,
    pub oficina_id: i64,
    pub oficina_nombre: String,
    pub usuario_solicitante_id: i64,
    pub usuario_solicitante: String,
    pub fecha_solicitud: DateTime<Utc>,
    pub fecha_aprobacion: Option<DateTime<Utc>>,
    pub fecha_ultima_entrega: Option<DateTime<Utc>>,
    pub porcentaje_oficina: f64,
    pub valor_total_solicitado: f64,
    pub valor_oficina: f64,
    pub valor_sede_principal: f64,
    pub aprobador_id: Option<i64>,
    pub aprobador_nombre: Option<String>,
    pub observacion: Option<String>,
    pub novedad: Option<NovedadResumenDto>,
}

/// 申请单上最近一次异常的摘要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovedadResumenDto {
    pub id: i64,
    pub estado: Option<NovedadEstado>,
    pub tipo: Option<String>,
    pub descripcion: Option<String>,
    pub cantidad_afectada: Option<i32>,
}

impl From<Solicitud> for SolicitudDto {
    fn from(s: Solicitud) -> Self {
        let cantidad_pendiente_devolucion = s.cantidad_pendiente_devolucion();
        let novedad = s.novedad_id.map(|id| NovedadResumenDto {
            id,
            estado: s.estado_novedad,
            tipo: s.tipo_novedad,
            descripcion: s.novedad_descripcion,
            cantidad_afectada: s.cantidad_afectada,
        });
        Self {
            id: s.id,
            estado_id: s.estado.codigo(),
            estado: s.estado.nombre(),
            material_id: s.material_id,
            material_nombre: s.material_nombre,
            cantidad_solicitada: s.cantidad_solicitada,
            cantidad_entregada: s.cantidad_entregada,
            cantidad_devuelta: s.cantidad_devuelta,
            cantidad_pendiente_devolucion,
            oficina_id: s.oficina_id,
            oficina_nombre: s.oficina_nombre,
            usuario_solicitante_id: s.usuario_solicitante_id,
            usuario_solicitante: s.usuario_solicitante,
            fecha_solicitud: s.fecha_solicitud,
            fecha_aprobacion: s.fecha_aprobacion,
            fecha_ultima_entrega: s.fecha_ultima_entrega,
            porcentaje_oficina: s.porcentaje_oficina,
            valor_total_solicitado: s.valor_total_solicitado,
            valor_oficina: s.valor_oficina,
            valor_sede_principal: s.valor_sede_principal,
            aprobador_id: s.aprobador_id,
            aprobador_nombre: s.aprobador_nombre,
            observacion: s.observacion,
            novedad,
        }
    }
}

/// 申请列表：分页数据、汇总与可选机构
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudListResponse {
    #[serde(flatten)]
    pub page: PageResponse<SolicitudDto>,
    pub resumen: ResumenSolicitudes,
    pub oficinas: Vec<String>,
}

/// 状态流转结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransicionDto {
    pub solicitud_id: i64,
    pub estado_id: i32,
    pub estado: &'static str,
}

impl TransicionDto {
    pub fn new(solicitud_id: i64, estado: SolicitudEstado) -> Self {
        Self {
            solicitud_id,
            estado_id: estado.codigo(),
            estado: estado.nombre(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DevolucionDto {
    pub solicitud_id: i64,
    pub cantidad_devuelta: i32,
    pub estado_id: i32,
    pub estado: &'static str,
}

impl From<DevolucionSolicitud> for DevolucionDto {
    fn from(d: DevolucionSolicitud) -> Self {
        Self {
            solicitud_id: d.solicitud_id,
            cantidad_devuelta: d.cantidad,
            estado_id: d.nuevo_estado.codigo(),
            estado: d.nuevo_estado.nombre(),
        }
    }
}

/// 退回前的数量信息
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoDevolucionDto {
    pub solicitud_id: i64,
    pub cantidad_entregada: i32,
    pub cantidad_ya_devuelta: i32,
    pub cantidad_pendiente: i32,
    pub material_nombre: String,
    pub solicitante_nombre: String,
}

impl From<&Solicitud> for InfoDevolucionDto {
    fn from(s: &Solicitud) -> Self {
        Self {
            solicitud_id: s.id,
            cantidad_entregada: s.cantidad_entregada,
            cantidad_ya_devuelta: s.cantidad_devuelta,
            cantidad_pendiente: s.cantidad_pendiente_devolucion(),
            material_nombre: s.material_nombre.clone(),
            solicitante_nombre: s.usuario_solicitante.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudDetallesDto {
    pub solicitud: SolicitudDto,
    pub novedades: Vec<Novedad>,
}

// ============ 异常上报 ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovedadListResponse {
    pub novedades: Vec<Novedad>,
    pub estadisticas: NovedadStats,
    pub tipos: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovedadRegistradaDto {
    pub novedad_id: i64,
    pub solicitud_id: i64,
    pub ruta_imagen: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NovedadGestionadaDto {
    pub novedad_id: i64,
    pub solicitud_id: i64,
    pub estado: NovedadEstado,
}

// ============ 企业库存 ============

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductoCreadoDto {
    pub id: i64,
    pub codigo_unico: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::solicitud::fixtures::entregada;

    #[test]
    fn test_page_response_total_pages() {
        let page = PageResponse::new(vec![1, 2, 3], 41, 1, 20);
        assert_eq!(page.total_pages, 3);
        let empty: PageResponse<i32> = PageResponse::new(vec![], 0, 1, 20);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn test_solicitud_dto_serialization() {
        let mut solicitud = entregada(5, SolicitudEstado::NovedadRegistrada, 10, 3);
        solicitud.novedad_id = Some(12);
        solicitud.estado_novedad = Some(NovedadEstado::Registrada);

        let json = serde_json::to_value(SolicitudDto::from(solicitud)).unwrap();
        assert_eq!(json["estadoId"], 7);
        assert_eq!(json["estado"], "Novedad Registrada");
        assert_eq!(json["cantidadPendienteDevolucion"], 7);
        assert_eq!(json["novedad"]["id"], 12);
        assert_eq!(json["novedad"]["estado"], "registrada");
    }

    #[test]
    fn test_list_response_flattens_page() {
        let resp = SolicitudListResponse {
            page: PageResponse::new(vec![], 0, 1, 20),
            resumen: ResumenSolicitudes::default(),
            oficinas: vec!["Oficina Norte".to_string()],
        };
        let json = serde_json::to_value(resp).unwrap();
        assert_eq!(json["pageSize"], 20);
        assert_eq!(json["resumen"]["pendientes"], 0);
        assert_eq!(json["oficinas"][0], "Oficina Norte");
    }

    #[test]
    fn test_envelope() {
        let json = serde_json::to_value(ApiResponse::success(CreatedResponse { id: 3 })).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["code"], "SUCCESS");
        assert_eq!(json["data"]["id"], 3);

        let json = serde_json::to_value(ApiResponse::success_empty("ok")).unwrap();
        assert!(json["data"].is_null());
    }
}
