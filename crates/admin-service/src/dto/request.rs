//! 请求 DTO 定义
//!
//! 请求体与查询参数，JSON 字段统一为 camelCase

use serde::Deserialize;
use validator::Validate;

use crate::error::{ApiError, Result};
use crate::models::{
    AccionNovedad, ActualizacionProducto, NovedadEstado, NuevoProducto, SolicitudEstado,
    SolicitudFiltro,
};

/// 查询参数中表示“不过滤”的取值
const SIN_FILTRO: [&str; 3] = ["", "todos", "todas"];

fn filtro_texto(valor: Option<String>) -> Option<String> {
    valor
        .map(|v| v.trim().to_string())
        .filter(|v| !SIN_FILTRO.contains(&v.to_lowercase().as_str()))
}

// ============ 分页 ============

/// 分页参数
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

/// 页码上限，保证 offset 计算不会溢出
const MAX_PAGE: i64 = 100_000;

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

impl Default for PaginationParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl PaginationParams {
    pub fn page(&self) -> i64 {
        self.page.clamp(1, MAX_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.limit()
    }

    /// 每页条数限制在 1-100
    pub fn limit(&self) -> i64 {
        self.page_size.clamp(1, 100)
    }
}

// ============ 认证 ============

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 80, message = "El usuario es obligatorio"))]
    pub username: String,
    #[validate(length(min = 1, max = 128, message = "La contraseña es obligatoria"))]
    pub password: String,
}

// ============ 物资申请 ============

/// 申请列表查询；分页参数平铺，避免 serde flatten 对查询串数字的解析问题
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolicitudListQuery {
    pub estado: Option<String>,
    pub oficina: Option<String>,
    pub material: Option<String>,
    pub solicitante: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

impl SolicitudListQuery {
    pub fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page.unwrap_or_else(default_page),
            page_size: self.page_size.unwrap_or_else(default_page_size),
        }
    }

    /// 转换为仓储筛选条件；estado 接受编码、键名或展示名称
    pub fn filtro(&self) -> Result<SolicitudFiltro> {
        let estado = filtro_texto(self.estado.clone())
            .map(|e| e.parse::<SolicitudEstado>())
            .transpose()
            .map_err(ApiError::Validation)?;

        Ok(SolicitudFiltro {
            estado,
            oficina: filtro_texto(self.oficina.clone()),
            material: filtro_texto(self.material.clone()),
            solicitante: filtro_texto(self.solicitante.clone()),
            oficina_id: None,
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSolicitudRequest {
    pub material_id: i64,
    #[validate(range(min = 1, message = "La cantidad debe ser mayor a cero"))]
    pub cantidad: i32,
    #[validate(length(max = 500, message = "La observación no puede superar 500 caracteres"))]
    pub observacion: Option<String>,
}

/// 全额审批与驳回共用
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ObservacionRequest {
    #[validate(length(max = 500, message = "La observación no puede superar 500 caracteres"))]
    pub observacion: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AprobarParcialRequest {
    #[validate(range(min = 1, message = "La cantidad aprobada debe ser mayor a cero"))]
    pub cantidad_aprobada: i32,
    #[validate(length(max = 500, message = "La observación no puede superar 500 caracteres"))]
    pub observacion: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DevolucionRequest {
    #[validate(range(min = 1, message = "La cantidad devuelta debe ser mayor a cero"))]
    pub cantidad_devuelta: i32,
    #[validate(length(max = 500, message = "La observación no puede superar 500 caracteres"))]
    pub observacion: Option<String>,
}

// ============ 异常上报 ============

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GestionarNovedadRequest {
    pub solicitud_id: i64,
    pub accion: AccionNovedad,
    #[validate(length(max = 1000, message = "Las observaciones no pueden superar 1000 caracteres"))]
    pub observaciones: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ActualizarNovedadRequest {
    pub estado: NovedadEstado,
    #[validate(length(max = 1000, message = "Las observaciones no pueden superar 1000 caracteres"))]
    pub observaciones: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NovedadQuery {
    pub estado: Option<String>,
}

impl NovedadQuery {
    pub fn estado(&self) -> Result<Option<NovedadEstado>> {
        filtro_texto(self.estado.clone())
            .map(|e| e.parse::<NovedadEstado>())
            .transpose()
            .map_err(ApiError::Validation)
    }
}

// ============ 企业库存 ============

fn default_asignable() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductoRequest {
    #[validate(length(max = 50, message = "El código no puede superar 50 caracteres"))]
    pub codigo_unico: Option<String>,
    #[validate(length(min = 1, max = 200, message = "El nombre debe tener entre 1 y 200 caracteres"))]
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria_id: i64,
    pub proveedor_id: i64,
    #[validate(range(min = 0.0, message = "El valor unitario no puede ser negativo"))]
    pub valor_unitario: f64,
    #[validate(range(min = 0, message = "La cantidad no puede ser negativa"))]
    pub cantidad: i32,
    #[validate(range(min = 0, message = "La cantidad mínima no puede ser negativa"))]
    #[serde(default)]
    pub cantidad_minima: i32,
    pub ubicacion: Option<String>,
    #[serde(default = "default_asignable")]
    pub es_asignable: bool,
    pub ruta_imagen: Option<String>,
}

impl CreateProductoRequest {
    pub fn into_nuevo(self, oficina_creadora_id: Option<i64>, usuario: &str) -> NuevoProducto {
        NuevoProducto {
            codigo_unico: self.codigo_unico,
            nombre: self.nombre.trim().to_string(),
            descripcion: self.descripcion,
            categoria_id: self.categoria_id,
            proveedor_id: self.proveedor_id,
            valor_unitario: self.valor_unitario,
            cantidad: self.cantidad,
            cantidad_minima: self.cantidad_minima,
            ubicacion: self.ubicacion,
            es_asignable: self.es_asignable,
            ruta_imagen: self.ruta_imagen,
            oficina_creadora_id,
            usuario_creador: usuario.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductoRequest {
    #[validate(length(min = 1, max = 200, message = "El nombre debe tener entre 1 y 200 caracteres"))]
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria_id: i64,
    pub proveedor_id: i64,
    #[validate(range(min = 0.0, message = "El valor unitario no puede ser negativo"))]
    pub valor_unitario: f64,
    #[validate(range(min = 0, message = "La cantidad no puede ser negativa"))]
    pub cantidad: i32,
    #[validate(range(min = 0, message = "La cantidad mínima no puede ser negativa"))]
    #[serde(default)]
    pub cantidad_minima: i32,
    pub ubicacion: Option<String>,
    #[serde(default = "default_asignable")]
    pub es_asignable: bool,
    /// 为空时保留原图
    pub ruta_imagen: Option<String>,
}

impl From<UpdateProductoRequest> for ActualizacionProducto {
    fn from(req: UpdateProductoRequest) -> Self {
        Self {
            nombre: req.nombre.trim().to_string(),
            descripcion: req.descripcion,
            categoria_id: req.categoria_id,
            proveedor_id: req.proveedor_id,
            valor_unitario: req.valor_unitario,
            cantidad: req.cantidad,
            cantidad_minima: req.cantidad_minima,
            ubicacion: req.ubicacion,
            es_asignable: req.es_asignable,
            ruta_imagen: req.ruta_imagen.filter(|r| !r.trim().is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AsignarProductoRequest {
    pub oficina_id: i64,
    #[validate(range(min = 1, message = "La cantidad a asignar debe ser mayor a cero"))]
    pub cantidad: i32,
    pub usuario_asignado_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductoQuery {
    pub oficina_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MovimientosQuery {
    pub limite: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_bounds() {
        let p = PaginationParams {
            page: 0,
            page_size: 1000,
        };
        assert_eq!(p.page(), 1);
        assert_eq!(p.limit(), 100);
        assert_eq!(p.offset(), 0);

        let p = PaginationParams {
            page: 3,
            page_size: 20,
        };
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn test_huge_page_does_not_overflow() {
        let query = SolicitudListQuery {
            page: Some(i64::MAX),
            page_size: Some(20),
            ..Default::default()
        };
        let p = query.pagination();
        assert_eq!(p.page(), MAX_PAGE);
        assert_eq!(p.offset(), (MAX_PAGE - 1) * 20);

        let p = PaginationParams {
            page: i64::MIN,
            page_size: i64::MAX,
        };
        assert_eq!(p.offset(), 0);
    }

    #[test]
    fn test_solicitud_query_filters() {
        let query = SolicitudListQuery {
            estado: Some("Aprobada Parcial".to_string()),
            oficina: Some("todas".to_string()),
            material: Some("  papel ".to_string()),
            ..Default::default()
        };
        let filtro = query.filtro().unwrap();
        assert_eq!(filtro.estado, Some(SolicitudEstado::AprobadaParcial));
        assert_eq!(filtro.oficina, None);
        assert_eq!(filtro.material.as_deref(), Some("papel"));

        let por_codigo = SolicitudListQuery {
            estado: Some("7".to_string()),
            ..Default::default()
        };
        assert_eq!(
            por_codigo.filtro().unwrap().estado,
            Some(SolicitudEstado::NovedadRegistrada)
        );

        let todos = SolicitudListQuery {
            estado: Some("todos".to_string()),
            ..Default::default()
        };
        assert_eq!(todos.filtro().unwrap().estado, None);

        let invalido = SolicitudListQuery {
            estado: Some("archivada".to_string()),
            ..Default::default()
        };
        assert!(matches!(invalido.filtro(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_create_producto_validation() {
        let req: CreateProductoRequest = serde_json::from_value(serde_json::json!({
            "nombre": "Escritorio",
            "categoriaId": 1,
            "proveedorId": 2,
            "valorUnitario": -5.0,
            "cantidad": 3
        }))
        .unwrap();
        assert!(req.es_asignable);
        assert_eq!(req.cantidad_minima, 0);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_gestionar_request_accion() {
        let req: GestionarNovedadRequest = serde_json::from_value(serde_json::json!({
            "solicitudId": 4,
            "accion": "rechazar"
        }))
        .unwrap();
        assert_eq!(req.accion, AccionNovedad::Rechazar);
        assert!(req.validate().is_ok());
    }
}
