//! 异常上报模型

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::enums::{AccionNovedad, NovedadEstado, Prioridad, SolicitudEstado};

/// 没有历史记录时提供的异常类型
pub const TIPOS_NOVEDAD_DEFAULT: [&str; 4] = ["Daño", "Faltante", "Error en cantidad", "Otro"];

/// 异常上报（含所属申请单的物资与机构信息）
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Novedad {
    pub id: i64,
    pub solicitud_id: i64,
    pub tipo_novedad: String,
    pub descripcion: String,
    pub cantidad_afectada: i32,
    pub estado: NovedadEstado,
    pub prioridad: Prioridad,
    pub usuario_registra: String,
    pub fecha_registro: DateTime<Utc>,
    pub usuario_resuelve: Option<String>,
    pub fecha_resolucion: Option<DateTime<Utc>>,
    pub observaciones_resolucion: Option<String>,
    pub ruta_imagen: Option<String>,
    pub material_id: i64,
    pub material_nombre: String,
    pub cantidad_solicitada: i32,
    pub cantidad_entregada: i32,
    pub oficina_id: i64,
    pub oficina_nombre: String,
}

/// 异常统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NovedadStats {
    pub total: i64,
    /// registrada 与 pendiente
    pub pendientes: i64,
    pub en_proceso: i64,
    /// resuelta、aceptada 与 rechazada
    pub resueltas: i64,
}

/// 新登记的异常
#[derive(Debug, Clone, PartialEq)]
pub struct NuevaNovedad {
    pub solicitud_id: i64,
    /// 登记时申请单所处状态，用于并发保护
    pub estado_solicitud: SolicitudEstado,
    pub tipo_novedad: String,
    pub descripcion: String,
    pub cantidad_afectada: i32,
    pub prioridad: Prioridad,
    pub usuario_registra: String,
    pub ruta_imagen: Option<String>,
}

/// 异常处理结果
#[derive(Debug, Clone, PartialEq)]
pub struct ResolucionNovedad {
    pub novedad_id: i64,
    pub solicitud_id: i64,
    pub accion: AccionNovedad,
    pub usuario: String,
    pub observaciones: Option<String>,
}

/// 异常列表筛选
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NovedadFiltro {
    pub estado: Option<NovedadEstado>,
    /// 只返回未处理完毕的异常
    pub solo_abiertas: bool,
    pub oficina_id: Option<i64>,
}
