//! 物资申请单模型与状态流转规则

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::enums::{NovedadEstado, SolicitudEstado};
use crate::error::{ApiError, Result};

/// 申请单（含物资、机构、申请人、审批人名称及最近一次异常）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Solicitud {
    pub id: i64,
    pub estado: SolicitudEstado,
    pub material_id: i64,
    pub material_nombre: String,
    pub cantidad_solicitada: i32,
    pub cantidad_entregada: i32,
    pub cantidad_devuelta: i32,
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
    pub novedad_id: Option<i64>,
    pub estado_novedad: Option<NovedadEstado>,
    pub tipo_novedad: Option<String>,
    pub novedad_descripcion: Option<String>,
    pub cantidad_afectada: Option<i32>,
}

/// 审批结果（全额或部分）
#[derive(Debug, Clone, PartialEq)]
pub struct AprobacionSolicitud {
    pub solicitud_id: i64,
    pub material_id: i64,
    pub cantidad: i32,
    pub estado_anterior: SolicitudEstado,
    pub nuevo_estado: SolicitudEstado,
    pub aprobador_id: i64,
    pub observacion: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RechazoSolicitud {
    pub solicitud_id: i64,
    pub aprobador_id: i64,
    pub observacion: Option<String>,
}

/// 退回登记
#[derive(Debug, Clone, PartialEq)]
pub struct DevolucionSolicitud {
    pub solicitud_id: i64,
    pub material_id: i64,
    pub cantidad: i32,
    pub estado_anterior: SolicitudEstado,
    pub nuevo_estado: SolicitudEstado,
    pub usuario: String,
    pub observacion: Option<String>,
}

impl Solicitud {
    /// 已发放但尚未退回的数量
    pub fn cantidad_pendiente_devolucion(&self) -> i32 {
        (self.cantidad_entregada - self.cantidad_devuelta).max(0)
    }

    fn ensure_estado(&self, permitido: bool, accion: &'static str) -> Result<()> {
        if permitido {
            Ok(())
        } else {
            Err(ApiError::InvalidStateTransition {
                solicitud_id: self.id,
                estado: self.estado.nombre().to_string(),
                accion,
            })
        }
    }

    /// 全额审批：发放数量等于申请数量
    pub fn planificar_aprobacion(
        &self,
        stock_disponible: i32,
        aprobador_id: i64,
        observacion: Option<String>,
    ) -> Result<AprobacionSolicitud> {
        self.ensure_estado(self.estado.permite_decision(), "aprobar")?;
        self.plan_entrega(self.cantidad_solicitada, stock_disponible, aprobador_id, observacion)
    }

    /// 部分审批：0 < cantidad <= 申请数量；等于申请数量时按全额处理
    pub fn planificar_aprobacion_parcial(
        &self,
        cantidad: i32,
        stock_disponible: i32,
        aprobador_id: i64,
        observacion: Option<String>,
    ) -> Result<AprobacionSolicitud> {
        self.ensure_estado(self.estado.permite_decision(), "aprobar parcialmente")?;
        if cantidad <= 0 {
            return Err(ApiError::Validation(
                "La cantidad aprobada debe ser mayor a cero".to_string(),
            ));
        }
        if cantidad > self.cantidad_solicitada {
            return Err(ApiError::Validation(format!(
                "La cantidad aprobada ({}) supera la solicitada ({})",
                cantidad, self.cantidad_solicitada
            )));
        }
        self.plan_entrega(cantidad, stock_disponible, aprobador_id, observacion)
    }

    fn plan_entrega(
        &self,
        cantidad: i32,
        stock_disponible: i32,
        aprobador_id: i64,
        observacion: Option<String>,
    ) -> Result<AprobacionSolicitud> {
        if stock_disponible < cantidad {
            return Err(ApiError::InsufficientStock {
                disponible: stock_disponible,
                requerido: cantidad,
            });
        }
        let nuevo_estado = if cantidad == self.cantidad_solicitada {
            SolicitudEstado::Aprobada
        } else {
            SolicitudEstado::AprobadaParcial
        };
        Ok(AprobacionSolicitud {
            solicitud_id: self.id,
            material_id: self.material_id,
            cantidad,
            estado_anterior: self.estado,
            nuevo_estado,
            aprobador_id,
            observacion,
        })
    }

    pub fn planificar_rechazo(
        &self,
        aprobador_id: i64,
        observacion: Option<String>,
    ) -> Result<RechazoSolicitud> {
        self.ensure_estado(self.estado.permite_decision(), "rechazar")?;
        Ok(RechazoSolicitud {
            solicitud_id: self.id,
            aprobador_id,
            observacion,
        })
    }

    /// 退回：0 < cantidad <= 已发放 - 已退回；全部退回后状态为 Devuelta
    pub fn planificar_devolucion(
        &self,
        cantidad: i32,
        usuario: &str,
        observacion: Option<String>,
    ) -> Result<DevolucionSolicitud> {
        self.ensure_estado(self.estado.permite_devolucion(), "registrar devolución")?;
        let pendiente = self.cantidad_pendiente_devolucion();
        if cantidad <= 0 {
            return Err(ApiError::Validation(
                "La cantidad devuelta debe ser mayor a cero".to_string(),
            ));
        }
        if cantidad > pendiente {
            return Err(ApiError::Validation(format!(
                "La cantidad devuelta ({}) supera la pendiente por devolver ({})",
                cantidad, pendiente
            )));
        }
        let nuevo_estado = if cantidad == pendiente {
            SolicitudEstado::Devuelta
        } else {
            SolicitudEstado::DevolucionParcial
        };
        Ok(DevolucionSolicitud {
            solicitud_id: self.id,
            material_id: self.material_id,
            cantidad,
            estado_anterior: self.estado,
            nuevo_estado,
            usuario: usuario.to_string(),
            observacion,
        })
    }

    /// 异常登记前置校验：0 < 受影响数量 <= 已发放数量
    pub fn validar_novedad(&self, cantidad_afectada: i32) -> Result<()> {
        self.ensure_estado(self.estado.permite_novedad(), "registrar novedad")?;
        if cantidad_afectada <= 0 {
            return Err(ApiError::Validation(
                "La cantidad afectada debe ser mayor a cero".to_string(),
            ));
        }
        if cantidad_afectada > self.cantidad_entregada {
            return Err(ApiError::Validation(format!(
                "La cantidad afectada ({}) supera la entregada ({})",
                cantidad_afectada, self.cantidad_entregada
            )));
        }
        Ok(())
    }
}

/// 申请金额拆分
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValoresSolicitud {
    pub total: f64,
    pub oficina: f64,
    pub sede_principal: f64,
}

impl ValoresSolicitud {
    /// 总额按机构承担比例拆分，保留两位小数，sede_principal 取差额保证两者之和等于总额
    pub fn calcular(cantidad: i32, valor_unitario: f64, porcentaje_oficina: f64) -> Self {
        let total = redondear(cantidad as f64 * valor_unitario);
        let oficina = redondear(total * porcentaje_oficina.clamp(0.0, 100.0) / 100.0);
        Self {
            total,
            oficina,
            sede_principal: redondear(total - oficina),
        }
    }
}

fn redondear(valor: f64) -> f64 {
    (valor * 100.0).round() / 100.0
}

/// 新建申请单
#[derive(Debug, Clone, PartialEq)]
pub struct NuevaSolicitud {
    pub material_id: i64,
    pub oficina_id: i64,
    pub usuario_id: i64,
    pub cantidad: i32,
    pub porcentaje_oficina: f64,
    pub valores: ValoresSolicitud,
    pub observacion: Option<String>,
}

/// 列表筛选条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolicitudFiltro {
    pub estado: Option<SolicitudEstado>,
    /// 机构名称精确匹配
    pub oficina: Option<String>,
    /// 物资名称模糊匹配
    pub material: Option<String>,
    /// 申请人姓名模糊匹配
    pub solicitante: Option<String>,
    /// 数据范围：仅限该机构
    pub oficina_id: Option<i64>,
}

/// 物资
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    pub id: i64,
    pub nombre: String,
    pub valor_unitario: f64,
    pub cantidad_disponible: i32,
    pub activo: bool,
}

/// 状态汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResumenSolicitudes {
    pub total: i64,
    pub pendientes: i64,
    /// 全额与部分审批
    pub aprobadas: i64,
    pub rechazadas: i64,
    /// 全部与部分退回
    pub devueltas: i64,
    pub novedades: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn solicitud(id: i64, estado: SolicitudEstado) -> Solicitud {
        Solicitud {
            id,
            estado,
            material_id: 10,
            material_nombre: "Resma de papel".to_string(),
            cantidad_solicitada: 10,
            cantidad_entregada: 0,
            cantidad_devuelta: 0,
            oficina_id: 3,
            oficina_nombre: "Oficina Norte".to_string(),
            usuario_solicitante_id: 7,
            usuario_solicitante: "Ana Ruiz".to_string(),
            fecha_solicitud: Utc::now(),
            fecha_aprobacion: None,
            fecha_ultima_entrega: None,
            porcentaje_oficina: 40.0,
            valor_total_solicitado: 100.0,
            valor_oficina: 40.0,
            valor_sede_principal: 60.0,
            aprobador_id: None,
            aprobador_nombre: None,
            observacion: None,
            novedad_id: None,
            estado_novedad: None,
            tipo_novedad: None,
            novedad_descripcion: None,
            cantidad_afectada: None,
        }
    }

    pub fn entregada(id: i64, estado: SolicitudEstado, entregada: i32, devuelta: i32) -> Solicitud {
        Solicitud {
            cantidad_entregada: entregada,
            cantidad_devuelta: devuelta,
            ..solicitud(id, estado)
        }
    }
}
