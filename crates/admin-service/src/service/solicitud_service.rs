//! 物资申请服务
//!
//! 审批、部分审批、驳回与退回的前置条件由 `Solicitud` 上的规则方法计算，
//! 仓储在单个事务内执行库存与状态变更。

use std::sync::Arc;

use futures::future::try_join3;
use suministros_shared::observability::metrics;
use tracing::{info, instrument, warn};

use super::cargar_solicitud;
use crate::auth::Claims;
use crate::error::{ApiError, Result};
use crate::models::{
    DevolucionSolicitud, Material, NuevaSolicitud, ResumenSolicitudes, Solicitud,
    SolicitudEstado, SolicitudFiltro, ValoresSolicitud,
};
use crate::repository::{SolicitudRepository, SolicitudRepositoryTrait};

/// 分页列表及同一筛选条件下的汇总
#[derive(Debug, Clone)]
pub struct ListadoSolicitudes {
    pub items: Vec<Solicitud>,
    pub total: i64,
    pub resumen: ResumenSolicitudes,
    /// 当前用户可见的机构名称，用于筛选下拉框
    pub oficinas: Vec<String>,
}

/// 物资申请服务
pub struct SolicitudService<R = SolicitudRepository>
where
    R: SolicitudRepositoryTrait,
{
    repo: Arc<R>,
}

impl<R> SolicitudService<R>
where
    R: SolicitudRepositoryTrait,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// 分页查询；没有 read_all 权限时强制限定为本机构
    #[instrument(skip(self, claims, filtro))]
    pub async fn listar(
        &self,
        claims: &Claims,
        mut filtro: SolicitudFiltro,
        limit: i64,
        offset: i64,
    ) -> Result<ListadoSolicitudes> {
        filtro.oficina_id = claims.office_scope()?;

        let (items, total, resumen) = try_join3(
            self.repo.list(&filtro, limit, offset),
            self.repo.count(&filtro),
            self.repo.resumen(&filtro),
        )
        .await?;
        let oficinas = self.repo.oficinas_con_solicitudes(filtro.oficina_id).await?;

        Ok(ListadoSolicitudes {
            items,
            total,
            resumen,
            oficinas,
        })
    }

    pub async fn detalle(&self, claims: &Claims, id: i64) -> Result<Solicitud> {
        cargar_solicitud(self.repo.as_ref(), claims, id).await
    }

    pub async fn materiales(&self) -> Result<Vec<Material>> {
        self.repo.list_materiales().await
    }

    /// 以当前用户及其机构创建申请，金额按机构承担比例拆分
    #[instrument(skip(self, claims, observacion), fields(user = %claims.username))]
    pub async fn crear(
        &self,
        claims: &Claims,
        material_id: i64,
        cantidad: i32,
        observacion: Option<String>,
    ) -> Result<i64> {
        if cantidad <= 0 {
            return Err(ApiError::Validation(
                "La cantidad solicitada debe ser mayor a cero".to_string(),
            ));
        }
        let oficina_id = claims.oficina_id.ok_or_else(|| {
            ApiError::Forbidden("El usuario no tiene una oficina asignada".to_string())
        })?;

        let material = self
            .repo
            .get_material(material_id)
            .await?
            .filter(|m| m.activo)
            .ok_or(ApiError::MaterialNotFound(material_id))?;
        let oficina = self
            .repo
            .get_oficina(oficina_id)
            .await?
            .filter(|o| o.activo)
            .ok_or(ApiError::OficinaNotFound(oficina_id))?;

        let nueva = NuevaSolicitud {
            material_id,
            oficina_id,
            usuario_id: claims.user_id()?,
            cantidad,
            porcentaje_oficina: oficina.porcentaje_oficina,
            valores: ValoresSolicitud::calcular(
                cantidad,
                material.valor_unitario,
                oficina.porcentaje_oficina,
            ),
            observacion: normalizar(observacion),
        };

        let id = self.repo.create(&nueva).await?;
        metrics::record_solicitud_transition("create", "success");
        info!(
            solicitud_id = id,
            material_id,
            oficina_id,
            cantidad,
            valor_total = nueva.valores.total,
            "Solicitud created"
        );
        Ok(id)
    }

    /// 全额审批
    #[instrument(skip(self, claims, observacion))]
    pub async fn aprobar(
        &self,
        claims: &Claims,
        id: i64,
        observacion: Option<String>,
    ) -> Result<SolicitudEstado> {
        let solicitud = self.detalle(claims, id).await?;
        let stock = self.stock_material(solicitud.material_id).await?;

        let plan = solicitud.planificar_aprobacion(
            stock,
            claims.user_id()?,
            normalizar(observacion),
        );
        let plan = registrar_rechazo_previo("approve", plan)?;

        let result = self.repo.aprobar(&plan).await;
        registrar_resultado("approve", &result);
        result?;

        info!(
            solicitud_id = id,
            cantidad = plan.cantidad,
            aprobador = %claims.username,
            "Solicitud approved"
        );
        Ok(plan.nuevo_estado)
    }

    /// 部分审批
    #[instrument(skip(self, claims, observacion))]
    pub async fn aprobar_parcial(
        &self,
        claims: &Claims,
        id: i64,
        cantidad: i32,
        observacion: Option<String>,
    ) -> Result<SolicitudEstado> {
        let solicitud = self.detalle(claims, id).await?;
        let stock = self.stock_material(solicitud.material_id).await?;

        let plan = solicitud.planificar_aprobacion_parcial(
            cantidad,
            stock,
            claims.user_id()?,
            normalizar(observacion),
        );
        let plan = registrar_rechazo_previo("approve_partial", plan)?;

        let result = self.repo.aprobar(&plan).await;
        registrar_resultado("approve_partial", &result);
        result?;

        info!(
            solicitud_id = id,
            cantidad,
            solicitada = solicitud.cantidad_solicitada,
            estado = %plan.nuevo_estado,
            "Solicitud partially approved"
        );
        Ok(plan.nuevo_estado)
    }

    #[instrument(skip(self, claims, observacion))]
    pub async fn rechazar(
        &self,
        claims: &Claims,
        id: i64,
        observacion: Option<String>,
    ) -> Result<()> {
        let solicitud = self.detalle(claims, id).await?;
        let plan = solicitud.planificar_rechazo(claims.user_id()?, normalizar(observacion));
        let plan = registrar_rechazo_previo("reject", plan)?;

        let result = self.repo.rechazar(&plan).await;
        registrar_resultado("reject", &result);
        result?;

        info!(solicitud_id = id, aprobador = %claims.username, "Solicitud rejected");
        Ok(())
    }

    /// 退回已发放的物资并回补库存
    #[instrument(skip(self, claims, observacion))]
    pub async fn devolver(
        &self,
        claims: &Claims,
        id: i64,
        cantidad: i32,
        observacion: Option<String>,
    ) -> Result<DevolucionSolicitud> {
        let solicitud = self.detalle(claims, id).await?;
        let plan = solicitud.planificar_devolucion(
            cantidad,
            claims.nombre_visible(),
            normalizar(observacion),
        );
        let plan = registrar_rechazo_previo("return", plan)?;

        let result = self.repo.registrar_devolucion(&plan).await;
        registrar_resultado("return", &result);
        result?;

        info!(
            solicitud_id = id,
            cantidad,
            estado = %plan.nuevo_estado,
            "Solicitud return registered"
        );
        Ok(plan)
    }

    async fn stock_material(&self, material_id: i64) -> Result<i32> {
        self.repo
            .get_material(material_id)
            .await?
            .map(|m| m.cantidad_disponible)
            .ok_or(ApiError::MaterialNotFound(material_id))
    }
}

fn normalizar(texto: Option<String>) -> Option<String> {
    texto
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// 前置校验失败时记录指标后原样返回
fn registrar_rechazo_previo<T>(accion: &str, plan: Result<T>) -> Result<T> {
    if let Err(e) = &plan {
        warn!(accion, error = %e, "Solicitud transition refused");
        metrics::record_solicitud_transition(accion, e.error_code());
    }
    plan
}

fn registrar_resultado(accion: &str, result: &Result<()>) {
    match result {
        Ok(()) => metrics::record_solicitud_transition(accion, "success"),
        Err(e) => {
            warn!(accion, error = %e, "Solicitud transition failed");
            metrics::record_solicitud_transition(accion, e.error_code());
        }
    }
}
