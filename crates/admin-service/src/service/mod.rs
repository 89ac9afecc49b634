//! 服务层
//!
//! 组合仓储调用与模型上的业务规则，处理机构可见范围、日志与指标。
//!
//! - `solicitud_service`: 物资申请的创建、审批、驳回与退回
//! - `novedad_service`: 异常上报的登记、处理与查询
//! - `inventario_service`: 企业库存产品、分配与报表

pub mod inventario_service;
pub mod novedad_service;
pub mod solicitud_service;

pub use inventario_service::InventarioService;
pub use novedad_service::{NovedadService, RegistroNovedad};
pub use solicitud_service::{ListadoSolicitudes, SolicitudService};

use crate::auth::Claims;
use crate::error::{ApiError, Result};
use crate::models::Solicitud;
use crate::repository::SolicitudRepositoryTrait;

/// 加载申请单并校验可见范围；越权访问按不存在处理
pub(crate) async fn cargar_solicitud<R>(repo: &R, claims: &Claims, id: i64) -> Result<Solicitud>
where
    R: SolicitudRepositoryTrait + ?Sized,
{
    let solicitud = repo
        .get(id)
        .await?
        .ok_or(ApiError::SolicitudNotFound(id))?;

    match claims.office_scope()? {
        Some(oficina_id) if oficina_id != solicitud.oficina_id => {
            Err(ApiError::SolicitudNotFound(id))
        }
        _ => Ok(solicitud),
    }
}
