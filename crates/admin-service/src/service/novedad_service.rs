//! 异常上报服务

use std::sync::Arc;

use futures::future::try_join3;
use suministros_shared::observability::metrics;
use tracing::{info, instrument};

use super::cargar_solicitud;
use crate::auth::Claims;
use crate::error::{ApiError, Result};
use crate::models::{
    AccionNovedad, Novedad, NovedadEstado, NovedadFiltro, NovedadStats, NuevaNovedad, Prioridad,
    ResolucionNovedad, Solicitud, SolicitudEstado, TIPOS_NOVEDAD_DEFAULT,
};
use crate::repository::{
    NovedadRepository, NovedadRepositoryTrait, SolicitudRepository, SolicitudRepositoryTrait,
};

/// 登记异常的输入，图片已由上传层保存
#[derive(Debug, Clone)]
pub struct RegistroNovedad {
    pub solicitud_id: i64,
    pub tipo_novedad: String,
    pub descripcion: String,
    pub cantidad_afectada: i32,
    pub prioridad: Prioridad,
    pub ruta_imagen: Option<String>,
}

/// 异常上报服务
pub struct NovedadService<N = NovedadRepository, S = SolicitudRepository>
where
    N: NovedadRepositoryTrait,
    S: SolicitudRepositoryTrait,
{
    novedades: Arc<N>,
    solicitudes: Arc<S>,
}

impl<N, S> NovedadService<N, S>
where
    N: NovedadRepositoryTrait,
    S: SolicitudRepositoryTrait,
{
    pub fn new(novedades: Arc<N>, solicitudes: Arc<S>) -> Self {
        Self {
            novedades,
            solicitudes,
        }
    }

    /// 登记异常，申请单同时进入 Novedad Registrada
    #[instrument(skip(self, claims, registro), fields(solicitud_id = registro.solicitud_id))]
    pub async fn registrar(&self, claims: &Claims, registro: RegistroNovedad) -> Result<i64> {
        let tipo_novedad = registro.tipo_novedad.trim().to_string();
        let descripcion = registro.descripcion.trim().to_string();
        if tipo_novedad.is_empty() {
            return Err(ApiError::Validation(
                "El tipo de novedad es obligatorio".to_string(),
            ));
        }
        if descripcion.is_empty() {
            return Err(ApiError::Validation(
                "La descripción de la novedad es obligatoria".to_string(),
            ));
        }

        let solicitud =
            cargar_solicitud(self.solicitudes.as_ref(), claims, registro.solicitud_id).await?;
        solicitud.validar_novedad(registro.cantidad_afectada)?;

        let nueva = NuevaNovedad {
            solicitud_id: solicitud.id,
            estado_solicitud: solicitud.estado,
            tipo_novedad,
            descripcion,
            cantidad_afectada: registro.cantidad_afectada,
            prioridad: registro.prioridad,
            usuario_registra: claims.nombre_visible().to_string(),
            ruta_imagen: registro.ruta_imagen,
        };
        let id = self.novedades.registrar(&nueva).await?;

        metrics::record_novedad_event("register");
        info!(
            novedad_id = id,
            solicitud_id = solicitud.id,
            tipo = %nueva.tipo_novedad,
            cantidad_afectada = nueva.cantidad_afectada,
            con_imagen = nueva.ruta_imagen.is_some(),
            "Novedad registered"
        );
        Ok(id)
    }

    /// 处理申请单最近一条未关闭的异常
    #[instrument(skip(self, claims, observaciones))]
    pub async fn gestionar(
        &self,
        claims: &Claims,
        solicitud_id: i64,
        accion: AccionNovedad,
        observaciones: Option<String>,
    ) -> Result<i64> {
        let solicitud = cargar_solicitud(self.solicitudes.as_ref(), claims, solicitud_id).await?;
        if solicitud.estado != SolicitudEstado::NovedadRegistrada {
            return Err(ApiError::InvalidStateTransition {
                solicitud_id,
                estado: solicitud.estado.nombre().to_string(),
                accion: "gestionar novedad",
            });
        }

        let novedad = self
            .novedades
            .list_by_solicitud(solicitud_id)
            .await?
            .into_iter()
            .find(|n| n.estado.es_abierta())
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No hay novedades abiertas para la solicitud {}",
                    solicitud_id
                ))
            })?;

        self.resolver(claims, &novedad, accion, observaciones).await?;
        Ok(novedad.id)
    }

    /// 更新未关闭异常的状态；aceptada / rechazada 走处理流程以同步申请单状态
    #[instrument(skip(self, claims, observaciones))]
    pub async fn actualizar(
        &self,
        claims: &Claims,
        id: i64,
        estado: NovedadEstado,
        observaciones: Option<String>,
    ) -> Result<Novedad> {
        // resuelta 没有对应的申请单状态，不能从这里关闭
        if estado == NovedadEstado::Resuelta {
            return Err(ApiError::Validation(
                "Para cerrar una novedad use aceptada o rechazada".to_string(),
            ));
        }

        let novedad = self.detalle(claims, id).await?;
        if !novedad.estado.es_abierta() {
            return Err(ApiError::Conflict(format!(
                "La novedad {} ya fue cerrada como {}",
                id, novedad.estado
            )));
        }

        match estado.resolucion() {
            Some(accion) => {
                self.resolver(claims, &novedad, accion, observaciones).await?;
            }
            None => {
                self.novedades
                    .actualizar_estado(id, estado, claims.nombre_visible(), observaciones)
                    .await?;
                metrics::record_novedad_event("update");
                info!(novedad_id = id, estado = %estado, "Novedad updated");
            }
        }

        self.novedades
            .get(id)
            .await?
            .ok_or(ApiError::NovedadNotFound(id))
    }

    async fn resolver(
        &self,
        claims: &Claims,
        novedad: &Novedad,
        accion: AccionNovedad,
        observaciones: Option<String>,
    ) -> Result<()> {
        let resolucion = ResolucionNovedad {
            novedad_id: novedad.id,
            solicitud_id: novedad.solicitud_id,
            accion,
            usuario: claims.nombre_visible().to_string(),
            observaciones: observaciones
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty()),
        };
        self.novedades.resolver(&resolucion).await?;

        let evento = match accion {
            AccionNovedad::Aceptar => "accept",
            AccionNovedad::Rechazar => "reject",
        };
        metrics::record_novedad_event(evento);
        info!(
            novedad_id = novedad.id,
            solicitud_id = novedad.solicitud_id,
            estado = %accion.estado_novedad(),
            usuario = %resolucion.usuario,
            "Novedad resolved"
        );
        Ok(())
    }

    pub async fn detalle(&self, claims: &Claims, id: i64) -> Result<Novedad> {
        let novedad = self
            .novedades
            .get(id)
            .await?
            .ok_or(ApiError::NovedadNotFound(id))?;
        match claims.office_scope()? {
            Some(oficina_id) if oficina_id != novedad.oficina_id => {
                Err(ApiError::NovedadNotFound(id))
            }
            _ => Ok(novedad),
        }
    }

    /// 列表、统计与类型一并返回
    pub async fn listar(
        &self,
        claims: &Claims,
        estado: Option<NovedadEstado>,
    ) -> Result<(Vec<Novedad>, NovedadStats, Vec<String>)> {
        let oficina_id = claims.office_scope()?;
        let filtro = NovedadFiltro {
            estado,
            solo_abiertas: false,
            oficina_id,
        };
        try_join3(
            self.novedades.list(&filtro),
            self.novedades.stats(oficina_id),
            self.tipos(),
        )
        .await
    }

    pub async fn pendientes(&self, claims: &Claims) -> Result<Vec<Novedad>> {
        let filtro = NovedadFiltro {
            estado: None,
            solo_abiertas: true,
            oficina_id: claims.office_scope()?,
        };
        self.novedades.list(&filtro).await
    }

    pub async fn estadisticas(&self, claims: &Claims) -> Result<NovedadStats> {
        self.novedades.stats(claims.office_scope()?).await
    }

    /// 已使用过的类型；尚无记录时返回默认类型
    pub async fn tipos(&self) -> Result<Vec<String>> {
        let tipos = self.novedades.tipos().await?;
        if tipos.is_empty() {
            return Ok(TIPOS_NOVEDAD_DEFAULT.iter().map(|t| t.to_string()).collect());
        }
        Ok(tipos)
    }

    /// 申请单最近一条异常
    pub async fn ultima_de_solicitud(
        &self,
        claims: &Claims,
        solicitud_id: i64,
    ) -> Result<Option<Novedad>> {
        cargar_solicitud(self.solicitudes.as_ref(), claims, solicitud_id).await?;
        let novedades = self.novedades.list_by_solicitud(solicitud_id).await?;
        Ok(novedades.into_iter().next())
    }

    /// 申请单及其全部异常
    pub async fn detalles_solicitud(
        &self,
        claims: &Claims,
        solicitud_id: i64,
    ) -> Result<(Solicitud, Vec<Novedad>)> {
        let solicitud = cargar_solicitud(self.solicitudes.as_ref(), claims, solicitud_id).await?;
        let novedades = self.novedades.list_by_solicitud(solicitud_id).await?;
        Ok((solicitud, novedades))
    }
}
