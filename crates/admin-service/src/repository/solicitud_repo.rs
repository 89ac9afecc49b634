//! 物资申请仓储
//!
//! 申请单查询、审批、拒绝与退回的数据访问

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::SolicitudRepositoryTrait;
use super::{FilterValue, WhereBuilder, bind_filters, bind_scalar_filters, like_pattern};
use crate::error::{ApiError, Result};
use crate::models::{
    AprobacionSolicitud, DevolucionSolicitud, Material, NuevaSolicitud, Oficina,
    RechazoSolicitud, ResumenSolicitudes, Solicitud, SolicitudEstado, SolicitudFiltro,
};

/// 申请单、物资、机构、申请人与审批人的连接
const FROM_SOLICITUDES: &str = r#"
    FROM SolicitudesMaterial s
    INNER JOIN Materiales m ON m.MaterialId = s.MaterialId
    INNER JOIN Oficinas o ON o.OficinaId = s.OficinaSolicitanteId
    INNER JOIN Usuarios us ON us.UsuarioId = s.UsuarioSolicitanteId
    LEFT JOIN Usuarios ua ON ua.UsuarioId = s.AprobadorId
"#;

const SELECT_SOLICITUD: &str = r#"
    SELECT
        s.SolicitudId AS id,
        s.EstadoId AS estado,
        s.MaterialId AS material_id,
        m.NombreElemento AS material_nombre,
        s.CantidadSolicitada AS cantidad_solicitada,
        s.CantidadEntregada AS cantidad_entregada,
        s.CantidadDevuelta AS cantidad_devuelta,
        s.OficinaSolicitanteId AS oficina_id,
        o.NombreOficina AS oficina_nombre,
        s.UsuarioSolicitanteId AS usuario_solicitante_id,
        COALESCE(us.NombreCompleto, us.NombreUsuario) AS usuario_solicitante,
        s.FechaSolicitud AS fecha_solicitud,
        s.FechaAprobacion AS fecha_aprobacion,
        s.FechaUltimaEntrega AS fecha_ultima_entrega,
        s.PorcentajeOficina AS porcentaje_oficina,
        s.ValorTotalSolicitado AS valor_total_solicitado,
        s.ValorOficina AS valor_oficina,
        s.ValorSedePrincipal AS valor_sede_principal,
        s.AprobadorId AS aprobador_id,
        COALESCE(ua.NombreCompleto, ua.NombreUsuario) AS aprobador_nombre,
        s.Observacion AS observacion,
        n.NovedadId AS novedad_id,
        n.EstadoNovedad AS estado_novedad,
        n.TipoNovedad AS tipo_novedad,
        n.Descripcion AS novedad_descripcion,
        n.CantidadAfectada AS cantidad_afectada
"#;

/// 每个申请单最近一次异常
const LATEST_NOVEDAD: &str = r#"
    LEFT JOIN LATERAL (
        SELECT ns.NovedadId, ns.EstadoNovedad, ns.TipoNovedad, ns.Descripcion, ns.CantidadAfectada
        FROM NovedadesSolicitudes ns
        WHERE ns.SolicitudId = s.SolicitudId
        ORDER BY ns.FechaRegistro DESC, ns.NovedadId DESC
        LIMIT 1
    ) n ON TRUE
"#;

/// 物资申请仓储
pub struct SolicitudRepository {
    pool: PgPool,
}

impl SolicitudRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn build_where(filtro: &SolicitudFiltro) -> WhereBuilder {
        let mut builder = WhereBuilder::new();

        if let Some(estado) = filtro.estado {
            builder.push("s.EstadoId = {}", FilterValue::Int(estado.codigo()));
        }
        if let Some(oficina) = filtro.oficina.as_deref().filter(|s| !s.trim().is_empty()) {
            builder.push(
                "o.NombreOficina = {}",
                FilterValue::Text(oficina.trim().to_string()),
            );
        }
        if let Some(material) = filtro.material.as_deref().filter(|s| !s.trim().is_empty()) {
            builder.push(
                "m.NombreElemento ILIKE {}",
                FilterValue::Text(like_pattern(material)),
            );
        }
        if let Some(solicitante) = filtro
            .solicitante
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            builder.push(
                "COALESCE(us.NombreCompleto, us.NombreUsuario) ILIKE {}",
                FilterValue::Text(like_pattern(solicitante)),
            );
        }
        if let Some(oficina_id) = filtro.oficina_id {
            builder.push("s.OficinaSolicitanteId = {}", FilterValue::BigInt(oficina_id));
        }

        builder
    }
}

#[async_trait]
impl SolicitudRepositoryTrait for SolicitudRepository {
    async fn list(
        &self,
        filtro: &SolicitudFiltro,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Solicitud>> {
        let builder = Self::build_where(filtro);
        let limit_idx = builder.next_placeholder();
        let sql = format!(
            "{} {} {} {} ORDER BY s.FechaSolicitud DESC, s.SolicitudId DESC LIMIT ${} OFFSET ${}",
            SELECT_SOLICITUD,
            FROM_SOLICITUDES,
            LATEST_NOVEDAD,
            builder.clause(),
            limit_idx,
            limit_idx + 1
        );

        let query = bind_filters(sqlx::query_as::<_, Solicitud>(&sql), builder.binds());
        let rows = query.bind(limit).bind(offset).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn count(&self, filtro: &SolicitudFiltro) -> Result<i64> {
        let builder = Self::build_where(filtro);
        let sql = format!("SELECT COUNT(*) {} {}", FROM_SOLICITUDES, builder.clause());

        let total = bind_scalar_filters(sqlx::query_scalar::<_, i64>(&sql), builder.binds())
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    async fn resumen(&self, filtro: &SolicitudFiltro) -> Result<ResumenSolicitudes> {
        let builder = Self::build_where(filtro);
        let sql = format!(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE s.EstadoId = 1) AS pendientes,
                COUNT(*) FILTER (WHERE s.EstadoId IN (2, 4)) AS aprobadas,
                COUNT(*) FILTER (WHERE s.EstadoId = 3) AS rechazadas,
                COUNT(*) FILTER (WHERE s.EstadoId IN (5, 6)) AS devueltas,
                COUNT(*) FILTER (WHERE s.EstadoId IN (7, 8, 9)) AS novedades
            {} {}
            "#,
            FROM_SOLICITUDES,
            builder.clause()
        );

        let resumen = bind_filters(sqlx::query_as::<_, ResumenSolicitudes>(&sql), builder.binds())
            .fetch_one(&self.pool)
            .await?;
        Ok(resumen)
    }

    async fn oficinas_con_solicitudes(&self, oficina_id: Option<i64>) -> Result<Vec<String>> {
        let oficinas = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT o.NombreOficina
            FROM SolicitudesMaterial s
            INNER JOIN Oficinas o ON o.OficinaId = s.OficinaSolicitanteId
            WHERE ($1::BIGINT IS NULL OR s.OficinaSolicitanteId = $1)
            ORDER BY o.NombreOficina
            "#,
        )
        .bind(oficina_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(oficinas)
    }

    async fn get(&self, id: i64) -> Result<Option<Solicitud>> {
        let sql = format!(
            "{} {} {} WHERE s.SolicitudId = $1",
            SELECT_SOLICITUD, FROM_SOLICITUDES, LATEST_NOVEDAD
        );
        let solicitud = sqlx::query_as::<_, Solicitud>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(solicitud)
    }

    async fn get_material(&self, id: i64) -> Result<Option<Material>> {
        let material = sqlx::query_as::<_, Material>(
            r#"
            SELECT MaterialId AS id, NombreElemento AS nombre, ValorUnitario AS valor_unitario,
                   CantidadDisponible AS cantidad_disponible, Activo AS activo
            FROM Materiales
            WHERE MaterialId = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(material)
    }

    async fn list_materiales(&self) -> Result<Vec<Material>> {
        let materiales = sqlx::query_as::<_, Material>(
            r#"
            SELECT MaterialId AS id, NombreElemento AS nombre, ValorUnitario AS valor_unitario,
                   CantidadDisponible AS cantidad_disponible, Activo AS activo
            FROM Materiales
            WHERE Activo = TRUE
            ORDER BY NombreElemento
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(materiales)
    }

    async fn get_oficina(&self, id: i64) -> Result<Option<Oficina>> {
        let oficina = sqlx::query_as::<_, Oficina>(
            r#"
            SELECT OficinaId AS id, NombreOficina AS nombre, PorcentajeOficina AS porcentaje_oficina,
                   EsSedePrincipal AS es_sede_principal, Activo AS activo
            FROM Oficinas
            WHERE OficinaId = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(oficina)
    }

    async fn create(&self, nueva: &NuevaSolicitud) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO SolicitudesMaterial (
                MaterialId, OficinaSolicitanteId, UsuarioSolicitanteId, EstadoId,
                CantidadSolicitada, PorcentajeOficina, ValorTotalSolicitado,
                ValorOficina, ValorSedePrincipal, Observacion
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING SolicitudId
            "#,
        )
        .bind(nueva.material_id)
        .bind(nueva.oficina_id)
        .bind(nueva.usuario_id)
        .bind(SolicitudEstado::Pendiente)
        .bind(nueva.cantidad)
        .bind(nueva.porcentaje_oficina)
        .bind(nueva.valores.total)
        .bind(nueva.valores.oficina)
        .bind(nueva.valores.sede_principal)
        .bind(&nueva.observacion)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn aprobar(&self, aprobacion: &AprobacionSolicitud) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // 条件扣减：库存不足时不更新任何行
        let debit = sqlx::query(
            r#"
            UPDATE Materiales
            SET CantidadDisponible = CantidadDisponible - $2
            WHERE MaterialId = $1 AND CantidadDisponible >= $2
            "#,
        )
        .bind(aprobacion.material_id)
        .bind(aprobacion.cantidad)
        .execute(&mut *tx)
        .await?;

        if debit.rows_affected() == 0 {
            let disponible = sqlx::query_scalar::<_, i32>(
                "SELECT CantidadDisponible FROM Materiales WHERE MaterialId = $1",
            )
            .bind(aprobacion.material_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Err(ApiError::InsufficientStock {
                disponible: disponible.unwrap_or(0),
                requerido: aprobacion.cantidad,
            });
        }

        let updated = sqlx::query(
            r#"
            UPDATE SolicitudesMaterial
            SET EstadoId = $2,
                CantidadEntregada = $3,
                AprobadorId = $4,
                FechaAprobacion = NOW(),
                FechaUltimaEntrega = NOW(),
                Observacion = COALESCE($5, Observacion)
            WHERE SolicitudId = $1 AND EstadoId = $6
            "#,
        )
        .bind(aprobacion.solicitud_id)
        .bind(aprobacion.nuevo_estado)
        .bind(aprobacion.cantidad)
        .bind(aprobacion.aprobador_id)
        .bind(&aprobacion.observacion)
        .bind(aprobacion.estado_anterior)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ConcurrentModification(format!(
                "solicitud {}",
                aprobacion.solicitud_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn rechazar(&self, rechazo: &RechazoSolicitud) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE SolicitudesMaterial
            SET EstadoId = $2,
                AprobadorId = $3,
                FechaAprobacion = NOW(),
                Observacion = COALESCE($4, Observacion)
            WHERE SolicitudId = $1 AND EstadoId = $5
            "#,
        )
        .bind(rechazo.solicitud_id)
        .bind(SolicitudEstado::Rechazada)
        .bind(rechazo.aprobador_id)
        .bind(&rechazo.observacion)
        .bind(SolicitudEstado::Pendiente)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::ConcurrentModification(format!(
                "solicitud {}",
                rechazo.solicitud_id
            )));
        }
        Ok(())
    }

    async fn registrar_devolucion(&self, devolucion: &DevolucionSolicitud) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE SolicitudesMaterial
            SET CantidadDevuelta = CantidadDevuelta + $2,
                EstadoId = $3
            WHERE SolicitudId = $1
              AND EstadoId = $4
              AND CantidadDevuelta + $2 <= CantidadEntregada
            "#,
        )
        .bind(devolucion.solicitud_id)
        .bind(devolucion.cantidad)
        .bind(devolucion.nuevo_estado)
        .bind(devolucion.estado_anterior)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ConcurrentModification(format!(
                "solicitud {}",
                devolucion.solicitud_id
            )));
        }

        sqlx::query(
            r#"
            UPDATE Materiales
            SET CantidadDisponible = CantidadDisponible + $2
            WHERE MaterialId = $1
            "#,
        )
        .bind(devolucion.material_id)
        .bind(devolucion.cantidad)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO DevolucionesSolicitudes (SolicitudId, Cantidad, UsuarioDevolucion, Observacion)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(devolucion.solicitud_id)
        .bind(devolucion.cantidad)
        .bind(&devolucion.usuario)
        .bind(&devolucion.observacion)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
