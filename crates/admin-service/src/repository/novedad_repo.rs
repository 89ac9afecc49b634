//! 异常上报仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::NovedadRepositoryTrait;
use super::{FilterValue, WhereBuilder, bind_filters};
use crate::error::{ApiError, Result};
use crate::models::{
    Novedad, NovedadEstado, NovedadFiltro, NovedadStats, NuevaNovedad, ResolucionNovedad,
    SolicitudEstado,
};

const SELECT_NOVEDAD: &str = r#"
    SELECT
        n.NovedadId AS id,
        n.SolicitudId AS solicitud_id,
        n.TipoNovedad AS tipo_novedad,
        n.Descripcion AS descripcion,
        n.CantidadAfectada AS cantidad_afectada,
        n.EstadoNovedad AS estado,
        n.Prioridad AS prioridad,
        n.UsuarioRegistra AS usuario_registra,
        n.FechaRegistro AS fecha_registro,
        n.UsuarioResuelve AS usuario_resuelve,
        n.FechaResolucion AS fecha_resolucion,
        n.ObservacionesResolucion AS observaciones_resolucion,
        n.RutaImagen AS ruta_imagen,
        s.MaterialId AS material_id,
        m.NombreElemento AS material_nombre,
        s.CantidadSolicitada AS cantidad_solicitada,
        s.CantidadEntregada AS cantidad_entregada,
        s.OficinaSolicitanteId AS oficina_id,
        o.NombreOficina AS oficina_nombre
    FROM NovedadesSolicitudes n
    INNER JOIN SolicitudesMaterial s ON s.SolicitudId = n.SolicitudId
    INNER JOIN Materiales m ON m.MaterialId = s.MaterialId
    INNER JOIN Oficinas o ON o.OficinaId = s.OficinaSolicitanteId
"#;

const ESTADOS_ABIERTOS: &str = "('registrada', 'pendiente', 'en_proceso')";

/// 异常上报仓储
pub struct NovedadRepository {
    pool: PgPool,
}

impl NovedadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn build_where(filtro: &NovedadFiltro) -> WhereBuilder {
        let mut builder = WhereBuilder::new();
        if let Some(estado) = filtro.estado {
            builder.push(
                "n.EstadoNovedad = {}",
                FilterValue::Text(estado.as_str().to_string()),
            );
        }
        if filtro.solo_abiertas {
            builder.push_raw(&format!("n.EstadoNovedad IN {}", ESTADOS_ABIERTOS));
        }
        if let Some(oficina_id) = filtro.oficina_id {
            builder.push("s.OficinaSolicitanteId = {}", FilterValue::BigInt(oficina_id));
        }
        builder
    }
}

#[async_trait]
impl NovedadRepositoryTrait for NovedadRepository {
    async fn list(&self, filtro: &NovedadFiltro) -> Result<Vec<Novedad>> {
        let builder = Self::build_where(filtro);
        let sql = format!(
            "{} {} ORDER BY n.FechaRegistro DESC, n.NovedadId DESC",
            SELECT_NOVEDAD,
            builder.clause()
        );
        let novedades = bind_filters(sqlx::query_as::<_, Novedad>(&sql), builder.binds())
            .fetch_all(&self.pool)
            .await?;
        Ok(novedades)
    }

    async fn get(&self, id: i64) -> Result<Option<Novedad>> {
        let sql = format!("{} WHERE n.NovedadId = $1", SELECT_NOVEDAD);
        let novedad = sqlx::query_as::<_, Novedad>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(novedad)
    }

    async fn list_by_solicitud(&self, solicitud_id: i64) -> Result<Vec<Novedad>> {
        let sql = format!(
            "{} WHERE n.SolicitudId = $1 ORDER BY n.FechaRegistro DESC, n.NovedadId DESC",
            SELECT_NOVEDAD
        );
        let novedades = sqlx::query_as::<_, Novedad>(&sql)
            .bind(solicitud_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(novedades)
    }

    async fn stats(&self, oficina_id: Option<i64>) -> Result<NovedadStats> {
        let stats = sqlx::query_as::<_, NovedadStats>(
            r#"
            SELECT
                COUNT(*) AS total,
                COUNT(*) FILTER (WHERE n.EstadoNovedad IN ('registrada', 'pendiente')) AS pendientes,
                COUNT(*) FILTER (WHERE n.EstadoNovedad = 'en_proceso') AS en_proceso,
                COUNT(*) FILTER (WHERE n.EstadoNovedad IN ('resuelta', 'aceptada', 'rechazada')) AS resueltas
            FROM NovedadesSolicitudes n
            INNER JOIN SolicitudesMaterial s ON s.SolicitudId = n.SolicitudId
            WHERE ($1::BIGINT IS NULL OR s.OficinaSolicitanteId = $1)
            "#,
        )
        .bind(oficina_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }

    async fn tipos(&self) -> Result<Vec<String>> {
        let tipos = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT TipoNovedad FROM NovedadesSolicitudes ORDER BY TipoNovedad",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(tipos)
    }

    async fn registrar(&self, nueva: &NuevaNovedad) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE SolicitudesMaterial SET EstadoId = $2 WHERE SolicitudId = $1 AND EstadoId = $3",
        )
        .bind(nueva.solicitud_id)
        .bind(SolicitudEstado::NovedadRegistrada)
        .bind(nueva.estado_solicitud)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ConcurrentModification(format!(
                "solicitud {}",
                nueva.solicitud_id
            )));
        }

        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO NovedadesSolicitudes (
                SolicitudId, TipoNovedad, Descripcion, CantidadAfectada,
                EstadoNovedad, Prioridad, UsuarioRegistra, RutaImagen
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING NovedadId
            "#,
        )
        .bind(nueva.solicitud_id)
        .bind(&nueva.tipo_novedad)
        .bind(&nueva.descripcion)
        .bind(nueva.cantidad_afectada)
        .bind(NovedadEstado::Registrada)
        .bind(nueva.prioridad)
        .bind(&nueva.usuario_registra)
        .bind(&nueva.ruta_imagen)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    async fn resolver(&self, resolucion: &ResolucionNovedad) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            r#"
            UPDATE NovedadesSolicitudes
            SET EstadoNovedad = $3,
                UsuarioResuelve = $4,
                FechaResolucion = NOW(),
                ObservacionesResolucion = $5
            WHERE NovedadId = $1 AND SolicitudId = $2 AND EstadoNovedad IN {}
            "#,
            ESTADOS_ABIERTOS
        );
        let novedad = sqlx::query(&sql)
            .bind(resolucion.novedad_id)
            .bind(resolucion.solicitud_id)
            .bind(resolucion.accion.estado_novedad())
            .bind(&resolucion.usuario)
            .bind(&resolucion.observaciones)
            .execute(&mut *tx)
            .await?;

        if novedad.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ConcurrentModification(format!(
                "novedad {}",
                resolucion.novedad_id
            )));
        }

        let solicitud = sqlx::query(
            "UPDATE SolicitudesMaterial SET EstadoId = $2 WHERE SolicitudId = $1 AND EstadoId = $3",
        )
        .bind(resolucion.solicitud_id)
        .bind(resolucion.accion.estado_solicitud())
        .bind(SolicitudEstado::NovedadRegistrada)
        .execute(&mut *tx)
        .await?;

        if solicitud.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ConcurrentModification(format!(
                "solicitud {}",
                resolucion.solicitud_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn actualizar_estado(
        &self,
        id: i64,
        estado: NovedadEstado,
        usuario: &str,
        observaciones: Option<String>,
    ) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE NovedadesSolicitudes
            SET EstadoNovedad = $2,
                UsuarioResuelve = $3,
                FechaResolucion = NOW(),
                ObservacionesResolucion = COALESCE($4, ObservacionesResolucion)
            WHERE NovedadId = $1
              AND EstadoNovedad IN ('registrada', 'pendiente', 'en_proceso')
            "#,
        )
        .bind(id)
        .bind(estado)
        .bind(usuario)
        .bind(observaciones)
        .execute(&self.pool)
        .await?;

        // 已关闭（或已删除）的异常不再更新
        if updated.rows_affected() == 0 {
            return Err(ApiError::ConcurrentModification(format!("novedad {}", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_where() {
        let filtro = NovedadFiltro {
            estado: Some(NovedadEstado::EnProceso),
            solo_abiertas: true,
            oficina_id: Some(4),
        };
        let builder = NovedadRepository::build_where(&filtro);
        assert_eq!(
            builder.clause(),
            "WHERE n.EstadoNovedad = $1 AND n.EstadoNovedad IN ('registrada', 'pendiente', 'en_proceso') AND s.OficinaSolicitanteId = $2"
        );
        assert_eq!(
            builder.binds(),
            &[
                FilterValue::Text("en_proceso".to_string()),
                FilterValue::BigInt(4)
            ]
        );
    }
}
