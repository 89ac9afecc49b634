//! 企业库存仓储
//!
//! 产品、目录、分配流水与库存报表的数据访问

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::InventarioRepositoryTrait;
use crate::error::{ApiError, Result};
use crate::models::{
    AccionHistorial, ActualizacionProducto, AsignacionProducto, AsignacionesPorOficina,
    CatalogoItem, EstadisticasInventario, MovimientoInventario, NuevoProducto, Producto,
    ProductoStockBajo, ProductosPorOficina, StockPorCategoria, ValorInventario,
    codigo_secuencial,
};

/// 生成编码时最多跳过的已占用编号
const MAX_CODIGO_INTENTOS: i64 = 1000;

const SELECT_PRODUCTO: &str = r#"
    SELECT
        p.ProductoId AS id,
        p.CodigoUnico AS codigo_unico,
        p.NombreProducto AS nombre,
        p.Descripcion AS descripcion,
        p.CategoriaId AS categoria_id,
        c.NombreCategoria AS categoria,
        p.ProveedorId AS proveedor_id,
        pr.NombreProveedor AS proveedor,
        p.ValorUnitario AS valor_unitario,
        p.CantidadDisponible AS cantidad,
        p.CantidadMinima AS cantidad_minima,
        p.Ubicacion AS ubicacion,
        p.EsAsignable AS es_asignable,
        p.Activo AS activo,
        p.RutaImagen AS ruta_imagen,
        p.OficinaCreadoraId AS oficina_creadora_id,
        p.UsuarioCreador AS usuario_creador,
        p.FechaCreacion AS fecha_creacion,
        COALESCE(ult.NombreOficina, 'Sede Principal') AS oficina
    FROM ProductosCorporativos p
    INNER JOIN CategoriasProductos c ON c.CategoriaId = p.CategoriaId
    INNER JOIN Proveedores pr ON pr.ProveedorId = p.ProveedorId
    LEFT JOIN LATERAL (
        SELECT o.NombreOficina
        FROM Asignaciones a
        INNER JOIN Oficinas o ON o.OficinaId = a.OficinaId
        WHERE a.ProductoId = p.ProductoId AND a.Activo = TRUE
        ORDER BY a.FechaAsignacion DESC, a.AsignacionId DESC
        LIMIT 1
    ) ult ON TRUE
"#;

const SELECT_MOVIMIENTO: &str = r#"
    SELECT
        h.HistorialId AS id,
        h.ProductoId AS producto_id,
        p.NombreProducto AS producto,
        p.CodigoUnico AS codigo_unico,
        h.OficinaId AS oficina_id,
        o.NombreOficina AS oficina,
        h.Accion AS accion,
        h.Cantidad AS cantidad,
        h.UsuarioAccion AS usuario_accion,
        h.Fecha AS fecha
    FROM AsignacionesCorporativasHistorial h
    INNER JOIN ProductosCorporativos p ON p.ProductoId = h.ProductoId
    LEFT JOIN Oficinas o ON o.OficinaId = h.OficinaId
"#;

const TIENE_ASIGNACION_ACTIVA: &str = r#"
    EXISTS (
        SELECT 1 FROM Asignaciones a
        WHERE a.ProductoId = p.ProductoId AND a.Activo = TRUE
    )
"#;

/// 企业库存仓储
pub struct InventarioRepository {
    pool: PgPool,
}

impl InventarioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn list_where(&self, condition: &str) -> Result<Vec<Producto>> {
        let sql = format!(
            "{} WHERE p.Activo = TRUE AND {} ORDER BY p.NombreProducto, p.ProductoId",
            SELECT_PRODUCTO, condition
        );
        let productos = sqlx::query_as::<_, Producto>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(productos)
    }

    async fn exists(&self, sql: &str, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl InventarioRepositoryTrait for InventarioRepository {
    async fn list_productos(&self, oficina_id: Option<i64>) -> Result<Vec<Producto>> {
        let sql = format!(
            r#"
            {}
            WHERE p.Activo = TRUE
              AND ($1::BIGINT IS NULL OR EXISTS (
                  SELECT 1 FROM Asignaciones a
                  WHERE a.ProductoId = p.ProductoId AND a.OficinaId = $1 AND a.Activo = TRUE
              ))
            ORDER BY p.NombreProducto, p.ProductoId
            "#,
            SELECT_PRODUCTO
        );
        let productos = sqlx::query_as::<_, Producto>(&sql)
            .bind(oficina_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(productos)
    }

    async fn list_productos_sede_principal(&self) -> Result<Vec<Producto>> {
        self.list_where(&format!("NOT {}", TIENE_ASIGNACION_ACTIVA))
            .await
    }

    async fn list_productos_oficinas_servicio(&self) -> Result<Vec<Producto>> {
        self.list_where(TIENE_ASIGNACION_ACTIVA).await
    }

    async fn get_producto(&self, id: i64) -> Result<Option<Producto>> {
        let sql = format!("{} WHERE p.ProductoId = $1", SELECT_PRODUCTO);
        let producto = sqlx::query_as::<_, Producto>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(producto)
    }

    async fn codigo_existe(&self, codigo: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM ProductosCorporativos WHERE CodigoUnico = $1)",
        )
        .bind(codigo)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn siguiente_codigo(&self) -> Result<String> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ProductosCorporativos")
            .fetch_one(&self.pool)
            .await?;

        for numero in (total + 1)..=(total + MAX_CODIGO_INTENTOS) {
            let codigo = codigo_secuencial(numero);
            if !self.codigo_existe(&codigo).await? {
                return Ok(codigo);
            }
        }

        Err(ApiError::Internal(format!(
            "no free product code after {} attempts",
            MAX_CODIGO_INTENTOS
        )))
    }

    async fn create_producto(&self, codigo: &str, producto: &NuevoProducto) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO ProductosCorporativos (
                CodigoUnico, NombreProducto, Descripcion, CategoriaId, ProveedorId,
                ValorUnitario, CantidadDisponible, CantidadMinima, Ubicacion,
                EsAsignable, RutaImagen, OficinaCreadoraId, UsuarioCreador
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING ProductoId
            "#,
        )
        .bind(codigo)
        .bind(&producto.nombre)
        .bind(&producto.descripcion)
        .bind(producto.categoria_id)
        .bind(producto.proveedor_id)
        .bind(producto.valor_unitario)
        .bind(producto.cantidad)
        .bind(producto.cantidad_minima)
        .bind(&producto.ubicacion)
        .bind(producto.es_asignable)
        .bind(&producto.ruta_imagen)
        .bind(producto.oficina_creadora_id)
        .bind(&producto.usuario_creador)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            ApiError::from_unique_violation(e, format!("El código {} ya existe", codigo))
        })
    }

    async fn update_producto(&self, id: i64, cambios: &ActualizacionProducto) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE ProductosCorporativos
            SET NombreProducto = $2,
                Descripcion = $3,
                CategoriaId = $4,
                ProveedorId = $5,
                ValorUnitario = $6,
                CantidadDisponible = $7,
                CantidadMinima = $8,
                Ubicacion = $9,
                EsAsignable = $10,
                RutaImagen = COALESCE($11, RutaImagen)
            WHERE ProductoId = $1 AND Activo = TRUE
            "#,
        )
        .bind(id)
        .bind(&cambios.nombre)
        .bind(&cambios.descripcion)
        .bind(cambios.categoria_id)
        .bind(cambios.proveedor_id)
        .bind(cambios.valor_unitario)
        .bind(cambios.cantidad)
        .bind(cambios.cantidad_minima)
        .bind(&cambios.ubicacion)
        .bind(cambios.es_asignable)
        .bind(&cambios.ruta_imagen)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::ProductoNotFound(id));
        }
        Ok(())
    }

    async fn dar_de_baja(&self, id: i64, usuario: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE ProductosCorporativos SET Activo = FALSE WHERE ProductoId = $1 AND Activo = TRUE",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(ApiError::ProductoNotFound(id));
        }

        sqlx::query(
            r#"
            INSERT INTO AsignacionesCorporativasHistorial (ProductoId, OficinaId, Accion, Cantidad, UsuarioAccion)
            SELECT ProductoId, NULL, $2, CantidadDisponible, $3
            FROM ProductosCorporativos
            WHERE ProductoId = $1
            "#,
        )
        .bind(id)
        .bind(AccionHistorial::BajaProducto)
        .bind(usuario)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn categorias(&self) -> Result<Vec<CatalogoItem>> {
        let items = sqlx::query_as::<_, CatalogoItem>(
            r#"
            SELECT CategoriaId AS id, NombreCategoria AS nombre
            FROM CategoriasProductos
            WHERE Activo = TRUE
            ORDER BY NombreCategoria
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn proveedores(&self) -> Result<Vec<CatalogoItem>> {
        let items = sqlx::query_as::<_, CatalogoItem>(
            r#"
            SELECT ProveedorId AS id, NombreProveedor AS nombre
            FROM Proveedores
            WHERE Activo = TRUE
            ORDER BY NombreProveedor
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn oficinas(&self) -> Result<Vec<CatalogoItem>> {
        let items = sqlx::query_as::<_, CatalogoItem>(
            r#"
            SELECT OficinaId AS id, NombreOficina AS nombre
            FROM Oficinas
            WHERE Activo = TRUE
            ORDER BY NombreOficina
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn categoria_activa(&self, id: i64) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM CategoriasProductos WHERE CategoriaId = $1 AND Activo = TRUE)",
            id,
        )
        .await
    }

    async fn proveedor_activo(&self, id: i64) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM Proveedores WHERE ProveedorId = $1 AND Activo = TRUE)",
            id,
        )
        .await
    }

    async fn oficina_activa(&self, id: i64) -> Result<bool> {
        self.exists(
            "SELECT EXISTS (SELECT 1 FROM Oficinas WHERE OficinaId = $1 AND Activo = TRUE)",
            id,
        )
        .await
    }

    async fn asignar(&self, asignacion: &AsignacionProducto) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // 条件扣减：库存不足、产品停用或不可分配时不更新任何行
        let debit = sqlx::query(
            r#"
            UPDATE ProductosCorporativos
            SET CantidadDisponible = CantidadDisponible - $2
            WHERE ProductoId = $1
              AND Activo = TRUE
              AND EsAsignable = TRUE
              AND CantidadDisponible >= $2
            "#,
        )
        .bind(asignacion.producto_id)
        .bind(asignacion.cantidad)
        .execute(&mut *tx)
        .await?;

        if debit.rows_affected() == 0 {
            let disponible = sqlx::query_scalar::<_, i32>(
                "SELECT CantidadDisponible FROM ProductosCorporativos WHERE ProductoId = $1",
            )
            .bind(asignacion.producto_id)
            .fetch_optional(&mut *tx)
            .await?;
            tx.rollback().await?;
            return Err(ApiError::InsufficientStock {
                disponible: disponible.unwrap_or(0),
                requerido: asignacion.cantidad,
            });
        }

        sqlx::query(
            r#"
            INSERT INTO Asignaciones (
                ProductoId, OficinaId, UsuarioAsignadoId, Cantidad, Estado, UsuarioAsignador
            )
            VALUES ($1, $2, $3, $4, 'ASIGNADO', $5)
            "#,
        )
        .bind(asignacion.producto_id)
        .bind(asignacion.oficina_id)
        .bind(asignacion.usuario_asignado_id)
        .bind(asignacion.cantidad)
        .bind(&asignacion.usuario_asignador)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO AsignacionesCorporativasHistorial (ProductoId, OficinaId, Accion, Cantidad, UsuarioAccion)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(asignacion.producto_id)
        .bind(asignacion.oficina_id)
        .bind(AccionHistorial::Asignar)
        .bind(asignacion.cantidad)
        .bind(&asignacion.usuario_asignador)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn historial(&self, producto_id: i64) -> Result<Vec<MovimientoInventario>> {
        let sql = format!(
            "{} WHERE h.ProductoId = $1 ORDER BY h.Fecha DESC, h.HistorialId DESC",
            SELECT_MOVIMIENTO
        );
        let movimientos = sqlx::query_as::<_, MovimientoInventario>(&sql)
            .bind(producto_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(movimientos)
    }

    async fn movimientos_recientes(&self, limite: i64) -> Result<Vec<MovimientoInventario>> {
        let sql = format!(
            "{} ORDER BY h.Fecha DESC, h.HistorialId DESC LIMIT $1",
            SELECT_MOVIMIENTO
        );
        let movimientos = sqlx::query_as::<_, MovimientoInventario>(&sql)
            .bind(limite)
            .fetch_all(&self.pool)
            .await?;
        Ok(movimientos)
    }

    async fn stock_por_categoria(&self) -> Result<Vec<StockPorCategoria>> {
        let rows = sqlx::query_as::<_, StockPorCategoria>(
            r#"
            SELECT
                c.NombreCategoria AS categoria,
                COUNT(p.ProductoId) AS total_productos,
                COALESCE(SUM(p.CantidadDisponible), 0)::BIGINT AS total_stock
            FROM CategoriasProductos c
            LEFT JOIN ProductosCorporativos p ON p.CategoriaId = c.CategoriaId AND p.Activo = TRUE
            WHERE c.Activo = TRUE
            GROUP BY c.NombreCategoria
            ORDER BY c.NombreCategoria
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn valor_inventario(&self) -> Result<ValorInventario> {
        let valor = sqlx::query_as::<_, ValorInventario>(
            r#"
            SELECT
                COALESCE(SUM(ValorUnitario * CantidadDisponible), 0)::DOUBLE PRECISION AS valor_total,
                COALESCE(SUM(CantidadDisponible), 0)::BIGINT AS total_unidades
            FROM ProductosCorporativos
            WHERE Activo = TRUE
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(valor)
    }

    async fn asignaciones_por_oficina(&self) -> Result<Vec<AsignacionesPorOficina>> {
        let rows = sqlx::query_as::<_, AsignacionesPorOficina>(
            r#"
            SELECT
                o.OficinaId AS oficina_id,
                o.NombreOficina AS oficina,
                COUNT(a.AsignacionId) AS cantidad_asignaciones,
                COALESCE(SUM(a.Cantidad), 0)::BIGINT AS unidades_asignadas
            FROM Oficinas o
            INNER JOIN Asignaciones a ON a.OficinaId = o.OficinaId AND a.Activo = TRUE
            GROUP BY o.OficinaId, o.NombreOficina
            ORDER BY cantidad_asignaciones DESC, o.NombreOficina
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn productos_por_oficina(&self) -> Result<Vec<ProductosPorOficina>> {
        // 分支机构按有效分配统计，Sede Principal 统计剩余的企业库存
        let rows = sqlx::query_as::<_, ProductosPorOficina>(
            r#"
            SELECT * FROM (
                SELECT
                    o.NombreOficina::TEXT AS oficina,
                    COUNT(DISTINCT a.ProductoId) AS total_productos,
                    COALESCE(SUM(a.Cantidad), 0)::BIGINT AS total_stock,
                    COALESCE(SUM(a.Cantidad * p.ValorUnitario), 0)::DOUBLE PRECISION AS valor_total
                FROM Asignaciones a
                INNER JOIN Oficinas o ON o.OficinaId = a.OficinaId
                INNER JOIN ProductosCorporativos p ON p.ProductoId = a.ProductoId
                WHERE a.Activo = TRUE AND p.Activo = TRUE
                GROUP BY o.NombreOficina
                UNION ALL
                SELECT
                    'Sede Principal'::TEXT AS oficina,
                    COUNT(*) AS total_productos,
                    COALESCE(SUM(CantidadDisponible), 0)::BIGINT AS total_stock,
                    COALESCE(SUM(CantidadDisponible * ValorUnitario), 0)::DOUBLE PRECISION AS valor_total
                FROM ProductosCorporativos
                WHERE Activo = TRUE AND CantidadDisponible > 0
            ) resumen
            ORDER BY oficina
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn stock_bajo(&self) -> Result<Vec<ProductoStockBajo>> {
        let rows = sqlx::query_as::<_, ProductoStockBajo>(
            r#"
            SELECT
                p.ProductoId AS id,
                p.CodigoUnico AS codigo_unico,
                p.NombreProducto AS nombre,
                c.NombreCategoria AS categoria,
                p.CantidadDisponible AS cantidad,
                p.CantidadMinima AS cantidad_minima,
                p.ValorUnitario AS valor_unitario
            FROM ProductosCorporativos p
            INNER JOIN CategoriasProductos c ON c.CategoriaId = p.CategoriaId
            WHERE p.Activo = TRUE AND p.CantidadDisponible <= p.CantidadMinima
            ORDER BY p.CantidadDisponible ASC, p.NombreProducto
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn estadisticas(&self) -> Result<EstadisticasInventario> {
        let stats = sqlx::query_as::<_, EstadisticasInventario>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM ProductosCorporativos WHERE Activo = TRUE) AS total_productos,
                (SELECT COALESCE(SUM(ValorUnitario * CantidadDisponible), 0)::DOUBLE PRECISION
                   FROM ProductosCorporativos WHERE Activo = TRUE) AS valor_total,
                (SELECT COUNT(*) FROM ProductosCorporativos
                   WHERE Activo = TRUE AND CantidadDisponible <= CantidadMinima) AS stock_bajo,
                (SELECT COUNT(*) FROM ProductosCorporativos
                   WHERE Activo = TRUE AND EsAsignable = TRUE) AS asignables,
                (SELECT COUNT(*) FROM CategoriasProductos WHERE Activo = TRUE) AS total_categorias
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(stats)
    }
}
