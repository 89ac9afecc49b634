//! 企业库存服务
//!
//! 产品维护、向分支机构分配库存与库存报表

use std::sync::Arc;

use suministros_shared::observability::metrics;
use tracing::{info, instrument};

use crate::auth::Claims;
use crate::error::{ApiError, Result};
use crate::models::{
    ActualizacionProducto, AlertaStock, AsignacionProducto, AsignacionesPorOficina, CatalogoItem,
    EstadisticasInventario, MovimientoInventario, NuevoProducto, Producto, ProductosPorOficina,
    StockPorCategoria, ValorInventario,
};
use crate::repository::{InventarioRepository, InventarioRepositoryTrait};

/// 流水查询默认条数
pub const MOVIMIENTOS_LIMITE_DEFAULT: i64 = 50;
/// 流水查询最大条数
pub const MOVIMIENTOS_LIMITE_MAX: i64 = 500;

/// 企业库存服务
pub struct InventarioService<R = InventarioRepository>
where
    R: InventarioRepositoryTrait,
{
    repo: Arc<R>,
}

impl<R> InventarioService<R>
where
    R: InventarioRepositoryTrait,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    // ============ 产品 ============

    /// 指定机构时只返回分配给该机构的产品
    pub async fn productos(&self, oficina_id: Option<i64>) -> Result<Vec<Producto>> {
        self.repo.list_productos(oficina_id).await
    }

    pub async fn productos_sede_principal(&self) -> Result<Vec<Producto>> {
        self.repo.list_productos_sede_principal().await
    }

    pub async fn productos_oficinas_servicio(&self) -> Result<Vec<Producto>> {
        self.repo.list_productos_oficinas_servicio().await
    }

    pub async fn producto(&self, id: i64) -> Result<Producto> {
        self.repo
            .get_producto(id)
            .await?
            .filter(|p| p.activo)
            .ok_or(ApiError::ProductoNotFound(id))
    }

    /// 创建产品；未提供编码时按顺序生成
    #[instrument(skip(self, producto), fields(nombre = %producto.nombre))]
    pub async fn crear(&self, producto: NuevoProducto) -> Result<(i64, String)> {
        validar_valores(
            &producto.nombre,
            producto.valor_unitario,
            producto.cantidad,
            producto.cantidad_minima,
        )?;
        self.validar_catalogos(producto.categoria_id, producto.proveedor_id)
            .await?;

        let codigo = match producto
            .codigo_unico
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(codigo) => {
                if self.repo.codigo_existe(codigo).await? {
                    return Err(ApiError::Conflict(format!("El código {} ya existe", codigo)));
                }
                codigo.to_string()
            }
            None => self.repo.siguiente_codigo().await?,
        };

        let id = self.repo.create_producto(&codigo, &producto).await?;
        info!(
            producto_id = id,
            codigo = %codigo,
            cantidad = producto.cantidad,
            usuario = %producto.usuario_creador,
            "Producto created"
        );
        Ok((id, codigo))
    }

    #[instrument(skip(self, cambios))]
    pub async fn actualizar(&self, id: i64, cambios: ActualizacionProducto) -> Result<Producto> {
        self.producto(id).await?;
        validar_valores(
            &cambios.nombre,
            cambios.valor_unitario,
            cambios.cantidad,
            cambios.cantidad_minima,
        )?;
        self.validar_catalogos(cambios.categoria_id, cambios.proveedor_id)
            .await?;

        self.repo.update_producto(id, &cambios).await?;
        info!(producto_id = id, "Producto updated");
        self.producto(id).await
    }

    /// 停用产品并写入 BAJA_PRODUCTO 流水
    #[instrument(skip(self, claims))]
    pub async fn dar_de_baja(&self, claims: &Claims, id: i64) -> Result<()> {
        self.repo.dar_de_baja(id, claims.nombre_visible()).await?;
        info!(producto_id = id, usuario = %claims.username, "Producto deactivated");
        Ok(())
    }

    async fn validar_catalogos(&self, categoria_id: i64, proveedor_id: i64) -> Result<()> {
        if !self.repo.categoria_activa(categoria_id).await? {
            return Err(ApiError::Validation(format!(
                "La categoría {} no existe o está inactiva",
                categoria_id
            )));
        }
        if !self.repo.proveedor_activo(proveedor_id).await? {
            return Err(ApiError::Validation(format!(
                "El proveedor {} no existe o está inactivo",
                proveedor_id
            )));
        }
        Ok(())
    }

    // ============ 目录 ============

    pub async fn categorias(&self) -> Result<Vec<CatalogoItem>> {
        self.repo.categorias().await
    }

    pub async fn proveedores(&self) -> Result<Vec<CatalogoItem>> {
        self.repo.proveedores().await
    }

    pub async fn oficinas(&self) -> Result<Vec<CatalogoItem>> {
        self.repo.oficinas().await
    }

    // ============ 分配与流水 ============

    /// 分配到分支机构；未指定接收人时记为操作人本人
    #[instrument(skip(self, claims))]
    pub async fn asignar(
        &self,
        claims: &Claims,
        producto_id: i64,
        oficina_id: i64,
        cantidad: i32,
        usuario_asignado_id: Option<i64>,
    ) -> Result<()> {
        let producto = self
            .repo
            .get_producto(producto_id)
            .await?
            .ok_or(ApiError::ProductoNotFound(producto_id))?;
        producto.validar_asignacion(cantidad)?;

        if !self.repo.oficina_activa(oficina_id).await? {
            return Err(ApiError::OficinaNotFound(oficina_id));
        }

        let asignacion = AsignacionProducto {
            producto_id,
            oficina_id,
            cantidad,
            usuario_asignado_id: Some(match usuario_asignado_id {
                Some(id) => id,
                None => claims.user_id()?,
            }),
            usuario_asignador: claims.nombre_visible().to_string(),
        };
        self.repo.asignar(&asignacion).await?;

        metrics::record_inventory_assignment(oficina_id, cantidad);
        info!(
            producto_id,
            oficina_id,
            cantidad,
            stock_restante = producto.cantidad - cantidad,
            "Producto assigned"
        );
        Ok(())
    }

    pub async fn historial(&self, producto_id: i64) -> Result<Vec<MovimientoInventario>> {
        self.repo
            .get_producto(producto_id)
            .await?
            .ok_or(ApiError::ProductoNotFound(producto_id))?;
        self.repo.historial(producto_id).await
    }

    pub async fn movimientos(&self, limite: Option<i64>) -> Result<Vec<MovimientoInventario>> {
        let limite = limite
            .unwrap_or(MOVIMIENTOS_LIMITE_DEFAULT)
            .clamp(1, MOVIMIENTOS_LIMITE_MAX);
        self.repo.movimientos_recientes(limite).await
    }

    // ============ 报表 ============

    pub async fn stock_por_categoria(&self) -> Result<Vec<StockPorCategoria>> {
        self.repo.stock_por_categoria().await
    }

    pub async fn valor_inventario(&self) -> Result<ValorInventario> {
        self.repo.valor_inventario().await
    }

    pub async fn asignaciones_por_oficina(&self) -> Result<Vec<AsignacionesPorOficina>> {
        self.repo.asignaciones_por_oficina().await
    }

    pub async fn productos_por_oficina(&self) -> Result<Vec<ProductosPorOficina>> {
        self.repo.productos_por_oficina().await
    }

    pub async fn alertas_stock(&self) -> Result<Vec<AlertaStock>> {
        let productos = self.repo.stock_bajo().await?;
        Ok(productos.into_iter().map(AlertaStock::from).collect())
    }

    pub async fn estadisticas(&self) -> Result<EstadisticasInventario> {
        self.repo.estadisticas().await
    }
}

fn validar_valores(nombre: &str, valor_unitario: f64, cantidad: i32, minima: i32) -> Result<()> {
    if nombre.trim().is_empty() {
        return Err(ApiError::Validation(
            "El nombre del producto es obligatorio".to_string(),
        ));
    }
    if !valor_unitario.is_finite() || valor_unitario < 0.0 {
        return Err(ApiError::Validation(
            "El valor unitario no puede ser negativo".to_string(),
        ));
    }
    if cantidad < 0 || minima < 0 {
        return Err(ApiError::Validation(
            "Las cantidades no pueden ser negativas".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inventario::fixtures::producto;
    use crate::models::{EstadoStock, ProductoStockBajo};
    use crate::repository::MockInventarioRepositoryTrait;
    use crate::service::test_support::admin;
    use mockall::predicate::eq;

    fn service(repo: MockInventarioRepositoryTrait) -> InventarioService<MockInventarioRepositoryTrait> {
        InventarioService::new(Arc::new(repo))
    }

    fn nuevo(codigo: Option<&str>) -> NuevoProducto {
        NuevoProducto {
            codigo_unico: codigo.map(str::to_string),
            nombre: "Silla ergonómica".to_string(),
            descripcion: None,
            categoria_id: 1,
            proveedor_id: 2,
            valor_unitario: 320.0,
            cantidad: 12,
            cantidad_minima: 2,
            ubicacion: None,
            es_asignable: true,
            ruta_imagen: None,
            oficina_creadora_id: None,
            usuario_creador: "admin".to_string(),
        }
    }

    fn catalogos_activos(repo: &mut MockInventarioRepositoryTrait) {
        repo.expect_categoria_activa().returning(|_| Ok(true));
        repo.expect_proveedor_activo().returning(|_| Ok(true));
    }

    #[tokio::test]
    async fn test_crear_generates_code() {
        let mut repo = MockInventarioRepositoryTrait::new();
        catalogos_activos(&mut repo);
        repo.expect_siguiente_codigo()
            .returning(|| Ok("QInven-0008".to_string()));
        repo.expect_create_producto()
            .withf(|codigo, p| codigo == "QInven-0008" && p.cantidad == 12)
            .returning(|_, _| Ok(8));

        let (id, codigo) = service(repo).crear(nuevo(None)).await.unwrap();
        assert_eq!(id, 8);
        assert_eq!(codigo, "QInven-0008");
    }

    #[tokio::test]
    async fn test_crear_with_taken_code_is_conflict() {
        let mut repo = MockInventarioRepositoryTrait::new();
        catalogos_activos(&mut repo);
        repo.expect_codigo_existe()
            .withf(|codigo| codigo == "SILLA-01")
            .returning(|_| Ok(true));
        repo.expect_create_producto().never();

        let err = service(repo).crear(nuevo(Some(" SILLA-01 "))).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_crear_rejects_negative_values_and_inactive_category() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_categoria_activa().returning(|_| Ok(false));
        repo.expect_create_producto().never();
        let svc = service(repo);

        let negativo = NuevoProducto {
            valor_unitario: -1.0,
            ..nuevo(None)
        };
        let err = svc.crear(negativo).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let err = svc.crear(nuevo(None)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn test_asignar_defaults_recipient_to_caller() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_get_producto()
            .with(eq(1))
            .returning(|id| Ok(Some(producto(id, 5))));
        repo.expect_oficina_activa()
            .with(eq(3))
            .returning(|_| Ok(true));
        repo.expect_asignar()
            .withf(|a| {
                a.producto_id == 1
                    && a.oficina_id == 3
                    && a.cantidad == 5
                    && a.usuario_asignado_id == Some(7)
            })
            .times(1)
            .returning(|_| Ok(()));

        let result = service(repo).asignar(&admin(), 1, 3, 5, None).await;
        tokio_test::assert_ok!(result);
    }

    #[tokio::test]
    async fn test_asignar_over_stock_writes_nothing() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_get_producto()
            .returning(|id| Ok(Some(producto(id, 5))));
        repo.expect_asignar().never();

        let err = service(repo).asignar(&admin(), 1, 3, 6, None).await.unwrap_err();
        assert!(matches!(
            err,
            ApiError::InsufficientStock {
                disponible: 5,
                requerido: 6
            }
        ));
    }

    #[tokio::test]
    async fn test_asignar_inactive_office() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_get_producto()
            .returning(|id| Ok(Some(producto(id, 5))));
        repo.expect_oficina_activa().returning(|_| Ok(false));
        repo.expect_asignar().never();

        let err = service(repo).asignar(&admin(), 1, 3, 1, Some(11)).await.unwrap_err();
        assert!(matches!(err, ApiError::OficinaNotFound(3)));
    }

    #[tokio::test]
    async fn test_movimientos_limit_is_clamped() {
        let mut repo = MockInventarioRepositoryTrait::new();
        let mut seq = mockall::Sequence::new();
        for limite in [50, 500, 1] {
            repo.expect_movimientos_recientes()
                .with(eq(limite))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(vec![]));
        }
        let svc = service(repo);

        svc.movimientos(None).await.unwrap();
        svc.movimientos(Some(10_000)).await.unwrap();
        svc.movimientos(Some(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_alertas_stock_classifies() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_stock_bajo().returning(|| {
            Ok(vec![
                ProductoStockBajo {
                    id: 1,
                    codigo_unico: "QInven-0001".to_string(),
                    nombre: "Tóner".to_string(),
                    categoria: "Insumos".to_string(),
                    cantidad: 0,
                    cantidad_minima: 2,
                    valor_unitario: 80.0,
                },
                ProductoStockBajo {
                    id: 2,
                    codigo_unico: "QInven-0002".to_string(),
                    nombre: "Mouse".to_string(),
                    categoria: "Tecnología".to_string(),
                    cantidad: 2,
                    cantidad_minima: 3,
                    valor_unitario: 15.0,
                },
            ])
        });

        let alertas = service(repo).alertas_stock().await.unwrap();
        assert_eq!(alertas[0].estado_stock, EstadoStock::Critico);
        assert_eq!(alertas[1].estado_stock, EstadoStock::Bajo);
        assert_eq!(alertas[1].valor_total, 30.0);
    }

    #[tokio::test]
    async fn test_producto_inactive_is_not_found() {
        let mut repo = MockInventarioRepositoryTrait::new();
        repo.expect_get_producto().returning(|id| {
            Ok(Some(Producto {
                activo: false,
                ..producto(id, 1)
            }))
        });

        let err = service(repo).producto(4).await.unwrap_err();
        assert!(matches!(err, ApiError::ProductoNotFound(4)));
    }
}
