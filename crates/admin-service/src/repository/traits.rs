//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，测试时使用 mockall 生成的 Mock

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ActualizacionProducto, AprobacionSolicitud, AsignacionProducto, AsignacionesPorOficina,
    CatalogoItem, DevolucionSolicitud, EstadisticasInventario, Material, MovimientoInventario,
    Novedad, NovedadEstado, NovedadFiltro, NovedadStats, NuevaNovedad, NuevaSolicitud,
    NuevoProducto, Oficina, Producto, ProductoStockBajo, ProductosPorOficina, RechazoSolicitud,
    ResolucionNovedad, ResumenSolicitudes, Solicitud, SolicitudFiltro, StockPorCategoria,
    ValorInventario,
};

/// 物资申请仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SolicitudRepositoryTrait: Send + Sync {
    // 查询
    async fn list(
        &self,
        filtro: &SolicitudFiltro,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Solicitud>>;
    async fn count(&self, filtro: &SolicitudFiltro) -> Result<i64>;
    async fn resumen(&self, filtro: &SolicitudFiltro) -> Result<ResumenSolicitudes>;
    async fn oficinas_con_solicitudes(&self, oficina_id: Option<i64>) -> Result<Vec<String>>;
    async fn get(&self, id: i64) -> Result<Option<Solicitud>>;

    // 关联数据
    async fn get_material(&self, id: i64) -> Result<Option<Material>>;
    async fn list_materiales(&self) -> Result<Vec<Material>>;
    async fn get_oficina(&self, id: i64) -> Result<Option<Oficina>>;

    // 写入，每个方法在单个事务内完成库存与状态变更
    async fn create(&self, nueva: &NuevaSolicitud) -> Result<i64>;
    async fn aprobar(&self, aprobacion: &AprobacionSolicitud) -> Result<()>;
    async fn rechazar(&self, rechazo: &RechazoSolicitud) -> Result<()>;
    async fn registrar_devolucion(&self, devolucion: &DevolucionSolicitud) -> Result<()>;
}

/// 异常上报仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NovedadRepositoryTrait: Send + Sync {
    async fn list(&self, filtro: &NovedadFiltro) -> Result<Vec<Novedad>>;
    async fn get(&self, id: i64) -> Result<Option<Novedad>>;
    async fn list_by_solicitud(&self, solicitud_id: i64) -> Result<Vec<Novedad>>;
    async fn stats(&self, oficina_id: Option<i64>) -> Result<NovedadStats>;
    async fn tipos(&self) -> Result<Vec<String>>;

    /// 插入异常并把申请单置为 Novedad Registrada
    async fn registrar(&self, nueva: &NuevaNovedad) -> Result<i64>;
    /// 关闭异常并同步申请单状态
    async fn resolver(&self, resolucion: &ResolucionNovedad) -> Result<()>;
    /// 仅更新异常自身状态
    async fn actualizar_estado(
        &self,
        id: i64,
        estado: NovedadEstado,
        usuario: &str,
        observaciones: Option<String>,
    ) -> Result<()>;
}

/// 企业库存仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InventarioRepositoryTrait: Send + Sync {
    // 产品
    async fn list_productos(&self, oficina_id: Option<i64>) -> Result<Vec<Producto>>;
    async fn list_productos_sede_principal(&self) -> Result<Vec<Producto>>;
    async fn list_productos_oficinas_servicio(&self) -> Result<Vec<Producto>>;
    async fn get_producto(&self, id: i64) -> Result<Option<Producto>>;
    async fn codigo_existe(&self, codigo: &str) -> Result<bool>;
    async fn siguiente_codigo(&self) -> Result<String>;
    async fn create_producto(&self, codigo: &str, producto: &NuevoProducto) -> Result<i64>;
    async fn update_producto(&self, id: i64, cambios: &ActualizacionProducto) -> Result<()>;
    async fn dar_de_baja(&self, id: i64, usuario: &str) -> Result<()>;

    // 目录
    async fn categorias(&self) -> Result<Vec<CatalogoItem>>;
    async fn proveedores(&self) -> Result<Vec<CatalogoItem>>;
    async fn oficinas(&self) -> Result<Vec<CatalogoItem>>;
    async fn categoria_activa(&self, id: i64) -> Result<bool>;
    async fn proveedor_activo(&self, id: i64) -> Result<bool>;
    async fn oficina_activa(&self, id: i64) -> Result<bool>;

    // 分配与流水
    async fn asignar(&self, asignacion: &AsignacionProducto) -> Result<()>;
    async fn historial(&self, producto_id: i64) -> Result<Vec<MovimientoInventario>>;
    async fn movimientos_recientes(&self, limite: i64) -> Result<Vec<MovimientoInventario>>;

    // 报表
    async fn stock_por_categoria(&self) -> Result<Vec<StockPorCategoria>>;
    async fn valor_inventario(&self) -> Result<ValorInventario>;
    async fn asignaciones_por_oficina(&self) -> Result<Vec<AsignacionesPorOficina>>;
    async fn productos_por_oficina(&self) -> Result<Vec<ProductosPorOficina>>;
    async fn stock_bajo(&self) -> Result<Vec<ProductoStockBajo>>;
    async fn estadisticas(&self) -> Result<EstadisticasInventario>;
}
