//! 路由配置模块
//!
//! 按所需权限分组定义 REST API 端点，每组挂载对应的权限检查

use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::auth::permissions::{
    NOVEDAD_CREATE, NOVEDAD_MANAGE, NOVEDAD_READ, PRODUCTO_ASSIGN, PRODUCTO_READ, PRODUCTO_WRITE,
    REPORTE_READ, SOLICITUD_APPROVE, SOLICITUD_APPROVE_PARTIAL, SOLICITUD_CREATE, SOLICITUD_READ,
    SOLICITUD_REJECT, SOLICITUD_RETURN,
};
use crate::middleware::require_permission;
use crate::{handlers, state::AppState};

fn con_permiso(router: Router<AppState>, permission: &'static str) -> Router<AppState> {
    router.route_layer(middleware::from_fn(require_permission(permission)))
}

/// 认证路由（登录为公开路由，其余只需有效 Token）
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/refresh", post(handlers::auth::refresh))
}

/// 物资申请路由
fn solicitud_routes() -> Router<AppState> {
    let lectura = Router::new()
        .route("/solicitudes", get(handlers::solicitud::list_solicitudes))
        .route(
            "/solicitudes/materiales",
            get(handlers::solicitud::list_materiales),
        )
        .route("/solicitudes/{id}", get(handlers::solicitud::get_solicitud))
        .route(
            "/solicitudes/{id}/detalles",
            get(handlers::solicitud::get_solicitud_detalles),
        )
        .route(
            "/solicitudes/{id}/info-devolucion",
            get(handlers::solicitud::get_info_devolucion),
        );

    let creacion = Router::new().route(
        "/solicitudes",
        post(handlers::solicitud::create_solicitud),
    );

    let aprobacion = Router::new().route(
        "/solicitudes/{id}/aprobar",
        post(handlers::solicitud::aprobar_solicitud),
    );

    let aprobacion_parcial = Router::new().route(
        "/solicitudes/{id}/aprobar-parcial",
        post(handlers::solicitud::aprobar_parcial_solicitud),
    );

    let rechazo = Router::new().route(
        "/solicitudes/{id}/rechazar",
        post(handlers::solicitud::rechazar_solicitud),
    );

    let devolucion = Router::new().route(
        "/solicitudes/{id}/devolucion",
        post(handlers::solicitud::devolver_solicitud),
    );

    Router::new()
        .merge(con_permiso(lectura, SOLICITUD_READ))
        .merge(con_permiso(creacion, SOLICITUD_CREATE))
        .merge(con_permiso(aprobacion, SOLICITUD_APPROVE))
        .merge(con_permiso(aprobacion_parcial, SOLICITUD_APPROVE_PARTIAL))
        .merge(con_permiso(rechazo, SOLICITUD_REJECT))
        .merge(con_permiso(devolucion, SOLICITUD_RETURN))
}

/// 异常上报路由
fn novedad_routes() -> Router<AppState> {
    let lectura = Router::new()
        .route("/novedades", get(handlers::novedad::list_novedades))
        .route(
            "/novedades/pendientes",
            get(handlers::novedad::list_pendientes),
        )
        .route(
            "/novedades/estadisticas",
            get(handlers::novedad::get_estadisticas),
        )
        .route("/novedades/tipos", get(handlers::novedad::list_tipos))
        .route("/novedades/{id}", get(handlers::novedad::get_novedad))
        .route(
            "/solicitudes/{id}/novedad",
            get(handlers::solicitud::get_ultima_novedad),
        );

    let registro = Router::new().route(
        "/solicitudes/novedades",
        post(handlers::novedad::registrar_novedad),
    );

    let gestion = Router::new()
        .route(
            "/solicitudes/novedades/gestionar",
            post(handlers::novedad::gestionar_novedad),
        )
        .route("/novedades/{id}", put(handlers::novedad::update_novedad));

    Router::new()
        .merge(con_permiso(lectura, NOVEDAD_READ))
        .merge(con_permiso(registro, NOVEDAD_CREATE))
        .merge(con_permiso(gestion, NOVEDAD_MANAGE))
}

/// 企业库存路由
fn inventario_routes() -> Router<AppState> {
    let lectura = Router::new()
        .route(
            "/inventario/productos",
            get(handlers::inventario::list_productos),
        )
        .route(
            "/inventario/productos/con-oficina",
            get(handlers::inventario::list_productos_con_oficina),
        )
        .route(
            "/inventario/productos/sede-principal",
            get(handlers::inventario::list_productos_sede_principal),
        )
        .route(
            "/inventario/productos/oficinas-servicio",
            get(handlers::inventario::list_productos_oficinas_servicio),
        )
        .route(
            "/inventario/productos/{id}",
            get(handlers::inventario::get_producto),
        )
        .route(
            "/inventario/productos/{id}/historial",
            get(handlers::inventario::get_historial),
        )
        .route(
            "/inventario/categorias",
            get(handlers::inventario::list_categorias),
        )
        .route(
            "/inventario/proveedores",
            get(handlers::inventario::list_proveedores),
        )
        .route(
            "/inventario/oficinas",
            get(handlers::inventario::list_oficinas),
        );

    let escritura = Router::new()
        .route(
            "/inventario/productos",
            post(handlers::inventario::create_producto),
        )
        .route(
            "/inventario/productos/{id}",
            put(handlers::inventario::update_producto),
        )
        .route(
            "/inventario/productos/{id}",
            delete(handlers::inventario::delete_producto),
        );

    let asignacion = Router::new().route(
        "/inventario/productos/{id}/asignar",
        post(handlers::inventario::asignar_producto),
    );

    Router::new()
        .merge(con_permiso(lectura, PRODUCTO_READ))
        .merge(con_permiso(escritura, PRODUCTO_WRITE))
        .merge(con_permiso(asignacion, PRODUCTO_ASSIGN))
}

/// 库存报表路由
fn reporte_routes() -> Router<AppState> {
    let reportes = Router::new()
        .route(
            "/inventario/reportes/stock-categorias",
            get(handlers::reporte::stock_por_categoria),
        )
        .route(
            "/inventario/reportes/valor-inventario",
            get(handlers::reporte::valor_inventario),
        )
        .route(
            "/inventario/reportes/asignaciones-oficina",
            get(handlers::reporte::asignaciones_por_oficina),
        )
        .route(
            "/inventario/reportes/productos-oficina",
            get(handlers::reporte::productos_por_oficina),
        )
        .route(
            "/inventario/reportes/stock-bajo",
            get(handlers::reporte::stock_bajo),
        )
        .route(
            "/inventario/reportes/movimientos",
            get(handlers::reporte::movimientos),
        )
        .route(
            "/inventario/estadisticas",
            get(handlers::reporte::estadisticas),
        );

    con_permiso(reportes, REPORTE_READ)
}

/// 全部 API 路由（不含 /api 前缀，由调用方挂载）
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(solicitud_routes())
        .merge(novedad_routes())
        .merge(inventario_routes())
        .merge(reporte_routes())
}
