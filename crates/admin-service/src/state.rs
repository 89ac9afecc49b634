//! 应用状态定义
//!
//! 包含 Axum 路由共享的连接池、认证组件、图片存储与业务服务

use std::sync::Arc;

use sqlx::PgPool;
use suministros_shared::config::{AppConfig, AuthConfig};

use crate::auth::{JwtConfig, JwtManager};
use crate::repository::{InventarioRepository, NovedadRepository, SolicitudRepository};
use crate::service::{InventarioService, NovedadService, SolicitudService};
use crate::upload::ImageStore;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// 登录锁定策略
    pub auth: AuthConfig,
    pub jwt_manager: Arc<JwtManager>,
    pub images: ImageStore,
    pub solicitudes: Arc<SolicitudService>,
    pub novedades: Arc<NovedadService>,
    pub inventario: Arc<InventarioService>,
}

impl AppState {
    /// 按配置组装仓储与服务
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        let solicitud_repo = Arc::new(SolicitudRepository::new(pool.clone()));
        let novedad_repo = Arc::new(NovedadRepository::new(pool.clone()));
        let inventario_repo = Arc::new(InventarioRepository::new(pool.clone()));

        Self {
            auth: config.auth.clone(),
            jwt_manager: Arc::new(JwtManager::new(JwtConfig::from(&config.auth))),
            images: ImageStore::new(&config.uploads),
            solicitudes: Arc::new(SolicitudService::new(solicitud_repo.clone())),
            novedades: Arc::new(NovedadService::new(novedad_repo, solicitud_repo)),
            inventario: Arc::new(InventarioService::new(inventario_repo)),
            pool,
        }
    }
}
