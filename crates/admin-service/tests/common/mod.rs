//! 集成测试公共工具
//!
//! 构建路由、签发测试 Token、发送请求并解析 JSON 响应，
//! 以及为数据库流程测试准备基础数据。

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::PgPool;
use suministros_admin::auth::{TokenSubject, permissions::permissions_for_role};
use suministros_admin::{AppState, build_app};
use suministros_shared::{database::Database, test_utils};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    /// 惰性连接池：不访问数据库的路径（认证、权限）无需真实数据库
    pub fn lazy() -> Self {
        let config = test_utils::test_app_config();
        let db = Database::connect_lazy(&config.database).expect("lazy pool");
        Self::from_pool(db.pool().clone())
    }

    /// 连接 TEST_DATABASE_URL 并执行迁移
    pub async fn connected() -> Self {
        let config = test_utils::test_app_config();
        let db = Database::connect(&config.database)
            .await
            .expect("TEST_DATABASE_URL must point to a reachable database");
        db.run_migrations().await.expect("migrations");
        Self::from_pool(db.pool().clone())
    }

    fn from_pool(pool: PgPool) -> Self {
        let config = test_utils::test_app_config();
        let state = AppState::new(pool, &config);
        Self {
            router: build_app(state.clone(), &config),
            state,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.state.pool
    }

    pub fn token(&self, user_id: i64, role: &str, oficina_id: Option<i64>) -> String {
        let (token, _) = self
            .state
            .jwt_manager
            .generate_token(&TokenSubject {
                user_id,
                username: format!("{role}-{user_id}"),
                display_name: Some(format!("Usuario {user_id}")),
                oficina_id,
                roles: vec![role.to_string()],
                permissions: permissions_for_role(role),
            })
            .expect("token");
        token
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.json_request("POST", uri, token, body).await
    }

    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        token: &str,
        body: Value,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }
}

// ==================== 基础数据 ====================

pub async fn crear_oficina(pool: &PgPool, porcentaje: f64) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO Oficinas (NombreOficina, PorcentajeOficina) VALUES ($1, $2) RETURNING OficinaId",
    )
    .bind(test_utils::unique_name("Oficina"))
    .bind(porcentaje)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn crear_usuario(pool: &PgPool, rol: &str, oficina_id: Option<i64>, password: &str) -> (i64, String) {
    let username = test_utils::unique_name(rol);
    let hash = suministros_admin::auth::hash_password(password).unwrap();
    let id = sqlx::query_scalar(
        r#"
        INSERT INTO Usuarios (NombreUsuario, NombreCompleto, ContrasenaHash, Rol, OficinaId)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING UsuarioId
        "#,
    )
    .bind(&username)
    .bind(format!("Usuario {username}"))
    .bind(hash)
    .bind(rol)
    .bind(oficina_id)
    .fetch_one(pool)
    .await
    .unwrap();
    (id, username)
}

pub async fn crear_material(pool: &PgPool, stock: i32, valor_unitario: f64) -> i64 {
    sqlx::query_scalar(
        r#"
        INSERT INTO Materiales (NombreElemento, ValorUnitario, CantidadDisponible)
        VALUES ($1, $2, $3)
        RETURNING MaterialId
        "#,
    )
    .bind(test_utils::unique_name("Material"))
    .bind(valor_unitario)
    .bind(stock)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn stock_material(pool: &PgPool, material_id: i64) -> i32 {
    sqlx::query_scalar("SELECT CantidadDisponible FROM Materiales WHERE MaterialId = $1")
        .bind(material_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn crear_categoria(pool: &PgPool) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO CategoriasProductos (NombreCategoria) VALUES ($1) RETURNING CategoriaId",
    )
    .bind(test_utils::unique_name("Categoria"))
    .fetch_one(pool)
    .await
    .unwrap()
}

pub async fn crear_proveedor(pool: &PgPool) -> i64 {
    sqlx::query_scalar("INSERT INTO Proveedores (NombreProveedor) VALUES ($1) RETURNING ProveedorId")
        .bind(test_utils::unique_name("Proveedor"))
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn stock_producto(pool: &PgPool, producto_id: i64) -> i32 {
    sqlx::query_scalar("SELECT CantidadDisponible FROM ProductosCorporativos WHERE ProductoId = $1")
        .bind(producto_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
