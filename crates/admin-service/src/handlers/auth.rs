//! 认证相关的 HTTP 处理器
//!
//! 提供登录、登出、获取当前用户和刷新 Token 的 API

use axum::{Extension, Json, extract::State};
use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use suministros_shared::observability::metrics;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{Claims, TokenSubject, permissions::permissions_for_role, verify_password};
use crate::dto::{ApiResponse, LoginRequest, LoginResponse, RefreshResponse, UserInfo};
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// 数据库用户记录
#[derive(Debug, FromRow)]
struct UsuarioRow {
    id: i64,
    username: String,
    password_hash: String,
    display_name: Option<String>,
    rol: String,
    oficina_id: Option<i64>,
    oficina_nombre: Option<String>,
    activo: bool,
    intentos_fallidos: i32,
    bloqueado_hasta: Option<DateTime<Utc>>,
}

impl UsuarioRow {
    fn into_user_info(self) -> UserInfo {
        UserInfo {
            permissions: permissions_for_role(&self.rol),
            id: self.id,
            username: self.username,
            display_name: self.display_name,
            role: self.rol,
            oficina_id: self.oficina_id,
            oficina_nombre: self.oficina_nombre,
        }
    }
}

const SELECT_USUARIO: &str = r#"
    SELECT u.UsuarioId AS id, u.NombreUsuario AS username, u.ContrasenaHash AS password_hash,
           u.NombreCompleto AS display_name, u.Rol AS rol, u.OficinaId AS oficina_id,
           o.NombreOficina AS oficina_nombre, u.Activo AS activo,
           u.IntentosFallidos AS intentos_fallidos, u.BloqueadoHasta AS bloqueado_hasta
    FROM Usuarios u
    LEFT JOIN Oficinas o ON o.OficinaId = u.OficinaId
"#;

/// 用户登录
///
/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>> {
    req.validate()?;

    let sql = format!("{SELECT_USUARIO} WHERE u.NombreUsuario = $1");
    let user: UsuarioRow = match sqlx::query_as(&sql)
        .bind(req.username.trim())
        .fetch_optional(&state.pool)
        .await?
    {
        Some(user) => user,
        None => {
            metrics::record_login_attempt("unknown_user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    if !user.activo {
        metrics::record_login_attempt("disabled");
        return Err(ApiError::UserDisabled);
    }

    if user.bloqueado_hasta.is_some_and(|hasta| hasta > Utc::now()) {
        metrics::record_login_attempt("locked");
        return Err(ApiError::UserLocked);
    }

    if !verify_password(&req.password, &user.password_hash)? {
        let intentos = user.intentos_fallidos + 1;
        let bloqueado_hasta = (intentos >= state.auth.max_failed_logins)
            .then(|| Utc::now() + Duration::minutes(state.auth.lockout_minutes));

        sqlx::query(
            "UPDATE Usuarios SET IntentosFallidos = $1, BloqueadoHasta = $2 WHERE UsuarioId = $3",
        )
        .bind(intentos)
        .bind(bloqueado_hasta)
        .bind(user.id)
        .execute(&state.pool)
        .await?;

        if bloqueado_hasta.is_some() {
            warn!(user = %user.username, intentos, "Account locked after failed logins");
        }
        metrics::record_login_attempt("invalid_password");
        return Err(ApiError::InvalidCredentials);
    }

    sqlx::query(
        r#"
        UPDATE Usuarios
        SET IntentosFallidos = 0, BloqueadoHasta = NULL, UltimoAcceso = NOW()
        WHERE UsuarioId = $1
        "#,
    )
    .bind(user.id)
    .execute(&state.pool)
    .await?;

    let user = user.into_user_info();
    let (token, expires_at) = state.jwt_manager.generate_token(&TokenSubject {
        user_id: user.id,
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        oficina_id: user.oficina_id,
        roles: vec![user.role.clone()],
        permissions: user.permissions.clone(),
    })?;

    metrics::record_login_attempt("success");
    info!(user = %user.username, role = %user.role, "User logged in");

    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        expires_at,
        user,
    })))
}

/// 用户登出
///
/// POST /api/auth/logout
///
/// 令牌无状态，客户端丢弃即可
pub async fn logout(Extension(claims): Extension<Claims>) -> Json<ApiResponse<()>> {
    info!(user = %claims.username, "User logged out");
    Json(ApiResponse::success_empty("Sesión cerrada"))
}

/// 获取当前用户
///
/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<UserInfo>>> {
    let sql = format!("{SELECT_USUARIO} WHERE u.UsuarioId = $1");
    let user: UsuarioRow = sqlx::query_as(&sql)
        .bind(claims.user_id()?)
        .fetch_optional(&state.pool)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Usuario no encontrado".to_string()))?;

    if !user.activo {
        return Err(ApiError::UserDisabled);
    }

    Ok(Json(ApiResponse::success(user.into_user_info())))
}

/// 刷新 Token
///
/// POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ApiResponse<RefreshResponse>>> {
    let (token, expires_at) = state.jwt_manager.refresh_token(&claims)?;
    Ok(Json(ApiResponse::success(RefreshResponse { token, expires_at })))
}
