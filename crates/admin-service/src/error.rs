//! API 错误类型定义
//!
//! 错误码面向前端，消息面向最终用户（西语），内部细节只写日志。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// 通用的系统错误提示
const GENERIC_ERROR_MESSAGE: &str = "Error interno del servidor, intente nuevamente";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // 认证错误
    #[error("No autorizado: {0}")]
    Unauthorized(String),
    #[error("Acceso denegado: {0}")]
    Forbidden(String),
    #[error("Usuario o contraseña incorrectos")]
    InvalidCredentials,
    #[error("El usuario está inactivo")]
    UserDisabled,
    #[error("Usuario bloqueado temporalmente, intente más tarde")]
    UserLocked,

    // 验证错误
    #[error("Datos inválidos: {0}")]
    Validation(String),

    // 资源不存在
    #[error("Solicitud no encontrada: {0}")]
    SolicitudNotFound(i64),
    #[error("Novedad no encontrada: {0}")]
    NovedadNotFound(i64),
    #[error("Material no encontrado: {0}")]
    MaterialNotFound(i64),
    #[error("Producto no encontrado: {0}")]
    ProductoNotFound(i64),
    #[error("Oficina no encontrada: {0}")]
    OficinaNotFound(i64),
    #[error("Recurso no encontrado: {0}")]
    NotFound(String),

    // 业务冲突
    #[error("La solicitud {solicitud_id} está en estado {estado} y no permite {accion}")]
    InvalidStateTransition {
        solicitud_id: i64,
        estado: String,
        accion: &'static str,
    },
    #[error("Stock insuficiente: disponible {disponible}, requerido {requerido}")]
    InsufficientStock { disponible: i32, requerido: i32 },
    #[error("El registro fue modificado por otro usuario: {0}")]
    ConcurrentModification(String),
    #[error("Conflicto: {0}")]
    Conflict(String),
    #[error("No se pudo procesar el archivo: {0}")]
    FileProcessingError(String),

    // 系统错误
    #[error("Error de base de datos: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Error interno: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) | Self::UserDisabled | Self::UserLocked => StatusCode::FORBIDDEN,

            Self::Validation(_) => StatusCode::BAD_REQUEST,

            Self::SolicitudNotFound(_)
            | Self::NovedadNotFound(_)
            | Self::MaterialNotFound(_)
            | Self::ProductoNotFound(_)
            | Self::OficinaNotFound(_)
            | Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::InvalidStateTransition { .. }
            | Self::InsufficientStock { .. }
            | Self::ConcurrentModification(_)
            | Self::Conflict(_) => StatusCode::CONFLICT,

            Self::FileProcessingError(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserDisabled => "USER_DISABLED",
            Self::UserLocked => "USER_LOCKED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::SolicitudNotFound(_) => "SOLICITUD_NOT_FOUND",
            Self::NovedadNotFound(_) => "NOVEDAD_NOT_FOUND",
            Self::MaterialNotFound(_) => "MATERIAL_NOT_FOUND",
            Self::ProductoNotFound(_) => "PRODUCTO_NOT_FOUND",
            Self::OficinaNotFound(_) => "OFICINA_NOT_FOUND",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Self::Conflict(_) => "CONFLICT",
            Self::FileProcessingError(_) => "FILE_PROCESSING_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 将唯一约束冲突转换为 Conflict，其余数据库错误原样保留
    pub fn from_unique_violation(err: sqlx::Error, message: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Conflict(message.into()),
            _ => Self::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "Database operation failed");
                GENERIC_ERROR_MESSAGE.to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                GENERIC_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(format!("IO: {}", err))
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    /// 所有错误变体及其期望的 (StatusCode, error_code)
    fn all_error_variants() -> Vec<(ApiError, StatusCode, &'static str)> {
        vec![
            (ApiError::Unauthorized("token expirado".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ApiError::Forbidden("sin permiso".into()), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS"),
            (ApiError::UserDisabled, StatusCode::FORBIDDEN, "USER_DISABLED"),
            (ApiError::UserLocked, StatusCode::FORBIDDEN, "USER_LOCKED"),
            (ApiError::Validation("cantidad".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ApiError::SolicitudNotFound(1), StatusCode::NOT_FOUND, "SOLICITUD_NOT_FOUND"),
            (ApiError::NovedadNotFound(2), StatusCode::NOT_FOUND, "NOVEDAD_NOT_FOUND"),
            (ApiError::MaterialNotFound(3), StatusCode::NOT_FOUND, "MATERIAL_NOT_FOUND"),
            (ApiError::ProductoNotFound(4), StatusCode::NOT_FOUND, "PRODUCTO_NOT_FOUND"),
            (ApiError::OficinaNotFound(5), StatusCode::NOT_FOUND, "OFICINA_NOT_FOUND"),
            (ApiError::NotFound("categoria".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                ApiError::InvalidStateTransition {
                    solicitud_id: 7,
                    estado: "Rechazada".into(),
                    accion: "aprobar",
                },
                StatusCode::CONFLICT,
                "INVALID_STATE_TRANSITION",
            ),
            (
                ApiError::InsufficientStock { disponible: 2, requerido: 5 },
                StatusCode::CONFLICT,
                "INSUFFICIENT_STOCK",
            ),
            (ApiError::ConcurrentModification("solicitud 9".into()), StatusCode::CONFLICT, "CONCURRENT_MODIFICATION"),
            (ApiError::Conflict("codigo duplicado".into()), StatusCode::CONFLICT, "CONFLICT"),
            (ApiError::FileProcessingError("extension".into()), StatusCode::UNPROCESSABLE_ENTITY, "FILE_PROCESSING_ERROR"),
            (ApiError::Database(sqlx::Error::PoolTimedOut), StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            (ApiError::Internal("estado inesperado".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_all_variants_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(error.status_code(), expected_status, "{:?}", error);
            assert_eq!(error.error_code(), expected_code, "{:?}", error);
        }
    }

    #[test]
    fn test_display_carries_context() {
        let err = ApiError::InsufficientStock {
            disponible: 3,
            requerido: 10,
        };
        let text = err.to_string();
        assert!(text.contains('3') && text.contains("10"));

        let err = ApiError::InvalidStateTransition {
            solicitud_id: 42,
            estado: "Aprobada".into(),
            accion: "rechazar",
        };
        let text = err.to_string();
        assert!(text.contains("42"));
        assert!(text.contains("Aprobada"));
        assert!(text.contains("rechazar"));
    }

    #[tokio::test]
    async fn test_into_response_body_structure() {
        for (error, expected_status, expected_code) in all_error_variants() {
            let label = format!("{:?}", error);
            let response = error.into_response();
            assert_eq!(response.status(), expected_status, "{label}");

            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

            assert_eq!(body["success"], json!(false), "{label}");
            assert_eq!(body["code"], json!(expected_code), "{label}");
            assert!(!body["message"].as_str().unwrap_or("").is_empty(), "{label}");
            assert!(body["data"].is_null(), "{label}");
        }
    }

    #[tokio::test]
    async fn test_system_errors_hide_internal_details() {
        let errors = vec![
            (ApiError::Internal("panic in worker 3".into()), "worker 3"),
            (
                ApiError::Database(sqlx::Error::Protocol("relation Usuarios broken".into())),
                "Usuarios",
            ),
        ];

        for (error, leaked) in errors {
            let response = error.into_response();
            let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            let message = body["message"].as_str().unwrap();

            assert!(!message.contains(leaked), "leaked: {message}");
            assert_eq!(message, GENERIC_ERROR_MESSAGE);
        }
    }

    #[test]
    fn test_from_validation_errors() {
        use validator::{ValidationError, ValidationErrors};

        let mut errors = ValidationErrors::new();
        let mut field_error = ValidationError::new("range");
        field_error.message = Some("La cantidad debe ser mayor a cero".into());
        errors.add("cantidad", field_error);

        let api_error: ApiError = errors.into();
        match &api_error {
            ApiError::Validation(msg) => assert!(msg.contains("cantidad")),
            other => panic!("expected Validation, got {:?}", other),
        }
        assert_eq!(api_error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_non_unique_db_error_is_kept() {
        let err = ApiError::from_unique_violation(sqlx::Error::RowNotFound, "duplicado");
        assert!(matches!(err, ApiError::Database(sqlx::Error::RowNotFound)));
    }
}
