//! JWT Token 处理
//!
//! 签发与校验访问令牌，令牌中携带角色、权限与所属机构

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use suministros_shared::config::AuthConfig;

use super::permissions::{self, SOLICITUD_READ_ALL};
use crate::error::{ApiError, Result};

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    /// Token 有效期（秒）
    pub expires_in_secs: i64,
    pub issuer: String,
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            expires_in_secs: config.token_ttl_secs,
            issuer: config.issuer.clone(),
        }
    }
}

/// 签发令牌所需的用户信息
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub oficina_id: Option<i64>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    pub username: String,
    pub display_name: Option<String>,
    /// 所属机构，管理类账号可以为空
    pub oficina_id: Option<i64>,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64> {
        self.sub
            .parse()
            .map_err(|_| ApiError::Unauthorized("Identificador de usuario inválido".to_string()))
    }

    pub fn has_permission(&self, required: &str) -> bool {
        permissions::is_granted(&self.roles, &self.permissions, required)
    }

    /// 记录在业务表中的操作人名称
    pub fn nombre_visible(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }

    /// 数据可见范围：None 表示全部机构，Some 表示仅限本机构
    pub fn office_scope(&self) -> Result<Option<i64>> {
        if self.has_permission(SOLICITUD_READ_ALL) {
            return Ok(None);
        }
        self.oficina_id.map(Some).ok_or_else(|| {
            ApiError::Forbidden("El usuario no tiene una oficina asignada".to_string())
        })
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 生成 Token，返回 (token, 过期时间戳)
    pub fn generate_token(&self, subject: &TokenSubject) -> Result<(String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.expires_in_secs);

        let claims = Claims {
            sub: subject.user_id.to_string(),
            username: subject.username.clone(),
            display_name: subject.display_name.clone(),
            oficina_id: subject.oficina_id,
            roles: subject.roles.clone(),
            permissions: subject.permissions.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ApiError::Internal(format!("JWT encode failed: {}", e)))?;

        Ok((token, exp.timestamp()))
    }

    /// 校验并解析 Token
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    ApiError::Unauthorized("La sesión ha expirado".to_string())
                }
                _ => ApiError::Unauthorized("Token inválido".to_string()),
            },
        )?;

        Ok(token_data.claims)
    }

    /// 基于现有 Claims 重新签发
    pub fn refresh_token(&self, claims: &Claims) -> Result<(String, i64)> {
        let subject = TokenSubject {
            user_id: claims.user_id()?,
            username: claims.username.clone(),
            display_name: claims.display_name.clone(),
            oficina_id: claims.oficina_id,
            roles: claims.roles.clone(),
            permissions: claims.permissions.clone(),
        };
        self.generate_token(&subject)
    }

    pub fn expires_in_secs(&self) -> i64 {
        self.config.expires_in_secs
    }
}
