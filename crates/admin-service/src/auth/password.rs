//! 密码哈希

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::{ApiError, Result};

pub fn hash_password(password: &str) -> Result<String> {
    hash(password, DEFAULT_COST).map_err(|e| ApiError::Internal(format!("bcrypt hash: {}", e)))
}

/// 存储的哈希格式无效时返回错误，而不是 false
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    verify(password, hash).map_err(|e| ApiError::Internal(format!("bcrypt verify: {}", e)))
}
