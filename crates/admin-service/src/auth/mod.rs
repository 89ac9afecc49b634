//! 认证模块
//!
//! JWT 签发校验、密码哈希与角色权限矩阵

mod jwt;
mod password;
pub mod permissions;

pub use jwt::{Claims, JwtConfig, JwtManager, TokenSubject};
pub use password::{hash_password, verify_password};
