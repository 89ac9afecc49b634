//! 生成 bcrypt 密码哈希，用于初始化 Usuarios 表中的账号
//!
//! ```bash
//! cargo run -p suministros-admin-service --example hash_password -- 'S3creta!'
//! ```

use suministros_admin::auth::hash_password;

fn main() -> anyhow::Result<()> {
    let password = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("usage: hash_password <password>"))?;

    let hash = hash_password(&password)?;
    println!("{hash}");
    Ok(())
}
