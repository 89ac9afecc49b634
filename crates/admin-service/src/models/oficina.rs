//! 机构与通用目录项

use serde::Serialize;

/// 分支机构
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Oficina {
    pub id: i64,
    pub nombre: String,
    /// 该机构承担的费用比例（0-100）
    pub porcentaje_oficina: f64,
    pub es_sede_principal: bool,
    pub activo: bool,
}

/// 下拉目录项（分类、供应商、机构）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogoItem {
    pub id: i64,
    pub nombre: String,
}
