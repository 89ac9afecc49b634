//! 数据库仓储层
//!
//! 封装 SQL 细节；多步写操作在仓储内部以单个事务完成，
//! 库存扣减和状态变更都带条件更新，受影响行数为 0 时回滚。

mod inventario_repo;
mod novedad_repo;
mod solicitud_repo;
mod traits;

pub use inventario_repo::InventarioRepository;
pub use novedad_repo::NovedadRepository;
pub use solicitud_repo::SolicitudRepository;
pub use traits::*;

use sqlx::Postgres;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};

/// 动态 WHERE 子句的绑定值
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FilterValue {
    Text(String),
    Int(i32),
    BigInt(i64),
}

/// 按顺序生成 `$n` 占位符的 WHERE 构造器
#[derive(Debug, Default)]
pub(crate) struct WhereBuilder {
    conditions: Vec<String>,
    binds: Vec<FilterValue>,
}

impl WhereBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加条件，`{}` 会被替换为下一个占位符
    pub fn push(&mut self, template: &str, value: FilterValue) {
        self.binds.push(value);
        let placeholder = format!("${}", self.binds.len());
        self.conditions.push(template.replace("{}", &placeholder));
    }

    /// 追加不带参数的条件
    pub fn push_raw(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    pub fn next_placeholder(&self) -> usize {
        self.binds.len() + 1
    }

    pub fn clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn binds(&self) -> &[FilterValue] {
        &self.binds
    }
}

/// 将筛选值依次绑定到 query_as
pub(crate) fn bind_filters<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    binds: &[FilterValue],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for value in binds {
        query = match value {
            FilterValue::Text(s) => query.bind(s.clone()),
            FilterValue::Int(v) => query.bind(*v),
            FilterValue::BigInt(v) => query.bind(*v),
        };
    }
    query
}

/// 将筛选值依次绑定到 query_scalar
pub(crate) fn bind_scalar_filters<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    binds: &[FilterValue],
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for value in binds {
        query = match value {
            FilterValue::Text(s) => query.bind(s.clone()),
            FilterValue::Int(v) => query.bind(*v),
            FilterValue::BigInt(v) => query.bind(*v),
        };
    }
    query
}

/// 模糊匹配参数，转义 LIKE 通配符
pub(crate) fn like_pattern(texto: &str) -> String {
    let escaped = texto
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
