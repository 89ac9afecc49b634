//! HTTP 请求处理器

pub mod auth;
pub mod inventario;
pub mod novedad;
pub mod reporte;
pub mod solicitud;
