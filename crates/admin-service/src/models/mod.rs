//! 领域模型

pub mod enums;
pub mod inventario;
pub mod novedad;
pub mod oficina;
pub mod solicitud;

pub use enums::*;
pub use inventario::*;
pub use novedad::*;
pub use oficina::*;
pub use solicitud::*;
