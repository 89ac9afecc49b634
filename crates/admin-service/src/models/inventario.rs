//! 企业库存模型

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::enums::{AccionHistorial, EstadoStock};
use crate::error::{ApiError, Result};

/// 未分配产品归属的机构名称
pub const SEDE_PRINCIPAL: &str = "Sede Principal";

/// 自动编码前缀
pub const PREFIJO_CODIGO: &str = "QInven";

/// 生成顺序编码，如 QInven-0007
pub fn codigo_secuencial(numero: i64) -> String {
    format!("{}-{:04}", PREFIJO_CODIGO, numero)
}

/// 企业库存产品
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Producto {
    pub id: i64,
    pub codigo_unico: String,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria_id: i64,
    pub categoria: String,
    pub proveedor_id: i64,
    pub proveedor: String,
    pub valor_unitario: f64,
    pub cantidad: i32,
    pub cantidad_minima: i32,
    pub ubicacion: Option<String>,
    pub es_asignable: bool,
    pub activo: bool,
    pub ruta_imagen: Option<String>,
    pub oficina_creadora_id: Option<i64>,
    pub usuario_creador: Option<String>,
    pub fecha_creacion: DateTime<Utc>,
    /// 最近一次有效分配的机构，未分配时为 Sede Principal
    pub oficina: Option<String>,
}

impl Producto {
    /// 分配前置校验：产品有效、可分配，0 < cantidad <= 库存
    pub fn validar_asignacion(&self, cantidad: i32) -> Result<()> {
        if !self.activo {
            return Err(ApiError::ProductoNotFound(self.id));
        }
        if !self.es_asignable {
            return Err(ApiError::Conflict(format!(
                "El producto {} no es asignable",
                self.codigo_unico
            )));
        }
        if cantidad <= 0 {
            return Err(ApiError::Validation(
                "La cantidad a asignar debe ser mayor a cero".to_string(),
            ));
        }
        if cantidad > self.cantidad {
            return Err(ApiError::InsufficientStock {
                disponible: self.cantidad,
                requerido: cantidad,
            });
        }
        Ok(())
    }
}

/// 新建产品
#[derive(Debug, Clone, PartialEq)]
pub struct NuevoProducto {
    pub codigo_unico: Option<String>,
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria_id: i64,
    pub proveedor_id: i64,
    pub valor_unitario: f64,
    pub cantidad: i32,
    pub cantidad_minima: i32,
    pub ubicacion: Option<String>,
    pub es_asignable: bool,
    pub ruta_imagen: Option<String>,
    pub oficina_creadora_id: Option<i64>,
    pub usuario_creador: String,
}

/// 产品修改；ruta_imagen 为 None 时保留原图
#[derive(Debug, Clone, PartialEq)]
pub struct ActualizacionProducto {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub categoria_id: i64,
    pub proveedor_id: i64,
    pub valor_unitario: f64,
    pub cantidad: i32,
    pub cantidad_minima: i32,
    pub ubicacion: Option<String>,
    pub es_asignable: bool,
    pub ruta_imagen: Option<String>,
}

/// 产品分配
#[derive(Debug, Clone, PartialEq)]
pub struct AsignacionProducto {
    pub producto_id: i64,
    pub oficina_id: i64,
    pub cantidad: i32,
    pub usuario_asignado_id: Option<i64>,
    pub usuario_asignador: String,
}

/// 库存流水
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MovimientoInventario {
    pub id: i64,
    pub producto_id: i64,
    pub producto: String,
    pub codigo_unico: String,
    pub oficina_id: Option<i64>,
    pub oficina: Option<String>,
    pub accion: AccionHistorial,
    pub cantidad: i32,
    pub usuario_accion: String,
    pub fecha: DateTime<Utc>,
}

// ============ 报表 ============

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StockPorCategoria {
    pub categoria: String,
    pub total_productos: i64,
    pub total_stock: i64,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ValorInventario {
    pub valor_total: f64,
    pub total_unidades: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AsignacionesPorOficina {
    pub oficina_id: i64,
    pub oficina: String,
    pub cantidad_asignaciones: i64,
    pub unidades_asignadas: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductosPorOficina {
    pub oficina: String,
    pub total_productos: i64,
    pub total_stock: i64,
    pub valor_total: f64,
}

/// 低库存产品
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProductoStockBajo {
    pub id: i64,
    pub codigo_unico: String,
    pub nombre: String,
    pub categoria: String,
    pub cantidad: i32,
    pub cantidad_minima: i32,
    pub valor_unitario: f64,
}

/// 带库存水位的低库存条目
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertaStock {
    #[serde(flatten)]
    pub producto: ProductoStockBajo,
    pub valor_total: f64,
    pub estado_stock: EstadoStock,
}

impl From<ProductoStockBajo> for AlertaStock {
    fn from(producto: ProductoStockBajo) -> Self {
        let estado_stock = EstadoStock::clasificar(producto.cantidad, producto.cantidad_minima);
        let valor_total = producto.cantidad as f64 * producto.valor_unitario;
        Self {
            producto,
            valor_total,
            estado_stock,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EstadisticasInventario {
    pub total_productos: i64,
    pub valor_total: f64,
    pub stock_bajo: i64,
    pub asignables: i64,
    pub total_categorias: i64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn producto(id: i64, cantidad: i32) -> Producto {
        Producto {
            id,
            codigo_unico: codigo_secuencial(id),
            nombre: "Portátil".to_string(),
            descripcion: None,
            categoria_id: 1,
            categoria: "Tecnología".to_string(),
            proveedor_id: 2,
            proveedor: "Proveedor Uno".to_string(),
            valor_unitario: 1500.0,
            cantidad,
            cantidad_minima: 2,
            ubicacion: Some("Bodega 1".to_string()),
            es_asignable: true,
            activo: true,
            ruta_imagen: None,
            oficina_creadora_id: None,
            usuario_creador: Some("admin".to_string()),
            fecha_creacion: Utc::now(),
            oficina: Some(SEDE_PRINCIPAL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::producto;
    use super::*;

    #[test]
    fn test_codigo_secuencial() {
        assert_eq!(codigo_secuencial(1), "QInven-0001");
        assert_eq!(codigo_secuencial(123), "QInven-0123");
        assert_eq!(codigo_secuencial(12345), "QInven-12345");
    }

    #[test]
    fn test_validar_asignacion() {
        let p = producto(1, 5);
        assert!(p.validar_asignacion(5).is_ok());
        assert!(matches!(
            p.validar_asignacion(6),
            Err(ApiError::InsufficientStock {
                disponible: 5,
                requerido: 6
            })
        ));
        assert!(matches!(p.validar_asignacion(0), Err(ApiError::Validation(_))));

        let no_asignable = Producto {
            es_asignable: false,
            ..producto(2, 5)
        };
        assert!(matches!(
            no_asignable.validar_asignacion(1),
            Err(ApiError::Conflict(_))
        ));

        let inactivo = Producto {
            activo: false,
            ..producto(3, 5)
        };
        assert!(matches!(
            inactivo.validar_asignacion(1),
            Err(ApiError::ProductoNotFound(3))
        ));
    }

    #[test]
    fn test_alerta_stock() {
        let alerta: AlertaStock = ProductoStockBajo {
            id: 1,
            codigo_unico: "QInven-0001".into(),
            nombre: "Toner".into(),
            categoria: "Insumos".into(),
            cantidad: 0,
            cantidad_minima: 3,
            valor_unitario: 20.0,
        }
        .into();
        assert_eq!(alerta.estado_stock, EstadoStock::Critico);
        assert_eq!(alerta.valor_total, 0.0);

        let json = serde_json::to_value(&alerta).unwrap();
        assert_eq!(json["codigoUnico"], "QInven-0001");
        assert_eq!(json["estadoStock"], "Crítico");
    }
}
