//! 业务枚举类型定义
//!
//! 所有枚举都支持数据库（sqlx）和 JSON（serde）序列化

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 申请单状态
///
/// 以整数编码存储，对应 EstadosSolicitud 查找表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum SolicitudEstado {
    /// 已创建，等待审批
    Pendiente = 1,
    /// 全额发放
    Aprobada = 2,
    /// 已拒绝（终态）
    Rechazada = 3,
    /// 部分发放
    AprobadaParcial = 4,
    /// 已发放数量全部退回
    Devuelta = 5,
    /// 部分退回
    DevolucionParcial = 6,
    /// 存在未处理的异常上报
    NovedadRegistrada = 7,
    NovedadAceptada = 8,
    NovedadRechazada = 9,
}

impl SolicitudEstado {
    pub const ALL: [SolicitudEstado; 9] = [
        Self::Pendiente,
        Self::Aprobada,
        Self::Rechazada,
        Self::AprobadaParcial,
        Self::Devuelta,
        Self::DevolucionParcial,
        Self::NovedadRegistrada,
        Self::NovedadAceptada,
        Self::NovedadRechazada,
    ];

    /// 数据库中的状态编码
    pub fn codigo(self) -> i32 {
        self as i32
    }

    pub fn from_codigo(codigo: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.codigo() == codigo)
    }

    /// 展示名称，与查找表中的 NombreEstado 一致
    pub fn nombre(self) -> &'static str {
        match self {
            Self::Pendiente => "Pendiente",
            Self::Aprobada => "Aprobada",
            Self::Rechazada => "Rechazada",
            Self::AprobadaParcial => "Aprobada Parcial",
            Self::Devuelta => "Devuelta",
            Self::DevolucionParcial => "Devolución Parcial",
            Self::NovedadRegistrada => "Novedad Registrada",
            Self::NovedadAceptada => "Novedad Aceptada",
            Self::NovedadRechazada => "Novedad Rechazada",
        }
    }

    fn clave(self) -> &'static str {
        match self {
            Self::Pendiente => "pendiente",
            Self::Aprobada => "aprobada",
            Self::Rechazada => "rechazada",
            Self::AprobadaParcial => "aprobada_parcial",
            Self::Devuelta => "devuelta",
            Self::DevolucionParcial => "devolucion_parcial",
            Self::NovedadRegistrada => "novedad_registrada",
            Self::NovedadAceptada => "novedad_aceptada",
            Self::NovedadRechazada => "novedad_rechazada",
        }
    }

    /// 是否仍可审批（批准、部分批准、拒绝）
    pub fn permite_decision(self) -> bool {
        self == Self::Pendiente
    }

    /// 是否可登记退回：必须已发放且尚未全部退回，且没有未处理的异常
    pub fn permite_devolucion(self) -> bool {
        matches!(
            self,
            Self::Aprobada
                | Self::AprobadaParcial
                | Self::DevolucionParcial
                | Self::NovedadAceptada
                | Self::NovedadRechazada
        )
    }

    /// 是否可登记异常：物资已发放，且当前没有未处理的异常
    pub fn permite_novedad(self) -> bool {
        matches!(
            self,
            Self::Aprobada
                | Self::AprobadaParcial
                | Self::Devuelta
                | Self::DevolucionParcial
                | Self::NovedadAceptada
                | Self::NovedadRechazada
        )
    }

    /// 是否属于异常相关状态
    pub fn es_novedad(self) -> bool {
        matches!(
            self,
            Self::NovedadRegistrada | Self::NovedadAceptada | Self::NovedadRechazada
        )
    }
}

impl fmt::Display for SolicitudEstado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nombre())
    }
}

/// 接受状态编码、snake_case 键或展示名称（忽略大小写）
impl FromStr for SolicitudEstado {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(codigo) = s.parse::<i32>() {
            return Self::from_codigo(codigo).ok_or_else(|| format!("estado desconocido: {s}"));
        }
        let lower = s.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|e| e.clave() == lower || e.nombre().to_lowercase() == lower)
            .ok_or_else(|| format!("estado desconocido: {s}"))
    }
}

/// 异常上报状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "varchar", rename_all = "snake_case")]
pub enum NovedadEstado {
    /// 新登记，初始状态
    #[default]
    Registrada,
    Pendiente,
    EnProceso,
    Aceptada,
    Rechazada,
    Resuelta,
}

impl NovedadEstado {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Registrada => "registrada",
            Self::Pendiente => "pendiente",
            Self::EnProceso => "en_proceso",
            Self::Aceptada => "aceptada",
            Self::Rechazada => "rechazada",
            Self::Resuelta => "resuelta",
        }
    }

    /// 尚未处理完毕
    pub fn es_abierta(self) -> bool {
        matches!(self, Self::Registrada | Self::Pendiente | Self::EnProceso)
    }

    /// 需要同步申请单状态的终态
    pub fn resolucion(self) -> Option<AccionNovedad> {
        match self {
            Self::Aceptada => Some(AccionNovedad::Aceptar),
            Self::Rechazada => Some(AccionNovedad::Rechazar),
            _ => None,
        }
    }
}

impl fmt::Display for NovedadEstado {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NovedadEstado {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "registrada" => Ok(Self::Registrada),
            "pendiente" => Ok(Self::Pendiente),
            "en_proceso" | "en proceso" => Ok(Self::EnProceso),
            "aceptada" => Ok(Self::Aceptada),
            "rechazada" => Ok(Self::Rechazada),
            "resuelta" => Ok(Self::Resuelta),
            other => Err(format!("estado de novedad desconocido: {other}")),
        }
    }
}

/// 处理异常的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccionNovedad {
    Aceptar,
    Rechazar,
}

impl AccionNovedad {
    pub fn estado_novedad(self) -> NovedadEstado {
        match self {
            Self::Aceptar => NovedadEstado::Aceptada,
            Self::Rechazar => NovedadEstado::Rechazada,
        }
    }

    pub fn estado_solicitud(self) -> SolicitudEstado {
        match self {
            Self::Aceptar => SolicitudEstado::NovedadAceptada,
            Self::Rechazar => SolicitudEstado::NovedadRechazada,
        }
    }
}

/// 异常优先级
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
pub enum Prioridad {
    Baja,
    #[default]
    Media,
    Alta,
}

impl FromStr for Prioridad {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "baja" => Ok(Self::Baja),
            "media" | "" => Ok(Self::Media),
            "alta" => Ok(Self::Alta),
            other => Err(format!("prioridad desconocida: {other}")),
        }
    }
}

/// 库存流水动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccionHistorial {
    /// 分配到分支机构
    Asignar,
    /// 产品停用
    BajaProducto,
}

/// 库存水位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstadoStock {
    #[serde(rename = "Crítico")]
    Critico,
    Bajo,
    Normal,
}

impl EstadoStock {
    /// 库存为 0 为 Crítico，不高于最低库存为 Bajo
    pub fn clasificar(cantidad: i32, minima: i32) -> Self {
        if cantidad <= 0 {
            Self::Critico
        } else if cantidad <= minima {
            Self::Bajo
        } else {
            Self::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solicitud_estado_codes_roundtrip() {
        for estado in SolicitudEstado::ALL {
            assert_eq!(SolicitudEstado::from_codigo(estado.codigo()), Some(estado));
        }
        assert_eq!(SolicitudEstado::from_codigo(0), None);
        assert_eq!(SolicitudEstado::from_codigo(10), None);
        assert_eq!(SolicitudEstado::NovedadRegistrada.codigo(), 7);
    }

    #[test]
    fn test_solicitud_estado_parse() {
        assert_eq!("1".parse::<SolicitudEstado>(), Ok(SolicitudEstado::Pendiente));
        assert_eq!(
            "aprobada_parcial".parse::<SolicitudEstado>(),
            Ok(SolicitudEstado::AprobadaParcial)
        );
        assert_eq!(
            "Devolución Parcial".parse::<SolicitudEstado>(),
            Ok(SolicitudEstado::DevolucionParcial)
        );
        assert_eq!("RECHAZADA".parse::<SolicitudEstado>(), Ok(SolicitudEstado::Rechazada));
        assert!("archivada".parse::<SolicitudEstado>().is_err());
        assert!("42".parse::<SolicitudEstado>().is_err());
    }

    #[test]
    fn test_solicitud_estado_rules() {
        assert!(SolicitudEstado::Pendiente.permite_decision());
        assert!(!SolicitudEstado::Aprobada.permite_decision());

        assert!(SolicitudEstado::Aprobada.permite_devolucion());
        assert!(SolicitudEstado::DevolucionParcial.permite_devolucion());
        assert!(!SolicitudEstado::Pendiente.permite_devolucion());
        assert!(!SolicitudEstado::Rechazada.permite_devolucion());
        assert!(!SolicitudEstado::Devuelta.permite_devolucion());
        assert!(!SolicitudEstado::NovedadRegistrada.permite_devolucion());

        assert!(SolicitudEstado::Devuelta.permite_novedad());
        assert!(!SolicitudEstado::NovedadRegistrada.permite_novedad());
        assert!(!SolicitudEstado::Pendiente.permite_novedad());

        let novedades: Vec<_> = SolicitudEstado::ALL
            .into_iter()
            .filter(|e| e.es_novedad())
            .map(|e| e.codigo())
            .collect();
        assert_eq!(novedades, vec![7, 8, 9]);
    }

    #[test]
    fn test_solicitud_estado_serialization() {
        let json = serde_json::to_string(&SolicitudEstado::AprobadaParcial).unwrap();
        assert_eq!(json, "\"aprobada_parcial\"");
        assert_eq!(SolicitudEstado::DevolucionParcial.to_string(), "Devolución Parcial");
    }

    #[test]
    fn test_novedad_estado() {
        assert_eq!(NovedadEstado::default(), NovedadEstado::Registrada);
        assert!(NovedadEstado::EnProceso.es_abierta());
        assert!(!NovedadEstado::Resuelta.es_abierta());
        assert_eq!("en proceso".parse::<NovedadEstado>(), Ok(NovedadEstado::EnProceso));
        assert_eq!(
            serde_json::to_string(&NovedadEstado::EnProceso).unwrap(),
            "\"en_proceso\""
        );
        assert_eq!(NovedadEstado::Aceptada.resolucion(), Some(AccionNovedad::Aceptar));
        assert_eq!(NovedadEstado::Resuelta.resolucion(), None);
    }

    #[test]
    fn test_accion_novedad_targets() {
        assert_eq!(AccionNovedad::Aceptar.estado_novedad(), NovedadEstado::Aceptada);
        assert_eq!(
            AccionNovedad::Aceptar.estado_solicitud(),
            SolicitudEstado::NovedadAceptada
        );
        assert_eq!(
            AccionNovedad::Rechazar.estado_solicitud().codigo(),
            9
        );
        let accion: AccionNovedad = serde_json::from_str("\"rechazar\"").unwrap();
        assert_eq!(accion, AccionNovedad::Rechazar);
        assert!(serde_json::from_str::<AccionNovedad>("\"archivar\"").is_err());
    }

    #[test]
    fn test_estado_stock() {
        assert_eq!(EstadoStock::clasificar(0, 5), EstadoStock::Critico);
        assert_eq!(EstadoStock::clasificar(5, 5), EstadoStock::Bajo);
        assert_eq!(EstadoStock::clasificar(6, 5), EstadoStock::Normal);
        assert_eq!(serde_json::to_string(&EstadoStock::Critico).unwrap(), "\"Crítico\"");
    }

    #[test]
    fn test_prioridad_parse() {
        assert_eq!("".parse::<Prioridad>(), Ok(Prioridad::Media));
        assert_eq!("ALTA".parse::<Prioridad>(), Ok(Prioridad::Alta));
        assert!("urgente".parse::<Prioridad>().is_err());
    }
}
