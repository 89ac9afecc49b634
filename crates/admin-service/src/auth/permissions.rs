//! 角色与权限
//!
//! 权限编码格式为 `module:resource:action`，action 段支持 `*` 通配。
//! 角色到权限的映射固定在代码中，登录时写入 Token。

pub const ROLE_ADMIN: &str = "administrador";
pub const ROLE_LIDER_INVENTARIO: &str = "lider_inventario";
pub const ROLE_APROBADOR: &str = "aprobador";
pub const ROLE_TESORERIA: &str = "tesoreria";
pub const ROLE_OFICINA: &str = "oficina";

pub const SOLICITUD_READ: &str = "solicitudes:solicitud:read";
pub const SOLICITUD_READ_ALL: &str = "solicitudes:solicitud:read_all";
pub const SOLICITUD_CREATE: &str = "solicitudes:solicitud:create";
pub const SOLICITUD_APPROVE: &str = "solicitudes:solicitud:approve";
pub const SOLICITUD_APPROVE_PARTIAL: &str = "solicitudes:solicitud:approve_partial";
pub const SOLICITUD_REJECT: &str = "solicitudes:solicitud:reject";
pub const SOLICITUD_RETURN: &str = "solicitudes:solicitud:return";

pub const NOVEDAD_CREATE: &str = "solicitudes:novedad:create";
pub const NOVEDAD_MANAGE: &str = "solicitudes:novedad:manage";
pub const NOVEDAD_READ: &str = "solicitudes:novedad:read";

pub const PRODUCTO_READ: &str = "inventario:producto:read";
pub const PRODUCTO_WRITE: &str = "inventario:producto:write";
pub const PRODUCTO_ASSIGN: &str = "inventario:producto:assign";
pub const REPORTE_READ: &str = "inventario:reporte:read";

/// 角色对应的权限列表；未知角色没有任何权限
pub fn permissions_for_role(role: &str) -> Vec<String> {
    let codes: &[&str] = match role {
        ROLE_ADMIN => &["*:*:*"],
        ROLE_LIDER_INVENTARIO => &[
            "solicitudes:solicitud:*",
            "solicitudes:novedad:*",
            "inventario:producto:*",
            REPORTE_READ,
        ],
        ROLE_APROBADOR => &[
            SOLICITUD_READ,
            SOLICITUD_READ_ALL,
            SOLICITUD_APPROVE,
            SOLICITUD_APPROVE_PARTIAL,
            SOLICITUD_REJECT,
            NOVEDAD_READ,
            NOVEDAD_MANAGE,
        ],
        ROLE_TESORERIA => &[SOLICITUD_READ, SOLICITUD_READ_ALL, NOVEDAD_READ, REPORTE_READ],
        ROLE_OFICINA => &[
            SOLICITUD_READ,
            SOLICITUD_CREATE,
            SOLICITUD_RETURN,
            NOVEDAD_CREATE,
            NOVEDAD_READ,
            PRODUCTO_READ,
        ],
        _ => &[],
    };
    codes.iter().map(|c| c.to_string()).collect()
}

/// 检查权限：管理员角色直接放行，其次精确匹配，最后按 `module:resource:*` 通配
pub fn is_granted(roles: &[String], permissions: &[String], required: &str) -> bool {
    if roles.iter().any(|r| r == ROLE_ADMIN) {
        return true;
    }
    if permissions.iter().any(|p| p == required) {
        return true;
    }

    let mut parts = required.splitn(3, ':');
    match (parts.next(), parts.next()) {
        (Some(module), Some(resource)) => {
            let wildcard = format!("{}:{}:*", module, resource);
            permissions.iter().any(|p| *p == wildcard)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn granted(role: &str, required: &str) -> bool {
        is_granted(&[role.to_string()], &permissions_for_role(role), required)
    }

    #[test]
    fn test_role_matrix() {
        let cases = [
            (ROLE_ADMIN, REPORTE_READ, true),
            (ROLE_ADMIN, SOLICITUD_RETURN, true),
            (ROLE_LIDER_INVENTARIO, SOLICITUD_APPROVE, true),
            (ROLE_LIDER_INVENTARIO, PRODUCTO_ASSIGN, true),
            (ROLE_LIDER_INVENTARIO, NOVEDAD_MANAGE, true),
            (ROLE_APROBADOR, SOLICITUD_APPROVE_PARTIAL, true),
            (ROLE_APROBADOR, SOLICITUD_CREATE, false),
            (ROLE_APROBADOR, PRODUCTO_WRITE, false),
            (ROLE_TESORERIA, REPORTE_READ, true),
            (ROLE_TESORERIA, SOLICITUD_APPROVE, false),
            (ROLE_OFICINA, SOLICITUD_CREATE, true),
            (ROLE_OFICINA, SOLICITUD_RETURN, true),
            (ROLE_OFICINA, SOLICITUD_READ_ALL, false),
            (ROLE_OFICINA, NOVEDAD_MANAGE, false),
            (ROLE_OFICINA, PRODUCTO_READ, true),
            ("visitante", SOLICITUD_READ, false),
        ];
        for (role, required, expected) in cases {
            assert_eq!(granted(role, required), expected, "{role} -> {required}");
        }
    }

    #[test]
    fn test_wildcard_only_on_action() {
        let perms = vec!["inventario:producto:*".to_string()];
        assert!(is_granted(&[], &perms, PRODUCTO_WRITE));
        assert!(!is_granted(&[], &perms, REPORTE_READ));
        assert!(!is_granted(&[], &perms, "inventario"));
    }

    #[test]
    fn test_unknown_role_has_no_permissions() {
        assert!(permissions_for_role("desconocido").is_empty());
    }
}
