//! 物资申请全流程集成测试
//!
//! 需要 PostgreSQL：设置 TEST_DATABASE_URL 后运行 `cargo test -- --ignored`

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{TestApp, crear_material, crear_oficina, crear_usuario, stock_material};
use serde_json::json;
use suministros_admin::auth::permissions::{ROLE_APROBADOR, ROLE_OFICINA};

const BOUNDARY: &str = "suministros-test-boundary";

fn multipart_novedad(solicitud_id: i64, cantidad_afectada: i32, token: &str) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in [
        ("solicitud_id", solicitud_id.to_string()),
        ("tipo_novedad", "Producto dañado".to_string()),
        ("descripcion", "Caja golpeada en el transporte".to_string()),
        ("cantidad_afectada", cantidad_afectada.to_string()),
        ("prioridad", "alta".to_string()),
    ] {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"imagen_novedad\"; filename=\"caja rota.png\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method("POST")
        .uri("/api/solicitudes/novedades")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

struct Escenario {
    app: TestApp,
    oficina_token: String,
    aprobador_token: String,
    material_id: i64,
}

async fn escenario(stock: i32) -> Escenario {
    let app = TestApp::connected().await;
    let oficina_id = crear_oficina(app.pool(), 0.1).await;
    let (oficina_user, _) = crear_usuario(app.pool(), ROLE_OFICINA, Some(oficina_id), "clave-oficina").await;
    let (aprobador_user, _) = crear_usuario(app.pool(), ROLE_APROBADOR, None, "clave-aprobador").await;
    let material_id = crear_material(app.pool(), stock, 1000.0).await;

    Escenario {
        oficina_token: app.token(oficina_user, ROLE_OFICINA, Some(oficina_id)),
        aprobador_token: app.token(aprobador_user, ROLE_APROBADOR, None),
        app,
        material_id,
    }
}

async fn crear_solicitud(e: &Escenario, cantidad: i32) -> i64 {
    let (status, body) = e
        .app
        .post_json(
            "/api/solicitudes",
            &e.oficina_token,
            json!({ "materialId": e.material_id, "cantidad": cantidad }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

#[tokio::test]
#[ignore = "需要 TEST_DATABASE_URL"]
async fn test_create_approve_return_and_novedad() {
    let e = escenario(10).await;
    let id = crear_solicitud(&e, 4).await;

    let (status, body) = e
        .app
        .get(&format!("/api/solicitudes/{id}"), Some(&e.oficina_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["estadoId"], 1);

    let (status, body) = e
        .app
        .post_json(
            &format!("/api/solicitudes/{id}/aprobar"),
            &e.aprobador_token,
            json!({ "observacion": "Aprobado para el mes" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["estadoId"], 2);
    assert_eq!(stock_material(e.app.pool(), e.material_id).await, 6);

    // 已审批的申请不能再次审批
    let (status, body) = e
        .app
        .post_json(&format!("/api/solicitudes/{id}/aprobar"), &e.aprobador_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");

    let (status, body) = e
        .app
        .post_json(
            &format!("/api/solicitudes/{id}/devolucion"),
            &e.oficina_token,
            json!({ "cantidadDevuelta": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["estadoId"], 6);
    assert_eq!(stock_material(e.app.pool(), e.material_id).await, 7);

    let (status, body) = e
        .app
        .get(&format!("/api/solicitudes/{id}/info-devolucion"), Some(&e.oficina_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cantidadPendiente"], 2);

    let (status, body) = e.app.send(multipart_novedad(id, 1, &e.oficina_token)).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let ruta = body["data"]["rutaImagen"].as_str().unwrap();
    assert!(ruta.starts_with("images/novedades/caja_rota_"));

    let (_, body) = e
        .app
        .get(&format!("/api/solicitudes/{id}"), Some(&e.oficina_token))
        .await;
    assert_eq!(body["data"]["estadoId"], 7);

    let (status, body) = e
        .app
        .post_json(
            "/api/solicitudes/novedades/gestionar",
            &e.aprobador_token,
            json!({ "solicitudId": id, "accion": "aceptar", "observaciones": "Se repone" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["estado"], "aceptada");

    let (status, body) = e
        .app
        .get(&format!("/api/solicitudes/{id}/detalles"), Some(&e.aprobador_token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["solicitud"]["estadoId"], 8);
    assert_eq!(body["data"]["novedades"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "需要 TEST_DATABASE_URL"]
async fn test_insufficient_stock_leaves_solicitud_pending() {
    let e = escenario(2).await;
    let id = crear_solicitud(&e, 5).await;

    let (status, body) = e
        .app
        .post_json(&format!("/api/solicitudes/{id}/aprobar"), &e.aprobador_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(stock_material(e.app.pool(), e.material_id).await, 2);

    let (_, body) = e
        .app
        .get(&format!("/api/solicitudes/{id}"), Some(&e.aprobador_token))
        .await;
    assert_eq!(body["data"]["estadoId"], 1);

    // 部分审批仍在库存范围内
    let (status, body) = e
        .app
        .post_json(
            &format!("/api/solicitudes/{id}/aprobar-parcial"),
            &e.aprobador_token,
            json!({ "cantidadAprobada": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["estadoId"], 4);
    assert_eq!(stock_material(e.app.pool(), e.material_id).await, 0);
}

#[tokio::test]
#[ignore = "需要 TEST_DATABASE_URL"]
async fn test_rejected_solicitud_cannot_be_returned() {
    let e = escenario(5).await;
    let id = crear_solicitud(&e, 1).await;

    let (status, _) = e
        .app
        .post_json(&format!("/api/solicitudes/{id}/rechazar"), &e.aprobador_token, json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = e
        .app
        .post_json(
            &format!("/api/solicitudes/{id}/devolucion"),
            &e.oficina_token,
            json!({ "cantidadDevuelta": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATE_TRANSITION");
    assert_eq!(stock_material(e.app.pool(), e.material_id).await, 5);
}

#[tokio::test]
#[ignore = "需要 TEST_DATABASE_URL"]
async fn test_other_office_cannot_see_solicitud() {
    let e = escenario(5).await;
    let id = crear_solicitud(&e, 1).await;

    let otra_oficina = crear_oficina(e.app.pool(), 0.0).await;
    let (otro_user, _) = crear_usuario(e.app.pool(), ROLE_OFICINA, Some(otra_oficina), "otra-clave").await;
    let token = e.app.token(otro_user, ROLE_OFICINA, Some(otra_oficina));

    let (status, body) = e.app.get(&format!("/api/solicitudes/{id}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SOLICITUD_NOT_FOUND");
}

async fn login(app: &TestApp, username: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "username": username, "password": password }).to_string(),
        ))
        .unwrap();
    app.send(request).await
}

#[tokio::test]
#[ignore = "需要 TEST_DATABASE_URL"]
async fn test_login_and_lockout() {
    let app = TestApp::connected().await;
    let oficina_id = crear_oficina(app.pool(), 0.0).await;
    let (_, username) = crear_usuario(app.pool(), ROLE_OFICINA, Some(oficina_id), "correcta").await;

    let (status, body) = login(&app, &username, "correcta").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["user"]["role"], ROLE_OFICINA);
    assert_eq!(body["data"]["user"]["oficinaId"], oficina_id);

    let (status, body) = login(&app, &username, "incorrecta").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");

    let max = suministros_shared::test_utils::test_app_config()
        .auth
        .max_failed_logins;
    for _ in 1..max {
        login(&app, &username, "incorrecta").await;
    }
    let (status, body) = login(&app, &username, "correcta").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "USER_LOCKED");
}
