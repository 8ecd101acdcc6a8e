//! API Router with Swagger UI

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dto::*;
use crate::api::handlers::{auth, contacts, health};
use crate::api::metrics::{self, MetricsState};
use crate::auth::jwt::JwtConfig;
use crate::auth::middleware::{auth_middleware, AuthState};

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::register,
        auth::login,
        auth::refresh_token,
        auth::get_current_user,
        // Contacts
        contacts::list_contacts,
        contacts::get_contact,
        contacts::create_contact,
        contacts::update_contact,
        contacts::delete_contact,
        contacts::search_contacts,
        contacts::upcoming_birthdays,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            PaginatedResponse<contacts::ContactDto>,
            // Auth
            auth::RegisterRequest,
            auth::UserDto,
            auth::LoginForm,
            auth::TokenPair,
            auth::RefreshRequest,
            // Contacts
            contacts::ContactDto,
            contacts::CreateContactRequest,
            contacts::UpdateContactRequest,
            // Health
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Проверка состояния сервиса. Используйте для health-check мониторинга (uptime, ping, readiness)."),
        (name = "Authentication", description = "Регистрация и вход пользователей. Вход возвращает пару access/refresh токенов; access-токен передаётся в заголовке `Authorization: Bearer <token>`, refresh-токен обменивается через `POST /token/refresh`."),
        (name = "Contacts", description = "Управление контактами. Все операции ограничены контактами текущего пользователя: чужой контакт неотличим от несуществующего (404)."),
    ),
    info(
        title = "Contacts Service API",
        version = "0.1.0",
        description = "REST API для персональной адресной книги.

## Аутентификация

1. Зарегистрируйтесь через `POST /users/`
2. Получите токены через `POST /token` (form-поля `username` = email и `password`)
3. Передавайте access-токен в заголовке `Authorization: Bearer <token>`
4. Обновляйте пару токенов через `POST /token/refresh`

## Формат ответов

Одиночные REST-ответы обёрнуты в стандартную оболочку:
```json
{\"success\": true, \"data\": {...}, \"error\": null}
```

При ошибке:
```json
{\"success\": false, \"data\": null, \"error\": \"описание ошибки\"}
```

## Пагинация

`GET /contacts/` поддерживает параметры `page` (от 1) и `page_size` (по умолчанию 20).",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(
    db: DatabaseConnection,
    jwt_config: JwtConfig,
    prometheus_handle: PrometheusHandle,
) -> Router {
    let middleware_state = AuthState {
        jwt_config: jwt_config.clone(),
        db: db.clone(),
    };

    let auth_state = auth::AuthHandlerState {
        db: db.clone(),
        jwt_config,
    };

    let contact_state = contacts::ContactHandlerState { db };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Auth routes (public)
    let public_routes = Router::new()
        .route("/users/", post(auth::register))
        .route("/token", post(auth::login))
        .route("/token/refresh", post(auth::refresh_token))
        .with_state(auth_state.clone());

    // Current-user route (protected)
    let me_routes = Router::new()
        .route("/users/me", get(auth::get_current_user))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // Contact routes (protected, owner-scoped)
    let contact_routes = Router::new()
        .route(
            "/contacts/",
            get(contacts::list_contacts).post(contacts::create_contact),
        )
        .route("/contacts/search/", get(contacts::search_contacts))
        .route(
            "/contacts/upcoming-birthdays/",
            get(contacts::upcoming_birthdays),
        )
        .route(
            "/contacts/{id}",
            get(contacts::get_contact)
                .put(contacts::update_contact)
                .delete(contacts::delete_contact),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(contact_state);

    let metrics_state = MetricsState {
        handle: prometheus_handle,
    };

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health + metrics
        .route("/health", get(health::health_check))
        .route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics_state),
        )
        // Auth + contacts
        .merge(public_routes)
        .merge(me_routes)
        .merge(contact_routes)
        // Middleware
        .layer(middleware::from_fn(metrics::track_http_metrics))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::{Datelike, Duration, Utc};
    use sea_orm_migration::MigratorTrait;
    use serde_json::{json, Value};
    use tower::Service;

    use crate::infrastructure::database::migrator::Migrator;

    async fn test_app() -> Router {
        let mut opt = sea_orm::ConnectOptions::new("sqlite::memory:");
        // A pooled in-memory SQLite would give every connection its own
        // empty database, so pin the pool to one connection.
        opt.max_connections(1);
        let db = sea_orm::Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let jwt_config = JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_expiration_minutes: 15,
            refresh_expiration_days: 7,
            issuer: "contacts-service".to_string(),
        };

        let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
            .build_recorder()
            .handle();

        create_api_router(db, jwt_config, handle)
    }

    async fn send(app: &mut Router, req: Request<Body>) -> axum::response::Response {
        app.call(req).await.unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &mut Router, email: &str, password: &str) -> StatusCode {
        let req = json_request(
            "POST",
            "/users/",
            None,
            &json!({"email": email, "password": password}),
        );
        send(app, req).await.status()
    }

    /// Log in and return (access_token, refresh_token)
    async fn login(app: &mut Router, email: &str, password: &str) -> (String, String) {
        let req = Request::builder()
            .method("POST")
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "username={}&password={}",
                email, password
            )))
            .unwrap();
        let resp = send(app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        (
            body["data"]["access_token"].as_str().unwrap().to_string(),
            body["data"]["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    async fn create_contact(app: &mut Router, token: &str, body: &Value) -> Value {
        let resp = send(app, json_request("POST", "/contacts/", Some(token), body)).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        body_json(resp).await
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let mut app = test_app().await;
        let resp = send(&mut app, get_request("/health", None)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn register_duplicate_email_conflicts() {
        let mut app = test_app().await;
        assert_eq!(
            register(&mut app, "alice@example.com", "password123").await,
            StatusCode::CREATED
        );
        assert_eq!(
            register(&mut app, "alice@example.com", "password456").await,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn register_validates_input() {
        let mut app = test_app().await;
        assert_eq!(
            register(&mut app, "not-an-email", "password123").await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            register(&mut app, "alice@example.com", "short").await,
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn login_resolves_to_the_registered_user() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (access, _) = login(&mut app, "alice@example.com", "password123").await;

        let resp = send(&mut app, get_request("/users/me", Some(&access))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["email"], "alice@example.com");
        assert_eq!(body["data"]["is_active"], true);
    }

    #[tokio::test]
    async fn login_rejects_wrong_password() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;

        let req = Request::builder()
            .method("POST")
            .uri("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=alice@example.com&password=wrong"))
            .unwrap();
        let resp = send(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_access_token() {
        let mut app = test_app().await;

        let resp = send(&mut app, get_request("/contacts/", None)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&mut app, get_request("/contacts/", Some("garbage"))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (access, _) = login(&mut app, "alice@example.com", "password123").await;

        let tampered = format!("{}x", access);
        let resp = send(&mut app, get_request("/contacts/", Some(&tampered))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_never_authorizes_a_protected_route() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (_, refresh) = login(&mut app, "alice@example.com", "password123").await;

        let resp = send(&mut app, get_request("/contacts/", Some(&refresh))).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_exchanges_only_refresh_tokens() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (access, refresh) = login(&mut app, "alice@example.com", "password123").await;

        // A refresh token buys a new pair
        let resp = send(
            &mut app,
            json_request(
                "POST",
                "/token/refresh",
                None,
                &json!({"refresh_token": refresh}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert!(body["data"]["access_token"].is_string());
        assert!(body["data"]["refresh_token"].is_string());

        // An access token does not
        let resp = send(
            &mut app,
            json_request(
                "POST",
                "/token/refresh",
                None,
                &json!({"refresh_token": access}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn contacts_are_owner_scoped() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        register(&mut app, "bob@example.com", "password123").await;
        let (alice, _) = login(&mut app, "alice@example.com", "password123").await;
        let (bob, _) = login(&mut app, "bob@example.com", "password123").await;

        let created = create_contact(
            &mut app,
            &alice,
            &json!({
                "first_name": "Olena",
                "last_name": "Shevchenko",
                "email": "olena@example.com"
            }),
        )
        .await;
        let contact_id = created["data"]["id"].as_str().unwrap().to_string();

        // Owner sees it
        let resp = send(
            &mut app,
            get_request(&format!("/contacts/{}", contact_id), Some(&alice)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        // Another user cannot read, update or delete it
        let resp = send(
            &mut app,
            get_request(&format!("/contacts/{}", contact_id), Some(&bob)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send(
            &mut app,
            json_request(
                "PUT",
                &format!("/contacts/{}", contact_id),
                Some(&bob),
                &json!({"first_name": "Hacked"}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/contacts/{}", contact_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", bob))
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // The other user's list stays empty
        let resp = send(&mut app, get_request("/contacts/", Some(&bob))).await;
        let body = body_json(resp).await;
        assert_eq!(body["total"], 0);

        // The owner can delete it
        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/contacts/{}", contact_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", alice))
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = send(
            &mut app,
            get_request(&format!("/contacts/{}", contact_id), Some(&alice)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_is_partial() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (alice, _) = login(&mut app, "alice@example.com", "password123").await;

        let created = create_contact(
            &mut app,
            &alice,
            &json!({
                "first_name": "Olena",
                "last_name": "Shevchenko",
                "email": "olena@example.com",
                "phone_number": "+380501234567"
            }),
        )
        .await;
        let contact_id = created["data"]["id"].as_str().unwrap().to_string();

        let resp = send(
            &mut app,
            json_request(
                "PUT",
                &format!("/contacts/{}", contact_id),
                Some(&alice),
                &json!({"last_name": "Kovalenko"}),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"]["last_name"], "Kovalenko");
        assert_eq!(body["data"]["first_name"], "Olena");
        assert_eq!(body["data"]["phone_number"], "+380501234567");
    }

    #[tokio::test]
    async fn create_rejects_malformed_birthday() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        let (alice, _) = login(&mut app, "alice@example.com", "password123").await;

        let resp = send(
            &mut app,
            json_request(
                "POST",
                "/contacts/",
                Some(&alice),
                &json!({
                    "first_name": "Olena",
                    "last_name": "Shevchenko",
                    "email": "olena@example.com",
                    "birthday": "15.06.1990"
                }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn search_and_birthdays_are_owner_scoped() {
        let mut app = test_app().await;
        register(&mut app, "alice@example.com", "password123").await;
        register(&mut app, "bob@example.com", "password123").await;
        let (alice, _) = login(&mut app, "alice@example.com", "password123").await;
        let (bob, _) = login(&mut app, "bob@example.com", "password123").await;

        let today = Utc::now().date_naive();
        let soon = today + Duration::days(3);
        let birthday = soon.with_year(1990).unwrap_or(soon).format("%Y-%m-%d").to_string();

        create_contact(
            &mut app,
            &alice,
            &json!({
                "first_name": "Olena",
                "last_name": "Shevchenko",
                "email": "olena@example.com",
                "birthday": birthday
            }),
        )
        .await;

        // Search finds the owner's contact
        let resp = send(
            &mut app,
            get_request("/contacts/search/?query=olena", Some(&alice)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        // The same search for another user finds nothing
        let resp = send(
            &mut app,
            get_request("/contacts/search/?query=olena", Some(&bob)),
        )
        .await;
        let body = body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        // Birthday window: visible to the owner only
        let resp = send(
            &mut app,
            get_request("/contacts/upcoming-birthdays/", Some(&alice)),
        )
        .await;
        let body = body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let resp = send(
            &mut app,
            get_request("/contacts/upcoming-birthdays/", Some(&bob)),
        )
        .await;
        let body = body_json(resp).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);
    }
}
