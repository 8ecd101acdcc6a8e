//! Authentication API handlers

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Form, Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::api::dto::ApiResponse;
use crate::auth::middleware::AuthenticatedUser;
use crate::auth::{create_access_token, create_refresh_token, verify_token, JwtConfig, TokenType};
use crate::infrastructure::database::entities::user;

/// Auth state for authentication handlers
#[derive(Clone)]
pub struct AuthHandlerState {
    pub db: sea_orm::DatabaseConnection,
    pub jwt_config: JwtConfig,
}

/// Запрос на регистрацию нового пользователя
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "user@example.com",
    "password": "secure_password_123"
}))]
pub struct RegisterRequest {
    /// Email-адрес (уникальный, используется как логин)
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    /// Пароль (8–128 символов)
    #[validate(length(min = 8, max = 128, message = "password must be 8-128 characters"))]
    pub password: String,
}

/// Информация о пользователе
#[derive(Debug, Serialize, ToSchema)]
pub struct UserDto {
    /// Уникальный идентификатор пользователя (UUID)
    pub id: String,
    /// Email
    pub email: String,
    /// Активен ли аккаунт
    pub is_active: bool,
    /// Дата регистрации (ISO 8601)
    pub created_at: String,
}

impl From<user::Model> for UserDto {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            is_active: u.is_active,
            created_at: u.created_at.to_rfc3339(),
        }
    }
}

/// Запрос на вход (OAuth2 password flow, form-данные)
///
/// Поле `username` содержит email пользователя.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginForm {
    /// Email пользователя
    pub username: String,
    /// Пароль
    pub password: String,
}

/// Пара токенов, выдаваемая при входе и обновлении
///
/// Access-токен передаётся в заголовке `Authorization: Bearer <token>`,
/// refresh-токен обменивается на новую пару через `POST /token/refresh`.
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenPair {
    /// Короткоживущий access-токен
    pub access_token: String,
    /// Долгоживущий refresh-токен
    pub refresh_token: String,
    /// Тип токена (всегда `bearer`)
    pub token_type: String,
    /// Время жизни access-токена в секундах
    pub expires_in: i64,
}

/// Запрос на обновление пары токенов
#[derive(Debug, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Действующий refresh-токен
    pub refresh_token: String,
}

/// Collapse validator output into a single message line
fn validation_message(errors: &validator::ValidationErrors) -> String {
    let fields: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{:?}", e.code));
                format!("{}: {}", field, msg)
            })
        })
        .collect();

    if fields.is_empty() {
        "Validation failed".to_string()
    } else {
        fields.join("; ")
    }
}

/// Регистрация нового пользователя
///
/// Email должен быть уникальным. Пароль хранится только в виде
/// bcrypt-хеша.
#[utoipa::path(
    post,
    path = "/users/",
    tag = "Authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Пользователь успешно создан", body = ApiResponse<UserDto>),
        (status = 409, description = "Пользователь с таким email уже существует"),
        (status = 422, description = "Ошибка валидации (невалидный email, короткий пароль)")
    )
)]
pub async fn register(
    State(state): State<AuthHandlerState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), (StatusCode, Json<ApiResponse<UserDto>>)> {
    if let Err(errors) = request.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(validation_message(&errors))),
        ));
    }

    // Check if email already exists
    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(&request.email))
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    if existing.is_some() {
        return Err((
            StatusCode::CONFLICT,
            Json(ApiResponse::error("Email already registered")),
        ));
    }

    // Hash password
    let password_hash = crate::auth::hash_password(&request.password).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    // Create user
    let now = Utc::now();
    let new_user = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(request.email.clone()),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = new_user.insert(&state.db).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(UserDto::from(created))),
    ))
}

/// Issue a fresh access+refresh pair for a subject
fn issue_token_pair(
    subject: &str,
    jwt_config: &JwtConfig,
) -> Result<TokenPair, jsonwebtoken::errors::Error> {
    let access_token = create_access_token(subject, jwt_config)?;
    let refresh_token = create_refresh_token(subject, jwt_config)?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "bearer".to_string(),
        expires_in: jwt_config.access_expiration_minutes * 60,
    })
}

/// Вход пользователя
///
/// OAuth2 password flow: form-поля `username` (email) и `password`.
/// Возвращает пару access/refresh токенов.
/// Если аккаунт деактивирован — вернёт 401.
#[utoipa::path(
    post,
    path = "/token",
    tag = "Authentication",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Успешный вход, возвращает пару токенов", body = ApiResponse<TokenPair>),
        (status = 401, description = "Неверные учётные данные или аккаунт деактивирован")
    )
)]
pub async fn login(
    State(state): State<AuthHandlerState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<ApiResponse<TokenPair>>, (StatusCode, Json<ApiResponse<TokenPair>>)> {
    // Find user by email
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&form.username))
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid credentials")),
        ));
    };

    // Check if user is active
    if !user.is_active {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Account is disabled")),
        ));
    }

    // Verify password
    let password_valid =
        crate::auth::verify_password(&form.password, &user.password_hash).unwrap_or(false);
    if !password_valid {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid credentials")),
        ));
    }

    let pair = issue_token_pair(&user.email, &state.jwt_config).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    Ok(Json(ApiResponse::success(pair)))
}

/// Обновление пары токенов
///
/// Принимает действующий refresh-токен и возвращает новую пару.
/// Access-токен здесь не принимается.
#[utoipa::path(
    post,
    path = "/token/refresh",
    tag = "Authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Новая пара токенов", body = ApiResponse<TokenPair>),
        (status = 401, description = "Refresh-токен невалиден, просрочен или пользователь не найден")
    )
)]
pub async fn refresh_token(
    State(state): State<AuthHandlerState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenPair>>, (StatusCode, Json<ApiResponse<TokenPair>>)> {
    let unauthorized = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid refresh token")),
        )
    };

    let claims =
        verify_token(&request.refresh_token, &state.jwt_config).map_err(|_| unauthorized())?;

    if claims.token_type != TokenType::Refresh || claims.is_expired() {
        return Err(unauthorized());
    }

    // The subject must still exist and be active at exchange time
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&claims.sub))
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    let Some(user) = user else {
        return Err(unauthorized());
    };

    if !user.is_active {
        return Err(unauthorized());
    }

    let pair = issue_token_pair(&user.email, &state.jwt_config).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    Ok(Json(ApiResponse::success(pair)))
}

/// Получение информации о текущем пользователе
///
/// Возвращает данные пользователя, авторизованного по access-токену.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Информация о текущем пользователе", body = ApiResponse<UserDto>),
        (status = 401, description = "Не авторизован (невалидный или отсутствующий токен)")
    )
)]
pub async fn get_current_user(
    State(state): State<AuthHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<UserDto>>, (StatusCode, Json<ApiResponse<UserDto>>)> {
    let user = user::Entity::find_by_id(&current.user_id)
        .one(&state.db)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(e.to_string())),
            )
        })?;

    let Some(user) = user else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("User not found")),
        ));
    };

    Ok(Json(ApiResponse::success(UserDto::from(user))))
}
