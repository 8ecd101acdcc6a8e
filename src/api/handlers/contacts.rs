//! Contact management handlers
//!
//! Every query is filtered on the owner, so another user's contact is
//! indistinguishable from a missing one (404 in both cases).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::api::dto::{ApiResponse, PaginatedResponse};
use crate::auth::middleware::AuthenticatedUser;
use crate::infrastructure::database::entities::contact;

/// Contact state
#[derive(Clone)]
pub struct ContactHandlerState {
    pub db: sea_orm::DatabaseConnection,
}

/// Контакт адресной книги
#[derive(Debug, Serialize, ToSchema)]
pub struct ContactDto {
    /// Уникальный идентификатор (UUID)
    pub id: String,
    /// Имя
    pub first_name: String,
    /// Фамилия
    pub last_name: String,
    /// Email контакта
    pub email: String,
    /// Телефон
    pub phone_number: Option<String>,
    /// День рождения (`YYYY-MM-DD`)
    pub birthday: Option<String>,
    /// Дополнительные заметки
    pub additional_info: Option<String>,
    /// Дата создания (ISO 8601)
    pub created_at: String,
    /// Дата последнего обновления (ISO 8601)
    pub updated_at: String,
}

impl From<contact::Model> for ContactDto {
    fn from(c: contact::Model) -> Self {
        Self {
            id: c.id,
            first_name: c.first_name,
            last_name: c.last_name,
            email: c.email,
            phone_number: c.phone_number,
            birthday: c.birthday.map(|d| d.format("%Y-%m-%d").to_string()),
            additional_info: c.additional_info,
            created_at: c.created_at.to_rfc3339(),
            updated_at: c.updated_at.to_rfc3339(),
        }
    }
}

/// Запрос на создание контакта
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "first_name": "Олена",
    "last_name": "Шевченко",
    "email": "olena@example.com",
    "phone_number": "+380501234567",
    "birthday": "1990-06-15"
}))]
pub struct CreateContactRequest {
    /// Имя (1–100 символов)
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: String,
    /// Фамилия (1–100 символов)
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: String,
    /// Email контакта
    #[validate(email(message = "invalid email format"))]
    pub email: String,
    /// Телефон
    #[validate(length(max = 50, message = "phone_number is too long"))]
    pub phone_number: Option<String>,
    /// День рождения (`YYYY-MM-DD`)
    pub birthday: Option<String>,
    /// Дополнительные заметки
    pub additional_info: Option<String>,
}

/// Запрос на обновление контакта
///
/// Все поля опциональны — передайте только изменяемые.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateContactRequest {
    /// Имя
    #[validate(length(min = 1, max = 100, message = "first_name must be 1-100 characters"))]
    pub first_name: Option<String>,
    /// Фамилия
    #[validate(length(min = 1, max = 100, message = "last_name must be 1-100 characters"))]
    pub last_name: Option<String>,
    /// Email контакта
    #[validate(email(message = "invalid email format"))]
    pub email: Option<String>,
    /// Телефон
    #[validate(length(max = 50, message = "phone_number is too long"))]
    pub phone_number: Option<String>,
    /// День рождения (`YYYY-MM-DD`)
    pub birthday: Option<String>,
    /// Дополнительные заметки
    pub additional_info: Option<String>,
}

/// Параметры списка контактов
#[derive(Debug, Deserialize, IntoParams)]
pub struct ListContactsParams {
    /// Номер страницы (1-based). По умолчанию 1
    #[serde(default = "default_page")]
    pub page: u64,
    /// Количество элементов на страницу. По умолчанию 20
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    20
}

/// Параметры поиска по контактам
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchParams {
    /// Подстрока для поиска по имени, фамилии и email
    pub query: String,
}

fn parse_birthday(raw: &str) -> Result<NaiveDate, (StatusCode, Json<ApiResponse<ContactDto>>)> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error("birthday must be formatted as YYYY-MM-DD")),
        )
    })
}

fn internal_error<T>(e: impl std::fmt::Display) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiResponse::error(e.to_string())),
    )
}

fn not_found<T>() -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error("Contact not found")),
    )
}

/// Список контактов текущего пользователя
///
/// Возвращает только контакты, принадлежащие авторизованному
/// пользователю. Сортировка по дате создания (новые сверху).
#[utoipa::path(
    get,
    path = "/contacts/",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    params(ListContactsParams),
    responses(
        (status = 200, description = "Список контактов с пагинацией", body = PaginatedResponse<ContactDto>),
        (status = 401, description = "Не авторизован")
    )
)]
pub async fn list_contacts(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Query(params): Query<ListContactsParams>,
) -> Result<Json<PaginatedResponse<ContactDto>>, (StatusCode, Json<ApiResponse<()>>)> {
    let query = contact::Entity::find()
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .order_by_desc(contact::Column::CreatedAt);

    // Get total count
    let total = query
        .clone()
        .count(&state.db)
        .await
        .map_err(internal_error)?;

    // Paginate
    let page = params.page.max(1) as u32;
    let page_size = params.page_size.clamp(1, 100) as u32;
    let offset = ((page - 1) * page_size) as u64;

    let contacts = query
        .offset(offset)
        .limit(page_size as u64)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<ContactDto> = contacts.into_iter().map(ContactDto::from).collect();

    Ok(Json(PaginatedResponse::new(items, total, page, page_size)))
}

/// Получение контакта по идентификатору
///
/// Чужой контакт неотличим от несуществующего — в обоих случаях 404.
#[utoipa::path(
    get,
    path = "/contacts/{id}",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор контакта")
    ),
    responses(
        (status = 200, description = "Полная информация о контакте", body = ApiResponse<ContactDto>),
        (status = 404, description = "Контакт не найден или принадлежит другому пользователю")
    )
)]
pub async fn get_contact(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ContactDto>>, (StatusCode, Json<ApiResponse<ContactDto>>)> {
    let found = contact::Entity::find_by_id(&id)
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    match found {
        Some(c) => Ok(Json(ApiResponse::success(ContactDto::from(c)))),
        None => Err(not_found()),
    }
}

/// Создание нового контакта
///
/// Контакт привязывается к авторизованному пользователю.
#[utoipa::path(
    post,
    path = "/contacts/",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    request_body = CreateContactRequest,
    responses(
        (status = 201, description = "Контакт успешно создан", body = ApiResponse<ContactDto>),
        (status = 422, description = "Ошибка валидации (пустое имя, невалидный email или дата)")
    )
)]
pub async fn create_contact(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Json(request): Json<CreateContactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ContactDto>>), (StatusCode, Json<ApiResponse<ContactDto>>)>
{
    if let Err(errors) = request.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(errors.to_string())),
        ));
    }

    let birthday = match &request.birthday {
        Some(raw) => Some(parse_birthday(raw)?),
        None => None,
    };

    let now = Utc::now();
    let new_contact = contact::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        first_name: Set(request.first_name),
        last_name: Set(request.last_name),
        email: Set(request.email),
        phone_number: Set(request.phone_number),
        birthday: Set(birthday),
        additional_info: Set(request.additional_info),
        owner_id: Set(current.user_id.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = new_contact
        .insert(&state.db)
        .await
        .map_err(internal_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ContactDto::from(created))),
    ))
}

/// Обновление контакта
///
/// Обновляет только переданные поля (partial update).
#[utoipa::path(
    put,
    path = "/contacts/{id}",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор контакта")
    ),
    request_body = UpdateContactRequest,
    responses(
        (status = 200, description = "Контакт успешно обновлён", body = ApiResponse<ContactDto>),
        (status = 404, description = "Контакт не найден или принадлежит другому пользователю"),
        (status = 422, description = "Ошибка валидации")
    )
)]
pub async fn update_contact(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateContactRequest>,
) -> Result<Json<ApiResponse<ContactDto>>, (StatusCode, Json<ApiResponse<ContactDto>>)> {
    if let Err(errors) = request.validate() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error(errors.to_string())),
        ));
    }

    let found = contact::Entity::find_by_id(&id)
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .one(&state.db)
        .await
        .map_err(internal_error)?;

    let Some(existing) = found else {
        return Err(not_found());
    };

    let mut active: contact::ActiveModel = existing.into();
    active.updated_at = Set(Utc::now());

    if let Some(first_name) = request.first_name {
        active.first_name = Set(first_name);
    }

    if let Some(last_name) = request.last_name {
        active.last_name = Set(last_name);
    }

    if let Some(email) = request.email {
        active.email = Set(email);
    }

    if let Some(phone_number) = request.phone_number {
        active.phone_number = Set(Some(phone_number));
    }

    if let Some(raw) = request.birthday {
        active.birthday = Set(Some(parse_birthday(&raw)?));
    }

    if let Some(additional_info) = request.additional_info {
        active.additional_info = Set(Some(additional_info));
    }

    let updated = active.update(&state.db).await.map_err(internal_error)?;

    Ok(Json(ApiResponse::success(ContactDto::from(updated))))
}

/// Удаление контакта
///
/// Полностью удаляет контакт. Необратимо.
#[utoipa::path(
    delete,
    path = "/contacts/{id}",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    params(
        ("id" = String, Path, description = "Идентификатор контакта")
    ),
    responses(
        (status = 200, description = "Контакт успешно удалён"),
        (status = 404, description = "Контакт не найден или принадлежит другому пользователю")
    )
)]
pub async fn delete_contact(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, (StatusCode, Json<ApiResponse<()>>)> {
    let result = contact::Entity::delete_many()
        .filter(contact::Column::Id.eq(&id))
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .exec(&state.db)
        .await
        .map_err(internal_error)?;

    if result.rows_affected == 0 {
        return Err(not_found());
    }

    Ok(Json(ApiResponse::success(())))
}

/// Поиск по контактам
///
/// Поиск подстроки в имени, фамилии и email среди контактов
/// текущего пользователя.
#[utoipa::path(
    get,
    path = "/contacts/search/",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    params(SearchParams),
    responses(
        (status = 200, description = "Найденные контакты", body = ApiResponse<Vec<ContactDto>>),
        (status = 401, description = "Не авторизован")
    )
)]
pub async fn search_contacts(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<Vec<ContactDto>>>, (StatusCode, Json<ApiResponse<Vec<ContactDto>>>)> {
    let matches = Condition::any()
        .add(contact::Column::FirstName.contains(params.query.as_str()))
        .add(contact::Column::LastName.contains(params.query.as_str()))
        .add(contact::Column::Email.contains(params.query.as_str()));

    let contacts = contact::Entity::find()
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .filter(matches)
        .order_by_desc(contact::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let items: Vec<ContactDto> = contacts.into_iter().map(ContactDto::from).collect();

    Ok(Json(ApiResponse::success(items)))
}

/// Ближайшие дни рождения
///
/// Контакты текущего пользователя, у которых день рождения в
/// ближайшие 7 дней (включая сегодня). Переход через Новый год
/// учитывается.
#[utoipa::path(
    get,
    path = "/contacts/upcoming-birthdays/",
    tag = "Contacts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Контакты с ближайшими днями рождения", body = ApiResponse<Vec<ContactDto>>),
        (status = 401, description = "Не авторизован")
    )
)]
pub async fn upcoming_birthdays(
    State(state): State<ContactHandlerState>,
    Extension(current): Extension<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<ContactDto>>>, (StatusCode, Json<ApiResponse<Vec<ContactDto>>>)> {
    let contacts = contact::Entity::find()
        .filter(contact::Column::OwnerId.eq(&current.user_id))
        .filter(contact::Column::Birthday.is_not_null())
        .all(&state.db)
        .await
        .map_err(internal_error)?;

    let today = Utc::now().date_naive();
    let items: Vec<ContactDto> = contacts
        .into_iter()
        .filter(|c| c.birthday_within(today, 7))
        .map(ContactDto::from)
        .collect();

    Ok(Json(ApiResponse::success(items)))
}
