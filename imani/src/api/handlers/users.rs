use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};

use crate::{
    api::models::{
        pagination::Pagination,
        users::{UserCreate, UserResponse, UserUpdate},
    },
    db::{
        errors::DbError,
        handlers::{users::UserFilter, Repository, Users},
        models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    },
    errors::{Error, Result},
    types::UserId,
    AppState,
};

fn user_not_found(id: UserId) -> Error {
    Error::NotFound {
        resource: "User".to_string(),
        id: id.to_string(),
    }
}

#[utoipa::path(
    post,
    path = "/users/",
    tag = "users",
    summary = "Create user",
    request_body = UserCreate,
    responses(
        (status = 200, description = "User created", body = UserResponse),
        (status = 409, description = "Email already registered"),
        (status = 422, description = "Body is missing a field or has a field of the wrong type"),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn create_user(
    State(state): State<AppState>,
    body: std::result::Result<Json<UserCreate>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Json(create) = body?;
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let user = repo.create(&UserCreateDBRequest::from(create)).await?;
    Ok(Json(UserResponse::from(user)))
}

#[utoipa::path(
    get,
    path = "/users/",
    tag = "users",
    summary = "List users",
    description = "Users in ascending id order.",
    params(Pagination),
    responses(
        (status = 200, description = "List of users", body = [UserResponse]),
        (status = 500, description = "Internal server error")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    query: std::result::Result<Query<Pagination>, QueryRejection>,
) -> Result<Json<Vec<UserResponse>>> {
    let Query(pagination) = query?;
    let (skip, limit) = pagination.params();
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    let users = repo.list(&UserFilter::new(skip, limit)).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Get user",
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = UserResponse),
        (status = 400, description = "User ID is not an integer"),
        (status = 404, description = "User not found")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn get_user(
    State(state): State<AppState>,
    path: std::result::Result<Path<UserId>, PathRejection>,
) -> Result<Json<UserResponse>> {
    let Path(user_id) = path?;
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    match repo.get_by_id(user_id).await? {
        Some(user) => Ok(Json(UserResponse::from(user))),
        None => Err(user_not_found(user_id)),
    }
}

#[utoipa::path(
    put,
    path = "/users/{user_id}",
    tag = "users",
    summary = "Update user",
    description = "Only fields present in the body change. `age: null` clears the age.",
    request_body = UserUpdate,
    params(("user_id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email already registered")
    )
)]
#[tracing::instrument(skip_all)]
pub async fn update_user(
    State(state): State<AppState>,
    path: std::result::Result<Path<UserId>, PathRejection>,
    body: std::result::Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Path(user_id) = path?;
    let Json(update) = body?;
    let mut pool_conn = state.db.acquire().await.map_err(|e| Error::Database(e.into()))?;
    let mut repo = Users::new(&mut pool_conn);

    match repo.update(user_id, &UserUpdateDBRequest::from(update)).await {
        Ok(user) => Ok(Json(UserResponse::from(user))),
        Err(DbError::NotFound) => Err(user_not_found(user_id)),
        Err(e) => Err(e.into()),
    }
}
