//! Database repository for users.

use crate::types::UserId;
use crate::db::{
    errors::{DbError, Result},
    handlers::repository::Repository,
    models::users::{UserCreateDBRequest, UserDBResponse, UserUpdateDBRequest},
};
use sqlx::SqliteConnection;
use tracing::instrument;

/// Filter for listing users
#[derive(Debug, Clone)]
pub struct UserFilter {
    pub skip: i64,
    pub limit: i64,
}

impl UserFilter {
    pub fn new(skip: i64, limit: i64) -> Self {
        Self { skip, limit }
    }
}

pub struct Users<'c> {
    db: &'c mut SqliteConnection,
}

#[async_trait::async_trait]
impl<'c> Repository for Users<'c> {
    type CreateRequest = UserCreateDBRequest;
    type UpdateRequest = UserUpdateDBRequest;
    type Response = UserDBResponse;
    type Id = UserId;
    type Filter = UserFilter;

    #[instrument(skip(self, request), fields(email = %request.email), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            INSERT INTO users (email, name, age)
            VALUES (?, ?, ?)
            RETURNING id, email, name, age
            "#,
        )
        .bind(&request.email)
        .bind(&request.name)
        .bind(request.age)
        .fetch_one(&mut *self.db)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let user = sqlx::query_as::<_, UserDBResponse>("SELECT id, email, name, age FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *self.db)
            .await?;

        Ok(user)
    }

    #[instrument(skip(self, filter), fields(limit = filter.limit, skip = filter.skip), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let users = sqlx::query_as::<_, UserDBResponse>("SELECT id, email, name, age FROM users ORDER BY id LIMIT ? OFFSET ?")
            .bind(filter.limit)
            .bind(filter.skip)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(users)
    }

    #[instrument(skip(self, request), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Atomic update with conditional field updates
        let user = sqlx::query_as::<_, UserDBResponse>(
            r#"
            UPDATE users SET
                email = COALESCE(?, email),
                name = COALESCE(?, name),
                age = CASE WHEN ? THEN ? ELSE age END
            WHERE id = ?
            RETURNING id, email, name, age
            "#,
        )
        .bind(&request.email)
        .bind(&request.name)
        .bind(request.age.is_some())
        .bind(request.age.flatten())
        .bind(id)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        Ok(user)
    }
}

impl<'c> Users<'c> {
    pub fn new(db: &'c mut SqliteConnection) -> Self {
        Self { db }
    }
}

#[cfg(test)]
mod tests {
    use super::super::repository::Repository;
    use super::*;
    use sqlx::SqlitePool;

    fn create_request(email: &str, name: &str, age: Option<i32>) -> UserCreateDBRequest {
        UserCreateDBRequest {
            email: email.to_string(),
            name: name.to_string(),
            age,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("ada@example.com", "Ada", Some(36))).await.unwrap();
        assert!(user.id > 0);
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
        assert_eq!(user.age, Some(36));

        let found = repo.get_by_id(user.id).await.unwrap();
        assert_eq!(found, Some(user));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_duplicate_email_leaves_table_unchanged(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("dup@example.com", "First", None)).await.unwrap();
        let err = repo.create(&create_request("dup@example.com", "Second", None)).await.unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { .. }));
        assert!(err.is_email_conflict());
        let users = repo.list(&UserFilter::new(0, 10)).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "First");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_get_missing_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        assert_eq!(repo.get_by_id(4242).await.unwrap(), None);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_users_in_insertion_order_with_pagination(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        for i in 0..5 {
            repo.create(&create_request(&format!("user{i}@example.com"), &format!("User {i}"), None))
                .await
                .unwrap();
        }

        let all = repo.list(&UserFilter::new(0, 10)).await.unwrap();
        let names: Vec<_> = all.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["User 0", "User 1", "User 2", "User 3", "User 4"]);

        let page = repo.list(&UserFilter::new(1, 2)).await.unwrap();
        let names: Vec<_> = page.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, vec!["User 1", "User 2"]);

        assert!(repo.list(&UserFilter::new(0, 0)).await.unwrap().is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_partial_update_only_touches_given_fields(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("grace@example.com", "Grace", Some(45))).await.unwrap();

        let update = UserUpdateDBRequest {
            name: Some("Grace Hopper".to_string()),
            ..Default::default()
        };
        let updated = repo.update(user.id, &update).await.unwrap();

        assert_eq!(updated.name, "Grace Hopper");
        assert_eq!(updated.email, "grace@example.com");
        assert_eq!(updated.age, Some(45));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_can_clear_age(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let user = repo.create(&create_request("linus@example.com", "Linus", Some(30))).await.unwrap();

        let update = UserUpdateDBRequest {
            age: Some(None),
            ..Default::default()
        };
        let updated = repo.update(user.id, &update).await.unwrap();
        assert_eq!(updated.age, None);

        let update = UserUpdateDBRequest {
            age: Some(Some(31)),
            ..Default::default()
        };
        let updated = repo.update(user.id, &update).await.unwrap();
        assert_eq!(updated.age, Some(31));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_missing_user(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        let err = repo.update(99, &UserUpdateDBRequest::default()).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_to_taken_email_conflicts(pool: SqlitePool) {
        let mut conn = pool.acquire().await.unwrap();
        let mut repo = Users::new(&mut conn);

        repo.create(&create_request("taken@example.com", "Taken", None)).await.unwrap();
        let other = repo.create(&create_request("other@example.com", "Other", None)).await.unwrap();

        let update = UserUpdateDBRequest {
            email: Some("taken@example.com".to_string()),
            ..Default::default()
        };
        let err = repo.update(other.id, &update).await.unwrap_err();
        assert!(err.is_email_conflict());

        let unchanged = repo.get_by_id(other.id).await.unwrap().unwrap();
        assert_eq!(unchanged.email, "other@example.com");
    }
}
