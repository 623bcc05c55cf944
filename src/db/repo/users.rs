//! User operations for the repository.

use crate::domain::{HashedPassword, NewUser, TimeMs, User, UserId};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use super::Repository;

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: UserId::new(row.get("id")),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: HashedPassword::from_phc(row.get("password_hash")),
        created_at: TimeMs::new(row.get("created_at")),
        updated_at: TimeMs::new(row.get("updated_at")),
    }
}

/// Insert a user and return its id.
///
/// # Errors
/// Fails with a unique violation when the username or email is taken.
pub async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> Result<UserId, sqlx::Error> {
    let now = TimeMs::now();
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(user.password_hash.as_str())
    .bind(now.as_i64())
    .bind(now.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(UserId::new(result.last_insert_rowid()))
}

pub async fn get_user(conn: &mut SqliteConnection, id: UserId) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id.as_i64())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(user_from_row))
}

pub async fn find_user_by_username(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM users WHERE username = ?",
        USER_COLUMNS
    ))
    .bind(username)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(user_from_row))
}

/// Delete a user. Their recipes go with them.
///
/// Returns false when no such user existed.
pub async fn delete_user(conn: &mut SqliteConnection, id: UserId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.as_i64())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

impl Repository {
    pub async fn create_user(&self, user: &NewUser) -> Result<UserId, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        insert_user(&mut conn, user).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        get_user(&mut conn, id).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        find_user_by_username(&mut conn, username).await
    }

    pub async fn delete_user(&self, id: UserId) -> Result<bool, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        delete_user(&mut conn, id).await
    }
}
