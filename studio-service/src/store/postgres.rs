//! PostgreSQL store backed by sqlx.

use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use super::StudioStore;
use crate::config::DatabaseConfig;
use crate::models::{
    NewUser, Student, StudentProfileUpdate, StudioClient, StudioInstructor, StudioStudent,
    UserRecord, UserType,
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, created_at";
const STUDENT_COLUMNS: &str =
    "id, email, first_name, last_name, phone, notes, profile_picture_url";
const CLIENT_SELECT: &str = r#"
    SELECT ss.id AS relationship_id, ss.studio_id, ss.is_approved,
           s.id, s.email, s.first_name, s.last_name, s.phone, s.notes, s.profile_picture_url
    FROM studio_student ss
    JOIN students s ON s.id = ss.student_id
"#;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.url)
        .await?;

    tracing::info!("Successfully connected to PostgreSQL");

    Ok(pool)
}

/// Run embedded database migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations completed");
    Ok(())
}

fn db_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(anyhow::anyhow!(e))
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl StudioStore for PgStore {
    async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                db_error(e)
            })?;
        Ok(())
    }

    async fn find_user(
        &self,
        user_type: UserType,
        email: &str,
    ) -> Result<Option<UserRecord>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS,
            user_type.table()
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn insert_user(
        &self,
        user_type: UserType,
        user: NewUser,
    ) -> Result<UserRecord, AppError> {
        let sql = format!(
            "INSERT INTO {} (email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            user_type.table(),
            USER_COLUMNS
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(&user.email)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict(anyhow::anyhow!("Email already registered"))
                }
                other => db_error(other),
            })
    }

    async fn set_user_password(
        &self,
        user_type: UserType,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let sql = format!(
            "UPDATE {} SET password_hash = $1 WHERE id = $2",
            user_type.table()
        );
        sqlx::query(&sql)
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn find_studio_instructor(
        &self,
        instructor_id: i64,
        studio_id: i64,
    ) -> Result<Option<StudioInstructor>, AppError> {
        sqlx::query_as::<_, StudioInstructor>(
            r#"
            SELECT id, studio_id, instructor_id, is_approved, is_admin
            FROM studio_instructor
            WHERE instructor_id = $1 AND studio_id = $2
            "#,
        )
        .bind(instructor_id)
        .bind(studio_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_studio_instructor_by_id(
        &self,
        id: i64,
    ) -> Result<Option<StudioInstructor>, AppError> {
        sqlx::query_as::<_, StudioInstructor>(
            "SELECT id, studio_id, instructor_id, is_approved, is_admin FROM studio_instructor WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn find_studio_student_by_id(
        &self,
        id: i64,
    ) -> Result<Option<StudioStudent>, AppError> {
        sqlx::query_as::<_, StudioStudent>(
            "SELECT id, studio_id, student_id, is_approved FROM studio_student WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn set_studio_instructor_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE studio_instructor SET is_approved = $1 WHERE id = $2")
            .bind(approved)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_studio_student_approval(
        &self,
        id: i64,
        approved: bool,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE studio_student SET is_approved = $1 WHERE id = $2")
            .bind(approved)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_studio_clients(&self, studio_id: i64) -> Result<Vec<StudioClient>, AppError> {
        let sql = format!("{} WHERE ss.studio_id = $1 ORDER BY s.last_name, s.first_name", CLIENT_SELECT);
        sqlx::query_as::<_, StudioClient>(&sql)
            .bind(studio_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn find_studio_client(
        &self,
        studio_id: i64,
        student_id: i64,
    ) -> Result<Option<StudioClient>, AppError> {
        let sql = format!("{} WHERE ss.studio_id = $1 AND ss.student_id = $2", CLIENT_SELECT);
        sqlx::query_as::<_, StudioClient>(&sql)
            .bind(studio_id)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn find_student(&self, student_id: i64) -> Result<Option<Student>, AppError> {
        let sql = format!("SELECT {} FROM students WHERE id = $1", STUDENT_COLUMNS);
        sqlx::query_as::<_, Student>(&sql)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn update_student_profile(
        &self,
        student_id: i64,
        update: &StudentProfileUpdate,
    ) -> Result<Option<Student>, AppError> {
        let sql = format!(
            r#"
            UPDATE students SET
                first_name = COALESCE($1, first_name),
                last_name = COALESCE($2, last_name),
                phone = COALESCE($3, phone),
                notes = COALESCE($4, notes)
            WHERE id = $5
            RETURNING {}
            "#,
            STUDENT_COLUMNS
        );
        sqlx::query_as::<_, Student>(&sql)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(&update.phone)
            .bind(&update.notes)
            .bind(student_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn set_student_profile_picture(
        &self,
        student_id: i64,
        url: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE students SET profile_picture_url = $1 WHERE id = $2")
            .bind(url)
            .bind(student_id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
