//! User Repository
//!
//! 사용자 계정 관련 데이터베이스 연산을 담당합니다.
//! 모든 조회는 `deleted_date IS NULL`인 레코드만 대상으로 합니다.

use async_trait::async_trait;
use bookms_core::{NewUser, Role, StoreError, User, UserStatus, UserStore};
use chrono::Utc;
use sqlx::PgPool;

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, status, \
                            created_date, updated_date, deleted_date";

// ================================================================================================
// Types
// ================================================================================================

/// 사용자 목록 필터.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserFilter {
    All,
    Role(Role),
    Status(UserStatus),
}

impl UserFilter {
    /// 추가 WHERE 조건과 바인딩 값.
    fn clause(&self) -> Option<(&'static str, &'static str)> {
        match self {
            UserFilter::All => None,
            UserFilter::Role(role) => Some(("role = $1", role.as_str())),
            UserFilter::Status(status) => Some(("status = $1", status.as_str())),
        }
    }
}

/// 관리자 수정 입력. `None`인 필드는 유지됩니다.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
}

impl UserChanges {
    pub fn apply(self, user: &mut User) {
        if let Some(first_name) = self.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = self.last_name {
            user.last_name = last_name;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
    }
}

// ================================================================================================
// Repository
// ================================================================================================

/// User Repository
pub struct UserRepository;

impl UserRepository {
    /// 사용자 생성
    pub async fn create(pool: &PgPool, new_user: NewUser) -> Result<User, sqlx::Error> {
        let user = new_user.into_user(Utc::now());

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, role, status,
                               created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_date)
        .bind(user.updated_date)
        .fetch_one(pool)
        .await
    }

    /// ID로 조회
    pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_date IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// 이메일로 조회
    pub async fn get_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_date IS NULL"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// 목록 조회 (최신순)
    pub async fn list(
        pool: &PgPool,
        filter: UserFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<User>, sqlx::Error> {
        match filter.clause() {
            Some((clause, value)) => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    SELECT {USER_COLUMNS} FROM users
                    WHERE {clause} AND deleted_date IS NULL
                    ORDER BY created_date DESC
                    LIMIT $2 OFFSET $3
                    "#
                ))
                .bind(value)
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    SELECT {USER_COLUMNS} FROM users
                    WHERE deleted_date IS NULL
                    ORDER BY created_date DESC
                    LIMIT $1 OFFSET $2
                    "#
                ))
                .bind(limit)
                .bind(offset)
                .fetch_all(pool)
                .await
            }
        }
    }

    /// 필터에 맞는 사용자 수
    pub async fn count(pool: &PgPool, filter: UserFilter) -> Result<i64, sqlx::Error> {
        match filter.clause() {
            Some((clause, value)) => {
                sqlx::query_scalar::<_, i64>(&format!(
                    "SELECT COUNT(*) FROM users WHERE {clause} AND deleted_date IS NULL"
                ))
                .bind(value)
                .fetch_one(pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE deleted_date IS NULL")
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// 이름/역할/상태 수정. 대상이 없으면 `None`.
    pub async fn update(pool: &PgPool, user: &User) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET first_name = $2, last_name = $3, role = $4, status = $5, updated_date = NOW()
            WHERE id = $1 AND deleted_date IS NULL
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .fetch_optional(pool)
        .await
    }

    /// 소프트 삭제. 삭제된 행이 있으면 true.
    pub async fn soft_delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// 이메일 사용 여부
    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = $1 AND deleted_date IS NULL)",
        )
        .bind(email)
        .fetch_one(pool)
        .await
    }
}

// ================================================================================================
// UserStore 구현
// ================================================================================================

/// PostgreSQL 기반 [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// 유니크 제약 위반 여부 (이메일/ISBN 중복 경쟁 상황).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        UserRepository::get_by_id(&self.pool, id).await.map_err(backend)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        UserRepository::get_by_email(&self.pool, email)
            .await
            .map_err(backend)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
        UserRepository::email_exists(&self.pool, email)
            .await
            .map_err(backend)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let email = user.email.clone();
        UserRepository::create(&self.pool, user)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateEmail(email)
                } else {
                    backend(e)
                }
            })
    }
}
