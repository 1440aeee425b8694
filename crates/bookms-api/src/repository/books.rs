//! Book Repository
//!
//! 도서 카탈로그 관련 데이터베이스 연산을 담당합니다.
//! 삭제는 `deleted_date`를 설정하는 소프트 삭제이며, 모든 조회에서 제외됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;

const BOOK_COLUMNS: &str = "id, title, author, isbn, publisher, publication_year, genre, \
                            description, pages, language, price, quantity, available_quantity, \
                            location, status, created_date, updated_date, deleted_date";

// ================================================================================================
// Types
// ================================================================================================

/// 도서 레코드
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub description: Option<String>,
    pub pages: Option<i32>,
    pub language: String,
    pub price: Option<Decimal>,
    pub quantity: i32,
    pub available_quantity: i32,
    pub location: Option<String>,
    pub status: String,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_date: Option<DateTime<Utc>>,
}

/// 새 도서 입력
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct NewBook {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub available_quantity: i32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl NewBook {
    /// 필수 필드(제목, 저자, 언어, 상태)가 모두 채워졌는지 확인
    pub fn has_required_fields(&self) -> bool {
        [&self.title, &self.author, &self.language, &self.status]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// ISBN이 지정되었으면 반환
    pub fn isbn(&self) -> Option<&str> {
        self.isbn.as_deref().filter(|isbn| !isbn.is_empty())
    }
}

/// 도서 수정 입력. `None`인 필드는 유지됩니다.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateBook {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub available_quantity: Option<i32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl UpdateBook {
    /// 기존 레코드와 다른 새 ISBN이면 반환 (중복 검사 대상)
    pub fn changed_isbn<'a>(&'a self, current: &BookRecord) -> Option<&'a str> {
        self.isbn
            .as_deref()
            .filter(|isbn| !isbn.is_empty() && current.isbn.as_deref() != Some(*isbn))
    }

    pub fn apply(self, book: &mut BookRecord) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(author) = self.author {
            book.author = author;
        }
        if self.isbn.is_some() {
            book.isbn = self.isbn;
        }
        if self.publisher.is_some() {
            book.publisher = self.publisher;
        }
        if self.publication_year.is_some() {
            book.publication_year = self.publication_year;
        }
        if self.genre.is_some() {
            book.genre = self.genre;
        }
        if self.description.is_some() {
            book.description = self.description;
        }
        if self.pages.is_some() {
            book.pages = self.pages;
        }
        if let Some(language) = self.language {
            book.language = language;
        }
        if self.price.is_some() {
            book.price = self.price;
        }
        if let Some(quantity) = self.quantity {
            book.quantity = quantity;
        }
        if let Some(available) = self.available_quantity {
            book.available_quantity = available;
        }
        if self.location.is_some() {
            book.location = self.location;
        }
        if let Some(status) = self.status {
            book.status = status;
        }
    }
}

/// 도서 목록 필터. 여러 조건이 있으면 상태 > 장르 > 저자 순으로 하나만 적용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFilter<'a> {
    All,
    Status(&'a str),
    Genre(&'a str),
    /// 부분 일치, 대소문자 무시
    Author(&'a str),
}

impl<'a> BookFilter<'a> {
    /// 쿼리 파라미터에서 필터를 고릅니다. 빈 문자열은 무시합니다.
    pub fn from_params(
        status: Option<&'a str>,
        genre: Option<&'a str>,
        author: Option<&'a str>,
    ) -> Self {
        let present = |v: Option<&'a str>| v.filter(|s| !s.is_empty());
        if let Some(status) = present(status) {
            BookFilter::Status(status)
        } else if let Some(genre) = present(genre) {
            BookFilter::Genre(genre)
        } else if let Some(author) = present(author) {
            BookFilter::Author(author)
        } else {
            BookFilter::All
        }
    }

    fn clause(&self) -> Option<(&'static str, String)> {
        match self {
            BookFilter::All => None,
            BookFilter::Status(status) => Some(("status = $1", status.to_string())),
            BookFilter::Genre(genre) => Some(("genre = $1", genre.to_string())),
            BookFilter::Author(author) => Some(("author ILIKE $1", like_pattern(author))),
        }
    }
}

/// `%term%` 패턴. LIKE 메타문자는 이스케이프합니다.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

// ================================================================================================
// Repository
// ================================================================================================

/// Book Repository
pub struct BookRepository;

impl BookRepository {
    /// 도서 생성
    pub async fn create(pool: &PgPool, book: &NewBook) -> Result<BookRecord, sqlx::Error> {
        let now = Utc::now();

        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            INSERT INTO books (id, title, author, isbn, publisher, publication_year, genre,
                               description, pages, language, price, quantity,
                               available_quantity, location, status, created_date, updated_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16)
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.pages)
        .bind(&book.language)
        .bind(book.price)
        .bind(book.quantity)
        .bind(book.available_quantity)
        .bind(&book.location)
        .bind(&book.status)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// ID로 조회
    pub async fn get_by_id(pool: &PgPool, id: &str) -> Result<Option<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            "SELECT {BOOK_COLUMNS} FROM books WHERE id = $1 AND deleted_date IS NULL"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// 목록 조회 (최신순)
    pub async fn list(
        pool: &PgPool,
        filter: BookFilter<'_>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookRecord>, sqlx::Error> {
        match filter.clause() {
            Some((clause, value)) => {
                sqlx::query_as::<_, BookRecord>(&format!(
                    r#"
                    SELECT {BOOK_COLUMNS} FROM books
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
                sqlx::query_as::<_, BookRecord>(&format!(
                    r#"
                    SELECT {BOOK_COLUMNS} FROM books
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

    /// 필터에 맞는 도서 수
    pub async fn count(pool: &PgPool, filter: BookFilter<'_>) -> Result<i64, sqlx::Error> {
        match filter.clause() {
            Some((clause, value)) => {
                sqlx::query_scalar::<_, i64>(&format!(
                    "SELECT COUNT(*) FROM books WHERE {clause} AND deleted_date IS NULL"
                ))
                .bind(value)
                .fetch_one(pool)
                .await
            }
            None => {
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM books WHERE deleted_date IS NULL")
                    .fetch_one(pool)
                    .await
            }
        }
    }

    /// 제목 부분 일치 검색
    pub async fn search_by_title(
        pool: &PgPool,
        title: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE title ILIKE $1 AND deleted_date IS NULL
            ORDER BY created_date DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(title))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 제목/저자/장르/ISBN 통합 검색
    pub async fn search(
        pool: &PgPool,
        query: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE (title ILIKE $1 OR author ILIKE $1 OR genre ILIKE $1 OR isbn LIKE $1)
              AND deleted_date IS NULL
            ORDER BY created_date DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(like_pattern(query))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 대출 가능한 도서 (재고 > 0, 상태 active)
    pub async fn list_available(
        pool: &PgPool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            SELECT {BOOK_COLUMNS} FROM books
            WHERE available_quantity > 0 AND status = 'active' AND deleted_date IS NULL
            ORDER BY created_date DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
    }

    /// 대출 가능한 도서 수
    pub async fn count_available(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM books
            WHERE available_quantity > 0 AND status = 'active' AND deleted_date IS NULL
            "#,
        )
        .fetch_one(pool)
        .await
    }

    /// 전체 필드 수정. 대상이 없으면 `None`.
    pub async fn update(pool: &PgPool, book: &BookRecord) -> Result<Option<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            UPDATE books
            SET title = $2, author = $3, isbn = $4, publisher = $5, publication_year = $6,
                genre = $7, description = $8, pages = $9, language = $10, price = $11,
                quantity = $12, available_quantity = $13, location = $14, status = $15,
                updated_date = NOW()
            WHERE id = $1 AND deleted_date IS NULL
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(&book.id)
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .bind(&book.publisher)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(&book.description)
        .bind(book.pages)
        .bind(&book.language)
        .bind(book.price)
        .bind(book.quantity)
        .bind(book.available_quantity)
        .bind(&book.location)
        .bind(&book.status)
        .fetch_optional(pool)
        .await
    }

    /// 재고 수량 수정. 대상이 없으면 `None`.
    pub async fn update_quantity(
        pool: &PgPool,
        id: &str,
        quantity: i32,
        available_quantity: i32,
    ) -> Result<Option<BookRecord>, sqlx::Error> {
        sqlx::query_as::<_, BookRecord>(&format!(
            r#"
            UPDATE books
            SET quantity = $2, available_quantity = $3, updated_date = NOW()
            WHERE id = $1 AND deleted_date IS NULL
            RETURNING {BOOK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(quantity)
        .bind(available_quantity)
        .fetch_optional(pool)
        .await
    }

    /// 소프트 삭제. 삭제된 행이 있으면 true.
    pub async fn soft_delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE books SET deleted_date = NOW() WHERE id = $1 AND deleted_date IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// ISBN 사용 여부
    pub async fn isbn_exists(pool: &PgPool, isbn: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM books WHERE isbn = $1 AND deleted_date IS NULL)",
        )
        .bind(isbn)
        .fetch_one(pool)
        .await
    }
}
