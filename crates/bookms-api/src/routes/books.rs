//! 도서 카탈로그 endpoint.
//!
//! 조회 계열은 공개, 생성/수정/삭제/재고 변경은 관리자 전용입니다.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{json_body, require_pool};
use crate::auth::{require_admin, require_auth, JwtService};
use crate::error::{api_error, internal_error, ApiErrorResponse, ApiResponse, ApiResult};
use crate::repository::{BookFilter, BookRecord, BookRepository, NewBook, UpdateBook};
use crate::state::AppState;
use crate::utils::Page;

const INVALID_BODY: &str = "Invalid request body";
const NOT_FOUND: &str = "Book not found";

// ==================== Request/Response 타입 ====================

/// 도서 목록 쿼리
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct BookListQuery {
    /// 페이지 크기 (기본 20)
    pub limit: Option<String>,
    /// 시작 위치 (기본 0)
    pub offset: Option<String>,
    /// 상태 필터
    pub status: Option<String>,
    /// 장르 필터
    pub genre: Option<String>,
    /// 저자 부분 일치 필터
    pub author: Option<String>,
}

/// 도서 검색 쿼리
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// 제목/저자/장르/ISBN 통합 검색어
    pub q: Option<String>,
    /// 제목 검색어 (`q`가 없을 때 사용)
    pub title: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl SearchQuery {
    fn term(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|s| !s.is_empty())
    }
}

/// 페이지 쿼리
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// 도서 목록 응답
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookListResponse {
    pub books: Vec<BookRecord>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// 도서 검색 응답
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookSearchResponse {
    pub books: Vec<BookRecord>,
    pub query: String,
    pub title: String,
    pub limit: i64,
    pub offset: i64,
}

/// 재고 수량 변경 요청
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct QuantityRequest {
    pub quantity: i32,
    pub available_quantity: i32,
}

/// 재고 불변식: 음수 불가, 대출 가능 수량은 전체 수량 이하.
fn check_quantities(quantity: i32, available_quantity: i32) -> ApiResult<()> {
    if quantity < 0 || available_quantity < 0 {
        return Err(api_error(StatusCode::BAD_REQUEST, "Quantities cannot be negative"));
    }
    if available_quantity > quantity {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Available quantity cannot exceed total quantity",
        ));
    }
    Ok(())
}

// ==================== 공개 API ====================

/// 도서 목록 조회
#[utoipa::path(
    get,
    path = "/api/v1/books",
    params(BookListQuery),
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<BookListResponse>),
        (status = 500, description = "서버 오류", body = ApiErrorResponse)
    ),
    tag = "books"
)]
pub async fn list_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookListQuery>,
) -> ApiResult<Json<ApiResponse<BookListResponse>>> {
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref());
    let filter = BookFilter::from_params(
        query.status.as_deref(),
        query.genre.as_deref(),
        query.author.as_deref(),
    );
    let pool = require_pool(&state)?;

    let books = BookRepository::list(pool, filter, page.limit, page.offset)
        .await
        .map_err(|e| internal_error("Failed to retrieve books", e))?;
    let total = BookRepository::count(pool, filter)
        .await
        .map_err(|e| internal_error("Failed to get book count", e))?;

    Ok(Json(ApiResponse::new(
        BookListResponse {
            books,
            total,
            limit: page.limit,
            offset: page.offset,
        },
        "Books retrieved successfully",
    )))
}

/// 도서 조회
#[utoipa::path(
    get,
    path = "/api/v1/books/{id}",
    params(("id" = String, Path, description = "도서 ID")),
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<BookRecord>),
        (status = 404, description = "도서 없음", body = ApiErrorResponse)
    ),
    tag = "books"
)]
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<BookRecord>>> {
    let pool = require_pool(&state)?;

    let book = BookRepository::get_by_id(pool, &id)
        .await
        .map_err(|e| internal_error("Failed to retrieve book", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    Ok(Json(ApiResponse::new(book, "Book retrieved successfully")))
}

/// 도서 검색
///
/// `q`가 있으면 제목/저자/장르/ISBN 통합 검색, 없으면 `title`로 제목 검색.
#[utoipa::path(
    get,
    path = "/api/v1/books/search",
    params(SearchQuery),
    responses(
        (status = 200, description = "검색 성공", body = ApiResponse<BookSearchResponse>),
        (status = 400, description = "검색어 누락", body = ApiErrorResponse)
    ),
    tag = "books"
)]
pub async fn search_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<BookSearchResponse>>> {
    let q = SearchQuery::term(&query.q);
    let title = SearchQuery::term(&query.title);
    if q.is_none() && title.is_none() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Search query (q) or title parameter is required",
        ));
    }
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref());
    let pool = require_pool(&state)?;

    let books = match (q, title) {
        (Some(q), _) => BookRepository::search(pool, q, page.limit, page.offset).await,
        (None, Some(title)) => {
            BookRepository::search_by_title(pool, title, page.limit, page.offset).await
        }
        (None, None) => Ok(Vec::new()),
    }
    .map_err(|e| internal_error("Failed to search books", e))?;

    Ok(Json(ApiResponse::new(
        BookSearchResponse {
            books,
            query: q.unwrap_or_default().to_string(),
            title: title.unwrap_or_default().to_string(),
            limit: page.limit,
            offset: page.offset,
        },
        "Books search completed successfully",
    )))
}

/// 대출 가능한 도서 목록
#[utoipa::path(
    get,
    path = "/api/v1/books/available",
    params(PageQuery),
    responses(
        (status = 200, description = "조회 성공", body = ApiResponse<BookListResponse>)
    ),
    tag = "books"
)]
pub async fn available_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<ApiResponse<BookListResponse>>> {
    let page = Page::parse(query.limit.as_deref(), query.offset.as_deref());
    let pool = require_pool(&state)?;

    let books = BookRepository::list_available(pool, page.limit, page.offset)
        .await
        .map_err(|e| internal_error("Failed to retrieve available books", e))?;
    let total = BookRepository::count_available(pool)
        .await
        .map_err(|e| internal_error("Failed to get available book count", e))?;

    Ok(Json(ApiResponse::new(
        BookListResponse {
            books,
            total,
            limit: page.limit,
            offset: page.offset,
        },
        "Available books retrieved successfully",
    )))
}

// ==================== 관리자 API ====================

/// 도서 생성
#[utoipa::path(
    post,
    path = "/api/v1/books",
    request_body = NewBook,
    responses(
        (status = 201, description = "생성 성공", body = ApiResponse<BookRecord>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 401, description = "인증 필요", body = ApiErrorResponse),
        (status = 403, description = "권한 없음", body = ApiErrorResponse),
        (status = 409, description = "ISBN 중복", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewBook>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BookRecord>>)> {
    let book = json_body(body, INVALID_BODY)?;
    if !book.has_required_fields() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "Title, author, language, and status are required",
        ));
    }
    check_quantities(book.quantity, book.available_quantity)?;
    let pool = require_pool(&state)?;

    if let Some(isbn) = book.isbn() {
        let exists = BookRepository::isbn_exists(pool, isbn)
            .await
            .map_err(|e| internal_error("Failed to check ISBN existence", e))?;
        if exists {
            return Err(api_error(
                StatusCode::CONFLICT,
                "Book with this ISBN already exists",
            ));
        }
    }

    let created = BookRepository::create(pool, &book)
        .await
        .map_err(|e| internal_error("Failed to create book", e))?;

    tracing::info!(book_id = %created.id, title = %created.title, "book created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(created, "Book created successfully")),
    ))
}

/// 도서 수정
#[utoipa::path(
    put,
    path = "/api/v1/books/{id}",
    params(("id" = String, Path, description = "도서 ID")),
    request_body = UpdateBook,
    responses(
        (status = 200, description = "수정 성공", body = ApiResponse<BookRecord>),
        (status = 400, description = "잘못된 요청", body = ApiErrorResponse),
        (status = 404, description = "도서 없음", body = ApiErrorResponse),
        (status = 409, description = "ISBN 중복", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<UpdateBook>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BookRecord>>> {
    let update = json_body(body, INVALID_BODY)?;
    let pool = require_pool(&state)?;

    let mut book = BookRepository::get_by_id(pool, &id)
        .await
        .map_err(|e| internal_error("Failed to retrieve book", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    if let Some(isbn) = update.changed_isbn(&book) {
        let exists = BookRepository::isbn_exists(pool, isbn)
            .await
            .map_err(|e| internal_error("Failed to check ISBN existence", e))?;
        if exists {
            return Err(api_error(
                StatusCode::CONFLICT,
                "Book with this ISBN already exists",
            ));
        }
    }

    update.apply(&mut book);
    check_quantities(book.quantity, book.available_quantity)?;

    let book = BookRepository::update(pool, &book)
        .await
        .map_err(|e| internal_error("Failed to update book", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    Ok(Json(ApiResponse::new(book, "Book updated successfully")))
}

/// 도서 삭제 (소프트 삭제)
#[utoipa::path(
    delete,
    path = "/api/v1/books/{id}",
    params(("id" = String, Path, description = "도서 ID")),
    responses(
        (status = 200, description = "Book deleted successfully"),
        (status = 404, description = "도서 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let pool = require_pool(&state)?;

    let deleted = BookRepository::soft_delete(pool, &id)
        .await
        .map_err(|e| internal_error("Failed to delete book", e))?;
    if !deleted {
        return Err(api_error(StatusCode::NOT_FOUND, NOT_FOUND));
    }

    tracing::info!(book_id = %id, "book deleted");
    Ok(Json(ApiResponse::message("Book deleted successfully")))
}

/// 재고 수량 변경
#[utoipa::path(
    put,
    path = "/api/v1/books/{id}/quantity",
    params(("id" = String, Path, description = "도서 ID")),
    request_body = QuantityRequest,
    responses(
        (status = 200, description = "변경 성공", body = ApiResponse<BookRecord>),
        (status = 400, description = "잘못된 수량", body = ApiErrorResponse),
        (status = 404, description = "도서 없음", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "books"
)]
pub async fn update_quantity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<QuantityRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BookRecord>>> {
    let req = json_body(body, INVALID_BODY)?;
    check_quantities(req.quantity, req.available_quantity)?;
    let pool = require_pool(&state)?;

    let book = BookRepository::update_quantity(pool, &id, req.quantity, req.available_quantity)
        .await
        .map_err(|e| internal_error("Failed to update book quantity", e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, NOT_FOUND))?;

    Ok(Json(ApiResponse::new(
        book,
        "Book quantity updated successfully",
    )))
}

/// 도서 라우터 생성.
///
/// 같은 경로라도 메서드별로 공개/관리자 라우트가 나뉘므로 두 라우터를 병합합니다.
pub fn books_router(jwt: Arc<JwtService>) -> Router<Arc<AppState>> {
    let public = Router::new()
        .route("/", get(list_books))
        .route("/search", get(search_books))
        .route("/available", get(available_books))
        .route("/{id}", get(get_book));

    let admin = Router::new()
        .route("/", post(create_book))
        .route("/{id}", put(update_book).delete(delete_book))
        .route("/{id}/quantity", put(update_quantity))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(jwt, require_auth));

    public.merge(admin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request};
    use bookms_core::{Principal, Role};
    use tower::ServiceExt;

    /// 테스트 라우터와 지정한 역할의 access token
    fn app_with(role: Role) -> (Router, String) {
        let state = Arc::new(create_test_state());
        let token = state
            .jwt
            .issue_access_token(&Principal::new("u1", "u1@example.com", role))
            .unwrap();
        (books_router(state.jwt.clone()).with_state(state), token)
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, ApiErrorResponse) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn json_request(method: &str, uri: &str, token: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_check_quantities() {
        assert!(check_quantities(3, 2).is_ok());
        assert!(check_quantities(0, 0).is_ok());

        let (status, Json(body)) = check_quantities(-1, 0).unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.message, "Quantities cannot be negative");

        let (_, Json(body)) = check_quantities(2, 3).unwrap_err();
        assert_eq!(body.message, "Available quantity cannot exceed total quantity");
    }

    #[tokio::test]
    async fn test_search_requires_term() {
        let (app, _) = app_with(Role::Member);
        let request = Request::builder()
            .uri("/search?q=&title=")
            .body(Body::empty())
            .unwrap();

        let (status, error) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Search query (q) or title parameter is required");
    }

    #[tokio::test]
    async fn test_public_list_is_reachable_without_token() {
        let (app, _) = app_with(Role::Member);
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        // 토큰 없이 핸들러까지 도달하고, DB가 없어서 500
        let (status, error) = send(app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message, "Database not available");
    }

    #[tokio::test]
    async fn test_create_requires_token() {
        let (app, _) = app_with(Role::Admin);
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header("Content-Type", "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, error) = send(app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.message, "Authorization header is required");
    }

    #[tokio::test]
    async fn test_create_rejects_member() {
        let (app, token) = app_with(Role::Member);

        let (status, error) = send(app, json_request("POST", "/", &token, "{}")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(error.message, "Insufficient permissions");
    }

    #[tokio::test]
    async fn test_create_validates_body() {
        let (app, token) = app_with(Role::Admin);
        let (status, error) = send(app, json_request("POST", "/", &token, "not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Invalid request body");

        let (app, token) = app_with(Role::Admin);
        let body = r#"{"title": "Dune", "author": "Frank Herbert"}"#;
        let (status, error) = send(app, json_request("POST", "/", &token, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Title, author, language, and status are required");

        let (app, token) = app_with(Role::Admin);
        let body = r#"{"title": "Dune", "author": "Frank Herbert", "language": "en",
                       "status": "active", "quantity": 1, "available_quantity": 2}"#;
        let (status, error) = send(app, json_request("POST", "/", &token, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Available quantity cannot exceed total quantity");
    }

    #[tokio::test]
    async fn test_quantity_rejects_negative() {
        let (app, token) = app_with(Role::Admin);
        let body = r#"{"quantity": -1, "available_quantity": 0}"#;
        let (status, error) = send(app, json_request("PUT", "/b1/quantity", &token, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.message, "Quantities cannot be negative");
    }
}
