//! 인증 미들웨어와 인증 흐름 통합 테스트.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use bookms_api::auth::{require_admin, require_auth, require_role, AuthUser, Claims, JwtService};
use bookms_api::routes::create_api_router;
use bookms_api::state::AppState;
use bookms_core::{MemoryUserStore, NewUser, Principal, Role, UserStatus, UserStore};
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &[u8] = b"middleware-test-secret";

fn jwt() -> Arc<JwtService> {
    Arc::new(JwtService::from_secret(SECRET, 24, 168))
}

fn token(jwt: &JwtService, id: &str, role: Role) -> String {
    jwt.issue_access_token(&Principal::new(id, format!("{}@example.com", id), role))
        .unwrap()
}

async fn whoami(AuthUser(claims): AuthUser) -> Json<Claims> {
    Json(claims)
}

async fn echo(AuthUser(claims): AuthUser, body: String) -> String {
    format!("{}:{}", claims.user_id, body)
}

/// `/member`는 member 역할, `/admin`은 admin 역할 필요
fn protected_app(jwt: Arc<JwtService>) -> Router {
    let member = Router::new()
        .route("/member", get(whoami))
        .route_layer(middleware::from_fn_with_state(Role::Member, require_role));
    let admin = Router::new()
        .route("/admin", get(whoami))
        .route("/admin/echo", post(echo))
        .route_layer(middleware::from_fn(require_admin));

    member
        .merge(admin)
        .route_layer(middleware::from_fn_with_state(jwt, require_auth))
}

fn get_with(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn expect_error(app: Router, request: Request<Body>, status: StatusCode, message: &str) {
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), status);
    assert_eq!(body_json(response).await["message"], message);
}

// ==================== 미들웨어 단독 ====================

#[tokio::test]
async fn missing_header_is_unauthorized() {
    let app = protected_app(jwt());
    expect_error(
        app,
        get_with("/admin", None),
        StatusCode::UNAUTHORIZED,
        "Authorization header is required",
    )
    .await;
}

#[tokio::test]
async fn non_bearer_schemes_are_treated_as_missing() {
    let jwt = jwt();
    let valid = token(&jwt, "u1", Role::Admin);

    for value in [
        "Basic dXNlcjpwYXNz".to_string(),
        "Bearer ".to_string(),
        format!("bearer {}", valid),
        valid.clone(),
    ] {
        expect_error(
            protected_app(jwt.clone()),
            get_with("/admin", Some(&value)),
            StatusCode::UNAUTHORIZED,
            "Authorization header is required",
        )
        .await;
    }
}

#[tokio::test]
async fn garbage_token_is_invalid() {
    expect_error(
        protected_app(jwt()),
        get_with("/admin", Some("Bearer not.a.token")),
        StatusCode::UNAUTHORIZED,
        "Invalid or expired token",
    )
    .await;
}

#[tokio::test]
async fn refresh_token_is_not_accepted_as_access() {
    let jwt = jwt();
    let refresh = jwt
        .issue_refresh_token(&Principal::new("u1", "u1@example.com", Role::Admin))
        .unwrap();

    expect_error(
        protected_app(jwt),
        get_with("/admin", Some(&format!("Bearer {}", refresh))),
        StatusCode::UNAUTHORIZED,
        "Invalid or expired token",
    )
    .await;
}

#[tokio::test]
async fn signed_token_with_unknown_role_is_invalid() {
    // 서명은 올바르지만 역할이 admin/member가 아니면 Claims 디코딩 단계에서 거부
    let now = chrono::Utc::now().timestamp();
    let claims = json!({
        "user_id": "u1",
        "email": "u1@example.com",
        "role": "librarian",
        "sub": "u1",
        "iat": now,
        "nbf": now,
        "exp": now + 3600,
    });
    let forged = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET),
    )
    .unwrap();

    for uri in ["/member", "/admin"] {
        expect_error(
            protected_app(jwt()),
            get_with(uri, Some(&format!("Bearer {}", forged))),
            StatusCode::UNAUTHORIZED,
            "Invalid or expired token",
        )
        .await;
    }
}

#[tokio::test]
async fn member_is_forbidden_from_admin_route() {
    let jwt = jwt();
    let member = token(&jwt, "u1", Role::Member);

    expect_error(
        protected_app(jwt),
        get_with("/admin", Some(&format!("Bearer {}", member))),
        StatusCode::FORBIDDEN,
        "Insufficient permissions",
    )
    .await;
}

#[tokio::test]
async fn roles_have_no_hierarchy() {
    let jwt = jwt();
    let admin = token(&jwt, "root", Role::Admin);

    // admin이라도 member 전용 라우트는 통과하지 못함
    expect_error(
        protected_app(jwt),
        get_with("/member", Some(&format!("Bearer {}", admin))),
        StatusCode::FORBIDDEN,
        "Insufficient permissions",
    )
    .await;
}

#[tokio::test]
async fn admin_claims_reach_handler() {
    let jwt = jwt();
    let admin = token(&jwt, "root", Role::Admin);

    let response = protected_app(jwt)
        .oneshot(get_with("/admin", Some(&format!("Bearer {}", admin))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let claims = body_json(response).await;
    assert_eq!(claims["user_id"], "root");
    assert_eq!(claims["email"], "root@example.com");
    assert_eq!(claims["role"], "admin");
}

#[tokio::test]
async fn request_body_is_forwarded_unchanged() {
    let jwt = jwt();
    let admin = token(&jwt, "root", Role::Admin);

    let request = Request::builder()
        .method("POST")
        .uri("/admin/echo")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::from("payload-123"))
        .unwrap();
    let response = protected_app(jwt).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"root:payload-123");
}

#[tokio::test]
async fn unauthenticated_role_check_without_auth_layer() {
    // require_auth 없이 역할 검사만 걸린 경우
    let app: Router = Router::new()
        .route("/admin", get(whoami))
        .route_layer(middleware::from_fn(require_admin));

    expect_error(
        app,
        get_with("/admin", None),
        StatusCode::UNAUTHORIZED,
        "Authentication required",
    )
    .await;
}

// ==================== 전체 API 흐름 ====================

struct TestApi {
    app: Router,
    store: Arc<MemoryUserStore>,
    jwt: Arc<JwtService>,
}

impl TestApi {
    fn new() -> Self {
        let store = Arc::new(MemoryUserStore::new());
        let state = Arc::new(
            AppState::new(JwtService::from_secret(SECRET, 24, 168)).with_user_store(store.clone()),
        );
        let jwt = state.jwt.clone();
        let app = create_api_router(state);
        Self { app, store, jwt }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn post(&self, uri: &str, body: Value, bearer: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn profile(&self, access: &str) -> (StatusCode, Value) {
        self.send(get_with(
            "/api/v1/auth/profile",
            Some(&format!("Bearer {}", access)),
        ))
        .await
    }

    async fn register(&self, email: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/v1/auth/register",
                json!({
                    "email": email,
                    "password": "correct-horse-battery",
                    "first_name": "Test",
                    "last_name": "User"
                }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"].clone()
    }
}

#[tokio::test]
async fn each_token_resolves_to_its_own_user() {
    let api = TestApi::new();
    let u1 = api.register("u1@example.com").await;
    let u2 = api.register("u2@example.com").await;

    let (status, body) = api.profile(u1["access_token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "u1@example.com");
    assert_eq!(body["data"]["id"], u1["user"]["id"]);

    let (status, body) = api.profile(u2["access_token"].as_str().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "u2@example.com");
    assert_ne!(body["data"]["id"], u1["user"]["id"]);
}

#[tokio::test]
async fn router_verifies_tokens_with_state_service() {
    let api = TestApi::new();
    let user = api.register("u1@example.com").await;
    let id = user["user"]["id"].as_str().unwrap();

    // 상태의 서비스가 발급한 토큰은 통과
    let (status, _) = api.profile(&token(&api.jwt, id, Role::Member)).await;
    assert_eq!(status, StatusCode::OK);

    // 같은 주체라도 다른 키로 서명된 토큰은 거부
    let other = JwtService::from_secret(b"another-service-secret", 24, 168);
    let (status, body) = api.profile(&token(&other, id, Role::Member)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn registered_member_cannot_reach_admin_routes() {
    let api = TestApi::new();
    let u1 = api.register("u1@example.com").await;
    let access = u1["access_token"].as_str().unwrap();
    assert_eq!(u1["user"]["role"], "member");

    let (status, body) = api
        .post("/api/v1/books", json!({"title": "Dune"}), Some(access))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");

    let (status, _) = api
        .send(get_with("/api/v1/users", Some(&format!("Bearer {}", access))))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = api.send(get_with("/api/v1/users", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_request_reaches_book_handler() {
    let api = TestApi::new();
    let admin = token(&api.jwt, "u2", Role::Admin);

    // 인증과 역할 검사를 통과하고 본문 검증까지 끝난 뒤 DB 부재로 500
    let book = json!({
        "title": "Dune",
        "author": "Frank Herbert",
        "language": "en",
        "status": "active",
        "quantity": 2,
        "available_quantity": 1
    });
    let (status, body) = api.post("/api/v1/books", book, Some(&admin)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database not available");

    let (status, body) = api
        .post("/api/v1/books", json!({"title": "Dune"}), Some(&admin))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Title, author, language, and status are required"
    );
}

#[tokio::test]
async fn refresh_rereads_role_from_store() {
    let api = TestApi::new();
    let password_hash = bookms_api::auth::hash_password("admin-password-1").unwrap();
    let admin = api
        .store
        .create(NewUser {
            email: "boss@example.com".to_string(),
            password_hash,
            first_name: "Boss".to_string(),
            last_name: "Admin".to_string(),
            role: Role::Admin,
            status: UserStatus::Active,
        })
        .await
        .unwrap();

    let (status, login) = api
        .post(
            "/api/v1/auth/login",
            json!({"email": "boss@example.com", "password": "admin-password-1"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let old_access = login["data"]["access_token"].as_str().unwrap().to_string();
    let refresh = login["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_eq!(
        api.jwt.validate_access_token(&old_access).unwrap().role,
        Role::Admin
    );

    // 강등 후 갱신하면 새 access token에는 member 역할
    assert!(api.store.set_role(&admin.id, Role::Member));
    let (status, refreshed) = api
        .post("/api/v1/auth/refresh", json!({ "refresh_token": refresh }), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let new_access = refreshed["data"]["access_token"].as_str().unwrap();
    let claims = api.jwt.validate_access_token(new_access).unwrap();
    assert_eq!(claims.role, Role::Member);
    assert_eq!(claims.user_id, admin.id);
    assert_eq!(refreshed["data"]["user"]["role"], "member");

    // 이전 access token은 만료 전까지 admin으로 유효
    assert_eq!(
        api.jwt.validate_access_token(&old_access).unwrap().role,
        Role::Admin
    );
}

#[tokio::test]
async fn refresh_rejects_inactive_and_deleted_users() {
    let api = TestApi::new();
    let u1 = api.register("u1@example.com").await;
    let id = u1["user"]["id"].as_str().unwrap();
    let refresh = u1["refresh_token"].as_str().unwrap();

    assert!(api.store.set_status(id, UserStatus::Inactive));
    let (status, body) = api
        .post("/api/v1/auth/refresh", json!({ "refresh_token": refresh }), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is not active");

    assert!(api.store.soft_delete(id));
    let (status, body) = api
        .post("/api/v1/auth/refresh", json!({ "refresh_token": refresh }), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn login_does_not_reveal_status_on_wrong_password() {
    let api = TestApi::new();
    let u1 = api.register("u1@example.com").await;
    let id = u1["user"]["id"].as_str().unwrap();
    assert!(api.store.set_status(id, UserStatus::Inactive));

    let (status, body) = api
        .post(
            "/api/v1/auth/login",
            json!({"email": "u1@example.com", "password": "wrong-password"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid email or password");

    let (status, body) = api
        .post(
            "/api/v1/auth/login",
            json!({"email": "u1@example.com", "password": "correct-horse-battery"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is not active");
}

#[tokio::test]
async fn health_and_public_books_need_no_token() {
    let api = TestApi::new();

    // 라우트가 인증 없이 핸들러에 도달하고 DB 부재로 500
    let (status, body) = api.send(get_with("/healthz", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database not configured");

    let (status, body) = api.send(get_with("/api/v1/books", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Database not available");
}
