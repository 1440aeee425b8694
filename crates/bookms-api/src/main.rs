//! 도서 관리 API 서버 실행 파일.
//!
//! 설정 파일(`config/default.toml`, `BOOKMS_CONFIG`로 변경 가능)과
//! `BOOKMS__SECTION__KEY` 형태의 환경변수에서 설정을 읽습니다.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::Router;
use sqlx::postgres::{PgPool, PgPoolOptions};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use bookms_api::auth::JwtService;
use bookms_api::openapi::swagger_ui_router;
use bookms_api::routes::create_api_router;
use bookms_api::state::AppState;
use bookms_core::{init_logging, AppConfig, DatabaseConfig, LogConfig, ServerConfig};

/// DB 연결 풀 생성 및 마이그레이션 적용.
async fn connect_database(config: &DatabaseConfig) -> Result<PgPool, Box<dyn std::error::Error>> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    info!(
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );

    if config.run_migrations {
        sqlx::migrate!("../../migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    Ok(pool)
}

/// 설정된 origin 목록으로 CORS 레이어 생성. 목록이 비어 있으면 모든 origin 허용.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        warn!("No CORS origins configured, allowing any origin");
        AllowOrigin::any()
    } else {
        info!(count = origins.len(), "CORS configured with allowed origins");
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}

/// 전체 라우터 생성.
fn create_router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    Router::new()
        .merge(create_api_router(state))
        .merge(swagger_ui_router())
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer(server))
        .layer(CatchPanicLayer::new())
}

/// OpenAPI 스펙 내보내기 처리.
///
/// `--export-openapi` 플래그가 있으면 스펙 JSON을 stdout으로 출력하고 종료합니다.
fn handle_export_openapi() -> Result<(), Box<dyn std::error::Error>> {
    use bookms_api::openapi::ApiDoc;
    use utoipa::OpenApi as _;

    if std::env::args().any(|arg| arg == "--export-openapi") {
        let json = serde_json::to_string_pretty(&ApiDoc::openapi())?;
        println!("{}", json);
        std::process::exit(0);
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    handle_export_openapi()?;

    let config = AppConfig::load_default()?;
    init_logging(LogConfig::try_from(&config.logging)?)?;
    config.validate()?;

    info!("Starting Book Management API server...");

    let addr = config.server.socket_addr()?;
    let pool = connect_database(&config.database).await?;

    let state = Arc::new(AppState::new(JwtService::new(&config.auth)).with_db_pool(pool));
    info!(
        version = %state.version,
        access_expiry_hours = config.auth.access_expiry_hours,
        refresh_expiry_hours = config.auth.refresh_expiry_hours,
        "Application state initialized"
    );

    let app = create_router(state, &config.server);

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Graceful shutdown 시그널 대기 (Ctrl+C 또는 SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
