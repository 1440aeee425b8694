//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 생성 이후에는 읽기 전용입니다.

use std::sync::Arc;

use bookms_core::UserStore;
use sqlx::PgPool;

use crate::auth::JwtService;
use crate::repository::PgUserStore;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 데이터베이스 연결 풀 (PostgreSQL)
    pub db_pool: Option<PgPool>,

    /// 토큰 발급/검증 서비스
    pub jwt: Arc<JwtService>,

    /// 인증 흐름에서 사용하는 사용자 저장소
    pub user_store: Option<Arc<dyn UserStore>>,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(jwt: JwtService) -> Self {
        Self {
            db_pool: None,
            jwt: Arc::new(jwt),
            user_store: None,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 데이터베이스 풀 설정. PostgreSQL 사용자 저장소도 함께 연결합니다.
    pub fn with_db_pool(mut self, pool: PgPool) -> Self {
        self.user_store = Some(Arc::new(PgUserStore::new(pool.clone())));
        self.db_pool = Some(pool);
        self
    }

    /// 사용자 저장소를 직접 지정합니다.
    pub fn with_user_store(mut self, store: Arc<dyn UserStore>) -> Self {
        self.user_store = Some(store);
        self
    }

    /// 업타임 (초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }

    /// DB 연결 상태 확인.
    pub async fn ping_db(&self) -> Result<(), String> {
        let pool = self
            .db_pool
            .as_ref()
            .ok_or_else(|| "Database not configured".to_string())?;

        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 실제 DB 없이 메모리 사용자 저장소로 인증 흐름을 테스트할 수 있습니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use bookms_core::MemoryUserStore;

    AppState::new(JwtService::from_secret(b"test-secret-key-for-api-tests", 24, 168))
        .with_user_store(Arc::new(MemoryUserStore::new()))
}
