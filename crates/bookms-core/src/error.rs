//! 서버 공통 에러 타입.
//!
//! 시작 단계(설정 로드, 로깅 초기화, DB 연결)에서 발생하는 에러를 정의합니다.
//! 요청 단위 에러는 API 크레이트에서 HTTP 응답으로 변환됩니다.

use thiserror::Error;

/// 핵심 서버 에러.
#[derive(Debug, Error)]
pub enum BookmsError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 로깅 초기화 에러
    #[error("로깅 초기화 에러: {0}")]
    Logging(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),
}

/// 서버 작업을 위한 Result 타입.
pub type BookmsResult<T> = Result<T, BookmsError>;

impl BookmsError {
    /// 프로세스를 즉시 종료해야 하는 설정 오류인지 확인합니다.
    pub fn is_misconfiguration(&self) -> bool {
        matches!(self, BookmsError::Config(_) | BookmsError::Logging(_))
    }
}

impl From<config::ConfigError> for BookmsError {
    fn from(err: config::ConfigError) -> Self {
        BookmsError::Config(err.to_string())
    }
}
