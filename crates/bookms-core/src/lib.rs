//! # Bookms Core
//!
//! 도서 관리 API의 핵심 도메인 모델과 공통 인프라를 제공합니다.
//!
//! 이 크레이트는 API 서버 전반에서 사용되는 기본 타입을 제공합니다:
//! - 사용자 역할/상태 및 인증 주체(Principal)
//! - 사용자 저장소 추상화 (`UserStore`)
//! - 설정 관리
//! - 로깅 인프라
//! - 에러 타입

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
