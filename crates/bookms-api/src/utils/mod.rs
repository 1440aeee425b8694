//! 라우트 공용 유틸리티.

pub mod pagination;

pub use pagination::{Page, DEFAULT_LIMIT};
