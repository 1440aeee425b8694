//! 사용자와 인증 주체를 위한 도메인 모델.

mod user;
mod user_store;

pub use user::*;
pub use user_store::*;
