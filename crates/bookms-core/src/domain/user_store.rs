//! 사용자 저장소 추상화.
//!
//! 인증 흐름(가입, 로그인, 토큰 갱신, 프로필)은 이 trait에만 의존합니다.
//! 운영 구현은 PostgreSQL 기반이며, 테스트에서는 메모리 구현을 사용합니다.

use async_trait::async_trait;
use thiserror::Error;

use super::{NewUser, User};

// =============================================================================
// 에러 타입
// =============================================================================

/// 사용자 저장소 에러.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 이메일 중복
    #[error("이미 존재하는 이메일: {0}")]
    DuplicateEmail(String),

    /// 저장소 백엔드 에러
    #[error("저장소 에러: {0}")]
    Backend(String),
}

// =============================================================================
// UserStore Trait
// =============================================================================

/// 사용자 조회/생성 trait.
///
/// 모든 조회는 소프트 삭제된 사용자를 제외합니다.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// ID로 사용자 조회.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// 이메일로 사용자 조회.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// 이메일 사용 여부.
    async fn email_exists(&self, email: &str) -> Result<bool, StoreError>;

    /// 사용자 생성.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateEmail`: 같은 이메일의 활성 레코드가 이미 있음
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

// =============================================================================
// 메모리 구현 (테스트용)
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryUserStore;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;
    use chrono::Utc;

    use super::{StoreError, UserStore};
    use crate::domain::{NewUser, Role, User, UserStatus};

    /// 데이터베이스 없이 인증 흐름을 테스트하기 위한 메모리 저장소.
    #[derive(Debug, Default)]
    pub struct MemoryUserStore {
        users: RwLock<HashMap<String, User>>,
    }

    impl MemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// 레코드를 그대로 넣습니다.
        pub fn insert(&self, user: User) {
            self.write().insert(user.id.clone(), user);
        }

        /// 역할을 변경합니다. 사용자가 없으면 false.
        pub fn set_role(&self, id: &str, role: Role) -> bool {
            self.update(id, |user| user.role = role)
        }

        /// 상태를 변경합니다. 사용자가 없으면 false.
        pub fn set_status(&self, id: &str, status: UserStatus) -> bool {
            self.update(id, |user| user.status = status)
        }

        /// 소프트 삭제합니다. 사용자가 없으면 false.
        pub fn soft_delete(&self, id: &str) -> bool {
            self.update(id, |user| user.deleted_date = Some(Utc::now()))
        }

        fn update(&self, id: &str, f: impl FnOnce(&mut User)) -> bool {
            match self.write().get_mut(id) {
                Some(user) => {
                    f(user);
                    user.updated_date = Utc::now();
                    true
                }
                None => false,
            }
        }

        fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, User>> {
            self.users.write().unwrap_or_else(|e| e.into_inner())
        }

        fn live(&self, pred: impl Fn(&User) -> bool) -> Option<User> {
            self.users
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .values()
                .find(|u| u.deleted_date.is_none() && pred(u))
                .cloned()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
            Ok(self.live(|u| u.id == id))
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self.live(|u| u.email == email))
        }

        async fn email_exists(&self, email: &str) -> Result<bool, StoreError> {
            Ok(self.live(|u| u.email == email).is_some())
        }

        async fn create(&self, user: NewUser) -> Result<User, StoreError> {
            let mut users = self.write();
            if users
                .values()
                .any(|u| u.deleted_date.is_none() && u.email == user.email)
            {
                return Err(StoreError::DuplicateEmail(user.email));
            }
            let user = user.into_user(Utc::now());
            users.insert(user.id.clone(), user.clone());
            Ok(user)
        }
    }
}
