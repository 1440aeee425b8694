//! 사용자 레코드, 역할, 계정 상태.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// 역할
// =============================================================================

/// 사용자 역할.
///
/// 역할 간 계층은 없습니다. 권한 검사는 정확히 같은 역할인지만 비교합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 관리자
    Admin,
    /// 일반 회원
    Member,
}

/// 알 수 없는 역할/상태 문자열.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("알 수 없는 {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl Role {
    /// 저장/전송 시 사용하는 문자열 표현.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
        }
    }

    /// 문자열을 역할로 변환합니다. 대소문자를 구분합니다.
    pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
        match value {
            "admin" => Ok(Role::Admin),
            "member" => Ok(Role::Member),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Role::parse(&value)
    }
}

// =============================================================================
// 계정 상태
// =============================================================================

/// 계정 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "utoipa-support", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// 활성
    Active,
    /// 비활성 (로그인/토큰 갱신 불가)
    Inactive,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ParseEnumError> {
        match value {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for UserStatus {
    type Error = ParseEnumError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        UserStatus::parse(&value)
    }
}

// =============================================================================
// 인증 주체 / 사용자 레코드
// =============================================================================

/// 토큰이 표현하는 인증 주체.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            role,
        }
    }
}

/// 저장된 사용자 레코드.
///
/// `deleted_date`가 설정된 레코드는 조회 대상에서 제외됩니다 (소프트 삭제).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::FromRow))]
pub struct User {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[cfg_attr(feature = "sqlx-support", sqlx(try_from = "String"))]
    pub role: Role,
    #[cfg_attr(feature = "sqlx-support", sqlx(try_from = "String"))]
    pub status: UserStatus,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub deleted_date: Option<DateTime<Utc>>,
}

impl User {
    /// 토큰 발급에 사용할 인증 주체를 만듭니다.
    pub fn principal(&self) -> Principal {
        Principal::new(self.id.clone(), self.email.clone(), self.role)
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

/// 새 사용자 생성 요청.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub status: UserStatus,
}

impl NewUser {
    /// 저장 직전의 레코드를 만듭니다. ID는 UUID v4입니다.
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            id: uuid::Uuid::new_v4().to_string(),
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            role: self.role,
            status: self.status,
            created_date: now,
            updated_date: now,
            deleted_date: None,
        }
    }
}
