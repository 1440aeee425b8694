//! JWT 토큰 처리.
//!
//! Access Token 및 Refresh Token 발급/검증 로직.
//! 하나의 [`JwtService`]가 발급자이자 검증자이며, 생성 이후 변경되지 않습니다.

use bookms_core::{AuthConfig, Principal, Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

/// JWT Access Token 페이로드.
///
/// 사용자 인증 정보와 역할을 포함합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// 사용자 ID
    pub user_id: String,
    /// 이메일
    pub email: String,
    /// 사용자 역할
    pub role: Role,
    /// Subject - 사용자 ID
    pub sub: String,
    /// Issued At (Unix timestamp)
    pub iat: i64,
    /// Not Before (Unix timestamp)
    pub nbf: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Refresh Token 페이로드.
///
/// 사용자 ID와 시간 범위만 담습니다. 역할과 이메일은 갱신 시 저장소에서 다시 읽습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    /// Subject - 사용자 ID
    pub sub: String,
    /// Issued At
    pub iat: i64,
    /// Not Before
    pub nbf: i64,
    /// Expiration
    pub exp: i64,
}

/// Access Token + Refresh Token 페어.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// 서명 키나 헤더 설정 오류. 정상 설정에서는 발생하지 않습니다.
    #[error("토큰 인코딩 실패: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
    /// 서명 불일치, 형식 오류, 만료, 유효 시작 전 모두 이 하나로 처리합니다.
    #[error("유효하지 않거나 만료된 토큰")]
    InvalidToken,
    /// 발급 시각에 유효 기간을 더한 값이 시각 표현 범위를 벗어남. 설정 오류입니다.
    #[error("토큰 만료 시각 계산 범위 초과: {0}시간")]
    ExpiryOutOfRange(i64),
}

/// JWT 발급/검증 서비스.
///
/// HS256 단일 비밀키를 사용합니다. `Arc`로 감싸 요청 간에 공유합니다.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_expiry_hours: i64,
    refresh_expiry_hours: i64,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("access_expiry_hours", &self.access_expiry_hours)
            .field("refresh_expiry_hours", &self.refresh_expiry_hours)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// 인증 설정으로 서비스를 생성합니다.
    pub fn new(config: &AuthConfig) -> Self {
        Self::from_secret(
            config.jwt_secret.expose_secret().as_bytes(),
            config.access_expiry_hours,
            config.refresh_expiry_hours,
        )
    }

    /// 비밀키와 만료 시간(시간 단위)으로 서비스를 생성합니다.
    pub fn from_secret(secret: &[u8], access_expiry_hours: i64, refresh_expiry_hours: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "nbf", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            access_expiry_hours,
            refresh_expiry_hours,
        }
    }

    /// Access Token 유효 기간(시간).
    pub fn access_expiry_hours(&self) -> i64 {
        self.access_expiry_hours
    }

    /// Refresh Token 유효 기간(시간).
    pub fn refresh_expiry_hours(&self) -> i64 {
        self.refresh_expiry_hours
    }

    /// `now`에 발급한 Access Token의 만료 시각.
    pub fn access_expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, JwtError> {
        expires_at(now, self.access_expiry_hours)
    }

    /// `now`에 발급한 Refresh Token의 만료 시각.
    pub fn refresh_expires_at(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, JwtError> {
        expires_at(now, self.refresh_expiry_hours)
    }

    // =========================================================================
    // 발급
    // =========================================================================

    /// Access Token 발급.
    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue_access_token_at(principal, Utc::now())
    }

    /// 지정한 시각을 기준으로 Access Token 발급.
    pub fn issue_access_token_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = Claims {
            user_id: principal.id.clone(),
            email: principal.email.clone(),
            role: principal.role,
            sub: principal.id.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: self.access_expires_at(now)?.timestamp(),
        };
        self.sign(&claims)
    }

    /// Refresh Token 발급.
    pub fn issue_refresh_token(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue_refresh_token_at(principal, Utc::now())
    }

    /// 지정한 시각을 기준으로 Refresh Token 발급.
    pub fn issue_refresh_token_at(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        let claims = RefreshClaims {
            sub: principal.id.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: self.refresh_expires_at(now)?.timestamp(),
        };
        self.sign(&claims)
    }

    /// Access Token + Refresh Token 쌍 발급.
    pub fn issue_pair(&self, principal: &Principal) -> Result<TokenPair, JwtError> {
        let now = Utc::now();
        Ok(TokenPair {
            access_token: self.issue_access_token_at(principal, now)?,
            refresh_token: self.issue_refresh_token_at(principal, now)?,
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(JwtError::from)
    }

    // =========================================================================
    // 검증
    // =========================================================================

    /// Access Token 검증 후 Claims 반환.
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.verify::<Claims>(token)
    }

    /// Refresh Token 검증 후 사용자 ID 반환.
    ///
    /// Access Token은 추가 필드 때문에 거부됩니다.
    pub fn validate_refresh_token(&self, token: &str) -> Result<String, JwtError> {
        self.verify::<RefreshClaims>(token).map(|claims| claims.sub)
    }

    fn verify<T: serde::de::DeserializeOwned>(&self, token: &str) -> Result<T, JwtError> {
        decode::<T>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(reason = ?e.kind(), "token rejected");
                JwtError::InvalidToken
            })
    }
}

fn expires_at(now: DateTime<Utc>, hours: i64) -> Result<DateTime<Utc>, JwtError> {
    Duration::try_hours(hours)
        .and_then(|expiry| now.checked_add_signed(expiry))
        .ok_or(JwtError::ExpiryOutOfRange(hours))
}
