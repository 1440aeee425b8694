//! 비밀번호 해싱 유틸리티.
//!
//! Argon2id 기반 비밀번호 해싱 및 검증.
//!
//! 가입과 관리자 사용자 생성은 [`hash_password`]로 저장할 해시를 만들고,
//! 로그인은 [`verify_password`]로 입력을 확인합니다. 길이 제한(8자 이상)은
//! 요청 DTO의 `validator` 규칙이 담당하므로 이 모듈은 강도 검사를 하지 않습니다.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// 비밀번호 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Argon2 해싱 자체가 실패함 (파라미터 오류 등)
    #[error("비밀번호 해싱 실패")]
    HashingFailed,
    /// 해시는 정상이지만 비밀번호가 일치하지 않음
    #[error("비밀번호 검증 실패")]
    VerificationFailed,
    /// 저장된 값이 PHC 형식 해시가 아님
    #[error("잘못된 해시 형식")]
    InvalidHashFormat,
}

/// 비밀번호 해싱.
///
/// Argon2id 알고리즘을 사용하여 비밀번호를 해싱합니다.
/// 솔트는 호출마다 새로 생성됩니다.
///
/// # Arguments
///
/// * `password` - 해싱할 평문 비밀번호
///
/// # Returns
///
/// PHC 형식의 해시 문자열 (솔트 포함). `users.password_hash` 컬럼에 그대로 저장합니다.
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("correct horse battery").unwrap();
/// // "$argon2id$v=19$m=19456,t=2,p=1$..."
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?;

    Ok(hash.to_string())
}

/// 비밀번호 검증.
///
/// 저장된 해시와 입력된 비밀번호를 비교합니다. 해시에 기록된
/// 파라미터와 솔트를 사용하므로 기본 설정이 바뀌어도 기존 해시는 검증됩니다.
///
/// # Arguments
///
/// * `password` - 검증할 평문 비밀번호
/// * `hash` - 저장된 PHC 형식 해시
///
/// # Returns
///
/// 일치하면 `Ok(())`. 불일치는 [`PasswordError::VerificationFailed`],
/// 해시 파싱 실패는 [`PasswordError::InvalidHashFormat`].
///
/// # Example
///
/// ```rust,ignore
/// let hash = hash_password("correct horse battery").unwrap();
/// assert!(verify_password("correct horse battery", &hash).is_ok());
/// assert!(verify_password("wrong password", &hash).is_err());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}
