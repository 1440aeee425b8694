//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → 환경 변수 순서로 덮어쓰며 로드합니다.
//! 환경 변수는 `BOOKMS__<섹션>__<키>` 형식입니다 (예: `BOOKMS__AUTH__JWT_SECRET`).

use std::net::SocketAddr;
use std::path::Path;

use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::error::{BookmsError, BookmsResult};

/// 설정 파일 경로를 지정하는 환경 변수.
pub const CONFIG_PATH_ENV: &str = "BOOKMS_CONFIG";

/// 기본 설정 파일 경로.
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// 애플리케이션 설정.
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin 목록 (비어 있으면 모두 허용)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// 바인딩 주소를 파싱합니다.
    pub fn socket_addr(&self) -> BookmsResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| BookmsError::Config(format!("invalid server address: {}", e)))
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 연결 URL (postgres://...)
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 최소 유지 연결 수
    pub min_connections: u32,
    /// 연결 타임아웃 (초)
    pub connect_timeout_secs: u64,
    /// 연결 최대 수명 (초)
    pub max_lifetime_secs: u64,
    /// 시작 시 마이그레이션 실행 여부
    pub run_migrations: bool,
}

/// 인증 설정.
///
/// 서명 비밀키는 `SecretString`으로 보관되어 `Debug` 출력에 노출되지 않습니다.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// HS256 서명 비밀키
    #[serde(deserialize_with = "deserialize_secret")]
    pub jwt_secret: SecretString,
    /// 액세스 토큰 만료 시간 (시간)
    pub access_expiry_hours: i64,
    /// 리프레시 토큰 만료 시간 (시간)
    pub refresh_expiry_hours: i64,
}

impl AuthConfig {
    /// 직접 인증 설정을 생성합니다.
    pub fn new(
        jwt_secret: impl Into<String>,
        access_expiry_hours: i64,
        refresh_expiry_hours: i64,
    ) -> Self {
        Self {
            jwt_secret: SecretString::new(jwt_secret.into().into_boxed_str()),
            access_expiry_hours,
            refresh_expiry_hours,
        }
    }

    /// 만료 시간과 비밀키를 검증합니다.
    pub fn validate(&self) -> BookmsResult<()> {
        if self.jwt_secret.expose_secret().is_empty() {
            return Err(BookmsError::Config("auth.jwt_secret must not be empty".into()));
        }
        if self.access_expiry_hours <= 0 || self.refresh_expiry_hours <= 0 {
            return Err(BookmsError::Config(
                "token expiry hours must be positive".into(),
            ));
        }
        if self.access_expiry_hours >= self.refresh_expiry_hours {
            return Err(BookmsError::Config(format!(
                "access expiry ({}h) must be shorter than refresh expiry ({}h)",
                self.access_expiry_hours, self.refresh_expiry_hours
            )));
        }
        // refresh가 더 길기 때문에 refresh만 확인하면 access도 범위 안
        let representable = Duration::try_hours(self.refresh_expiry_hours)
            .and_then(|expiry| Utc::now().checked_add_signed(expiry))
            .is_some();
        if !representable {
            return Err(BookmsError::Config(format!(
                "refresh expiry ({}h) is out of range",
                self.refresh_expiry_hours
            )));
        }
        Ok(())
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(SecretString::new(raw.into_boxed_str()))
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 기본값이 채워진 설정 빌더.
    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError>
    {
        config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.cors_origins", Vec::<String>::new())?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout_secs", 30)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("database.run_migrations", true)?
            .set_default("auth.access_expiry_hours", 24)?
            .set_default("auth.refresh_expiry_hours", 168)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")
    }

    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일은 없어도 되며, `jwt_secret`과 `database.url`은 어느 쪽에서든 반드시 제공되어야 합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> BookmsResult<Self> {
        let config = Self::defaults()?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("BOOKMS")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// `BOOKMS_CONFIG` 또는 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> BookmsResult<Self> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load(path)
    }

    /// TOML 문자열에서 설정을 로드합니다 (환경 변수 미적용).
    pub fn from_toml_str(toml: &str) -> BookmsResult<Self> {
        let config = Self::defaults()?
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// 시작 전에 설정 전체를 검증합니다.
    pub fn validate(&self) -> BookmsResult<()> {
        if self.server.port == 0 {
            return Err(BookmsError::Config("server.port must not be 0".into()));
        }
        if self.database.url.trim().is_empty() {
            return Err(BookmsError::Config("database.url must not be empty".into()));
        }
        self.auth.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [database]
        url = "postgres://localhost/bookms"

        [auth]
        jwt_secret = "test-secret"
    "#;

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert!(config.server.cors_origins.is_empty());
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.auth.access_expiry_hours, 24);
        assert_eq!(config.auth.refresh_expiry_hours, 168);
        assert_eq!(config.auth.jwt_secret.expose_secret(), "test-secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_secret_fails() {
        let toml = r#"
            [database]
            url = "postgres://localhost/bookms"
        "#;
        let result = AppConfig::from_toml_str(toml);
        assert!(matches!(result, Err(BookmsError::Config(_))));
    }

    #[test]
    fn test_empty_secret_rejected() {
        let config = AuthConfig::new("", 24, 168);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_must_outlive_access() {
        assert!(AuthConfig::new("s", 24, 24).validate().is_err());
        assert!(AuthConfig::new("s", 48, 24).validate().is_err());
        assert!(AuthConfig::new("s", 0, 24).validate().is_err());
        assert!(AuthConfig::new("s", 1, 2).validate().is_ok());
    }

    #[test]
    fn test_out_of_range_expiry_rejected() {
        let toml = r#"
            [database]
            url = "postgres://localhost/bookms"

            [auth]
            jwt_secret = "test-secret"
            access_expiry_hours = 1
            refresh_expiry_hours = 3000000000
        "#;
        let config = AppConfig::from_toml_str(toml).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.is_misconfiguration());
        assert!(err.to_string().contains("out of range"));

        assert!(AuthConfig::new("s", 1, i64::MAX).validate().is_err());
        // 100년은 허용
        assert!(AuthConfig::new("s", 1, 24 * 365 * 100).validate().is_ok());
    }

    #[test]
    fn test_zero_port_rejected() {
        let toml = format!("{}\n[server]\nport = 0\n", MINIMAL);
        let config = AppConfig::from_toml_str(&toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secret_not_in_debug_output() {
        let config = AuthConfig::new("super-secret-value", 24, 168);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-value"));
    }

    #[test]
    fn test_socket_addr() {
        let server = ServerConfig::default();
        assert_eq!(server.socket_addr().unwrap().port(), 8080);
    }
}
