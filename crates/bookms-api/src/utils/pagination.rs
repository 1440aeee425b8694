//! 목록 조회용 limit/offset 파싱.
//!
//! 잘못된 값은 거부하지 않고 기본값으로 대체합니다.
//! limit은 1 이상이어야 하며(기본 20), offset은 0 이상이어야 합니다(기본 0).

use serde::Serialize;

/// 기본 페이지 크기.
pub const DEFAULT_LIMIT: i64 = 20;

/// 파싱된 페이지 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// 쿼리 문자열 값에서 페이지 범위를 만듭니다.
    pub fn parse(limit: Option<&str>, offset: Option<&str>) -> Self {
        let limit = limit
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(DEFAULT_LIMIT);
        let offset = offset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|v| *v >= 0)
            .unwrap_or(0);

        Self { limit, offset }
    }
}
