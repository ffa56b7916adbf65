//! # 미들웨어 모듈
//!
//! 요청이 핸들러에 도달하기 전에 거치는 공통 처리 계층입니다.
//! - `auth`: Bearer JWT 검증과 `AuthUser` 추출기(extractor)

pub mod auth;
