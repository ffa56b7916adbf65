//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 데이터베이스와 직접 상호작용하는 함수들을 모아둔 모듈입니다.
//! 서비스 계층(services/)과 라우트 핸들러(routes/)에서 이 모듈의 함수를
//! 호출하여 DB 작업을 수행합니다.
//!
//! 각 하위 모듈:
//! - `interviews`: 인터뷰 세션/질문/피드백 쿼리와 집계, 연쇄 삭제
//! - `users`: 사용자 인증 관련 쿼리
//!
//! 상태를 갖는 저장소 객체 대신, `&SqlitePool`을 첫 인자로 받는
//! 평범한 비동기 함수들로 구성되어 있습니다.

pub mod interviews;
pub mod users;

// 하위 모듈의 모든 공개 함수를 재공개(re-export)하여
// `crate::db::get_session_for_user`처럼 바로 접근할 수 있게 합니다.
pub use interviews::*;
