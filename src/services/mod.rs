//! # 서비스(비즈니스 로직) 모듈
//!
//! HTTP와 무관한 핵심 로직을 모아둔 모듈입니다.
//! 라우트 핸들러는 요청을 풀어서 이 모듈의 함수를 호출하고,
//! 결과를 HTTP 응답으로 되돌리는 일만 합니다.
//!
//! 각 하위 모듈:
//! - `ai`: 외부 AI 공급자 게이트웨이 (질문 생성, 답변 평가)
//! - `analytics`: 대시보드 통계와 세션 이력 집계
//! - `interview`: 인터뷰 세션 라이프사이클 엔진

pub mod ai;
pub mod analytics;
pub mod interview;
