//! # 에러 처리 모듈
//!
//! 애플리케이션에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//! Rust에서는 예외(exception) 대신 `Result<T, E>` 타입으로 에러를 처리합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 모든 에러 종류를 하나의 타입으로 통합
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환
//!
//! AI 공급자 관련 에러는 두 종류로 구분합니다:
//! - `UpstreamUnavailable`(503): 네트워크/타임아웃/HTTP 실패 — 일시적, 재시도 가능
//! - `UpstreamInvalid`(502): 응답은 왔지만 형식 검증 실패 — 재시도해도 소용없음

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 각 에러 variant는 적절한 HTTP 상태 코드와 메시지로 변환됩니다.
/// 핸들러에서 `Result<T, AppError>`를 반환하면,
/// Axum이 자동으로 `IntoResponse`를 호출하여 HTTP 응답으로 변환합니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 요청한 리소스를 찾을 수 없음 (HTTP 404)
    ///
    /// 다른 사용자 소유의 세션에 접근한 경우에도 동일하게 404를 반환합니다.
    /// "존재하지만 내 것이 아님"과 "존재하지 않음"을 구분해서 알려주면
    /// 세션 ID를 추측해 존재 여부를 알아내는 공격(IDOR)이 가능해지기 때문입니다.
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 요청 (HTTP 400)
    /// String을 포함하여 구체적인 에러 메시지를 전달합니다.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 이미 답변이 제출된 질문에 다시 답변을 제출함 (HTTP 400)
    /// 답변은 한 번 기록되면 수정할 수 없습니다 (write-once).
    #[error("This question has already been answered")]
    AlreadyAnswered,

    /// AI 공급자에 연결할 수 없음 (HTTP 503)
    /// 네트워크 오류, 타임아웃, HTTP 오류 상태가 여기에 해당합니다.
    /// 일시적인 장애이므로 클라이언트가 재시도할 수 있습니다.
    #[error("AI service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// AI 공급자가 응답했지만 내용이 기대한 형식이 아님 (HTTP 502)
    /// JSON 파싱 실패, 필수 키 누락, 질문 개수 부족 등이 해당합니다.
    #[error("AI returned an invalid response: {0}")]
    UpstreamInvalid(String),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),

    /// 데이터베이스 오류 (HTTP 500)
    /// #[from]: sqlx::Error를 AppError로 자동 변환하는 From 트레이트를 구현합니다.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 인증 실패 (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 리소스 충돌 (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 각 에러 종류에 따라 적절한 HTTP 상태 코드와 JSON 에러 메시지를 생성합니다.
    /// 내부 에러(Database, Internal)는 실제 에러 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다 (보안을 위해).
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),

            AppError::BadRequest(ref msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", msg.clone())
            }
            AppError::AlreadyAnswered => (
                StatusCode::BAD_REQUEST,
                "already_answered",
                self.to_string(),
            ),
            AppError::UpstreamUnavailable(ref msg) => {
                // 장애 원인은 로그로 남기고, 클라이언트에는 재시도를 안내합니다
                tracing::warn!("AI upstream unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ai_unavailable",
                    "AI service is temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::UpstreamInvalid(ref msg) => {
                tracing::warn!("AI upstream returned invalid payload: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "ai_invalid_response",
                    format!("AI returned an invalid response: {}", msg),
                )
            }
            AppError::Internal(ref msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    // 클라이언트에는 일반적인 메시지만 반환 (보안: 내부 구현 노출 방지)
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Database(ref e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Unauthorized(ref msg) => {
                (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            AppError::Conflict(ref msg) => {
                (StatusCode::CONFLICT, "conflict", msg.clone())
            }
        };

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
