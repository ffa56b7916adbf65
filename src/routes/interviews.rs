//! # 인터뷰 API 라우트 핸들러
//!
//! 인터뷰 세션의 시작, 답변 제출, 조회/삭제, 통계를 위한 HTTP 핸들러
//! 함수들입니다.
//!
//! ## 엔드포인트 목록
//! | 메서드 | 경로 | 핸들러 | 설명 |
//! |--------|------|--------|------|
//! | POST | /api/v1/interviews/start | `start_interview` | 새 세션 시작 (AI 질문 생성) |
//! | POST | /api/v1/interviews/{sid}/questions/{qid}/answer | `submit_answer` | 답변 제출 (AI 평가) |
//! | GET | /api/v1/interviews/analytics | `get_analytics` | 대시보드 통계 |
//! | GET | /api/v1/interviews/history | `get_history` | 완료 세션 이력 |
//! | GET | /api/v1/interviews/{sid} | `get_interview` | 세션 단건 조회 |
//! | DELETE | /api/v1/interviews/{sid} | `delete_interview` | 세션 삭제 (연쇄) |
//!
//! 모든 핸들러는 `AuthUser` 추출기로 인증을 요구합니다.
//! 입력 검증은 여기서 끝내고, 서비스 계층에는 올바른 값만 넘깁니다.

use crate::{
    error::AppError,
    middleware::auth::AuthUser,
    models::*,
    services,
    services::ai::AiClient,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

/// 애플리케이션 공유 상태
///
/// 모든 요청 핸들러가 `State(state): State<AppState>`로 접근합니다.
/// SqlitePool과 AiClient(내부의 reqwest::Client)는 둘 다 내부적으로
/// 참조를 공유하므로 clone 비용이 거의 없습니다.
#[derive(Clone)]
pub struct AppState {
    /// SQLite 연결 풀
    pub pool: SqlitePool,
    /// AI 게이트웨이 클라이언트
    pub ai: AiClient,
    /// JWT 토큰 서명용 비밀키
    pub jwt_secret: String,
}

/// `POST /interviews/start` — 새 인터뷰 세션을 시작합니다.
///
/// AI가 질문 생성에 실패하면 세션은 만들어지지 않습니다 (all-or-nothing).
/// 성공 시 201과 함께 질문이 포함된 세션 전체를 반환합니다.
pub async fn start_interview(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(req): Json<StartInterviewRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    // 난이도는 enum 역직렬화가 이미 걸러냈으므로 나머지만 검사한다
    if req.role.len() < 2 || req.role.len() > 100 {
        return Err(AppError::BadRequest(
            "Role must be between 2 and 100 characters".to_string(),
        ));
    }
    if !(3..=10).contains(&req.question_count) {
        return Err(AppError::BadRequest(
            "Question count must be between 3 and 10".to_string(),
        ));
    }

    let session =
        services::interview::start_session(&state.pool, &state.ai, &auth_user.user_id, &req)
            .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /interviews/{session_id}/questions/{question_id}/answer`
/// — 답변을 제출하고 AI 평가를 받습니다.
///
/// 남의 세션이나 없는 세션/질문은 모두 404, 이미 답변된 질문은 400,
/// AI 장애는 502/503으로 응답합니다.
pub async fn submit_answer(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path((session_id, question_id)): Path<(String, String)>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    if req.answer.is_empty() || req.answer.len() > 5000 {
        return Err(AppError::BadRequest(
            "Answer must be between 1 and 5000 characters".to_string(),
        ));
    }

    let response = services::interview::submit_answer(
        &state.pool,
        &state.ai,
        &auth_user.user_id,
        &session_id,
        &question_id,
        &req,
    )
    .await?;

    Ok(Json(response))
}

/// `GET /interviews/{session_id}` — 세션 하나를 질문 목록과 함께 조회합니다.
pub async fn get_interview(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<Json<SessionResponse>, AppError> {
    let session =
        services::interview::get_session(&state.pool, &auth_user.user_id, &session_id).await?;
    Ok(Json(session))
}

/// `DELETE /interviews/{session_id}` — 세션과 그 질문/피드백을 삭제합니다.
pub async fn delete_interview(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::interview::delete_session(&state.pool, &auth_user.user_id, &session_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /interviews/analytics` — 대시보드 통계를 조회합니다.
///
/// 완료된 세션이 없어도 에러가 아니라 0으로 채운 응답을 반환합니다.
pub async fn get_analytics(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let analytics = services::analytics::get_analytics(&state.pool, &auth_user.user_id).await?;
    Ok(Json(analytics))
}

/// `GET /interviews/history`의 쿼리 파라미터
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// 최대 반환 개수 (기본값 20)
    pub limit: Option<i64>,
}

/// `GET /interviews/history?limit=20` — 완료된 세션 이력을 최신순으로 조회합니다.
pub async fn get_history(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<SessionHistoryItem>>, AppError> {
    // 0 이하나 터무니없이 큰 값은 합리적인 범위로 조정한다
    let limit = params.limit.unwrap_or(20).clamp(1, 100);
    let history =
        services::analytics::get_history(&state.pool, &auth_user.user_id, limit).await?;
    Ok(Json(history))
}
