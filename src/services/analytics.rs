//! # 분석(Analytics) 서비스
//!
//! 대시보드용 통계와 세션 이력을 제공합니다.
//!
//! 통계는 전부 DB의 집계 쿼리(COUNT/AVG/MAX, GROUP BY)로 계산합니다.
//! 세션 행을 메모리로 전부 끌어와 순회하지 않으므로, 이력이 얼마나
//! 쌓였든 비용이 일정합니다. 이 계층이 하는 일은 빈 날짜 채우기와
//! 소수 1자리 반올림뿐입니다.

use std::collections::HashMap;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::{AnalyticsResponse, SessionHistoryItem};

/// 7일 추이 그래프의 길이 (오늘 포함, UTC 달력 기준)
const TREND_DAYS: i64 = 7;

/// 소수 첫째 자리로 반올림합니다.
fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// 대시보드 통계를 계산합니다.
///
/// 완료된(final_score가 있는) 세션만 집계 대상입니다.
/// 완료된 세션이 하나도 없으면 에러가 아니라 0으로 채운 응답을 반환합니다.
pub async fn get_analytics(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<AnalyticsResponse, AppError> {
    let (total_sessions, average, best) = db::completed_session_stats(pool, user_id).await?;

    if total_sessions == 0 {
        return Ok(AnalyticsResponse {
            total_sessions: 0,
            average_score: 0.0,
            best_score: 0.0,
            weekly_scores: vec![0.0; TREND_DAYS as usize],
        });
    }

    // 오늘로 끝나는 7일 구간: 6일 전 날짜부터 집계한다
    let today = Utc::now().date_naive();
    let start_day = today - Duration::days(TREND_DAYS - 1);
    let rows = db::daily_average_scores(
        pool,
        user_id,
        &start_day.format("%Y-%m-%d").to_string(),
    )
    .await?;
    let by_day: HashMap<String, f64> = rows.into_iter().collect();

    // 세션이 없었던 날짜는 0.0으로 채운다 (오래된 날부터)
    let weekly_scores = (0..TREND_DAYS)
        .map(|offset| {
            let day = (start_day + Duration::days(offset))
                .format("%Y-%m-%d")
                .to_string();
            by_day.get(&day).map(|avg| round1(*avg)).unwrap_or(0.0)
        })
        .collect();

    Ok(AnalyticsResponse {
        total_sessions,
        average_score: round1(average),
        best_score: round1(best),
        weekly_scores,
    })
}

/// 완료된 세션을 최신순으로 최대 `limit`개 반환합니다.
pub async fn get_history(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<SessionHistoryItem>, AppError> {
    let sessions = db::list_completed_sessions(pool, user_id, limit).await?;

    Ok(sessions
        .into_iter()
        .map(|s| SessionHistoryItem {
            id: s.id,
            role: s.role,
            difficulty: s.difficulty,
            question_count: s.question_count,
            // 완료 세션의 final_score는 항상 있어야 하지만, 만약 비어 있으면 0.0
            score: s.final_score.unwrap_or(0.0),
            // updated_at은 완료 전환 시점에 기록된다
            completed_at: s.updated_at,
        })
        .collect())
}
