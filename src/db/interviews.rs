//! # 인터뷰 데이터베이스 쿼리 모듈
//!
//! 인터뷰 세션/질문/피드백에 대한 SQL 쿼리 함수들입니다.
//!
//! ## 세션 라이프사이클
//! ```text
//! [시작] create_session_with_questions() → 진행 중(is_completed = 0)
//!   → 질문마다 set_answer_if_unanswered() + record_feedback()
//!   → 마지막 피드백 기록 시 final_score 계산 + is_completed = 1 → [완료]
//! ```
//!
//! ## 트랜잭션 경계
//! - 세션 + 질문 N개 삽입은 하나의 트랜잭션입니다. 중간에 실패하면
//!   롤백되어 부분 세션이 보이지 않습니다 (all-or-nothing).
//! - 피드백 삽입 + 완료 판정 + 최종 점수 기록도 하나의 트랜잭션입니다.
//!   완료 여부는 삽입 *후* 같은 트랜잭션 안에서 피드백 행 수를 다시 세어
//!   판정하므로, 마지막 두 답변이 동시에 제출되어도 완료 전환은 정확히
//!   한 번, 전체 N개 점수의 평균으로 일어납니다.

use crate::error::AppError;
use crate::models::{Difficulty, InterviewQuestion, InterviewSession, QuestionFeedback};
use sqlx::SqlitePool;

/// `question_feedback` 테이블의 행 형태.
///
/// strengths/improvements가 JSON 문자열로 저장되어 있어
/// 공개 모델로 변환하기 전의 중간 표현으로만 사용합니다.
#[derive(Debug, sqlx::FromRow)]
struct FeedbackRow {
    id: String,
    question_id: String,
    score: i64,
    overall_feedback: String,
    strengths: String,
    improvements: String,
    created_at: String,
}

impl FeedbackRow {
    fn into_feedback(self) -> Result<QuestionFeedback, AppError> {
        // 저장 시 우리가 직접 직렬화한 값이므로 파싱 실패는 데이터 손상을 의미합니다
        let strengths = serde_json::from_str(&self.strengths)
            .map_err(|e| AppError::Internal(format!("Corrupt strengths column: {}", e)))?;
        let improvements = serde_json::from_str(&self.improvements)
            .map_err(|e| AppError::Internal(format!("Corrupt improvements column: {}", e)))?;

        Ok(QuestionFeedback {
            id: self.id,
            question_id: self.question_id,
            score: self.score,
            overall_feedback: self.overall_feedback,
            strengths,
            improvements,
            created_at: self.created_at,
        })
    }
}

/// 새 세션과 그 질문들을 한 트랜잭션으로 생성합니다.
///
/// 질문은 전달된 순서대로 order_index 0..N-1을 부여받습니다.
/// 어느 INSERT든 실패하면 전체가 롤백되어 아무것도 남지 않습니다.
pub async fn create_session_with_questions(
    pool: &SqlitePool,
    user_id: &str,
    role: &str,
    difficulty: Difficulty,
    question_texts: &[String],
) -> Result<(InterviewSession, Vec<InterviewQuestion>), AppError> {
    let session_id = uuid::Uuid::now_v7().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO interview_sessions (id, user_id, role, difficulty, question_count)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session_id)
    .bind(user_id)
    .bind(role)
    .bind(difficulty)
    .bind(question_texts.len() as i64)
    .execute(&mut *tx)
    .await?;

    for (idx, text) in question_texts.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO interview_questions (id, session_id, question_text, order_index)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::now_v7().to_string())
        .bind(&session_id)
        .bind(text)
        .bind(idx as i64)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let session = get_session_for_user(pool, &session_id, user_id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created session".to_string()))?;
    let questions = list_questions_for_session(pool, &session_id).await?;

    Ok((session, questions))
}

/// 세션을 소유자 기준으로 조회합니다.
///
/// id와 user_id를 함께 조건으로 걸기 때문에, 남의 세션 ID를 넣어도
/// "없는 세션"과 똑같이 None이 반환됩니다 (IDOR 방지).
pub async fn get_session_for_user(
    pool: &SqlitePool,
    session_id: &str,
    user_id: &str,
) -> Result<Option<InterviewSession>, AppError> {
    let session = sqlx::query_as::<_, InterviewSession>(
        r#"
        SELECT id, user_id, role, difficulty, question_count, final_score,
               is_completed, created_at, updated_at
        FROM interview_sessions
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(session_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(session)
}

/// 세션에 속한 질문 하나를 조회합니다.
///
/// session_id를 함께 조건으로 걸어, 다른 세션의 질문 ID로는 찾을 수 없습니다.
pub async fn get_question_in_session(
    pool: &SqlitePool,
    question_id: &str,
    session_id: &str,
) -> Result<Option<InterviewQuestion>, AppError> {
    let question = sqlx::query_as::<_, InterviewQuestion>(
        r#"
        SELECT id, session_id, question_text, user_answer, order_index, created_at
        FROM interview_questions
        WHERE id = ? AND session_id = ?
        "#,
    )
    .bind(question_id)
    .bind(session_id)
    .fetch_optional(pool)
    .await?;

    Ok(question)
}

/// 세션의 질문 전체를 표시 순서(order_index)대로 조회합니다.
pub async fn list_questions_for_session(
    pool: &SqlitePool,
    session_id: &str,
) -> Result<Vec<InterviewQuestion>, AppError> {
    let questions = sqlx::query_as::<_, InterviewQuestion>(
        r#"
        SELECT id, session_id, question_text, user_answer, order_index, created_at
        FROM interview_questions
        WHERE session_id = ?
        ORDER BY order_index ASC
        "#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// 아직 답변되지 않은 질문에만 답변을 기록합니다 (write-once).
///
/// `WHERE user_answer IS NULL` 조건 덕분에 검사와 쓰기가 한 문장으로
/// 원자적으로 처리됩니다. 반환값이 false면 이미 답변이 있었다는 뜻입니다
/// (같은 질문에 대한 동시 제출 경쟁에서도 정확히 한 쪽만 true를 받습니다).
pub async fn set_answer_if_unanswered(
    pool: &SqlitePool,
    question_id: &str,
    answer: &str,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE interview_questions
        SET user_answer = ?
        WHERE id = ? AND user_answer IS NULL
        "#,
    )
    .bind(answer)
    .bind(question_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// 질문에 붙은 피드백을 조회합니다. 없으면 None.
pub async fn get_feedback_for_question(
    pool: &SqlitePool,
    question_id: &str,
) -> Result<Option<QuestionFeedback>, AppError> {
    let row = sqlx::query_as::<_, FeedbackRow>(
        r#"
        SELECT id, question_id, score, overall_feedback, strengths, improvements, created_at
        FROM question_feedback
        WHERE question_id = ?
        "#,
    )
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    row.map(FeedbackRow::into_feedback).transpose()
}

/// 피드백을 기록하고, 세션 완료 여부를 판정합니다.
///
/// 한 트랜잭션 안에서:
/// 1. 피드백 INSERT (question_id UNIQUE 인덱스가 1:1 관계를 강제)
/// 2. 이 세션의 피드백 행 수를 다시 집계
/// 3. 행 수가 question_count에 도달했으면 전체 점수의 평균을 계산해
///    final_score와 is_completed를 기록 (`is_completed = 0`인 경우에만)
///
/// 반환값: (저장된 피드백, 이 제출로 세션이 완료되었는지)
pub async fn record_feedback(
    pool: &SqlitePool,
    session_id: &str,
    question_id: &str,
    score: i64,
    overall_feedback: &str,
    strengths: &[String],
    improvements: &[String],
) -> Result<(QuestionFeedback, bool), AppError> {
    let feedback_id = uuid::Uuid::now_v7().to_string();
    let strengths_json = serde_json::to_string(strengths)
        .map_err(|e| AppError::Internal(format!("Failed to encode strengths: {}", e)))?;
    let improvements_json = serde_json::to_string(improvements)
        .map_err(|e| AppError::Internal(format!("Failed to encode improvements: {}", e)))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO question_feedback (id, question_id, score, overall_feedback, strengths, improvements)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&feedback_id)
    .bind(question_id)
    .bind(score)
    .bind(overall_feedback)
    .bind(&strengths_json)
    .bind(&improvements_json)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        // 같은 질문에 대한 평가가 동시에 끝난 경우: UNIQUE 인덱스가
        // 두 번째 삽입을 거부한다 → 호출자에게는 중복 제출로 보인다
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::AlreadyAnswered;
            }
        }
        AppError::from(e)
    })?;

    // 삽입 직후 같은 트랜잭션에서 다시 센다 — 방금 넣은 행도 포함된다
    let (feedback_count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM question_feedback f
        JOIN interview_questions q ON q.id = f.question_id
        WHERE q.session_id = ?
        "#,
    )
    .bind(session_id)
    .fetch_one(&mut *tx)
    .await?;

    let (question_count,): (i64,) =
        sqlx::query_as("SELECT question_count FROM interview_sessions WHERE id = ?")
            .bind(session_id)
            .fetch_one(&mut *tx)
            .await?;

    let is_complete = feedback_count >= question_count;
    if is_complete {
        let (final_score,): (f64,) = sqlx::query_as(
            r#"
            SELECT AVG(f.score)
            FROM question_feedback f
            JOIN interview_questions q ON q.id = f.question_id
            WHERE q.session_id = ?
            "#,
        )
        .bind(session_id)
        .fetch_one(&mut *tx)
        .await?;

        // 최종 점수는 한 번만 기록된다: 이미 완료된 세션이면 매칭되는 행이 없다
        sqlx::query(
            r#"
            UPDATE interview_sessions
            SET final_score = ?, is_completed = 1,
                updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
            WHERE id = ? AND is_completed = 0
            "#,
        )
        .bind(final_score)
        .bind(session_id)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    let feedback = get_feedback_for_question(pool, question_id)
        .await?
        .ok_or(AppError::Internal("Failed to retrieve created feedback".to_string()))?;

    Ok((feedback, is_complete))
}

/// 세션과 그 자식 레코드를 의존 순서대로 삭제합니다.
///
/// 스키마에 ON DELETE CASCADE가 없으므로 연쇄 삭제는 여기서 명시적으로,
/// 피드백 → 질문 → 세션 순서로 한 트랜잭션 안에서 수행합니다.
pub async fn delete_session(pool: &SqlitePool, session_id: &str) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM question_feedback
        WHERE question_id IN (
            SELECT id FROM interview_questions WHERE session_id = ?
        )
        "#,
    )
    .bind(session_id)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM interview_questions WHERE session_id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM interview_sessions WHERE id = ?")
        .bind(session_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(())
}

// ── 분석(Analytics) 집계 쿼리 ──
//
// 대시보드 통계는 행을 전부 가져와 메모리에서 줄이는 대신
// DB의 집계 함수(COUNT/AVG/MAX)로 계산합니다. 이력이 아무리 쌓여도
// 응답 비용이 일정합니다.

/// 완료된 세션의 (개수, 평균 점수, 최고 점수)를 집계합니다.
///
/// 완료된 세션이 하나도 없으면 (0, 0.0, 0.0)을 반환합니다.
pub async fn completed_session_stats(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<(i64, f64, f64), AppError> {
    let stats: (i64, f64, f64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(AVG(final_score), 0.0),
               COALESCE(MAX(final_score), 0.0)
        FROM interview_sessions
        WHERE user_id = ? AND is_completed = 1 AND final_score IS NOT NULL
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

/// 지정한 날짜(UTC, "YYYY-MM-DD") 이후의 일별 평균 점수를 집계합니다.
///
/// 세션이 있었던 날짜만 (날짜, 평균) 쌍으로 반환됩니다.
/// 빈 날짜를 0.0으로 채우는 것은 서비스 계층의 몫입니다.
pub async fn daily_average_scores(
    pool: &SqlitePool,
    user_id: &str,
    since_day: &str,
) -> Result<Vec<(String, f64)>, AppError> {
    let rows = sqlx::query_as::<_, (String, f64)>(
        r#"
        SELECT date(created_at), AVG(final_score)
        FROM interview_sessions
        WHERE user_id = ? AND is_completed = 1 AND final_score IS NOT NULL
              AND date(created_at) >= ?
        GROUP BY date(created_at)
        "#,
    )
    .bind(user_id)
    .bind(since_day)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// 완료된 세션을 최신순으로 최대 limit개 조회합니다.
pub async fn list_completed_sessions(
    pool: &SqlitePool,
    user_id: &str,
    limit: i64,
) -> Result<Vec<InterviewSession>, AppError> {
    let sessions = sqlx::query_as::<_, InterviewSession>(
        r#"
        SELECT id, user_id, role, difficulty, question_count, final_score,
               is_completed, created_at, updated_at
        FROM interview_sessions
        WHERE user_id = ? AND is_completed = 1
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(sessions)
}
