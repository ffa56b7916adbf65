//! # 인터뷰 세션 라이프사이클 엔진
//!
//! 세션의 상태 전이를 총괄하는 서비스입니다:
//! ```text
//! 생성(Created) → 진행(InProgress) → 완료(Completed)
//! ```
//! 취소나 실패 상태는 없습니다. 질문 생성이 실패하면 세션 생성 자체가
//! 통째로 실패하고, 아무것도 저장되지 않습니다.
//!
//! ## AI 호출과 트랜잭션의 분리
//! AI 게이트웨이 호출은 최대 30초까지 블록될 수 있으므로, 호출하는 동안
//! DB 트랜잭션을 절대 열어두지 않습니다:
//! - 세션 시작: 질문 생성이 **끝난 뒤에야** 세션+질문 삽입 트랜잭션을 엽니다.
//! - 답변 제출: 답변 기록(단일 UPDATE) → AI 평가 → 피드백+완료 판정
//!   트랜잭션, 순서로 분리되어 있습니다.
//!
//! ## 평가 실패 후 재시도
//! 답변은 기록됐는데 평가가 실패하면, 질문은 "답변은 있고 피드백은 없는"
//! 상태로 남습니다. 같은 엔드포인트로 다시 제출하면 저장된 답변으로
//! 평가만 다시 시도합니다 (답변 자체는 불변).

use sqlx::SqlitePool;

use crate::db;
use crate::error::AppError;
use crate::models::{
    AnswerState, FeedbackResponse, SessionResponse, StartInterviewRequest, SubmitAnswerRequest,
    SubmitAnswerResponse,
};
use crate::services::ai::AiClient;

/// 새 인터뷰 세션을 시작합니다.
///
/// 1. AI 게이트웨이로 질문 생성 (여기서 실패하면 DB는 건드리지도 않음)
/// 2. 세션 + 질문 전체를 한 트랜잭션으로 저장
/// 3. 질문이 포함된 전체 세션을 반환
pub async fn start_session(
    pool: &SqlitePool,
    ai: &AiClient,
    user_id: &str,
    req: &StartInterviewRequest,
) -> Result<SessionResponse, AppError> {
    let question_texts = ai
        .generate_questions(&req.role, req.difficulty, req.question_count)
        .await?;

    let (session, questions) = db::create_session_with_questions(
        pool,
        user_id,
        &req.role,
        req.difficulty,
        &question_texts,
    )
    .await?;

    tracing::info!(
        session_id = %session.id,
        question_count = questions.len(),
        "interview session started"
    );

    Ok(SessionResponse::from_parts(session, questions))
}

/// 질문 하나에 대한 답변을 제출하고 AI 평가를 받습니다.
///
/// 1. 세션 소유권 확인 (남의 세션이든 없는 세션이든 똑같이 NotFound)
/// 2. 세션 범위 안에서 질문 조회
/// 3. 답변 상태 분기:
///    - 이미 답변 + 피드백 있음 → AlreadyAnswered
///    - 이미 답변 + 피드백 없음 → 저장된 답변으로 평가 재시도
///    - 미답변 → 조건부 UPDATE로 답변 기록 (경쟁에서 지면 AlreadyAnswered)
/// 4. AI 평가 (트랜잭션 없이)
/// 5. 피드백 기록 + 완료 판정 (한 트랜잭션)
pub async fn submit_answer(
    pool: &SqlitePool,
    ai: &AiClient,
    user_id: &str,
    session_id: &str,
    question_id: &str,
    req: &SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, AppError> {
    let session = db::get_session_for_user(pool, session_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let question = db::get_question_in_session(pool, question_id, session_id)
        .await?
        .ok_or(AppError::NotFound)?;

    // 평가에 사용할 답변 본문을 결정한다.
    // 한 번 기록된 답변은 불변이므로, 재시도 경로에서는 요청 본문이 아니라
    // 저장된 답변을 사용한다.
    let answer_text = match question.answer_state() {
        AnswerState::Answered(stored) => {
            if db::get_feedback_for_question(pool, question_id).await?.is_some() {
                return Err(AppError::AlreadyAnswered);
            }
            // 이전 제출에서 평가만 실패한 질문: 평가를 다시 시도한다
            tracing::info!(question_id = %question_id, "retrying evaluation for stranded answer");
            stored.to_string()
        }
        AnswerState::Unanswered => {
            let written = db::set_answer_if_unanswered(pool, question_id, &req.answer).await?;
            if !written {
                // 조회 시점 이후 다른 요청이 먼저 답변을 기록했다
                return Err(AppError::AlreadyAnswered);
            }
            req.answer.clone()
        }
    };

    let evaluation = ai
        .evaluate_answer(
            &question.question_text,
            &answer_text,
            &session.role,
            session.difficulty,
        )
        .await?;

    let (feedback, session_complete) = db::record_feedback(
        pool,
        session_id,
        question_id,
        evaluation.score,
        &evaluation.overall_feedback,
        &evaluation.strengths,
        &evaluation.improvements,
    )
    .await?;

    if session_complete {
        tracing::info!(session_id = %session_id, "interview session completed");
    }

    Ok(SubmitAnswerResponse {
        question_id: question_id.to_string(),
        feedback: FeedbackResponse::from(feedback),
        is_last_question: session_complete,
        session_complete,
    })
}

/// 세션 하나를 질문 목록과 함께 조회합니다 (소유권 확인 포함).
pub async fn get_session(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
) -> Result<SessionResponse, AppError> {
    let session = db::get_session_for_user(pool, session_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let questions = db::list_questions_for_session(pool, session_id).await?;

    Ok(SessionResponse::from_parts(session, questions))
}

/// 세션을 자식 레코드(질문, 피드백)까지 함께 삭제합니다 (소유권 확인 포함).
pub async fn delete_session(
    pool: &SqlitePool,
    user_id: &str,
    session_id: &str,
) -> Result<(), AppError> {
    db::get_session_for_user(pool, session_id, user_id)
        .await?
        .ok_or(AppError::NotFound)?;

    db::delete_session(pool, session_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AiConfig;
    use crate::models::Difficulty;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // 커넥션이 늘어나면 각자 별도의 :memory: DB를 보게 되므로 1개로 고정한다
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    async fn test_user(pool: &SqlitePool) -> String {
        let user = crate::db::users::create_user(pool, "user-1", "a@example.com", "Ada", "hash")
            .await
            .unwrap();
        user.id
    }

    fn test_ai(base_url: String) -> AiClient {
        AiClient::new(AiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
        })
    }

    fn completion_body(inner: serde_json::Value) -> serde_json::Value {
        json!({
            "choices": [
                {"message": {"role": "assistant", "content": inner.to_string()}}
            ]
        })
    }

    /// 질문 생성 프롬프트에만 매칭되는 목(mock)을 마운트한다.
    async fn mount_generation(server: &MockServer, questions: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("interview questions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion_body(json!({ "questions": questions }))),
            )
            .mount(server)
            .await;
    }

    /// 특정 답변 본문이 포함된 평가 프롬프트에 매칭되는 목을 마운트한다.
    async fn mount_evaluation(server: &MockServer, answer_marker: &str, score: i64) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("evaluating a candidate's answer"))
            .and(body_string_contains(answer_marker))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(json!({
                "score": score,
                "overall_feedback": "constructive feedback",
                "strengths": ["clear"],
                "improvements": ["more depth"]
            }))))
            .mount(server)
            .await;
    }

    fn start_request(question_count: i64) -> StartInterviewRequest {
        StartInterviewRequest {
            role: "Backend Engineer".to_string(),
            difficulty: Difficulty::Easy,
            question_count,
        }
    }

    #[tokio::test]
    async fn start_session_creates_contiguous_ordered_questions() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();

        assert_eq!(session.question_count, 3);
        assert!(!session.is_completed);
        assert_eq!(session.final_score, None);
        assert_eq!(session.questions.len(), 3);
        for (idx, q) in session.questions.iter().enumerate() {
            assert_eq!(q.order_index, idx as i64);
            assert_eq!(q.user_answer, None);
        }
        assert_eq!(session.questions[0].question_text, "q one");
    }

    #[tokio::test]
    async fn start_session_is_all_or_nothing_when_generation_fails() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;
        let ai = test_ai(server.uri());

        let err = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));

        let (sessions,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM interview_sessions WHERE user_id = ?")
                .bind(&user_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        let (questions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interview_questions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 0);
        assert_eq!(questions, 0);
    }

    #[tokio::test]
    async fn session_completes_when_the_last_question_is_answered_in_any_order() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        mount_evaluation(&server, "answer alpha", 80).await;
        mount_evaluation(&server, "answer beta", 90).await;
        mount_evaluation(&server, "answer gamma", 100).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();
        let q = &session.questions;

        // 표시 순서와 무관하게, 가운데 질문부터 답해도 된다
        let first = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &q[1].id,
            &SubmitAnswerRequest { answer: "answer alpha".to_string() },
        )
        .await
        .unwrap();
        assert!(!first.session_complete);
        assert!(!first.is_last_question);
        assert_eq!(first.feedback.score, 80);

        let second = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &q[0].id,
            &SubmitAnswerRequest { answer: "answer beta".to_string() },
        )
        .await
        .unwrap();
        assert!(!second.session_complete);

        let third = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &q[2].id,
            &SubmitAnswerRequest { answer: "answer gamma".to_string() },
        )
        .await
        .unwrap();
        assert!(third.session_complete);
        assert!(third.is_last_question);

        let completed = get_session(&pool, &user_id, &session.id).await.unwrap();
        assert!(completed.is_completed);
        assert_eq!(completed.final_score, Some(90.0)); // (80 + 90 + 100) / 3
    }

    #[tokio::test]
    async fn resubmitting_an_answered_question_is_rejected() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        mount_evaluation(&server, "answer alpha", 75).await;
        mount_evaluation(&server, "answer beta", 99).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();
        let question_id = session.questions[0].id.clone();

        submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &question_id,
            &SubmitAnswerRequest { answer: "answer alpha".to_string() },
        )
        .await
        .unwrap();

        let err = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &question_id,
            &SubmitAnswerRequest { answer: "answer beta".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::AlreadyAnswered));

        // 저장된 답변과 피드백은 첫 제출 그대로다
        let stored = crate::db::get_question_in_session(&pool, &question_id, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_answer.as_deref(), Some("answer alpha"));
        let feedback = crate::db::get_feedback_for_question(&pool, &question_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(feedback.score, 75);
    }

    #[tokio::test]
    async fn stranded_answer_keeps_the_answer_and_allows_evaluation_retry() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        // 첫 평가 호출만 실패하고, 그 다음부터는 성공한다
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("evaluating a candidate's answer"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_evaluation(&server, "answer alpha", 88).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();
        let question_id = session.questions[0].id.clone();

        let err = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &question_id,
            &SubmitAnswerRequest { answer: "answer alpha".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::UpstreamUnavailable(_)));

        // 평가는 실패했지만 답변은 남아 있다
        let stored = crate::db::get_question_in_session(&pool, &question_id, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_answer.as_deref(), Some("answer alpha"));
        assert!(crate::db::get_feedback_for_question(&pool, &question_id)
            .await
            .unwrap()
            .is_none());

        // 재제출하면 저장된 답변으로 평가만 다시 수행된다
        let retried = submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &question_id,
            &SubmitAnswerRequest { answer: "ignored replacement".to_string() },
        )
        .await
        .unwrap();
        assert_eq!(retried.feedback.score, 88);

        let stored = crate::db::get_question_in_session(&pool, &question_id, &session.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.user_answer.as_deref(), Some("answer alpha"));
    }

    #[tokio::test]
    async fn other_users_sessions_look_nonexistent() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let other = crate::db::users::create_user(&pool, "user-2", "b@example.com", "Bob", "hash")
            .await
            .unwrap();
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();

        let err = submit_answer(
            &pool,
            &ai,
            &other.id,
            &session.id,
            &session.questions[0].id,
            &SubmitAnswerRequest { answer: "not mine".to_string() },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let err = get_session(&pool, &other.id, &session.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn deleting_a_session_removes_questions_and_feedback() {
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(&server, json!(["q one", "q two", "q three"])).await;
        mount_evaluation(&server, "answer alpha", 70).await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(3))
            .await
            .unwrap();
        submit_answer(
            &pool,
            &ai,
            &user_id,
            &session.id,
            &session.questions[0].id,
            &SubmitAnswerRequest { answer: "answer alpha".to_string() },
        )
        .await
        .unwrap();

        delete_session(&pool, &user_id, &session.id).await.unwrap();

        let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interview_sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (questions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM interview_questions")
            .fetch_one(&pool)
            .await
            .unwrap();
        let (feedback,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM question_feedback")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!((sessions, questions, feedback), (0, 0, 0));
    }

    #[tokio::test]
    async fn question_count_bounds_come_from_the_generated_list() {
        // 게이트웨이가 개수 검증을 담당하므로, 엔진은 돌려받은 목록 길이를
        // 그대로 question_count로 기록한다
        let pool = test_pool().await;
        let user_id = test_user(&pool).await;
        let server = MockServer::start().await;
        mount_generation(
            &server,
            json!(["q1", "q2", "q3", "q4", "q5", "q6", "q7", "q8", "q9", "q10"]),
        )
        .await;
        let ai = test_ai(server.uri());

        let session = start_session(&pool, &ai, &user_id, &start_request(10))
            .await
            .unwrap();
        assert_eq!(session.question_count, 10);
        assert_eq!(session.questions.len(), 10);
        assert_eq!(session.questions[9].order_index, 9);
    }
}
