//! # 인터뷰 세션 모델 정의
//!
//! 모의 인터뷰 한 번의 시도를 표현하는 데이터 구조체들을 정의합니다.
//!
//! ## 엔티티 소유 관계
//! ```text
//! InterviewSession ─1:N→ InterviewQuestion ─1:1→ QuestionFeedback
//! ```
//! 세션은 시작 시점에 질문 목록이 한 번에 만들어지고(order_index 0..N-1),
//! 이후 질문 목록 자체는 변하지 않습니다. 질문마다 답변은 한 번만 기록할 수
//! 있으며, 답변이 평가되면 피드백이 1:1로 붙습니다.

use serde::{Deserialize, Serialize};

/// 인터뷰 난이도
///
/// DB에는 variant 이름 그대로 TEXT("Easy" 등)로 저장됩니다.
/// 요청 본문에서 이 세 값 외의 문자열이 오면 역직렬화 단계에서 거부되므로,
/// 난이도 검증이 타입 수준에서 보장됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Difficulty {
    Easy,
    Intermediate,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Hard => "Hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 인터뷰 세션 엔티티 — `interview_sessions` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InterviewSession {
    /// 세션 고유 식별자 (UUIDv7)
    pub id: String,
    /// 세션 소유자의 사용자 ID (외래키)
    pub user_id: String,
    /// 인터뷰 대상 직무 (예: "Backend Engineer")
    pub role: String,
    /// 난이도 (Easy | Intermediate | Hard)
    pub difficulty: Difficulty,
    /// 세션 시작 시 생성된 질문 개수 — 이후 절대 변하지 않습니다
    pub question_count: i64,
    /// 최종 점수 — 세션이 완료되는 순간 한 번만 계산됩니다 (피드백 점수의 평균)
    /// None이면 아직 진행 중인 세션
    pub final_score: Option<f64>,
    /// 완료 여부 — 모든 질문에 피드백이 기록되는 순간 true가 됩니다
    pub is_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 인터뷰 질문 엔티티 — `interview_questions` 테이블 한 행에 대응합니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InterviewQuestion {
    /// 질문 고유 식별자 (UUIDv7)
    pub id: String,
    /// 이 질문이 속한 세션의 ID (외래키)
    pub session_id: String,
    /// AI가 생성한 질문 본문 — 생성 이후 불변
    pub question_text: String,
    /// 사용자의 답변 — None이면 아직 미답변
    /// 한 번 기록되면 수정할 수 없습니다 (write-once)
    pub user_answer: Option<String>,
    /// 세션 내 표시 순서 (0부터 연속) — 답변 순서를 제약하지는 않습니다
    pub order_index: i64,
    pub created_at: String,
}

/// 질문의 답변 상태를 명시적인 태그 타입으로 본 것
///
/// `user_answer`가 nullable 문자열이라는 저장 형태 대신,
/// "미답변 | 답변됨(본문)"이라는 두 상태만 존재함을 타입으로 드러냅니다.
/// 엔진은 이 뷰를 match하여 write-once 규칙을 적용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerState<'a> {
    Unanswered,
    Answered(&'a str),
}

impl InterviewQuestion {
    /// 이 질문의 답변 상태를 반환합니다.
    pub fn answer_state(&self) -> AnswerState<'_> {
        match &self.user_answer {
            Some(answer) => AnswerState::Answered(answer),
            None => AnswerState::Unanswered,
        }
    }
}

/// 질문 피드백 엔티티 — `question_feedback` 테이블 한 행에 대응합니다.
///
/// strengths/improvements는 DB에 JSON 문자열로 저장되므로
/// 이 구조체는 FromRow가 아니라 db 계층의 변환 함수로 만들어집니다.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionFeedback {
    pub id: String,
    pub question_id: String,
    /// 0~100 범위로 클램프된 점수
    pub score: i64,
    pub overall_feedback: String,
    /// 잘한 점 목록 (최대 5개)
    pub strengths: Vec<String>,
    /// 개선할 점 목록 (최대 5개)
    pub improvements: Vec<String>,
    pub created_at: String,
}

// ── 요청(Request) 구조체 ──

/// 세션 시작 요청 — `POST /api/v1/interviews/start`의 요청 본문에 해당합니다.
#[derive(Debug, Deserialize)]
pub struct StartInterviewRequest {
    /// 인터뷰 대상 직무 (2~100자)
    pub role: String,
    /// 난이도 — enum이므로 잘못된 값은 파싱 단계에서 거부됩니다
    pub difficulty: Difficulty,
    /// 생성할 질문 개수 (3~10)
    pub question_count: i64,
}

/// 답변 제출 요청 —
/// `POST /api/v1/interviews/{session_id}/questions/{question_id}/answer`
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    /// 답변 본문 (1~5000자)
    pub answer: String,
}

// ── 응답(Response) 구조체 ──

/// API 응답에 포함되는 질문 한 개
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResponse {
    pub id: String,
    pub question_text: String,
    pub order_index: i64,
    pub user_answer: Option<String>,
}

impl From<InterviewQuestion> for QuestionResponse {
    fn from(q: InterviewQuestion) -> Self {
        Self {
            id: q.id,
            question_text: q.question_text,
            order_index: q.order_index,
            user_answer: q.user_answer,
        }
    }
}

/// API 응답에 포함되는 피드백 한 개
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackResponse {
    pub id: String,
    pub score: i64,
    pub overall_feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
}

impl From<QuestionFeedback> for FeedbackResponse {
    fn from(f: QuestionFeedback) -> Self {
        Self {
            id: f.id,
            score: f.score,
            overall_feedback: f.overall_feedback,
            strengths: f.strengths,
            improvements: f.improvements,
        }
    }
}

/// 세션 전체(질문 목록 포함) 응답
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: String,
    pub role: String,
    pub difficulty: Difficulty,
    pub question_count: i64,
    pub final_score: Option<f64>,
    pub is_completed: bool,
    pub created_at: String,
    /// order_index 오름차순으로 정렬된 질문 목록
    pub questions: Vec<QuestionResponse>,
}

impl SessionResponse {
    pub fn from_parts(session: InterviewSession, questions: Vec<InterviewQuestion>) -> Self {
        Self {
            id: session.id,
            role: session.role,
            difficulty: session.difficulty,
            question_count: session.question_count,
            final_score: session.final_score,
            is_completed: session.is_completed,
            created_at: session.created_at,
            questions: questions.into_iter().map(QuestionResponse::from).collect(),
        }
    }
}

/// 답변 제출 결과 응답
#[derive(Debug, Serialize)]
pub struct SubmitAnswerResponse {
    pub question_id: String,
    pub feedback: FeedbackResponse,
    /// 이 제출로 마지막 질문까지 채워졌는지
    pub is_last_question: bool,
    /// 세션이 완료 상태로 전환되었는지 (is_last_question과 항상 같은 값)
    pub session_complete: bool,
}

/// 대시보드 분석 응답
#[derive(Debug, Serialize, PartialEq)]
pub struct AnalyticsResponse {
    /// 완료된 세션 수
    pub total_sessions: i64,
    /// 완료된 세션의 평균 점수 (소수 1자리 반올림)
    pub average_score: f64,
    /// 완료된 세션의 최고 점수 (소수 1자리 반올림)
    pub best_score: f64,
    /// 오늘로 끝나는 7일(UTC 달력 기준)의 일별 평균 점수, 오래된 날부터.
    /// 해당 날짜에 세션이 없으면 0.0
    pub weekly_scores: Vec<f64>,
}

/// 세션 이력 목록의 항목 한 개
#[derive(Debug, Serialize)]
pub struct SessionHistoryItem {
    pub id: String,
    pub role: String,
    pub difficulty: Difficulty,
    pub question_count: i64,
    /// final_score가 비어 있으면 0.0
    pub score: f64,
    pub completed_at: String,
}
