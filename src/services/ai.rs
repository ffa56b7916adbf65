//! # AI 게이트웨이 서비스
//!
//! 외부 AI 공급자(OpenAI 호환 chat completions API)와의 모든 통신을
//! 담당하는 무상태(stateless) 어댑터입니다.
//!
//! 이 모듈의 역할:
//! - `generate_questions()`: 직무/난이도에 맞는 인터뷰 질문 목록 생성
//! - `evaluate_answer()`: 사용자의 답변을 평가해 점수와 피드백 생성
//!
//! ## 응답 검증 원칙
//! 업스트림이 필드 타입을 지켜줄 것이라고 믿지 않습니다. 어시스턴트
//! 메시지 본문을 `serde_json::Value`로 받아 모든 필드를 명시적으로
//! 꺼내고(coerce), 검증에 실패하면 `UpstreamInvalid`를 반환합니다.
//! 점수는 [0, 100]으로 클램프하고, 목록 필드는 최대 5개로 자릅니다.
//! 질문이 요청 개수보다 적으면 에러이고, 많으면 요청 개수로 자릅니다
//! (모자란 걸 합성 질문으로 채우지는 않습니다).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::AiConfig;
use crate::error::AppError;
use crate::models::Difficulty;

/// 요청당 타임아웃. 초과하면 UpstreamUnavailable로 처리됩니다.
const REQUEST_TIMEOUT_SECS: u64 = 30;
/// strengths/improvements 목록의 최대 길이. 초과분은 조용히 버립니다.
const MAX_LIST_ITEMS: usize = 5;

/// AI 공급자 호출 클라이언트.
///
/// 설정(키/URL/모델)은 생성 시점에 명시적으로 주입됩니다.
/// reqwest::Client는 내부적으로 연결 풀을 공유하므로 Clone이 저렴합니다.
#[derive(Clone)]
pub struct AiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

/// 답변 하나에 대한 검증·정규화가 끝난 평가 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// 0~100으로 클램프된 점수
    pub score: i64,
    pub overall_feedback: String,
    /// 최대 5개
    pub strengths: Vec<String>,
    /// 최대 5개
    pub improvements: Vec<String>,
}

// ── chat completions API의 요청/응답 외피(envelope) ──
// 내부 페이로드(questions, score 등)는 Value로 받아 수동 검증하고,
// 외피만 derive 구조체로 파싱합니다.

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

impl AiClient {
    /// 설정을 받아 클라이언트를 생성합니다. 타임아웃은 클라이언트에
    /// 내장되므로 이후의 모든 호출에 일괄 적용됩니다.
    pub fn new(config: AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url,
            api_key: config.api_key,
            model: config.model,
        }
    }

    /// 직무/난이도에 맞는 인터뷰 질문을 정확히 count개 생성합니다.
    pub async fn generate_questions(
        &self,
        role: &str,
        difficulty: Difficulty,
        count: i64,
    ) -> Result<Vec<String>, AppError> {
        let prompt = format!(
            r#"You are an expert technical interviewer for {role} positions.
Generate exactly {count} interview questions for a {difficulty} level candidate.
Focus on practical, real-world scenarios and technical depth appropriate for {difficulty}.

Return ONLY valid JSON with this exact structure:
{{
  "questions": ["question 1 here", "question 2 here", ...]
}}

Do not include any explanation, markdown, or text outside the JSON."#,
        );

        let payload = self.complete(prompt, 512).await?;

        // 문자열이 아닌 항목은 버린다 — 개수 검증이 뒤에서 걸러낸다
        let mut questions: Vec<String> = payload
            .get("questions")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        if (questions.len() as i64) < count {
            return Err(AppError::UpstreamInvalid(format!(
                "expected {} questions, got {}",
                count,
                questions.len()
            )));
        }

        // 요청한 개수보다 많이 돌아와도 넘치는 부분은 잘라낸다
        questions.truncate(count as usize);
        Ok(questions)
    }

    /// 답변 하나를 평가해 점수와 피드백을 반환합니다.
    pub async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        role: &str,
        difficulty: Difficulty,
    ) -> Result<Evaluation, AppError> {
        let prompt = format!(
            r#"You are a senior {role} technical interviewer evaluating a candidate's answer.
Candidate level: {difficulty}

Question: {question}

Candidate's Answer: {answer}

Be constructive, specific, and fair. Score based on technical accuracy, clarity, and completeness.

Return ONLY valid JSON with this exact structure:
{{
  "score": <integer 0-100>,
  "overall_feedback": "<2-3 sentences of constructive feedback>",
  "strengths": ["<specific strength 1>", "<specific strength 2>"],
  "improvements": ["<specific area to improve 1>", "<specific area to improve 2>"]
}}"#,
        );

        let payload = self.complete(prompt, 768).await?;

        // 필수 키를 하나씩 명시적으로 꺼낸다. 없거나 타입이 다르면 UpstreamInvalid.
        let score = payload
            .get("score")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .ok_or_else(|| {
                AppError::UpstreamInvalid("missing or non-numeric \"score\"".to_string())
            })?;

        let overall_feedback = payload
            .get("overall_feedback")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::UpstreamInvalid("missing or non-string \"overall_feedback\"".to_string())
            })?
            .to_string();

        let strengths = string_list(&payload, "strengths")?;
        let improvements = string_list(&payload, "improvements")?;

        Ok(Evaluation {
            // 범위를 벗어난 점수는 거부하지 않고 [0, 100]으로 클립한다
            score: score.clamp(0, 100),
            overall_feedback,
            strengths,
            improvements,
        })
    }

    /// chat completions API를 한 번 호출하고, 어시스턴트 메시지 본문을
    /// JSON 객체로 파싱해 반환합니다.
    ///
    /// 에러 구분:
    /// - 전송 실패/타임아웃/HTTP 오류 상태 → `UpstreamUnavailable`
    /// - 응답은 왔지만 JSON 형태가 아님 → `UpstreamInvalid`
    async fn complete(&self, prompt: String, max_tokens: u32) -> Result<Value, AppError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.7,
            max_tokens,
            // 공급자에게 단일 JSON 객체로만 응답하도록 강제한다
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::UpstreamUnavailable(format!(
                        "request timed out after {}s",
                        REQUEST_TIMEOUT_SECS
                    ))
                } else {
                    AppError::UpstreamUnavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            AppError::UpstreamInvalid(format!("unparseable completion envelope: {}", e))
        })?;

        let content = completion
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or_default();

        serde_json::from_str(content).map_err(|e| {
            AppError::UpstreamInvalid(format!("assistant message is not valid JSON: {}", e))
        })
    }
}

/// 페이로드에서 문자열 배열 필드를 꺼냅니다.
///
/// 키가 없거나 배열이 아니면 에러, 문자열이 아닌 항목은 버리며,
/// 결과는 최대 `MAX_LIST_ITEMS`개로 자릅니다.
fn string_list(payload: &Value, key: &str) -> Result<Vec<String>, AppError> {
    let mut items: Vec<String> = payload
        .get(key)
        .and_then(Value::as_array)
        .ok_or_else(|| AppError::UpstreamInvalid(format!("missing or non-array \"{}\"", key)))?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();

    items.truncate(MAX_LIST_ITEMS);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> AiClient {
        AiClient::new(AiConfig {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
        })
    }

    /// 어시스턴트 메시지 본문이 `inner`의 JSON 직렬화인 completions 응답을 마운트한다.
    async fn mount_completion(server: &MockServer, inner: Value) {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": inner.to_string()}}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn generates_requested_number_of_questions() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({"questions": ["q1", "q2", "q3"]}),
        )
        .await;

        let client = test_client(server.uri());
        let questions = client
            .generate_questions("Backend Engineer", Difficulty::Easy, 3)
            .await
            .unwrap();

        assert_eq!(questions, vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn truncates_extra_questions_to_requested_count() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({"questions": ["q1", "q2", "q3", "q4", "q5"]}),
        )
        .await;

        let client = test_client(server.uri());
        let questions = client
            .generate_questions("Backend Engineer", Difficulty::Hard, 3)
            .await
            .unwrap();

        assert_eq!(questions, vec!["q1", "q2", "q3"]);
    }

    #[tokio::test]
    async fn too_few_questions_is_an_invalid_response() {
        let server = MockServer::start().await;
        mount_completion(&server, json!({"questions": ["only one"]})).await;

        let client = test_client(server.uri());
        let err = client
            .generate_questions("Backend Engineer", Difficulty::Easy, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamInvalid(_)));
    }

    #[tokio::test]
    async fn non_json_message_content_is_an_invalid_response() {
        let server = MockServer::start().await;
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "sorry, no JSON today"}}
            ]
        });
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .generate_questions("Backend Engineer", Difficulty::Easy, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamInvalid(_)));
    }

    #[tokio::test]
    async fn http_error_status_means_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .generate_questions("Backend Engineer", Difficulty::Easy, 3)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn clamps_score_above_range() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({
                "score": 150,
                "overall_feedback": "great",
                "strengths": ["a"],
                "improvements": ["b"]
            }),
        )
        .await;

        let client = test_client(server.uri());
        let eval = client
            .evaluate_answer("q", "a", "Backend Engineer", Difficulty::Easy)
            .await
            .unwrap();

        assert_eq!(eval.score, 100);
    }

    #[tokio::test]
    async fn clamps_score_below_range() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({
                "score": -5,
                "overall_feedback": "hmm",
                "strengths": [],
                "improvements": []
            }),
        )
        .await;

        let client = test_client(server.uri());
        let eval = client
            .evaluate_answer("q", "a", "Backend Engineer", Difficulty::Easy)
            .await
            .unwrap();

        assert_eq!(eval.score, 0);
    }

    #[tokio::test]
    async fn truncates_long_strength_lists() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({
                "score": 80,
                "overall_feedback": "solid",
                "strengths": ["s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8"],
                "improvements": ["i1"]
            }),
        )
        .await;

        let client = test_client(server.uri());
        let eval = client
            .evaluate_answer("q", "a", "Backend Engineer", Difficulty::Intermediate)
            .await
            .unwrap();

        assert_eq!(eval.strengths.len(), 5);
        assert_eq!(eval.strengths, vec!["s1", "s2", "s3", "s4", "s5"]);
    }

    #[tokio::test]
    async fn missing_required_key_is_an_invalid_response() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({
                "overall_feedback": "no score here",
                "strengths": [],
                "improvements": []
            }),
        )
        .await;

        let client = test_client(server.uri());
        let err = client
            .evaluate_answer("q", "a", "Backend Engineer", Difficulty::Easy)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UpstreamInvalid(_)));
    }

    #[tokio::test]
    async fn fractional_score_is_coerced_to_integer() {
        let server = MockServer::start().await;
        mount_completion(
            &server,
            json!({
                "score": 72.6,
                "overall_feedback": "ok",
                "strengths": ["a"],
                "improvements": ["b"]
            }),
        )
        .await;

        let client = test_client(server.uri());
        let eval = client
            .evaluate_answer("q", "a", "Backend Engineer", Difficulty::Easy)
            .await
            .unwrap();

        assert_eq!(eval.score, 72);
    }
}
