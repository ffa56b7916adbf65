//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: SQLite 데이터베이스 경로
//! - `JWT_SECRET`: JWT 토큰 서명에 사용할 비밀키
//! - `GROQ_API_KEY`: AI 공급자 API 키
//! - `GROQ_BASE_URL`: AI 공급자 기본 URL (OpenAI 호환)
//! - `GROQ_MODEL`: 질문 생성/평가에 사용할 모델 이름
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호

use std::env;

/// 애플리케이션 전체 설정을 담는 구조체
///
/// 서버 시작 시 환경변수에서 한 번 읽어온 후,
/// 애플리케이션 전체에서 공유됩니다.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite 데이터베이스 파일 경로 (예: "sqlite:data/mockmate.db")
    pub database_url: String,
    /// JWT 토큰 서명/검증에 사용하는 비밀키
    pub jwt_secret: String,
    /// AI 게이트웨이 설정 (키, URL, 모델)
    pub ai: AiConfig,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
}

/// AI 공급자 연결 설정
///
/// 전역(global) 조회 대신 명시적인 값으로 게이트웨이 생성자에 전달합니다.
/// 테스트에서는 base_url을 모킹 서버 주소로 바꿔치기할 수 있습니다.
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// AI 공급자 API 키 (Bearer 토큰으로 전송)
    pub api_key: String,
    /// OpenAI 호환 API의 기본 URL
    pub base_url: String,
    /// 사용할 모델 이름
    pub model: String,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`, `JWT_SECRET`, `GROQ_API_KEY`는 필수이며,
    /// 없으면 에러가 발생합니다. 나머지 설정은 기본값이 있습니다.
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            database_url: env::var("DATABASE_URL")?, // 필수: 없으면 에러
            jwt_secret: env::var("JWT_SECRET")?,     // 필수: 없으면 에러
            ai: AiConfig {
                api_key: env::var("GROQ_API_KEY")?,  // 필수: 없으면 에러
                base_url: env::var("GROQ_BASE_URL")
                    .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string()),
                model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| "llama3-70b-8192".to_string()),
            },
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000), // 파싱 실패 시 기본값
        })
    }
}
