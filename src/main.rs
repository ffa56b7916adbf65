//! # MockMate 웹 서버 진입점
//!
//! 이 파일은 MockMate 애플리케이션의 **시작점(entry point)**입니다.
//! MockMate는 AI가 질문을 만들고 답변을 평가해주는 모의 인터뷰 연습
//! 백엔드입니다.
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(.env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. SQLite 데이터베이스 연결 풀 생성
//! 4. 데이터베이스 마이그레이션 실행
//! 5. AI 게이트웨이 클라이언트 생성
//! 6. API 라우터 설정
//! 7. HTTP 서버 시작

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use routes::interviews::AppState;
use services::ai::AiClient;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1단계: 환경변수 로딩 ──
    // .env 파일이 없어도 에러 없이 넘어갑니다 (시스템 환경변수만 사용)
    dotenvy::dotenv().ok();

    // ── 2단계: 로깅(tracing) 초기화 ──
    // RUST_LOG 환경변수가 없으면 기본 필터를 사용합니다
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mockmate=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // ── 3단계: 설정 로딩 ──
    let config = Config::from_env()?;
    tracing::info!("Starting MockMate server on {}:{}", config.host, config.port);

    // ── 4단계: SQLite 연결 풀 생성 ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    // ── 5단계: 데이터베이스 마이그레이션 실행 ──
    // ./migrations 폴더의 SQL 파일 중 아직 적용되지 않은 것만 순서대로 실행
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;

    // ── 6단계: AI 게이트웨이 클라이언트 생성 ──
    // API 키/URL/모델은 설정값으로 명시적으로 주입합니다.
    // 요청 타임아웃(30초)은 클라이언트 생성 시점에 내장됩니다.
    let ai = AiClient::new(config.ai.clone());

    // ── 7단계: 애플리케이션 상태(State) 생성 ──
    let state = AppState {
        pool: pool.clone(),
        ai,
        jwt_secret: config.jwt_secret.clone(),
    };

    // ── 8단계: API 라우터 설정 ──

    // 인증 관련 라우트 (회원가입, 로그인, 토큰 갱신, 로그아웃, 내 정보)
    let auth_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me));

    // 인터뷰 라우트
    // 주의: /interviews/analytics, /interviews/history 같은 고정 경로는
    // /interviews/{session_id}보다 우선 매칭됩니다.
    let interview_routes = Router::new()
        .route("/interviews/start", post(routes::start_interview))
        .route("/interviews/analytics", get(routes::get_analytics))
        .route("/interviews/history", get(routes::get_history))
        .route(
            "/interviews/{session_id}",
            get(routes::get_interview).delete(routes::delete_interview),
        )
        .route(
            "/interviews/{session_id}/questions/{question_id}/answer",
            post(routes::submit_answer),
        );

    // 모든 API 라우트를 하나로 합칩니다.
    let api_routes = Router::new()
        .merge(auth_routes)
        .merge(interview_routes)
        // 헬스체크 API (서버 상태 확인용, 인증 불필요)
        .route("/health", get(routes::health_check))
        .with_state(state);

    // ── 9단계: CORS 미들웨어 설정 ──
    // 개발 환경에서는 모두 허용합니다. 프로덕션에서는 특정 도메인만
    // 허용해야 합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // ── 10단계: 서버 시작 ──
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
