//! 可观测性模块
//!
//! 提供计数器指标（Prometheus 文本格式）、结构化日志初始化和健康检查。

use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

// ===== Metrics =====

/// 应用计数器
#[derive(Clone, Default)]
pub struct AppMetrics {
    pub http_requests_total: Arc<AtomicU64>,
    pub http_request_duration_sum: Arc<AtomicU64>,
    pub chat_turns_total: Arc<AtomicU64>,
    pub welcome_turns_total: Arc<AtomicU64>,
    pub tool_calls_total: Arc<AtomicU64>,
    pub tool_errors_total: Arc<AtomicU64>,
    pub llm_errors_total: Arc<AtomicU64>,
    pub response_overrides_total: Arc<AtomicU64>,
    pub errors_total: Arc<AtomicU64>,
}

impl std::fmt::Debug for AppMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppMetrics")
            .field("chat_turns_total", &self.chat_turns_total.load(Ordering::SeqCst))
            .field("tool_calls_total", &self.tool_calls_total.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl AppMetrics {
    /// 记录 HTTP 请求
    pub fn record_http_request(&self, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        self.http_request_duration_sum
            .fetch_add(duration_ms, Ordering::SeqCst);
    }

    /// 记录一次经过模型的对话轮次
    pub fn record_chat_turn(&self) {
        self.chat_turns_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录一次欢迎流程
    pub fn record_welcome_turn(&self) {
        self.welcome_turns_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录工具调用
    pub fn record_tool_call(&self, succeeded: bool) {
        self.tool_calls_total.fetch_add(1, Ordering::SeqCst);
        if !succeeded {
            self.tool_errors_total.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 记录模型服务错误
    pub fn record_llm_error(&self) {
        self.llm_errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录回复被工具数据覆盖
    pub fn record_override(&self) {
        self.response_overrides_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 记录编排错误
    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::SeqCst);
    }

    /// 生成 Prometheus 格式指标
    pub fn gather(&self) -> String {
        format!(
            r#"# HELP http_requests_total Total HTTP requests
# TYPE http_requests_total counter
http_requests_total {}
# HELP http_request_duration_seconds HTTP request duration in seconds
# TYPE http_request_duration_seconds histogram
http_request_duration_seconds_sum {}
http_request_duration_seconds_count {}
# HELP chat_turns_total Chat turns answered by the model
# TYPE chat_turns_total counter
chat_turns_total {}
# HELP welcome_turns_total Welcome responses served without a model call
# TYPE welcome_turns_total counter
welcome_turns_total {}
# HELP tool_calls_total Tool executions
# TYPE tool_calls_total counter
tool_calls_total {}
# HELP tool_errors_total Tool executions that returned an error payload
# TYPE tool_errors_total counter
tool_errors_total {}
# HELP llm_errors_total Failed model service calls
# TYPE llm_errors_total counter
llm_errors_total {}
# HELP response_overrides_total Replies replaced because they contradicted tool data
# TYPE response_overrides_total counter
response_overrides_total {}
# HELP errors_total Orchestration errors
# TYPE errors_total counter
errors_total {}
"#,
            self.http_requests_total.load(Ordering::SeqCst),
            self.http_request_duration_sum.load(Ordering::SeqCst) as f64 / 1000.0,
            self.http_requests_total.load(Ordering::SeqCst),
            self.chat_turns_total.load(Ordering::SeqCst),
            self.welcome_turns_total.load(Ordering::SeqCst),
            self.tool_calls_total.load(Ordering::SeqCst),
            self.tool_errors_total.load(Ordering::SeqCst),
            self.llm_errors_total.load(Ordering::SeqCst),
            self.response_overrides_total.load(Ordering::SeqCst),
            self.errors_total.load(Ordering::SeqCst),
        )
    }
}

// ===== Health Check =====

/// 健康检查响应
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub environment: String,
    pub version: String,
    pub uptime_seconds: f64,
    pub timestamp: String,
}

/// 可观测性路由状态
#[derive(Debug, Clone)]
pub struct ObservabilityState {
    pub metrics: Arc<AppMetrics>,
    pub start_time: DateTime<Utc>,
    pub version: String,
    pub environment: String,
}

impl ObservabilityState {
    pub fn new(metrics: Arc<AppMetrics>, version: String, environment: String) -> Self {
        Self {
            metrics,
            start_time: Utc::now(),
            version,
            environment,
        }
    }

    /// 获取应用正常运行时间
    pub fn uptime_seconds(&self) -> f64 {
        (Utc::now() - self.start_time).num_seconds() as f64
    }
}

/// 健康检查：存储在进程内，只要服务在运行即健康
pub async fn health_check(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        environment: state.environment.clone(),
        version: state.version.clone(),
        uptime_seconds: state.uptime_seconds(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// 简单存活检查
pub async fn liveness() -> impl IntoResponse {
    "OK"
}

/// Prometheus 指标端点
pub async fn metrics(State(state): State<Arc<ObservabilityState>>) -> impl IntoResponse {
    (axum::http::StatusCode::OK, state.metrics.gather())
}

/// 创建可观测性路由
pub fn create_observability_router(state: Arc<ObservabilityState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ===== Structured Logging =====

/// 初始化日志
///
/// `RUST_LOG` 优先于配置中的级别；`structured` 开启时输出 JSON。
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_line_number(true);

    let installed = if config.structured {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}

// ===== Request Metrics Middleware =====

/// 记录请求数与耗时的中间件
pub async fn metrics_middleware(
    State(metrics): State<Arc<AppMetrics>>,
    req: Request,
    next: Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(req).await;
    metrics.record_http_request(start.elapsed().as_millis() as u64);
    response
}
