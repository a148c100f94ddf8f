//! HTTP API and page routes for the studio

use crate::logview::{render_log_html, WAITING_FOR_LOGS};
use crate::pipeline::{ContractPipeline, LogSink, ModelChoice, PipelineRequest};
use crate::render::{
    render_contract, render_error, render_main_page, render_onboarding_page, render_shape_error,
    render_user_message, render_warning, EMPTY_PROMPT_WARNING,
};
use crate::session::{session_cookie, session_id_from_headers, Session, SessionState, SessionStore};
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Redirect, Response,
    },
    routing::{get, post},
    Json, Router,
};
use dashmap::DashMap;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::interval;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Runs whose event stream is never opened are dropped after this long
const UNCLAIMED_RUN_TTL: Duration = Duration::from_secs(600);

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

/// API state
pub struct ApiState {
    pub sessions: Arc<SessionStore>,
    pub pipeline: Arc<dyn ContractPipeline>,
    pub log_height_px: u32,
    runs: DashMap<String, PendingRun>,
}

/// A started run waiting for the browser to open its event stream
struct PendingRun {
    events: UnboundedReceiver<Event>,
    created: Instant,
}

impl ApiState {
    pub fn new(
        sessions: Arc<SessionStore>,
        pipeline: Arc<dyn ContractPipeline>,
        log_height_px: u32,
    ) -> Self {
        Self {
            sessions,
            pipeline,
            log_height_px,
            runs: DashMap::new(),
        }
    }

    /// Drop runs whose event stream was not opened within `max_age`
    fn drop_unclaimed_runs(&self, max_age: Duration) -> usize {
        let before = self.runs.len();
        self.runs.retain(|_, run| run.created.elapsed() < max_age);
        let dropped = before.saturating_sub(self.runs.len());
        if dropped > 0 {
            info!(dropped, remaining = self.runs.len(), "Dropped unclaimed runs");
        }
        dropped
    }

    /// Start a background task expiring idle sessions and unclaimed runs
    pub fn start_sweep_task(self: Arc<Self>, interval_secs: u64) {
        tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));
            loop {
                ticker.tick().await;
                self.sessions.sweep_expired();
                self.drop_unclaimed_runs(UNCLAIMED_RUN_TTL);
            }
        });
    }
}

/// Request to fill the prompt with an example
#[derive(Debug, Deserialize)]
pub struct ExampleRequest {
    pub index: usize,
}

#[derive(Debug, Serialize)]
pub struct ExampleResponse {
    pub index: usize,
    pub prompt: String,
}

/// Request to start a generation run
#[derive(Debug, Deserialize)]
pub struct RunRequest {
    /// Contract description as typed by the user
    pub prompt: String,
    /// Model identifier; the default model when omitted
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunStarted {
    pub run_id: String,
}

/// Non-fatal input problem, with the banner to show for it
#[derive(Debug, Serialize)]
pub struct WarningResponse {
    pub warning: String,
    pub html: String,
}

impl WarningResponse {
    fn new(status: StatusCode, warning: impl Into<String>) -> (StatusCode, Json<Self>) {
        let warning = warning.into();
        let html = render_warning(&warning);
        (status, Json(Self { warning, html }))
    }
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pipeline: String,
    pub sessions: usize,
}

/// Create the API router
pub fn create_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/onboarding/dismiss", post(dismiss_onboarding))
        .route("/prompts/example", post(select_example))
        .route("/runs", post(start_run))
        .route("/runs/:id/events", get(run_events))
        .route("/session", get(session_snapshot))
        .route("/session/reset", post(reset_session))
        .route("/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Set the session cookie on responses that created a session
fn with_session_cookie(response: impl IntoResponse, session: &Session, created: bool) -> Response {
    let mut response = response.into_response();
    if created {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(session.id())) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// Onboarding screen until dismissed, then the generator page
async fn index(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    let (session, created) = state.sessions.resolve(&headers);
    let snapshot = session.snapshot();

    let page = if snapshot.show_instructions {
        render_onboarding_page()
    } else {
        render_main_page(&snapshot, state.log_height_px)
    };
    with_session_cookie(Html(page), &session, created)
}

/// "Got it!" on the onboarding screen
async fn dismiss_onboarding(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    let (session, created) = state.sessions.resolve(&headers);
    session.with_state(SessionState::dismiss_instructions);
    debug!(session = session.id(), "Onboarding dismissed");
    with_session_cookie(Redirect::to("/"), &session, created)
}

/// Example prompt button: overwrite the prompt text
async fn select_example(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<ExampleRequest>,
) -> Response {
    let (session, created) = state.sessions.resolve(&headers);

    let response = match session.with_state(|s| s.apply_example(request.index)) {
        Some(prompt) => Json(ExampleResponse {
            index: request.index,
            prompt: prompt.to_string(),
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("No example prompt at index {}", request.index),
        )
            .into_response(),
    };
    with_session_cookie(response, &session, created)
}

/// "Generate Contract": validate the prompt and start a pipeline run
async fn start_run(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
    Json(request): Json<RunRequest>,
) -> Response {
    let (session, created) = state.sessions.resolve(&headers);

    if request.prompt.trim().is_empty() {
        return with_session_cookie(
            WarningResponse::new(StatusCode::UNPROCESSABLE_ENTITY, EMPTY_PROMPT_WARNING),
            &session,
            created,
        );
    }

    let model = match request.model.as_deref() {
        None => ModelChoice::default(),
        Some(id) => match ModelChoice::from_id(id) {
            Some(model) => model,
            None => {
                return with_session_cookie(
                    WarningResponse::new(StatusCode::BAD_REQUEST, format!("Unknown model: {}", id)),
                    &session,
                    created,
                );
            }
        },
    };

    state.drop_unclaimed_runs(UNCLAIMED_RUN_TTL);

    let run_id = Uuid::new_v4().to_string();
    let (tx, rx) = unbounded_channel();
    state.runs.insert(
        run_id.clone(),
        PendingRun {
            events: rx,
            created: Instant::now(),
        },
    );

    session.with_state(|s| s.begin_run(&request.prompt));
    info!(
        session = session.id(),
        run_id = %run_id,
        model = %model,
        pipeline = state.pipeline.name(),
        "Starting contract generation"
    );

    tokio::spawn(drive_run(
        Arc::clone(&state.pipeline),
        Arc::clone(&session),
        PipelineRequest::new(request.prompt, model),
        tx,
        state.log_height_px,
    ));

    with_session_cookie(Json(RunStarted { run_id }), &session, created)
}

/// Build an SSE event carrying an HTML fragment
fn fragment(name: &str, html: &str) -> Event {
    Event::default().event(name).data(html.replace('\r', ""))
}

/// Run the pipeline for one request, forwarding everything it produces as events.
///
/// Events go out in order: `user`, `log` (any number), then `result` or
/// `failure`, then `done`. Send failures mean the browser went away; the run
/// still completes so the session history stays consistent.
async fn drive_run(
    pipeline: Arc<dyn ContractPipeline>,
    session: Arc<Session>,
    request: PipelineRequest,
    events: UnboundedSender<Event>,
    log_height_px: u32,
) {
    let send = |name: &str, html: &str| {
        let _ = events.send(fragment(name, html));
    };

    send("user", &render_user_message(&request.prompt));
    send("log", &render_log_html(WAITING_FOR_LOGS, log_height_px));

    let on_log: LogSink = {
        let session = Arc::clone(&session);
        let events = events.clone();
        Arc::new(move |text: &str| {
            let html = session.with_state(|s| render_log_html(s.record_log(text), log_height_px));
            let _ = events.send(fragment("log", &html));
        })
    };

    match pipeline.run(&request, on_log).await {
        Ok(run) => {
            let log_html = session.with_state(|s| {
                render_log_html(s.finish_log(run.final_log.as_deref()), log_height_px)
            });
            send("log", &log_html);

            match run.result.into_contract() {
                Ok(contract) => {
                    let html = render_contract(&contract);
                    info!(
                        session = session.id(),
                        compilable = contract.is_compilable,
                        deployable = contract.is_deployable,
                        clauses = contract.clauses.len(),
                        "Contract generated"
                    );
                    session.with_state(|s| s.record_exchange(request.prompt.as_str(), contract));
                    send("result", &html);
                }
                Err(err) => {
                    warn!(session = session.id(), result_type = %err.type_name, "Pipeline returned no contract");
                    send("failure", &render_shape_error(&err));
                }
            }
        }
        Err(e) => {
            warn!(session = session.id(), error = %e, "Pipeline run failed");
            send("failure", &render_error(&format!("❌ {}", e)));
        }
    }

    send("done", "");
}

/// Event stream of a started run; each run can be streamed once
async fn run_events(
    State(state): State<Arc<ApiState>>,
    Path(run_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, (StatusCode, String)> {
    let (_, run) = state
        .runs
        .remove(&run_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Unknown run: {}", run_id)))?;

    let stream = UnboundedReceiverStream::new(run.events).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)))
}

/// JSON snapshot of the session
async fn session_snapshot(State(state): State<Arc<ApiState>>, headers: HeaderMap) -> Response {
    let (session, created) = state.sessions.resolve(&headers);
    with_session_cookie(Json(session.snapshot()), &session, created)
}

/// Discard the session named by the cookie
async fn reset_session(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Json<ResetResponse> {
    let reset = session_id_from_headers(&headers)
        .map(|id| state.sessions.remove(&id))
        .unwrap_or(false);
    if reset {
        info!("Session reset");
    }
    Json(ResetResponse { reset })
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pipeline: state.pipeline.name().to_string(),
        sessions: state.sessions.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{PipelineError, PipelineRun, RawClause, RawResult, ResultFields};
    use crate::session::SESSION_COOKIE;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Pipeline that logs twice and returns a fixed outcome
    struct StubPipeline {
        calls: AtomicUsize,
        outcome: Result<RawResult, String>,
    }

    impl StubPipeline {
        fn returning(outcome: Result<RawResult, String>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ContractPipeline for StubPipeline {
        fn name(&self) -> &str {
            "stub"
        }

        async fn run(
            &self,
            _request: &PipelineRequest,
            on_log: LogSink,
        ) -> Result<PipelineRun, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            on_log("\x1b[32mgenerating\x1b[0m\n");
            on_log("\x1b[32mgenerating\x1b[0m\n<compiling>\r\n");
            match &self.outcome {
                Ok(result) => Ok(PipelineRun {
                    result: result.clone(),
                    final_log: None,
                }),
                Err(message) => Err(PipelineError::Raised(message.clone())),
            }
        }
    }

    fn contract_result() -> RawResult {
        RawResult::Object {
            type_name: "SmartContract".to_string(),
            fields: ResultFields {
                contract_code: Some("contract Token {}".to_string()),
                clauses: vec![RawClause::Object {
                    title: Some("Supply".to_string()),
                    description: Some("Fixed".to_string()),
                }],
                is_compilable: Some(true),
                is_deployable: Some(true),
                compiler_errors: None,
                deploy_errors: None,
            },
        }
    }

    fn test_app(pipeline: Arc<StubPipeline>) -> (Router, Arc<ApiState>) {
        let sessions = Arc::new(SessionStore::new(Duration::from_secs(60)));
        let state = Arc::new(ApiState::new(sessions, pipeline, 300));
        (create_router(Arc::clone(&state)), state)
    }

    fn request(method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Open a session and return its `Cookie` header value
    async fn new_session(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/", None, None))
            .await
            .unwrap();
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Start a run and collect its whole event stream
    async fn generate(app: &Router, cookie: &str, prompt: &str) -> String {
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/runs",
                Some(cookie),
                Some(json!({ "prompt": prompt, "model": "fsm_pretrained" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let run_id = started["run_id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(request(Method::GET, &format!("/runs/{run_id}/events"), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }

    /// Names of the SSE events in a collected stream, in order
    fn event_names(stream: &str) -> Vec<String> {
        stream
            .lines()
            .filter_map(|line| line.strip_prefix("event:"))
            .map(|name| name.trim().to_string())
            .collect()
    }

    async fn session_json(app: &Router, cookie: &str) -> Value {
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/session", Some(cookie), None))
            .await
            .unwrap();
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_first_visit_shows_onboarding_and_sets_cookie() {
        let (app, state) = test_app(StubPipeline::returning(Ok(contract_result())));
        let response = app
            .oneshot(request(Method::GET, "/", None, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with(SESSION_COOKIE));
        assert!(body_text(response).await.contains("Got it!"));
        assert_eq!(state.sessions.len(), 1);
    }

    #[tokio::test]
    async fn test_dismiss_onboarding_shows_generator() {
        let (app, _) = test_app(StubPipeline::returning(Ok(contract_result())));
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/onboarding/dismiss", Some(&cookie), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let response = app
            .oneshot(request(Method::GET, "/", Some(&cookie), None))
            .await
            .unwrap();
        let page = body_text(response).await;
        assert!(page.contains("Generate Contract"));
        assert!(!page.contains("Got it!"));
    }

    #[tokio::test]
    async fn test_empty_prompt_warns_without_calling_pipeline() {
        let pipeline = StubPipeline::returning(Ok(contract_result()));
        let (app, _) = test_app(Arc::clone(&pipeline));
        let cookie = new_session(&app).await;

        for prompt in ["", "   \n\t "] {
            let response = app
                .clone()
                .oneshot(request(
                    Method::POST,
                    "/runs",
                    Some(&cookie),
                    Some(json!({ "prompt": prompt })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
            assert_eq!(body["warning"], "Please enter a contract description.");
            assert!(body["html"].as_str().unwrap().contains("banner-warning"));
        }
        assert_eq!(pipeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_unknown_model_is_rejected() {
        let pipeline = StubPipeline::returning(Ok(contract_result()));
        let (app, _) = test_app(Arc::clone(&pipeline));
        let response = app
            .oneshot(request(
                Method::POST,
                "/runs",
                None,
                Some(json!({ "prompt": "a token", "model": "gpt4" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["warning"], "Unknown model: gpt4");
        assert!(body["html"].as_str().unwrap().contains("Unknown model: gpt4"));
        assert_eq!(pipeline.calls(), 0);
    }

    #[tokio::test]
    async fn test_successful_run_streams_contract_and_records_history() {
        let pipeline = StubPipeline::returning(Ok(contract_result()));
        let (app, _) = test_app(Arc::clone(&pipeline));
        let cookie = new_session(&app).await;

        let events = generate(&app, &cookie, "a fixed-supply token").await;
        assert_eq!(pipeline.calls(), 1);

        assert_eq!(
            event_names(&events),
            vec!["user", "log", "log", "log", "log", "result", "done"]
        );
        assert!(events.find("Waiting for logs...").unwrap() < events.find("generating").unwrap());

        assert!(events.contains("a fixed-supply token"));
        assert!(events.contains("generating<br/>&lt;compiling&gt;<br/>"));
        assert!(!events.contains('\x1b'));
        assert!(events.contains("Contract is compilable"));
        assert!(events.contains("<strong>Supply</strong> — Fixed"));

        let session = session_json(&app, &cookie).await;
        assert_eq!(session["chat_history"].as_array().unwrap().len(), 1);
        assert_eq!(session["chat_history"][0]["prompt"], "a fixed-supply token");
        assert_eq!(session["crew_log"], "generating\n<compiling>\r\n");
        assert_eq!(session["chat_input"], "a fixed-supply token");
    }

    #[tokio::test]
    async fn test_mapping_result_reports_type_and_keys() {
        let pipeline = StubPipeline::returning(Ok(RawResult::Mapping {
            type_name: "dict".to_string(),
            keys: vec!["code".to_string(), "status".to_string()],
        }));
        let (app, _) = test_app(pipeline);
        let cookie = new_session(&app).await;

        let events = generate(&app, &cookie, "a token").await;
        assert_eq!(event_names(&events).last().map(String::as_str), Some("done"));
        assert!(event_names(&events).contains(&"failure".to_string()));
        assert!(events.contains("No valid contract returned. Result type: dict"));
        assert!(events.contains("Available keys: [&#x27;code&#x27;, &#x27;status&#x27;]"));
        assert!(!event_names(&events).contains(&"result".to_string()));
        assert!(!events.contains("Clauses"));

        let session = session_json(&app, &cookie).await;
        assert!(session["chat_history"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_error_is_reported() {
        let pipeline = StubPipeline::returning(Err("solc crashed".to_string()));
        let (app, _) = test_app(pipeline);
        let cookie = new_session(&app).await;

        let events = generate(&app, &cookie, "a token").await;
        assert_eq!(
            event_names(&events),
            vec!["user", "log", "log", "log", "failure", "done"]
        );
        assert!(events.contains("solc crashed"));
    }

    #[tokio::test]
    async fn test_run_events_can_only_be_opened_once() {
        let (app, _) = test_app(StubPipeline::returning(Ok(contract_result())));
        let response = app
            .clone()
            .oneshot(request(Method::GET, "/runs/no-such-run/events", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/runs",
                None,
                Some(json!({ "prompt": "a token" })),
            ))
            .await
            .unwrap();
        let started: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let uri = format!("/runs/{}/events", started["run_id"].as_str().unwrap());

        let first = app
            .clone()
            .oneshot(request(Method::GET, &uri, None, None))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let second = app
            .oneshot(request(Method::GET, &uri, None, None))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unclaimed_runs_are_dropped() {
        let (app, state) = test_app(StubPipeline::returning(Ok(contract_result())));
        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/runs",
                None,
                Some(json!({ "prompt": "a token" })),
            ))
            .await
            .unwrap();
        let started: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let uri = format!("/runs/{}/events", started["run_id"].as_str().unwrap());

        assert_eq!(state.drop_unclaimed_runs(UNCLAIMED_RUN_TTL), 0);
        assert_eq!(state.drop_unclaimed_runs(Duration::ZERO), 1);
        assert_eq!(state.drop_unclaimed_runs(Duration::ZERO), 0);

        let response = app
            .oneshot(request(Method::GET, &uri, None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_example_prompt_selection() {
        let (app, _) = test_app(StubPipeline::returning(Ok(contract_result())));
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/prompts/example",
                Some(&cookie),
                Some(json!({ "index": 2 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert!(body["prompt"].as_str().unwrap().contains("NFT marketplace"));

        let session = session_json(&app, &cookie).await;
        assert_eq!(session["chat_input"], body["prompt"]);

        let response = app
            .oneshot(request(
                Method::POST,
                "/prompts/example",
                Some(&cookie),
                Some(json!({ "index": 3 })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reset_and_health() {
        let (app, state) = test_app(StubPipeline::returning(Ok(contract_result())));
        let cookie = new_session(&app).await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/health", None, None))
            .await
            .unwrap();
        let health: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["pipeline"], "stub");
        assert_eq!(health["sessions"], 1);

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/session/reset", Some(&cookie), None))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reset"], true);
        assert!(state.sessions.is_empty());

        let response = app
            .oneshot(request(Method::POST, "/session/reset", Some(&cookie), None))
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["reset"], false);
    }
}
