use crate::config::ServeConfig;
use crate::filter::{highlight, html_escape};
use crate::loader::{AnySource, LoadReport, PartialLoadWarning};
use crate::store::VocabularyStore;
use crate::vocabulary::{Cutoff, Selection};
use askama::Template;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn};

type SharedState = Arc<AppState>;

pub struct AppState {
    pub store: VocabularyStore<AnySource>,
}

#[derive(Debug, Clone, Copy)]
struct Chrome {
    body_class: &'static str,
    main_class: &'static str,
    card_class: &'static str,
    eyebrow_class: &'static str,
    headline_class: &'static str,
    lede_class: &'static str,
    input_class: &'static str,
    button_class: &'static str,
}

const CHROME: Chrome = Chrome {
    body_class: "bg-slate-50 text-slate-900",
    main_class: "min-h-screen flex flex-col items-center justify-start py-10 px-4",
    card_class: "max-w-3xl w-full space-y-6",
    eyebrow_class: "uppercase tracking-wide text-sm text-slate-500",
    headline_class: "text-4xl font-extrabold tracking-tight",
    lede_class: "text-lg text-slate-600",
    input_class: "w-full rounded-md border border-slate-300 p-2",
    button_class: "inline-flex items-center rounded-md bg-slate-900 px-4 py-2 text-white font-semibold shadow hover:bg-slate-800 transition-colors",
};

const TAILWIND_TAG: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>"#;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serves the editor page and the JSON API until ctrl-c or SIGTERM.
///
/// The vocabulary load starts in the background right away; requests that
/// arrive before it finishes wait for it.
pub async fn serve(
    config: ServeConfig,
    store: VocabularyStore<AnySource>,
) -> Result<(), WebError> {
    let state = Arc::new(AppState { store });
    let warmup = state.clone();
    tokio::spawn(async move {
        if let Err(err) = warmup.store.ensure_loaded().await {
            warn!(error = %err, "initial vocabulary load failed");
        }
    });
    let router = build_router(state);
    info!(%config.addr, "Binding HTTP listener");
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unavailable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(editor))
        .route("/api/highlight", post(api_highlight))
        .route("/api/glossaries", get(api_glossaries))
        .route("/api/reload", post(api_reload))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn editor(State(state): State<SharedState>) -> impl IntoResponse {
    let snapshot = match state.store.ensure_loaded().await {
        Ok(snapshot) => snapshot,
        Err(err) => return Html(render_error_page(err.to_string())),
    };
    let template = EditorTemplate {
        chrome: CHROME,
        tailwind_tag: TAILWIND_TAG,
        glossaries: snapshot.catalog.ids().map(str::to_string).collect(),
        cutoff_min: Cutoff::MIN,
        cutoff_max: Cutoff::MAX,
        cutoff_default: Cutoff::default().get(),
        version: env!("CARGO_PKG_VERSION"),
    };
    Html(
        template
            .render()
            .unwrap_or_else(|err| render_error_page(err.to_string())),
    )
}

async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "plainword-web",
        "loaded": state.store.is_loaded(),
    }))
}

#[derive(Debug, Deserialize)]
struct HighlightRequest {
    #[serde(default)]
    text: String,
    glossary: Option<String>,
    cutoff: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct HighlightResponse {
    html: String,
    text: String,
    word_count: Option<usize>,
    flagged: Vec<String>,
    flagged_count: usize,
    glossary: Option<String>,
    cutoff: u16,
}

async fn api_highlight(
    State(state): State<SharedState>,
    Json(request): Json<HighlightRequest>,
) -> Result<Json<HighlightResponse>, ApiError> {
    let snapshot = state
        .store
        .ensure_loaded()
        .await
        .map_err(|err| ApiError::unavailable(err.to_string()))?;
    let cutoff = request.cutoff.map(Cutoff::new).unwrap_or_default();
    let selection = Selection::new(request.glossary, cutoff);

    // The editor shows nothing until a loaded glossary is picked.
    let selected = selection
        .glossary
        .as_deref()
        .is_some_and(|id| snapshot.catalog.contains(id));
    if !selected {
        return Ok(Json(HighlightResponse {
            html: String::new(),
            text: String::new(),
            word_count: None,
            flagged: Vec::new(),
            flagged_count: 0,
            glossary: selection.glossary,
            cutoff: cutoff.into(),
        }));
    }

    let subset = snapshot.subset(&selection);
    let annotated = highlight(&request.text, &subset, &snapshot.base);
    Ok(Json(HighlightResponse {
        html: annotated.render_html(),
        text: annotated.render_marked("[", "]"),
        word_count: Some(annotated.word_count()),
        flagged: annotated
            .flagged_keys()
            .into_iter()
            .map(str::to_string)
            .collect(),
        flagged_count: annotated.flagged_count(),
        glossary: selection.glossary.clone(),
        cutoff: cutoff.into(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
struct GlossaryPayload {
    id: String,
    rows: usize,
}

#[derive(Debug, Serialize, Deserialize)]
struct GlossariesResponse {
    base_words: usize,
    glossaries: Vec<GlossaryPayload>,
    warnings: Vec<WarningPayload>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WarningPayload {
    source: String,
    reason: String,
}

impl From<&PartialLoadWarning> for WarningPayload {
    fn from(value: &PartialLoadWarning) -> Self {
        Self {
            source: value.source.clone(),
            reason: value.reason.clone(),
        }
    }
}

fn glossaries_payload(state: &AppState) -> Option<GlossariesResponse> {
    let snapshot = state.store.snapshot()?;
    let report = state.store.last_report().unwrap_or_else(|| Arc::new(LoadReport::default()));
    Some(GlossariesResponse {
        base_words: snapshot.base.len(),
        glossaries: snapshot
            .catalog
            .iter()
            .map(|(id, glossary)| GlossaryPayload {
                id: id.to_string(),
                rows: glossary.len(),
            })
            .collect(),
        warnings: report.warnings.iter().map(WarningPayload::from).collect(),
    })
}

async fn api_glossaries(
    State(state): State<SharedState>,
) -> Result<Json<GlossariesResponse>, ApiError> {
    state
        .store
        .ensure_loaded()
        .await
        .map_err(|err| ApiError::unavailable(err.to_string()))?;
    glossaries_payload(&state)
        .map(Json)
        .ok_or_else(|| ApiError::unavailable("vocabulary is not loaded"))
}

async fn api_reload(
    State(state): State<SharedState>,
) -> Result<Json<GlossariesResponse>, ApiError> {
    state
        .store
        .reload()
        .await
        .map_err(|err| ApiError::unavailable(err.to_string()))?;
    glossaries_payload(&state)
        .map(Json)
        .ok_or_else(|| ApiError::unavailable("vocabulary is not loaded"))
}

fn render_error_page(message: impl Into<String>) -> String {
    let chrome = CHROME;
    let message = html_escape(&message.into());
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Plainword • Error</title>
    {tailwind_tag}
  </head>
  <body class="{body_class}">
    <main class="{main_class}">
      <div class="{card_class}">
        <h1 class="{headline_class}">Word lists are unavailable</h1>
        <p class="{lede_class}">{message}</p>
        <a href="/" class="{button_class}">Try again</a>
      </div>
    </main>
  </body>
</html>"#,
        tailwind_tag = TAILWIND_TAG,
        body_class = chrome.body_class,
        main_class = chrome.main_class,
        card_class = chrome.card_class,
        headline_class = chrome.headline_class,
        lede_class = chrome.lede_class,
        button_class = chrome.button_class,
        message = message,
    )
}

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Plainword • Science Explainer Text Editor</title>
    {{ tailwind_tag|safe }}
  </head>
  <body class="{{ chrome.body_class }}">
    <main class="{{ chrome.main_class }}">
      <div class="{{ chrome.card_class }}">
        <div>
          <p class="{{ chrome.eyebrow_class }}">Plainword v{{ version }}</p>
          <h1 class="{{ chrome.headline_class }}">Science Explainer Text Editor</h1>
          <p class="{{ chrome.lede_class }}">Words outside the common list and the chosen glossary are underlined in red.</p>
        </div>
        <textarea id="inputText" rows="10" class="{{ chrome.input_class }}" placeholder="Enter your text here..."></textarea>
        <div>
          <label for="wordListSelect">Select a word list: </label>
          <select id="wordListSelect" class="{{ chrome.input_class }}">
            <option value="">Select a word list</option>
            {% for id in glossaries %}
            <option value="{{ id }}">{{ id }}</option>
            {% endfor %}
          </select>
        </div>
        <div>
          <label for="cutoff">Rank cutoff: </label>
          <input type="number" id="cutoff" class="{{ chrome.input_class }}" value="{{ cutoff_default }}" min="{{ cutoff_min }}" max="{{ cutoff_max }}" />
        </div>
        <div id="outputText"></div>
        <div id="wordCount"></div>
      </div>
    </main>
    <script>
      const inputText = document.getElementById("inputText");
      const wordListSelect = document.getElementById("wordListSelect");
      const cutoff = document.getElementById("cutoff");
      const outputText = document.getElementById("outputText");
      const wordCount = document.getElementById("wordCount");
      let pending = 0;

      async function updateHighlight() {
        const ticket = ++pending;
        const response = await fetch("/api/highlight", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({
            text: inputText.value,
            glossary: wordListSelect.value || null,
            cutoff: parseInt(cutoff.value, 10) || null,
          }),
        });
        if (!response.ok || ticket !== pending) {
          return;
        }
        const payload = await response.json();
        outputText.innerHTML = payload.html;
        wordCount.textContent = payload.word_count === null ? "" : "Word count: " + payload.word_count;
      }

      inputText.addEventListener("input", updateHighlight);
      wordListSelect.addEventListener("change", updateHighlight);
      cutoff.addEventListener("input", updateHighlight);
    </script>
  </body>
</html>"#,
    ext = "html"
)]
struct EditorTemplate {
    chrome: Chrome,
    tailwind_tag: &'static str,
    glossaries: Vec<String>,
    cutoff_min: u16,
    cutoff_max: u16,
    cutoff_default: usize,
    version: &'static str,
}

#[cfg(all(test, feature = "web"))]
mod tests {
    use super::*;
    use crate::config::LoaderConfig;
    use crate::loader::MemorySource;
    use axum::{body, body::Body, http::Request, http::header::CONTENT_TYPE};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        let source = MemorySource::new()
            .with_document("tenHundredWords.json", r#"[["the"], ["cat", "cats"], ["sat"], ["on"]]"#)
            .with_document("wordListIndex.json", r#"["physics.json", "broken.json"]"#)
            .with_document(
                "physics.json",
                r#"[["Atom", "atoms"], ["energy"], ["quark", "quarks"]]"#,
            );
        Arc::new(AppState {
            store: VocabularyStore::new(AnySource::Memory(source), LoaderConfig::default()),
        })
    }

    fn test_router() -> Router {
        build_router(test_state())
    }

    async fn post_highlight(router: Router, payload: serde_json::Value) -> HighlightResponse {
        let response = router
            .oneshot(
                Request::post("/api/highlight")
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn highlight_flags_words_outside_cutoff() {
        let payload = post_highlight(
            test_router(),
            json!({
                "text": "The atom's energy sat on a quark.",
                "glossary": "physics.json",
                "cutoff": 2,
            }),
        )
        .await;
        assert_eq!(payload.word_count, Some(7));
        assert_eq!(payload.flagged, vec!["a", "quark"]);
        assert_eq!(payload.text, "The atom's energy sat on [a] [quark.]");
        assert!(payload.html.contains(r#"<span style="text-decoration: underline; color: red;">quark.</span>"#));
        assert_eq!(payload.cutoff, 2);
    }

    #[test]
    fn bind_errors_convert_into_web_error() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err: WebError = io.into();
        assert_eq!(err.to_string(), "io error: address in use");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn hyphenated_words_count_once() {
        let payload = post_highlight(
            test_router(),
            json!({ "text": "cat-atom energy", "glossary": "physics.json" }),
        )
        .await;
        assert_eq!(payload.word_count, Some(2));
        assert_eq!(payload.text, "cat atom energy");
        assert!(payload.flagged.is_empty());
    }

    #[tokio::test]
    async fn highlight_without_glossary_is_blank() {
        let payload = post_highlight(test_router(), json!({ "text": "The cat sat." })).await;
        assert_eq!(payload.html, "");
        assert_eq!(payload.word_count, None);

        let unknown = post_highlight(
            test_router(),
            json!({ "text": "The cat sat.", "glossary": "broken.json" }),
        )
        .await;
        assert_eq!(unknown.word_count, None);
        assert_eq!(unknown.glossary.as_deref(), Some("broken.json"));
    }

    #[tokio::test]
    async fn highlight_clamps_cutoff() {
        let payload = post_highlight(
            test_router(),
            json!({ "text": "quarks", "glossary": "physics.json", "cutoff": 5000 }),
        )
        .await;
        assert_eq!(payload.cutoff, 248);
        assert_eq!(payload.flagged_count, 0);
    }

    #[tokio::test]
    async fn glossaries_lists_loaded_and_skipped_sources() {
        let response = test_router()
            .oneshot(Request::get("/api/glossaries").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: GlossariesResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload.base_words, 5);
        assert_eq!(payload.glossaries.len(), 1);
        assert_eq!(payload.glossaries[0].id, "physics.json");
        assert_eq!(payload.glossaries[0].rows, 3);
        assert_eq!(payload.warnings.len(), 1);
        assert_eq!(payload.warnings[0].source, "broken.json");
    }

    #[tokio::test]
    async fn editor_page_lists_glossaries() {
        let response = test_router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.status().is_success());
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains(r#"<option value="physics.json">physics.json</option>"#));
        assert!(html.contains(r#"max="248""#));
        assert!(html.contains(TAILWIND_TAG));
        assert!(!html.contains("broken.json"));
    }

    #[tokio::test]
    async fn reload_failure_is_service_unavailable() {
        let state = Arc::new(AppState {
            store: VocabularyStore::new(
                AnySource::Memory(MemorySource::new()),
                LoaderConfig::default(),
            ),
        });
        let response = build_router(state.clone())
            .oneshot(Request::post("/api/reload").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let page = build_router(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = body::to_bytes(page.into_body(), usize::MAX).await.unwrap();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("Word lists are unavailable"));
    }

    #[tokio::test]
    async fn health_reports_load_state() {
        let state = test_state();
        let response = build_router(state.clone())
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(payload["loaded"], false);

        state.store.ensure_loaded().await.unwrap();
        assert!(state.store.is_loaded());
    }
}
