use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
    Form, Json, Router, serve,
};
use futures::{sink::SinkExt, stream::StreamExt};
use minijinja::Environment;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::constants::{CELEBRITIES, CUSTOM_LABEL, CUSTOM_SENTINEL, USER_LABEL};
use crate::session::{ChatState, Role};
use crate::store::Store;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

// Shared application state
#[derive(Clone)]
struct AppState {
    templates: Arc<Environment<'static>>,
    store: Store,
}

/// What the page (and `/state`, and `/ws`) sees of a snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StateView {
    pub started: bool,
    pub session_id: Option<String>,
    pub celebrity: String,
    pub selection: String,
    pub custom_name: String,
    pub is_custom: bool,
    pub can_start: bool,
    pub draft: String,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub role: Role,
    pub speaker: String,
    pub content: String,
}

impl From<&ChatState> for StateView {
    fn from(state: &ChatState) -> Self {
        let celebrity = state.celebrity_name().to_string();
        let messages = state
            .history()
            .iter()
            .map(|m| MessageView {
                role: m.role,
                speaker: match m.role {
                    Role::User => USER_LABEL.to_string(),
                    Role::Assistant => celebrity.clone(),
                },
                content: m.content.clone(),
            })
            .collect();
        Self {
            started: state.is_started(),
            session_id: state.session_id().map(str::to_string),
            celebrity,
            selection: state.selection().as_value().to_string(),
            custom_name: state.custom_name().to_string(),
            is_custom: state.is_custom(),
            can_start: state.can_start(),
            draft: state.draft().to_string(),
            messages,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectForm {
    #[serde(default)]
    celebrity: String,
    #[serde(default)]
    custom_name: String,
}

#[derive(Debug, Deserialize)]
struct SendForm {
    #[serde(default)]
    message: String,
}

fn create_minijinja_env() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.add_template("index.html", INDEX_TEMPLATE)
        .context("Failed to load index template")?;
    Ok(env)
}

async fn index_handler(State(state): State<AppState>) -> Result<Html<String>, Html<String>> {
    let view = StateView::from(&state.store.snapshot());
    state
        .templates
        .get_template("index.html")
        .and_then(|tmpl| {
            tmpl.render(minijinja::context! {
                title => if view.started {
                    format!("Chat with {}", view.celebrity)
                } else {
                    "Select or Type a Celebrity to Chat With".to_string()
                },
                celebrities => CELEBRITIES,
                custom_value => CUSTOM_SENTINEL,
                custom_label => CUSTOM_LABEL,
                state => view,
            })
        })
        .map(Html)
        .map_err(|e| {
            error!("Failed to get or render template: {}", e);
            Html(format!("Internal Server Error: {}", e))
        })
}

async fn state_handler(State(state): State<AppState>) -> Json<StateView> {
    Json(StateView::from(&state.store.snapshot()))
}

// Selection changes without starting, so the custom name field can appear.
async fn select_handler(State(state): State<AppState>, Form(form): Form<SelectForm>) -> Redirect {
    state.store.select_celebrity(&form.celebrity);
    state.store.set_custom_name(&form.custom_name);
    Redirect::to("/")
}

async fn start_handler(State(state): State<AppState>, Form(form): Form<SelectForm>) -> Redirect {
    state.store.select_celebrity(&form.celebrity);
    state.store.set_custom_name(&form.custom_name);
    state.store.start_chat();
    Redirect::to("/")
}

async fn reset_handler(State(state): State<AppState>) -> Redirect {
    state.store.reset_session();
    Redirect::to("/")
}

// The reply arrives later over /ws; the redirect does not wait for it.
async fn send_handler(State(state): State<AppState>, Form(form): Form<SendForm>) -> Redirect {
    state.store.draft_message(&form.message);
    if state.store.spawn_send().is_none() {
        debug!("Nothing to send");
    }
    Redirect::to("/")
}

// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    debug!("WebSocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    debug!("New WebSocket connection established");
    push_snapshots(socket, state.store).await;
    debug!("WebSocket connection closed");
}

// Pushes every published snapshot to one page until it goes away.
async fn push_snapshots(socket: WebSocket, store: Store) {
    let (mut sender, mut receiver) = socket.split();
    let mut updates = store.subscribe();

    loop {
        let json = {
            let snapshot = updates.borrow_and_update();
            serde_json::to_string(&StateView::from(&*snapshot))
        };
        match json {
            Ok(json) => {
                if sender.send(Message::Text(json)).await.is_err() {
                    warn!("WebSocket client disconnected or send error. Closing connection.");
                    return;
                }
            }
            Err(e) => error!("Failed to serialize state snapshot: {}", e),
        }

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Err(e)) => {
                        warn!("WebSocket receive error: {}", e);
                        return;
                    }
                    // Pings and stray text from the page change nothing.
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

pub fn app(store: Store) -> Result<Router> {
    let templates = create_minijinja_env().context("Failed to initialize template engine")?;
    let state = AppState {
        templates: Arc::new(templates),
        store,
    };

    Ok(Router::new()
        .route("/", get(index_handler))
        .route("/state", get(state_handler))
        .route("/select", post(select_handler))
        .route("/start", post(start_handler))
        .route("/reset", post(reset_handler))
        .route("/send", post(send_handler))
        .route("/ws", get(ws_handler))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
        .layer(TraceLayer::new_for_http()))
}

pub async fn start_web_server(port: u16, store: Store) -> Result<()> {
    let app = app(store)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Web server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
