use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use http_session_axum::{
    OptionalSession, RequiredSession, SessionManager, SessionRejection, SessionUpdate,
    csrf_session_middleware,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the demo keeps in a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct MySession {
    pub(crate) username: String,
}

type Manager = Arc<SessionManager<MySession>>;

pub(crate) fn router(manager: Manager) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/do_login", post(do_login))
        .route("/api/do_logout", post(do_logout))
        .route("/api/current_login", get(current_login))
        .layer(middleware::from_fn_with_state(
            manager.clone(),
            csrf_session_middleware::<MySession>,
        ))
        .with_state(manager)
}

async fn index(OptionalSession(session): OptionalSession<MySession>) -> Html<String> {
    let status = match session {
        Some(s) => format!("Logged in as {}", html_escape(&s.username)),
        None => "Not logged in".to_string(),
    };
    Html(INDEX_HTML.replace("{{status}}", &status))
}

async fn do_login(
    State(manager): State<Manager>,
    headers: HeaderMap,
    username: String,
) -> Result<Response, SessionRejection> {
    let username = username.trim();
    if username.is_empty() {
        return Ok((StatusCode::BAD_REQUEST, "Username required").into_response());
    }

    let session = MySession {
        username: username.to_string(),
    };
    let update = manager.set_session(&headers, &session).await?;
    tracing::info!("Logged in: {}", session.username);
    Ok((SessionUpdate(update), Json(session)).into_response())
}

async fn do_logout(
    State(manager): State<Manager>,
    headers: HeaderMap,
    RequiredSession(session): RequiredSession<MySession>,
) -> SessionUpdate {
    tracing::info!("Logged out: {}", session.username);
    SessionUpdate(manager.invalidate_session(&headers).await)
}

async fn current_login(RequiredSession(session): RequiredSession<MySession>) -> Json<MySession> {
    Json(session)
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Session demo</title></head>
<body>
<h1>Session demo</h1>
<p id="status">{{status}}</p>
<input id="username" placeholder="username">
<button onclick="login()">Login</button>
<button onclick="logout()">Logout</button>
<button onclick="current()">Current login</button>
<pre id="out"></pre>
<script>
function csrf() {
  const m = document.cookie.match(/(?:^|;\s*)XSRF-TOKEN=([^;]*)/);
  return m ? m[1] : "";
}
async function call(method, url, body) {
  const res = await fetch(url, { method, body, headers: { "X-XSRF-TOKEN": csrf() } });
  document.getElementById("out").textContent = res.status + " " + await res.text();
}
function login() { call("POST", "/api/do_login", document.getElementById("username").value); }
function logout() { call("POST", "/api/do_logout"); }
function current() { call("GET", "/api/current_login"); }
</script>
</body>
</html>
"#;
