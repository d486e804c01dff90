use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::{Value, json};
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};
use tokio::net::TcpListener;
use trontrust_config::Config;
use url::Url;

/// Serves `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    addr
}

/// A request received by [`FakeBackend`].
#[derive(Clone, Debug, PartialEq)]
pub struct Received {
    pub route: &'static str,
    pub body: Value,
}

#[derive(Clone, Debug)]
struct Reply {
    status: StatusCode,
    body: String,
}

/// Stand-in for the wallet backend, answering `connect-wallet` and `disconnect-wallet`.
#[derive(Clone, Debug)]
pub struct FakeBackend {
    pub addr: SocketAddr,
    received: Arc<Mutex<Vec<Received>>>,
    reply: Arc<Mutex<Reply>>,
}

impl FakeBackend {
    pub async fn spawn() -> Self {
        let received = Arc::new(Mutex::new(Vec::new()));
        let reply = Arc::new(Mutex::new(Reply {
            status: StatusCode::OK,
            body: json!({ "success": true }).to_string(),
        }));
        let state = (received.clone(), reply.clone());

        let router = Router::new()
            .route("/api/connect-wallet", post(connect))
            .route("/api/disconnect-wallet", post(disconnect))
            .with_state(state);
        let addr = serve(router).await;
        Self { addr, received, reply }
    }

    /// Answer every following request with `status` and `body`.
    pub fn reply_with(&self, status: u16, body: impl Into<String>) {
        *self.reply.lock().unwrap() =
            Reply { status: StatusCode::from_u16(status).unwrap(), body: body.into() };
    }

    pub fn received(&self) -> Vec<Received> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_on(&self, route: &str) -> Vec<Value> {
        self.received().into_iter().filter(|r| r.route == route).map(|r| r.body).collect()
    }

    pub fn config(&self) -> Config {
        Config {
            api_base_url: Url::parse(&format!("http://{}/api", self.addr)).unwrap(),
            api_timeout_secs: 2,
            ..Default::default()
        }
    }
}

type BackendState = (Arc<Mutex<Vec<Received>>>, Arc<Mutex<Reply>>);

async fn connect(State(state): State<BackendState>, Json(body): Json<Value>) -> (StatusCode, String) {
    record(state, "connect-wallet", body)
}

async fn disconnect(
    State(state): State<BackendState>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    record(state, "disconnect-wallet", body)
}

fn record((received, reply): BackendState, route: &'static str, body: Value) -> (StatusCode, String) {
    received.lock().unwrap().push(Received { route, body });
    let reply = reply.lock().unwrap().clone();
    (reply.status, reply.body)
}
