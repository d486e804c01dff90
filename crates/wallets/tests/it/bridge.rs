//! The browser bridge driven end to end the way the connect page drives it.

use crate::{init_tracing, utils::FakeBackend};
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use trontrust_wallets::{
    BrowserWalletServer, ChainPolicy, Coordinator, CoordinatorService, CoordinatorSettings,
    HttpWalletApi,
    wallet_browser::{
        SESSION_TOKEN_HEADER,
        types::{BridgeCommand, BridgeResponse, CommandKind, CommandResponse, PageConfig},
    },
};

const ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

/// What the connect page does, minus the wallet extension.
struct Page {
    client: reqwest::Client,
    base: String,
}

impl Page {
    fn new(server: &BrowserWalletServer) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(SESSION_TOKEN_HEADER, server.session_token().parse().unwrap());
        let client = reqwest::Client::builder().default_headers(headers).build().unwrap();
        Self { client, base: format!("{}/api", server.url()) }
    }

    async fn post(&self, path: &str, body: Value) -> Value {
        let resp = self.client.post(format!("{}{path}", self.base)).json(&body).send().await;
        resp.unwrap().error_for_status().unwrap().json().await.unwrap()
    }

    async fn get(&self, path: &str) -> Value {
        let resp = self.client.get(format!("{}{path}", self.base)).send().await;
        resp.unwrap().error_for_status().unwrap().json().await.unwrap()
    }

    /// Polls `/command` until the bridge hands out a command.
    async fn next_command(&self) -> BridgeCommand {
        for _ in 0..50 {
            let resp = self.client.get(format!("{}/command", self.base)).send().await.unwrap();
            if let BridgeResponse::Ok { data } = resp.json::<BridgeResponse<_>>().await.unwrap() {
                return data;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("no command was queued for the page");
    }

    /// Polls `/state` until `status` is reported.
    async fn wait_for_status(&self, status: &str) -> Value {
        let mut last = Value::Null;
        for _ in 0..50 {
            last = self.get("/state").await;
            if last["data"]["status"] == status {
                return last["data"].clone();
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("state never became {status}, last seen {last}");
    }
}

async fn wait_for_calls(backend: &FakeBackend, route: &str, count: usize) -> Vec<Value> {
    for _ in 0..50 {
        let bodies = backend.received_on(route);
        if bodies.len() >= count {
            return bodies;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("backend never received {count} `{route}` calls");
}

#[tokio::test(flavor = "multi_thread")]
async fn connect_and_leave_allowed_network() {
    init_tracing();

    let backend = FakeBackend::spawn().await;
    let config = backend.config();
    let policy = ChainPolicy::from_config(&config).unwrap();

    let mut server = BrowserWalletServer::new(
        0,
        false,
        Duration::from_secs(5),
        PageConfig::new(&config, &policy),
    );
    server.start().await.unwrap();

    let api = Arc::new(HttpWalletApi::new(&config).unwrap());
    let (coordinator, outcomes) = Coordinator::new(
        CoordinatorSettings::from_config(&config),
        policy,
        Arc::new(server.clone()),
        api,
    );
    let handle = CoordinatorService::spawn(coordinator, outcomes);
    server.attach(handle.actions(), handle.snapshots());

    let page = Page::new(&server);
    assert_eq!(page.get("/state").await["data"]["status"], "idle");

    // the user clicks connect and the bridge asks the page to open the wallet
    assert_eq!(page.post("/action", json!({ "action": "connect" })).await["status"], "ok");
    let command = page.next_command().await;
    assert!(matches!(command.kind, CommandKind::Open { .. }));
    let answer = CommandResponse { id: command.id, error: None };
    page.post("/command/response", serde_json::to_value(answer).unwrap()).await;

    // the wallet approves and reports the account
    page.post(
        "/account",
        json!({
            "isConnected": true,
            "address": ADDRESS,
            "chainId": "0x2b6653dc",
            "walletType": "TronLink",
            "userAgent": "bridge-test",
        }),
    )
    .await;

    let state = page.wait_for_status("connected").await;
    assert_eq!(state["session"]["address"], ADDRESS);
    assert_eq!(state["session"]["network"], "TRON Mainnet");
    assert!(state["error"].is_null());

    let saved = wait_for_calls(&backend, "connect-wallet", 1).await;
    assert_eq!(saved[0]["address"], ADDRESS);
    assert_eq!(saved[0]["chainId"], 728126428);
    assert_eq!(saved[0]["walletType"], "TronLink");

    // switching the wallet to Ethereum is not allowed for the TRON variant
    page.post("/network", json!({ "chainId": 1 })).await;
    let state = page.wait_for_status("error").await;
    assert!(state["session"].is_null());
    assert!(state["error"].as_str().unwrap().contains("chain 1"));

    let removed = wait_for_calls(&backend, "disconnect-wallet", 1).await;
    assert_eq!(removed, vec![json!({ "address": ADDRESS })]);

    handle.shutdown().await;
    server.stop().await.unwrap();
}
