use crate::utils::FakeBackend;
use serde_json::json;
use tokio::net::TcpListener;
use trontrust_config::Config;
use trontrust_wallets::{
    ApiError, HttpWalletApi, WalletApi, WalletSession, api::ApiOperation, chains, session::SessionIds,
};
use url::Url;

const ADDRESS: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

fn session() -> WalletSession {
    WalletSession::new(
        ADDRESS,
        chains::lookup(chains::TRON_MAINNET).unwrap(),
        "TronLink",
        SessionIds::new().next(),
        Some("integration-test".to_string()),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn save_session_posts_session_json() {
    let backend = FakeBackend::spawn().await;
    let api = HttpWalletApi::new(&backend.config()).unwrap();
    let session = session();

    api.save_session(&session).await.unwrap();

    let bodies = backend.received_on("connect-wallet");
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0], serde_json::to_value(&session).unwrap());
    assert_eq!(bodies[0]["chainId"], 728126428);
    assert_eq!(bodies[0]["network"], "TRON Mainnet");
    assert_eq!(bodies[0]["metadata"]["userAgent"], "integration-test");
}

#[tokio::test(flavor = "multi_thread")]
async fn remove_session_posts_address() {
    let backend = FakeBackend::spawn().await;
    let api = HttpWalletApi::new(&backend.config()).unwrap();

    api.remove_session(ADDRESS).await.unwrap();

    assert_eq!(backend.received_on("disconnect-wallet"), vec![json!({ "address": ADDRESS })]);
    assert!(backend.received_on("connect-wallet").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_reported_with_backend_message() {
    let backend = FakeBackend::spawn().await;
    backend.reply_with(500, json!({ "success": false, "error": "database unavailable" }).to_string());
    let api = HttpWalletApi::new(&backend.config()).unwrap();

    let err = api.save_session(&session()).await.unwrap_err();
    match err {
        ApiError::Status { operation, status, message } => {
            assert_eq!(operation, ApiOperation::SaveSession);
            assert_eq!(status, 500);
            assert_eq!(message.as_deref(), Some("database unavailable"));
        }
        other => panic!("expected status error, got {other:?}"),
    }

    // a body that is not the response envelope still yields the status
    backend.reply_with(502, "Bad Gateway");
    let err = api.remove_session(ADDRESS).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 502, message: None, .. }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn unsuccessful_response_is_rejected() {
    let backend = FakeBackend::spawn().await;
    backend.reply_with(200, json!({ "success": false, "error": "address blocked" }).to_string());
    let api = HttpWalletApi::new(&backend.config()).unwrap();

    let err = api.save_session(&session()).await.unwrap_err();
    assert_eq!(err.to_string(), "`connect-wallet` rejected the request: address blocked");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_response_is_a_decode_error() {
    let backend = FakeBackend::spawn().await;
    backend.reply_with(200, "<html>ok</html>");
    let api = HttpWalletApi::new(&backend.config()).unwrap();

    let err = api.remove_session(ADDRESS).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { operation: ApiOperation::RemoveSession, .. }));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_backend_is_a_transport_error() {
    // grab a free port and release it again
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        api_base_url: Url::parse(&format!("http://{addr}/api")).unwrap(),
        api_timeout_secs: 1,
        ..Default::default()
    };
    let api = HttpWalletApi::new(&config).unwrap();
    let err = api.save_session(&session()).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport { operation: ApiOperation::SaveSession, .. }));
}
