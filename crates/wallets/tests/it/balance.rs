use crate::utils::serve;
use alloy_primitives::U256;
use axum::{Json, Router, extract::Path, routing::{get, post}};
use serde_json::{Value, json};
use std::time::Duration;
use trontrust_wallets::{
    BalanceError,
    balance::{BalanceSource, JsonRpcBalance, TronGridBalance},
    chains,
};
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(2);

async fn trongrid() -> Url {
    let router = Router::new().route(
        "/v1/accounts/{address}",
        get(|Path(address): Path<String>| async move {
            if address.ends_with("Empty") {
                Json(json!({ "data": [], "success": true }))
            } else {
                Json(json!({ "data": [{ "address": address, "balance": 1_500_000 }], "success": true }))
            }
        }),
    );
    Url::parse(&format!("http://{}", serve(router).await)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn trongrid_balance_in_trx() {
    let source = TronGridBalance::new(Some(trongrid().await), TIMEOUT).unwrap();
    let chain = chains::lookup(chains::TRON_MAINNET).unwrap();

    let balance = source.balance("TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t", chain).await.unwrap();
    assert_eq!(balance.raw, U256::from(1_500_000u64));
    assert_eq!(balance.to_string(), "1.5 TRX");

    // accounts that were never activated report no data
    let balance = source.balance("TAccountEmpty", chain).await.unwrap();
    assert_eq!(balance.to_string(), "0 TRX");
}

#[tokio::test(flavor = "multi_thread")]
async fn trongrid_refuses_evm_chains() {
    let source = TronGridBalance::new(None, TIMEOUT).unwrap();
    let err = source.balance("0x00", chains::lookup(1).unwrap()).await.unwrap_err();
    assert!(matches!(err, BalanceError::NoEndpoint("Ethereum")), "{err:?}");
}

async fn json_rpc(reply: Value) -> Url {
    let router = Router::new().route(
        "/",
        post(move |Json(request): Json<Value>| {
            let reply = reply.clone();
            async move {
                assert_eq!(request["method"], "eth_getBalance");
                assert_eq!(request["params"][1], "latest");
                Json(reply)
            }
        }),
    );
    Url::parse(&format!("http://{}/", serve(router).await)).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn json_rpc_balance_in_eth() {
    let url = json_rpc(json!({ "jsonrpc": "2.0", "id": 1, "result": "0xde0b6b3a7640000" })).await;
    let source = JsonRpcBalance::new(url, TIMEOUT).unwrap();

    let balance = source
        .balance("0x70997970C51812dc3A010C7d01b50e0d17dc79C8", chains::lookup(8453).unwrap())
        .await
        .unwrap();
    assert_eq!(balance.to_string(), "1 ETH");
}

#[tokio::test(flavor = "multi_thread")]
async fn json_rpc_error_is_surfaced() {
    let url = json_rpc(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "error": { "code": -32602, "message": "invalid address" }
    }))
    .await;
    let source = JsonRpcBalance::new(url, TIMEOUT).unwrap();

    let err = source.balance("0x00", chains::lookup(1).unwrap()).await.unwrap_err();
    assert!(
        matches!(&err, BalanceError::Rpc { code: -32602, message } if message == "invalid address"),
        "{err:?}"
    );
}
