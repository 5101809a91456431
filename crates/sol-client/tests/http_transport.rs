//! JSON-RPC over HTTP against a mock server.

use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;
use sol_client::{
    ClientConfig, ClientError, Commitment, Connection, HttpTransport, RpcRequest, RpcTransport,
    SubmitOptions,
};
use sol_tx::{
    system, Blockhash, Keypair, LifetimeToken, MessageBuilder, Transaction, TOKEN_PROGRAM_ID,
};

fn connection(server: &ServerGuard) -> Connection {
    Connection::new(&ClientConfig::with_rpc_url(server.url())).unwrap()
}

fn signed_transfer() -> Transaction {
    let payer = Keypair::generate();
    let lifetime = LifetimeToken {
        blockhash: Blockhash::new([3u8; 32]),
        last_valid_block_height: 10,
    };
    let message = MessageBuilder::new(payer.address())
        .with_lifetime(&lifetime)
        .append_instruction(system::transfer(&payer.address(), &Keypair::generate().address(), 1).unwrap())
        .compile()
        .unwrap();
    Transaction::sign(message, &[&payer]).unwrap()
}

#[tokio::test]
async fn balance_reads_context_value() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "jsonrpc": "2.0",
            "method": "getBalance",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({"jsonrpc": "2.0", "id": 0, "result": {"context": {"slot": 1}, "value": 934_087_680}})
                .to_string(),
        )
        .create_async()
        .await;

    let balance = connection(&server)
        .balance(&TOKEN_PROGRAM_ID, Commitment::Confirmed)
        .await
        .unwrap();

    assert_eq!(balance, 934_087_680);
    mock.assert_async().await;
}

#[tokio::test]
async fn latest_blockhash_becomes_lifetime_token() {
    let mut server = Server::new_async().await;
    let blockhash = Blockhash::new([9u8; 32]);
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "getLatestBlockhash"})))
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "result": {
                    "context": {"slot": 2792},
                    "value": {"blockhash": blockhash.to_string(), "lastValidBlockHeight": 3090}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let token = connection(&server)
        .latest_lifetime_token(Commitment::Finalized)
        .await
        .unwrap();
    assert_eq!(token.blockhash, blockhash);
    assert_eq!(token.last_valid_block_height, 3090);
}

#[tokio::test]
async fn rpc_error_object_is_mapped() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "error": {"code": -32602, "message": "Invalid param: WrongSize"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let transport = HttpTransport::new(server.url()).unwrap();
    let err = transport
        .send(RpcRequest::GetBalance, json!(["nope"]))
        .await
        .unwrap_err();
    match err {
        ClientError::Rpc { code, message, data } => {
            assert_eq!(code, -32602);
            assert_eq!(message, "Invalid param: WrongSize");
            assert!(data.is_none());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_is_retryable_connectivity() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_status(429)
        .with_header("retry-after", "10")
        .create_async()
        .await;

    let err = connection(&server).block_height(Commitment::Confirmed).await.unwrap_err();
    assert!(err.is_retryable());
    match err {
        ClientError::Connectivity { message, .. } => assert!(message.contains("retry after 10s")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn mistyped_result_is_unexpected_response() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(json!({"jsonrpc": "2.0", "id": 0, "result": "many"}).to_string())
        .create_async()
        .await;

    let err = connection(&server).block_height(Commitment::Confirmed).await.unwrap_err();
    assert!(matches!(err, ClientError::UnexpectedResponse { ref method, .. } if method == "getBlockHeight"));
}

#[tokio::test]
async fn send_transaction_posts_base64() {
    let mut server = Server::new_async().await;
    let tx = signed_transfer();
    let mock = server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({
            "method": "sendTransaction",
        })))
        .with_body(json!({"jsonrpc": "2.0", "id": 0, "result": tx.signature().to_string()}).to_string())
        .create_async()
        .await;

    let signature = connection(&server)
        .send_transaction(&tx, &SubmitOptions::default())
        .await
        .unwrap();
    assert_eq!(signature, *tx.signature());
    mock.assert_async().await;
}

#[tokio::test]
async fn preflight_blockhash_not_found_is_expired() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "error": {
                    "code": -32002,
                    "message": "Transaction simulation failed: Blockhash not found",
                    "data": {"err": "BlockhashNotFound", "logs": []}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let tx = signed_transfer();
    let err = connection(&server)
        .send_transaction(&tx, &SubmitOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Expired { signature } if signature == *tx.signature()));
}

#[tokio::test]
async fn preflight_failure_is_rejected() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .with_body(
            json!({
                "jsonrpc": "2.0",
                "id": 0,
                "error": {
                    "code": -32002,
                    "message": "Transaction simulation failed: Attempt to debit an account but found no record of a prior credit.",
                    "data": {"err": "AccountNotFound", "logs": []}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = connection(&server)
        .send_transaction(&signed_transfer(), &SubmitOptions::default())
        .await
        .unwrap_err();
    match err {
        ClientError::Rejected { reason, signature } => {
            assert!(signature.is_some());
            assert!(reason.contains("AccountNotFound"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn airdrop_method_not_found_is_faucet_unavailable() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/")
        .match_body(Matcher::PartialJson(json!({"method": "requestAirdrop"})))
        .with_body(
            json!({"jsonrpc": "2.0", "id": 0, "error": {"code": -32601, "message": "Method not found"}})
                .to_string(),
        )
        .create_async()
        .await;

    let err = connection(&server)
        .request_airdrop(&Keypair::generate().address(), 1_000_000_000, Commitment::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::FaucetUnavailable(ref m) if m.contains("Method not found")));
}
