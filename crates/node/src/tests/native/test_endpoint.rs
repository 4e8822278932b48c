use chord_rpc::jsonrpc::Client;
use chord_rpc::jsonrpc::RpcError;
use chord_rpc::method::Method;
use chord_rpc::types::*;
use jsonrpc_core::ErrorCode;

use super::prepare_node;
use crate::prelude::Did;

#[tokio::test]
async fn test_rpc_on_singleton() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let client = Client::new(&Client::endpoint_of(node.addr()));
    let me = node.processor.node();

    // A singleton owns the whole ring.
    let resp = client.find(Did::from_name("anything")).await.unwrap();
    assert_eq!(resp.into_found(), Some(me));

    let hop = client
        .find_successor(Did::from_name("anything"))
        .await
        .unwrap()
        .into_hop()
        .unwrap();
    assert!(hop.is_found());
    assert_eq!(hop.node(), me);

    let resp = client.find_predecessor().await.unwrap();
    assert!(!resp.found);
    assert!(resp.found_node_ips.is_empty());

    let resp = client.find_all_successors().await.unwrap();
    assert!(resp.found);
    assert!(resp.found_node_ips.is_empty());
    assert_eq!(resp.capacity, 3);

    node.kill().await;
}

#[tokio::test]
async fn test_rpc_notify_and_store_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = prepare_node(dir.path(), 3, None).await;
    let b = prepare_node(dir.path(), 3, None).await;
    let client = Client::new(&Client::endpoint_of(a.addr()));

    client.notify(b.processor.node()).await.unwrap();
    assert_eq!(a.predecessor(), Some(b.processor.node()));
    let resp = client.find_predecessor().await.unwrap();
    assert_eq!(resp.into_found(), Some(b.processor.node()));

    client.store_file("a.txt", b"hello chord").await.unwrap();
    let stored = a.processor.swarm.files().read("a.txt").await.unwrap();
    assert_eq!(stored, b"hello chord");
    let path = dir
        .path()
        .join(a.processor.did().to_string())
        .join("a.txt");
    assert!(path.is_file());

    a.kill().await;
    b.kill().await;
}

#[tokio::test]
async fn test_rpc_rejections() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 2, None).await;
    let client = Client::new(&Client::endpoint_of(node.addr()));

    let err = client
        .call_method::<FindResponse>(Method::Find, &FindRequest {
            id_to_find: "not hex".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::JsonClientError(ref e) if e.code == ErrorCode::InvalidParams));
    assert!(!err.is_transport());

    let err = client
        .call_method::<StoreFileResponse>(Method::StoreFile, &StoreFileRequest {
            file_name: "x".to_string(),
            file_data: "%%%".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::JsonClientError(ref e) if e.code == ErrorCode::InvalidParams));

    // Path traversal is refused by the callee.
    let err = client
        .store_file("../escape", b"x")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RpcError::JsonClientError(ref e) if e.code == ErrorCode::ServerError(502)
    ));
    assert!(!dir.path().join("escape").exists());

    node.kill().await;
}

#[tokio::test]
async fn test_store_large_file() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let client = Client::new(&Client::endpoint_of(node.addr()));

    // Over the default body limit of axum once base64 encoded.
    let data = vec![7u8; 3 << 20];
    client.store_file("big.bin", &data).await.unwrap();
    let stored = node.processor.swarm.files().read("big.bin").await.unwrap();
    assert_eq!(stored, data);

    node.kill().await;
}

#[tokio::test]
async fn test_http_refusal_is_not_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;

    // `/status` only answers GET.
    let client = Client::new(&format!("{}/status", Client::endpoint_of(node.addr())));
    let err = client.find_predecessor().await.unwrap_err();
    assert!(matches!(err, RpcError::HttpStatus(405)), "{:?}", err);
    assert!(!err.is_transport());

    node.kill().await;
}

#[tokio::test]
async fn test_killed_node_is_unreachable() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let addr = node.addr();
    node.kill().await;

    let client =
        Client::with_timeout(&Client::endpoint_of(addr), std::time::Duration::from_millis(200))
            .unwrap();
    let err = client.find_predecessor().await.unwrap_err();
    assert!(err.is_transport());
}
