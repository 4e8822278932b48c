use tokio_util::sync::CancellationToken;

use super::prepare_node;
use crate::frontend::Command;
use crate::frontend::Flow;
use crate::frontend::Frontend;

async fn run_script(frontend: &Frontend, script: &str) -> (String, CancellationToken) {
    let token = CancellationToken::new();
    let mut out = Vec::new();
    frontend
        .run(script.as_bytes(), &mut out, token.clone())
        .await
        .unwrap();
    (String::from_utf8(out).unwrap(), token)
}

#[tokio::test]
async fn test_single_node_store_and_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(&dir.path().join("data"), 3, None).await;
    let frontend = Frontend::new(node.processor.clone());
    let me = node.processor.node();

    let local = dir.path().join("a.txt");
    std::fs::write(&local, b"alpha").unwrap();

    let script = format!("StoreFile {}\nLookup a.txt\n", local.display());
    let (out, token) = run_script(&frontend, &script).await;
    assert!(out.contains(&format!("Stored a.txt at:\n  {}", me)), "{}", out);
    assert!(out.contains(&format!("Node Information:\n  {}", me)), "{}", out);
    assert!(!token.is_cancelled());

    let stored = node.processor.swarm.files().read("a.txt").await.unwrap();
    assert_eq!(stored, b"alpha");

    node.kill().await;
}

#[tokio::test]
async fn test_rejections_do_not_stop_the_reader() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let frontend = Frontend::new(node.processor.clone());

    let missing = dir.path().join("missing.txt");
    let script = format!(
        "Lookup a-b.txt\nStoreFile {}\nFrobnicate\n\nPrintState\n",
        missing.display()
    );
    let (out, _) = run_script(&frontend, &script).await;
    assert!(out.contains("Illegal file name \"a-b.txt\""), "{}", out);
    assert!(out.contains("does not exist"), "{}", out);
    assert!(out.contains("Invalid command! Supported commands"), "{}", out);
    assert!(out.contains("Chord Client's node information:"), "{}", out);

    node.kill().await;
}

#[tokio::test]
async fn test_print_state_lists_every_finger() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let frontend = Frontend::new(node.processor.clone());
    let me = node.processor.node();

    let mut out = Vec::new();
    let flow = frontend
        .execute(Command::PrintState, &mut out)
        .await
        .unwrap();
    assert_eq!(flow, Flow::Continue);

    let out = String::from_utf8(out).unwrap();
    assert!(out.contains(&format!(" {}\n", me)));
    assert!(out.contains("Predecessor: none"));
    assert!(out.contains("Successor Nodes:"));
    // A new ring points every finger at itself.
    let fingers = out.lines().filter(|l| l.starts_with("finger")).count();
    assert_eq!(fingers, 160);
    assert!(out.contains(&format!("finger 159 {}", me)));

    node.kill().await;
}

#[tokio::test]
async fn test_quit_cancels_token() {
    let dir = tempfile::tempdir().unwrap();
    let node = prepare_node(dir.path(), 3, None).await;
    let frontend = Frontend::new(node.processor.clone());

    let (out, token) = run_script(&frontend, "Quit\nPrintState\n").await;
    assert!(token.is_cancelled());
    // Nothing after Quit runs.
    assert!(out.is_empty(), "{}", out);

    node.kill().await;
}
