use std::time::Duration;

use super::*;
use crate::dht::ChordStorage;
use crate::dht::SuccessorWriter;

#[tokio::test]
async fn test_single_node_store_and_lookup() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    a.swarm.create_ring()?;

    let owner = a.swarm.store_file("a.txt", b"hello".to_vec()).await?;
    assert_eq!(owner, a.info());
    assert_eq!(a.swarm.owner("a.txt").await?, a.info());

    let key = Did::from_name("a.txt");
    assert_eq!(
        a.swarm.dht().bucket_get(key).await?,
        Some("a.txt".to_string())
    );
    assert_eq!(a.swarm.files().read("a.txt").await?, b"hello");
    assert!(dir
        .path()
        .join(a.did().to_string())
        .join("a.txt")
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_lookup_correctness() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 8, 3).await;
    fix_all_fingers(&nodes).await;
    let refs: Vec<&Node> = nodes.iter().collect();

    let names: Vec<String> = (0..32).map(|i| format!("file_{i}.txt")).collect();
    for (i, name) in names.iter().enumerate() {
        let via = &nodes[i % nodes.len()];
        via.swarm.store_file(name, name.as_bytes().to_vec()).await?;
    }

    for name in names.iter() {
        let key = Did::from_name(name);
        let expected = expected_owner(&refs, key);
        for via in nodes.iter() {
            assert_eq!(via.swarm.owner(name).await?, expected);
        }
        let owner = nodes.iter().find(|n| n.info() == expected).unwrap();
        assert_eq!(
            owner.swarm.dht().bucket_get(key).await?,
            Some(name.to_string())
        );
        assert_eq!(owner.swarm.files().read(name).await?, name.as_bytes());
    }
    Ok(())
}

#[tokio::test]
async fn test_lookup_of_node_id_is_that_node() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 4, 3).await;
    for target in nodes.iter() {
        for via in nodes.iter() {
            assert_eq!(via.swarm.find(target.did()).await?, target.info());
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_bounded_lookup_with_dead_routes() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    a.swarm.create_ring()?;

    // a only knows nodes that never answer
    let ghosts: Vec<NodeIp> = (1..4).map(|i| NodeIp::from_address(node_addr(i))).collect();
    a.swarm.dht().successors().extend(&ghosts)?;
    for (i, g) in ghosts.iter().enumerate() {
        a.swarm.dht().set_finger(i * 40, *g)?;
    }

    // past every ghost, so no ghost can own it
    let last = *a.successors().last().unwrap();
    let target = last.did + Did::from(1u32);
    assert!(matches!(
        a.swarm.find(target).await,
        Err(Error::LookupNotFound(d)) if d == target
    ));
    assert_eq!(a.swarm.handle_find(target).await?, None);
    Ok(())
}

#[tokio::test]
async fn test_lookup_skips_dead_hop() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 6, 3).await;
    fix_all_fingers(&nodes).await;

    // kill a node without letting anyone stabilize
    let dead = &nodes[3];
    net.kill(dead.info().address);
    let refs: Vec<&Node> = nodes.iter().filter(|n| n.did() != dead.did()).collect();

    let target = nodes[4].did();
    let via = &nodes[0];
    assert_eq!(via.swarm.find(target).await?, expected_owner(&refs, target));
    Ok(())
}

#[tokio::test]
async fn test_keys_move_to_new_predecessor() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    a.swarm.create_ring()?;

    let names: Vec<String> = (0..16).map(|i| format!("doc_{i}")).collect();
    for name in names.iter() {
        a.swarm.store_file(name, vec![1, 2, 3]).await?;
    }
    assert_eq!(a.swarm.dht().bucket_list().await?.len(), names.len());

    let b = prepare_node(&net, &dir, 1, 3);
    b.swarm.join_ring(a.info().address).await?;
    let nodes = vec![a, b];
    stabilize_round(&nodes).await;
    stabilize_round(&nodes).await;

    let mut sorted: Vec<&Node> = nodes.iter().collect();
    sorted.sort_by_key(|n| n.did());
    let kept = names
        .iter()
        .filter(|name| expected_owner(&sorted, Did::from_name(name)) == nodes[0].info())
        .count();
    // Relocation runs in the background.
    for _ in 0..200 {
        if nodes[0].swarm.dht().bucket_list().await?.len() == kept {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    for name in names.iter() {
        let key = Did::from_name(name);
        let owner = expected_owner(&sorted, key);
        let (holder, other) = if owner == nodes[0].info() {
            (&nodes[0], &nodes[1])
        } else {
            (&nodes[1], &nodes[0])
        };
        assert_eq!(holder.swarm.dht().bucket_get(key).await?, Some(name.clone()));
        assert_eq!(holder.swarm.files().read(name).await?, vec![1, 2, 3]);
        assert_eq!(other.swarm.dht().bucket_get(key).await?, None);
        assert!(other.swarm.files().read(name).await.is_err());
    }
    Ok(())
}

#[tokio::test]
async fn test_notify_replies_before_relocation() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 3);
    a.swarm.create_ring()?;
    b.swarm.create_ring()?;

    let names: Vec<String> = (0..16).map(|i| format!("note_{i}")).collect();
    for name in names.iter() {
        a.swarm.store_file(name, name.as_bytes().to_vec()).await?;
    }

    let relocation = a.swarm.handle_notify(b.info()).await?;
    // The predecessor is in place as soon as the call returns.
    assert_eq!(a.predecessor(), Some(b.info()));
    relocation.expect("predecessor changed").await.unwrap();

    for name in names.iter() {
        let key = Did::from_name(name);
        let (holder, other) = if key.is_between_right_inclusive(b.did(), a.did()) {
            (&a, &b)
        } else {
            (&b, &a)
        };
        assert_eq!(holder.swarm.files().read(name).await?, name.as_bytes());
        assert_eq!(other.swarm.dht().bucket_get(key).await?, None);
    }

    // Same predecessor, nothing left to move.
    assert!(a.swarm.handle_notify(b.info()).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_store_file_rejects_bad_names() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    a.swarm.create_ring()?;
    for name in ["", "..", "a/b.txt"] {
        assert!(matches!(
            a.swarm.store_file(name, vec![]).await,
            Err(Error::InvalidFileName(_))
        ));
    }
    Ok(())
}
