use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::*;
use crate::dht::Chord;
use crate::dht::StabilizeIntervals;
use crate::dht::SuccessorWriter;

#[tokio::test]
async fn test_stabilization_two_nodes() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 3);

    a.swarm.create_ring()?;
    assert_eq!(a.successor(), a.info());

    b.swarm.join_ring(a.info().address).await?;
    assert_eq!(b.successor(), a.info());

    b.stabilizer.stabilize().await?;
    assert_eq!(a.predecessor(), Some(b.info()));

    // a leaves the singleton state through its learned predecessor
    a.stabilizer.stabilize().await?;
    assert_eq!(a.successor(), b.info());
    assert_eq!(b.predecessor(), Some(a.info()));
    assert_eq!(a.successors(), vec![b.info()]);
    assert_eq!(b.successors(), vec![a.info()]);
    Ok(())
}

#[tokio::test]
async fn test_ring_closure() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 8, 3).await;
    let refs: Vec<&Node> = nodes.iter().collect();

    for start in 0..nodes.len() {
        let visited = walk_ring(&refs, start);
        assert_eq!(visited.len(), nodes.len());
        // and back to the origin
        let last = refs.iter().find(|n| n.did() == *visited.last().unwrap()).unwrap();
        assert_eq!(last.successor(), nodes[start].info());
    }

    for (i, n) in nodes.iter().enumerate() {
        let prev = &nodes[(i + nodes.len() - 1) % nodes.len()];
        assert_eq!(n.predecessor(), Some(prev.info()));
        let expected: Vec<NodeIp> = (1..=3)
            .map(|k| nodes[(i + k) % nodes.len()].info())
            .collect();
        assert_eq!(n.successors(), expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_kill_successor_promotes_next() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 5, 3).await;

    let (n, dead, next) = (&nodes[0], &nodes[1], &nodes[2]);
    let dead_did = dead.did();
    assert_eq!(n.successor(), dead.info());
    net.kill(dead.info().address);

    n.stabilizer.stabilize().await?;
    assert_eq!(n.successor(), next.info());
    assert_eq!(n.successors().len(), 2);

    // the list is repaired to r once the survivors stabilize
    let survivors: Vec<Node> = nodes
        .into_iter()
        .filter(|x| x.did() != dead_did)
        .collect();
    for _ in 0..survivors.len() {
        stabilize_round(&survivors).await;
    }
    for (i, s) in survivors.iter().enumerate() {
        let expected: Vec<NodeIp> = (1..=3)
            .map(|k| survivors[(i + k) % survivors.len()].info())
            .collect();
        assert_eq!(s.successors(), expected);
    }
    Ok(())
}

#[tokio::test]
async fn test_successor_list_shrinks_with_ring() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let mut nodes = prepare_ring(&net, &dir, 3, 3).await;
    // a 3 node ring holds only 2 other members
    for n in nodes.iter() {
        assert_eq!(n.successors().len(), 2);
    }

    let dead = nodes.remove(1);
    net.kill(dead.info().address);
    for _ in 0..3 {
        stabilize_round(&nodes).await;
    }
    assert_eq!(nodes[0].successors(), vec![nodes[1].info()]);
    assert_eq!(nodes[1].successors(), vec![nodes[0].info()]);
    Ok(())
}

#[tokio::test]
async fn test_check_predecessor() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 3, 3).await;

    let (pred, n) = (&nodes[0], &nodes[1]);
    assert_eq!(n.predecessor(), Some(pred.info()));

    n.stabilizer.check_predecessor().await?;
    assert_eq!(n.predecessor(), Some(pred.info()));

    net.kill(pred.info().address);
    n.stabilizer.check_predecessor().await?;
    assert_eq!(n.predecessor(), None);

    // a later notify sets it again
    n.swarm.handle_notify(nodes[2].info()).await?;
    assert_eq!(n.predecessor(), Some(nodes[2].info()));
    Ok(())
}

#[tokio::test]
async fn test_notify_is_idempotent() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 3);
    a.swarm.create_ring()?;

    a.swarm.handle_notify(a.info()).await?;
    assert_eq!(a.predecessor(), None);

    a.swarm.handle_notify(b.info()).await?;
    assert_eq!(a.predecessor(), Some(b.info()));
    a.swarm.handle_notify(b.info()).await?;
    assert_eq!(a.predecessor(), Some(b.info()));
    Ok(())
}

#[tokio::test]
async fn test_fix_fingers_after_convergence() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let nodes = prepare_ring(&net, &dir, 6, 3).await;
    fix_all_fingers(&nodes).await;

    let refs: Vec<&Node> = nodes.iter().collect();
    for n in nodes.iter() {
        let finger = n.swarm.dht().lock_finger()?.clone();
        for i in [0usize, 1, 80, 150, 159] {
            let start = n.did().finger_start(i);
            assert_eq!(finger.get(i), Some(expected_owner(&refs, start)));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_capacity_mismatch_is_refused() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 2);
    a.swarm.create_ring()?;

    // join still succeeds, only the list refresh is refused
    b.swarm.join_ring(a.info().address).await?;
    assert_eq!(b.successors(), vec![a.info()]);

    let c = prepare_node(&net, &dir, 2, 3);
    a.swarm.dht().successors().update(c.info())?;
    assert!(matches!(
        b.swarm.refresh_successors(a.info()).await,
        Err(Error::SuccessorCapacityMismatch {
            local: 2,
            remote: 3
        })
    ));
    assert_eq!(b.successors(), vec![a.info()]);
    Ok(())
}

#[tokio::test]
async fn test_stabilizer_loops_stop_on_cancel() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 3);
    a.swarm.create_ring()?;
    b.swarm.join_ring(a.info().address).await?;

    let token = CancellationToken::new();
    let intervals = StabilizeIntervals {
        stabilize: Duration::from_millis(10),
        fix_fingers: Duration::from_millis(10),
        check_predecessor: Duration::from_millis(10),
    };
    let ha = tokio::spawn(Arc::new(a.stabilizer.clone()).wait(intervals, token.clone()));
    let hb = tokio::spawn(Arc::new(b.stabilizer.clone()).wait(intervals, token.clone()));

    tokio::time::sleep(Duration::from_millis(300)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(5), async {
        ha.await.unwrap();
        hb.await.unwrap();
    })
    .await
    .expect("stabilizer did not stop");

    assert_eq!(a.successor(), b.info());
    assert_eq!(b.successor(), a.info());
    assert_eq!(a.predecessor(), Some(b.info()));
    assert_eq!(b.predecessor(), Some(a.info()));
    assert_eq!(a.swarm.dht().topo_info()?.successors, vec![b.info()]);
    Ok(())
}

#[tokio::test]
async fn test_cancel_interrupts_stalled_round() -> Result<()> {
    let net = DummyNetwork::new();
    let dir = tempfile::tempdir()?;
    let a = prepare_node(&net, &dir, 0, 3);
    let b = prepare_node(&net, &dir, 1, 3);
    a.swarm.create_ring()?;
    b.swarm.join_ring(a.info().address).await?;

    // every call to a now hangs, so each round of b blocks
    net.stall(a.info().address);
    let token = CancellationToken::new();
    let intervals = StabilizeIntervals {
        stabilize: Duration::from_millis(10),
        fix_fingers: Duration::from_millis(10),
        check_predecessor: Duration::from_millis(10),
    };
    let hb = tokio::spawn(Arc::new(b.stabilizer.clone()).wait(intervals, token.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), hb)
        .await
        .expect("stabilizer did not stop")
        .unwrap();
    Ok(())
}
