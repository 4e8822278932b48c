//! Stabilization run daemons to maintain dht.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::FutureExt;
use futures::pin_mut;
use futures::select;
use futures_timer::Delay;
use tokio_util::sync::CancellationToken;

use crate::dht::successor::SuccessorReader;
use crate::dht::Chord;
use crate::dht::PeerRing;
use crate::dht::PeerRingAction;
use crate::dht::PeerRingRemoteAction;
use crate::error::Error;
use crate::error::Result;
use crate::swarm::Swarm;

/// Periods of the three maintenance tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StabilizeIntervals {
    /// Period of [Stabilizer::stabilize].
    pub stabilize: Duration,
    /// Period of [Stabilizer::fix_fingers].
    pub fix_fingers: Duration,
    /// Period of [Stabilizer::check_predecessor].
    pub check_predecessor: Duration,
}

/// The stabilization runner.
#[derive(Clone)]
pub struct Stabilizer {
    swarm: Arc<Swarm>,
    dht: Arc<PeerRing>,
}

impl Stabilizer {
    /// Create a new stabilization runner.
    pub fn new(swarm: Arc<Swarm>) -> Self {
        let dht = swarm.dht();
        Self { swarm, dht }
    }

    /// Reconcile the successor with the predecessor of the successor, refresh the
    /// successor list from it and notify it.
    pub async fn stabilize(&self) -> Result<()> {
        let node = self.dht.node;
        let mut succ = self.dht.successors().head()?;

        if succ.did == node.did {
            // Singleton ring, a learned predecessor is the only other member we know.
            let Some(pred) = *self.dht.lock_predecessor()? else {
                return Ok(());
            };
            tracing::info!("STABILIZATION leaving singleton ring, successor {}", pred);
            self.dht.set_successor(pred)?;
            succ = pred;
        } else {
            match self.swarm.transport.find_predecessor(succ.address).await {
                Ok(Some(x)) if x.did.is_between(node.did, succ.did) => {
                    // The successor may still point to a dead predecessor.
                    if self.swarm.transport.ping(x.address).await.is_ok() {
                        tracing::info!("STABILIZATION successor {} replaced by {}", succ, x);
                        self.dht.set_successor(x)?;
                        succ = x;
                    } else {
                        tracing::debug!("STABILIZATION ignore unreachable candidate {}", x);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("STABILIZATION successor {} unreachable: {}", succ, e);
                    self.dht.remove(succ.did)?;
                    return Ok(());
                }
            }
        }

        if let Err(e) = self.swarm.refresh_successors(succ).await {
            tracing::warn!("STABILIZATION refresh successor list from {}: {}", succ, e);
        }
        if let Err(e) = self.swarm.transport.notify(succ.address, node).await {
            tracing::warn!("STABILIZATION notify {}: {}", succ, e);
        }
        Ok(())
    }

    /// Refresh one finger entry with a full lookup.
    pub async fn fix_fingers(&self) -> Result<()> {
        match self.dht.fix_fingers()? {
            PeerRingAction::RemoteAction(
                _,
                PeerRingRemoteAction::FindSuccessorForFix { index, target },
            ) => match self.swarm.find(target).await {
                Ok(n) => {
                    tracing::trace!("STABILIZATION fix_fingers: finger[{}] = {}", index, n);
                    self.dht.set_finger(index, n)
                }
                Err(e) => {
                    tracing::debug!("STABILIZATION fix_fingers {} skipped: {}", index, e);
                    Ok(())
                }
            },
            act => {
                tracing::error!("Invalid PeerRing Action");
                Err(Error::PeerRingUnexpectedAction(act))
            }
        }
    }

    /// Forget the predecessor if it cannot be reached.
    pub async fn check_predecessor(&self) -> Result<()> {
        let Some(pred) = *self.dht.lock_predecessor()? else {
            return Ok(());
        };
        if let Err(e) = self.swarm.transport.ping(pred.address).await {
            if self.dht.clear_predecessor_if(pred.did)? {
                tracing::info!("STABILIZATION predecessor {} cleared: {}", pred, e);
            }
        }
        Ok(())
    }

    /// Run the three maintenance tasks on their own timers until `token` is cancelled.
    pub async fn wait(self: Arc<Self>, intervals: StabilizeIntervals, token: CancellationToken) {
        futures::join!(
            tick(
                "stabilize",
                intervals.stabilize,
                token.clone(),
                || self.stabilize()
            ),
            tick(
                "fix fingers",
                intervals.fix_fingers,
                token.clone(),
                || self.fix_fingers()
            ),
            tick(
                "check predecessor",
                intervals.check_predecessor,
                token.clone(),
                || self.check_predecessor()
            ),
        );
        tracing::info!("STABILIZATION stopped");
    }
}

async fn tick<F, Fut>(name: &str, interval: Duration, token: CancellationToken, f: F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    loop {
        let timeout = Delay::new(interval).fuse();
        let cancelled = token.cancelled().fuse();
        pin_mut!(timeout, cancelled);
        select! {
            _ = cancelled => break,
            _ = timeout => {}
        }

        // A round may wait on several call timeouts, stop in the middle of it.
        let round = f().fuse();
        pin_mut!(round);
        select! {
            _ = cancelled => break,
            ret = round => ret.unwrap_or_else(|e| tracing::error!("failed to {} {:?}", name, e)),
        }
    }
}
