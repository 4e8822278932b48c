#![warn(missing_docs)]
use std::ops::Index;

use derivative::Derivative;
use serde::Deserialize;
use serde::Serialize;

use crate::dht::Did;
use crate::dht::NodeIp;

/// Finger table of a chord node.
/// `finger[i]` approximates the successor of `did + 2^i`; entries go stale under churn
/// and are refreshed one at a time by fix-fingers.
#[derive(Derivative, Clone, Debug, Serialize, Deserialize)]
#[derivative(PartialEq)]
pub struct FingerTable {
    did: Did,
    size: usize,
    finger: Vec<Option<NodeIp>>,
    #[derivative(PartialEq = "ignore")]
    pub(super) fix_finger_index: usize,
}

impl FingerTable {
    /// builder
    pub fn new(did: Did, size: usize) -> Self {
        Self {
            did,
            size,
            finger: vec![None; size],
            fix_finger_index: 0,
        }
    }

    /// is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get first element from Finger Table
    pub fn first(&self) -> Option<NodeIp> {
        self.finger.iter().flatten().next().copied()
    }

    /// getter
    pub fn get(&self, index: usize) -> Option<NodeIp> {
        self.finger.get(index).copied().flatten()
    }

    /// ref getter
    pub fn get_ref(&self, index: usize) -> &Option<NodeIp> {
        self.finger.get(index).unwrap_or(&None)
    }

    /// setter
    pub fn set(&mut self, index: usize, node: NodeIp) {
        tracing::debug!("set finger table index: {} node: {}", index, node);
        if index >= self.finger.len() {
            tracing::error!("set finger index out of range, index: {}", index);
            return;
        }
        self.finger[index] = Some(node);
    }

    /// Point every entry to `node`, used when a node bootstraps a ring alone.
    pub fn fill(&mut self, node: NodeIp) {
        self.finger = vec![Some(node); self.size];
    }

    /// Remove a node from finger table.
    /// The run of entries pointing to it is replaced with the entry right after the run,
    /// or `None` when there is none.
    pub fn remove(&mut self, did: Did) {
        let indexes: Vec<usize> = self
            .finger
            .iter()
            .enumerate()
            .filter(|(_, x)| x.map(|n| n.did) == Some(did))
            .map(|(id, _)| id)
            .collect();

        if let (Some(first_idx), Some(last_idx)) = (indexes.first(), indexes.last()) {
            let end_idx = *last_idx + 1;
            let fix = self.get(end_idx);
            for idx in *first_idx..end_idx {
                self.finger[idx] = fix
            }
        }
    }

    /// Check finger is contains some node
    pub fn contains(&self, did: Did) -> bool {
        self.finger.iter().flatten().any(|n| n.did == did)
    }

    /// Scan from the longest reach downward and return the furthest finger strictly
    /// between self and `did`, skipping any node listed in `avoid`.
    pub fn closest_preceding_node(&self, did: Did, avoid: &[Did]) -> Option<NodeIp> {
        self.finger
            .iter()
            .rev()
            .flatten()
            .find(|n| n.did.is_between(self.did, did) && !avoid.contains(&n.did))
            .copied()
    }

    /// get length of finger
    pub fn len(&self) -> usize {
        self.finger.iter().flatten().count()
    }

    /// Size of the table, which is also the modulus of the fix finger cursor.
    pub fn size(&self) -> usize {
        self.size
    }

    /// get finger list
    pub fn list(&self) -> &Vec<Option<NodeIp>> {
        &self.finger
    }
}

impl Index<usize> for FingerTable {
    type Output = Option<NodeIp>;
    fn index(&self, index: usize) -> &Self::Output {
        self.get_ref(index)
    }
}
