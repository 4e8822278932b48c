#![warn(missing_docs)]

//! Identifier of the chord ring.
//!
//! A [Did] is a point of the cyclic group Z/(2^160), stored as an H160.
//! Nodes and stored keys are both mapped onto the ring with SHA-1, so the
//! identifier of a node and the identifier of a file name share one space.
//!
//! Identifiers have no total order on a ring, so every "is x between a and b"
//! question is answered with modular distances, see [Did::is_between] and
//! [Did::is_between_right_inclusive]. A key equal to a node identifier is owned
//! by that node: a node is responsible for `(predecessor, self]`.

use std::cmp::PartialEq;
use std::ops::Add;
use std::ops::Deref;
use std::ops::Neg;
use std::ops::Sub;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use sha1::Digest;
use sha1::Sha1;

use crate::consts::ID_BITS;
use crate::consts::ID_HEX_LEN;
use crate::error::Error;
use crate::error::Result;

/// Did is a finite ring R(P) where P = 2^160, wrap H160.
/// Serialized as its [std::fmt::Display] form, 40 hex characters without prefix.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Hash, Default)]
pub struct Did(H160);

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = &self.0;
        write!(f, "{inner:x}")
    }
}

impl std::fmt::Debug for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Did({self})")
    }
}

/// Bias Did is a Did observed from a reference point.
/// Two Dids on a ring cannot be ordered directly, but their clockwise distances from
/// a chosen `bias` can. BiasId treats `bias` as the zero point of the ring.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, Hash)]
pub struct BiasId {
    /// the zero point for determine order of Did.
    bias: Did,
    /// did data without bias.
    did: Did,
}

impl BiasId {
    /// Wrap a Did into BiasDid with given bias.
    pub fn new(bias: Did, did: Did) -> BiasId {
        BiasId {
            bias,
            did: did - bias,
        }
    }

    /// Get wrapped biased value from did
    pub fn to_did(self) -> Did {
        self.did + self.bias
    }
}

impl PartialOrd for BiasId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BiasId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if other.bias != self.bias {
            let did: Did = other.into();
            let bid = BiasId::new(self.bias, did);
            self.did.cmp(&bid.did)
        } else {
            self.did.cmp(&other.did)
        }
    }
}

impl From<BiasId> for Did {
    fn from(id: BiasId) -> Did {
        BiasId::to_did(id)
    }
}

impl From<&BiasId> for Did {
    fn from(id: &BiasId) -> Did {
        BiasId::to_did(*id)
    }
}

fn ring_modulus() -> BigUint {
    BigUint::from(2u16).pow(ID_BITS as u32)
}

impl Did {
    /// Hash a name (node address or file name) onto the ring with SHA-1.
    pub fn from_name(name: &str) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(name.as_bytes());
        let bytes = hasher.finalize();
        Self(H160::from_slice(bytes.as_slice()))
    }

    /// Parse a bare 40 characters hex identifier, as given on the command line.
    /// Unlike [FromStr], the `0x` prefix is not accepted.
    pub fn from_hex_strict(s: &str) -> Result<Self> {
        if s.len() != ID_HEX_LEN {
            return Err(Error::BadIdentifierLength {
                expected: ID_HEX_LEN,
                got: s.len(),
            });
        }
        let bytes = hex::decode(s).map_err(|_| Error::BadHexIdentifier(s.to_string()))?;
        Ok(Self(H160::from_slice(&bytes)))
    }

    /// Start of the `i`-th finger: `(self + 2^i) mod 2^160`.
    pub fn finger_start(&self, i: usize) -> Self {
        *self + Did::from(BigUint::from(2u16).pow(i as u32))
    }

    /// Transform Did to BiasDid
    pub fn bias(&self, did: Self) -> BiasId {
        BiasId::new(did, *self)
    }

    /// Test x <- (a, b) on the ring.
    /// With a == b the interval is the whole ring but `a` itself.
    pub fn is_between(&self, a: Self, b: Self) -> bool {
        let (x, b) = (*self - a, b - a);
        let zero = Did::default();
        if b == zero {
            return x != zero;
        }
        x != zero && x < b
    }

    /// Test x <- (a, b] on the ring.
    /// With a == b the interval is the whole ring.
    pub fn is_between_right_inclusive(&self, a: Self, b: Self) -> bool {
        let (x, b) = (*self - a, b - a);
        let zero = Did::default();
        if b == zero {
            return true;
        }
        x != zero && x <= b
    }
}

impl Serialize for Did {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where S: Serializer {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Did {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where D: Deserializer<'de> {
        let s = String::deserialize(deserializer)?;
        Did::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl Deref for Did {
    type Target = H160;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Did> for H160 {
    fn from(a: Did) -> Self {
        a.0.to_owned()
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(did.as_bytes())
    }
}

impl From<BigUint> for Did {
    fn from(a: BigUint) -> Self {
        let ff = a % ring_modulus();
        let va: Vec<u8> = ff.to_bytes_be();
        let mut res = [0u8; 20];
        res[20 - va.len()..].copy_from_slice(&va);
        Self(H160::from(res))
    }
}

impl From<u32> for Did {
    fn from(id: u32) -> Did {
        Self::from(BigUint::from(id))
    }
}

impl From<H160> for Did {
    fn from(addr: H160) -> Self {
        Self(addr)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(
            H160::from_str(s).map_err(|_| Error::BadHexIdentifier(s.to_string()))?,
        ))
    }
}

// impl Finite Ring For Did
impl Neg for Did {
    type Output = Self;
    fn neg(self) -> Self {
        let ret = ring_modulus() - BigUint::from(self);
        ret.into()
    }
}

impl<'a> Neg for &'a Did {
    type Output = Did;

    fn neg(self) -> Self::Output {
        (*self).neg()
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        ((BigUint::from(self) + BigUint::from(rhs)) % ring_modulus()).into()
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}
