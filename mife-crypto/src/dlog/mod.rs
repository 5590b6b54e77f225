//! Bounded discrete logarithm: find `e ∈ [lo, hi]` with `e·g = a`.
//!
//! Small ranges are scanned linearly. Larger ranges use Pollard's kangaroo method with
//! a fresh random jump table per attempt, falling back to a full scan when every
//! attempt misses.

use num_bigint::{BigInt, BigUint};
use num_traits::ToPrimitive;
use rand::CryptoRng;
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use crate::errors::MifeCryptoError;
use crate::group::Group;
use crate::sampling::random_below;

/// Ranges narrower than this are solved by brute force.
pub const BRUTE_FORCE_THRESHOLD: u64 = 1000;
/// Kangaroo attempts before falling back to a full scan.
pub const KANGAROO_ATTEMPTS: usize = 10;

/// Searches `[lo, hi]` linearly for `e` with `e·g = a`.
pub fn discrete_log_bound_brute<G: Group>(
    group: &G,
    a: &G::Elem,
    g: &G::Elem,
    bound: (i64, i64),
) -> Result<i64, MifeCryptoError> {
    let (lo, hi) = bound;
    let not_found = MifeCryptoError::DiscreteLogNotFound { lo, hi };
    if lo > hi {
        return Err(not_found);
    }

    let mut current = group.scalar_mul(g, &BigInt::from(lo));
    let mut e = lo;
    loop {
        if &current == a {
            return Ok(e);
        }
        if e == hi {
            return Err(not_found);
        }
        current = group.add(&current, g);
        e += 1;
    }
}

/// Jump-table index of an element: the first 8 bytes of SHA-256 over its canonical
/// encoding, reduced modulo the table size.
fn jump_index<G: Group>(group: &G, elem: &G::Elem, table_size: usize) -> usize {
    let digest = Sha256::digest(group.to_bytes(elem));
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % table_size as u64) as usize
}

struct JumpTable<G: Group> {
    distances: Vec<u64>,
    steps: Vec<G::Elem>,
}

impl<G: Group> JumpTable<G> {
    fn sample<R: CryptoRng + ?Sized>(group: &G, g: &G::Elem, n: u64, rng: &mut R) -> Self {
        let mut size = 1usize;
        while (1u64 << size) < n {
            size += 1;
        }
        let span = BigUint::from(n - 1);
        let distances: Vec<u64> = (0..size)
            .map(|_| 1 + random_below(&span, rng).to_u64().unwrap_or(0))
            .collect();
        let steps = distances
            .iter()
            .map(|&r| group.scalar_mul(g, &BigInt::from(r)))
            .collect();
        Self { distances, steps }
    }

    fn jump(&self, group: &G, elem: &G::Elem) -> (u64, G::Elem) {
        let i = jump_index(group, elem, self.distances.len());
        (self.distances[i], group.add(elem, &self.steps[i]))
    }
}

/// One kangaroo attempt. Returns `None` if the wild kangaroo walked past `lo` without
/// landing on the tame trap.
fn kangaroo_attempt<G: Group, R: CryptoRng + ?Sized>(
    group: &G,
    a: &G::Elem,
    g: &G::Elem,
    (lo, hi): (i64, i64),
    n: u64,
    rng: &mut R,
) -> Option<i64> {
    let table = JumpTable::sample(group, g, n, rng);

    // The tame kangaroo starts at hi and lays the trap after n jumps.
    let mut tame = group.scalar_mul(g, &BigInt::from(hi));
    let mut c = hi as i128;
    for _ in 0..n {
        let (dist, next) = table.jump(group, &tame);
        tame = next;
        c += dist as i128;
    }

    let mut wild = a.clone();
    let mut d: i128 = 0;
    while c - d >= lo as i128 {
        if (hi as i128) > c - d && wild == tame {
            return Some((c - d) as i64);
        }
        let (dist, next) = table.jump(group, &wild);
        wild = next;
        d += dist as i128;
    }
    None
}

/// Finds `e ∈ [lo, hi]` with `e·g = a`.
///
/// # Errors
///
/// Returns `MifeCryptoError::DiscreteLogNotFound` if no exponent in the range matches.
/// The solver never returns a value outside the bound.
pub fn discrete_log_bound<G: Group, R: CryptoRng + ?Sized>(
    group: &G,
    a: &G::Elem,
    g: &G::Elem,
    bound: (i64, i64),
    rng: &mut R,
) -> Result<i64, MifeCryptoError> {
    let (lo, hi) = bound;
    if lo > hi {
        return Err(MifeCryptoError::DiscreteLogNotFound { lo, hi });
    }
    let width = (hi as i128 - lo as i128) as u64;
    if width < BRUTE_FORCE_THRESHOLD {
        return discrete_log_bound_brute(group, a, g, bound);
    }

    if a == &group.scalar_mul(g, &BigInt::from(hi)) {
        return Ok(hi);
    }

    let n = width.isqrt() + 1;
    for attempt in 0..KANGAROO_ATTEMPTS {
        if let Some(e) = kangaroo_attempt(group, a, g, bound, n, rng) {
            debug!(attempt, "kangaroo found discrete log");
            return Ok(e);
        }
        trace!(attempt, "kangaroo attempt missed");
    }

    warn!(lo, hi, "kangaroo exhausted, falling back to brute force");
    discrete_log_bound_brute(group, a, g, bound)
}
