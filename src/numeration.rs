//! The numeration engine.
//!
//! Ranks a block among all distinct rearrangements of its own symbol
//! multiset (forward), and restores the exact arrangement from a rank
//! (backward). Ranks are exchanged in a compacted form — the subnumber —
//! that exploits the bit pattern of the arrangement count to shave
//! redundant leading bits.
//!
//! Both directions share one binary merge scheme over `sigma` levels, the
//! same pairing as [`DeltaTable`]: per-position `rho` (remaining equal
//! symbols) and `theta` (inversions) values combine as
//!
//! ```text
//! rho[parent]   = rho[left] * rho[right]
//! theta[parent] = theta[left] * delta[right] + rho[left] * theta[right]
//! ```
//!
//! the rank-composition rule for concatenated order statistics generalized
//! to multisets through the multiplicative delta weights.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{CheckedSub, One, ToPrimitive, Zero};

use crate::block::Block;
use crate::delta::DeltaTable;
use crate::error::{EnumcryptError, Result};
use crate::statistics::{Statistics, ALPHABET_SIZE};

/// A block's rank `eta` among, and the count `delta` of, all distinct
/// arrangements of its symbol multiset. Invariant: `0 <= eta < delta`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Number {
    eta: BigUint,
    delta: BigUint,
}

/// Compacted re-encoding of a rank: `subset` high set bits of `delta`
/// absorbed, residue `subnum` of exactly `subnum_bit_length` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subnumber {
    subset: u32,
    subnum: BigUint,
    subnum_bit_length: usize,
}

impl Number {
    /// Builds a number from its parts. `eta` must be below `delta`.
    pub fn from_parts(eta: BigUint, delta: BigUint) -> Self {
        Number { eta, delta }
    }

    /// The rank.
    pub fn eta(&self) -> &BigUint {
        &self.eta
    }

    /// The arrangement count.
    pub fn delta(&self) -> &BigUint {
        &self.delta
    }

    /// Ranks `block` among the distinct rearrangements of its multiset.
    ///
    /// Leaf values cover all `size` slots — the zero padding tail is part
    /// of the ranked arrangement — and merge bottom-up in place against the
    /// table's delta weights. At the root, `eta = ceil(theta / rho)` and
    /// `delta = ceil(size! / rho)`.
    pub fn eval(block: &Block, statistics: &Statistics, deltas: &DeltaTable) -> Number {
        let size = block.size();
        let chars = block.chars();

        let mut rho = leaf_rho(block, statistics);
        let mut theta: Vec<BigUint> = Vec::with_capacity(size);
        for i in 0..size {
            let inversions = chars[i + 1..].iter().filter(|&&c| c < chars[i]).count();
            theta.push(BigUint::from(inversions));
        }

        for level in 1..=block.sigma() as usize {
            let cols = size >> level;
            for p in 0..cols {
                let combined = &theta[2 * p] * deltas.at(level - 1, 2 * p + 1)
                    + &rho[2 * p] * &theta[2 * p + 1];
                theta[p] = combined;
                let product = &rho[2 * p] * &rho[2 * p + 1];
                rho[p] = product;
            }
        }

        let eta = theta[0].div_ceil(&rho[0]);
        let delta = deltas.root().div_ceil(&rho[0]);
        Number { eta, delta }
    }

    /// Rebuilds `(eta, delta)` from a decoded subnumber by re-adding the
    /// `subset` absorbed powers, walking `delta`'s set bits from the top.
    pub fn restore(delta: &BigUint, subnumber: &Subnumber) -> Result<Number> {
        let mut eta = subnumber.subnum.clone();
        let mut bit_idx = delta.bits() as i64;
        while bit_idx > 0 && !delta.bit(bit_idx as u64) {
            bit_idx -= 1;
        }
        for _ in 0..subnumber.subset {
            while bit_idx >= 0 && !delta.bit(bit_idx as u64) {
                bit_idx -= 1;
            }
            if bit_idx < 0 {
                return Err(EnumcryptError::MalformedCiphertext(
                    "subset exhausts delta's set bits",
                ));
            }
            eta += BigUint::one() << (bit_idx as u64);
            bit_idx -= 1;
        }
        Ok(Number {
            eta,
            delta: delta.clone(),
        })
    }
}

impl Subnumber {
    /// Builds a subnumber from its decoded parts.
    pub fn from_parts(subset: u32, subnum: BigUint, subnum_bit_length: usize) -> Self {
        Subnumber {
            subset,
            subnum,
            subnum_bit_length,
        }
    }

    /// Count of absorbed high set bits of `delta`.
    pub fn subset(&self) -> u32 {
        self.subset
    }

    /// Residual rank magnitude.
    pub fn subnum(&self) -> &BigUint {
        &self.subnum
    }

    /// Exact transmitted bit width of the residue.
    pub fn subnum_bit_length(&self) -> usize {
        self.subnum_bit_length
    }

    /// Packs a rank by absorbing the high set bits of its `delta`.
    ///
    /// Scans `delta`'s bit positions from `bits(delta)` down to 1. Every
    /// set position whose power still fits in the residue is subtracted
    /// and counted; the position where the scan stops is the residue's
    /// exact bit width. A rank encoded at full width would waste, for each
    /// leading set bit of `delta`, headroom that can never be occupied —
    /// the stripped positions are recoverable from `delta`'s own bit
    /// pattern plus the `subset` count.
    pub fn eval(number: &Number) -> Subnumber {
        let mut subnum = number.eta.clone();
        let mut subset = 0u32;
        let mut bit_idx = number.delta.bits();
        while bit_idx != 0 {
            if number.delta.bit(bit_idx) {
                let diff = BigUint::one() << bit_idx;
                if subnum >= diff {
                    subnum -= diff;
                    subset += 1;
                } else {
                    break;
                }
            }
            bit_idx -= 1;
        }
        Subnumber {
            subset,
            subnum,
            subnum_bit_length: bit_idx as usize,
        }
    }
}

/// Re-derives the residue bit width from `(delta, subset)` alone: the
/// position of the `(subset + 1)`-th set bit of `delta`, scanning from the
/// top. The decode side never sees the width on the wire.
pub fn eval_subnum_bit_length(delta: &BigUint, subset: u32) -> Result<usize> {
    let mut bit_length = delta.bits();
    for _ in 0..=subset {
        loop {
            if bit_length == 0 {
                return Err(EnumcryptError::MalformedCiphertext(
                    "subset exhausts delta's set bits",
                ));
            }
            bit_length -= 1;
            if delta.bit(bit_length) {
                break;
            }
        }
    }
    Ok(bit_length as usize)
}

/// Per-position counts of remaining equal symbols: `rho[i]` is how many
/// slots at positions `>= i` hold the same value as slot `i`.
fn leaf_rho(block: &Block, statistics: &Statistics) -> Vec<BigUint> {
    let chars = block.chars();
    let mut remaining = *statistics.counts();
    let mut rho = Vec::with_capacity(block.size());
    for i in 0..block.size() {
        if i > 0 {
            remaining[chars[i - 1] as usize] -= 1;
        }
        rho.push(BigUint::from(remaining[chars[i] as usize]));
    }
    rho
}

/// Recomputes the root rho over `block`, which both ends derive from the
/// canonical arrangement of the same statistics.
pub fn eval_rho(block: &Block, statistics: &Statistics) -> BigUint {
    let mut rho = leaf_rho(block, statistics);
    for level in 1..=block.sigma() as usize {
        for p in 0..(block.size() >> level) {
            let product = &rho[2 * p] * &rho[2 * p + 1];
            rho[p] = product;
        }
    }
    rho.swap_remove(0)
}

/// The arrangement count implied by a root rho: `ceil(size! / rho)`.
pub fn eval_delta(rho: &BigUint, deltas: &DeltaTable) -> BigUint {
    deltas.root().div_ceil(rho)
}

/// Restores the exact original arrangement of `block` from its rank.
///
/// On entry `block` holds the canonical arrangement generated from
/// `statistics` and `rho` is the root rho over it. The engine walks the
/// merge tree top-down, computing per-subtree quotients on demand
/// (memoized in an arena of optional cells), and re-merges every completed
/// left subtree bottom-up in a binary-counter carry pattern — so restoring
/// a whole block costs O(size · sigma) big-integer operations instead of
/// the O(size²) of rebuilding the tree per symbol. Padding symbols are
/// stripped from the length after full restoration.
pub fn block_restore(
    block: &mut Block,
    statistics: &Statistics,
    rho: &BigUint,
    deltas: &DeltaTable,
    number: &Number,
) -> Result<()> {
    let sigma = block.sigma() as usize;
    let size = block.size();

    // Running prefix sums over remaining per-value counts: `thetas[v]` is
    // the number of remaining symbols with value strictly below `v`.
    let mut thetas = [0u32; ALPHABET_SIZE + 1];
    for value in 0..ALPHABET_SIZE {
        thetas[value + 1] = thetas[value] + statistics.count(value);
    }
    let length = thetas[ALPHABET_SIZE] as usize;
    block.set_length(length);

    let mut z: Vec<Vec<Option<BigUint>>> = (0..=sigma).map(|l| vec![None; size >> l]).collect();
    let mut rt: Vec<Vec<(BigUint, BigUint)>> = (0..sigma)
        .map(|l| vec![(BigUint::zero(), BigUint::zero()); (size >> l) - 1])
        .collect();

    // Seed the root quotient and divide down the left spine to position 0.
    let mut acc = rho * &number.eta;
    z[sigma][0] = Some(acc.clone());
    for level in (0..sigma).rev() {
        acc = &acc / deltas.at(level, 1);
        z[level][0] = Some(acc.clone());
    }

    for sym_idx in 0..length {
        if z[0][sym_idx].is_none() {
            eval_z(&mut z, sym_idx, sigma, &rt, deltas)?;
        }
        restore_symbol(block, sym_idx, &mut rt, deltas, &mut thetas, &z)?;
    }

    // The zero tail was restored as part of the arrangement; only genuine
    // content counts toward the block length.
    block.set_length(length - statistics.padding());
    Ok(())
}

/// Computes the leaf quotient for `sym_idx` by walking up to the nearest
/// memoized ancestor and filling the path back down.
fn eval_z(
    z: &mut [Vec<Option<BigUint>>],
    sym_idx: usize,
    sigma: usize,
    rt: &[Vec<(BigUint, BigUint)>],
    deltas: &DeltaTable,
) -> Result<()> {
    let mut indexes = vec![0usize; sigma + 1];
    indexes[0] = sym_idx;
    let mut level = 0;
    for l in 1..=sigma {
        indexes[l] = indexes[l - 1] / 2;
        level = l;
        if z[l][indexes[l]].is_some() {
            break;
        }
    }

    while level > 0 {
        level -= 1;
        let idx = indexes[level];
        let parent = z[level + 1][indexes[level + 1]]
            .as_ref()
            .expect("ancestor quotient not computed")
            .clone();
        let value = if idx % 2 == 1 {
            // Odd child: peel off the completed left sibling's contribution.
            let (left_rho, left_theta) = &rt[level][idx - 1];
            let reduced = parent
                .checked_sub(&(left_theta * deltas.at(level, idx)))
                .ok_or(EnumcryptError::MalformedCiphertext(
                    "rank exceeds the arrangement bounds",
                ))?;
            &reduced / left_rho
        } else {
            &parent / deltas.at(level, idx + 1)
        };
        z[level][idx] = Some(value);
    }
    Ok(())
}

/// Identifies the symbol at `sym_idx` from its leaf quotient, then folds
/// the completed position into the running merge state.
fn restore_symbol(
    block: &mut Block,
    sym_idx: usize,
    rt: &mut [Vec<(BigUint, BigUint)>],
    deltas: &DeltaTable,
    thetas: &mut [u32; ALPHABET_SIZE + 1],
    z: &[Vec<Option<BigUint>>],
) -> Result<()> {
    let sigma = block.sigma() as usize;
    let leaf = z[0][sym_idx]
        .as_ref()
        .expect("leaf quotient not computed")
        .to_u64()
        .ok_or(EnumcryptError::MalformedCiphertext(
            "rank exceeds the arrangement bounds",
        ))?;

    // The symbol value owns the half-open interval [thetas[v], thetas[v+1])
    // containing the leaf quotient.
    let mut found = None;
    for value in 0..ALPHABET_SIZE {
        if leaf >= thetas[value] as u64 && leaf < thetas[value + 1] as u64 {
            found = Some(value);
            break;
        }
    }
    let value = found.ok_or(EnumcryptError::MalformedCiphertext(
        "no symbol interval contains the rank quotient",
    ))?;
    block.chars_mut()[sym_idx] = value as u8;

    if sym_idx + 1 < block.length() {
        rt[0][sym_idx] = (
            BigUint::from(thetas[value + 1] - thetas[value]),
            BigUint::from(thetas[value]),
        );
        // Binary-counter carry: every completed right child folds into its
        // parent, making the parent available to later lazy lookups.
        let mut k = sym_idx;
        let mut l = 0;
        while k % 2 == 1 && l + 1 < sigma {
            let (lower, upper) = rt.split_at_mut(l + 1);
            let (left_rho, left_theta) = &lower[l][k - 1];
            let (right_rho, right_theta) = &lower[l][k];
            upper[0][k / 2] = (
                left_rho * right_rho,
                left_theta * deltas.at(l, k) + left_rho * right_theta,
            );
            k /= 2;
            l += 1;
        }
    }

    // One instance of `value` is consumed; every boundary above it shifts.
    for boundary in thetas[value + 1..].iter_mut() {
        *boundary -= 1;
    }
    Ok(())
}
