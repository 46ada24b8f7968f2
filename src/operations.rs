//! Counting and model queries that recurse over a finished BDD: satisfying
//! assignment counting with arbitrary precision, a single-model query and
//! the support cube.  Assignment and node enumeration live on the engine
//! facade because their callbacks may re-enter the engine.

use std::collections::HashMap;

use num_bigint::{BigUint, ToBigUint};

use crate::error::BddError;
use crate::kernel::{BddKernel, BDD_FALSE, BDD_TRUE};

/// Number of assignments over all variables satisfying `n`.  The weight of
/// an edge skipping `d` levels is `2^d`; the final result accounts for the
/// levels above the root.
pub(crate) fn sat_count(k: &BddKernel, n: usize) -> BigUint {
    let mut memo = HashMap::new();
    let above_root = 2.to_biguint().unwrap().pow(k.level(n) as u32);
    above_root * sat_count_rec(k, n, &mut memo)
}

fn sat_count_rec(k: &BddKernel, n: usize, memo: &mut HashMap<usize, BigUint>) -> BigUint {
    if n < 2 {
        return n.to_biguint().unwrap();
    }
    if let Some(count) = memo.get(&n) {
        return count.clone();
    }
    let level = k.level(n);
    let low = k.low(n).unwrap();
    let high = k.high(n);
    let mut count = 2.to_biguint().unwrap().pow((k.level(low) - level - 1) as u32) * sat_count_rec(k, low, memo);
    count += 2.to_biguint().unwrap().pow((k.level(high) - level - 1) as u32) * sat_count_rec(k, high, memo);
    memo.insert(n, count.clone());
    count
}

/// Builds a cube describing one satisfying assignment of `n`, or returns
/// the false sink if there is none.  Prefers the low branch where possible.
pub(crate) fn sat_one(k: &mut BddKernel, n: usize) -> Result<usize, BddError> {
    if n < 2 {
        return Ok(n);
    }
    k.init_ref();
    sat_one_rec(k, n)
}

fn sat_one_rec(k: &mut BddKernel, n: usize) -> Result<usize, BddError> {
    if n < 2 {
        return Ok(n);
    }
    let (level, n_low, n_high) = (k.level(n), k.low(n).unwrap(), k.high(n));
    let node = if n_low == BDD_FALSE {
        let res = sat_one_rec(k, n_high)?;
        k.make_node(level, BDD_FALSE, res)?
    } else {
        let res = sat_one_rec(k, n_low)?;
        k.make_node(level, res, BDD_FALSE)?
    };
    Ok(k.push_ref(node))
}

/// The set of variables `n` depends on, as a positive cube.
pub(crate) fn support(k: &mut BddKernel, n: usize) -> Result<usize, BddError> {
    if n < 2 {
        return Ok(BDD_FALSE);
    }
    let mut levels = Vec::new();
    support_rec(k, n, &mut levels);
    k.unmark_rec(n);
    // Distinct levels in descending order, so the cube can be built
    // bottom-up.
    levels.sort_unstable_by(|a, b| b.cmp(a));
    levels.dedup();
    k.init_ref();
    let mut res = BDD_TRUE;
    for level in levels {
        k.push_ref(res);
        let node = k.make_node(level, BDD_FALSE, res);
        k.pop_ref(1);
        res = node?;
    }
    Ok(res)
}

fn support_rec(k: &mut BddKernel, n: usize, levels: &mut Vec<usize>) {
    if n < 2 || k.marked(n) || k.low(n).is_none() {
        return;
    }
    levels.push(k.level(n));
    k.set_mark(n);
    let (n_low, n_high) = (k.low(n).unwrap(), k.high(n));
    support_rec(k, n_low, levels);
    support_rec(k, n_high, levels);
}
