//! Shannon-expansion recursions for the binary `apply`, the unary negation
//! and the if-then-else operator.  All three follow the same skeleton:
//! operator-specific terminal short-circuits, cache lookup, recursion into
//! the cofactors of the smallest level, node construction, cache store.
//! Intermediate results are pushed on the kernel reference stack so that a
//! garbage collection triggered by an inner allocation cannot reclaim them.

use crate::cache::triple;
use crate::error::BddError;
use crate::kernel::{BddKernel, BDD_FALSE, BDD_TRUE};
use crate::operator::{BddOp, OPCODE_NOT};

pub(crate) fn apply_rec(k: &mut BddKernel, left: usize, right: usize, op: BddOp) -> Result<usize, BddError> {
    match op {
        BddOp::And => {
            if left == right {
                return Ok(left);
            }
            if left == BDD_FALSE || right == BDD_FALSE {
                return Ok(BDD_FALSE);
            }
            if left == BDD_TRUE {
                return Ok(right);
            }
            if right == BDD_TRUE {
                return Ok(left);
            }
        }
        BddOp::Or => {
            if left == right {
                return Ok(left);
            }
            if left == BDD_TRUE || right == BDD_TRUE {
                return Ok(BDD_TRUE);
            }
            if left == BDD_FALSE {
                return Ok(right);
            }
            if right == BDD_FALSE {
                return Ok(left);
            }
        }
        BddOp::Xor => {
            if left == right {
                return Ok(BDD_FALSE);
            }
            if left == BDD_FALSE {
                return Ok(right);
            }
            if right == BDD_FALSE {
                return Ok(left);
            }
        }
        BddOp::Nand => {
            if left == BDD_FALSE || right == BDD_FALSE {
                return Ok(BDD_TRUE);
            }
        }
        BddOp::Nor => {
            if left == BDD_TRUE || right == BDD_TRUE {
                return Ok(BDD_FALSE);
            }
        }
        BddOp::Imp => {
            if left == BDD_FALSE || right == BDD_TRUE || left == right {
                return Ok(BDD_TRUE);
            }
            if left == BDD_TRUE {
                return Ok(right);
            }
        }
        BddOp::Biimp => {
            if left == right {
                return Ok(BDD_TRUE);
            }
            if left == BDD_TRUE {
                return Ok(right);
            }
            if right == BDD_TRUE {
                return Ok(left);
            }
        }
        BddOp::Diff => {
            if left == right || right == BDD_TRUE {
                return Ok(BDD_FALSE);
            }
            if left == BDD_FALSE {
                return Ok(right);
            }
        }
        BddOp::Less => {
            if left == right || left == BDD_TRUE {
                return Ok(BDD_FALSE);
            }
            if left == BDD_FALSE {
                return Ok(right);
            }
        }
        BddOp::Invimp => {
            if right == BDD_FALSE || left == BDD_TRUE || left == right {
                return Ok(BDD_TRUE);
            }
            if right == BDD_TRUE {
                return Ok(left);
            }
        }
    }
    if left < 2 && right < 2 {
        return Ok(op.truth_table()[left << 1 | right]);
    }
    let hash = triple(left, right, op.opcode());
    if let Some(res) = k.applycache.find(hash, left, right, op.opcode()) {
        return Ok(res);
    }
    let left_level = k.level(left);
    let right_level = k.level(right);
    // Shannon split on the smallest level; an operand above it is passed
    // unchanged to both branches.
    let level = left_level.min(right_level);
    let (left0, left1) = if left_level == level {
        (k.low(left).unwrap(), k.high(left))
    } else {
        (left, left)
    };
    let (right0, right1) = if right_level == level {
        (k.low(right).unwrap(), k.high(right))
    } else {
        (right, right)
    };
    let low = apply_rec(k, left0, right0, op)?;
    k.push_ref(low);
    let high = apply_rec(k, left1, right1, op)?;
    k.push_ref(high);
    let res = k.make_node(level, low, high);
    k.pop_ref(2);
    let res = res?;
    k.applycache.store(hash, (left, right, op.opcode()), res);
    Ok(res)
}

/// Negation as its own recursion: equivalent to swapping the two sinks,
/// cached in the apply table under the reserved unary code.
pub(crate) fn not_rec(k: &mut BddKernel, n: usize) -> Result<usize, BddError> {
    if n == BDD_FALSE {
        return Ok(BDD_TRUE);
    }
    if n == BDD_TRUE {
        return Ok(BDD_FALSE);
    }
    if let Some(res) = k.applycache.find(n, n, 0, OPCODE_NOT) {
        return Ok(res);
    }
    let (level, n_low, n_high) = (k.level(n), k.low(n).unwrap(), k.high(n));
    let low = not_rec(k, n_low)?;
    k.push_ref(low);
    let high = not_rec(k, n_high)?;
    k.push_ref(high);
    let res = k.make_node(level, low, high);
    k.pop_ref(2);
    let res = res?;
    k.applycache.store(n, (n, 0, OPCODE_NOT), res);
    Ok(res)
}

/// The false cofactor of `n` when its level `p` is the smallest of the
/// three operand levels, `n` itself otherwise.
fn ite_low(k: &BddKernel, p: usize, q: usize, r: usize, n: usize) -> usize {
    if p > q || p > r {
        n
    } else {
        k.low(n).unwrap()
    }
}

fn ite_high(k: &BddKernel, p: usize, q: usize, r: usize, n: usize) -> usize {
    if p > q || p > r {
        n
    } else {
        k.high(n)
    }
}

const fn min3(p: usize, q: usize, r: usize) -> usize {
    let m = if p < q { p } else { q };
    if m < r {
        m
    } else {
        r
    }
}

pub(crate) fn ite_rec(k: &mut BddKernel, f: usize, g: usize, h: usize) -> Result<usize, BddError> {
    if f == BDD_TRUE {
        return Ok(g);
    }
    if f == BDD_FALSE {
        return Ok(h);
    }
    if g == h {
        return Ok(g);
    }
    if g == BDD_TRUE && h == BDD_FALSE {
        return Ok(f);
    }
    if g == BDD_FALSE && h == BDD_TRUE {
        return not_rec(k, f);
    }
    let hash = triple(f, g, h);
    if let Some(res) = k.itecache.find(hash, f, g, h) {
        return Ok(res);
    }
    let p = k.level(f);
    let q = k.level(g);
    let r = k.level(h);
    let f0 = ite_low(k, p, q, r, f);
    let g0 = ite_low(k, q, p, r, g);
    let h0 = ite_low(k, r, p, q, h);
    let low = ite_rec(k, f0, g0, h0)?;
    k.push_ref(low);
    let f1 = ite_high(k, p, q, r, f);
    let g1 = ite_high(k, q, p, r, g);
    let h1 = ite_high(k, r, p, q, h);
    let high = ite_rec(k, f1, g1, h1)?;
    k.push_ref(high);
    let res = k.make_node(min3(p, q, r), low, high);
    k.pop_ref(2);
    let res = res?;
    k.itecache.store(hash, (f, g, h), res);
    Ok(res)
}
