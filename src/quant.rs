//! Existential quantification and the combined apply-quantify recursion
//! behind relational products.  Both require the current varset to be
//! flattened into the kernel's per-level epoch array first (see
//! [`BddKernel::quantset2cache`]), which gives O(1) membership tests and an
//! early bail-out below the deepest quantified level.

use crate::cache::{pair, triple};
use crate::construction::apply_rec;
use crate::error::BddError;
use crate::kernel::{BddKernel, BDD_FALSE, BDD_TRUE};
use crate::operator::BddOp;

pub(crate) fn quant_rec(k: &mut BddKernel, n: usize, varset: usize, op: BddOp, quantid: usize) -> Result<usize, BddError> {
    if n < 2 || k.level(n) > k.quantlast {
        return Ok(n);
    }
    let hash = pair(n, varset);
    if let Some(res) = k.quantcache.find(hash, n, varset, quantid) {
        return Ok(res);
    }
    let (n_low, n_high) = (k.low(n).unwrap(), k.high(n));
    let low = quant_rec(k, n_low, varset, op, quantid)?;
    k.push_ref(low);
    let high = quant_rec(k, n_high, varset, op, quantid)?;
    k.push_ref(high);
    let res = if k.in_varset(k.level(n)) {
        apply_rec(k, low, high, op)
    } else {
        let level = k.level(n);
        k.make_node(level, low, high)
    };
    k.pop_ref(2);
    let res = res?;
    k.quantcache.store(hash, (n, varset, quantid), res);
    Ok(res)
}

/// Applies `op` and quantifies the varset in a single bottom-up pass.  The
/// `appexid` discriminator combines the varset id and the operator so that
/// different relational products can share the cache.
pub(crate) fn appquant_rec(
    k: &mut BddKernel,
    left: usize,
    right: usize,
    varset: usize,
    op: BddOp,
    appexid: usize,
    quantid: usize,
) -> Result<usize, BddError> {
    match op {
        BddOp::And => {
            if left == BDD_FALSE || right == BDD_FALSE {
                return Ok(BDD_FALSE);
            }
            if left == right || right == BDD_TRUE {
                return quant_rec(k, left, varset, BddOp::Or, quantid);
            }
            if left == BDD_TRUE {
                return quant_rec(k, right, varset, BddOp::Or, quantid);
            }
        }
        BddOp::Or => {
            if left == BDD_TRUE || right == BDD_TRUE {
                return Ok(BDD_TRUE);
            }
            if left == right || right == BDD_FALSE {
                return quant_rec(k, left, varset, BddOp::Or, quantid);
            }
            if left == BDD_FALSE {
                return quant_rec(k, right, varset, BddOp::Or, quantid);
            }
        }
        BddOp::Xor => {
            if left == right {
                return Ok(BDD_FALSE);
            }
            if right == BDD_FALSE {
                return quant_rec(k, left, varset, BddOp::Or, quantid);
            }
            if left == BDD_FALSE {
                return quant_rec(k, right, varset, BddOp::Or, quantid);
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
        _ => {
            return Err(BddError::Internal(format!("operator {op} not supported in appquant")));
        }
    }
    if left < 2 && right < 2 {
        return Ok(op.truth_table()[left << 1 | right]);
    }
    // No variable left to quantify below this point: plain apply.
    if k.level(left) > k.quantlast && k.level(right) > k.quantlast {
        return apply_rec(k, left, right, op);
    }
    let hash = triple(left, right, appexid);
    if let Some(res) = k.appexcache.find(hash, left, right, appexid) {
        return Ok(res);
    }
    let left_level = k.level(left);
    let right_level = k.level(right);
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
    let low = appquant_rec(k, left0, right0, varset, op, appexid, quantid)?;
    k.push_ref(low);
    let high = appquant_rec(k, left1, right1, varset, op, appexid, quantid)?;
    k.push_ref(high);
    let res = if k.in_varset(level) {
        apply_rec(k, low, high, BddOp::Or)
    } else {
        k.make_node(level, low, high)
    };
    k.pop_ref(2);
    let res = res?;
    k.appexcache.store(hash, (left, right, appexid), res);
    Ok(res)
}
