//! Variable renaming.  A [`BddReplacer`] maps levels to levels; applying it
//! may move a variable past its neighbours, so the rebuilt tree is
//! re-normalized by `correctify` to restore the ordering invariant.

use crate::error::BddError;
use crate::kernel::{BddKernel, CACHEID_REPLACE};

/// A variable substitution, built with
/// [`Bdd::new_replacer`][crate::Bdd::new_replacer] and applied with
/// [`Bdd::replace`][crate::Bdd::replace].
#[derive(Debug, Clone)]
pub struct BddReplacer {
    /// Unique identifier, used to keep cached results of different
    /// replacers apart.
    id: usize,
    /// Maps the level of an old variable to the level of its image;
    /// identity outside the substitution's domain.
    image: Vec<usize>,
    /// Highest level in the substitution's domain.
    last: usize,
}

impl BddReplacer {
    pub(crate) fn build(varnum: usize, id: usize, oldvars: &[usize], newvars: &[usize]) -> Result<Self, BddError> {
        if oldvars.len() != newvars.len() {
            return Err(BddError::Config("unmatched length of variable slices".to_string()));
        }
        let mut image: Vec<usize> = (0..varnum).collect();
        let mut domain = vec![false; varnum];
        let mut last = 0;
        for (&old, &new) in oldvars.iter().zip(newvars) {
            if old >= varnum {
                return Err(BddError::Config(format!("invalid variable in oldvars ({old})")));
            }
            if new >= varnum {
                return Err(BddError::Config(format!("invalid variable in newvars ({new})")));
            }
            if domain[old] {
                return Err(BddError::Config(format!("duplicate variable ({old}) in oldvars")));
            }
            domain[old] = true;
            image[old] = new;
            last = last.max(old);
        }
        for &new in newvars {
            if image[new] != new {
                return Err(BddError::Config(format!("variable in newvars ({new}) also occurs in oldvars")));
            }
        }
        Ok(Self { id, image, last })
    }

    pub(crate) const fn id(&self) -> usize {
        self.id
    }

    /// Returns the image of `level` and whether the level lies within the
    /// substitution's domain (descendant levels included).
    pub(crate) fn map(&self, level: usize) -> (usize, bool) {
        if level > self.last {
            (level, false)
        } else {
            (self.image[level], true)
        }
    }
}

/// Composes the next replacer id for an engine.
pub(crate) const fn compose_replacer_id(count: usize) -> usize {
    (count << 2) | CACHEID_REPLACE
}

pub(crate) fn replace_rec(k: &mut BddKernel, n: usize, r: &BddReplacer) -> Result<usize, BddError> {
    let (image, changed) = r.map(k.level(n));
    if !changed {
        return Ok(n);
    }
    if let Some(res) = k.replacecache.find(n, n, 0, r.id()) {
        return Ok(res);
    }
    let (n_low, n_high) = (k.low(n).unwrap(), k.high(n));
    let low = replace_rec(k, n_low, r)?;
    k.push_ref(low);
    let high = replace_rec(k, n_high, r)?;
    k.push_ref(high);
    let res = correctify(k, image, low, high);
    k.pop_ref(2);
    let res = res?;
    k.replacecache.store(n, (n, 0, r.id()), res);
    Ok(res)
}

/// Rebuilds `ite(level, high, low)` on top of two subtrees whose roots may
/// have been renamed past `level`.  The fast path applies when `level` is
/// still strictly above both children; a level collision along one path is
/// an error, and otherwise the smaller child level becomes the new pivot.
fn correctify(k: &mut BddKernel, level: usize, low: usize, high: usize) -> Result<usize, BddError> {
    let low_level = k.level(low);
    let high_level = k.level(high);
    if level < low_level && level < high_level {
        return k.make_node(level, low, high);
    }
    if level == low_level || level == high_level {
        return Err(BddError::Internal(format!(
            "replace produced level {level} twice along one path (low {low}:{low_level}, high {high}:{high_level})"
        )));
    }
    let res = if low_level == high_level {
        let (low0, low1) = (k.low(low).unwrap(), k.high(low));
        let (high0, high1) = (k.low(high).unwrap(), k.high(high));
        let left = correctify(k, level, low0, high0)?;
        k.push_ref(left);
        let right = correctify(k, level, low1, high1)?;
        k.push_ref(right);
        k.make_node(low_level, left, right)
    } else if low_level < high_level {
        let (low0, low1) = (k.low(low).unwrap(), k.high(low));
        let left = correctify(k, level, low0, high)?;
        k.push_ref(left);
        let right = correctify(k, level, low1, high)?;
        k.push_ref(right);
        k.make_node(low_level, left, right)
    } else {
        let (high0, high1) = (k.low(high).unwrap(), k.high(high));
        let left = correctify(k, level, low, high0)?;
        k.push_ref(left);
        let right = correctify(k, level, low, high1)?;
        k.push_ref(right);
        k.make_node(high_level, left, right)
    };
    k.pop_ref(2);
    res
}

#[cfg(test)]
mod tests {
    use super::BddReplacer;
    use crate::error::BddError;

    #[test]
    fn test_identity_outside_domain() {
        let r = BddReplacer::build(6, 4, &[1, 3], &[2, 4]).unwrap();
        assert_eq!(r.map(0), (0, true));
        assert_eq!(r.map(1), (2, true));
        assert_eq!(r.map(3), (4, true));
        assert_eq!(r.map(5), (5, false));
        assert_eq!(r.map(6), (6, false));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(BddReplacer::build(4, 4, &[0, 1], &[2]), Err(BddError::Config(_))));
        assert!(matches!(BddReplacer::build(4, 4, &[0, 0], &[2, 3]), Err(BddError::Config(_))));
        assert!(matches!(BddReplacer::build(4, 4, &[7], &[2]), Err(BddError::Config(_))));
        assert!(matches!(BddReplacer::build(4, 4, &[0], &[7]), Err(BddError::Config(_))));
        // a new variable that is also renamed away
        assert!(matches!(BddReplacer::build(4, 4, &[0, 1], &[1, 2]), Err(BddError::Config(_))));
    }
}
