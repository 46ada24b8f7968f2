//! The user-facing engine.  A [`Bdd`] owns the shared node table through a
//! reference-counted cell; every [`BddNode`] handle keeps the engine alive
//! and contributes one external reference to its node, released again when
//! the handle is dropped.  Operations that fail return `None` and record
//! the cause in the engine's sticky error state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigUint;

use crate::config::BddConfig;
use crate::construction::{apply_rec, ite_rec, not_rec};
use crate::error::BddError;
use crate::kernel::{BddKernel, BddStatistics, BDD_FALSE, BDD_TRUE, CACHEID_APPEX, CACHEID_EXIST};
use crate::operations;
use crate::operator::BddOp;
use crate::quant::{appquant_rec, quant_rec};
use crate::replace::{compose_replacer_id, replace_rec, BddReplacer};

/// A BDD engine over a fixed number of Boolean variables.
///
/// All nodes live in one shared, hash-consed table, so two handles of the
/// same engine represent the same Boolean function if and only if they are
/// [equal][Bdd::equal].  The engine is single-threaded; independent engines
/// share no state.
pub struct Bdd {
    kernel: Rc<RefCell<BddKernel>>,
}

/// An external reference to a node of a [`Bdd`] engine.
///
/// A handle pins its node (and everything reachable from it) across garbage
/// collections.  Cloning a handle adds another reference, dropping one
/// releases it; a node only reachable through dropped handles is reclaimed
/// by the next collection.
pub struct BddNode {
    index: usize,
    kernel: Rc<RefCell<BddKernel>>,
}

impl BddNode {
    /// The id of the referenced node.  Ids are dense and stable while the
    /// node is alive, but slots are reused after reclamation.
    pub fn id(&self) -> usize {
        self.index
    }
}

impl Clone for BddNode {
    fn clone(&self) -> Self {
        self.kernel.borrow_mut().inc_ref(self.index);
        Self { index: self.index, kernel: Rc::clone(&self.kernel) }
    }
}

impl Drop for BddNode {
    fn drop(&mut self) {
        self.kernel.borrow_mut().dec_ref(self.index);
    }
}

impl PartialEq for BddNode {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && Rc::ptr_eq(&self.kernel, &other.kernel)
    }
}

impl Eq for BddNode {}

impl fmt::Debug for BddNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BddNode({})", self.index)
    }
}

impl Bdd {
    /// Creates an engine with `varnum` variables and default settings.
    pub fn new(varnum: usize) -> Result<Self, BddError> {
        Self::with_config(varnum, &BddConfig::new())
    }

    /// Creates an engine with `varnum` variables and the given settings.
    ///
    /// Besides the two constants, the engine eagerly allocates and pins the
    /// positive and negative literal of every variable.
    pub fn with_config(varnum: usize, config: &BddConfig) -> Result<Self, BddError> {
        let kernel = BddKernel::new(varnum, config)?;
        Ok(Self { kernel: Rc::new(RefCell::new(kernel)) })
    }

    /// The number of variables of this engine.
    pub fn varnum(&self) -> usize {
        self.kernel.borrow().varnum
    }

    // ----- error state -----------------------------------------------------

    /// Returns the sticky error message, or `None` while no operation has
    /// failed.  The error never clears; a failed engine must be replaced.
    pub fn error(&self) -> Option<String> {
        self.kernel.borrow().error.as_ref().map(BddError::to_string)
    }

    fn sticky(&self) -> Option<BddError> {
        self.kernel.borrow().error.clone()
    }

    /// Whether any operation on this engine has failed.
    pub fn errored(&self) -> bool {
        self.kernel.borrow().error.is_some()
    }

    fn fail(&self, err: &BddError) -> Option<BddNode> {
        self.kernel.borrow_mut().set_error(err);
        None
    }

    /// Validates an operand handle and unwraps its id.
    fn checked(&self, n: &BddNode) -> Result<usize, BddError> {
        if !Rc::ptr_eq(&self.kernel, &n.kernel) {
            return Err(BddError::Operand(format!("node {} belongs to a different engine", n.index)));
        }
        self.kernel.borrow().check_node(n.index)?;
        Ok(n.index)
    }

    /// Wraps a result id into an owning handle.
    fn retnode(&self, n: usize) -> BddNode {
        self.kernel.borrow_mut().inc_ref(n);
        BddNode { index: n, kernel: Rc::clone(&self.kernel) }
    }

    // ----- constants and literals ------------------------------------------

    /// The constant true function.
    pub fn verum(&self) -> BddNode {
        BddNode { index: BDD_TRUE, kernel: Rc::clone(&self.kernel) }
    }

    /// The constant false function.
    pub fn falsum(&self) -> BddNode {
        BddNode { index: BDD_FALSE, kernel: Rc::clone(&self.kernel) }
    }

    /// The constant function for `value`.
    pub fn constant(&self, value: bool) -> BddNode {
        if value {
            self.verum()
        } else {
            self.falsum()
        }
    }

    /// The positive literal of variable `i`, i.e. the function that is true
    /// iff variable `i` is true.
    pub fn ithvar(&self, i: usize) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = {
            let k = self.kernel.borrow();
            if i >= k.varnum {
                drop(k);
                return self.fail(&BddError::Operand(format!("unknown variable ({i})")));
            }
            k.vars[2 * i]
        };
        Some(self.retnode(id))
    }

    /// The negative literal of variable `i`.
    pub fn nithvar(&self, i: usize) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = {
            let k = self.kernel.borrow();
            if i >= k.varnum {
                drop(k);
                return self.fail(&BddError::Operand(format!("unknown variable ({i})")));
            }
            k.vars[2 * i + 1]
        };
        Some(self.retnode(id))
    }

    // ----- node inspection -------------------------------------------------

    /// The variable labeling the root of `n`; constants have none.
    pub fn var(&self, n: &BddNode) -> Option<usize> {
        if self.errored() {
            return None;
        }
        match self.checked(n) {
            Ok(id) if id >= 2 => Some(self.kernel.borrow().level(id)),
            Ok(id) => {
                self.fail(&BddError::Operand(format!("constant node ({id}) has no variable")));
                None
            }
            Err(e) => {
                self.fail(&e);
                None
            }
        }
    }

    /// The false branch of `n`; constants have none.
    pub fn low(&self, n: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        match self.checked(n) {
            Ok(id) if id >= 2 => {
                let low = self.kernel.borrow().low(id).unwrap();
                Some(self.retnode(low))
            }
            Ok(id) => self.fail(&BddError::Operand(format!("constant node ({id}) has no branches"))),
            Err(e) => self.fail(&e),
        }
    }

    /// The true branch of `n`; constants have none.
    pub fn high(&self, n: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        match self.checked(n) {
            Ok(id) if id >= 2 => {
                let high = self.kernel.borrow().high(id);
                Some(self.retnode(high))
            }
            Ok(id) => self.fail(&BddError::Operand(format!("constant node ({id}) has no branches"))),
            Err(e) => self.fail(&e),
        }
    }

    /// Whether two handles represent the same function.  Handles of
    /// different engines are never equal.
    pub fn equal(&self, left: &BddNode, right: &BddNode) -> bool {
        left == right
    }

    // ----- combinators -----------------------------------------------------

    /// The negation of `n`.
    pub fn not(&self, n: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = match self.checked(n) {
            Ok(id) => id,
            Err(e) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            k.init_ref();
            k.push_ref(id);
            let res = not_rec(&mut k, id);
            k.pop_ref(1);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// Applies the binary operator `op` to `left` and `right`.
    pub fn apply(&self, left: &BddNode, right: &BddNode, op: BddOp) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let (l, r) = match (self.checked(left), self.checked(right)) {
            (Ok(l), Ok(r)) => (l, r),
            (Err(e), _) | (_, Err(e)) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            k.init_ref();
            k.push_ref(l);
            k.push_ref(r);
            let res = apply_rec(&mut k, l, r, op);
            k.pop_ref(2);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// If-then-else: the function `(f & g) | (!f & h)`, computed in one
    /// pass.
    pub fn ite(&self, f: &BddNode, g: &BddNode, h: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let (fi, gi, hi) = match (self.checked(f), self.checked(g), self.checked(h)) {
            (Ok(fi), Ok(gi), Ok(hi)) => (fi, gi, hi),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            k.init_ref();
            k.push_ref(fi);
            k.push_ref(gi);
            k.push_ref(hi);
            let res = ite_rec(&mut k, fi, gi, hi);
            k.pop_ref(3);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// The conjunction of all operands; true for an empty sequence.
    pub fn and(&self, operands: &[&BddNode]) -> Option<BddNode> {
        let mut res = self.verum();
        for n in operands {
            res = self.apply(&res, n, BddOp::And)?;
        }
        Some(res)
    }

    /// The disjunction of all operands; false for an empty sequence.
    pub fn or(&self, operands: &[&BddNode]) -> Option<BddNode> {
        let mut res = self.falsum();
        for n in operands {
            res = self.apply(&res, n, BddOp::Or)?;
        }
        Some(res)
    }

    /// The exclusive or of `left` and `right`.
    pub fn xor(&self, left: &BddNode, right: &BddNode) -> Option<BddNode> {
        self.apply(left, right, BddOp::Xor)
    }

    /// The implication from `left` to `right`.
    pub fn imp(&self, left: &BddNode, right: &BddNode) -> Option<BddNode> {
        self.apply(left, right, BddOp::Imp)
    }

    /// The bi-implication between `left` and `right`.
    pub fn equiv(&self, left: &BddNode, right: &BddNode) -> Option<BddNode> {
        self.apply(left, right, BddOp::Biimp)
    }

    // ----- variable sets and quantification --------------------------------

    /// The cube of the given variables in their positive form, such that
    /// `scanset(makeset(vs)) == vs` for sorted, duplicate-free `vs`.
    pub fn makeset(&self, variables: &[usize]) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let res = {
            let mut k = self.kernel.borrow_mut();
            for &v in variables {
                if v >= k.varnum {
                    k.set_error(&BddError::Operand(format!("unknown variable ({v})")));
                    return None;
                }
            }
            let mut levels = variables.to_vec();
            levels.sort_unstable_by(|a, b| b.cmp(a));
            levels.dedup();
            k.init_ref();
            let mut res = BDD_TRUE;
            let mut failed = None;
            for level in levels {
                k.push_ref(res);
                let node = k.make_node(level, BDD_FALSE, res);
                k.pop_ref(1);
                match node {
                    Ok(id) => res = id,
                    Err(e) => {
                        failed = Some(e);
                        break;
                    }
                }
            }
            if let Some(e) = failed {
                k.set_error(&e);
                return None;
            }
            k.inc_ref(res);
            res
        };
        Some(BddNode { index: res, kernel: Rc::clone(&self.kernel) })
    }

    /// The variables found along the high spine of `n`, in ascending
    /// order.  This is the dual of [`makeset`][Bdd::makeset].
    pub fn scanset(&self, n: &BddNode) -> Option<Vec<usize>> {
        if self.errored() {
            return None;
        }
        match self.checked(n) {
            Ok(id) => {
                let k = self.kernel.borrow();
                let mut res = Vec::new();
                let mut i = id;
                while i > 1 {
                    res.push(k.level(i));
                    i = k.high(i);
                }
                Some(res)
            }
            Err(e) => {
                self.fail(&e);
                None
            }
        }
    }

    /// Existentially quantifies the variables of the cube `varset` in `n`.
    pub fn exist(&self, n: &BddNode, varset: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let (ni, vi) = match (self.checked(n), self.checked(varset)) {
            (Ok(ni), Ok(vi)) => (ni, vi),
            (Err(e), _) | (_, Err(e)) => return self.fail(&e),
        };
        if vi < 2 {
            // empty variable set
            return Some(self.retnode(ni));
        }
        let res = {
            let mut k = self.kernel.borrow_mut();
            if let Err(e) = k.quantset2cache(vi) {
                k.set_error(&e);
                return None;
            }
            k.init_ref();
            k.push_ref(ni);
            k.push_ref(vi);
            let res = quant_rec(&mut k, ni, vi, BddOp::Or, CACHEID_EXIST);
            k.pop_ref(2);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// Applies `op` to `left` and `right` and existentially quantifies the
    /// variables of `varset`, in one bottom-up pass.  Only the operators up
    /// to [`BddOp::Nor`] are allowed.
    pub fn app_ex(&self, left: &BddNode, right: &BddNode, op: BddOp, varset: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        if !op.supports_quantification() {
            return self.fail(&BddError::Internal(format!("operator {op} not supported in app_ex")));
        }
        let (l, r, vi) = match (self.checked(left), self.checked(right), self.checked(varset)) {
            (Ok(l), Ok(r), Ok(vi)) => (l, r, vi),
            (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return self.fail(&e),
        };
        if vi < 2 {
            return self.apply(left, right, op);
        }
        let res = {
            let mut k = self.kernel.borrow_mut();
            if let Err(e) = k.quantset2cache(vi) {
                k.set_error(&e);
                return None;
            }
            let appexid = (vi << 2) | op.opcode();
            let quantid = (appexid << 3) | CACHEID_APPEX;
            k.init_ref();
            k.push_ref(l);
            k.push_ref(r);
            k.push_ref(vi);
            let res = appquant_rec(&mut k, l, r, vi, op, appexid, quantid);
            k.pop_ref(3);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// The relational product `∃ varset . (left & right)`.
    pub fn and_exist(&self, varset: &BddNode, left: &BddNode, right: &BddNode) -> Option<BddNode> {
        self.app_ex(left, right, BddOp::And, varset)
    }

    // ----- renaming --------------------------------------------------------

    /// Builds a replacer substituting `oldvars[k]` with `newvars[k]`.
    ///
    /// The slices must have the same length, `oldvars` must be free of
    /// duplicates, all variables must exist, and no new variable may itself
    /// be renamed away.
    pub fn new_replacer(&self, oldvars: &[usize], newvars: &[usize]) -> Result<BddReplacer, BddError> {
        let mut k = self.kernel.borrow_mut();
        if k.replacer_count >= 1 << 30 {
            return Err(BddError::Config("too many replacers created".to_string()));
        }
        let id = compose_replacer_id(k.replacer_count);
        let replacer = BddReplacer::build(k.varnum, id, oldvars, newvars)?;
        k.replacer_count += 1;
        Ok(replacer)
    }

    /// Renames the variables of `n` according to `replacer`.
    pub fn replace(&self, n: &BddNode, replacer: &BddReplacer) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = match self.checked(n) {
            Ok(id) => id,
            Err(e) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            k.init_ref();
            k.push_ref(id);
            let res = replace_rec(&mut k, id, replacer);
            k.pop_ref(1);
            match res {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    // ----- counting and model queries --------------------------------------

    /// The number of assignments over all variables satisfying `n`, or
    /// zero after an error.
    pub fn sat_count(&self, n: &BddNode) -> BigUint {
        if self.errored() {
            return BigUint::ZERO;
        }
        match self.checked(n) {
            Ok(id) => operations::sat_count(&self.kernel.borrow(), id),
            Err(e) => {
                self.fail(&e);
                BigUint::ZERO
            }
        }
    }

    /// A cube describing one satisfying assignment of `n`, or the false
    /// constant if `n` is unsatisfiable.
    pub fn sat_one(&self, n: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = match self.checked(n) {
            Ok(id) => id,
            Err(e) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            match operations::sat_one(&mut k, id) {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    /// The number of internal nodes reachable from `n`.
    pub fn node_count(&self, n: &BddNode) -> usize {
        if self.errored() {
            return 0;
        }
        match self.checked(n) {
            Ok(id) => {
                let mut k = self.kernel.borrow_mut();
                let count = k.mark_count(id);
                k.unmark_rec(id);
                count
            }
            Err(e) => {
                self.fail(&e);
                0
            }
        }
    }

    /// The cube of all variables `n` depends on.
    pub fn support(&self, n: &BddNode) -> Option<BddNode> {
        if self.errored() {
            return None;
        }
        let id = match self.checked(n) {
            Ok(id) => id,
            Err(e) => return self.fail(&e),
        };
        let res = {
            let mut k = self.kernel.borrow_mut();
            match operations::support(&mut k, id) {
                Ok(res) => res,
                Err(e) => {
                    k.set_error(&e);
                    return None;
                }
            }
        };
        Some(self.retnode(res))
    }

    // ----- enumeration -----------------------------------------------------

    /// Enumerates all satisfying assignments of `n`.
    ///
    /// The callback receives a slice of length `varnum` where entry `v` is
    /// 0 or 1 for an assigned variable and −1 for a don't-care.  At every
    /// node the false branch is visited before the true branch.  An error
    /// returned by the callback aborts the enumeration and is propagated
    /// verbatim.  The callback may perform further operations on the
    /// engine.
    pub fn all_sat<F>(&self, n: &BddNode, mut f: F) -> Result<(), BddError>
    where
        F: FnMut(&[i8]) -> Result<(), BddError>,
    {
        if let Some(err) = self.sticky() {
            return Err(err);
        }
        let id = self.checked(n).inspect_err(|e| {
            self.kernel.borrow_mut().set_error(e);
        })?;
        let varnum = self.kernel.borrow().varnum;
        let mut profile = vec![-1_i8; varnum];
        self.all_sat_rec(id, &mut profile, &mut f)
    }

    fn all_sat_rec(
        &self,
        n: usize,
        profile: &mut Vec<i8>,
        f: &mut dyn FnMut(&[i8]) -> Result<(), BddError>,
    ) -> Result<(), BddError> {
        if n == BDD_TRUE {
            return f(profile);
        }
        if n == BDD_FALSE {
            return Ok(());
        }
        let (level, low, high) = {
            let k = self.kernel.borrow();
            (k.level(n), k.low(n).unwrap(), k.high(n))
        };
        if low != BDD_FALSE {
            profile[level] = 0;
            let low_level = self.kernel.borrow().level(low);
            for entry in &mut profile[level + 1..low_level] {
                *entry = -1;
            }
            self.all_sat_rec(low, profile, f)?;
        }
        if high != BDD_FALSE {
            profile[level] = 1;
            let high_level = self.kernel.borrow().level(high);
            for entry in &mut profile[level + 1..high_level] {
                *entry = -1;
            }
            self.all_sat_rec(high, profile, f)?;
        }
        Ok(())
    }

    /// Enumerates nodes in id order: all nodes reachable from the given
    /// roots, or every live node of the engine (the constants included)
    /// when `roots` is empty.
    ///
    /// The callback receives `(id, level, low, high)`; the constants have
    /// `low == high == id`.  An error returned by the callback aborts the
    /// enumeration (restoring internal state) and is propagated verbatim.
    /// The callback must not build new nodes on this engine: a collection
    /// triggered mid-enumeration would clobber the traversal marks.
    pub fn all_nodes<F>(&self, mut f: F, roots: &[&BddNode]) -> Result<(), BddError>
    where
        F: FnMut(usize, usize, usize, usize) -> Result<(), BddError>,
    {
        if let Some(err) = self.sticky() {
            return Err(err);
        }
        for root in roots {
            self.checked(root).inspect_err(|e| {
                self.kernel.borrow_mut().set_error(e);
            })?;
        }
        if roots.is_empty() {
            let size = self.kernel.borrow().nodesize();
            for id in 0..size {
                let data = {
                    let k = self.kernel.borrow();
                    k.low(id).map(|low| (k.level(id), low, k.high(id)))
                };
                if let Some((level, low, high)) = data {
                    f(id, level, low, high)?;
                }
            }
            return Ok(());
        }
        {
            let mut k = self.kernel.borrow_mut();
            for root in roots {
                k.mark_rec(root.index);
            }
        }
        let size = self.kernel.borrow().nodesize();
        for id in 0..size {
            let data = {
                let mut k = self.kernel.borrow_mut();
                if k.marked(id) && k.low(id).is_some() {
                    k.clear_mark(id);
                    Some((k.level(id), k.low(id).unwrap(), k.high(id)))
                } else {
                    None
                }
            };
            if let Some((level, low, high)) = data {
                if let Err(e) = f(id, level, low, high) {
                    self.kernel.borrow_mut().unmark_all();
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    // ----- observability ---------------------------------------------------

    /// A snapshot of the engine internals.
    pub fn statistics(&self) -> BddStatistics {
        self.kernel.borrow().statistics()
    }

    pub(crate) fn kernel(&self) -> &Rc<RefCell<BddKernel>> {
        &self.kernel
    }
}
