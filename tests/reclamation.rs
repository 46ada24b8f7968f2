//! Lifecycle tests: cooperation between dropped handles and the
//! mark-and-sweep collector, table-growth limits and the sticky error
//! state, and reference-count saturation.

use num_bigint::BigUint;
use robdd::{Bdd, BddConfig, BddOp};

#[test]
fn test_dropped_handles_are_reclaimed() {
    // a table this small cannot hold the garbage of all iterations, so
    // the loop only survives if dropped conjunctions are reclaimed
    let config = BddConfig::new().node_size(50).cache_size(100).max_nodes(131);
    let bdd = Bdd::with_config(8, &config).unwrap();
    for round in 0..2_000 {
        let i = round % 8;
        let j = (round + 3) % 8;
        let a = bdd.ithvar(i).unwrap();
        let nb = bdd.nithvar(j).unwrap();
        let conj = bdd.and(&[&a, &nb]).unwrap();
        let disj = bdd.or(&[&conj, &bdd.ithvar((round + 5) % 8).unwrap()]).unwrap();
        assert_ne!(disj, bdd.falsum());
        // conj and disj drop here and become collectible
    }
    assert!(!bdd.errored(), "{:?}", bdd.error());
    assert!(bdd.statistics().gbcollectnum > 0);
    assert!(bdd.statistics().nodesize <= 131);
}

#[test]
fn test_literal_churn_leaves_only_pinned_nodes() {
    let varnum = 8;
    let bdd = Bdd::new(varnum).unwrap();
    for round in 0..100_000 {
        let literal = bdd.ithvar(round % varnum).unwrap();
        drop(literal);
        let literal = bdd.nithvar(round % varnum).unwrap();
        drop(literal);
    }
    assert!(!bdd.errored());
    assert_eq!(bdd.error(), None);
    // exactly the two constants and the 2 * V pinned literals are live
    let mut live = 0;
    bdd.all_nodes(
        |_, _, _, _| {
            live += 1;
            Ok(())
        },
        &[],
    )
    .unwrap();
    assert_eq!(live, 2 + 2 * varnum);
}

#[test]
fn test_live_handles_survive_collections() {
    let config = BddConfig::new().node_size(50).cache_size(100);
    let bdd = Bdd::with_config(6, &config).unwrap();
    let a = bdd.ithvar(0).unwrap();
    let b = bdd.ithvar(1).unwrap();
    let kept = bdd.equiv(&a, &b).unwrap();
    let count_before = bdd.sat_count(&kept);
    // enough churn to force several collections
    for round in 0..500 {
        let x = bdd.ithvar(round % 6).unwrap();
        let y = bdd.nithvar((round + 1) % 6).unwrap();
        let _ = bdd.xor(&x, &y).unwrap();
    }
    assert!(bdd.statistics().gbcollectnum > 0);
    assert_eq!(bdd.sat_count(&kept), count_before);
    assert!(bdd.equal(&kept, &bdd.equiv(&a, &b).unwrap()));
}

#[test]
fn test_table_saturation_poisons_the_engine() {
    // 31 slots hold the constants, 28 literals and one more node; the
    // table is not allowed to grow
    let config = BddConfig::new().node_size(2 * 14 + 2).max_nodes(2 * 14 + 3);
    let bdd = Bdd::with_config(14, &config).unwrap();
    let mut operands = Vec::new();
    for i in 0..14 {
        operands.push(bdd.ithvar(i).unwrap());
    }
    let refs: Vec<&robdd::BddNode> = operands.iter().collect();
    // the full conjunction needs 13 fresh nodes and must fail
    assert!(bdd.and(&refs).is_none());
    assert!(bdd.errored());
    let message = bdd.error().unwrap();
    assert!(message.contains("out of memory"), "unexpected message: {message}");
    // the engine stays poisoned and keeps the first message at the tail
    assert!(bdd.ithvar(0).is_none());
    assert!(bdd.sat_count(&operands[0]) == BigUint::ZERO);
    assert!(bdd.error().unwrap().ends_with(&message));
}

#[test]
fn test_refcount_saturation() {
    let bdd = Bdd::new(4).unwrap();
    let a = bdd.ithvar(0).unwrap();
    let b = bdd.ithvar(1).unwrap();
    let n = bdd.and(&[&a, &b]).unwrap();
    // saturate the counter, then drop every extra handle
    let clones: Vec<_> = (0..1100).map(|_| n.clone()).collect();
    drop(clones);
    // the node must still be usable and must never underflow
    assert_eq!(bdd.apply(&n, &n, BddOp::And).unwrap(), n);
    assert!(!bdd.errored());
    let more: Vec<_> = (0..1100).map(|_| n.clone()).collect();
    drop(more);
    assert_eq!(bdd.sat_count(&n), BigUint::from(4_u32));
}
