use kindred_nn::metric::jaccard;
use kindred_nn::{
    Axis, CounterStrategy, InvertedNeighborhood, Neighborhood, SetSimilarity,
    SimilarityNeighborhood,
};
use kindred_prefs::PreferenceStore;
use proptest::prelude::*;
use std::sync::Arc;

const NUM_USERS: usize = 10;
const NUM_ITEMS: usize = 14;

fn arb_store() -> impl Strategy<Value = Arc<PreferenceStore>> {
    proptest::collection::vec(
        (0..NUM_USERS as u32, 0..NUM_ITEMS as u32, 0.1f64..5.0f64),
        0..120,
    )
    .prop_map(|records| {
        Arc::new(PreferenceStore::from_records(records, NUM_USERS, NUM_ITEMS).unwrap())
    })
}

fn sorted(mut v: Vec<kindred_core::Scored>) -> Vec<kindred_core::Scored> {
    v.sort_by_key(|s| s.idx);
    v
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_dense_and_sparse_agree(store in arb_store()) {
        for axis in [Axis::Users, Axis::Items] {
            let dense = SetSimilarity::new(store.clone(), axis, CounterStrategy::Dense, jaccard);
            let sparse = SetSimilarity::new(store.clone(), axis, CounterStrategy::Sparse, jaccard);

            let universe = match axis {
                Axis::Users => NUM_USERS,
                Axis::Items => NUM_ITEMS,
            };
            for idx in 0..universe as u32 {
                let d = sorted(dense.similar_to(idx));
                let s = sorted(sparse.similar_to(idx));
                prop_assert_eq!(d.len(), s.len());
                for (a, b) in d.iter().zip(s.iter()) {
                    prop_assert_eq!(a.idx, b.idx);
                    prop_assert!(a.score == b.score, "score mismatch at idx {}", a.idx);
                }
            }
        }
    }

    #[test]
    fn prop_self_excluded(store in arb_store()) {
        let sim = SetSimilarity::new(store, Axis::Users, CounterStrategy::Sparse, jaccard);
        for idx in 0..NUM_USERS as u32 {
            prop_assert!(sim.similar_to(idx).iter().all(|s| s.idx != idx));
        }
    }

    #[test]
    fn prop_candidates_share_at_least_one_item(store in arb_store()) {
        let sim = SetSimilarity::new(store.clone(), Axis::Users, CounterStrategy::Dense, jaccard);
        for idx in 0..NUM_USERS as u32 {
            let profile: Vec<u32> = store.user_prefs(idx).iter().map(|&(i, _)| i).collect();
            for neighbor in sim.similar_to(idx) {
                let overlap = store
                    .user_prefs(neighbor.idx)
                    .iter()
                    .any(|&(i, _)| profile.contains(&i));
                prop_assert!(overlap, "candidate {} shares nothing with {}", neighbor.idx, idx);
            }
        }
    }

    #[test]
    fn prop_inverted_is_exact_transpose(store in arb_store()) {
        let source = SimilarityNeighborhood::new(SetSimilarity::new(
            store,
            Axis::Users,
            CounterStrategy::Dense,
            jaccard,
        ));
        let filter = |idx: u32| idx % 2 == 0;
        let inverted = InvertedNeighborhood::build(NUM_USERS, &source, filter);

        // Forward direction: every filtered target of an origin's
        // neighborhood shows up in the transpose with the same score.
        for origin in 0..NUM_USERS as u32 {
            for s in source.neighbors(origin) {
                if filter(s.idx) {
                    let back = inverted.neighbors(s.idx);
                    prop_assert!(back
                        .iter()
                        .any(|r| r.idx == origin && r.score == s.score));
                }
            }
        }

        // Backward direction: the transpose never invents relations.
        for target in (0..NUM_USERS as u32).filter(|&t| filter(t)) {
            for r in inverted.neighbors(target) {
                prop_assert!(source
                    .neighbors(r.idx)
                    .iter()
                    .any(|s| s.idx == target && s.score == r.score));
            }
        }
    }
}
