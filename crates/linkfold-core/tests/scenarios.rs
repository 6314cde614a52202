//! End-to-end scenarios on tiny graphs.

use std::collections::HashSet;

use linkfold_core::early_stop::{EarlyStopping, StopState};
use linkfold_core::sampling::{sample_negatives, seeded_rng};
use linkfold_core::split::{split, SplitConfig};
use linkfold_core::{Error, Graph};

#[test]
fn six_nodes_seven_edges_five_folds() {
    let text = "0 1\n1 2\n2 3\n3 4\n4 5\n5 0\n0 3\n";
    let graph = Graph::from_edge_list(text.as_bytes()).unwrap();
    assert_eq!(graph.num_nodes(), 6);
    assert_eq!(graph.num_edges(), 7);

    let config = SplitConfig::default().with_folds(5).with_val_fraction(0.1);
    let folds = split(graph.edges(), graph.num_nodes(), &config).unwrap();
    assert_eq!(folds.len(), 5);

    let mut tested = Vec::new();
    for fold in &folds {
        assert!((1..=2).contains(&fold.test_pos.len()));
        assert!(!fold.val_pos.is_empty());
        assert_eq!(fold.val_pos.len(), fold.val_neg.len());
        assert_eq!(fold.test_pos.len(), fold.test_neg.len());
        tested.extend(fold.test_pos.iter().copied());
    }
    tested.sort();
    assert_eq!(tested, graph.edges());
}

#[test]
fn complete_triangle_has_no_negatives() {
    let graph = Graph::from_edges(3, vec![(0, 1), (1, 2), (0, 2)]).unwrap();
    assert_eq!(graph.stats().num_non_edges, 0);

    let forbidden: HashSet<_> = graph.edges().iter().copied().collect();
    let err = sample_negatives(1, &forbidden, graph.num_nodes(), &mut seeded_rng(42)).unwrap_err();
    assert!(matches!(err, Error::NonEdgeSpaceExhausted { requested: 1, available: 0 }));
    assert!(err.to_string().contains("non-edge space exhausted"));
}

#[test]
fn early_stopping_after_three_flat_epochs() {
    let mut es = EarlyStopping::new(3);
    let mut last_epoch = 0;
    for (i, auc) in [0.5, 0.6, 0.55, 0.55, 0.55].into_iter().enumerate() {
        let epoch = i + 1;
        last_epoch = epoch;
        if es.observe(epoch, auc, || format!("params@{}", epoch)) == StopState::Stopped {
            break;
        }
    }
    assert_eq!(last_epoch, 5);
    assert_eq!(es.into_best(), Some((2, "params@2".to_string())));
}
