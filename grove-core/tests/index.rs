//! Behavioural tests for the `Index` handle.

mod common;

use common::{Scratch, built_index, float_property, scratch, three_points};
use grove_core::{
    DistanceType, EdgeBound, Index, IndexError, IndexErrorCode, ObjectErrorCode, ObjectType,
    OpenOptions, Property, RefineParams, RemovalPolicy, SearchParams,
};
use grove_test_support::datasets::{bytes, uniform};
use grove_test_support::oracle::{exact_knn, l2, recall};
use rstest::{fixture, rstest};

#[fixture]
fn dir() -> Scratch {
    scratch()
}

fn reopen(index: &Index, scratch: &Scratch, options: OpenOptions) -> Index {
    index.save(&scratch.path).expect("save");
    Index::open(&scratch.path, options).expect("reopen")
}

#[rstest]
fn nearest_two_points_come_back_closest_first(dir: Scratch) {
    let index = three_points(&dir);
    let outcome = index
        .search(&[0.9_f32, 0.0, 0.0, 0.0], &SearchParams::new(2))
        .expect("search");

    assert_eq!(outcome.ids(), vec![1, 0]);
    let distances: Vec<f32> = outcome.neighbours().iter().map(|n| n.distance).collect();
    assert!((distances[0] - 0.1).abs() < 1e-5);
    assert!((distances[1] - 0.9).abs() < 1e-5);
    assert!(outcome.distance_computations() > 0);
}

#[rstest]
fn single_inserts_assign_sequential_ids(dir: Scratch) {
    let index = Index::create(&dir.path, float_property(4, DistanceType::L2)).expect("create");
    let ids: Vec<usize> = [[0.0_f32; 4], [1.0, 0.0, 0.0, 0.0], [10.0; 4]]
        .iter()
        .map(|vector| index.insert(vector).expect("insert"))
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);

    let outcome = index
        .search(&[0.9_f32, 0.0, 0.0, 0.0], &SearchParams::new(2))
        .expect("search");
    assert_eq!(outcome.ids(), vec![1, 0]);
    assert_eq!(index.count_objects().expect("count"), 3);
    assert_eq!(index.graph_repository_size().expect("graph size"), 3);
}

#[rstest]
fn empty_index_returns_no_results(dir: Scratch) {
    let index = Index::create(&dir.path, float_property(3, DistanceType::L2)).expect("create");
    let outcome = index
        .search(&[0.0_f32, 1.0, 2.0], &SearchParams::new(5))
        .expect("empty search succeeds");
    assert!(outcome.is_empty());
}

#[rstest]
#[case(vec![1.0, 2.0], ObjectErrorCode::DimensionMismatch)]
#[case(vec![1.0, f64::NAN, 0.0, 0.0], ObjectErrorCode::NonFinite)]
#[case(vec![f64::INFINITY, 0.0, 0.0, 0.0], ObjectErrorCode::NonFinite)]
fn malformed_queries_are_rejected(dir: Scratch, #[case] query: Vec<f64>, #[case] code: ObjectErrorCode) {
    let index = three_points(&dir);
    let error = index
        .search(&query, &SearchParams::new(1))
        .expect_err("query must be rejected");
    assert_eq!(error.code(), IndexErrorCode::InvalidObject);
    assert_eq!(error.object_code(), Some(code));
}

#[rstest]
fn batch_insert_skips_invalid_rows_and_keeps_order(dir: Scratch) {
    let index = Index::create(&dir.path, float_property(2, DistanceType::L2)).expect("create");
    let rows: Vec<Vec<f32>> = vec![
        vec![0.0, 0.0],
        vec![f32::NAN, 1.0],
        vec![1.0, 1.0],
        vec![3.0],
        vec![2.0, 2.0],
    ];
    let outcome = index.batch_insert(&rows, 2).expect("batch insert");

    assert_eq!(outcome.ids(), &[0, 1, 2]);
    let skipped: Vec<(usize, ObjectErrorCode)> = outcome
        .skipped()
        .iter()
        .map(|row| (row.row, row.error.code()))
        .collect();
    assert_eq!(
        skipped,
        vec![(1, ObjectErrorCode::NonFinite), (3, ObjectErrorCode::DimensionMismatch)]
    );
    assert_eq!(index.get_object(2).expect("stored"), vec![2.0, 2.0]);
}

#[rstest]
fn search_recall_tracks_brute_force(dir: Scratch) {
    let points = uniform(400, 6, 11);
    let index = built_index(&dir, &points);
    let queries = uniform(25, 6, 99);

    let mut total = 0.0;
    for query in &queries {
        let outcome = index
            .search(query, &SearchParams::new(10).with_epsilon(0.5))
            .expect("search");
        let truth: Vec<usize> = exact_knn(
            points.iter().enumerate().map(|(id, p)| (id, p.as_slice())),
            query,
            10,
            l2,
        )
        .into_iter()
        .map(|(id, _)| id)
        .collect();
        total += recall(&outcome.ids(), &truth);
    }
    let mean = total / queries.len() as f64;
    assert!(mean >= 0.9, "mean recall {mean} fell below 0.9");
}

#[rstest]
fn results_are_sorted_and_within_size(dir: Scratch) {
    let points = uniform(150, 3, 5);
    let index = built_index(&dir, &points);
    for size in [1, 7, 20] {
        let outcome = index
            .search(&points[17], &SearchParams::new(size))
            .expect("search");
        assert_eq!(outcome.len(), size);
        assert!(outcome.neighbours().windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(outcome.ids()[0], 17);
    }
}

#[rstest]
#[case::eager(RemovalPolicy::Eager)]
#[case::lazy(RemovalPolicy::Lazy)]
fn removed_objects_never_surface(dir: Scratch, #[case] policy: RemovalPolicy) {
    let points = uniform(200, 4, 3);
    let built = built_index(&dir, &points);
    let index = reopen(&built, &dir, OpenOptions::default().with_removal_policy(policy));

    let doomed: Vec<usize> = (0..50).collect();
    let report = index.remove(&doomed).expect("remove");
    assert_eq!(report.removed(), doomed.as_slice());
    assert_eq!(index.count_objects().expect("count"), 150);
    assert_eq!(index.object_repository_size().expect("size"), 200);

    for id in [0, 10, 25, 49] {
        let outcome = index
            .search(&points[id], &SearchParams::new(10))
            .expect("search");
        assert_eq!(outcome.len(), 10);
        assert!(outcome.ids().iter().all(|found| *found >= 50));
    }
    assert!(matches!(
        index.get_object(3),
        Err(IndexError::Removed { id: 3 })
    ));
}

#[rstest]
fn removal_reports_unknown_and_repeated_ids(dir: Scratch) {
    let index = three_points(&dir);
    let report = index.remove(&[1, 42, 1]).expect("remove never fails per id");
    assert_eq!(report.removed(), &[1]);
    assert_eq!(report.already_removed(), &[1]);
    assert_eq!(report.not_found(), &[42]);

    let outcome = index
        .search(&[0.9_f32, 0.0, 0.0, 0.0], &SearchParams::new(2))
        .expect("search");
    assert_eq!(outcome.ids(), vec![0, 2]);
}

#[rstest]
fn closed_handles_reject_everything(dir: Scratch) {
    let index = three_points(&dir);
    index.close().expect("close");
    assert!(index.is_closed());

    assert!(matches!(
        index.search(&[0.0_f32; 4], &SearchParams::new(1)),
        Err(IndexError::ClosedIndex)
    ));
    assert!(matches!(index.insert(&[0.0_f32; 4]), Err(IndexError::ClosedIndex)));
    assert!(matches!(index.count_objects(), Err(IndexError::ClosedIndex)));
    assert!(matches!(index.close(), Err(IndexError::ClosedIndex)));
}

#[rstest]
fn read_only_handles_search_but_reject_mutations(dir: Scratch) {
    let built = three_points(&dir);
    let index = reopen(&built, &dir, OpenOptions::default().with_read_only(true));

    assert_eq!(
        index
            .search(&[0.9_f32, 0.0, 0.0, 0.0], &SearchParams::new(2))
            .expect("search")
            .ids(),
        vec![1, 0]
    );
    let error = index.insert(&[0.0_f32; 4]).expect_err("insert rejected");
    assert_eq!(error.code(), IndexErrorCode::ReadOnly);
    assert!(matches!(
        index.remove(&[0]),
        Err(IndexError::ReadOnly { operation: "remove" })
    ));
    assert!(matches!(
        index.build(1, 0),
        Err(IndexError::ReadOnly { operation: "build" })
    ));
}

#[rstest]
fn tree_disabled_handles_still_find_neighbours(dir: Scratch) {
    let points = uniform(120, 4, 21);
    let built = built_index(&dir, &points);
    let index = reopen(&built, &dir, OpenOptions::default().with_tree_disabled(true));
    let outcome = index
        .search(&points[60], &SearchParams::new(5).with_epsilon(1.0))
        .expect("search");
    assert_eq!(outcome.ids()[0], 60);
}

#[rstest]
fn append_then_build_links_everything(dir: Scratch) {
    let points = uniform(80, 3, 8);
    let index = Index::create(&dir.path, float_property(3, DistanceType::L2)).expect("create");
    for point in &points {
        index.append(point).expect("append");
    }
    index.build(2, 100).expect("build");
    assert!(index.distance_computation_count().expect("count") > 0);

    let first = index.search(&points[5], &SearchParams::new(5)).expect("search");
    index.build(2, 100).expect("second build");
    assert_eq!(index.distance_computation_count().expect("count"), 0);
    let second = index.search(&points[5], &SearchParams::new(5)).expect("search");
    assert_eq!(first, second);
    assert_eq!(first.ids()[0], 5);
}

#[rstest]
fn searches_accumulate_distance_computations(dir: Scratch) {
    let index = three_points(&dir);
    let before = index.distance_computation_count().expect("count");
    let outcome = index
        .search(&[0.0_f32; 4], &SearchParams::new(1))
        .expect("search");
    assert_eq!(
        index.distance_computation_count().expect("count"),
        before + outcome.distance_computations()
    );
}

#[rstest]
fn radius_limits_results(dir: Scratch) {
    let index = three_points(&dir);
    let outcome = index
        .search(
            &[0.9_f32, 0.0, 0.0, 0.0],
            &SearchParams::new(3).with_radius(0.5),
        )
        .expect("search");
    assert_eq!(outcome.ids(), vec![1]);
}

#[rstest]
fn search_defaults_fill_unset_parameters(dir: Scratch) {
    let index = three_points(&dir);
    index
        .set_search_defaults(&SearchParams::new(2).with_epsilon(0.3).with_edge_bound(EdgeBound::Unlimited))
        .expect("set defaults");
    let defaults = index.search_defaults().expect("defaults");
    assert_eq!(defaults.size(), 2);
    assert!((defaults.epsilon() - 0.3).abs() < f32::EPSILON);

    let outcome = index
        .search(&[0.0_f32; 4], &SearchParams::new(0))
        .expect("search");
    assert_eq!(outcome.len(), 2);
    assert!((outcome.epsilon() - 0.3).abs() < f32::EPSILON);

    let ignored = index
        .search(&[0.0_f32; 4], &SearchParams::new(0).with_epsilon(-1.0))
        .expect("search");
    assert!((ignored.epsilon() - 0.3).abs() < f32::EPSILON);
}

#[rstest]
fn expected_accuracy_selects_an_epsilon(dir: Scratch) {
    let points = uniform(200, 4, 17);
    let index = built_index(&dir, &points);
    let loose = index
        .search(&points[0], &SearchParams::new(10).with_expected_accuracy(0.5))
        .expect("search");
    let strict = index
        .search(
            &points[0],
            &SearchParams::new(10).with_expected_accuracy(0.999).with_epsilon(0.0),
        )
        .expect("search");
    assert!(loose.epsilon() <= strict.epsilon());
    assert_eq!(strict.len(), 10);
}

#[rstest]
fn refine_rebuilds_every_live_node(dir: Scratch) {
    let points = uniform(120, 4, 31);
    let index = built_index(&dir, &points);
    index.remove(&[0, 1]).expect("remove");

    let summary = index
        .refine(&RefineParams::default().with_edge_count(6).with_thread_count(2))
        .expect("refine");
    assert_eq!(summary.refined_nodes(), 118);
    assert!(summary.distance_computations() > 0);

    let outcome = index.search(&points[50], &SearchParams::new(3)).expect("search");
    assert_eq!(outcome.ids()[0], 50);
}

#[rstest]
fn creating_over_an_existing_index_fails(dir: Scratch) {
    let _index = three_points(&dir);
    let error = Index::create(&dir.path, float_property(4, DistanceType::L2))
        .expect_err("second create must fail");
    assert_eq!(error.code(), IndexErrorCode::InvalidConfiguration);
}

#[rstest]
fn unsupported_metric_combinations_are_rejected() {
    let error = Property::new(8, ObjectType::Float, DistanceType::Hamming)
        .expect_err("hamming needs bytes");
    assert_eq!(error.code(), IndexErrorCode::InvalidConfiguration);
}

#[rstest]
fn byte_indexes_round_and_range_check(dir: Scratch) {
    let property = Property::new(4, ObjectType::Uint8, DistanceType::L1).expect("property");
    let index = Index::create(&dir.path, property).expect("create");
    let rows = bytes(60, 4, 2);
    index.batch_insert(&rows, 1).expect("batch insert");

    let id = index.insert(&[1.4_f64, 2.6, 0.0, 255.0]).expect("insert");
    assert_eq!(index.get_object(id).expect("object"), vec![1.0, 3.0, 0.0, 255.0]);

    let error = index.insert(&[256.0_f64, 0.0, 0.0, 0.0]).expect_err("out of range");
    assert_eq!(error.object_code(), Some(ObjectErrorCode::OutOfRange));

    let outcome = index
        .search(&rows[7], &SearchParams::new(1))
        .expect("search");
    assert_eq!(outcome.neighbours()[0].distance, 0.0);
}

#[rstest]
fn half_precision_indexes_store_approximately(dir: Scratch) {
    let property = Property::new(3, ObjectType::Float16, DistanceType::L2).expect("property");
    let index = Index::create(&dir.path, property).expect("create");
    let id = index.insert(&[0.1_f32, 1.5, -2.25]).expect("insert");
    let stored = index.get_object(id).expect("object");
    for (stored, original) in stored.iter().zip([0.1_f32, 1.5, -2.25]) {
        assert!((stored - original).abs() < 1e-3);
    }
}

#[rstest]
fn normalised_metrics_store_unit_vectors(dir: Scratch) {
    let index = Index::create(&dir.path, float_property(2, DistanceType::NormalizedL2)).expect("create");
    let id = index.insert(&[3.0_f32, 4.0]).expect("insert");
    let stored = index.get_object(id).expect("object");
    assert!((stored[0] - 0.6).abs() < 1e-6);
    assert!((stored[1] - 0.8).abs() < 1e-6);
}
