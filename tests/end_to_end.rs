//! Black-box scenarios against small, hand-built `RoadNetwork`s, exercising
//! the full matcher state machine rather than its individual pieces.

use butterfly_match::geo::Point;
use butterfly_match::{Matcher, MatcherConfig, RoadNetworkBuilder, Sample};

fn sample(x: f64, y: f64, t: i64, speed: f64, bearing: f64) -> Sample {
    Sample {
        x,
        y,
        timestamp_s: t,
        speed_mps: speed,
        bearing_deg: bearing,
        stopindex: 0,
        kind: "gps".to_string(),
    }
}

/// Two parallel streets 25 m apart; the trajectory hugs one of them the
/// whole way. The other street's cost is dominated by `30 * perp`, so it is
/// never committed even though it is within the search radius throughout.
#[test]
fn parallel_street_confusion_never_commits_the_far_edge() {
    let mut b = RoadNetworkBuilder::with_identity_projection();
    let n0 = b.push_node(Point::new(0.0, 0.0));
    let n1 = b.push_node(Point::new(1000.0, 0.0));
    let m0 = b.push_node(Point::new(0.0, 25.0));
    let m1 = b.push_node(Point::new(1000.0, 25.0));
    let near = b
        .push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(1000.0, 0.0)])
        .unwrap();
    let _far = b
        .push_edge(
            m0,
            m1,
            20.0,
            vec![Point::new(0.0, 25.0), Point::new(1000.0, 25.0)],
        )
        .unwrap();
    let net = b.finish();

    let samples: Vec<Sample> = (1..=9)
        .map(|k| sample(k as f64 * 100.0, 0.0, k, 10.0, 90.0))
        .collect();

    let matcher = Matcher::new(&net, MatcherConfig::default());
    let out = matcher.match_trajectory(&samples).unwrap();

    assert_eq!(out.path.len(), 1);
    assert_eq!(out.path[0].edge, near);
    assert!(out.records.iter().all(|r| r.chosen_edge == near));
}

/// A junction where the greedy cost initially favors a dead-end branch `P`;
/// a later sample lies outside the search radius of `P`, forcing a rewind
/// back to the junction so the correct branch `Q` is picked up instead. The
/// erroneous `P` match is discarded from the output entirely rather than
/// appearing alongside the corrected one.
#[test]
fn dead_end_branch_triggers_rewind_onto_correct_branch() {
    let mut b = RoadNetworkBuilder::with_identity_projection();
    let n0 = b.push_node(Point::new(0.0, 0.0));
    let n1 = b.push_node(Point::new(500.0, 0.0));
    let n2 = b.push_node(Point::new(500.0, 1000.0));
    let n3 = b.push_node(Point::new(980.0, 640.0));

    let approach = b
        .push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)])
        .unwrap();
    let dead_end = b
        .push_edge(
            n1,
            n2,
            20.0,
            vec![Point::new(500.0, 0.0), Point::new(500.0, 1000.0)],
        )
        .unwrap();
    let correct = b
        .push_edge(
            n1,
            n3,
            20.0,
            vec![Point::new(500.0, 0.0), Point::new(980.0, 640.0)],
        )
        .unwrap();
    let net = b.finish();

    let samples = vec![
        // Deep into `approach`, close to the junction: next sample falls in
        // the NODECISION band, so both branches are offered as candidates.
        sample(485.0, 0.0, 1, 10.0, 90.0),
        // Close to the junction, bearing due north: matches `dead_end`
        // almost exactly, so it is greedily chosen over `correct`.
        sample(500.0, 30.0, 2, 10.0, 0.0),
        // Far along the vehicle's real path (on `correct`), well outside
        // the search radius of `dead_end` (perpendicular distance 120 m).
        sample(620.0, 160.0, 3, 10.0, 36.87),
    ];

    let matcher = Matcher::new(&net, MatcherConfig::default());
    let out = matcher.match_trajectory(&samples).unwrap();

    assert_eq!(out.path.len(), 2);
    assert_eq!(out.path[0].edge, approach);
    assert_eq!(out.path[1].edge, correct);
    assert!(out.records.iter().all(|r| r.chosen_edge != dead_end));
    assert_eq!(out.records.len(), 3);
    assert!(out.records[2].perpendicular_error < 1e-6);
}

/// A sample exactly on a shared node is matchable onto either incident edge
/// with zero perpendicular error.
#[test]
fn sample_exactly_on_node_has_zero_perpendicular_error() {
    let mut b = RoadNetworkBuilder::with_identity_projection();
    let n0 = b.push_node(Point::new(0.0, 0.0));
    let n1 = b.push_node(Point::new(500.0, 0.0));
    b.push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)])
        .unwrap();
    let net = b.finish();

    let samples = vec![sample(0.0, 0.0, 1, 5.0, 90.0)];
    let matcher = Matcher::new(&net, MatcherConfig::default());
    let out = matcher.match_trajectory(&samples).unwrap();

    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].perpendicular_error, 0.0);
}

/// A sample exactly at the search radius boundary is still accepted
/// (`<=`, not `<`).
#[test]
fn sample_exactly_at_search_radius_is_accepted() {
    let mut b = RoadNetworkBuilder::with_identity_projection();
    let n0 = b.push_node(Point::new(0.0, 0.0));
    let n1 = b.push_node(Point::new(500.0, 0.0));
    b.push_edge(n0, n1, 20.0, vec![Point::new(0.0, 0.0), Point::new(500.0, 0.0)])
        .unwrap();
    let net = b.finish();

    let radius = MatcherConfig::default().search_radius_m();
    let samples = vec![sample(250.0, radius, 1, 5.0, 90.0)];
    let matcher = Matcher::new(&net, MatcherConfig::default());
    let out = matcher.match_trajectory(&samples).unwrap();

    assert_eq!(out.records.len(), 1);
    assert!((out.records[0].perpendicular_error - radius).abs() < 1e-9);
}
