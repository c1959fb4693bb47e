use protocol::{Action, Point};

use super::*;
use crate::surface::test_helpers::RecordingSurface;

fn test_state() -> SyncState {
    SyncState::new(Identity { user_id: "user_test".into(), user_name: "guest1".into() })
}

fn remote_stroke(id: &str, timestamp: i64) -> Action {
    Action::Stroke {
        user_id: "user_other".into(),
        user_name: "guest2".into(),
        stroke_id: id.into(),
        points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
        color: "#10B981".into(),
        line_width: 2.0,
        timestamp,
        received_at: Some(timestamp + 1),
    }
}

fn remote_clear(id: &str, timestamp: i64) -> Action {
    Action::Clear {
        user_id: "user_other".into(),
        stroke_id: id.into(),
        timestamp,
        received_at: Some(timestamp + 1),
    }
}

fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

// =============================================================================
// DISCOVERY
// =============================================================================

#[test]
fn note_discovered_queues_unknown_ids_once() {
    let mut state = test_state();

    let fresh = state.note_discovered(&ids(&["a", "b"]), 100);
    assert_eq!(fresh, 2);
    assert_eq!(state.fetch_queue, vec!["a".to_owned(), "b".to_owned()]);

    // Re-announcing the same ids is absorbed.
    let fresh = state.note_discovered(&ids(&["a", "b", "c"]), 200);
    assert_eq!(fresh, 1);
    assert_eq!(state.fetch_queue, vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);
}

#[test]
fn note_discovered_skips_own_ids() {
    let mut state = test_state();
    let action = state
        .commit_stroke(vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }], "#000000", 3.0)
        .unwrap();

    let fresh = state.note_discovered(&[action.stroke_id().to_owned()], 100);
    assert_eq!(fresh, 0);
    assert!(state.fetch_queue.is_empty(), "own ids must never enter the fetch queue");
}

#[test]
fn cursor_is_monotonic() {
    let mut state = test_state();
    state.note_discovered(&[], 500);
    assert_eq!(state.last_sync, 500);

    // A stale or clock-skewed response never moves the cursor backward.
    state.note_discovered(&ids(&["a"]), 300);
    assert_eq!(state.last_sync, 500);

    state.note_discovered(&[], 600);
    assert_eq!(state.last_sync, 600);
}

// =============================================================================
// FETCH
// =============================================================================

#[test]
fn take_fetch_batch_caps_at_ten_and_preserves_order() {
    let mut state = test_state();
    let all: Vec<String> = (0..15).map(|i| format!("id{i}")).collect();
    state.note_discovered(&all, 100);

    let batch = state.take_fetch_batch();
    assert_eq!(batch, all[..10].to_vec());
    assert_eq!(state.fetch_queue.len(), 5);

    // A failed batch goes back to the front unchanged.
    state.requeue_fetch_front(batch);
    assert_eq!(state.fetch_queue.iter().cloned().collect::<Vec<_>>(), all);
}

#[test]
fn apply_fetched_draws_each_stroke_at_most_once() {
    let mut state = test_state();
    let mut surface = RecordingSurface::new();

    let batch = ids(&["a"]);
    state.note_discovered(&batch, 100);

    state.apply_fetched(&batch, vec![remote_stroke("a", 50)], &mut surface);
    // Discovery/fetch returning the same action again must not re-draw.
    state.apply_fetched(&batch, vec![remote_stroke("a", 50)], &mut surface);

    assert_eq!(surface.strokes().len(), 1);
    assert_eq!(state.stats.received, 1);
}

#[test]
fn apply_fetched_orders_by_timestamp() {
    let mut state = test_state();
    let mut surface = RecordingSurface::new();

    let actions = vec![
        Action::Stroke {
            user_id: "u".into(),
            user_name: "n".into(),
            stroke_id: "late".into(),
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            color: "#late".into(),
            line_width: 1.0,
            timestamp: 900,
            received_at: None,
        },
        Action::Stroke {
            user_id: "u".into(),
            user_name: "n".into(),
            stroke_id: "early".into(),
            points: vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }],
            color: "#early".into(),
            line_width: 1.0,
            timestamp: 100,
            received_at: None,
        },
    ];

    state.apply_fetched(&ids(&["late", "early"]), actions, &mut surface);

    let colors: Vec<String> = surface.strokes().into_iter().map(|(_, c, _)| c).collect();
    assert_eq!(colors, vec!["#early".to_owned(), "#late".to_owned()]);
}

#[test]
fn apply_fetched_applies_remote_clears_once() {
    let mut state = test_state();
    let mut surface = RecordingSurface::new();

    let batch = ids(&["c1"]);
    state.apply_fetched(&batch, vec![remote_clear("c1", 100)], &mut surface);
    state.apply_fetched(&batch, vec![remote_clear("c1", 100)], &mut surface);

    assert_eq!(surface.clears(), 1);
    // Dedup sets survive a remote clear so old strokes are not re-fetched.
    assert!(state.received.contains("c1"));
}

#[test]
fn remote_clear_does_not_wipe_dedup_history() {
    let mut state = test_state();
    let mut surface = RecordingSurface::new();

    state.note_discovered(&ids(&["a"]), 100);
    state.apply_fetched(&ids(&["a"]), vec![remote_stroke("a", 50)], &mut surface);
    state.apply_fetched(&ids(&["c1"]), vec![remote_clear("c1", 200)], &mut surface);

    // The pre-clear stroke stays received: re-discovery must not redraw it.
    let fresh = state.note_discovered(&ids(&["a"]), 300);
    assert_eq!(fresh, 0);
    assert_eq!(surface.strokes().len(), 1);
}

#[test]
fn apply_fetched_reports_missing_ids() {
    let mut state = test_state();
    let mut surface = RecordingSurface::new();

    let batch = ids(&["here", "lagging"]);
    let missing = state.apply_fetched(&batch, vec![remote_stroke("here", 50)], &mut surface);

    assert_eq!(missing, vec!["lagging".to_owned()]);

    state.requeue_fetch_back(missing);
    assert_eq!(state.fetch_queue, vec!["lagging".to_owned()]);
}

// =============================================================================
// SEND
// =============================================================================

#[test]
fn failed_send_batch_preserves_order() {
    let mut state = test_state();
    let two_points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }];
    let a = state.commit_stroke(two_points.clone(), "#a", 1.0).unwrap();
    let b = state.commit_stroke(two_points.clone(), "#b", 1.0).unwrap();
    let c = state.commit_stroke(two_points.clone(), "#c", 1.0).unwrap();

    let batch = state.take_send_batch();
    assert_eq!(batch, vec![a, b.clone(), c.clone()]);
    assert!(state.send_queue.is_empty());

    // A sent, B failed: B and C return to the front in original order,
    // ahead of anything produced while the batch was in flight.
    let d = state.commit_stroke(two_points, "#d", 1.0).unwrap();
    state.restore_send_front(batch[1..].to_vec());

    let queued: Vec<Action> = state.send_queue.iter().cloned().collect();
    assert_eq!(queued, vec![b, c, d]);
}

#[test]
fn take_send_batch_caps_at_three() {
    let mut state = test_state();
    let two_points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }];
    for _ in 0..5 {
        state.commit_stroke(two_points.clone(), "#000", 1.0).unwrap();
    }

    assert_eq!(state.take_send_batch().len(), 3);
    assert_eq!(state.send_queue.len(), 2);
}

// =============================================================================
// LOCAL PRODUCTION
// =============================================================================

#[test]
fn commit_stroke_requires_two_points() {
    let mut state = test_state();
    assert!(state.commit_stroke(vec![Point { x: 0.0, y: 0.0 }], "#000", 1.0).is_none());
    assert!(state.send_queue.is_empty());
}

#[test]
fn commit_stroke_preseeds_all_three_sets() {
    let mut state = test_state();
    let action = state
        .commit_stroke(vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }], "#000", 1.0)
        .unwrap();

    let id = action.stroke_id();
    assert!(state.own.contains(id));
    assert!(state.known.contains(id));
    assert!(state.received.contains(id));
    assert!(id.starts_with("user_test_"));
    assert_eq!(state.send_queue.len(), 1);
}

#[test]
fn begin_clear_resets_state_and_seeds_the_clear_id() {
    let mut state = test_state();
    let two_points = vec![Point { x: 0.0, y: 0.0 }, Point { x: 1.0, y: 1.0 }];
    state.commit_stroke(two_points, "#000", 1.0).unwrap();
    state.note_discovered(&ids(&["remote"]), 100);

    let action = state.begin_clear(5_000);

    assert!(state.fetch_queue.is_empty());
    assert!(state.send_queue.is_empty());
    assert_eq!(state.last_sync, 5_000);
    assert!(matches!(action, Action::Clear { .. }));

    // Only the clear's own id survives the reset.
    let id = action.stroke_id();
    assert_eq!(state.known.len(), 1);
    assert!(state.known.contains(id));
    assert!(state.received.contains(id));
    assert!(state.own.contains(id));

    // The producer's own clear never loops back through discovery.
    assert_eq!(state.note_discovered(&[id.to_owned()], 6_000), 0);
}

#[test]
fn activity_log_is_capped() {
    let mut state = test_state();
    for i in 0..25 {
        state.push_log(format!("line {i}"));
    }

    let lines: Vec<&str> = state.log_lines().collect();
    assert_eq!(lines.len(), 10);
    assert_eq!(lines[0], "line 15");
    assert_eq!(lines[9], "line 24");
}
