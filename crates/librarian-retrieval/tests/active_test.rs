//! Active Retriever integration tests: trigger semantics, gap discipline,
//! query generation, and retrieval integration.

use librarian_core::config::ActiveConfig;
use librarian_retrieval::active::ActiveRetriever;

fn retriever_with(window_size: usize, min_retrieval_gap: usize) -> ActiveRetriever {
    ActiveRetriever::new(ActiveConfig {
        window_size,
        min_retrieval_gap,
        ..ActiveConfig::default()
    })
}

// ---- Threshold semantics ----

#[test]
fn exactly_at_threshold_does_not_trigger() {
    let r = ActiveRetriever::default();
    let signals = r.analyze_confidence(&["tok"], &[0.5]);
    assert!(!signals[0].needs_retrieval);
}

#[test]
fn below_threshold_triggers() {
    let r = ActiveRetriever::default();
    let signals = r.analyze_confidence(&["tok"], &[0.499]);
    assert!(signals[0].needs_retrieval);
}

#[test]
fn nan_confidence_always_triggers() {
    let r = ActiveRetriever::default();
    let signals = r.analyze_confidence(&["a", "b"], &[f64::NAN, 0.9]);
    assert!(signals[0].needs_retrieval);
    assert!(!signals[1].needs_retrieval);
}

// ---- Gap discipline ----

#[test]
fn within_gap_is_blocked_eligible_exactly_at_gap() {
    let r = retriever_with(0, 5);
    let confidences = vec![0.1; 20];
    let tokens: Vec<&str> = vec!["t"; 20];
    let signals = r.analyze_confidence(&tokens, &confidences);

    // Prior retrieval at position 3.
    for position in 4..8 {
        assert!(
            !r.should_retrieve(&signals, position, Some(3)),
            "position {position} is within the gap"
        );
    }
    assert!(
        r.should_retrieve(&signals, 8, Some(3)),
        "gap == min_retrieval_gap must be eligible again"
    );
}

#[test]
fn no_prior_retrieval_is_always_allowed() {
    let r = retriever_with(0, 10);
    let signals = r.analyze_confidence(&["low"], &[0.0]);
    assert!(r.should_retrieve(&signals, 0, None));
}

#[test]
fn out_of_bounds_position_is_false_not_panic() {
    let r = ActiveRetriever::default();
    let signals = r.analyze_confidence(&["a"], &[0.1]);
    assert!(!r.should_retrieve(&signals, 5, None));
    assert!(!r.should_retrieve(&[], 0, None));
}

// ---- Window lookahead ----

#[test]
fn window_sees_trouble_ahead() {
    let r = retriever_with(2, 0);
    let signals = r.analyze_confidence(&["a", "b", "c"], &[0.9, 0.9, 0.1]);
    assert!(r.should_retrieve(&signals, 0, None), "position 2 is inside the window");
    let r0 = retriever_with(0, 0);
    assert!(
        !r0.should_retrieve(&signals, 0, None),
        "window_size 0 inspects only the current position"
    );
}

// ---- Query generation ----

#[test]
fn query_built_from_both_context_and_span() {
    let r = ActiveRetriever::default();
    let query = r.generate_query("the UserService class", "calls fetchUser with retryCount");
    assert!(query.contains("UserService"));
    assert!(query.contains("fetchUser"));
    assert!(query.contains("retryCount"));
}

#[test]
fn query_respects_length_cap() {
    let r = ActiveRetriever::new(ActiveConfig {
        max_query_length: 30,
        ..ActiveConfig::default()
    });
    let long_span = (0..50).map(|i| format!("someIdentifier{i}")).collect::<Vec<_>>().join(" ");
    let query = r.generate_query("", &long_span);
    assert!(query.len() <= 30);
    assert!(!query.is_empty());
}

#[test]
fn empty_span_still_yields_query_from_context() {
    let r = ActiveRetriever::default();
    let query = r.generate_query("OrderService validates payloads", "");
    assert!(query.contains("OrderService"));
}

// ---- Integration splicing ----

#[test]
fn integrate_empty_retrieved_roundtrips_original() {
    let r = ActiveRetriever::default();
    for position in [0usize, 3, 11, 9999] {
        assert_eq!(r.integrate_retrieval("hello world", "", position), "hello world");
    }
}

#[test]
fn integrate_preserves_both_sides() {
    let r = ActiveRetriever::default();
    let merged = r.integrate_retrieval("alpha omega", "beta", 5);
    assert!(merged.starts_with("alpha"));
    assert!(merged.ends_with("omega"));
    assert!(merged.contains("beta"));
    assert!(!merged.contains("  "), "no doubled whitespace at the seams");
}

// ---- Batch planning ----

#[test]
fn plan_honors_gap_between_retrievals() {
    let r = retriever_with(0, 5);
    let tokens: Vec<&str> = vec!["t"; 12];
    let confidences = vec![0.1; 12];
    let points = r.plan_retrievals(&tokens, &confidences);
    assert!(!points.is_empty());
    for pair in points.windows(2) {
        assert!(
            pair[1].position - pair[0].position >= 5,
            "retrievals too close: {} then {}",
            pair[0].position,
            pair[1].position
        );
    }
}

#[test]
fn plan_on_confident_stream_is_empty() {
    let r = ActiveRetriever::default();
    let points = r.plan_retrievals(&["a", "b", "c"], &[0.9, 0.8, 0.95]);
    assert!(points.is_empty());
}
