#![allow(clippy::expect_used, clippy::unwrap_used)]

//! Turn placement for streamed fragments.

use cheddar_stream::{FillerPolicy, Placement, ResponseReconciler};

fn contents(r: &ResponseReconciler) -> Vec<&str> {
    r.turns().iter().map(|t| t.content.as_str()).collect()
}

#[test]
fn growing_fragments_collapse_into_one_turn() {
    let mut r = ResponseReconciler::default();
    r.mark_awaiting_new_turn();
    for fragment in ["Hello", "Hello world", "Hello world!"] {
        r.apply_fragment(fragment);
    }
    assert_eq!(contents(&r), vec!["Hello world!"]);
    assert_eq!(r.active_index(), Some(0));
}

#[test]
fn any_number_of_fragments_keeps_only_the_last() {
    let mut r = ResponseReconciler::default();
    r.mark_awaiting_new_turn();
    let fragments: Vec<String> = (0..50).map(|i| format!("partial answer {i}")).collect();
    for f in &fragments {
        r.apply_fragment(f);
    }
    assert_eq!(r.turns().len(), 1);
    assert_eq!(r.turns()[0].content, "partial answer 49");
}

#[test]
fn ready_status_splits_turns() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("The first answer.");
    assert!(r.apply_status("Ready"));
    let out = r.apply_fragment("The second answer.");

    assert_eq!(out.placement, Placement::NewTurn);
    assert_eq!(out.active_index, Some(1));
    assert_eq!(contents(&r), vec!["The first answer.", "The second answer."]);
    assert!(r.turns()[0].complete);
    assert!(!r.turns()[1].complete);
}

#[test]
fn non_completion_status_keeps_turn_open() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("Thinking about");
    assert!(!r.apply_status("Processing..."));
    let out = r.apply_fragment("Thinking about it");
    assert_eq!(out.placement, Placement::Replaced);
    assert_eq!(r.turns().len(), 1);
}

#[test]
fn filler_replaces_open_turn() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("Let me think about that question");
    let out = r.apply_fragment("Hmm...");
    assert!(out.filler);
    assert_eq!(out.placement, Placement::Replaced);
    assert_eq!(contents(&r), vec!["Hmm..."]);

    r.apply_fragment("okay");
    assert_eq!(contents(&r), vec!["okay"]);
}

#[test]
fn filler_after_completed_turn_starts_a_new_turn() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("A full answer to the question.");
    r.apply_status("Ready");
    let out = r.apply_fragment("okay");

    assert!(out.filler);
    assert_eq!(out.placement, Placement::NewTurn);
    assert_eq!(out.active_index, Some(1));
    assert_eq!(contents(&r), vec!["A full answer to the question.", "okay"]);
    assert!(r.turns()[0].complete);
    assert!(!r.turns()[1].complete);
}

#[test]
fn awaiting_new_turn_beats_open_turn() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("Answer still streaming");
    r.mark_awaiting_new_turn();
    let out = r.apply_fragment("go on");

    assert_eq!(out.placement, Placement::NewTurn);
    assert!(out.filler);
    assert_eq!(contents(&r), vec!["Answer still streaming", "go on"]);
    assert!(r.turns()[0].complete);
    assert!(!r.is_awaiting_new_turn());
}

#[test]
fn replace_does_not_move_navigated_index() {
    let mut r = ResponseReconciler::default();
    r.apply_fragment("first");
    r.mark_last_complete();
    r.apply_fragment("second, streaming");
    r.navigate(-1);

    let out = r.apply_fragment("second, streaming more");
    assert_eq!(out.placement, Placement::Replaced);
    assert_eq!(out.active_index, Some(0));
    assert_eq!(r.counter_label(), "1/2");
    assert_eq!(r.turns()[1].content, "second, streaming more");
}

#[test]
fn turn_indices_are_positions() {
    let mut r = ResponseReconciler::default();
    for text in ["a", "b", "c"] {
        r.mark_awaiting_new_turn();
        r.apply_fragment(text);
    }
    let indices: Vec<usize> = r.turns().iter().map(|t| t.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    assert_eq!(r.active_turn().map(|t| t.content.as_str()), Some("c"));
}

#[test]
fn custom_policy_changes_filler_set() {
    let mut r = ResponseReconciler::new(FillerPolicy::new(10, &["uh"]));
    r.apply_fragment("answer one");
    r.mark_last_complete();
    let out = r.apply_fragment("uh");
    assert!(out.filler);
    assert_eq!(out.placement, Placement::NewTurn);
    assert_eq!(contents(&r), vec!["answer one", "uh"]);

    r.mark_last_complete();
    let out = r.apply_fragment("okay");
    assert!(!out.filler);
    assert_eq!(out.placement, Placement::NewTurn);
    assert_eq!(r.turns().len(), 3);
}
