//! End-to-end properties of the search.

use facet_testhelpers::test;
use gumnut::{
    Assignment, Axis, ClassIndex, Document, JsonLinesTrace, MatchError, NodeKind, RelationTree,
    Search, SearchConfig, SearchMode, SearchState, StepRecord, match_documents,
};
use indextree::NodeId;
use std::collections::HashSet;

fn list(items: &[&str], axis: Axis) -> Document {
    let mut doc = Document::new("ul");
    for item in items {
        let li = doc.add_element(doc.root, "li");
        doc.add_text(li, item);
    }
    doc.relate_axis(axis);
    doc
}

/// A small page: head with a title, body with a few paragraphs, some of them
/// carrying attributes.
fn page(title: &str, paragraphs: &[(&str, Option<&str>)]) -> Document {
    let mut doc = Document::new("html");
    let head = doc.add_element(doc.root, "head");
    let t = doc.add_element(head, "title");
    doc.add_text(t, title);
    let body = doc.add_element(doc.root, "body");
    for &(text, class) in paragraphs {
        let p = doc.add_element(body, "p");
        if let Some(class) = class {
            doc.add_attribute(p, "class", class);
        }
        doc.add_text(p, text);
    }
    doc.relate_axis(Axis::ChildrenAndGrandchildren);
    doc
}

fn exhaustive() -> SearchConfig {
    SearchConfig::default()
}

fn fast() -> SearchConfig {
    SearchConfig {
        mode: SearchMode::FastApproximate,
        ..Default::default()
    }
}

fn decisions(outcome: &gumnut::Outcome) -> Vec<Assignment> {
    outcome.chain.iter().collect()
}

/// Every node of A appears in exactly one entry, every node of B in exactly
/// one entry, and matched nodes share a class.
fn assert_complete(a: &Document, b: &Document, outcome: &gumnut::Outcome) {
    let mut seen_a: HashSet<NodeId> = HashSet::new();
    let mut seen_b: HashSet<NodeId> = HashSet::new();
    for pair in outcome.chain.iter() {
        assert!(pair.a.is_some() || pair.b.is_some(), "empty entry");
        if let Some(x) = pair.a {
            assert!(seen_a.insert(x), "A node {x:?} decided twice");
        }
        if let Some(y) = pair.b {
            assert!(seen_b.insert(y), "B node {y:?} used twice");
        }
        if let (Some(x), Some(y)) = (pair.a, pair.b) {
            assert_eq!(a.class(x), b.class(y));
        }
    }
    assert_eq!(seen_a.len(), a.node_count());
    assert_eq!(seen_b.len(), b.node_count());
}

/// Rebuild the result state by applying the decisions in the order they were
/// made.
fn replay(a: &Document, b: &Document, outcome: &gumnut::Outcome) -> SearchState {
    let mut made: Vec<Assignment> = outcome.chain.iter().filter(|p| p.a.is_some()).collect();
    made.reverse();
    let mut state = SearchState::root(ClassIndex::bootstrap(
        a.relation_counts(),
        b.relation_counts(),
    ));
    for pair in made {
        let Some(x) = pair.a else { continue };
        state = state.expand(a, b, x, pair.b).unwrap();
    }
    state
}

#[test]
fn test_identical_documents_cost_nothing() {
    let a = page(
        "Home",
        &[("hello", Some("lead")), ("world", None), ("hello", None)],
    );
    let b = a.clone();
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_eq!(outcome.cost, 0);
    assert_eq!(outcome.matched as usize, a.node_count());
    assert_eq!(outcome.dropped, 0);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.sunk_loss, 0);
    assert!(u64::from(outcome.retained) <= outcome.max_retained);
    assert!(outcome.exhaustive);
    assert_complete(&a, &b, &outcome);
}

#[test]
fn test_single_equal_nodes() {
    let a = Document::new("only");
    let b = Document::new("only");
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_eq!(outcome.cost, 0);
    assert_eq!(outcome.matched, 1);
    assert_eq!(outcome.retained, 0);
    assert_eq!(
        decisions(&outcome),
        vec![Assignment {
            a: Some(a.root),
            b: Some(b.root)
        }]
    );
}

#[test]
fn test_single_different_nodes() {
    let a = Document::new("left");
    let b = Document::new("right");
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_eq!(outcome.cost, 0);
    assert_eq!(outcome.matched, 0);
    assert_eq!(outcome.dropped, 1);
    assert_eq!(outcome.inserted, 1);
    // the inserted entry is appended last, so it is the newest
    assert_eq!(
        decisions(&outcome),
        vec![
            Assignment {
                a: None,
                b: Some(b.root)
            },
            Assignment {
                a: Some(a.root),
                b: None
            },
        ]
    );
}

#[test]
fn test_reordering_is_free() {
    let a = list(&["x", "y", "z"], Axis::Children);
    let b = list(&["z", "x", "y"], Axis::Children);
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_eq!(outcome.cost, 0);
    assert_eq!(outcome.matched as usize, a.node_count());
    assert_complete(&a, &b, &outcome);

    // each item keeps its own text
    let matching = outcome.matching();
    for li in a.children(a.root) {
        let text_a = a.children(li).next().unwrap();
        let li_b = matching.get_b(li).unwrap();
        let text_b = b.children(li_b).next().unwrap();
        assert_eq!(matching.get_b(text_a), Some(text_b));
    }
}

#[test]
fn test_removed_item_is_dropped() {
    let a = list(&["a", "b", "c"], Axis::Children);
    let b = list(&["a", "c"], Axis::Children);
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_complete(&a, &b, &outcome);
    assert_eq!(outcome.cost, 1);
    assert_eq!(outcome.dropped, 2);
    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.sunk_loss, 1);

    let li_b = a.children(a.root).nth(1).unwrap();
    let text_b = a.children(li_b).next().unwrap();
    let matching = outcome.matching();
    let mut dropped = matching.dropped().to_vec();
    dropped.sort();
    let mut expected = vec![li_b, text_b];
    expected.sort();
    assert_eq!(dropped, expected);
}

#[test]
fn test_changed_attribute_is_inserted_and_dropped() {
    let a = page("T", &[("body text", Some("old"))]);
    let b = page("T", &[("body text", Some("new"))]);
    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();
    assert_complete(&a, &b, &outcome);

    let matching = outcome.matching();
    assert_eq!(matching.dropped().len(), 1);
    assert_eq!(matching.inserted().len(), 1);
    assert_eq!(a.kind(matching.dropped()[0]), NodeKind::Attribute);
    assert_eq!(b.kind(matching.inserted()[0]), NodeKind::Attribute);
}

#[test]
fn test_result_is_deterministic() {
    let a = list(&["a", "b", "a", "c", "b"], Axis::ChildrenAndGrandchildren);
    let b = list(&["b", "a", "c", "a"], Axis::ChildrenAndGrandchildren);
    let first = match_documents(&a, &b, &exhaustive()).unwrap();
    let second = match_documents(&a, &b, &exhaustive()).unwrap();

    assert_eq!(first.cost, second.cost);
    assert_eq!(first.steps, second.steps);
    assert_eq!(decisions(&first), decisions(&second));
}

#[test]
fn test_spent_credit_equals_cost() {
    let a = page(
        "Before",
        &[("one", Some("x")), ("two", None), ("three", Some("y"))],
    );
    let b = page(
        "After",
        &[("two", None), ("one", Some("x")), ("four", Some("y"))],
    );
    for config in [exhaustive(), fast()] {
        let outcome = match_documents(&a, &b, &config).unwrap();
        assert_complete(&a, &b, &outcome);

        let state = replay(&a, &b, &outcome);
        assert_eq!(state.cost, outcome.cost);
        assert_eq!(state.credit.spent(), state.cost);
        assert_eq!(state.matches, outcome.matched);
        assert_eq!(state.retained, outcome.retained);
    }
}

#[test]
fn test_popped_costs_never_decrease() {
    let a = list(&["a", "b", "c", "a"], Axis::ChildrenAndGrandchildren);
    let b = list(&["c", "a", "d"], Axis::ChildrenAndGrandchildren);
    let mut records: Vec<StepRecord> = Vec::new();
    let outcome = Search::new(&a, &b, &exhaustive())
        .with_trace(&mut records)
        .run()
        .unwrap();

    assert_eq!(records.len() as u64, outcome.steps);
    assert!(
        records.windows(2).all(|w| w[0].cost <= w[1].cost),
        "{records:?}"
    );
    let last = records.last().unwrap();
    assert_eq!(last.cost, outcome.cost);
    assert_eq!(last.matched, outcome.matched);
}

#[test]
fn test_fast_mode_is_never_cheaper() {
    let cases: [(&[&str], &[&str]); 3] = [
        (&["a", "b", "a", "c"], &["c", "a", "b"]),
        (&["x", "x", "y"], &["y", "x"]),
        (&["p", "q", "r", "s"], &["s", "r", "q", "p"]),
    ];
    for (left, right) in cases {
        let a = list(left, Axis::ChildrenAndGrandchildren);
        let b = list(right, Axis::ChildrenAndGrandchildren);
        let best = match_documents(&a, &b, &exhaustive()).unwrap();
        let quick = match_documents(&a, &b, &fast()).unwrap();

        assert!(quick.cost >= best.cost, "{left:?} vs {right:?}");
        assert!(!quick.exhaustive);
        assert_complete(&a, &b, &quick);
        // one expansion per node, plus the terminal pop
        assert_eq!(quick.steps as usize, a.node_count() + 1);
    }
}

#[test]
fn test_descendant_axis() {
    let build = |leaf: &str| {
        let mut doc = Document::new("section");
        let div = doc.add_element(doc.root, "div");
        let span = doc.add_element(div, "span");
        doc.add_text(span, leaf);
        doc.relate_axis(Axis::Descendants);
        doc
    };
    let a = build("deep");
    let b = build("deep");
    assert_eq!(a.relation_counts().total(), 6);

    let outcome = match_documents(&a, &b, &exhaustive()).unwrap();
    assert_eq!(outcome.cost, 0);
    assert_eq!(outcome.retained, 6);
}

#[test]
fn test_json_lines_trace() {
    let a = list(&["a", "b"], Axis::Children);
    let b = list(&["b", "a"], Axis::Children);
    let mut sink = JsonLinesTrace::new(Vec::new());
    let outcome = Search::new(&a, &b, &exhaustive())
        .with_trace(&mut sink)
        .run()
        .unwrap();
    assert!(!sink.is_broken());

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let records: Vec<StepRecord> = out
        .lines()
        .map(|line| facet_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len() as u64, outcome.steps);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.step, i as u64 + 1);
    }
}

#[test]
fn test_finish_before_terminal_is_an_error() {
    let a = Document::new("solo");
    let b = Document::new("solo");
    let mut search = Search::new(&a, &b, &exhaustive());
    // the root expands into a match and a drop; the match is terminal
    search.step().unwrap();
    search.step().unwrap();
    let outcome = search.finish().unwrap();
    assert_eq!(outcome.matched, 1);

    let mut search = Search::new(&a, &b, &exhaustive());
    search.step().unwrap();
    let err = search.finish().unwrap_err();
    assert!(matches!(err, MatchError::NotFinished { steps: 1 }));
}
