//! Uniform-cost search over partial matchings.
//!
//! The nodes of the first document are decided one at a time, in a fixed
//! order that puts the most constrained nodes (fewest same-class candidates in
//! the second document) first. Each step pops the best state off the frontier
//! and pushes one child per unassigned candidate, plus one child that drops the
//! node. The first state popped with every node decided is the result.
//!
//! States live in a slot pool and are referenced from the frontier by handle;
//! popping a state takes it out of its slot, so a state is expanded or freed
//! exactly once.

use crate::chain::Chain;
use crate::credit::ClassIndex;
use crate::document::RelationTree;
use crate::error::MatchError;
use crate::matching::Matching;
use crate::relations::RelationCounts;
use crate::state::{Rank, SearchState};
use crate::trace::{StepRecord, TraceSink};
use crate::{debug, trace, warning};
use core::cmp::Ordering;
use core::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// How much of the frontier is kept between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Keep every state; the result has the lowest cost the model allows.
    #[default]
    Exhaustive,
    /// Keep only the best state after each step (greedy hill-climb).
    FastApproximate,
}

/// Configuration for the search.
#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    /// Search mode.
    pub mode: SearchMode,

    /// After this many steps, continue in [`SearchMode::FastApproximate`].
    /// Bounds the run time and memory of exhaustive searches on large inputs.
    pub greedy_after: Option<u64>,
}

/// Shared flag to stop a running search from outside. Checked once per step.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the search to stop at its next step.
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

/// What a single [`Search::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A state was expanded; the search goes on.
    Expanded,
    /// A terminal state was reached.
    Finished,
}

/// Frontier handle to a pooled state.
#[derive(Debug, Clone, Copy)]
struct FrontierEntry {
    rank: Rank,
    seq: u64,
    id: u32,
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap pops the greatest; the best rank (then oldest) must win
        (other.rank, other.seq).cmp(&(self.rank, self.seq))
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

/// Slot storage for frontier states.
#[derive(Debug, Default)]
struct StatePool {
    slots: Vec<Option<SearchState>>,
    free: Vec<u32>,
}

impl StatePool {
    fn insert(&mut self, state: SearchState) -> u32 {
        match self.free.pop() {
            Some(id) => {
                self.slots[id as usize] = Some(state);
                id
            }
            None => {
                self.slots.push(Some(state));
                (self.slots.len() - 1) as u32
            }
        }
    }

    fn take(&mut self, id: u32) -> Result<SearchState, MatchError> {
        let state = self
            .slots
            .get_mut(id as usize)
            .and_then(Option::take)
            .ok_or(MatchError::StateReleased { id })?;
        self.free.push(id);
        Ok(state)
    }

    fn release(&mut self, id: u32) {
        if let Some(slot) = self.slots.get_mut(id as usize)
            && slot.take().is_some()
        {
            self.free.push(id);
        }
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

/// A best-first search for the matching between two documents that loses the
/// fewest relations.
pub struct Search<'a, TA, TB> {
    tree_a: &'a TA,
    tree_b: &'a TB,
    mode: SearchMode,
    greedy_after: Option<u64>,
    degraded: bool,
    order: Vec<NodeId>,
    frontier: BinaryHeap<FrontierEntry>,
    pool: StatePool,
    next_seq: u64,
    steps: u64,
    max_retained: u64,
    result: Option<SearchState>,
    trace: Option<&'a mut dyn TraceSink>,
    cancel: Option<CancelFlag>,
}

impl<'a, TA, TB> Search<'a, TA, TB>
where
    TA: RelationTree,
    TB: RelationTree,
{
    /// Prepare a search: build the class index from both documents' relation
    /// counts, fix the decision order, and seed the frontier with the empty
    /// matching.
    pub fn new(tree_a: &'a TA, tree_b: &'a TB, config: &SearchConfig) -> Self {
        let credit = ClassIndex::bootstrap(tree_a.relation_counts(), tree_b.relation_counts());
        let max_retained =
            RelationCounts::max_retained(tree_a.relation_counts(), tree_b.relation_counts());

        // fewest candidates first; stable, so ties keep document order
        let mut order: Vec<NodeId> = tree_a.nodes().collect();
        order.sort_by_key(|&a| tree_b.nodes_of_class(tree_a.class(a)).len());

        debug!(
            nodes_a = tree_a.node_count(),
            nodes_b = tree_b.node_count(),
            max_retained,
            mode = ?config.mode,
            "search start"
        );

        let mut search = Self {
            tree_a,
            tree_b,
            mode: config.mode,
            greedy_after: config.greedy_after,
            degraded: false,
            order,
            frontier: BinaryHeap::new(),
            pool: StatePool::default(),
            next_seq: 0,
            steps: 0,
            max_retained,
            result: None,
            trace: None,
            cancel: None,
        };
        search.push(SearchState::root(credit));
        search
    }

    /// Send one [`StepRecord`] per step to `sink`.
    pub fn with_trace(mut self, sink: &'a mut dyn TraceSink) -> Self {
        self.trace = Some(sink);
        self
    }

    /// Stop with [`MatchError::Cancelled`] once `flag` is set.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The order in which nodes of the first document are decided.
    pub fn order(&self) -> &[NodeId] {
        &self.order
    }

    /// Number of steps taken.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of states waiting in the frontier.
    pub fn frontier_len(&self) -> usize {
        self.frontier.len()
    }

    /// Mode currently in effect (may differ from the configured one after
    /// `greedy_after` kicked in).
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    fn push(&mut self, state: SearchState) {
        let entry = FrontierEntry {
            rank: state.rank(),
            seq: self.next_seq,
            id: self.pool.insert(state),
        };
        self.next_seq += 1;
        self.frontier.push(entry);
    }

    /// Expand the best frontier state.
    pub fn step(&mut self) -> Result<Step, MatchError> {
        if self.result.is_some() {
            return Ok(Step::Finished);
        }
        if let Some(flag) = &self.cancel
            && flag.is_cancelled()
        {
            warning!(steps = self.steps, "search cancelled");
            return Err(MatchError::Cancelled { steps: self.steps });
        }

        let frontier = self.frontier.len();
        let Some(entry) = self.frontier.pop() else {
            return Err(MatchError::FrontierExhausted { steps: self.steps });
        };
        let state = self.pool.take(entry.id)?;
        self.steps += 1;

        trace!(
            step = self.steps,
            state = entry.seq,
            cost = state.cost,
            retained = state.retained,
            matched = state.matches,
            frontier,
            "pop"
        );
        if let Some(sink) = self.trace.as_deref_mut() {
            sink.record(&StepRecord {
                step: self.steps,
                state: entry.seq,
                cost: state.cost,
                retained: state.retained,
                matched: state.matches,
                frontier,
            });
        }

        let Some(&a) = self.order.get(state.cursor) else {
            debug!(
                steps = self.steps,
                cost = state.cost,
                retained = state.retained,
                matched = state.matches,
                "terminal state reached"
            );
            self.result = Some(state);
            return Ok(Step::Finished);
        };

        let (tree_a, tree_b) = (self.tree_a, self.tree_b);
        for &b in tree_b.nodes_of_class(tree_a.class(a)) {
            if state.chain.find_by_b(b).is_none() {
                let child = state.expand(tree_a, tree_b, a, Some(b))?;
                self.push(child);
            }
        }
        let dropped = state.expand(tree_a, tree_b, a, None)?;
        self.push(dropped);
        drop(state);

        if self.mode == SearchMode::Exhaustive
            && self.greedy_after.is_some_and(|limit| self.steps >= limit)
        {
            warning!(
                steps = self.steps,
                frontier = self.frontier.len(),
                "step budget exhausted, continuing greedily"
            );
            self.mode = SearchMode::FastApproximate;
            self.degraded = true;
        }
        if self.mode == SearchMode::FastApproximate {
            self.keep_best();
        }

        Ok(Step::Expanded)
    }

    fn keep_best(&mut self) {
        let Some(best) = self.frontier.pop() else {
            return;
        };
        for entry in self.frontier.drain() {
            self.pool.release(entry.id);
        }
        self.frontier.push(best);
    }

    /// Step until a terminal state is reached, then hand out the result.
    pub fn run(mut self) -> Result<Outcome, MatchError> {
        while self.step()? == Step::Expanded {}
        self.finish()
    }

    /// Turn the terminal state into an [`Outcome`], releasing every state
    /// still in the frontier.
    ///
    /// Fails with [`MatchError::NotFinished`] if [`Search::step`] has not
    /// returned [`Step::Finished`] yet.
    pub fn finish(mut self) -> Result<Outcome, MatchError> {
        let Some(state) = self.result.take() else {
            return Err(MatchError::NotFinished { steps: self.steps });
        };

        let matched_b: HashSet<NodeId> = state.chain.iter().filter_map(|p| p.b).collect();
        let mut chain = state.chain.clone();
        let mut inserted = 0;
        for b in self.tree_b.nodes() {
            if !matched_b.contains(&b) {
                chain = chain.extend(None, Some(b));
                inserted += 1;
            }
        }
        let dropped = self.order.len() - state.matches as usize;

        debug!(
            cost = state.cost,
            retained = state.retained,
            matched = state.matches,
            dropped,
            inserted,
            steps = self.steps,
            abandoned = self.pool.live(),
            "search finished"
        );
        self.frontier.clear();
        self.pool.clear();

        Ok(Outcome {
            chain,
            cost: state.cost,
            retained: state.retained,
            matched: state.matches,
            dropped,
            inserted,
            steps: self.steps,
            max_retained: self.max_retained,
            sunk_loss: state.credit.index().sunk_loss(),
            exhaustive: self.mode == SearchMode::Exhaustive,
        })
    }
}

/// The result of a search.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// Every decision, newest first: one entry per node of the first
    /// document, then one `(None, b)` entry per unmatched node of the second.
    pub chain: Chain,
    /// Relations lost to the matching (sunk losses excluded).
    pub cost: u64,
    /// Relations kept.
    pub retained: u32,
    /// Matched pairs.
    pub matched: u32,
    /// Nodes of the first document left unmatched.
    pub dropped: usize,
    /// Nodes of the second document left unmatched.
    pub inserted: usize,
    /// Search steps taken.
    pub steps: u64,
    /// Upper bound on relations any matching could keep.
    pub max_retained: u64,
    /// Relations present in one document only, lost whatever the matching.
    pub sunk_loss: u64,
    /// Whether the search stayed exhaustive to the end, so the cost is the
    /// model's minimum.
    pub exhaustive: bool,
}

impl Outcome {
    /// Bidirectional lookup view of the result.
    pub fn matching(&self) -> Matching {
        Matching::from_chain(&self.chain)
    }
}

/// Compute the matching between two documents.
///
/// Shorthand for `Search::new(tree_a, tree_b, config).run()`.
pub fn match_documents<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    config: &SearchConfig,
) -> Result<Outcome, MatchError>
where
    TA: RelationTree,
    TB: RelationTree,
{
    Search::new(tree_a, tree_b, config).run()
}
