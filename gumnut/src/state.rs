//! Search states and the incremental cost of one matching decision.

use crate::chain::Chain;
use crate::class::{NodeClass, RelationClass};
use crate::credit::CreditTable;
use crate::document::RelationTree;
use crate::error::MatchError;
use crate::relations::Direction;
use crate::trace;
use core::cmp::{Ordering, Reverse};
use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;
use smallvec::SmallVec;

/// A node of the search: a partial matching and its accumulated cost.
#[derive(Debug, Clone)]
pub struct SearchState {
    /// Relation losses charged so far.
    pub cost: u64,
    /// Nodes of the first document matched (not dropped) so far.
    pub matches: u32,
    /// Relations confirmed kept so far.
    pub retained: u32,
    /// Position in the decision order of the next node to decide.
    pub cursor: usize,
    /// Decisions made so far, newest first.
    pub chain: Chain,
    /// Remaining credits.
    pub credit: CreditTable,
}

/// Frontier priority: lower cost, then more retained, then more matches.
pub type Rank = (u64, Reverse<u32>, Reverse<u32>);

impl SearchState {
    /// The initial state: nothing decided yet.
    pub fn root(credit: CreditTable) -> Self {
        Self {
            cost: 0,
            matches: 0,
            retained: 0,
            cursor: 0,
            chain: Chain::new(),
            credit,
        }
    }

    /// Frontier ordering key; smaller is better.
    pub fn rank(&self) -> Rank {
        (self.cost, Reverse(self.retained), Reverse(self.matches))
    }

    /// Compare two states by frontier priority.
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }

    /// Derive the child state that decides `a ↦ b` (or drops `a` when `b` is
    /// `None`).
    pub fn expand<TA, TB>(
        &self,
        tree_a: &TA,
        tree_b: &TB,
        a: NodeId,
        b: Option<NodeId>,
    ) -> Result<SearchState, MatchError>
    where
        TA: RelationTree,
        TB: RelationTree,
    {
        let mut credit = self.credit.clone();
        let mut cost = 0;
        let mut retained = 0;

        for direction in Direction::ALL {
            let settled = self.settle(&mut credit, tree_a, tree_b, a, b, direction)?;
            cost += settled.cost;
            retained += settled.retained;
        }

        trace!(
            a = usize::from(a),
            b = b.map(usize::from),
            cost,
            retained,
            "expand"
        );

        Ok(SearchState {
            cost: self.cost + cost,
            matches: self.matches + u32::from(b.is_some()),
            retained: self.retained + retained,
            cursor: self.cursor + 1,
            chain: self.chain.extend(Some(a), b),
            credit,
        })
    }

    /// Charge the relations of `a` (and `b`) in one direction.
    fn settle<TA, TB>(
        &self,
        credit: &mut CreditTable,
        tree_a: &TA,
        tree_b: &TB,
        a: NodeId,
        b: Option<NodeId>,
        direction: Direction,
    ) -> Result<Settled, MatchError>
    where
        TA: RelationTree,
        TB: RelationTree,
    {
        let class_a = tree_a.class(a);
        let mut settled = Settled::default();
        // counterparts in B that a's already-decided neighbors were matched to
        let mut expected: SmallVec<[NodeId; 8]> = SmallVec::new();
        // undecided neighbors, netted per class: +1 for A's side, -1 for B's
        let mut pending: HashMap<NodeClass, i32> = HashMap::default();

        for &r1 in tree_a.related(a, direction) {
            match self.chain.find_by_a(r1) {
                Some(decided) => {
                    // a dropped neighbor was charged when it was dropped
                    if let Some(r2) = decided.b
                        && !expected.contains(&r2)
                    {
                        expected.push(r2);
                    }
                }
                None => *pending.entry(tree_a.class(r1)).or_default() += 1,
            }
        }

        if let Some(b) = b {
            let class_b = tree_b.class(b);
            for &r2 in tree_b.related(b, direction) {
                if self.chain.find_by_b(r2).is_some() {
                    if let Some(pos) = expected.iter().position(|&n| n == r2) {
                        expected.swap_remove(pos);
                        settled.retained += 1;
                    } else {
                        let class = orient(direction, class_b, tree_b.class(r2));
                        settled.cost += credit.modify(class, -1)?;
                    }
                } else {
                    *pending.entry(tree_b.class(r2)).or_default() -= 1;
                }
            }
        }

        // dropping `a` forfeits the relation from both sides at once
        let weight = if b.is_some() { 1 } else { 2 };
        for r2 in expected {
            let class = orient(direction, class_a, tree_b.class(r2));
            settled.cost += credit.modify(class, weight)?;
        }

        for (class, count) in pending {
            settled.cost += credit.modify(orient(direction, class_a, class), count)?;
        }

        Ok(settled)
    }
}

#[derive(Debug, Default)]
struct Settled {
    cost: u64,
    retained: u32,
}

/// The relation class between a decided node and a neighbor, read in
/// `direction` from the decided node.
fn orient(direction: Direction, node: NodeClass, neighbor: NodeClass) -> RelationClass {
    match direction {
        Direction::Down => RelationClass::new(node, neighbor),
        Direction::Up => RelationClass::new(neighbor, node),
    }
}
