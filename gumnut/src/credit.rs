//! Credit accounting: turns "did this relation survive?" into O(1)
//! incremental cost updates.
//!
//! Every relation class seen in either document gets an entry in the
//! [`ClassIndex`]:
//!
//! - **unique**: present in only one document. Those relations are lost no
//!   matter what, so they never cost anything during the search.
//! - **once**: exactly one occurrence in each document. Losing it costs 1.
//! - **slot**: everything else gets a signed counter in the per-state credit
//!   vector, seeded with `2 * (count_a - count_b)`.
//!
//! The index is built once per search by [`ClassIndex::bootstrap`] and frozen
//! behind an `Rc`; every [`CreditTable`] derived from the root table shares it
//! and owns only its counter vector.

use crate::class::RelationClass;
use crate::debug;
use crate::error::MatchError;
use crate::relations::RelationCounts;
use rapidhash::RapidHashMap as HashMap;
use std::rc::Rc;

/// How a relation class is accounted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassEntry {
    /// Present in one document only; a sunk loss.
    Unique,
    /// Exactly one occurrence in each document.
    Once,
    /// Tracked in the credit vector at this index.
    Slot(u32),
}

/// Frozen map from relation class to its accounting entry.
#[derive(Debug)]
pub struct ClassIndex {
    entries: HashMap<RelationClass, ClassEntry>,
    slots: usize,
    once: usize,
    unique: usize,
    sunk_loss: u64,
}

impl ClassIndex {
    /// Build the class index from both documents' relation counts and return
    /// the root credit table that owns it.
    ///
    /// Classes are visited in canonical order, so slot numbering only depends
    /// on the interned classes, not on hash map iteration order.
    pub fn bootstrap(a: &RelationCounts, b: &RelationCounts) -> CreditTable {
        let mut classes = a.sorted_classes();
        classes.extend(b.sorted_classes());
        classes.sort_unstable();
        classes.dedup();

        let mut index = ClassIndex {
            entries: HashMap::default(),
            slots: 0,
            once: 0,
            unique: 0,
            sunk_loss: 0,
        };
        let mut seed = Vec::new();

        for class in classes {
            let entry = match (a.get(&class), b.get(&class)) {
                (Some(ca), Some(cb)) if ca == 1 && cb == 1 => {
                    index.once += 1;
                    ClassEntry::Once
                }
                (Some(ca), Some(cb)) => {
                    let slot = index.slots as u32;
                    index.slots += 1;
                    seed.push(2 * (ca as i32 - cb as i32));
                    ClassEntry::Slot(slot)
                }
                (Some(only), None) | (None, Some(only)) => {
                    index.unique += 1;
                    index.sunk_loss += u64::from(only);
                    ClassEntry::Unique
                }
                (None, None) => continue,
            };
            index.entries.insert(class, entry);
        }

        debug!(
            slots = index.slots,
            once = index.once,
            unique = index.unique,
            sunk_loss = index.sunk_loss,
            "class index bootstrapped"
        );

        CreditTable {
            index: Rc::new(index),
            credits: seed.into_boxed_slice(),
            spent: 0,
        }
    }

    /// Accounting entry for a class.
    pub fn lookup(&self, class: &RelationClass) -> Option<ClassEntry> {
        self.entries.get(class).copied()
    }

    /// Number of credit slots (length of every credit vector).
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Number of classes occurring exactly once in each document.
    pub fn once_count(&self) -> usize {
        self.once
    }

    /// Number of classes present in only one document.
    pub fn unique_count(&self) -> usize {
        self.unique
    }

    /// Relation occurrences lost regardless of the matching.
    pub fn sunk_loss(&self) -> u64 {
        self.sunk_loss
    }
}

/// A search state's credit vector, plus the shared class index.
///
/// Cloning copies the vector and shares the index.
#[derive(Debug, Clone)]
pub struct CreditTable {
    index: Rc<ClassIndex>,
    credits: Box<[i32]>,
    spent: u64,
}

impl CreditTable {
    /// The shared class index.
    pub fn index(&self) -> &ClassIndex {
        &self.index
    }

    /// Current balance of a slot-tracked class.
    pub fn balance(&self, class: &RelationClass) -> Option<i32> {
        match self.index.lookup(class)? {
            ClassEntry::Slot(slot) => self.credits.get(slot as usize).copied(),
            ClassEntry::Once | ClassEntry::Unique => None,
        }
    }

    /// Sum of every cost `modify` returned along this table's lineage.
    pub fn spent(&self) -> u64 {
        self.spent
    }

    /// Apply a signed adjustment to a class's balance and return its
    /// marginal cost.
    ///
    /// A positive surplus absorbs spending for free until it runs out; from
    /// then on every unit is charged. The same holds mirrored for a negative
    /// balance, and any change away from zero is charged in full.
    pub fn modify(&mut self, class: RelationClass, delta: i32) -> Result<u64, MatchError> {
        let entry = self
            .index
            .lookup(&class)
            .ok_or_else(|| MatchError::UnknownRelationClass {
                class: class.to_string(),
            })?;

        let cost = match entry {
            ClassEntry::Unique => 0,
            ClassEntry::Once => u64::from(delta > 0),
            ClassEntry::Slot(slot) => {
                let cell = &mut self.credits[slot as usize];
                let old = *cell;
                let new = old - delta;
                *cell = new;
                let cost = match old.signum() {
                    1 => (-delta).max(0) + (-new).max(0),
                    -1 => delta.max(0) + new.max(0),
                    _ => delta.abs(),
                };
                cost as u64
            }
        };
        self.spent += cost;
        Ok(cost)
    }
}
