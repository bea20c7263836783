//! Per-node adaptive child storage.
//!
//! Three representations, promoted in order as children are observed:
//!
//! 1. [`ChildStore::Empty`] — no child frame has ever been seen.
//! 2. [`ChildStore::Single`] — exactly one distinct child, held directly with
//!    no container. The overwhelmingly common case for the long
//!    non-branching chains at the bottom of captured stacks.
//! 3. [`ChildStore::Table`] — two or more distinct children, stored in an
//!    inline linear-probing hash table where each occupied slot's node is
//!    both key and value.
//!
//! The table only ever places a node relative to its own preferred slot
//! (`hash & mask`) and never displaces an occupant. An occupant sitting in
//! its preferred slot therefore terminates any probe chain that could still
//! contain the target, which is what keeps both lookups and inserts within
//! the probe bound instead of scanning the table.

use crate::frame::FrameId;
use crate::node::{SampleNode, TreeError};

/// Upper bound on linear probing past the preferred slot. The effective
/// bound for a table of capacity `n` is `min(n - 1, MAX_PROBE_DISTANCE)`.
pub const MAX_PROBE_DISTANCE: usize = 8;

/// One table slot; an occupied slot's node is both key and value.
pub type Slot = Option<Box<SampleNode>>;

/// Child storage of one [`SampleNode`]. Public so the three-state machine is
/// matchable exhaustively; mutation still only happens through
/// [`SampleNode::child`](crate::node::SampleNode::child).
#[derive(Debug)]
pub enum ChildStore {
    Empty,
    Single(Box<SampleNode>),
    Table(Vec<Slot>),
}

impl ChildStore {
    /// Look up a child by frame identity.
    pub fn find(&self, type_name: &str, method_name: &str) -> Option<&SampleNode> {
        match self {
            ChildStore::Empty => None,
            ChildStore::Single(child) => child
                .frame()
                .matches(type_name, method_name)
                .then(|| child.as_ref()),
            ChildStore::Table(slots) => {
                table_find(slots, type_name, method_name).and_then(|index| slots[index].as_deref())
            }
        }
    }

    /// Number of distinct children.
    pub fn len(&self) -> usize {
        match self {
            ChildStore::Empty => 0,
            ChildStore::Single(_) => 1,
            ChildStore::Table(slots) => slots.iter().filter(|slot| slot.is_some()).count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChildStore::Empty)
    }

    /// Capacity of the probing table, if this store has been promoted that
    /// far. Always a power of two.
    pub fn table_capacity(&self) -> Option<usize> {
        match self {
            ChildStore::Table(slots) => Some(slots.len()),
            _ => None,
        }
    }

    /// Iterate the children in arbitrary order.
    pub fn iter(&self) -> ChildIter<'_> {
        match self {
            ChildStore::Empty => ChildIter {
                single: None,
                table: [].iter(),
            },
            ChildStore::Single(child) => ChildIter {
                single: Some(child),
                table: [].iter(),
            },
            ChildStore::Table(slots) => ChildIter {
                single: None,
                table: slots.iter(),
            },
        }
    }

    /// Look up the child for `(type_name, method_name)`, creating it (with
    /// zeroed counters) and promoting the store as needed. Names are assumed
    /// non-empty; [`SampleNode::child`](crate::node::SampleNode::child)
    /// validates them.
    pub(crate) fn ensure(
        &mut self,
        type_name: &str,
        method_name: &str,
    ) -> Result<&mut SampleNode, TreeError> {
        match self {
            ChildStore::Empty => {
                let child = Box::new(SampleNode::new(FrameId::new(type_name, method_name)?));
                *self = ChildStore::Single(child);
                let ChildStore::Single(child) = self else {
                    return Err(TreeError::Invariant("single child missing after promotion"));
                };
                Ok(child.as_mut())
            }
            ChildStore::Single(child) if !child.frame().matches(type_name, method_name) => {
                // A second distinct child: promote to a table of capacity 2.
                let id = FrameId::new(type_name, method_name)?;
                let ChildStore::Single(existing) = std::mem::replace(self, ChildStore::Empty)
                else {
                    return Err(TreeError::Invariant("single child state lost mid-promotion"));
                };
                let mut slots = empty_slots(2);
                let _ = insert_with_growth(&mut slots, existing);
                let index = insert_with_growth(&mut slots, Box::new(SampleNode::new(id)));
                *self = ChildStore::Table(slots);
                let ChildStore::Table(slots) = self else {
                    return Err(TreeError::Invariant("table state lost mid-promotion"));
                };
                slots[index]
                    .as_deref_mut()
                    .ok_or(TreeError::Invariant("inserted child missing from table"))
            }
            ChildStore::Single(child) => Ok(child.as_mut()),
            ChildStore::Table(slots) => {
                if let Some(index) = table_find(slots, type_name, method_name) {
                    return slots[index]
                        .as_deref_mut()
                        .ok_or(TreeError::Invariant("found child missing from its slot"));
                }
                let id = FrameId::new(type_name, method_name)?;
                let index = insert_with_growth(slots, Box::new(SampleNode::new(id)));
                slots[index]
                    .as_deref_mut()
                    .ok_or(TreeError::Invariant("inserted child missing from table"))
            }
        }
    }
}

/// Iterator over the children of one store, in arbitrary order.
#[derive(Debug)]
pub struct ChildIter<'a> {
    single: Option<&'a SampleNode>,
    table: std::slice::Iter<'a, Slot>,
}

impl<'a> Iterator for ChildIter<'a> {
    type Item = &'a SampleNode;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(child) = self.single.take() {
            return Some(child);
        }
        loop {
            match self.table.next() {
                Some(Some(node)) => return Some(node.as_ref()),
                Some(None) => {}
                None => return None,
            }
        }
    }
}

impl<'a> IntoIterator for &'a ChildStore {
    type Item = &'a SampleNode;
    type IntoIter = ChildIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn probe_limit(capacity: usize) -> usize {
    (capacity - 1).min(MAX_PROBE_DISTANCE)
}

fn empty_slots(capacity: usize) -> Vec<Slot> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

/// Find the slot holding the child with the given identity, within the probe
/// bound. An empty slot or an occupant that sits in its own preferred slot
/// ends the probe chain early.
fn table_find(slots: &[Slot], type_name: &str, method_name: &str) -> Option<usize> {
    let mask = slots.len() - 1;
    let hash = FrameId::combined_hash(type_name, method_name);
    let mut index = (hash as usize) & mask;

    let node = slots[index].as_deref()?;
    if node.frame().hash() == hash && node.frame().matches(type_name, method_name) {
        return Some(index);
    }

    for _ in 0..probe_limit(slots.len()) {
        index = (index + 1) & mask;
        // An empty slot means the chain never reached this far.
        let node = slots[index].as_deref()?;
        if node.frame().hash() == hash && node.frame().matches(type_name, method_name) {
            return Some(index);
        }
        if (node.frame().hash() as usize) & mask == index {
            // Occupant is in its preferred slot: end of any chain that
            // could contain the target.
            return None;
        }
    }

    None
}

/// Place `node` at or near its preferred slot. Returns the node on failure
/// so the caller can grow the table and retry.
///
/// Probing only starts when the current occupant is itself in place; an
/// occupant that is already overspill fails the insert immediately, forcing
/// a resize rather than letting unanchored probe chains build up.
fn table_insert(slots: &mut [Slot], node: Box<SampleNode>) -> Result<usize, Box<SampleNode>> {
    let mask = slots.len() - 1;
    let mut index = (node.frame().hash() as usize) & mask;

    match &slots[index] {
        None => {
            slots[index] = Some(node);
            return Ok(index);
        }
        Some(current) if (current.frame().hash() as usize) & mask != index => {
            return Err(node);
        }
        Some(_) => {}
    }

    for _ in 0..probe_limit(slots.len()) {
        index = (index + 1) & mask;
        match &slots[index] {
            None => {
                slots[index] = Some(node);
                return Ok(index);
            }
            Some(current) if (current.frame().hash() as usize) & mask == index => {
                // Another chain starts here; no room within the probe budget.
                return Err(node);
            }
            Some(_) => {}
        }
    }

    Err(node)
}

/// Insert `node`, doubling the table for as long as it takes. Returns the
/// slot index the node ended up in. Growth never fails outward; the only
/// failure mode left is allocation itself.
fn insert_with_growth(slots: &mut Vec<Slot>, mut node: Box<SampleNode>) -> usize {
    loop {
        match table_insert(slots, node) {
            Ok(index) => return index,
            Err(rejected) => {
                node = rejected;
                log::debug!("child table full at capacity {}, growing", slots.len());
                let doubled = slots.len() << 1;
                let old = std::mem::take(slots);
                *slots = rehash(old, doubled);
            }
        }
    }
}

/// Rebuild the table at `capacity`, reinserting every occupant under the
/// same placement rule. If even the doubled table cannot anchor every probe
/// chain, it doubles again until every node has a slot — a reinsert failure
/// must never drop a node.
fn rehash(old: Vec<Slot>, capacity: usize) -> Vec<Slot> {
    let mut pending: Vec<Box<SampleNode>> = old.into_iter().flatten().collect();
    let mut capacity = capacity;

    loop {
        log::trace!("rehashing {} children into capacity {capacity}", pending.len());
        let mut slots = empty_slots(capacity);
        let mut rejected = None;

        while let Some(node) = pending.pop() {
            if let Err(node) = table_insert(&mut slots, node) {
                rejected = Some(node);
                break;
            }
        }

        match rejected {
            None => return slots,
            Some(node) => {
                pending.push(node);
                pending.extend(slots.into_iter().flatten());
                capacity <<= 1;
            }
        }
    }
}
