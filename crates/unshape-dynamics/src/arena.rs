//! Generational storage for bodies.
//!
//! Constraints refer to bodies through [`BodyHandle`]s. A handle stays valid
//! until its body is removed; after that it never resolves again, even if the
//! slot is reused by a newer body.

use std::fmt;

use crate::Body;

/// Stable reference to a body stored in a [`BodySet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle {
    index: u32,
    generation: u32,
}

impl BodyHandle {
    /// Slot index of the handle.
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the handle.
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}v{}", self.index, self.generation)
    }
}

#[derive(Clone, Debug)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Contiguous body storage addressed by generational handles.
#[derive(Clone, Debug, Default)]
pub struct BodySet {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl BodySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bodies.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the set holds no bodies.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a body and return its handle.
    pub fn insert(&mut self, body: Body) -> BodyHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return BodyHandle {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            body: Some(body),
        });
        BodyHandle {
            index,
            generation: 0,
        }
    }

    /// Remove a body. Its handle, and every copy of it, becomes stale.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(body)
    }

    /// Whether `handle` refers to a stored body.
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Get a body by handle.
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_ref()
    }

    /// Get a mutable body by handle.
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.body.as_mut()
    }

    /// Get two distinct bodies mutably.
    ///
    /// Returns `None` if either handle is stale or both refer to the same body.
    pub fn get_pair_mut(
        &mut self,
        first: BodyHandle,
        second: BodyHandle,
    ) -> Option<(&mut Body, &mut Body)> {
        if first.index == second.index {
            return None;
        }
        let (a, b) = (first.index as usize, second.index as usize);
        if a.max(b) >= self.slots.len() {
            return None;
        }

        // Split borrow
        let (slot_a, slot_b) = if a < b {
            let (left, right) = self.slots.split_at_mut(b);
            (&mut left[a], &mut right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(a);
            (&mut right[0], &mut left[b])
        };

        if slot_a.generation != first.generation || slot_b.generation != second.generation {
            return None;
        }
        match (slot_a.body.as_mut(), slot_b.body.as_mut()) {
            (Some(body_a), Some(body_b)) => Some((body_a, body_b)),
            _ => None,
        }
    }

    /// Iterate over stored bodies with their handles, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    /// Iterate mutably over stored bodies, in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> {
        self.slots.iter_mut().filter_map(|slot| slot.body.as_mut())
    }

    /// Handles of all stored bodies, in slot order.
    pub fn handles(&self) -> Vec<BodyHandle> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}
