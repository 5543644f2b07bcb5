// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Stable, recyclable identifiers for live objects.
//!
//! The [`IdentityTable`] is an arena of slots. Each slot holds a weak
//! back-reference to the object currently enrolled in it, plus a generation
//! counter that is bumped every time the slot is released. An [`Identity`]
//! carries both the slot handle and the generation it was issued with, so an
//! identity that outlived its object can never resolve to whatever object
//! reuses the slot later.

use crate::referable::Referable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// A recyclable handle standing in for a live object.
///
/// Handle `0` is the permanent invalid value. A non-zero handle is unique among
/// the currently live registrations, but may be reassigned once released; the
/// generation tells the two occupants apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Identity {
    handle: u32,
    generation: u32,
}

impl Identity {
    /// The invalid identity. Never returned by [`IdentityTable::register`].
    pub const INVALID: Identity = Identity {
        handle: 0,
        generation: 0,
    };

    /// The slot handle. Starts at 1 and may be recycled.
    pub fn handle(&self) -> u32 {
        self.handle
    }

    /// The number of times the slot had been released when this identity was issued.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Returns `false` for [`Identity::INVALID`].
    pub fn is_valid(&self) -> bool {
        self.handle != 0
    }

    fn slot_index(&self) -> Option<usize> {
        self.handle.checked_sub(1).map(|index| index as usize)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.handle, self.generation)
    }
}

struct Slot {
    generation: u32,
    occupant: Option<Weak<dyn Referable>>,
}

/// Maps identities to weak back-references of the objects that own them.
///
/// Registration reuses the most recently released slot first, and grows the
/// slot array otherwise. No operation ever fails: out-of-range, stale, or
/// invalid identities simply report absence.
#[derive(Default)]
pub struct IdentityTable {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl IdentityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Enrolls an object and returns its new identity.
    pub fn register(&mut self, back_ref: Weak<dyn Referable>) -> Identity {
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].occupant = Some(back_ref);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    occupant: Some(back_ref),
                });
                (self.slots.len() - 1) as u32
            }
        };
        self.live += 1;

        Identity {
            handle: index + 1,
            generation: self.slots[index as usize].generation,
        }
    }

    /// Releases an identity so its handle can be reused.
    ///
    /// Returns `false` (and does nothing) for the invalid identity, for a handle
    /// out of range, or for an identity that was already released.
    pub fn release(&mut self, identity: Identity) -> bool {
        let Some(index) = identity.slot_index() else {
            return false;
        };

        match self.slots.get_mut(index) {
            Some(slot) if slot.generation == identity.generation && slot.occupant.is_some() => {
                slot.occupant = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Resolves an identity to its object, if that object is still alive.
    pub fn look_up(&self, identity: Identity) -> Option<Arc<dyn Referable>> {
        let slot = self.slots.get(identity.slot_index()?)?;
        if slot.generation != identity.generation {
            return None;
        }
        slot.occupant.as_ref()?.upgrade()
    }

    /// Returns `true` if the identity is currently registered.
    pub fn contains(&self, identity: Identity) -> bool {
        identity
            .slot_index()
            .and_then(|index| self.slots.get(index))
            .is_some_and(|slot| slot.generation == identity.generation && slot.occupant.is_some())
    }

    /// Number of currently registered identities.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated, live or free.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }
}

impl fmt::Debug for IdentityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityTable")
            .field("slots", &self.slots.len())
            .field("free", &self.free.len())
            .field("live", &self.live)
            .finish()
    }
}

/// A cloneable, internally locked handle to an [`IdentityTable`].
///
/// This is the object the rest of the resource layer passes around. The lock is
/// only ever held for the duration of a single table operation.
#[derive(Clone, Default)]
pub struct IdentityRegistry {
    table: Arc<Mutex<IdentityTable>>,
}

impl IdentityRegistry {
    /// Creates a registry over an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry over a table with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Arc::new(Mutex::new(IdentityTable::with_capacity(capacity))),
        }
    }

    /// Constructs a [`Referable`] inside an `Arc`, enrolling it before it becomes visible.
    ///
    /// `build` receives the lease for the freshly issued identity and must store
    /// it in the object, which ties the release to the object's drop.
    pub fn create<T, F>(&self, build: F) -> Arc<T>
    where
        T: Referable,
        F: FnOnce(IdentityLease) -> T,
    {
        Arc::new_cyclic(|weak: &Weak<T>| {
            let back_ref: Weak<dyn Referable> = weak.clone();
            let identity = self.lock().register(back_ref);
            log::trace!("Registered identity {identity}");
            build(IdentityLease {
                identity,
                table: Arc::downgrade(&self.table),
            })
        })
    }

    /// Resolves an identity to its object, if that object is still alive.
    pub fn look_up(&self, identity: Identity) -> Option<Arc<dyn Referable>> {
        self.lock().look_up(identity)
    }

    /// Returns `true` if the identity is currently registered.
    pub fn contains(&self, identity: Identity) -> bool {
        self.lock().contains(identity)
    }

    /// Number of currently registered identities.
    pub fn live_count(&self) -> usize {
        self.lock().live_count()
    }

    fn lock(&self) -> MutexGuard<'_, IdentityTable> {
        // Every table operation leaves the table consistent, so a poisoned lock is still usable.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdentityRegistry")
            .field(&*self.lock())
            .finish()
    }
}

/// Ownership of one registered identity. Dropping the lease releases it.
///
/// The lease holds the table weakly: if the registry is torn down first, the
/// drop is a no-op.
pub struct IdentityLease {
    identity: Identity,
    table: Weak<Mutex<IdentityTable>>,
}

impl IdentityLease {
    /// The identity this lease owns.
    pub fn identity(&self) -> Identity {
        self.identity
    }
}

impl Drop for IdentityLease {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            let mut table = table.lock().unwrap_or_else(PoisonError::into_inner);
            table.release(self.identity);
        }
    }
}

impl fmt::Debug for IdentityLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdentityLease").field(&self.identity).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::TypeTag;
    use std::any::Any;
    use std::collections::HashSet;

    struct Tracked {
        lease: IdentityLease,
        label: &'static str,
    }

    impl Referable for Tracked {
        fn identity(&self) -> Identity {
            self.lease.identity()
        }

        fn kind(&self) -> TypeTag {
            TypeTag::new("Tracked")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Detached;

    impl Referable for Detached {
        fn identity(&self) -> Identity {
            Identity::INVALID
        }

        fn kind(&self) -> TypeTag {
            TypeTag::new("Detached")
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn detached() -> (Arc<Detached>, Weak<dyn Referable>) {
        let object = Arc::new(Detached);
        let weak: Weak<Detached> = Arc::downgrade(&object);
        (object, weak)
    }

    #[test]
    fn test_register_starts_at_one() {
        let mut table = IdentityTable::new();
        let (_a, weak_a) = detached();
        let (_b, weak_b) = detached();

        let a = table.register(weak_a);
        let b = table.register(weak_b);

        assert_eq!(a.handle(), 1, "The first handle must be 1, never 0");
        assert_eq!(b.handle(), 2);
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn test_release_then_look_up_reports_absence() {
        let mut table = IdentityTable::new();
        let (_object, weak) = detached();
        let id = table.register(weak);

        assert!(table.look_up(id).is_some());
        assert!(table.release(id));
        assert!(
            table.look_up(id).is_none(),
            "A released identity must not resolve to the old object"
        );
    }

    #[test]
    fn test_recycled_handle_gets_new_generation() {
        let mut table = IdentityTable::new();
        let (_first, weak_first) = detached();
        let (_second, weak_second) = detached();

        let old = table.register(weak_first);
        table.release(old);
        let new = table.register(weak_second);

        assert_eq!(new.handle(), old.handle(), "The released handle is reused");
        assert_ne!(new, old);
        assert!(table.look_up(old).is_none(), "The stale identity stays dead");
        assert!(table.look_up(new).is_some());
    }

    #[test]
    fn test_most_recently_released_handle_is_reused_first() {
        let mut table = IdentityTable::new();
        let objects: Vec<_> = (0..3).map(|_| detached()).collect();
        let ids: Vec<_> = objects.iter().map(|(_, w)| table.register(w.clone())).collect();

        table.release(ids[0]);
        table.release(ids[2]);

        let (_object, weak) = detached();
        assert_eq!(table.register(weak).handle(), ids[2].handle());
    }

    #[test]
    fn test_release_is_a_no_op_for_invalid_or_stale_ids() {
        let mut table = IdentityTable::new();
        let (_object, weak) = detached();
        let id = table.register(weak);

        assert!(!table.release(Identity::INVALID));
        assert!(table.release(id));
        assert!(!table.release(id), "Double release must be a no-op");
        assert_eq!(table.live_count(), 0);
        assert!(table.look_up(Identity::INVALID).is_none());
    }

    #[test]
    fn test_out_of_range_look_up_reports_absence() {
        let table = IdentityTable::new();
        let (object, weak) = detached();
        let mut scratch = IdentityTable::new();
        let id = scratch.register(weak);
        drop(object);

        assert!(table.look_up(id).is_none());
        assert!(!table.contains(id));
    }

    #[test]
    fn test_live_ids_stay_unique_across_register_release_sequences() {
        let mut table = IdentityTable::new();
        let mut live: Vec<(Identity, Arc<Detached>)> = Vec::new();
        // Deterministic linear congruential sequence choosing between register and release.
        let mut seed: u32 = 0x2545_f491;

        for _ in 0..2_000 {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            if live.is_empty() || seed % 3 != 0 {
                let (object, weak) = detached();
                live.push((table.register(weak), object));
            } else {
                let victim = (seed as usize / 3) % live.len();
                let (id, _) = live.swap_remove(victim);
                assert!(table.release(id));
            }

            let handles: HashSet<u32> = live.iter().map(|(id, _)| id.handle()).collect();
            assert_eq!(handles.len(), live.len(), "Live handles must be pairwise distinct");
            assert!(live.iter().all(|(id, _)| id.is_valid()));
        }
        assert_eq!(table.live_count(), live.len());
    }

    #[test]
    fn test_registry_create_and_drop_releases_identity() {
        let registry = IdentityRegistry::new();
        let tracked = registry.create(|lease| Tracked {
            lease,
            label: "first",
        });
        let id = tracked.identity();

        let found = registry.look_up(id).expect("The live object should resolve");
        let found = found.into_any().downcast::<Tracked>().ok().unwrap();
        assert_eq!(found.label, "first");
        drop(found);

        drop(tracked);
        assert!(registry.look_up(id).is_none());
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_default_clone_is_not_supported() {
        let registry = IdentityRegistry::new();
        let tracked = registry.create(|lease| Tracked {
            lease,
            label: "original",
        });

        let err = tracked.try_clone(&registry).err().unwrap();
        assert!(matches!(err, crate::ResourceError::CloneNotSupported(kind) if kind.name() == "Tracked"));
    }

    #[test]
    fn test_lease_outliving_registry_is_harmless() {
        let registry = IdentityRegistry::new();
        let tracked = registry.create(|lease| Tracked {
            lease,
            label: "orphan",
        });
        drop(registry);
        drop(tracked);
    }
}
