//! Scoped bind/unbind tracking.
//!
//! wgpu has no global "current framebuffer" or texture-unit state, but the
//! pipeline is written against that model: a pass binds a target, binds
//! input textures to numbered units and uniform blocks to numbered slots,
//! draws, then unbinds. [`BindingState`] keeps that state on the CPU and
//! hands out guards; dropping a guard restores whatever was bound before,
//! so every exit path (including `?`) unbinds.
//!
//! The state is single-threaded (`Cell`/`RefCell`), matching the one-thread
//! frame loop. Guards must be dropped in reverse acquisition order for
//! nested binds of the same slot to restore correctly; scoping makes that
//! the default.

use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicU32, Ordering};

use rustc_hash::FxHashMap;

/// Identity of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetId(u32);

impl RenderTargetId {
    /// The default target (window surface / caller-provided view).
    pub const SCREEN: Self = Self(0);

    /// Allocate a fresh id. Ids are never reused within a process.
    pub fn next() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id value.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Tracks which render target is current.
#[derive(Debug)]
pub struct TargetTracker {
    current: Cell<RenderTargetId>,
}

impl Default for TargetTracker {
    fn default() -> Self {
        Self {
            current: Cell::new(RenderTargetId::SCREEN),
        }
    }
}

impl TargetTracker {
    /// The currently bound target.
    pub fn current(&self) -> RenderTargetId {
        self.current.get()
    }

    /// Make `id` current until the returned guard is dropped.
    pub fn bind(&self, id: RenderTargetId) -> TargetGuard<'_> {
        let previous = self.current.replace(id);
        TargetGuard {
            tracker: self,
            bound: id,
            previous,
        }
    }
}

/// Restores the previously bound target on drop.
#[must_use = "dropping the guard immediately unbinds the target"]
#[derive(Debug)]
pub struct TargetGuard<'a> {
    tracker: &'a TargetTracker,
    bound: RenderTargetId,
    previous: RenderTargetId,
}

impl TargetGuard<'_> {
    /// The target this guard bound.
    pub fn bound(&self) -> RenderTargetId {
        self.bound
    }

    /// The target that will be restored on drop.
    pub fn previous(&self) -> RenderTargetId {
        self.previous
    }
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        self.tracker.current.set(self.previous);
    }
}

/// Numbered binding slots (texture units or uniform-block slots).
#[derive(Debug)]
pub struct SlotTable<V> {
    slots: RefCell<FxHashMap<u32, V>>,
}

impl<V> Default for SlotTable<V> {
    fn default() -> Self {
        Self {
            slots: RefCell::new(FxHashMap::default()),
        }
    }
}

impl<V: Clone> SlotTable<V> {
    /// Bind `value` to `slot` until the returned guard is dropped.
    pub fn bind(&self, slot: u32, value: V) -> SlotGuard<'_, V> {
        let previous = self.slots.borrow_mut().insert(slot, value);
        SlotGuard {
            table: self,
            slot,
            previous,
        }
    }

    /// Clone of the value bound to `slot`.
    pub fn get(&self, slot: u32) -> Option<V> {
        self.slots.borrow().get(&slot).cloned()
    }

    /// Whether anything is bound to `slot`.
    pub fn is_bound(&self, slot: u32) -> bool {
        self.slots.borrow().contains_key(&slot)
    }

    /// Bound slot numbers in ascending order.
    pub fn bound_slots(&self) -> Vec<u32> {
        let mut slots: Vec<u32> = self.slots.borrow().keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    /// Lowest slot whose value matches `predicate`.
    pub fn find(&self, predicate: impl Fn(&V) -> bool) -> Option<u32> {
        self.slots
            .borrow()
            .iter()
            .filter(|(_, v)| predicate(v))
            .map(|(slot, _)| *slot)
            .min()
    }
}

/// Restores the slot's previous occupant (or clears it) on drop.
#[must_use = "dropping the guard immediately unbinds the slot"]
pub struct SlotGuard<'a, V: Clone> {
    table: &'a SlotTable<V>,
    slot: u32,
    previous: Option<V>,
}

impl<V: Clone> SlotGuard<'_, V> {
    /// The slot this guard occupies.
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

impl<V: Clone> Drop for SlotGuard<'_, V> {
    fn drop(&mut self) {
        let mut slots = self.table.slots.borrow_mut();
        match self.previous.take() {
            Some(previous) => {
                let _ = slots.insert(self.slot, previous);
            }
            None => {
                let _ = slots.remove(&self.slot);
            }
        }
    }
}

/// A texture view bound to a unit, tagged with the framebuffer that owns it.
#[derive(Debug, Clone)]
pub struct BoundTexture {
    /// View sampled by the shader.
    pub view: wgpu::TextureView,
    /// Owning render target, if the texture is a framebuffer attachment.
    pub owner: Option<RenderTargetId>,
}

/// All "current binding" state of the frame loop.
#[derive(Debug, Default)]
pub struct BindingState {
    /// Active render target.
    pub targets: TargetTracker,
    /// Texture units.
    pub textures: SlotTable<BoundTexture>,
    /// Uniform-block slots.
    pub uniforms: SlotTable<wgpu::Buffer>,
}

impl BindingState {
    /// Lowest texture unit currently holding an attachment of `target`.
    pub fn unit_sampling(&self, target: RenderTargetId) -> Option<u32> {
        self.textures.find(|bound| bound.owner == Some(target))
    }
}

/// Guard type for texture units.
pub type TextureGuard<'a> = SlotGuard<'a, BoundTexture>;
/// Guard type for uniform slots.
pub type UniformGuard<'a> = SlotGuard<'a, wgpu::Buffer>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_then_unbind_restores_screen() {
        let tracker = TargetTracker::default();
        let fb = RenderTargetId::next();
        {
            let guard = tracker.bind(fb);
            assert_eq!(tracker.current(), fb);
            assert_eq!(guard.previous(), RenderTargetId::SCREEN);
        }
        assert_eq!(tracker.current(), RenderTargetId::SCREEN);
    }

    #[test]
    fn nested_binds_restore_the_outer_target() {
        let tracker = TargetTracker::default();
        let outer = RenderTargetId::next();
        let inner = RenderTargetId::next();
        let outer_guard = tracker.bind(outer);
        {
            let _inner_guard = tracker.bind(inner);
            assert_eq!(tracker.current(), inner);
        }
        assert_eq!(tracker.current(), outer);
        drop(outer_guard);
        assert_eq!(tracker.current(), RenderTargetId::SCREEN);
    }

    #[test]
    fn early_return_still_unbinds() {
        fn bail(tracker: &TargetTracker, id: RenderTargetId) -> Result<(), ()> {
            let _guard = tracker.bind(id);
            Err(())?;
            Ok(())
        }
        let tracker = TargetTracker::default();
        assert!(bail(&tracker, RenderTargetId::next()).is_err());
        assert_eq!(tracker.current(), RenderTargetId::SCREEN);
    }

    #[test]
    fn slot_guard_restores_previous_occupant() {
        let table: SlotTable<&'static str> = SlotTable::default();
        let outer = table.bind(4, "illum");
        {
            let _inner = table.bind(4, "debug");
            assert_eq!(table.get(4), Some("debug"));
        }
        assert_eq!(table.get(4), Some("illum"));
        drop(outer);
        assert!(!table.is_bound(4));
    }

    #[test]
    fn bound_slots_are_sorted_and_searchable() {
        let table: SlotTable<u32> = SlotTable::default();
        let _a = table.bind(30, 7);
        let _b = table.bind(0, 1);
        let _c = table.bind(5, 7);
        assert_eq!(table.bound_slots(), vec![0, 5, 30]);
        assert_eq!(table.find(|v| *v == 7), Some(5));
        assert_eq!(table.find(|v| *v == 9), None);
    }

    #[test]
    fn target_ids_are_unique() {
        let a = RenderTargetId::next();
        let b = RenderTargetId::next();
        assert_ne!(a, b);
        assert_ne!(a, RenderTargetId::SCREEN);
    }
}
