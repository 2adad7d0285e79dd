//! Opaque-handle access to guarded stacks.
//!
//! Callers of a [`StackRegistry`] never see a reference or an address: they
//! get a [`StackHandle`], an arena index plus generation scrambled with a
//! per-registry secret key. A handle that does not decode to a live slot,
//! for instance one whose stack has been destroyed, is rejected with
//! [`ErrorKind::NullStructure`].

use std::panic::Location;

use guardstack_common::{Result, error::ErrorKind, result::fail};

use crate::{
    StackElem,
    config::StackConfig,
    dump::StackDump,
    entropy::{self, EntropySource, OsEntropy},
    site::CreationSite,
    stack::GuardedStack,
};

/// Opaque identifier of a stack owned by a [`StackRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StackHandle(u64);

impl StackHandle {
    /// The scrambled handle value, suitable for passing across boundaries
    /// that only carry integers.
    pub fn into_raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> StackHandle {
        StackHandle(raw)
    }
}

struct Slot {
    generation: u32,
    stack: Option<GuardedStack>,
}

/// Owns guarded stacks and resolves [`StackHandle`]s to them.
pub struct StackRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    key: u64,
}

impl StackRegistry {
    /// Creates a registry keyed from the operating system's entropy source.
    pub fn new() -> Result<StackRegistry> {
        Self::with_entropy(&mut OsEntropy)
    }

    /// Creates a registry keyed from `source`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::EntropySourceUnavailable`] if no key can be drawn.
    pub fn with_entropy<E>(source: &mut E) -> Result<StackRegistry>
    where
        E: EntropySource + ?Sized,
    {
        Ok(StackRegistry {
            slots: Vec::new(),
            free: Vec::new(),
            key: entropy::acquire_key(source)?,
        })
    }

    /// Creates a stack and returns its handle.
    #[track_caller]
    pub fn create(
        &mut self,
        config: StackConfig,
        site: Option<CreationSite>,
    ) -> Result<StackHandle> {
        let stack = GuardedStack::create(config, site)?;
        let index = match self.free.pop() {
            Some(index) => {
                self.slots[index as usize].stack = Some(stack);
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    stack: Some(stack),
                });
                (self.slots.len() - 1) as u32
            }
        };
        Ok(self.encode(index, self.slots[index as usize].generation))
    }

    #[track_caller]
    pub fn push(&mut self, handle: StackHandle, value: StackElem) -> Result<()> {
        self.get_mut(handle)?.push(value)
    }

    #[track_caller]
    pub fn pop(&mut self, handle: StackHandle) -> Result<StackElem> {
        self.get_mut(handle)?.pop()
    }

    /// Destroys the stack behind `handle` and retires the handle.
    ///
    /// The slot is freed even if the final verification fails; its outcome
    /// is returned.
    #[track_caller]
    pub fn destroy(&mut self, handle: StackHandle) -> Result<()> {
        let index = self.resolve(handle)?;
        let slot = &mut self.slots[index];
        let mut stack = slot.stack.take().ok_or(ErrorKind::NullStructure)?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        stack.destroy()
    }

    /// Renders the stack behind `handle`; `None` unless it was created with
    /// diagnostics enabled.
    pub fn dump(
        &self,
        handle: StackHandle,
        location: &'static Location<'static>,
    ) -> Result<Option<StackDump<'_>>> {
        Ok(self.get(handle)?.dump(location))
    }

    pub fn get(&self, handle: StackHandle) -> Result<&GuardedStack> {
        let index = self.resolve(handle)?;
        match self.slots[index].stack.as_ref() {
            Some(stack) => Ok(stack),
            None => fail(ErrorKind::NullStructure),
        }
    }

    pub fn get_mut(&mut self, handle: StackHandle) -> Result<&mut GuardedStack> {
        let index = self.resolve(handle)?;
        match self.slots[index].stack.as_mut() {
            Some(stack) => Ok(stack),
            None => fail(ErrorKind::NullStructure),
        }
    }

    /// Number of live stacks.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn encode(&self, index: u32, generation: u32) -> StackHandle {
        StackHandle((((index as u64) << 32) | generation as u64) ^ self.key)
    }

    /// Decodes `handle` to the index of an occupied slot whose generation
    /// matches.
    fn resolve(&self, handle: StackHandle) -> Result<usize> {
        let raw = handle.0 ^ self.key;
        let index = (raw >> 32) as usize;
        let generation = raw as u32;
        match self.slots.get(index) {
            Some(slot) if slot.generation == generation && slot.stack.is_some() => Ok(index),
            _ => fail(ErrorKind::NullStructure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StackRegistry {
        let mut source = || -> Option<u64> { Some(0x5EED_1234_ABCD_0001) };
        StackRegistry::with_entropy(&mut source).unwrap()
    }

    #[test]
    fn test_handle_is_not_the_index() {
        let mut registry = registry();
        let handle = registry.create(StackConfig::paranoid(), None).unwrap();
        assert_ne!(handle.into_raw(), 0);
        assert_ne!(handle.into_raw() >> 32, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_push_pop_through_handle() {
        let mut registry = registry();
        let handle = registry.create(StackConfig::paranoid(), None).unwrap();
        registry.push(handle, 10).unwrap();
        registry.push(handle, 20).unwrap();
        assert_eq!(registry.get(handle).unwrap().len(), 2);
        assert_eq!(registry.pop(handle).unwrap(), 20);
        assert_eq!(registry.pop(handle).unwrap(), 10);
    }

    #[test]
    fn test_destroyed_handle_is_rejected() {
        let mut registry = registry();
        let handle = registry.create(StackConfig::paranoid(), None).unwrap();
        registry.destroy(handle).unwrap();
        assert!(registry.is_empty());

        let err = registry.push(handle, 1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NullStructure);
        let err = registry.destroy(handle).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::NullStructure);
    }

    #[test]
    fn test_slot_reuse_bumps_generation() {
        let mut registry = registry();
        let first = registry.create(StackConfig::bare(), None).unwrap();
        registry.destroy(first).unwrap();
        let second = registry.create(StackConfig::bare(), None).unwrap();
        assert_ne!(first, second);
        assert!(registry.get(first).is_err());
        assert!(registry.get(second).is_ok());
    }

    #[test]
    fn test_forged_handle_is_rejected() {
        let mut registry = registry();
        let handle = registry.create(StackConfig::bare(), None).unwrap();
        let forged = StackHandle::from_raw(handle.into_raw() ^ (1 << 40));
        assert_eq!(
            registry.pop(forged).unwrap_err().kind(),
            &ErrorKind::NullStructure
        );
        assert_eq!(
            registry.pop(StackHandle::from_raw(0)).unwrap_err().kind(),
            &ErrorKind::NullStructure
        );
    }

    #[test]
    fn test_registry_without_entropy() {
        let mut source = || -> Option<u64> { None };
        let err = StackRegistry::with_entropy(&mut source).err().unwrap();
        assert_eq!(err.kind(), &ErrorKind::EntropySourceUnavailable);
    }

    #[test]
    fn test_dump_through_handle() {
        let mut registry = registry();
        let quiet = registry.create(StackConfig::bare(), None).unwrap();
        assert!(registry.dump(quiet, Location::caller()).unwrap().is_none());

        let loud = registry
            .create(StackConfig::paranoid(), Some(crate::creation_site!(loud)))
            .unwrap();
        registry.push(loud, 3).unwrap();
        let text = registry
            .dump(loud, Location::caller())
            .unwrap()
            .unwrap()
            .to_string();
        assert!(text.contains("\"loud\""));
        assert!(text.contains("*[0]"));
    }
}
