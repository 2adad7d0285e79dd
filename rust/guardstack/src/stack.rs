use std::panic::Location;

use guardstack_buffer::GuardedVec;
use guardstack_common::{Result, error::Error, error::ErrorKind, flags::ErrorFlags};

use crate::{
    DATA_GUARD, DEFAULT_CAPACITY, GROWTH_FACTOR, SHRINK_THRESHOLD, STRUCTURE_GUARD, StackElem,
    checksum, config::StackConfig, dump::StackDump, site::CreationSite,
};

/// Stored checksums of a stack record and its buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Checksums {
    /// Covers the record, excluding the checksums and the error register.
    pub structure: u64,
    /// Covers every slot of the buffer, unused ones included.
    pub content: u64,
}

/// Where a stack record is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Active,
    /// Terminal: the buffer is released and the record cannot be initialized
    /// again.
    Destroyed,
}

/// A LIFO stack of [`StackElem`] that verifies its own integrity around
/// every mutation.
///
/// The counters are kept signed: the record is treated as untrusted state
/// and is only interpreted after [`GuardedStack::verify`] has accepted it.
///
/// Lifecycle: [`GuardedStack::uninit`] → [`GuardedStack::init`] (or
/// [`GuardedStack::create`]) → push/pop → [`GuardedStack::destroy`].
/// A destroyed stack keeps reporting [`ErrorKind::NullBuffer`] and refuses
/// to be initialized again.
pub struct GuardedStack {
    pub(crate) head_guard: u64,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) site: Option<CreationSite>,
    pub(crate) checksums: Checksums,
    pub(crate) error_flags: ErrorFlags,
    pub(crate) config: StackConfig,
    pub(crate) buffer: GuardedVec<StackElem>,
    pub(crate) count: i64,
    pub(crate) capacity: i64,
    pub(crate) tail_guard: u64,
}

impl GuardedStack {
    /// Creates an empty record without a buffer.
    pub fn uninit(config: StackConfig) -> GuardedStack {
        let guard = config.guard_markers().then_some(DATA_GUARD);
        GuardedStack {
            head_guard: 0,
            lifecycle: Lifecycle::Uninitialized,
            site: None,
            checksums: Checksums::default(),
            error_flags: ErrorFlags::empty(),
            config,
            buffer: GuardedVec::unallocated(guard),
            count: 0,
            capacity: 0,
            tail_guard: 0,
        }
    }

    /// Allocates and initializes a stack of [`DEFAULT_CAPACITY`] slots.
    ///
    /// `site` is kept only when diagnostics are enabled.
    #[track_caller]
    pub fn create(config: StackConfig, site: Option<CreationSite>) -> Result<GuardedStack> {
        let mut stack = GuardedStack::uninit(config);
        stack.init(site)?;
        Ok(stack)
    }

    /// Allocates the buffer of an uninitialized record.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::AlreadyInitialized`] if the record has left the
    ///   uninitialized state, owns a buffer or shows non-zero counters.
    /// - [`ErrorKind::AllocationFailure`] if the buffer cannot be allocated.
    #[track_caller]
    pub fn init(&mut self, site: Option<CreationSite>) -> Result<()> {
        if self.lifecycle != Lifecycle::Uninitialized
            || self.buffer.is_allocated()
            || self.count != 0
            || self.capacity != 0
        {
            return Err(self.report(ErrorKind::AlreadyInitialized.into()));
        }

        if self.config.diagnostics() {
            self.site = site;
        }
        if self.config.guard_markers() {
            self.head_guard = STRUCTURE_GUARD;
            self.tail_guard = STRUCTURE_GUARD;
        }

        let guard = self.buffer.guard_value();
        let buffer = match GuardedVec::<StackElem>::try_with_capacity(DEFAULT_CAPACITY, guard) {
            Ok(buffer) => buffer,
            Err(_) => return Err(self.report(Error::allocation_failure(DEFAULT_CAPACITY))),
        };
        self.buffer = buffer;
        self.lifecycle = Lifecycle::Active;
        self.count = 0;
        self.capacity = DEFAULT_CAPACITY as i64;
        self.rehash();

        log::debug!(
            "created stack {} with capacity {}",
            self.name(),
            DEFAULT_CAPACITY
        );
        self.verify()
    }

    /// Pushes `value` on top of the stack, growing the buffer when full.
    ///
    /// # Errors
    ///
    /// Any verification failure before or after the write, or
    /// [`ErrorKind::OutOfMemory`] if the buffer cannot grow.
    #[track_caller]
    pub fn push(&mut self, value: StackElem) -> Result<()> {
        self.verify()?;

        if self.count == self.capacity {
            self.grow()?;
        }

        let index = self.count as usize;
        self.buffer.as_mut_slice()[index] = value;
        self.count += 1;

        self.rehash();
        self.verify()
    }

    /// Removes and returns the top element, halving the buffer whenever the
    /// count falls to `capacity / SHRINK_THRESHOLD` or below.
    ///
    /// The vacated slot is cleared to zero.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::Underflow`] on an empty stack, any verification failure
    /// before or after the read, or [`ErrorKind::OutOfMemory`] if the buffer
    /// cannot shrink.
    #[track_caller]
    pub fn pop(&mut self) -> Result<StackElem> {
        self.verify()?;

        if self.count == 0 {
            return Err(self.report(Error::underflow()));
        }

        if self.should_shrink(self.count - 1) {
            self.shrink()?;
        }

        self.count -= 1;
        let slot = &mut self.buffer.as_mut_slice()[self.count as usize];
        let value = *slot;
        *slot = 0;

        self.rehash();
        self.verify()?;
        Ok(value)
    }

    /// Releases the buffer and zeroes the record.
    ///
    /// The stack is verified first and the outcome is returned, but the
    /// buffer is released either way: detecting corruption never frees
    /// memory by itself, so this is also how a corrupted stack is disposed of.
    /// Only the error register survives, for post-mortem inspection.
    #[track_caller]
    pub fn destroy(&mut self) -> Result<()> {
        let verdict = self.verify();
        log::debug!("destroyed stack {}", self.name());

        self.buffer.release();
        self.lifecycle = Lifecycle::Destroyed;
        self.head_guard = 0;
        self.tail_guard = 0;
        self.site = None;
        self.count = 0;
        self.capacity = 0;
        self.checksums = Checksums::default();
        verdict
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.count.max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allocated element slots.
    pub fn capacity(&self) -> usize {
        self.capacity.max(0) as usize
    }

    /// The top element, if any.
    pub fn peek(&self) -> Option<StackElem> {
        self.len().checked_sub(1).and_then(|i| self.buffer.get(i))
    }

    /// The live elements, bottom first.
    pub fn as_slice(&self) -> &[StackElem] {
        let slots = self.buffer.as_slice();
        &slots[..self.len().min(slots.len())]
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn config(&self) -> StackConfig {
        self.config
    }

    pub fn site(&self) -> Option<&CreationSite> {
        self.site.as_ref()
    }

    /// Every error kind this stack has observed so far.
    pub fn error_flags(&self) -> ErrorFlags {
        self.error_flags
    }

    /// The stored checksums, when checksums are enabled.
    pub fn checksums(&self) -> Option<Checksums> {
        self.config.checksums().then_some(self.checksums)
    }

    /// Renders the stack state, as seen from `location`.
    ///
    /// Returns `None` unless diagnostics are enabled.
    pub fn dump(&self, location: &'static Location<'static>) -> Option<StackDump<'_>> {
        self.config
            .diagnostics()
            .then(|| StackDump::new(self, location))
    }

    /// [`GuardedStack::dump`] at the caller's location.
    #[track_caller]
    pub fn dump_here(&self) -> Option<StackDump<'_>> {
        self.dump(Location::caller())
    }
}

impl GuardedStack {
    pub(crate) fn name(&self) -> &'static str {
        self.site.map_or("<unnamed>", |site| site.name)
    }

    pub(crate) fn should_shrink(&self, new_count: i64) -> bool {
        self.capacity() > DEFAULT_CAPACITY
            && new_count <= (self.capacity() / SHRINK_THRESHOLD) as i64
    }

    /// Whether the stack holds far more slots than the shrink policy would
    /// ever leave it with.
    pub(crate) fn uses_excess_memory(&self) -> bool {
        self.capacity() > DEFAULT_CAPACITY
            && self.count < (self.capacity() / SHRINK_THRESHOLD) as i64 - 1
    }

    /// Image of the record covered by the structural checksum: everything
    /// except the stored checksums themselves.
    pub(crate) fn structure_image(&self) -> [u64; 12] {
        [
            self.head_guard,
            self.lifecycle as u64,
            self.count as u64,
            self.capacity as u64,
            self.buffer.capacity() as u64,
            self.buffer.base_address() as u64,
            self.buffer.leading_guard().unwrap_or(0),
            self.buffer.trailing_guard().unwrap_or(0),
            self.config.bits(),
            self.site.map_or(0, |site| site.digest()),
            self.error_flags.bits() as u64,
            self.tail_guard,
        ]
    }

    pub(crate) fn compute_checksums(&self) -> Checksums {
        Checksums {
            structure: checksum::compute(bytemuck::bytes_of(&self.structure_image())),
            content: checksum::compute(self.buffer.as_bytes()),
        }
    }

    /// Refreshes the stored checksums after a legitimate mutation.
    pub(crate) fn rehash(&mut self) {
        if self.config.checksums() {
            self.checksums = self.compute_checksums();
        }
    }

    /// Adds `flags` to the error register.
    ///
    /// The register is part of the structural checksum, so the checksums are
    /// refreshed, but only when they still matched beforehand: a stale
    /// checksum is evidence of corruption and must stay stale.
    pub(crate) fn record(&mut self, flags: ErrorFlags) {
        if self.error_flags.contains(flags) {
            return;
        }
        let intact = self.config.checksums() && self.checksums == self.compute_checksums();
        self.error_flags |= flags;
        if intact {
            self.rehash();
        }
    }

    /// Records `err` in the error register, dumps the stack when the kind
    /// calls for it, and hands the error back.
    #[track_caller]
    pub(crate) fn report(&mut self, err: Error) -> Error {
        self.record(ErrorFlags::from(err.kind()));
        if err.kind().triggers_dump() {
            if let Some(dump) = self.dump(Location::caller()) {
                log::error!("{err}\n{dump}");
            }
        }
        err
    }

    #[track_caller]
    fn grow(&mut self) -> Result<()> {
        match self.capacity().checked_mul(GROWTH_FACTOR) {
            Some(new_capacity) => self.resize(new_capacity),
            None => Err(self.report(Error::out_of_memory(usize::MAX))),
        }
    }

    #[track_caller]
    fn shrink(&mut self) -> Result<()> {
        let new_capacity = (self.capacity() / GROWTH_FACTOR).max(DEFAULT_CAPACITY);
        self.resize(new_capacity)
    }

    #[track_caller]
    fn resize(&mut self, new_capacity: usize) -> Result<()> {
        let old_capacity = self.capacity();
        if self.buffer.try_resize(new_capacity).is_err() {
            return Err(self.report(Error::out_of_memory(new_capacity)));
        }
        self.capacity = new_capacity as i64;
        self.rehash();

        log::debug!(
            "resized stack {} from {old_capacity} to {new_capacity}",
            self.name()
        );
        Ok(())
    }
}

impl std::fmt::Debug for GuardedStack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedStack")
            .field("name", &self.name())
            .field("lifecycle", &self.lifecycle)
            .field("count", &self.count)
            .field("capacity", &self.capacity)
            .field("config", &self.config)
            .field("error_flags", &self.error_flags)
            .finish_non_exhaustive()
    }
}
