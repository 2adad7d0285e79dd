use guardstack_common::{
    Result,
    error::{CorruptionCause, ErrorKind},
    flags::ErrorFlags,
    result::fail,
    verify_state,
};

use crate::{
    DATA_GUARD, STRUCTURE_GUARD,
    checksum::{self, Region},
    stack::GuardedStack,
};

impl GuardedStack {
    /// Runs every enabled integrity check, stopping at the first failure.
    ///
    /// Checks, in order: buffer presence, counter bounds, the memory pressure
    /// heuristic, guard markers, checksums. A failure is recorded in
    /// [`GuardedStack::error_flags`] and, when diagnostics are enabled and
    /// the kind is dump-worthy, logged together with a dump of the stack.
    /// Verification never repairs or frees anything.
    ///
    /// Excess memory usage is advisory: it is flagged and logged, and only
    /// fails verification under [`crate::StackConfig::with_strict_memory`].
    #[track_caller]
    pub fn verify(&mut self) -> Result<()> {
        match self.run_checks() {
            Ok(()) => Ok(()),
            Err(err) => Err(self.report(err)),
        }
    }

    fn run_checks(&mut self) -> Result<()> {
        self.check_bounds()?;
        self.check_memory_pressure()?;
        if self.config.guard_markers() {
            self.check_guards()?;
        }
        if self.config.checksums() {
            self.check_checksums()?;
        }
        Ok(())
    }

    fn check_bounds(&self) -> Result<()> {
        verify_state!(self.buffer.is_allocated(), ErrorKind::NullBuffer);
        verify_state!(self.capacity >= 0, ErrorKind::NegativeCapacity);
        verify_state!(self.count >= 0, ErrorKind::Underflow);
        verify_state!(self.count <= self.capacity, ErrorKind::Overflow);
        if self.capacity() != self.buffer.capacity() {
            return Err(Region::Structure.corruption(CorruptionCause::Inconsistent));
        }
        Ok(())
    }

    fn check_memory_pressure(&mut self) -> Result<()> {
        if !self.uses_excess_memory() {
            return Ok(());
        }
        if self.config.strict_memory() {
            return fail(ErrorKind::ExcessMemoryUsage);
        }
        self.record(ErrorFlags::EXCESS_MEMORY_USAGE);
        log::warn!(
            "stack {} holds {} slots for {} elements",
            self.name(),
            self.capacity,
            self.count
        );
        Ok(())
    }

    fn check_guards(&self) -> Result<()> {
        if self.head_guard != STRUCTURE_GUARD || self.tail_guard != STRUCTURE_GUARD {
            return Err(Region::Structure.corruption(CorruptionCause::Guard));
        }
        if self.buffer.guard_value() != Some(DATA_GUARD) || !self.buffer.guards_intact() {
            return Err(Region::Data.corruption(CorruptionCause::Guard));
        }
        Ok(())
    }

    fn check_checksums(&self) -> Result<()> {
        checksum::validate(
            bytemuck::bytes_of(&self.structure_image()),
            self.checksums.structure,
            Region::Structure,
        )?;
        checksum::validate(self.buffer.as_bytes(), self.checksums.content, Region::Data)
    }
}
