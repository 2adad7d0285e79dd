use bitflags::bitflags;

use crate::error::ErrorKind;

bitflags! {
    /// Sticky record of every error kind a stack instance has observed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ErrorFlags: u32 {
        const ENTROPY_SOURCE_UNAVAILABLE = 1 << 0;
        const ALREADY_INITIALIZED = 1 << 1;
        const NULL_STRUCTURE = 1 << 2;
        const NULL_BUFFER = 1 << 3;
        const NEGATIVE_CAPACITY = 1 << 4;
        const UNDERFLOW = 1 << 5;
        const OVERFLOW = 1 << 6;
        const OUT_OF_MEMORY = 1 << 7;
        const ALLOCATION_FAILURE = 1 << 8;
        const EXCESS_MEMORY_USAGE = 1 << 9;
        const STRUCTURE_CORRUPTION = 1 << 10;
        const DATA_CORRUPTION = 1 << 11;
    }
}

impl From<&ErrorKind> for ErrorFlags {
    fn from(kind: &ErrorKind) -> Self {
        match kind {
            ErrorKind::EntropySourceUnavailable => ErrorFlags::ENTROPY_SOURCE_UNAVAILABLE,
            ErrorKind::AlreadyInitialized => ErrorFlags::ALREADY_INITIALIZED,
            ErrorKind::NullStructure => ErrorFlags::NULL_STRUCTURE,
            ErrorKind::NullBuffer => ErrorFlags::NULL_BUFFER,
            ErrorKind::NegativeCapacity => ErrorFlags::NEGATIVE_CAPACITY,
            ErrorKind::Underflow => ErrorFlags::UNDERFLOW,
            ErrorKind::Overflow => ErrorFlags::OVERFLOW,
            ErrorKind::OutOfMemory { .. } => ErrorFlags::OUT_OF_MEMORY,
            ErrorKind::AllocationFailure { .. } => ErrorFlags::ALLOCATION_FAILURE,
            ErrorKind::ExcessMemoryUsage => ErrorFlags::EXCESS_MEMORY_USAGE,
            ErrorKind::StructureCorruption { .. } => ErrorFlags::STRUCTURE_CORRUPTION,
            ErrorKind::DataCorruption { .. } => ErrorFlags::DATA_CORRUPTION,
        }
    }
}

impl ErrorFlags {
    /// True if any corruption kind has ever been recorded.
    pub fn has_corruption(&self) -> bool {
        self.intersects(ErrorFlags::STRUCTURE_CORRUPTION | ErrorFlags::DATA_CORRUPTION)
    }
}
