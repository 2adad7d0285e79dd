use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn underflow() -> Error {
        ErrorKind::Underflow.into()
    }

    pub fn out_of_memory(requested: usize) -> Error {
        ErrorKind::OutOfMemory { requested }.into()
    }

    pub fn allocation_failure(requested: usize) -> Error {
        ErrorKind::AllocationFailure { requested }.into()
    }

    pub fn structure_corruption(cause: CorruptionCause) -> Error {
        ErrorKind::StructureCorruption { cause }.into()
    }

    pub fn data_corruption(cause: CorruptionCause) -> Error {
        ErrorKind::DataCorruption { cause }.into()
    }

    /// Process exit status for this error, see [`ErrorKind::exit_code`].
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }
}

/// Which integrity layer detected a corruption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionCause {
    /// A guard marker no longer holds its sentinel value.
    Guard,
    /// A freshly recomputed checksum differs from the stored one.
    Checksum,
    /// The metadata record disagrees with the buffer it describes.
    Inconsistent,
}

impl std::fmt::Display for CorruptionCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CorruptionCause::Guard => f.write_str("guard marker mismatch"),
            CorruptionCause::Checksum => f.write_str("checksum mismatch"),
            CorruptionCause::Inconsistent => f.write_str("metadata does not match the buffer"),
        }
    }
}

/// The kinds of failure a guarded stack can report.
///
/// The declaration order fixes the exit codes. Only the overflow-class and
/// corruption-class kinds are dump-worthy, see [`ErrorKind::triggers_dump`];
/// allocation failures are not.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("hardware entropy source is unavailable")]
    EntropySourceUnavailable,

    #[error("stack is already initialized")]
    AlreadyInitialized,

    #[error("stack structure does not exist")]
    NullStructure,

    #[error("stack buffer is not allocated")]
    NullBuffer,

    #[error("stack capacity is negative")]
    NegativeCapacity,

    #[error("stack underflow")]
    Underflow,

    #[error("stack overflow")]
    Overflow,

    #[error("out of memory while resizing the buffer to {requested} elements")]
    OutOfMemory { requested: usize },

    #[error("failed to allocate a buffer of {requested} elements")]
    AllocationFailure { requested: usize },

    #[error("stack holds much more memory than it uses")]
    ExcessMemoryUsage,

    #[error("stack structure is corrupted: {cause}")]
    StructureCorruption { cause: CorruptionCause },

    #[error("stack data is corrupted: {cause}")]
    DataCorruption { cause: CorruptionCause },
}

impl ErrorKind {
    /// Stable, upper-case label printed by top-level callers.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorKind::EntropySourceUnavailable => "CANT_CREATE_RAND_NUM",
            ErrorKind::AlreadyInitialized => "STACK_ALREADY_INITED",
            ErrorKind::NullStructure => "NULL_STK_STRUCT_PTR",
            ErrorKind::NullBuffer => "NULL_STK_DATA_PTR",
            ErrorKind::NegativeCapacity => "NEG_STK_CAPACITY",
            ErrorKind::Underflow => "STACK_UNDERFLOW",
            ErrorKind::Overflow => "STACK_OVERFLOW",
            ErrorKind::OutOfMemory { .. } => "OUT_OF_MEMORY",
            ErrorKind::AllocationFailure { .. } => "ALLOCATION_FAILURE",
            ErrorKind::ExcessMemoryUsage => "STACK_USES_MUCH_MEM",
            ErrorKind::StructureCorruption { .. } => "STKSTRUCT_CORRUPT",
            ErrorKind::DataCorruption { .. } => "STKDATA_CORRUPT",
        }
    }

    /// Distinct non-zero process exit status for each kind.
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::EntropySourceUnavailable => 1,
            ErrorKind::AlreadyInitialized => 2,
            ErrorKind::NullStructure => 3,
            ErrorKind::NullBuffer => 4,
            ErrorKind::NegativeCapacity => 5,
            ErrorKind::Underflow => 6,
            ErrorKind::Overflow => 7,
            ErrorKind::OutOfMemory { .. } => 8,
            ErrorKind::AllocationFailure { .. } => 9,
            ErrorKind::ExcessMemoryUsage => 10,
            ErrorKind::StructureCorruption { .. } => 11,
            ErrorKind::DataCorruption { .. } => 12,
        }
    }

    /// Whether a diagnostic build should dump the stack before propagating
    /// this error.
    pub fn triggers_dump(&self) -> bool {
        matches!(
            self,
            ErrorKind::Underflow
                | ErrorKind::Overflow
                | ErrorKind::ExcessMemoryUsage
                | ErrorKind::StructureCorruption { .. }
                | ErrorKind::DataCorruption { .. }
        )
    }

    /// Advisory kinds describe wasteful but consistent state.
    pub fn is_advisory(&self) -> bool {
        matches!(self, ErrorKind::ExcessMemoryUsage)
    }

    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ErrorKind::StructureCorruption { .. } | ErrorKind::DataCorruption { .. }
        )
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<ErrorKind> {
        vec![
            ErrorKind::EntropySourceUnavailable,
            ErrorKind::AlreadyInitialized,
            ErrorKind::NullStructure,
            ErrorKind::NullBuffer,
            ErrorKind::NegativeCapacity,
            ErrorKind::Underflow,
            ErrorKind::Overflow,
            ErrorKind::OutOfMemory { requested: 16 },
            ErrorKind::AllocationFailure { requested: 8 },
            ErrorKind::ExcessMemoryUsage,
            ErrorKind::StructureCorruption {
                cause: CorruptionCause::Guard,
            },
            ErrorKind::DataCorruption {
                cause: CorruptionCause::Checksum,
            },
        ]
    }

    #[test]
    fn test_exit_codes_are_distinct_and_non_zero() {
        let mut codes = all_kinds().iter().map(|k| k.exit_code()).collect::<Vec<_>>();
        assert!(codes.iter().all(|&c| c != 0));
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all_kinds().len());
    }

    #[test]
    fn test_labels_are_distinct() {
        let mut labels = all_kinds().iter().map(|k| k.label()).collect::<Vec<_>>();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), all_kinds().len());
    }

    #[test]
    fn test_dump_worthy_kinds() {
        assert!(!ErrorKind::NullBuffer.triggers_dump());
        assert!(!ErrorKind::OutOfMemory { requested: 1 }.triggers_dump());
        assert!(!ErrorKind::AllocationFailure { requested: 1 }.triggers_dump());
        assert!(ErrorKind::ExcessMemoryUsage.triggers_dump());
        assert!(ErrorKind::Underflow.triggers_dump());
        assert!(
            ErrorKind::DataCorruption {
                cause: CorruptionCause::Guard
            }
            .triggers_dump()
        );
    }

    #[test]
    fn test_error_display() {
        let e = Error::structure_corruption(CorruptionCause::Checksum);
        assert_eq!(
            e.to_string(),
            "stack structure is corrupted: checksum mismatch"
        );
        assert!(e.kind().is_corruption());
        assert_eq!(e.exit_code(), 11);
    }
}
