use guardstack_common::{
    Result,
    error::{CorruptionCause, Error},
};

/// The part of a stack an integrity failure was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// The stack record: counters, guards and buffer bookkeeping.
    Structure,
    /// The element buffer.
    Data,
}

impl Region {
    pub fn corruption(self, cause: CorruptionCause) -> Error {
        match self {
            Region::Structure => Error::structure_corruption(cause),
            Region::Data => Error::data_corruption(cause),
        }
    }
}

/// Computes a checksum for a given buffer using the xxHash algorithm.
pub fn compute(buf: &[u8]) -> u64 {
    xxhash_rust::xxh3::xxh3_64(buf)
}

/// Computes a checksum over a sequence of fields, each one seeding the hash
/// of the next.
pub fn compute_fields(fields: &[&[u8]]) -> u64 {
    fields
        .iter()
        .fold(0, |seed, field| xxhash_rust::xxh3::xxh3_64_with_seed(field, seed))
}

/// Validates a buffer by comparing its computed checksum with the expected one.
///
/// # Errors
///
/// Returns a corruption error for `region` if the checksums differ.
pub fn validate(buf: &[u8], expected: u64, region: Region) -> Result<()> {
    if compute(buf) == expected {
        Ok(())
    } else {
        Err(region.corruption(CorruptionCause::Checksum))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardstack_common::error::ErrorKind;

    #[test]
    fn test_compute_is_deterministic() {
        let buf = b"testdata";
        assert_eq!(compute(buf), compute(buf));
        assert_ne!(compute(buf), compute(b"testdatb"));
    }

    #[test]
    fn test_compute_fields_respects_boundaries() {
        let joined = compute_fields(&[b"ab", b"c"]);
        assert_eq!(joined, compute_fields(&[b"ab", b"c"]));
        assert_ne!(joined, compute_fields(&[b"a", b"bc"]));
        assert_ne!(joined, compute_fields(&[b"c", b"ab"]));
    }

    #[test]
    fn test_validate_valid() {
        let buf = b"testdata";
        assert!(validate(buf, compute(buf), Region::Data).is_ok());
    }

    #[test]
    fn test_validate_invalid_checksum() {
        let buf = b"testdata";
        let err = validate(buf, compute(buf) ^ 0x1000, Region::Structure).unwrap_err();
        assert_eq!(
            err.kind(),
            &ErrorKind::StructureCorruption {
                cause: CorruptionCause::Checksum
            }
        );
    }
}
