use guardstack_common::{Result, error::ErrorKind, result::fail};
use rand::{TryRngCore, rngs::OsRng};

/// Maximum number of samples drawn before giving up on an entropy source.
pub const MAX_ENTROPY_RETRIES: usize = 10;

/// A source of random 64-bit words that may be temporarily unavailable.
pub trait EntropySource {
    /// Draws one word, or `None` if the source could not produce one.
    fn random64(&mut self) -> Option<u64>;
}

/// The operating system's random number generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn random64(&mut self) -> Option<u64> {
        OsRng.try_next_u64().ok()
    }
}

impl<F> EntropySource for F
where
    F: FnMut() -> Option<u64>,
{
    fn random64(&mut self) -> Option<u64> {
        self()
    }
}

/// Draws a non-zero key from `source`, re-sampling up to
/// [`MAX_ENTROPY_RETRIES`] times.
///
/// # Errors
///
/// Returns [`ErrorKind::EntropySourceUnavailable`] if every attempt fails or
/// yields zero.
pub fn acquire_key<E>(source: &mut E) -> Result<u64>
where
    E: EntropySource + ?Sized,
{
    for attempt in 1..=MAX_ENTROPY_RETRIES {
        match source.random64() {
            Some(key) if key != 0 => return Ok(key),
            _ => log::debug!("entropy sample {attempt}/{MAX_ENTROPY_RETRIES} rejected"),
        }
    }
    log::error!("entropy source unavailable after {MAX_ENTROPY_RETRIES} attempts");
    fail(ErrorKind::EntropySourceUnavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_entropy() {
        let key = acquire_key(&mut OsEntropy).unwrap();
        assert_ne!(key, 0);
    }

    #[test]
    fn test_retries_until_success() {
        let mut calls = 0;
        let mut flaky = || -> Option<u64> {
            calls += 1;
            match calls {
                1 => None,
                2 => Some(0),
                _ => Some(0xC0FFEE),
            }
        };
        assert_eq!(acquire_key(&mut flaky).unwrap(), 0xC0FFEE);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_bounded_retries() {
        let mut calls = 0;
        let mut broken = || -> Option<u64> {
            calls += 1;
            None
        };
        let err = acquire_key(&mut broken).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EntropySourceUnavailable);
        assert_eq!(calls, MAX_ENTROPY_RETRIES);
    }
}
