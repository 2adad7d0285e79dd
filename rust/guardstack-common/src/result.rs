use crate::error::ErrorKind;

pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Returns early with `$kind` from the enclosing function when `$expr`
/// evaluates to `false`.
#[macro_export]
macro_rules! verify_state {
    ($expr:expr, $kind:expr) => {{
        let result = $expr;
        $crate::result::verify_state(result, $kind)?;
    }};
}

#[inline]
pub fn verify_state(predicate: bool, kind: ErrorKind) -> Result<()> {
    if predicate { Ok(()) } else { fail(kind) }
}

#[cold]
pub fn fail<T>(kind: ErrorKind) -> Result<T> {
    Err(kind.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_count(count: i64) -> Result<()> {
        verify_state!(count >= 0, ErrorKind::Underflow);
        Ok(())
    }

    #[test]
    fn test_verify_state() {
        assert!(check_count(3).is_ok());
        let err = check_count(-1).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Underflow);
    }
}
