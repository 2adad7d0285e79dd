use std::{fmt, ops::Range, panic::Location};

use crate::{StackElem, stack::GuardedStack};

/// Human-readable rendering of a stack's state, produced by
/// [`GuardedStack::dump`].
///
/// Runs of equal consecutive slots are collapsed into a single line:
///
/// ```text
/// GuardedStack "stack" [0x5581c0a1e2a0] at src/main.rs:40 born at src/main.rs:12 (demo)
/// {
///     count    = 3
///     capacity = 8
///
///     data [0x5581c0a1f310]:
///     {
///         *[0]         = 7
///         *[1 - 2]     = 9
///         *[3 - 7]     = 0
///     }
/// }
/// ```
pub struct StackDump<'a> {
    stack: &'a GuardedStack,
    location: &'static Location<'static>,
}

impl<'a> StackDump<'a> {
    pub(crate) fn new(stack: &'a GuardedStack, location: &'static Location<'static>) -> Self {
        StackDump { stack, location }
    }
}

impl fmt::Display for StackDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stack = self.stack;
        write!(
            f,
            "GuardedStack \"{}\" [{:#x}] at {}:{}",
            stack.name(),
            stack as *const GuardedStack as usize,
            self.location.file(),
            self.location.line()
        )?;
        match stack.site() {
            Some(site) => writeln!(f, " born at {site}")?,
            None => writeln!(f, " born at <unknown>")?,
        }

        writeln!(f, "{{")?;
        writeln!(f, "    {:<8} = {}", "count", stack.count)?;
        writeln!(f, "    {:<8} = {}", "capacity", stack.capacity)?;
        writeln!(f)?;
        writeln!(f, "    data [{:#x}]:", stack.buffer.base_address())?;
        writeln!(f, "    {{")?;
        for (range, value) in runs(stack.buffer.as_slice()) {
            let index = if range.len() == 1 {
                format!("*[{}]", range.start)
            } else {
                format!("*[{} - {}]", range.start, range.end - 1)
            };
            writeln!(f, "        {index:<12} = {value}")?;
        }
        writeln!(f, "    }}")?;
        write!(f, "}}")
    }
}

/// Splits `values` into maximal runs of equal consecutive elements.
pub(crate) fn runs(values: &[StackElem]) -> Vec<(Range<usize>, StackElem)> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=values.len() {
        if i == values.len() || values[i] != values[start] {
            runs.push((start..i, values[start]));
            start = i;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs() {
        assert!(runs(&[]).is_empty());
        assert_eq!(runs(&[5]), vec![(0..1, 5)]);
        assert_eq!(
            runs(&[1, 1, 2, 3, 3, 3, 0]),
            vec![(0..2, 1), (2..3, 2), (3..6, 3), (6..7, 0)]
        );
    }
}
