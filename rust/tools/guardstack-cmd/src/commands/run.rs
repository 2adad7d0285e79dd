use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use guardstack::{StackElem, StackRegistry, creation_site};

use super::IntegrityArgs;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// First value to push
    #[arg(long, default_value_t = 2)]
    pub from: StackElem,

    /// End of the pushed range (exclusive)
    #[arg(long, default_value_t = 100)]
    pub to: StackElem,

    /// Stop after this many pushes, skipping the pop phase
    #[arg(long)]
    pub stop_after: Option<usize>,

    /// Pop this many times more than was pushed
    #[arg(long, default_value_t = 0)]
    pub extra_pops: usize,

    #[command(flatten)]
    pub integrity: IntegrityArgs,
}

pub fn run(args: &RunArgs, out: &mut dyn Write) -> Result<()> {
    let mut registry = StackRegistry::new().context("Failed to create stack registry")?;
    let stack = registry.create(args.integrity.config(), Some(creation_site!(stack)))?;

    writeln!(out, "begin")?;
    let mut pushed = 0;
    for value in args.from..args.to {
        registry.push(stack, value)?;
        pushed += 1;

        let state = registry.get(stack)?;
        writeln!(
            out,
            "num_to_put = {value}, count = {}, capacity = {}",
            state.len(),
            state.capacity()
        )?;

        if args.stop_after == Some(pushed) {
            return registry.destroy(stack).map_err(Into::into);
        }
    }

    writeln!(out, "\nresult")?;
    for _ in 0..pushed + args.extra_pops {
        let value = registry.pop(stack)?;
        let state = registry.get(stack)?;
        writeln!(
            out,
            "popped = {value}, count = {}, capacity = {}",
            state.len(),
            state.capacity()
        )?;
    }

    registry.destroy(stack)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardstack::ErrorKind;

    fn args(from: StackElem, to: StackElem) -> RunArgs {
        RunArgs {
            from,
            to,
            stop_after: None,
            extra_pops: 0,
            integrity: IntegrityArgs {
                diagnostics: false,
                no_guards: false,
                no_checksums: false,
                strict_memory: false,
            },
        }
    }

    #[test]
    fn test_run_pushes_and_pops() {
        let mut out = Vec::new();
        run(&args(2, 100), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("num_to_put = 99, count = 98, capacity = 128"));
        assert!(text.contains("popped = 99, count = 97, capacity = 128"));
        assert!(text.ends_with("popped = 2, count = 0, capacity = 8\n"));
    }

    #[test]
    fn test_run_stops_early() {
        let mut out = Vec::new();
        let mut a = args(0, 100);
        a.stop_after = Some(50);
        run(&a, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("num_to_put = 49, count = 50, capacity = 64"));
        assert!(!text.contains("result"));
    }

    #[test]
    fn test_run_underflow() {
        let mut out = Vec::new();
        let mut a = args(0, 3);
        a.extra_pops = 1;
        let err = run(&a, &mut out).unwrap_err();
        let stack_err = err.downcast_ref::<guardstack::Error>().unwrap();
        assert_eq!(stack_err.kind(), &ErrorKind::Underflow);
    }
}
