use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use guardstack::{GuardedStack, StackElem, creation_site};

use super::IntegrityArgs;

#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    /// Values to push, comma separated
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub values: Vec<StackElem>,

    #[command(flatten)]
    pub integrity: IntegrityArgs,
}

pub fn run(args: &DumpArgs, out: &mut dyn Write) -> Result<()> {
    let config = args.integrity.config().with_diagnostics(true);
    let mut stack = GuardedStack::create(config, Some(creation_site!(stack)))?;
    for &value in &args.values {
        stack.push(value)?;
    }

    let dump = stack
        .dump_here()
        .context("Diagnostics are disabled for this stack")?;
    writeln!(out, "{dump}")?;

    stack.destroy()?;
    Ok(())
}
