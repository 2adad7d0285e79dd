//! Command implementations for guardstack-cmd

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use guardstack::StackConfig;

pub mod dump;
pub mod run;

/// Exit status for failures that are not stack errors.
const DRIVER_FAILURE: u8 = u8::MAX;

/// Integrity switches shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct IntegrityArgs {
    /// Track the creation site and dump the stack on severe errors
    #[arg(long)]
    pub diagnostics: bool,

    /// Disable guard markers around the stack and its buffer
    #[arg(long)]
    pub no_guards: bool,

    /// Disable structural and content checksums
    #[arg(long)]
    pub no_checksums: bool,

    /// Treat excess memory usage as an error
    #[arg(long)]
    pub strict_memory: bool,
}

impl IntegrityArgs {
    pub fn config(&self) -> StackConfig {
        StackConfig::default()
            .with_diagnostics(self.diagnostics)
            .with_guard_markers(!self.no_guards)
            .with_checksums(!self.no_checksums)
            .with_strict_memory(self.strict_memory)
    }
}

/// Prints the outcome and converts it into the process exit status: `0` on
/// success, the stack error kind's code otherwise.
pub fn report(result: Result<()>) -> ExitCode {
    match result {
        Ok(()) => {
            println!("\nCode was completed without errors");
            ExitCode::SUCCESS
        }
        Err(err) => {
            let code = exit_code(&err);
            match err.downcast_ref::<guardstack::Error>() {
                Some(stack_err) => println!("\nCODE_ERROR: {}", stack_err.kind().label()),
                None => println!("\nCODE_ERROR: UNKNOWN_ERROR"),
            }
            log::error!("{err:#}");
            ExitCode::from(code)
        }
    }
}

fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<guardstack::Error>()
        .map_or(DRIVER_FAILURE, |e| e.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use guardstack::{Error, ErrorKind};

    #[test]
    fn test_exit_code_of_stack_error() {
        let err: anyhow::Error = Error::underflow().into();
        assert_eq!(exit_code(&err), ErrorKind::Underflow.exit_code());

        let wrapped = Err::<(), _>(Error::out_of_memory(16))
            .context("pushing")
            .unwrap_err();
        assert_eq!(exit_code(&wrapped), 8);
    }

    #[test]
    fn test_exit_code_of_driver_error() {
        let err = anyhow::anyhow!("bad input");
        assert_eq!(exit_code(&err), DRIVER_FAILURE);
    }

    #[test]
    fn test_integrity_args() {
        let args = IntegrityArgs {
            diagnostics: true,
            no_guards: true,
            no_checksums: false,
            strict_memory: false,
        };
        let config = args.config();
        assert!(config.diagnostics());
        assert!(!config.guard_markers());
        assert!(config.checksums());
    }
}
