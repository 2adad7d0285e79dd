//! A self-verifying LIFO stack of fixed-size elements.
//!
//! [`GuardedStack`] wraps a growable buffer with three independent integrity
//! layers, each switchable through [`StackConfig`]:
//!
//! - bounds checks on the element count and capacity (always on),
//! - guard markers flanking both the stack record and its buffer,
//! - content checksums of the record and of the whole buffer region.
//!
//! Every push and pop verifies the stack before and after mutating it, and
//! surfaces the first failure to the caller. [`StackRegistry`] hands out
//! opaque [`StackHandle`]s instead of references for callers that must not
//! hold the stack directly.

pub mod checksum;
pub mod config;
pub mod dump;
pub mod entropy;
pub mod registry;
pub mod site;
pub mod stack;
mod verify;


pub use config::StackConfig;
pub use dump::StackDump;
pub use entropy::{EntropySource, OsEntropy};
pub use guardstack_common::{
    Result,
    error::{CorruptionCause, Error, ErrorKind},
    flags::ErrorFlags,
};
pub use registry::{StackHandle, StackRegistry};
pub use site::CreationSite;
pub use stack::{GuardedStack, Lifecycle};

/// The scalar stored in every stack slot.
pub type StackElem = i64;

/// Capacity of a freshly created stack, and the floor for shrinking.
pub const DEFAULT_CAPACITY: usize = 8;

/// Factor applied to the capacity on every grow or shrink.
pub const GROWTH_FACTOR: usize = 2;

/// A stack shrinks once its count falls to `capacity / SHRINK_THRESHOLD`.
pub const SHRINK_THRESHOLD: usize = GROWTH_FACTOR * 2;

/// Sentinel stored in the guards around the stack record.
pub const STRUCTURE_GUARD: u64 = 0xBAD5_7ACC_BAD5_7ACC;

/// Sentinel stored in the guards around the element buffer.
pub const DATA_GUARD: u64 = 0xBADD_A7A0_BADD_A7A0;
