//! Growable element buffers flanked by guard markers.
//!
//! [`GuardedVec`] over-allocates one guard word on each side of its element
//! region and exposes only the logical element range. The guard words let an
//! owner detect stray writes just outside the region by comparing them with
//! a sentinel at observation points.

pub mod guarded;

pub use guarded::GuardedVec;
