//! Opaque ID newtypes for kernel-owned entities.
//!
//! IDs are dense `u32` indices handed out by the kernel in allocation order,
//! so they double as a stable, deterministic ordering key.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }

            pub(crate) fn from_index(index: usize) -> Self {
                Self(index as u32)
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a signal owned by a kernel.
    SignalId
);

define_id!(
    /// Opaque, copyable ID for a process registered with a kernel.
    ProcessId
);
