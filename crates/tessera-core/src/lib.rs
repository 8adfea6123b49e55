//! Core types and traits for the Tessera kernels.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! seams shared by the rest of the workspace: task identifiers, error
//! types, the [`MemorySpace`] abstraction used by compressed-row
//! containers, and the [`TaskPool`] abstraction behind task futures.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod space;
pub mod traits;

pub use error::{ContainerError, TaskError};
pub use id::TaskId;
pub use space::{HostSpace, MemorySpace};
pub use traits::TaskPool;
