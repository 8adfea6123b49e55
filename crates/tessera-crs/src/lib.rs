//! Compressed-row containers with load-balanced block partitioning.
//!
//! [`CompressedRows`] stores a ragged two-dimensional structure (a variable
//! number of entries per row) as two flat arrays: `row_offsets` and
//! `entries`. The structure is fixed at construction; entry values stay
//! mutable.
//!
//! # Architecture
//!
//! ```text
//! CompressedRows<T, S: MemorySpace>
//! ├── row_offsets: Vec<usize>   (N + 1, exclusive prefix sum of row sizes)
//! ├── entries: Vec<T>           (row i = entries[row_offsets[i]..row_offsets[i + 1]])
//! ├── partition: Option<BlockPartition>
//! │   └── offsets: SmallVec     (B + 1 row indices, contiguous blocks)
//! └── space: S                  (allocation, deep copy, host-access query)
//! ```
//!
//! # Parallel writes
//!
//! [`CompressedRows::create_block_partitioning`] balances rows into blocks
//! by `entries + cost_per_row`. [`CompressedRows::blocks_mut`] then hands
//! out one [`BlockMut`] per block: disjoint `&mut` views that can be moved
//! to separate worker threads.
//!
//! # Mirrors
//!
//! [`CompressedRows::create_mirror`] copies a container into host memory.
//! Mirrors never alias the original; entry changes propagate only through
//! [`CompressedRows::sync_from`] and [`CompressedRows::sync_to`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod block;
pub mod config;
pub mod mirror;
pub mod partition;
pub mod rows;

pub use block::BlockMut;
pub use config::PartitionConfig;
pub use partition::{BlockOffsets, BlockPartition};
pub use rows::CompressedRows;
