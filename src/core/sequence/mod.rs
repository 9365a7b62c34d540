//! Custom id sequences
//!
//! Users, billing accounts and payers carry a human-facing numeric id that is
//! unique and increasing within their kind. [`SequenceAllocator`] hands out
//! those ids from per-sequence counters kept in a
//! [`CounterStore`](crate::adapters::database::CounterStore).

pub mod allocator;

pub use allocator::SequenceAllocator;
