// src/allocation/mod.rs
//
// Per-team question allocation: the first time a team resolves a round, a
// random subset of the round's pool is selected and persisted; every later
// resolution returns that same subset. The store's compound unique key on
// (team, round) is the only serialization point under concurrency.

pub mod allocator;
pub mod store;

pub use allocator::{AllocateError, Language, resolve, resolve_by_language};
pub use store::{AllocationStore, MemoryAllocationStore, PgAllocationStore, StoreError};
