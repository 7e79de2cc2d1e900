//! Process-agnostic JSON-file store: the KV document and the claim
//! document, each guarded by [`lockfile`]'s advisory-lock + atomic-rename
//! discipline so unrelated hook processes can share them safely (§4.1).

pub mod claims;
pub mod kv;
pub mod lockfile;
pub mod paths;

pub use claims::{Claim, ClaimResult, ClaimStatus, ListFilter, ReleaseResult};
pub use kv::KvEntry;
pub use paths::{ScratchDir, StoreRoot};
