//! Change detection against the previous extraction

pub mod hash;
pub mod store;

pub use store::{
    SyncCounts, SyncOutcome, SyncResource, SyncStatus, SyncStore, Synced, SYNC_DATE_FORMAT,
};
