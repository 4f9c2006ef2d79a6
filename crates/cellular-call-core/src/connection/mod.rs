//! Connection tracking
//!
//! A [`ConnectionTable`] holds the [`ConnectionRecord`]s of one controller.
//! Mutation goes through keys re-resolved at each step, never through
//! references held across reconciliation passes.

pub mod record;
pub mod table;

pub use record::ConnectionRecord;
pub use table::{find_by_index, find_by_state, find_record, ConnectionKey, ConnectionTable, DEFAULT_MAX_CONNECTIONS};
