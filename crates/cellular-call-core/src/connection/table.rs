use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::record::ConnectionRecord;
use crate::types::{CallReportInfo, TelCallState};

/// Default bound on concurrently tracked connections
pub const DEFAULT_MAX_CONNECTIONS: usize = 6;

/// Key of a connection table entry.
///
/// Calls are keyed by phone number. Anonymous calls, and a second call whose
/// number collides with one already reported in the same pass, are keyed by
/// their network index instead.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionKey {
    Number(String),
    Index(i32),
}

impl ConnectionKey {
    pub fn for_call(number: &str, index: i32) -> Self {
        if number.is_empty() {
            ConnectionKey::Index(index)
        } else {
            ConnectionKey::Number(number.to_string())
        }
    }
}

impl std::fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionKey::Number(number) => write!(f, "{}", number),
            ConnectionKey::Index(index) => write!(f, "#{}", index),
        }
    }
}

/// First entry whose record satisfies `predicate`
pub fn find_record<'a, K, I, F>(records: I, mut predicate: F) -> Option<(&'a K, &'a ConnectionRecord)>
where
    K: 'a,
    I: IntoIterator<Item = (&'a K, &'a ConnectionRecord)>,
    F: FnMut(&ConnectionRecord) -> bool,
{
    records.into_iter().find(|(_, record)| predicate(record))
}

/// First entry in `state`
pub fn find_by_state<'a, K, I>(records: I, state: TelCallState) -> Option<(&'a K, &'a ConnectionRecord)>
where
    K: 'a,
    I: IntoIterator<Item = (&'a K, &'a ConnectionRecord)>,
{
    find_record(records, |record| record.state() == state)
}

/// First entry carrying network index `index`
pub fn find_by_index<'a, K, I>(records: I, index: i32) -> Option<(&'a K, &'a ConnectionRecord)>
where
    K: 'a,
    I: IntoIterator<Item = (&'a K, &'a ConnectionRecord)>,
{
    find_record(records, |record| record.index() == index)
}

/// Connections tracked by one controller, in insertion order
#[derive(Debug, Clone)]
pub struct ConnectionTable {
    records: IndexMap<ConnectionKey, ConnectionRecord>,
    max_connections: usize,
}

impl Default for ConnectionTable {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONNECTIONS)
    }
}

impl ConnectionTable {
    pub fn new(max_connections: usize) -> Self {
        Self {
            records: IndexMap::new(),
            max_connections,
        }
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether another call would exceed the concurrent call bound
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.max_connections
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnectionKey, &ConnectionRecord)> {
        self.records.iter()
    }

    pub fn contains_key(&self, key: &ConnectionKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn get(&self, key: &ConnectionKey) -> Option<&ConnectionRecord> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &ConnectionKey) -> Option<&mut ConnectionRecord> {
        self.records.get_mut(key)
    }

    pub fn insert(&mut self, key: ConnectionKey, record: ConnectionRecord) -> Option<ConnectionRecord> {
        self.records.insert(key, record)
    }

    /// Resolve a call by phone number, falling back to its network index
    pub fn lookup(&self, number: &str, index: i32) -> Option<ConnectionKey> {
        if !number.is_empty() {
            let key = ConnectionKey::Number(number.to_string());
            if self.records.contains_key(&key) {
                return Some(key);
            }
        }
        self.key_by_index(index)
    }

    pub fn key_by_index(&self, index: i32) -> Option<ConnectionKey> {
        find_by_index(self.records.iter(), index).map(|(key, _)| key.clone())
    }

    pub fn find_by_state(&self, state: TelCallState) -> Option<&ConnectionRecord> {
        find_by_state(self.records.iter(), state).map(|(_, record)| record)
    }

    pub fn find_by_index(&self, index: i32) -> Option<&ConnectionRecord> {
        find_by_index(self.records.iter(), index).map(|(_, record)| record)
    }

    pub fn has_state(&self, state: TelCallState) -> bool {
        self.find_by_state(state).is_some()
    }

    /// Remove every record not seen in the current pass and reset the flag
    /// on the survivors. Removed records are returned in table order.
    pub fn sweep_unseen(&mut self) -> Vec<ConnectionRecord> {
        let mut removed = Vec::new();
        let keys: Vec<ConnectionKey> = self
            .records
            .iter()
            .filter(|(_, record)| !record.seen_in_last_report())
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            if let Some(record) = self.records.shift_remove(&key) {
                removed.push(record);
            }
        }
        for record in self.records.values_mut() {
            record.set_seen_in_last_report(false);
        }
        removed
    }

    /// Drop all records, returning them in table order
    pub fn drain(&mut self) -> Vec<ConnectionRecord> {
        self.records.drain(..).map(|(_, record)| record).collect()
    }

    pub fn snapshot(&self) -> Vec<CallReportInfo> {
        self.records.values().map(|record| record.report().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallType, VideoState};

    fn record(index: i32, number: &str, state: TelCallState) -> ConnectionRecord {
        ConnectionRecord::new(CallReportInfo {
            index,
            account_number: number.to_string(),
            account_id: 0,
            voice_domain: 0,
            state,
            call_type: CallType::Cs,
            call_mode: VideoState::Audio,
        })
    }

    #[test]
    fn test_lookup_falls_back_to_index() {
        let mut table = ConnectionTable::default();
        table.insert(
            ConnectionKey::for_call("555", 1),
            record(1, "555", TelCallState::Active),
        );
        table.insert(
            ConnectionKey::for_call("", 2),
            record(2, "", TelCallState::Incoming),
        );

        assert_eq!(
            table.lookup("555", 9),
            Some(ConnectionKey::Number("555".to_string()))
        );
        assert_eq!(table.lookup("777", 2), Some(ConnectionKey::Index(2)));
        assert_eq!(table.lookup("", 1), Some(ConnectionKey::Number("555".to_string())));
        assert_eq!(table.lookup("777", 5), None);
        assert!(table.has_state(TelCallState::Incoming));
        assert_eq!(table.find_by_state(TelCallState::Active).map(|r| r.index()), Some(1));
    }

    #[test]
    fn test_sweep_removes_unseen_and_resets_flags() {
        let mut table = ConnectionTable::new(2);
        table.insert(
            ConnectionKey::for_call("111", 1),
            record(1, "111", TelCallState::Active),
        );
        table.insert(
            ConnectionKey::for_call("222", 2),
            record(2, "222", TelCallState::Holding),
        );
        assert!(table.is_full());

        if let Some(r) = table.get_mut(&ConnectionKey::Number("222".to_string())) {
            r.set_seen_in_last_report(true);
        }
        let removed = table.sweep_unseen();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].phone_number(), "111");
        assert_eq!(table.len(), 1);
        assert!(table.iter().all(|(_, r)| !r.seen_in_last_report()));
        assert!(!table.is_full());
    }
}
