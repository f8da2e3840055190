//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Connection state machine and data model (spec §5).

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use nsid_provider::SegmentState;
use nsid_utils::Stp;
use serde::{Deserialize, Serialize};

/// The connection-level lifecycle state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ConnectionState {
    Initial,
    ReserveChecking,
    ReserveHeld,
    ReserveCommitting,
    Reserved,
    /// Every candidate path was tried and failed, or the hold timer
    /// expired before a commit arrived. Distinct from `Terminated`:
    /// the connection never reached `RESERVE_HELD` for a requester to
    /// terminate in the first place.
    ReserveFailed,
    Provisioning,
    Provisioned,
    Releasing,
    Terminating,
    Terminated,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Initial => "INITIAL",
            ConnectionState::ReserveChecking => "RESERVE_CHECKING",
            ConnectionState::ReserveHeld => "RESERVE_HELD",
            ConnectionState::ReserveCommitting => "RESERVE_COMMITTING",
            ConnectionState::Reserved => "RESERVED",
            ConnectionState::ReserveFailed => "RESERVE_FAILED",
            ConnectionState::Provisioning => "PROVISIONING",
            ConnectionState::Provisioned => "PROVISIONED",
            ConnectionState::Releasing => "RELEASING",
            ConnectionState::Terminating => "TERMINATING",
            ConnectionState::Terminated => "TERMINATED",
        }
    }
}

/// One domain segment of a committed connection, with its own
/// lifecycle mirrored from the provider that serves it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Segment {
    pub network_id: String,
    pub provider_urn: String,
    pub src: Stp,
    pub dst: Stp,
    pub state: SegmentState,
}

/// A single end-to-end connection tracked by this instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Connection {
    pub connection_id: String,
    pub requester_nsa: String,
    pub src: Stp,
    pub dst: Stp,
    pub bandwidth_mbps: u64,
    pub state: ConnectionState,
    pub segments: Vec<Segment>,
    pub created_at: DateTime<Utc>,
    /// Number of provision/release attempts made on the currently
    /// retried operation, for the bounded exponential backoff.
    pub retry_attempt: u32,
}

impl Connection {
    pub fn new(
        connection_id: impl Into<String>,
        requester_nsa: impl Into<String>,
        src: Stp,
        dst: Stp,
        bandwidth_mbps: u64,
        created_at: DateTime<Utc>,
    ) -> Connection {
        Connection {
            connection_id: connection_id.into(),
            requester_nsa: requester_nsa.into(),
            src,
            dst,
            bandwidth_mbps,
            state: ConnectionState::Initial,
            segments: Vec::new(),
            created_at,
            retry_attempt: 0,
        }
    }
}

/// One entry in the bounded connection-event log, mirroring
/// `holo-isis`'s `SpfLogEntry`/`SPF_LOG_MAX_SIZE` ring-buffer pattern.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionEvent {
    pub id: u32,
    pub connection_id: String,
    pub from: ConnectionState,
    pub to: ConnectionState,
    pub at: DateTime<Utc>,
}

const EVENT_LOG_MAX_SIZE: usize = 64;

/// A bounded, most-recent-first log of connection state transitions.
#[derive(Debug, Default)]
pub struct ConnectionEventLog {
    events: VecDeque<ConnectionEvent>,
    next_id: u32,
}

impl ConnectionEventLog {
    pub fn new() -> ConnectionEventLog {
        ConnectionEventLog::default()
    }

    pub fn record(
        &mut self,
        connection_id: &str,
        from: ConnectionState,
        to: ConnectionState,
        at: DateTime<Utc>,
    ) {
        let id = self.next_id;
        self.next_id += 1;
        self.events.push_front(ConnectionEvent {
            id,
            connection_id: connection_id.to_owned(),
            from,
            to,
            at,
        });
        self.events.truncate(EVENT_LOG_MAX_SIZE);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConnectionEvent> {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_log_is_bounded_and_most_recent_first() {
        let mut log = ConnectionEventLog::new();
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        for i in 0..(EVENT_LOG_MAX_SIZE + 10) {
            log.record(
                &format!("conn-{i}"),
                ConnectionState::Initial,
                ConnectionState::ReserveChecking,
                now,
            );
        }
        let entries: Vec<&ConnectionEvent> = log.iter().collect();
        assert_eq!(entries.len(), EVENT_LOG_MAX_SIZE);
        assert_eq!(entries[0].connection_id, format!("conn-{}", EVENT_LOG_MAX_SIZE + 9));
    }
}
