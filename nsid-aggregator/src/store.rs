//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Connection persistence. `nsid-daemon` wires in the pickledb-backed
//! implementation; tests and `nsid-aggregator` itself use the
//! in-memory one.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::Connection;

/// Where connections are durably recorded, so a restarted instance can
/// recover in-flight reservations instead of silently forgetting them.
pub trait ConnectionStore: Send + Sync {
    fn put(&self, connection: &Connection);
    fn get(&self, connection_id: &str) -> Option<Connection>;
    fn remove(&self, connection_id: &str);
    fn all(&self) -> Vec<Connection>;
}

/// An in-memory store, used by tests and as the default when no
/// `database` path is configured.
#[derive(Default)]
pub struct InMemoryConnectionStore {
    connections: Mutex<HashMap<String, Connection>>,
}

impl InMemoryConnectionStore {
    pub fn new() -> InMemoryConnectionStore {
        InMemoryConnectionStore::default()
    }
}

impl ConnectionStore for InMemoryConnectionStore {
    fn put(&self, connection: &Connection) {
        self.connections
            .lock()
            .unwrap()
            .insert(connection.connection_id.clone(), connection.clone());
    }

    fn get(&self, connection_id: &str) -> Option<Connection> {
        self.connections.lock().unwrap().get(connection_id).cloned()
    }

    fn remove(&self, connection_id: &str) {
        self.connections.lock().unwrap().remove(connection_id);
    }

    fn all(&self) -> Vec<Connection> {
        self.connections.lock().unwrap().values().cloned().collect()
    }
}
