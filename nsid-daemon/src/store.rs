//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! The durable [`ConnectionStore`] implementation, backed by
//! `pickledb` the same way `holo-daemon` keeps its northbound
//! rollback log (`holo-daemon/src/northbound/db.rs`).

use std::path::Path;
use std::sync::Mutex;

use nsid_aggregator::{Connection, ConnectionStore};
use pickledb::{PickleDb, PickleDbDumpPolicy, SerializationMethod};
use tracing::error;

pub struct PickleDbConnectionStore {
    db: Mutex<PickleDb>,
}

impl PickleDbConnectionStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<PickleDbConnectionStore, pickledb::error::Error> {
        let dump_policy = PickleDbDumpPolicy::AutoDump;
        let serialization_method = SerializationMethod::Json;
        let db = if path.as_ref().exists() {
            PickleDb::load(path, dump_policy, serialization_method)?
        } else {
            PickleDb::new(path, dump_policy, serialization_method)
        };
        Ok(PickleDbConnectionStore { db: Mutex::new(db) })
    }
}

impl ConnectionStore for PickleDbConnectionStore {
    fn put(&self, connection: &Connection) {
        let mut db = self.db.lock().unwrap();
        if let Err(error) = db.set(&connection.connection_id, connection) {
            error!(%error, connection_id = %connection.connection_id, "failed to persist connection");
        }
    }

    fn get(&self, connection_id: &str) -> Option<Connection> {
        self.db.lock().unwrap().get(connection_id)
    }

    fn remove(&self, connection_id: &str) {
        let mut db = self.db.lock().unwrap();
        if let Err(error) = db.rem(connection_id) {
            error!(%error, connection_id, "failed to remove connection record");
        }
    }

    fn all(&self) -> Vec<Connection> {
        let db = self.db.lock().unwrap();
        db.iter()
            .filter_map(|entry| entry.get_value::<Connection>())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use nsid_utils::{Label, Stp};

    use super::*;

    fn connection(id: &str) -> Connection {
        let label = Label::new("ethernet-vlan", "1781-1789").unwrap();
        Connection::new(
            id,
            "urn:requester:nsa",
            Stp::new("aruba", "aruba-user", label.clone()),
            Stp::new("bonaire", "bonaire-user", label),
            100,
            DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
        )
    }

    #[test]
    fn round_trips_through_a_fresh_db_file() {
        let dir = std::env::temp_dir().join(format!("nsid-store-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("connections.db");
        if path.exists() {
            std::fs::remove_file(&path).unwrap();
        }

        let store = PickleDbConnectionStore::open(&path).unwrap();
        store.put(&connection("c1"));
        assert!(store.get("c1").is_some());
        assert_eq!(store.all().len(), 1);
        store.remove("c1");
        assert!(store.get("c1").is_none());

        std::fs::remove_file(&path).ok();
    }
}
