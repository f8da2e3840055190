//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Connection orchestration: the state machine, its persistence, and
//! the periodic fetcher that keeps topology/link-vector/registry
//! current. Builds on `nsid-pathfinder` for path selection and
//! `nsid-provider` for segment dispatch.

mod connection;
mod error;
mod fetcher;
mod state;
mod store;

pub use connection::{Aggregator, DEFAULT_HOLD_TIMEOUT};
pub use error::AggregatorError;
pub use fetcher::{
    AdvertisedPort, DiscoveryClient, FetchError, Fetcher, PeerDiscovery, DEFAULT_FETCH_INTERVAL,
};
pub use state::{Connection, ConnectionEvent, ConnectionEventLog, ConnectionState, Segment};
pub use store::{ConnectionStore, InMemoryConnectionStore};
