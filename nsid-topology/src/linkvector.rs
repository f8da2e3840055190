//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Distance-vector style reachability table, indexed by local port
//! name. Mutated only by the fetcher; read by the pathfinder.

use std::collections::HashMap;

/// `port-name -> { target-network -> cost }`, plus a set of listeners
/// invoked after every mutation (used to regenerate the discovery
/// document).
///
/// Listeners must not mutate the table synchronously from within their
/// callback: re-entrant calls into [`LinkVector::update`] from a
/// listener would run while the mutation that triggered them is still
/// on the stack.
#[derive(Default)]
pub struct LinkVector {
    vectors: HashMap<String, HashMap<String, u32>>,
    listeners: Vec<Box<dyn Fn() + Send + Sync>>,
}

impl std::fmt::Debug for LinkVector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkVector")
            .field("vectors", &self.vectors)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl LinkVector {
    pub fn new() -> LinkVector {
        LinkVector::default()
    }

    /// Merges a port's advertised costs into the table. Each
    /// `(network, cost)` pair overwrites whatever was previously
    /// recorded for that port/network combination; entries for other
    /// networks already known via this port are left untouched.
    pub fn update(&mut self, port_name: &str, costs: HashMap<String, u32>) {
        let entry = self.vectors.entry(port_name.to_owned()).or_default();
        entry.extend(costs);
        self.notify();
    }

    /// Removes every entry sourced from `port_name` (used when a peer
    /// is deregistered).
    pub fn remove_port(&mut self, port_name: &str) {
        if self.vectors.remove(port_name).is_some() {
            self.notify();
        }
    }

    /// The advertised costs to reach `network_id`, as `(port_name,
    /// cost)` pairs in ascending cost order (ties broken by port name).
    pub fn vector(&self, network_id: &str) -> Vec<(String, u32)> {
        let mut entries: Vec<(String, u32)> = self
            .vectors
            .iter()
            .filter_map(|(port, costs)| {
                costs.get(network_id).map(|&cost| (port.clone(), cost))
            })
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        entries
    }

    /// Registers a listener invoked after every mutation.
    pub fn call_on_update<F>(&mut self, listener: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_is_cost_ordered() {
        let mut lv = LinkVector::new();
        lv.update("p1", HashMap::from([("bonaire".to_owned(), 5)]));
        lv.update("p2", HashMap::from([("bonaire".to_owned(), 2)]));
        lv.update("p3", HashMap::from([("bonaire".to_owned(), 2)]));

        assert_eq!(
            lv.vector("bonaire"),
            vec![
                ("p2".to_owned(), 2),
                ("p3".to_owned(), 2),
                ("p1".to_owned(), 5),
            ]
        );
    }

    #[test]
    fn later_update_overwrites_same_key() {
        let mut lv = LinkVector::new();
        lv.update("p1", HashMap::from([("bonaire".to_owned(), 5)]));
        lv.update("p1", HashMap::from([("bonaire".to_owned(), 2)]));
        assert_eq!(lv.vector("bonaire"), vec![("p1".to_owned(), 2)]);
    }

    #[test]
    fn remove_port_purges_its_entries() {
        let mut lv = LinkVector::new();
        lv.update("p1", HashMap::from([("bonaire".to_owned(), 5)]));
        lv.remove_port("p1");
        assert!(lv.vector("bonaire").is_empty());
    }

    #[test]
    fn listener_runs_after_update() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let mut lv = LinkVector::new();
        lv.call_on_update(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        lv.update("p1", HashMap::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
