//
// Copyright (c) The NSID Contributors
//
// SPDX-License-Identifier: MIT
//

//! Per-network label assignment for a fixed sequence of networks.
//!
//! A network that can swap labels picks the widest label available on
//! each adjoining link independently, since it will translate between
//! the two at provision time, and a swap-capable network at either end
//! of the path uses the caller's requested label on its user-facing
//! port exactly. A maximal run of consecutive networks that cannot
//! swap shares a single transit label T instead: T is the intersection
//! of every advertised range on the links inside the run (plus the
//! caller's requested label, at whichever end of the run borders a
//! user port rather than a swap-capable network), and every network in
//! the run uses T on both its ingress and its egress — not just the
//! narrowest point reached by the time the run ends.

use nsid_topology::Topology;
use nsid_utils::{Label, Stp};

use crate::Link;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum AssignError {
    /// Two advertised ranges (or the requested label and an advertised
    /// range) share no values.
    EmptyLabelSet,
    /// A port this path depends on doesn't exist, or doesn't advertise
    /// the requested label type.
    LinkUnavailable,
}

pub(crate) fn assign(
    topology: &Topology,
    networks: &[String],
    src: &Stp,
    dst: &Stp,
) -> Result<Vec<Link>, AssignError> {
    let label_type = src.label.label_type.as_str();
    let hop_count = networks.len();

    let mut link_adv = Vec::with_capacity(hop_count.saturating_sub(1));
    for i in 0..hop_count.saturating_sub(1) {
        link_adv.push(link_advertised_label(
            topology,
            &networks[i],
            &networks[i + 1],
            label_type,
        )?);
    }

    let mut can_swap = Vec::with_capacity(hop_count);
    for network_id in networks {
        can_swap.push(
            topology
                .get(network_id)
                .ok_or(AssignError::LinkUnavailable)?
                .can_swap_label(label_type),
        );
    }

    let mut links = Vec::with_capacity(hop_count);
    let mut egress_labels: Vec<Label> = Vec::with_capacity(hop_count);

    for (i, network_id) in networks.iter().enumerate() {
        let ingress_label = if i == 0 {
            src.label.clone()
        } else if can_swap[i - 1] {
            link_adv[i - 1].clone()
        } else {
            egress_labels[i - 1].clone()
        };

        let egress_label = if can_swap[i] {
            if i == hop_count - 1 {
                dst.label.clone()
            } else {
                link_adv[i].clone()
            }
        } else if i == hop_count - 1 {
            ingress_label
                .intersect(&dst.label)
                .map_err(|_| AssignError::EmptyLabelSet)?
        } else {
            ingress_label
                .intersect(&link_adv[i])
                .map_err(|_| AssignError::EmptyLabelSet)?
        };

        let ingress_port = if i == 0 {
            src.port_id.clone()
        } else {
            topology
                .port_between(network_id, &networks[i - 1])
                .ok_or(AssignError::LinkUnavailable)?
                .name
                .clone()
        };
        let egress_port = if i == hop_count - 1 {
            dst.port_id.clone()
        } else {
            topology
                .port_between(network_id, &networks[i + 1])
                .ok_or(AssignError::LinkUnavailable)?
                .name
                .clone()
        };

        links.push(Link {
            network_id: network_id.clone(),
            ingress_port,
            egress_port,
            src_label: ingress_label,
            dst_label: egress_label.clone(),
        });
        egress_labels.push(egress_label);
    }

    // A no-swap network can't actually hold two different labels on its
    // two ports, so every member of a maximal no-swap run must end up
    // carrying the run's single, fully narrowed transit label — not
    // just the narrower-as-you-go value the forward pass above leaves
    // on the networks nearer the start of the run.
    let mut i = 0;
    while i < hop_count {
        if can_swap[i] {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut run_end = i;
        while run_end + 1 < hop_count && !can_swap[run_end + 1] {
            run_end += 1;
        }
        let transit_label = egress_labels[run_end].clone();
        for link in &mut links[run_start..=run_end] {
            link.src_label = transit_label.clone();
            link.dst_label = transit_label.clone();
        }
        i = run_end + 1;
    }

    Ok(links)
}

/// The raw label available on the link between two adjacent networks:
/// the intersection of both sides' advertised ranges for `label_type`.
/// A side with no advertised range for that type makes the link
/// unusable for it, rather than unrestricted — an inter-domain port
/// that never declared a range has nothing concrete to assign.
fn link_advertised_label(
    topology: &Topology,
    a: &str,
    b: &str,
    label_type: &str,
) -> Result<Label, AssignError> {
    let port_a = topology
        .port_between(a, b)
        .ok_or(AssignError::LinkUnavailable)?;
    let port_b = topology
        .port_between(b, a)
        .ok_or(AssignError::LinkUnavailable)?;
    let adv_a = port_a
        .advertised_labels
        .get(label_type)
        .ok_or(AssignError::LinkUnavailable)?;
    let adv_b = port_b
        .advertised_labels
        .get(label_type)
        .ok_or(AssignError::LinkUnavailable)?;
    adv_a.intersect(adv_b).map_err(|_| AssignError::EmptyLabelSet)
}
