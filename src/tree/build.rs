use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use super::normalize::{self, ChannelRecord, ClientRecord, FieldConvention, RawRecord};
use super::order::sort_siblings;
use super::{Channel, Client, ROOT_ID};

/// Normalize raw adapter records with `convention`, then [`build`] the tree.
pub fn build_raw(
    convention: FieldConvention,
    channels: &[RawRecord],
    clients: &[RawRecord],
) -> Vec<Channel> {
    build(
        &normalize::channels(convention, channels),
        &normalize::clients(convention, clients),
    )
}

/// Assemble the ordered channel tree and return its top-level channels.
///
/// - When two records share an id, the later one wins; the channel keeps the
///   position of the first.
/// - Channels whose parent is not in `channels` become top-level.
/// - Parent cycles are broken by re-attaching the smallest id of each cycle
///   to the root, so every channel appears exactly once.
/// - Regular clients are attached to the channel they sit in, in input order.
pub fn build(channels: &[ChannelRecord], clients: &[ClientRecord]) -> Vec<Channel> {
    let mut nodes: Vec<ChannelRecord> = Vec::with_capacity(channels.len());
    let mut index: HashMap<u64, usize> = HashMap::with_capacity(channels.len());
    for record in channels {
        match index.get(&record.id) {
            Some(&slot) => nodes[slot] = record.clone(),
            None => {
                index.insert(record.id, nodes.len());
                nodes.push(record.clone());
            }
        }
    }

    for node in &mut nodes {
        if node.parent_id != ROOT_ID && !index.contains_key(&node.parent_id) {
            node.parent_id = ROOT_ID;
        }
    }
    break_parent_cycles(&mut nodes, &index);

    let mut members: HashMap<u64, Vec<Client>> = HashMap::new();
    for client in clients.iter().filter(|c| c.is_regular()) {
        if let Some(channel_id) = client.channel_id.filter(|id| index.contains_key(id)) {
            members.entry(channel_id).or_default().push(Client {
                id: client.id.clone(),
                nickname: client.nickname.clone(),
            });
        }
    }

    let mut groups: HashMap<u64, Vec<&ChannelRecord>> = HashMap::new();
    for node in &nodes {
        groups.entry(node.parent_id).or_default().push(node);
    }

    assemble(ROOT_ID, &groups, &mut members)
}

fn assemble(
    parent_id: u64,
    groups: &HashMap<u64, Vec<&ChannelRecord>>,
    members: &mut HashMap<u64, Vec<Client>>,
) -> Vec<Channel> {
    let Some(group) = groups.get(&parent_id) else {
        return Vec::new();
    };

    sort_siblings(group)
        .into_iter()
        .map(|record| Channel {
            id: record.id,
            name: record.name.clone(),
            order: record.order.clone(),
            parent_id: record.parent_id,
            clients: members.remove(&record.id).unwrap_or_default(),
            subchannels: assemble(record.id, groups, members),
        })
        .collect()
}

/// Re-parent one member of every parent cycle to the root.
///
/// Expects every non-root `parent_id` to resolve through `index`.
fn break_parent_cycles(nodes: &mut [ChannelRecord], index: &HashMap<u64, usize>) {
    loop {
        let reachable = reachable_from_root(nodes);
        if reachable.len() == nodes.len() {
            return;
        }

        // Anything unreachable sits in a cycle or below one. Walking up from
        // it must revisit a channel, and that channel is on the cycle.
        let Some(start) = nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| !reachable.contains(id))
            .min()
        else {
            return;
        };

        let mut path = vec![start];
        let mut current = start;
        let entry = loop {
            let Some(&slot) = index.get(&current) else {
                return;
            };
            current = nodes[slot].parent_id;
            if let Some(pos) = path.iter().position(|id| *id == current) {
                break pos;
            }
            if current == ROOT_ID {
                return;
            }
            path.push(current);
        };

        let Some(&victim) = path[entry..].iter().min() else {
            return;
        };
        let Some(&slot) = index.get(&victim) else {
            return;
        };
        warn!(
            channel = victim,
            cycle = ?&path[entry..],
            "Channel parent cycle; re-attaching channel to root"
        );
        nodes[slot].parent_id = ROOT_ID;
    }
}

fn reachable_from_root(nodes: &[ChannelRecord]) -> HashSet<u64> {
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    for node in nodes {
        children.entry(node.parent_id).or_default().push(node.id);
    }

    let mut reachable = HashSet::with_capacity(nodes.len());
    let mut queue = VecDeque::from([ROOT_ID]);
    while let Some(parent) = queue.pop_front() {
        for &child in children.get(&parent).into_iter().flatten() {
            if reachable.insert(child) {
                queue.push_back(child);
            }
        }
    }
    reachable
}
