//! Sibling ordering.
//!
//! The server does not send a rank per channel. Each channel's order token
//! is `0` for the first sibling, or the id of the sibling directly above it,
//! so one sibling group forms a singly linked list:
//!
//! ```text
//! Lobby   id=1 order=0
//! Gaming  id=4 order=1
//! AFK     id=2 order=4
//! ```
//!
//! Incomplete or looping lists still yield every sibling exactly once.

use std::collections::HashMap;

use super::ChannelRecord;

/// Put one sibling group into display order.
///
/// Follows the list from the `0`-token head. Siblings the walk never reaches
/// are appended sorted by numeric token. Without a head the whole group is
/// sorted by numeric token. Ties keep input order.
pub fn sort_siblings<'a>(group: &[&'a ChannelRecord]) -> Vec<&'a ChannelRecord> {
    let tokens: Vec<Option<i64>> = group.iter().map(|c| c.order.value()).collect();
    let Some(head) = tokens.iter().position(|token| *token == Some(0)) else {
        return sorted_by_token(group, &tokens, (0..group.len()).collect());
    };

    // Sibling indexes keyed by the id they name as predecessor, in input order.
    let mut successors: HashMap<u64, Vec<usize>> = HashMap::new();
    for (index, token) in tokens.iter().enumerate() {
        if let Some(above) = token.and_then(|token| u64::try_from(token).ok()) {
            successors.entry(above).or_default().push(index);
        }
    }

    let mut placed = vec![false; group.len()];
    let mut ordered = Vec::with_capacity(group.len());
    let mut current = Some(head);

    while let Some(index) = current {
        placed[index] = true;
        ordered.push(group[index]);

        current = successors
            .get(&group[index].id)
            .and_then(|next| next.iter().copied().find(|&next| !placed[next]));
    }

    if ordered.len() < group.len() {
        let leftovers = (0..group.len()).filter(|&index| !placed[index]).collect();
        ordered.extend(sorted_by_token(group, &tokens, leftovers));
    }

    ordered
}

/// Stable sort of `indexes` by numeric token; non-numeric tokens go last.
fn sorted_by_token<'a>(
    group: &[&'a ChannelRecord],
    tokens: &[Option<i64>],
    mut indexes: Vec<usize>,
) -> Vec<&'a ChannelRecord> {
    indexes.sort_by_key(|&index| match tokens[index] {
        Some(value) => (false, value),
        None => (true, 0),
    });
    indexes.into_iter().map(|index| group[index]).collect()
}
