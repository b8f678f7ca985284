use entity::Build;
use std::collections::{HashMap, HashSet};

/// Orders builds from most to least expendable.
///
/// The newest build of every branch is held back behind all other builds,
/// and pinned builds go behind everything. Among builds sharing a branch's
/// newest `createdAt`, the one appearing last in `builds` is the head.
pub fn eviction_order(builds: Vec<Build>) -> Vec<Build> {
    let is_head = head_flags(&builds);

    let (mut protected, mut remainder): (Vec<_>, Vec<_>) = builds
        .into_iter()
        .zip(is_head)
        .partition(|(_, head)| *head);

    remainder.sort_by(|(a, _), (b, _)| a.created_at.cmp(&b.created_at));
    protected.sort_by(|(a, _), (b, _)| a.created_at.cmp(&b.created_at));

    let (unpinned, pinned): (Vec<_>, Vec<_>) = remainder
        .into_iter()
        .chain(protected)
        .map(|(build, _)| build)
        .partition(|build| !build.pinned);

    unpinned.into_iter().chain(pinned).collect()
}

/// Ids of the newest build on each branch. Among equal `createdAt` values the
/// one seen last wins.
pub fn branch_head_ids(builds: &[Build]) -> HashSet<String> {
    builds
        .iter()
        .zip(head_flags(builds))
        .filter(|(_, head)| *head)
        .map(|(build, _)| build.id.clone())
        .collect()
}

fn head_flags(builds: &[Build]) -> Vec<bool> {
    let mut heads: HashMap<&str, usize> = HashMap::new();
    for (index, build) in builds.iter().enumerate() {
        let Some(branch) = build.branch_name() else {
            continue;
        };
        let head = heads.entry(branch).or_insert(index);
        if build.created_at >= builds[*head].created_at {
            *head = index;
        }
    }

    let mut is_head = vec![false; builds.len()];
    for index in heads.into_values() {
        is_head[index] = true;
    }
    is_head
}
