//! Similar-post ranking over already-loaded posts.

use std::cmp::Reverse;
use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::Post;

/// Rank `candidates` by how many tags they share with `tag_ids`.
///
/// Candidates sharing no tag, unpublished candidates and the post identified
/// by `exclude` are dropped. Ties on shared-tag count go to the newer publish
/// date. At most `limit` posts are returned.
pub fn rank_similar<'a, I>(exclude: Uuid, tag_ids: &[Uuid], candidates: I, limit: usize) -> Vec<Post>
where
    I: IntoIterator<Item = (&'a Post, &'a [Uuid])>,
{
    let wanted: HashSet<&Uuid> = tag_ids.iter().collect();
    let mut scored: Vec<(usize, &Post)> = candidates
        .into_iter()
        .filter(|(post, _)| post.id != exclude && post.is_published())
        .filter_map(|(post, tags)| {
            let shared = tags.iter().filter(|t| wanted.contains(t)).count();
            (shared > 0).then_some((shared, post))
        })
        .collect();

    scored.sort_by_key(|(shared, post)| (Reverse(*shared), Reverse(post.publish)));
    scored
        .into_iter()
        .take(limit)
        .map(|(_, post)| post.clone())
        .collect()
}
