//! Follow graph
//!
//! Maps each followee to the set of subscribers following it. A missing key
//! and an empty set mean the same thing, so empty sets are never stored.

use std::collections::{HashMap, HashSet};

use crate::protocol::SubscriberId;

/// Followee ID -> follower IDs
#[derive(Debug, Default)]
pub struct FollowGraph {
    followers: HashMap<SubscriberId, HashSet<SubscriberId>>,
}

impl FollowGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `follower` follows `followee`
    ///
    /// Returns `false` if the edge already existed.
    pub fn follow(&mut self, followee: &SubscriberId, follower: &SubscriberId) -> bool {
        self.followers
            .entry(followee.clone())
            .or_default()
            .insert(follower.clone())
    }

    /// Remove the edge `follower` -> `followee`
    ///
    /// Returns `false` if there was no such edge.
    pub fn unfollow(&mut self, followee: &[u8], follower: &[u8]) -> bool {
        let Some(set) = self.followers.get_mut(followee) else {
            return false;
        };

        let removed = set.remove(follower);
        if set.is_empty() {
            self.followers.remove(followee);
        }
        removed
    }

    /// Iterate the followers of `followee`
    pub fn followers(&self, followee: &[u8]) -> impl Iterator<Item = &SubscriberId> {
        self.followers.get(followee).into_iter().flatten()
    }

    /// Number of subscribers with at least one follower
    pub fn followee_count(&self) -> usize {
        self.followers.len()
    }

    /// Total number of follow edges
    pub fn edge_count(&self) -> usize {
        self.followers.values().map(HashSet::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SubscriberId {
        SubscriberId::from(s)
    }

    fn sorted(graph: &FollowGraph, followee: &str) -> Vec<String> {
        let mut ids: Vec<String> = graph
            .followers(followee.as_bytes())
            .map(ToString::to_string)
            .collect();
        ids.sort();
        ids
    }

    #[test]
    fn test_follow_is_idempotent() {
        let mut graph = FollowGraph::new();

        assert!(graph.follow(&id("1"), &id("2")));
        assert!(!graph.follow(&id("1"), &id("2")));

        assert_eq!(sorted(&graph, "1"), vec!["2"]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_unfollow_removes_edge_and_empty_set() {
        let mut graph = FollowGraph::new();
        graph.follow(&id("1"), &id("2"));
        graph.follow(&id("1"), &id("3"));

        assert!(graph.unfollow(b"1", b"2"));
        assert_eq!(sorted(&graph, "1"), vec!["3"]);

        assert!(graph.unfollow(b"1", b"3"));
        assert_eq!(graph.followee_count(), 0);
    }

    #[test]
    fn test_unfollow_unknown_is_noop() {
        let mut graph = FollowGraph::new();
        graph.follow(&id("1"), &id("2"));

        assert!(!graph.unfollow(b"1", b"9"));
        assert!(!graph.unfollow(b"7", b"2"));
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_followers_of_unknown_is_empty() {
        let graph = FollowGraph::new();
        assert_eq!(graph.followers(b"nobody").count(), 0);
    }
}
