//! Cross-reference registry for bookmark ids and names

use std::collections::BTreeSet;

/// Longest bookmark name Word accepts.
pub const MAX_BOOKMARK_NAME: usize = 40;

/// Hands out bookmark ids and names for one merge session.
///
/// Ids are decimal strings, strictly increasing and never reused. Ids seen on
/// pass-through bookmarks raise the floor so fresh ids never collide with them.
/// Names seen on pass-through bookmarks are likewise never handed out.
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    next: u64,
    names: BTreeSet<String>,
}

impl Default for AnchorRegistry {
    fn default() -> Self {
        AnchorRegistry {
            next: 1,
            names: BTreeSet::new(),
        }
    }
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }

    /// Note an id already present in copied content. Word stores bookmark
    /// ids as 32-bit integers, so anything outside that range is ignored.
    pub fn observe(&mut self, id: &str) {
        if let Ok(seen) = id.trim().parse::<u32>() {
            self.next = self.next.max(u64::from(seen) + 1);
        }
    }

    /// Note a bookmark name already present in copied content.
    pub fn observe_name(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn is_name_taken(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Reserve `base`, or `base_2`, `base_3`, ... if it is taken. Names are
    /// cut to [`MAX_BOOKMARK_NAME`] characters, suffix included.
    pub fn claim_name(&mut self, base: &str) -> String {
        let base: String = base.chars().take(MAX_BOOKMARK_NAME).collect();
        let name = if self.is_name_taken(&base) {
            (2u64..)
                .map(|n| {
                    let suffix = format!("_{n}");
                    let keep = MAX_BOOKMARK_NAME.saturating_sub(suffix.len());
                    format!("{}{suffix}", base.chars().take(keep).collect::<String>())
                })
                .find(|candidate| !self.is_name_taken(candidate))
                .unwrap_or(base)
        } else {
            base
        };
        self.names.insert(name.clone());
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let mut registry = AnchorRegistry::new();
        let ids: Vec<u64> = (0..5)
            .map(|_| registry.next_id().parse().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_observe_raises_floor_only() {
        let mut registry = AnchorRegistry::new();
        registry.observe("41");
        assert_eq!(registry.next_id(), "42");
        registry.observe("7");
        registry.observe("not-a-number");
        assert_eq!(registry.next_id(), "43");
    }

    #[test]
    fn test_out_of_range_ids_are_ignored() {
        let mut registry = AnchorRegistry::new();
        registry.observe("18446744073709551615");
        registry.observe("-3");
        assert_eq!(registry.next_id(), "1");
        registry.observe("4294967295");
        assert_eq!(registry.next_id(), "4294967296");
        assert_eq!(registry.next_id(), "4294967297");
    }

    #[test]
    fn test_claimed_names_avoid_observed_ones() {
        let mut registry = AnchorRegistry::new();
        registry.observe_name("src_a");
        registry.observe_name("src_a_2");
        assert_eq!(registry.claim_name("src_a"), "src_a_3");
        assert_eq!(registry.claim_name("src_b"), "src_b");
        assert_eq!(registry.claim_name("src_b"), "src_b_2");

        let long = "x".repeat(60);
        let first = registry.claim_name(&long);
        let second = registry.claim_name(&long);
        assert_eq!(first.len(), MAX_BOOKMARK_NAME);
        assert_eq!(second.len(), MAX_BOOKMARK_NAME);
        assert!(second.ends_with("_2"));
    }
}
