use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Category - each post belongs to at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Tag - attached to posts as an unordered set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Changes needed to turn the current tag associations into the target set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSync {
    pub to_add: BTreeSet<i64>,
    pub to_remove: BTreeSet<i64>,
}

impl TagSync {
    pub fn between(current: &BTreeSet<i64>, target: &BTreeSet<i64>) -> Self {
        Self {
            to_add: target.difference(current).copied().collect(),
            to_remove: current.difference(target).copied().collect(),
        }
    }

    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the changes to an in-memory association set.
    pub fn apply(&self, current: &mut BTreeSet<i64>) {
        for id in &self.to_remove {
            current.remove(id);
        }
        current.extend(self.to_add.iter().copied());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[i64]) -> BTreeSet<i64> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_sync_computes_both_directions() {
        let sync = TagSync::between(&set(&[1, 2, 3]), &set(&[2, 3, 4, 5]));

        assert_eq!(sync.to_add, set(&[4, 5]));
        assert_eq!(sync.to_remove, set(&[1]));
    }

    #[test]
    fn test_sync_to_empty_removes_everything() {
        let sync = TagSync::between(&set(&[7, 8]), &BTreeSet::new());

        assert!(sync.to_add.is_empty());
        assert_eq!(sync.to_remove, set(&[7, 8]));
    }

    #[test]
    fn test_sync_same_set_is_noop() {
        assert!(TagSync::between(&set(&[1, 2]), &set(&[2, 1])).is_noop());
    }

    #[test]
    fn test_apply_yields_target() {
        let mut current = set(&[1, 2, 3]);
        let target = set(&[3, 9]);

        TagSync::between(&current, &target).apply(&mut current);

        assert_eq!(current, target);
    }
}
