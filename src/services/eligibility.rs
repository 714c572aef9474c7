//! Eligibility filter: which team members may take a review.

use std::collections::HashSet;

use crate::models::User;

/// External user ids that must not receive a review assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
    ids: HashSet<String>,
}

impl ExclusionSet {
    /// Exclude exactly one user (typically the author).
    pub fn single(user_id: impl Into<String>) -> Self {
        let mut set = Self::default();
        set.insert(user_id);
        set
    }

    /// Exclude every id in `user_ids`.
    pub fn many<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, user_id: impl Into<String>) {
        self.ids.insert(user_id.into());
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.ids.contains(user_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Active members not named in `excluded`, in input order.
///
/// An empty result is a normal outcome; whether it is acceptable is the
/// caller's decision.
pub fn eligible<'a>(members: &'a [User], excluded: &ExclusionSet) -> Vec<&'a User> {
    members
        .iter()
        .filter(|m| m.is_active && !excluded.contains(&m.user_id))
        .collect()
}
