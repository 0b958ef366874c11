use std::collections::BTreeSet;

/// Set of machine identities observed at one point in time.
pub type IdentitySet = BTreeSet<String>;

/// Identities present in `current` but not in `previous`, ascending.
pub fn diff(previous: &IdentitySet, current: &IdentitySet) -> Vec<String> {
    current.difference(previous).cloned().collect()
}
