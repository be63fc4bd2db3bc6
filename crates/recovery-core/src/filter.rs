use recovery_api::data_id::{DataId, DataKind};
use std::collections::{BTreeSet, HashSet};

/// Classifies a manifest and keeps the ids of one kind.
pub fn select<S: AsRef<str>>(manifest: &[S], kind: DataKind) -> Vec<DataId> {
    manifest
        .iter()
        .map(|raw| DataId::parse(raw.as_ref()))
        .filter(|id| id.kind() == kind)
        .collect()
}

/// Drops candidates whose natural key is already known or excluded.
///
/// Duplicate ids collapse. The result does not depend on input order, and
/// filtering an already filtered set changes nothing. This only saves work:
/// the store merge is what guarantees uniqueness.
pub fn filter_candidates<I>(
    candidates: I,
    existing: &HashSet<String>,
    excluded: &HashSet<String>,
) -> BTreeSet<DataId>
where
    I: IntoIterator<Item = DataId>,
{
    candidates
        .into_iter()
        .filter(|id| {
            let key = id.natural_key();
            !existing.contains(key) && !excluded.contains(key)
        })
        .collect()
}
