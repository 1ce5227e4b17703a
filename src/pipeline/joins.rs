// Join helpers: fan-out fetch by id set, then merge in memory.

use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::entities::ent_actor::PUBLIC_PROFILE_FIELDS;
use crate::error::AppResult;
use crate::infrastructure::store::{Collection, Document, Filter, Store};

/// Reads `field` from the document, or from the sub-document `within` when
/// given.
pub(crate) fn local_i64(doc: &Document, within: Option<&str>, field: &str) -> Option<i64> {
    match within {
        None => doc.get_i64(field),
        Some(sub) => doc.get(sub)?.get(field)?.as_i64(),
    }
}

/// Writes `field` on the document or on the sub-document `within`. A missing
/// or null sub-document is left untouched.
pub(crate) fn set_local(doc: &mut Document, within: Option<&str>, field: &str, value: Value) {
    match within {
        None => doc.set(field, value),
        Some(sub) => {
            if let Some(Value::Object(map)) = doc.get_mut(sub) {
                map.insert(field.to_string(), value);
            }
        }
    }
}

fn distinct(ids: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Public profiles for the given actors, keyed by id. Private fields are
/// never part of the projection.
pub(crate) async fn public_profiles(
    store: &dyn Store,
    actor_ids: impl IntoIterator<Item = i64>,
) -> AppResult<HashMap<i64, Document>> {
    let ids = distinct(actor_ids);
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let actors = store
        .find(Collection::Actors, &Filter::new().is_in("id", ids), &[], 0, None)
        .await?;
    Ok(actors
        .into_iter()
        .filter_map(|actor| {
            let id = actor.id()?;
            Some((id, actor.project(PUBLIC_PROFILE_FIELDS)))
        })
        .collect())
}

/// Fresh count of `from` records whose `foreign_field` equals each key.
pub(crate) async fn counts_by_key(
    store: &dyn Store,
    from: Collection,
    foreign_field: &str,
    keys: &[i64],
) -> AppResult<HashMap<i64, u64>> {
    let keys = distinct(keys.iter().copied());
    let filters: Vec<(i64, Filter)> = keys
        .into_iter()
        .map(|key| (key, Filter::new().eq(foreign_field, key)))
        .collect();
    let counts = try_join_all(filters.iter().map(|(_, filter)| store.count(from, filter))).await?;
    Ok(filters.iter().map(|(key, _)| *key).zip(counts).collect())
}

/// Keys among `keys` for which a `from` record links the viewer to the key.
/// An absent viewer links to nothing.
pub(crate) async fn viewer_links(
    store: &dyn Store,
    from: Collection,
    foreign_field: &str,
    viewer_field: &str,
    viewer_id: Option<i64>,
    keys: &[i64],
) -> AppResult<HashSet<i64>> {
    let Some(viewer_id) = viewer_id else {
        return Ok(HashSet::new());
    };
    if keys.is_empty() {
        return Ok(HashSet::new());
    }
    let filter = Filter::new()
        .eq(viewer_field, viewer_id)
        .is_in(foreign_field, distinct(keys.iter().copied()));
    let links = store.find(from, &filter, &[], 0, None).await?;
    Ok(links
        .iter()
        .filter_map(|link| link.get_i64(foreign_field))
        .collect())
}
