// Declarative query pipeline: an ordered list of stages over one base
// collection. Stage order is fixed: filter, actor join, relationship joins,
// derivations, sort, paginate.

use futures::future::try_join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Document, Filter, SortKey, Store};
use crate::pipeline::joins::{counts_by_key, local_i64, public_profiles, set_local, viewer_links};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Filter,
    JoinActor,
    JoinRelation,
    Derive,
    Sort,
    Paginate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Derivation {
    /// `as_field = (local_field == viewer)`; false for anonymous viewers.
    IsViewer {
        local_field: &'static str,
        viewer: Option<i64>,
        as_field: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    /// Public profile of the actor referenced by `local_field`, or null.
    LookupActor {
        local_field: &'static str,
        as_field: &'static str,
    },
    /// Number of `from` records whose `foreign_field` equals `local_field`.
    LookupCount {
        within: Option<&'static str>,
        from: Collection,
        foreign_field: &'static str,
        local_field: &'static str,
        as_field: &'static str,
    },
    /// Whether a `from` record links the viewer (`viewer_field`) to this
    /// document (`foreign_field == local_field`).
    LookupViewerLink {
        within: Option<&'static str>,
        from: Collection,
        foreign_field: &'static str,
        local_field: &'static str,
        viewer_field: &'static str,
        viewer: Option<i64>,
        as_field: &'static str,
    },
    /// Most recent `from` record matching `foreign_field == local_field`
    /// and `filter`, or null.
    LookupLatest {
        within: Option<&'static str>,
        from: Collection,
        foreign_field: &'static str,
        local_field: &'static str,
        filter: Filter,
        as_field: &'static str,
    },
    /// Sum of `sum_field` over the `from` records reachable through a
    /// membership collection: `through.through_field == id`, member ids in
    /// `through.member_field`.
    LookupSum {
        through: Collection,
        through_field: &'static str,
        member_field: &'static str,
        from: Collection,
        sum_field: &'static str,
        as_field: &'static str,
    },
    Derive(Derivation),
    Sort(Vec<SortKey>),
    Paginate { skip: u64, limit: u64 },
}

impl Stage {
    pub fn phase(&self) -> Phase {
        match self {
            Stage::Match(_) => Phase::Filter,
            Stage::LookupActor { .. } => Phase::JoinActor,
            Stage::LookupCount { .. }
            | Stage::LookupViewerLink { .. }
            | Stage::LookupLatest { .. }
            | Stage::LookupSum { .. } => Phase::JoinRelation,
            Stage::Derive(_) => Phase::Derive,
            Stage::Sort(_) => Phase::Sort,
            Stage::Paginate { .. } => Phase::Paginate,
        }
    }

    /// Top-level field this stage adds to each document, if any.
    fn produces(&self) -> Option<&'static str> {
        match self {
            Stage::LookupActor { as_field, .. }
            | Stage::LookupSum { as_field, .. }
            | Stage::Derive(Derivation::IsViewer { as_field, .. }) => Some(*as_field),
            Stage::LookupCount { within: None, as_field, .. }
            | Stage::LookupViewerLink { within: None, as_field, .. }
            | Stage::LookupLatest { within: None, as_field, .. } => Some(*as_field),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    base: Collection,
    stages: Vec<Stage>,
    order_error: Option<String>,
}

impl Pipeline {
    pub fn new(base: Collection) -> Self {
        Self {
            base,
            stages: Vec::new(),
            order_error: None,
        }
    }

    /// Appends a stage. A stage from an earlier phase than the last one makes
    /// the pipeline invalid; `execute` then refuses to run it.
    pub fn then(mut self, stage: Stage) -> Self {
        if let Some(last) = self.stages.last() {
            if stage.phase() < last.phase() && self.order_error.is_none() {
                self.order_error = Some(format!(
                    "{:?} stage cannot follow {:?} stage",
                    stage.phase(),
                    last.phase()
                ));
            }
        }
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs the pipeline and returns the page plus the total match count.
    ///
    /// Sort keys must be stored fields of the base collection and no join
    /// changes cardinality, so sort and pagination run inside the store
    /// query and the joins only touch the page.
    pub async fn execute(&self, store: &dyn Store) -> AppResult<(Vec<Document>, u64)> {
        if let Some(err) = &self.order_error {
            return Err(AppError::Internal(format!("Invalid pipeline: {}", err)));
        }

        let mut filter = Filter::new();
        let mut sort: Vec<SortKey> = Vec::new();
        let mut window: Option<(u64, u64)> = None;
        let produced: HashSet<&str> = self.stages.iter().filter_map(Stage::produces).collect();

        for stage in &self.stages {
            match stage {
                Stage::Match(f) => {
                    for condition in f.conditions() {
                        filter = filter.with(condition.clone());
                    }
                }
                Stage::Sort(keys) => {
                    if let Some(key) = keys.iter().find(|k| produced.contains(k.field.as_str())) {
                        return Err(AppError::Internal(format!(
                            "Cannot sort {} on derived field {}",
                            self.base, key.field
                        )));
                    }
                    sort.extend(keys.iter().cloned());
                }
                Stage::Paginate { skip, limit } => window = Some((*skip, *limit)),
                _ => {}
            }
        }

        let total = store.count(self.base, &filter).await?;
        let (skip, limit) = match window {
            Some((skip, limit)) => (skip, Some(limit)),
            None => (0, None),
        };
        let mut docs = if limit != Some(0) && skip < total {
            store.find(self.base, &filter, &sort, skip, limit).await?
        } else {
            Vec::new()
        };

        for stage in &self.stages {
            if docs.is_empty() {
                break;
            }
            apply(store, &mut docs, stage).await?;
        }

        debug!(
            collection = self.base.as_str(),
            total,
            returned = docs.len(),
            "pipeline executed"
        );
        Ok((docs, total))
    }
}

fn keys_of(docs: &[Document], within: Option<&str>, field: &str) -> Vec<i64> {
    docs.iter()
        .filter_map(|doc| local_i64(doc, within, field))
        .collect()
}

async fn apply(store: &dyn Store, docs: &mut [Document], stage: &Stage) -> AppResult<()> {
    match stage {
        Stage::Match(_) | Stage::Sort(_) | Stage::Paginate { .. } => {}

        Stage::LookupActor {
            local_field,
            as_field,
        } => {
            let profiles = public_profiles(store, keys_of(docs, None, local_field)).await?;
            for doc in docs.iter_mut() {
                let profile = doc
                    .get_i64(local_field)
                    .and_then(|id| profiles.get(&id).cloned())
                    .map(Value::from)
                    .unwrap_or(Value::Null);
                doc.set(*as_field, profile);
            }
        }

        Stage::LookupCount {
            within,
            from,
            foreign_field,
            local_field,
            as_field,
        } => {
            let keys = keys_of(docs, *within, local_field);
            let counts = counts_by_key(store, *from, foreign_field, &keys).await?;
            for doc in docs.iter_mut() {
                if let Some(key) = local_i64(doc, *within, local_field) {
                    let count = counts.get(&key).copied().unwrap_or(0);
                    set_local(doc, *within, as_field, Value::from(count));
                }
            }
        }

        Stage::LookupViewerLink {
            within,
            from,
            foreign_field,
            local_field,
            viewer_field,
            viewer,
            as_field,
        } => {
            let keys = keys_of(docs, *within, local_field);
            let linked =
                viewer_links(store, *from, foreign_field, viewer_field, *viewer, &keys).await?;
            for doc in docs.iter_mut() {
                if let Some(key) = local_i64(doc, *within, local_field) {
                    set_local(doc, *within, as_field, Value::Bool(linked.contains(&key)));
                }
            }
        }

        Stage::LookupLatest {
            within,
            from,
            foreign_field,
            local_field,
            filter,
            as_field,
        } => {
            let keys = keys_of(docs, *within, local_field);
            let mut unique: Vec<i64> = Vec::new();
            for key in keys {
                if !unique.contains(&key) {
                    unique.push(key);
                }
            }
            let filters: Vec<Filter> = unique
                .iter()
                .map(|key| filter.clone().eq(foreign_field, *key))
                .collect();
            let newest = [SortKey::desc("createdAt")];
            let found = try_join_all(
                filters
                    .iter()
                    .map(|f| store.find(*from, f, &newest, 0, Some(1))),
            )
            .await?;
            let latest: HashMap<i64, Document> = unique
                .into_iter()
                .zip(found)
                .filter_map(|(key, mut docs)| docs.pop().map(|doc| (key, doc)))
                .collect();
            for doc in docs.iter_mut() {
                if let Some(key) = local_i64(doc, *within, local_field) {
                    let value = latest
                        .get(&key)
                        .cloned()
                        .map(Value::from)
                        .unwrap_or(Value::Null);
                    set_local(doc, *within, as_field, value);
                }
            }
        }

        Stage::LookupSum {
            through,
            through_field,
            member_field,
            from,
            sum_field,
            as_field,
        } => {
            for doc in docs.iter_mut() {
                let Some(id) = doc.id() else { continue };
                let links = store
                    .find(*through, &Filter::new().eq(through_field, id), &[], 0, None)
                    .await?;
                let member_ids: Vec<i64> =
                    links.iter().filter_map(|l| l.get_i64(member_field)).collect();
                let total = if member_ids.is_empty() {
                    0
                } else {
                    store
                        .find(*from, &Filter::new().is_in("id", member_ids), &[], 0, None)
                        .await?
                        .iter()
                        .filter_map(|member| member.get_i64(sum_field))
                        .sum::<i64>()
                };
                doc.set(*as_field, total);
            }
        }

        Stage::Derive(Derivation::IsViewer {
            local_field,
            viewer,
            as_field,
        }) => {
            for doc in docs.iter_mut() {
                let is_viewer = viewer.is_some() && doc.get_i64(local_field) == *viewer;
                doc.set(*as_field, is_viewer);
            }
        }
    }
    Ok(())
}
