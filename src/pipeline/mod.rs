// Pipeline Builder - denormalized, paginated, viewer-relative views over the
// store, one pipeline per resource kind.

pub mod criteria;
pub(crate) mod joins;
pub mod page;
pub mod sort;
pub mod stage;

mod comment;
mod content;
mod follow_list;
mod grouped_list;
mod post;
mod reaction_summary;
mod stats;

use std::fmt;
use tracing::{debug, instrument};

use crate::config::QueryConfig;
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::SharedStore;
use crate::infrastructure::viewer::ViewerContext;

pub use criteria::FilterCriteria;
pub use page::{PageRequest, PageResult, PageWindow};
pub use sort::SortRequest;
pub use stage::{Derivation, Pipeline, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Content,
    Comment,
    ReactionSummary,
    FollowList,
    Stats,
    Post,
    GroupedList,
}

impl ResourceKind {
    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "content" => Ok(ResourceKind::Content),
            "comment" | "comments" => Ok(ResourceKind::Comment),
            "reaction-summary" | "reactions" => Ok(ResourceKind::ReactionSummary),
            "follow-list" | "follows" => Ok(ResourceKind::FollowList),
            "stats" => Ok(ResourceKind::Stats),
            "post" | "posts" => Ok(ResourceKind::Post),
            "grouped-list" | "lists" => Ok(ResourceKind::GroupedList),
            other => Err(AppError::invalid(format!("Unknown resource kind: {}", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Content => "content",
            ResourceKind::Comment => "comment",
            ResourceKind::ReactionSummary => "reaction-summary",
            ResourceKind::FollowList => "follow-list",
            ResourceKind::Stats => "stats",
            ResourceKind::Post => "post",
            ResourceKind::GroupedList => "grouped-list",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One page query: which resource, scoped by which criteria, for whom.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub kind: ResourceKind,
    pub filter: FilterCriteria,
    pub viewer: ViewerContext,
    pub page: PageRequest,
    pub sort: SortRequest,
}

impl QueryPage {
    pub fn new(kind: ResourceKind, viewer: ViewerContext) -> Self {
        Self {
            kind,
            filter: FilterCriteria::new(),
            viewer,
            page: PageRequest::default(),
            sort: SortRequest::default(),
        }
    }

    pub fn filter(mut self, key: &str, value: impl ToString) -> Self {
        self.filter.insert(key.to_string(), value.to_string());
        self
    }

    pub fn page(mut self, page: i64, limit: i64) -> Self {
        self.page = PageRequest::new(page, limit);
        self
    }

    pub fn sort(mut self, sort_by: &str, sort_type: &str) -> Self {
        self.sort = SortRequest::new(sort_by, sort_type);
        self
    }
}

/// Everything a resource needs to build and run its query.
pub(crate) struct QueryContext<'a> {
    pub store: &'a SharedStore,
    pub criteria: &'a FilterCriteria,
    pub viewer: ViewerContext,
    pub window: PageWindow,
    pub sort: &'a SortRequest,
}

impl QueryContext<'_> {
    pub fn paginate(&self) -> Stage {
        Stage::Paginate {
            skip: self.window.skip(),
            limit: self.window.limit,
        }
    }

    pub async fn run(&self, pipeline: Pipeline) -> AppResult<PageResult> {
        let (items, total) = pipeline.execute(self.store.as_ref()).await?;
        Ok(PageResult::new(items, self.window, total))
    }
}

#[derive(Clone)]
pub struct PipelineBuilder {
    store: SharedStore,
    config: QueryConfig,
}

impl PipelineBuilder {
    pub fn new(store: SharedStore, config: QueryConfig) -> Self {
        Self { store, config }
    }

    #[instrument(skip(self, query), fields(kind = %query.kind, viewer = ?query.viewer.viewer_id))]
    pub async fn query_page(&self, query: &QueryPage) -> AppResult<PageResult> {
        let window = PageWindow::resolve(&query.page, &self.config)?;
        let ctx = QueryContext {
            store: &self.store,
            criteria: &query.filter,
            viewer: query.viewer,
            window,
            sort: &query.sort,
        };
        let result = match query.kind {
            ResourceKind::Content => content::query(&ctx).await?,
            ResourceKind::Comment => comment::query(&ctx).await?,
            ResourceKind::ReactionSummary => reaction_summary::query(&ctx).await?,
            ResourceKind::FollowList => follow_list::query(&ctx).await?,
            ResourceKind::Stats => stats::query(&ctx).await?,
            ResourceKind::Post => post::query(&ctx).await?,
            ResourceKind::GroupedList => grouped_list::query(&ctx).await?,
        };
        debug!(
            total_items = result.total_items,
            returned = result.items.len(),
            "page resolved"
        );
        Ok(result)
    }
}
