use crate::error::AppResult;
use crate::infrastructure::store::{Collection, Condition, Filter};
use crate::infrastructure::viewer::ViewerContext;
use crate::pipeline::criteria::{ensure_known_keys, optional_id, optional_text};
use crate::pipeline::sort::{resolve_sort, CONTENT_SORTABLE};
use crate::pipeline::{PageResult, Pipeline, QueryContext, Stage};

const FILTER_KEYS: &[&str] = &["id", "ownerId", "query"];
const SEARCH_FIELDS: &[&str] = &["title", "description"];

/// Published items, plus the viewer's own drafts.
pub(crate) fn visible_to(viewer: ViewerContext) -> Condition {
    match viewer.viewer_id {
        Some(viewer_id) => Condition::AnyOf(vec![
            Condition::Eq("isPublished".to_string(), true.into()),
            Condition::Eq("ownerId".to_string(), viewer_id.into()),
        ]),
        None => Condition::Eq("isPublished".to_string(), true.into()),
    }
}

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let sort = resolve_sort(ctx.sort, CONTENT_SORTABLE)?;

    let mut filter = Filter::new().with(visible_to(ctx.viewer));
    if let Some(id) = optional_id(ctx.criteria, "id")? {
        filter = filter.eq("id", id);
    }
    if let Some(owner_id) = optional_id(ctx.criteria, "ownerId")? {
        filter = filter.eq("ownerId", owner_id);
    }
    if let Some(needle) = optional_text(ctx.criteria, "query") {
        filter = filter.text_search(SEARCH_FIELDS, needle);
    }

    let viewer = ctx.viewer.viewer_id;
    let pipeline = Pipeline::new(Collection::Content)
        .then(Stage::Match(filter))
        .then(Stage::LookupActor {
            local_field: "ownerId",
            as_field: "actor",
        })
        .then(Stage::LookupCount {
            within: Some("actor"),
            from: Collection::Follows,
            foreign_field: "followeeId",
            local_field: "id",
            as_field: "followerCount",
        })
        .then(Stage::LookupViewerLink {
            within: Some("actor"),
            from: Collection::Follows,
            foreign_field: "followeeId",
            local_field: "id",
            viewer_field: "followerId",
            viewer,
            as_field: "isFollowing",
        })
        .then(Stage::LookupCount {
            within: None,
            from: Collection::Reactions,
            foreign_field: "contentId",
            local_field: "id",
            as_field: "reactionCount",
        })
        .then(Stage::LookupCount {
            within: None,
            from: Collection::Comments,
            foreign_field: "contentId",
            local_field: "id",
            as_field: "commentCount",
        })
        .then(Stage::LookupViewerLink {
            within: None,
            from: Collection::Reactions,
            foreign_field: "contentId",
            local_field: "id",
            viewer_field: "actorId",
            viewer,
            as_field: "hasReacted",
        })
        .then(Stage::Sort(sort))
        .then(ctx.paginate());

    ctx.run(pipeline).await
}
