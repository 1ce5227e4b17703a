use crate::error::AppResult;
use crate::infrastructure::store::{Collection, Filter};
use crate::pipeline::criteria::{ensure_known_keys, optional_id};
use crate::pipeline::sort::{resolve_sort, LIST_SORTABLE};
use crate::pipeline::{PageResult, Pipeline, QueryContext, Stage};

const FILTER_KEYS: &[&str] = &["id", "ownerId"];

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let sort = resolve_sort(ctx.sort, LIST_SORTABLE)?;

    let mut filter = Filter::new();
    if let Some(id) = optional_id(ctx.criteria, "id")? {
        filter = filter.eq("id", id);
    }
    if let Some(owner_id) = optional_id(ctx.criteria, "ownerId")? {
        filter = filter.eq("ownerId", owner_id);
    }

    let pipeline = Pipeline::new(Collection::Lists)
        .then(Stage::Match(filter))
        .then(Stage::LookupActor {
            local_field: "ownerId",
            as_field: "actor",
        })
        .then(Stage::LookupCount {
            within: None,
            from: Collection::ListEntries,
            foreign_field: "listId",
            local_field: "id",
            as_field: "totalItems",
        })
        .then(Stage::LookupSum {
            through: Collection::ListEntries,
            through_field: "listId",
            member_field: "contentId",
            from: Collection::Content,
            sum_field: "views",
            as_field: "totalViews",
        })
        .then(Stage::Sort(sort))
        .then(ctx.paginate());

    ctx.run(pipeline).await
}
