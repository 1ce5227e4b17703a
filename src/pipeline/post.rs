use crate::error::AppResult;
use crate::infrastructure::store::{Collection, Filter};
use crate::pipeline::criteria::{ensure_known_keys, optional_id};
use crate::pipeline::sort::{resolve_sort, POST_SORTABLE};
use crate::pipeline::{PageResult, Pipeline, QueryContext, Stage};

const FILTER_KEYS: &[&str] = &["ownerId"];

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let sort = resolve_sort(ctx.sort, POST_SORTABLE)?;

    let mut filter = Filter::new();
    if let Some(owner_id) = optional_id(ctx.criteria, "ownerId")? {
        filter = filter.eq("ownerId", owner_id);
    }

    let pipeline = Pipeline::new(Collection::Posts)
        .then(Stage::Match(filter))
        .then(Stage::LookupActor {
            local_field: "ownerId",
            as_field: "actor",
        })
        .then(Stage::LookupCount {
            within: None,
            from: Collection::Reactions,
            foreign_field: "postId",
            local_field: "id",
            as_field: "reactionCount",
        })
        .then(Stage::LookupViewerLink {
            within: None,
            from: Collection::Reactions,
            foreign_field: "postId",
            local_field: "id",
            viewer_field: "actorId",
            viewer: ctx.viewer.viewer_id,
            as_field: "hasReacted",
        })
        .then(Stage::Sort(sort))
        .then(ctx.paginate());

    ctx.run(pipeline).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::infrastructure::store::Collection;
    use crate::infrastructure::viewer::ViewerContext;
    use crate::pipeline::test_support::*;
    use crate::pipeline::{QueryPage, ResourceKind};

    #[tokio::test]
    async fn test_pages_sum_to_total() {
        let (builder, store) = builder().await;
        let author = actor(&store, "author").await;
        let other = actor(&store, "other").await;
        for i in 0..7 {
            put(&store, Collection::Posts, json!({"ownerId": author, "content": format!("post {}", i)})).await;
        }
        put(&store, Collection::Posts, json!({"ownerId": other, "content": "elsewhere"})).await;

        let mut seen = Vec::new();
        for page in 1..=4 {
            let query = QueryPage::new(ResourceKind::Post, ViewerContext::anonymous())
                .filter("ownerId", author)
                .page(page, 3);
            let result = builder.query_page(&query).await.unwrap();
            assert!(result.items.len() <= 3);
            assert_eq!(result.total_items, 7);
            assert_eq!(result.total_pages, 3);
            seen.extend(result.items.iter().filter_map(|d| d.id()));
        }
        assert_eq!(seen.len(), 7);
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 7);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let (builder, store) = builder().await;
        let author = actor(&store, "author").await;
        for i in 0..3 {
            put(&store, Collection::Posts, json!({"ownerId": author, "content": format!("p{}", i)})).await;
        }
        let query = QueryPage::new(ResourceKind::Post, ViewerContext::anonymous()).page(9, 2);
        let result = builder.query_page(&query).await.unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.total_items, 3);
        assert_eq!(result.total_pages, 2);
        assert!(!result.has_next_page);
        assert!(result.has_prev_page);
    }
}
