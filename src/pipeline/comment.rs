use crate::entities::{EntContent, StoredEntity};
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Filter};
use crate::pipeline::criteria::{ensure_known_keys, optional_id, required_id};
use crate::pipeline::sort::{resolve_sort, COMMENT_SORTABLE};
use crate::pipeline::{PageResult, Pipeline, QueryContext, Stage};

const FILTER_KEYS: &[&str] = &["contentId", "ownerId"];

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let content_id = required_id(ctx.criteria, "contentId")?;
    let owner_id = optional_id(ctx.criteria, "ownerId")?;
    let sort = resolve_sort(ctx.sort, COMMENT_SORTABLE)?;

    // Comments of a hidden item are as hidden as the item.
    let parent = EntContent::gen_nullable(ctx.store.as_ref(), content_id).await?;
    if !parent.is_some_and(|item| item.is_visible_to(ctx.viewer.viewer_id)) {
        return Err(AppError::not_found(format!("Content {} not found", content_id)));
    }

    let mut filter = Filter::new().eq("contentId", content_id);
    if let Some(owner_id) = owner_id {
        filter = filter.eq("ownerId", owner_id);
    }

    let pipeline = Pipeline::new(Collection::Comments)
        .then(Stage::Match(filter))
        .then(Stage::LookupActor {
            local_field: "ownerId",
            as_field: "actor",
        })
        .then(Stage::LookupCount {
            within: None,
            from: Collection::Reactions,
            foreign_field: "commentId",
            local_field: "id",
            as_field: "reactionCount",
        })
        .then(Stage::LookupViewerLink {
            within: None,
            from: Collection::Reactions,
            foreign_field: "commentId",
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

    use crate::error::AppError;
    use crate::infrastructure::store::Collection;
    use crate::infrastructure::viewer::ViewerContext;
    use crate::pipeline::test_support::*;
    use crate::pipeline::{QueryPage, ResourceKind};

    #[tokio::test]
    async fn test_comments_of_item_newest_first() {
        let (builder, store) = builder().await;
        let owner = actor(&store, "owner").await;
        let reader = actor(&store, "reader").await;
        let item = content(&store, owner, "clip", true).await;
        let first = put(
            &store,
            Collection::Comments,
            json!({"contentId": item, "ownerId": reader, "content": "first"}),
        )
        .await;
        let second = put(
            &store,
            Collection::Comments,
            json!({"contentId": item, "ownerId": owner, "content": "second"}),
        )
        .await;
        put(&store, Collection::Reactions, json!({"actorId": owner, "commentId": first})).await;

        let query = QueryPage::new(ResourceKind::Comment, ViewerContext::new(owner)).filter("contentId", item);
        let page = builder.query_page(&query).await.unwrap();
        let ids: Vec<i64> = page.items.iter().filter_map(|d| d.id()).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(page.items[1].get_i64("reactionCount"), Some(1));
        assert_eq!(page.items[1].get_bool("hasReacted"), Some(true));
        assert_eq!(page.items[0].get_bool("hasReacted"), Some(false));
        assert_eq!(page.items[1].get("actor").unwrap()["username"], "reader");

        let by_reader = query.clone().filter("ownerId", reader);
        assert_eq!(builder.query_page(&by_reader).await.unwrap().total_items, 1);
    }

    #[tokio::test]
    async fn test_content_id_is_required_and_must_be_visible() {
        let (builder, store) = builder().await;
        let owner = actor(&store, "owner").await;
        let draft = content(&store, owner, "draft", false).await;

        let missing = QueryPage::new(ResourceKind::Comment, ViewerContext::anonymous());
        assert!(matches!(
            builder.query_page(&missing).await,
            Err(AppError::InvalidArgument(_))
        ));

        let hidden = QueryPage::new(ResourceKind::Comment, ViewerContext::anonymous()).filter("contentId", draft);
        assert!(matches!(builder.query_page(&hidden).await, Err(AppError::NotFound(_))));

        let own = QueryPage::new(ResourceKind::Comment, ViewerContext::new(owner)).filter("contentId", draft);
        assert_eq!(builder.query_page(&own).await.unwrap().total_items, 0);
    }
}
