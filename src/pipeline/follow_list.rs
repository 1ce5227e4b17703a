// Followers of an actor (filter by followeeId) or the actors someone follows
// (filter by followerId). Each link carries the profile on the other side.

use crate::error::AppResult;
use crate::infrastructure::store::{Collection, Filter};
use crate::pipeline::criteria::{ensure_known_keys, exactly_one, required_id};
use crate::pipeline::sort::{resolve_sort, FOLLOW_SORTABLE};
use crate::pipeline::{PageResult, Pipeline, QueryContext, Stage};

const FILTER_KEYS: &[&str] = &["followeeId", "followerId"];

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let scope = exactly_one(ctx.criteria, FILTER_KEYS)?;
    let scope_id = required_id(ctx.criteria, scope)?;
    let sort = resolve_sort(ctx.sort, FOLLOW_SORTABLE)?;

    let (other_side, is_following_list) = match scope {
        "followeeId" => ("followerId", false),
        _ => ("followeeId", true),
    };
    let viewer = ctx.viewer.viewer_id;

    let mut pipeline = Pipeline::new(Collection::Follows)
        .then(Stage::Match(Filter::new().eq(scope, scope_id)))
        .then(Stage::LookupActor {
            local_field: other_side,
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
        });
    if is_following_list {
        pipeline = pipeline.then(Stage::LookupLatest {
            within: Some("actor"),
            from: Collection::Content,
            foreign_field: "ownerId",
            local_field: "id",
            filter: Filter::new().eq("isPublished", true),
            as_field: "latestContent",
        });
    }
    let pipeline = pipeline.then(Stage::Sort(sort)).then(ctx.paginate());

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
    async fn test_followers_and_followings() {
        let (builder, store) = builder().await;
        let star = actor(&store, "star").await;
        let fan = actor(&store, "fan").await;
        let lurker = actor(&store, "lurker").await;
        put(&store, Collection::Follows, json!({"followerId": fan, "followeeId": star})).await;
        put(&store, Collection::Follows, json!({"followerId": lurker, "followeeId": star})).await;
        put(&store, Collection::Follows, json!({"followerId": star, "followeeId": fan})).await;
        content(&store, star, "old", true).await;
        content(&store, star, "newest", true).await;
        content(&store, star, "draft", false).await;

        let followers = QueryPage::new(ResourceKind::FollowList, ViewerContext::new(star))
            .filter("followeeId", star);
        let page = builder.query_page(&followers).await.unwrap();
        assert_eq!(page.total_items, 2);
        let names: Vec<String> = page
            .items
            .iter()
            .map(|d| d.get("actor").unwrap()["username"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["lurker", "fan"]);
        // star follows fan back but not lurker
        assert_eq!(page.items[1].get("actor").unwrap()["isFollowing"], true);
        assert_eq!(page.items[0].get("actor").unwrap()["isFollowing"], false);
        assert!(page.items[0].get("actor").unwrap().get("latestContent").is_none());

        let followings = QueryPage::new(ResourceKind::FollowList, ViewerContext::anonymous())
            .filter("followerId", fan);
        let page = builder.query_page(&followings).await.unwrap();
        assert_eq!(page.total_items, 1);
        let followed = page.items[0].get("actor").unwrap();
        assert_eq!(followed["username"], "star");
        assert_eq!(followed["followerCount"], 2);
        assert_eq!(followed["isFollowing"], false);
        assert_eq!(followed["latestContent"]["title"], "newest");
    }

    #[tokio::test]
    async fn test_exactly_one_scope() {
        let (builder, _store) = builder().await;
        let neither = QueryPage::new(ResourceKind::FollowList, ViewerContext::anonymous());
        assert!(matches!(
            builder.query_page(&neither).await,
            Err(AppError::InvalidArgument(_))
        ));
        let both = neither.clone().filter("followeeId", 1).filter("followerId", 2);
        assert!(matches!(
            builder.query_page(&both).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}
