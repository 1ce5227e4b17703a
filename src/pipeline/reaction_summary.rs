// Reactions grouped by target: one document per reacted-to item with a fresh
// total, the set of reacting actors and the target itself. Grouping happens
// in memory, so sort and pagination run over the groups.

use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashMap;

use crate::entities::ReactionTarget;
use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Document, Filter, SortDirection, Store};
use crate::infrastructure::viewer::ViewerContext;
use crate::pipeline::criteria::{ensure_known_keys, exactly_one, required_id};
use crate::pipeline::joins::public_profiles;
use crate::pipeline::sort::{resolve_sort, REACTION_SUMMARY_SORTABLE};
use crate::pipeline::{PageResult, QueryContext};

const SCOPES: &[&str] = &["contentId", "commentId", "postId", "actorId"];
const FILTER_KEYS: &[&str] = &["contentId", "commentId", "postId", "actorId", "targetKind"];

struct Group {
    target: ReactionTarget,
    latest_at: i64,
}

fn target_field_for_kind(kind: &str) -> AppResult<&'static str> {
    match kind {
        "content" => Ok("contentId"),
        "comment" => Ok("commentId"),
        "post" => Ok("postId"),
        other => Err(AppError::invalid(format!("Unknown targetKind: {}", other))),
    }
}

fn scope_filter(ctx: &QueryContext<'_>) -> AppResult<Filter> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let scope = exactly_one(ctx.criteria, SCOPES)?;
    let scope_id = required_id(ctx.criteria, scope)?;
    let mut filter = Filter::new().eq(scope, scope_id);

    if let Some(kind) = ctx.criteria.get("targetKind") {
        if scope != "actorId" {
            return Err(AppError::invalid("targetKind only applies with actorId"));
        }
        filter = filter.exists(target_field_for_kind(kind.trim())?);
    }
    Ok(filter)
}

/// Groups ordered by latest reaction, ties by target id descending.
fn group_by_target(reactions: &[Document], direction: SortDirection) -> Vec<Group> {
    let mut latest: HashMap<ReactionTarget, i64> = HashMap::new();
    for reaction in reactions {
        let Some(target) = ReactionTarget::from_document(reaction) else {
            continue;
        };
        let at = reaction.created_at();
        latest
            .entry(target)
            .and_modify(|seen| *seen = (*seen).max(at))
            .or_insert(at);
    }

    let mut groups: Vec<Group> = latest
        .into_iter()
        .map(|(target, latest_at)| Group { target, latest_at })
        .collect();
    groups.sort_by(|a, b| {
        let by_time = match direction {
            SortDirection::Asc => a.latest_at.cmp(&b.latest_at),
            SortDirection::Desc => b.latest_at.cmp(&a.latest_at),
        };
        by_time
            .then_with(|| b.target.id().cmp(&a.target.id()))
            .then_with(|| a.target.kind().cmp(b.target.kind()))
    });
    groups
}

/// Joined target record, or null when it is gone or hidden from the viewer.
async fn load_target(
    store: &dyn Store,
    target: ReactionTarget,
    viewer: ViewerContext,
) -> AppResult<Value> {
    let Some(doc) = store.get(target.collection(), target.id()).await? else {
        return Ok(Value::Null);
    };
    if let ReactionTarget::Content(_) = target {
        let published = doc.get_bool("isPublished").unwrap_or(false);
        let owned = doc.get_i64("ownerId").is_some_and(|owner| viewer.is(owner));
        if !published && !owned {
            return Ok(Value::Null);
        }
    }
    Ok(doc.into_value())
}

async fn summarize(store: &dyn Store, group: &Group, viewer: ViewerContext) -> AppResult<Document> {
    let target = group.target;
    let reactions = store
        .find(
            Collection::Reactions,
            &Filter::new().eq(target.field(), target.id()),
            &[],
            0,
            None,
        )
        .await?;
    let actor_ids: Vec<i64> = reactions
        .iter()
        .filter_map(|reaction| reaction.get_i64("actorId"))
        .collect();
    let has_reacted = viewer
        .viewer_id
        .is_some_and(|viewer_id| actor_ids.contains(&viewer_id));

    let profiles = public_profiles(store, actor_ids.iter().copied()).await?;
    let mut ordered: Vec<(i64, Document)> = profiles.into_iter().collect();
    ordered.sort_by_key(|(id, _)| *id);
    let actors: Vec<Value> = ordered.into_iter().map(|(_, profile)| profile.into_value()).collect();

    let joined = load_target(store, target, viewer).await?;
    Ok(Document::new()
        .with("targetKind", target.kind())
        .with("targetId", target.id())
        .with("totalReactions", reactions.len() as u64)
        .with("actors", actors)
        .with("target", joined)
        .with("latestReactionAt", group.latest_at)
        .with("hasReacted", has_reacted))
}

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    let filter = scope_filter(ctx)?;
    let sort = resolve_sort(ctx.sort, REACTION_SUMMARY_SORTABLE)?;
    let direction = sort.first().map(|key| key.direction).unwrap_or_default();

    let store = ctx.store.as_ref();
    let reactions = store
        .find(Collection::Reactions, &filter, &[], 0, None)
        .await?;
    let groups = group_by_target(&reactions, direction);
    let total = groups.len() as u64;

    let page: Vec<&Group> = groups
        .iter()
        .skip(ctx.window.skip() as usize)
        .take(ctx.window.limit as usize)
        .collect();
    let items = try_join_all(page.into_iter().map(|group| summarize(store, group, ctx.viewer))).await?;

    Ok(PageResult::new(items, ctx.window, total))
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
    async fn test_summary_for_one_target() {
        let (builder, store) = builder().await;
        let owner = actor(&store, "owner").await;
        let a = actor(&store, "a").await;
        let b = actor(&store, "b").await;
        let item = content(&store, owner, "clip", true).await;
        put(&store, Collection::Reactions, json!({"actorId": a, "contentId": item})).await;
        put(&store, Collection::Reactions, json!({"actorId": b, "contentId": item})).await;

        let query = QueryPage::new(ResourceKind::ReactionSummary, ViewerContext::new(b))
            .filter("contentId", item);
        let page = builder.query_page(&query).await.unwrap();
        assert_eq!(page.total_items, 1);
        let summary = &page.items[0];
        assert_eq!(summary.get_str("targetKind"), Some("content"));
        assert_eq!(summary.get_i64("targetId"), Some(item));
        assert_eq!(summary.get_i64("totalReactions"), Some(2));
        assert_eq!(summary.get_bool("hasReacted"), Some(true));
        let actors = summary.get("actors").unwrap().as_array().unwrap();
        assert_eq!(actors.len(), 2);
        assert!(actors.iter().all(|profile| profile.get("email").is_none()));
        assert_eq!(summary.get("target").unwrap()["title"], "clip");
    }

    #[tokio::test]
    async fn test_actor_reactions_by_kind() {
        let (builder, store) = builder().await;
        let owner = actor(&store, "owner").await;
        let fan = actor(&store, "fan").await;
        let first = content(&store, owner, "first", true).await;
        let second = content(&store, owner, "second", true).await;
        let draft = content(&store, owner, "draft", false).await;
        let post = put(&store, Collection::Posts, json!({"ownerId": owner, "content": "hello"})).await;
        put(&store, Collection::Reactions, json!({"actorId": fan, "contentId": first})).await;
        put(&store, Collection::Reactions, json!({"actorId": fan, "postId": post})).await;
        put(&store, Collection::Reactions, json!({"actorId": fan, "contentId": second})).await;
        put(&store, Collection::Reactions, json!({"actorId": fan, "contentId": draft})).await;
        put(&store, Collection::Reactions, json!({"actorId": owner, "contentId": second})).await;

        let query = QueryPage::new(ResourceKind::ReactionSummary, ViewerContext::anonymous())
            .filter("actorId", fan)
            .filter("targetKind", "content");
        let page = builder.query_page(&query).await.unwrap();
        assert_eq!(page.total_items, 3);
        let ids: Vec<i64> = page.items.iter().filter_map(|d| d.get_i64("targetId")).collect();
        assert!(ids.contains(&first) && ids.contains(&second) && ids.contains(&draft));
        let second_summary = page
            .items
            .iter()
            .find(|d| d.get_i64("targetId") == Some(second))
            .unwrap();
        assert_eq!(second_summary.get_i64("totalReactions"), Some(2));
        assert_eq!(second_summary.get_bool("hasReacted"), Some(false));
        let draft_summary = page
            .items
            .iter()
            .find(|d| d.get_i64("targetId") == Some(draft))
            .unwrap();
        assert!(draft_summary.get("target").unwrap().is_null());

        let all = QueryPage::new(ResourceKind::ReactionSummary, ViewerContext::anonymous())
            .filter("actorId", fan)
            .page(2, 3);
        let page = builder.query_page(&all).await.unwrap();
        assert_eq!(page.total_items, 4);
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn test_scope_validation() {
        let (builder, _store) = builder().await;
        let none = QueryPage::new(ResourceKind::ReactionSummary, ViewerContext::anonymous());
        assert!(matches!(builder.query_page(&none).await, Err(AppError::InvalidArgument(_))));

        let kind_without_actor = none.clone().filter("contentId", 4).filter("targetKind", "post");
        assert!(matches!(
            builder.query_page(&kind_without_actor).await,
            Err(AppError::InvalidArgument(_))
        ));

        let bad_kind = none.clone().filter("actorId", 4).filter("targetKind", "video");
        assert!(matches!(
            builder.query_page(&bad_kind).await,
            Err(AppError::InvalidArgument(_))
        ));
    }
}
