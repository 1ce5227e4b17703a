// Channel statistics for one owner. Only published items count unless the
// owner is looking at their own numbers.

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::store::{Collection, Document, Filter};
use crate::pipeline::criteria::{ensure_known_keys, optional_id};
use crate::pipeline::{PageResult, QueryContext};

const FILTER_KEYS: &[&str] = &["ownerId"];

pub(crate) async fn query(ctx: &QueryContext<'_>) -> AppResult<PageResult> {
    ensure_known_keys(ctx.criteria, FILTER_KEYS)?;
    let owner_id = match optional_id(ctx.criteria, "ownerId")? {
        Some(id) => id,
        None => ctx
            .viewer
            .viewer_id
            .ok_or_else(|| AppError::invalid("ownerId is required without a viewer"))?,
    };

    let store = ctx.store.as_ref();
    let mut content_filter = Filter::new().eq("ownerId", owner_id);
    if !ctx.viewer.is(owner_id) {
        content_filter = content_filter.eq("isPublished", true);
    }

    let items = store
        .find(Collection::Content, &content_filter, &[], 0, None)
        .await?;
    let content_ids: Vec<i64> = items.iter().filter_map(Document::id).collect();
    let total_views: i64 = items.iter().filter_map(|item| item.get_i64("views")).sum();

    let followers = Filter::new().eq("followeeId", owner_id);
    let reactions = Filter::new().is_in("contentId", content_ids.iter().copied());
    let (total_followers, total_reactions) = futures::try_join!(
        store.count(Collection::Follows, &followers),
        store.count(Collection::Reactions, &reactions),
    )?;

    debug!(owner_id, total_content = items.len(), "stats computed");
    let stats = Document::new()
        .with("ownerId", owner_id)
        .with("totalViews", total_views)
        .with("totalFollowers", total_followers)
        .with("totalContent", items.len() as u64)
        .with("totalReactions", total_reactions);
    Ok(PageResult::single(stats))
}
