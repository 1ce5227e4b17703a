// Content interface - HTTP surface over the pipeline builder, the toggle
// engine and the owner-side services

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::{
    config::QueryConfig,
    entities::{EntActor, EntComment, EntContent, EntList, EntPost},
    error::{AppError, AppResult},
    infrastructure::{
        middleware::{viewer_context_middleware, Vc},
        store::{Document, SharedStore},
    },
    pipeline::{PageRequest, PageResult, PipelineBuilder, QueryPage, ResourceKind, SortRequest},
    services::{
        ActorService, CommentService, ContentPatch, ContentService, ListPatch, ListService,
        ListView, NewActor, NewContent, NewList, PostService,
    },
    toggle::{TargetKind, ToggleEngine, ToggleState},
};

/// Everything the handlers need, cloned into each request.
#[derive(Clone)]
pub struct ContentInterface {
    pub pipeline: PipelineBuilder,
    pub toggles: ToggleEngine,
    pub actors: ActorService,
    pub content: ContentService,
    pub comments: CommentService,
    pub posts: PostService,
    pub lists: ListService,
}

impl ContentInterface {
    pub fn new(store: SharedStore, query: QueryConfig) -> Self {
        Self {
            pipeline: PipelineBuilder::new(store.clone(), query),
            toggles: ToggleEngine::new(store.clone()),
            actors: ActorService::new(store.clone()),
            content: ContentService::new(store.clone()),
            comments: CommentService::new(store.clone()),
            posts: PostService::new(store.clone()),
            lists: ListService::new(store),
        }
    }
}

#[derive(Deserialize)]
pub struct TextBody {
    pub content: String,
}

fn parse_number(field: &str, raw: &str) -> AppResult<i64> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::invalid(format!("{} must be an integer, got '{}'", field, raw)))
}

/// Splits raw query parameters into paging, sorting and filter criteria.
fn build_query(kind: ResourceKind, vc: Vc, mut params: BTreeMap<String, String>) -> AppResult<QueryPage> {
    let page = PageRequest {
        page: params.remove("page").map(|raw| parse_number("page", &raw)).transpose()?,
        limit: params.remove("limit").map(|raw| parse_number("limit", &raw)).transpose()?,
    };
    let sort = SortRequest {
        sort_by: params.remove("sortBy"),
        sort_type: params.remove("sortType"),
    };
    Ok(QueryPage {
        kind,
        filter: params,
        viewer: *vc,
        page,
        sort,
    })
}

// HTTP Handlers

pub async fn query_page_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(kind): AxumPath<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<PageResult>, AppError> {
    let query = build_query(ResourceKind::parse(&kind)?, vc, params)?;
    Ok(Json(api.pipeline.query_page(&query).await?))
}

pub async fn toggle_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath((target_kind, target_id)): AxumPath<(String, i64)>,
) -> Result<Json<ToggleState>, AppError> {
    let actor_id = vc.require()?;
    let kind = TargetKind::parse(&target_kind)?;
    Ok(Json(api.toggles.toggle(actor_id, kind, target_id).await?))
}

pub async fn register_actor_handler(
    State(api): State<ContentInterface>,
    Json(input): Json<NewActor>,
) -> Result<(StatusCode, Json<EntActor>), AppError> {
    let actor = api.actors.register(input).await?;
    Ok((StatusCode::CREATED, Json(actor)))
}

pub async fn get_actor_handler(
    State(api): State<ContentInterface>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(api.actors.get_public(id).await?))
}

pub async fn publish_content_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    Json(input): Json<NewContent>,
) -> Result<(StatusCode, Json<EntContent>), AppError> {
    let item = api.content.publish(vc.require()?, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update_content_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(patch): Json<ContentPatch>,
) -> Result<Json<EntContent>, AppError> {
    Ok(Json(api.content.update(vc.require()?, id, patch).await?))
}

pub async fn delete_content_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<EntContent>, AppError> {
    Ok(Json(api.content.delete(vc.require()?, id).await?))
}

pub async fn toggle_publish_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<EntContent>, AppError> {
    Ok(Json(api.content.toggle_publish(vc.require()?, id).await?))
}

pub async fn record_view_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<EntContent>, AppError> {
    Ok(Json(api.content.record_view(*vc, id).await?))
}

pub async fn add_comment_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(content_id): AxumPath<i64>,
    Json(body): Json<TextBody>,
) -> Result<(StatusCode, Json<EntComment>), AppError> {
    let comment = api.comments.add(vc.require()?, content_id, &body.content).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn update_comment_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<TextBody>,
) -> Result<Json<EntComment>, AppError> {
    Ok(Json(api.comments.update(vc.require()?, id, &body.content).await?))
}

pub async fn delete_comment_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    api.comments.delete(vc.require()?, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn create_post_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    Json(body): Json<TextBody>,
) -> Result<(StatusCode, Json<EntPost>), AppError> {
    let post = api.posts.create(vc.require()?, &body.content).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn update_post_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(body): Json<TextBody>,
) -> Result<Json<EntPost>, AppError> {
    Ok(Json(api.posts.update(vc.require()?, id, &body.content).await?))
}

pub async fn delete_post_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    api.posts.delete(vc.require()?, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn create_list_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    Json(input): Json<NewList>,
) -> Result<(StatusCode, Json<EntList>), AppError> {
    let list = api.lists.create(vc.require()?, input).await?;
    Ok((StatusCode::CREATED, Json(list)))
}

pub async fn get_list_handler(
    State(api): State<ContentInterface>,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<ListView>, AppError> {
    Ok(Json(api.lists.get(id).await?))
}

pub async fn update_list_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
    Json(patch): Json<ListPatch>,
) -> Result<Json<EntList>, AppError> {
    Ok(Json(api.lists.update(vc.require()?, id, patch).await?))
}

pub async fn delete_list_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath(id): AxumPath<i64>,
) -> Result<Json<Value>, AppError> {
    api.lists.delete(vc.require()?, id).await?;
    Ok(Json(json!({ "deleted": id })))
}

pub async fn add_list_item_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath((list_id, content_id)): AxumPath<(i64, i64)>,
) -> Result<Json<ListView>, AppError> {
    Ok(Json(api.lists.add_item(vc.require()?, list_id, content_id).await?))
}

pub async fn remove_list_item_handler(
    State(api): State<ContentInterface>,
    vc: Vc,
    AxumPath((list_id, content_id)): AxumPath<(i64, i64)>,
) -> Result<Json<ListView>, AppError> {
    Ok(Json(api.lists.remove_item(vc.require()?, list_id, content_id).await?))
}

pub fn create_content_router(api: ContentInterface) -> Router {
    Router::new()
        // Reads and toggles
        .route("/query/{kind}", get(query_page_handler))
        .route("/toggle/{target_kind}/{target_id}", post(toggle_handler))

        // Actors
        .route("/actors", post(register_actor_handler))
        .route("/actors/{id}", get(get_actor_handler))

        // Content
        .route("/content", post(publish_content_handler))
        .route("/content/{id}", patch(update_content_handler).delete(delete_content_handler))
        .route("/content/{id}/publish-toggle", post(toggle_publish_handler))
        .route("/content/{id}/view", post(record_view_handler))
        .route("/content/{id}/comments", post(add_comment_handler))

        // Comments and posts
        .route("/comments/{id}", patch(update_comment_handler).delete(delete_comment_handler))
        .route("/posts", post(create_post_handler))
        .route("/posts/{id}", patch(update_post_handler).delete(delete_post_handler))

        // Lists
        .route("/lists", post(create_list_handler))
        .route(
            "/lists/{id}",
            get(get_list_handler)
                .patch(update_list_handler)
                .delete(delete_list_handler),
        )
        .route(
            "/lists/{id}/items/{content_id}",
            post(add_list_item_handler).delete(remove_list_item_handler),
        )

        .layer(middleware::from_fn(viewer_context_middleware))
        .with_state(api)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::SqliteStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn router() -> Router {
        let store: SharedStore = Arc::new(SqliteStore::new_in_memory().await.unwrap());
        create_content_router(ContentInterface::new(store, QueryConfig::default()))
    }

    async fn call(app: &Router, method: &str, uri: &str, viewer: Option<i64>, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(viewer) = viewer {
            request = request.header("x-viewer-id", viewer.to_string());
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_publish_react_and_query() {
        let app = router().await;
        let (status, owner) = call(&app, "POST", "/actors", None, Some(json!({"username": "owner", "fullName": "Owner"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let owner_id = owner["id"].as_i64().unwrap();
        let (_, fan) = call(&app, "POST", "/actors", None, Some(json!({"username": "fan", "fullName": "Fan"}))).await;
        let fan_id = fan["id"].as_i64().unwrap();

        let (status, item) = call(
            &app,
            "POST",
            "/content",
            Some(owner_id),
            Some(json!({"title": "Clip", "description": "A clip", "videoUrl": "https://a.example.com/c.mp4"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let item_id = item["id"].as_i64().unwrap();

        let (status, state) = call(&app, "POST", &format!("/toggle/content/{}", item_id), Some(fan_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state["active"], true);

        let (status, page) = call(&app, "GET", &format!("/query/content?id={}&limit=5", item_id), Some(fan_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["totalItems"], 1);
        assert_eq!(page["limit"], 5);
        assert_eq!(page["items"][0]["reactionCount"], 1);
        assert_eq!(page["items"][0]["hasReacted"], true);
        assert_eq!(page["items"][0]["actor"]["username"], "owner");
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = router().await;
        let (status, _) = call(&app, "POST", "/toggle/content/1", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "POST", "/toggle/follow/3", Some(3), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/toggle/post/77", Some(3), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, "GET", "/query/widgets", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/query/content?page=0", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/query/content?page=abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "GET", "/query/content", Some(-4), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, "POST", "/lists", Some(3), Some(json!({"name": "Mix"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, "POST", "/lists", Some(3), Some(json!({"name": "Mix"}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
