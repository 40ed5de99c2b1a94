use std::sync::Arc;
use actix_web::{web, HttpResponse};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::{Repo, StoredNode};
use crate::view::{self, PageParams, ThreadPage};

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(
                web::resource("/articles/{id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            )
            .service(
                web::resource("/projects/{id}/articles")
                    .route(web::get().to(list_articles))
                    .route(web::post().to(create_article)),
            )
            .service(
                web::resource("/nodes/{id}")
                    .route(web::patch().to(update_node))
                    .route(web::delete().to(delete_node)),
            )
            // Moderation endpoints
            .service(
                web::resource("/admin/nodes/{id}/soft-delete").route(web::post().to(admin_soft_delete_node))
            )
            .service(
                web::resource("/admin/nodes/{id}/restore").route(web::post().to(admin_restore_node))
            )
            .service(web::resource("/auth/me").route(web::get().to(auth_me)))
            .service(web::resource("/health").route(web::get().to(health))),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub rate_limiter: Option<RateLimiterFacade>,
}

fn viewer(auth: &Option<Auth>) -> Option<Identity> {
    auth.as_ref().and_then(|a| a.0.identity())
}

fn caller(auth: &Auth) -> Result<Identity, ApiError> {
    auth.0.identity().ok_or(ApiError::Unauthorized)
}

/// The article a comment thread hangs off; 404 for anything else.
async fn find_article(data: &AppState, article_id: Id) -> Result<StoredNode, ApiError> {
    let stored = data.repo.get_node(article_id).await?;
    if stored.scope.kind != ThreadKind::Article {
        return Err(ApiError::NotFound);
    }
    Ok(stored)
}

async fn thread_page(data: &AppState, scope: ThreadScope, viewer: Option<&Identity>, page: PageParams) -> Result<ThreadPage, ApiError> {
    let nodes = data.repo.list_nodes(scope).await?;
    Ok(view::paginate(view::build_from(nodes, viewer), page))
}

async fn create_in(data: &AppState, scope: ThreadScope, author: Identity, new: NewNode) -> Result<HttpResponse, ApiError> {
    if let Some(rl) = &data.rate_limiter {
        if !rl.allow_post(author.user_id) {
            tracing::info!(user_id = author.user_id, "post rate limited");
            return Err(ApiError::TooManyRequests);
        }
    }
    let node = data.repo.create_node(scope, new, &author).await?;
    tracing::info!(id = node.id, kind = scope.kind.as_str(), owner_id = scope.owner_id, parent_id = ?node.parent_id, "node created");
    Ok(HttpResponse::Created().json(node))
}

/// Loads the node and checks the caller wrote it.
async fn authored_node(data: &AppState, auth: &Auth, id: Id) -> Result<ThreadNode, ApiError> {
    let me = caller(auth)?;
    let stored = data.repo.get_node(id).await?;
    if !me.is_author_of(&stored.node) {
        return Err(ApiError::Forbidden);
    }
    Ok(stored.node)
}

#[utoipa::path(
    get,
    path = "/api/v1/articles/{id}/comments",
    params(("id" = Id, Path, description = "Article id"), PageParams),
    responses(
        (status = 200, description = "Comment thread for the caller", body = ThreadPage),
        (status = 404, description = "Article not found")
    )
)]
pub async fn list_comments(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let article = find_article(&data, path.into_inner()).await?;
    let me = viewer(&auth);
    let page = thread_page(&data, ThreadScope::comments_of(article.node.id), me.as_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/articles/{id}/comments",
    request_body = NewNode,
    params(("id" = Id, Path, description = "Article id")),
    responses(
        (status = 201, description = "Comment created", body = ThreadNode),
        (status = 400, description = "Empty content or invalid parent"),
        (status = 404, description = "Article not found"),
        (status = 410, description = "Parent was deleted"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewNode>,
) -> Result<HttpResponse, ApiError> {
    let author = caller(&auth)?;
    let article = find_article(&data, path.into_inner()).await?;
    if article.node.deleted { return Err(ApiError::NotFound); }
    create_in(&data, ThreadScope::comments_of(article.node.id), author, payload.into_inner()).await
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}/articles",
    params(("id" = Id, Path, description = "Project id"), PageParams),
    responses(
        (status = 200, description = "Article thread for the caller", body = ThreadPage)
    )
)]
pub async fn list_articles(
    auth: Option<Auth>,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, ApiError> {
    let me = viewer(&auth);
    let page = thread_page(&data, ThreadScope::articles_of(path.into_inner()), me.as_ref(), query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    post,
    path = "/api/v1/projects/{id}/articles",
    request_body = NewNode,
    params(("id" = Id, Path, description = "Project id")),
    responses(
        (status = 201, description = "Article created", body = ThreadNode),
        (status = 400, description = "Empty content or invalid parent"),
        (status = 410, description = "Parent was deleted"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_article(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<NewNode>,
) -> Result<HttpResponse, ApiError> {
    let author = caller(&auth)?;
    create_in(&data, ThreadScope::articles_of(path.into_inner()), author, payload.into_inner()).await
}

#[utoipa::path(
    patch,
    path = "/api/v1/nodes/{id}",
    request_body = UpdateNode,
    params(("id" = Id, Path, description = "Node id")),
    responses(
        (status = 200, description = "Content updated", body = ThreadNode),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Node not found"),
        (status = 410, description = "Node was deleted")
    )
)]
pub async fn update_node(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateNode>,
) -> Result<HttpResponse, ApiError> {
    let node = authored_node(&data, &auth, path.into_inner()).await?;
    if node.deleted { return Err(ApiError::Gone); }
    let updated = data.repo.update_content(node.id, &payload.content).await?;
    Ok(HttpResponse::Ok().json(updated))
}

#[utoipa::path(
    delete,
    path = "/api/v1/nodes/{id}",
    params(("id" = Id, Path, description = "Node id")),
    responses(
        (status = 200, description = "Node soft-deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Node not found")
    )
)]
pub async fn delete_node(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    let node = authored_node(&data, &auth, path.into_inner()).await?;
    data.repo.soft_delete(node.id).await?;
    tracing::info!(id = node.id, "node soft-deleted by author");
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"ok"})))
}

// ---------------- Moderation handlers -----------------------
macro_rules! ensure_moderator { ($auth:expr) => { if !$auth.0.is_moderator() { return Err(ApiError::Forbidden); } }; }

#[utoipa::path(
    post,
    path = "/api/v1/admin/nodes/{id}/soft-delete",
    params(("id" = Id, Path, description = "Node id")),
    responses((status = 200, description = "Node soft-deleted"), (status = 403, description = "Moderators only"), (status = 404, description = "Node not found"))
)]
pub async fn admin_soft_delete_node(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    ensure_moderator!(auth);
    let node = data.repo.soft_delete(path.into_inner()).await?;
    tracing::info!(id = node.id, moderator = %auth.0.sub, "node soft-deleted by moderator");
    Ok(HttpResponse::Ok().json(serde_json::json!({"status":"ok"})))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/nodes/{id}/restore",
    params(("id" = Id, Path, description = "Node id")),
    responses((status = 200, description = "Node restored", body = ThreadNode), (status = 403, description = "Moderators only"), (status = 404, description = "Node not found"))
)]
pub async fn admin_restore_node(auth: Auth, data: web::Data<AppState>, path: web::Path<Id>) -> Result<HttpResponse, ApiError> {
    ensure_moderator!(auth);
    let node = data.repo.restore(path.into_inner()).await?;
    tracing::info!(id = node.id, moderator = %auth.0.sub, "node restored");
    Ok(HttpResponse::Ok().json(node))
}
// ------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user", body = Identity),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn auth_me(auth: Auth) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(caller(&auth)?))
}

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status":"healthy"}))
}
