use crate::models::{Identity, NewNode, ThreadKind, ThreadNode, UpdateNode};
use crate::policy::DisplayNode;
use crate::view::ThreadPage;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::list_comments,
        crate::routes::create_comment,
        crate::routes::list_articles,
        crate::routes::create_article,
        crate::routes::update_node,
        crate::routes::delete_node,
        crate::routes::admin_soft_delete_node,
        crate::routes::admin_restore_node,
        crate::routes::auth_me,
    ),
    components(schemas(
        ThreadNode, NewNode, UpdateNode, ThreadKind, Identity, DisplayNode, ThreadPage
    )),
    tags(
        (name = "comments", description = "Comment threads under articles"),
        (name = "articles", description = "Q&A article threads under projects"),
        (name = "moderation", description = "Soft delete and restore"),
    )
)]
pub struct ApiDoc;
