use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub type Id = i64;

/// Which thread family a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ThreadKind {
    /// Comments under an article; owner is the article id.
    Comment,
    /// Q&A articles under a project; owner is the project id.
    Article,
}

impl ThreadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Article => "article",
        }
    }
}

/// One thread: every node of a given kind hanging off the same owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadScope {
    pub kind: ThreadKind,
    pub owner_id: Id,
}

impl ThreadScope {
    pub fn comments_of(article_id: Id) -> Self {
        Self { kind: ThreadKind::Comment, owner_id: article_id }
    }
    pub fn articles_of(project_id: Id) -> Self {
        Self { kind: ThreadKind::Article, owner_id: project_id }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    pub id: Id,
    pub parent_id: Option<Id>,
    pub content: String,
    pub author_id: Id,
    pub author_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted: bool, // soft delete marker
}

impl ThreadNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateNode {
    pub content: String,
}

/// The authenticated viewer, threaded explicitly into the display policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Id,
    pub name: String,
    #[serde(default)]
    pub admin: bool,
}

impl Identity {
    pub fn is_author_of(&self, node: &ThreadNode) -> bool {
        self.user_id == node.author_id
    }
}
