use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")] NotFound,
    #[error("invalid: {0}")] Invalid(&'static str),
    #[error("gone")] Gone,
    #[error("internal: {0}")] Internal(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// A node together with the thread it lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNode {
    pub scope: ThreadScope,
    pub node: ThreadNode,
}

/// Trimmed content, or `Invalid` when nothing is left.
pub fn clean_content(raw: &str) -> RepoResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RepoError::Invalid("content is required"));
    }
    Ok(trimmed)
}

/// Replies attach to live roots of the same thread only.
fn check_parent(scope: ThreadScope, parent: &StoredNode) -> RepoResult<()> {
    if parent.scope != scope {
        return Err(RepoError::Invalid("parent belongs to another thread"));
    }
    if !parent.node.is_root() {
        return Err(RepoError::Invalid("replies cannot be nested"));
    }
    if parent.node.deleted {
        return Err(RepoError::Gone);
    }
    Ok(())
}

use async_trait::async_trait;

#[async_trait]
pub trait NodeRepo: Send + Sync {
    /// Full flat list of one thread in arrival order.
    async fn list_nodes(&self, scope: ThreadScope) -> RepoResult<Vec<ThreadNode>>;
    async fn get_node(&self, id: Id) -> RepoResult<StoredNode>;
    async fn create_node(&self, scope: ThreadScope, new: NewNode, author: &Identity) -> RepoResult<ThreadNode>;
    async fn update_content(&self, id: Id, content: &str) -> RepoResult<ThreadNode>;
}

#[async_trait]
pub trait ModerationRepo: Send + Sync {
    /// Marks the node deleted and clears its content. Idempotent.
    async fn soft_delete(&self, id: Id) -> RepoResult<ThreadNode>;
    async fn restore(&self, id: Id) -> RepoResult<ThreadNode>;
}

pub trait Repo: NodeRepo + ModerationRepo {}

impl<T> Repo for T where T: NodeRepo + ModerationRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use std::path::{Path, PathBuf};

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        nodes: HashMap<Id, StoredNode>,
        next_id: Id,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        /// Opens the snapshot in `dir`. A snapshot that exists but cannot be
        /// parsed is an error; starting empty would overwrite it on the next write.
        pub fn with_data_dir(dir: impl Into<PathBuf>) -> RepoResult<Self> {
            let snapshot_path = dir.into().join("state.json");
            let state = Self::load_state_from(&snapshot_path)?;
            Ok(Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            })
        }

        fn load_state_from(path: &Path) -> RepoResult<State> {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    tracing::info!(path = %path.display(), "no snapshot, starting empty");
                    return Ok(State::default());
                }
                Err(e) => {
                    return Err(RepoError::Internal(format!("read {}: {e}", path.display())));
                }
            };
            let state = serde_json::from_slice::<State>(&bytes).map_err(|e| {
                tracing::error!(path = %path.display(), error = %e, "unreadable snapshot");
                RepoError::Internal(format!("corrupt snapshot {}: {e}", path.display()))
            })?;
            tracing::info!(path = %path.display(), nodes = state.nodes.len(), "loaded snapshot");
            Ok(state)
        }

        /// Writes the snapshot through a temp file so a crash never leaves it truncated.
        /// Called with no lock held.
        fn persist(&self) -> RepoResult<()> {
            let bytes = {
                let s = self.read()?;
                serde_json::to_vec_pretty(&*s)
                    .map_err(|e| RepoError::Internal(format!("serialize snapshot: {e}")))?
            };
            let io_err = |e: std::io::Error| {
                tracing::error!(path = %self.snapshot_path.display(), error = %e, "failed to write snapshot");
                RepoError::Internal(format!("write {}: {e}", self.snapshot_path.display()))
            };
            if let Some(dir) = self.snapshot_path.parent() {
                std::fs::create_dir_all(dir).map_err(io_err)?;
            }
            let tmp = self.snapshot_path.with_extension("json.tmp");
            std::fs::write(&tmp, bytes).map_err(io_err)?;
            std::fs::rename(&tmp, &*self.snapshot_path).map_err(io_err)?;
            Ok(())
        }

        fn read(&self) -> RepoResult<std::sync::RwLockReadGuard<'_, State>> {
            self.state.read().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn write(&self) -> RepoResult<std::sync::RwLockWriteGuard<'_, State>> {
            self.state.write().map_err(|_| RepoError::Internal("state lock poisoned".into()))
        }

        fn next_id(state: &mut State) -> Id {
            state.next_id += 1;
            state.next_id
        }

        /// Apply `f` to a stored node, then persist. The change is undone
        /// when the snapshot cannot be written.
        fn mutate<F>(&self, id: Id, f: F) -> RepoResult<ThreadNode>
        where
            F: FnOnce(&mut ThreadNode) -> RepoResult<()>,
        {
            let mut s = self.write()?;
            let stored = s.nodes.get_mut(&id).ok_or(RepoError::NotFound)?;
            let before = stored.node.clone();
            f(&mut stored.node)?;
            let updated = stored.node.clone();
            drop(s);
            if let Err(e) = self.persist() {
                if let Some(stored) = self.write()?.nodes.get_mut(&id) {
                    stored.node = before;
                }
                return Err(e);
            }
            Ok(updated)
        }
    }

    #[async_trait]
    impl NodeRepo for InMemRepo {
        async fn list_nodes(&self, scope: ThreadScope) -> RepoResult<Vec<ThreadNode>> {
            let s = self.read()?;
            let mut v: Vec<_> = s.nodes
                .values()
                .filter(|n| n.scope == scope)
                .map(|n| n.node.clone())
                .collect();
            v.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            Ok(v)
        }

        async fn get_node(&self, id: Id) -> RepoResult<StoredNode> {
            let s = self.read()?;
            s.nodes.get(&id).cloned().ok_or(RepoError::NotFound)
        }

        async fn create_node(&self, scope: ThreadScope, new: NewNode, author: &Identity) -> RepoResult<ThreadNode> {
            let content = clean_content(&new.content)?.to_string();
            let mut s = self.write()?;
            if let Some(pid) = new.parent_id {
                let parent = s.nodes.get(&pid).ok_or(RepoError::Invalid("parent not found"))?;
                check_parent(scope, parent)?;
            }
            let id = Self::next_id(&mut s);
            let node = ThreadNode {
                id,
                parent_id: new.parent_id,
                content,
                author_id: author.user_id,
                author_name: author.name.clone(),
                created_at: Utc::now(),
                updated_at: None,
                deleted: false,
            };
            s.nodes.insert(id, StoredNode { scope, node: node.clone() });
            drop(s);                       // release lock before persisting
            if let Err(e) = self.persist() {
                self.write()?.nodes.remove(&id);
                return Err(e);
            }
            Ok(node)
        }

        async fn update_content(&self, id: Id, content: &str) -> RepoResult<ThreadNode> {
            let content = clean_content(content)?.to_string();
            self.mutate(id, |node| {
                if node.deleted {
                    return Err(RepoError::Gone);
                }
                node.content = content;
                node.updated_at = Some(Utc::now());
                Ok(())
            })
        }
    }

    #[async_trait]
    impl ModerationRepo for InMemRepo {
        async fn soft_delete(&self, id: Id) -> RepoResult<ThreadNode> {
            self.mutate(id, |node| {
                if !node.deleted {
                    node.deleted = true;
                    node.content.clear();
                    node.updated_at = Some(Utc::now());
                }
                Ok(())
            })
        }

        async fn restore(&self, id: Id) -> RepoResult<ThreadNode> {
            self.mutate(id, |node| {
                if node.deleted {
                    node.deleted = false;
                    node.updated_at = Some(Utc::now());
                }
                Ok(())
            })
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use chrono::{DateTime, Utc};
    use sqlx::{Pool, Postgres};

    const NODE_COLUMNS: &str =
        "id, parent_id, content, author_id, author_name, created_at, updated_at, deleted";

    impl From<sqlx::Error> for RepoError {
        fn from(e: sqlx::Error) -> Self {
            match e {
                sqlx::Error::RowNotFound => RepoError::NotFound,
                other => RepoError::Internal(other.to_string()),
            }
        }
    }

    #[derive(sqlx::FromRow)]
    struct StoredRow {
        kind: String,
        owner_id: Id,
        id: Id,
        parent_id: Option<Id>,
        content: String,
        author_id: Id,
        author_name: String,
        created_at: DateTime<Utc>,
        updated_at: Option<DateTime<Utc>>,
        deleted: bool,
    }

    impl TryFrom<StoredRow> for StoredNode {
        type Error = RepoError;
        fn try_from(r: StoredRow) -> RepoResult<Self> {
            let kind = match r.kind.as_str() {
                "comment" => ThreadKind::Comment,
                "article" => ThreadKind::Article,
                other => return Err(RepoError::Internal(format!("unknown thread kind '{other}'"))),
            };
            Ok(StoredNode {
                scope: ThreadScope { kind, owner_id: r.owner_id },
                node: ThreadNode {
                    id: r.id,
                    parent_id: r.parent_id,
                    content: r.content,
                    author_id: r.author_id,
                    author_name: r.author_name,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    deleted: r.deleted,
                },
            })
        }
    }

    #[derive(Clone)]
    pub struct PgRepo { pool: Pool<Postgres> }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self { Self { pool } }

        pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
            sqlx::migrate!("./migrations").run(&self.pool).await
        }

        async fn stored(&self, id: Id) -> RepoResult<StoredNode> {
            let row = sqlx::query_as::<_, StoredRow>(&format!(
                "SELECT kind, owner_id, {NODE_COLUMNS} FROM thread_nodes WHERE id = $1"
            ))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            row.try_into()
        }
    }

    #[async_trait]
    impl NodeRepo for PgRepo {
        async fn list_nodes(&self, scope: ThreadScope) -> RepoResult<Vec<ThreadNode>> {
            let recs = sqlx::query_as::<_, ThreadNode>(&format!(
                "SELECT {NODE_COLUMNS} FROM thread_nodes WHERE kind = $1 AND owner_id = $2 ORDER BY created_at ASC, id ASC"
            ))
            .bind(scope.kind.as_str())
            .bind(scope.owner_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(recs)
        }

        async fn get_node(&self, id: Id) -> RepoResult<StoredNode> {
            self.stored(id).await
        }

        async fn create_node(&self, scope: ThreadScope, new: NewNode, author: &Identity) -> RepoResult<ThreadNode> {
            let content = clean_content(&new.content)?;
            if let Some(pid) = new.parent_id {
                let parent = match self.stored(pid).await {
                    Err(RepoError::NotFound) => return Err(RepoError::Invalid("parent not found")),
                    other => other?,
                };
                check_parent(scope, &parent)?;
            }
            let rec = sqlx::query_as::<_, ThreadNode>(&format!(
                "INSERT INTO thread_nodes (kind, owner_id, parent_id, content, author_id, author_name) \
                 VALUES ($1,$2,$3,$4,$5,$6) RETURNING {NODE_COLUMNS}"
            ))
            .bind(scope.kind.as_str())
            .bind(scope.owner_id)
            .bind(new.parent_id)
            .bind(content)
            .bind(author.user_id)
            .bind(&author.name)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }

        async fn update_content(&self, id: Id, content: &str) -> RepoResult<ThreadNode> {
            let content = clean_content(content)?;
            let rec = sqlx::query_as::<_, ThreadNode>(&format!(
                "UPDATE thread_nodes SET content = $2, updated_at = now() \
                 WHERE id = $1 AND NOT deleted RETURNING {NODE_COLUMNS}"
            ))
            .bind(id)
            .bind(content)
            .fetch_optional(&self.pool)
            .await?;
            match rec {
                Some(node) => Ok(node),
                // distinguish a missing row from a deleted one
                None => match self.stored(id).await?.node.deleted {
                    true => Err(RepoError::Gone),
                    false => Err(RepoError::Internal("update matched no row".into())),
                },
            }
        }
    }

    #[async_trait]
    impl ModerationRepo for PgRepo {
        async fn soft_delete(&self, id: Id) -> RepoResult<ThreadNode> {
            let rec = sqlx::query_as::<_, ThreadNode>(&format!(
                "UPDATE thread_nodes SET deleted = TRUE, content = '', \
                 updated_at = CASE WHEN deleted THEN updated_at ELSE now() END \
                 WHERE id = $1 RETURNING {NODE_COLUMNS}"
            ))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }

        async fn restore(&self, id: Id) -> RepoResult<ThreadNode> {
            let rec = sqlx::query_as::<_, ThreadNode>(&format!(
                "UPDATE thread_nodes SET deleted = FALSE, \
                 updated_at = CASE WHEN deleted THEN now() ELSE updated_at END \
                 WHERE id = $1 RETURNING {NODE_COLUMNS}"
            ))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
            Ok(rec)
        }
    }
}
