use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::models::{Identity, ThreadNode};
use crate::policy::{self, DisplayNode};
use crate::store::NodeStore;
use crate::tree;

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

/// Snapshot → tree → soft-delete rules, for one viewer.
pub fn build(store: &NodeStore, viewer: Option<&Identity>) -> Vec<DisplayNode> {
    policy::apply(tree::assemble(store), viewer)
}

/// Convenience for callers holding a freshly fetched flat list.
pub fn build_from(nodes: Vec<ThreadNode>, viewer: Option<&Identity>) -> Vec<DisplayNode> {
    build(&NodeStore::from_nodes(nodes), viewer)
}

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

impl PageParams {
    fn resolve(self) -> (usize, usize) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadPage {
    pub items: Vec<DisplayNode>,
    /// Displayed roots across all pages.
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
}

/// Page over displayed roots; excluded roots never take a slot.
pub fn paginate(roots: Vec<DisplayNode>, params: PageParams) -> ThreadPage {
    let (page, per_page) = params.resolve();
    let total = roots.len();
    let items = roots
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();
    ThreadPage { items, total, page, per_page }
}
