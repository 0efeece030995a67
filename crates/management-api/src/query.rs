//! List query parameters: `offset`, `limit`, `filter`, `sort`, `sortField`.

use serde::Deserialize;
use spi::{Criterion, QuerySpec, SortOrder};

use crate::ApiError;

/// Query string of a list endpoint, e.g.
/// `?offset=0&limit=10&filter=id%3Dasset-1&sort=DESC&sortField=createdAt`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub filter: Option<String>,
    pub sort: Option<SortOrder>,
    pub sort_field: Option<String>,
}

impl ListParams {
    pub fn into_spec(self) -> Result<QuerySpec, ApiError> {
        let mut spec = QuerySpec {
            offset: self.offset.unwrap_or(0),
            limit: self.limit.unwrap_or(QuerySpec::DEFAULT_LIMIT),
            sort_field: self.sort_field.filter(|field| !field.trim().is_empty()),
            sort_order: self.sort.unwrap_or_default(),
            ..QuerySpec::default()
        };
        if let Some(filter) = self.filter.filter(|f| !f.trim().is_empty()) {
            spec.filter.push(Criterion::parse(&filter)?);
        }
        Ok(spec)
    }
}
