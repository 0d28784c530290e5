use crate::filter::{FilterSpec, FilterValue};

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// Converts a string slice to a `SortDirection`.
///
/// Case-insensitive; anything other than `"desc"` sorts ascending, which is how
/// the backend treats a missing `-` prefix.
///
/// # Examples
///
/// ```
/// use querito_core::SortDirection;
///
/// assert_eq!(SortDirection::from("DESC"), SortDirection::Desc);
/// assert_eq!(SortDirection::from("asc"), SortDirection::Asc);
/// assert_eq!(SortDirection::from(""), SortDirection::Asc);
/// ```
impl From<&str> for SortDirection {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }
}

/// Sort descriptor: `{sortBy, direction}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortSpec {
    pub sort_by: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(sort_by: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            sort_by: sort_by.into(),
            direction,
        }
    }

    pub fn asc(sort_by: impl Into<String>) -> Self {
        Self::new(sort_by, SortDirection::Asc)
    }

    pub fn desc(sort_by: impl Into<String>) -> Self {
        Self::new(sort_by, SortDirection::Desc)
    }

    /// Wire token placed inside `qs`: `sort:-field` or `sort:field`.
    pub fn token(&self) -> String {
        match self.direction {
            SortDirection::Desc => format!("sort:-{}", self.sort_by),
            SortDirection::Asc => format!("sort:{}", self.sort_by),
        }
    }
}

/// Filters plus optional sort and pagination for one list request.
///
/// # Examples
///
/// ```
/// use querito_core::{ListQuery, SortSpec};
///
/// let query = ListQuery::new()
///     .filter("rarity", "RARE")
///     .sort(SortSpec::desc("name"))
///     .page(2)
///     .limit(20);
///
/// assert_eq!(query.page, Some(2));
/// assert_eq!(query.limit, Some(20));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filters: FilterSpec,
    pub sort: Option<SortSpec>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filters(filters: FilterSpec) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field, value);
        self
    }

    pub fn sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Field name that resources with a `search_field` rewrite into a `like` filter.
pub const SEARCH_FIELD: &str = "search";

/// A backend list resource: its cache-key prefix and its transport path.
///
/// `name` doubles as the invalidation topic, so a mutation against `path` can
/// invalidate every cached page of the list regardless of filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDef {
    pub name: String,
    pub path: String,
    pub search_field: Option<String>,
}

impl ResourceDef {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            search_field: None,
        }
    }

    /// Maps the free-text `search` filter onto `field:like=...`.
    pub fn with_search_field(mut self, field: impl Into<String>) -> Self {
        self.search_field = Some(field.into());
        self
    }

    /// Applies the resource's field rewrites to a query.
    pub(crate) fn rewrite(&self, query: &ListQuery) -> ListQuery {
        let Some(target) = &self.search_field else {
            return query.clone();
        };
        let mut rewritten = query.clone();
        if let Some(FilterValue::Eq(term)) = rewritten.filters.remove(SEARCH_FIELD) {
            rewritten.filters.insert(target.clone(), FilterValue::Like(term));
        } else if let Some(other) = query.filters.get(SEARCH_FIELD) {
            rewritten.filters.insert(SEARCH_FIELD, other.clone());
        }
        rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Scalar;

    #[test]
    fn test_sort_tokens() {
        assert_eq!(SortSpec::desc("createdAt").token(), "sort:-createdAt");
        assert_eq!(SortSpec::asc("createdAt").token(), "sort:createdAt");
    }

    #[test]
    fn test_search_rewrite() {
        let pokemon = ResourceDef::new("pokemon-list", "/pokemon").with_search_field("name");
        let query = ListQuery::new().filter("search", "pika").filter("rarity", "RARE");
        let rewritten = pokemon.rewrite(&query);

        assert_eq!(rewritten.filters.get("search"), None);
        assert_eq!(
            rewritten.filters.get("name"),
            Some(&FilterValue::Like(Scalar::Text("pika".into())))
        );
        assert_eq!(rewritten.filters.get("rarity"), query.filters.get("rarity"));
    }

    #[test]
    fn test_search_rewrite_leaves_operator_filters_alone() {
        let pokemon = ResourceDef::new("pokemon-list", "/pokemon").with_search_field("name");
        let query = ListQuery::new().filter("search", FilterValue::Unset);
        assert_eq!(pokemon.rewrite(&query), query);
    }

    #[test]
    fn test_no_search_field_is_identity() {
        let reward = ResourceDef::new("reward-list", "/reward");
        let query = ListQuery::new().filter("search", "gold");
        assert_eq!(reward.rewrite(&query), query);
    }
}
