// ── Store query grammar ──
//
// Filters, ordering, and limits rendered as the backend's query
// parameters: `field=eq.value`, `order=created_at.desc`, `limit=10`.
// A Filter is always a conjunction; the store has richer operators but
// these four are the only ones the application uses.

use std::fmt;

/// Sort direction for [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering on a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Descending,
        }
    }

    fn render(&self) -> String {
        let dir = match self.direction {
            Direction::Ascending => "asc",
            Direction::Descending => "desc",
        };
        format!("{}.{dir}", self.field)
    }
}

/// A single comparison against one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `field = value`
    Eq { field: String, value: String },
    /// `field != value`
    Neq { field: String, value: String },
    /// Case-insensitive pattern match; `%` is the wildcard.
    Ilike { field: String, pattern: String },
    /// `field` is one of the given values.
    In { field: String, values: Vec<String> },
}

impl Predicate {
    /// Field name this predicate constrains.
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. }
            | Self::Neq { field, .. }
            | Self::Ilike { field, .. }
            | Self::In { field, .. } => field,
        }
    }

    /// Render as a `(field, operator.value)` query parameter pair.
    pub fn to_param(&self) -> (String, String) {
        match self {
            Self::Eq { field, value } => (field.clone(), format!("eq.{value}")),
            Self::Neq { field, value } => (field.clone(), format!("neq.{value}")),
            Self::Ilike { field, pattern } => (field.clone(), format!("ilike.{pattern}")),
            Self::In { field, values } => (field.clone(), format!("in.({})", values.join(","))),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (field, rest) = self.to_param();
        write!(f, "{field}={rest}")
    }
}

/// A conjunction of predicates. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn neq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Neq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn ilike(mut self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Ilike {
            field: field.into(),
            pattern: pattern.into(),
        });
        self
    }

    pub fn any_of<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predicates.push(Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

/// A complete read query: filter + projection + order + limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub select: Option<String>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Project only the given columns (comma-separated). Defaults to `*`.
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.select = Some(columns.into());
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Render the full parameter list for a GET against a resource.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();

        params.push((
            "select".to_owned(),
            self.select.clone().unwrap_or_else(|| "*".to_owned()),
        ));

        for predicate in self.filter.predicates() {
            params.push(predicate.to_param());
        }

        if let Some(ref order) = self.order {
            params.push(("order".to_owned(), order.render()));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_owned(), limit.to_string()));
        }

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_renders_all_operators() {
        let filter = Filter::new()
            .eq("status", "completed")
            .neq("id", "user-1")
            .ilike("name", "%alex%")
            .any_of("requester_id", ["user-1", "user-2"]);

        let params: Vec<_> = filter.predicates().iter().map(Predicate::to_param).collect();
        assert_eq!(
            params,
            vec![
                ("status".to_owned(), "eq.completed".to_owned()),
                ("id".to_owned(), "neq.user-1".to_owned()),
                ("name".to_owned(), "ilike.%alex%".to_owned()),
                ("requester_id".to_owned(), "in.(user-1,user-2)".to_owned()),
            ]
        );
    }

    #[test]
    fn query_renders_order_and_limit() {
        let query = Query::new()
            .filter(Filter::new().eq("user_id", "u1"))
            .order(Order::desc("created_at"))
            .limit(10);

        assert_eq!(
            query.to_params(),
            vec![
                ("select".to_owned(), "*".to_owned()),
                ("user_id".to_owned(), "eq.u1".to_owned()),
                ("order".to_owned(), "created_at.desc".to_owned()),
                ("limit".to_owned(), "10".to_owned()),
            ]
        );
    }

    #[test]
    fn query_projection_overrides_default_select() {
        let query = Query::new().select("opportunity_id");
        assert_eq!(
            query.to_params(),
            vec![("select".to_owned(), "opportunity_id".to_owned())]
        );
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().is_empty());
        assert!(!Filter::new().eq("a", "b").is_empty());
    }
}
