//! Select queries against the remote data API.

use std::fmt;

/// Comparison operator for a column filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Is,
}

impl FilterOp {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Is => "is",
        }
    }
}

/// `column <op> value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: String,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl fmt::Display) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.to_string(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl fmt::Display) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    /// Render as `op.value`, the right-hand side of a query parameter.
    fn operand(&self) -> String {
        format!("{}.{}", self.op.as_str(), self.value)
    }
}

/// A top-level condition: a single filter, or a disjunction of filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Filter(Filter),
    Or(Vec<Filter>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A read against one table: columns, conditions (AND-ed), ordering, limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub table: String,
    pub columns: String,
    pub conditions: Vec<Condition>,
    pub order: Vec<Order>,
    pub limit: Option<usize>,
}

impl Query {
    /// Start a `select *` on `table`.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            conditions: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Column list, including embedded relations such as `*, subtasks (*)`.
    #[must_use]
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.conditions.push(Condition::Filter(filter));
        self
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filter(Filter::eq(column, value))
    }

    #[must_use]
    pub fn gte(self, column: impl Into<String>, value: impl fmt::Display) -> Self {
        self.filter(Filter::new(column, FilterOp::Gte, value))
    }

    #[must_use]
    pub fn or(mut self, filters: Vec<Filter>) -> Self {
        self.conditions.push(Condition::Or(filters));
        self
    }

    #[must_use]
    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(Order {
            column: column.into(),
            ascending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string parameters in `PostgREST` syntax.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), compact_columns(&self.columns))];

        for condition in &self.conditions {
            match condition {
                Condition::Filter(filter) => {
                    params.push((filter.column.clone(), filter.operand()));
                }
                Condition::Or(filters) => {
                    let inner = filters
                        .iter()
                        .map(|filter| format!("{}.{}", filter.column, filter.operand()))
                        .collect::<Vec<_>>()
                        .join(",");
                    params.push(("or".to_string(), format!("({inner})")));
                }
            }
        }

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|order| {
                    let direction = if order.ascending { "asc" } else { "desc" };
                    format!("{}.{direction}", order.column)
                })
                .collect::<Vec<_>>()
                .join(",");
            params.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }

        params
    }
}

/// `PostgREST` rejects whitespace inside the select list.
fn compact_columns(columns: &str) -> String {
    columns.chars().filter(|ch| !ch.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    #[test]
    fn renders_filters_order_and_limit() {
        let query = Query::table("messages")
            .select("*, sender:users!sender_id (*)")
            .or(vec![
                Filter::eq("recipient_id", "u1"),
                Filter::eq("location_id", "loc-1"),
            ])
            .eq("is_read", false)
            .order("created_at", false)
            .limit(50);

        assert_eq!(
            pairs(&query.to_params()),
            vec![
                ("select", "*,sender:users!sender_id(*)"),
                ("or", "(recipient_id.eq.u1,location_id.eq.loc-1)"),
                ("is_read", "eq.false"),
                ("order", "created_at.desc"),
                ("limit", "50"),
            ]
        );
    }

    #[test]
    fn bare_query_selects_everything() {
        let params = Query::table("shifts").to_params();
        assert_eq!(pairs(&params), vec![("select", "*")]);
    }
}
