//! Encoded query building
//!
//! Produces the `sysparm_query` strings understood by the Table API, e.g.
//! `active=true^priority<=2^ORpriority=5^ORDERBYsys_id`.

/// An `^OR` clause hanging off a [`QueryCondition`]
#[derive(Debug, Clone, PartialEq)]
pub struct OrCondition {
    name: String,
    operator: String,
    value: String,
}

impl OrCondition {
    fn new(name: &str, operator: &str, value: Option<&str>) -> Self {
        let (operator, value) = split_operator(operator, value);
        Self { name: name.to_string(), operator, value }
    }

    pub fn generate(&self) -> String {
        format!("OR{}{}{}", self.name, self.operator, self.value)
    }
}

/// A single `name{op}value` condition plus any OR alternatives
#[derive(Debug, Clone, PartialEq)]
pub struct QueryCondition {
    name: String,
    operator: String,
    value: String,
    or_conditions: Vec<OrCondition>,
}

impl QueryCondition {
    /// `value` absent means `operator` is the value and the operator is `=`
    pub fn new(name: &str, operator: &str, value: Option<&str>) -> Self {
        let (operator, value) = split_operator(operator, value);
        Self {
            name: name.to_string(),
            operator,
            value,
            or_conditions: Vec::new(),
        }
    }

    pub fn add_or_condition(&mut self, name: &str, operator: &str, value: Option<&str>) -> &mut Self {
        self.or_conditions.push(OrCondition::new(name, operator, value));
        self
    }

    pub fn generate(&self) -> String {
        let mut query = format!("{}{}{}", self.name, self.operator, self.value);
        for or in &self.or_conditions {
            query.push('^');
            query.push_str(&or.generate());
        }
        query
    }
}

// An empty value behaves like a missing one, matching `add_query('x', '')`.
fn split_operator(operator: &str, value: Option<&str>) -> (String, String) {
    match value {
        Some(v) if !v.is_empty() => (operator.to_string(), v.to_string()),
        _ => ("=".to_string(), operator.to_string()),
    }
}

/// A set of conditions against one table, with optional join sub-queries
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    table: Option<String>,
    conditions: Vec<QueryCondition>,
    joins: Vec<JoinQuery>,
}

impl Query {
    pub fn new(table: Option<&str>) -> Self {
        Self {
            table: table.map(|t| t.to_string()),
            ..Self::default()
        }
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.joins.is_empty()
    }

    pub fn add_query(&mut self, name: &str, operator: &str, value: Option<&str>) -> &mut QueryCondition {
        self.conditions.push(QueryCondition::new(name, operator, value));
        let last = self.conditions.len() - 1;
        &mut self.conditions[last]
    }

    pub fn add_active_query(&mut self) -> &mut QueryCondition {
        self.add_query("active", "true", None)
    }

    pub fn add_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.add_query(field, "", Some("ISEMPTY"))
    }

    pub fn add_not_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.add_query(field, "", Some("ISNOTEMPTY"))
    }

    /// Joins against `join_table`. Fields default to `sys_id` on both sides.
    ///
    /// Returns `None` when this query was built without a table name, as the
    /// join clause needs one.
    pub fn add_join_query(
        &mut self,
        join_table: &str,
        primary_field: Option<&str>,
        join_table_field: Option<&str>,
    ) -> Option<&mut JoinQuery> {
        let table = self.table.clone()?;
        self.joins.push(JoinQuery::new(&table, join_table, primary_field, join_table_field));
        self.joins.last_mut()
    }

    pub fn generate_query(&self, encoded_query: Option<&str>, order_by: Option<&str>) -> String {
        let mut query = self
            .conditions
            .iter()
            .map(|c| c.generate())
            .collect::<Vec<_>>()
            .join("^");

        for join in &self.joins {
            // A join with nothing before it is the whole query.
            if query.is_empty() {
                return join.generate_query(None, None);
            }
            query = format!("{}^{}", query, join.generate_query(None, None));
        }

        for part in [encoded_query, order_by].into_iter().flatten() {
            if part.is_empty() {
                continue;
            }
            if !query.is_empty() {
                query.push('^');
            }
            query.push_str(part);
        }

        query
    }
}

/// `JOIN{table}.{field}={join_table}.{field}!{conditions}`
#[derive(Debug, Clone, PartialEq)]
pub struct JoinQuery {
    query: Query,
    join_table: String,
    primary_field: Option<String>,
    join_table_field: Option<String>,
}

impl JoinQuery {
    fn new(table: &str, join_table: &str, primary_field: Option<&str>, join_table_field: Option<&str>) -> Self {
        Self {
            query: Query::new(Some(table)),
            join_table: join_table.to_string(),
            primary_field: primary_field.map(|s| s.to_string()),
            join_table_field: join_table_field.map(|s| s.to_string()),
        }
    }

    pub fn add_query(&mut self, name: &str, operator: &str, value: Option<&str>) -> &mut QueryCondition {
        self.query.add_query(name, operator, value)
    }

    pub fn add_active_query(&mut self) -> &mut QueryCondition {
        self.query.add_active_query()
    }

    pub fn add_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.query.add_null_query(field)
    }

    pub fn add_not_null_query(&mut self, field: &str) -> &mut QueryCondition {
        self.query.add_not_null_query(field)
    }

    pub fn generate_query(&self, encoded_query: Option<&str>, order_by: Option<&str>) -> String {
        let inner = self.query.generate_query(encoded_query, order_by);
        format!(
            "JOIN{table}.{primary}={j_table}.{secondary}!{inner}",
            table = self.query.table().unwrap_or_default(),
            primary = self.primary_field.as_deref().unwrap_or("sys_id"),
            j_table = self.join_table,
            secondary = self.join_table_field.as_deref().unwrap_or("sys_id"),
            inner = inner,
        )
    }
}
