//! Abstract query descriptions and the SQL dialect that renders them.
//!
//! Daos build [`Query`] values through the fluent constructors here; nothing
//! in this module performs I/O. Rendering assigns placeholder numbers in
//! traversal order, so the same description always yields the same SQL text
//! and the same parameter order.

use super::value::Value;

/// SQL renderer configured with a named-parameter prefix (`$` for Postgres).
#[derive(Debug, Clone)]
pub struct Dialect {
    prefix: &'static str,
}

impl Default for Dialect {
    fn default() -> Self {
        Self { prefix: "$" }
    }
}

impl Dialect {
    pub fn with_prefix(prefix: &'static str) -> Self {
        Self { prefix }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    pub fn render(&self, query: Query) -> Rendered {
        let mut r = Renderer {
            prefix: self.prefix,
            sql: String::new(),
            params: Vec::new(),
        };
        r.query(query);
        Rendered {
            sql: r.sql,
            params: r.params,
        }
    }
}

/// Rendered SQL plus its bind values in placeholder order. Array-typed
/// parameters still carry their cast suffix in `sql`; stripping that is the
/// extractor's job.
#[derive(Debug)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug)]
pub enum Query {
    Select(Select),
    Insert(Insert),
    Delete(Delete),
}

#[derive(Debug, Default)]
pub struct Select {
    from: &'static str,
    columns: Vec<&'static str>,
    joins: Vec<Join>,
    filter: Vec<Predicate>,
}

#[derive(Debug)]
pub struct Join {
    table: &'static str,
    on: Vec<JoinCond>,
}

#[derive(Debug)]
pub enum JoinCond {
    /// `left = right`, both column references.
    Columns(&'static str, &'static str),
    /// `column = <bind>`.
    Bound(&'static str, Value),
}

#[derive(Debug)]
pub enum Predicate {
    /// `column = <bind>`.
    Eq(&'static str, Value),
    /// `column = any(<bind>)`, for array-typed binds.
    AnyOf(&'static str, Value),
    /// `not exists (<subquery>)`, correlated through bound values.
    NotExists(Select),
}

impl Predicate {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Self::Eq(column, value.into())
    }

    pub fn any_of(column: &'static str, value: impl Into<Value>) -> Self {
        Self::AnyOf(column, value.into())
    }

    pub fn not_exists(subquery: Select) -> Self {
        Self::NotExists(subquery)
    }
}

impl Select {
    /// Selects every column of `from`; narrow with [`Select::column`].
    pub fn from(from: &'static str) -> Self {
        Self {
            from,
            ..Self::default()
        }
    }

    pub fn column(mut self, column: &'static str) -> Self {
        self.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: &[&'static str]) -> Self {
        self.columns.extend_from_slice(columns);
        self
    }

    pub fn join(mut self, table: &'static str, on: Vec<JoinCond>) -> Self {
        self.joins.push(Join { table, on });
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.push(predicate);
        self
    }

    pub fn build(self) -> Query {
        Query::Select(self)
    }
}

#[derive(Debug)]
pub struct Insert {
    table: &'static str,
    columns: Vec<&'static str>,
    values: Vec<Value>,
    on_conflict: Option<OnConflict>,
    returning: Vec<&'static str>,
}

#[derive(Debug)]
pub struct OnConflict {
    target: &'static str,
    update: Vec<(&'static str, Value)>,
}

impl Insert {
    pub fn into(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
            on_conflict: None,
            returning: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    /// `on conflict (target) do update set column = value, ...`
    pub fn on_conflict_update(
        mut self,
        target: &'static str,
        update: Vec<(&'static str, Value)>,
    ) -> Self {
        self.on_conflict = Some(OnConflict { target, update });
        self
    }

    pub fn returning(mut self, column: &'static str) -> Self {
        self.returning.push(column);
        self
    }

    pub fn build(self) -> Query {
        Query::Insert(self)
    }
}

#[derive(Debug)]
pub struct Delete {
    table: &'static str,
    filter: Vec<Predicate>,
    returning: Vec<&'static str>,
}

impl Delete {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            filter: Vec::new(),
            returning: Vec::new(),
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.push(predicate);
        self
    }

    pub fn returning(mut self, column: &'static str) -> Self {
        self.returning.push(column);
        self
    }

    pub fn build(self) -> Query {
        Query::Delete(self)
    }
}

struct Renderer {
    prefix: &'static str,
    sql: String,
    params: Vec<Value>,
}

impl Renderer {
    fn query(&mut self, query: Query) {
        match query {
            Query::Select(s) => self.select(s),
            Query::Insert(i) => self.insert(i),
            Query::Delete(d) => self.delete(d),
        }
    }

    fn bind(&mut self, value: Value) {
        let cast = value.array_cast();
        self.params.push(value);
        let n = self.params.len();
        match cast {
            Some(cast) => self
                .sql
                .push_str(&format!("{}{}::{}[]", self.prefix, n, cast)),
            None => self.sql.push_str(&format!("{}{}", self.prefix, n)),
        }
    }

    fn select(&mut self, select: Select) {
        self.sql.push_str("select ");
        if select.columns.is_empty() {
            self.sql.push('*');
        } else {
            self.sql.push_str(&select.columns.join(", "));
        }
        self.sql.push_str(" from ");
        self.sql.push_str(select.from);
        for join in select.joins {
            self.sql.push_str(" join ");
            self.sql.push_str(join.table);
            self.sql.push_str(" on ");
            for (i, cond) in join.on.into_iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(" and ");
                }
                match cond {
                    JoinCond::Columns(left, right) => {
                        self.sql.push_str(left);
                        self.sql.push_str(" = ");
                        self.sql.push_str(right);
                    }
                    JoinCond::Bound(column, value) => {
                        self.sql.push_str(column);
                        self.sql.push_str(" = ");
                        self.bind(value);
                    }
                }
            }
        }
        self.predicates(select.filter);
    }

    fn predicates(&mut self, filter: Vec<Predicate>) {
        for (i, predicate) in filter.into_iter().enumerate() {
            self.sql.push_str(if i == 0 { " where " } else { " and " });
            match predicate {
                Predicate::Eq(column, value) => {
                    self.sql.push_str(column);
                    self.sql.push_str(" = ");
                    self.bind(value);
                }
                Predicate::AnyOf(column, value) => {
                    self.sql.push_str(column);
                    self.sql.push_str(" = any(");
                    self.bind(value);
                    self.sql.push(')');
                }
                Predicate::NotExists(subquery) => {
                    self.sql.push_str("not exists (");
                    self.select(subquery);
                    self.sql.push(')');
                }
            }
        }
    }

    fn insert(&mut self, insert: Insert) {
        self.sql.push_str("insert into ");
        self.sql.push_str(insert.table);
        self.sql.push_str(" (");
        self.sql.push_str(&insert.columns.join(", "));
        self.sql.push_str(") values (");
        for (i, value) in insert.values.into_iter().enumerate() {
            if i > 0 {
                self.sql.push_str(", ");
            }
            self.bind(value);
        }
        self.sql.push(')');
        if let Some(conflict) = insert.on_conflict {
            self.sql.push_str(" on conflict (");
            self.sql.push_str(conflict.target);
            self.sql.push_str(") do update set ");
            for (i, (column, value)) in conflict.update.into_iter().enumerate() {
                if i > 0 {
                    self.sql.push_str(", ");
                }
                self.sql.push_str(column);
                self.sql.push_str(" = ");
                self.bind(value);
            }
        }
        self.returning(&insert.returning);
    }

    fn delete(&mut self, delete: Delete) {
        self.sql.push_str("delete from ");
        self.sql.push_str(delete.table);
        self.predicates(delete.filter);
        self.returning(&delete.returning);
    }

    fn returning(&mut self, columns: &[&'static str]) {
        if !columns.is_empty() {
            self.sql.push_str(" returning ");
            self.sql.push_str(&columns.join(", "));
        }
    }
}
