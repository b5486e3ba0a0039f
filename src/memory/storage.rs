use std::cmp::Ordering;
use std::collections::HashMap;

use crate::core::{DbError, Result, Row, Value};
use crate::result::{ExecResult, QueryResult};

use super::eval::EvalContext;
use super::parser::{Expr, OrderBy, Projection, Statement};

/// Declaration of an in-memory table.
///
/// Columns are untyped; any [`Value`] can be stored in any column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<String>,
    auto_increment: Option<usize>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            auto_increment: None,
        }
    }

    pub fn column(mut self, name: &str) -> Self {
        self.columns.push(name.to_string());
        self
    }

    pub fn columns<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        self.columns.extend(names.into_iter().map(str::to_string));
        self
    }

    /// Adds an integer column that is assigned the next id whenever an
    /// insert leaves it out or gives it `NULL`/`DEFAULT`.
    pub fn auto_increment(mut self, name: &str) -> Self {
        self.auto_increment = Some(self.columns.len());
        self.columns.push(name.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| DbError::ColumnNotFound(name.to_string(), self.name.clone()))
    }
}

#[derive(Debug, Clone)]
struct Table {
    def: TableDef,
    rows: Vec<Row>,
    next_id: i64,
}

impl Table {
    fn context<'a>(&'a self, row: &'a [Value], params: &'a [Value]) -> EvalContext<'a> {
        EvalContext {
            columns: &self.def.columns,
            row,
            params,
            table: &self.def.name,
        }
    }
}

/// Result of running one statement.
#[derive(Debug, Default)]
pub struct Outcome {
    pub exec: ExecResult,
    pub rows: QueryResult,
}

/// Every table of one in-memory database. Cloned to give a transaction its
/// working copy.
#[derive(Debug, Clone, Default)]
pub struct Store {
    tables: HashMap<String, Table>,
}

impl Store {
    pub fn create_table(&mut self, def: TableDef) -> Result<()> {
        let key = def.name.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return Err(DbError::ExecutionError(format!(
                "table '{}' already exists",
                def.name
            )));
        }
        if def.columns.is_empty() {
            return Err(DbError::ExecutionError(format!(
                "table '{}' has no columns",
                def.name
            )));
        }
        self.tables.insert(
            key,
            Table {
                def,
                rows: Vec::new(),
                next_id: 1,
            },
        );
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(&name.to_ascii_lowercase())
            .map(|_| ())
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        Ok(self.table(name)?.rows.len())
    }

    fn table(&self, name: &str) -> Result<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table> {
        self.tables
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn run(&mut self, stmt: &Statement, params: &[Value]) -> Result<Outcome> {
        match stmt {
            Statement::Insert {
                table,
                columns,
                rows,
                returning,
            } => self.insert(table, columns, rows, returning, params),
            Statement::Update {
                table,
                assignments,
                selection,
            } => self.update(table, assignments, selection.as_ref(), params),
            Statement::Delete { table, selection } => self.delete(table, selection.as_ref(), params),
            Statement::Select { .. } => self.select(stmt, params),
        }
    }

    fn insert(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<Expr>],
        returning: &[Projection],
        params: &[Value],
    ) -> Result<Outcome> {
        let table = self.table_mut(table)?;

        let targets = if columns.is_empty() {
            (0..table.def.columns.len()).collect::<Vec<_>>()
        } else {
            columns
                .iter()
                .map(|c| table.def.column_index(c))
                .collect::<Result<Vec<_>>>()?
        };

        let mut inserted: Vec<Row> = Vec::with_capacity(rows.len());
        let mut last_insert_id = None;

        for exprs in rows {
            if exprs.len() != targets.len() {
                return Err(DbError::ExecutionError(format!(
                    "INSERT into '{}' has {} columns but {} values",
                    table.def.name,
                    targets.len(),
                    exprs.len()
                )));
            }

            let mut row = vec![Value::Null; table.def.columns.len()];
            for (&idx, expr) in targets.iter().zip(exprs) {
                if !matches!(expr, Expr::Default) {
                    row[idx] = table.context(&[], params).evaluate(expr)?;
                }
            }

            if let Some(idx) = table.def.auto_increment {
                let id = match row[idx].clone() {
                    Value::Null => {
                        let id = table.next_id;
                        row[idx] = Value::Integer(id);
                        id
                    }
                    Value::Integer(id) => id,
                    other => {
                        return Err(DbError::TypeMismatch(format!(
                            "auto-increment column '{}' cannot hold {}",
                            table.def.columns[idx],
                            other.type_name()
                        )))
                    }
                };
                if table.rows.iter().chain(&inserted).any(|r| r[idx] == Value::Integer(id)) {
                    return Err(DbError::ExecutionError(format!(
                        "duplicate key {} in table '{}'",
                        id, table.def.name
                    )));
                }
                table.next_id = table.next_id.max(id.saturating_add(1));
                last_insert_id = Some(id);
            }

            inserted.push(row);
        }

        let count = inserted.len() as u64;
        let returned = if returning.is_empty() {
            QueryResult::empty()
        } else {
            project(table, returning, &inserted, params)?
        };
        table.rows.extend(inserted);

        let exec = match last_insert_id {
            Some(id) => ExecResult::affected(count).with_last_insert_id(id),
            None => ExecResult::affected(count),
        };
        Ok(Outcome {
            exec,
            rows: returned,
        })
    }

    fn update(
        &mut self,
        table: &str,
        assignments: &[(String, Expr)],
        selection: Option<&Expr>,
        params: &[Value],
    ) -> Result<Outcome> {
        let table = self.table_mut(table)?;

        let targets = assignments
            .iter()
            .map(|(column, expr)| Ok((table.def.column_index(column)?, expr)))
            .collect::<Result<Vec<_>>>()?;

        // every assignment is evaluated before the first row changes
        let mut changes = Vec::new();
        for (pos, row) in table.rows.iter().enumerate() {
            let ctx = table.context(row, params);
            if !ctx.matches(selection)? {
                continue;
            }
            let mut updated = row.clone();
            for (idx, expr) in &targets {
                updated[*idx] = ctx.evaluate(expr)?;
            }
            changes.push((pos, updated));
        }

        let count = changes.len() as u64;
        for (pos, row) in changes {
            table.rows[pos] = row;
        }

        Ok(Outcome {
            exec: ExecResult::affected(count),
            rows: QueryResult::empty(),
        })
    }

    fn delete(&mut self, table: &str, selection: Option<&Expr>, params: &[Value]) -> Result<Outcome> {
        let table = self.table_mut(table)?;

        let mut keep = Vec::with_capacity(table.rows.len());
        for row in &table.rows {
            keep.push(!table.context(row, params).matches(selection)?);
        }

        let before = table.rows.len();
        let mut flags = keep.into_iter();
        table.rows.retain(|_| flags.next().unwrap_or(true));
        let count = (before - table.rows.len()) as u64;

        Ok(Outcome {
            exec: ExecResult::affected(count),
            rows: QueryResult::empty(),
        })
    }

    pub fn select(&self, stmt: &Statement, params: &[Value]) -> Result<Outcome> {
        let Statement::Select {
            table,
            projection,
            selection,
            order_by,
            limit,
        } = stmt
        else {
            return Err(DbError::ExecutionError("expected a SELECT".into()));
        };

        let Some(table) = table else {
            return Ok(Outcome {
                exec: ExecResult::default(),
                rows: project_constant(projection, params)?,
            });
        };
        let table = self.table(table)?;

        let mut matched = Vec::new();
        for row in &table.rows {
            if table.context(row, params).matches(selection.as_ref())? {
                matched.push(row.clone());
            }
        }

        if !order_by.is_empty() {
            sort_rows(table, &mut matched, order_by, params)?;
        }
        if let Some(limit) = limit {
            matched.truncate(*limit);
        }

        Ok(Outcome {
            exec: ExecResult::default(),
            rows: project(table, projection, &matched, params)?,
        })
    }
}

fn sort_rows(table: &Table, rows: &mut Vec<Row>, order_by: &[OrderBy], params: &[Value]) -> Result<()> {
    let mut keyed = rows
        .drain(..)
        .map(|row| {
            let keys = order_by
                .iter()
                .map(|o| table.context(&row, params).evaluate(&o.expr))
                .collect::<Result<Vec<_>>>()?;
            Ok((keys, row))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut failure = None;
    keyed.sort_by(|(a, _), (b, _)| {
        for ((x, y), o) in a.iter().zip(b).zip(order_by) {
            let ord = match x.compare(y) {
                Ok(ord) => ord,
                Err(err) => {
                    failure.get_or_insert(err);
                    Ordering::Equal
                }
            };
            let ord = if o.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    if let Some(err) = failure {
        return Err(err);
    }
    rows.extend(keyed.into_iter().map(|(_, row)| row));
    Ok(())
}

fn project(table: &Table, projection: &[Projection], rows: &[Row], params: &[Value]) -> Result<QueryResult> {
    let mut columns = Vec::new();
    for item in projection {
        match item {
            Projection::Wildcard => columns.extend(table.def.columns.iter().cloned()),
            Projection::Expr { name, .. } => columns.push(name.clone()),
        }
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let ctx = table.context(row, params);
        let mut values = Vec::with_capacity(columns.len());
        for item in projection {
            match item {
                Projection::Wildcard => values.extend(row.iter().cloned()),
                Projection::Expr { expr, .. } => values.push(ctx.evaluate(expr)?),
            }
        }
        out.push(values);
    }

    Ok(QueryResult::new(columns, out))
}

fn project_constant(projection: &[Projection], params: &[Value]) -> Result<QueryResult> {
    let ctx = EvalContext {
        columns: &[],
        row: &[],
        params,
        table: "",
    };

    let mut columns = Vec::with_capacity(projection.len());
    let mut row = Vec::with_capacity(projection.len());
    for item in projection {
        match item {
            Projection::Wildcard => {
                return Err(DbError::ExecutionError("SELECT * needs a table".into()))
            }
            Projection::Expr { expr, name } => {
                columns.push(name.clone());
                row.push(ctx.evaluate(expr)?);
            }
        }
    }

    Ok(QueryResult::new(columns, vec![row]))
}
