use sqlparser::ast as sql_ast;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::core::{DbError, Result, Value};

/// Statements the in-memory driver understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert {
        table: String,
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
        returning: Vec<Projection>,
    },
    Update {
        table: String,
        assignments: Vec<(String, Expr)>,
        selection: Option<Expr>,
    },
    Delete {
        table: String,
        selection: Option<Expr>,
    },
    Select {
        table: Option<String>,
        projection: Vec<Projection>,
        selection: Option<Expr>,
        order_by: Vec<OrderBy>,
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Wildcard,
    Expr { expr: Expr, name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    /// Zero-based bind argument.
    Param(usize),
    /// `DEFAULT` in a values list.
    Default,
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
}

/// Parses one statement, numbering `?` placeholders in the order they
/// appear. `$n` placeholders keep their explicit position.
pub fn parse(sql: &str) -> Result<Statement> {
    let mut statements = Parser::parse_sql(&GenericDialect {}, sql)
        .map_err(|e| DbError::ParseError(e.to_string()))?;

    if statements.len() != 1 {
        return Err(DbError::ParseError(format!(
            "expected exactly one statement, found {}",
            statements.len()
        )));
    }

    let mut converter = Converter::default();
    match statements.remove(0) {
        sql_ast::Statement::Insert(insert) => converter.insert(insert),
        sql_ast::Statement::Update {
            table,
            assignments,
            selection,
            ..
        } => converter.update(table, assignments, selection),
        sql_ast::Statement::Delete(delete) => converter.delete(delete),
        sql_ast::Statement::Query(query) => converter.query(*query),
        other => Err(DbError::UnsupportedOperation(format!(
            "statement not supported: {}",
            other
        ))),
    }
}

#[derive(Default)]
struct Converter {
    next_param: usize,
}

impl Converter {
    fn insert(&mut self, insert: sql_ast::Insert) -> Result<Statement> {
        let table = match &insert.table {
            sql_ast::TableObject::TableName(name) => object_name(name)?,
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "cannot insert into {:?}",
                    other
                )))
            }
        };

        let columns = insert.columns.into_iter().map(|id| id.value).collect();

        let Some(source) = insert.source else {
            return Err(DbError::UnsupportedOperation(
                "INSERT needs a VALUES clause".into(),
            ));
        };
        let sql_ast::SetExpr::Values(values) = *source.body else {
            return Err(DbError::UnsupportedOperation(
                "only INSERT ... VALUES is supported".into(),
            ));
        };

        let rows = values
            .rows
            .into_iter()
            .map(|row| row.into_iter().map(|e| self.expr(e)).collect::<Result<Vec<_>>>())
            .collect::<Result<Vec<_>>>()?;

        let returning = insert
            .returning
            .unwrap_or_default()
            .into_iter()
            .map(|item| self.select_item(item))
            .collect::<Result<Vec<_>>>()?;

        Ok(Statement::Insert {
            table,
            columns,
            rows,
            returning,
        })
    }

    fn update(
        &mut self,
        table: sql_ast::TableWithJoins,
        assignments: Vec<sql_ast::Assignment>,
        selection: Option<sql_ast::Expr>,
    ) -> Result<Statement> {
        let table = table_factor(table.relation)?;

        let assignments = assignments
            .into_iter()
            .map(|assign| {
                let column = match &assign.target {
                    sql_ast::AssignmentTarget::ColumnName(name) => object_name(name)?,
                    _ => {
                        return Err(DbError::UnsupportedOperation(
                            "only simple column names supported in UPDATE".into(),
                        ))
                    }
                };
                Ok((column, self.expr(assign.value)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let selection = selection.map(|e| self.expr(e)).transpose()?;

        Ok(Statement::Update {
            table,
            assignments,
            selection,
        })
    }

    fn delete(&mut self, delete: sql_ast::Delete) -> Result<Statement> {
        let tables = match delete.from {
            sql_ast::FromTable::WithFromKeyword(tables) => tables,
            sql_ast::FromTable::WithoutKeyword(tables) => tables,
        };
        let relation = tables
            .into_iter()
            .next()
            .ok_or_else(|| DbError::ParseError("DELETE requires a table".into()))?
            .relation;

        Ok(Statement::Delete {
            table: table_factor(relation)?,
            selection: delete.selection.map(|e| self.expr(e)).transpose()?,
        })
    }

    fn query(&mut self, query: sql_ast::Query) -> Result<Statement> {
        let sql_ast::SetExpr::Select(select) = *query.body else {
            return Err(DbError::UnsupportedOperation(
                "only plain SELECT queries are supported".into(),
            ));
        };
        let select = *select;

        let projection = select
            .projection
            .into_iter()
            .map(|item| self.select_item(item))
            .collect::<Result<Vec<_>>>()?;

        let table = match select.from.len() {
            0 => None,
            1 => {
                let from = select.from.into_iter().next().map(|t| (t.relation, t.joins));
                match from {
                    Some((relation, joins)) if joins.is_empty() => Some(table_factor(relation)?),
                    _ => {
                        return Err(DbError::UnsupportedOperation(
                            "joins are not supported".into(),
                        ))
                    }
                }
            }
            _ => {
                return Err(DbError::UnsupportedOperation(
                    "only one table per SELECT is supported".into(),
                ))
            }
        };

        let selection = select.selection.map(|e| self.expr(e)).transpose()?;

        let order_by = match query.order_by {
            None => Vec::new(),
            Some(order_by) => match order_by.kind {
                sql_ast::OrderByKind::Expressions(exprs) => exprs
                    .into_iter()
                    .map(|order| {
                        Ok(OrderBy {
                            expr: self.expr(order.expr)?,
                            descending: order.options.asc.map(|asc| !asc).unwrap_or(false),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                sql_ast::OrderByKind::All(_) => {
                    return Err(DbError::UnsupportedOperation(
                        "ORDER BY ALL not supported".into(),
                    ))
                }
            },
        };

        let limit = match &query.limit_clause {
            None => None,
            Some(sql_ast::LimitClause::LimitOffset { limit: None, .. }) => None,
            Some(sql_ast::LimitClause::LimitOffset {
                limit: Some(expr), ..
            }) => Some(limit_number(expr)?),
            Some(sql_ast::LimitClause::OffsetCommaLimit { limit, .. }) => Some(limit_number(limit)?),
        };

        Ok(Statement::Select {
            table,
            projection,
            selection,
            order_by,
            limit,
        })
    }

    fn select_item(&mut self, item: sql_ast::SelectItem) -> Result<Projection> {
        match item {
            sql_ast::SelectItem::Wildcard(_) => Ok(Projection::Wildcard),
            sql_ast::SelectItem::UnnamedExpr(expr) => {
                let name = match &expr {
                    sql_ast::Expr::Identifier(ident) => ident.value.clone(),
                    sql_ast::Expr::CompoundIdentifier(parts) => parts
                        .last()
                        .map(|ident| ident.value.clone())
                        .unwrap_or_default(),
                    other => other.to_string(),
                };
                Ok(Projection::Expr {
                    expr: self.expr(expr)?,
                    name,
                })
            }
            sql_ast::SelectItem::ExprWithAlias { expr, alias } => Ok(Projection::Expr {
                expr: self.expr(expr)?,
                name: alias.value,
            }),
            other => Err(DbError::UnsupportedOperation(format!(
                "unsupported select item: {}",
                other
            ))),
        }
    }

    fn expr(&mut self, expr: sql_ast::Expr) -> Result<Expr> {
        match expr {
            sql_ast::Expr::Identifier(ident) => {
                if ident.quote_style.is_none() && ident.value.eq_ignore_ascii_case("default") {
                    Ok(Expr::Default)
                } else {
                    Ok(Expr::Column(ident.value))
                }
            }
            sql_ast::Expr::CompoundIdentifier(parts) => parts
                .into_iter()
                .last()
                .map(|ident| Expr::Column(ident.value))
                .ok_or_else(|| DbError::ParseError("empty identifier".into())),
            sql_ast::Expr::Value(value) => self.value(value.value),
            sql_ast::Expr::Nested(inner) => self.expr(*inner),
            sql_ast::Expr::IsNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.expr(*inner)?),
                negated: false,
            }),
            sql_ast::Expr::IsNotNull(inner) => Ok(Expr::IsNull {
                expr: Box::new(self.expr(*inner)?),
                negated: true,
            }),
            sql_ast::Expr::UnaryOp { op, expr } => {
                let inner = Box::new(self.expr(*expr)?);
                match op {
                    sql_ast::UnaryOperator::Not => Ok(Expr::Not(inner)),
                    sql_ast::UnaryOperator::Minus => Ok(Expr::Negate(inner)),
                    sql_ast::UnaryOperator::Plus => Ok(*inner),
                    other => Err(DbError::UnsupportedOperation(format!(
                        "unary operator {} not supported",
                        other
                    ))),
                }
            }
            sql_ast::Expr::BinaryOp { left, op, right } => {
                let left = Box::new(self.expr(*left)?);
                let right = Box::new(self.expr(*right)?);
                Ok(Expr::Binary {
                    left,
                    op: binary_op(op)?,
                    right,
                })
            }
            other => Err(DbError::UnsupportedOperation(format!(
                "expression not supported: {}",
                other
            ))),
        }
    }

    fn value(&mut self, value: sql_ast::Value) -> Result<Expr> {
        let literal = match value {
            sql_ast::Value::Null => Value::Null,
            sql_ast::Value::Boolean(b) => Value::Boolean(b),
            sql_ast::Value::SingleQuotedString(s) => Value::Text(s),
            sql_ast::Value::Number(n, _) => match n.parse::<i64>() {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Float(
                    n.parse::<f64>()
                        .map_err(|_| DbError::ParseError(format!("invalid number: {}", n)))?,
                ),
            },
            sql_ast::Value::Placeholder(p) => return self.placeholder(&p),
            other => {
                return Err(DbError::UnsupportedOperation(format!(
                    "literal not supported: {}",
                    other
                )))
            }
        };
        Ok(Expr::Literal(literal))
    }

    fn placeholder(&mut self, text: &str) -> Result<Expr> {
        if text == "?" {
            let idx = self.next_param;
            self.next_param += 1;
            return Ok(Expr::Param(idx));
        }

        match text.strip_prefix('$').map(str::parse::<usize>) {
            Some(Ok(n)) if n > 0 => Ok(Expr::Param(n - 1)),
            _ => Err(DbError::ParseError(format!("invalid placeholder: {}", text))),
        }
    }
}

fn binary_op(op: sql_ast::BinaryOperator) -> Result<BinaryOp> {
    match op {
        sql_ast::BinaryOperator::Eq => Ok(BinaryOp::Eq),
        sql_ast::BinaryOperator::NotEq => Ok(BinaryOp::NotEq),
        sql_ast::BinaryOperator::Lt => Ok(BinaryOp::Lt),
        sql_ast::BinaryOperator::LtEq => Ok(BinaryOp::LtEq),
        sql_ast::BinaryOperator::Gt => Ok(BinaryOp::Gt),
        sql_ast::BinaryOperator::GtEq => Ok(BinaryOp::GtEq),
        sql_ast::BinaryOperator::And => Ok(BinaryOp::And),
        sql_ast::BinaryOperator::Or => Ok(BinaryOp::Or),
        sql_ast::BinaryOperator::Plus => Ok(BinaryOp::Plus),
        sql_ast::BinaryOperator::Minus => Ok(BinaryOp::Minus),
        sql_ast::BinaryOperator::Multiply => Ok(BinaryOp::Multiply),
        sql_ast::BinaryOperator::Divide => Ok(BinaryOp::Divide),
        other => Err(DbError::UnsupportedOperation(format!(
            "operator {} not supported",
            other
        ))),
    }
}

fn table_factor(factor: sql_ast::TableFactor) -> Result<String> {
    match factor {
        sql_ast::TableFactor::Table { name, .. } => object_name(&name),
        _ => Err(DbError::UnsupportedOperation(
            "complex table references not supported".into(),
        )),
    }
}

/// Last part of a possibly qualified name, without quotes.
fn object_name(name: &sql_ast::ObjectName) -> Result<String> {
    #[allow(unreachable_patterns)]
    match name.0.last() {
        Some(sql_ast::ObjectNamePart::Identifier(ident)) => Ok(ident.value.clone()),
        Some(other) => Err(DbError::UnsupportedOperation(format!(
            "unsupported name: {:?}",
            other
        ))),
        None => Err(DbError::ParseError("empty name".into())),
    }
}

fn limit_number(expr: &sql_ast::Expr) -> Result<usize> {
    match expr {
        sql_ast::Expr::Value(v) => match &v.value {
            sql_ast::Value::Number(n, _) => n
                .parse::<usize>()
                .map_err(|_| DbError::ParseError(format!("invalid LIMIT value: {}", n))),
            other => Err(DbError::UnsupportedOperation(format!(
                "only numeric LIMIT supported, got: {}",
                other
            ))),
        },
        _ => Err(DbError::UnsupportedOperation(
            "only numeric LIMIT supported".into(),
        )),
    }
}
