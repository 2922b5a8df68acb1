//! Projection → `sea_orm` select compiler (AST in, SQL out).
//!
//! Members resolve to columns of the entity by name, spliced profile bodies
//! become SQL function calls, and each binding is selected under the
//! destination field name so the rows can be read with `into_model`.

use sea_orm::sea_query::{Alias, Expr as SqlExpr, Func as SqlFunc, Keyword, SimpleExpr};
use sea_orm::{EntityTrait, IdenStatic, Iterable, QuerySelect, Select};
use thiserror::Error;

use crate::ast::{Expr, Func};
use crate::projection::Projection;
use crate::value::Value;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushDownError {
    #[error("entity has no column `{0}`")]
    UnknownColumn(String),

    #[error("expression is not translatable: {0}")]
    NotTranslatable(String),

    #[error("value cannot be sent to the database: {0}")]
    UnsupportedValue(String),
}

pub type PushDownResult<T> = Result<T, PushDownError>;

fn column<E: EntityTrait>(name: &str) -> PushDownResult<E::Column> {
    E::Column::iter()
        .find(|col| col.as_str() == name)
        .ok_or_else(|| PushDownError::UnknownColumn(name.to_owned()))
}

fn value_to_simple_expr(value: &Value) -> PushDownResult<SimpleExpr> {
    let value: sea_orm::Value = match value {
        Value::Null => return Ok(SimpleExpr::Keyword(Keyword::Null)),
        Value::Bool(b) => (*b).into(),
        Value::I32(n) => (*n).into(),
        Value::I64(n) => (*n).into(),
        Value::F64(n) => (*n).into(),
        Value::Decimal(d) => (*d).into(),
        Value::String(s) => s.clone().into(),
        Value::Uuid(u) => (*u).into(),
        Value::DateTime(dt) => (*dt).into(),
        Value::Date(d) => (*d).into(),
        Value::List(_) => return Err(PushDownError::UnsupportedValue(value.to_string())),
    };
    Ok(SimpleExpr::Value(value))
}

fn sql_call(name: &str, args: Vec<SimpleExpr>) -> SimpleExpr {
    SqlFunc::cust(Alias::new(name)).args(args).into()
}

fn sql_cast(arg: SimpleExpr, type_name: &str) -> SimpleExpr {
    arg.cast_as(Alias::new(type_name))
}

/// Translate one projection expression into a `sea_query` expression over `E`.
///
/// # Errors
/// - `NotTranslatable` for `Param` leaves and nested member paths
/// - `UnknownColumn` when a member does not name a column of `E`
/// - `UnsupportedValue` for list constants
///
/// `to_i64` truncates toward zero, like `Expr::eval`.
pub fn expr_to_simple_expr<E: EntityTrait>(expr: &Expr) -> PushDownResult<SimpleExpr> {
    match expr {
        Expr::Member(path) if path.is_direct() => {
            Ok(SqlExpr::col(column::<E>(path.head())?).into())
        }
        Expr::Member(path) => Err(PushDownError::NotTranslatable(path.to_string())),
        Expr::Param => Err(PushDownError::NotTranslatable(expr.to_string())),
        Expr::Constant(value) => value_to_simple_expr(value),
        Expr::Call(func, args) => {
            let mut args = args
                .iter()
                .map(expr_to_simple_expr::<E>)
                .collect::<PushDownResult<Vec<_>>>()?;
            let unary = |args: &mut Vec<SimpleExpr>| {
                if args.len() == 1 {
                    Ok(args.remove(0))
                } else {
                    Err(PushDownError::NotTranslatable(expr.to_string()))
                }
            };
            Ok(match func {
                Func::Round => sql_call("ROUND", vec![unary(&mut args)?]),
                Func::Floor => sql_call("FLOOR", vec![unary(&mut args)?]),
                Func::Ceil => sql_call("CEIL", vec![unary(&mut args)?]),
                Func::Abs => sql_call("ABS", vec![unary(&mut args)?]),
                // a plain numeric -> bigint cast rounds on most backends
                Func::ToI64 => sql_cast(sql_call("TRUNC", vec![unary(&mut args)?]), "BIGINT"),
                Func::ToF64 => sql_cast(unary(&mut args)?, "DOUBLE PRECISION"),
                Func::ToDecimal => sql_cast(unary(&mut args)?, "DECIMAL"),
                Func::ToText => sql_cast(unary(&mut args)?, "TEXT"),
                Func::Upper => sql_call("UPPER", vec![unary(&mut args)?]),
                Func::Lower => sql_call("LOWER", vec![unary(&mut args)?]),
                Func::Trim => sql_call("TRIM", vec![unary(&mut args)?]),
                Func::Length => sql_call("LENGTH", vec![unary(&mut args)?]),
                Func::Coalesce => sql_call("COALESCE", args),
                // NULL arguments are skipped, matching in-process evaluation
                Func::Concat => sql_call(
                    "CONCAT",
                    args.into_iter()
                        .map(|arg| sql_call("COALESCE", vec![arg, SimpleExpr::Value("".into())]))
                        .collect(),
                ),
            })
        }
    }
}

/// Build `SELECT <expr> AS <field>, ...` over `E` for every binding.
///
/// # Errors
/// Returns the first `PushDownError` raised by a binding; unbound destination
/// fields are not selected.
pub fn select_projection<E: EntityTrait>(projection: &Projection) -> PushDownResult<Select<E>> {
    if !projection.is_translatable() {
        return Err(PushDownError::NotTranslatable(projection.to_string()));
    }
    let mut select = E::find().select_only();
    for binding in &projection.bindings {
        select = select.expr_as(expr_to_simple_expr::<E>(&binding.expr)?, binding.field);
    }
    tracing::debug!(
        source = projection.source,
        target = projection.target,
        columns = projection.bindings.len(),
        "pushed projection down to select"
    );
    Ok(select)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[path = "push_down_tests.rs"]
mod push_down_tests;
