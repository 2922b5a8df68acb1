//! Projection expression AST.
//!
//! An `Expr` is the analyzable description of "read a member, optionally transform
//! it". The same tree is interpreted in-process (`Expr::eval`), compiled into a
//! closure tree (`crate::cache::CompiledProjection`), and walked by query adapters
//! (`crate::push_down`) to emit a native query fragment.

use std::fmt;

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::value::{FieldKind, FieldType, IntoValue, Value};

/// Member path on the entity parameter, e.g. `score` or `category.name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Build a path from its segments. Empty segment lists are not representable.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A bare property read: exactly one segment.
    #[must_use]
    pub fn is_direct(&self) -> bool {
        self.0.len() == 1
    }

    #[must_use]
    pub fn head(&self) -> &str {
        &self.0[0]
    }

    #[must_use]
    pub fn child(mut self, name: impl Into<String>) -> Self {
        self.0.push(name.into());
        self
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Pure functions a projection may apply.
///
/// The set is closed on purpose: every variant has an in-process evaluation rule
/// and a query-language rendering, which keeps spliced profile bodies translatable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
    Round,
    Floor,
    Ceil,
    Abs,
    ToI64,
    ToF64,
    ToDecimal,
    ToText,
    Upper,
    Lower,
    Trim,
    Length,
    Coalesce,
    Concat,
}

impl Func {
    pub const ALL: &'static [Func] = &[
        Func::Round,
        Func::Floor,
        Func::Ceil,
        Func::Abs,
        Func::ToI64,
        Func::ToF64,
        Func::ToDecimal,
        Func::ToText,
        Func::Upper,
        Func::Lower,
        Func::Trim,
        Func::Length,
        Func::Coalesce,
        Func::Concat,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Func::Round => "round",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Abs => "abs",
            Func::ToI64 => "to_i64",
            Func::ToF64 => "to_f64",
            Func::ToDecimal => "to_decimal",
            Func::ToText => "to_text",
            Func::Upper => "upper",
            Func::Lower => "lower",
            Func::Trim => "trim",
            Func::Length => "length",
            Func::Coalesce => "coalesce",
            Func::Concat => "concat",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    /// Typing rule. `None` means the call is ill-typed.
    #[must_use]
    pub fn result_type(self, args: &[FieldType]) -> Option<FieldType> {
        if args.iter().any(|a| a.list) {
            return None;
        }
        match (self, args) {
            (Func::Round | Func::Floor | Func::Ceil | Func::Abs, [a]) if a.kind.is_numeric() => {
                Some(*a)
            }
            (Func::ToI64, [a]) if a.kind.is_numeric() => Some(with_nullability(FieldType::I64, *a)),
            (Func::ToF64, [a]) if a.kind.is_numeric() => Some(with_nullability(FieldType::F64, *a)),
            (Func::ToDecimal, [a]) if a.kind.is_numeric() => {
                Some(with_nullability(FieldType::DECIMAL, *a))
            }
            (Func::ToText, [a]) => Some(with_nullability(FieldType::STRING, *a)),
            (Func::Upper | Func::Lower | Func::Trim, [a]) if a.kind == FieldKind::String => {
                Some(*a)
            }
            (Func::Length, [a]) if a.kind == FieldKind::String => {
                Some(with_nullability(FieldType::I64, *a))
            }
            (Func::Coalesce, [a, b]) if a.kind == b.kind => Some(FieldType {
                nullable: a.nullable && b.nullable,
                ..*a
            }),
            (Func::Concat, args)
                if args.len() >= 2 && args.iter().all(|a| a.kind == FieldKind::String) =>
            {
                Some(FieldType::STRING)
            }
            _ => None,
        }
    }

    /// Evaluation rule. Total: null inputs propagate (except for `coalesce` and
    /// `concat`), and failures such as overflow yield `Value::Null`.
    #[must_use]
    pub fn apply(self, args: Vec<Value>) -> Value {
        match self {
            Func::Coalesce => args
                .into_iter()
                .find(|v| !v.is_null())
                .unwrap_or(Value::Null),
            Func::Concat => {
                let mut out = String::new();
                for arg in args {
                    match arg {
                        Value::Null => {}
                        Value::String(s) => out.push_str(&s),
                        _ => return Value::Null,
                    }
                }
                Value::String(out)
            }
            unary => match <[Value; 1]>::try_from(args) {
                Ok([Value::Null]) | Err(_) => Value::Null,
                Ok([arg]) => apply_unary(unary, arg).unwrap_or(Value::Null),
            },
        }
    }
}

fn with_nullability(ty: FieldType, from: FieldType) -> FieldType {
    FieldType {
        nullable: from.nullable,
        ..ty
    }
}

fn apply_unary(func: Func, arg: Value) -> Option<Value> {
    use Value as V;

    Some(match (func, arg) {
        (Func::Round, V::Decimal(d)) => {
            V::Decimal(d.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        }
        // floats round half to even, as `round(double precision)` does in SQL
        (Func::Round, V::F64(f)) => V::F64(f.round_ties_even()),
        (Func::Floor, V::Decimal(d)) => V::Decimal(d.floor()),
        (Func::Floor, V::F64(f)) => V::F64(f.floor()),
        (Func::Ceil, V::Decimal(d)) => V::Decimal(d.ceil()),
        (Func::Ceil, V::F64(f)) => V::F64(f.ceil()),
        (Func::Round | Func::Floor | Func::Ceil, v @ (V::I32(_) | V::I64(_))) => v,

        (Func::Abs, V::I32(n)) => V::I32(n.checked_abs()?),
        (Func::Abs, V::I64(n)) => V::I64(n.checked_abs()?),
        (Func::Abs, V::F64(f)) => V::F64(f.abs()),
        (Func::Abs, V::Decimal(d)) => V::Decimal(d.abs()),

        (Func::ToI64, V::I32(n)) => V::I64(i64::from(n)),
        (Func::ToI64, V::I64(n)) => V::I64(n),
        (Func::ToI64, V::F64(f)) => V::I64(Decimal::from_f64(f)?.trunc().to_i64()?),
        (Func::ToI64, V::Decimal(d)) => V::I64(d.trunc().to_i64()?),

        (Func::ToF64, V::I32(n)) => V::F64(f64::from(n)),
        (Func::ToF64, V::I64(n)) => V::F64(Decimal::from(n).to_f64()?),
        (Func::ToF64, V::F64(f)) => V::F64(f),
        (Func::ToF64, V::Decimal(d)) => V::F64(d.to_f64()?),

        (Func::ToDecimal, V::I32(n)) => V::Decimal(Decimal::from(n)),
        (Func::ToDecimal, V::I64(n)) => V::Decimal(Decimal::from(n)),
        (Func::ToDecimal, V::F64(f)) => V::Decimal(Decimal::from_f64(f)?),
        (Func::ToDecimal, V::Decimal(d)) => V::Decimal(d),

        (Func::ToText, V::String(s)) => V::String(s),
        (Func::ToText, V::Uuid(u)) => V::String(u.hyphenated().to_string()),
        (Func::ToText, V::DateTime(dt)) => V::String(dt.to_rfc3339()),
        (Func::ToText, V::Date(d)) => V::String(d.format("%Y-%m-%d").to_string()),
        (Func::ToText, V::Bool(b)) => V::String(b.to_string()),
        (Func::ToText, V::I32(n)) => V::String(n.to_string()),
        (Func::ToText, V::I64(n)) => V::String(n.to_string()),
        (Func::ToText, V::F64(f)) => V::String(f.to_string()),
        (Func::ToText, V::Decimal(d)) => V::String(d.to_string()),

        (Func::Upper, V::String(s)) => V::String(s.to_uppercase()),
        (Func::Lower, V::String(s)) => V::String(s.to_lowercase()),
        (Func::Trim, V::String(s)) => V::String(s.trim().to_owned()),
        (Func::Length, V::String(s)) => V::I64(i64::try_from(s.chars().count()).ok()?),

        _ => return None,
    })
}

/// Projection expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Read a member of the entity parameter.
    Member(Path),
    /// The formal input of a profile transform body.
    Param,
    /// A literal.
    Constant(Value),
    /// A pure function applied to sub-expressions.
    Call(Func, Vec<Expr>),
}

impl Expr {
    #[must_use]
    pub fn member(name: impl Into<String>) -> Expr {
        Expr::Member(Path::single(name))
    }

    /// Member read through a dotted path; `None` for an empty segment list.
    #[must_use]
    pub fn path<I, S>(segments: I) -> Option<Expr>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Path::new(segments).map(Expr::Member)
    }

    #[must_use]
    pub fn param() -> Expr {
        Expr::Param
    }

    #[must_use]
    pub fn constant(value: impl IntoValue) -> Expr {
        Expr::Constant(value.into_value())
    }

    #[must_use]
    pub fn call(func: Func, args: Vec<Expr>) -> Expr {
        Expr::Call(func, args)
    }

    /// Drill into a nested member: `category` → `category.name`.
    ///
    /// Only meaningful on member expressions; on anything else it returns `self`
    /// unchanged.
    #[must_use]
    pub fn field(self, name: impl Into<String>) -> Expr {
        match self {
            Expr::Member(path) => Expr::Member(path.child(name)),
            other => other,
        }
    }

    #[must_use]
    pub fn round(self) -> Expr {
        Expr::Call(Func::Round, vec![self])
    }

    #[must_use]
    pub fn floor(self) -> Expr {
        Expr::Call(Func::Floor, vec![self])
    }

    #[must_use]
    pub fn ceil(self) -> Expr {
        Expr::Call(Func::Ceil, vec![self])
    }

    #[must_use]
    pub fn abs(self) -> Expr {
        Expr::Call(Func::Abs, vec![self])
    }

    #[must_use]
    pub fn to_i64(self) -> Expr {
        Expr::Call(Func::ToI64, vec![self])
    }

    #[must_use]
    pub fn to_f64(self) -> Expr {
        Expr::Call(Func::ToF64, vec![self])
    }

    #[must_use]
    pub fn to_decimal(self) -> Expr {
        Expr::Call(Func::ToDecimal, vec![self])
    }

    #[must_use]
    pub fn to_text(self) -> Expr {
        Expr::Call(Func::ToText, vec![self])
    }

    #[must_use]
    pub fn upper(self) -> Expr {
        Expr::Call(Func::Upper, vec![self])
    }

    #[must_use]
    pub fn lower(self) -> Expr {
        Expr::Call(Func::Lower, vec![self])
    }

    #[must_use]
    pub fn trim(self) -> Expr {
        Expr::Call(Func::Trim, vec![self])
    }

    #[must_use]
    pub fn length(self) -> Expr {
        Expr::Call(Func::Length, vec![self])
    }

    #[must_use]
    pub fn coalesce(self, fallback: Expr) -> Expr {
        Expr::Call(Func::Coalesce, vec![self, fallback])
    }

    #[must_use]
    pub fn concat(self, other: Expr) -> Expr {
        match self {
            Expr::Call(Func::Concat, mut args) => {
                args.push(other);
                Expr::Call(Func::Concat, args)
            }
            first => Expr::Call(Func::Concat, vec![first, other]),
        }
    }

    /// Replace every `Param` leaf with `replacement`.
    ///
    /// This is how a profile body is spliced into a projection: the result is a
    /// single tree with no call-through indirection.
    #[must_use]
    pub fn substitute_param(&self, replacement: &Expr) -> Expr {
        match self {
            Expr::Param => replacement.clone(),
            Expr::Member(_) | Expr::Constant(_) => self.clone(),
            Expr::Call(func, args) => Expr::Call(
                *func,
                args.iter()
                    .map(|arg| arg.substitute_param(replacement))
                    .collect(),
            ),
        }
    }

    /// Static type of the expression.
    ///
    /// `param` types the `Param` leaf; `member` types member paths.
    #[must_use]
    pub fn infer_type<F>(&self, param: Option<FieldType>, member: &F) -> Option<FieldType>
    where
        F: Fn(&Path) -> Option<FieldType>,
    {
        match self {
            Expr::Member(path) => member(path),
            Expr::Param => param,
            Expr::Constant(value) => value.field_type(),
            Expr::Call(func, args) => {
                let types = args
                    .iter()
                    .map(|arg| arg.infer_type(param, member))
                    .collect::<Option<Vec<_>>>()?;
                func.result_type(&types)
            }
        }
    }

    /// Whether a query adapter can translate this tree: no `Param` leaves, only
    /// direct member reads, and scalar constants.
    #[must_use]
    pub fn is_translatable(&self) -> bool {
        match self {
            Expr::Member(path) => path.is_direct(),
            Expr::Param | Expr::Constant(Value::List(_)) => false,
            Expr::Constant(_) => true,
            Expr::Call(_, args) => args.iter().all(Expr::is_translatable),
        }
    }

    #[must_use]
    pub fn contains_param(&self) -> bool {
        match self {
            Expr::Param => true,
            Expr::Member(_) | Expr::Constant(_) => false,
            Expr::Call(_, args) => args.iter().any(Expr::contains_param),
        }
    }

    /// Member paths referenced by this tree, in visit order.
    #[must_use]
    pub fn members(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.collect_members(&mut out);
        out
    }

    fn collect_members<'a>(&'a self, out: &mut Vec<&'a Path>) {
        match self {
            Expr::Member(path) => out.push(path),
            Expr::Param | Expr::Constant(_) => {}
            Expr::Call(_, args) => {
                for arg in args {
                    arg.collect_members(out);
                }
            }
        }
    }

    /// Interpret the tree against a member reader.
    #[must_use]
    pub fn eval<R>(&self, read: &R) -> Value
    where
        R: Fn(&Path) -> Value,
    {
        match self {
            Expr::Member(path) => read(path),
            Expr::Param => Value::Null,
            Expr::Constant(value) => value.clone(),
            Expr::Call(func, args) => func.apply(args.iter().map(|arg| arg.eval(read)).collect()),
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Constant(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Member(path) => write!(f, "{path}"),
            Expr::Param => write!(f, "$"),
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Call(func, args) => {
                write!(f, "{}(", func.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[path = "ast_tests.rs"]
mod ast_tests;
