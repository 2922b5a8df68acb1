//! Profile registry: narrow overrides for fields that need a transformation.
//!
//! A profile is keyed by `(source field, destination type)` and holds a
//! `Transform` whose body is an `Expr` over a single `Param` leaf. The resolver
//! splices the body into projections in place of a direct copy.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::ast::{Expr, Func, Path};
use crate::errors::ProfileError;
use crate::shape::Shape;
use crate::value::{FieldType, ValueType};

/// Identifies the entity property a profile applies to.
///
/// Selectors are validated when they are registered, not when they are built:
/// `Selector::from("category.name")` is a valid value that `register` rejects.
#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    text: String,
    parsed: Result<Expr, String>,
}

impl Selector {
    /// Parse a selector: `score`, `category.name`, `name.trim()` or `upper(name)`.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            parsed: SelectorParser::new(text).parse(),
        }
    }

    #[must_use]
    pub fn expr(expr: Expr) -> Self {
        Self {
            text: expr.to_string(),
            parsed: Ok(expr),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Resolve to the name of the directly accessed property.
    ///
    /// # Errors
    /// Returns `ProfileError` when the selector does not parse, or is anything but a
    /// bare single-segment property read.
    pub fn direct_member(&self) -> Result<&str, ProfileError> {
        match &self.parsed {
            Err(reason) => Err(ProfileError::InvalidSelector {
                selector: self.text.clone(),
                reason: reason.clone(),
            }),
            Ok(Expr::Member(path)) if path.is_direct() => Ok(path.head()),
            Ok(Expr::Member(path)) => Err(ProfileError::NestedMember {
                selector: path.to_string(),
            }),
            Ok(other) => Err(ProfileError::NotDirectMember {
                selector: other.to_string(),
            }),
        }
    }
}

impl From<&str> for Selector {
    fn from(text: &str) -> Self {
        Selector::parse(text)
    }
}

impl From<Expr> for Selector {
    fn from(expr: Expr) -> Self {
        Selector::expr(expr)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/* ---------- selector parsing ---------- */

struct SelectorParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> SelectorParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<Expr, String> {
        let expr = self.expr()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(format!("unexpected input at offset {}", self.pos));
        }
        Ok(expr)
    }

    // expr := term ('.' ident ('(' ')')?)*
    fn expr(&mut self) -> Result<Expr, String> {
        let mut expr = self.term()?;
        while self.eat('.') {
            let name = self.ident()?;
            if self.eat('(') {
                self.expect(')')?;
                let func = Func::from_name(name).ok_or_else(|| format!("unknown method `{name}`"))?;
                expr = Expr::Call(func, vec![expr]);
            } else {
                expr = match expr {
                    Expr::Member(path) => Expr::Member(path.child(name)),
                    other => return Err(format!("cannot read `{name}` of `{other}`")),
                };
            }
        }
        Ok(expr)
    }

    // term := ident '(' (expr (',' expr)*)? ')' | ident
    fn term(&mut self) -> Result<Expr, String> {
        let name = self.ident()?;
        if !self.eat('(') {
            return Ok(Expr::Member(Path::single(name)));
        }
        let func = Func::from_name(name).ok_or_else(|| format!("unknown function `{name}`"))?;
        let mut args = Vec::new();
        if !self.eat(')') {
            loop {
                args.push(self.expr()?);
                if self.eat(')') {
                    break;
                }
                self.expect(',')?;
            }
        }
        Ok(Expr::Call(func, args))
    }

    fn ident(&mut self) -> Result<&'a str, String> {
        self.skip_ws();
        let src: &'a str = self.src;
        let rest = &src[self.pos..];
        let len = rest
            .char_indices()
            .find(|&(i, c)| !(c == '_' || c.is_ascii_alphabetic() || (i > 0 && c.is_ascii_digit())))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return Err(format!("expected identifier at offset {}", self.pos));
        }
        self.pos += len;
        Ok(&rest[..len])
    }

    fn eat(&mut self, ch: char) -> bool {
        self.skip_ws();
        if self.src[self.pos..].starts_with(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, ch: char) -> Result<(), String> {
        if self.eat(ch) {
            Ok(())
        } else {
            Err(format!("expected `{ch}` at offset {}", self.pos))
        }
    }

    fn skip_ws(&mut self) {
        let rest = &self.src[self.pos..];
        self.pos += rest.len() - rest.trim_start().len();
    }
}

/* ---------- transforms ---------- */

/// A typed transform from a source property type to a destination value type.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    input: FieldType,
    output: FieldType,
    body: Expr,
}

impl Transform {
    /// Transform from `In` to `Out`; the body reads its input through `Expr::param()`.
    ///
    /// ```rust,ignore
    /// Transform::new::<Decimal, i64>(Expr::param().round().to_i64())
    /// ```
    #[must_use]
    pub fn new<In: ValueType, Out: ValueType>(body: Expr) -> Self {
        Self::typed(In::FIELD_TYPE, Out::FIELD_TYPE, body)
    }

    #[must_use]
    pub fn typed(input: FieldType, output: FieldType, body: Expr) -> Self {
        Self {
            input,
            output,
            body,
        }
    }

    #[must_use]
    pub fn input(&self) -> FieldType {
        self.input
    }

    #[must_use]
    pub fn output(&self) -> FieldType {
        self.output
    }

    #[must_use]
    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Splice the body over `source`, typically `Expr::member(field)`.
    #[must_use]
    pub fn splice(&self, source: &Expr) -> Expr {
        self.body.substitute_param(source)
    }
}

/// Registry key: the source property and the destination value type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProfileKey {
    pub source: String,
    pub target: FieldType,
}

impl fmt::Display for ProfileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// Profiles registered for entity shape `E`.
pub struct ProfileRegistry<E: Shape> {
    rules: BTreeMap<ProfileKey, Transform>,
    generation: u64,
    _shape: PhantomData<fn() -> E>,
}

impl<E: Shape> Default for ProfileRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Shape> fmt::Debug for ProfileRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileRegistry")
            .field("shape", &E::NAME)
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("generation", &self.generation)
            .finish()
    }
}

impl<E: Shape> ProfileRegistry<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: BTreeMap::new(),
            generation: 0,
            _shape: PhantomData,
        }
    }

    /// Validate and store a profile. The last registration for a key wins.
    ///
    /// # Errors
    /// Returns `ProfileError` when the selector is not a direct readable property of
    /// `E`, when the transform input differs from the property's declared type, or
    /// when the body does not produce the declared output type.
    pub fn register(
        &mut self,
        selector: &Selector,
        transform: Transform,
    ) -> Result<ProfileKey, ProfileError> {
        let name = selector.direct_member()?;
        let field = E::field(name).ok_or_else(|| ProfileError::UnknownField {
            shape: E::NAME,
            field: name.to_owned(),
        })?;
        if !field.readable {
            return Err(ProfileError::NotReadable {
                shape: E::NAME,
                field: name.to_owned(),
            });
        }
        if transform.input != field.ty {
            return Err(ProfileError::SourceTypeMismatch {
                field: name.to_owned(),
                declared: field.ty,
                transform_input: transform.input,
            });
        }
        if let Some(member) = transform.body.members().first() {
            return Err(ProfileError::BodyReadsMember {
                field: name.to_owned(),
                member: member.to_string(),
            });
        }
        let inferred = transform.body.infer_type(Some(transform.input), &|_| None);
        if inferred != Some(transform.output) {
            return Err(ProfileError::BodyTypeMismatch {
                field: name.to_owned(),
                expected: transform.output,
                inferred,
            });
        }

        let key = ProfileKey {
            source: field.name.to_owned(),
            target: transform.output,
        };
        if self.rules.insert(key.clone(), transform).is_some() {
            tracing::debug!(shape = E::NAME, profile = %key, "replaced existing profile");
        }
        self.generation += 1;
        Ok(key)
    }

    #[must_use]
    pub fn lookup(&self, source: &str, target: FieldType) -> Option<&Transform> {
        self.rules.get(&ProfileKey {
            source: source.to_owned(),
            target,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ProfileKey, &Transform)> {
        self.rules.iter()
    }

    /// Bumped on every successful registration, including re-registrations.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[path = "profile_tests.rs"]
mod profile_tests;
