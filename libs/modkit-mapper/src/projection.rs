//! Convention resolver and projection builder.
//!
//! For each writable destination field the resolver decides between a direct
//! copy, a spliced profile body, or leaving the field unbound. The result is a
//! `Projection`: a flat list of `(destination field, Expr)` bindings that can be
//! interpreted, compiled into a closure tree, or pushed down to a query.

use std::fmt;

use crate::ast::{Expr, Path};
use crate::config::UnboundPolicy;
use crate::profile::ProfileRegistry;
use crate::shape::Shape;
use crate::value::{FieldType, Value};

/// Why a destination field received no binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnboundReason {
    /// The source shape has no readable field with that name.
    NoSource,
    /// A same-named source field exists but is not assignable and no profile applies.
    TypeMismatch { source: FieldType },
}

/// A destination field left at its default value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnboundField {
    pub field: &'static str,
    pub ty: FieldType,
    pub reason: UnboundReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindingKind {
    Direct,
    Profile,
}

/// One `destination field = expr` assignment.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub field: &'static str,
    pub ty: FieldType,
    pub kind: BindingKind,
    pub expr: Expr,
}

/// Resolver outcome for one destination field.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Bound(Binding),
    Unbound(UnboundField),
}

/// Resolve every readable and writable field of `T` against `S`.
///
/// Resolution order per field: same-named readable source field with an
/// assignable type, then a profile keyed by `(field, destination type)`, then
/// unbound. Results follow `T`'s declaration order.
#[must_use]
pub fn resolve<S: Shape, T: Shape>(profiles: Option<&ProfileRegistry<S>>) -> Vec<Resolution> {
    T::fields()
        .iter()
        .filter(|target| target.readable && target.writable)
        .map(|target| {
            let unbound = |reason| {
                Resolution::Unbound(UnboundField {
                    field: target.name,
                    ty: target.ty,
                    reason,
                })
            };

            let Some(source) = S::field(target.name).filter(|f| f.readable) else {
                return unbound(UnboundReason::NoSource);
            };
            let member = Expr::member(source.name);
            if source.ty.is_assignable_to(target.ty) {
                return Resolution::Bound(Binding {
                    field: target.name,
                    ty: target.ty,
                    kind: BindingKind::Direct,
                    expr: member,
                });
            }
            match profiles.and_then(|p| p.lookup(source.name, target.ty)) {
                Some(transform) => Resolution::Bound(Binding {
                    field: target.name,
                    ty: target.ty,
                    kind: BindingKind::Profile,
                    expr: transform.splice(&member),
                }),
                None => unbound(UnboundReason::TypeMismatch { source: source.ty }),
            }
        })
        .collect()
}

/// "Construct `target` with these bindings", as data.
#[derive(Clone, Debug, PartialEq)]
pub struct Projection {
    pub source: &'static str,
    pub target: &'static str,
    pub bindings: Vec<Binding>,
    pub unbound: Vec<UnboundField>,
}

impl Projection {
    /// Projection from entity `E` to destination `D`, honoring `profiles`.
    #[must_use]
    pub fn build<E: Shape, D: Shape>(profiles: &ProfileRegistry<E>) -> Self {
        Self::from_resolutions::<E, D>(resolve::<E, D>(Some(profiles)))
    }

    /// Pure name-and-type convention, no profiles.
    #[must_use]
    pub fn build_convention<S: Shape, T: Shape>() -> Self {
        Self::from_resolutions::<S, T>(resolve::<S, T>(None))
    }

    fn from_resolutions<S: Shape, T: Shape>(resolutions: Vec<Resolution>) -> Self {
        let mut bindings = Vec::with_capacity(resolutions.len());
        let mut unbound = Vec::new();
        for resolution in resolutions {
            match resolution {
                Resolution::Bound(binding) => bindings.push(binding),
                Resolution::Unbound(field) => unbound.push(field),
            }
        }
        Self {
            source: S::NAME,
            target: T::NAME,
            bindings,
            unbound,
        }
    }

    /// Interpret the bindings against `source`.
    ///
    /// Starts from `T::default()`; a value the destination rejects leaves the
    /// field at its default.
    #[must_use]
    pub fn evaluate<S: Shape, T: Shape>(&self, source: &S) -> T {
        let read = |path: &Path| {
            if path.is_direct() {
                source.read(path.head()).unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        };
        let mut out = T::default();
        for binding in &self.bindings {
            let value = binding.expr.eval(&read);
            if !out.write(binding.field, value) {
                tracing::trace!(
                    target_shape = T::NAME,
                    field = binding.field,
                    "destination rejected projected value"
                );
            }
        }
        out
    }

    /// Whether every binding can be handed to a query adapter.
    #[must_use]
    pub fn is_translatable(&self) -> bool {
        self.bindings.iter().all(|b| b.expr.is_translatable())
    }

    /// Source members the projection reads, deduplicated, in binding order.
    #[must_use]
    pub fn referenced_members(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for binding in &self.bindings {
            for path in binding.expr.members() {
                let head = path.head();
                if !out.contains(&head) {
                    out.push(head);
                }
            }
        }
        out
    }

    #[must_use]
    pub fn binding(&self, field: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.field == field)
    }

    /// Apply the configured policy for unbound destination fields.
    ///
    /// Nullable fields are never reported: `None` is a meaningful default.
    pub fn report_unbound(&self, policy: UnboundPolicy) {
        if policy != UnboundPolicy::Warn {
            return;
        }
        let missing: Vec<&str> = self
            .unbound
            .iter()
            .filter(|u| !u.ty.nullable)
            .map(|u| u.field)
            .collect();
        if !missing.is_empty() {
            tracing::warn!(
                source_shape = self.source,
                target_shape = self.target,
                fields = ?missing,
                "destination fields left at their default values"
            );
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} {{", self.source, self.target)?;
        for (i, binding) in self.bindings.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{sep}{}: {}", binding.field, binding.expr)?;
        }
        if self.bindings.is_empty() {
            write!(f, "}}")
        } else {
            write!(f, " }}")
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[path = "projection_tests.rs"]
mod projection_tests;
