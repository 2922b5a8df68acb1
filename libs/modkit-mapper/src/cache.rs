//! Compiled-projection cache.
//!
//! Projections are compiled once into a closure tree and stored type-erased,
//! keyed by `(source TypeId, target TypeId)`. Each entry remembers the profile
//! generation it was built under; an entry from another generation is a miss.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::ast::Expr;
use crate::projection::Projection;
use crate::shape::Shape;
use crate::value::Value;

type Eval<S> = Box<dyn Fn(&S) -> Value + Send + Sync>;
type Construct<S, T> = Arc<dyn Fn(&S) -> T + Send + Sync>;

/// A projection compiled into a reusable closure tree.
pub struct CompiledProjection<S, T> {
    run: Construct<S, T>,
}

impl<S, T> Clone for CompiledProjection<S, T> {
    fn clone(&self) -> Self {
        Self {
            run: Arc::clone(&self.run),
        }
    }
}

impl<S, T> fmt::Debug for CompiledProjection<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledProjection").finish_non_exhaustive()
    }
}

impl<S: Shape, T: Shape> CompiledProjection<S, T> {
    #[must_use]
    pub fn compile(projection: &Projection) -> Self {
        let steps: Vec<(&'static str, Eval<S>)> = projection
            .bindings
            .iter()
            .map(|binding| (binding.field, compile_expr::<S>(&binding.expr)))
            .collect();

        Self {
            run: Arc::new(move |source: &S| {
                let mut out = T::default();
                for (field, eval) in &steps {
                    if !out.write(field, eval(source)) {
                        tracing::trace!(
                            target_shape = T::NAME,
                            field = *field,
                            "destination rejected projected value"
                        );
                    }
                }
                out
            }),
        }
    }

    #[must_use]
    pub fn execute(&self, source: &S) -> T {
        (self.run)(source)
    }
}

fn compile_expr<S: Shape>(expr: &Expr) -> Eval<S> {
    match expr {
        Expr::Member(path) if path.is_direct() => {
            let name = path.head().to_owned();
            Box::new(move |source: &S| source.read(&name).unwrap_or(Value::Null))
        }
        // nested reads and stray params cannot produce a value
        Expr::Member(_) | Expr::Param => Box::new(|_: &S| Value::Null),
        Expr::Constant(value) => {
            let value = value.clone();
            Box::new(move |_: &S| value.clone())
        }
        Expr::Call(func, args) => {
            let func = *func;
            let args: Vec<Eval<S>> = args.iter().map(compile_expr::<S>).collect();
            Box::new(move |source: &S| func.apply(args.iter().map(|arg| arg(source)).collect()))
        }
    }
}

/// Cache key: the ordered pair of source and target shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProjectionKey {
    source: TypeId,
    target: TypeId,
}

impl ProjectionKey {
    #[must_use]
    pub fn of<S: 'static, T: 'static>() -> Self {
        Self {
            source: TypeId::of::<S>(),
            target: TypeId::of::<T>(),
        }
    }
}

/// Snapshot of the cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub builds: u64,
    pub invalidations: u64,
}

struct CacheEntry {
    generation: u64,
    compiled: Arc<dyn Any + Send + Sync>,
}

/// Concurrent store of compiled projections.
pub struct ProjectionCache {
    entries: DashMap<ProjectionKey, CacheEntry>,
    enabled: bool,
    hits: AtomicU64,
    misses: AtomicU64,
    builds: AtomicU64,
    invalidations: AtomicU64,
}

impl Default for ProjectionCache {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for ProjectionCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectionCache")
            .field("len", &self.entries.len())
            .field("enabled", &self.enabled)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ProjectionCache {
    /// With `enabled == false` nothing is stored and every lookup builds.
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            enabled,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            builds: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    /// Return the compiled projection for `S -> T`, building it on a miss.
    ///
    /// Concurrent first use may build more than once; the map converges to a
    /// single entry per key and every caller gets an equivalent projection.
    #[must_use]
    pub fn get_or_build<S, T, F>(&self, generation: u64, build: F) -> CompiledProjection<S, T>
    where
        S: Shape,
        T: Shape,
        F: FnOnce() -> Projection,
    {
        if !self.enabled {
            self.builds.fetch_add(1, Ordering::Relaxed);
            return CompiledProjection::compile(&build());
        }

        let key = ProjectionKey::of::<S, T>();
        // clone the Arc out so the shard guard drops before any insert
        let cached = self
            .entries
            .get(&key)
            .and_then(|entry| (entry.generation == generation).then(|| Arc::clone(&entry.compiled)));
        if let Some(compiled) = cached.and_then(downcast::<S, T>) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(source = S::NAME, target = T::NAME, "projection cache hit");
            return compiled;
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let projection = build();
        let compiled = CompiledProjection::<S, T>::compile(&projection);
        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            source = S::NAME,
            target = T::NAME,
            bindings = projection.bindings.len(),
            unbound = projection.unbound.len(),
            generation,
            "compiled projection"
        );

        let fresh = CacheEntry {
            generation,
            compiled: Arc::new(compiled.clone()),
        };
        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().generation == generation
                    && let Some(existing) = downcast::<S, T>(Arc::clone(&occupied.get().compiled))
                {
                    return existing;
                }
                occupied.insert(fresh);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
            }
        }
        compiled
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.clear();
        self.invalidations.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("projection cache invalidated");
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

fn downcast<S: Shape, T: Shape>(
    compiled: Arc<dyn Any + Send + Sync>,
) -> Option<CompiledProjection<S, T>> {
    compiled
        .downcast::<CompiledProjection<S, T>>()
        .ok()
        .map(|arc| (*arc).clone())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::Shape;

    #[derive(Debug, Default, Shape)]
    struct Source {
        id: i64,
        name: String,
    }

    #[derive(Debug, Default, PartialEq, Shape)]
    struct Target {
        name: String,
    }

    fn source() -> Source {
        Source {
            id: 1,
            name: "A".to_owned(),
        }
    }

    #[test]
    fn second_lookup_hits_without_building() {
        let cache = ProjectionCache::default();

        let first =
            cache.get_or_build::<Source, Target, _>(0, Projection::build_convention::<Source, Target>);
        let second = cache.get_or_build::<Source, Target, _>(0, || unreachable!("cached"));

        assert_eq!(first.execute(&source()).name, "A");
        assert_eq!(second.execute(&source()).name, "A");
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                builds: 1,
                invalidations: 0
            }
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn stale_generation_is_rebuilt_in_place() {
        let cache = ProjectionCache::default();
        let old = cache.get_or_build::<Source, Target, _>(0, Projection::build_convention::<Source, Target>);

        let new = cache.get_or_build::<Source, Target, _>(1, Projection::build_convention::<Source, Target>);

        assert_eq!(old.execute(&source()), new.execute(&source()));

        assert_eq!(cache.stats().builds, 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_counts_invalidations() {
        let cache = ProjectionCache::default();
        let compiled =
            cache.get_or_build::<Source, Target, _>(0, Projection::build_convention::<Source, Target>);

        cache.clear();

        assert_eq!(compiled.execute(&source()).name, "A");

        assert!(cache.is_empty());
        assert_eq!(cache.stats().invalidations, 1);
    }

    #[test]
    fn disabled_cache_always_builds() {
        let cache = ProjectionCache::new(false);

        for _ in 0..3 {
            let compiled =
                cache.get_or_build::<Source, Target, _>(0, Projection::build_convention::<Source, Target>);
            assert_eq!(compiled.execute(&source()).name, "A");
        }

        assert!(cache.is_empty());
        assert_eq!(cache.stats().builds, 3);
        assert_eq!(cache.stats().hits, 0);
    }

    #[test]
    fn compiled_and_interpreted_agree() {
        let projection = Projection::build_convention::<Source, Target>();
        let compiled = CompiledProjection::<Source, Target>::compile(&projection);

        let interpreted: Target = projection.evaluate(&source());

        assert_eq!(compiled.execute(&source()), interpreted);
    }
}
