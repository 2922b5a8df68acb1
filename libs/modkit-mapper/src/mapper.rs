//! The mapping engine for one entity shape.
//!
//! `Mapper<E>` owns the profile registry for `E`, the compiled-projection cache,
//! and the configuration. Profiles are registered during setup through
//! `&mut self`; once the mapper is shared (usually behind an `Arc`) it is
//! read-only apart from the cache, so projection is safe from many threads.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cache::{CacheStats, CompiledProjection, ProjectionCache};
use crate::config::MapperConfig;
use crate::contract::MappingContract;
use crate::errors::MapperError;
use crate::profile::{ProfileRegistry, Selector, Transform};
use crate::projection::Projection;
use crate::shape::Shape;

pub struct Mapper<E: Shape> {
    profiles: ProfileRegistry<E>,
    cache: ProjectionCache,
    config: MapperConfig,
}

impl<E: Shape> Default for Mapper<E> {
    fn default() -> Self {
        Self::new(MapperConfig::default())
    }
}

impl<E: Shape> fmt::Debug for Mapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("entity", &E::NAME)
            .field("profiles", &self.profiles)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl<E: Shape> Mapper<E> {
    #[must_use]
    pub fn new(config: MapperConfig) -> Self {
        Self {
            profiles: ProfileRegistry::new(),
            cache: ProjectionCache::new(config.cache.enabled),
            config,
        }
    }

    /// Register a transformation for one entity property.
    ///
    /// Every successful registration invalidates the whole projection cache,
    /// re-registrations included.
    ///
    /// # Errors
    /// Returns `MapperError::Configuration` when the selector is not a direct,
    /// readable property of `E` or the transform does not type-check. The
    /// registry and the cache are left untouched in that case.
    pub fn register_profile(
        &mut self,
        selector: impl Into<Selector>,
        transform: Transform,
    ) -> Result<(), MapperError> {
        let selector = selector.into();
        let key = self.profiles.register(&selector, transform)?;
        self.cache.clear();
        tracing::info!(
            entity = E::NAME,
            profile = %key,
            generation = self.profiles.generation(),
            "registered mapping profile"
        );
        Ok(())
    }

    /// Projection from `E` to `D` as an analyzable tree, for query push-down.
    #[must_use]
    pub fn build_projection<D: Shape>(&self) -> Projection {
        let projection = Projection::build::<E, D>(&self.profiles);
        projection.report_unbound(self.config.unbound_policy);
        projection
    }

    fn compiled<D: Shape>(&self) -> CompiledProjection<E, D> {
        self.cache
            .get_or_build(self.profiles.generation(), || self.build_projection::<D>())
    }

    fn compiled_reverse<D: Shape>(&self) -> CompiledProjection<D, E> {
        self.cache.get_or_build(self.profiles.generation(), || {
            let projection = Projection::build_convention::<D, E>();
            projection.report_unbound(self.config.unbound_policy);
            projection
        })
    }

    /// Execute the cached compiled projection against one entity.
    #[must_use]
    pub fn project_now<D: Shape>(&self, entity: &E) -> D {
        self.compiled::<D>().execute(entity)
    }

    #[must_use]
    pub fn map_to_destination<D: Shape>(&self, entity: &E) -> D {
        self.project_now(entity)
    }

    /// Reverse direction: plain name-and-type convention, profiles do not apply.
    #[must_use]
    pub fn map_to_entity<D: Shape>(&self, destination: &D) -> E {
        self.compiled_reverse::<D>().execute(destination)
    }

    /// Lazy, order preserving. The projection is resolved once per call.
    pub fn map_all_to_destination<'a, D, I>(&self, entities: I) -> impl Iterator<Item = D> + 'a
    where
        D: Shape,
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: 'a,
    {
        let compiled = self.compiled::<D>();
        entities
            .into_iter()
            .map(move |entity| compiled.execute(entity))
    }

    pub fn map_all_to_entity<'a, D, I>(&self, destinations: I) -> impl Iterator<Item = E> + 'a
    where
        D: Shape,
        I: IntoIterator<Item = &'a D>,
        I::IntoIter: 'a,
    {
        let compiled = self.compiled_reverse::<D>();
        destinations
            .into_iter()
            .map(move |destination| compiled.execute(destination))
    }

    /// Adapt this engine into a `MappingContract<E, D>`.
    #[must_use]
    pub fn convention<D: Shape>(self: &Arc<Self>) -> ConventionMapper<E, D> {
        ConventionMapper {
            engine: Arc::clone(self),
            _destination: PhantomData,
        }
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileRegistry<E> {
        &self.profiles
    }

    #[must_use]
    pub fn config(&self) -> &MapperConfig {
        &self.config
    }
}

/// Convention-based `MappingContract` backed by a shared `Mapper`.
pub struct ConventionMapper<E: Shape, D: Shape> {
    engine: Arc<Mapper<E>>,
    _destination: PhantomData<fn() -> D>,
}

impl<E: Shape, D: Shape> ConventionMapper<E, D> {
    #[must_use]
    pub fn engine(&self) -> &Arc<Mapper<E>> {
        &self.engine
    }
}

impl<E: Shape, D: Shape> Clone for ConventionMapper<E, D> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            _destination: PhantomData,
        }
    }
}

impl<E: Shape, D: Shape> fmt::Debug for ConventionMapper<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConventionMapper")
            .field("entity", &E::NAME)
            .field("destination", &D::NAME)
            .finish_non_exhaustive()
    }
}

impl<E: Shape, D: Shape> MappingContract<E, D> for ConventionMapper<E, D> {
    fn map_to_destination(&self, entity: &E) -> D {
        self.engine.project_now(entity)
    }

    fn map_to_entity(&self, destination: &D) -> E {
        self.engine.map_to_entity(destination)
    }
}
