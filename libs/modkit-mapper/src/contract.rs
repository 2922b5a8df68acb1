//! Mapping contracts and capability narrowing.
//!
//! `MappingContract` is the base two-way mapping between an entity and an
//! external shape. Richer contracts (such as `RelationAwareMapping`) are exposed
//! as capabilities on a `ContractHandle`, so a caller holding the base contract
//! can ask for the richer one and get a typed error when it is not available.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::errors::NarrowError;

/// Two-way mapping between entity `E` and external shape `D`.
///
/// Both directions are total: missing or mismatched data produces default
/// values, never an error.
pub trait MappingContract<E, D>: Send + Sync {
    fn map_to_destination(&self, entity: &E) -> D;

    fn map_to_entity(&self, destination: &D) -> E;
}

/// Lazy batch variants of `MappingContract`, available on every contract
/// including `dyn MappingContract`.
pub trait MappingContractExt<E, D>: MappingContract<E, D> {
    /// Element-wise, order preserving, evaluated as the iterator is consumed.
    fn map_all_to_destination<'a, I>(&'a self, entities: I) -> impl Iterator<Item = D> + 'a
    where
        I: IntoIterator<Item = &'a E>,
        I::IntoIter: 'a,
        E: 'a,
        D: 'a,
    {
        entities
            .into_iter()
            .map(move |entity| self.map_to_destination(entity))
    }

    fn map_all_to_entity<'a, I>(&'a self, destinations: I) -> impl Iterator<Item = E> + 'a
    where
        I: IntoIterator<Item = &'a D>,
        I::IntoIter: 'a,
        E: 'a,
        D: 'a,
    {
        destinations
            .into_iter()
            .map(move |destination| self.map_to_entity(destination))
    }
}

impl<E, D, T: MappingContract<E, D> + ?Sized> MappingContractExt<E, D> for T {}

/// Mapping of aggregates whose reverse direction can skip relation collections.
pub trait RelationAwareMapping<E, D>: MappingContract<E, D> {
    /// `include_relations == false` leaves relation collections empty.
    fn map_to_entity_with(&self, destination: &D, include_relations: bool) -> E;
}

pub trait RelationAwareMappingExt<E, D>: RelationAwareMapping<E, D> {
    fn map_all_to_entity_with<'a, I>(
        &'a self,
        destinations: I,
        include_relations: bool,
    ) -> impl Iterator<Item = E> + 'a
    where
        I: IntoIterator<Item = &'a D>,
        I::IntoIter: 'a,
        E: 'a,
        D: 'a,
    {
        destinations
            .into_iter()
            .map(move |destination| self.map_to_entity_with(destination, include_relations))
    }
}

impl<E, D, T: RelationAwareMapping<E, D> + ?Sized> RelationAwareMappingExt<E, D> for T {}

/// A mapping contract plus the richer contracts it can be narrowed to.
///
/// Capabilities are keyed by the `TypeId` of the trait object type `C` and
/// stored as `Arc<C>`, so narrowing is a table lookup and a downcast.
///
/// Capabilities are never discovered: a mapper that implements
/// `RelationAwareMapping` is only narrowable to it after `with_capability`.
/// Aggregate mappers therefore expose a constructor (such as the catalog's
/// `ProductMapper::handle`) that registers their capabilities, and callers
/// should obtain handles from it rather than from `new` / `from_arc`.
///
/// ```rust,ignore
/// let handle = ContractHandle::from_arc(mapper.clone())
///     .with_capability::<dyn RelationAwareMapping<Product, ProductDto>>(mapper);
/// let relations = handle.narrow_to::<dyn RelationAwareMapping<Product, ProductDto>>()?;
/// ```
pub struct ContractHandle<E, D> {
    name: &'static str,
    contract: Arc<dyn MappingContract<E, D>>,
    capabilities: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl<E: 'static, D: 'static> ContractHandle<E, D> {
    #[must_use]
    pub fn new<M>(contract: M) -> Self
    where
        M: MappingContract<E, D> + 'static,
    {
        Self::from_arc(Arc::new(contract))
    }

    /// Wrap a shared contract. The base contract is always registered as a
    /// capability of itself; richer contracts need `with_capability`.
    #[must_use]
    pub fn from_arc<M>(contract: Arc<M>) -> Self
    where
        M: MappingContract<E, D> + 'static,
    {
        let base: Arc<dyn MappingContract<E, D>> = contract;
        let mut capabilities: HashMap<TypeId, Arc<dyn Any + Send + Sync>> = HashMap::new();
        capabilities.insert(
            TypeId::of::<dyn MappingContract<E, D>>(),
            Arc::new(Arc::clone(&base)),
        );
        Self {
            name: std::any::type_name::<M>(),
            contract: base,
            capabilities,
        }
    }

    /// Register `capability` as the implementation of contract `C`.
    #[must_use]
    pub fn with_capability<C>(mut self, capability: Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities
            .insert(TypeId::of::<C>(), Arc::new(capability));
        self
    }

    #[must_use]
    pub fn try_as<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities
            .get(&TypeId::of::<C>())
            .and_then(|stored| (**stored).downcast_ref::<Arc<C>>())
            .cloned()
    }

    /// Narrow to contract `C`.
    ///
    /// # Errors
    /// Returns `NarrowError` naming `C` when the wrapped mapper does not
    /// implement it.
    pub fn narrow_to<C>(&self) -> Result<Arc<C>, NarrowError>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.try_as::<C>()
            .ok_or_else(|| NarrowError::new::<C>(self.name))
    }

    #[must_use]
    pub fn supports<C>(&self) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.capabilities.contains_key(&TypeId::of::<C>())
    }

    #[must_use]
    pub fn contract(&self) -> &Arc<dyn MappingContract<E, D>> {
        &self.contract
    }

    /// Type name of the wrapped mapper.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, D> Clone for ContractHandle<E, D> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            contract: Arc::clone(&self.contract),
            capabilities: self.capabilities.clone(),
        }
    }
}

impl<E, D> Deref for ContractHandle<E, D> {
    type Target = dyn MappingContract<E, D>;

    fn deref(&self) -> &Self::Target {
        self.contract.as_ref()
    }
}

impl<E, D> fmt::Debug for ContractHandle<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Node {
        id: i64,
        children: Vec<i64>,
    }

    #[derive(Debug, Default, PartialEq)]
    struct NodeDto {
        id: i64,
        children: Vec<i64>,
    }

    struct NodeMapper;

    impl MappingContract<Node, NodeDto> for NodeMapper {
        fn map_to_destination(&self, entity: &Node) -> NodeDto {
            NodeDto {
                id: entity.id,
                children: entity.children.clone(),
            }
        }

        fn map_to_entity(&self, destination: &NodeDto) -> Node {
            self.map_to_entity_with(destination, true)
        }
    }

    impl RelationAwareMapping<Node, NodeDto> for NodeMapper {
        fn map_to_entity_with(&self, destination: &NodeDto, include_relations: bool) -> Node {
            Node {
                id: destination.id,
                children: if include_relations {
                    destination.children.clone()
                } else {
                    Vec::new()
                },
            }
        }
    }

    fn handle() -> ContractHandle<Node, NodeDto> {
        let mapper = Arc::new(NodeMapper);
        ContractHandle::from_arc(Arc::clone(&mapper))
            .with_capability::<dyn RelationAwareMapping<Node, NodeDto>>(mapper)
    }

    #[test]
    fn narrow_to_registered_capability_succeeds() {
        let handle = handle();
        let dto = NodeDto {
            id: 3,
            children: vec![4, 5],
        };

        let relations = handle
            .narrow_to::<dyn RelationAwareMapping<Node, NodeDto>>()
            .unwrap();

        assert_eq!(relations.map_to_entity_with(&dto, false).children, Vec::<i64>::new());
        assert_eq!(relations.map_to_entity_with(&dto, true).children, vec![4, 5]);
    }

    #[test]
    fn narrow_to_missing_capability_names_requested_contract() {
        let handle = handle();

        let Err(err) = handle.narrow_to::<dyn fmt::Display + Send + Sync>() else {
            panic!("narrowing to an unregistered contract must fail");
        };

        assert!(err.requested.contains("Display"));
        assert!(err.contract.contains("NodeMapper"));
        assert!(handle.try_as::<dyn fmt::Display + Send + Sync>().is_none());
    }

    #[test]
    fn base_contract_is_always_available() {
        let handle = handle();

        assert!(handle.supports::<dyn MappingContract<Node, NodeDto>>());
        assert!(handle.narrow_to::<dyn MappingContract<Node, NodeDto>>().is_ok());
    }

    #[test]
    fn batch_variants_are_lazy_and_ordered() {
        let handle = handle();
        let nodes = [
            Node {
                id: 1,
                children: vec![],
            },
            Node {
                id: 2,
                children: vec![9],
            },
        ];

        let mut dtos = handle.map_all_to_destination(&nodes);
        assert_eq!(dtos.next().map(|d| d.id), Some(1));
        assert_eq!(dtos.next().map(|d| d.id), Some(2));
        assert!(dtos.next().is_none());

        let empty: Vec<NodeDto> = handle.map_all_to_destination(&[]).collect();
        assert!(empty.is_empty());
    }
}
