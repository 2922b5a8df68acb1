//! Aggregate mappers between catalog entities and external shapes.
//!
//! Scalar fields go through the shared convention engine; relation collections
//! are handled here because they change structure between the two sides: join
//! rows on the entity, flat `IdName` lists on the external shape.

use std::sync::Arc;

use catalog_sdk::{CategoryDto, IdName, ProductDto};
use modkit_mapper::{
    ContractHandle, ConventionMapper, Mapper, MappingContract, RelationAwareMapping,
};

use crate::domain::{Category, Product, ProductCategory, ProductTag};

/// Hand-written mapper for the product aggregate.
#[derive(Debug, Clone)]
pub struct ProductMapper {
    scalars: Arc<Mapper<Product>>,
}

impl ProductMapper {
    #[must_use]
    pub fn new(scalars: Arc<Mapper<Product>>) -> Self {
        Self { scalars }
    }

    /// Contract handle advertising the `RelationAwareMapping` capability.
    ///
    /// Use this instead of `ContractHandle::from_arc`, which registers the
    /// base contract only.
    #[must_use]
    pub fn handle(self: Arc<Self>) -> ContractHandle<Product, ProductDto> {
        ContractHandle::from_arc(Arc::clone(&self))
            .with_capability::<dyn RelationAwareMapping<Product, ProductDto>>(self)
    }
}

impl MappingContract<Product, ProductDto> for ProductMapper {
    fn map_to_destination(&self, entity: &Product) -> ProductDto {
        let mut dto: ProductDto = self.scalars.project_now(entity);
        dto.categories = entity
            .categories
            .iter()
            .map(|link| IdName {
                id: link.category_id,
                name: link
                    .category
                    .as_ref()
                    .map(|c| c.name.clone())
                    .unwrap_or_default(),
            })
            .collect();
        dto.tags = entity
            .tags
            .iter()
            .map(|link| IdName {
                id: link.tag_id,
                name: link.tag.as_ref().map(|t| t.name.clone()).unwrap_or_default(),
            })
            .collect();
        dto
    }

    fn map_to_entity(&self, destination: &ProductDto) -> Product {
        self.map_to_entity_with(destination, true)
    }
}

impl RelationAwareMapping<Product, ProductDto> for ProductMapper {
    fn map_to_entity_with(&self, destination: &ProductDto, include_relations: bool) -> Product {
        let mut product = self.scalars.map_to_entity(destination);
        if !include_relations {
            return product;
        }
        // join rows carry ids only; related records are resolved by storage
        product.categories = destination
            .categories
            .iter()
            .map(|c| ProductCategory {
                product_id: product.id,
                category_id: c.id,
                category: None,
            })
            .collect();
        product.tags = destination
            .tags
            .iter()
            .map(|t| ProductTag {
                product_id: product.id,
                tag_id: t.id,
                tag: None,
            })
            .collect();
        product
    }
}

/// Categories have no relations to reconcile: pure convention.
pub type CategoryMapper = ConventionMapper<Category, CategoryDto>;

/// Base-contract-only handle for categories.
#[must_use]
pub fn category_handle(engine: &Arc<Mapper<Category>>) -> ContractHandle<Category, CategoryDto> {
    ContractHandle::new(engine.convention::<CategoryDto>())
}
