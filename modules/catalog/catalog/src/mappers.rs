//! Mapper wiring for the catalog module.

use std::sync::Arc;

use anyhow::Context;
use catalog_sdk::{CategoryDto, ProductDto};
use figment::Figment;
use modkit_mapper::push_down::{PushDownResult, select_projection};
use modkit_mapper::{ContractHandle, Expr, Mapper, MapperError, Shape, Transform};
use rust_decimal::Decimal;
use sea_orm::Select;

use crate::config::{CatalogConfig, ScoreRounding};
use crate::domain::{Category, Product};
use crate::infra::mapper::{ProductMapper, category_handle};
use crate::infra::storage::entity::product;

fn score_transform(rounding: ScoreRounding) -> Transform {
    let param = Expr::param();
    let whole = match rounding {
        ScoreRounding::Round => param.round(),
        ScoreRounding::Floor => param.floor(),
        ScoreRounding::Ceil => param.ceil(),
    };
    Transform::new::<Decimal, i64>(whole.to_i64())
}

/// The catalog's mapping engines and contract handles, built once at startup.
#[derive(Debug, Clone)]
pub struct CatalogMappers {
    product_engine: Arc<Mapper<Product>>,
    category_engine: Arc<Mapper<Category>>,
    products: ContractHandle<Product, ProductDto>,
    categories: ContractHandle<Category, CategoryDto>,
}

impl CatalogMappers {
    /// Register the catalog profiles and build the contract handles.
    ///
    /// # Errors
    /// Returns `MapperError::Configuration` if a profile does not fit the
    /// product shape.
    pub fn new(config: &CatalogConfig) -> Result<Self, MapperError> {
        let mut product_engine = Mapper::<Product>::new(config.mapper.clone());
        product_engine.register_profile("score", score_transform(config.score_rounding))?;
        product_engine.register_profile(
            "price",
            Transform::new::<Decimal, f64>(Expr::param().to_f64()),
        )?;
        let product_engine = Arc::new(product_engine);
        let category_engine = Arc::new(Mapper::<Category>::new(config.mapper.clone()));

        let products = Arc::new(ProductMapper::new(Arc::clone(&product_engine))).handle();
        let categories = category_handle(&category_engine);

        tracing::info!(
            profiles = product_engine.profiles().len(),
            score_rounding = ?config.score_rounding,
            "catalog mappers ready"
        );

        Ok(Self {
            product_engine,
            category_engine,
            products,
            categories,
        })
    }

    /// Load `CatalogConfig` from `figment` and build the mappers.
    ///
    /// # Errors
    /// Fails when the `catalog` section is invalid or a profile is rejected.
    pub fn from_figment(figment: &Figment) -> anyhow::Result<Self> {
        let config = CatalogConfig::from_figment(figment).context("loading catalog config")?;
        Self::new(&config).context("registering catalog mapping profiles")
    }

    #[must_use]
    pub fn products(&self) -> &ContractHandle<Product, ProductDto> {
        &self.products
    }

    #[must_use]
    pub fn categories(&self) -> &ContractHandle<Category, CategoryDto> {
        &self.categories
    }

    /// Shared convention engine for product list views.
    #[must_use]
    pub fn product_engine(&self) -> &Arc<Mapper<Product>> {
        &self.product_engine
    }

    #[must_use]
    pub fn category_engine(&self) -> &Arc<Mapper<Category>> {
        &self.category_engine
    }

    /// Project one product into a list view such as `ProductSummary`.
    #[must_use]
    pub fn product_view<D: Shape>(&self, product: &Product) -> D {
        self.product_engine.project_now(product)
    }

    /// `SELECT` over the product table producing the columns of view `D`.
    ///
    /// # Errors
    /// Returns `PushDownError` when a binding does not map to a product column.
    pub fn product_view_query<D: Shape>(&self) -> PushDownResult<Select<product::Entity>> {
        select_projection::<product::Entity>(&self.product_engine.build_projection::<D>())
    }
}
