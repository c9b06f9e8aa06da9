//! Service and product catalog — shared across accounts.
//!
//! Catalog rows are reference data: the booking flow snapshots the
//! service name and price into each appointment, so edits here never
//! rewrite booking history.

use serde::{Deserialize, Serialize};

use crate::models::{Product, Service};
use crate::store::{
    collections, from_document, to_document, DocumentId, DocumentStore, StoreError,
};

/// Fields supplied when importing services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewService {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_code: Option<String>,
}

/// Fields supplied when importing products.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

pub fn all_services<S: DocumentStore>(store: &S) -> Result<Vec<Service>, StoreError> {
    store
        .list(collections::SERVICES)?
        .iter()
        .map(|doc| from_document(doc))
        .collect()
}

pub fn all_products<S: DocumentStore>(store: &S) -> Result<Vec<Product>, StoreError> {
    store
        .list(collections::PRODUCTS)?
        .iter()
        .map(|doc| from_document(doc))
        .collect()
}

/// Insert a batch of services as a single atomic write.
pub fn add_services_batch<S: DocumentStore>(
    store: &S,
    services: &[NewService],
) -> Result<Vec<DocumentId>, StoreError> {
    let mut bodies = Vec::with_capacity(services.len());
    for service in services {
        let mut body = to_document(service)?;
        // The color code doubles as the agenda display class.
        if let Some(code) = &service.color_code {
            body.insert(
                "colorClassName".into(),
                serde_json::Value::String(code.clone()),
            );
        }
        bodies.push(body);
    }

    let ids = store.insert_many(collections::SERVICES, bodies)?;
    tracing::info!(count = ids.len(), "imported services");
    Ok(ids)
}

/// Insert a batch of products as a single atomic write.
pub fn add_products_batch<S: DocumentStore>(
    store: &S,
    products: &[NewProduct],
) -> Result<Vec<DocumentId>, StoreError> {
    let bodies = products
        .iter()
        .map(to_document)
        .collect::<Result<Vec<_>, _>>()?;

    let ids = store.insert_many(collections::PRODUCTS, bodies)?;
    tracing::info!(count = ids.len(), "imported products");
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn service_import_derives_the_display_class() {
        let store = MemoryStore::new();

        add_services_batch(
            &store,
            &[
                NewService {
                    name: "Tonte de pelouse".into(),
                    category: "Jardin".into(),
                    sub_category: None,
                    description: Some("Tonte et ramassage".into()),
                    rate: Some("45".into()),
                    unit: Some("heure".into()),
                    price: Some(45.0),
                    color_code: Some("bg-green-500".into()),
                },
                NewService {
                    name: "Taille de haie".into(),
                    category: "Jardin".into(),
                    sub_category: None,
                    description: None,
                    rate: None,
                    unit: None,
                    price: None,
                    color_code: None,
                },
            ],
        )
        .unwrap();

        let mut services = all_services(&store).unwrap();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(services.len(), 2);

        let haie = &services[0];
        assert_eq!(haie.name, "Taille de haie");
        assert_eq!(haie.color_class_name, None);

        let tonte = &services[1];
        assert_eq!(tonte.color_class_name.as_deref(), Some("bg-green-500"));
        assert_eq!(tonte.price, Some(45.0));
        assert!(!tonte.id.is_empty());
    }

    #[test]
    fn product_import_roundtrip() {
        let store = MemoryStore::new();

        add_products_batch(
            &store,
            &[NewProduct {
                name: "Engrais gazon".into(),
                code: "ENG-01".into(),
                category: "Jardin".into(),
                sub_category: Some("Entretien".into()),
                price: Some(12.5),
            }],
        )
        .unwrap();

        let products = all_products(&store).unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].code, "ENG-01");
        assert_eq!(products[0].price, Some(12.5));
    }

    #[test]
    fn empty_catalog_lists_are_empty() {
        let store = MemoryStore::new();
        assert!(all_services(&store).unwrap().is_empty());
        assert!(all_products(&store).unwrap().is_empty());
    }
}
