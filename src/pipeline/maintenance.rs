// file: src/pipeline/maintenance.rs
// description: best-effort namespace delete and fetch helpers
// reference: internal maintenance operations

use crate::models::VectorRecord;
use crate::vector::VectorStore;
use tracing::{error, info};

pub struct NamespaceMaintenance<'a> {
    store: &'a dyn VectorStore,
}

impl<'a> NamespaceMaintenance<'a> {
    pub fn new(store: &'a dyn VectorStore) -> Self {
        Self { store }
    }

    /// Failures are logged and reported as `false`.
    pub async fn delete(&self, namespace: &str, ids: &[String]) -> bool {
        match self.store.delete_many(namespace, ids).await {
            Ok(()) => {
                info!("Deleted {} records from namespace '{}'", ids.len(), namespace);
                true
            }
            Err(e) => {
                error!("Error deleting records: {}", e);
                false
            }
        }
    }

    /// Failures are logged and reported as `None`.
    pub async fn fetch(&self, namespace: &str, ids: &[String]) -> Option<Vec<VectorRecord>> {
        match self.store.fetch(namespace, ids).await {
            Ok(records) => Some(records),
            Err(e) => {
                error!("Error getting records: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockVectorStore;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_delete_forwards_ids() {
        let store = MockVectorStore::new();
        let maintenance = NamespaceMaintenance::new(&store);

        assert!(maintenance.delete("users", &ids(&["1", "2"])).await);
        assert_eq!(
            store.deletes(),
            vec![("users".to_string(), ids(&["1", "2"]))]
        );
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let store = MockVectorStore::new().failing_maintenance();
        let maintenance = NamespaceMaintenance::new(&store);

        assert!(!maintenance.delete("users", &ids(&["1"])).await);
        assert!(maintenance.fetch("users", &ids(&["1"])).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_missing_ids_is_empty() {
        let store = MockVectorStore::new();
        let maintenance = NamespaceMaintenance::new(&store);

        let records = maintenance.fetch("users", &ids(&["404"])).await.unwrap();
        assert!(records.is_empty());
    }
}
