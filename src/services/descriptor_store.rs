use std::collections::HashMap;

use parking_lot::RwLock;

use crate::models::TableDescriptor;

/// Persistence seam for table descriptors, keyed by stored file name.
pub trait DescriptorStore: Send + Sync {
    fn get(&self, key: &str) -> Option<TableDescriptor>;
    fn put(&self, key: &str, descriptor: TableDescriptor);
    fn remove(&self, key: &str) -> Option<TableDescriptor>;
}

#[derive(Debug, Default)]
pub struct MemoryDescriptorStore {
    descriptors: RwLock<HashMap<String, TableDescriptor>>,
}

impl MemoryDescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.descriptors.read().len()
    }
}

impl DescriptorStore for MemoryDescriptorStore {
    fn get(&self, key: &str) -> Option<TableDescriptor> {
        self.descriptors.read().get(key).cloned()
    }

    fn put(&self, key: &str, descriptor: TableDescriptor) {
        tracing::debug!("Storing descriptor for {} ({} rows)", key, descriptor.total_rows);
        self.descriptors.write().insert(key.to_string(), descriptor);
    }

    fn remove(&self, key: &str) -> Option<TableDescriptor> {
        self.descriptors.write().remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let store = MemoryDescriptorStore::new();
        assert!(store.get("a.xlsx").is_none());

        store.put("a.xlsx", TableDescriptor::blank(3));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a.xlsx").unwrap().columns, vec!["A", "B", "C"]);

        store.put("a.xlsx", TableDescriptor::degraded());
        assert!(store.get("a.xlsx").unwrap().is_degraded());

        assert!(store.remove("a.xlsx").is_some());
        assert_eq!(store.len(), 0);
    }
}
