use serde_json::Value;
use std::sync::Arc;

use super::source::LocalMirror;
use crate::error::ClientResult;
use crate::resource::Collection;
use crate::store::{get_json, set_json, KeyValueStore};

/// Mirror kept in the durable key-value store, one JSON array per collection.
#[derive(Clone)]
pub struct StoreMirror {
  store: Arc<dyn KeyValueStore>,
}

impl StoreMirror {
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self { store }
  }
}

impl LocalMirror for StoreMirror {
  fn records(&self, collection: Collection) -> ClientResult<Vec<Value>> {
    Ok(get_json(self.store.as_ref(), collection.cache_key())?.unwrap_or_default())
  }

  fn append(&self, collection: Collection, record: Value) -> ClientResult<()> {
    let mut records = self.records(collection)?;
    records.push(record);
    set_json(self.store.as_ref(), collection.cache_key(), &records)
  }
}
