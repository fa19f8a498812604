//! Cache View Module
//!
//! A typed facade composing a raw engine with a key converter and a value
//! converter. Several views with different converters can share one engine.

use crate::cache::{DiskCache, ItemMetadata};
use crate::convert::converters::{KeyConverter, ValueConverter};
use crate::error::Result;

/// A typed item as seen through a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedItem<V> {
    pub value: V,
    pub metadata: ItemMetadata,
}

// == Cache View ==
/// Typed `has`/`get`/`set`/`delete`/`keys` over a borrowed [`DiskCache`].
pub struct CacheView<'a, KC, VC> {
    cache: &'a DiskCache,
    key_converter: KC,
    value_converter: VC,
}

impl<'a, KC, VC> CacheView<'a, KC, VC>
where
    KC: KeyConverter,
    VC: ValueConverter,
{
    // == Constructor ==
    pub fn new(cache: &'a DiskCache, key_converter: KC, value_converter: VC) -> Self {
        Self {
            cache,
            key_converter,
            value_converter,
        }
    }

    // == Has ==
    pub fn has(&self, key: &KC::Key) -> Result<bool> {
        self.cache.has(&self.key_converter.to_raw(key))
    }

    // == Get ==
    pub async fn get(&self, key: &KC::Key) -> Result<Option<TypedItem<VC::Value>>> {
        let raw = self.key_converter.to_raw(key);
        let Some(item) = self.cache.get(&raw).await? else {
            return Ok(None);
        };

        Ok(Some(TypedItem {
            value: self.value_converter.from_bytes(&item.value)?,
            metadata: item.metadata,
        }))
    }

    // == Set ==
    pub async fn set(
        &self,
        key: &KC::Key,
        value: &VC::Value,
        time_to_live: Option<i64>,
        time_before_deletion: Option<i64>,
    ) -> Result<()> {
        let raw_key = self.key_converter.to_raw(key);
        let raw_value = self.value_converter.to_bytes(value)?;
        self.cache
            .set(&raw_key, &raw_value, time_to_live, time_before_deletion)
            .await
    }

    // == Delete ==
    pub async fn delete(&self, key: &KC::Key) -> Result<()> {
        self.cache.delete(&self.key_converter.to_raw(key)).await
    }

    // == Clear ==
    pub async fn clear(&self) -> Result<()> {
        self.cache.clear().await
    }

    // == Keys ==
    /// Stored keys representable by the key converter; raw keys the
    /// converter cannot parse are filtered out.
    pub fn keys(&self) -> Result<Vec<KC::Key>> {
        Ok(self
            .cache
            .keys()?
            .iter()
            .filter_map(|raw| self.key_converter.from_raw(raw))
            .collect())
    }
}
