//! Unique slug allocation against the listing store.

use std::sync::Arc;

use estate_core::error::CoreError;
use estate_core::ports::CatalogStore;
use estate_core::slug::{slugify, with_suffix};
use estate_core::types::DbId;

pub struct SlugAllocator {
    store: Arc<dyn CatalogStore>,
}

impl SlugAllocator {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    /// Derive a slug from `title` that no listing other than `exclude_id`
    /// holds, appending `-1`, `-2`, ... to the base until one is free.
    ///
    /// Two concurrent allocations can return the same candidate; the store's
    /// unique constraint rejects the second write and the caller retries.
    pub async fn allocate(&self, title: &str, exclude_id: Option<DbId>) -> Result<String, CoreError> {
        let base = slugify(title);
        if !self.store.slug_exists(&base, exclude_id).await? {
            return Ok(base);
        }

        let mut n = 1u32;
        loop {
            let candidate = with_suffix(&base, n);
            if !self.store.slug_exists(&candidate, exclude_id).await? {
                tracing::debug!(base = %base, slug = %candidate, "Slug suffixed");
                return Ok(candidate);
            }
            n = n
                .checked_add(1)
                .ok_or_else(|| CoreError::Internal(format!("slug space exhausted for '{base}'")))?;
        }
    }
}
