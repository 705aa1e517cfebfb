use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use super::{ListQuery, Record, Resource};
use crate::db::{DocumentQuery, DocumentStore, NewDocument, StoreError, StoredDocument};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

/// Typed view of one entity type inside a [`DocumentStore`].
pub struct Collection<R> {
    store: Arc<dyn DocumentStore>,
    _marker: PhantomData<fn() -> R>,
}

impl<R> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _marker: PhantomData,
        }
    }
}

impl<R: Resource> Collection<R> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _marker: PhantomData,
        }
    }

    /// Translates API filters into a store query. Results are unpaginated
    /// unless `page` or `limit` is given.
    pub fn document_query(query: &ListQuery) -> DocumentQuery {
        let mut doc_query = DocumentQuery {
            search: query.search.clone(),
            search_fields: R::search_fields(),
            sort: R::sort_order(),
            ..DocumentQuery::default()
        };

        if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
            doc_query = doc_query.with_equals("status", status);
        }
        if let Some(period_id) = query.period_id.as_deref().filter(|s| !s.is_empty()) {
            doc_query = doc_query.with_equals("periodId", period_id);
        }
        if let Some(category_id) = query.category_id.as_deref().filter(|s| !s.is_empty()) {
            doc_query = doc_query.with_equals("categoryId", category_id);
        }
        if let Some(type_id) = query.type_id.as_deref().filter(|s| !s.is_empty()) {
            doc_query = doc_query.with_equals("typeId", type_id);
        }

        if query.page.is_some() || query.limit.is_some() {
            let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
            let page = query.page.unwrap_or(1).max(1);
            doc_query.limit = Some(i64::from(limit));
            doc_query.offset = i64::from(page - 1) * i64::from(limit);
        }

        doc_query
    }

    pub async fn find(&self, query: &ListQuery) -> Result<Vec<Record<R>>, StoreError> {
        let docs = self
            .store
            .find(R::ENTITY_TYPE, &Self::document_query(query))
            .await?;
        docs.into_iter().map(decode).collect()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Record<R>>, StoreError> {
        self.store
            .find_by_id(R::ENTITY_TYPE, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn create(&self, data: R) -> Result<Record<R>, StoreError> {
        let doc = encode(&data)?;
        decode(self.store.create(R::ENTITY_TYPE, doc).await?)
    }

    pub async fn update(&self, id: Uuid, data: R) -> Result<Option<Record<R>>, StoreError> {
        let doc = encode(&data)?;
        self.store
            .update(R::ENTITY_TYPE, id, doc)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(R::ENTITY_TYPE, id).await
    }

    pub async fn count(&self, query: &ListQuery) -> Result<i64, StoreError> {
        self.store
            .count(R::ENTITY_TYPE, &Self::document_query(query))
            .await
    }

    pub async fn group_by(
        &self,
        field: &str,
        query: &ListQuery,
    ) -> Result<BTreeMap<String, i64>, StoreError> {
        self.store
            .group_by(R::ENTITY_TYPE, field, &Self::document_query(query))
            .await
    }
}

fn encode<R: Resource>(data: &R) -> Result<NewDocument, StoreError> {
    Ok(NewDocument {
        unique_key: data.unique_key(),
        data: serde_json::to_value(data)?,
    })
}

fn decode<R: Resource>(doc: StoredDocument) -> Result<Record<R>, StoreError> {
    Ok(Record {
        id: doc.id,
        data: serde_json::from_value(doc.data)?,
        created_at: doc.created_at,
        updated_at: doc.updated_at,
    })
}
