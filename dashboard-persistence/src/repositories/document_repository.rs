use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::warn;

use crate::entities::{documents, prelude::*};
use dashboard_core::{Document, DocumentStore, FieldFilter, StoreError};

/// Document store backed by a single SQL table, keyed by collection and id.
pub struct DocumentRepository {
    db: DatabaseConnection,
}

impl DocumentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_document(model: documents::Model) -> Result<Document, StoreError> {
        let data = serde_json::from_str(&model.data).map_err(|e| StoreError::Corrupt {
            collection: model.collection.clone(),
            id: model.doc_id.clone(),
            reason: e.to_string(),
        })?;
        Ok(Document::new(model.doc_id, data))
    }

    fn backend_error(e: DbErr) -> StoreError {
        StoreError::Backend(e.to_string())
    }

    async fn rows(&self, collection: &str) -> Result<Vec<documents::Model>, StoreError> {
        Documents::find()
            .filter(documents::Column::Collection.eq(collection))
            .order_by_asc(documents::Column::Pk)
            .all(&self.db)
            .await
            .map_err(Self::backend_error)
    }

    /// Every document in `collection`, oldest first. Fails on the first
    /// payload that is not valid JSON.
    pub async fn find_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.rows(collection)
            .await?
            .into_iter()
            .map(Self::model_to_document)
            .collect()
    }

    /// Insert or overwrite a document. Overwrites keep the original position.
    pub async fn put_document(&self, collection: &str, document: Document) -> Result<()> {
        let data = serde_json::to_string(&document.data)?;
        let now = chrono::Utc::now();

        let existing = Documents::find()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::DocId.eq(document.id.as_str()))
            .one(&self.db)
            .await?;

        match existing {
            Some(model) => {
                let mut active: documents::ActiveModel = model.into();
                active.data = ActiveValue::Set(data);
                active.updated_at = ActiveValue::Set(now.into());
                active.update(&self.db).await?;
            }
            None => {
                let active = documents::ActiveModel {
                    pk: ActiveValue::NotSet,
                    collection: ActiveValue::Set(collection.to_string()),
                    doc_id: ActiveValue::Set(document.id),
                    data: ActiveValue::Set(data),
                    created_at: ActiveValue::Set(now.into()),
                    updated_at: ActiveValue::Set(now.into()),
                };
                Documents::insert(active).exec(&self.db).await?;
            }
        }

        Ok(())
    }

    pub async fn delete_document(&self, collection: &str, id: &str) -> Result<bool> {
        let result = Documents::delete_many()
            .filter(documents::Column::Collection.eq(collection))
            .filter(documents::Column::DocId.eq(id))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected > 0)
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        let count = Documents::find()
            .filter(documents::Column::Collection.eq(collection))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn query(
        &self,
        collection: &str,
        filter: Option<&FieldFilter>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut documents = Vec::new();

        // A payload that is not JSON cannot match any filter, so skip it
        for model in self.rows(collection).await? {
            match Self::model_to_document(model) {
                Ok(document) if filter.is_none_or(|f| f.matches(&document)) => {
                    documents.push(document)
                }
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable document: {}", e),
            }
        }

        Ok(documents)
    }
}
