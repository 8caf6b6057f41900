use anyhow::Result;
use std::collections::HashMap;
use std::sync::Mutex;

/// A whole document together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredDocument {
    pub revision: i64,
    pub body: String,
}

/// Whole-document storage. There are no partial updates: callers read a
/// document, modify it and write it back conditionally on its revision.
pub trait DocumentDb: Send + Sync {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>>;

    /// Writes `body` if the stored revision still equals `expected_revision`
    /// (`None` meaning the document must not exist yet). Returns false when
    /// another writer got there first; the revision is bumped on success.
    fn compare_and_set(
        &self,
        doc_id: &str,
        expected_revision: Option<i64>,
        body: &str,
    ) -> Result<bool>;
}

/// Process-local document storage, lost on restart.
#[derive(Default)]
pub struct InMemoryDocumentDb {
    documents: Mutex<HashMap<String, StoredDocument>>,
}

impl InMemoryDocumentDb {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentDb for InMemoryDocumentDb {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>> {
        Ok(self.documents.lock().unwrap().get(doc_id).cloned())
    }

    fn compare_and_set(
        &self,
        doc_id: &str,
        expected_revision: Option<i64>,
        body: &str,
    ) -> Result<bool> {
        let mut documents = self.documents.lock().unwrap();
        let current_revision = documents.get(doc_id).map(|d| d.revision);
        if current_revision != expected_revision {
            return Ok(false);
        }
        documents.insert(
            doc_id.to_string(),
            StoredDocument {
                revision: current_revision.unwrap_or(0) + 1,
                body: body.to_string(),
            },
        );
        Ok(true)
    }
}
