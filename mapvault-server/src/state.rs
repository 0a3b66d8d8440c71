//! Application state shared across handlers.

use std::sync::Arc;

use mapvault_core::{AnnotationStore, BlobStore, CredentialStore, FileRecordStore};
use mapvault_data::{Ingestor, RetrievalPolicy, Retriever};

/// Handles to every store plus the ingestion and retrieval paths.
#[derive(Clone)]
pub struct AppState {
    /// Uploaded-file records.
    pub files: Arc<dyn FileRecordStore>,
    /// Markers and shapes.
    pub annotations: Arc<dyn AnnotationStore>,
    /// Bearer-token digests.
    pub credentials: Arc<dyn CredentialStore>,
    /// Upload ingestion coordinator.
    pub ingestor: Ingestor,
    /// Stored-file retrieval path.
    pub retriever: Retriever,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ingestor", &self.ingestor)
            .field("retriever", &self.retriever)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Build state over one record store backing files, annotations and
    /// credentials, and a blob store for raw bytes.
    pub fn new<S>(
        blobs: Arc<dyn BlobStore>,
        records: Arc<S>,
        max_upload_bytes: usize,
        retrieval_policy: RetrievalPolicy,
    ) -> Self
    where
        S: FileRecordStore + AnnotationStore + CredentialStore + 'static,
    {
        let files: Arc<dyn FileRecordStore> = records.clone();
        let ingestor = Ingestor::new(blobs.clone(), files.clone()).with_max_bytes(max_upload_bytes);
        let retriever = Retriever::new(blobs, files.clone(), retrieval_policy);
        Self {
            files,
            annotations: records.clone(),
            credentials: records,
            ingestor,
            retriever,
        }
    }
}
