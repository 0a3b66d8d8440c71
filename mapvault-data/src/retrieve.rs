//! Read uploaded bytes back by storage name.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use mapvault_core::{BlobError, BlobStore, FileRecordStore, OwnerId, StorageName, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Who may fetch a stored file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetrievalPolicy {
    /// Only the uploader; everyone else sees `NotFound`.
    #[default]
    OwnerOnly,
    /// Any authenticated caller may fetch any storage name.
    AnyAuthenticated,
}

impl RetrievalPolicy {
    fn as_str(self) -> &'static str {
        match self {
            Self::OwnerOnly => "owner-only",
            Self::AnyAuthenticated => "any-authenticated",
        }
    }
}

impl fmt::Display for RetrievalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised retrieval policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown retrieval policy '{0}'; expected owner-only or any-authenticated")]
pub struct ParsePolicyError(String);

impl FromStr for RetrievalPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner-only" => Ok(Self::OwnerOnly),
            "any-authenticated" => Ok(Self::AnyAuthenticated),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

/// How retrieved bytes should be labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDesignation {
    /// Structured JSON (`.geojson`).
    Json,
    /// Opaque bytes.
    Unspecified,
}

impl ContentDesignation {
    /// MIME type for the designation.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Unspecified => "application/octet-stream",
        }
    }
}

/// Bytes of a stored upload together with their designation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievedFile {
    /// Storage name the bytes were fetched under.
    pub name: StorageName,
    /// Raw content.
    pub bytes: Vec<u8>,
    /// Content designation derived from the name.
    pub designation: ContentDesignation,
}

/// Retrieval failures.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// No such file, or not visible to the caller.
    #[error("File not found")]
    NotFound,
    /// The metadata store failed.
    #[error("failed to look up file metadata: {source}")]
    Store {
        /// Store failure.
        #[source]
        source: StoreError,
    },
    /// The blob area failed.
    #[error("failed to read file content: {source}")]
    Blob {
        /// Blob failure.
        #[source]
        source: BlobError,
    },
}

/// Retrieval path shared by every request.
#[derive(Clone)]
pub struct Retriever {
    blobs: Arc<dyn BlobStore>,
    records: Arc<dyn FileRecordStore>,
    policy: RetrievalPolicy,
}

impl fmt::Debug for Retriever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retriever")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Retriever {
    /// Retriever over the given stores.
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn FileRecordStore>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            blobs,
            records,
            policy,
        }
    }

    /// Active policy.
    #[must_use]
    pub fn policy(&self) -> RetrievalPolicy {
        self.policy
    }

    /// Fetch the bytes stored under `raw_name` on behalf of `caller`.
    ///
    /// Names that could never have been generated, unknown names and files
    /// the policy hides from `caller` all yield [`RetrieveError::NotFound`].
    pub fn retrieve(&self, raw_name: &str, caller: &OwnerId) -> Result<RetrievedFile, RetrieveError> {
        let Ok(name) = StorageName::parse(raw_name) else {
            log::debug!("rejected invalid storage name requested by {caller}");
            return Err(RetrieveError::NotFound);
        };

        if self.policy == RetrievalPolicy::OwnerOnly {
            let record = self
                .records
                .find_file(&name)
                .map_err(|source| RetrieveError::Store { source })?;
            match record {
                Some(record) if record.owner == *caller => {}
                _ => return Err(RetrieveError::NotFound),
            }
        }

        let bytes = self
            .blobs
            .get(&name)
            .map_err(|source| RetrieveError::Blob { source })?
            .ok_or(RetrieveError::NotFound)?;
        let designation = if name.designates_json() {
            ContentDesignation::Json
        } else {
            ContentDesignation::Unspecified
        };
        Ok(RetrievedFile {
            name,
            bytes,
            designation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapvault_core::test_support::{MemoryBlobStore, MemoryStore};
    use mapvault_core::{FileFormat, FileMetadata, KmlMetadata, UploadedFile};
    use rstest::{fixture, rstest};
    use time::macros::datetime;

    struct Setup {
        blobs: Arc<MemoryBlobStore>,
        records: Arc<MemoryStore>,
    }

    impl Setup {
        fn retriever(&self, policy: RetrievalPolicy) -> Retriever {
            Retriever::new(self.blobs.clone(), self.records.clone(), policy)
        }
    }

    fn owner(raw: &str) -> OwnerId {
        OwnerId::new(raw).expect("valid owner")
    }

    #[fixture]
    fn setup() -> Setup {
        let blobs = Arc::new(MemoryBlobStore::default());
        let records = Arc::new(MemoryStore::default());
        let name = StorageName::parse("7-trail.kml").expect("valid name");
        blobs.put_new(&name, b"<kml/>").expect("seed blob");
        let record = UploadedFile::new(
            name,
            "trail.kml".to_owned(),
            (FileFormat::Kml, ".kml"),
            owner("alice"),
            FileMetadata::Kml(KmlMetadata { placemarks: 0 }),
            datetime!(2024-05-01 12:00 UTC),
        )
        .expect("consistent record");
        records.insert_file(&record).expect("seed record");

        let geojson = StorageName::parse("8-area.geojson").expect("valid name");
        blobs.put_new(&geojson, b"{}").expect("seed blob");
        Setup { blobs, records }
    }

    #[rstest]
    fn owners_fetch_their_files(setup: Setup) {
        let file = setup
            .retriever(RetrievalPolicy::OwnerOnly)
            .retrieve("7-trail.kml", &owner("alice"))
            .expect("retrieve");
        assert_eq!(file.bytes, b"<kml/>");
        assert_eq!(file.designation, ContentDesignation::Unspecified);
        assert_eq!(file.designation.mime(), "application/octet-stream");
    }

    #[rstest]
    fn other_owners_see_not_found(setup: Setup) {
        let result = setup
            .retriever(RetrievalPolicy::OwnerOnly)
            .retrieve("7-trail.kml", &owner("bob"));
        assert!(matches!(result, Err(RetrieveError::NotFound)));
    }

    #[rstest]
    fn open_policy_serves_any_caller(setup: Setup) {
        let file = setup
            .retriever(RetrievalPolicy::AnyAuthenticated)
            .retrieve("8-area.geojson", &owner("bob"))
            .expect("retrieve");
        assert_eq!(file.designation, ContentDesignation::Json);
        assert_eq!(file.designation.mime(), "application/json");
    }

    #[rstest]
    #[case("../mapvault.db")]
    #[case(".hidden")]
    #[case("")]
    #[case("999-missing.kml")]
    fn unusable_names_are_not_found(setup: Setup, #[case] raw: &str) {
        for policy in [RetrievalPolicy::OwnerOnly, RetrievalPolicy::AnyAuthenticated] {
            let result = setup.retriever(policy).retrieve(raw, &owner("alice"));
            assert!(matches!(result, Err(RetrieveError::NotFound)), "{policy}: {raw}");
        }
    }

    #[rstest]
    #[case("owner-only", RetrievalPolicy::OwnerOnly)]
    #[case("Any-Authenticated", RetrievalPolicy::AnyAuthenticated)]
    fn policies_parse_from_names(#[case] raw: &str, #[case] expected: RetrievalPolicy) {
        assert_eq!(raw.parse::<RetrievalPolicy>(), Ok(expected));
    }

    #[rstest]
    fn unknown_policies_are_rejected() {
        assert!("everyone".parse::<RetrievalPolicy>().is_err());
        assert_eq!(RetrievalPolicy::default().to_string(), "owner-only");
    }
}
