//! Reference validation against the backing store.

use thiserror::Error;

use crate::collection::{Collection, VersionFamily};
use crate::error::{AcbError, AcbResult, FieldErrorKind};
use crate::id::DocId;

/// Where a version record sits in its chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionLink {
    pub master_id: DocId,
    pub previous_version_id: Option<DocId>,
}

/// Point reads the validation layer needs from the store.
///
/// Implementations must not cache: a record can be deleted between two
/// requests and every check has to see the store as it is now.
pub trait ReferenceLookup: Send + Sync {
    /// Whether a record with this id currently exists in `collection`.
    fn exists(
        &self,
        collection: Collection,
        id: &DocId,
    ) -> impl Future<Output = AcbResult<bool>> + Send;

    /// Chain pointers of a version record, `None` if it does not exist.
    fn version_link(
        &self,
        family: VersionFamily,
        id: &DocId,
    ) -> impl Future<Output = AcbResult<Option<VersionLink>>> + Send;
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("invalid identifier format: '{value}'")]
    MalformedIdentifier { value: String },

    #[error("referenced {collection} record '{id}' does not exist")]
    DanglingReference { collection: Collection, id: DocId },

    #[error(transparent)]
    Store(AcbError),
}

impl ReferenceError {
    /// Field error for client-side failures; store failures pass through
    /// as hard errors.
    pub fn into_field_kind(self) -> Result<FieldErrorKind, AcbError> {
        match self {
            ReferenceError::MalformedIdentifier { value } => {
                Ok(FieldErrorKind::MalformedIdentifier { value })
            }
            ReferenceError::DanglingReference { collection, id } => {
                Ok(FieldErrorKind::DanglingReference { collection, id })
            }
            ReferenceError::Store(err) => Err(err),
        }
    }
}

/// Check that `raw` is a well-formed identifier of an existing record in
/// `collection`, returning the parsed id.
pub async fn validate_reference<L: ReferenceLookup>(
    raw: &str,
    collection: Collection,
    lookup: &L,
) -> Result<DocId, ReferenceError> {
    let id = DocId::parse(raw).map_err(|_| ReferenceError::MalformedIdentifier {
        value: raw.to_owned(),
    })?;

    if lookup
        .exists(collection, &id)
        .await
        .map_err(ReferenceError::Store)?
    {
        Ok(id)
    } else {
        Err(ReferenceError::DanglingReference { collection, id })
    }
}
