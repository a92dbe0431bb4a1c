//! Version-chain guard.
//!
//! Version records form a backward-linked list through
//! `previous_version_id`. Every pointer into a family (a master's current
//! version, a version's predecessor, a bulletin's base template version,
//! a comment's bulletin version) must name a version of the expected
//! master.

use std::collections::HashSet;

use tracing::debug;

use crate::collection::VersionFamily;
use crate::error::{AcbError, AcbResult, FieldErrorKind};
use crate::id::DocId;
use crate::validation::{ReferenceLookup, Validator};

/// Check that `version` exists and belongs to `master`.
///
/// Records `DanglingReference` when the version is gone and
/// `VersionMismatch` when it belongs elsewhere. Returns whether the check
/// passed.
pub async fn check_version_owner<L: ReferenceLookup>(
    v: &mut Validator<'_, L>,
    field: &str,
    family: VersionFamily,
    version: &DocId,
    master: &DocId,
) -> AcbResult<bool> {
    match v.lookup().version_link(family, version).await? {
        None => {
            v.push(
                field,
                FieldErrorKind::DanglingReference {
                    collection: family.versions(),
                    id: version.clone(),
                },
            );
            Ok(false)
        }
        Some(link) if link.master_id != *master => {
            debug!(
                field,
                %version,
                expected = %master,
                actual = %link.master_id,
                "Version belongs to another master"
            );
            v.push(
                field,
                FieldErrorKind::VersionMismatch {
                    version: version.clone(),
                    master: master.clone(),
                },
            );
            Ok(false)
        }
        Some(_) => Ok(true),
    }
}

/// Walk the chain from `start` back to its root, newest first.
///
/// A missing start is `NotFound`. A broken link, a cycle, or a version
/// of another master inside the chain means the stored data is corrupt
/// and is reported as `Internal`.
pub async fn version_chain<L: ReferenceLookup>(
    lookup: &L,
    family: VersionFamily,
    start: &DocId,
) -> AcbResult<Vec<DocId>> {
    let Some(head) = lookup.version_link(family, start).await? else {
        return Err(AcbError::NotFound {
            entity: family.versions().name().into(),
            id: start.to_string(),
        });
    };

    let master = head.master_id;
    let mut chain = vec![start.clone()];
    let mut seen: HashSet<DocId> = chain.iter().cloned().collect();
    let mut cursor = head.previous_version_id;

    while let Some(id) = cursor {
        if !seen.insert(id.clone()) {
            return Err(AcbError::Internal(format!(
                "version chain of {start} loops back to {id}"
            )));
        }
        let link = lookup.version_link(family, &id).await?.ok_or_else(|| {
            AcbError::Internal(format!("version chain of {start} points at missing {id}"))
        })?;
        if link.master_id != master {
            return Err(AcbError::Internal(format!(
                "version chain of {start} crosses into master {}",
                link.master_id
            )));
        }
        chain.push(id);
        cursor = link.previous_version_id;
    }

    Ok(chain)
}
