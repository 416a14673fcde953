//! Verification helpers for ACL files
//!
//! Compare what a group wrote to disk with what it holds in memory.

use fst_rateupgd::{read_acl_file, MacEntryStore, RateUpgradeGroup};
use fst_types::MacAddress;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Cannot read ACL file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ACL file {} exists but should not", path.display())]
    UnexpectedFile { path: PathBuf },

    #[error("Group {group} has no ACL file configured")]
    NoAclFile { group: String },

    #[error("ACL file {}: expected {expected:?}, found {actual:?}", path.display())]
    Mismatch {
        path: PathBuf,
        expected: Vec<MacAddress>,
        actual: Vec<MacAddress>,
    },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Checks the content of one ACL file
pub struct AclVerifier {
    path: PathBuf,
}

impl AclVerifier {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Verifier for the ACL file of `group`
    pub fn for_group(group: &RateUpgradeGroup) -> VerifyResult<Self> {
        group
            .acl_fname()
            .map(|path| Self::new(path))
            .ok_or_else(|| VerificationError::NoAclFile {
                group: group.name().to_string(),
            })
    }

    /// Entries in file order
    pub fn entries(&self) -> VerifyResult<Vec<MacAddress>> {
        read_acl_file(&self.path).map_err(|source| VerificationError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// File lists exactly `expected`, in that order
    pub fn assert_entries(&self, expected: &[MacAddress]) -> VerifyResult<()> {
        let actual = self.entries()?;
        if actual != expected {
            return Err(self.mismatch(expected.to_vec(), actual));
        }
        Ok(())
    }

    /// File exists and lists nothing
    pub fn assert_empty(&self) -> VerifyResult<()> {
        self.assert_entries(&[])
    }

    /// File lists the same peers as `store`, order ignored
    pub fn assert_matches(&self, store: &MacEntryStore) -> VerifyResult<()> {
        let actual = self.entries()?;
        let on_disk: BTreeSet<_> = actual.iter().copied().collect();
        let in_memory: BTreeSet<_> = store.iter().copied().collect();
        if on_disk != in_memory || actual.len() != store.len() {
            return Err(self.mismatch(store.iter().copied().collect(), actual));
        }
        Ok(())
    }

    /// File does not exist
    pub fn assert_absent(&self) -> VerifyResult<()> {
        if self.path.exists() {
            return Err(VerificationError::UnexpectedFile {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    fn mismatch(&self, expected: Vec<MacAddress>, actual: Vec<MacAddress>) -> VerificationError {
        VerificationError::Mismatch {
            path: self.path.clone(),
            expected,
            actual,
        }
    }
}
