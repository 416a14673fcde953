//! ACL file persistence.
//!
//! The ACL file lists one admitted peer per line in canonical lowercase
//! colon form, with no header. It is rewritten in full after every change
//! of the group's peer set.

use fst_types::MacAddress;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, error};

use crate::error::{RateUpgradeError, RateUpgradeResult};
use crate::types::{MacEntryStore, RateUpgradeGroup};

/// Serializes a peer set in ACL file format.
pub fn render(macs: &MacEntryStore) -> String {
    macs.iter().map(|mac| format!("{mac}\n")).collect()
}

/// Rewrites the group's ACL file from its peer set.
///
/// Groups without an ACL file succeed without touching the filesystem. A
/// failure in the middle of the write may leave a truncated file behind.
pub fn persist(group: &RateUpgradeGroup) -> RateUpgradeResult<()> {
    let Some(path) = group.acl_fname() else {
        return Ok(());
    };

    write_acl(path, group.macs()).map_err(|source| {
        error!(
            group = group.name(),
            acl = %path.display(),
            error = %source,
            "Cannot update ACL file"
        );
        RateUpgradeError::persistence(group.name(), path, source)
    })?;

    debug!(
        group = group.name(),
        acl = %path.display(),
        entries = group.macs().len(),
        "ACL file updated"
    );
    Ok(())
}

fn write_acl(path: &Path, macs: &MacEntryStore) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(render(macs).as_bytes())?;
    writer.flush()
}

/// Reads an ACL file back into the peers it lists, in file order.
///
/// Blank lines are skipped; any other line that is not a MAC address is
/// reported as [`io::ErrorKind::InvalidData`].
pub fn read_acl_file(path: impl AsRef<Path>) -> io::Result<Vec<MacAddress>> {
    let reader = BufReader::new(File::open(path)?);
    let mut macs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mac = line
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        macs.push(mac);
    }
    Ok(macs)
}

/// Captures the current content of an ACL file, `None` if it does not exist.
pub(crate) fn snapshot(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Puts back content captured by [`snapshot`].
pub(crate) fn restore(path: &Path, previous: Option<&[u8]>) -> io::Result<()> {
    match previous {
        Some(content) => fs::write(path, content),
        None => match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        },
    }
}
