//! # Filesystem Counter Storage
//!
//! A durable counter store built on flat files of fixed-width decimal
//! records (see `formats::record`).
//!
//! ## Layout
//!
//! ```text
//! <info_dir>/info_file_<kind>.txt                    entity counters
//! <info_dir>/prov_file_<kind>.txt                    provenance counters
//! <info_dir>/datasets/<collection>/metadata_<kind>.txt
//! <sibling of info_dir named after a supplier prefix>/...
//! ```
//!
//! Each file is an array of records: record `i` lives at byte
//! `(i - 1) * width`. When a value outgrows the width the whole file is
//! rewritten at the larger width into a temporary file that then replaces
//! the original.
//!
//! After every single-record write a repair pass walks backward from the
//! written record and blanks any record that is not well-formed (a write
//! past end of file leaves a NUL-filled gap). It stops at the first valid
//! record, so every record up to the highest written one is readable.
//!
//! ## Concurrency
//!
//! File handles are opened per operation and closed before returning.
//! There is no locking: two writers on the same family, in the same or in
//! different processes, can lose updates.

use crate::formats::record::{self, RecordFault};
use crate::store::CounterStore;
use crate::vocabulary::{
    self, DATASETS_DIR, INFO_FILE_PREFIX, METADATA_FILE_PREFIX, MIN_RECORD_WIDTH,
    PROV_FILE_PREFIX, RECORD_TERMINATOR,
};
use crate::{CounterError, CounterFamily, CounterKey, CounterValue, FamilyUpdate};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

// =============================================================================
// ERROR HELPERS
// =============================================================================

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> CounterError + '_ {
    move |e| CounterError::IoError(format!("{}: {}", path.display(), e))
}

fn corrupted(path: &Path, fault: RecordFault) -> CounterError {
    CounterError::Corrupted {
        location: path.display().to_string(),
        reason: fault.to_string(),
    }
}

fn record_offset(identifier: u64, width: usize) -> Result<u64, CounterError> {
    (identifier - 1).checked_mul(width as u64).ok_or_else(|| {
        CounterError::InvalidArgument(format!(
            "identifier {} exceeds addressable range",
            identifier
        ))
    })
}

fn slot_index(identifier: u64) -> Result<usize, CounterError> {
    usize::try_from(identifier - 1).map_err(|_| {
        CounterError::InvalidArgument(format!(
            "identifier {} exceeds addressable range",
            identifier
        ))
    })
}

/// Map a collection name (usually a dataset IRI) to one directory name.
///
/// Bytes outside `[A-Za-z0-9._-]` are percent-encoded, as is every `.` of
/// a name made only of dots. `%` is always encoded, so the mapping is
/// injective.
fn collection_dir_name(collection_name: &str) -> String {
    let only_dots = collection_name.bytes().all(|b| b == b'.');
    let mut encoded = String::with_capacity(collection_name.len());
    for byte in collection_name.bytes() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || byte == b'_'
            || (byte == b'.' && !only_dots);
        if keep {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

// =============================================================================
// FILE COUNTER STORE
// =============================================================================

/// A disk-backed counter store of fixed-width record files.
#[derive(Debug, Clone)]
pub struct FileCounterStore {
    /// Root directory for the store's own numbering authority.
    info_dir: PathBuf,
    /// The supplier prefix `info_dir` belongs to.
    supplier_prefix: String,
}

impl FileCounterStore {
    /// Create a store rooted at `info_dir`.
    ///
    /// Nothing is touched on disk until the first operation.
    pub fn new(info_dir: impl Into<PathBuf>, supplier_prefix: impl Into<String>) -> Self {
        Self {
            info_dir: info_dir.into(),
            supplier_prefix: supplier_prefix.into(),
        }
    }

    #[must_use]
    pub fn info_dir(&self) -> &Path {
        &self.info_dir
    }

    #[must_use]
    pub fn supplier_prefix(&self) -> &str {
        &self.supplier_prefix
    }

    /// Directory holding the families of `supplier_prefix`.
    ///
    /// The store's own prefix (or none) resolves to `info_dir`; any other
    /// prefix to the sibling directory of that name.
    fn authority_dir(&self, supplier_prefix: Option<&str>) -> Result<PathBuf, CounterError> {
        match supplier_prefix {
            None => Ok(self.info_dir.clone()),
            Some(prefix) if prefix == self.supplier_prefix => Ok(self.info_dir.clone()),
            Some(prefix) => {
                let is_component = !prefix.contains(['/', '\\', '\0'])
                    && prefix != "."
                    && prefix != "..";
                if !is_component {
                    return Err(CounterError::InvalidArgument(format!(
                        "supplier prefix is not a valid directory name: {:?}",
                        prefix
                    )));
                }
                Ok(self.info_dir.with_file_name(prefix))
            }
        }
    }

    /// Path of the file holding `family`.
    pub fn family_path(&self, family: &CounterFamily) -> Result<PathBuf, CounterError> {
        let dir = self.authority_dir(family.supplier_prefix())?;
        let file_prefix = if family.is_provenance() {
            PROV_FILE_PREFIX
        } else {
            INFO_FILE_PREFIX
        };
        Ok(dir.join(format!("{}{}.txt", file_prefix, family.entity_kind())))
    }

    /// Path of the file holding metadata counters of `entity_kind` in
    /// `collection_name`.
    #[must_use]
    pub fn metadata_path(&self, entity_kind: &str, collection_name: &str) -> PathBuf {
        self.info_dir
            .join(DATASETS_DIR)
            .join(collection_dir_name(collection_name))
            .join(format!("{}{}.txt", METADATA_FILE_PREFIX, entity_kind))
    }

    // =========================================================================
    // FILE PRIMITIVES
    // =========================================================================

    /// Create the family file (and its directory) with one blank record.
    fn ensure_family(path: &Path) -> Result<(), CounterError> {
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(parent))?;
        }
        fs::write(path, record::blank(MIN_RECORD_WIDTH)).map_err(io_error(path))?;
        debug!(path = %path.display(), "created counter family");
        Ok(())
    }

    /// Discover the record width by scanning the first record.
    fn record_width(file: &mut File, path: &Path) -> Result<usize, CounterError> {
        file.seek(SeekFrom::Start(0)).map_err(io_error(path))?;
        let mut first = Vec::new();
        BufReader::new(&mut *file)
            .read_until(RECORD_TERMINATOR, &mut first)
            .map_err(io_error(path))?;
        record::first_record_width(&first).map_err(|fault| corrupted(path, fault))
    }

    fn read_value(path: &Path, identifier: u64) -> Result<CounterValue, CounterError> {
        let mut file = File::open(path).map_err(io_error(path))?;
        let width = Self::record_width(&mut file, path)?;
        let offset = record_offset(identifier, width)?;

        file.seek(SeekFrom::Start(offset)).map_err(io_error(path))?;
        let mut buf = Vec::with_capacity(width);
        file.take(width as u64)
            .read_to_end(&mut buf)
            .map_err(io_error(path))?;

        Ok(record::decode(&buf).unwrap_or_default())
    }

    fn write_value(path: &Path, identifier: u64, value: &CounterValue) -> Result<(), CounterError> {
        Self::ensure_family(path)?;

        let mut width = {
            let mut file = File::open(path).map_err(io_error(path))?;
            Self::record_width(&mut file, path)?
        };
        let needed = record::required_width(value);
        if needed > width {
            Self::grow_width(path, width, needed)?;
            width = needed;
        }

        let encoded = record::encode(value, width).ok_or_else(|| CounterError::Corrupted {
            location: path.display().to_string(),
            reason: format!("record width {} cannot hold {}", width, value),
        })?;
        let offset = record_offset(identifier, width)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(io_error(path))?;
        file.seek(SeekFrom::Start(offset)).map_err(io_error(path))?;
        file.write_all(&encoded).map_err(io_error(path))?;

        let patched = Self::repair_preceding(&mut file, offset, width).map_err(io_error(path))?;
        if patched > 0 {
            warn!(
                path = %path.display(),
                identifier,
                patched,
                "blanked malformed records preceding write"
            );
        }
        Ok(())
    }

    /// Walk backward from `offset`, blanking malformed records until a
    /// valid one (or the start of the file) is reached.
    ///
    /// Returns how many records were patched. Running it again patches
    /// nothing.
    fn repair_preceding(file: &mut File, offset: u64, width: usize) -> std::io::Result<usize> {
        let step = width as u64;
        let blank = record::blank(width);
        let mut buf = Vec::with_capacity(width);
        let mut position = offset;
        let mut patched = 0;

        while position >= step {
            position -= step;
            file.seek(SeekFrom::Start(position))?;
            buf.clear();
            (&mut *file).take(step).read_to_end(&mut buf)?;
            if record::is_valid(&buf) {
                break;
            }
            file.seek(SeekFrom::Start(position))?;
            file.write_all(&blank)?;
            patched += 1;
        }
        Ok(patched)
    }

    /// Rewrite every record of the file at `new_width`.
    fn grow_width(path: &Path, old_width: usize, new_width: usize) -> Result<(), CounterError> {
        let bytes = fs::read(path).map_err(io_error(path))?;
        let slots = record::split_records(&bytes, old_width);
        let (content, _) = record::join_records(&slots, new_width);
        Self::replace_file(path, &content)?;
        debug!(
            path = %path.display(),
            old_width,
            new_width,
            records = slots.len(),
            "widened counter family"
        );
        Ok(())
    }

    /// Replace `path` with `content` through a temporary file in the same
    /// directory, keeping the original permissions.
    fn replace_file(path: &Path, content: &[u8]) -> Result<(), CounterError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_error(dir))?;
        tmp.write_all(content).map_err(io_error(tmp.path()))?;

        if let Ok(metadata) = fs::metadata(path) {
            fs::set_permissions(tmp.path(), metadata.permissions())
                .map_err(io_error(tmp.path()))?;
        }
        tmp.persist(path).map_err(|e| io_error(path)(e.error))?;
        Ok(())
    }

    /// Apply every value of `update` to one family file in a single rewrite.
    fn rewrite_family(path: &Path, update: &FamilyUpdate) -> Result<(), CounterError> {
        let Some(max_identifier) = update.max_identifier() else {
            return Ok(());
        };
        Self::ensure_family(path)?;

        let bytes = fs::read(path).map_err(io_error(path))?;
        let width = record::first_record_width(&bytes).map_err(|fault| corrupted(path, fault))?;
        let target_width = update
            .values
            .values()
            .map(record::required_width)
            .fold(width, usize::max);
        let out_of_range = || {
            CounterError::InvalidArgument(format!(
                "identifier {} exceeds addressable range",
                max_identifier
            ))
        };
        max_identifier
            .checked_mul(target_width as u64)
            .and_then(|end| usize::try_from(end).ok())
            .ok_or_else(out_of_range)?;

        let mut slots = record::split_records(&bytes, width);
        let len = slot_index(max_identifier)? + 1;
        if slots.len() < len {
            slots
                .try_reserve(len - slots.len())
                .map_err(|_| out_of_range())?;
            slots.resize(len, None);
        }
        for (&identifier, value) in &update.values {
            slots[slot_index(identifier)?] = Some(value.clone());
        }

        let (content, new_width) = record::join_records(&slots, width);
        Self::replace_file(path, &content)?;
        debug!(
            path = %path.display(),
            updated = update.values.len(),
            width = new_width,
            "batch-updated counter family"
        );
        Ok(())
    }
}

// =============================================================================
// COUNTER STORE IMPLEMENTATION
// =============================================================================

impl CounterStore for FileCounterStore {
    fn set(&mut self, value: &CounterValue, key: &CounterKey) -> Result<(), CounterError> {
        vocabulary::validate_key(key)?;
        let path = self.family_path(key.family())?;
        Self::write_value(&path, key.identifier(), value)
    }

    fn read(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        vocabulary::validate_key(key)?;
        let path = self.family_path(key.family())?;
        Self::ensure_family(&path)?;
        Self::read_value(&path, key.identifier())
    }

    fn increment(&mut self, key: &CounterKey) -> Result<CounterValue, CounterError> {
        vocabulary::validate_key(key)?;
        let path = self.family_path(key.family())?;
        Self::ensure_family(&path)?;
        let next = Self::read_value(&path, key.identifier())?.increment();
        Self::write_value(&path, key.identifier(), &next)?;
        Ok(next)
    }

    fn set_metadata(
        &mut self,
        value: &CounterValue,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<(), CounterError> {
        vocabulary::validate_metadata(entity_kind, collection_name)?;
        let path = self.metadata_path(entity_kind, collection_name);
        Self::write_value(&path, 1, value)
    }

    fn read_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        vocabulary::validate_metadata(entity_kind, collection_name)?;
        let path = self.metadata_path(entity_kind, collection_name);
        Self::ensure_family(&path)?;
        Self::read_value(&path, 1)
    }

    fn increment_metadata(
        &mut self,
        entity_kind: &str,
        collection_name: &str,
    ) -> Result<CounterValue, CounterError> {
        vocabulary::validate_metadata(entity_kind, collection_name)?;
        let path = self.metadata_path(entity_kind, collection_name);
        Self::ensure_family(&path)?;
        let next = Self::read_value(&path, 1)?.increment();
        Self::write_value(&path, 1, &next)?;
        Ok(next)
    }

    /// One read and one rewrite per family file, however many identifiers
    /// it touches. Every key is validated before any file is written.
    fn batch_update(&mut self, updates: &[FamilyUpdate]) -> Result<(), CounterError> {
        let mut by_path: BTreeMap<PathBuf, FamilyUpdate> = BTreeMap::new();
        for update in updates {
            for &identifier in update.values.keys() {
                vocabulary::validate_key(&update.family.key(identifier))?;
            }
            let path = self.family_path(&update.family)?;
            by_path
                .entry(path)
                .or_insert_with(|| FamilyUpdate::new(update.family.clone()))
                .values
                .extend(update.values.iter().map(|(id, value)| (*id, value.clone())));
        }

        for (path, update) in &by_path {
            Self::rewrite_family(path, update)?;
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FileCounterStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileCounterStore::new(dir.path().join("060"), "060");
        (dir, store)
    }

    fn big(digits: &str) -> CounterValue {
        digits.parse().expect("decimal")
    }

    fn all_records_valid(bytes: &[u8], width: usize) -> bool {
        bytes.len() % width == 0 && bytes.chunks(width).all(record::is_valid)
    }

    #[test]
    fn first_touch_creates_blank_record() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br");

        assert!(store.read(&key).expect("read").is_zero());

        let path = store.family_path(key.family()).expect("path");
        assert_eq!(fs::read(&path).expect("bytes"), b"  \n");
    }

    #[test]
    fn sparse_write_then_widen() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br").with_identifier(35);

        store.set(&CounterValue::from(18u64), &key).expect("set");
        assert_eq!(store.read(&key).expect("read"), CounterValue::from(18u64));

        let huge = big("100000000000000000000");
        store.set(&huge, &key).expect("set huge");

        assert!(store.read(&CounterKey::entity("br")).expect("read").is_zero());
        assert_eq!(store.read(&key).expect("read"), huge);

        let path = store.family_path(key.family()).expect("path");
        let bytes = fs::read(&path).expect("bytes");
        assert_eq!(bytes.len(), 35 * 22);
        assert!(all_records_valid(&bytes, 22));
    }

    #[test]
    fn repair_blanks_gap_records() {
        let (_dir, mut store) = store();
        let key = CounterKey::provenance("ra", "se", 6);
        store.set(&CounterValue::from(2u64), &key).expect("set");

        let path = store.family_path(key.family()).expect("path");
        let bytes = fs::read(&path).expect("bytes");
        assert_eq!(bytes, b"  \n  \n  \n  \n  \n2 \n");
        for identifier in 1..6 {
            let value = store
                .read(&CounterKey::provenance("ra", "se", identifier))
                .expect("read");
            assert!(value.is_zero());
        }
    }

    #[test]
    fn repair_stops_at_first_valid_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("info_file_br.txt");
        fs::write(&path, b"garbage\n\0\0\0\0\0\0\0\0").expect("seed");

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .expect("open");
        let patched = FileCounterStore::repair_preceding(&mut file, 16, 8).expect("repair");
        assert_eq!(patched, 1);
        let again = FileCounterStore::repair_preceding(&mut file, 16, 8).expect("repair");
        assert_eq!(again, 0);

        assert_eq!(fs::read(&path).expect("bytes"), b"garbage\n       \n");
    }

    #[test]
    fn growth_preserves_other_records() {
        let (_dir, mut store) = store();
        let family = CounterFamily::entity("id");
        for identifier in 1..=4u64 {
            store
                .set(&CounterValue::from(identifier * 11), &family.key(identifier))
                .expect("set");
        }

        let wide = big(&"9".repeat(80));
        store.set(&wide, &family.key(2)).expect("set wide");

        assert_eq!(store.read(&family.key(1)).expect("1"), CounterValue::from(11u64));
        assert_eq!(store.read(&family.key(2)).expect("2"), wide);
        assert_eq!(store.read(&family.key(3)).expect("3"), CounterValue::from(33u64));
        assert_eq!(store.read(&family.key(4)).expect("4"), CounterValue::from(44u64));
    }

    #[test]
    fn growth_leaves_no_temporary_files() {
        let (_dir, mut store) = store();
        store
            .set(&big("123456789012345678901234567890"), &CounterKey::entity("br"))
            .expect("set");

        let entries: Vec<_> = fs::read_dir(store.info_dir())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("info_file_br.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn growth_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, mut store) = store();
        let key = CounterKey::entity("ar");
        store.set(&CounterValue::from(1u64), &key).expect("set");
        let path = store.family_path(key.family()).expect("path");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).expect("chmod");

        store.set(&CounterValue::from(123_456u64), &key).expect("grow");

        let mode = fs::metadata(&path).expect("meta").permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn increment_returns_new_value_and_grows() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("ci");
        store.set(&CounterValue::from(98u64), &key).expect("set");

        assert_eq!(store.increment(&key).expect("inc"), CounterValue::from(99u64));
        assert_eq!(store.increment(&key).expect("inc"), CounterValue::from(100u64));
        assert_eq!(store.read(&key).expect("read"), CounterValue::from(100u64));
    }

    #[test]
    fn null_in_first_record_is_corruption() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br");
        let path = store.family_path(key.family()).expect("path");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"1\0 \n").expect("seed");

        assert!(matches!(
            store.read(&key),
            Err(CounterError::Corrupted { .. })
        ));
        assert!(matches!(
            store.increment(&key),
            Err(CounterError::Corrupted { .. })
        ));
    }

    #[test]
    fn unterminated_first_record_is_corruption() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br");
        let path = store.family_path(key.family()).expect("path");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"12").expect("seed");

        assert!(matches!(
            store.read(&key),
            Err(CounterError::Corrupted { .. })
        ));
    }

    #[test]
    fn unparsable_record_reads_zero() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br");
        let path = store.family_path(key.family()).expect("path");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"7  \nab \n").expect("seed");

        assert!(store.read(&key.clone().with_identifier(2)).expect("read").is_zero());
        assert_eq!(store.read(&key).expect("read"), CounterValue::from(7u64));
    }

    #[test]
    fn signed_or_separated_digits_read_zero() {
        let (_dir, mut store) = store();
        let key = CounterKey::entity("br");
        let path = store.family_path(key.family()).expect("path");
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(&path, b"1_0\n+5 \n").expect("seed");

        assert!(store.read(&key).expect("read").is_zero());
        assert!(store.read(&key.clone().with_identifier(2)).expect("read").is_zero());
    }

    #[test]
    fn paths_follow_layout() {
        let (dir, store) = store();
        let root = dir.path();

        assert_eq!(
            store.family_path(&CounterFamily::entity("br")).expect("path"),
            root.join("060").join("info_file_br.txt")
        );
        assert_eq!(
            store
                .family_path(&CounterFamily::provenance("br", "se"))
                .expect("path"),
            root.join("060").join("prov_file_br.txt")
        );
        assert_eq!(
            store
                .family_path(&CounterFamily::entity("br").with_supplier_prefix("060"))
                .expect("path"),
            root.join("060").join("info_file_br.txt")
        );
        assert_eq!(
            store
                .family_path(&CounterFamily::entity("br").with_supplier_prefix("070"))
                .expect("path"),
            root.join("070").join("info_file_br.txt")
        );
        assert!(
            store
                .family_path(&CounterFamily::entity("br").with_supplier_prefix("../x"))
                .is_err()
        );
        assert_eq!(
            store.metadata_path("di", "https://w3id.org/oc/meta/"),
            root.join("060")
                .join("datasets")
                .join("https%3A%2F%2Fw3id.org%2Foc%2Fmeta%2F")
                .join("metadata_di.txt")
        );
    }

    #[test]
    fn collection_names_never_escape() {
        assert_eq!(collection_dir_name(".."), "%2E%2E");
        assert_eq!(collection_dir_name("a.b"), "a.b");
        assert_eq!(collection_dir_name("50%"), "50%25");
    }

    #[test]
    fn supplier_prefixes_are_isolated() {
        let (_dir, mut store) = store();
        let own = CounterKey::entity("br");
        let other = CounterKey::entity("br").with_supplier_prefix("070");

        store.set(&CounterValue::from(5u64), &own).expect("set");
        store.set(&CounterValue::from(9u64), &other).expect("set");

        assert_eq!(store.read(&own).expect("read"), CounterValue::from(5u64));
        assert_eq!(store.read(&other).expect("read"), CounterValue::from(9u64));
    }

    #[test]
    fn metadata_counters_persist() {
        let (_dir, mut store) = store();
        let collection = "https://w3id.org/oc/meta/";

        assert!(store.read_metadata("di", collection).expect("read").is_zero());
        assert_eq!(
            store.increment_metadata("di", collection).expect("inc"),
            CounterValue::from(1u64)
        );

        let mut reopened = FileCounterStore::new(store.info_dir(), "060");
        assert_eq!(
            reopened.read_metadata("di", collection).expect("read"),
            CounterValue::from(1u64)
        );
    }

    #[test]
    fn batch_update_single_family() {
        let (_dir, mut store) = store();
        let family = CounterFamily::entity("br");
        let update = FamilyUpdate::new(family.clone())
            .with(1, 10u64)
            .with(2, 20u64)
            .with(3, 30u64);

        store.batch_update(&[update]).expect("batch");

        assert_eq!(store.read(&family.key(1)).expect("1"), CounterValue::from(10u64));
        assert_eq!(store.read(&family.key(2)).expect("2"), CounterValue::from(20u64));
        assert_eq!(store.read(&family.key(3)).expect("3"), CounterValue::from(30u64));
    }

    #[test]
    fn batch_update_extends_and_widens() {
        let (_dir, mut store) = store();
        let family = CounterFamily::provenance("br", "se");
        store
            .set(&CounterValue::from(4u64), &family.key(1))
            .expect("set");

        let update = FamilyUpdate::new(family.clone())
            .with(5, 12_345u64)
            .with(3, 7u64);
        store.batch_update(&[update]).expect("batch");

        let path = store.family_path(&family).expect("path");
        let bytes = fs::read(&path).expect("bytes");
        assert!(all_records_valid(&bytes, 6));
        assert_eq!(bytes.len(), 5 * 6);

        assert_eq!(store.read(&family.key(1)).expect("1"), CounterValue::from(4u64));
        assert!(store.read(&family.key(2)).expect("2").is_zero());
        assert_eq!(store.read(&family.key(3)).expect("3"), CounterValue::from(7u64));
        assert_eq!(store.read(&family.key(5)).expect("5"), CounterValue::from(12_345u64));
    }

    #[test]
    fn batch_update_validates_before_writing() {
        let (_dir, mut store) = store();
        let good = FamilyUpdate::new(CounterFamily::entity("br")).with(1, 1u64);
        let bad = FamilyUpdate::new(CounterFamily::entity("zz")).with(1, 1u64);

        assert!(matches!(
            store.batch_update(&[good, bad]),
            Err(CounterError::InvalidArgument(_))
        ));
        assert!(!store.info_dir().exists());
    }

    #[test]
    fn unaddressable_identifier_rejected_by_both_paths() {
        let (_dir, mut store) = store();
        let family = CounterFamily::provenance("br", "se");
        store
            .set(&CounterValue::from(4u64), &family.key(1))
            .expect("set");
        let path = store.family_path(&family).expect("path");
        let before = fs::read(&path).expect("bytes");

        assert!(matches!(
            store.set(&CounterValue::from(1u64), &family.key(u64::MAX)),
            Err(CounterError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.batch_update(&[FamilyUpdate::new(family.clone()).with(u64::MAX, 1u64)]),
            Err(CounterError::InvalidArgument(_))
        ));

        assert_eq!(fs::read(&path).expect("bytes"), before);
    }

    #[test]
    fn empty_batch_touches_nothing() {
        let (_dir, mut store) = store();
        store
            .batch_update(&[FamilyUpdate::new(CounterFamily::entity("br"))])
            .expect("batch");
        assert!(!store.info_dir().exists());
    }

    #[test]
    fn invalid_arguments_rejected() {
        let (_dir, mut store) = store();
        assert!(matches!(
            store.read(&CounterKey::entity("br").with_identifier(0)),
            Err(CounterError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.set(&CounterValue::from(1u64), &CounterKey::entity("xx")),
            Err(CounterError::InvalidArgument(_))
        ));
        assert!(matches!(
            store.increment_metadata("di", ""),
            Err(CounterError::InvalidArgument(_))
        ));
    }
}
