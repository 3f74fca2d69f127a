//! On-disk checkpoint of the normalized mobility table.
//!
//! The cache is a pure function of the source file, so concurrent runs may
//! both rebuild it; each writes a private temp file and renames it into
//! place, and the last rename wins.

use crate::error::Result;
use crate::model::{columns, MobilityRow};
use crate::source;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, info, warn};

/// Bump when normalization rules change so stale caches are ignored.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Identity of a source dataset file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetIdentity {
    pub file_name: String,
    pub byte_len: u64,
    pub modified_secs: u64,
    pub format_version: u32,
}

impl DatasetIdentity {
    pub fn of(path: &Path) -> Result<Self> {
        source::ensure_available(path)?;
        let meta = fs::metadata(path)?;
        let modified_secs = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let file_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "dataset".to_string());

        Ok(Self {
            file_name,
            byte_len: meta.len(),
            modified_secs,
            format_version: CACHE_FORMAT_VERSION,
        })
    }

    fn slug(&self) -> String {
        format!(
            "{}-{}-{}-v{}",
            self.file_name, self.byte_len, self.modified_secs, self.format_version
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheManifest {
    pub identity: DatasetIdentity,
    pub row_count: usize,
    pub created_at: DateTime<Utc>,
}

pub struct MobilityCache {
    dir: PathBuf,
}

impl MobilityCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn table_path(&self, identity: &DatasetIdentity) -> PathBuf {
        self.dir
            .join(format!("normalized-mobility-{}.csv", identity.slug()))
    }

    pub fn manifest_path(&self, identity: &DatasetIdentity) -> PathBuf {
        self.dir
            .join(format!("normalized-mobility-{}.json", identity.slug()))
    }

    /// Cached rows for this identity, or `None` on a miss. A cache that does
    /// not match its manifest is treated as a miss.
    pub fn load(&self, identity: &DatasetIdentity) -> Result<Option<Vec<MobilityRow>>> {
        let manifest_path = self.manifest_path(identity);
        let table_path = self.table_path(identity);
        if !manifest_path.is_file() || !table_path.is_file() {
            debug!("mobility cache miss for {}", identity.slug());
            return Ok(None);
        }

        let manifest: CacheManifest = match serde_json::from_str(&fs::read_to_string(&manifest_path)?) {
            Ok(m) => m,
            Err(e) => {
                warn!("ignoring unreadable cache manifest {}: {}", manifest_path.display(), e);
                return Ok(None);
            }
        };
        if manifest.identity != *identity {
            warn!("cache manifest {} describes another dataset", manifest_path.display());
            return Ok(None);
        }

        match source::read_mobility(&table_path) {
            Ok(rows) if rows.len() == manifest.row_count => {
                info!("loaded {} normalized mobility rows from cache", rows.len());
                Ok(Some(rows))
            }
            Ok(rows) => {
                warn!(
                    "cache {} has {} rows, manifest says {}; rebuilding",
                    table_path.display(),
                    rows.len(),
                    manifest.row_count
                );
                Ok(None)
            }
            Err(e) => {
                warn!("ignoring unreadable cache {}: {}", table_path.display(), e);
                Ok(None)
            }
        }
    }

    pub fn store(&self, identity: &DatasetIdentity, rows: &[MobilityRow]) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let table_path = self.table_path(identity);

        let tmp_table = temp_sibling(&table_path);
        {
            let mut wtr = csv::Writer::from_path(&tmp_table)?;
            if rows.is_empty() {
                // serialize() only emits the header alongside the first row
                wtr.write_record(mobility_header())?;
            }
            for row in rows {
                wtr.serialize(row)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp_table, &table_path)?;

        let manifest = CacheManifest {
            identity: identity.clone(),
            row_count: rows.len(),
            created_at: Utc::now(),
        };
        let manifest_path = self.manifest_path(identity);
        let tmp_manifest = temp_sibling(&manifest_path);
        fs::write(&tmp_manifest, serde_json::to_string_pretty(&manifest)?)?;
        fs::rename(&tmp_manifest, &manifest_path)?;

        info!("cached {} normalized mobility rows at {}", rows.len(), table_path.display());
        Ok(table_path)
    }

    /// Return cached rows or compute, store and return them.
    pub fn get_or_build<F>(&self, source_path: &Path, build: F) -> Result<Vec<MobilityRow>>
    where
        F: FnOnce(&Path) -> Result<Vec<MobilityRow>>,
    {
        let identity = DatasetIdentity::of(source_path)?;
        if let Some(rows) = self.load(&identity)? {
            return Ok(rows);
        }
        let rows = build(source_path)?;
        self.store(&identity, &rows)?;
        Ok(rows)
    }
}

fn mobility_header() -> Vec<&'static str> {
    let mut header = vec![
        columns::COUNTRY_REGION_CODE,
        columns::COUNTRY_REGION,
        columns::SUB_REGION_1,
        columns::SUB_REGION_2,
        columns::METRO_AREA,
        columns::ISO_3166_2_CODE,
        columns::CENSUS_FIPS_CODE,
        columns::DATE,
    ];
    header.extend(columns::PERCENT_CHANGE_METRICS);
    header
}

/// Unique temp path next to `path`, so the final rename stays on one filesystem.
pub(crate) fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CountryCode;
    use chrono::NaiveDate;
    use std::cell::Cell;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mobility_cache_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn row(code: CountryCode, sub2: &str) -> MobilityRow {
        MobilityRow {
            country_region_code: code,
            country_region: "united states".to_string(),
            sub_region_1: "california".to_string(),
            sub_region_2: sub2.to_string(),
            metro_area: String::new(),
            iso_3166_2_code: String::new(),
            census_fips_code: "6059".to_string(),
            date: NaiveDate::from_ymd_opt(2020, 6, 30).unwrap(),
            retail_and_recreation: Some(-12),
            grocery_and_pharmacy: None,
            parks: Some(40),
            transit_stations: None,
            workplaces: Some(-33),
            residential: Some(8),
        }
    }

    fn source_file(dir: &Path) -> PathBuf {
        let path = dir.join("Global_Mobility_Report.csv");
        fs::write(&path, "placeholder").unwrap();
        path
    }

    #[test]
    fn test_store_then_load_preserves_rows() {
        let dir = temp_dir();
        let source = source_file(&dir);
        let cache = MobilityCache::new(dir.join("cache"));
        let identity = DatasetIdentity::of(&source).unwrap();
        let rows = vec![
            row(CountryCode::Resolved("us".to_string()), "orange"),
            row(CountryCode::Unresolved, ""),
        ];

        assert!(cache.load(&identity).unwrap().is_none());
        cache.store(&identity, &rows).unwrap();
        assert_eq!(cache.load(&identity).unwrap(), Some(rows));
    }

    #[test]
    fn test_get_or_build_builds_once() {
        let dir = temp_dir();
        let source = source_file(&dir);
        let cache = MobilityCache::new(dir.join("cache"));
        let builds = Cell::new(0);
        let build = |_: &Path| {
            builds.set(builds.get() + 1);
            Ok(vec![row(CountryCode::Resolved("us".to_string()), "orange")])
        };

        let first = cache.get_or_build(&source, build).unwrap();
        let second = cache.get_or_build(&source, build).unwrap();
        assert_eq!(first, second);
        assert_eq!(builds.get(), 1);
    }

    #[test]
    fn test_changed_source_misses() {
        let dir = temp_dir();
        let source = source_file(&dir);
        let cache = MobilityCache::new(dir.join("cache"));
        let identity = DatasetIdentity::of(&source).unwrap();
        cache.store(&identity, &[]).unwrap();

        fs::write(&source, "a longer placeholder body").unwrap();
        let changed = DatasetIdentity::of(&source).unwrap();
        assert_ne!(identity, changed);
        assert!(cache.load(&changed).unwrap().is_none());
    }

    #[test]
    fn test_empty_table_round_trips() {
        let dir = temp_dir();
        let source = source_file(&dir);
        let cache = MobilityCache::new(dir.join("cache"));
        let identity = DatasetIdentity::of(&source).unwrap();
        cache.store(&identity, &[]).unwrap();
        assert_eq!(cache.load(&identity).unwrap(), Some(vec![]));
    }

    #[test]
    fn test_corrupt_manifest_is_a_miss() {
        let dir = temp_dir();
        let source = source_file(&dir);
        let cache = MobilityCache::new(dir.join("cache"));
        let identity = DatasetIdentity::of(&source).unwrap();
        cache.store(&identity, &[row(CountryCode::Resolved("us".to_string()), "")]).unwrap();

        fs::write(cache.manifest_path(&identity), "{ not json").unwrap();
        assert!(cache.load(&identity).unwrap().is_none());
    }
}
