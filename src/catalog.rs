//! Image catalog builder: directory scan, dedup, ordering.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

use crate::config::{Config, DateRange, IdentityKey};
use crate::parse::{parse_filename, title_from_handle};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// One logical product image, deduplicated by identity key.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub filename: String,
    pub handle: String,
    pub title: String,
    pub type_token: String,
    pub color: Option<String>,
    /// Synthetic collection date, when the run uses dated collections.
    pub collection_date: Option<NaiveDate>,
}

impl CatalogEntry {
    /// The dedup key under the configured identity scheme. Also the key the
    /// row synthesizer folds over when deciding parent vs. child.
    pub fn identity_key(&self, identity: IdentityKey) -> String {
        match identity {
            IdentityKey::Handle => self.handle.clone(),
            IdentityKey::HandleType => format!("{}\u{1f}{}", self.handle, self.type_token),
            IdentityKey::HandleTypeColor => format!(
                "{}\u{1f}{}\u{1f}{}",
                self.handle,
                self.type_token,
                self.color.as_deref().unwrap_or("")
            ),
        }
    }
}

/// Source of synthetic collection dates. The production implementation is
/// wall-clock seeded; tests inject a fixed one.
pub trait DateSource {
    fn pick(&mut self, range: &DateRange) -> NaiveDate;
}

/// Uniform random date in range, xorshift-based, seeded from the wall clock.
pub struct RandomDates {
    state: u64,
}

impl RandomDates {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e3779b97f4a7c15);
        Self { state: seed | 1 }
    }

    fn next_u64(&mut self) -> u64 {
        // xorshift64
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

impl DateSource for RandomDates {
    fn pick(&mut self, range: &DateRange) -> NaiveDate {
        let (start, end) = range_bounds(range);
        let days = (end - start).num_days().max(1);
        let offset = (self.next_u64() % days as u64) as i64;
        start + Duration::days(offset)
    }
}

/// First day of the start month and exclusive first day after the end month.
fn range_bounds(range: &DateRange) -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(range.start_year, range.start_month, 1)
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(range.start_year, 1, 1).unwrap());
    let end = if range.end_month == 12 {
        NaiveDate::from_ymd_opt(range.end_year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(range.end_year, range.end_month + 1, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(range.end_year + 1, 1, 1).unwrap())
    };
    (start, end)
}

/// Scan a directory into an ordered, deduplicated catalog.
///
/// Non-image files and unparseable filenames are warned about and skipped.
/// Filenames are sorted before dedup so the retained entry for a shared
/// identity key is determined by sort order, not directory scan order.
pub fn build_catalog(
    dir: &Path,
    config: &Config,
    dates: &mut dyn DateSource,
) -> Result<Vec<CatalogEntry>> {
    let read = fs_read_dir(dir)?;

    let mut filenames: Vec<String> = Vec::new();
    for entry in read {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = match entry.file_name().into_string() {
            Ok(n) => n,
            Err(raw) => {
                warn!("skipping non-UTF-8 filename: {:?}", raw);
                continue;
            }
        };
        if !has_image_extension(&name) {
            warn!("not an image file: {}", name);
            continue;
        }
        filenames.push(name);
    }
    filenames.sort();

    let mut catalog: Vec<CatalogEntry> = Vec::new();
    for filename in filenames {
        let parsed = match parse_filename(&filename, config.parse_color) {
            Ok(p) => p,
            Err(e) => {
                warn!("skipping {}: {}", filename, e);
                continue;
            }
        };

        let title = if config.hyphenated_handles {
            title_from_handle(&parsed.handle)
        } else {
            parsed.title
        };
        let candidate = CatalogEntry {
            filename: filename.clone(),
            handle: parsed.handle,
            title,
            type_token: parsed.type_token,
            color: parsed.color,
            collection_date: None,
        };

        // Linear scan; catalogs are low hundreds of files.
        let key = candidate.identity_key(config.identity);
        if catalog
            .iter()
            .any(|e| e.identity_key(config.identity) == key)
        {
            continue;
        }

        let collection_date = config
            .collection_dates
            .as_ref()
            .map(|range| dates.pick(range));
        catalog.push(CatalogEntry {
            collection_date,
            ..candidate
        });
    }

    if config.collection_dates.is_some() {
        catalog.sort_by(|a, b| {
            (a.collection_date, &a.filename).cmp(&(b.collection_date, &b.filename))
        });
    }
    // Already filename-sorted otherwise.

    Ok(catalog)
}

fn fs_read_dir(dir: &Path) -> Result<std::fs::ReadDir> {
    std::fs::read_dir(dir)
        .with_context(|| format!("failed to read image directory: {}", dir.display()))
}

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
