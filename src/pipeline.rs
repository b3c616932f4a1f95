//! End-to-end run: scan -> synthesize rows in memory -> write file ->
//! validate links. The phases are strictly sequential so a slow image host
//! never delays file production, and validation cannot alter written rows.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::catalog::{build_catalog, CatalogEntry, RandomDates};
use crate::config::Config;
use crate::emit::write_csv;
use crate::expand::expand;
use crate::probe::LinkChecker;
use crate::row::{columns, Row, Synthesizer};

/// Resolve the parent rows' Body (HTML): the description file verbatim when
/// configured, the fixed default otherwise. A missing file is fatal only when
/// the config says the description is required.
fn load_body(config: &Config) -> Result<String> {
    match &config.description_file {
        Some(path) => match fs::read_to_string(path) {
            Ok(body) => Ok(body),
            Err(e) if config.description_required => Err(e).with_context(|| {
                format!("required description file is missing: {}", path.display())
            }),
            Err(e) => {
                warn!(
                    "description file {} unreadable ({}); using default body",
                    path.display(),
                    e
                );
                Ok(config.fixed.default_body.clone())
            }
        },
        None if config.description_required => {
            bail!("description is required but no description_file is configured")
        }
        None => Ok(config.fixed.default_body.clone()),
    }
}

/// Expand and synthesize the whole catalog into its ordered row sequence.
pub fn synthesize_rows(catalog: &[CatalogEntry], config: &Config, body: String) -> Vec<Row> {
    let mut synth = Synthesizer::new(config, body);
    let mut rows = Vec::new();
    for entry in catalog {
        for unit in expand(entry, config) {
            rows.push(synth.synthesize(entry, &unit));
        }
    }
    rows
}

/// Full generate run. `check` forces link validation on top of the config's
/// own toggle.
pub fn run_generate(images: &Path, output: &Path, config: &Config, check: bool) -> Result<()> {
    info!("image folder: {}", images.display());
    info!("image host: {}", config.image_host_url);

    let body = load_body(config)?;
    let mut dates = RandomDates::new();
    let catalog = build_catalog(images, config, &mut dates)?;
    if catalog.is_empty() {
        bail!(
            "no usable product images found in {}",
            images.display()
        );
    }
    info!("{} catalog entries", catalog.len());

    let rows = synthesize_rows(&catalog, config, body);
    write_csv(output, columns(config.mode), &rows)?;
    info!("data saved to {}", output.display());

    if check || config.check_links {
        let links: Vec<&str> = rows.iter().flat_map(|r| r.links()).collect();
        let checker = LinkChecker::new(config.http_timeout_secs)?;
        checker.check_all(&links, config.max_probe_workers);
    }
    Ok(())
}

/// Print the deduplicated, ordered catalog without expanding or writing.
pub fn run_preview(images: &Path, config: &Config) -> Result<()> {
    let mut dates = RandomDates::new();
    let catalog = build_catalog(images, config, &mut dates)?;
    if catalog.is_empty() {
        bail!("no usable product images found in {}", images.display());
    }

    for entry in &catalog {
        let color = entry.color.as_deref().unwrap_or("-");
        let date = entry
            .collection_date
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<30} handle={:<16} type={:<16} color={:<10} collection={}",
            entry.filename, entry.handle, entry.type_token, color, date
        );
    }
    println!("{} entries", catalog.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::FixedDates;
    use crate::config::{ExpansionMode, IdentityKey};
    use std::fs::File;

    fn touch(dir: &Path, name: &str) {
        File::create(dir.join(name)).unwrap();
    }

    fn undated_config() -> Config {
        Config {
            collection_dates: None,
            check_links: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_scenario_a_two_files_two_rows() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Acme_Hoodie_CamGallery.png");
        touch(dir.path(), "Acme_Hoodie_Cam1.png");

        let mut config = undated_config();
        config.positions.truncate(2);

        let catalog = build_catalog(dir.path(), &config, &mut FixedDates).unwrap();
        assert_eq!(catalog.len(), 1);
        let rows = synthesize_rows(&catalog, &config, String::new());
        assert_eq!(rows.len(), 2);

        assert!(matches!(rows[0], Row::Parent(_)));
        assert_eq!(rows[0].get("Handle"), "acme");
        assert_eq!(rows[0].get("Title"), "Acme");
        assert_eq!(rows[0].get("Type"), "Hoodie");
        assert_eq!(rows[0].get("Image Position"), "1");

        assert!(matches!(rows[1], Row::Child(_)));
        assert_eq!(rows[1].get("Handle"), "acme");
        assert_eq!(rows[1].get("Image Position"), "2");
    }

    #[test]
    fn test_scenario_b_empty_directory_is_fatal_and_writes_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.csv");
        let err = run_generate(dir.path(), &out, &undated_config(), false);
        assert!(err.is_err());
        assert!(!out.exists());
    }

    #[test]
    fn test_scenario_d_shared_identity_collapses() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Foo_Shirt_Black_CamClose.png");
        touch(dir.path(), "Foo_Shirt_Black_CamFull.png");

        let config = Config {
            identity: IdentityKey::HandleTypeColor,
            parse_color: true,
            mode: ExpansionMode::Attributes,
            collection_dates: None,
            ..Config::apparel()
        };
        let catalog = build_catalog(dir.path(), &config, &mut FixedDates).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].handle, "foo");
        assert_eq!(catalog[0].type_token, "Shirt");
        assert_eq!(catalog[0].color.as_deref(), Some("black"));
    }

    #[test]
    fn test_scenario_c_failed_probes_leave_written_rows_untouched() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Acme_Hoodie_CamGallery.png");
        let out = dir.path().join("out.csv");

        // Every probe 404s; one entry times four positions is four links.
        let base = crate::probe::test_support::serve("HTTP/1.1 404 Not Found", "text/html", 4);
        let mut config = undated_config();
        config.image_host_url = format!("{}/", base);
        config.check_links = true;

        run_generate(dir.path(), &out, &config, false).unwrap();

        // The probes only warned; the written rows still carry the
        // synthesized URLs, not blanks.
        let bytes = fs::read(&out).unwrap();
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        let parent = text.lines().nth(1).unwrap();
        assert!(
            parent.contains(&format!("{}/Acme_Hoodie_CamGallery.png?v=", base)),
            "parent row lost its image link: {}",
            parent
        );
        for line in text.lines().skip(1) {
            assert!(line.contains(&format!("{}/Acme_Hoodie_Cam", base)));
        }
    }

    #[test]
    fn test_rows_per_entry_match_dimension_product() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Foo_tshirt_black_CamClose.png");
        touch(dir.path(), "Bar_tshirt_black_CamClose.png");

        let config = Config {
            check_links: false,
            ..Config::apparel()
        };
        let catalog = build_catalog(dir.path(), &config, &mut FixedDates).unwrap();
        let rows = synthesize_rows(&catalog, &config, String::new());
        assert_eq!(rows.len(), 2 * 36);
        // One parent per handle run.
        let parents = rows
            .iter()
            .filter(|r| matches!(r, Row::Parent(_)))
            .count();
        assert_eq!(parents, 2);
    }

    #[test]
    fn test_generate_writes_csv_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Acme_Hoodie_CamGallery.png");
        let out = dir.path().join("out.csv");

        run_generate(dir.path(), &out, &undated_config(), false).unwrap();
        let bytes = fs::read(&out).unwrap();
        assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
        let text = String::from_utf8(bytes[3..].to_vec()).unwrap();
        // Header plus 4 position rows.
        assert_eq!(text.lines().count(), 5);
        assert!(text.lines().next().unwrap().starts_with("Handle,Title,"));
    }

    #[test]
    fn test_missing_required_description_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Acme_Hoodie_CamGallery.png");

        let mut config = undated_config();
        config.description_file = Some(dir.path().join("no_such_body.txt"));
        config.description_required = true;

        let err = run_generate(dir.path(), &dir.path().join("out.csv"), &config, false);
        assert!(err.is_err());
    }

    #[test]
    fn test_optional_description_falls_back_to_default_body() {
        let mut config = undated_config();
        config.description_file = Some(Path::new("/no/such/file.txt").to_path_buf());
        config.description_required = false;
        config.fixed.default_body = "fallback".to_string();
        assert_eq!(load_body(&config).unwrap(), "fallback");
    }

    #[test]
    fn test_description_file_is_inlined_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "Acme_Hoodie_CamGallery.png");
        let body_path = dir.path().join("body.txt");
        fs::write(&body_path, "<p>hand-written copy</p>\n").unwrap();

        let mut config = undated_config();
        config.description_file = Some(body_path);
        config.description_required = true;

        let catalog = build_catalog(dir.path(), &config, &mut FixedDates).unwrap();
        let rows = synthesize_rows(&catalog, &config, load_body(&config).unwrap());
        assert_eq!(rows[0].get("Body (HTML)"), "<p>hand-written copy</p>\n");
    }
}
