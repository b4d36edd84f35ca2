//! DefinitelyTyped packages: recognizing `@types` files and finding the
//! upstream revision each installed package was published from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset};
use regex::Regex;

use crate::config::Config;
use crate::error::Error;
use crate::history::{Coverage, RevisionIndex};

/// Path fragment every DefinitelyTyped install lives under.
const TYPES_MARKER: &str = "node_modules/@types/";

/// Publish date line written into every generated `@types` README.
const LAST_UPDATED_PATTERN: &str = r"(?im)Last updated:(.*)$";

/// An installed `@types` package, derived from one of its file paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypesPackage {
    /// Installed package directory (`…/node_modules/@types/<name>`).
    pub directory: PathBuf,
    /// Path of the file inside the package, starting with `/`.
    pub inner_path: String,
    /// Package name without the `@types/` scope.
    pub name: String,
}

/// Recognize a file inside an installed `@types` package.
/// Backslashes are treated as separators; the last `node_modules/@types/`
/// in the path wins. Returns `None` for any other file.
pub fn locate(file: &Path) -> Option<TypesPackage> {
    let normalized = file.to_string_lossy().replace('\\', "/");
    let start = normalized.rfind(TYPES_MARKER)?.saturating_add(TYPES_MARKER.len());
    let (prefix, rest) = normalized.split_at(start);
    let (name, inner) = rest.split_once('/')?;
    if name.is_empty() {
        return None;
    }

    return Some(TypesPackage {
        directory: PathBuf::from(format!("{prefix}{name}")),
        inner_path: format!("/{inner}"),
        name: name.to_string(),
    });
}

/// The bits of `package.json` used in diagnostics.
#[derive(serde::Deserialize)]
struct PackageManifest {
    /// Published package version.
    version: Option<String>,
}

/// Memoized package directory → revision lookup.
pub struct PublishRevisions<'a> {
    /// Settings for the fallback branch and warnings.
    config: &'a Config,
    /// History the publish dates are resolved against.
    history: &'a RevisionIndex,
    /// Matches the README's `Last updated:` line.
    last_updated: Regex,
    /// Revisions already decided, keyed by package directory.
    memo: HashMap<PathBuf, String>,
}

impl<'a> PublishRevisions<'a> {
    /// Create an empty memo over `history`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Pattern` if the README pattern fails to compile.
    pub fn new(config: &'a Config, history: &'a RevisionIndex) -> Result<Self, Error> {
        return Ok(Self {
            config,
            history,
            last_updated: Regex::new(LAST_UPDATED_PATTERN)?,
            memo: HashMap::new(),
        });
    }

    /// Revision (or default branch) to link `package` against. Decided once
    /// per package directory.
    pub fn revision_for(&mut self, package: &TypesPackage) -> &str {
        let config = self.config;
        let history = self.history;
        let last_updated = &self.last_updated;

        return self.memo.entry(package.directory.clone()).or_insert_with(|| {
            let published = read_publish_timestamp(package, last_updated);
            let revision = published.and_then(|timestamp| {
                match history.resolve_covered(timestamp, config.max_revision_gap()) {
                    Coverage::Covered(revision) => return Some(revision.id.clone()),
                    Coverage::TooNew => return None,
                    Coverage::Gap(nearest) => {
                        log::warn!(
                            "history snapshot has no revision within {} days before @types/{}'s publish date (nearest is {}); regenerate it or set history_file",
                            config.max_revision_gap_days,
                            package.name,
                            nearest.id
                        );
                        return None;
                    },
                }
            });

            let revision = revision.unwrap_or_else(|| {
                if config.warn_on_unstable_link {
                    log::warn!(
                        "Failed to discover git hash for @types/{} v{}, linking to {} branch. This will eventually cause broken links.",
                        package.name,
                        read_package_version(&package.directory),
                        config.default_branch
                    );
                }
                return config.default_branch.clone();
            });

            log::info!("mapping @types/{} to {revision}", package.name);
            return revision;
        });
    }
}

/// Publish time of `package` in seconds, from its README.
fn read_publish_timestamp(package: &TypesPackage, last_updated: &Regex) -> Option<f64> {
    let readme = std::fs::read_to_string(package.directory.join("README.md")).ok()?;
    let captures = last_updated.captures(&readme)?;
    let raw = captures.get(1)?.as_str().trim();

    let Some(published) = parse_publish_date(raw) else {
        log::debug!("@types/{}: unrecognized publish date `{raw}`", package.name);
        return None;
    };
    log::info!("@types/{} was updated at {}", package.name, published.to_rfc3339());

    let seconds = u32::try_from(published.timestamp()).ok()?;
    let millis = published.timestamp_subsec_millis();
    return Some(f64::from(seconds) + f64::from(millis) / 1000.0);
}

/// Parse a README date: RFC 2822 (`Wed, 02 Oct 2024 18:01:12 GMT`) or RFC 3339.
fn parse_publish_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    return DateTime::parse_from_rfc2822(raw)
        .or_else(|_err| return DateTime::parse_from_rfc3339(raw))
        .ok();
}

/// Version from `package.json`, or `unknown`.
fn read_package_version(directory: &Path) -> String {
    return std::fs::read_to_string(directory.join("package.json"))
        .ok()
        .and_then(|text| return serde_json::from_str::<PackageManifest>(&text).ok())
        .and_then(|manifest| return manifest.version)
        .unwrap_or_else(|| return "unknown".to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_types_package() {
        let package = locate(Path::new("/work/node_modules/@types/node/events.d.ts")).unwrap();
        assert_eq!(package.name, "node");
        assert_eq!(package.directory, PathBuf::from("/work/node_modules/@types/node"));
        assert_eq!(package.inner_path, "/events.d.ts");
    }

    #[test]
    fn nested_files_keep_their_inner_path() {
        let package = locate(Path::new("node_modules/@types/node/fs/promises.d.ts")).unwrap();
        assert_eq!(package.name, "node");
        assert_eq!(package.inner_path, "/fs/promises.d.ts");
    }

    #[test]
    fn last_types_marker_wins() {
        let path = Path::new("/a/node_modules/@types/x/node_modules/@types/y/index.d.ts");
        let package = locate(path).unwrap();
        assert_eq!(package.name, "y");
        assert_eq!(package.inner_path, "/index.d.ts");
    }

    #[test]
    fn backslashes_are_separators() {
        let package = locate(Path::new(r"C:\proj\node_modules\@types\react\index.d.ts")).unwrap();
        assert_eq!(package.name, "react");
        assert_eq!(package.inner_path, "/index.d.ts");
        assert_eq!(package.directory, PathBuf::from("C:/proj/node_modules/@types/react"));
    }

    #[test]
    fn other_files_are_not_packages() {
        assert_eq!(locate(Path::new("src/index.d.ts")), None);
        assert_eq!(locate(Path::new("node_modules/lodash/index.d.ts")), None);
        assert_eq!(locate(Path::new("node_modules/@types/node")), None);
    }

    #[test]
    fn publish_dates() {
        let rfc2822 = parse_publish_date("Wed, 02 Oct 2024 18:01:12 GMT").unwrap();
        assert_eq!(rfc2822.timestamp(), 1_727_892_072);
        let rfc3339 = parse_publish_date("2024-10-02T18:01:12Z").unwrap();
        assert_eq!(rfc3339.timestamp(), 1_727_892_072);
        assert!(parse_publish_date("sometime last week").is_none());
    }

    fn install(dir: &Path, name: &str, readme: Option<&str>) -> TypesPackage {
        let package_dir = dir.join("node_modules/@types").join(name);
        std::fs::create_dir_all(&package_dir).unwrap();
        if let Some(readme) = readme {
            std::fs::write(package_dir.join("README.md"), readme).unwrap();
        }
        std::fs::write(package_dir.join("package.json"), r#"{"version": "1.2.3"}"#).unwrap();
        locate(&package_dir.join("index.d.ts")).unwrap()
    }

    #[test]
    fn readme_date_resolves_to_revision() {
        let dir = tempfile::tempdir().unwrap();
        let package = install(
            dir.path(),
            "demo",
            Some("# Summary\nFiles were exported from somewhere.\n\n### Additional Details\n * Last updated: Wed, 02 Oct 2024 18:01:12 GMT\n"),
        );

        let config = Config::default();
        let history = RevisionIndex::embedded().unwrap();
        let mut revisions = PublishRevisions::new(&config, &history).unwrap();
        assert_eq!(revisions.revision_for(&package), "c1b76e12ba94c0faaf6eca5d65292be845840d02");
    }

    #[test]
    fn unknown_dates_fall_back_to_default_branch() {
        let dir = tempfile::tempdir().unwrap();
        let too_new = install(dir.path(), "fresh", Some("Last updated: Wed, 02 Oct 2024 18:49:13 GMT\n"));
        let no_readme = install(dir.path(), "bare", None);
        let garbled = install(dir.path(), "odd", Some("Last updated: whenever\n"));

        let config = Config {
            default_branch: "main".to_string(),
            ..Config::default()
        };
        let history = RevisionIndex::embedded().unwrap();
        let mut revisions = PublishRevisions::new(&config, &history).unwrap();
        assert_eq!(revisions.revision_for(&too_new), "main");
        assert_eq!(revisions.revision_for(&no_readme), "main");
        assert_eq!(revisions.revision_for(&garbled), "main");
    }

    #[test]
    fn sparse_history_is_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        // The embedded snapshot jumps from 2012 straight to October 2024.
        let package = install(dir.path(), "node", Some("Last updated: Fri, 27 Sep 2024 16:08:32 GMT\n"));

        let config = Config::default();
        let history = RevisionIndex::embedded().unwrap();
        let mut revisions = PublishRevisions::new(&config, &history).unwrap();
        assert_eq!(revisions.revision_for(&package), "master");

        let unlimited = Config {
            max_revision_gap_days: 0,
            ..Config::default()
        };
        let mut revisions = PublishRevisions::new(&unlimited, &history).unwrap();
        assert_eq!(revisions.revision_for(&package), "a976315cac");
    }

    #[test]
    fn external_snapshot_resolves_recent_publish() {
        let dir = tempfile::tempdir().unwrap();
        let package = install(dir.path(), "node", Some("Last updated: Fri, 27 Sep 2024 16:08:32 GMT\n"));
        let history = RevisionIndex::parse(
            "c1b76e12ba94c0faaf6eca5d65292be845840d02 1727892072\n\
             4b49cac49912d6036a706ab6675c6c93751de00c 1727453312\n\
             a976315cac 1349455778\n",
        )
        .unwrap();

        let config = Config::default();
        let mut revisions = PublishRevisions::new(&config, &history).unwrap();
        assert_eq!(revisions.revision_for(&package), "4b49cac49912d6036a706ab6675c6c93751de00c");
    }

    #[test]
    fn decision_is_memoized_per_package() {
        let dir = tempfile::tempdir().unwrap();
        let package = install(dir.path(), "demo", Some("Last updated: Wed, 02 Oct 2024 18:01:12 GMT\n"));

        let config = Config::default();
        let history = RevisionIndex::embedded().unwrap();
        let mut revisions = PublishRevisions::new(&config, &history).unwrap();
        let first = revisions.revision_for(&package).to_string();

        // A README edited mid-run is not re-read.
        std::fs::write(package.directory.join("README.md"), "Last updated: Thu, 01 Jan 1970 00:00:00 GMT\n").unwrap();
        assert_eq!(revisions.revision_for(&package), first);
    }

    #[test]
    fn version_for_warnings() {
        let dir = tempfile::tempdir().unwrap();
        let package = install(dir.path(), "demo", None);
        assert_eq!(read_package_version(&package.directory), "1.2.3");
        assert_eq!(read_package_version(dir.path()), "unknown");
    }
}
