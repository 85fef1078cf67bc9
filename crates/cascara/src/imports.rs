//! `@import` resolution.
//!
//! The engine resolves import targets against a base location and asks an
//! [`ImportResolver`] for the CSS text, which is then spliced into the
//! parse in place. [`FileImporter`] covers local files; network schemes
//! are left to caller-provided resolver implementations.

use std::fs;
use std::path::PathBuf;

use url::Url;

use crate::error::Error;

/// The location imports are resolved against.
#[derive(Debug, Clone, Default)]
pub struct ImportBase {
    /// Base URI (takes precedence over `dir` when both are set).
    pub uri: Option<Url>,
    /// Base directory for plain relative targets.
    pub dir: Option<PathBuf>,
}

/// An import target resolved to an absolute location.
#[derive(Debug, Clone)]
pub enum ResolvedImport {
    Url(Url),
    Path(PathBuf),
}

impl ResolvedImport {
    /// The URI scheme this import would fetch through.
    pub fn scheme(&self) -> &str {
        match self {
            Self::Url(url) => url.scheme(),
            Self::Path(_) => "file",
        }
    }

    /// A stable identity string, used to detect circular imports.
    pub fn key(&self) -> String {
        match self {
            Self::Url(url) => url.as_str().to_string(),
            Self::Path(path) => path.to_string_lossy().into_owned(),
        }
    }

    /// The base location for imports nested inside the imported sheet.
    pub fn child_base(&self) -> ImportBase {
        match self {
            // A URL is its own join base: relative siblings resolve
            // against its final path segment.
            Self::Url(url) => ImportBase {
                uri: Some(url.clone()),
                dir: None,
            },
            Self::Path(path) => ImportBase {
                uri: None,
                dir: path.parent().map(|p| p.to_path_buf()),
            },
        }
    }
}

/// Resolve an import target against a base location.
pub fn absolutize(base: &ImportBase, target: &str) -> crate::Result<ResolvedImport> {
    // Already absolute?
    if let Ok(url) = Url::parse(target) {
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| Error::import(target, "unusable file: URL"))?;
            return Ok(ResolvedImport::Path(path));
        }
        return Ok(ResolvedImport::Url(url));
    }

    if let Some(uri) = &base.uri {
        let joined = uri
            .join(target)
            .map_err(|err| Error::import(target, err.to_string()))?;
        if joined.scheme() == "file" {
            let path = joined
                .to_file_path()
                .map_err(|_| Error::import(target, "unusable file: URL"))?;
            return Ok(ResolvedImport::Path(path));
        }
        return Ok(ResolvedImport::Url(joined));
    }

    if let Some(dir) = &base.dir {
        return Ok(ResolvedImport::Path(dir.join(target)));
    }

    Ok(ResolvedImport::Path(PathBuf::from(target)))
}

/// Fetches the CSS text for one import.
pub trait ImportResolver {
    fn resolve(&self, base: &ImportBase, target: &str) -> crate::Result<String>;
}

/// Resolver for local filesystem imports. Any non-`file` scheme fails; use
/// a custom [`ImportResolver`] to fetch over the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileImporter;

impl ImportResolver for FileImporter {
    fn resolve(&self, base: &ImportBase, target: &str) -> crate::Result<String> {
        match absolutize(base, target)? {
            ResolvedImport::Path(path) => {
                fs::read_to_string(&path).map_err(|err| Error::io(path, err))
            }
            ResolvedImport::Url(url) => Err(Error::import(
                target,
                format!("FileImporter cannot fetch '{}' URLs", url.scheme()),
            )),
        }
    }
}
