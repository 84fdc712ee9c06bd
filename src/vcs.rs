//! Git metadata captured at build time
//!
//! Build scripts call [`VcsStamp::discover`] on their manifest directory and
//! [`VcsStamp::emit_cargo_env`] to hand the result to the compiler. The
//! `build_info!` macro picks the values up again in the compiled binary.
//!
//! This file is also compiled into this crate's own build script, so it only
//! depends on `git2`, `chrono` and `thiserror`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use git2::{Commit, Oid, Repository};
use thiserror::Error;

pub const VERSION_ENV: &str = "VERBTREE_MAIN_VERSION";
pub const REVISION_ENV: &str = "VERBTREE_VCS_REVISION";
pub const TIME_ENV: &str = "VERBTREE_VCS_TIME";

/// Errors that can occur while reading repository metadata
#[derive(Error, Debug)]
pub enum VcsError {
    #[error("No git repository found at or above {path}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: git2::Error,
    },
    #[error("Unable to read HEAD commit: {0}")]
    Head(#[from] git2::Error),
    #[error("Commit time {0} is out of range")]
    InvalidTime(i64),
}

/// Revision, commit time and release tag of a checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsStamp {
    /// Full commit id of HEAD.
    pub revision: String,
    /// Commit time of HEAD as RFC 3339 in UTC.
    pub time: String,
    /// A `vMAJOR.MINOR.PATCH` tag pointing at HEAD, if any.
    pub tag: Option<String>,
    /// The repository's `.git` directory.
    pub git_dir: PathBuf,
}

impl VcsStamp {
    /// Read HEAD of the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns `VcsError::NotFound` outside of a repository, and also when
    /// `path` lies inside a repository's working tree without being tracked at
    /// HEAD (an ignored vendor or registry directory, say). Returns
    /// `VcsError::Head` if HEAD cannot be resolved to a commit (for example in
    /// a repository without commits).
    pub fn discover(path: &Path) -> Result<VcsStamp, VcsError> {
        let repo = Repository::discover(path).map_err(|source| VcsError::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let commit = repo.head()?.peel_to_commit()?;
        ensure_tracked(&repo, &commit, path)?;
        let seconds = commit.time().seconds();
        let time = DateTime::<Utc>::from_timestamp(seconds, 0)
            .ok_or(VcsError::InvalidTime(seconds))?;
        Ok(VcsStamp {
            revision: commit.id().to_string(),
            time: time.to_rfc3339_opts(SecondsFormat::Secs, true),
            tag: release_tag(&repo, commit.id())?,
            git_dir: repo.path().to_path_buf(),
        })
    }

    /// The `rustc-env` variables describing this stamp.
    #[must_use]
    pub fn cargo_env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            (REVISION_ENV, self.revision.clone()),
            (TIME_ENV, self.time.clone()),
        ];
        if let Some(tag) = &self.tag {
            env.push((VERSION_ENV, tag.clone()));
        }
        env
    }

    /// Print the cargo directives that embed this stamp and rebuild when HEAD
    /// moves.
    pub fn emit_cargo_env(&self) {
        for name in ["HEAD", "refs", "packed-refs"] {
            println!("cargo:rerun-if-changed={}", self.git_dir.join(name).display());
        }
        for (key, value) in self.cargo_env() {
            println!("cargo:rustc-env={key}={value}");
        }
    }
}

/// Fail with `VcsError::NotFound` unless `path` is the working directory of
/// `repo` or a directory recorded in the tree of `head`.
fn ensure_tracked(repo: &Repository, head: &Commit<'_>, path: &Path) -> Result<(), VcsError> {
    let not_found = |message: &str| VcsError::NotFound {
        path: path.to_path_buf(),
        source: git2::Error::from_str(message),
    };
    let workdir = repo
        .workdir()
        .ok_or_else(|| not_found("repository has no working directory"))?;
    let workdir = workdir
        .canonicalize()
        .unwrap_or_else(|_| workdir.to_path_buf());
    let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    let relative = target
        .strip_prefix(&workdir)
        .map_err(|_| not_found("path is outside the working directory"))?;
    if relative.as_os_str().is_empty() {
        return Ok(());
    }
    match head.tree()?.get_path(relative) {
        Ok(entry) if entry.kind() == Some(git2::ObjectType::Tree) => Ok(()),
        _ => Err(not_found("path is not tracked at HEAD")),
    }
}

/// The highest release tag pointing at `head`.
fn release_tag(repo: &Repository, head: Oid) -> Result<Option<String>, git2::Error> {
    let mut found: Option<(Vec<u64>, String)> = None;
    for name in repo.tag_names(Some("v*"))?.iter().flatten() {
        let Some(parts) = release_parts(name) else {
            continue;
        };
        let target = repo
            .revparse_single(&format!("refs/tags/{name}"))?
            .peel_to_commit()?;
        if target.id() == head && found.as_ref().is_none_or(|(best, _)| parts > *best) {
            found = Some((parts, name.to_string()));
        }
    }
    Ok(found.map(|(_, name)| name))
}

/// Numeric components of a `vMAJOR.MINOR.PATCH` tag.
fn release_parts(tag: &str) -> Option<Vec<u64>> {
    let parts = tag
        .strip_prefix('v')?
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    (parts.len() == 3).then_some(parts)
}
