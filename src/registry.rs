//! Project registry maintenance for the translation repository.
//!
//! The repository root holds `version.json`, a flat object mapping project ids
//! to `MAJOR.MINOR.PATCH` strings, plus one folder per project with a JSON
//! table per language. Clients compare the manifest version against their
//! cached one, so bumping a project's version is what publishes new text.

use crate::error::RegistryError;
use crate::i18n::Language;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Number given to the first project when the registry has none.
pub const FIRST_PROJECT_NUMBER: u32 = 47;

/// Version assigned to a newly registered project.
pub const INITIAL_VERSION: Version = Version {
    major: 1,
    minor: 0,
    patch: 0,
};

static PROJECT_ID_REGEX: OnceLock<Regex> = OnceLock::new();

/// Semantic version as stored in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Next version for a change of the given size.
    pub fn bump(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self::new(self.major + 1, 0, 0),
            BumpKind::Minor => Self::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => Self::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl FromStr for Version {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidVersion(s.to_string());

        let parts: Vec<&str> = s.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self::new(numbers[0], numbers[1], numbers[2]))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Size of a published change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum BumpKind {
    /// 1.0.0 -> 1.0.1 (fixes, small text changes)
    #[default]
    Patch,
    /// 1.0.0 -> 1.1.0 (new keys)
    Minor,
    /// 1.0.0 -> 2.0.0 (restructured tables)
    Major,
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BumpKind::Patch => "patch",
            BumpKind::Minor => "minor",
            BumpKind::Major => "major",
        })
    }
}

/// Check the `<number><CamelCaseName>` shape, e.g. `52NewProject`.
pub fn validate_project_id(id: &str) -> Result<(), RegistryError> {
    let regex = PROJECT_ID_REGEX.get_or_init(|| Regex::new(r"^\d+[A-Z][a-zA-Z]+$").unwrap());
    if regex.is_match(id) {
        Ok(())
    } else {
        Err(RegistryError::InvalidProjectId(id.to_string()))
    }
}

/// Leading number of a project id, if any.
fn project_number(id: &str) -> Option<u32> {
    let digits: String = id.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// In-memory copy of `version.json`, written back in key order.
#[derive(Debug, Clone)]
pub struct ProjectRegistry {
    path: PathBuf,
    entries: Map<String, Value>,
    /// Whether the manifest was read from disk rather than started empty
    on_disk: bool,
}

impl ProjectRegistry {
    /// Read an existing manifest.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let content = fs::read_to_string(&path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let entries = serde_json::from_str(&content).map_err(|source| RegistryError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        debug!("Loaded registry from {}", path.display());
        Ok(Self {
            path,
            entries,
            on_disk: true,
        })
    }

    /// Read a manifest, starting empty when the file does not exist yet.
    pub fn load_or_default(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self {
                path,
                entries: Map::new(),
                on_disk: false,
            })
        }
    }

    /// Write the manifest as 2-space indented JSON.
    pub fn save(&self) -> Result<(), RegistryError> {
        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            RegistryError::Parse {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        fs::write(&self.path, json).map_err(|source| RegistryError::Io {
            path: self.path.display().to_string(),
            source,
        })?;

        info!("Saved registry to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw version string of a project.
    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).and_then(Value::as_str)
    }

    /// `(id, version)` pairs in file order.
    pub fn projects(&self) -> Vec<(&str, &str)> {
        self.entries
            .iter()
            .map(|(id, version)| (id.as_str(), version.as_str().unwrap_or("")))
            .collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Raise a project's version. Returns the old and new versions.
    pub fn bump(&mut self, id: &str, kind: BumpKind) -> Result<(Version, Version), RegistryError> {
        let current: Version = self
            .get(id)
            .ok_or_else(|| RegistryError::UnknownProject(id.to_string()))?
            .parse()?;
        let next = current.bump(kind);

        self.entries
            .insert(id.to_string(), Value::String(next.to_string()));
        info!("{}: {} -> {} ({})", id, current, next, kind);
        Ok((current, next))
    }

    /// Register a project at [`INITIAL_VERSION`] and re-sort the manifest by
    /// project number. Returns `false` when the project already exists.
    pub fn add_project(&mut self, id: &str) -> Result<bool, RegistryError> {
        validate_project_id(id)?;
        if self.contains(id) {
            debug!("{} is already registered", id);
            return Ok(false);
        }

        self.entries
            .insert(id.to_string(), Value::String(INITIAL_VERSION.to_string()));

        let mut entries: Vec<(String, Value)> = std::mem::take(&mut self.entries).into_iter().collect();
        entries.sort_by_key(|(key, _)| project_number(key).unwrap_or(0));
        self.entries = entries.into_iter().collect();

        info!("Registered {} at {}", id, INITIAL_VERSION);
        Ok(true)
    }

    /// One past the highest project number in use.
    ///
    /// A fresh repository without `version.json` starts at
    /// [`FIRST_PROJECT_NUMBER`]; an existing manifest with no numbered ids
    /// starts at 1.
    pub fn next_project_number(&self) -> u32 {
        if !self.on_disk && self.entries.is_empty() {
            return FIRST_PROJECT_NUMBER;
        }
        self.entries
            .keys()
            .filter_map(|id| project_number(id))
            .max()
            .unwrap_or(0)
            .saturating_add(1)
    }
}

/// Create `{repo_root}/{id}/` with an empty table per supported language.
///
/// Returns `false` without touching anything when the folder already exists.
pub fn scaffold_project(repo_root: &Path, id: &str) -> Result<bool, RegistryError> {
    validate_project_id(id)?;

    let project_dir = repo_root.join(id);
    if project_dir.exists() {
        debug!("Project folder already exists: {}", project_dir.display());
        return Ok(false);
    }

    let io_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| RegistryError::Io { path, source }
    };

    fs::create_dir_all(&project_dir).map_err(io_err(&project_dir))?;
    for language in Language::all() {
        let file = project_dir.join(format!("{}.json", language.code()));
        fs::write(&file, "{}").map_err(io_err(&file))?;
        debug!("Created {}", file.display());
    }

    info!("Created project folder {}", project_dir.display());
    Ok(true)
}
