//! Archetype data loading.
//!
//! Archetypes live in `assets/archetypes/*.toml`, each file holding one or
//! more `[[archetypes]]` tables. Files that fail to load are skipped with a
//! warning; the built-in archetypes fill any gap.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use warden_common::{ItemTypeId, Vec3};
use warden_gameplay::{
    AgentConfig, Archetype, AttackKind, DropEntry, DropKind, DropTable, PatrolRoute, WeaponKind, Waypoint,
};

/// Default asset path for archetypes.
pub const DEFAULT_ARCHETYPE_PATH: &str = "assets/archetypes";

/// Errors that can occur during archetype loading.
#[derive(Debug, Error)]
pub enum ArchetypeLoadError {
    /// Failed to read file.
    #[error("Failed to read archetype file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML.
    #[error("Failed to parse archetype TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error.
    #[error("Archetype validation error: {0}")]
    ValidationError(String),

    /// Duplicate archetype name.
    #[error("Duplicate archetype name: {0}")]
    DuplicateName(String),
}

/// Result type for archetype loading operations.
pub type ArchetypeLoadResult<T> = Result<T, ArchetypeLoadError>;

/// Contents of one archetype file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchetypeFile {
    /// File format version
    #[serde(default = "default_version")]
    pub version: String,
    /// Archetypes defined in the file
    pub archetypes: Vec<Archetype>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

/// Checks an archetype for values that cannot be clamped into shape.
pub fn validate_archetype(archetype: &Archetype) -> ArchetypeLoadResult<()> {
    if archetype.name.trim().is_empty() {
        return Err(ArchetypeLoadError::ValidationError(
            "Archetype has empty name".to_string(),
        ));
    }

    let config = &archetype.config;
    if config.max_health <= 0.0 {
        return Err(ArchetypeLoadError::ValidationError(format!(
            "Archetype {} has non-positive max_health: {}",
            archetype.name, config.max_health
        )));
    }

    for (i, entry) in archetype.drop_table.entries().iter().enumerate() {
        if !(0.0..=1.0).contains(&entry.chance) {
            return Err(ArchetypeLoadError::ValidationError(format!(
                "Archetype {} drop {} has invalid chance: {} (must be 0.0-1.0)",
                archetype.name, i, entry.chance
            )));
        }
    }

    if let AttackKind::Heavy { scale, .. } = archetype.attack {
        if scale <= 0.0 {
            return Err(ArchetypeLoadError::ValidationError(format!(
                "Archetype {} has invalid heavy attack scale: {}",
                archetype.name, scale
            )));
        }
    }

    if let Some(route) = &archetype.route {
        if !route.is_empty() && !route.is_valid() {
            warn!("Archetype {} has a route with no usable waypoints", archetype.name);
        }
    }

    Ok(())
}

/// Archetypes by name, in name order.
#[derive(Debug, Default)]
pub struct ArchetypeRegistry {
    by_name: BTreeMap<String, Archetype>,
}

impl ArchetypeRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in archetypes.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for archetype in builtin_archetypes() {
            registry.insert_or_replace(archetype);
        }
        registry
    }

    /// Number of archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Registers an archetype; names are unique.
    pub fn register(&mut self, archetype: Archetype) -> ArchetypeLoadResult<()> {
        if self.by_name.contains_key(&archetype.name) {
            return Err(ArchetypeLoadError::DuplicateName(archetype.name));
        }
        self.by_name.insert(archetype.name.clone(), archetype);
        Ok(())
    }

    /// Registers an archetype, replacing one with the same name.
    pub fn insert_or_replace(&mut self, archetype: Archetype) {
        self.by_name.insert(archetype.name.clone(), archetype);
    }

    /// Adds built-in archetypes whose names are not taken yet. Returns how
    /// many were added.
    pub fn fill_from_builtin(&mut self) -> usize {
        let mut added = 0;
        for archetype in builtin_archetypes() {
            if !self.by_name.contains_key(&archetype.name) {
                self.insert_or_replace(archetype);
                added += 1;
            }
        }
        added
    }

    /// Gets an archetype by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Archetype> {
        self.by_name.get(name)
    }

    /// Archetype names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}

/// Loads archetype files from a directory into a registry.
#[derive(Debug)]
pub struct ArchetypeLoader {
    base_path: PathBuf,
    registry: ArchetypeRegistry,
}

impl ArchetypeLoader {
    /// Creates a loader for a directory.
    #[must_use]
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            registry: ArchetypeRegistry::new(),
        }
    }

    /// Loaded archetypes.
    #[must_use]
    pub fn registry(&self) -> &ArchetypeRegistry {
        &self.registry
    }

    /// Consumes the loader, returning the registry.
    #[must_use]
    pub fn into_registry(self) -> ArchetypeRegistry {
        self.registry
    }

    /// Loads every `.toml` file in the base directory.
    ///
    /// A missing directory loads nothing. Broken files are skipped.
    pub fn load_all(&mut self) -> ArchetypeLoadResult<usize> {
        if !self.base_path.exists() {
            info!("Archetype path {} does not exist", self.base_path.display());
            return Ok(0);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(&self.base_path)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut count = 0;
        for file_path in files {
            match self.load_file(&file_path) {
                Ok(n) => {
                    count += n;
                    debug!("Loaded {} archetypes from {}", n, file_path.display());
                },
                Err(e) => {
                    warn!("Failed to load archetype file {}: {}", file_path.display(), e);
                },
            }
        }

        info!("Loaded {} archetypes total", count);
        Ok(count)
    }

    /// Loads one archetype file.
    pub fn load_file(&mut self, path: &Path) -> ArchetypeLoadResult<usize> {
        let content = fs::read_to_string(path)?;
        self.load_str(&content)
    }

    /// Loads archetypes from TOML text. Every archetype in the text is
    /// validated and checked for name clashes, within the text and against
    /// the registry, before any is registered.
    pub fn load_str(&mut self, content: &str) -> ArchetypeLoadResult<usize> {
        let file: ArchetypeFile = toml::from_str(content)?;
        let mut seen = BTreeSet::new();
        for archetype in &file.archetypes {
            validate_archetype(archetype)?;
            if !seen.insert(archetype.name.as_str()) || self.registry.get(&archetype.name).is_some() {
                return Err(ArchetypeLoadError::DuplicateName(archetype.name.clone()));
            }
        }

        let mut count = 0;
        for archetype in file.archetypes {
            self.registry.register(archetype)?;
            count += 1;
        }
        Ok(count)
    }
}

/// Archetypes available without any asset files.
#[must_use]
pub fn builtin_archetypes() -> Vec<Archetype> {
    let sentry_route = PatrolRoute::new(
        vec![
            Waypoint::new(Vec3::new(0.0, 0.0, -8.0), 1.5),
            Waypoint::new(Vec3::new(0.0, 0.0, 0.0), 0.0),
            Waypoint::new(Vec3::new(0.0, 0.0, 8.0), 1.5),
        ],
        false,
    )
    .with_speed(2.0);

    let brute_config = AgentConfig {
        max_health: 160.0,
        base_speed: 2.5,
        attack_damage: 14.0,
        attack_cooldown: 2.2,
        ..AgentConfig::default()
    };

    vec![
        Archetype::new("sentry")
            .with_route(sentry_route)
            .with_drops(
                DropKind::Standard,
                DropTable::default()
                    .with_entry(DropEntry::new(ItemTypeId::new(1)).with_quantity(1, 3).with_chance(0.8)),
            ),
        Archetype::new("brute")
            .with_config(brute_config)
            .with_attack(AttackKind::Heavy {
                scale: 1.5,
                weapon: WeaponKind::Blunt,
            })
            .with_drops(
                DropKind::Guaranteed,
                DropTable::default().with_entry(DropEntry::new(ItemTypeId::new(2))),
            ),
    ]
}
