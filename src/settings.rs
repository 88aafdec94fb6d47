use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use serde_json::Value;

use crate::entity::{EntityGroup, EntityKind};
use crate::error::{ConfigIssue, SettingsError, UnknownSubject};
use crate::material::Material;

pub const BUILTIN_SETTINGS: &str = include_str!("data/settings.json");

/// Default caps, per-world overrides, entity groups and the knobs that shape
/// counting and recounting. Read-only once loaded.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    game_modes: Vec<String>,
    block_caps: HashMap<Material, i32>,
    world_block_caps: HashMap<String, HashMap<Material, i32>>,
    entity_caps: HashMap<EntityKind, i32>,
    world_entity_caps: HashMap<String, HashMap<EntityKind, i32>>,
    groups: Vec<EntityGroup>,
    world_group_caps: HashMap<String, HashMap<String, i32>>,
    options: Options,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Options {
    pub ignore_center_block: bool,
    /// Changes a territory accumulates before its record is written.
    pub flush_threshold: u32,
    pub tag_bypassed_entities: bool,
    /// Let golems and withers spawn, then re-check them on the next tick.
    pub async_structure_spawns: bool,
    pub scan: ScanSettings,
}
impl Default for Options {
    fn default() -> Self {
        Self {
            ignore_center_block: true,
            flush_threshold: 10,
            tag_bypassed_entities: true,
            async_structure_spawns: false,
            scan: ScanSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    pub max_concurrent_scans: usize,
    pub chunks_per_batch: usize,
    pub timeout_secs: u64,
    /// Minimum time between two scheduler passes.
    pub interval_ms: u64,
    /// Counting threads. Zero counts on the tick thread.
    pub workers: usize,
}
impl ScanSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            max_concurrent_scans: 1,
            chunks_per_batch: 100,
            timeout_secs: 300,
            interval_ms: 500,
            workers: 1,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    game_modes: Vec<String>,
    blocks: BTreeMap<String, Value>,
    entities: BTreeMap<String, Value>,
    entity_groups: Vec<Value>,
    worlds: BTreeMap<String, RawWorld>,
    #[serde(flatten)]
    options: Options,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawWorld {
    blocks: BTreeMap<String, Value>,
    entities: BTreeMap<String, Value>,
    groups: BTreeMap<String, Value>,
}

impl Settings {
    pub fn builtin() -> Self {
        Self::from_json_str(BUILTIN_SETTINGS).expect("builtin limits settings should parse")
    }

    /// Parses settings, logging and skipping every bad entry.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let (settings, issues) = Self::parse(json)?;
        for issue in &issues {
            log::warn!("skipping limits setting: {issue}");
        }
        Ok(settings)
    }

    /// Parses settings and hands back the entries that were skipped.
    pub fn parse(json: &str) -> Result<(Self, Vec<ConfigIssue>), SettingsError> {
        let raw: RawSettings = serde_json::from_str(json)?;
        let mut issues = vec![];
        let block_caps = caps("blocks", &raw.blocks, Material::from_name, &mut issues);
        let entity_caps = caps("entities", &raw.entities, EntityKind::from_name, &mut issues);
        let groups = groups(&raw.entity_groups, &mut issues);

        let mut world_block_caps = HashMap::new();
        let mut world_entity_caps = HashMap::new();
        let mut world_group_caps = HashMap::new();
        for (world, overrides) in &raw.worlds {
            let section = format!("worlds.{world}");
            let blocks = caps(&format!("{section}.blocks"), &overrides.blocks, Material::from_name, &mut issues);
            let entities = caps(&format!("{section}.entities"), &overrides.entities, EntityKind::from_name, &mut issues);
            let group_names = |name: &str| {
                groups
                    .iter()
                    .find(|g| g.name.eq_ignore_ascii_case(name))
                    .map(|g| g.name.clone())
                    .ok_or_else(|| UnknownSubject { kind: "entity group", name: name.to_owned() })
            };
            let group_caps = caps(&format!("{section}.groups"), &overrides.groups, group_names, &mut issues);
            world_block_caps.insert(world.clone(), blocks);
            world_entity_caps.insert(world.clone(), entities);
            world_group_caps.insert(world.clone(), group_caps);
        }

        let settings = Settings {
            game_modes: raw.game_modes,
            block_caps,
            world_block_caps,
            entity_caps,
            world_entity_caps,
            groups,
            world_group_caps,
            options: raw.options,
        };
        Ok((settings, issues))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// Reads the file named by `MCLIMITS_CONFIG`, falling back to the builtin settings.
    pub fn from_env() -> Self {
        match env::var_os("MCLIMITS_CONFIG") {
            Some(path) => match Self::from_file(&path) {
                Ok(settings) => {
                    log::info!("loaded limits settings from {}", Path::new(&path).display());
                    settings
                }
                Err(err) => {
                    log::warn!("{err}; using builtin limits settings");
                    Self::builtin()
                }
            },
            None => Self::builtin(),
        }
    }

    pub fn game_modes(&self) -> &[String] {
        &self.game_modes
    }
    pub fn options(&self) -> &Options {
        &self.options
    }
    pub fn scan(&self) -> &ScanSettings {
        &self.options.scan
    }

    pub fn default_block_cap(&self, material: Material) -> Option<i32> {
        self.block_caps.get(&material).copied()
    }
    pub fn world_block_cap(&self, world: &str, material: Material) -> Option<i32> {
        self.world_block_caps.get(world)?.get(&material).copied()
    }
    pub fn default_entity_cap(&self, kind: EntityKind) -> Option<i32> {
        self.entity_caps.get(&kind).copied()
    }
    pub fn world_entity_cap(&self, world: &str, kind: EntityKind) -> Option<i32> {
        self.world_entity_caps.get(world)?.get(&kind).copied()
    }
    pub fn world_group_cap(&self, world: &str, group: &str) -> Option<i32> {
        self.world_group_caps.get(world)?.get(group).copied()
    }

    /// Materials capped by default or in `world`.
    pub fn capped_materials<'a>(&'a self, world: &str) -> impl Iterator<Item = Material> + 'a {
        let overrides = self.world_block_caps.get(world);
        self.block_caps.keys().chain(overrides.into_iter().flat_map(|o| o.keys())).copied()
    }

    pub fn groups(&self) -> &[EntityGroup] {
        &self.groups
    }
    /// Groups containing `kind`, in configuration order.
    pub fn groups_of(&self, kind: EntityKind) -> impl Iterator<Item = &EntityGroup> {
        self.groups.iter().filter(move |g| g.contains(kind))
    }
    pub fn group(&self, name: &str) -> Option<&EntityGroup> {
        self.groups.iter().find(|g| g.name.eq_ignore_ascii_case(name))
    }
}

fn cap_value(section: &str, key: &str, value: &Value) -> Result<i32, ConfigIssue> {
    value
        .as_i64()
        .filter(|v| (0..=i32::MAX as i64).contains(v))
        .map(|v| v as i32)
        .ok_or_else(|| ConfigIssue::Malformed {
            section: section.to_owned(),
            key: key.to_owned(),
            reason: format!("cap must be a whole number from 0 to {}, got {value}", i32::MAX),
        })
}

fn caps<K: std::hash::Hash + Eq>(
    section: &str,
    raw: &BTreeMap<String, Value>,
    parse: impl Fn(&str) -> Result<K, UnknownSubject>,
    issues: &mut Vec<ConfigIssue>,
) -> HashMap<K, i32> {
    let mut caps = HashMap::new();
    for (name, value) in raw {
        let subject = match parse(name) {
            Ok(subject) => subject,
            Err(source) => {
                issues.push(ConfigIssue::Unknown { section: section.to_owned(), source });
                continue;
            }
        };
        match cap_value(section, name, value) {
            Ok(cap) => {
                caps.insert(subject, cap);
            }
            Err(issue) => issues.push(issue),
        }
    }
    caps
}

fn groups(raw: &[Value], issues: &mut Vec<ConfigIssue>) -> Vec<EntityGroup> {
    let mut groups: Vec<EntityGroup> = vec![];
    for (i, def) in raw.iter().enumerate() {
        let malformed = |key: String, reason: &str| ConfigIssue::Malformed {
            section: "entity_groups".to_owned(),
            key,
            reason: reason.to_owned(),
        };
        let Some(name) = def.get("name").and_then(Value::as_str) else {
            issues.push(malformed(format!("#{i}"), "group has no name"));
            continue;
        };
        if groups.iter().any(|g| g.name.eq_ignore_ascii_case(name)) {
            issues.push(malformed(name.to_owned(), "duplicate group name"));
            continue;
        }
        let default_cap = match def.get("limit") {
            Some(limit) => match cap_value("entity_groups", name, limit) {
                Ok(cap) => cap,
                Err(issue) => {
                    issues.push(issue);
                    continue;
                }
            },
            None => {
                issues.push(malformed(name.to_owned(), "group has no limit"));
                continue;
            }
        };
        let section = format!("entity_groups.{name}");
        let mut members = std::collections::BTreeSet::new();
        for member in def.get("members").and_then(Value::as_array).into_iter().flatten() {
            match member.as_str().map(EntityKind::from_name) {
                Some(Ok(kind)) => {
                    members.insert(kind);
                }
                Some(Err(source)) => issues.push(ConfigIssue::Unknown { section: section.clone(), source }),
                None => issues.push(malformed(name.to_owned(), "members must be entity names")),
            }
        }
        if members.is_empty() {
            issues.push(malformed(name.to_owned(), "group has no valid members"));
            continue;
        }
        let icon = match def.get("icon").and_then(Value::as_str).map(Material::from_name) {
            Some(Ok(icon)) => icon,
            Some(Err(source)) => {
                issues.push(ConfigIssue::Unknown { section, source });
                Material::SPAWNER
            }
            None => Material::SPAWNER,
        };
        groups.push(EntityGroup { name: name.to_owned(), members, default_cap, icon });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_settings_parse_cleanly() {
        let (settings, issues) = Settings::parse(BUILTIN_SETTINGS).unwrap();
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(settings.default_block_cap(Material::HOPPER), Some(30));
        assert_eq!(settings.world_block_cap("bskyblock_world_nether", Material::HOPPER), Some(15));
        assert_eq!(settings.groups().len(), 3);
        assert_eq!(settings.scan().chunks_per_batch, 100);
    }

    #[test]
    fn bad_entries_are_skipped_and_reported() {
        let (settings, issues) = Settings::parse(
            r#"{
                "blocks": { "HOPPER": 4, "NOT_A_BLOCK": 3, "CHEST": -1, "TNT": "many" },
                "entities": { "ZOMBIE": 10 },
                "entity_groups": [
                    { "name": "MOBS", "members": ["ZOMBIE", "GOBLIN"], "limit": 10 },
                    { "name": "EMPTY", "members": ["GOBLIN"], "limit": 3 },
                    { "name": "mobs", "members": ["SKELETON"], "limit": 1 },
                    { "members": ["COW"], "limit": 3 }
                ],
                "worlds": { "sky": { "groups": { "mobs": 4, "ANIMALS": 2 } } }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.default_block_cap(Material::HOPPER), Some(4));
        assert_eq!(settings.default_block_cap(Material::CHEST), None);
        assert_eq!(settings.default_block_cap(Material::TNT), None);
        assert_eq!(settings.groups().len(), 1);
        assert_eq!(settings.world_group_cap("sky", "MOBS"), Some(4));
        // NOT_A_BLOCK, CHEST, TNT, GOBLIN twice, EMPTY, duplicate mobs, nameless, ANIMALS
        assert_eq!(issues.len(), 9, "{issues:?}");
        assert!(issues.iter().any(|i| matches!(i, ConfigIssue::Unknown { source, .. } if source.name == "NOT_A_BLOCK")));
    }

    #[test]
    fn defaults_apply_to_missing_options() {
        let settings = Settings::from_json_str("{}").unwrap();
        let options = settings.options();
        assert!(options.ignore_center_block);
        assert_eq!(options.flush_threshold, 10);
        assert_eq!(options.scan.max_concurrent_scans, 1);
        assert_eq!(options.scan.timeout(), Duration::from_secs(300));
    }

    #[test]
    fn groups_keep_configuration_order() {
        let settings = Settings::from_json_str(
            r#"{ "entity_groups": [
                { "name": "B", "members": ["ZOMBIE"], "limit": 2 },
                { "name": "A", "members": ["ZOMBIE", "COW"], "limit": 1 }
            ] }"#,
        )
        .unwrap();
        let names: Vec<_> = settings.groups_of(EntityKind::ZOMBIE).map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }
}
