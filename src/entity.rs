use std::collections::BTreeSet;

use crate::error::UnknownSubject;
use crate::material::Material;
use crate::types::normalize_name;

macro_rules! entity_kinds {
    {$($name:ident,)*} => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[allow(non_camel_case_types)]
        pub enum EntityKind {
            $($name,)*
        }
        impl EntityKind {
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$name,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(EntityKind::$name => stringify!($name),)*
                }
            }
            fn lookup(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(EntityKind::$name),)*
                    _ => None,
                }
            }
        }
    };
}

entity_kinds! {
    ZOMBIE,
    HUSK,
    DROWNED,
    SKELETON,
    STRAY,
    CREEPER,
    SPIDER,
    CAVE_SPIDER,
    ENDERMAN,
    WITCH,
    SLIME,
    MAGMA_CUBE,
    BLAZE,
    GHAST,
    PIGLIN,
    ZOMBIFIED_PIGLIN,
    WITHER_SKELETON,
    SHULKER,
    COW,
    MOOSHROOM,
    PIG,
    SHEEP,
    CHICKEN,
    HORSE,
    RABBIT,
    WOLF,
    CAT,
    BEE,
    AXOLOTL,
    VILLAGER,
    IRON_GOLEM,
    SNOW_GOLEM,
    WITHER,
    ENDER_DRAGON,
    BOAT,
    MINECART,
    HOPPER_MINECART,
    CHEST_MINECART,
    ARMOR_STAND,
    ITEM_FRAME,
    GLOW_ITEM_FRAME,
    PAINTING,
}

const ALIASES: &[(&str, EntityKind)] = &[
    ("SNOWMAN", EntityKind::SNOW_GOLEM),
    ("PIG_ZOMBIE", EntityKind::ZOMBIFIED_PIGLIN),
    ("MUSHROOM_COW", EntityKind::MOOSHROOM),
    ("MINECART_HOPPER", EntityKind::HOPPER_MINECART),
    ("MINECART_CHEST", EntityKind::CHEST_MINECART),
];

impl EntityKind {
    pub fn from_name(name: &str) -> Result<Self, UnknownSubject> {
        let normalized = normalize_name(name);
        Self::lookup(&normalized)
            .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == normalized).map(|(_, k)| *k))
            .ok_or_else(|| UnknownSubject::entity(name))
    }
    /// Kinds a player assembles out of blocks.
    pub const fn is_structure_built(self) -> bool {
        matches!(self, EntityKind::IRON_GOLEM | EntityKind::SNOW_GOLEM | EntityKind::WITHER)
    }
}
impl std::str::FromStr for EntityKind {
    type Err = UnknownSubject;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
impl serde::Serialize for EntityKind {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}
impl<'de> serde::Deserialize<'de> for EntityKind {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Name;
        impl serde::de::Visitor<'_> for Name {
            type Value = EntityKind;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an entity name")
            }
            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<EntityKind, E> {
                EntityKind::from_name(v).map_err(E::custom)
            }
        }
        d.deserialize_str(Name)
    }
}

/// Named set of entity kinds sharing one extra cap. Two groups are the same
/// group when their names match.
#[derive(Debug, Clone)]
pub struct EntityGroup {
    pub name: String,
    pub members: BTreeSet<EntityKind>,
    pub default_cap: i32,
    pub icon: Material,
}
impl EntityGroup {
    pub fn contains(&self, kind: EntityKind) -> bool {
        self.members.contains(&kind)
    }
}
impl PartialEq for EntityGroup {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for EntityGroup {}
impl std::hash::Hash for EntityGroup {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
