//! Block kinds and the normalization rules shared by the incremental counter
//! and the region scanner.

use crate::error::UnknownSubject;
use crate::types::normalize_name;

const EXEMPT: u8 = 1;
const SLAB: u8 = 1 << 1;
const TECHNICAL_PISTON: u8 = 1 << 2;

macro_rules! materials {
    (@canon) => { None };
    (@canon $canon:ident) => { Some(Material::$canon) };
    {$($name:ident $(: $($flag:ident)|+)? $(=> $canon:ident)?,)*} => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[allow(non_camel_case_types)]
        pub enum Material {
            $($name,)*
        }
        impl Material {
            pub const ALL: &'static [Material] = &[$(Material::$name,)*];

            pub const fn name(self) -> &'static str {
                match self {
                    $(Material::$name => stringify!($name),)*
                }
            }
            fn lookup(name: &str) -> Option<Self> {
                match name {
                    $(stringify!($name) => Some(Material::$name),)*
                    _ => None,
                }
            }
            const fn flags(self) -> u8 {
                match self {
                    $(Material::$name => 0 $($(| $flag)+)?,)*
                }
            }
            /// The placed form this variant is attached to, if any.
            const fn attached_to(self) -> Option<Material> {
                match self {
                    $(Material::$name => materials!(@canon $($canon)?),)*
                }
            }
        }
    };
}

materials! {
    AIR: EXEMPT,
    CAVE_AIR: EXEMPT,
    VOID_AIR: EXEMPT,
    WATER: EXEMPT,
    LAVA: EXEMPT,
    FIRE: EXEMPT,
    SOUL_FIRE: EXEMPT,
    NETHER_PORTAL: EXEMPT,
    END_PORTAL: EXEMPT,
    END_GATEWAY: EXEMPT,

    STONE,
    ANDESITE,
    DIRT,
    GRASS_BLOCK,
    SAND,
    GRAVEL,
    CLAY,
    COBBLESTONE,
    BEDROCK,
    OBSIDIAN,
    NETHERRACK,
    END_STONE,
    ICE,
    SNOW,
    GLASS,
    OAK_LOG,
    OAK_PLANKS,
    OAK_LEAVES,
    COAL_ORE,
    IRON_ORE,
    GOLD_ORE,
    DIAMOND_ORE,
    EMERALD_ORE,
    IRON_BLOCK,
    GOLD_BLOCK,
    DIAMOND_BLOCK,
    EMERALD_BLOCK,
    NETHERITE_BLOCK,

    HOPPER,
    CHEST,
    TRAPPED_CHEST,
    BARREL,
    FURNACE,
    BLAST_FURNACE,
    SMOKER,
    DISPENSER,
    DROPPER,
    OBSERVER,
    SPAWNER,
    BEACON,
    CONDUIT,
    ENCHANTING_TABLE,
    ANVIL,
    BREWING_STAND,
    CAULDRON,
    JUKEBOX,
    NOTE_BLOCK,
    TNT,
    SLIME_BLOCK,
    HONEY_BLOCK,
    PISTON,
    STICKY_PISTON,
    PISTON_HEAD: TECHNICAL_PISTON => PISTON,
    MOVING_PISTON: TECHNICAL_PISTON => PISTON,

    REDSTONE_WIRE,
    REPEATER,
    COMPARATOR,
    LEVER,
    STONE_BUTTON,
    RAIL,
    POWERED_RAIL,
    REDSTONE_TORCH,
    REDSTONE_WALL_TORCH => REDSTONE_TORCH,
    TORCH,
    WALL_TORCH => TORCH,
    SOUL_TORCH,
    SOUL_WALL_TORCH => SOUL_TORCH,

    PLAYER_HEAD,
    PLAYER_WALL_HEAD => PLAYER_HEAD,
    ZOMBIE_HEAD,
    ZOMBIE_WALL_HEAD => ZOMBIE_HEAD,
    CREEPER_HEAD,
    CREEPER_WALL_HEAD => CREEPER_HEAD,
    DRAGON_HEAD,
    DRAGON_WALL_HEAD => DRAGON_HEAD,
    SKELETON_SKULL,
    SKELETON_WALL_SKULL => SKELETON_SKULL,
    WITHER_SKELETON_SKULL,
    WITHER_SKELETON_WALL_SKULL => WITHER_SKELETON_SKULL,

    OAK_SIGN,
    OAK_WALL_SIGN => OAK_SIGN,
    SPRUCE_SIGN,
    SPRUCE_WALL_SIGN => SPRUCE_SIGN,
    BIRCH_SIGN,
    BIRCH_WALL_SIGN => BIRCH_SIGN,
    WHITE_BANNER,
    WHITE_WALL_BANNER => WHITE_BANNER,
    RED_BANNER,
    RED_WALL_BANNER => RED_BANNER,

    STONE_SLAB: SLAB,
    SMOOTH_STONE_SLAB: SLAB,
    COBBLESTONE_SLAB: SLAB,
    OAK_SLAB: SLAB,

    SUGAR_CANE,
    CACTUS,
    BAMBOO,
    BAMBOO_SAPLING => BAMBOO,
    KELP,
    KELP_PLANT => KELP,
    TWISTING_VINES,
    TWISTING_VINES_PLANT => TWISTING_VINES,
    WEEPING_VINES,
    WEEPING_VINES_PLANT => WEEPING_VINES,
    CAVE_VINES,
    CAVE_VINES_PLANT => CAVE_VINES,
    CHORUS_PLANT,
    CHORUS_FLOWER,
    WHEAT,
    CARROTS,
    POTATOES,
    MELON,
    PUMPKIN,
    MELON_STEM,
    ATTACHED_MELON_STEM => MELON_STEM,
    PUMPKIN_STEM,
    ATTACHED_PUMPKIN_STEM => PUMPKIN_STEM,
    OAK_SAPLING,
    SHORT_GRASS,
    TALL_GRASS,
    VINE,
    COCOA,
}

/// Pre-flattening and renamed ids that still show up in configs and permissions.
const ALIASES: &[(&str, Material)] = &[
    ("GRASS", Material::SHORT_GRASS),
    ("SIGN", Material::OAK_SIGN),
    ("SIGN_POST", Material::OAK_SIGN),
    ("WALL_SIGN", Material::OAK_SIGN),
    ("SKULL", Material::SKELETON_SKULL),
    ("DIODE", Material::REPEATER),
    ("REDSTONE_COMPARATOR", Material::COMPARATOR),
    ("REDSTONE_TORCH_ON", Material::REDSTONE_TORCH),
    ("PISTON_BASE", Material::PISTON),
    ("PISTON_STICKY_BASE", Material::STICKY_PISTON),
    ("MOB_SPAWNER", Material::SPAWNER),
    ("SUGAR_CANE_BLOCK", Material::SUGAR_CANE),
    ("ENCHANTMENT_TABLE", Material::ENCHANTING_TABLE),
];

impl Material {
    pub fn from_name(name: &str) -> Result<Self, UnknownSubject> {
        let normalized = normalize_name(name);
        Self::lookup(&normalized)
            .or_else(|| ALIASES.iter().find(|(alias, _)| *alias == normalized).map(|(_, m)| *m))
            .ok_or_else(|| UnknownSubject::material(name))
    }
    pub const fn is_exempt(self) -> bool {
        self.flags() & EXEMPT != 0
    }
    pub const fn is_slab(self) -> bool {
        self.flags() & SLAB != 0
    }
    /// Collapses attached and segment variants onto the kind a player places.
    pub fn canonical(self) -> Material {
        self.attached_to().unwrap_or(self)
    }
}
impl std::str::FromStr for Material {
    type Err = UnknownSubject;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}
impl std::fmt::Display for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
impl serde::Serialize for Material {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}
impl<'de> serde::Deserialize<'de> for Material {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct Name;
        impl serde::de::Visitor<'_> for Name {
            type Value = Material;
            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a block name")
            }
            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Material, E> {
                Material::from_name(v).map_err(E::custom)
            }
        }
        d.deserialize_str(Name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variant {
    #[default]
    Plain,
    /// Slab filling the whole cell.
    Double,
    /// Head or moving part of a sticky piston.
    Sticky,
}

/// A cell's content as the world reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockState {
    pub material: Material,
    pub variant: Variant,
}
impl BlockState {
    pub const AIR: BlockState = BlockState::new(Material::AIR);

    pub const fn new(material: Material) -> Self {
        Self { material, variant: Variant::Plain }
    }
    pub const fn double(material: Material) -> Self {
        Self { material, variant: Variant::Double }
    }
    pub const fn sticky(material: Material) -> Self {
        Self { material, variant: Variant::Sticky }
    }
    pub fn canonical(self) -> Material {
        if self.material.flags() & TECHNICAL_PISTON != 0 {
            match self.variant {
                Variant::Sticky => Material::STICKY_PISTON,
                _ => Material::PISTON,
            }
        } else {
            self.material.canonical()
        }
    }
    /// Units of the canonical kind this cell holds.
    pub fn units(self) -> i32 {
        if self.material.is_slab() && self.variant == Variant::Double {
            2
        } else {
            1
        }
    }
    pub fn is_exempt(self) -> bool {
        self.material.is_exempt()
    }
}
impl From<Material> for BlockState {
    fn from(material: Material) -> Self {
        Self::new(material)
    }
}
