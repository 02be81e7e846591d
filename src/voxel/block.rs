//! Block materials and their static properties

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::Error;

/// Material of a single block.
///
/// `Air` exists so that external data (save files, input requests) can name
/// it, but it is never stored: absence of a block *is* air.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    Air = 0,
    Dirt,
    DirtWithGrass,
    Sand,
    Cobblestone,
    BrickCobblestone,
    Brick,
    /// Indestructible boundary material.
    Bedstone,
    Log,
    Leaves,
    Snow,
    WoodenPlanks,
    Cloud,
    DirtWithSnow,
    Water,
    Stone,
    StoneWithSnow,
    CoalOre,
    IronOre,
    GoldOre,
}

/// Static per-kind properties.
#[derive(Clone, Copy, Debug)]
pub struct BlockProperties {
    pub name: &'static str,
    pub indestructible: bool,
}

const fn props(name: &'static str) -> BlockProperties {
    BlockProperties { name, indestructible: false }
}

/// Property table indexed by the `u8` discriminant.
const PROPERTIES: [BlockProperties; BlockType::COUNT] = [
    props("air"),
    props("dirt"),
    props("dirt_with_grass"),
    props("sand"),
    props("cobblestone"),
    props("brick_cobblestone"),
    props("brick"),
    BlockProperties { name: "bedstone", indestructible: true },
    props("log"),
    props("leaves"),
    props("snow"),
    props("wooden_planks"),
    props("cloud"),
    props("dirt_with_snow"),
    props("water"),
    props("stone"),
    props("stone_with_snow"),
    props("coal_ore"),
    props("iron_ore"),
    props("gold_ore"),
];

impl BlockType {
    /// Number of kinds, including `Air`.
    pub const COUNT: usize = 20;

    /// Every kind in discriminant order.
    pub const ALL: [BlockType; Self::COUNT] = [
        BlockType::Air,
        BlockType::Dirt,
        BlockType::DirtWithGrass,
        BlockType::Sand,
        BlockType::Cobblestone,
        BlockType::BrickCobblestone,
        BlockType::Brick,
        BlockType::Bedstone,
        BlockType::Log,
        BlockType::Leaves,
        BlockType::Snow,
        BlockType::WoodenPlanks,
        BlockType::Cloud,
        BlockType::DirtWithSnow,
        BlockType::Water,
        BlockType::Stone,
        BlockType::StoneWithSnow,
        BlockType::CoalOre,
        BlockType::IronOre,
        BlockType::GoldOre,
    ];

    pub fn properties(self) -> &'static BlockProperties {
        &PROPERTIES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.properties().name
    }

    pub fn is_indestructible(self) -> bool {
        self.properties().indestructible
    }

    pub fn is_air(self) -> bool {
        self == BlockType::Air
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for BlockType {
    type Error = Error;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(id as usize)
            .copied()
            .ok_or_else(|| Error::InvalidBlock(format!("unknown block id {}", id)))
    }
}

impl FromStr for BlockType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|block| block.name() == s)
            .ok_or_else(|| Error::InvalidBlock(format!("unknown block name '{}'", s)))
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
