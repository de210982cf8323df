//! Item drops rolled once when an agent dies.

use serde::{Deserialize, Serialize};
use warden_common::ItemTypeId;

/// One possible drop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropEntry {
    /// Item type
    pub item: ItemTypeId,
    /// Minimum quantity when the entry drops
    #[serde(default = "default_quantity")]
    pub min_quantity: u32,
    /// Maximum quantity when the entry drops
    #[serde(default = "default_quantity")]
    pub max_quantity: u32,
    /// Probability in `[0, 1]`
    #[serde(default = "default_chance")]
    pub chance: f32,
}

fn default_quantity() -> u32 {
    1
}

fn default_chance() -> f32 {
    1.0
}

impl DropEntry {
    /// Creates an entry that always drops one item.
    #[must_use]
    pub const fn new(item: ItemTypeId) -> Self {
        Self {
            item,
            min_quantity: 1,
            max_quantity: 1,
            chance: 1.0,
        }
    }

    /// Sets the quantity range.
    #[must_use]
    pub const fn with_quantity(mut self, min: u32, max: u32) -> Self {
        self.min_quantity = min;
        self.max_quantity = max;
        self
    }

    /// Sets the drop chance.
    #[must_use]
    pub const fn with_chance(mut self, chance: f32) -> Self {
        self.chance = chance;
        self
    }

    fn roll_quantity(&self, rng: &mut fastrand::Rng) -> u32 {
        let (lo, hi) = if self.min_quantity <= self.max_quantity {
            (self.min_quantity, self.max_quantity)
        } else {
            (self.max_quantity, self.min_quantity)
        };
        rng.u32(lo..=hi)
    }
}

/// A rolled drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDrop {
    /// Item type
    pub item: ItemTypeId,
    /// Quantity
    pub quantity: u32,
}

/// Drop table for an archetype.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DropTable {
    entries: Vec<DropEntry>,
}

impl DropTable {
    /// Creates a table from entries.
    #[must_use]
    pub fn new(entries: Vec<DropEntry>) -> Self {
        Self { entries }
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: DropEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Table entries.
    #[must_use]
    pub fn entries(&self) -> &[DropEntry] {
        &self.entries
    }

    /// Returns whether the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// How an archetype turns its drop table into items.
pub trait DropBehavior: Send + Sync + std::fmt::Debug {
    /// Rolls the table.
    fn roll(&self, table: &DropTable, rng: &mut fastrand::Rng) -> Vec<ItemDrop>;
}

/// Each entry rolls against its own chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDrops;

impl DropBehavior for StandardDrops {
    fn roll(&self, table: &DropTable, rng: &mut fastrand::Rng) -> Vec<ItemDrop> {
        let mut drops = Vec::new();
        for entry in &table.entries {
            if rng.f32() >= entry.chance {
                continue;
            }
            let quantity = entry.roll_quantity(rng);
            if quantity > 0 {
                drops.push(ItemDrop {
                    item: entry.item,
                    quantity,
                });
            }
        }
        drops
    }
}

/// Every entry drops regardless of chance.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuaranteedDrops;

impl DropBehavior for GuaranteedDrops {
    fn roll(&self, table: &DropTable, rng: &mut fastrand::Rng) -> Vec<ItemDrop> {
        table
            .entries
            .iter()
            .map(|entry| ItemDrop {
                item: entry.item,
                quantity: entry.roll_quantity(rng).max(1),
            })
            .collect()
    }
}

/// Drop behavior selector used by archetype files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropKind {
    /// [`StandardDrops`]
    #[default]
    Standard,
    /// [`GuaranteedDrops`]
    Guaranteed,
}

impl DropKind {
    /// Builds the behavior.
    #[must_use]
    pub fn build(self) -> Box<dyn DropBehavior> {
        match self {
            Self::Standard => Box::new(StandardDrops),
            Self::Guaranteed => Box::new(GuaranteedDrops),
        }
    }
}
