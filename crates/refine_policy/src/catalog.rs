use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::table::{Booster, EnhancementTable, TableError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Weapon,
    Armor,
}

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    T3_1302,
    T3_1340,
    T3_1390,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableKey {
    pub item_type: ItemType,
    pub grade: Grade,
    pub target: u8,
}

// Armor amounts per attempt; weapons scale these (see `WEAPON_*`).
struct RefineRow {
    target: u8,
    base_probability: f64,
    leapstone: u32,
    stone: u32,
    oreha: u32,
    shard: u32,
    gold: u32,
}

const fn row(
    target: u8,
    base_probability: f64,
    leapstone: u32,
    stone: u32,
    oreha: u32,
    shard: u32,
    gold: u32,
) -> RefineRow {
    RefineRow {
        target,
        base_probability,
        leapstone,
        stone,
        oreha,
        shard,
        gold,
    }
}

// Reference data; replace with `EnhancementTable::new` when exact tables are known.
const ROWS_1302: &[RefineRow] = &[
    row(11, 0.30, 12, 516, 8, 2700, 110),
    row(12, 0.15, 14, 558, 8, 2952, 120),
    row(13, 0.15, 14, 600, 10, 3204, 130),
    row(14, 0.15, 16, 642, 10, 3456, 140),
    row(15, 0.10, 18, 684, 12, 3708, 150),
];

const ROWS_1340: &[RefineRow] = &[
    row(11, 0.30, 8, 594, 6, 4284, 170),
    row(12, 0.15, 10, 636, 6, 4560, 180),
    row(13, 0.15, 10, 678, 8, 4836, 190),
    row(14, 0.15, 12, 720, 8, 5112, 200),
    row(15, 0.10, 12, 762, 10, 5388, 210),
    row(16, 0.10, 14, 804, 10, 5664, 220),
    row(17, 0.10, 14, 846, 12, 5940, 230),
    row(18, 0.05, 16, 888, 12, 6216, 240),
    row(19, 0.05, 16, 930, 14, 6492, 250),
    row(20, 0.03, 18, 972, 14, 6768, 260),
];

const ROWS_1390: &[RefineRow] = &[
    row(11, 0.30, 6, 558, 4, 6000, 220),
    row(12, 0.15, 6, 600, 4, 6400, 240),
    row(13, 0.15, 8, 642, 6, 6800, 260),
    row(14, 0.15, 8, 684, 6, 7200, 280),
    row(15, 0.10, 10, 726, 8, 7600, 300),
    row(16, 0.10, 10, 768, 8, 8000, 320),
    row(17, 0.10, 12, 810, 10, 8400, 340),
    row(18, 0.05, 12, 852, 10, 8800, 360),
    row(19, 0.05, 14, 894, 12, 9200, 380),
    row(20, 0.03, 14, 936, 12, 9600, 400),
    row(21, 0.03, 16, 978, 14, 10000, 420),
    row(22, 0.015, 16, 1020, 14, 10400, 440),
    row(23, 0.015, 18, 1062, 16, 10800, 460),
    row(24, 0.01, 18, 1104, 16, 11200, 480),
    row(25, 0.005, 20, 1146, 18, 11600, 500),
];

// Weapons consume 5/3 of the armor materials and twice the gold.
const WEAPON_MATERIAL_NUMERATOR: u32 = 5;
const WEAPON_MATERIAL_DENOMINATOR: u32 = 3;
const WEAPON_GOLD_MULTIPLIER: u32 = 2;

// Breath share of the base probability: grace, blessing, protection.
const BREATH_SHARES: [(Item, f64); 3] = [
    (Item::SolarGrace, 0.25),
    (Item::SolarBlessing, 0.25),
    (Item::SolarProtection, 0.5),
];
const BOOK_MAX_TARGET: u8 = 20;
const BOOK_MAX_BONUS: f64 = 0.1;

const ADDITIONAL_PROBABILITY_MAX_TARGET: u8 = 15;
const ADDITIONAL_PROBABILITY: f64 = 0.2;
const RESEARCH_PROBABILITY: f64 = 0.1;

impl Grade {
    fn rows(self) -> &'static [RefineRow] {
        match self {
            Grade::T3_1302 => ROWS_1302,
            Grade::T3_1340 => ROWS_1340,
            Grade::T3_1390 => ROWS_1390,
        }
    }

    fn leapstone(self) -> Item {
        match self {
            Grade::T3_1302 => Item::HonorLeapstone,
            Grade::T3_1340 => Item::GreatHonorLeapstone,
            Grade::T3_1390 => Item::MarvelousHonorLeapstone,
        }
    }

    fn oreha(self) -> Item {
        match self {
            Grade::T3_1302 => Item::LowerOreha,
            Grade::T3_1340 => Item::MiddleOreha,
            Grade::T3_1390 => Item::HigherOreha,
        }
    }

    fn stone(self, item_type: ItemType) -> Item {
        match (self, item_type) {
            (Grade::T3_1390, ItemType::Weapon) => Item::DestructionStoneCrystal,
            (Grade::T3_1390, ItemType::Armor) => Item::GuardianStoneCrystal,
            (_, ItemType::Weapon) => Item::DestructionStone,
            (_, ItemType::Armor) => Item::GuardianStone,
        }
    }

    fn book(self, item_type: ItemType) -> Item {
        match (self, item_type) {
            (Grade::T3_1302, ItemType::Armor) => Item::TailoringBasic,
            (Grade::T3_1340, ItemType::Armor) => Item::TailoringApplied,
            (Grade::T3_1390, ItemType::Armor) => Item::TailoringAdvanced,
            (Grade::T3_1302, ItemType::Weapon) => Item::MetallurgyBasic,
            (Grade::T3_1340, ItemType::Weapon) => Item::MetallurgyApplied,
            (Grade::T3_1390, ItemType::Weapon) => Item::MetallurgyAdvanced,
        }
    }

    // Breath units per use: grace, blessing, protection.
    fn breath_amounts(self) -> [f64; 3] {
        match self {
            Grade::T3_1302 => [12.0, 6.0, 2.0],
            Grade::T3_1340 | Grade::T3_1390 => [24.0, 12.0, 4.0],
        }
    }

    pub fn targets(self) -> impl Iterator<Item = u8> {
        self.rows().iter().map(|row| row.target)
    }
}

/// Look up the refine table for an item.
///
/// The catalog rows, weapon scaling and breath shares are reference numbers, not
/// authoritative game data. Callers with current tables should build their own
/// `EnhancementTable` and pass it to the solver directly.
///
/// Unknown combinations are `TableError::NotFound`; callers skip the computation.
pub fn resolve_table(
    item_type: ItemType,
    grade: Grade,
    target: u8,
) -> Result<EnhancementTable, TableError> {
    let row = grade
        .rows()
        .iter()
        .find(|row| row.target == target)
        .ok_or(TableError::NotFound {
            item_type,
            grade,
            target,
        })?;

    let scale = |amount: u32| -> f64 {
        match item_type {
            ItemType::Armor => amount as f64,
            ItemType::Weapon => {
                ((amount * WEAPON_MATERIAL_NUMERATOR).div_ceil(WEAPON_MATERIAL_DENOMINATOR)) as f64
            }
        }
    };
    let gold = match item_type {
        ItemType::Armor => row.gold,
        ItemType::Weapon => row.gold * WEAPON_GOLD_MULTIPLIER,
    };

    let materials = vec![
        (grade.stone(item_type), scale(row.stone)),
        (grade.leapstone(), scale(row.leapstone)),
        (grade.oreha(), scale(row.oreha)),
        (Item::Shard, scale(row.shard)),
        (Item::Gold, gold as f64),
    ];

    let mut boosters: Vec<Booster> = BREATH_SHARES
        .iter()
        .zip(grade.breath_amounts())
        .map(|(&(item, share), amount_per_use)| Booster {
            item,
            amount_per_use,
            probability_bonus: row.base_probability * share,
        })
        .collect();
    if target <= BOOK_MAX_TARGET {
        boosters.push(Booster {
            item: grade.book(item_type),
            amount_per_use: 1.0,
            probability_bonus: row.base_probability.min(BOOK_MAX_BONUS),
        });
    }

    EnhancementTable::new(row.base_probability, materials, boosters)
}

pub fn resolve(key: TableKey) -> Result<EnhancementTable, TableError> {
    resolve_table(key.item_type, key.grade, key.target)
}

/// Event bonus on top of the base probability, available below the newest grade.
pub fn additional_probability(grade: Grade, target: u8, apply_research: bool) -> f64 {
    if grade == Grade::T3_1390 || target > ADDITIONAL_PROBABILITY_MAX_TARGET {
        return 0.0;
    }
    if apply_research {
        ADDITIONAL_PROBABILITY + RESEARCH_PROBABILITY
    } else {
        ADDITIONAL_PROBABILITY
    }
}
