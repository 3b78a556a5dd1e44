use serde::{Deserialize, Serialize};

pub const NUM_ITEMS: usize = 21;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Material,
    Breath,
    Book,
    Currency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Item {
    Shard,
    LowerOreha,
    MiddleOreha,
    HigherOreha,
    HonorLeapstone,
    GreatHonorLeapstone,
    MarvelousHonorLeapstone,
    GuardianStone,
    DestructionStone,
    GuardianStoneCrystal,
    DestructionStoneCrystal,
    SolarGrace,
    SolarBlessing,
    SolarProtection,
    TailoringBasic,
    TailoringApplied,
    TailoringAdvanced,
    MetallurgyBasic,
    MetallurgyApplied,
    MetallurgyAdvanced,
    Gold,
}

pub const ALL_ITEMS: [Item; NUM_ITEMS] = [
    Item::Shard,
    Item::LowerOreha,
    Item::MiddleOreha,
    Item::HigherOreha,
    Item::HonorLeapstone,
    Item::GreatHonorLeapstone,
    Item::MarvelousHonorLeapstone,
    Item::GuardianStone,
    Item::DestructionStone,
    Item::GuardianStoneCrystal,
    Item::DestructionStoneCrystal,
    Item::SolarGrace,
    Item::SolarBlessing,
    Item::SolarProtection,
    Item::TailoringBasic,
    Item::TailoringApplied,
    Item::TailoringAdvanced,
    Item::MetallurgyBasic,
    Item::MetallurgyApplied,
    Item::MetallurgyAdvanced,
    Item::Gold,
];

// Labels shown by the in-game market, kept for the presentation layer.
const ITEM_LABELS: [&str; NUM_ITEMS] = [
    "파편",
    "하급오레하",
    "중급오레하",
    "상급오레하",
    "명돌",
    "위명돌",
    "경명돌",
    "수결",
    "파결",
    "수호강석",
    "파괴강석",
    "은총",
    "축복",
    "가호",
    "재봉술기본",
    "재봉술응용",
    "재봉술심화",
    "야금술기본",
    "야금술응용",
    "야금술심화",
    "골드",
];

impl Item {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> ItemKind {
        match self {
            Item::SolarGrace | Item::SolarBlessing | Item::SolarProtection => ItemKind::Breath,
            Item::TailoringBasic
            | Item::TailoringApplied
            | Item::TailoringAdvanced
            | Item::MetallurgyBasic
            | Item::MetallurgyApplied
            | Item::MetallurgyAdvanced => ItemKind::Book,
            Item::Gold => ItemKind::Currency,
            _ => ItemKind::Material,
        }
    }

    pub fn is_booster(self) -> bool {
        matches!(self.kind(), ItemKind::Breath | ItemKind::Book)
    }

    pub fn label(self) -> &'static str {
        ITEM_LABELS[self.index()]
    }

    pub fn from_label(label: &str) -> Option<Item> {
        ITEM_LABELS
            .iter()
            .position(|candidate| *candidate == label)
            .map(|index| ALL_ITEMS[index])
    }
}
