use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::item::{Item, ItemKind};
use crate::table::EnhancementTable;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("{item:?} has invalid unit price {value}")]
    NegativePrice { item: Item, value: f64 },
    #[error("{item:?} has invalid owned quantity {value}")]
    NegativeDiscount { item: Item, value: f64 },
    #[error("no price for {item:?}")]
    MissingPrice { item: Item },
}

fn validate_price(item: Item, value: f64) -> Result<(), PriceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PriceError::NegativePrice { item, value });
    }
    Ok(())
}

fn validate_owned(item: Item, value: f64) -> Result<(), PriceError> {
    if !value.is_finite() || value < 0.0 {
        return Err(PriceError::NegativeDiscount { item, value });
    }
    Ok(())
}

/// Unit prices keyed by item, persisted as a flat `key -> number` object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    prices: BTreeMap<Item, f64>,
}

impl PriceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference market prices, in gold per unit.
    pub fn market_defaults() -> Self {
        let prices = [
            (Item::Shard, 0.371),
            (Item::LowerOreha, 12.0),
            (Item::MiddleOreha, 13.0),
            (Item::HigherOreha, 25.0),
            (Item::HonorLeapstone, 33.0),
            (Item::GreatHonorLeapstone, 43.0),
            (Item::MarvelousHonorLeapstone, 184.0),
            (Item::GuardianStone, 0.12),
            (Item::DestructionStone, 1.9),
            (Item::GuardianStoneCrystal, 0.48),
            (Item::DestructionStoneCrystal, 9.5),
            (Item::SolarGrace, 89.0),
            (Item::SolarBlessing, 215.0),
            (Item::SolarProtection, 266.0),
            (Item::TailoringBasic, 33.0),
            (Item::TailoringApplied, 50.0),
            (Item::TailoringAdvanced, 1189.0),
            (Item::MetallurgyBasic, 90.0),
            (Item::MetallurgyApplied, 102.0),
            (Item::MetallurgyAdvanced, 3270.0),
            (Item::Gold, 1.0),
        ];
        Self {
            prices: prices.into_iter().collect(),
        }
    }

    pub fn from_map(prices: BTreeMap<Item, f64>) -> Result<Self, PriceError> {
        for (&item, &value) in prices.iter() {
            validate_price(item, value)?;
        }
        Ok(Self { prices })
    }

    pub fn set(&mut self, item: Item, value: f64) -> Result<(), PriceError> {
        validate_price(item, value)?;
        self.prices.insert(item, value);
        Ok(())
    }

    pub fn with(mut self, item: Item, value: f64) -> Result<Self, PriceError> {
        self.set(item, value)?;
        Ok(self)
    }

    pub fn get(&self, item: Item) -> Option<f64> {
        self.prices.get(&item).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Item, f64)> + '_ {
        self.prices.iter().map(|(&item, &value)| (item, value))
    }
}

/// Which owned ("binded") stock is spent before buying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountScope {
    #[serde(default)]
    pub materials: bool,
    #[serde(default)]
    pub books: bool,
    #[serde(default)]
    pub breaths: bool,
}

impl DiscountScope {
    pub fn all() -> Self {
        Self {
            materials: true,
            books: true,
            breaths: true,
        }
    }

    fn covers(&self, item: Item) -> bool {
        match item.kind() {
            ItemKind::Material => self.materials,
            ItemKind::Book => self.books,
            ItemKind::Breath => self.breaths,
            // Gold is never binded.
            ItemKind::Currency => false,
        }
    }
}

/// Owned quantities per attempt that are not billed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiscountMap {
    owned: BTreeMap<Item, f64>,
}

impl DiscountMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(owned: BTreeMap<Item, f64>) -> Result<Self, PriceError> {
        for (&item, &value) in owned.iter() {
            validate_owned(item, value)?;
        }
        Ok(Self { owned })
    }

    /// Keep only the owned items of `table` that `scope` allows.
    pub fn from_owned(
        owned: &BTreeMap<Item, f64>,
        scope: DiscountScope,
        table: &EnhancementTable,
    ) -> Result<Self, PriceError> {
        let used_items = table
            .materials()
            .iter()
            .map(|&(item, _)| item)
            .chain(table.boosters().iter().map(|booster| booster.item));

        let mut discounts = BTreeMap::new();
        for item in used_items {
            if !scope.covers(item) {
                continue;
            }
            if let Some(&value) = owned.get(&item) {
                validate_owned(item, value)?;
                discounts.insert(item, value);
            }
        }
        Ok(Self { owned: discounts })
    }

    pub fn set(&mut self, item: Item, value: f64) -> Result<(), PriceError> {
        validate_owned(item, value)?;
        self.owned.insert(item, value);
        Ok(())
    }

    pub fn owned(&self, item: Item) -> f64 {
        self.owned.get(&item).copied().unwrap_or(0.0)
    }

    /// The quantity still bought when `amount` is consumed.
    ///
    /// The owned quantity is clamped to `amount`, so the result is never negative.
    pub fn billed_amount(&self, item: Item, amount: f64) -> f64 {
        amount - self.owned(item).min(amount)
    }
}

/// Per-attempt costs of one table under one price/discount setting.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptCosts {
    material_cost: f64,
    material_costs: Vec<(Item, f64)>,
    booster_costs: Vec<f64>,
}

impl AttemptCosts {
    pub fn new(
        table: &EnhancementTable,
        prices: &PriceTable,
        discounts: &DiscountMap,
    ) -> Result<Self, PriceError> {
        let billed_cost = |item: Item, amount: f64| -> Result<f64, PriceError> {
            let price = prices.get(item).ok_or(PriceError::MissingPrice { item })?;
            validate_price(item, price)?;
            validate_owned(item, discounts.owned(item))?;
            Ok(discounts.billed_amount(item, amount) * price)
        };

        let material_costs = table
            .materials()
            .iter()
            .map(|&(item, amount)| Ok((item, billed_cost(item, amount)?)))
            .collect::<Result<Vec<(Item, f64)>, PriceError>>()?;
        let material_cost: f64 = material_costs.iter().map(|&(_, cost)| cost).sum();

        let booster_costs = table
            .boosters()
            .iter()
            .map(|booster| billed_cost(booster.item, booster.amount_per_use))
            .collect::<Result<Vec<f64>, PriceError>>()?;

        Ok(Self {
            material_cost,
            material_costs,
            booster_costs,
        })
    }

    /// Cost of the materials every attempt consumes.
    pub fn material_cost(&self) -> f64 {
        self.material_cost
    }

    /// Billed cost of each material per attempt, in table order.
    pub fn material_costs(&self) -> &[(Item, f64)] {
        &self.material_costs
    }

    /// Cost of one use of the booster at `index` in table order.
    pub fn booster_cost(&self, index: usize) -> f64 {
        self.booster_costs[index]
    }

    pub fn booster_costs(&self) -> &[f64] {
        &self.booster_costs
    }
}
