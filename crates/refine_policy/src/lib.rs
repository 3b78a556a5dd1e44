mod catalog;
mod compare;
mod config;
mod item;
mod pity;
mod price;
mod solver;
mod table;

pub use catalog::{Grade, ItemType, TableKey, additional_probability, resolve, resolve_table};
pub use compare::{StrategyComparison, compare_strategies};
pub use config::{ConfigError, RefineRequest, load_price_table, load_request, save_price_table};
pub use item::{ALL_ITEMS, Item, ItemKind};
pub use pity::{DEFAULT_STATE_LIMIT, PityState, ProbabilityModel, StateBound, StateSpace};
pub use price::{AttemptCosts, DiscountMap, DiscountScope, PriceError, PriceTable};
pub use solver::{
    BoosterSet, DecisionRule, Path, PathStep, RefineSolver, Solution, SolverError, fixed,
    optimize,
};
pub use table::{Booster, EnhancementTable, TableError};
