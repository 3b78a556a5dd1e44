use serde::Serialize;

/// A subset of a table's boosters; bit `i` is the booster at table index `i`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BoosterSet(u16);

impl BoosterSet {
    pub const EMPTY: BoosterSet = BoosterSet(0);

    /// Every booster of a table with `count` boosters.
    ///
    /// Must ensure `count <= 16`.
    pub(super) const fn all(count: usize) -> Self {
        BoosterSet(((1u32 << count) - 1) as u16)
    }

    pub(super) const fn from_mask(mask: u16) -> Self {
        BoosterSet(mask)
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Option<Self> {
        let mut mask = 0u16;
        for index in indices {
            mask |= 1u16.checked_shl(index as u32)?;
        }
        Some(BoosterSet(mask))
    }

    pub const fn mask(self) -> u16 {
        self.0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, index: usize) -> bool {
        index < 16 && self.0 & (1 << index) != 0
    }

    /// Table indices in ascending order.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..16).filter(move |&index| self.contains(index))
    }

    pub const fn is_subset_of(self, other: BoosterSet) -> bool {
        self.0 & !other.0 == 0
    }
}
