//! Effect identifiers and processing orders
//!
//! A [`ProcessingOrder`] is a fixed-length sequence of slots, one per chain
//! position. Each slot either names an effect module or holds the end-of-list
//! sentinel. A usable order is a permutation of all five effects; an order
//! whose every slot is the sentinel means "nothing new" when it travels
//! through the order queue.
//!
//! Orders are `Copy` and tiny, so they cross threads by value only.

use std::fmt;

/// Number of effect modules in the chain
pub const NUM_EFFECTS: usize = 5;

/// Integer code of the end-of-list sentinel
pub const END_OF_LIST_CODE: i32 = NUM_EFFECTS as i32;

/// Effect module identifiers
///
/// The discriminant doubles as the module's index in every per-effect array
/// and as its persisted integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EffectId {
    Phase = 0,
    Chorus = 1,
    Overdrive = 2,
    LadderFilter = 3,
    GeneralFilter = 4,
}

impl EffectId {
    /// All effects in declaration order
    pub const ALL: [EffectId; NUM_EFFECTS] = [
        EffectId::Phase,
        EffectId::Chorus,
        EffectId::Overdrive,
        EffectId::LadderFilter,
        EffectId::GeneralFilter,
    ];

    /// Convert from index (0-4)
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// Convert from a persisted integer code
    ///
    /// The sentinel code and anything out of range map to `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        usize::try_from(code).ok().and_then(Self::from_index)
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            EffectId::Phase => "Phase",
            EffectId::Chorus => "Chorus",
            EffectId::Overdrive => "Overdrive",
            EffectId::LadderFilter => "Ladder Filter",
            EffectId::GeneralFilter => "General Filter",
        }
    }

    /// Parse a display name or a short alias, case-insensitively
    ///
    /// Accepts e.g. `"Ladder Filter"`, `"ladder"`, `"phaser"`, `"gf"`.
    pub fn parse(text: &str) -> Option<Self> {
        let key: String = text
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "phase" | "phaser" => Some(EffectId::Phase),
            "chorus" => Some(EffectId::Chorus),
            "overdrive" | "drive" | "od" => Some(EffectId::Overdrive),
            "ladderfilter" | "ladder" | "lf" => Some(EffectId::LadderFilter),
            "generalfilter" | "general" | "filter" | "gf" => Some(EffectId::GeneralFilter),
            _ => None,
        }
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime sequence of effect modules
///
/// `None` in a slot is the end-of-list sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessingOrder {
    slots: [Option<EffectId>; NUM_EFFECTS],
}

impl ProcessingOrder {
    /// Declaration order: Phase, Chorus, Overdrive, LadderFilter, GeneralFilter
    pub const fn identity() -> Self {
        Self {
            slots: [
                Some(EffectId::Phase),
                Some(EffectId::Chorus),
                Some(EffectId::Overdrive),
                Some(EffectId::LadderFilter),
                Some(EffectId::GeneralFilter),
            ],
        }
    }

    /// Every slot holds the sentinel
    pub const fn sentinel() -> Self {
        Self {
            slots: [None; NUM_EFFECTS],
        }
    }

    /// Build from raw slots without validation
    pub const fn from_slots(slots: [Option<EffectId>; NUM_EFFECTS]) -> Self {
        Self { slots }
    }

    /// Build from effect ids; equivalent to `from_slots` with every slot filled
    pub fn from_effects(effects: [EffectId; NUM_EFFECTS]) -> Self {
        Self {
            slots: effects.map(Some),
        }
    }

    /// Build from integer codes, mapping unknown codes to the sentinel
    pub fn from_codes(codes: [i32; NUM_EFFECTS]) -> Self {
        Self {
            slots: codes.map(EffectId::from_code),
        }
    }

    #[inline]
    pub fn slots(&self) -> &[Option<EffectId>; NUM_EFFECTS] {
        &self.slots
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<EffectId> {
        self.slots.get(position).copied().flatten()
    }

    /// Integer codes, sentinel slots as [`END_OF_LIST_CODE`]
    pub fn codes(&self) -> [i32; NUM_EFFECTS] {
        self.slots.map(|slot| slot.map_or(END_OF_LIST_CODE, EffectId::code))
    }

    /// True when every slot is the sentinel
    pub fn is_sentinel(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// True when every effect appears exactly once
    pub fn is_permutation(&self) -> bool {
        let mut seen = [false; NUM_EFFECTS];
        for slot in &self.slots {
            match slot {
                Some(id) if !seen[id.index()] => seen[id.index()] = true,
                _ => return false,
            }
        }
        true
    }

    /// Chain position of an effect, if present
    pub fn position_of(&self, effect: EffectId) -> Option<usize> {
        self.slots.iter().position(|slot| *slot == Some(effect))
    }

    /// Move the effect at `from` to position `to`, shifting the rest
    ///
    /// Returns `None` if either index is out of range.
    pub fn moved(&self, from: usize, to: usize) -> Option<Self> {
        if from >= NUM_EFFECTS || to >= NUM_EFFECTS {
            return None;
        }
        let mut slots = self.slots;
        if from < to {
            slots[from..=to].rotate_left(1);
        } else {
            slots[to..=from].rotate_right(1);
        }
        Some(Self { slots })
    }

    /// Swap the effects at two positions
    pub fn swapped(&self, a: usize, b: usize) -> Option<Self> {
        if a >= NUM_EFFECTS || b >= NUM_EFFECTS {
            return None;
        }
        let mut slots = self.slots;
        slots.swap(a, b);
        Some(Self { slots })
    }

    /// Pack into a `u32` (4 bits per slot) for lock-free publication
    pub fn pack(&self) -> u32 {
        self.codes()
            .iter()
            .enumerate()
            .fold(0u32, |packed, (i, &code)| packed | ((code as u32 & 0xF) << (i * 4)))
    }

    /// Inverse of [`ProcessingOrder::pack`]
    pub fn unpack(packed: u32) -> Self {
        let codes: [i32; NUM_EFFECTS] =
            std::array::from_fn(|i| ((packed >> (i * 4)) & 0xF) as i32);
        Self::from_codes(codes)
    }
}

impl Default for ProcessingOrder {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Display for ProcessingOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, slot) in self.slots.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            match slot {
                Some(id) => f.write_str(id.name())?,
                None => f.write_str("<end>")?,
            }
        }
        Ok(())
    }
}

/// Every permutation of the five effects (120 orders)
///
/// Used by property tests and by the console's order listing.
pub fn all_permutations() -> Vec<ProcessingOrder> {
    fn permute(current: &mut Vec<EffectId>, used: &mut [bool; NUM_EFFECTS], out: &mut Vec<ProcessingOrder>) {
        if current.len() == NUM_EFFECTS {
            let effects: [EffectId; NUM_EFFECTS] = std::array::from_fn(|i| current[i]);
            out.push(ProcessingOrder::from_effects(effects));
            return;
        }
        for id in EffectId::ALL {
            if !used[id.index()] {
                used[id.index()] = true;
                current.push(id);
                permute(current, used, out);
                current.pop();
                used[id.index()] = false;
            }
        }
    }

    let mut out = Vec::with_capacity(120);
    permute(&mut Vec::with_capacity(NUM_EFFECTS), &mut [false; NUM_EFFECTS], &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_declaration_order() {
        for (i, id) in EffectId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(EffectId::from_code(i as i32), Some(*id));
        }
        assert_eq!(EffectId::from_code(END_OF_LIST_CODE), None);
        assert_eq!(EffectId::from_code(-1), None);
    }

    #[test]
    fn test_identity_and_sentinel() {
        assert!(ProcessingOrder::identity().is_permutation());
        assert!(!ProcessingOrder::identity().is_sentinel());
        assert!(ProcessingOrder::sentinel().is_sentinel());
        assert!(!ProcessingOrder::sentinel().is_permutation());
        assert_eq!(ProcessingOrder::sentinel().codes(), [END_OF_LIST_CODE; NUM_EFFECTS]);
    }

    #[test]
    fn test_duplicates_are_not_permutations() {
        let order = ProcessingOrder::from_effects([
            EffectId::Chorus,
            EffectId::Chorus,
            EffectId::Overdrive,
            EffectId::LadderFilter,
            EffectId::GeneralFilter,
        ]);
        assert!(!order.is_permutation());
        assert!(!order.is_sentinel());

        let partial = ProcessingOrder::from_codes([0, 1, 2, 3, END_OF_LIST_CODE]);
        assert!(!partial.is_permutation());
        assert!(!partial.is_sentinel());
    }

    #[test]
    fn test_all_permutations() {
        let all = all_permutations();
        assert_eq!(all.len(), 120);
        assert!(all.iter().all(ProcessingOrder::is_permutation));
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 120);
    }

    #[test]
    fn test_pack_roundtrip() {
        for order in all_permutations() {
            assert_eq!(ProcessingOrder::unpack(order.pack()), order);
        }
        let sentinel = ProcessingOrder::sentinel();
        assert_eq!(ProcessingOrder::unpack(sentinel.pack()), sentinel);
    }

    #[test]
    fn test_moved_and_swapped() {
        let order = ProcessingOrder::identity();
        let moved = order.moved(2, 0).unwrap();
        assert_eq!(moved.codes(), [2, 0, 1, 3, 4]);
        let back = moved.moved(0, 2).unwrap();
        assert_eq!(back, order);

        let swapped = order.swapped(0, 4).unwrap();
        assert_eq!(swapped.codes(), [4, 1, 2, 3, 0]);
        assert!(order.moved(0, 5).is_none());
        assert!(order.swapped(7, 0).is_none());
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(EffectId::parse("Ladder Filter"), Some(EffectId::LadderFilter));
        assert_eq!(EffectId::parse("PHASER"), Some(EffectId::Phase));
        assert_eq!(EffectId::parse("general_filter"), Some(EffectId::GeneralFilter));
        assert_eq!(EffectId::parse("reverb"), None);
        for id in EffectId::ALL {
            assert_eq!(EffectId::parse(id.name()), Some(id));
        }
    }

    #[test]
    fn test_display() {
        let text = ProcessingOrder::from_codes([2, 0, 1, 3, 4]).to_string();
        assert_eq!(text, "Overdrive -> Phase -> Chorus -> Ladder Filter -> General Filter");
    }
}
