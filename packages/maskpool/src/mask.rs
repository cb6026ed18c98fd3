//! Fixed-width presence masks.

use std::fmt::{self, Debug, Formatter};
use std::ops::{BitOr, BitOrAssign};

use crate::component::ComponentTypeID;

/// The number of distinct component types a single `EntityManager` can hold.
///
/// This bounds the width of every `Mask`.
pub const MAX_COMPONENT_TYPES: usize = 64;

const WORD_BITS: usize = u64::BITS as usize;
const MASK_WORDS: usize = (MAX_COMPONENT_TYPES + WORD_BITS - 1) / WORD_BITS;

/// A bitset of `MAX_COMPONENT_TYPES` bits, one per component type id.
///
/// Every entity owns one of these, with bit `i` set when it has a live
/// component of the type with id `i`. Queries build one from their type list
/// and test entities with `includes_all`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mask {
    words: [u64; MASK_WORDS],
}

impl Mask {
    /// Create a mask with no bits set.
    pub const fn empty() -> Mask {
        Mask { words: [0; MASK_WORDS] }
    }

    #[inline]
    fn locate(id: ComponentTypeID) -> (usize, u64) {
        let bit = id.id();
        debug_assert!(bit < MAX_COMPONENT_TYPES);
        (bit / WORD_BITS, 1 << (bit % WORD_BITS))
    }

    /// Set the bit for the given component type.
    pub fn set(&mut self, id: ComponentTypeID) {
        let (word, bit) = Mask::locate(id);
        self.words[word] |= bit;
    }

    /// Clear the bit for the given component type.
    pub fn clear(&mut self, id: ComponentTypeID) {
        let (word, bit) = Mask::locate(id);
        self.words[word] &= !bit;
    }

    /// Returns true if the bit for the given component type is set.
    pub fn contains(&self, id: ComponentTypeID) -> bool {
        let (word, bit) = Mask::locate(id);
        self.words[word] & bit != 0
    }

    /// Returns true if every bit set in `required` is also set in this mask.
    #[inline]
    pub fn includes_all(&self, required: &Mask) -> bool {
        self.words.iter()
            .zip(required.words.iter())
            .all(|(have, want)| have & want == *want)
    }

    /// Returns true if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Return the number of set bits.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterate over the component type ids set in this mask, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item=ComponentTypeID> + '_ {
        (0..MAX_COMPONENT_TYPES)
            .map(ComponentTypeID::new)
            .filter(move |id| self.contains(*id))
    }
}

impl Default for Mask {
    fn default() -> Self {
        Mask::empty()
    }
}

impl BitOr for Mask {
    type Output = Mask;

    fn bitor(mut self, rhs: Mask) -> Mask {
        self |= rhs;
        self
    }
}

impl BitOrAssign for Mask {
    fn bitor_assign(&mut self, rhs: Mask) {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a |= *b;
        }
    }
}

impl Debug for Mask {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.iter().map(|id| id.id()))
            .finish()
    }
}
