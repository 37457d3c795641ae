use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign};

use super::{BitStorageMut, BitmapBase};

/// A mutable reference to a single bit in a bitmap.
///
/// All writes go through [`BitmapBase::set`].
pub struct BitRef<'a, S> {
    bitmap: &'a mut BitmapBase<S>,
    pos: usize,
}

impl<'a, S: BitStorageMut> BitRef<'a, S> {
    pub(crate) fn new(bitmap: &'a mut BitmapBase<S>, pos: usize) -> Self {
        BitRef { bitmap, pos }
    }

    pub fn get(&self) -> bool {
        self.bitmap.test(self.pos)
    }

    pub fn set(&mut self, value: bool) {
        self.bitmap.set(self.pos, value)
    }

    pub fn flip(&mut self) {
        let value = self.get();
        self.set(!value)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a, S: BitStorageMut> BitAndAssign<bool> for BitRef<'a, S> {
    fn bitand_assign(&mut self, rhs: bool) {
        let value = self.get() & rhs;
        self.set(value)
    }
}

impl<'a, S: BitStorageMut> BitOrAssign<bool> for BitRef<'a, S> {
    fn bitor_assign(&mut self, rhs: bool) {
        let value = self.get() | rhs;
        self.set(value)
    }
}

impl<'a, S: BitStorageMut> BitXorAssign<bool> for BitRef<'a, S> {
    fn bitxor_assign(&mut self, rhs: bool) {
        let value = self.get() ^ rhs;
        self.set(value)
    }
}

impl<'a, S: BitStorageMut> PartialEq<bool> for BitRef<'a, S> {
    fn eq(&self, other: &bool) -> bool {
        self.get() == *other
    }
}

#[cfg(test)]
mod tests {
    use crate::bitmap::Bitmap;

    #[test]
    fn ops_update_null_count() {
        let mut bitmap = Bitmap::<u8>::from_bool_iter([true, false, true, false]);
        assert_eq!(2, bitmap.null_count());

        {
            let mut bit = bitmap.get_mut(1);
            bit |= true;
            assert!(bit == true);
        }
        assert_eq!(1, bitmap.null_count());

        {
            let mut bit = bitmap.get_mut(0);
            bit &= false;
        }
        assert_eq!(2, bitmap.null_count());

        let mut bit = bitmap.get_mut(2);
        bit ^= true;
        bit.flip();
        bit.flip();
        assert_eq!(2, bit.position());
        assert!(!bit.get());
        assert_eq!(3, bitmap.null_count());
    }
}
