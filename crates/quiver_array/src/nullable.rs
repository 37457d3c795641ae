use std::cmp::Ordering;
use std::error::Error;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::bitmap::{BitRef, BitStorageMut};

/// Error returned when reading the value of a null [`Nullable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadNullableAccess;

impl fmt::Display for BadNullableAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad nullable access")
    }
}

impl Error for BadNullableAccess {}

/// A value paired with a validity flag.
///
/// Marking a nullable as null only flips the flag, the value is kept around.
/// The default nullable is null.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nullable<T> {
    value: T,
    valid: bool,
}

impl<T> Nullable<T> {
    /// Create a valid nullable.
    pub const fn new(value: T) -> Self {
        Nullable { value, valid: true }
    }

    pub const fn with_validity(value: T, valid: bool) -> Self {
        Nullable { value, valid }
    }

    pub fn null() -> Self
    where
        T: Default,
    {
        Nullable {
            value: T::default(),
            valid: false,
        }
    }

    pub const fn has_value(&self) -> bool {
        self.valid
    }

    pub const fn is_null(&self) -> bool {
        !self.valid
    }

    /// Get the underlying value without checking validity.
    pub const fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Get the underlying value without checking validity.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Get the value, erroring if null.
    pub fn value(&self) -> Result<&T, BadNullableAccess> {
        if self.valid {
            Ok(&self.value)
        } else {
            Err(BadNullableAccess)
        }
    }

    pub fn into_value(self) -> Result<T, BadNullableAccess> {
        if self.valid {
            Ok(self.value)
        } else {
            Err(BadNullableAccess)
        }
    }

    pub fn value_or(self, default: T) -> T {
        if self.valid {
            self.value
        } else {
            default
        }
    }

    /// Set a value, marking this nullable valid.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.valid = true;
    }

    /// Mark as null, leaving the stored value untouched.
    pub fn set_null(&mut self) {
        self.valid = false;
    }

    pub const fn as_ref(&self) -> Nullable<&T> {
        Nullable {
            value: &self.value,
            valid: self.valid,
        }
    }

    pub fn map<U, F>(self, f: F) -> Nullable<U>
    where
        F: FnOnce(T) -> U,
    {
        Nullable {
            value: f(self.value),
            valid: self.valid,
        }
    }

    pub fn into_option(self) -> Option<T> {
        if self.valid {
            Some(self.value)
        } else {
            None
        }
    }
}

impl<T: Copy> Nullable<&T> {
    pub fn copied(self) -> Nullable<T> {
        self.map(|v| *v)
    }
}

impl<T: Clone> Nullable<&T> {
    pub fn cloned(self) -> Nullable<T> {
        self.map(|v| v.clone())
    }
}

impl<T: Default> From<Option<T>> for Nullable<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Nullable::new(v),
            None => Nullable::null(),
        }
    }
}

impl<T> From<Nullable<T>> for Option<T> {
    fn from(value: Nullable<T>) -> Self {
        value.into_option()
    }
}

impl<T: PartialEq<U>, U> PartialEq<Nullable<U>> for Nullable<T> {
    fn eq(&self, other: &Nullable<U>) -> bool {
        match (self.valid, other.valid) {
            (true, true) => self.value == other.value,
            (false, false) => true,
            _ => false,
        }
    }
}

impl<T: Eq> Eq for Nullable<T> {}

impl<T: PartialOrd> PartialOrd for Nullable<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self.valid, other.valid) {
            (true, true) => self.value.partial_cmp(&other.value),
            (a, b) => Some(a.cmp(&b)),
        }
    }
}

impl<T: Ord> Ord for Nullable<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.valid, other.valid) {
            (true, true) => self.value.cmp(&other.value),
            (a, b) => a.cmp(&b),
        }
    }
}

impl<T: Hash> Hash for Nullable<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.valid.hash(state);
        if self.valid {
            self.value.hash(state);
        }
    }
}

impl<T: fmt::Display> fmt::Display for Nullable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            self.value.fmt(f)
        } else {
            write!(f, "null")
        }
    }
}

/// A mutable nullable reference into a value slot and its validity bit.
///
/// Writes go to the underlying buffer and bitmap.
pub struct NullableMut<'a, T, S> {
    value: &'a mut T,
    validity: BitRef<'a, S>,
}

impl<'a, T: Copy, S: BitStorageMut> NullableMut<'a, T, S> {
    pub fn new(value: &'a mut T, validity: BitRef<'a, S>) -> Self {
        NullableMut { value, validity }
    }

    pub fn has_value(&self) -> bool {
        self.validity.get()
    }

    pub fn get(&self) -> Nullable<T> {
        Nullable::with_validity(*self.value, self.validity.get())
    }

    pub fn set(&mut self, value: T) {
        *self.value = value;
        self.validity.set(true);
    }

    /// Mark the slot as null. The stored value is left in place.
    pub fn set_null(&mut self) {
        self.validity.set(false);
    }

    /// Copy both value and validity from `other`.
    pub fn assign(&mut self, other: Nullable<T>) {
        *self.value = other.value;
        self.validity.set(other.valid);
    }
}
