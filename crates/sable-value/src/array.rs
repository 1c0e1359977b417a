//! Script arrays
//!
//! Elements live in [`ValueRef`] slots so that chained subscript assignment
//! can update a nested element without copying the path down to it. Cloning
//! an array copies every element into a fresh slot; two arrays never share a
//! slot unless a caller shares one explicitly.

use crate::value::{Value, ValueRef};

/// Ordered collection of values
#[derive(Default)]
pub struct ObjArray {
    elements: Vec<ValueRef>,
}

impl ObjArray {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an array holding `values` in order
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            elements: values.into_iter().map(ValueRef::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Copy of the element at zero-based `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.elements.get(index).map(ValueRef::get)
    }

    /// Slot of the element at zero-based `index`
    pub fn slot(&self, index: usize) -> Option<&ValueRef> {
        self.elements.get(index)
    }

    /// Rebind the element at zero-based `index`; false when out of range
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.elements.get(index) {
            Some(slot) => {
                slot.set(value);
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, value: Value) {
        self.elements.push(ValueRef::new(value));
    }

    /// Insert before zero-based `index`; false when `index > len`
    pub fn insert(&mut self, index: usize, value: Value) -> bool {
        if index > self.elements.len() {
            return false;
        }
        self.elements.insert(index, ValueRef::new(value));
        true
    }

    /// Remove the element at zero-based `index`
    pub fn remove(&mut self, index: usize) -> Option<Value> {
        if index >= self.elements.len() {
            return None;
        }
        let slot = self.elements.remove(index);
        Some(slot.get())
    }

    /// Append copies of every element of `other`
    pub fn extend_from(&mut self, other: &ObjArray) {
        self.elements
            .extend(other.elements.iter().map(|slot| ValueRef::new(slot.get())));
    }

    /// Drop every element equal to `value`
    pub fn remove_equal(&mut self, value: &Value) {
        self.elements.retain(|slot| !slot.with(|v| v.equals(value)));
    }

    pub fn reverse(&mut self) {
        self.elements.reverse();
    }

    /// Copies of all elements in order
    pub fn values(&self) -> Vec<Value> {
        self.elements.iter().map(ValueRef::get).collect()
    }

    /// `{ a, b, c }` with quoted strings
    pub fn string_rep(&self) -> String {
        let items: Vec<String> = self
            .elements
            .iter()
            .map(|slot| slot.with(Value::formatted_rep))
            .collect();
        if items.is_empty() {
            "{ }".to_string()
        } else {
            format!("{{ {} }}", items.join(", "))
        }
    }

    /// Approximate heap footprint in bytes
    pub fn size_estimate(&self) -> usize {
        self.elements
            .iter()
            .map(|slot| std::mem::size_of::<ValueRef>() + slot.with(Value::size_estimate))
            .sum()
    }
}

impl Clone for ObjArray {
    fn clone(&self) -> Self {
        Self {
            elements: self
                .elements
                .iter()
                .map(|slot| ValueRef::new(slot.get()))
                .collect(),
        }
    }
}

impl PartialEq for ObjArray {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .elements
                .iter()
                .zip(&other.elements)
                .all(|(a, b)| a.ptr_eq(b) || a.get().equals(&b.get()))
    }
}

impl std::fmt::Debug for ObjArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.values()).finish()
    }
}

impl FromIterator<Value> for ObjArray {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::from_values(iter)
    }
}
