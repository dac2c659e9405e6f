//! Function storage slots
//!
//! Every parameter and every local variable of a function gets one slot,
//! numbered in declaration order with parameters first. Locals in sibling
//! blocks never share a slot, so a [`SlotId`] identifies one variable for
//! the whole function.

use crate::types::Type;

/// Index of a slot within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone)]
pub struct SlotInfo {
    pub name: String,
    pub ty: Type,
    pub is_param: bool,
}

/// Slots of one function.
#[derive(Debug, Clone, Default)]
pub struct SlotTable {
    slots: Vec<SlotInfo>,
}

impl SlotTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, name: &str, ty: Type, is_param: bool) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(SlotInfo {
            name: name.to_string(),
            ty,
            is_param,
        });
        id
    }

    pub fn get(&self, id: SlotId) -> Option<&SlotInfo> {
        self.slots.get(id.0)
    }

    /// Replace the type of a slot; used when an initializer completes an
    /// array's length after the slot was allocated.
    pub fn set_type(&mut self, id: SlotId, ty: Type) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            slot.ty = ty;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &SlotInfo)> {
        self.slots.iter().enumerate().map(|(i, s)| (SlotId(i), s))
    }

    pub fn params(&self) -> impl Iterator<Item = (SlotId, &SlotInfo)> {
        self.iter().filter(|(_, s)| s.is_param)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_numbered_in_order() {
        let mut table = SlotTable::new();
        let a = table.allocate("a", Type::INT, true);
        let b = table.allocate("b", Type::Char, false);

        assert_eq!(a, SlotId(0));
        assert_eq!(b, SlotId(1));
        assert_eq!(table.params().count(), 1);
        assert_eq!(table.get(b).map(|s| s.name.as_str()), Some("b"));
    }

    #[test]
    fn test_set_type_completes_array() {
        let mut table = SlotTable::new();
        let id = table.allocate("s", Type::Char.array_of(0), false);
        table.set_type(id, Type::Char.array_of(3));
        assert_eq!(table.get(id).map(|s| s.ty.clone()), Some(Type::Char.array_of(3)));
    }
}
