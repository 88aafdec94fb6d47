use crate::types::EntityId;

const NIL: u32 = u32::MAX;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    /// Live value, or the next free slot.
    value: Result<T, u32>,
}

/// Dense storage handing out generational ids. Freed slots are reused
/// through an intrusive free list; a stale id never reaches the new tenant.
#[derive(Debug)]
pub struct SlotMap<T> {
    head: u32,
    len: usize,
    entries: Vec<Slot<T>>,
}
impl<T> SlotMap<T> {
    pub fn new() -> Self {
        Self { head: NIL, len: 0, entries: vec![] }
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.entries
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref().ok())
    }
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.entries
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut().ok())
    }
    pub fn insert(&mut self, value: T) -> EntityId {
        self.len += 1;
        if self.head == NIL {
            let index = self.entries.len() as u32;
            self.entries.push(Slot { generation: 0, value: Ok(value) });
            return EntityId { index, generation: 0 };
        }
        let index = self.head;
        let slot = &mut self.entries[index as usize];
        self.head = match core::mem::replace(&mut slot.value, Ok(value)) {
            Err(next) => next,
            Ok(_) => unreachable!("free list points at a live slot"),
        };
        EntityId { index, generation: slot.generation }
    }
    pub fn release(&mut self, id: EntityId) -> Option<T> {
        let slot = self.entries.get_mut(id.index as usize)?;
        if slot.generation != id.generation || slot.value.is_err() {
            return None;
        }
        let value = core::mem::replace(&mut slot.value, Err(self.head)).ok();
        slot.generation = slot.generation.wrapping_add(1);
        self.head = id.index;
        self.len -= 1;
        value
    }
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { entries: self.entries.iter().enumerate() }
    }
}
impl<T> Default for SlotMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Iter<'a, T> {
    entries: core::iter::Enumerate<core::slice::Iter<'a, Slot<T>>>,
}
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (EntityId, &'a T);
    fn next(&mut self) -> Option<Self::Item> {
        for (i, slot) in self.entries.by_ref() {
            if let Ok(v) = &slot.value {
                return Some((EntityId { index: i as u32, generation: slot.generation }, v));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_miss_reused_slots() {
        let mut map = SlotMap::new();
        let a = map.insert("a");
        let b = map.insert("b");
        assert_eq!(map.release(a), Some("a"));
        assert_eq!(map.release(a), None);
        let c = map.insert("c");
        assert_eq!(c.index, a.index);
        assert_eq!(map.get(a), None);
        assert_eq!(map.get(c), Some(&"c"));
        assert_eq!(map.len(), 2);
        let live: Vec<_> = map.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(live, [(c, "c"), (b, "b")]);
    }
}
