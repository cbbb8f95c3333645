//! Arena with a free-list.
//!
//! Slots are addressed by `usize` indices that stay valid until the slot is
//! released with [`Storage::free`]. Released indices are pushed onto a stack
//! and handed out again by the next [`Storage::alloc`], so a long compilation
//! that creates and destroys many nodes keeps a bounded footprint.

pub struct Storage<T> {
    data: Vec<Option<T>>,
    free: Vec<usize>,
    /// Number of occupied cells.
    real_size: usize,
}

impl<T> Default for Storage<T> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<T> Storage<T> {
    /// Create a storage with room for `2^bits` values before growing.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Storage bits should be in the range 0..=31");
        Self {
            data: Vec::with_capacity(1 << bits),
            free: Vec::new(),
            real_size: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }
    /// Get the index one past the highest slot ever used.
    pub fn size(&self) -> usize {
        self.data.len()
    }
    /// Get the number of occupied cells.
    pub fn real_size(&self) -> usize {
        self.real_size
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.data.get(index).is_some_and(Option::is_some)
    }

    /// Store a value, reusing a released slot when one is available.
    pub fn alloc(&mut self, value: T) -> usize {
        self.real_size += 1;
        match self.free.pop() {
            Some(index) => {
                debug_assert!(self.data[index].is_none());
                self.data[index] = Some(value);
                index
            }
            None => {
                self.data.push(Some(value));
                self.data.len() - 1
            }
        }
    }

    /// Release a slot and return its value.
    pub fn free(&mut self, index: usize) -> T {
        let value = self.data[index]
            .take()
            .unwrap_or_else(|| panic!("Index {} is not occupied", index));
        self.free.push(index);
        self.real_size -= 1;
        value
    }

    pub fn value(&self, index: usize) -> &T {
        self.data[index]
            .as_ref()
            .unwrap_or_else(|| panic!("Index {} is not occupied", index))
    }

    pub fn value_mut(&mut self, index: usize) -> &mut T {
        self.data[index]
            .as_mut()
            .unwrap_or_else(|| panic!("Index {} is not occupied", index))
    }

    /// Iterate over occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.as_ref().map(|v| (i, v)))
    }
}
