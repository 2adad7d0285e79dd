use std::{collections::TryReserveError, marker::PhantomData};

/// Width of a single guard marker in bytes.
pub const GUARD_WIDTH: usize = std::mem::size_of::<u64>();

/// A fixed-capacity element buffer that can be flanked by two guard words.
///
/// The backing storage is a `Vec<u64>` laid out as
/// `[leading guard][element region][trailing guard]`, so the element region
/// always starts on an 8-byte boundary. The trailing guard sits immediately
/// after the last element slot and may therefore be unaligned; it is read and
/// written bytewise.
///
/// When no guard value is configured the guard words are omitted entirely and
/// the buffer degrades to a plain zero-initialized element array.
///
/// The capacity is the number of element slots, all of which are always
/// initialized (new slots are zero-filled).
pub struct GuardedVec<T> {
    /// Backing words, guards included. Empty when the buffer is released.
    storage: Vec<u64>,
    /// Number of element slots in the region.
    capacity: usize,
    /// Sentinel written into both guard words, if guards are enabled.
    guard: Option<u64>,
    _t: PhantomData<T>,
}

impl<T> GuardedVec<T>
where
    T: bytemuck::Pod,
{
    /// Creates a buffer without any backing storage.
    pub fn unallocated(guard: Option<u64>) -> GuardedVec<T> {
        Self::assert_element_layout();
        GuardedVec {
            storage: Vec::new(),
            capacity: 0,
            guard,
            _t: PhantomData,
        }
    }

    /// Allocates a zero-filled buffer of `capacity` element slots and writes
    /// the guard words, if any.
    ///
    /// # Errors
    ///
    /// Returns the allocator's error if the storage cannot be reserved.
    pub fn try_with_capacity(
        capacity: usize,
        guard: Option<u64>,
    ) -> Result<GuardedVec<T>, TryReserveError> {
        let mut vec = Self::unallocated(guard);
        vec.storage = Self::allocate_words(vec.storage_words(capacity))?;
        vec.capacity = capacity;
        vec.write_guards();
        Ok(vec)
    }

    /// Returns `true` while the buffer owns backing storage.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.storage.is_empty()
    }

    /// Number of element slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The sentinel this buffer writes into its guard words.
    #[inline]
    pub fn guard_value(&self) -> Option<u64> {
        self.guard
    }

    /// All element slots, used and unused alike.
    pub fn as_slice(&self) -> &[T] {
        if !self.is_allocated() {
            return &[];
        }
        bytemuck::cast_slice(self.region_bytes())
    }

    /// Mutable view of all element slots.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if !self.is_allocated() {
            return &mut [];
        }
        let range = self.region_range();
        bytemuck::cast_slice_mut(&mut self.storage_bytes_mut()[range])
    }

    /// Raw bytes of the element region, guards excluded.
    pub fn as_bytes(&self) -> &[u8] {
        if !self.is_allocated() {
            return &[];
        }
        self.region_bytes()
    }

    /// Returns the element in slot `index`, or `None` if out of range.
    #[inline]
    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).copied()
    }

    /// Current value of the leading guard word.
    pub fn leading_guard(&self) -> Option<u64> {
        if self.guard.is_none() || !self.is_allocated() {
            return None;
        }
        Some(self.read_guard(0))
    }

    /// Current value of the trailing guard word.
    pub fn trailing_guard(&self) -> Option<u64> {
        if self.guard.is_none() || !self.is_allocated() {
            return None;
        }
        Some(self.read_guard(self.region_range().end))
    }

    /// Checks both guard words against the configured sentinel.
    ///
    /// Always `true` for buffers without guards or without storage.
    pub fn guards_intact(&self) -> bool {
        match self.guard {
            Some(sentinel) if self.is_allocated() => {
                self.leading_guard() == Some(sentinel) && self.trailing_guard() == Some(sentinel)
            }
            _ => true,
        }
    }

    /// Moves the elements into a newly allocated region of `new_capacity`
    /// slots.
    ///
    /// Slots present in both regions keep their values, extra slots are
    /// zero-filled and the guard words are rewritten at the new boundaries.
    /// On failure the buffer is left untouched.
    pub fn try_resize(&mut self, new_capacity: usize) -> Result<(), TryReserveError> {
        let mut resized = GuardedVec::<T>::try_with_capacity(new_capacity, self.guard)?;
        let common = self.capacity.min(new_capacity);
        resized.as_mut_slice()[..common].copy_from_slice(&self.as_slice()[..common]);
        *self = resized;
        Ok(())
    }

    /// Frees the backing storage.
    pub fn release(&mut self) {
        self.storage = Vec::new();
        self.capacity = 0;
    }

    /// Address of the backing storage, `0` when released.
    pub fn base_address(&self) -> usize {
        if self.is_allocated() {
            self.storage.as_ptr() as usize
        } else {
            0
        }
    }

    /// Total allocated size in bytes, including guards and padding.
    pub fn heap_size(&self) -> usize {
        self.storage.capacity() * GUARD_WIDTH
    }

    /// Raw mutable bytes of the whole storage, guard words included.
    #[cfg(feature = "tamper")]
    pub fn raw_bytes_mut(&mut self) -> &mut [u8] {
        self.storage_bytes_mut()
    }

    /// Byte offset of the trailing guard within the raw storage.
    #[cfg(feature = "tamper")]
    pub fn trailing_guard_offset(&self) -> usize {
        self.region_range().end
    }
}

impl<T> GuardedVec<T>
where
    T: bytemuck::Pod,
{
    fn assert_element_layout() {
        assert!(std::mem::align_of::<T>() <= GUARD_WIDTH);
        assert_ne!(std::mem::size_of::<T>(), 0);
    }

    fn allocate_words(words: usize) -> Result<Vec<u64>, TryReserveError> {
        let mut storage = Vec::new();
        storage.try_reserve_exact(words)?;
        storage.resize(words, 0);
        Ok(storage)
    }

    #[inline]
    fn guard_width(&self) -> usize {
        if self.guard.is_some() { GUARD_WIDTH } else { 0 }
    }

    /// Number of storage words needed for `capacity` slots plus guards.
    fn storage_words(&self, capacity: usize) -> usize {
        let bytes = capacity * std::mem::size_of::<T>() + 2 * self.guard_width();
        bytes.div_ceil(GUARD_WIDTH)
    }

    /// Byte range of the element region within the raw storage.
    #[inline]
    fn region_range(&self) -> std::ops::Range<usize> {
        let start = self.guard_width();
        start..start + self.capacity * std::mem::size_of::<T>()
    }

    #[inline]
    fn storage_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.storage)
    }

    #[inline]
    fn storage_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.storage)
    }

    #[inline]
    fn region_bytes(&self) -> &[u8] {
        &self.storage_bytes()[self.region_range()]
    }

    fn read_guard(&self, offset: usize) -> u64 {
        bytemuck::pod_read_unaligned(&self.storage_bytes()[offset..offset + GUARD_WIDTH])
    }

    fn write_guard(&mut self, offset: usize, value: u64) {
        self.storage_bytes_mut()[offset..offset + GUARD_WIDTH]
            .copy_from_slice(bytemuck::bytes_of(&value));
    }

    fn write_guards(&mut self) {
        if let Some(sentinel) = self.guard {
            let trailing = self.region_range().end;
            self.write_guard(0, sentinel);
            self.write_guard(trailing, sentinel);
        }
    }
}

impl<T> std::fmt::Debug for GuardedVec<T>
where
    T: bytemuck::Pod + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardedVec")
            .field("values", &self.as_slice())
            .field("cap", &self.capacity)
            .field("leading_guard", &self.leading_guard())
            .field("trailing_guard", &self.trailing_guard())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: u64 = 0xBADD_A7A0_BADD_A7A0;

    #[test]
    fn test_with_capacity_zero_filled() {
        let v = GuardedVec::<i64>::try_with_capacity(8, Some(SENTINEL)).unwrap();
        assert!(v.is_allocated());
        assert_eq!(v.capacity(), 8);
        assert_eq!(v.as_slice(), &[0; 8]);
        assert_eq!(v.as_bytes().len(), 64);
        assert_eq!(v.leading_guard(), Some(SENTINEL));
        assert_eq!(v.trailing_guard(), Some(SENTINEL));
        assert!(v.guards_intact());
    }

    #[test]
    fn test_without_guards() {
        let v = GuardedVec::<i64>::try_with_capacity(8, None).unwrap();
        assert_eq!(v.as_bytes().len(), 64);
        assert!(v.heap_size() >= 64);
        assert_eq!(v.leading_guard(), None);
        assert_eq!(v.trailing_guard(), None);
        assert!(v.guards_intact());
    }

    #[test]
    fn test_unaligned_trailing_guard() {
        let mut v = GuardedVec::<i32>::try_with_capacity(3, Some(SENTINEL)).unwrap();
        v.as_mut_slice().copy_from_slice(&[-1, -2, -3]);
        assert_eq!(v.trailing_guard(), Some(SENTINEL));
        assert!(v.guards_intact());
        assert_eq!(v.as_slice(), &[-1, -2, -3]);
    }

    #[test]
    fn test_resize_preserves_prefix() {
        let mut v = GuardedVec::<i64>::try_with_capacity(4, Some(SENTINEL)).unwrap();
        v.as_mut_slice().copy_from_slice(&[1, 2, 3, 4]);

        v.try_resize(8).unwrap();
        assert_eq!(v.capacity(), 8);
        assert_eq!(v.as_slice(), &[1, 2, 3, 4, 0, 0, 0, 0]);
        assert!(v.guards_intact());

        v.try_resize(2).unwrap();
        assert_eq!(v.as_slice(), &[1, 2]);
        assert!(v.guards_intact());
    }

    #[test]
    fn test_release() {
        let mut v = GuardedVec::<i64>::try_with_capacity(8, Some(SENTINEL)).unwrap();
        assert_ne!(v.base_address(), 0);
        v.release();
        assert!(!v.is_allocated());
        assert_eq!(v.capacity(), 0);
        assert_eq!(v.base_address(), 0);
        assert!(v.as_slice().is_empty());
        assert_eq!(v.leading_guard(), None);
    }

    #[test]
    fn test_get() {
        let mut v = GuardedVec::<i64>::try_with_capacity(2, None).unwrap();
        v.as_mut_slice()[1] = 42;
        assert_eq!(v.get(1), Some(42));
        assert_eq!(v.get(2), None);
    }

    #[cfg(feature = "tamper")]
    #[test]
    fn test_tampered_guard_detected() {
        let mut v = GuardedVec::<i64>::try_with_capacity(8, Some(SENTINEL)).unwrap();
        let offset = v.trailing_guard_offset();
        v.raw_bytes_mut()[offset] ^= 0xFF;
        assert!(!v.guards_intact());
        assert_ne!(v.trailing_guard(), Some(SENTINEL));
    }
}
