use bytemuck::Pod;

use crate::error::{RenderError, Result};

/// CPU-side array of `T` that only ever grows.
///
/// Slots `[0, len)` are live. Growth doubles the capacity until the request
/// fits, copies the live slots to the same indices and raises the resized
/// flag so the owner knows its device buffer must be recreated.
#[derive(Debug)]
pub struct GrowableBuffer<T> {
    slots: Vec<T>,
    len: usize,
    resized: bool,
}

impl<T: Pod> GrowableBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|e| RenderError::Allocation(format!("{capacity} slots: {e}")))?;
        slots.resize(capacity, T::zeroed());
        Ok(Self { slots, len: 0, resized: false })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn byte_capacity(&self) -> u64 {
        (self.capacity() * std::mem::size_of::<T>()) as u64
    }

    #[inline]
    pub fn is_resized(&self) -> bool {
        self.resized
    }

    #[inline]
    pub fn clear_resized(&mut self) {
        self.resized = false;
    }

    /// Guarantees room for `additional` more slots.
    ///
    /// On failure the buffer is left exactly as it was.
    pub fn ensure_capacity(&mut self, additional: usize) -> Result<()> {
        let required = self
            .len
            .checked_add(additional)
            .ok_or_else(|| RenderError::Allocation("slot count overflow".into()))?;
        if required <= self.capacity() {
            return Ok(());
        }

        let mut capacity = self.capacity().max(1);
        while capacity < required {
            capacity = capacity
                .checked_mul(2)
                .ok_or_else(|| RenderError::Allocation("capacity overflow".into()))?;
        }

        let mut grown = Vec::new();
        grown
            .try_reserve_exact(capacity)
            .map_err(|e| RenderError::Allocation(format!("{capacity} slots: {e}")))?;
        grown.extend_from_slice(&self.slots[..self.len]);
        grown.resize(capacity, T::zeroed());

        log::trace!("buffer grown {} -> {} slots", self.capacity(), capacity);
        self.slots = grown;
        self.resized = true;
        Ok(())
    }

    /// Reserves the next `n` slots and returns them for writing.
    pub fn append(&mut self, n: usize) -> Result<&mut [T]> {
        self.ensure_capacity(n)?;
        let start = self.len;
        self.len += n;
        Ok(&mut self.slots[start..self.len])
    }

    pub fn extend_from_slice(&mut self, items: &[T]) -> Result<()> {
        self.append(items.len())?.copy_from_slice(items);
        Ok(())
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.slots[..self.len]
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.as_slice())
    }

    /// Forgets the live slots; capacity is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_within_capacity_does_not_reallocate() {
        let mut buf = GrowableBuffer::<u16>::with_capacity(8).unwrap();
        buf.extend_from_slice(&[1, 2, 3]).unwrap();
        buf.ensure_capacity(5).unwrap();
        assert_eq!(buf.capacity(), 8);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_resized());
    }

    #[test]
    fn growth_doubles_and_preserves_live_slots() {
        let mut buf = GrowableBuffer::<u32>::with_capacity(4).unwrap();
        buf.extend_from_slice(&[10, 20, 30]).unwrap();
        let before = buf.as_bytes().to_vec();

        buf.ensure_capacity(6).unwrap();

        assert_eq!(buf.capacity(), 16);
        assert_eq!(buf.len(), 3);
        assert!(buf.is_resized());
        assert_eq!(buf.as_bytes(), before.as_slice());
    }

    #[test]
    fn zero_capacity_grows_from_one() {
        let mut buf = GrowableBuffer::<u8>::with_capacity(0).unwrap();
        buf.ensure_capacity(3).unwrap();
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn append_hands_out_consecutive_slots() {
        let mut buf = GrowableBuffer::<u16>::with_capacity(2).unwrap();
        buf.append(2).unwrap().copy_from_slice(&[7, 8]);
        buf.append(1).unwrap()[0] = 9;
        assert_eq!(buf.as_slice(), &[7, 8, 9]);
    }

    #[test]
    fn overflowing_request_fails_without_mutation() {
        let mut buf = GrowableBuffer::<u8>::with_capacity(4).unwrap();
        buf.extend_from_slice(&[1, 2]).unwrap();
        assert!(matches!(buf.ensure_capacity(usize::MAX), Err(RenderError::Allocation(_))));
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.as_slice(), &[1, 2]);
        assert!(!buf.is_resized());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut buf = GrowableBuffer::<u8>::with_capacity(4).unwrap();
        buf.extend_from_slice(&[1, 2, 3, 4, 5]).unwrap();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 8);
    }
}
