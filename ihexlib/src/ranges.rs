//! The `ranges` module provides [`RangeMap`], the sparse memory representation behind
//! [`IntelHex`](crate::IntelHex).
//!
//! Contiguous data is kept in one `Vec<u8>` keyed by its start address in a `BTreeMap`.
//! Ranges never overlap and never touch: a range inserted right at the end of another
//! (or right before the start of another) is merged into it on insert.

use crate::error::IntelHexErrorKind;
use std::collections::{BTreeMap, btree_map};
use std::ops::Bound::{Excluded, Unbounded};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RangeMap {
    ranges: BTreeMap<usize, Vec<u8>>,
}

impl<'a> IntoIterator for &'a RangeMap {
    type Item = (&'a usize, &'a Vec<u8>);
    type IntoIter = btree_map::Iter<'a, usize, Vec<u8>>;
    fn into_iter(self) -> Self::IntoIter {
        self.ranges.iter()
    }
}

impl RangeMap {
    /// Creates an empty `RangeMap`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Inserts `bytes` starting at `start`, merging with the neighbouring ranges
    /// they touch. Empty `bytes` are checked like any other range but never stored.
    ///
    /// # Errors
    /// - [`IntelHexErrorKind::DuplicateAddress`] if a range already starts at `start`.
    /// - [`IntelHexErrorKind::RecordAddressOverlap`] if the new range overlaps stored data.
    ///
    /// # Example
    /// ```
    /// use ihexlib::RangeMap;
    ///
    /// let mut map = RangeMap::new();
    /// map.insert_or_merge(0x10, vec![0x03, 0x04]).unwrap();
    /// map.insert_or_merge(0x0E, vec![0x01, 0x02]).unwrap();
    ///
    /// assert_eq!(map.len(), 1);
    /// assert_eq!(map.get(0x0E), Some(&[0x01, 0x02, 0x03, 0x04][..]));
    /// ```
    pub fn insert_or_merge(
        &mut self,
        start: usize,
        bytes: Vec<u8>,
    ) -> Result<(), IntelHexErrorKind> {
        if self.ranges.contains_key(&start) {
            return Err(IntelHexErrorKind::DuplicateAddress(start));
        }

        let end = start.saturating_add(bytes.len());
        let prev = self
            .predecessor(start)
            .map(|(prev_start, data)| (prev_start, prev_start + data.len()));
        let next_start = self.successor(start).map(|(next_start, _)| next_start);

        // Check for overlap with either neighbour
        if let Some((_, prev_end)) = prev
            && prev_end > start
        {
            return Err(IntelHexErrorKind::RecordAddressOverlap(start));
        }
        if let Some(next_start) = next_start
            && end > next_start
        {
            return Err(IntelHexErrorKind::RecordAddressOverlap(start));
        }

        if bytes.is_empty() {
            return Ok(());
        }

        // Merge backward into the previous range or insert as a new one
        let key = match prev {
            Some((prev_start, prev_end)) if prev_end == start => {
                if let Some(data) = self.ranges.get_mut(&prev_start) {
                    data.extend(bytes);
                }
                prev_start
            }
            _ => {
                self.ranges.insert(start, bytes);
                start
            }
        };

        // Merge forward with the next range
        if next_start == Some(end)
            && let Some(tail) = self.ranges.remove(&end)
            && let Some(data) = self.ranges.get_mut(&key)
        {
            data.extend(tail);
        }

        Ok(())
    }

    /// Returns the range with the greatest start address strictly less than `key`.
    #[must_use]
    pub fn predecessor(&self, key: usize) -> Option<(usize, &[u8])> {
        self.ranges
            .range(..key)
            .next_back()
            .map(|(start, data)| (*start, data.as_slice()))
    }

    /// Returns the range with the least start address strictly greater than `key`.
    #[must_use]
    pub fn successor(&self, key: usize) -> Option<(usize, &[u8])> {
        self.ranges
            .range((Excluded(key), Unbounded))
            .next()
            .map(|(start, data)| (*start, data.as_slice()))
    }

    /// Returns the bytes of the range starting exactly at `start`.
    #[must_use]
    pub fn get(&self, start: usize) -> Option<&[u8]> {
        self.ranges.get(&start).map(Vec::as_slice)
    }

    /// Returns the byte stored at `address`, wherever inside a range it lies.
    #[must_use]
    pub fn get_byte(&self, address: usize) -> Option<u8> {
        let (start, data) = self.ranges.range(..=address).next_back()?;
        data.get(address - start).copied()
    }

    #[must_use]
    pub fn contains(&self, address: usize) -> bool {
        self.get_byte(address).is_some()
    }

    #[must_use]
    pub fn first(&self) -> Option<(usize, &[u8])> {
        self.ranges
            .first_key_value()
            .map(|(start, data)| (*start, data.as_slice()))
    }

    #[must_use]
    pub fn last(&self) -> Option<(usize, &[u8])> {
        self.ranges
            .last_key_value()
            .map(|(start, data)| (*start, data.as_slice()))
    }

    /// Number of contiguous ranges.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of data bytes over all ranges.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.ranges.values().map(Vec::len).sum()
    }

    /// Get an iterator over (start address, bytes) pairs in ascending address order.
    pub fn iter(&self) -> btree_map::Iter<'_, usize, Vec<u8>> {
        self.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use rand::seq::SliceRandom;

    fn collect(map: &RangeMap) -> Vec<(usize, Vec<u8>)> {
        map.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    #[test]
    fn test_insert_into_empty() {
        // Arrange
        let mut map = RangeMap::new();

        // Act
        let res = map.insert_or_merge(0x1234, vec![0xAA, 0xBB]);

        // Assert
        assert!(res.is_ok());
        assert_eq!(collect(&map), vec![(0x1234, vec![0xAA, 0xBB])]);
    }

    #[test]
    fn test_insert_with_gap_keeps_ranges_apart() {
        // Arrange
        let mut map = RangeMap::new();

        // Act
        map.insert_or_merge(0x10, vec![1, 2]).unwrap();
        map.insert_or_merge(0x20, vec![3, 4]).unwrap();
        map.insert_or_merge(0x00, vec![5]).unwrap();

        // Assert
        assert_eq!(
            collect(&map),
            vec![(0x00, vec![5]), (0x10, vec![1, 2]), (0x20, vec![3, 4])]
        );
    }

    #[test]
    fn test_merge_is_commutative() {
        // Arrange
        let mut forward = RangeMap::new();
        let mut backward = RangeMap::new();

        // Act
        forward.insert_or_merge(0x100, vec![1, 2, 3]).unwrap();
        forward.insert_or_merge(0x103, vec![4, 5]).unwrap();

        backward.insert_or_merge(0x103, vec![4, 5]).unwrap();
        backward.insert_or_merge(0x100, vec![1, 2, 3]).unwrap();

        // Assert
        assert_eq!(forward, backward);
        assert_eq!(collect(&forward), vec![(0x100, vec![1, 2, 3, 4, 5])]);
    }

    #[test]
    fn test_merge_bridges_both_neighbours() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x00, vec![1, 2]).unwrap();
        map.insert_or_merge(0x04, vec![5, 6]).unwrap();

        // Act
        let res = map.insert_or_merge(0x02, vec![3, 4]);

        // Assert
        assert!(res.is_ok());
        assert_eq!(collect(&map), vec![(0x00, vec![1, 2, 3, 4, 5, 6])]);
    }

    #[test]
    fn test_duplicate_start_address() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x40, vec![1, 2, 3, 4]).unwrap();

        // Act
        let res = map.insert_or_merge(0x40, vec![1, 2, 3, 4]);

        // Assert
        assert_eq!(res, Err(IntelHexErrorKind::DuplicateAddress(0x40)));
        assert_eq!(collect(&map), vec![(0x40, vec![1, 2, 3, 4])]);
    }

    #[test]
    fn test_overlap_rejected_in_any_order() {
        let cases: [((usize, usize), (usize, usize)); 4] = [
            ((0x10, 8), (0x14, 8)),  // tail overlaps head
            ((0x10, 8), (0x0C, 8)),  // head overlaps tail
            ((0x10, 16), (0x12, 2)), // fully inside
            ((0x12, 2), (0x10, 16)), // fully covering
        ];

        for ((a_start, a_len), (b_start, b_len)) in cases {
            for (first, second) in [
                ((a_start, a_len), (b_start, b_len)),
                ((b_start, b_len), (a_start, a_len)),
            ] {
                // Arrange
                let mut map = RangeMap::new();
                map.insert_or_merge(first.0, vec![0; first.1]).unwrap();

                // Act
                let res = map.insert_or_merge(second.0, vec![0; second.1]);

                // Assert
                assert_eq!(
                    res,
                    Err(IntelHexErrorKind::RecordAddressOverlap(second.0)),
                    "inserting {second:?} after {first:?}"
                );
                assert_eq!(map.len(), 1);
            }
        }
    }

    #[test]
    fn test_empty_insert_is_not_stored() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x10, vec![1, 2]).unwrap();

        // Act & Assert - in a gap, right after a range, or into an empty map
        assert!(map.insert_or_merge(0x20, vec![]).is_ok());
        assert!(map.insert_or_merge(0x12, vec![]).is_ok());
        assert!(RangeMap::new().insert_or_merge(0x10, vec![]).is_ok());
        assert_eq!(collect(&map), vec![(0x10, vec![1, 2])]);
    }

    #[test]
    fn test_empty_insert_at_existing_start() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x10, vec![1, 2]).unwrap();

        // Act
        let res = map.insert_or_merge(0x10, vec![]);

        // Assert
        assert_eq!(res, Err(IntelHexErrorKind::DuplicateAddress(0x10)));
        assert_eq!(collect(&map), vec![(0x10, vec![1, 2])]);
    }

    #[test]
    fn test_empty_insert_inside_range() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x10, vec![1, 2]).unwrap();

        // Act
        let res = map.insert_or_merge(0x11, vec![]);

        // Assert
        assert_eq!(res, Err(IntelHexErrorKind::RecordAddressOverlap(0x11)));
        assert_eq!(collect(&map), vec![(0x10, vec![1, 2])]);
    }

    #[test]
    fn test_shuffled_records_merge_into_one_range() {
        // Arrange
        let mut rng = rand::rng();
        let data: Vec<u8> = (0..=255).collect();
        let mut chunks: Vec<(usize, Vec<u8>)> = data
            .chunks(7)
            .enumerate()
            .map(|(i, chunk)| (0x8000 + i * 7, chunk.to_vec()))
            .collect();
        chunks.shuffle(&mut rng);

        // Act
        let mut map = RangeMap::new();
        for (start, bytes) in chunks {
            map.insert_or_merge(start, bytes).unwrap();
        }

        // Assert
        assert_eq!(collect(&map), vec![(0x8000, data)]);
    }

    #[test]
    fn test_predecessor_and_successor() {
        fn find_prev(keys: &[usize], num: usize) -> Option<usize> {
            keys.iter().rev().find(|k| **k < num).copied()
        }
        fn find_next(keys: &[usize], num: usize) -> Option<usize> {
            keys.iter().find(|k| **k > num).copied()
        }

        // Arrange
        let mut rng = rand::rng();
        let mut map = RangeMap::new();
        for _ in 0..30 {
            let start = rng.random_range(0..100usize) * 4;
            let _ = map.insert_or_merge(start, vec![0xFF]);
        }
        let keys: Vec<usize> = map.iter().map(|(k, _)| *k).collect();

        // Act & Assert
        for i in 0..420 {
            assert_eq!(map.predecessor(i).map(|(k, _)| k), find_prev(&keys, i));
            assert_eq!(map.successor(i).map(|(k, _)| k), find_next(&keys, i));
        }
    }

    #[test]
    fn test_get_byte_and_bounds() {
        // Arrange
        let mut map = RangeMap::new();
        map.insert_or_merge(0x10, vec![1, 2, 3]).unwrap();
        map.insert_or_merge(0x20, vec![4]).unwrap();

        // Assert
        assert_eq!(map.get_byte(0x12), Some(3));
        assert_eq!(map.get_byte(0x13), None);
        assert_eq!(map.get_byte(0x0F), None);
        assert!(map.contains(0x20));
        assert_eq!(map.first().map(|(k, _)| k), Some(0x10));
        assert_eq!(map.last().map(|(k, _)| k), Some(0x20));
        assert_eq!(map.byte_len(), 4);
        assert_eq!(map.get(0x11), None);
    }
}
