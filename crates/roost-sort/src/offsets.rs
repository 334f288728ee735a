//! Start-offset tables derived from sorted keys.

use rayon::prelude::*;

use crate::bitonic::{sort_pairs, SortEntry};
use crate::error::SortError;

/// Sort `entries` by key and fill `offsets` with each key's start index.
///
/// `offsets` covers keys `0..offsets.len() - 1`; its final slot receives
/// the entry count. After the call `offsets[k]` is the index of the first
/// sorted entry whose key is `k`, and a key with no entries takes the
/// start of the next key that has some. The table is therefore exactly
/// the exclusive prefix sum of per-key counts and can stand in for the
/// one a counting sort builds.
///
/// Keys are validated before anything is written; on error both buffers
/// are left untouched.
pub fn sort_and_compute_offsets(
    entries: &mut [SortEntry],
    offsets: &mut [u32],
) -> Result<(), SortError> {
    let key_count = offsets
        .len()
        .checked_sub(1)
        .ok_or(SortError::EmptyOffsetTable)?;
    if entries.len() > u32::MAX as usize {
        return Err(SortError::TooManyEntries { len: entries.len() });
    }
    if let Some(bad) = entries
        .par_iter()
        .find_any(|e| e.key as usize >= key_count)
    {
        return Err(SortError::KeyOutOfRange {
            key: bad.key,
            key_count,
        });
    }

    sort_pairs(entries);

    let sorted: &[SortEntry] = entries;
    offsets.par_iter_mut().enumerate().for_each(|(key, slot)| {
        *slot = sorted.partition_point(|e| (e.key as usize) < key) as u32;
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn entries_from_keys(keys: &[u32]) -> Vec<SortEntry> {
        keys.iter()
            .enumerate()
            .map(|(i, &k)| SortEntry::new(k, i as u32))
            .collect()
    }

    fn counting_offsets(keys: &[u32], key_count: usize) -> Vec<u32> {
        let mut counts = vec![0u32; key_count];
        for &k in keys {
            counts[k as usize] += 1;
        }
        let mut offsets = Vec::with_capacity(key_count + 1);
        let mut running = 0;
        for c in counts {
            offsets.push(running);
            running += c;
        }
        offsets.push(running);
        offsets
    }

    #[test]
    fn offsets_with_gaps_take_next_start() {
        let mut entries = entries_from_keys(&[3, 0, 3, 1, 0]);
        let mut offsets = vec![0u32; 6];
        sort_and_compute_offsets(&mut entries, &mut offsets).unwrap();
        assert_eq!(offsets, vec![0, 2, 3, 3, 5, 5]);
        for k in 0..5u32 {
            let range = offsets[k as usize] as usize..offsets[k as usize + 1] as usize;
            assert!(entries[range].iter().all(|e| e.key == k));
        }
    }

    #[test]
    fn empty_entries_give_zero_table() {
        let mut entries: Vec<SortEntry> = Vec::new();
        let mut offsets = vec![9u32; 4];
        sort_and_compute_offsets(&mut entries, &mut offsets).unwrap();
        assert_eq!(offsets, vec![0, 0, 0, 0]);
    }

    #[test]
    fn out_of_range_key_is_rejected_without_writes() {
        let mut entries = entries_from_keys(&[2, 0, 5]);
        let before = entries.clone();
        let mut offsets = vec![7u32; 4];
        let err = sort_and_compute_offsets(&mut entries, &mut offsets).unwrap_err();
        assert_eq!(
            err,
            SortError::KeyOutOfRange {
                key: 5,
                key_count: 3
            }
        );
        assert_eq!(entries, before);
        assert_eq!(offsets, vec![7, 7, 7, 7]);
    }

    #[test]
    fn empty_offset_table_is_rejected() {
        let mut entries = entries_from_keys(&[0]);
        assert_eq!(
            sort_and_compute_offsets(&mut entries, &mut []),
            Err(SortError::EmptyOffsetTable)
        );
    }

    proptest! {
        #[test]
        fn matches_counting_sort(
            key_count in 1usize..64,
            raw in proptest::collection::vec(any::<u32>(), 0..400),
        ) {
            let keys: Vec<u32> = raw.iter().map(|k| k % key_count as u32).collect();
            let mut entries = entries_from_keys(&keys);
            let mut offsets = vec![0u32; key_count + 1];
            sort_and_compute_offsets(&mut entries, &mut offsets).unwrap();
            prop_assert_eq!(offsets, counting_offsets(&keys, key_count));
        }
    }
}
