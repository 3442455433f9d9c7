//! Chunk layout for compressed leaves

use crate::dtype::StorageType;

/// Upper bound on one chunk, in bytes.
pub const MAX_CHUNK_BYTES: usize = 1024 * 1024;

/// Bytes per variable-length element (length word plus heap reference).
const VAR_ELEMENT_BYTES: usize = 16;

/// Bytes one element of `dtype` occupies in a chunk.
pub fn element_bytes(dtype: &StorageType) -> usize {
    match dtype {
        StorageType::Compound { columns } => columns.iter().map(|(_, t)| element_bytes(t)).sum(),
        other => other.element_size().unwrap_or(VAR_ELEMENT_BYTES),
    }
}

/// Chunk extents: the largest extent is halved (rounding up) until one chunk
/// fits in `MAX_CHUNK_BYTES` or every extent is 1.
pub fn chunk_dims(dims: &[usize], element_bytes: usize) -> Vec<usize> {
    let mut chunk: Vec<usize> = dims.iter().map(|d| (*d).max(1)).collect();
    let element_bytes = element_bytes.max(1);
    loop {
        let bytes = chunk
            .iter()
            .fold(element_bytes, |acc, d| acc.saturating_mul(*d));
        if bytes <= MAX_CHUNK_BYTES {
            break;
        }
        // Largest extent, first one on ties
        let Some((i, largest)) = chunk
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best: Option<(usize, usize)>, (i, d)| match best {
                Some((_, b)) if b >= d => best,
                _ => Some((i, d)),
            })
        else {
            break;
        };
        if largest <= 1 {
            break;
        }
        chunk[i] = largest.div_ceil(2);
    }
    chunk
}

/// Layout for a leaf: chunked only when compressed and not scalar.
pub fn plan(dims: &[usize], dtype: &StorageType, compression: u8) -> Option<Vec<usize>> {
    if compression == 0 || dims.is_empty() {
        return None;
    }
    Some(chunk_dims(dims, element_bytes(dtype)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_leaf_is_one_chunk() {
        assert_eq!(chunk_dims(&[100, 10], 8), vec![100, 10]);
    }

    #[test]
    fn test_large_vector_halves() {
        // 1M doubles = 8 MiB -> three halvings
        assert_eq!(chunk_dims(&[1 << 20], 8), vec![1 << 17]);
    }

    #[test]
    fn test_largest_extent_halved_first() {
        let c = chunk_dims(&[4096, 512], 8);
        assert!(c.iter().product::<usize>() * 8 <= MAX_CHUNK_BYTES);
        assert_eq!(c, vec![256, 512]);
    }

    #[test]
    fn test_stops_at_unit_extent() {
        assert_eq!(chunk_dims(&[1], 4 * MAX_CHUNK_BYTES), vec![1]);
    }

    #[test]
    fn test_plan_only_when_compressed() {
        assert_eq!(plan(&[10], &StorageType::Float64, 0), None);
        assert_eq!(plan(&[], &StorageType::Float64, 4), None);
        assert_eq!(plan(&[10], &StorageType::Float64, 4), Some(vec![10]));
    }
}
