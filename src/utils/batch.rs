use crate::error::{AppError, Result};

/// Split `items` into consecutive chunks of `size`; the last chunk may be shorter.
pub fn batched<T>(items: &[T], size: usize) -> Result<Vec<&[T]>> {
    if size < 1 {
        return Err(AppError::message("batch size must be at least one"));
    }
    Ok(items.chunks(size).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_rows() {
        let items: Vec<u32> = (1..=10).collect();
        let rows = batched(&items, 4).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], &[1, 2, 3, 4]);
        assert_eq!(rows[2], &[9, 10]);
        assert!(batched::<u32>(&[], 3).unwrap().is_empty());
    }

    #[test]
    fn rejects_zero_size() {
        assert!(batched(&[1, 2, 3], 0).is_err());
    }
}
