use crate::item::ImageItem;
use serde::Serialize;

/// Percentage decrease from `original` to `compressed`, rounded to one decimal.
///
/// Halves round towards positive infinity, so `-6.25` becomes `-6.2`.
/// Negative values mean the output grew.
///
/// # Arguments
/// * `original` - Source size in bytes
/// * `compressed` - Output size in bytes
///
/// # Returns
/// * Reduction in percent, `0.0` when `original` is zero
pub fn reduction_percentage(original: u64, compressed: u64) -> f64 {
    if original == 0 {
        return 0.0;
    }
    let ratio = ((original as f64 - compressed as f64) / original as f64) * 100.0;
    (ratio * 10.0 + 0.5).floor() / 10.0
}

/// Cross-item view over the compressed subset of a batch. Always recomputed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchStats {
    pub count: usize,
    pub total_original: u64,
    pub total_compressed: u64,
    pub bytes_saved: i64,
    pub reduction: f64,
}

impl BatchStats {
    /// Aggregates `(original, compressed)` pairs; `None` for an empty set.
    ///
    /// The reduction is taken over the sums, so large images weigh more than
    /// small ones.
    ///
    /// # Arguments
    /// * `sizes` - `(original, compressed)` byte counts, one pair per item
    ///
    /// # Returns
    /// * `Some(stats)` - Totals, bytes saved and overall reduction
    /// * `None` - If `sizes` is empty
    pub fn from_sizes<I>(sizes: I) -> Option<Self>
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let (count, total_original, total_compressed) = sizes.into_iter().fold(
            (0usize, 0u64, 0u64),
            |(count, original, compressed), (o, c)| {
                (count + 1, original.saturating_add(o), compressed.saturating_add(c))
            },
        );

        if count == 0 {
            return None;
        }

        Some(Self {
            count,
            total_original,
            total_compressed,
            bytes_saved: total_original as i64 - total_compressed as i64,
            reduction: reduction_percentage(total_original, total_compressed),
        })
    }
}

/// Statistics over the items currently `Compressed`.
///
/// Idle, in-flight and failed items are ignored.
///
/// # Returns
/// * `Some(stats)` - If at least one item is compressed
/// * `None` - Nothing to show
pub fn aggregate(items: &[ImageItem]) -> Option<BatchStats> {
    BatchStats::from_sizes(items.iter().filter_map(|item| {
        item.compressed()
            .map(|compressed| (item.original_size(), compressed.compressed_size))
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reduction_percentage() {
        assert_eq!(reduction_percentage(1000, 800), 20.0);
        assert_eq!(reduction_percentage(1000, 1200), -20.0);
        assert_eq!(reduction_percentage(1000, 1000), 0.0);
        assert_eq!(reduction_percentage(0, 500), 0.0);
        assert_eq!(reduction_percentage(0, 0), 0.0);
        assert_eq!(reduction_percentage(3, 1), 66.7);
        assert_eq!(reduction_percentage(3, 2), 33.3);
    }

    #[test]
    fn test_reduction_rounds_half_up() {
        // 6.25% and -6.25%
        assert_eq!(reduction_percentage(16, 15), 6.3);
        assert_eq!(reduction_percentage(16, 17), -6.2);
    }

    #[test]
    fn test_aggregate_uses_summed_sizes() {
        let stats = BatchStats::from_sizes([(100, 50), (300, 150)]).unwrap();
        assert_eq!(stats.reduction, 50.0);

        let stats = BatchStats::from_sizes([(100, 50), (1000, 900)]).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_original, 1100);
        assert_eq!(stats.total_compressed, 950);
        assert_eq!(stats.bytes_saved, 150);
        assert_eq!(stats.reduction, 13.6);
    }

    #[test]
    fn test_empty_set_has_no_stats() {
        assert_eq!(BatchStats::from_sizes(Vec::<(u64, u64)>::new()), None);
        assert_eq!(aggregate(&[]), None);
    }

    #[test]
    fn test_aggregate_ignores_items_not_compressed() {
        let items = vec![
            ImageItem::new("a.png", "image/png", vec![0u8; 100]),
            ImageItem::new("b.png", "image/png", vec![0u8; 200]),
        ];
        assert_eq!(aggregate(&items), None);
    }

    #[test]
    fn test_bytes_saved_can_be_negative() {
        let stats = BatchStats::from_sizes([(100, 150)]).unwrap();
        assert_eq!(stats.bytes_saved, -50);
        assert_eq!(stats.reduction, -50.0);
    }
}
