//! Column-layout detection from word bounding boxes.
//!
//! Pure geometry: bucket the word left-edges into a histogram across the
//! page width and look for low-density gaps. Each run of adjacent gap bins
//! marks one column boundary.

use crate::extraction::Word;

const MIN_WORDS: usize = 10;
const MIN_SPAN: f32 = 100.0;
const NUM_BINS: usize = 20;
const GAP_DENSITY_RATIO: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    Empty,
    Single,
    MultiColumn,
}

/// One detected vertical column band, with a word count for diagnostics.
#[derive(Debug, Clone)]
pub struct ColumnBand {
    pub x_min: f32,
    pub x_max: f32,
    pub words: usize,
}

/// Per-page layout classification. Computed once, consumed by the extractor
/// to pick an extraction strategy, then discarded.
#[derive(Debug, Clone)]
pub struct LayoutInfo {
    pub kind: LayoutKind,
    pub columns: Vec<ColumnBand>,
}

impl LayoutInfo {
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_multi_column(&self) -> bool {
        self.kind == LayoutKind::MultiColumn
    }
}

fn single_column(words: &[Word], x_min: f32, x_max: f32) -> LayoutInfo {
    LayoutInfo {
        kind: LayoutKind::Single,
        columns: vec![ColumnBand {
            x_min,
            x_max,
            words: words.len(),
        }],
    }
}

/// Classify a page's layout from its word boxes.
///
/// Sparse pages (under 10 words) and narrow pages (left-edge span under
/// 100pt) are always single-column; gap analysis on so little data would
/// hallucinate columns out of ordinary word spacing.
pub fn analyze_layout(words: &[Word]) -> LayoutInfo {
    if words.is_empty() {
        return LayoutInfo {
            kind: LayoutKind::Empty,
            columns: Vec::new(),
        };
    }

    let x_min = words.iter().map(|w| w.x0).fold(f32::INFINITY, f32::min);
    let x_max = words.iter().map(|w| w.x0).fold(f32::NEG_INFINITY, f32::max);
    let x_range = x_max - x_min;

    if words.len() < MIN_WORDS || x_range < MIN_SPAN {
        return single_column(words, x_min, x_max);
    }

    let bin_width = x_range / NUM_BINS as f32;
    let mut bins = [0usize; NUM_BINS];
    for word in words {
        let idx = (((word.x0 - x_min) / bin_width) as usize).min(NUM_BINS - 1);
        bins[idx] += 1;
    }

    let avg_density = words.len() as f32 / NUM_BINS as f32;
    let gap_threshold = avg_density * GAP_DENSITY_RATIO;

    // Runs of adjacent low-density bins form gap groups.
    let mut gap_groups: Vec<(usize, usize)> = Vec::new();
    for (i, &count) in bins.iter().enumerate() {
        if (count as f32) < gap_threshold {
            match gap_groups.last_mut() {
                Some(group) if group.1 + 1 == i => group.1 = i,
                _ => gap_groups.push((i, i)),
            }
        }
    }

    if gap_groups.is_empty() {
        return single_column(words, x_min, x_max);
    }

    // Each gap group's center becomes a column boundary.
    let mut boundaries = vec![x_min];
    for (first, last) in &gap_groups {
        let gap_center = (*first as f32 + *last as f32) / 2.0;
        boundaries.push(x_min + gap_center * bin_width);
    }
    boundaries.push(x_max);

    let mut columns = Vec::with_capacity(boundaries.len() - 1);
    for pair in boundaries.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        let last = hi == x_max;
        let count = words
            .iter()
            .filter(|w| w.x0 >= lo && (w.x0 < hi || (last && w.x0 <= hi)))
            .count();
        columns.push(ColumnBand {
            x_min: lo,
            x_max: hi,
            words: count,
        });
    }

    LayoutInfo {
        kind: LayoutKind::MultiColumn,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(x0: f32) -> Word {
        Word {
            text: "w".to_string(),
            x0,
            x1: x0 + 20.0,
            top: 100.0,
            bottom: 110.0,
        }
    }

    #[test]
    fn test_empty_page() {
        let layout = analyze_layout(&[]);
        assert_eq!(layout.kind, LayoutKind::Empty);
        assert_eq!(layout.num_columns(), 0);
    }

    #[test]
    fn test_few_words_is_single() {
        let words: Vec<Word> = (0..5).map(|i| word(i as f32 * 200.0)).collect();
        let layout = analyze_layout(&words);
        assert_eq!(layout.kind, LayoutKind::Single);
        assert_eq!(layout.num_columns(), 1);
    }

    #[test]
    fn test_narrow_span_is_single() {
        let words: Vec<Word> = (0..30).map(|i| word(50.0 + (i % 8) as f32 * 10.0)).collect();
        let layout = analyze_layout(&words);
        assert_eq!(layout.kind, LayoutKind::Single);
    }

    #[test]
    fn test_two_columns_detected() {
        // Dense cluster at x in [50, 150], another at [400, 500], empty middle.
        let mut words = Vec::new();
        for i in 0..40 {
            words.push(word(50.0 + (i % 10) as f32 * 10.0));
            words.push(word(400.0 + (i % 10) as f32 * 10.0));
        }
        let layout = analyze_layout(&words);
        assert_eq!(layout.kind, LayoutKind::MultiColumn);
        assert_eq!(layout.num_columns(), 2);
        assert!(layout.columns[0].words > 0);
        assert!(layout.columns[1].words > 0);
        assert!(layout.columns[0].x_max <= layout.columns[1].x_min + f32::EPSILON);
    }

    #[test]
    fn test_uniform_page_is_single() {
        // Words spread evenly across the width leave no gap bins.
        let words: Vec<Word> = (0..200).map(|i| word(40.0 + (i % 40) as f32 * 12.0)).collect();
        let layout = analyze_layout(&words);
        assert_eq!(layout.kind, LayoutKind::Single);
    }
}
