use crate::core::io::sink::{OutputSink, SinkError};
use std::fmt::Write as _;
use thiserror::Error;

/// Largest number of bins a single axis may have.
pub const MAX_BINS: usize = 10_000_000;

/// Largest number of cells a histogram grid may allocate over all its axes.
pub const MAX_CELLS: usize = 50_000_000;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("Invalid bin range [{min}, {max}) with resolution {resolution} (at most {MAX_BINS} bins)")]
pub struct InvalidRange {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Histogram grid of {dims:?} bins exceeds the limit of {MAX_CELLS} cells")]
pub struct GridTooLarge {
    pub dims: Vec<usize>,
}

/// Total cell count of a grid with the given axis sizes.
pub fn grid_cells(dims: &[usize]) -> Result<usize, GridTooLarge> {
    dims.iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n))
        .filter(|&cells| cells <= MAX_CELLS)
        .ok_or_else(|| GridTooLarge {
            dims: dims.to_vec(),
        })
}

/// Extent and bin width of one histogram axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinRange {
    pub min: f64,
    pub max: f64,
    pub resolution: f64,
}

impl BinRange {
    pub fn new(min: f64, max: f64, resolution: f64) -> Result<Self, InvalidRange> {
        let valid = min.is_finite() && max.is_finite() && resolution.is_finite();
        let bins = ((max - min) / resolution).round();
        if !valid || max <= min || resolution <= 0.0 || bins > MAX_BINS as f64 {
            return Err(InvalidRange {
                min,
                max,
                resolution,
            });
        }
        Ok(Self {
            min,
            max,
            resolution,
        })
    }

    pub fn bins(&self) -> usize {
        (((self.max - self.min) / self.resolution).round() as usize).max(1)
    }

    /// Bin index of `value`. Out-of-range values land in the nearest edge bin and
    /// NaN lands in the first bin, so every observation is counted.
    pub fn index(&self, value: f64) -> usize {
        if value.is_nan() {
            return 0;
        }
        let last = self.bins() - 1;
        let raw = ((value - self.min) / self.resolution).floor();
        if raw <= 0.0 {
            0
        } else if raw >= last as f64 {
            last
        } else {
            raw as usize
        }
    }

    pub fn lower_edge(&self, index: usize) -> f64 {
        self.min + index as f64 * self.resolution
    }
}

/// Population correction applied when a histogram is written out.
///
/// Angles are taken in degrees. A bin whose sine is exactly zero is written
/// uncorrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTransform {
    #[default]
    Identity,
    DivideBySinFirst,
}

impl OutputTransform {
    pub fn apply(self, population: u64, first: f64) -> f64 {
        let population = population as f64;
        match self {
            OutputTransform::Identity => population,
            OutputTransform::DivideBySinFirst => {
                let s = first.to_radians().sin();
                if s == 0.0 { population } else { population / s }
            }
        }
    }
}

/// Anything that can be written as a whitespace-delimited text table.
pub trait Tabulate {
    fn table(&self, transform: OutputTransform) -> String;
    fn total_count(&self) -> u64;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram1D {
    range: BinRange,
    counts: Vec<u64>,
}

impl Histogram1D {
    pub fn new(range: BinRange) -> Self {
        Self {
            range,
            counts: vec![0; range.bins()],
        }
    }

    pub fn record(&mut self, value: f64) {
        self.counts[self.range.index(value)] += 1;
    }

    pub fn count(&self, index: usize) -> u64 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    pub fn population(&self, value: f64) -> u64 {
        self.counts[self.range.index(value)]
    }

    pub fn range(&self) -> &BinRange {
        &self.range
    }
}

impl Tabulate for Histogram1D {
    fn table(&self, transform: OutputTransform) -> String {
        let mut out = String::new();
        for (i, &count) in self.counts.iter().enumerate() {
            let value = self.range.lower_edge(i);
            let population = transform.apply(count, value);
            let _ = writeln!(out, "{value:.4} {population:.4}");
        }
        out
    }

    fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// A dense 2D histogram stored row-major: the first axis selects the row.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram2D {
    first: BinRange,
    second: BinRange,
    counts: Vec<u64>,
}

impl Histogram2D {
    pub fn new(first: BinRange, second: BinRange) -> Result<Self, GridTooLarge> {
        let cells = grid_cells(&[first.bins(), second.bins()])?;
        Ok(Self {
            first,
            second,
            counts: vec![0; cells],
        })
    }

    fn offset(&self, i: usize, j: usize) -> usize {
        i * self.second.bins() + j
    }

    pub fn record(&mut self, v1: f64, v2: f64) {
        let offset = self.offset(self.first.index(v1), self.second.index(v2));
        self.counts[offset] += 1;
    }

    pub fn count(&self, i: usize, j: usize) -> u64 {
        if i >= self.first.bins() || j >= self.second.bins() {
            return 0;
        }
        self.counts[self.offset(i, j)]
    }

    pub fn population(&self, v1: f64, v2: f64) -> u64 {
        self.count(self.first.index(v1), self.second.index(v2))
    }

    pub fn ranges(&self) -> (&BinRange, &BinRange) {
        (&self.first, &self.second)
    }
}

impl Tabulate for Histogram2D {
    fn table(&self, transform: OutputTransform) -> String {
        let mut out = String::new();
        for i in 0..self.first.bins() {
            let v1 = self.first.lower_edge(i);
            for j in 0..self.second.bins() {
                let v2 = self.second.lower_edge(j);
                let population = transform.apply(self.count(i, j), v1);
                let _ = writeln!(out, "{v1:.4} {v2:.4} {population:.4}");
            }
        }
        out
    }

    fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Two 2D histograms over the same grid, written side by side as
/// `v1 v2 popA v2 popB`.
#[derive(Debug, Clone, PartialEq)]
pub struct PairedHistogram2D {
    pub first: Histogram2D,
    pub second: Histogram2D,
}

impl PairedHistogram2D {
    pub fn new(first: BinRange, second: BinRange) -> Result<Self, GridTooLarge> {
        grid_cells(&[2, first.bins(), second.bins()])?;
        Ok(Self {
            first: Histogram2D::new(first, second)?,
            second: Histogram2D::new(first, second)?,
        })
    }
}

impl Tabulate for PairedHistogram2D {
    fn table(&self, transform: OutputTransform) -> String {
        let (r1, r2) = self.first.ranges();
        let mut out = String::new();
        for i in 0..r1.bins() {
            let v1 = r1.lower_edge(i);
            for j in 0..r2.bins() {
                let v2 = r2.lower_edge(j);
                let a = transform.apply(self.first.count(i, j), v1);
                let b = transform.apply(self.second.count(i, j), v1);
                let _ = writeln!(out, "{v1:.4} {v2:.4} {a:.4} {v2:.4} {b:.4}");
            }
        }
        out
    }

    fn total_count(&self) -> u64 {
        self.first.total_count() + self.second.total_count()
    }
}

/// One 2D histogram per slice of a third dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Multi2DHistogram {
    slices: BinRange,
    histograms: Vec<Histogram2D>,
}

impl Multi2DHistogram {
    pub fn new(slices: BinRange, first: BinRange, second: BinRange) -> Result<Self, GridTooLarge> {
        grid_cells(&[slices.bins(), first.bins(), second.bins()])?;
        Ok(Self {
            slices,
            histograms: vec![Histogram2D::new(first, second)?; slices.bins()],
        })
    }

    /// Slice selected by `v3`, clamped to the first and last slice.
    pub fn slice_index(&self, v3: f64) -> usize {
        self.slices.index(v3)
    }

    pub fn record(&mut self, v3: f64, v1: f64, v2: f64) {
        let index = self.slice_index(v3);
        self.histograms[index].record(v1, v2);
    }

    pub fn slice(&self, index: usize) -> Option<&Histogram2D> {
        self.histograms.get(index)
    }

    pub fn slice_count(&self) -> usize {
        self.histograms.len()
    }

    pub fn slice_range(&self) -> &BinRange {
        &self.slices
    }

    pub fn total_count(&self) -> u64 {
        self.histograms.iter().map(Tabulate::total_count).sum()
    }
}

/// A histogram bound to the file it is checkpointed into.
#[derive(Debug)]
pub struct HistogramAgent<H> {
    pub histogram: H,
    sink: OutputSink,
    transform: OutputTransform,
}

impl<H: Tabulate> HistogramAgent<H> {
    pub fn new(histogram: H, sink: OutputSink, transform: OutputTransform) -> Self {
        Self {
            histogram,
            sink,
            transform,
        }
    }

    /// Rewrites the output file with the current table.
    pub fn flush(&mut self) -> Result<(), SinkError> {
        if !self.sink.is_enabled() {
            return Ok(());
        }
        let table = self.histogram.table(self.transform);
        self.sink.rewrite(&table)
    }
}

/// A [`Multi2DHistogram`] with one output file per slice.
#[derive(Debug)]
pub struct Multi2DHistogramAgent {
    pub histogram: Multi2DHistogram,
    sinks: Vec<OutputSink>,
    transform: OutputTransform,
}

impl Multi2DHistogramAgent {
    /// `sinks` must hold one sink per slice, in slice order.
    pub fn new(histogram: Multi2DHistogram, sinks: Vec<OutputSink>, transform: OutputTransform) -> Self {
        Self {
            histogram,
            sinks,
            transform,
        }
    }

    pub fn flush(&mut self) -> Result<(), SinkError> {
        for (i, sink) in self.sinks.iter_mut().enumerate() {
            if let Some(histogram) = self.histogram.slice(i) {
                if sink.is_enabled() {
                    sink.rewrite(&histogram.table(self.transform))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn range(min: f64, max: f64, res: f64) -> BinRange {
        BinRange::new(min, max, res).unwrap()
    }

    mod bin_range {
        use super::*;

        #[test]
        fn bin_count_rounds_to_nearest() {
            assert_eq!(range(0.0, 1.0, 0.1).bins(), 10);
            assert_eq!(range(-1.0, 1.0, 0.5).bins(), 4);
            assert_eq!(range(0.0, 0.2, 1.0).bins(), 1);
        }

        #[test]
        fn index_clamps_out_of_range_values() {
            let r = range(0.0, 10.0, 1.0);
            assert_eq!(r.index(-5.0), 0);
            assert_eq!(r.index(0.0), 0);
            assert_eq!(r.index(3.7), 3);
            assert_eq!(r.index(10.0), 9);
            assert_eq!(r.index(1e300), 9);
            assert_eq!(r.index(f64::NEG_INFINITY), 0);
            assert_eq!(r.index(f64::NAN), 0);
        }

        #[test]
        fn invalid_ranges_are_rejected() {
            assert!(BinRange::new(1.0, 1.0, 0.1).is_err());
            assert!(BinRange::new(0.0, 1.0, 0.0).is_err());
            assert!(BinRange::new(0.0, f64::INFINITY, 0.1).is_err());
        }

        #[test]
        fn vanishing_resolutions_are_rejected() {
            assert!(BinRange::new(0.0, 1.0, 1e-300).is_err());
            assert!(BinRange::new(0.0, 1.0, 1.0 / (MAX_BINS as f64 + 10.0)).is_err());
            assert_eq!(BinRange::new(0.0, MAX_BINS as f64, 1.0).unwrap().bins(), MAX_BINS);
        }

        #[test]
        fn oversized_grids_are_rejected_without_allocating() {
            let wide = range(0.0, 1.0, 1e-6);
            let angle = range(0.0, 180.0, 0.1);
            assert_eq!(
                Histogram2D::new(wide, angle).unwrap_err(),
                GridTooLarge {
                    dims: vec![1_000_000, 1800]
                }
            );
            assert!(Multi2DHistogram::new(wide, angle, angle).is_err());
            assert!(PairedHistogram2D::new(wide, range(0.0, 1.0, 0.1)).is_ok());
            assert!(PairedHistogram2D::new(wide, range(0.0, 1.0, 0.01)).is_err());
        }

        #[test]
        fn grid_cells_detects_overflow() {
            assert_eq!(grid_cells(&[10, 20]), Ok(200));
            assert!(grid_cells(&[usize::MAX, 2]).is_err());
        }
    }

    mod conservation {
        use super::*;

        const VALUES: [f64; 8] = [-100.0, -0.5, 0.0, 0.49, 3.2, 9.99, 10.0, 1e9];

        #[test]
        fn histogram_1d_counts_every_observation() {
            let mut h = Histogram1D::new(range(0.0, 10.0, 0.5));
            for v in VALUES {
                h.record(v);
            }
            h.record(f64::NAN);
            assert_eq!(h.total_count(), VALUES.len() as u64 + 1);
            assert_eq!(h.count(0), 5);
            assert_eq!(h.count(19), 3);
        }

        #[test]
        fn histogram_2d_counts_every_observation() {
            let mut h = Histogram2D::new(range(0.0, 10.0, 1.0), range(-1.0, 1.0, 0.1)).unwrap();
            for (i, v) in VALUES.iter().enumerate() {
                h.record(*v, if i % 2 == 0 { -7.0 } else { 0.55 });
            }
            assert_eq!(h.total_count(), VALUES.len() as u64);
            assert_eq!(h.population(-100.0, -7.0), 2);
            assert_eq!(h.count(9, 15), 2);
        }

        #[test]
        fn multi_2d_clamps_slices_and_counts_every_observation() {
            let mut h = Multi2DHistogram::new(
                range(-5.0, 5.0, 2.5),
                range(0.0, 180.0, 10.0),
                range(0.0, 90.0, 10.0),
            )
            .unwrap();
            assert_eq!(h.slice_count(), 4);
            h.record(-50.0, 45.0, 45.0);
            h.record(0.0, 45.0, 45.0);
            h.record(50.0, 45.0, 45.0);
            assert_eq!(h.slice_index(-50.0), 0);
            assert_eq!(h.slice_index(50.0), 3);
            assert_eq!(h.total_count(), 3);
            assert_eq!(h.slice(0).unwrap().total_count(), 1);
            assert_eq!(h.slice(2).unwrap().total_count(), 1);
            assert_eq!(h.slice(3).unwrap().total_count(), 1);
        }
    }

    mod output {
        use super::*;

        #[test]
        fn transform_divides_by_sine_of_first_axis() {
            let corrected = OutputTransform::DivideBySinFirst.apply(10, 30.0);
            assert!((corrected - 20.0).abs() < 1e-9);
            assert_eq!(OutputTransform::Identity.apply(7, 30.0), 7.0);
        }

        #[test]
        fn transform_leaves_zero_sine_bins_uncorrected() {
            assert_eq!(OutputTransform::DivideBySinFirst.apply(5, 0.0), 5.0);
        }

        #[test]
        fn transform_does_not_touch_stored_counts() {
            let mut h = Histogram1D::new(range(0.0, 180.0, 90.0));
            h.record(100.0);
            let _ = h.table(OutputTransform::DivideBySinFirst);
            assert_eq!(h.count(1), 1);
        }

        #[test]
        fn table_1d_uses_lower_bin_edges_in_order() {
            let mut h = Histogram1D::new(range(0.0, 2.0, 1.0));
            h.record(1.5);
            assert_eq!(h.table(OutputTransform::Identity), "0.0000 0.0000\n1.0000 1.0000\n");
        }

        #[test]
        fn table_2d_is_row_major() {
            let mut h = Histogram2D::new(range(0.0, 2.0, 1.0), range(0.0, 2.0, 1.0)).unwrap();
            h.record(1.0, 0.0);
            let table = h.table(OutputTransform::Identity);
            let rows: Vec<&str> = table.lines().collect();
            assert_eq!(
                rows,
                vec![
                    "0.0000 0.0000 0.0000",
                    "0.0000 1.0000 0.0000",
                    "1.0000 0.0000 1.0000",
                    "1.0000 1.0000 0.0000",
                ]
            );
        }

        #[test]
        fn paired_table_writes_both_populations() {
            let mut h = PairedHistogram2D::new(range(0.0, 1.0, 1.0), range(0.0, 1.0, 1.0)).unwrap();
            h.first.record(0.5, 0.5);
            h.second.record(0.5, 0.5);
            h.second.record(0.5, 0.5);
            assert_eq!(
                h.table(OutputTransform::Identity),
                "0.0000 0.0000 1.0000 0.0000 2.0000\n"
            );
            assert_eq!(h.total_count(), 3);
        }

        #[test]
        fn agent_flush_rewrites_file_at_each_checkpoint() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("h.dat");
            let sink = OutputSink::open(Some(path.as_path())).unwrap();
            let mut agent = HistogramAgent::new(
                Histogram1D::new(range(0.0, 2.0, 1.0)),
                sink,
                OutputTransform::Identity,
            );
            agent.histogram.record(0.5);
            agent.flush().unwrap();
            agent.histogram.record(0.5);
            agent.flush().unwrap();
            assert_eq!(
                std::fs::read_to_string(&path).unwrap(),
                "0.0000 2.0000\n1.0000 0.0000\n"
            );
        }

        #[test]
        fn multi_agent_writes_one_file_per_slice() {
            let dir = tempdir().unwrap();
            let slices = range(0.0, 2.0, 1.0);
            let sinks = (0..slices.bins())
                .map(|i| {
                    let path = dir.path().join(format!("slice.{i}.dat"));
                    OutputSink::open(Some(path.as_path())).unwrap()
                })
                .collect();
            let mut agent = Multi2DHistogramAgent::new(
                Multi2DHistogram::new(slices, range(0.0, 1.0, 1.0), range(0.0, 1.0, 1.0)).unwrap(),
                sinks,
                OutputTransform::Identity,
            );
            agent.histogram.record(1.5, 0.0, 0.0);
            agent.flush().unwrap();
            let second = std::fs::read_to_string(dir.path().join("slice.1.dat")).unwrap();
            let first = std::fs::read_to_string(dir.path().join("slice.0.dat")).unwrap();
            assert_eq!(second, "0.0000 0.0000 1.0000\n");
            assert_eq!(first, "0.0000 0.0000 0.0000\n");
        }
    }
}
