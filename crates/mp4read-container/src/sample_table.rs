//! MP4 sample table resolution.
//!
//! Sample tables describe how samples (frames) are organized in the file:
//! - stts: sample durations (decoding time)
//! - ctts: composition time offsets (for B-frames)
//! - stsc: sample-to-chunk mapping
//! - stsz: sample sizes
//! - stco/co64: chunk offsets
//!
//! Unlike a fully resolved table, the output keeps the chunk layout: a chunk
//! only knows where its first sample starts and how many samples it holds,
//! and per-sample offsets are recovered by summing sizes.

use crate::boxes::{SampleSizes, StscEntry};

/// A run of samples stored contiguously in the media data area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    /// File offset of the chunk's first sample.
    pub data_offset: u64,
    /// Number of samples stored in this chunk.
    pub samples_per_chunk: u32,
}

/// Per-sample size and timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Sample size in bytes. Zero-sized samples carry timing only.
    pub size: u32,
    /// Decode duration in media timescale units.
    pub time_delta: u32,
    /// Composition time offset (PTS - DTS) in media timescale units.
    pub composition_offset: i64,
}

/// Builder for constructing chunk and sample tables from raw box data.
#[derive(Debug, Default)]
pub struct SampleTableBuilder {
    stts_entries: Vec<(u32, u32)>,
    ctts_entries: Vec<(u32, i32)>,
    stsc_entries: Vec<StscEntry>,
    sizes: SampleSizes,
    chunk_offsets: Vec<u64>,
}

impl SampleTableBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set stts (decoding time to sample) entries.
    pub fn set_stts(&mut self, entries: Vec<(u32, u32)>) {
        self.stts_entries = entries;
    }

    /// Set ctts (composition time to sample) entries.
    pub fn set_ctts(&mut self, entries: Vec<(u32, i32)>) {
        self.ctts_entries = entries;
    }

    /// Set stsc (sample to chunk) entries.
    pub fn set_stsc(&mut self, entries: Vec<StscEntry>) {
        self.stsc_entries = entries;
    }

    /// Set stsz (sample size) data.
    pub fn set_stsz(&mut self, sizes: SampleSizes) {
        self.sizes = sizes;
    }

    /// Set chunk offsets (from stco or co64).
    pub fn set_chunk_offsets(&mut self, offsets: Vec<u64>) {
        self.chunk_offsets = offsets;
    }

    /// Resolve the chunk and sample tables.
    pub fn build(self) -> (Vec<Chunk>, Vec<Sample>) {
        (self.resolve_chunks(), self.resolve_samples())
    }

    /// Attach a sample count to every chunk.
    ///
    /// stsc runs are keyed by their 1-based first chunk; a run applies until
    /// the next run starts.
    fn resolve_chunks(&self) -> Vec<Chunk> {
        let mut chunks = Vec::with_capacity(self.chunk_offsets.len());
        let mut run = 0usize;

        for (i, &data_offset) in self.chunk_offsets.iter().enumerate() {
            let chunk_number = i as u32 + 1;
            while run + 1 < self.stsc_entries.len()
                && self.stsc_entries[run + 1].first_chunk <= chunk_number
            {
                run += 1;
            }
            let samples_per_chunk = match self.stsc_entries.get(run) {
                Some(entry) if entry.first_chunk <= chunk_number => entry.samples_per_chunk,
                _ => 0,
            };
            chunks.push(Chunk {
                data_offset,
                samples_per_chunk,
            });
        }

        chunks
    }

    fn resolve_samples(&self) -> Vec<Sample> {
        let sample_count = self.sizes.sample_count as usize;
        let mut samples = Vec::with_capacity(sample_count.min(self.capacity_hint()));

        let mut deltas = expand_runs(&self.stts_entries);
        let mut offsets = expand_runs(&self.ctts_entries);
        let last_delta = self.stts_entries.last().map(|&(_, d)| d).unwrap_or(0);

        for i in 0..sample_count {
            let size = if self.sizes.uniform_size > 0 {
                self.sizes.uniform_size
            } else {
                match self.sizes.sizes.get(i) {
                    Some(&size) => size,
                    // stsz shorter than its own sample_count
                    None => break,
                }
            };

            samples.push(Sample {
                size,
                // Pad with the last duration if stts runs out early
                time_delta: deltas.next().unwrap_or(last_delta),
                composition_offset: offsets.next().unwrap_or(0) as i64,
            });
        }

        samples
    }

    fn capacity_hint(&self) -> usize {
        if self.sizes.uniform_size > 0 {
            self.stts_entries
                .iter()
                .map(|&(count, _)| count as usize)
                .sum()
        } else {
            self.sizes.sizes.len()
        }
    }
}

/// Expand (count, value) runs lazily.
fn expand_runs<T: Copy>(runs: &[(u32, T)]) -> impl Iterator<Item = T> + '_ {
    runs.iter()
        .flat_map(|&(count, value)| std::iter::repeat(value).take(count as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stsc(first_chunk: u32, samples_per_chunk: u32) -> StscEntry {
        StscEntry {
            first_chunk,
            samples_per_chunk,
            sample_description_index: 1,
        }
    }

    #[test]
    fn test_sample_table_builder() {
        let mut builder = SampleTableBuilder::new();
        builder.set_stts(vec![(3, 1000)]);
        builder.set_stsc(vec![stsc(1, 3)]);
        builder.set_stsz(SampleSizes {
            uniform_size: 0,
            sample_count: 3,
            sizes: vec![100, 200, 150],
        });
        builder.set_chunk_offsets(vec![1000]);

        let (chunks, samples) = builder.build();

        assert_eq!(
            chunks,
            vec![Chunk {
                data_offset: 1000,
                samples_per_chunk: 3
            }]
        );
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].size, 200);
        assert!(samples.iter().all(|s| s.time_delta == 1000));
        assert!(samples.iter().all(|s| s.composition_offset == 0));
    }

    #[test]
    fn test_stsc_runs_span_chunks() {
        let mut builder = SampleTableBuilder::new();
        builder.set_stsc(vec![stsc(1, 2), stsc(3, 1)]);
        builder.set_chunk_offsets(vec![10, 20, 30, 40]);

        let (chunks, _) = builder.build();
        let counts: Vec<u32> = chunks.iter().map(|c| c.samples_per_chunk).collect();
        assert_eq!(counts, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_ctts_and_uniform_size() {
        let mut builder = SampleTableBuilder::new();
        builder.set_stts(vec![(2, 3000), (1, 1500)]);
        builder.set_ctts(vec![(1, 0), (1, 6000), (1, -3000)]);
        builder.set_stsc(vec![stsc(1, 3)]);
        builder.set_stsz(SampleSizes {
            uniform_size: 64,
            sample_count: 3,
            sizes: vec![],
        });
        builder.set_chunk_offsets(vec![0]);

        let (_, samples) = builder.build();
        let deltas: Vec<u32> = samples.iter().map(|s| s.time_delta).collect();
        let ctts: Vec<i64> = samples.iter().map(|s| s.composition_offset).collect();
        assert_eq!(deltas, vec![3000, 3000, 1500]);
        assert_eq!(ctts, vec![0, 6000, -3000]);
        assert!(samples.iter().all(|s| s.size == 64));
    }

    #[test]
    fn test_short_stts_pads_with_last_delta() {
        let mut builder = SampleTableBuilder::new();
        builder.set_stts(vec![(1, 512)]);
        builder.set_stsz(SampleSizes {
            uniform_size: 0,
            sample_count: 3,
            sizes: vec![1, 2, 3],
        });

        let (_, samples) = builder.build();
        assert!(samples.iter().all(|s| s.time_delta == 512));
    }
}
