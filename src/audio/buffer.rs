use std::time::Duration;

/// Accumulates captured blocks in arrival order.
///
/// Multichannel blocks are stored interleaved (`c0, c1, c0, c1, ...`). The
/// running sample count and duration are tracked incrementally as blocks
/// arrive, so they never require a pass over the buffered data.
#[derive(Debug, Clone)]
pub struct FrameCollector {
    blocks: Vec<Vec<f32>>,
    sample_count: usize,
    input_sample_rate: u32,
    duration_secs: f64,
}

impl FrameCollector {
    #[must_use]
    pub const fn new(input_sample_rate: u32) -> Self {
        Self {
            blocks: Vec::new(),
            sample_count: 0,
            input_sample_rate,
            duration_secs: 0.0,
        }
    }

    /// Append one block given as per-channel sample arrays.
    ///
    /// Channels are interleaved index by index. Channel arrays of unequal
    /// length are interleaved up to the shortest one.
    pub fn push(&mut self, channels: &[Vec<f32>]) {
        let block = interleave(channels);
        let frames = channels.iter().map(Vec::len).min().unwrap_or(0);

        self.sample_count += block.len();
        if self.input_sample_rate > 0 {
            self.duration_secs += frames as f64 / f64::from(self.input_sample_rate);
        }
        self.blocks.push(block);
    }

    /// Drop all buffered blocks and reset the counters.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.sample_count = 0;
        self.duration_secs = 0.0;
    }

    #[must_use]
    pub fn blocks(&self) -> &[Vec<f32>] {
        &self.blocks
    }

    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub const fn sample_count(&self) -> usize {
        self.sample_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.duration_secs)
    }

    #[must_use]
    pub const fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

fn interleave(channels: &[Vec<f32>]) -> Vec<f32> {
    match channels {
        [] => Vec::new(),
        [mono] => mono.clone(),
        _ => {
            let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
            let mut out = Vec::with_capacity(frames * channels.len());
            for i in 0..frames {
                for channel in channels {
                    out.push(channel[i]);
                }
            }
            out
        }
    }
}

/// Concatenate every buffered block, in arrival order, into one sequence.
#[must_use]
pub fn flatten(collector: &FrameCollector) -> Vec<f32> {
    let mut data = Vec::with_capacity(collector.sample_count());
    for block in collector.blocks() {
        data.extend_from_slice(block);
    }
    data
}
