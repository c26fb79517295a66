//! Common audio types for ChainFx
//!
//! The chain processes each channel independently, so the engine's working
//! buffer is planar (one contiguous slice per channel). Interleaved frames
//! only exist at the device boundary, where [`StereoSample`] gives a
//! zero-copy view of `[L, R, L, R, ...]` data.

/// Default sample rate used when the host doesn't report one
pub const SAMPLE_RATE: u32 = 48000;

/// Number of processed channels (left, right)
pub const NUM_CHANNELS: usize = 2;

/// Largest callback the standalone host pre-allocates for
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Audio sample type
pub type Sample = f32;

/// A single interleaved stereo frame
///
/// Uses `#[repr(C)]` so `&[StereoSample]` and `&[f32]` (interleaved) can be
/// cast into each other with bytemuck.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value in both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }
}

/// Planar stereo buffer
///
/// Both channels always have the same length. Pre-allocate with
/// [`StereoBuffer::silence`] and resize per callback with
/// [`StereoBuffer::set_len_from_capacity`] to stay allocation-free.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoBuffer {
    left: Vec<Sample>,
    right: Vec<Sample>,
}

impl StereoBuffer {
    /// Create a buffer filled with silence
    pub fn silence(len: usize) -> Self {
        Self {
            left: vec![0.0; len],
            right: vec![0.0; len],
        }
    }

    /// Create a buffer from separate left and right channel slices
    pub fn from_channels(left: &[Sample], right: &[Sample]) -> Self {
        assert_eq!(left.len(), right.len(), "Channel lengths must match");
        Self {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }

    /// Create a buffer with the same signal in both channels
    pub fn from_mono(samples: &[Sample]) -> Self {
        Self::from_channels(samples, samples)
    }

    /// Number of frames
    #[inline]
    pub fn len(&self) -> usize {
        self.left.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Set the working length of a pre-allocated buffer (real-time safe)
    ///
    /// Growing within capacity fills the new frames with silence.
    #[inline]
    pub fn set_len_from_capacity(&mut self, new_len: usize) {
        debug_assert!(
            new_len <= self.left.capacity(),
            "set_len_from_capacity called with len > capacity"
        );
        self.left.resize(new_len, 0.0);
        self.right.resize(new_len, 0.0);
    }

    pub fn fill_silence(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }

    #[inline]
    pub fn left(&self) -> &[Sample] {
        &self.left
    }

    #[inline]
    pub fn right(&self) -> &[Sample] {
        &self.right
    }

    /// Mutable views of both channels at once
    #[inline]
    pub fn channels_mut(&mut self) -> (&mut [Sample], &mut [Sample]) {
        (&mut self.left, &mut self.right)
    }

    /// Channel by index (0 = left, anything else = right)
    #[inline]
    pub fn channel(&self, index: usize) -> &[Sample] {
        if index == 0 {
            &self.left
        } else {
            &self.right
        }
    }

    /// De-interleave frames into this buffer, replacing its contents
    ///
    /// Never allocates as long as `frames.len()` fits the capacity.
    pub fn copy_from_frames(&mut self, frames: &[StereoSample]) {
        self.set_len_from_capacity(frames.len());
        for (i, frame) in frames.iter().enumerate() {
            self.left[i] = frame.left;
            self.right[i] = frame.right;
        }
    }

    /// Write frame `i` of this buffer out as an interleaved sample
    #[inline]
    pub fn frame(&self, i: usize) -> StereoSample {
        StereoSample::new(self.left[i], self.right[i])
    }

    /// Scale all samples by a factor
    pub fn scale(&mut self, factor: Sample) {
        for sample in self.left.iter_mut().chain(self.right.iter_mut()) {
            *sample *= factor;
        }
    }
}

/// Root mean square of a slice (0.0 for an empty slice)
#[inline]
pub fn rms(samples: &[Sample]) -> Sample {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// Convert decibels to linear gain
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear gain to decibels, floored at `floor_db`
#[inline]
pub fn gain_to_db(gain: f32, floor_db: f32) -> f32 {
    if gain <= 0.0 {
        floor_db
    } else {
        (20.0 * gain.log10()).max(floor_db)
    }
}
