//! Tracking provider interface
//!
//! The provider wraps the device driver. Each poll fills a flat buffer with
//! seven floats per entity: `[x, y, z, qx, qy, qz, qw]`.

use thiserror::Error;

use crate::foundation::math::{Point3, Quat, Quaternion};
use crate::mapping::AxisRemap;

/// Floats per entity in the provider buffer
pub const SAMPLE_STRIDE: usize = 7;

/// Provider errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The device could not be started
    #[error("Tracking provider failed to start: {0}")]
    StartFailed(String),

    /// A poll produced no data
    #[error("Tracking provider poll failed: {0}")]
    PollFailed(String),

    /// The buffer cannot hold the requested entities
    #[error("Sample buffer holds {available} floats, {required} required")]
    BufferTooSmall {
        /// Floats needed
        required: usize,
        /// Floats available
        available: usize,
    },
}

/// Parameters of one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollRequest {
    /// Number of entities to report
    pub entity_count: usize,
    /// Configured wiring of the rig axes
    pub remap: AxisRemap,
}

/// Source of raw tracking samples
pub trait TrackingProvider {
    /// Start the device for the given number of trackers and base stations
    fn start(&mut self, entities: usize, base_stations: usize) -> Result<(), ProviderError>;

    /// Number of trackers the device sees
    fn detected_entities(&self) -> usize;

    /// Number of base stations the device sees
    fn detected_base_stations(&self) -> usize;

    /// Fill `buffer` with `request.entity_count` samples
    fn poll(&mut self, request: &PollRequest, buffer: &mut [f32]) -> Result<(), ProviderError>;

    /// Whether the provider applies `PollRequest::remap` itself
    ///
    /// When `false` the engine remaps the raw stream.
    fn applies_axis_remap(&self) -> bool {
        false
    }

    /// Stop the device
    fn stop(&mut self);
}

/// One raw reading of one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    /// Raw position
    pub position: Point3,
    /// Raw orientation
    pub rotation: Quat,
}

impl Default for RawSample {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            rotation: Quat::identity(),
        }
    }
}

impl RawSample {
    /// Read one entity from a seven-float slice
    ///
    /// A zero or non-finite quaternion reads as the identity rotation.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: &[f32; SAMPLE_STRIDE] = values.get(..SAMPLE_STRIDE)?.try_into().ok()?;
        let [x, y, z, qx, qy, qz, qw] = (*values).map(f64::from);

        let raw = Quaternion::new(qw, qx, qy, qz);
        let norm = raw.norm();
        let rotation = if norm.is_finite() && norm > f64::EPSILON {
            Quat::from_quaternion(raw)
        } else {
            Quat::identity()
        };

        Some(Self {
            position: Point3::new(x, y, z),
            rotation,
        })
    }

    /// Write the sample into a seven-float slice
    pub fn write_to(&self, out: &mut [f32]) {
        let q = self.rotation.quaternion();
        let values = [
            self.position.x,
            self.position.y,
            self.position.z,
            q.i,
            q.j,
            q.k,
            q.w,
        ];
        for (slot, value) in out.iter_mut().zip(values) {
            *slot = value as f32;
        }
    }
}

/// Split a provider buffer into per-entity samples
pub fn demultiplex(buffer: &[f32], entity_count: usize) -> Vec<RawSample> {
    buffer
        .chunks_exact(SAMPLE_STRIDE)
        .take(entity_count)
        .filter_map(RawSample::from_slice)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_demultiplex_layout() {
        let buffer = [
            1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0, //
            -1.0, 0.5, 4.0, 0.0, 1.0, 0.0, 0.0,
        ];
        let samples = demultiplex(&buffer, 2);

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(samples[0].rotation, Quat::identity());
        assert_eq!(samples[1].position, Point3::new(-1.0, 0.5, 4.0));
        assert_relative_eq!(samples[1].rotation.quaternion().j, 1.0);
    }

    #[test]
    fn test_demultiplex_ignores_extra_and_partial_data() {
        let buffer = [0.0_f32; SAMPLE_STRIDE * 2 + 3];
        assert_eq!(demultiplex(&buffer, 1).len(), 1);
        assert_eq!(demultiplex(&buffer, 5).len(), 2);
    }

    #[test]
    fn test_zero_quaternion_reads_as_identity() {
        let sample = RawSample::from_slice(&[0.0; SAMPLE_STRIDE]).unwrap();
        assert_eq!(sample.rotation, Quat::identity());
    }

    #[test]
    fn test_write_then_read_sample() {
        let sample = RawSample {
            position: Point3::new(0.5, -1.25, 2.0),
            rotation: Quat::from_euler_angles(0.0, 0.5, 0.0),
        };
        let mut buffer = [0.0_f32; SAMPLE_STRIDE];
        sample.write_to(&mut buffer);

        let read = RawSample::from_slice(&buffer).unwrap();
        assert_relative_eq!(read.position, sample.position, epsilon = 1e-6);
        assert_relative_eq!(read.rotation, sample.rotation, epsilon = 1e-6);
    }
}
