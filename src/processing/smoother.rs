//! Temporal fusion of anchor poses over a bounded sample window
//!
//! Position is the arithmetic mean of every sample in the window. Rotation
//! is the most recently pushed rotation: quaternion averaging is not
//! implemented, and callers observe exactly that approximation.

use crate::core::{Pose, DEFAULT_FUSION_WINDOW};
use nalgebra::Vector3;
use std::collections::VecDeque;

/// Sliding-window pose smoother for one anchor
#[derive(Debug, Clone)]
pub struct PoseSmoother {
    /// Maximum number of samples retained
    window_size: usize,
    /// Recent samples, oldest first
    window: VecDeque<Pose>,
    /// Last fused result, or the transform supplied to `clear`
    fused: Option<Pose>,
}

impl Default for PoseSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_FUSION_WINDOW)
    }
}

impl PoseSmoother {
    /// Create a smoother keeping at most `window_size` samples (minimum 1)
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            window: VecDeque::with_capacity(window_size),
            fused: None,
        }
    }

    /// Add a sample and return the fused pose
    pub fn push(&mut self, pose: Pose) -> Pose {
        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        self.window.push_back(pose);

        // A window of identical positions fuses to that position bit for bit;
        // the division below can round it off by an ulp.
        let uniform = self.window.iter().all(|sample| sample.position == pose.position);
        let fused = if uniform {
            pose
        } else {
            let sum = self
                .window
                .iter()
                .fold(Vector3::zeros(), |acc, sample| acc + sample.position);
            Pose::new(sum / self.window.len() as f64, pose.rotation)
        };
        self.fused = Some(fused);
        fused
    }

    /// Drop every sample and park the fused pose at the anchor's last transform
    pub fn clear(&mut self, last_known: Pose) {
        self.window.clear();
        self.fused = Some(last_known);
    }

    /// Most recent fused pose; `None` before the first push or clear
    pub fn fused(&self) -> Option<Pose> {
        self.fused
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window_size
    }

    /// Samples currently in the window, oldest first
    pub fn samples(&self) -> impl Iterator<Item = &Pose> + '_ {
        self.window.iter()
    }
}
