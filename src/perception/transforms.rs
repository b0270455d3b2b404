//! Time-stamped frame transforms
//!
//! Each edge stores the pose of a child frame in its parent frame. Lookups
//! walk the frame graph breadth-first, so chains such as
//! `map -> odom -> base_link` resolve without an explicit tree.

use crate::common::Stamp;
use crate::error::{NavError, Result};
use nalgebra::Isometry2;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const DEFAULT_HISTORY: usize = 32;

#[derive(Debug, Clone)]
struct EdgeHistory {
    is_static: bool,
    samples: VecDeque<(Stamp, Isometry2<f64>)>,
}

impl EdgeHistory {
    /// Sample closest to `at`, if it lies within `window`
    fn sample_at(&self, at: Stamp, window: f64) -> std::result::Result<Isometry2<f64>, String> {
        if self.is_static {
            if let Some((_, iso)) = self.samples.back() {
                return Ok(*iso);
            }
        }
        let closest = self
            .samples
            .iter()
            .min_by(|a, b| (a.0 - at).abs().total_cmp(&(b.0 - at).abs()));
        match closest {
            Some((stamp, iso)) if (stamp - at).abs() <= window => Ok(*iso),
            Some((stamp, _)) => Err(format!(
                "closest sample at t={:.3} is outside the {:.3}s window around t={:.3}",
                stamp, window, at
            )),
            None => Err("no samples".to_string()),
        }
    }
}

/// A buffer of recent transforms between named frames
#[derive(Debug, Clone)]
pub struct TransformBuffer {
    edges: BTreeMap<(String, String), EdgeHistory>,
    history: usize,
}

impl Default for TransformBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Create an empty buffer keeping at most `history` samples per edge
    pub fn with_history(history: usize) -> Self {
        TransformBuffer {
            edges: BTreeMap::new(),
            history: history.max(1),
        }
    }

    /// Record the pose of `child` in `parent` at `stamp`
    pub fn set_transform(&mut self, parent: &str, child: &str, transform: Isometry2<f64>, stamp: Stamp) {
        let history = self.history;
        let edge = self
            .edges
            .entry((parent.to_string(), child.to_string()))
            .or_insert_with(|| EdgeHistory {
                is_static: false,
                samples: VecDeque::new(),
            });
        edge.is_static = false;

        // Keep samples ordered by stamp; late arrivals are rare but legal
        let pos = edge
            .samples
            .iter()
            .rposition(|(s, _)| *s <= stamp)
            .map(|i| i + 1)
            .unwrap_or(0);
        edge.samples.insert(pos, (stamp, transform));
        while edge.samples.len() > history {
            edge.samples.pop_front();
        }
    }

    /// Record a transform that is valid at any time
    pub fn set_static_transform(&mut self, parent: &str, child: &str, transform: Isometry2<f64>) {
        let mut samples = VecDeque::with_capacity(1);
        samples.push_back((0.0, transform));
        self.edges.insert(
            (parent.to_string(), child.to_string()),
            EdgeHistory {
                is_static: true,
                samples,
            },
        );
    }

    /// Whether any edge mentions `frame`
    pub fn knows_frame(&self, frame: &str) -> bool {
        self.edges.keys().any(|(p, c)| p == frame || c == frame)
    }

    /// Stamp of the newest sample on the `parent -> child` edge
    pub fn latest_stamp(&self, parent: &str, child: &str) -> Option<Stamp> {
        self.edges
            .get(&(parent.to_string(), child.to_string()))
            .and_then(|e| e.samples.back().map(|(s, _)| *s))
    }

    /// Pose of `source` expressed in `target` at time `at`
    ///
    /// The result maps points from the source frame into the target frame.
    pub fn lookup(&self, target: &str, source: &str, at: Stamp, window: f64) -> Result<Isometry2<f64>> {
        let unavailable = |reason: String| NavError::TransformUnavailable {
            target: target.to_string(),
            source_frame: source.to_string(),
            reason,
        };

        if target == source {
            return Ok(Isometry2::identity());
        }
        for frame in [target, source] {
            if !self.knows_frame(frame) {
                return Err(unavailable(format!("frame '{}' is unknown", frame)));
            }
        }

        let path = self
            .frame_path(target, source)
            .ok_or_else(|| unavailable("frames are not connected".to_string()))?;

        let mut result = Isometry2::identity();
        for pair in path.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);
            let step = if let Some(edge) = self.edges.get(&(from.clone(), to.clone())) {
                edge.sample_at(at, window)
            } else if let Some(edge) = self.edges.get(&(to.clone(), from.clone())) {
                edge.sample_at(at, window).map(|iso| iso.inverse())
            } else {
                Err("missing edge".to_string())
            };
            let step = step.map_err(|reason| unavailable(format!("{} -> {}: {}", from, to, reason)))?;
            result *= step;
        }
        Ok(result)
    }

    fn frame_path(&self, start: &str, goal: &str) -> Option<Vec<String>> {
        let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (parent, child) in self.edges.keys() {
            adjacency.entry(parent.as_str()).or_default().insert(child.as_str());
            adjacency.entry(child.as_str()).or_default().insert(parent.as_str());
        }

        let mut previous: BTreeMap<&str, &str> = BTreeMap::new();
        let mut queue = VecDeque::from([start]);
        let mut visited = BTreeSet::from([start]);

        while let Some(frame) = queue.pop_front() {
            if frame == goal {
                let mut path = vec![goal.to_string()];
                let mut cursor = goal;
                while let Some(&prev) = previous.get(cursor) {
                    path.push(prev.to_string());
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for &next in adjacency.get(frame).into_iter().flatten() {
                if visited.insert(next) {
                    previous.insert(next, frame);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point2, Vector2};
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_identity_lookup() {
        let buffer = TransformBuffer::new();
        let iso = buffer.lookup("map", "map", 0.0, 0.1).unwrap();
        assert_eq!(iso, Isometry2::identity());
    }

    #[test]
    fn test_chain_lookup() {
        let mut buffer = TransformBuffer::new();
        buffer.set_transform("map", "odom", Isometry2::new(Vector2::new(1.0, 0.0), 0.0), 1.0);
        buffer.set_transform("odom", "base_link", Isometry2::new(Vector2::new(0.0, 2.0), FRAC_PI_2), 1.0);

        let iso = buffer.lookup("map", "base_link", 1.0, 0.1).unwrap();
        let p = iso * Point2::new(1.0, 0.0);
        assert!((p.x - 1.0).abs() < 1e-9);
        assert!((p.y - 3.0).abs() < 1e-9);

        // Inverse direction walks the same edges backwards
        let inv = buffer.lookup("base_link", "map", 1.0, 0.1).unwrap();
        let q = inv * p;
        assert!((q.x - 1.0).abs() < 1e-9);
        assert!(q.y.abs() < 1e-9);
    }

    #[test]
    fn test_stale_transform_is_unavailable() {
        let mut buffer = TransformBuffer::new();
        buffer.set_transform("map", "base_link", Isometry2::identity(), 1.0);
        let err = buffer.lookup("map", "base_link", 2.0, 0.5).unwrap_err();
        assert!(matches!(err, NavError::TransformUnavailable { .. }));
        assert!(buffer.lookup("map", "base_link", 1.4, 0.5).is_ok());
    }

    #[test]
    fn test_unknown_and_disconnected_frames() {
        let mut buffer = TransformBuffer::new();
        buffer.set_transform("map", "base_link", Isometry2::identity(), 0.0);
        buffer.set_transform("world", "laser", Isometry2::identity(), 0.0);
        assert!(buffer.lookup("map", "camera", 0.0, 1.0).is_err());
        assert!(buffer.lookup("map", "laser", 0.0, 1.0).is_err());
    }

    #[test]
    fn test_static_transform_ignores_time() {
        let mut buffer = TransformBuffer::new();
        buffer.set_static_transform("base_link", "laser", Isometry2::new(Vector2::new(0.2, 0.0), 0.0));
        assert!(buffer.lookup("base_link", "laser", 1000.0, 0.01).is_ok());
    }

    #[test]
    fn test_history_is_bounded_and_ordered() {
        let mut buffer = TransformBuffer::with_history(3);
        for i in 0..5 {
            buffer.set_transform("map", "base_link", Isometry2::identity(), i as f64);
        }
        buffer.set_transform("map", "base_link", Isometry2::identity(), 2.5);
        assert_eq!(buffer.latest_stamp("map", "base_link"), Some(4.0));
        assert!(buffer.lookup("map", "base_link", 0.0, 0.5).is_err());
    }
}
