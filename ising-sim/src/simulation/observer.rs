use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use crate::geometry::Lattice;
use crate::observables::magnetization;

/// Collaborator notified once per completed sweep and on (re)initialization.
///
/// For each publication the controller calls `on_lattice_updated` and then
/// `on_observable` with the same step, before any further mutation. A step of 0
/// marks a fresh lattice; series collaborators should start over.
pub trait Observer {
    fn on_lattice_updated(&mut self, _step: u64, _lattice: &Lattice) {}
    fn on_observable(&mut self, _step: u64, _magnetization: f64) {}
}

/// Owned snapshot of one publication, for collaborators on other threads.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub step: u64,
    pub lattice: Lattice,
    pub magnetization: f64,
}

impl Observer for Sender<Frame> {
    fn on_lattice_updated(&mut self, step: u64, lattice: &Lattice) {
        let frame = Frame {
            step,
            lattice: lattice.clone(),
            magnetization: magnetization(lattice),
        };
        if self.send(frame).is_err() {
            log::debug!("frame receiver dropped, skipping step {step}");
        }
    }
}

impl<O: Observer + ?Sized> Observer for Arc<Mutex<O>> {
    fn on_lattice_updated(&mut self, step: u64, lattice: &Lattice) {
        let mut inner = self.lock().unwrap_or_else(|e| e.into_inner());
        inner.on_lattice_updated(step, lattice);
    }

    fn on_observable(&mut self, step: u64, magnetization: f64) {
        let mut inner = self.lock().unwrap_or_else(|e| e.into_inner());
        inner.on_observable(step, magnetization);
    }
}

/// Magnetization time series, restarted whenever step 0 is published.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MagnetizationSeries {
    points: Vec<(u64, f64)>,
}

impl MagnetizationSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(u64, f64)] {
        &self.points
    }

    pub fn latest(&self) -> Option<(u64, f64)> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Mean of the recorded values, skipping the first `skip` points.
    pub fn mean(&self, skip: usize) -> Option<f64> {
        let tail = self.points.get(skip..)?;
        if tail.is_empty() {
            return None;
        }
        Some(tail.iter().map(|&(_, m)| m).sum::<f64>() / tail.len() as f64)
    }
}

impl Observer for MagnetizationSeries {
    fn on_observable(&mut self, step: u64, magnetization: f64) {
        if step == 0 {
            self.points.clear();
        }
        self.points.push((step, magnetization));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_series_restarts_at_step_zero() {
        let mut series = MagnetizationSeries::new();
        series.on_observable(0, 0.1);
        series.on_observable(1, 0.2);
        series.on_observable(2, 0.4);
        assert_eq!(series.len(), 3);
        assert_eq!(series.latest(), Some((2, 0.4)));
        approx::assert_abs_diff_eq!(series.mean(1).unwrap(), 0.3, epsilon = 1e-12);

        series.on_observable(0, -0.5);
        assert_eq!(series.points(), &[(0, -0.5)]);
        assert_eq!(series.mean(5), None);
    }

    #[test]
    fn test_sender_emits_consistent_frames() {
        let (mut tx, rx) = channel::<Frame>();
        let lat = Lattice::from_spins(2, vec![1, 1, 1, -1]).unwrap();
        tx.on_lattice_updated(7, &lat);
        tx.on_observable(7, 0.5);

        let frame = rx.try_recv().unwrap();
        assert_eq!(frame.step, 7);
        assert_eq!(frame.lattice, lat);
        assert_eq!(frame.magnetization, 0.5);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sender_tolerates_dropped_receiver() {
        let (mut tx, rx) = channel::<Frame>();
        drop(rx);
        tx.on_lattice_updated(1, &Lattice::uniform(2, 1).unwrap());
    }

    #[test]
    fn test_shared_observer() {
        let shared = Arc::new(Mutex::new(MagnetizationSeries::new()));
        let mut handle = Arc::clone(&shared);
        handle.on_observable(0, 1.0);
        handle.on_observable(1, 0.5);
        assert_eq!(shared.lock().unwrap().len(), 2);
    }
}
