//! Gapless playback of server-pushed PCM with barge-in support.
//!
//! The scheduler is owned by a single event loop; the cursor and the active
//! unit set are plain fields.

use anyhow::Result;
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::codec;
use super::output::{OutputDevice, UnitId};

/// Where and for how long a segment was scheduled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduledUnit {
    pub id: UnitId,
    /// Start time on the device clock, seconds
    pub start: f64,
    /// Duration in seconds
    pub duration: f64,
}

impl ScheduledUnit {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

pub struct PlaybackScheduler {
    output: Box<dyn OutputDevice>,
    sample_rate: u32,
    channels: u16,
    /// Time at which the next segment should begin
    cursor: f64,
    /// Scheduled units that have not finished yet
    active: BTreeSet<UnitId>,
    next_id: u64,
}

impl PlaybackScheduler {
    pub fn new(output: Box<dyn OutputDevice>, sample_rate: u32, channels: u16) -> Self {
        Self {
            output,
            sample_rate,
            channels,
            cursor: 0.0,
            active: BTreeSet::new(),
            next_id: 0,
        }
    }

    /// Decode a PCM segment and schedule it right after the previous one,
    /// or now if the device clock has already passed the cursor.
    pub fn enqueue(&mut self, pcm: &[u8]) -> Result<ScheduledUnit> {
        let audio = codec::decode(pcm, self.channels, self.sample_rate)?;

        let start = self.cursor.max(self.output.current_time());
        let id = UnitId(self.next_id);
        self.next_id += 1;

        self.output.play_at(id, &audio, start)?;

        let unit = ScheduledUnit {
            id,
            start,
            duration: audio.duration_secs(),
        };
        self.active.insert(id);
        self.cursor = unit.end();

        debug!(
            "Scheduled unit {} at {:.3}s (+{:.3}s), {} active",
            id.0,
            unit.start,
            unit.duration,
            self.active.len()
        );
        Ok(unit)
    }

    /// A unit played to completion
    pub fn on_finished(&mut self, id: UnitId) {
        self.active.remove(&id);
    }

    /// Barge-in: stop everything in flight and schedule the next segment
    /// relative to now.
    pub fn interrupt(&mut self) {
        let stopped = self.stop_all();
        info!("Playback interrupted, {} units stopped", stopped);
    }

    /// Stop all playback and release the output context
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop_all();
        self.output.close()
    }

    fn stop_all(&mut self) -> usize {
        let stopped = self.active.len();
        for id in std::mem::take(&mut self.active) {
            self.output.stop(id);
        }
        self.cursor = 0.0;
        stopped
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, id: UnitId) -> bool {
        self.active.contains(&id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::audio::codec::DecodedAudio;
    use std::sync::{Arc, Mutex};

    /// Output with a hand-driven clock that records what it was asked to do
    #[derive(Default)]
    pub(crate) struct ManualOutputState {
        pub now: f64,
        pub started: Vec<(UnitId, f64, f64)>,
        pub stopped: Vec<UnitId>,
        pub closed: bool,
    }

    pub(crate) struct ManualOutput(pub Arc<Mutex<ManualOutputState>>);

    impl OutputDevice for ManualOutput {
        fn current_time(&self) -> f64 {
            self.0.lock().unwrap().now
        }

        fn play_at(&mut self, id: UnitId, audio: &DecodedAudio, start_at: f64) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            if state.closed {
                anyhow::bail!("closed");
            }
            state.started.push((id, start_at, audio.duration_secs()));
            Ok(())
        }

        fn stop(&mut self, id: UnitId) {
            self.0.lock().unwrap().stopped.push(id);
        }

        fn close(&mut self) -> Result<()> {
            self.0.lock().unwrap().closed = true;
            Ok(())
        }

        fn name(&self) -> &str {
            "manual"
        }
    }

    fn scheduler() -> (PlaybackScheduler, Arc<Mutex<ManualOutputState>>) {
        let state = Arc::new(Mutex::new(ManualOutputState::default()));
        let output = ManualOutput(Arc::clone(&state));
        (PlaybackScheduler::new(Box::new(output), 24000, 1), state)
    }

    /// `frames` samples of silence as PCM bytes
    fn segment(frames: usize) -> Vec<u8> {
        vec![0u8; frames * 2]
    }

    #[test]
    fn test_consecutive_segments_are_gapless() {
        let (mut scheduler, _state) = scheduler();

        let durations = [2400, 4800, 1200, 24000];
        let units: Vec<ScheduledUnit> = durations
            .iter()
            .map(|&frames| scheduler.enqueue(&segment(frames)).unwrap())
            .collect();

        assert_eq!(units[0].start, 0.0);
        for pair in units.windows(2) {
            assert!((pair[1].start - pair[0].end()).abs() < 1e-12);
        }
        assert_eq!(scheduler.active_count(), 4);
    }

    #[test]
    fn test_start_never_in_the_past() {
        let (mut scheduler, state) = scheduler();

        let first = scheduler.enqueue(&segment(2400)).unwrap();
        assert_eq!(first.end(), 0.1);

        // The device clock ran past the cursor (underrun)
        state.lock().unwrap().now = 3.0;
        let second = scheduler.enqueue(&segment(2400)).unwrap();
        assert_eq!(second.start, 3.0);
        assert!((scheduler.cursor() - 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_finished_units_leave_active_set() {
        let (mut scheduler, _state) = scheduler();

        let a = scheduler.enqueue(&segment(100)).unwrap();
        let b = scheduler.enqueue(&segment(100)).unwrap();
        scheduler.on_finished(a.id);

        assert!(!scheduler.is_active(a.id));
        assert!(scheduler.is_active(b.id));
        assert_eq!(scheduler.active_count(), 1);
    }

    #[test]
    fn test_interrupt_stops_everything_and_resets_cursor() {
        let (mut scheduler, state) = scheduler();

        for _ in 0..3 {
            scheduler.enqueue(&segment(24000)).unwrap();
        }
        state.lock().unwrap().now = 0.5;

        scheduler.interrupt();

        assert_eq!(scheduler.active_count(), 0);
        assert_eq!(scheduler.cursor(), 0.0);
        assert_eq!(state.lock().unwrap().stopped.len(), 3);

        // Next segment starts now, not at the stale 3.0s cursor
        let next = scheduler.enqueue(&segment(2400)).unwrap();
        assert_eq!(next.start, 0.5);
    }

    #[test]
    fn test_shutdown_closes_output() {
        let (mut scheduler, state) = scheduler();
        scheduler.enqueue(&segment(2400)).unwrap();

        scheduler.shutdown().unwrap();

        let state = state.lock().unwrap();
        assert!(state.closed);
        assert_eq!(state.stopped.len(), 1);
        assert_eq!(scheduler.cursor(), 0.0);
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_malformed_segment_is_rejected_without_side_effects() {
        let (mut scheduler, state) = scheduler();

        assert!(scheduler.enqueue(&[1, 2, 3]).is_err());
        assert_eq!(scheduler.cursor(), 0.0);
        assert!(state.lock().unwrap().started.is_empty());
    }
}
