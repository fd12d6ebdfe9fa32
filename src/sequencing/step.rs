#[cfg(feature = "rtrb")]
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::notes::{C2, C6};
use crate::engine::scheduler::Scheduler;
use crate::synth::NoteHandler;

/*
Step Sequencer
==============

Eight steps played as eighth notes, looping:

  step duration = 60 / bpm / 2        (0.25 s at 120 BPM)

Look-ahead scheduling
---------------------

The sequencer is driven by a coarse timer: a tick every 25 ms. A tick never
plays anything itself. It looks 100 ms ahead and commits every step whose
start time falls inside that window, scheduling the step's note-on at its
exact start time and its note-off at 80% of a step later.

  clock ──┬────────┬────────┬────────┬──→
        tick     tick     tick     tick        every 25 ms
          |<── look-ahead 100 ms ──>|
                  ▲ step committed here, sounds at its own time

A late tick therefore doesn't make a step late, only the commit.

Monophonic playback
-------------------

Before a step's note-on fires, whatever note the sequencer is still holding
is released. A step with velocity 0 is a rest: it releases the held note and
plays nothing.

Every committed step gets a commit id. The note-off carries it and only
fires if the held note still belongs to that commit, so a note-off never
cuts short a later step that happens to use the same pitch.
*/

pub const STEP_COUNT: usize = 8;
pub const MIN_BPM: f32 = 60.0;
pub const MAX_BPM: f32 = 240.0;
pub const DEFAULT_BPM: f32 = 120.0;

/// How far ahead each tick commits steps, seconds
pub const LOOKAHEAD: f64 = 0.1;
/// Timer period, seconds
pub const TICK_INTERVAL: f64 = 0.025;
/// Delay between `start` and the first step, seconds
pub const START_DELAY: f64 = 0.05;
/// Fraction of a step the note is held for
pub const GATE: f64 = 0.8;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerStep {
    pub note: u8,
    /// 0 is a rest
    pub velocity: u8,
}

impl SequencerStep {
    pub fn new(note: u8, velocity: u8) -> Self {
        Self {
            note: note.clamp(C2, C6),
            velocity: velocity.min(127),
        }
    }

    pub fn is_rest(&self) -> bool {
        self.velocity == 0
    }
}

/// C major from C4.
pub fn default_steps() -> [SequencerStep; STEP_COUNT] {
    [60, 62, 64, 65, 67, 69, 71, 72].map(|note| SequencerStep::new(note, 100))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepChange {
    /// The step at this index just sounded (or rested)
    Step(usize),
    Stopped,
}

/// Receives step-change notifications, on the audio thread.
pub trait StepListener {
    fn notify(&mut self, change: StepChange);
}

impl<F> StepListener for F
where
    F: FnMut(StepChange) + Send,
{
    fn notify(&mut self, change: StepChange) {
        self(change)
    }
}

/// Step changes pushed into a ring for another thread. A full ring drops the
/// notification and bumps a shared counter the reader can check.
#[cfg(feature = "rtrb")]
pub struct StepRing {
    producer: rtrb::Producer<StepChange>,
    dropped: Arc<AtomicUsize>,
}

#[cfg(feature = "rtrb")]
impl StepRing {
    pub fn new(producer: rtrb::Producer<StepChange>) -> Self {
        Self {
            producer,
            dropped: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle to the count of dropped notifications.
    pub fn dropped(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.dropped)
    }
}

#[cfg(feature = "rtrb")]
impl StepListener for StepRing {
    fn notify(&mut self, change: StepChange) {
        if self.producer.push(change).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SequencerAction {
    Tick,
    NoteOn {
        step: usize,
        note: u8,
        velocity: u8,
        commit: u64,
    },
    NoteOff {
        note: u8,
        commit: u64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldNote {
    note: u8,
    commit: u64,
}

pub struct StepSequencer {
    steps: [SequencerStep; STEP_COUNT],
    position: usize,
    bpm: f32,
    playing: bool,
    next_step_time: f64,
    queue: Scheduler<SequencerAction>,
    held: Option<HeldNote>,
    next_commit: u64,
    listeners: Vec<Box<dyn StepListener + Send>>,
}

impl StepSequencer {
    pub fn new() -> Self {
        Self::with_steps(default_steps(), DEFAULT_BPM)
    }

    pub fn with_steps(steps: [SequencerStep; STEP_COUNT], bpm: f32) -> Self {
        Self {
            steps: steps.map(|s| SequencerStep::new(s.note, s.velocity)),
            position: 0,
            bpm: clamp_bpm(bpm),
            playing: false,
            next_step_time: 0.0,
            queue: Scheduler::with_capacity(16),
            held: None,
            next_commit: 0,
            listeners: Vec::new(),
        }
    }

    pub fn add_listener(&mut self, listener: impl StepListener + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Tempo changes apply from the next committed step.
    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = clamp_bpm(bpm);
    }

    pub fn step_duration(&self) -> f64 {
        60.0 / self.bpm as f64 / 2.0
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Index of the next step to be committed.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn steps(&self) -> &[SequencerStep; STEP_COUNT] {
        &self.steps
    }

    /// Replace one step. Out-of-range indices are ignored.
    pub fn set_step(&mut self, index: usize, step: SequencerStep) {
        if let Some(slot) = self.steps.get_mut(index) {
            *slot = SequencerStep::new(step.note, step.velocity);
        }
    }

    pub fn start(&mut self, now: f64) {
        if self.playing {
            return;
        }
        self.playing = true;
        self.position = 0;
        self.next_step_time = now + START_DELAY;
        self.held = None;
        self.queue.clear();
        self.queue.schedule(now, SequencerAction::Tick);
        debug!(target: "nightdrive::sequencer", "start at {now:.3}s, {} BPM", self.bpm);
    }

    /// Stop playback: drop every armed action and release the held note.
    pub fn stop(&mut self, now: f64, notes: &mut impl NoteHandler) {
        if !self.playing {
            return;
        }
        self.playing = false;
        self.queue.clear();
        if let Some(held) = self.held.take() {
            notes.note_off(held.note, now);
        }
        self.notify(StepChange::Stopped);
        debug!(target: "nightdrive::sequencer", "stop at {now:.3}s");
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.queue.next_deadline()
    }

    /// Run every action due at or before `now`.
    pub fn poll(&mut self, now: f64, notes: &mut impl NoteHandler) {
        while let Some((deadline, action)) = self.queue.pop_due(now) {
            match action {
                SequencerAction::Tick => {
                    self.commit_ahead(now);
                    self.queue
                        .schedule(deadline + TICK_INTERVAL, SequencerAction::Tick);
                }
                SequencerAction::NoteOn {
                    step,
                    note,
                    velocity,
                    commit,
                } => {
                    if let Some(held) = self.held.take() {
                        notes.note_off(held.note, now);
                    }
                    if velocity > 0 {
                        notes.note_on(note, velocity, now);
                        self.held = Some(HeldNote { note, commit });
                    }
                    self.notify(StepChange::Step(step));
                }
                SequencerAction::NoteOff { note, commit } => {
                    if self.held == Some(HeldNote { note, commit }) {
                        notes.note_off(note, now);
                        self.held = None;
                    }
                }
            }
        }
    }

    fn commit_ahead(&mut self, now: f64) {
        while self.next_step_time < now + LOOKAHEAD {
            let index = self.position;
            let step = self.steps[index];
            let at = self.next_step_time;
            let duration = self.step_duration();
            let commit = self.next_commit;
            self.next_commit += 1;

            self.queue.schedule(
                at,
                SequencerAction::NoteOn {
                    step: index,
                    note: step.note,
                    velocity: step.velocity,
                    commit,
                },
            );
            if !step.is_rest() {
                self.queue.schedule(
                    at + duration * GATE,
                    SequencerAction::NoteOff {
                        note: step.note,
                        commit,
                    },
                );
            }
            trace!(target: "nightdrive::sequencer", "step {index} committed for {at:.3}s");

            self.next_step_time += duration;
            self.position = (self.position + 1) % STEP_COUNT;
        }
    }

    fn notify(&mut self, change: StepChange) {
        for listener in &mut self.listeners {
            listener.notify(change);
        }
    }
}

impl Default for StepSequencer {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_bpm(bpm: f32) -> f32 {
    if bpm.is_nan() {
        DEFAULT_BPM
    } else {
        bpm.clamp(MIN_BPM, MAX_BPM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Played {
        On(u8, u8, f64),
        Off(u8, f64),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Played>,
    }

    impl NoteHandler for Recorder {
        fn note_on(&mut self, note: u8, velocity: u8, now: f64) {
            self.events.push(Played::On(note, velocity, now));
        }

        fn note_off(&mut self, note: u8, now: f64) {
            self.events.push(Played::Off(note, now));
        }
    }

    impl Recorder {
        fn note_on_times(&self) -> Vec<f64> {
            self.events
                .iter()
                .filter_map(|e| match e {
                    Played::On(_, _, t) => Some(*t),
                    _ => None,
                })
                .collect()
        }
    }

    /// Drive the sequencer deadline by deadline, the way the engine does.
    fn run_until(seq: &mut StepSequencer, notes: &mut Recorder, end: f64) {
        while let Some(deadline) = seq.next_deadline() {
            if deadline > end {
                break;
            }
            seq.poll(deadline, notes);
        }
    }

    #[test]
    fn test_default_pattern_is_c_major() {
        let seq = StepSequencer::new();
        let notes: Vec<u8> = seq.steps().iter().map(|s| s.note).collect();
        assert_eq!(notes, vec![60, 62, 64, 65, 67, 69, 71, 72]);
        assert!(seq.steps().iter().all(|s| s.velocity == 100));
        assert_eq!(seq.bpm(), 120.0);
    }

    #[test]
    fn test_note_ons_are_a_step_apart_at_120_bpm() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(1.0);
        run_until(&mut seq, &mut notes, 3.0);

        let times = notes.note_on_times();
        assert!(times.len() >= 8);
        assert!((times[0] - 1.05).abs() < 1e-9);
        for pair in times.windows(2) {
            assert!((pair[1] - pair[0] - 0.25).abs() < 1e-9, "{pair:?}");
        }
    }

    #[test]
    fn test_gate_is_eighty_percent_of_step() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 0.3);

        assert_eq!(notes.events[0], Played::On(60, 100, 0.05));
        match notes.events[1] {
            Played::Off(60, t) => assert!((t - 0.25).abs() < 1e-9),
            other => panic!("expected note-off, got {other:?}"),
        }
    }

    #[test]
    fn test_pattern_wraps_after_eight_steps() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 2.2);

        let played: Vec<u8> = notes
            .events
            .iter()
            .filter_map(|e| match e {
                Played::On(n, _, _) => Some(*n),
                _ => None,
            })
            .collect();
        assert_eq!(&played[..9], &[60, 62, 64, 65, 67, 69, 71, 72, 60]);
    }

    #[test]
    fn test_rest_releases_previous_and_plays_nothing() {
        let mut seq = StepSequencer::new();
        seq.set_step(1, SequencerStep::new(62, 0));
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 0.6);

        let ons: Vec<_> = notes
            .events
            .iter()
            .filter(|e| matches!(e, Played::On(..)))
            .collect();
        assert_eq!(ons.len(), 2);
        assert!(!notes.events.iter().any(|e| matches!(e, Played::On(62, ..))));
    }

    #[test]
    fn test_stale_note_off_is_ignored() {
        // Same pitch on every step at top speed
        let mut seq = StepSequencer::with_steps([SequencerStep::new(60, 100); STEP_COUNT], 240.0);
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 1.0);

        // Every note-on is followed by exactly one note-off for it
        let mut held = 0i32;
        for event in &notes.events {
            match event {
                Played::On(..) => held += 1,
                Played::Off(..) => held -= 1,
            }
            assert!((0..=1).contains(&held), "unbalanced at {event:?}");
        }
    }

    #[test]
    fn test_note_off_after_newer_step_does_not_cut_it() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(0.0);
        // Step 0 sounds at 0.05
        run_until(&mut seq, &mut notes, 0.06);
        assert_eq!(notes.events.len(), 1);

        // Fire step 0's note-off while pretending a new commit holds 60
        seq.held = Some(HeldNote {
            note: 60,
            commit: 99,
        });
        run_until(&mut seq, &mut notes, 0.26);
        assert_eq!(notes.events.len(), 1, "{:?}", notes.events);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 0.1);
        seq.start(0.1);
        assert_eq!(seq.position(), 1);
    }

    #[test]
    fn test_stop_releases_and_notifies() {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&changes);

        let mut seq = StepSequencer::new();
        seq.add_listener(move |change: StepChange| sink.lock().unwrap().push(change));
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 0.1);
        seq.stop(0.1, &mut notes);

        assert_eq!(notes.events.last(), Some(&Played::Off(60, 0.1)));
        assert_eq!(seq.next_deadline(), None);
        assert!(!seq.is_playing());
        assert_eq!(
            *changes.lock().unwrap(),
            vec![StepChange::Step(0), StepChange::Stopped]
        );

        // Nothing armed survives the stop
        run_until(&mut seq, &mut notes, 5.0);
        assert_eq!(notes.events.len(), 2);
    }

    #[test]
    fn test_restart_begins_at_step_zero() {
        let mut seq = StepSequencer::new();
        let mut notes = Recorder::default();
        seq.start(0.0);
        run_until(&mut seq, &mut notes, 1.0);
        seq.stop(1.0, &mut notes);

        notes.events.clear();
        seq.start(2.0);
        run_until(&mut seq, &mut notes, 2.1);
        assert!(
            matches!(notes.events[0], Played::On(60, 100, t) if (t - 2.05).abs() < 1e-9),
            "{:?}",
            notes.events[0]
        );
    }

    #[test]
    fn test_bpm_is_clamped() {
        let mut seq = StepSequencer::new();
        seq.set_bpm(10.0);
        assert_eq!(seq.bpm(), 60.0);
        seq.set_bpm(1_000.0);
        assert_eq!(seq.bpm(), 240.0);
        assert!((seq.step_duration() - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_set_step_clamps() {
        let mut seq = StepSequencer::new();
        seq.set_step(3, SequencerStep { note: 10, velocity: 200 });
        seq.set_step(42, SequencerStep::new(60, 100));
        assert_eq!(seq.steps()[3], SequencerStep { note: 36, velocity: 127 });
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn test_full_step_ring_counts_drops() {
        let (producer, mut consumer) = rtrb::RingBuffer::<StepChange>::new(1);
        let mut ring = StepRing::new(producer);
        let dropped = ring.dropped();

        ring.notify(StepChange::Step(0));
        ring.notify(StepChange::Step(1));
        ring.notify(StepChange::Stopped);

        assert_eq!(dropped.load(Ordering::Relaxed), 2);
        assert_eq!(consumer.pop().ok(), Some(StepChange::Step(0)));
        assert!(consumer.pop().is_err());
    }
}
