use log::{debug, trace};

use super::params::{VoiceParams, VoiceParamsUpdate};
use super::voice::{Voice, VoiceState};
use super::NoteHandler;
use crate::engine::scheduler::{EventId, Scheduler};
use crate::io::converter::midi_to_freq;

/*
Voice allocation
================

A fixed pool of voices. A note-on picks its voice in strict priority:

  1. the voice already holding this note (active or releasing)
  2. any idle voice
  3. the releasing voice that was triggered longest ago
  4. the active voice that was triggered longest ago

Ties at every level go to the lowest pool index. Since a voice holding the
note is always preferred, no two voices can ever hold the same note.

Releases are cheap: the voice ramps down and hands back the time its
teardown is due. The allocator keeps those teardowns in its own scheduler and
runs them from `poll`. A retrigger cancels the voice's pending teardown, and
`Voice::complete_release` ignores stale ones anyway.
*/

pub struct VoiceAllocator {
    voices: Vec<Voice>,
    teardowns: Scheduler<usize>,
    pending: Vec<Option<EventId>>,
    params: VoiceParams,
}

impl VoiceAllocator {
    pub fn new(polyphony: usize, sample_rate: f32, params: &VoiceParams) -> Self {
        let polyphony = polyphony.max(1);
        Self {
            voices: (0..polyphony).map(|_| Voice::new(sample_rate, params)).collect(),
            teardowns: Scheduler::with_capacity(polyphony),
            pending: vec![None; polyphony],
            params: *params,
        }
    }

    pub fn note_on(&mut self, note: u8, velocity: u8, now: f64) {
        let note = note.min(127);
        let velocity = velocity.min(127);
        let index = self.allocate(note);

        if let Some(id) = self.pending[index].take() {
            self.teardowns.cancel(id);
        }

        let voice = &mut self.voices[index];
        if let Some(previous) = voice.note().filter(|&previous| previous != note) {
            debug!(
                target: "nightdrive::synth",
                "stealing voice {index} ({:?}, note {previous}) for note {note}",
                voice.state()
            );
        }
        voice.trigger(midi_to_freq(note), velocity, note, now);
    }

    /// Release the active voice holding `note`. Anything else is a no-op.
    pub fn note_off(&mut self, note: u8, now: f64) {
        let note = note.min(127);
        let Some(index) = self
            .voices
            .iter()
            .position(|v| v.note() == Some(note) && v.state() == VoiceState::Active)
        else {
            return;
        };
        self.release_voice(index, now);
    }

    pub fn all_notes_off(&mut self, now: f64) {
        for index in 0..self.voices.len() {
            if self.voices[index].state() == VoiceState::Active {
                self.release_voice(index, now);
            }
        }
    }

    /// Broadcast a partial parameter update to every voice.
    pub fn update_params(&mut self, update: &VoiceParamsUpdate, now: f64) {
        if update.is_empty() {
            return;
        }
        self.params.merge(update);
        for voice in &mut self.voices {
            voice.update_params(update, now);
        }
    }

    /// Run every teardown due at or before `now`.
    pub fn poll(&mut self, now: f64) {
        while let Some((_, index)) = self.teardowns.pop_due(now) {
            self.pending[index] = None;
            if self.voices[index].complete_release() {
                trace!(target: "nightdrive::synth", "voice {index} idle at {now:.3}s");
            }
        }
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.teardowns.next_deadline()
    }

    /// Sum every voice into `out`.
    pub fn render(&mut self, out: &mut [f32], now: f64) {
        for voice in &mut self.voices {
            voice.render(out, now);
        }
    }

    /// Tear down every voice. The allocator is useless afterwards.
    pub fn dispose(&mut self) {
        self.teardowns.clear();
        self.pending.fill(None);
        for voice in &mut self.voices {
            voice.dispose();
        }
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    pub fn polyphony(&self) -> usize {
        self.voices.len()
    }

    pub fn params(&self) -> &VoiceParams {
        &self.params
    }

    /// Voices currently sounding (active or releasing).
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|v| !v.is_idle()).count()
    }

    fn release_voice(&mut self, index: usize, now: f64) {
        if let Some(due) = self.voices[index].release(now) {
            if let Some(id) = self.pending[index].take() {
                self.teardowns.cancel(id);
            }
            self.pending[index] = Some(self.teardowns.schedule(due, index));
        }
    }

    fn allocate(&self, note: u8) -> usize {
        if let Some(index) = self.voices.iter().position(|v| v.note() == Some(note)) {
            return index;
        }
        if let Some(index) = self.voices.iter().position(Voice::is_idle) {
            return index;
        }
        if let Some(index) = self.oldest(VoiceState::Releasing) {
            return index;
        }
        self.oldest(VoiceState::Active).unwrap_or(0)
    }

    fn oldest(&self, state: VoiceState) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (index, voice) in self.voices.iter().enumerate() {
            if voice.state() != state {
                continue;
            }
            // Strictly earlier only, so ties stay at the lower index
            if best.map_or(true, |(_, at)| voice.triggered_at() < at) {
                best = Some((index, voice.triggered_at()));
            }
        }
        best.map(|(index, _)| index)
    }
}

impl NoteHandler for VoiceAllocator {
    fn note_on(&mut self, note: u8, velocity: u8, now: f64) {
        VoiceAllocator::note_on(self, note, velocity, now);
    }

    fn note_off(&mut self, note: u8, now: f64) {
        VoiceAllocator::note_off(self, note, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(polyphony: usize) -> VoiceAllocator {
        VoiceAllocator::new(polyphony, 48_000.0, &VoiceParams::default())
    }

    fn holders(allocator: &VoiceAllocator, note: u8) -> usize {
        allocator
            .voices()
            .iter()
            .filter(|v| v.note() == Some(note))
            .count()
    }

    fn index_of(allocator: &VoiceAllocator, note: u8) -> Option<usize> {
        allocator.voices().iter().position(|v| v.note() == Some(note))
    }

    #[test]
    fn test_note_walks_one_voice_through_lifecycle() {
        let mut alloc = allocator(4);
        alloc.note_on(60, 100, 0.0);
        assert_eq!(holders(&alloc, 60), 1);
        let index = index_of(&alloc, 60).unwrap();
        assert_eq!(alloc.voices()[index].state(), VoiceState::Active);

        alloc.note_off(60, 0.5);
        assert_eq!(alloc.voices()[index].state(), VoiceState::Releasing);

        // Release 0.3 s + 0.1 s grace
        alloc.poll(0.85);
        assert_eq!(alloc.voices()[index].state(), VoiceState::Releasing);
        alloc.poll(0.91);
        assert_eq!(alloc.voices()[index].state(), VoiceState::Idle);
        assert_eq!(alloc.active_count(), 0);
    }

    #[test]
    fn test_same_note_reuses_its_voice() {
        let mut alloc = allocator(4);
        alloc.note_on(60, 100, 0.0);
        alloc.note_off(60, 0.1);
        alloc.note_on(60, 100, 0.2);
        assert_eq!(holders(&alloc, 60), 1);
        assert_eq!(alloc.active_count(), 1);
    }

    #[test]
    fn test_retrigger_during_release_cancels_teardown() {
        let mut alloc = allocator(2);
        alloc.note_on(64, 100, 0.0);
        alloc.note_off(64, 0.1);
        alloc.note_on(64, 100, 0.2);

        alloc.poll(10.0);
        let index = index_of(&alloc, 64).unwrap();
        assert_eq!(alloc.voices()[index].state(), VoiceState::Active);
        assert_eq!(alloc.next_deadline(), None);
    }

    #[test]
    fn test_idle_voice_before_stealing() {
        let mut alloc = allocator(3);
        alloc.note_on(60, 100, 0.0);
        alloc.note_on(62, 100, 0.1);
        alloc.note_on(64, 100, 0.2);
        assert_eq!(alloc.active_count(), 3);
        assert_eq!(index_of(&alloc, 64), Some(2));
    }

    #[test]
    fn test_steals_oldest_releasing_before_active() {
        let mut alloc = allocator(3);
        alloc.note_on(60, 100, 0.0);
        alloc.note_on(62, 100, 0.1);
        alloc.note_on(64, 100, 0.2);
        alloc.note_off(64, 0.3);
        alloc.note_off(62, 0.35);

        // 62 was triggered earlier than 64, so it goes first
        alloc.note_on(67, 100, 0.4);
        assert_eq!(index_of(&alloc, 67), Some(1));
        assert_eq!(holders(&alloc, 62), 0);
        assert_eq!(holders(&alloc, 60), 1);
        assert_eq!(holders(&alloc, 64), 1);
    }

    #[test]
    fn test_steals_oldest_active_when_full() {
        let mut alloc = allocator(3);
        alloc.note_on(60, 100, 0.0);
        alloc.note_on(62, 100, 0.1);
        alloc.note_on(64, 100, 0.2);

        alloc.note_on(65, 100, 0.3);
        assert_eq!(index_of(&alloc, 65), Some(0));
        assert_eq!(holders(&alloc, 60), 0);
        assert_eq!(alloc.active_count(), 3);
    }

    #[test]
    fn test_steal_ties_go_to_lowest_index() {
        let mut alloc = allocator(2);
        alloc.note_on(60, 100, 0.0);
        alloc.note_on(62, 100, 0.0);
        alloc.note_on(64, 100, 0.0);
        assert_eq!(index_of(&alloc, 64), Some(0));
    }

    #[test]
    fn test_stolen_releasing_voice_keeps_no_teardown() {
        let mut alloc = allocator(1);
        alloc.note_on(60, 100, 0.0);
        alloc.note_off(60, 0.1);
        alloc.note_on(72, 100, 0.2);

        alloc.poll(5.0);
        assert_eq!(alloc.voices()[0].state(), VoiceState::Active);
        assert_eq!(alloc.voices()[0].note(), Some(72));
    }

    #[test]
    fn test_note_off_for_unknown_note_is_noop() {
        let mut alloc = allocator(2);
        alloc.note_on(60, 100, 0.0);
        alloc.note_off(61, 0.1);
        assert_eq!(alloc.voices()[0].state(), VoiceState::Active);
        assert_eq!(alloc.next_deadline(), None);
    }

    #[test]
    fn test_out_of_range_input_is_clamped() {
        let mut alloc = allocator(2);
        alloc.note_on(200, 255, 0.0);
        let voice = &alloc.voices()[0];
        assert_eq!(voice.note(), Some(127));
        assert_eq!(voice.velocity(), 127);
        assert!((voice.frequency() - midi_to_freq(127)).abs() < 1e-3);
    }

    #[test]
    fn test_all_notes_off_releases_everything() {
        let mut alloc = allocator(4);
        alloc.note_on(60, 100, 0.0);
        alloc.note_on(64, 100, 0.0);
        alloc.note_on(67, 100, 0.0);
        alloc.all_notes_off(0.5);

        assert!(alloc
            .voices()
            .iter()
            .all(|v| v.state() != VoiceState::Active));
        alloc.poll(1.0);
        assert_eq!(alloc.active_count(), 0);
    }

    #[test]
    fn test_empty_update_changes_nothing() {
        let mut alloc = allocator(2);
        alloc.note_on(60, 100, 0.0);
        alloc.update_params(&VoiceParamsUpdate::default(), 0.1);
        assert_eq!(*alloc.params(), VoiceParams::default());
        assert!(alloc.voices().iter().all(|v| v.params() == VoiceParams::default()));
    }
}
