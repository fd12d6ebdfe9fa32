//! Scheduled parameter trajectories.

/*
Parameter Automation
====================

Every continuous value in the engine (envelope gains, filter cutoffs, effect
mixes, master volume) is an `AutomatedParam`. Nothing writes a raw number into
the signal path: a knob turn becomes a short trajectory, so the signal never
jumps between two samples.

Vocabulary
----------

  anchor      The (time, value) pair where the current segment begins. Every
              consumed event moves the anchor forward.

  event       A scheduled change: an instant set, the end point of a linear
              ramp, or the start of an exponential approach.

  segment     What happens between the anchor and the next event: hold the
              anchor value, or approach a target exponentially.


The Three Moves
---------------

  set_immediate   value jumps now, all scheduling dropped

  approach        v(t) = target + (v0 - target) * e^(-(t - t0) / tau)

                  Value
                    v0 ┐╲
                       │ ╲__
                       │    ‾‾‾──────  target
                       └────────────→ Time
                       t0  tau  ...

                  After one time constant the value has covered ~63% of the
                  distance, after five it is within 1%.

  ramp_linear     straight line from the current value to the target over a
                  fixed duration

The last two first "cancel and hold": the value the parameter has at the
call time is frozen as the new anchor and every pending event is dropped.
This is what makes a second knob turn mid-ramp continue smoothly from where
the first one got to.


Evaluation
----------

`value_at(t)` is called once per sample with increasing `t`. Events whose time
has been reached are folded into the anchor; the remaining front event decides
the shape up to its deadline. Work per sample is O(1) amortised.
*/

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    Set(f32),
    Linear(f32),
    Target { value: f32, time_constant: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ParamEvent {
    time: f64,
    kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Segment {
    Hold,
    Approach { target: f32, time_constant: f64 },
}

/// A continuous parameter with a schedule of future values.
#[derive(Debug, Clone)]
pub struct AutomatedParam {
    anchor_time: f64,
    anchor_value: f32,
    segment: Segment,
    events: VecDeque<ParamEvent>,
    current: f32,
}

impl AutomatedParam {
    pub fn new(value: f32) -> Self {
        Self {
            anchor_time: f64::NEG_INFINITY,
            anchor_value: value,
            segment: Segment::Hold,
            events: VecDeque::with_capacity(8),
            current: value,
        }
    }

    /// Jump to `value` with no transition, dropping everything scheduled.
    pub fn set_immediate(&mut self, value: f32) {
        self.events.clear();
        self.anchor_value = value;
        self.segment = Segment::Hold;
        self.current = value;
    }

    /// Exponentially approach `value` starting at `now`.
    pub fn approach(&mut self, value: f32, time_constant: f64, now: f64) {
        self.cancel_and_hold(now);
        self.set_target_at(value, now, time_constant);
    }

    /// Ramp linearly from the value at `now` to `value` over `duration` seconds.
    pub fn ramp_linear(&mut self, value: f32, duration: f64, now: f64) {
        self.cancel_and_hold(now);
        self.linear_ramp_to(value, now + duration.max(0.0));
    }

    /// Freeze the trajectory at `time` and drop every later event.
    pub fn cancel_and_hold(&mut self, time: f64) {
        let held = self.value_at(time);
        self.events.clear();
        self.anchor_time = time;
        self.anchor_value = held;
        self.segment = Segment::Hold;
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent {
            time,
            kind: EventKind::Set(value),
        });
    }

    /// Schedule a linear ramp that arrives at `value` at `end_time`. The ramp
    /// starts from whichever event precedes it.
    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(ParamEvent {
            time: end_time,
            kind: EventKind::Linear(value),
        });
    }

    pub fn set_target_at(&mut self, value: f32, start_time: f64, time_constant: f64) {
        self.insert(ParamEvent {
            time: start_time,
            kind: EventKind::Target {
                value,
                time_constant,
            },
        });
    }

    /// Evaluate the trajectory at `time`. Calls must be made with
    /// non-decreasing times.
    pub fn value_at(&mut self, time: f64) -> f32 {
        while let Some(event) = self.events.front().copied() {
            if event.time > time {
                break;
            }
            self.events.pop_front();

            let value = match event.kind {
                EventKind::Set(value) | EventKind::Linear(value) => value,
                EventKind::Target { .. } => self.segment_value(event.time),
            };
            self.anchor_time = event.time;
            self.anchor_value = value;
            self.segment = match event.kind {
                EventKind::Target {
                    value,
                    time_constant,
                } => Segment::Approach {
                    target: value,
                    time_constant,
                },
                _ => Segment::Hold,
            };
        }

        self.current = match self.events.front() {
            Some(&ParamEvent {
                time: end,
                kind: EventKind::Linear(target),
            }) if self.anchor_time.is_finite() && end > self.anchor_time => {
                let progress = ((time - self.anchor_time) / (end - self.anchor_time)).clamp(0.0, 1.0);
                self.anchor_value + (target - self.anchor_value) * progress as f32
            }
            _ => self.segment_value(time),
        };

        self.current
    }

    /// The value produced by the most recent evaluation.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// True when nothing is scheduled and no approach is in flight.
    pub fn is_settled(&self) -> bool {
        self.events.is_empty() && self.segment == Segment::Hold
    }

    fn segment_value(&self, time: f64) -> f32 {
        match self.segment {
            Segment::Hold => self.anchor_value,
            Segment::Approach {
                target,
                time_constant,
            } => {
                if time_constant <= 0.0 {
                    return target;
                }
                let elapsed = (time - self.anchor_time).max(0.0);
                let decay = (-elapsed / time_constant).exp() as f32;
                target + (self.anchor_value - target) * decay
            }
        }
    }

    fn insert(&mut self, event: ParamEvent) {
        // Equal times keep registration order
        let index = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(index, event);
    }
}

impl Default for AutomatedParam {
    fn default() -> Self {
        Self::new(0.0)
    }
}
