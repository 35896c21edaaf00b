//! Easing, arc interpolation and frame-driven animations.
//!
//! Nothing here owns a clock: the host passes a monotonic timestamp (milliseconds) on every
//! frame, and an animation's first frame fixes its start time.

use crate::geometry::ArcGeometry;
use crate::model::LayoutArc;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MS: f64 = 320.0;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    Linear,
    CubicIn,
    CubicOut,
    #[default]
    CubicInOut,
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

impl PartialEq for Easing {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Easing {
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Linear => t,
            Self::CubicIn => t * t * t,
            Self::CubicOut => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::CubicInOut => {
                let t = t * 2.0;
                if t <= 1.0 {
                    t * t * t / 2.0
                } else {
                    let u = t - 2.0;
                    (u * u * u + 2.0) / 2.0
                }
            }
            Self::Custom(f) => f(t),
        }
    }
}

/// Resolved timing for one animated update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Milliseconds.
    pub duration: f64,
    /// Milliseconds.
    pub delay: f64,
    pub easing: Easing,
}

impl Default for Transition {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MS,
            delay: 0.0,
            easing: Easing::CubicInOut,
        }
    }
}

impl Transition {
    pub fn is_instant(&self) -> bool {
        self.duration <= 0.0 && self.delay <= 0.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<Easing>,
}

/// `true`/`false` or a partial [`TransitionOptions`] object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionInput {
    Enabled(bool),
    Custom(TransitionOptions),
}

/// `None` means "apply updates immediately".
pub fn resolve_transition(input: Option<&TransitionInput>) -> Option<Transition> {
    let resolved = match input? {
        TransitionInput::Enabled(false) => return None,
        TransitionInput::Enabled(true) => Transition::default(),
        TransitionInput::Custom(opts) => {
            let defaults = Transition::default();
            Transition {
                duration: opts
                    .duration
                    .filter(|d| d.is_finite())
                    .unwrap_or(defaults.duration),
                delay: opts.delay.filter(|d| d.is_finite()).unwrap_or(defaults.delay),
                easing: opts.easing.unwrap_or(defaults.easing),
            }
        }
    };
    if resolved.is_instant() {
        return None;
    }
    Some(resolved)
}

/// Blends the geometry of two arcs; identity (key, node, path, value) always comes from `to`.
pub fn interpolate_arc(from: &LayoutArc, to: &LayoutArc, t: f64) -> LayoutArc {
    if t >= 1.0 {
        return to.clone();
    }
    to.with_geometry(interpolate_geometry(&from.geometry(), &to.geometry(), t))
}

pub fn interpolate_geometry(from: &ArcGeometry, to: &ArcGeometry, t: f64) -> ArcGeometry {
    if t <= 0.0 {
        *from
    } else if t >= 1.0 {
        *to
    } else {
        from.lerp(to, t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    /// Created, no frame seen yet.
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl AnimationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// Progress reported for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    /// Eased progress in `[0, 1]` for the standard easings.
    pub progress: f64,
    pub finished: bool,
}

/// Frame-driven animation clock without side effects.
#[derive(Debug, Clone)]
pub struct Animation {
    transition: Transition,
    started_at: Option<f64>,
    status: AnimationStatus,
}

impl Animation {
    pub fn new(transition: Transition) -> Self {
        Self {
            transition,
            started_at: None,
            status: AnimationStatus::Idle,
        }
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn status(&self) -> AnimationStatus {
        self.status
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Samples the animation at `now`. Returns `None` once the animation is terminal.
    pub fn advance(&mut self, now: f64) -> Option<Step> {
        if self.status.is_terminal() {
            return None;
        }
        let started_at = *self.started_at.get_or_insert(now);
        self.status = AnimationStatus::Running;

        let elapsed = now - started_at - self.transition.delay.max(0.0);
        if elapsed < 0.0 {
            return Some(Step {
                progress: 0.0,
                finished: false,
            });
        }
        let raw = if self.transition.duration <= 0.0 {
            1.0
        } else {
            (elapsed / self.transition.duration).min(1.0)
        };
        let finished = raw >= 1.0;
        if finished {
            self.status = AnimationStatus::Completed;
        }
        Some(Step {
            progress: self.transition.easing.apply(raw),
            finished,
        })
    }

    /// Marks the animation cancelled. Returns `true` only for the call that actually cancelled it.
    pub fn cancel(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = AnimationStatus::Cancelled;
        true
    }

    /// Marks the animation completed without sampling it.
    pub fn complete(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = AnimationStatus::Completed;
        true
    }
}

/// An [`Animation`] bound to callbacks.
///
/// Exactly one of `on_complete` / `on_cancel` ever runs.
pub struct RunningAnimation<'cb> {
    animation: Animation,
    on_update: Box<dyn FnMut(f64) + 'cb>,
    on_complete: Option<Box<dyn FnOnce() + 'cb>>,
    on_cancel: Option<Box<dyn FnOnce() + 'cb>>,
}

impl std::fmt::Debug for RunningAnimation<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningAnimation")
            .field("animation", &self.animation)
            .finish_non_exhaustive()
    }
}

/// Starts an animation. Instant transitions (no duration, no delay) call `on_update(1.0)` and
/// `on_complete()` before returning; otherwise the host drives it with
/// [`RunningAnimation::frame`].
pub fn run_animation<'cb>(
    transition: Transition,
    on_update: impl FnMut(f64) + 'cb,
    on_complete: impl FnOnce() + 'cb,
    on_cancel: impl FnOnce() + 'cb,
) -> RunningAnimation<'cb> {
    let mut running = RunningAnimation {
        animation: Animation::new(transition),
        on_update: Box::new(on_update),
        on_complete: Some(Box::new(on_complete)),
        on_cancel: Some(Box::new(on_cancel)),
    };
    if transition.is_instant() {
        (running.on_update)(1.0);
        running.animation.complete();
        running.on_cancel = None;
        if let Some(done) = running.on_complete.take() {
            done();
        }
    }
    running
}

impl RunningAnimation<'_> {
    pub fn status(&self) -> AnimationStatus {
        self.animation.status()
    }

    pub fn is_finished(&self) -> bool {
        self.animation.is_terminal()
    }

    /// Drives one frame. Returns `true` while more frames are wanted.
    pub fn frame(&mut self, now: f64) -> bool {
        let Some(step) = self.animation.advance(now) else {
            return false;
        };
        (self.on_update)(step.progress);
        if step.finished {
            self.on_cancel = None;
            if let Some(done) = self.on_complete.take() {
                done();
            }
            return false;
        }
        true
    }

    /// Stops future frames and runs `on_cancel` synchronously, at most once.
    pub fn cancel(&mut self) -> bool {
        if !self.animation.cancel() {
            return false;
        }
        self.on_complete = None;
        if let Some(cancelled) = self.on_cancel.take() {
            cancelled();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::{Cell, RefCell};

    #[test]
    fn resolve_transition_defaults_and_merges() {
        assert_eq!(resolve_transition(None), None);
        assert_eq!(
            resolve_transition(Some(&TransitionInput::Enabled(false))),
            None
        );
        assert_eq!(
            resolve_transition(Some(&TransitionInput::Enabled(true))),
            Some(Transition::default())
        );

        let input: TransitionInput =
            serde_json::from_value(json!({ "duration": 100, "easing": "linear" })).unwrap();
        assert_eq!(
            resolve_transition(Some(&input)),
            Some(Transition {
                duration: 100.0,
                delay: 0.0,
                easing: Easing::Linear,
            })
        );

        let input: TransitionInput =
            serde_json::from_value(json!({ "duration": 0, "delay": 0 })).unwrap();
        assert_eq!(resolve_transition(Some(&input)), None);

        let input: TransitionInput =
            serde_json::from_value(json!({ "duration": 0, "delay": 50 })).unwrap();
        assert!(resolve_transition(Some(&input)).is_some());
    }

    #[test]
    fn interpolate_arc_keeps_target_identity() {
        let from = LayoutArc {
            layer_id: "old".to_string(),
            node: crate::model::ArcNode::default(),
            x0: 0.0,
            x1: 1.0,
            y0: 0.0,
            y1: 10.0,
            depth: 0,
            key: Some("from".to_string()),
            value: 1.0,
            percentage: 1.0,
            path: vec!["a".to_string()],
            path_indices: vec![0],
            has_children: false,
        };
        let to = LayoutArc {
            layer_id: "new".to_string(),
            x0: 1.0,
            x1: 3.0,
            y0: 10.0,
            y1: 20.0,
            key: Some("to".to_string()),
            ..from.clone()
        };

        let start = interpolate_arc(&from, &to, 0.0);
        assert_eq!(start.key.as_deref(), Some("to"));
        assert_eq!(start.geometry(), from.geometry());

        let mid = interpolate_arc(&from, &to, 0.5);
        assert_eq!(mid.layer_id, "new");
        assert!((mid.x0 - 0.5).abs() < 1e-12);
        assert!((mid.x1 - 2.0).abs() < 1e-12);
        assert!((mid.y0 - 5.0).abs() < 1e-12);
        assert!((mid.y1 - 15.0).abs() < 1e-12);

        assert_eq!(interpolate_arc(&from, &to, 1.5), to);
    }

    #[test]
    fn easings_hit_endpoints() {
        for easing in [
            Easing::Linear,
            Easing::CubicIn,
            Easing::CubicOut,
            Easing::CubicInOut,
        ] {
            assert!(easing.apply(0.0).abs() < 1e-12, "{easing:?} at 0");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-12, "{easing:?} at 1");
        }
        assert!((Easing::CubicInOut.apply(0.5) - 0.5).abs() < 1e-12);
        let square: fn(f64) -> f64 = |t| t * t;
        assert_eq!(Easing::Custom(square), Easing::Custom(square));
        assert_ne!(Easing::Linear, Easing::CubicIn);
        assert!((Easing::Custom(square).apply(0.5) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn animation_holds_during_delay() {
        let mut anim = Animation::new(Transition {
            duration: 100.0,
            delay: 50.0,
            easing: Easing::Linear,
        });
        assert_eq!(anim.status(), AnimationStatus::Idle);
        assert_eq!(anim.advance(1000.0).unwrap().progress, 0.0);
        assert_eq!(anim.advance(1040.0).unwrap().progress, 0.0);
        let step = anim.advance(1100.0).unwrap();
        assert!((step.progress - 0.5).abs() < 1e-12);
        assert!(!step.finished);
        let step = anim.advance(1200.0).unwrap();
        assert_eq!(step.progress, 1.0);
        assert!(step.finished);
        assert_eq!(anim.advance(1300.0), None);
        assert!(!anim.cancel(), "cannot cancel a completed animation");
    }

    #[test]
    fn instant_run_resolves_synchronously() {
        let updates = RefCell::new(Vec::new());
        let completed = Cell::new(0);
        let cancelled = Cell::new(0);
        let mut running = run_animation(
            Transition {
                duration: 0.0,
                delay: 0.0,
                easing: Easing::Linear,
            },
            |p| updates.borrow_mut().push(p),
            || completed.set(completed.get() + 1),
            || cancelled.set(cancelled.get() + 1),
        );
        assert!(running.is_finished());
        assert!(!running.cancel());
        assert!(!running.frame(10.0));
        drop(running);
        assert_eq!(updates.into_inner(), vec![1.0]);
        assert_eq!(completed.get(), 1);
        assert_eq!(cancelled.get(), 0);
    }

    #[test]
    fn cancel_before_first_frame_fires_once() {
        let updates = Cell::new(0);
        let completed = Cell::new(0);
        let cancelled = Cell::new(0);
        let mut running = run_animation(
            Transition::default(),
            |_| updates.set(updates.get() + 1),
            || completed.set(completed.get() + 1),
            || cancelled.set(cancelled.get() + 1),
        );
        assert!(running.cancel());
        assert!(!running.cancel());
        assert!(!running.frame(0.0));
        drop(running);
        assert_eq!(updates.get(), 0);
        assert_eq!(completed.get(), 0);
        assert_eq!(cancelled.get(), 1);
    }

    #[test]
    fn frames_run_to_completion() {
        let last = Cell::new(-1.0);
        let completed = Cell::new(false);
        let mut running = run_animation(
            Transition {
                duration: 100.0,
                delay: 0.0,
                easing: Easing::Linear,
            },
            |p| last.set(p),
            || completed.set(true),
            || panic!("not cancelled"),
        );
        assert!(running.frame(0.0));
        assert_eq!(last.get(), 0.0);
        assert!(running.frame(25.0));
        assert!((last.get() - 0.25).abs() < 1e-12);
        assert!(!running.frame(150.0));
        assert_eq!(last.get(), 1.0);
        assert!(!running.cancel());
        drop(running);
        assert!(completed.get());
    }
}
