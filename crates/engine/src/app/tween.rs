use super::scene::Vec2;

/// Work that advances by explicit time steps instead of suspending.
pub trait TimedTask {
    fn advance(&mut self, dt_seconds: f32);
    fn is_complete(&self) -> bool;
}

/// Steps `task` with a fixed `dt_seconds` until it completes.
///
/// Returns the number of steps taken, or `None` when the task is still running
/// after `max_steps`.
pub fn run_to_completion<T: TimedTask + ?Sized>(
    task: &mut T,
    dt_seconds: f32,
    max_steps: u32,
) -> Option<u32> {
    let mut steps = 0u32;
    while !task.is_complete() {
        if steps >= max_steps {
            return None;
        }
        task.advance(dt_seconds);
        steps = steps.saturating_add(1);
    }
    Some(steps)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ease {
    Linear,
    InOutQuad,
}

impl Ease {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timer {
    duration_seconds: f32,
    elapsed_seconds: f32,
}

impl Timer {
    pub fn new(duration_seconds: f32) -> Self {
        Self {
            duration_seconds: sanitize_duration(duration_seconds),
            elapsed_seconds: 0.0,
        }
    }

    pub fn remaining_seconds(&self) -> f32 {
        (self.duration_seconds - self.elapsed_seconds).max(0.0)
    }

    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed_seconds
    }
}

impl TimedTask for Timer {
    fn advance(&mut self, dt_seconds: f32) {
        if dt_seconds > 0.0 {
            self.elapsed_seconds += dt_seconds;
        }
    }

    fn is_complete(&self) -> bool {
        self.elapsed_seconds >= self.duration_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TweenPath {
    Line,
    /// Quadratic curve whose control point sits `height` above the midpoint.
    Arc { height: f32 },
}

/// Timed, eased interpolation between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    start: Vec2,
    end: Vec2,
    path: TweenPath,
    ease: Ease,
    timer: Timer,
    position: Vec2,
}

impl Tween {
    pub fn new(start: Vec2, end: Vec2, duration_seconds: f32) -> Self {
        let timer = Timer::new(duration_seconds);
        let position = if timer.is_complete() { end } else { start };
        Self {
            start,
            end,
            path: TweenPath::Line,
            ease: Ease::Linear,
            timer,
            position,
        }
    }

    pub fn with_ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn with_path(mut self, path: TweenPath) -> Self {
        self.path = path;
        self
    }

    pub fn start(&self) -> Vec2 {
        self.start
    }

    pub fn end(&self) -> Vec2 {
        self.end
    }

    pub fn path(&self) -> TweenPath {
        self.path
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn duration_seconds(&self) -> f32 {
        self.timer.duration_seconds
    }

    fn sample(&self, t: f32) -> Vec2 {
        match self.path {
            TweenPath::Line => self.start.lerp(self.end, t),
            TweenPath::Arc { height } => {
                let control = Vec2 {
                    x: (self.start.x + self.end.x) * 0.5,
                    y: (self.start.y + self.end.y) * 0.5 + height,
                };
                let a = self.start.lerp(control, t);
                let b = control.lerp(self.end, t);
                a.lerp(b, t)
            }
        }
    }
}

impl TimedTask for Tween {
    fn advance(&mut self, dt_seconds: f32) {
        self.timer.advance(dt_seconds);
        if self.timer.is_complete() {
            self.position = self.end;
            return;
        }
        let t = self.timer.elapsed_seconds / self.timer.duration_seconds;
        self.position = self.sample(self.ease.apply(t));
    }

    fn is_complete(&self) -> bool {
        self.timer.is_complete()
    }
}

fn sanitize_duration(duration_seconds: f32) -> f32 {
    if duration_seconds.is_finite() && duration_seconds > 0.0 {
        duration_seconds
    } else {
        0.0
    }
}
