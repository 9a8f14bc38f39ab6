use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};

use kurbo::Rect;
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Geometry of the intersection test.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VisibilityOpts {
    /// Proximity margin added on every side of the viewport, in pixels.
    pub margin_px: f64,
    /// Fraction of the target's area that must fall inside the inflated viewport.
    pub threshold: f64,
}

impl Default for VisibilityOpts {
    fn default() -> Self {
        Self {
            margin_px: 50.0,
            threshold: 0.1,
        }
    }
}

/// Identifies one observed render target within a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u64);

impl std::fmt::Display for TargetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "target-{}", self.0)
    }
}

/// Per-target activation flag. Moves `Dormant -> Activated` once and never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibilityState {
    /// Not yet near the viewport.
    Dormant,
    /// Activation fired.
    Activated,
}

/// One intersection observation delivered by the host's layout engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    /// Target the entry describes.
    pub target: TargetId,
    /// Target bounds in viewport coordinates.
    pub bounds: Rect,
    /// Current viewport rectangle.
    pub viewport: Rect,
}

impl IntersectionEntry {
    /// Construct an entry.
    pub fn new(target: TargetId, bounds: Rect, viewport: Rect) -> Self {
        Self {
            target,
            bounds,
            viewport,
        }
    }

    /// Share of the target's area inside the viewport inflated by `margin`.
    ///
    /// A zero-area target counts as fully visible when it touches the inflated viewport.
    pub fn visible_ratio(&self, margin: f64) -> f64 {
        let bounds = self.bounds.abs();
        let area = self.viewport.abs().inflate(margin, margin);
        let touching = bounds.x0 <= area.x1
            && bounds.x1 >= area.x0
            && bounds.y0 <= area.y1
            && bounds.y1 >= area.y0;
        if !touching {
            return 0.0;
        }
        let total = bounds.area();
        if total <= 0.0 {
            return 1.0;
        }
        (bounds.intersect(area).area() / total).clamp(0.0, 1.0)
    }
}

struct GateInner {
    opts: VisibilityOpts,
    next_id: u64,
    /// Dormant targets and their activation senders. Only these are evaluated.
    watched: HashMap<TargetId, oneshot::Sender<()>>,
    /// Fired targets, kept until their observation drops so `state` can report them.
    activated: HashSet<TargetId>,
}

impl GateInner {
    fn fire(&mut self, target: TargetId) -> bool {
        let Some(tx) = self.watched.remove(&target) else {
            return false;
        };
        self.activated.insert(target);
        // The observer may already be gone; the target still counts as activated.
        let _ = tx.send(());
        tracing::debug!(target_id = %target, "visibility activation fired");
        true
    }
}

/// Watches render targets and fires each one's activation exactly once.
///
/// Cloning yields another handle to the same gate. Targets register with
/// [`observe`](Self::observe) and are released when their [`Observation`] drops.
#[derive(Clone)]
pub struct VisibilityGate {
    inner: Arc<Mutex<GateInner>>,
}

impl std::fmt::Debug for VisibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("VisibilityGate")
            .field("opts", &inner.opts)
            .field("watched", &inner.watched.len())
            .field("activated", &inner.activated.len())
            .finish()
    }
}

impl Default for VisibilityGate {
    fn default() -> Self {
        Self::new(VisibilityOpts::default())
    }
}

impl VisibilityGate {
    /// Gate with the given geometry.
    pub fn new(opts: VisibilityOpts) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GateInner {
                opts,
                next_id: 0,
                watched: HashMap::new(),
                activated: HashSet::new(),
            })),
        }
    }

    /// Start observing a new target.
    pub fn observe(&self) -> Observation {
        let (tx, rx) = oneshot::channel();
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = TargetId(inner.next_id);
        inner.watched.insert(id, tx);
        tracing::trace!(target_id = %id, "observing");
        Observation {
            id,
            gate: Arc::downgrade(&self.inner),
            activation: Some(rx),
            activated: false,
        }
    }

    /// Feed intersection entries; returns how many targets activated as a result.
    ///
    /// A target stops being evaluated once it fires. Entries below the threshold and entries for
    /// unknown or already-fired targets are ignored.
    pub fn report(&self, entries: &[IntersectionEntry]) -> usize {
        let mut inner = self.inner.lock();
        let margin = inner.opts.margin_px;
        let threshold = inner.opts.threshold;
        let mut fired = 0;
        for entry in entries {
            if !inner.watched.contains_key(&entry.target) {
                continue;
            }
            let ratio = entry.visible_ratio(margin);
            if ratio > 0.0 && ratio >= threshold && inner.fire(entry.target) {
                fired += 1;
            }
        }
        fired
    }

    /// Force activation of `target`. Returns `true` only for the firing that took effect.
    pub fn fire(&self, target: TargetId) -> bool {
        self.inner.lock().fire(target)
    }

    /// Activation state of `target`, or `None` once it has been released.
    pub fn state(&self, target: TargetId) -> Option<VisibilityState> {
        let inner = self.inner.lock();
        if inner.watched.contains_key(&target) {
            Some(VisibilityState::Dormant)
        } else if inner.activated.contains(&target) {
            Some(VisibilityState::Activated)
        } else {
            None
        }
    }

    /// Number of targets still waiting for activation.
    pub fn dormant_count(&self) -> usize {
        self.inner.lock().watched.len()
    }

    /// Number of registered targets, activated or not.
    pub fn observed_count(&self) -> usize {
        let inner = self.inner.lock();
        inner.watched.len() + inner.activated.len()
    }
}

/// A target's registration with a [`VisibilityGate`].
///
/// Dropping it releases the registration whether or not activation fired.
pub struct Observation {
    id: TargetId,
    gate: Weak<Mutex<GateInner>>,
    activation: Option<oneshot::Receiver<()>>,
    activated: bool,
}

impl std::fmt::Debug for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observation")
            .field("id", &self.id)
            .field("activated", &self.activated)
            .finish()
    }
}

impl Observation {
    /// Target id to use in [`IntersectionEntry`] values.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// Non-blocking check of the activation signal.
    pub fn is_activated(&mut self) -> bool {
        if self.activated {
            return true;
        }
        if let Some(rx) = self.activation.as_mut()
            && rx.try_recv().is_ok()
        {
            self.activated = true;
            self.activation = None;
        }
        self.activated
    }

    /// Wait for activation. Returns `false` if the gate went away without firing.
    pub async fn activated(&mut self) -> bool {
        if self.activated {
            return true;
        }
        let Some(rx) = self.activation.as_mut() else {
            return false;
        };
        let fired = rx.await.is_ok();
        self.activation = None;
        self.activated = fired;
        fired
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.upgrade() {
            let mut inner = gate.lock();
            inner.watched.remove(&self.id);
            inner.activated.remove(&self.id);
            tracing::trace!(target_id = %self.id, "observation released");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/view/visibility.rs"]
mod tests;
