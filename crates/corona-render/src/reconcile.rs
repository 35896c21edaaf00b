//! Keyed reconciliation of laid-out arcs against a retained scene.
//!
//! The reconciler never draws. It tells a [`SceneSink`] which elements to create, which path data
//! and opacity to show, and when to detach. Animation state lives here and is advanced by
//! [`Reconciler::tick`].

use crate::geometry::{ArcGeometry, describe_arc};
use crate::model::LayoutArc;
use crate::transition::{Animation, Transition, interpolate_arc};
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Presentation attributes, in emission order.
pub type Attributes = IndexMap<String, String>;

/// Retained-mode drawing surface (an SVG document, a canvas scene graph, a test recorder...).
pub trait SceneSink {
    type Element;

    fn create(&mut self, key: &str, arc: &LayoutArc) -> Self::Element;
    fn set_path_data(&mut self, element: &mut Self::Element, data: &str);
    fn set_opacity(&mut self, element: &mut Self::Element, opacity: f64);
    fn set_attributes(&mut self, element: &mut Self::Element, attributes: &Attributes);
    fn set_interactive(&mut self, element: &mut Self::Element, interactive: bool);
    fn remove(&mut self, element: Self::Element);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderOptions {
    /// `None` applies every change immediately.
    pub transition: Option<Transition>,
    /// New elements grow out of a collapsed wedge instead of fading in.
    pub morph: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub created: usize,
    pub updated: usize,
    /// Updated elements whose geometry is animating.
    pub animated: usize,
    /// Vanished elements now fading out.
    pub removing: usize,
    /// Vanished elements detached immediately.
    pub removed: usize,
    /// Elements whose pending removal was cancelled.
    pub revived: usize,
}

/// Heads towards the element's current arc.
#[derive(Debug, Clone)]
struct GeometryTween {
    from: LayoutArc,
    animation: Animation,
}

#[derive(Debug, Clone)]
struct Fade {
    from: f64,
    to: f64,
    animation: Animation,
    detach: bool,
}

/// One element owned by the reconciler.
#[derive(Debug)]
pub struct ManagedElement<E> {
    key: String,
    handle: E,
    arc: LayoutArc,
    snapshot: Option<ArcGeometry>,
    displayed: ArcGeometry,
    opacity: f64,
    geometry: Option<GeometryTween>,
    fade: Option<Fade>,
    pending_removal: bool,
}

impl<E> ManagedElement<E> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn handle(&self) -> &E {
        &self.handle
    }

    /// The arc this element is heading to.
    pub fn arc(&self) -> &LayoutArc {
        &self.arc
    }

    /// Geometry on screen when the last update started.
    pub fn snapshot(&self) -> Option<ArcGeometry> {
        self.snapshot
    }

    pub fn displayed_geometry(&self) -> ArcGeometry {
        self.displayed
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn is_pending_removal(&self) -> bool {
        self.pending_removal
    }

    pub fn is_animating(&self) -> bool {
        self.geometry.is_some() || self.fade.is_some()
    }
}

/// Stable element key for an arc.
///
/// Keyed arcs use `layer::key::<key>`; the rest fall back to their structural position
/// (`layer::path::<depth>::<ancestors>::<index>`).
pub fn element_key(arc: &LayoutArc) -> String {
    if let Some(key) = arc.key.as_deref().or(arc.node.key.as_deref()) {
        return format!("{}::key::{key}", arc.layer_id);
    }
    let ancestors = match arc.path.split_last() {
        Some((_, ancestors)) => ancestors.join("/"),
        None => String::new(),
    };
    let index = arc.path_indices.last().copied().unwrap_or(0);
    format!(
        "{}::path::{}::{ancestors}::{index}",
        arc.layer_id, arc.depth
    )
}

pub fn arc_attributes(key: &str, arc: &LayoutArc) -> Attributes {
    let label = arc.node.display_label();
    let mut attrs = Attributes::new();
    attrs.insert("data-key".to_string(), key.to_string());
    attrs.insert("data-layer".to_string(), arc.layer_id.clone());
    attrs.insert("data-depth".to_string(), arc.depth.to_string());
    if let Some(color) = &arc.node.color {
        attrs.insert("fill".to_string(), color.clone());
    }
    attrs.insert(
        "title".to_string(),
        arc.node.tooltip.clone().unwrap_or_else(|| label.to_string()),
    );
    attrs.insert("role".to_string(), "graphics-symbol".to_string());
    attrs.insert("aria-label".to_string(), label.to_string());
    attrs
}

pub struct Reconciler<S: SceneSink> {
    sink: S,
    elements: IndexMap<String, ManagedElement<S::Element>>,
}

impl<S: SceneSink> std::fmt::Debug for Reconciler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("keys", &self.elements.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<S: SceneSink> Reconciler<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            elements: IndexMap::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, key: &str) -> Option<&ManagedElement<S::Element>> {
        self.elements.get(key)
    }

    pub fn elements(&self) -> impl Iterator<Item = &ManagedElement<S::Element>> {
        self.elements.values()
    }

    pub fn is_animating(&self) -> bool {
        self.elements.values().any(ManagedElement::is_animating)
    }

    /// Brings the scene in line with `arcs`.
    pub fn render(&mut self, arcs: &[LayoutArc], options: RenderOptions) -> RenderStats {
        let transition = options.transition.filter(|t| !t.is_instant());
        let mut stats = RenderStats::default();
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut occurrences: FxHashMap<String, usize> = FxHashMap::default();

        for arc in arcs {
            let base = element_key(arc);
            let count = occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            let key = if *count == 1 {
                base
            } else {
                format!("{base}#{}", *count - 1)
            };

            match self.elements.get_mut(&key) {
                Some(element) => {
                    if revive(&mut self.sink, element) {
                        stats.revived += 1;
                    }
                    if update(&mut self.sink, element, arc, transition) {
                        stats.animated += 1;
                    }
                    stats.updated += 1;
                }
                None => {
                    let element = create(&mut self.sink, &key, arc, transition, options.morph);
                    self.elements.insert(key.clone(), element);
                    stats.created += 1;
                }
            }
            seen.insert(key);
        }

        let mut detach = Vec::new();
        for (key, element) in self.elements.iter_mut() {
            if seen.contains(key) {
                continue;
            }
            if element.pending_removal {
                // Already fading out; without a transition nothing stays mid-flight.
                if transition.is_none() {
                    detach.push(key.clone());
                }
                continue;
            }
            element.pending_removal = true;
            self.sink.set_interactive(&mut element.handle, false);
            match transition {
                Some(transition) => {
                    element.fade = Some(Fade {
                        from: element.opacity,
                        to: 0.0,
                        animation: Animation::new(transition),
                        detach: true,
                    });
                    stats.removing += 1;
                }
                None => detach.push(key.clone()),
            }
        }
        stats.removed = detach.len();
        for key in detach {
            self.detach(&key);
        }

        tracing::debug!(
            created = stats.created,
            updated = stats.updated,
            animated = stats.animated,
            removing = stats.removing,
            removed = stats.removed,
            revived = stats.revived,
            "reconciled arcs"
        );
        stats
    }

    /// Advances every running animation to `now` (milliseconds). Returns `true` while any
    /// animation still needs frames.
    pub fn tick(&mut self, now: f64) -> bool {
        let mut detach = Vec::new();
        for (key, element) in self.elements.iter_mut() {
            if let Some(tween) = element.geometry.as_mut() {
                let frame = tween.animation.advance(now).map(|step| {
                    let shown = interpolate_arc(&tween.from, &element.arc, step.progress);
                    (shown.geometry(), step.finished)
                });
                match frame {
                    Some((geom, finished)) => {
                        if finished {
                            element.geometry = None;
                        }
                        show_geometry(&mut self.sink, element, geom);
                    }
                    None => element.geometry = None,
                }
            }

            if let Some(fade) = element.fade.as_mut() {
                match fade.animation.advance(now) {
                    Some(step) => {
                        let opacity = fade.from + (fade.to - fade.from) * step.progress;
                        let done = step.finished.then_some(fade.detach);
                        show_opacity(&mut self.sink, element, opacity);
                        if let Some(detach_now) = done {
                            element.fade = None;
                            if detach_now {
                                detach.push(key.clone());
                            }
                        }
                    }
                    None => element.fade = None,
                }
            }
        }
        for key in detach {
            self.detach(&key);
        }
        self.is_animating()
    }

    /// Cancels every running animation and applies its terminal state.
    pub fn finish_all(&mut self) {
        let mut detach = Vec::new();
        for (key, element) in self.elements.iter_mut() {
            if element.geometry.take().is_some() {
                let target = element.arc.geometry();
                show_geometry(&mut self.sink, element, target);
            }
            if let Some(fade) = element.fade.take() {
                show_opacity(&mut self.sink, element, fade.to);
                if fade.detach {
                    detach.push(key.clone());
                }
            }
        }
        for key in detach {
            self.detach(&key);
        }
    }

    /// Detaches every element.
    pub fn clear(&mut self) {
        for (_, element) in self.elements.drain(..) {
            self.sink.remove(element.handle);
        }
    }

    fn detach(&mut self, key: &str) {
        if let Some(element) = self.elements.shift_remove(key) {
            self.sink.remove(element.handle);
        }
    }
}

fn create<S: SceneSink>(
    sink: &mut S,
    key: &str,
    arc: &LayoutArc,
    transition: Option<Transition>,
    morph: bool,
) -> ManagedElement<S::Element> {
    let target = arc.geometry();
    let mut handle = sink.create(key, arc);
    sink.set_attributes(&mut handle, &arc_attributes(key, arc));
    sink.set_interactive(&mut handle, true);

    let mut element = ManagedElement {
        key: key.to_string(),
        handle,
        arc: arc.clone(),
        snapshot: None,
        displayed: target,
        opacity: 1.0,
        geometry: None,
        fade: None,
        pending_removal: false,
    };

    match transition {
        Some(transition) if morph => {
            let from = target.collapsed_at_mid();
            show_geometry(sink, &mut element, from);
            show_opacity(sink, &mut element, 1.0);
            element.geometry = Some(GeometryTween {
                from: arc.with_geometry(from),
                animation: Animation::new(transition),
            });
        }
        Some(transition) => {
            show_geometry(sink, &mut element, target);
            show_opacity(sink, &mut element, 0.0);
            element.fade = Some(Fade {
                from: 0.0,
                to: 1.0,
                animation: Animation::new(transition),
                detach: false,
            });
        }
        None => {
            show_geometry(sink, &mut element, target);
            show_opacity(sink, &mut element, 1.0);
        }
    }
    element
}

/// Returns `true` when a geometry animation was started.
fn update<S: SceneSink>(
    sink: &mut S,
    element: &mut ManagedElement<S::Element>,
    arc: &LayoutArc,
    transition: Option<Transition>,
) -> bool {
    let from = element.displayed;
    let target = arc.geometry();
    let shown = element.arc.with_geometry(from);
    element.snapshot = Some(from);
    element.arc = arc.clone();
    sink.set_attributes(&mut element.handle, &arc_attributes(&element.key, arc));

    // A tween still in flight is dropped; the next one starts from what is on screen.
    element.geometry = None;

    match transition {
        Some(transition) if !from.approx_eq(&target) => {
            element.geometry = Some(GeometryTween {
                from: shown,
                animation: Animation::new(transition),
            });
            true
        }
        _ => {
            show_geometry(sink, element, target);
            false
        }
    }
}

/// Cancels a pending removal. Returns `true` when there was one.
fn revive<S: SceneSink>(sink: &mut S, element: &mut ManagedElement<S::Element>) -> bool {
    if !element.pending_removal {
        return false;
    }
    element.pending_removal = false;
    element.fade = None;
    show_opacity(sink, element, 1.0);
    sink.set_interactive(&mut element.handle, true);
    true
}

fn show_geometry<S: SceneSink>(
    sink: &mut S,
    element: &mut ManagedElement<S::Element>,
    geom: ArcGeometry,
) {
    element.displayed = geom;
    sink.set_path_data(&mut element.handle, &describe_arc(&geom).to_svg_path_data());
}

fn show_opacity<S: SceneSink>(sink: &mut S, element: &mut ManagedElement<S::Element>, opacity: f64) {
    element.opacity = opacity;
    sink.set_opacity(&mut element.handle, opacity);
}
