use crate::navigation::{FocusTarget, NavigationOptions, Navigator, TrailEntry};
use crate::Result;
use corona_core::{ChartConfig, NormalizeContext, SunburstConfig};
use corona_render::{
    LayoutArc, Reconciler, RenderOptions, RenderStats, SceneSink, Transition, TransitionInput,
    layout_with, resolve_transition,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Chart-level options, resolved from a [`ChartConfig`] merged over [`ChartOptions::defaults`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    #[serde(default)]
    pub transition: Option<TransitionInput>,
    #[serde(default)]
    pub navigation: NavigationOptions,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            transition: Some(TransitionInput::Enabled(true)),
            navigation: NavigationOptions::default(),
        }
    }
}

impl ChartOptions {
    pub fn defaults() -> ChartConfig {
        ChartConfig::from_value(json!({
            "transition": true,
            "navigation": {
                "rootLabel": crate::navigation::DEFAULT_ROOT_LABEL,
            },
        }))
    }

    pub fn from_config(config: &ChartConfig) -> Result<Self> {
        Ok(Self::defaults().merged(config.as_value()).parse()?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_config(&ChartConfig::from_json(text)?)
    }

    pub fn resolved_transition(&self) -> Option<Transition> {
        resolve_transition(self.transition.as_ref())
    }
}

/// Breadcrumb widget contract.
///
/// Widgets that declare [`handles_trail`](Self::handles_trail) receive the navigation trail after
/// every render pass; the rest get per-arc hover hooks.
pub trait Breadcrumbs {
    fn handles_trail(&self) -> bool {
        false
    }

    fn set_trail(&mut self, _trail: &[TrailEntry]) {}

    fn show(&mut self, _arc: &LayoutArc) {}

    fn clear(&mut self) {}
}

/// An interactive sunburst bound to one scene.
///
/// Renders are coalesced: [`Chart::request_update`] only replaces the pending config, and
/// [`Chart::flush`] renders once for any number of queued requests, so the last one wins.
pub struct Chart<S: SceneSink> {
    options: ChartOptions,
    transition: Option<Transition>,
    reconciler: Reconciler<S>,
    navigator: Navigator,
    breadcrumbs: Option<Box<dyn Breadcrumbs>>,
    normalize: NormalizeContext,
    arcs: Vec<LayoutArc>,
    pending_config: Option<SunburstConfig>,
    pending: bool,
    hovered: Option<String>,
    passes: u64,
}

impl<S: SceneSink> std::fmt::Debug for Chart<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chart")
            .field("options", &self.options)
            .field("navigator", &self.navigator)
            .field("arcs", &self.arcs.len())
            .field("passes", &self.passes)
            .finish_non_exhaustive()
    }
}

impl<S: SceneSink> Chart<S> {
    /// Creates the chart and runs the first render pass.
    pub fn new(sink: S, config: SunburstConfig, options: ChartOptions) -> Result<Self> {
        let mut chart = Self {
            transition: options.resolved_transition(),
            navigator: Navigator::new(config, options.navigation.clone()),
            options,
            reconciler: Reconciler::new(sink),
            breadcrumbs: None,
            normalize: NormalizeContext::new(),
            arcs: Vec::new(),
            pending_config: None,
            pending: true,
            hovered: None,
            passes: 0,
        };
        chart.flush()?;
        Ok(chart)
    }

    pub fn with_breadcrumbs(mut self, breadcrumbs: impl Breadcrumbs + 'static) -> Self {
        self.set_breadcrumbs(Some(Box::new(breadcrumbs)));
        self
    }

    pub fn set_breadcrumbs(&mut self, breadcrumbs: Option<Box<dyn Breadcrumbs>>) {
        if let Some(old) = self.breadcrumbs.as_mut() {
            old.clear();
        }
        self.breadcrumbs = breadcrumbs;
        self.sync_trail();
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    /// Arcs of the latest render pass.
    pub fn arcs(&self) -> &[LayoutArc] {
        &self.arcs
    }

    pub fn arc(&self, element_key: &str) -> Option<&LayoutArc> {
        self.reconciler
            .element(element_key)
            .filter(|e| !e.is_pending_removal())
            .map(|e| e.arc())
    }

    pub fn focus(&self) -> Option<&FocusTarget> {
        self.navigator.focus()
    }

    pub fn trail(&self) -> &[TrailEntry] {
        self.navigator.trail()
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn reconciler(&self) -> &Reconciler<S> {
        &self.reconciler
    }

    pub fn sink(&self) -> &S {
        self.reconciler.sink()
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.reconciler.sink_mut()
    }

    /// Number of render passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    pub fn on_focus_change(&mut self, listener: impl FnMut(Option<&FocusTarget>) + 'static) {
        self.navigator.on_focus_change(listener);
    }

    /// Queues a new base config without rendering; see [`Chart::flush`].
    pub fn request_update(&mut self, config: SunburstConfig) {
        self.pending_config = Some(config);
        self.pending = true;
    }

    pub fn update(&mut self, config: SunburstConfig) -> Result<()> {
        self.request_update(config);
        self.flush()
    }

    /// Runs render passes until nothing is pending.
    pub fn flush(&mut self) -> Result<()> {
        while self.pending {
            self.pending = false;
            if let Some(config) = self.pending_config.take() {
                self.navigator.set_base_config(config);
            }
            self.render_pass()?;
        }
        Ok(())
    }

    fn render_pass(&mut self) -> Result<RenderStats> {
        let (transition, morph) = match self.navigator.consume_transition_override() {
            Some(o) => (o.transition.or(self.transition), o.morph),
            None => (self.transition, false),
        };
        let arcs = layout_with(self.navigator.active_config(), &mut self.normalize)?;
        self.navigator.register_arcs(&arcs);
        let stats = self
            .reconciler
            .render(&arcs, RenderOptions { transition, morph });
        self.arcs = arcs;
        self.passes += 1;
        if let Some(key) = self.hovered.take() {
            if self.arc(&key).is_some() {
                self.hovered = Some(key);
            } else if let Some(breadcrumbs) = self.breadcrumbs.as_mut() {
                breadcrumbs.clear();
            }
        }
        self.sync_trail();
        tracing::debug!(pass = self.passes, arcs = self.arcs.len(), morph, "render pass");
        Ok(stats)
    }

    fn sync_trail(&mut self) {
        if let Some(breadcrumbs) = self.breadcrumbs.as_mut() {
            if breadcrumbs.handles_trail() {
                breadcrumbs.set_trail(self.navigator.trail());
            }
        }
    }

    /// Handles a click on the element registered under `element_key`.
    ///
    /// Returns `Ok(false)` when the element is unknown or not navigable.
    pub fn click(&mut self, element_key: &str) -> Result<bool> {
        let Some(arc) = self.arc(element_key).cloned() else {
            return Ok(false);
        };
        self.navigate(|navigator| navigator.handle_arc_click(&arc))
    }

    pub fn reset(&mut self) -> Result<bool> {
        self.navigate(Navigator::reset)
    }

    pub fn select_breadcrumb(&mut self, index: usize) -> Result<bool> {
        self.navigate(|navigator| navigator.select_trail(index))
    }

    /// Applies a focus change and renders it. A pass that fails restores the previous focus,
    /// re-renders it and returns the error.
    fn navigate(&mut self, change: impl FnOnce(&mut Navigator) -> bool) -> Result<bool> {
        let previous = self.navigator.focus().cloned();
        if !change(&mut self.navigator) {
            return Ok(false);
        }
        self.pending = true;
        let Err(err) = self.flush() else {
            return Ok(true);
        };
        tracing::warn!(error = %err, "navigation pass failed; restoring the previous focus");
        self.navigator.restore_focus(previous);
        self.pending = true;
        if let Err(again) = self.flush() {
            tracing::warn!(error = %again, "re-rendering the previous focus failed");
        }
        Err(err)
    }

    /// Pointer entered the element registered under `element_key`.
    pub fn hover(&mut self, element_key: &str) -> bool {
        let Some(arc) = self.arc(element_key).cloned() else {
            return false;
        };
        self.hovered = Some(element_key.to_string());
        if let Some(breadcrumbs) = self.breadcrumbs.as_mut() {
            if !breadcrumbs.handles_trail() {
                breadcrumbs.show(&arc);
            }
        }
        true
    }

    pub fn leave(&mut self) {
        if self.hovered.take().is_none() {
            return;
        }
        if let Some(breadcrumbs) = self.breadcrumbs.as_mut() {
            if !breadcrumbs.handles_trail() {
                breadcrumbs.clear();
            }
        }
    }

    /// Advances animations to `now` (milliseconds). Returns `true` while frames are still needed.
    pub fn tick(&mut self, now: f64) -> bool {
        self.reconciler.tick(now)
    }

    /// Jumps every running animation to its end state.
    pub fn finish_animations(&mut self) {
        self.reconciler.finish_all();
    }

    pub fn into_sink(mut self) -> S {
        self.reconciler.clear();
        self.reconciler.into_sink()
    }
}
