use corona::render::{Attributes, LayoutArc, SceneSink, element_key};
use corona::{Breadcrumbs, Chart, ChartError, ChartOptions, Error, SunburstConfig, TrailEntry};
use serde_json::json;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Scene {
    next: u32,
    live: BTreeMap<u32, (String, f64)>,
    removed: Vec<String>,
}

impl Scene {
    fn keys(&self) -> Vec<&str> {
        self.live.values().map(|(k, _)| k.as_str()).collect()
    }
}

impl SceneSink for Scene {
    type Element = u32;

    fn create(&mut self, key: &str, _arc: &LayoutArc) -> u32 {
        self.next += 1;
        self.live.insert(self.next, (key.to_string(), 1.0));
        self.next
    }

    fn set_path_data(&mut self, _element: &mut u32, _data: &str) {}

    fn set_opacity(&mut self, element: &mut u32, opacity: f64) {
        if let Some(entry) = self.live.get_mut(element) {
            entry.1 = opacity;
        }
    }

    fn set_attributes(&mut self, _element: &mut u32, _attributes: &Attributes) {}

    fn set_interactive(&mut self, _element: &mut u32, _interactive: bool) {}

    fn remove(&mut self, element: u32) {
        if let Some((key, _)) = self.live.remove(&element) {
            self.removed.push(key);
        }
    }
}

fn config(b_value: f64) -> SunburstConfig {
    SunburstConfig::from_value(json!({
        "size": { "radius": 100 },
        "layers": [{
            "id": "main", "radialUnits": [0, 2],
            "tree": [
                { "name": "A", "key": "a", "children": [
                    { "name": "a0", "key": "a0", "value": 1 },
                    { "name": "a1", "key": "a1", "value": 1 }
                ]},
                { "name": "B", "key": "b", "value": b_value }
            ]
        }]
    }))
    .unwrap()
}

fn instant() -> ChartOptions {
    ChartOptions::from_json(r#"{ "transition": false }"#).unwrap()
}

#[test]
fn first_pass_renders_every_arc() {
    let chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    assert_eq!(chart.passes(), 1);
    assert_eq!(chart.arcs().len(), 4);
    let mut keys = chart.sink().keys();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["main::key::a", "main::key::a0", "main::key::a1", "main::key::b"]
    );
}

#[test]
fn clicking_drills_down_and_back_up() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    assert!(chart.click("main::key::a").unwrap());
    assert_eq!(chart.passes(), 2);
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("main:0"));
    assert_eq!(chart.sink().removed, vec!["main::key::b".to_string()]);
    let a = chart.arc("main::key::a").unwrap();
    assert!((a.span() - std::f64::consts::TAU).abs() < 1e-9);

    assert!(chart.click("main::key::a").unwrap());
    assert!(chart.focus().is_none());
    assert!(chart.arc("main::key::b").is_some());
}

#[test]
fn unknown_elements_are_not_clickable() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    assert!(!chart.click("main::key::nope").unwrap());
    assert_eq!(chart.passes(), 1);
}

#[test]
fn navigation_passes_morph_new_elements() {
    let mut chart = Chart::new(Scene::default(), config(1.0), ChartOptions::default()).unwrap();
    chart.finish_animations();
    assert!(chart.click("main::key::b").unwrap());
    chart.finish_animations();
    assert!(chart.reconciler().element("main::key::a").is_none());
    chart.click("main::key::b").unwrap();

    // Returning to the root view brings A back as a collapsed wedge, not a fade.
    let a = chart.reconciler().element("main::key::a").unwrap();
    let shown = a.displayed_geometry();
    assert_eq!(shown.x0, shown.x1);
    assert_eq!(a.opacity(), 1.0);

    assert!(chart.tick(0.0));
    assert!(!chart.tick(10_000.0));
    let a = chart.reconciler().element("main::key::a").unwrap();
    assert!(a.displayed_geometry().approx_eq(&a.arc().geometry()));
}

#[test]
fn coalesced_updates_keep_the_last_config() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    chart.request_update(config(2.0));
    chart.request_update(config(6.0));
    chart.flush().unwrap();
    assert_eq!(chart.passes(), 2);
    let b = chart.arc("main::key::b").unwrap();
    assert_eq!(b.value, 6.0);
    assert!((b.percentage - 0.75).abs() < 1e-9);

    chart.flush().unwrap();
    assert_eq!(chart.passes(), 2, "nothing pending");
}

#[test]
fn updates_that_remove_the_focus_reset_it() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    chart.click("main::key::a").unwrap();
    let mut changed = config(1.0);
    changed.layers[0].tree = serde_json::from_value(json!([
        { "name": "A", "key": "a", "hidden": true, "value": 1 },
        { "name": "B", "key": "b", "value": 1 }
    ]))
    .unwrap();
    chart.update(changed).unwrap();
    assert!(chart.focus().is_none());
    assert_eq!(chart.trail().len(), 1);
    assert_eq!(chart.sink().keys(), vec!["main::key::b"]);
}

#[test]
fn layout_errors_surface_from_update() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    let mut broken = config(1.0);
    broken.size.radius = -1.0;
    let err = chart.update(broken).unwrap_err();
    assert!(matches!(err, ChartError::Core(Error::InvalidRadius { .. })));
    assert_eq!(chart.arcs().len(), 4, "previous scene stays");
}

#[test]
fn instant_charts_never_animate() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    chart.update(config(5.0)).unwrap();
    assert!(!chart.tick(0.0));
    assert!(chart.reconciler().elements().all(|e| e.opacity() == 1.0));
}

#[derive(Default)]
struct Recorded {
    trails: Vec<Vec<String>>,
    events: Vec<String>,
}

struct TrailWidget(Rc<RefCell<Recorded>>);

impl Breadcrumbs for TrailWidget {
    fn handles_trail(&self) -> bool {
        true
    }

    fn set_trail(&mut self, trail: &[TrailEntry]) {
        self.0
            .borrow_mut()
            .trails
            .push(trail.iter().map(|e| e.label.clone()).collect());
    }
}

struct HoverWidget(Rc<RefCell<Recorded>>);

impl Breadcrumbs for HoverWidget {
    fn show(&mut self, arc: &LayoutArc) {
        self.0.borrow_mut().events.push(format!("show {}", arc.name()));
    }

    fn clear(&mut self) {
        self.0.borrow_mut().events.push("clear".to_string());
    }
}

#[test]
fn trail_widgets_receive_the_trail() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut chart = Chart::new(Scene::default(), config(1.0), instant())
        .unwrap()
        .with_breadcrumbs(TrailWidget(Rc::clone(&recorded)));
    chart.click("main::key::a").unwrap();
    chart.select_breadcrumb(0).unwrap();
    assert!(!chart.select_breadcrumb(0).unwrap());
    assert!(chart.hover("main::key::a"));

    let recorded = recorded.borrow();
    assert!(recorded.events.is_empty());
    let trails = &recorded.trails;
    assert_eq!(trails.first(), Some(&vec!["All".to_string()]));
    assert!(trails.contains(&vec!["All".to_string(), "A".to_string()]));
    assert_eq!(trails.last(), Some(&vec!["All".to_string()]));
}

#[test]
fn hover_widgets_follow_the_pointer() {
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let mut chart = Chart::new(Scene::default(), config(1.0), instant())
        .unwrap()
        .with_breadcrumbs(HoverWidget(Rc::clone(&recorded)));
    assert!(chart.hover("main::key::a0"));
    assert!(!chart.hover("main::key::missing"));
    chart.leave();
    chart.leave();
    assert_eq!(recorded.borrow().events, vec!["show a0", "clear"]);
}

#[test]
fn reset_returns_to_the_root_view() {
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    assert!(!chart.reset().unwrap());
    chart.click("main::key::a0").unwrap();
    assert_eq!(chart.trail().len(), 3);
    assert!(chart.reset().unwrap());
    assert!(chart.focus().is_none());
    assert_eq!(chart.arcs().len(), 4);
}

fn aligned_config() -> SunburstConfig {
    SunburstConfig::from_value(json!({
        "size": { "radius": 100 },
        "layers": [
            {
                "id": "inner", "radialUnits": [0, 1],
                "tree": [
                    { "name": "A", "key": "a", "children": [{ "name": "a0", "value": 1 }] },
                    { "name": "B", "key": "b", "value": 1 }
                ]
            },
            {
                "id": "outer", "radialUnits": [1, 2], "angleMode": "align", "alignWith": "inner",
                "tree": [
                    { "name": "A outer", "key": "a", "value": 1 },
                    { "name": "B outer", "key": "b", "value": 1 }
                ]
            }
        ]
    }))
    .unwrap()
}

fn key_of(chart: &Chart<Scene>, name: &str) -> String {
    chart
        .arcs()
        .iter()
        .find(|a| a.name() == name)
        .map(element_key)
        .unwrap_or_else(|| panic!("no arc {name}"))
}

#[test]
fn drilling_into_an_unkeyed_arc_empties_aligned_layers() {
    let mut chart = Chart::new(Scene::default(), aligned_config(), instant()).unwrap();
    let a0 = key_of(&chart, "a0");
    assert!(chart.click(&a0).unwrap());
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("inner:0.0"));
    let names: Vec<&str> = chart.arcs().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["a0"]);
    assert!((chart.arcs()[0].span() - std::f64::consts::TAU).abs() < 1e-9);

    chart.update(aligned_config()).unwrap();
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("inner:0.0"));

    // Climbing back to the keyed parent brings the aligned layer back.
    let a0 = key_of(&chart, "a0");
    assert!(chart.click(&a0).unwrap());
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("inner:0"));
    assert!(chart.arcs().iter().any(|a| a.name() == "A outer"));
    assert!(chart.arcs().iter().all(|a| a.name() != "B outer"));
}

#[test]
fn multi_parent_nodes_can_be_focused() {
    let config = SunburstConfig::from_value(json!({
        "size": { "radius": 100 },
        "layers": [{
            "id": "main", "radialUnits": [0, 2],
            "tree": [
                { "name": "P", "key": "p", "value": 1 },
                { "name": "Q", "key": "q", "value": 1 },
                { "name": "M", "key": "m", "value": 1, "parents": ["p", "q"] }
            ]
        }]
    }))
    .unwrap();
    let mut chart = Chart::new(Scene::default(), config, instant()).unwrap();
    let names: Vec<&str> = chart.arcs().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["P", "Q", "M"]);

    assert!(chart.click("main::key::m").unwrap());
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("main:2"));
    let names: Vec<&str> = chart.arcs().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["M"]);
    assert!((chart.arcs()[0].span() - std::f64::consts::TAU).abs() < 1e-9);
}

#[test]
fn failed_navigation_passes_restore_the_previous_focus() {
    let seen: Rc<RefCell<Vec<Option<String>>>> = Rc::default();
    let mut chart = Chart::new(Scene::default(), config(1.0), instant()).unwrap();
    let sink = Rc::clone(&seen);
    chart.on_focus_change(move |focus| {
        sink.borrow_mut().push(focus.map(|f| f.identifier.clone()));
    });

    let mut broken = config(1.0);
    broken.size.radius = -1.0;
    chart.request_update(broken);
    let err = chart.click("main::key::a").unwrap_err();
    assert!(matches!(err, ChartError::Core(Error::InvalidRadius { .. })));

    assert!(chart.focus().is_none());
    assert_eq!(chart.trail().len(), 1);
    assert!(chart.navigator().active_config().layers[0].tree.roots().len() == 2);
    assert_eq!(chart.arcs().len(), 4, "previous scene stays");
    assert_eq!(*seen.borrow(), vec![Some("main:0".to_string()), None]);

    chart.update(config(1.0)).unwrap();
    assert!(chart.click("main::key::a").unwrap());
    assert_eq!(chart.focus().map(|f| f.identifier.as_str()), Some("main:0"));
}
