//! Selection-by-index: the second command producer.
//!
//! An ordered roster of up to nine (trigger, target) bindings is scanned
//! once per tick, in ascending order, and every firing trigger overwrites
//! the current selection. When several triggers fire in the same tick, the
//! last match of the ascending scan — the *highest* index — wins. That
//! tie-break is deliberate and load-bearing; keep it if you touch the scan.
//!
//! After the scan, the current selection's position is issued to the
//! navigation capability every tick, whether or not it changed. `move_to`
//! is idempotent; re-issue is expected.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ImperaError, Result};

/// Largest roster the scan supports.
pub const MAX_TARGETS: usize = 9;

/// A position in the navigation space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// A named movement goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub position: Point,
}

/// Opaque "move to point" capability. Issued every tick; must tolerate
/// repeated identical goals.
pub trait NavigationTarget: Send {
    fn move_to(&mut self, point: Point);
}

/// One roster entry: a per-tick trigger predicate and the target it selects.
pub struct SelectionBinding {
    trigger: Box<dyn FnMut() -> bool + Send>,
    target: Target,
}

impl SelectionBinding {
    pub fn new(trigger: impl FnMut() -> bool + Send + 'static, target: Target) -> Self {
        Self {
            trigger: Box::new(trigger),
            target,
        }
    }
}

/// Per-tick scanner over the binding roster.
pub struct TargetSelector {
    bindings: Vec<SelectionBinding>,
    selected: Option<usize>,
}

impl TargetSelector {
    /// # Errors
    /// `ImperaError::TooManySelectionTargets` when more than
    /// [`MAX_TARGETS`] bindings are supplied.
    pub fn new(bindings: Vec<SelectionBinding>) -> Result<Self> {
        if bindings.len() > MAX_TARGETS {
            return Err(ImperaError::TooManySelectionTargets {
                count: bindings.len(),
                limit: MAX_TARGETS,
            });
        }
        Ok(Self {
            bindings,
            selected: None,
        })
    }

    /// The currently selected target, if any trigger has ever fired (or a
    /// selection was made explicitly).
    pub fn selected_target(&self) -> Option<&Target> {
        self.selected.map(|i| &self.bindings[i].target)
    }

    /// Explicitly select by roster index. Returns false for an out-of-range
    /// index.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.bindings.len() {
            self.selected = Some(index);
            debug!(index, target = %self.bindings[index].target.name, "target selected");
            true
        } else {
            false
        }
    }

    /// Explicitly select by target name (ASCII case-insensitive). Lets a
    /// dispatched voice command re-aim the goal. Returns false when no
    /// target matches.
    pub fn select_by_name(&mut self, name: &str) -> bool {
        match self
            .bindings
            .iter()
            .position(|b| b.target.name.eq_ignore_ascii_case(name))
        {
            Some(index) => self.select(index),
            None => false,
        }
    }

    /// Run one tick: evaluate every trigger in ascending order (overwriting
    /// the selection on each hit), then issue the selected position to
    /// `nav`. No selection yet → nothing is issued.
    pub fn tick(&mut self, nav: &mut dyn NavigationTarget) {
        for (index, binding) in self.bindings.iter_mut().enumerate() {
            if (binding.trigger)() {
                self.selected = Some(index);
            }
        }
        if let Some(index) = self.selected {
            nav.move_to(self.bindings[index].target.position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;
    use std::sync::Arc;

    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNav {
        issued: Vec<Point>,
    }

    impl NavigationTarget for RecordingNav {
        fn move_to(&mut self, point: Point) {
            self.issued.push(point);
        }
    }

    fn target(name: &str, x: f32) -> Target {
        Target {
            name: name.into(),
            position: Point::new(x, 0.0, 0.0),
        }
    }

    /// Roster of three targets whose triggers read a shared pressed-set.
    fn roster(pressed: &Arc<Mutex<HashSet<usize>>>) -> TargetSelector {
        let bindings = ["alpha", "bravo", "charlie"]
            .iter()
            .copied()
            .enumerate()
            .map(|(i, name)| {
                let pressed = Arc::clone(pressed);
                SelectionBinding::new(move || pressed.lock().contains(&i), target(name, i as f32))
            })
            .collect();
        TargetSelector::new(bindings).expect("roster fits")
    }

    #[test]
    fn highest_pressed_index_wins_the_tick() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);
        let mut nav = RecordingNav::default();

        pressed.lock().extend([1, 2]);
        selector.tick(&mut nav);

        assert_eq!(selector.selected_target().map(|t| t.name.as_str()), Some("charlie"));
        assert_eq!(nav.issued, vec![Point::new(2.0, 0.0, 0.0)]);
    }

    #[test]
    fn goal_is_reissued_every_tick_without_change() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);
        let mut nav = RecordingNav::default();

        pressed.lock().insert(0);
        selector.tick(&mut nav);
        pressed.lock().clear();
        selector.tick(&mut nav);
        selector.tick(&mut nav);

        assert_eq!(nav.issued.len(), 3);
        assert!(nav.issued.iter().all(|p| *p == Point::new(0.0, 0.0, 0.0)));
    }

    #[test]
    fn nothing_is_issued_before_the_first_selection() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);
        let mut nav = RecordingNav::default();

        selector.tick(&mut nav);
        selector.tick(&mut nav);

        assert!(nav.issued.is_empty());
        assert!(selector.selected_target().is_none());
    }

    #[test]
    fn later_press_moves_the_selection() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);
        let mut nav = RecordingNav::default();

        pressed.lock().insert(2);
        selector.tick(&mut nav);
        pressed.lock().clear();
        pressed.lock().insert(0);
        selector.tick(&mut nav);

        assert_eq!(selector.selected_target().map(|t| t.name.as_str()), Some("alpha"));
        assert_eq!(
            nav.issued,
            vec![Point::new(2.0, 0.0, 0.0), Point::new(0.0, 0.0, 0.0)]
        );
    }

    #[test]
    fn roster_size_is_capped_at_nine() {
        let bindings = (0..10)
            .map(|i| SelectionBinding::new(|| false, target("t", i as f32)))
            .collect();
        let err = TargetSelector::new(bindings)
            .err()
            .expect("oversized roster must be rejected");
        match err {
            ImperaError::TooManySelectionTargets { count, limit } => {
                assert_eq!(count, 10);
                assert_eq!(limit, MAX_TARGETS);
            }
            other => panic!("expected TooManySelectionTargets, got {other:?}"),
        }
    }

    #[test]
    fn select_by_name_is_case_insensitive() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);

        assert!(selector.select_by_name("BRAVO"));
        assert_eq!(selector.selected_target().map(|t| t.name.as_str()), Some("bravo"));
        assert!(!selector.select_by_name("delta"));
        assert_eq!(selector.selected_target().map(|t| t.name.as_str()), Some("bravo"));
    }

    #[test]
    fn select_rejects_out_of_range_indices() {
        let pressed = Arc::new(Mutex::new(HashSet::new()));
        let mut selector = roster(&pressed);

        assert!(!selector.select(3));
        assert!(selector.selected_target().is_none());
        assert!(selector.select(1));
    }
}
