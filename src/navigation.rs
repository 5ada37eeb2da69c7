use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::capture::simulator::AnalysisMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Welcome,
    SignIn,
    CreateFarm,
    Dashboard,
    MethodSelection,
    Camera,
    SensorEntry,
    CropRecommendation,
    SoilDetection,
    Weather,
    Community,
    Analytics,
    Settings,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => "/",
            Route::SignIn => "/signin",
            Route::CreateFarm => "/(main)/create-farm",
            Route::Dashboard => "/(main)/dashboard",
            Route::MethodSelection => "/MethodSelection",
            Route::Camera => "/(main)/camera",
            Route::SensorEntry => "/components/EnhancedDataEntryForm",
            Route::CropRecommendation => "/CropRecommendation",
            Route::SoilDetection => "/SoilDetection",
            Route::Weather => "/(main)/weather",
            Route::Community => "/community",
            Route::Analytics => "/analytics",
            Route::Settings => "/settings",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Screen routing as seen by the workflow code.
pub trait Navigator: Send + Sync {
    fn push(&self, route: Route);

    /// Pop the current screen. Returns `false` when there is nothing to pop.
    fn back(&self) -> bool;

    fn can_go_back(&self) -> bool;

    /// Swap the current screen without growing the history.
    fn replace(&self, route: Route);
}

/// Back out of a screen, falling back to the welcome screen when there is no
/// history to return to.
pub fn leave_screen(navigator: &dyn Navigator) {
    if navigator.can_go_back() {
        navigator.back();
    } else {
        navigator.replace(Route::Welcome);
    }
}

/// In-memory history stack.
pub struct RouteStack {
    history: Mutex<Vec<Route>>,
}

impl RouteStack {
    pub fn new(initial: Route) -> Self {
        Self {
            history: Mutex::new(vec![initial]),
        }
    }

    fn history(&self) -> MutexGuard<'_, Vec<Route>> {
        match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn current(&self) -> Option<Route> {
        self.history().last().copied()
    }

    pub fn depth(&self) -> usize {
        self.history().len()
    }

    pub fn snapshot(&self) -> Vec<Route> {
        self.history().clone()
    }
}

impl Default for RouteStack {
    fn default() -> Self {
        Self::new(Route::Welcome)
    }
}

impl Navigator for RouteStack {
    fn push(&self, route: Route) {
        log::debug!("navigate -> {}", route);
        self.history().push(route);
    }

    fn back(&self) -> bool {
        let mut history = self.history();
        if history.len() > 1 {
            let left = history.pop();
            log::debug!("navigate back from {:?}", left);
            true
        } else {
            false
        }
    }

    fn can_go_back(&self) -> bool {
        self.history().len() > 1
    }

    fn replace(&self, route: Route) {
        let mut history = self.history();
        history.pop();
        history.push(route);
    }
}

/// Analysis method picker. At most one method is selected at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodSelection {
    selected: Option<AnalysisMethod>,
}

impl MethodSelection {
    pub fn select(&mut self, method: AnalysisMethod) {
        self.selected = Some(method);
    }

    pub fn selected(&self) -> Option<AnalysisMethod> {
        self.selected
    }

    pub fn next_route(&self) -> Option<Route> {
        match self.selected? {
            AnalysisMethod::Camera => Some(Route::Camera),
            AnalysisMethod::Sensor => Some(Route::SensorEntry),
        }
    }

    /// Push the screen for the selected method. Does nothing when no method
    /// is selected.
    pub fn proceed(&self, navigator: &dyn Navigator) -> Option<Route> {
        let route = self.next_route()?;
        navigator.push(route);
        Some(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_push_back_replace() {
        let stack = RouteStack::default();
        assert!(!stack.can_go_back());
        assert!(!stack.back());

        stack.push(Route::SignIn);
        stack.push(Route::Dashboard);
        assert_eq!(stack.depth(), 3);
        assert!(stack.back());
        assert_eq!(stack.current(), Some(Route::SignIn));

        stack.replace(Route::Dashboard);
        assert_eq!(stack.snapshot(), vec![Route::Welcome, Route::Dashboard]);
    }

    #[test]
    fn leaving_without_history_returns_home() {
        let stack = RouteStack::new(Route::SignIn);
        leave_screen(&stack);
        assert_eq!(stack.snapshot(), vec![Route::Welcome]);

        stack.push(Route::Camera);
        leave_screen(&stack);
        assert_eq!(stack.current(), Some(Route::Welcome));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn method_selection_is_exclusive() {
        let stack = RouteStack::default();
        let mut selection = MethodSelection::default();
        assert_eq!(selection.proceed(&stack), None);
        assert_eq!(stack.depth(), 1);

        selection.select(AnalysisMethod::Sensor);
        selection.select(AnalysisMethod::Camera);
        assert_eq!(selection.selected(), Some(AnalysisMethod::Camera));
        assert_eq!(selection.proceed(&stack), Some(Route::Camera));
        assert_eq!(stack.current(), Some(Route::Camera));
    }
}
