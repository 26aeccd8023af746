//! `ExecutionContext` — the stepper that walks a chosen order.
//!
//! ```text
//! NotStarted --start(order)--> Running(0) --advance--> Running(1) ... Running(n-1)
//!                                                                        |
//!                                                                     advance
//!                                                                        v
//!                                   AdvancePastCompletion <--advance-- Completed
//! ```
//!
//! The context holds a copy of the order taken at selection time. It does not
//! watch the graph; callers invalidate it when the topology changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use nodes::VariableMap;

use crate::EngineError;

/// Position of the stepper within its order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "index", rename_all = "snake_case")]
pub enum Cursor {
    #[default]
    NotStarted,
    /// Index of the current node.
    Running(usize),
    Completed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    order: Vec<String>,
    cursor: Cursor,
    /// Variables of the current run.
    local_variables: VariableMap,
    /// Variables shared by every run of the session.
    global_variables: VariableMap,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh context whose global scope starts with `globals`.
    pub fn with_globals(globals: VariableMap) -> Self {
        Self {
            global_variables: globals,
            ..Self::default()
        }
    }

    /// Begin a run over `order`. The cursor moves to `order[0]` and the local
    /// scope is cleared; the global scope is kept.
    ///
    /// # Errors
    /// - [`EngineError::EmptyOrder`] if `order` is empty.
    /// - [`EngineError::RunInProgress`] if a run is still active.
    pub fn start(&mut self, order: Vec<String>) -> Result<(), EngineError> {
        if order.is_empty() {
            return Err(EngineError::EmptyOrder);
        }
        if matches!(self.cursor, Cursor::Running(_)) {
            return Err(EngineError::RunInProgress);
        }

        debug!(?order, "execution started");
        self.order = order;
        self.cursor = Cursor::Running(0);
        self.local_variables.clear();
        Ok(())
    }

    /// Move to the next node. Returns the new current node, or `None` once the
    /// last node has been passed.
    ///
    /// # Errors
    /// - [`EngineError::ExecutionNotStarted`] before `start`.
    /// - [`EngineError::AdvancePastCompletion`] once completed; the cursor
    ///   is left unchanged.
    pub fn advance(&mut self) -> Result<Option<&str>, EngineError> {
        match self.cursor {
            Cursor::NotStarted => Err(EngineError::ExecutionNotStarted),
            Cursor::Completed => Err(EngineError::AdvancePastCompletion),
            Cursor::Running(index) if index + 1 < self.order.len() => {
                self.cursor = Cursor::Running(index + 1);
                debug!(node = %self.order[index + 1], "cursor advanced");
                Ok(Some(self.order[index + 1].as_str()))
            }
            Cursor::Running(_) => {
                self.cursor = Cursor::Completed;
                debug!("execution completed");
                Ok(None)
            }
        }
    }

    /// Drop the held order and return to `NotStarted`. Used when the graph the
    /// order came from has changed. Global variables survive.
    pub fn invalidate(&mut self) {
        self.order.clear();
        self.cursor = Cursor::NotStarted;
        self.local_variables.clear();
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn is_running(&self) -> bool {
        matches!(self.cursor, Cursor::Running(_))
    }

    pub fn is_completed(&self) -> bool {
        self.cursor == Cursor::Completed
    }

    /// Id of the node under the cursor, while running.
    pub fn current_node(&self) -> Option<&str> {
        match self.cursor {
            Cursor::Running(index) => self.order.get(index).map(String::as_str),
            _ => None,
        }
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.cursor {
            Cursor::Running(index) => Some(index),
            _ => None,
        }
    }

    /// The node immediately before `id` in the order.
    pub fn previous_node(&self, id: &str) -> Option<&str> {
        let index = self.order.iter().position(|n| n == id)?;
        index
            .checked_sub(1)
            .and_then(|prev| self.order.get(prev))
            .map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Variable scopes
    // -----------------------------------------------------------------------

    /// Set (or overwrite) a variable of the current run.
    pub fn set_local_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.local_variables.insert(name.into(), value.into());
    }

    /// Set (or overwrite) a variable shared across runs.
    pub fn set_global_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.global_variables.insert(name.into(), value.into());
    }

    pub fn local_variables(&self) -> &VariableMap {
        &self.local_variables
    }

    pub fn global_variables(&self) -> &VariableMap {
        &self.global_variables
    }

    /// Global variable names, sorted.
    pub fn global_variable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.global_variables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Substitute both scopes into `template` in a single pass. A local
    /// variable shadows a global one of the same name.
    pub fn render(&self, template: &str) -> String {
        let mut scope = self.global_variables.clone();
        scope.extend(
            self.local_variables
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        substitute(template, &scope)
    }
}

/// Replace every literal occurrence of each key of `scope` in `template` with
/// its value.
///
/// The template is scanned once, left to right. At each position keys are
/// tried longest first (ties in lexicographic order), so overlapping names
/// resolve the same way on every call. Inserted values are never re-scanned.
/// Empty keys are ignored.
pub fn substitute(template: &str, scope: &VariableMap) -> String {
    let mut keys: Vec<(&str, &str)> = scope
        .iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if keys.is_empty() {
        return template.to_owned();
    }
    keys.sort_unstable_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    'scan: while let Some(ch) = rest.chars().next() {
        for (key, value) in &keys {
            if let Some(after) = rest.strip_prefix(key) {
                out.push_str(value);
                rest = after;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn order(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn scope(pairs: &[(&str, &str)]) -> VariableMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn three_advances_complete_a_three_node_run() {
        let mut ctx = ExecutionContext::new();
        ctx.start(order(&["A", "B", "C"])).expect("non-empty order");
        assert_eq!(ctx.current_node(), Some("A"));

        assert_eq!(ctx.advance().expect("running"), Some("B"));
        assert_eq!(ctx.advance().expect("running"), Some("C"));
        assert_eq!(ctx.advance().expect("running"), None);
        assert!(ctx.is_completed());

        assert!(matches!(ctx.advance(), Err(EngineError::AdvancePastCompletion)));
        assert_eq!(ctx.cursor(), Cursor::Completed);
        assert_eq!(ctx.current_node(), None);
    }

    #[test]
    fn start_rejects_empty_order() {
        let mut ctx = ExecutionContext::new();
        assert!(matches!(ctx.start(Vec::new()), Err(EngineError::EmptyOrder)));
        assert_eq!(ctx.cursor(), Cursor::NotStarted);
    }

    #[test]
    fn advance_before_start_is_an_error() {
        let mut ctx = ExecutionContext::new();
        assert!(matches!(ctx.advance(), Err(EngineError::ExecutionNotStarted)));
    }

    #[test]
    fn start_while_running_is_rejected_but_allowed_after_completion() {
        let mut ctx = ExecutionContext::new();
        ctx.start(order(&["A"])).expect("start");
        assert!(matches!(ctx.start(order(&["B"])), Err(EngineError::RunInProgress)));

        ctx.advance().expect("complete");
        ctx.start(order(&["B"])).expect("new run after completion");
        assert_eq!(ctx.current_node(), Some("B"));
    }

    #[test]
    fn new_run_clears_locals_but_keeps_globals() {
        let mut ctx = ExecutionContext::with_globals(scope(&[("{user}", "ada")]));
        ctx.start(order(&["A"])).expect("start");
        ctx.set_local_variable("x", "1");
        ctx.set_global_variable("g", "2");
        ctx.advance().expect("complete");

        ctx.start(order(&["A"])).expect("restart");
        assert!(ctx.local_variables().is_empty());
        assert_eq!(ctx.global_variable_names(), vec!["g", "{user}"]);
    }

    #[test]
    fn invalidate_returns_to_not_started() {
        let mut ctx = ExecutionContext::new();
        ctx.start(order(&["A", "B"])).expect("start");
        ctx.set_local_variable("x", "1");
        ctx.set_global_variable("g", "2");

        ctx.invalidate();
        assert_eq!(ctx.cursor(), Cursor::NotStarted);
        assert!(ctx.order().is_empty());
        assert!(ctx.local_variables().is_empty());
        assert_eq!(ctx.global_variables().len(), 1);
    }

    #[test]
    fn overwriting_a_variable_replaces_it() {
        let mut ctx = ExecutionContext::new();
        ctx.set_local_variable("x", "1");
        ctx.set_local_variable("x", "2");
        assert_eq!(ctx.local_variables()["x"], "2");
    }

    #[test]
    fn previous_node_lookup() {
        let mut ctx = ExecutionContext::new();
        ctx.start(order(&["A", "B", "C"])).expect("start");
        assert_eq!(ctx.previous_node("C"), Some("B"));
        assert_eq!(ctx.previous_node("A"), None);
        assert_eq!(ctx.previous_node("Z"), None);
    }

    #[test]
    fn substitute_replaces_named_placeholder() {
        assert_eq!(
            substitute("Hello {name}", &scope(&[("{name}", "World")])),
            "Hello World"
        );
    }

    #[test]
    fn substitute_with_empty_scope_is_identity() {
        assert_eq!(substitute("Hello {name}", &VariableMap::new()), "Hello {name}");
    }

    #[test]
    fn substitute_replaces_every_occurrence() {
        assert_eq!(substitute("{a}-{a}-{a}", &scope(&[("{a}", "x")])), "x-x-x");
    }

    #[test]
    fn substitute_is_not_recursive() {
        let vars = scope(&[("{a}", "{b}"), ("{b}", "done")]);
        assert_eq!(substitute("{a} {b}", &vars), "{b} done");
    }

    #[test]
    fn substitute_prefers_longest_key() {
        let vars = scope(&[("ab", "1"), ("abc", "2"), ("", "never")]);
        assert_eq!(substitute("abcab", &vars), "21");
    }

    #[test]
    fn substitute_handles_multibyte_text() {
        assert_eq!(substitute("héllo {x} ✓", &scope(&[("{x}", "wörld")])), "héllo wörld ✓");
    }

    #[test]
    fn render_applies_local_then_global() {
        let mut ctx = ExecutionContext::new();
        ctx.set_local_variable("{topic}", "rust");
        ctx.set_global_variable("{tone}", "dry");
        ctx.set_global_variable("{topic}", "ignored");
        assert_eq!(ctx.render("{topic} in a {tone} voice"), "rust in a dry voice");
    }

    #[test]
    fn render_does_not_rescan_local_values_for_globals() {
        let mut ctx = ExecutionContext::new();
        ctx.set_local_variable("{a}", "{tone}");
        ctx.set_global_variable("{tone}", "dry");
        assert_eq!(ctx.render("{a}"), "{tone}");
        assert_eq!(ctx.render("{a} {tone}"), "{tone} dry");
    }
}
