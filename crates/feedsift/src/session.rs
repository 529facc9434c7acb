//! Interactive filtering over one already-fetched item set.
//!
//! A [`Session`] keeps an append-only history of expressions and their match
//! counts. Each submission compiles and evaluates synchronously; earlier
//! entries are never touched again.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use feedsift_expr::{CompileError, Environment, EvaluationError, Item, Program};

use crate::pipeline::{
    outcomes, ErrorAction, EvaluationErrorHandler, LogAndExclude, Outcome, MATCH_ALL,
};

/// Summary recorded for an expression that failed to compile.
pub const COMPILE_FAILED: &str = "Error: compile failed";

/// One submitted expression.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub expression: String,
    /// `None` if the expression did not compile.
    pub program: Option<Program>,
    /// `"<n> matches"`, with an error count when items faulted, or
    /// [`COMPILE_FAILED`].
    pub summary: String,
    /// `None` if the expression did not compile or evaluation was aborted.
    pub matches: Option<usize>,
    /// Items whose evaluation faulted.
    pub errors: usize,
    pub compile_error: Option<CompileError>,
}

impl HistoryEntry {
    pub fn compiled(&self) -> bool {
        self.program.is_some()
    }
}

/// Which view the console is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Summary,
    /// Per-item results for the selected history entry.
    Detail,
    /// Declared variables and fields.
    Schema,
}

/// A console input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(String),
    ToggleDetail,
    ToggleSchema,
    Select(usize),
    History,
    Quit,
    Nothing,
}

impl Command {
    /// Parses one line. Lines starting with `:` are commands; anything else
    /// is an expression.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown commands or a bad `:select` index.
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return Ok(if line.is_empty() {
                Command::Nothing
            } else {
                Command::Submit(line.to_string())
            });
        };

        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("detail" | "d"), None) => Ok(Command::ToggleDetail),
            (Some("schema" | "s"), None) => Ok(Command::ToggleSchema),
            (Some("history" | "h"), None) => Ok(Command::History),
            (Some("quit" | "q"), None) => Ok(Command::Quit),
            (Some("select"), Some(index)) => index
                .parse()
                .map(Command::Select)
                .map_err(|_| format!("invalid history index '{}'", index)),
            _ => Err(format!(
                "unknown command ':{}' (try :detail, :schema, :select N, :history, :quit)",
                command
            )),
        }
    }
}

/// Keeps faults as outcomes without reporting them again.
struct KeepFaults;

impl EvaluationErrorHandler for KeepFaults {
    fn handle(&self, _error: &EvaluationError) -> ErrorAction {
        ErrorAction::Exclude
    }
}

/// Interactive session state.
pub struct Session {
    env: Arc<Environment>,
    items: Vec<Item>,
    handler: Arc<dyn EvaluationErrorHandler>,
    history: Vec<HistoryEntry>,
    selected: usize,
    view: View,
}

impl Session {
    /// Starts a session whose history holds the match-all expression.
    /// Faulting items are logged and excluded.
    pub fn new(env: Arc<Environment>, items: Vec<Item>) -> Self {
        Self::with_error_handler(env, items, Arc::new(LogAndExclude))
    }

    /// Like [`Session::new`], with the handler that decides the fate of
    /// faulting items on each submission.
    pub fn with_error_handler(
        env: Arc<Environment>,
        items: Vec<Item>,
        handler: Arc<dyn EvaluationErrorHandler>,
    ) -> Self {
        let mut session = Self {
            env,
            items,
            handler,
            history: Vec::new(),
            selected: 0,
            view: View::Summary,
        };
        session.submit(MATCH_ALL);
        session
    }

    pub fn environment(&self) -> &Environment {
        &self.env
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&HistoryEntry> {
        self.history.get(self.selected)
    }

    /// Compiles and evaluates `expression` over every item, appends the
    /// result and selects it.
    pub fn submit(&mut self, expression: &str) -> &HistoryEntry {
        self.submit_at(expression, Utc::now())
    }

    /// Like [`Session::submit`], with an explicit `now`.
    pub fn submit_at(&mut self, expression: &str, now: DateTime<Utc>) -> &HistoryEntry {
        let entry = match self.env.compile(expression) {
            Ok(program) => {
                let (summary, matches, errors) =
                    match outcomes(&program, &self.items, now, self.handler.as_ref()) {
                        Ok(outcomes) => {
                            let mut matches = 0;
                            let mut errors = 0;
                            for (_, outcome) in &outcomes {
                                match outcome {
                                    Outcome::Included => matches += 1,
                                    Outcome::Excluded => {}
                                    Outcome::Failed(_) => errors += 1,
                                }
                            }
                            let summary = if errors == 0 {
                                format!("{} matches", matches)
                            } else {
                                format!("{} matches, {} errors", matches, errors)
                            };
                            (summary, Some(matches), errors)
                        }
                        Err(error) => (format!("Error: {}", error), None, 1),
                    };
                HistoryEntry {
                    expression: expression.to_string(),
                    program: Some(program),
                    summary,
                    matches,
                    errors,
                    compile_error: None,
                }
            }
            Err(error) => HistoryEntry {
                expression: expression.to_string(),
                program: None,
                summary: COMPILE_FAILED.to_string(),
                matches: None,
                errors: 0,
                compile_error: Some(error),
            },
        };

        self.history.push(entry);
        self.selected = self.history.len() - 1;
        self.view = View::Summary;
        &self.history[self.selected]
    }

    /// Selects a history entry. Returns false if `index` is out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.history.len() {
            self.selected = index;
            true
        } else {
            false
        }
    }

    pub fn toggle_detail(&mut self) {
        self.view = match self.view {
            View::Detail => View::Summary,
            _ => View::Detail,
        };
    }

    pub fn toggle_schema(&mut self) {
        self.view = match self.view {
            View::Schema => View::Summary,
            _ => View::Schema,
        };
    }

    /// Per-item outcomes for the selected entry, in item order.
    ///
    /// Returns `None` if the selected expression did not compile.
    pub fn detail(&self, now: DateTime<Utc>) -> Option<Vec<(&Item, Outcome)>> {
        let program = self.selected()?.program.as_ref()?;
        outcomes(program, &self.items, now, &KeepFaults).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::AbortOnError;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingHandler(AtomicUsize);

    impl EvaluationErrorHandler for CountingHandler {
        fn handle(&self, _error: &EvaluationError) -> ErrorAction {
            self.0.fetch_add(1, Ordering::SeqCst);
            ErrorAction::Exclude
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn session() -> Session {
        let items = vec![
            Item::builder("https://example.com/go")
                .title("Go is great")
                .build(),
            Item::builder("https://example.com/rust")
                .title("Rust is safe")
                .author("Ferris")
                .build(),
            Item::builder("https://example.com/untitled").build(),
        ];
        Session::new(Arc::new(Environment::new().unwrap()), items)
    }

    #[test]
    fn test_history_starts_with_match_all() {
        let session = session();
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].expression, "true");
        assert_eq!(session.history()[0].summary, "3 matches");
    }

    #[test]
    fn test_submit_appends_and_selects() {
        let mut session = session();
        let entry = session.submit_at(r#"item.Title.contains("Rust")"#, now());
        assert_eq!(entry.summary, "1 matches");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.selected_index(), 1);
    }

    #[test]
    fn test_evaluation_errors_do_not_count_as_matches() {
        let mut session = session();
        let entry = session.submit_at(r#"!item.Title.contains("Go")"#, now());
        // The untitled item faults rather than matching.
        assert_eq!(entry.matches, Some(1));
        assert_eq!(entry.errors, 1);
        assert_eq!(entry.summary, "1 matches, 1 errors");
    }

    #[test]
    fn test_submissions_go_through_error_handler() {
        let handler = Arc::new(CountingHandler::default());
        let mut session = Session::with_error_handler(
            Arc::new(Environment::new().unwrap()),
            session().items().to_vec(),
            handler.clone(),
        );

        session.submit_at(r#"item.Author == "Ferris""#, now());
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);

        // Rendering the detail view does not report the faults again.
        session.detail(now()).unwrap();
        assert_eq!(handler.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_aborting_handler_records_error() {
        let mut session = Session::with_error_handler(
            Arc::new(Environment::new().unwrap()),
            session().items().to_vec(),
            Arc::new(AbortOnError),
        );

        let entry = session.submit_at(r#"item.Author == "Ferris""#, now());

        assert!(entry.compiled());
        assert_eq!(entry.matches, None);
        assert!(entry.summary.starts_with("Error: evaluation failed for item 'https://example.com/go'"));
    }

    #[test]
    fn test_compile_error_is_recorded() {
        let mut session = session();
        let entry = session.submit_at("item.Title ==", now());
        assert_eq!(entry.summary, COMPILE_FAILED);
        assert!(!entry.compiled());
        assert!(entry.compile_error.is_some());
    }

    #[test]
    fn test_prior_entries_are_not_mutated() {
        let mut session = session();
        session.submit_at(r#"item.Title.contains("Go")"#, now());
        let before = session.history()[1].summary.clone();
        session.submit_at("false", now());
        assert_eq!(session.history()[1].summary, before);
        assert_eq!(session.history()[2].summary, "0 matches");
    }

    #[test]
    fn test_select_bounds() {
        let mut session = session();
        assert!(session.select(0));
        assert!(!session.select(5));
        assert_eq!(session.selected_index(), 0);
    }

    #[test]
    fn test_toggle_views() {
        let mut session = session();
        assert_eq!(session.view(), View::Summary);
        session.toggle_detail();
        assert_eq!(session.view(), View::Detail);
        session.toggle_schema();
        assert_eq!(session.view(), View::Schema);
        session.toggle_schema();
        assert_eq!(session.view(), View::Summary);
        session.toggle_detail();
        session.submit_at("true", now());
        assert_eq!(session.view(), View::Summary);
    }

    #[test]
    fn test_detail_outcomes() {
        let mut session = session();
        session.submit_at(r#"item.Author == "Ferris""#, now());
        let detail = session.detail(now()).unwrap();
        assert_eq!(detail.len(), 3);
        assert!(matches!(detail[0].1, Outcome::Failed(_)));
        assert_eq!(detail[1].1, Outcome::Included);
    }

    #[test]
    fn test_detail_of_failed_compile_is_none() {
        let mut session = session();
        session.submit_at("(", now());
        assert!(session.detail(now()).is_none());
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse(":detail"), Ok(Command::ToggleDetail));
        assert_eq!(Command::parse(" :schema "), Ok(Command::ToggleSchema));
        assert_eq!(Command::parse(":select 2"), Ok(Command::Select(2)));
        assert_eq!(Command::parse(":history"), Ok(Command::History));
        assert_eq!(Command::parse(":q"), Ok(Command::Quit));
        assert_eq!(Command::parse(""), Ok(Command::Nothing));
        assert_eq!(
            Command::parse("item.URL != \"\""),
            Ok(Command::Submit("item.URL != \"\"".to_string()))
        );
        assert!(Command::parse(":select two").is_err());
        assert!(Command::parse(":frobnicate").is_err());
    }
}
