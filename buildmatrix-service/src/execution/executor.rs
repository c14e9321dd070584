// Matrix Executor
// Orchestrates one run: expand, name, render, pack, and build every
// surviving combination in deterministic order, best effort across the matrix

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::packer::ContextPacker;
use crate::engine::runner::{BuildError, BuildRunner};
use crate::engine::BuildEngine;
use crate::error::{ServiceError, ServiceResult};
use crate::execution::events::{EventSender, ExecutionEvent, ProgressSender};
use crate::matrix::expander::MatrixExpander;
use crate::matrix::models::{Combination, Matrix, ResolvedOption};
use crate::template::render_build_definition;

/// Terminal state of one combination's build attempt
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Success,
    Failure(String),
}

impl BuildOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildOutcome::Success)
    }
}

/// One combination's attempt: image name plus outcome
#[derive(Debug, Clone)]
pub struct CombinationOutcome {
    pub combination: Combination,
    pub image: String,
    pub outcome: BuildOutcome,
}

/// Structured report of a completed matrix run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One entry per attempted combination, in combination order
    pub outcomes: Vec<CombinationOutcome>,
    /// Combinations dropped by the blacklist
    pub skipped: Vec<Combination>,
    pub duration: Duration,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_success())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// True when every attempted combination built
    pub fn success(&self) -> bool {
        self.failed() == 0
    }
}

/// Drives a full matrix run against an injected build engine.
///
/// Combinations are processed strictly one at a time; per-combination render,
/// pack, and build failures are reported and the run continues. Configuration
/// errors and engine transport errors abort the run.
pub struct MatrixExecutor {
    runner: BuildRunner,
    event_tx: Option<ProgressSender>,
}

impl MatrixExecutor {
    pub fn new(engine: Arc<dyn BuildEngine>) -> Self {
        Self {
            runner: BuildRunner::new(engine),
            event_tx: None,
        }
    }

    /// Set progress event sender
    pub fn with_progress(mut self, tx: ProgressSender) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// Execute every surviving combination of the matrix.
    ///
    /// Every combination is attempted and reported exactly once, in
    /// deterministic order; the returned report mirrors the event stream.
    pub async fn execute(
        &self,
        matrix: &Matrix,
        template_source: &str,
        base_dir: &Path,
        options: &[ResolvedOption],
    ) -> ServiceResult<RunReport> {
        let start = Instant::now();
        let expansion = MatrixExpander::expand(matrix);

        self.event_tx.send_event(ExecutionEvent::matrix_started(
            expansion.combinations.len(),
            expansion.blacklisted.len(),
        ));
        for combination in &expansion.blacklisted {
            self.event_tx
                .send_event(ExecutionEvent::combination_skipped(combination.clone()));
        }

        let packer = ContextPacker::new(base_dir);
        let total = expansion.combinations.len();
        let mut outcomes = Vec::with_capacity(total);

        for (index, combination) in expansion.combinations.iter().enumerate() {
            // A broken naming template is a matrix authoring bug: abort
            let image = MatrixExpander::image_name(combination, matrix)?;

            self.event_tx.send_event(ExecutionEvent::build_started(
                image.clone(),
                combination.clone(),
                index,
                total,
            ));

            let outcome = self
                .attempt(&packer, template_source, combination, options, &image)
                .await?;

            match &outcome {
                BuildOutcome::Success => self.event_tx.send_event(
                    ExecutionEvent::build_succeeded(image.clone(), combination.clone()),
                ),
                BuildOutcome::Failure(error) => self.event_tx.send_event(
                    ExecutionEvent::build_failed(image.clone(), combination.clone(), error.clone()),
                ),
            }

            outcomes.push(CombinationOutcome {
                combination: combination.clone(),
                image,
                outcome,
            });
        }

        let report = RunReport {
            outcomes,
            skipped: expansion.blacklisted,
            duration: start.elapsed(),
        };

        self.event_tx.send_event(ExecutionEvent::matrix_completed(
            report.succeeded(),
            report.failed(),
            report.duration,
        ));

        Ok(report)
    }

    /// Render, pack, and build one combination.
    ///
    /// Render and pack failures become per-combination outcomes, uniform
    /// with build failures. Only engine transport errors escape.
    async fn attempt(
        &self,
        packer: &ContextPacker,
        template_source: &str,
        combination: &Combination,
        options: &[ResolvedOption],
        image: &str,
    ) -> ServiceResult<BuildOutcome> {
        let rendered = match render_build_definition(template_source, combination, options) {
            Ok(rendered) => rendered,
            Err(e) => return Ok(BuildOutcome::Failure(e.to_string())),
        };

        let context = match packer.pack(&rendered, options) {
            Ok(context) => context,
            Err(e) => return Ok(BuildOutcome::Failure(e.to_string())),
        };

        match self.runner.build(context, image, &self.event_tx).await {
            Ok(()) => Ok(BuildOutcome::Success),
            Err(BuildError::Failed(message)) => Ok(BuildOutcome::Failure(message)),
            Err(BuildError::Engine(e)) => Err(ServiceError::Engine(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BuildEvent, BuildEventStream, EngineError};
    use crate::execution::events::progress_channel;
    use crate::matrix::models::{Axis, AxisValue};
    use crate::matrix::parser::MatrixParser;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Engine double replaying one scripted event sequence per build,
    /// recording submitted tags and contexts.
    struct ScriptedEngine {
        scripts: Mutex<Vec<Vec<Result<BuildEvent, EngineError>>>>,
        submissions: Mutex<Vec<(String, Vec<u8>)>>,
        connect_error: Option<String>,
    }

    impl ScriptedEngine {
        fn new(scripts: Vec<Vec<Result<BuildEvent, EngineError>>>) -> Self {
            Self {
                scripts: Mutex::new(scripts),
                submissions: Mutex::new(Vec::new()),
                connect_error: None,
            }
        }

        fn unreachable(message: &str) -> Self {
            Self {
                scripts: Mutex::new(Vec::new()),
                submissions: Mutex::new(Vec::new()),
                connect_error: Some(message.to_string()),
            }
        }

        fn submitted_tags(&self) -> Vec<String> {
            self.submissions
                .lock()
                .unwrap()
                .iter()
                .map(|(tag, _)| tag.clone())
                .collect()
        }
    }

    #[async_trait]
    impl BuildEngine for ScriptedEngine {
        async fn submit(
            &self,
            context: Vec<u8>,
            tag: &str,
        ) -> Result<BuildEventStream, EngineError> {
            if let Some(message) = &self.connect_error {
                return Err(EngineError::Connect(message.clone()));
            }
            self.submissions
                .lock()
                .unwrap()
                .push((tag.to_string(), context));
            let mut scripts = self.scripts.lock().unwrap();
            let events = if scripts.is_empty() {
                Vec::new()
            } else {
                scripts.remove(0)
            };
            Ok(Box::pin(tokio_stream::iter(events)))
        }
    }

    fn simple_matrix(values: &[&str]) -> Matrix {
        Matrix {
            axes: vec![Axis {
                name: "os".to_string(),
                values: values.iter().map(|v| AxisValue::from(*v)).collect(),
            }],
            blacklist: Vec::new(),
            image_id: "img-{os}".to_string(),
            image_name: "proj-{ID}".to_string(),
            options: Vec::new(),
        }
    }

    fn ok_script() -> Vec<Result<BuildEvent, EngineError>> {
        vec![Ok(BuildEvent::output("building\n"))]
    }

    #[tokio::test]
    async fn test_execute_end_to_end_two_combinations() {
        let base = TempDir::new().unwrap();
        std::fs::write(base.path().join("payload.txt"), "data").unwrap();

        let engine = Arc::new(ScriptedEngine::new(vec![ok_script(), ok_script()]));
        let executor = MatrixExecutor::new(engine.clone());

        let matrix = simple_matrix(&["a", "b"]);
        let report = executor
            .execute(&matrix, "FROM debian:{{ os }}\n", base.path(), &[])
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert!(report.success());

        let tags = engine.submitted_tags();
        assert_eq!(tags.len(), 2);
        assert_ne!(tags[0], tags[1]);
        assert!(tags.iter().all(|t| t.starts_with("proj-")));

        // the submitted context carries the rendered definition
        let submissions = engine.submissions.lock().unwrap();
        let mut archive = tar::Archive::new(&submissions[0].1[..]);
        let first = archive.entries().unwrap().next().unwrap().unwrap();
        assert_eq!(
            first.path().unwrap().to_string_lossy(),
            crate::context::packer::BUILD_DEFINITION_NAME
        );
    }

    #[tokio::test]
    async fn test_execute_continues_past_failed_build() {
        let base = TempDir::new().unwrap();

        let engine = Arc::new(ScriptedEngine::new(vec![
            ok_script(),
            vec![Ok(BuildEvent::error("step exploded"))],
            ok_script(),
        ]));
        let executor = MatrixExecutor::new(engine.clone());

        let matrix = simple_matrix(&["a", "b", "c"]);
        let report = executor
            .execute(&matrix, "FROM debian:{{ os }}\n", base.path(), &[])
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(
            report.outcomes[1].outcome,
            BuildOutcome::Failure("step exploded".to_string())
        );
        // order of reports matches combination order
        let rendered: Vec<String> = report
            .outcomes
            .iter()
            .map(|o| o.combination.to_string())
            .collect();
        assert_eq!(rendered, vec!["{os=a}", "{os=b}", "{os=c}"]);
    }

    #[tokio::test]
    async fn test_execute_render_failure_is_per_combination() {
        let base = TempDir::new().unwrap();

        let engine = Arc::new(ScriptedEngine::new(vec![ok_script(), ok_script()]));
        let executor = MatrixExecutor::new(engine.clone());

        // renders only for os=a; os=b hits an undefined variable
        let template = "{% if os == \"b\" %}{{ undefined_var }}{% endif %}FROM debian\n";
        let matrix = simple_matrix(&["a", "b", "c"]);
        let report = executor
            .execute(&matrix, template, base.path(), &[])
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert!(report.outcomes[0].outcome.is_success());
        assert!(matches!(
            report.outcomes[1].outcome,
            BuildOutcome::Failure(_)
        ));
        assert!(report.outcomes[2].outcome.is_success());
        // failed combination never reached the engine
        assert_eq!(engine.submitted_tags().len(), 2);
    }

    #[tokio::test]
    async fn test_execute_pack_failure_is_per_combination() {
        let engine = Arc::new(ScriptedEngine::new(Vec::new()));
        let executor = MatrixExecutor::new(engine.clone());

        let matrix = simple_matrix(&["a", "b"]);
        let report = executor
            .execute(
                &matrix,
                "FROM debian\n",
                Path::new("/nonexistent/base/dir"),
                &[],
            )
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failed(), 2);
        assert!(engine.submitted_tags().is_empty());
    }

    #[tokio::test]
    async fn test_execute_aborts_on_transport_error() {
        let base = TempDir::new().unwrap();

        let engine = Arc::new(ScriptedEngine::unreachable("daemon down"));
        let executor = MatrixExecutor::new(engine.clone());

        let matrix = simple_matrix(&["a", "b", "c"]);
        let err = executor
            .execute(&matrix, "FROM debian\n", base.path(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Engine(_)));
        // failed fast: only the first combination was attempted
        assert!(engine.submitted_tags().is_empty());
    }

    #[tokio::test]
    async fn test_execute_aborts_on_bad_name_template() {
        let base = TempDir::new().unwrap();

        let engine = Arc::new(ScriptedEngine::new(Vec::new()));
        let executor = MatrixExecutor::new(engine);

        let mut matrix = simple_matrix(&["a"]);
        matrix.image_name = "proj-{typo}".to_string();
        let err = executor
            .execute(&matrix, "FROM debian\n", base.path(), &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Config(_)));
    }

    #[tokio::test]
    async fn test_execute_reports_blacklisted_skips() {
        let base = TempDir::new().unwrap();

        let source = r#"
matrix:
  os: [a, b]
  py: ["2", "3"]
blacklist:
  - os: a
    py: "3"
image_id: "img-{os}-{py}"
image_name: "proj-{ID}"
"#;
        let matrix = MatrixParser::from_str(source).unwrap();

        let engine = Arc::new(ScriptedEngine::new(vec![
            ok_script(),
            ok_script(),
            ok_script(),
        ]));
        let executor = MatrixExecutor::new(engine.clone());
        let (tx, mut rx) = progress_channel();
        let executor = executor.with_progress(tx);

        let report = executor
            .execute(&matrix, "FROM debian\n", base.path(), &[])
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].to_string(), "{os=a, py=3}");

        let mut skip_events = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, ExecutionEvent::CombinationSkipped { .. }) {
                skip_events += 1;
            }
        }
        assert_eq!(skip_events, 1);
    }
}
