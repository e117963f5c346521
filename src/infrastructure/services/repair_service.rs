//! Repair session orchestration
//!
//! One session runs cache lookup, the trivially-simple fast path, then the
//! test -> classify -> fix -> regenerate loop until the engine accepts the
//! document, attempts run out, or the session deadline passes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

use crate::config::RepairConfig;
use crate::domain::repair::is_trivially_simple;
use crate::domain::{
    extract_document, AttemptRecord, AttemptStatus, CacheKey, CacheStats, ConformanceTester,
    ConformanceTransport, DomainError, ErrorClassification, ErrorClassifier, FixReport, Fixer,
    RepairCache, RepairOptions, RepairOutcome, StructuralValidator, ValidationOptions,
    ValidationResult, WorkflowDocument, WorkflowGenerator,
};
use crate::infrastructure::observability::{
    record_cache_lookup, record_classification, record_conformance_test, record_repair_session,
};

const NO_ATTEMPTS_ALLOWED: &str = "Attempt budget is zero; conformance testing was not run";

const REJECTED_WITHOUT_MESSAGE: &str = "Workflow rejected by engine without an error message";

/// Loop state carried across attempts
struct Session {
    current: WorkflowDocument,
    history: Vec<AttemptRecord>,
    suggestions: Vec<String>,
    attempts: u32,
    success: bool,
    validated: bool,
    last_error: Option<String>,
}

impl Session {
    fn new(document: WorkflowDocument) -> Self {
        Self {
            current: document,
            history: Vec::new(),
            suggestions: Vec::new(),
            attempts: 0,
            success: false,
            validated: false,
            last_error: None,
        }
    }

    fn suggest(&mut self, suggestions: Vec<String>) {
        for suggestion in suggestions {
            if !self.suggestions.contains(&suggestion) {
                self.suggestions.push(suggestion);
            }
        }
    }

    fn time_out(&mut self, started: Instant) {
        let record = AttemptRecord::new(self.attempts, AttemptStatus::TimedOut)
            .with_error("Repair session timed out")
            .with_duration(started.elapsed());
        self.history.push(record);
        self.last_error = Some("Repair session timed out".to_string());
    }
}

/// Validation, fixing and repair sessions over injected collaborators
pub struct RepairService {
    cache: Arc<dyn RepairCache>,
    tester: Arc<dyn ConformanceTester>,
    generator: Option<Arc<dyn WorkflowGenerator>>,
    classifier: ErrorClassifier,
    fixer: Fixer,
    validator: StructuralValidator,
    config: RepairConfig,
}

impl std::fmt::Debug for RepairService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepairService")
            .field("cache", &self.cache)
            .field("transport", &self.tester.transport())
            .field("generator", &self.generator_name())
            .field("config", &self.config)
            .finish()
    }
}

impl RepairService {
    pub fn new(
        cache: Arc<dyn RepairCache>,
        tester: Arc<dyn ConformanceTester>,
        config: RepairConfig,
    ) -> Self {
        Self {
            cache,
            tester,
            generator: None,
            classifier: ErrorClassifier::new(),
            fixer: Fixer::new(),
            validator: StructuralValidator::new(),
            config,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn WorkflowGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn transport(&self) -> ConformanceTransport {
        self.tester.transport()
    }

    pub fn generator_name(&self) -> Option<&'static str> {
        self.generator.as_ref().map(|generator| generator.name())
    }

    /// Options seeded from configuration
    pub fn default_options(&self) -> RepairOptions {
        RepairOptions::default()
            .with_max_attempts(self.config.max_attempts)
            .with_timeout(self.config.session_timeout())
    }

    pub fn validate(&self, input: &Value, options: &ValidationOptions) -> ValidationResult {
        self.validator.validate(input, options)
    }

    pub fn fix(&self, document: WorkflowDocument) -> FixReport {
        self.fixer.fix(document)
    }

    pub fn classify(&self, raw_error: &str) -> ErrorClassification {
        let classification = self.classifier.classify(raw_error);
        record_classification(classification.kind.as_str());
        classification
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) -> Result<(), DomainError> {
        self.cache.clear().await?;
        info!("Repair cache cleared");
        Ok(())
    }

    /// Run one repair session; never fails, the outcome reports what is
    /// still wrong
    #[instrument(skip_all, fields(key = tracing::field::Empty, transport = %self.tester.transport()))]
    pub async fn repair(
        &self,
        document: WorkflowDocument,
        prompt: &str,
        options: RepairOptions,
    ) -> RepairOutcome {
        let started = Instant::now();
        let key = CacheKey::for_document(&document);
        tracing::Span::current().record("key", tracing::field::display(&key));

        if !options.bypass_cache {
            if let Some(outcome) = self.lookup(&key).await {
                record_repair_session("cached", outcome.attempts, started.elapsed());
                return outcome;
            }
        }

        if self.config.fast_path_enabled && is_trivially_simple(&document) {
            info!("Trivially simple workflow; skipping conformance testing");
            let outcome = self.fast_path(document);
            record_repair_session("fast_path", 0, started.elapsed());
            return outcome;
        }

        let deadline = started + options.timeout.unwrap_or_else(|| self.config.session_timeout());
        let max_attempts = options.max_attempts;
        let mut session = Session::new(document);
        if max_attempts == 0 {
            session.last_error = Some(NO_ATTEMPTS_ALLOWED.to_string());
        }

        while session.attempts < max_attempts {
            session.attempts += 1;
            if !self.run_attempt(&mut session, prompt, max_attempts, deadline).await {
                break;
            }
        }

        let outcome = self.finish(session);

        let label = if outcome.success {
            "success"
        } else if outcome.timed_out() {
            "timed_out"
        } else {
            "exhausted"
        };
        info!(
            outcome = label,
            attempts = outcome.attempts,
            duration_ms = started.elapsed().as_millis() as u64,
            "Repair session finished"
        );
        record_repair_session(label, outcome.attempts, started.elapsed());

        let cacheable = outcome.attempts > 0
            && !outcome.timed_out()
            && (outcome.success || self.config.cache_exhausted);
        if cacheable {
            if let Err(e) = self.cache.set(key, outcome.clone()).await {
                warn!(error = %e, "Failed to cache repair outcome");
            }
        }

        outcome
    }

    async fn lookup(&self, key: &CacheKey) -> Option<RepairOutcome> {
        match self.cache.get(key).await {
            Ok(Some(entry)) => {
                record_cache_lookup(true);
                debug!("Repair cache hit");
                let mut outcome = entry.result;
                outcome.from_cache = true;
                Some(outcome)
            }
            Ok(None) => {
                record_cache_lookup(false);
                None
            }
            Err(e) => {
                warn!(error = %e, "Repair cache lookup failed; continuing without cache");
                None
            }
        }
    }

    fn fast_path(&self, document: WorkflowDocument) -> RepairOutcome {
        let report = self.fixer.fix(document);
        let validation = self
            .validator
            .validate_document(&report.workflow, &ValidationOptions::default());

        RepairOutcome {
            success: true,
            workflow: report.workflow,
            attempts: 0,
            history: Vec::new(),
            validated: false,
            last_error: None,
            suggestions: report.suggestions,
            from_cache: false,
            validation: Some(validation),
        }
    }

    /// One test/classify/fix/regenerate round; `false` ends the loop
    async fn run_attempt(
        &self,
        session: &mut Session,
        prompt: &str,
        max_attempts: u32,
        deadline: Instant,
    ) -> bool {
        let attempt = session.attempts;
        let started = Instant::now();
        let transport = self.tester.transport().as_str();

        let result = match timeout_at(deadline, self.tester.test(&session.current)).await {
            Err(_) => {
                warn!(attempt, "Conformance test hit the session deadline");
                record_conformance_test(transport, "timed_out", started.elapsed());
                session.time_out(started);
                return false;
            }
            Ok(Err(e)) => {
                warn!(attempt, error = %e, "Conformance tester failed to reach the engine");
                record_conformance_test(transport, "error", started.elapsed());
                let error = e.to_string();
                let record = AttemptRecord::new(attempt, AttemptStatus::ValidationError)
                    .with_error(error.clone())
                    .with_classification(self.classify(&error))
                    .with_duration(started.elapsed());
                session.history.push(record);
                session.last_error = Some(error);
                return true;
            }
            Ok(Ok(result)) => result,
        };

        if result.success {
            record_conformance_test(transport, "passed", started.elapsed());
            debug!(attempt, skipped = result.is_skipped(), "Workflow accepted");
            session
                .history
                .push(AttemptRecord::new(attempt, AttemptStatus::Success).with_duration(started.elapsed()));
            session.success = true;
            session.validated = !result.is_skipped();
            session.last_error = None;
            return false;
        }

        record_conformance_test(transport, "failed", started.elapsed());
        let error = result
            .error
            .unwrap_or_else(|| REJECTED_WITHOUT_MESSAGE.to_string());
        let classification = self.classify(&error);
        info!(
            attempt,
            kind = %classification.kind,
            strategy = %classification.fix_strategy,
            "Workflow rejected"
        );

        let current = std::mem::replace(&mut session.current, WorkflowDocument::default());
        let report = self.fixer.fix_with(current, &classification);
        session.current = report.workflow;
        session.suggest(report.suggestions);

        let mut record = AttemptRecord::new(attempt, AttemptStatus::Failed)
            .with_error(error.clone())
            .with_classification(classification.clone());
        record.fixes_applied = report.applied;
        session.last_error = Some(error);

        let mut keep_going = true;
        if attempt < max_attempts {
            match self.regenerate(session, prompt, &classification, deadline).await {
                Some(regenerated) => record.regenerated = regenerated,
                None => keep_going = false,
            }
        }

        session.history.push(record.with_duration(started.elapsed()));
        if !keep_going {
            session.time_out(started);
        }
        keep_going
    }

    /// Best-effort regeneration; `None` means the deadline passed
    async fn regenerate(
        &self,
        session: &mut Session,
        prompt: &str,
        classification: &ErrorClassification,
        deadline: Instant,
    ) -> Option<bool> {
        let Some(generator) = &self.generator else {
            return Some(false);
        };

        let text = match timeout_at(
            deadline,
            generator.regenerate(&session.current, prompt, classification),
        )
        .await
        {
            Err(_) => {
                warn!(generator = generator.name(), "Regeneration hit the session deadline");
                return None;
            }
            Ok(Err(e)) => {
                warn!(generator = generator.name(), error = %e, "Regeneration failed; keeping fixed document");
                return Some(false);
            }
            Ok(Ok(text)) => text,
        };

        match extract_document(&text) {
            Ok(document) => {
                let report = self.fixer.fix(document);
                session.current = report.workflow;
                session.suggest(report.suggestions);
                debug!(generator = generator.name(), "Adopted regenerated document");
                Some(true)
            }
            Err(e) => {
                debug!(error = %e, "Regenerated output did not parse; keeping fixed document");
                Some(false)
            }
        }
    }

    fn finish(&self, session: Session) -> RepairOutcome {
        let mut suggestions = RepairOutcome::collect_hints(&session.history);
        for suggestion in session.suggestions {
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }

        let validation = self
            .validator
            .validate_document(&session.current, &ValidationOptions::default());

        RepairOutcome {
            success: session.success,
            workflow: session.current,
            attempts: session.attempts,
            history: session.history,
            validated: session.validated,
            last_error: session.last_error,
            suggestions,
            from_cache: false,
            validation: Some(validation),
        }
    }
}

/// Session deadline from a caller-supplied number of seconds
pub fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.filter(|secs| *secs > 0).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::MockRepairCache;
    use crate::domain::conformance::MockConformanceTester;
    use crate::domain::generator::MockWorkflowGenerator;
    use crate::domain::classifier::ErrorPattern;
    use crate::domain::{ConformanceResult, ErrorKind, FixStrategy};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn complex_document() -> WorkflowDocument {
        WorkflowDocument::from_value(json!({
            "name": "Orders",
            "nodes": [
                {"id": "1", "name": "Hook", "type": "n8n-nodes-base.webhook", "typeVersion": 2,
                 "position": [0, 0], "parameters": {"path": "orders", "httpMethod": "POST"}},
                {"id": "2", "name": "Check", "type": "n8n-nodes-base.if", "typeVersion": 2,
                 "position": [200, 0], "parameters": {"conditions": {"conditions": [], "combinator": "and"}}},
                {"id": "3", "name": "Notify", "type": "n8n-nodes-base.slack", "typeVersion": 2.2,
                 "position": [400, 0], "parameters": {"text": "={{ $json.total }}"}}
            ],
            "connections": {
                "Hook": {"main": [[{"node": "Check", "type": "main", "index": 0}]]},
                "Check": {"main": [[{"node": "Notify", "type": "main", "index": 0}]]}
            },
            "settings": {"executionOrder": "v1"}
        }))
        .unwrap()
    }

    fn simple_document() -> WorkflowDocument {
        WorkflowDocument::from_value(json!({
            "name": "Ping",
            "nodes": [
                {"id": "1", "name": "Start", "type": "n8n-nodes-base.manualTrigger", "typeVersion": 1,
                 "position": [0, 0], "parameters": {}}
            ],
            "connections": {}
        }))
        .unwrap()
    }

    fn failing_tester(times: usize) -> MockConformanceTester {
        let mut tester = MockConformanceTester::new();
        tester
            .expect_test()
            .times(times)
            .returning(|_| Ok(ConformanceResult::failed("Something unexpected happened")));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::ManagementApi);
        tester
    }

    fn service(cache: Arc<MockRepairCache>, tester: impl ConformanceTester + 'static) -> RepairService {
        RepairService::new(cache, Arc::new(tester), RepairConfig::default())
    }

    #[tokio::test]
    async fn test_always_failing_tester_exhausts_attempts() {
        let cache = Arc::new(MockRepairCache::new());
        let service = service(cache.clone(), failing_tester(3));

        let outcome = service
            .repair(complex_document(), "notify on orders", RepairOptions::default().with_max_attempts(3))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.history.len(), 3);
        assert!(outcome.history.iter().all(|r| r.status == AttemptStatus::Failed));
        assert_eq!(outcome.last_error.as_deref(), Some("Something unexpected happened"));
        assert!(!outcome.suggestions.is_empty());
        assert!(outcome.validation.is_some());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_zero_attempt_budget_never_calls_tester() {
        let cache = Arc::new(MockRepairCache::new());
        let config = RepairConfig {
            fast_path_enabled: false,
            cache_exhausted: true,
            ..RepairConfig::default()
        };
        let service = RepairService::new(cache.clone(), Arc::new(failing_tester(0)), config);

        let outcome = service
            .repair(simple_document(), "", RepairOptions::default().with_max_attempts(0))
            .await;

        assert!(!outcome.success);
        assert!(!outcome.validated);
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.history.is_empty());
        assert_eq!(outcome.last_error.as_deref(), Some(NO_ATTEMPTS_ALLOWED));
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_success_is_cached_and_hit_skips_tester() {
        let cache = Arc::new(MockRepairCache::new());

        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(1).returning(|_| Ok(ConformanceResult::passed()));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Webhook);
        let service = service(cache.clone(), tester);

        let first = service
            .repair(complex_document(), "", RepairOptions::default())
            .await;
        assert!(first.success);
        assert!(first.validated);
        assert_eq!(first.attempts, 1);
        assert!(!first.from_cache);
        assert_eq!(cache.len(), 1);

        // The mock allows exactly one test call
        let second = service
            .repair(complex_document(), "", RepairOptions::default())
            .await;
        assert!(second.success);
        assert!(second.from_cache);
        assert_eq!(service.cache_stats().await.hits, 1);
    }

    #[tokio::test]
    async fn test_bypass_cache_runs_tester() {
        let cache = Arc::new(MockRepairCache::new());
        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(2).returning(|_| Ok(ConformanceResult::passed()));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Webhook);
        let service = service(cache, tester);

        service.repair(complex_document(), "", RepairOptions::default()).await;
        let outcome = service
            .repair(complex_document(), "", RepairOptions::default().with_bypass_cache(true))
            .await;

        assert!(!outcome.from_cache);
    }

    #[tokio::test]
    async fn test_fast_path_skips_tester_and_cache_write() {
        let cache = Arc::new(MockRepairCache::new());
        let mut tester = MockConformanceTester::new();
        tester.expect_test().never();
        tester
            .expect_transport()
            .return_const(ConformanceTransport::ManagementApi);
        let service = service(cache.clone(), tester);

        let outcome = service
            .repair(simple_document(), "", RepairOptions::default())
            .await;

        assert!(outcome.success);
        assert!(!outcome.validated);
        assert_eq!(outcome.attempts, 0);
        assert!(outcome.history.is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_fast_path_can_be_disabled() {
        let cache = Arc::new(MockRepairCache::new());
        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(1).returning(|_| Ok(ConformanceResult::passed()));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::ManagementApi);

        let config = RepairConfig {
            fast_path_enabled: false,
            ..RepairConfig::default()
        };
        let service = RepairService::new(cache, Arc::new(tester), config);

        let outcome = service
            .repair(simple_document(), "", RepairOptions::default())
            .await;
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.validated);
    }

    #[tokio::test]
    async fn test_tester_errors_become_validation_error_entries() {
        let cache = Arc::new(MockRepairCache::new());
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(2).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(DomainError::provider("http", "connection refused"))
            } else {
                Ok(ConformanceResult::passed())
            }
        });
        tester
            .expect_transport()
            .return_const(ConformanceTransport::ManagementApi);
        let service = service(cache, tester);

        let outcome = service
            .repair(complex_document(), "", RepairOptions::default())
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.history[0].status, AttemptStatus::ValidationError);
        assert_eq!(outcome.history[1].status, AttemptStatus::Success);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_targeted_fix_applied_between_attempts() {
        let cache = Arc::new(MockRepairCache::new());
        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(2).returning(|document| {
            if document.raw_nodes().iter().any(|n| n["type"] == "n8n-nodes-base.gmailtrigger") {
                Ok(ConformanceResult::failed("Unknown node \"gmailtrigger\""))
            } else {
                Ok(ConformanceResult::passed())
            }
        });
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Webhook);
        let service = service(cache, tester);

        let mut value = complex_document().into_value();
        value["nodes"][0]["type"] = json!("n8n-nodes-base.gmailtrigger");
        let document = WorkflowDocument::from_value(value).unwrap();

        let outcome = service
            .repair(document, "", RepairOptions::default().with_bypass_cache(true))
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.history[0].status, AttemptStatus::Failed);
        assert!(!outcome.history[0].fixes_applied.is_empty());
        assert_eq!(outcome.workflow.raw_nodes()[0]["type"], "n8n-nodes-base.gmailTrigger");
    }

    #[tokio::test]
    async fn test_garbage_regeneration_keeps_fixed_document() {
        let cache = Arc::new(MockRepairCache::new());
        let mut generator = MockWorkflowGenerator::new();
        generator
            .expect_regenerate()
            .times(2)
            .returning(|_, _, _| Ok("I'm sorry, I cannot help with that.".to_string()));
        generator.expect_name().return_const("mock");

        let service = service(cache, failing_tester(3)).with_generator(Arc::new(generator));
        let outcome = service
            .repair(complex_document(), "prompt", RepairOptions::default())
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.history.iter().all(|r| !r.regenerated));
        assert_eq!(outcome.workflow.node_count(), 3);
    }

    #[tokio::test]
    async fn test_parsed_regeneration_is_adopted() {
        let cache = Arc::new(MockRepairCache::new());
        let mut generator = MockWorkflowGenerator::new();
        generator.expect_regenerate().times(1).returning(|_, _, _| {
            Ok("Here you go:\n```json\n{\"name\": \"Regenerated\", \"nodes\": [{\"id\": \"9\", \"name\": \"Go\", \"type\": \"n8n-nodes-base.manualTrigger\", \"typeVersion\": 1, \"position\": [0, 0], \"parameters\": {}}], \"connections\": {}}\n```".to_string())
        });
        generator.expect_name().return_const("mock");

        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(2).returning(|document| {
            if document.name() == Some("Regenerated") {
                Ok(ConformanceResult::passed())
            } else {
                Ok(ConformanceResult::failed("Something unexpected happened"))
            }
        });
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Webhook);

        let service = service(cache, tester).with_generator(Arc::new(generator));
        let outcome = service
            .repair(complex_document(), "prompt", RepairOptions::default())
            .await;

        assert!(outcome.success);
        assert!(outcome.history[0].regenerated);
        assert_eq!(outcome.workflow.name(), Some("Regenerated"));
    }

    #[derive(Debug)]
    struct SlowTester;

    #[async_trait]
    impl ConformanceTester for SlowTester {
        async fn test(&self, _document: &WorkflowDocument) -> Result<ConformanceResult, DomainError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ConformanceResult::passed())
        }

        fn transport(&self) -> ConformanceTransport {
            ConformanceTransport::Webhook
        }
    }

    #[tokio::test]
    async fn test_deadline_returns_best_document_uncached() {
        let cache = Arc::new(MockRepairCache::new());
        let service = service(cache.clone(), SlowTester);

        let outcome = service
            .repair(
                complex_document(),
                "",
                RepairOptions::default().with_timeout(Duration::from_millis(50)),
            )
            .await;

        assert!(!outcome.success);
        assert!(outcome.timed_out());
        assert_eq!(outcome.history.last().unwrap().status, AttemptStatus::TimedOut);
        assert_eq!(outcome.workflow.node_count(), 3);
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_sessions_cached_when_configured() {
        let cache = Arc::new(MockRepairCache::new());
        let config = RepairConfig {
            cache_exhausted: true,
            ..RepairConfig::default()
        };
        let service = RepairService::new(cache.clone(), Arc::new(failing_tester(1)), config);

        let outcome = service
            .repair(complex_document(), "", RepairOptions::default().with_max_attempts(1))
            .await;

        assert!(!outcome.success);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_failure_does_not_abort_session() {
        let cache = Arc::new(MockRepairCache::new().with_error("corrupt"));
        let mut tester = MockConformanceTester::new();
        tester.expect_test().times(1).returning(|_| Ok(ConformanceResult::passed()));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Webhook);
        let service = service(cache, tester);

        let outcome = service
            .repair(complex_document(), "", RepairOptions::default())
            .await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_skipped_testing_is_not_validated() {
        let cache = Arc::new(MockRepairCache::new());
        let mut tester = MockConformanceTester::new();
        tester
            .expect_test()
            .times(1)
            .returning(|_| Ok(ConformanceResult::skipped("no transport")));
        tester
            .expect_transport()
            .return_const(ConformanceTransport::Untested);
        let service = service(cache, tester);

        let outcome = service
            .repair(complex_document(), "", RepairOptions::default())
            .await;
        assert!(outcome.success);
        assert!(!outcome.validated);
    }

    #[test]
    fn test_custom_classifier_rows_take_priority() {
        let pattern = ErrorPattern::new(
            "quota exceeded",
            ErrorKind::Transport,
            FixStrategy::NoFix,
            "Retry later",
        )
        .unwrap();
        let service = service(Arc::new(MockRepairCache::new()), failing_tester(0))
            .with_classifier(ErrorClassifier::new().with_priority_pattern(pattern));

        let classification = service.classify("Workflow quota exceeded for project");
        assert_eq!(classification.kind, ErrorKind::Transport);
        assert_eq!(classification.hint, "Retry later");
    }

    #[test]
    fn test_timeout_from_secs() {
        assert_eq!(timeout_from_secs(Some(10)), Some(Duration::from_secs(10)));
        assert_eq!(timeout_from_secs(Some(0)), None);
        assert_eq!(timeout_from_secs(None), None);
    }
}
