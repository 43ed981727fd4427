//! Policy-enforcing entry points.
//!
//! The engine is what an agent runtime calls: `validate_query` before a
//! generated SELECT is executed, `resolve_tool` before a stored procedure is
//! invoked. Both look the context up, evaluate against its snapshot, and
//! record the outcome in the audit log.

use crate::registry::ContextRegistry;
use crate::{ContextError, Result};
use querygate_config::AppConfig;
use querygate_core::{StructuredQueryRequest, ToolInvocationRequest};
use querygate_policy::{SqlGuard, Verdict};
use querygate_security::{AuditEvent, AuditLogger, AuditOutcome, TracingSink};
use querygate_tools::{Resolution, ResolverOptions, ToolParameterResolver};
use std::sync::Arc;

/// Thread-safe facade over the context registry, the guard and the resolver.
#[derive(Debug)]
pub struct ContextEngine {
    registry: Arc<ContextRegistry>,
    resolver: ToolParameterResolver,
    audit: Option<Arc<AuditLogger>>,
}

impl ContextEngine {
    /// Create an engine over `registry` with default resolver options and
    /// no audit log.
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        Self {
            registry,
            resolver: ToolParameterResolver::default(),
            audit: None,
        }
    }

    /// Build an engine from application configuration, loading every
    /// context document from `contexts_dir`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = ContextRegistry::load_dir(&config.contexts_dir)?;
        let mut engine = Self::new(Arc::new(registry)).with_resolver(ResolverOptions {
            fallback_question: config.resolver.fallback_question.clone(),
        });
        if config.audit.enabled {
            let logger = AuditLogger::with_capacity(config.audit.max_entries)
                .with_sink(Box::new(TracingSink));
            engine = engine.with_audit(Arc::new(logger));
        }
        Ok(engine)
    }

    pub fn with_resolver(mut self, options: ResolverOptions) -> Self {
        self.resolver = ToolParameterResolver::new(options);
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn registry(&self) -> &Arc<ContextRegistry> {
        &self.registry
    }

    pub fn audit(&self) -> Option<&Arc<AuditLogger>> {
        self.audit.as_ref()
    }

    /// Validate a structured SELECT against the policy of `context`.
    ///
    /// `Err` means the request could not be evaluated at all (unknown
    /// context, or a context that does not run SQL). A policy denial is an
    /// `Ok(Verdict::Deny { .. })`.
    pub fn validate_query(
        &self,
        context: &str,
        request: &StructuredQueryRequest,
    ) -> Result<Verdict> {
        let ctx = self
            .registry
            .get(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        let policy = ctx
            .select_policy()
            .ok_or_else(|| ContextError::NoSqlPolicy(context.to_string()))?;

        let verdict = SqlGuard::validate(request, policy);

        match &verdict {
            Verdict::Allow { effective_limit } => self.record(
                AuditEvent::QueryAllowed {
                    effective_limit: *effective_limit,
                },
                context,
                &request.table,
                AuditOutcome::Success,
                None,
            ),
            Verdict::Deny { violation } => self.record(
                AuditEvent::QueryDenied {
                    kind: violation.kind(),
                },
                context,
                &request.table,
                AuditOutcome::Denied,
                Some(violation.to_string()),
            ),
        }
        Ok(verdict)
    }

    /// Resolve the parameters of a tool call in `context`.
    pub fn resolve_tool(
        &self,
        context: &str,
        request: &ToolInvocationRequest,
    ) -> Result<Resolution> {
        let ctx = self
            .registry
            .get(context)
            .ok_or_else(|| ContextError::UnknownContext(context.to_string()))?;
        let tool = ctx
            .tools
            .get(&request.tool_name)
            .ok_or_else(|| ContextError::UnknownTool {
                context: context.to_string(),
                tool: request.tool_name.clone(),
            })?;

        let resolution = self.resolver.resolve(tool, &request.arguments);

        match &resolution {
            Resolution::AllParametersResolved(_) => self.record(
                AuditEvent::ToolResolved,
                context,
                &request.tool_name,
                AuditOutcome::Success,
                None,
            ),
            Resolution::NeedsClarification(clarification) => self.record(
                AuditEvent::ClarificationRequested {
                    parameters: clarification
                        .missing_parameters()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                },
                context,
                &request.tool_name,
                AuditOutcome::Pending,
                None,
            ),
            Resolution::Rejected(rejection) => self.record(
                AuditEvent::ToolRejected,
                context,
                &request.tool_name,
                AuditOutcome::Denied,
                Some(rejection.error.to_string()),
            ),
        }
        Ok(resolution)
    }

    /// Reload context documents from disk. Returns the number loaded.
    pub fn reload(&self) -> Result<usize> {
        let count = self.registry.reload()?;
        self.record(
            AuditEvent::ContextReloaded { contexts: count },
            "*",
            "contexts",
            AuditOutcome::Success,
            None,
        );
        Ok(count)
    }

    fn record(
        &self,
        event: AuditEvent,
        context: &str,
        target: &str,
        outcome: AuditOutcome,
        details: Option<String>,
    ) {
        if let Some(audit) = &self.audit {
            audit.log(event, context, target, outcome, details);
        }
    }
}
