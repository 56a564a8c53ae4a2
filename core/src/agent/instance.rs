use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn, Span};

use super::directive::{parse_directive, Directive};
use super::prompt;
use super::stats::AgentStats;
use super::turn::{AgentRequest, Trace, TurnReport, TurnState};
use crate::config::AgentConfig;
use crate::llm::{CompletionRequest, ProviderAdapter, ProviderHub, ProviderKind};
use crate::normalize::{ResponseNormalizer, StructuredResponse};
use crate::secrets::Secrets;
use crate::tools::{native, schema, ToolContext, ToolRegistry};
use crate::verify::{VerificationResult, Verifier};
use crate::Result;

/// The orchestrator: one provider call to pick a tool, at most one tool call,
/// verification, then a structured response.
///
/// An `Agent` holds no per-turn state, so one instance can serve concurrent
/// turns behind an `Arc`.
pub struct Agent {
    registry: Arc<ToolRegistry>,
    providers: ProviderHub,
    verifier: Verifier,
    normalizer: ResponseNormalizer,
    env_secrets: Secrets,
    config: AgentConfig,
    stats: AgentStats,
}

impl Agent {
    /// Agent over an explicit registry and provider set. Environment secrets
    /// are read once here.
    pub fn new(registry: ToolRegistry, providers: ProviderHub, config: AgentConfig) -> Self {
        let verifier = Verifier::new(config.penalties);
        Self {
            registry: Arc::new(registry),
            providers,
            verifier,
            normalizer: ResponseNormalizer::new(),
            env_secrets: Secrets::from_env(),
            config,
            stats: AgentStats::default(),
        }
    }

    /// The built-in tools and all three HTTP providers
    pub fn from_config(config: AgentConfig) -> Result<Self> {
        let registry = native::default_registry(&config)?;
        let providers = ProviderHub::from_config(&config);
        info!(
            target: "agent",
            tools = registry.len(),
            default_provider = %config.default_provider,
            "Agent initialized"
        );
        Ok(Self::new(registry, providers, config))
    }

    /// Replace the environment-sourced secrets (request keys still win)
    pub fn with_secrets(mut self, secrets: Secrets) -> Self {
        self.env_secrets = secrets;
        self
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn providers(&self) -> &ProviderHub {
        &self.providers
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn stats(&self) -> &AgentStats {
        &self.stats
    }

    /// The Selecting-phase system prompt, without calling any provider
    pub fn system_prompt(&self) -> String {
        prompt::selection_system_prompt(&self.registry.describe_all())
    }

    /// Re-fetch a provider's model list using the turn's key precedence
    pub async fn refresh_models(
        &self,
        provider_id: &str,
        keys: &HashMap<String, String>,
    ) -> Result<Vec<String>> {
        let adapter = self.providers.resolve(provider_id)?;
        let secrets = self.env_secrets.merged(keys);
        let models = adapter
            .refresh_models(secrets.get(adapter.kind().key_name()))
            .await?;
        Ok(models)
    }

    /// Run one turn and return only its outcome
    pub async fn run(&self, request: AgentRequest) -> Result<StructuredResponse> {
        self.run_turn(request).await.outcome
    }

    /// Run one turn, keeping the state trace and the tool invocation
    #[tracing::instrument(
        name = "agent.turn",
        skip(self, request),
        fields(provider, model, tool)
    )]
    pub async fn run_turn(&self, request: AgentRequest) -> TurnReport {
        let started = Instant::now();
        self.stats.record_turn();
        let mut trace = Trace::start();

        let provider_id = request
            .provider_id
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| self.config.default_provider.clone());
        let adapter = match self.providers.resolve(&provider_id) {
            Ok(a) => a,
            Err(e) => {
                warn!(target: "agent", provider = %provider_id, error = %e, "Turn aborted");
                return trace.finish(None, Err(e));
            }
        };
        let secrets = self.env_secrets.merged(&request.keys);
        let model = self.resolve_model(&adapter, request.model_id.as_deref()).await;
        Span::current().record("provider", adapter.kind().id());
        Span::current().record("model", model.as_str());

        // Selecting
        trace.enter(TurnState::Selecting);
        let selection = CompletionRequest::new(self.system_prompt(), request.prompt.clone(), model.clone())
            .with_key(secrets.get(adapter.kind().key_name()).map(str::to_string));
        let reply = match adapter.complete(&selection).await {
            Ok(text) => text,
            Err(e) => {
                self.stats.record_provider_failure();
                warn!(target: "agent", provider = %adapter.kind(), error = %e, "Tool selection call failed");
                trace.enter(TurnState::Responding);
                let verification = self
                    .verifier
                    .unavailable(&format!("provider_error:{}", e.tag()), "The provider request failed");
                let response = self.normalizer.normalize(
                    None,
                    None,
                    prompt::provider_error_answer(adapter.kind().id(), &e),
                    verification,
                );
                return trace.finish(None, Ok(response));
            }
        };

        let directive = match parse_directive(&reply) {
            Ok(d) => d,
            Err(e) => {
                self.stats.record_malformed();
                warn!(target: "agent", error = %e, "Unparsable tool directive");
                return trace.finish(None, Err(e));
            }
        };

        let (tool_name, args) = match directive {
            Directive::Answer(text) => {
                debug!(target: "agent", "Provider answered without a tool");
                trace.enter(TurnState::Responding);
                let response = self.normalizer.normalize(
                    None,
                    None,
                    text,
                    VerificationResult::clean(),
                );
                return trace.finish(None, Ok(response));
            }
            Directive::Invoke { tool, args } => (tool, args),
        };
        Span::current().record("tool", tool_name.as_str());

        // Invoking
        trace.enter(TurnState::Invoking);
        let tool = match self.registry.get(&tool_name) {
            Ok(t) => t,
            Err(e) => {
                warn!(target: "agent", tool = %tool_name, "Provider chose an unregistered tool");
                return trace.finish(None, Err(e));
            }
        };

        let resolved_args = match schema::validate(&tool.input_schema(), &args) {
            Ok(a) => a,
            Err(e) => {
                info!(target: "agent", tool = %tool_name, error = %e, "Tool input rejected");
                trace.enter(TurnState::Responding);
                let verification = self
                    .verifier
                    .unavailable("invalid_tool_input", &format!("The {} tool was not run", tool_name));
                let response = self.normalizer.normalize(
                    Some(&tool_name),
                    None,
                    prompt::input_error_answer(&tool_name, &e),
                    verification,
                );
                return trace.finish(None, Ok(response));
            }
        };

        let ctx = ToolContext::new(secrets.clone());
        let invocation = match self.registry.invoke(&tool_name, resolved_args, &ctx).await {
            Ok(inv) => inv,
            Err(e) => return trace.finish(None, Err(e)),
        };
        self.stats
            .record_tool_call(&tool_name, invocation.raw_result.is_success());

        // Verifying
        trace.enter(TurnState::Verifying);
        let mut verification = self.verifier.verify(&invocation);

        // Responding
        trace.enter(TurnState::Responding);
        let text = if self.config.interpret_results {
            let (system, user) =
                prompt::interpretation_prompts(&request.prompt, &invocation, &verification);
            let interpret = CompletionRequest::new(system, user, model)
                .with_key(secrets.get(adapter.kind().key_name()).map(str::to_string));
            match adapter.complete(&interpret).await {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                Ok(_) => {
                    verification.add_flag("interpretation_unavailable");
                    prompt::fallback_answer(&invocation)
                }
                Err(e) => {
                    self.stats.record_provider_failure();
                    warn!(target: "agent", error = %e, "Interpretation call failed; using fallback text");
                    verification.add_flag("interpretation_unavailable");
                    prompt::fallback_answer(&invocation)
                }
            }
        } else {
            prompt::fallback_answer(&invocation)
        };

        let response = self.normalizer.normalize(
            Some(&invocation.tool_name),
            Some(&invocation.raw_result),
            text,
            verification,
        );
        info!(
            target: "agent",
            tool = %invocation.tool_name,
            success = invocation.raw_result.is_success(),
            confidence = response.verification.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Turn complete"
        );
        trace.finish(Some(invocation), Ok(response))
    }

    async fn resolve_model(&self, adapter: &ProviderAdapter, requested: Option<&str>) -> String {
        if let Some(m) = requested.map(str::trim).filter(|m| !m.is_empty()) {
            return m.to_string();
        }
        let default_kind = self.config.default_provider.parse::<ProviderKind>().ok();
        if default_kind == Some(adapter.kind()) {
            if let Some(m) = self.config.default_model.as_deref().filter(|m| !m.is_empty()) {
                return m.to_string();
            }
        }
        adapter.default_model().await.unwrap_or_default()
    }
}
