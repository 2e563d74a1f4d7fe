//! The set of agents an orchestrator runs.
//!
//! [`AgentRoster::with_defaults`] builds the five built-in agents around one
//! generator. The builder lets callers swap any of them, which is how tests
//! inject failing agents.

use super::{
    MarketAnalystAgent, PatentScoutAgent, ResearchAgent, SynthesisAgent, SynthesizerAgent,
    TechTrendAgent, VerificationAgent, VerifierAgent,
};
use crate::llm::ResilientGenerator;
use crate::types::{AppError, Result};
use std::sync::Arc;

/// Tunables for the built-in verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierSettings {
    pub max_claims: usize,
    pub min_sources: usize,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            max_claims: super::verifier::DEFAULT_MAX_CLAIMS,
            min_sources: super::verifier::DEFAULT_MIN_SOURCES,
        }
    }
}

#[derive(Clone)]
pub struct AgentRoster {
    patent: Arc<dyn ResearchAgent>,
    market: Arc<dyn ResearchAgent>,
    tech_trend: Arc<dyn ResearchAgent>,
    verifier: Arc<dyn VerificationAgent>,
    synthesizer: Arc<dyn SynthesisAgent>,
}

impl AgentRoster {
    pub fn with_defaults(generator: Arc<ResilientGenerator>, settings: VerifierSettings) -> Self {
        Self {
            patent: Arc::new(PatentScoutAgent::new(generator.clone())),
            market: Arc::new(MarketAnalystAgent::new(generator.clone())),
            tech_trend: Arc::new(TechTrendAgent::new(generator.clone())),
            verifier: Arc::new(
                VerifierAgent::new(generator.clone())
                    .with_max_claims(settings.max_claims)
                    .with_min_sources(settings.min_sources),
            ),
            synthesizer: Arc::new(SynthesizerAgent::new(generator)),
        }
    }

    pub fn builder() -> AgentRosterBuilder {
        AgentRosterBuilder::new()
    }

    /// Research agents in pipeline order.
    pub fn research_agents(&self) -> [Arc<dyn ResearchAgent>; 3] {
        [
            self.patent.clone(),
            self.market.clone(),
            self.tech_trend.clone(),
        ]
    }

    pub fn verifier(&self) -> Arc<dyn VerificationAgent> {
        self.verifier.clone()
    }

    pub fn synthesizer(&self) -> Arc<dyn SynthesisAgent> {
        self.synthesizer.clone()
    }
}

/// Builder for [`AgentRoster`].
///
/// Slots left empty are filled with the built-in agent when a generator is
/// provided; otherwise `build` fails.
#[derive(Default)]
pub struct AgentRosterBuilder {
    generator: Option<Arc<ResilientGenerator>>,
    settings: VerifierSettings,
    patent: Option<Arc<dyn ResearchAgent>>,
    market: Option<Arc<dyn ResearchAgent>>,
    tech_trend: Option<Arc<dyn ResearchAgent>>,
    verifier: Option<Arc<dyn VerificationAgent>>,
    synthesizer: Option<Arc<dyn SynthesisAgent>>,
}

impl AgentRosterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_generator(mut self, generator: Arc<ResilientGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_verifier_settings(mut self, settings: VerifierSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_patent_agent(mut self, agent: Arc<dyn ResearchAgent>) -> Self {
        self.patent = Some(agent);
        self
    }

    pub fn with_market_agent(mut self, agent: Arc<dyn ResearchAgent>) -> Self {
        self.market = Some(agent);
        self
    }

    pub fn with_tech_trend_agent(mut self, agent: Arc<dyn ResearchAgent>) -> Self {
        self.tech_trend = Some(agent);
        self
    }

    pub fn with_verifier(mut self, agent: Arc<dyn VerificationAgent>) -> Self {
        self.verifier = Some(agent);
        self
    }

    pub fn with_synthesizer(mut self, agent: Arc<dyn SynthesisAgent>) -> Self {
        self.synthesizer = Some(agent);
        self
    }

    pub fn build(self) -> Result<AgentRoster> {
        fn missing(slot: &str) -> AppError {
            AppError::Configuration(format!(
                "No {} agent configured and no generator to build the default",
                slot
            ))
        }

        let defaults = self
            .generator
            .map(|g| AgentRoster::with_defaults(g, self.settings));

        Ok(AgentRoster {
            patent: match (self.patent, &defaults) {
                (Some(agent), _) => agent,
                (None, Some(d)) => d.patent.clone(),
                (None, None) => return Err(missing("patent")),
            },
            market: match (self.market, &defaults) {
                (Some(agent), _) => agent,
                (None, Some(d)) => d.market.clone(),
                (None, None) => return Err(missing("market")),
            },
            tech_trend: match (self.tech_trend, &defaults) {
                (Some(agent), _) => agent,
                (None, Some(d)) => d.tech_trend.clone(),
                (None, None) => return Err(missing("tech trend")),
            },
            verifier: match (self.verifier, &defaults) {
                (Some(agent), _) => agent,
                (None, Some(d)) => d.verifier.clone(),
                (None, None) => return Err(missing("verifier")),
            },
            synthesizer: match (self.synthesizer, &defaults) {
                (Some(agent), _) => agent,
                (None, Some(d)) => d.synthesizer.clone(),
                (None, None) => return Err(missing("synthesizer")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ModelRoster, OfflineClient, RetryPolicy};
    use crate::types::AgentRole;

    fn generator() -> Arc<ResilientGenerator> {
        Arc::new(ResilientGenerator::new(
            Arc::new(OfflineClient),
            ModelRoster::default(),
            RetryPolicy::default(),
        ))
    }

    #[test]
    fn test_defaults_in_pipeline_order() {
        let roster = AgentRoster::with_defaults(generator(), VerifierSettings::default());
        let roles: Vec<AgentRole> = roster.research_agents().iter().map(|a| a.role()).collect();
        assert_eq!(
            roles,
            vec![AgentRole::PatentScout, AgentRole::MarketAnalyst, AgentRole::TechTrend]
        );
    }

    #[test]
    fn test_builder_without_generator_fails() {
        let result = AgentRosterBuilder::new()
            .with_patent_agent(Arc::new(PatentScoutAgent::new(generator())))
            .build();
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_builder_overrides_single_slot() {
        let custom: Arc<dyn ResearchAgent> = Arc::new(TechTrendAgent::new(generator()));
        let roster = AgentRosterBuilder::new()
            .with_generator(generator())
            .with_patent_agent(custom.clone())
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&roster.research_agents()[0], &custom));
    }

    #[test]
    fn test_builder_fills_remaining_slots() {
        let custom: Arc<dyn ResearchAgent> = Arc::new(PatentScoutAgent::new(generator()));
        let roster = AgentRosterBuilder::new()
            .with_generator(generator())
            .with_verifier_settings(VerifierSettings {
                min_sources: 5,
                ..VerifierSettings::default()
            })
            .with_tech_trend_agent(custom.clone())
            .build()
            .unwrap();
        let agents = roster.research_agents();
        assert_eq!(agents.len(), 3);
        assert!(Arc::ptr_eq(&agents[2], &custom));
        assert_eq!(agents[0].role(), AgentRole::PatentScout);
    }
}
