//! Analyzer registry.
//!
//! Built once before any parse and shared read-only by every run.
//! Registration is where malformed analyzers are turned away: a bad name, a
//! missing `analyze` capability or a second context provider fail here with
//! a typed error instead of surfacing mid-run.

use std::sync::Arc;

use crate::analysis::{Analyzer, Capabilities};
use crate::analyzers::{
    CommandExtractor, DependencyExtractor, LanguageDetector, MetadataExtractor, PatternAnalyzer,
    TestingDetector,
};
use crate::config::Config;
use crate::error::RegistrationError;

const MAX_NAME_LEN: usize = 64;

fn validate_name(name: &str) -> Result<(), RegistrationError> {
    if name.trim().is_empty() {
        return Err(RegistrationError::EmptyName);
    }
    if name.len() > MAX_NAME_LEN {
        return Err(RegistrationError::InvalidName {
            name: name.to_string(),
            reason: format!("longer than {} characters", MAX_NAME_LEN),
        });
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(RegistrationError::InvalidName {
            name: name.to_string(),
            reason: format!("unexpected character {:?}", c),
        });
    }
    Ok(())
}

/// Registered analyzer with its declared capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzerInfo {
    pub name: String,
    pub capabilities: Capabilities,
}

/// Ordered set of analyzers. The context provider, if any, is always first.
#[derive(Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl AnalyzerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The five built-in analyzers, minus any the config disables, followed
    /// by the config's pattern analyzers.
    pub fn with_builtins(config: &Config) -> Result<Self, RegistrationError> {
        let mut registry = Self::new();
        registry.register(LanguageDetector::new())?;

        let builtins: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(CommandExtractor::new(config.inference_penalty())),
            Arc::new(DependencyExtractor::new()),
            Arc::new(TestingDetector::new()),
            Arc::new(MetadataExtractor::new()),
        ];
        for analyzer in builtins {
            if config.is_disabled(analyzer.name()) {
                tracing::debug!(analyzer = analyzer.name(), "analyzer disabled by config");
                continue;
            }
            registry.register_arc(analyzer)?;
        }

        for custom in &config.custom_analyzers {
            let analyzer = PatternAnalyzer::from_config(custom).map_err(|e| RegistrationError::Rejected {
                name: custom.name.clone(),
                reason: e.to_string(),
            })?;
            registry.register(analyzer)?;
        }
        Ok(registry)
    }

    pub fn register<A: Analyzer + 'static>(&mut self, analyzer: A) -> Result<(), RegistrationError> {
        self.register_arc(Arc::new(analyzer))
    }

    /// Validate and add an analyzer.
    pub fn register_arc(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), RegistrationError> {
        let name = analyzer.name().to_string();
        validate_name(&name)?;

        if self.get(&name).is_some() {
            return Err(RegistrationError::DuplicateName { name });
        }

        let caps = analyzer.capabilities();
        if !caps.analyze {
            return Err(RegistrationError::MissingCapability {
                name,
                capability: "analyze".to_string(),
            });
        }

        if let Err(reason) = analyzer.validate() {
            return Err(RegistrationError::Rejected { name, reason });
        }

        if caps.provides_context {
            if let Some(existing) = self.context_provider() {
                return Err(RegistrationError::DuplicateContextProvider {
                    name,
                    existing: existing.name().to_string(),
                });
            }
            self.analyzers.insert(0, analyzer);
        } else {
            self.analyzers.push(analyzer);
        }
        tracing::debug!(analyzer = %name, "analyzer registered");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Analyzer>> {
        self.analyzers.iter().find(|a| a.name() == name)
    }

    /// Analyzer that produces the language contexts.
    pub fn context_provider(&self) -> Option<&Arc<dyn Analyzer>> {
        self.analyzers
            .first()
            .filter(|a| a.capabilities().provides_context)
    }

    /// Every analyzer that runs after the context is built, in registration order.
    pub fn dependents(&self) -> &[Arc<dyn Analyzer>] {
        match self.context_provider() {
            Some(_) => &self.analyzers[1..],
            None => &self.analyzers,
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    pub fn describe(&self) -> Vec<AnalyzerInfo> {
        self.analyzers
            .iter()
            .map(|a| AnalyzerInfo {
                name: a.name().to_string(),
                capabilities: a.capabilities(),
            })
            .collect()
    }
}

impl std::fmt::Debug for AnalyzerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerRegistry")
            .field("analyzers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AnalysisPayload, AnalysisResult};
    use crate::context::ContextIndex;
    use crate::document::DocumentTree;

    struct Probe {
        name: &'static str,
        caps: Capabilities,
        valid: bool,
    }

    impl Probe {
        fn named(name: &'static str) -> Self {
            Self {
                name,
                caps: Capabilities::default(),
                valid: true,
            }
        }
    }

    impl Analyzer for Probe {
        fn name(&self) -> &str {
            self.name
        }

        fn capabilities(&self) -> Capabilities {
            self.caps
        }

        fn validate(&self) -> Result<(), String> {
            if self.valid {
                Ok(())
            } else {
                Err("bad settings".to_string())
            }
        }

        fn analyze(&self, _: &DocumentTree, _: &str, _: &ContextIndex) -> AnalysisResult {
            AnalysisResult::success(self.name, AnalysisPayload::Commands { commands: vec![] }, 0.5, vec![])
        }
    }

    #[test]
    fn test_builtins_in_order() {
        let registry = AnalyzerRegistry::with_builtins(&Config::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "LanguageDetector",
                "CommandExtractor",
                "DependencyExtractor",
                "TestingDetector",
                "MetadataExtractor"
            ]
        );
        assert_eq!(registry.context_provider().unwrap().name(), "LanguageDetector");
        assert_eq!(registry.dependents().len(), 4);
    }

    #[test]
    fn test_disabled_and_custom() {
        let config: Config = serde_yaml::from_str(
            "disabled_analyzers: [TestingDetector]\ncustom_analyzers:\n  - name: containers\n    category: containers\n    patterns:\n      - { pattern: docker, label: Docker }\n",
        )
        .unwrap();
        let registry = AnalyzerRegistry::with_builtins(&config).unwrap();
        assert!(registry.get("TestingDetector").is_none());
        assert_eq!(registry.names().last(), Some(&"containers"));
    }

    #[test]
    fn test_rejections() {
        let mut registry = AnalyzerRegistry::new();
        assert_eq!(registry.register(Probe::named("")), Err(RegistrationError::EmptyName));
        assert!(matches!(
            registry.register(Probe::named("has space")),
            Err(RegistrationError::InvalidName { .. })
        ));

        registry.register(Probe::named("first")).unwrap();
        assert_eq!(
            registry.register(Probe::named("first")),
            Err(RegistrationError::DuplicateName {
                name: "first".to_string()
            })
        );

        let mut no_analyze = Probe::named("silent");
        no_analyze.caps.analyze = false;
        assert!(matches!(
            registry.register(no_analyze),
            Err(RegistrationError::MissingCapability { ref capability, .. }) if capability == "analyze"
        ));

        let mut invalid = Probe::named("picky");
        invalid.valid = false;
        assert!(matches!(registry.register(invalid), Err(RegistrationError::Rejected { .. })));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_context_provider_goes_first_and_is_unique() {
        let mut registry = AnalyzerRegistry::new();
        registry.register(Probe::named("consumer")).unwrap();
        let mut provider = Probe::named("provider");
        provider.caps = Capabilities::context_provider();
        registry.register(provider).unwrap();
        assert_eq!(registry.names(), vec!["provider", "consumer"]);

        let mut second = Probe::named("another");
        second.caps = Capabilities::context_provider();
        assert_eq!(
            registry.register(second),
            Err(RegistrationError::DuplicateContextProvider {
                name: "another".to_string(),
                existing: "provider".to_string()
            })
        );
    }
}
