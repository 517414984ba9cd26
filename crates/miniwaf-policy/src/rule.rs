//! Rule and rule set definitions

use miniwaf_core::{Action, Error, FacetName, Result};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::config::EngineConfig;

/// A single compiled inspection rule
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique rule identifier
    pub id: String,

    /// Description of what this rule detects
    pub description: String,

    /// Case-insensitive compiled pattern
    pub pattern: Regex,

    /// Facets the pattern is tested against, in order
    pub targets: Vec<FacetName>,

    /// Action to take on match
    pub action: Action,
}

impl Rule {
    /// Compile a rule
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        pattern: &str,
        targets: Vec<FacetName>,
        action: Action,
        config: &EngineConfig,
    ) -> Result<Self> {
        let id = id.into();

        if targets.is_empty() {
            return Err(Error::EmptyTarget { id });
        }

        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(config.regex_size_limit)
            .build()
            .map_err(|e| Error::InvalidPattern {
                id: id.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            id,
            description: description.into(),
            pattern,
            targets,
            action,
        })
    }

    /// The pattern source as written in the rule document
    pub fn pattern_str(&self) -> &str {
        self.pattern.as_str()
    }
}

/// An ordered, validated collection of rules
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build a rule set from compiled rules, rejecting duplicate ids
    pub fn new(rules: Vec<Rule>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(rules.len());
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(Error::DuplicateRuleId(rule.id.clone()));
            }
        }
        Ok(Self { rules })
    }

    /// Load a rule set from a YAML file with default limits
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, &EngineConfig::default())
    }

    /// Load a rule set from a YAML file
    pub fn load_with(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let rules = Self::from_yaml_with(&content, config)?;
        info!(path = %path.display(), rules = rules.len(), "Loaded rule set");
        Ok(rules)
    }

    /// Parse a rule set from a YAML string with default limits
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_yaml_with(yaml, &EngineConfig::default())
    }

    /// Parse a rule set from a YAML string
    pub fn from_yaml_with(yaml: &str, config: &EngineConfig) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Err(Error::MissingRules);
        }

        let document: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;

        let entries = match document.get("rules") {
            Some(serde_yaml::Value::Null) | None => return Err(Error::MissingRules),
            Some(entries) => entries.clone(),
        };

        let raw: Vec<RawRule> =
            serde_yaml::from_value(entries).map_err(|e| Error::parse(e.to_string()))?;

        let rules = raw
            .into_iter()
            .enumerate()
            .map(|(index, raw)| raw.compile(index, config))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = rules.len(), "Compiled rules");
        Self::new(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Look up a rule by id
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Rule ids may be written as strings or integers
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(i64),
}

impl RawId {
    fn into_string(self) -> String {
        match self {
            RawId::Text(text) => text,
            RawId::Number(n) => n.to_string(),
        }
    }
}

/// A rule entry as written in the document, before validation
#[derive(Debug, Deserialize)]
struct RawRule {
    id: Option<RawId>,
    description: Option<String>,
    pattern: Option<String>,
    target: Option<Vec<String>>,
    action: Option<String>,
}

impl RawRule {
    fn compile(self, index: usize, config: &EngineConfig) -> Result<Rule> {
        let missing = |field| Error::MissingField { index, field };

        let id = self.id.ok_or_else(|| missing("id"))?.into_string();
        let description = self.description.ok_or_else(|| missing("description"))?;
        let pattern = self.pattern.ok_or_else(|| missing("pattern"))?;
        let target = self.target.ok_or_else(|| missing("target"))?;
        let action = self.action.ok_or_else(|| missing("action"))?;

        let action = action.parse::<Action>().map_err(|_| Error::UnknownAction {
            id: id.clone(),
            action,
        })?;

        let targets = target
            .into_iter()
            .map(|facet| {
                facet.parse::<FacetName>().map_err(|_| Error::UnknownFacet {
                    id: id.clone(),
                    facet,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Rule::new(id, description, &pattern, targets, action, config)
    }
}
