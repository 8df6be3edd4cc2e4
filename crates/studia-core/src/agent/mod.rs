//! Logical agents and their activity indicators.
//!
//! The four agents are differently-prompted calls to the same model. Their
//! activity status is purely observational and never gates control flow.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The logical agents of the study assistant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Reads uploaded documents and extracts their content.
    Historian,
    /// Answers the student's questions.
    Teacher,
    /// Draws a concept diagram of the topic.
    Architect,
    /// Paints an illustration of the topic.
    Illustrator,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::Historian,
        AgentKind::Teacher,
        AgentKind::Architect,
        AgentKind::Illustrator,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Historian => "Historian",
            AgentKind::Teacher => "Teacher",
            AgentKind::Architect => "Architect",
            AgentKind::Illustrator => "Illustrator",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Activity indicator for one agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentActivity {
    pub active: bool,
    pub description: String,
}

/// Activity indicators for all agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBoard {
    agents: BTreeMap<AgentKind, AgentActivity>,
}

impl Default for AgentBoard {
    fn default() -> Self {
        Self {
            agents: AgentKind::ALL
                .iter()
                .map(|kind| (*kind, AgentActivity::default()))
                .collect(),
        }
    }
}

impl AgentBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an agent active with a human-readable description.
    pub fn begin(&mut self, kind: AgentKind, description: impl Into<String>) {
        let entry = self.agents.entry(kind).or_default();
        entry.active = true;
        entry.description = description.into();
    }

    /// Marks an agent idle.
    pub fn finish(&mut self, kind: AgentKind) {
        let entry = self.agents.entry(kind).or_default();
        entry.active = false;
        entry.description.clear();
    }

    pub fn get(&self, kind: AgentKind) -> AgentActivity {
        self.agents.get(&kind).cloned().unwrap_or_default()
    }

    pub fn is_active(&self, kind: AgentKind) -> bool {
        self.agents.get(&kind).is_some_and(|a| a.active)
    }

    /// Iterates over agents that are currently active.
    pub fn active(&self) -> impl Iterator<Item = (AgentKind, &AgentActivity)> {
        self.agents
            .iter()
            .filter(|(_, activity)| activity.active)
            .map(|(kind, activity)| (*kind, activity))
    }
}
