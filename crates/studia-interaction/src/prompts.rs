//! Prompt templates for the four agents.
//!
//! Every agent is the same model with a different instruction. Templates are
//! rendered with minijinja so the topic and document context slot in without
//! ad-hoc string building.

use minijinja::{Environment, context};
use studia_core::agent::AgentKind;
use studia_core::error::{Result, StudiaError};

const TEACHER_TEMPLATE: &str = r#"You are the Teacher, a patient tutor helping a student study.
Answer clearly and accurately. Prefer short paragraphs and concrete examples.
If the question cannot be answered from what you know, say so plainly.
{%- if context %}

The student uploaded study material. Ground your answer in these notes when they are relevant:
<notes>
{{ context }}
</notes>
{%- endif %}"#;

const ARCHITECT_TEMPLATE: &str = r#"You are the Architect. Draw a concept diagram that helps a student understand "{{ topic }}".
Use Mermaid syntax (flowchart or mindmap). Keep it under 20 nodes with short labels.
Reply with the Mermaid source only, without explanations or code fences.
{%- if context %}

Base the diagram on this explanation:
{{ context }}
{%- endif %}"#;

const ILLUSTRATOR_TEMPLATE: &str = r#"Create a clear, friendly educational illustration about "{{ topic }}".
Use a clean textbook style with no text labels.
{%- if context %}
Visualize the key idea of this explanation:
{{ context }}
{%- endif %}"#;

const HISTORIAN_TEMPLATE: &str = r#"You are the Historian. Read the attached document and write a dense, extractive summary for a study assistant.
Keep definitions, formulas, dates, names and key arguments verbatim where possible.
Do not add information that is not in the document. Reply with the summary only."#;

/// Renders agent instructions.
pub struct AgentPrompts {
    env: Environment<'static>,
}

impl AgentPrompts {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (kind, source) in [
            (AgentKind::Teacher, TEACHER_TEMPLATE),
            (AgentKind::Architect, ARCHITECT_TEMPLATE),
            (AgentKind::Illustrator, ILLUSTRATOR_TEMPLATE),
            (AgentKind::Historian, HISTORIAN_TEMPLATE),
        ] {
            env.add_template(kind.name(), source).map_err(template_error)?;
        }
        Ok(Self { env })
    }

    /// System instruction for answering, with the document context embedded.
    pub fn teacher(&self, context: &str) -> Result<String> {
        self.render(AgentKind::Teacher, context! { context => context.trim() })
    }

    /// Prompt for a Mermaid diagram of the topic.
    pub fn architect(&self, topic: &str, context: &str) -> Result<String> {
        self.render(
            AgentKind::Architect,
            context! { topic => topic, context => context.trim() },
        )
    }

    /// Prompt for an illustration of the topic.
    pub fn illustrator(&self, topic: &str, context: &str) -> Result<String> {
        self.render(
            AgentKind::Illustrator,
            context! { topic => topic, context => context.trim() },
        )
    }

    /// Instruction sent alongside an uploaded document.
    pub fn historian(&self) -> Result<String> {
        self.render(AgentKind::Historian, context! {})
    }

    fn render(&self, kind: AgentKind, ctx: minijinja::Value) -> Result<String> {
        self.env
            .get_template(kind.name())
            .and_then(|template| template.render(ctx))
            .map_err(template_error)
    }
}

fn template_error(err: minijinja::Error) -> StudiaError {
    StudiaError::internal(format!("Prompt template error: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teacher_without_context_has_no_notes() {
        let prompts = AgentPrompts::new().unwrap();
        let rendered = prompts.teacher("").unwrap();

        assert!(rendered.starts_with("You are the Teacher"));
        assert!(!rendered.contains("<notes>"));
    }

    #[test]
    fn test_teacher_embeds_context() {
        let prompts = AgentPrompts::new().unwrap();
        let rendered = prompts.teacher("Mitochondria make ATP.").unwrap();

        assert!(rendered.contains("<notes>\nMitochondria make ATP.\n</notes>"));
    }

    #[test]
    fn test_architect_mentions_topic() {
        let prompts = AgentPrompts::new().unwrap();
        let rendered = prompts.architect("Photosynthesis", "Light becomes sugar.").unwrap();

        assert!(rendered.contains("\"Photosynthesis\""));
        assert!(rendered.contains("Light becomes sugar."));
        assert!(rendered.contains("Mermaid"));
    }
}
