use colored::Colorize;
use studia_application::{LiveSnapshot, NarrationStatus};
use studia_core::agent::AgentKind;
use studia_core::session::{Message, MessageRole, Session};

use crate::command::COMMANDS;

pub fn print_help() {
    println!("{}", "Commands:".bright_yellow());
    for (name, usage) in COMMANDS {
        println!("  {} {}", name.bright_cyan(), usage);
    }
    println!("  Anything else is sent to the Teacher as a question.");
}

pub fn print_message(message: &Message) {
    match message.role {
        MessageRole::User => println!("{} {}", "You:".bright_green().bold(), message.content),
        MessageRole::Assistant => {
            println!("{}", "Teacher:".bright_blue().bold());
            println!("{}", message.content);
        }
        MessageRole::System => println!("{}", format!("· {}", message.content).bright_black()),
    }
}

/// Prints the session header and its conversation so far.
pub fn print_session(session: &Session) {
    let pin = if session.pinned { " 📌" } else { "" };
    println!(
        "\n{}{}  {}",
        session.topic.bright_white().bold(),
        pin,
        short_id(&session.id).bright_black()
    );
    if !session.files.is_empty() {
        let names: Vec<String> = session
            .files
            .iter()
            .map(|f| {
                if f.is_summarized() {
                    f.name.clone()
                } else {
                    format!("{} (reading…)", f.name)
                }
            })
            .collect();
        println!("{} {}", "Files:".bright_black(), names.join(", "));
    }
    for message in &session.messages {
        print_message(message);
    }
    println!();
}

pub fn print_listing(sessions: &[Session], current: Option<&str>) {
    if sessions.is_empty() {
        println!("{}", "No sessions yet. Start one with /new <topic>.".bright_black());
        return;
    }
    for (index, session) in sessions.iter().enumerate() {
        let marker = if Some(session.id.as_str()) == current { "*" } else { " " };
        let pin = if session.pinned { "📌 " } else { "" };
        println!(
            "{} {:>2}. {}{}  {}  {}",
            marker,
            index + 1,
            pin,
            session.topic.bright_white(),
            session.updated_at.format("%Y-%m-%d %H:%M").to_string().bright_black(),
            short_id(&session.id).bright_black()
        );
    }
}

pub fn print_agents(snapshot: &LiveSnapshot) {
    for kind in AgentKind::ALL {
        let activity = snapshot.agents.get(kind);
        let state = if activity.active {
            activity.description.bright_yellow().to_string()
        } else {
            "idle".bright_black().to_string()
        };
        println!("  {:<12} {}", kind.name(), state);
    }
    let narration = match &snapshot.narration {
        NarrationStatus::Idle => "idle".to_string(),
        NarrationStatus::Loading { .. } => "preparing audio".to_string(),
        NarrationStatus::Ready { audio, .. } => format!("ready ({})", human_bytes(audio.data.len())),
        NarrationStatus::Unavailable { .. } => "unavailable".to_string(),
    };
    println!("  {:<12} {}", "Narration", narration);
}

pub fn print_diagram(diagram: Option<&str>) {
    match diagram {
        Some(source) => {
            println!("{}", "Diagram (Mermaid):".bright_magenta());
            println!("{}", source);
        }
        None => println!("{}", "No diagram yet.".bright_black()),
    }
}

pub fn print_image(image: Option<&str>) {
    match image {
        Some(reference) if reference.starts_with("data:") => {
            let kind = reference
                .split_once(';')
                .map(|(head, _)| head.trim_start_matches("data:"))
                .unwrap_or("image");
            println!(
                "{} inline {} ({})",
                "Illustration:".bright_magenta(),
                kind,
                human_bytes(reference.len())
            );
        }
        Some(reference) => println!("{} {}", "Illustration:".bright_magenta(), reference),
        None => println!("{}", "No illustration yet.".bright_black()),
    }
}

/// Describes what changed between two snapshots of the same session.
pub fn describe_changes(before: &LiveSnapshot, after: &LiveSnapshot) -> Vec<String> {
    let mut notes = Vec::new();
    let (Some(old), Some(new)) = (&before.session, &after.session) else {
        return notes;
    };
    if old.id != new.id {
        return notes;
    }
    if old.diagram != new.diagram && new.diagram.is_some() {
        notes.push("Architect updated the diagram (/diagram)".to_string());
    }
    if old.image != new.image && new.image.is_some() {
        notes.push("Illustrator updated the illustration (/image)".to_string());
    }
    for file in &new.files {
        let was_pending = old
            .find_file(&file.id)
            .is_some_and(|f| !f.is_summarized());
        if was_pending && file.is_summarized() {
            notes.push(format!("Historian finished reading {}", file.name));
        }
    }
    if before.narration != after.narration {
        match &after.narration {
            NarrationStatus::Ready { audio, .. } => notes.push(format!(
                "Narration ready ({}, /audio <path> to save)",
                human_bytes(audio.data.len())
            )),
            NarrationStatus::Unavailable { .. } => {
                notes.push("Narration unavailable for this answer".to_string())
            }
            _ => {}
        }
    }
    notes
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn human_bytes(len: usize) -> String {
    if len >= 1024 * 1024 {
        format!("{:.1} MB", len as f64 / (1024.0 * 1024.0))
    } else if len >= 1024 {
        format!("{:.1} KB", len as f64 / 1024.0)
    } else {
        format!("{} B", len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studia_core::inference::SpeechAudio;

    fn snapshot(session: Session) -> LiveSnapshot {
        LiveSnapshot {
            session: Some(session),
            ..LiveSnapshot::default()
        }
    }

    #[test]
    fn test_describe_changes_reports_satellites() {
        let session = Session::new("acct", "Optics");
        let before = snapshot(session.clone());
        let mut updated = session;
        updated.diagram = Some("graph TD; A-->B".to_string());
        let mut after = snapshot(updated);
        after.narration = NarrationStatus::Ready {
            turn_id: 1,
            audio: SpeechAudio {
                mime_type: "audio/L16;rate=24000".to_string(),
                data: vec![0; 2048],
            },
        };

        let notes = describe_changes(&before, &after);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("diagram"));
        assert!(notes[1].contains("2.0 KB"));
    }

    #[test]
    fn test_describe_changes_ignores_session_switch() {
        let mut other = Session::new("acct", "Acoustics");
        other.diagram = Some("graph TD; X".to_string());
        let notes = describe_changes(
            &snapshot(Session::new("acct", "Optics")),
            &snapshot(other),
        );
        assert!(notes.is_empty());
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }
}
