//! Reducer for session state.
//!
//! Every change to a live session goes through [`apply`], which takes the
//! current value and one field-level update and returns the next value.
//! Same-field writes are last-write-wins: the update applied last replaces
//! the previous value with no merge.

use super::file::UploadedFile;
use super::message::Message;
use super::model::Session;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single field-level change to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionUpdate {
    /// Append a message to the end of the log.
    AppendMessage(Message),
    /// Attach a staged file.
    AttachFile(UploadedFile),
    /// Record the derived summary of an attached file.
    FileSummarized { file_id: String, summary: String },
    /// Replace the diagram wholesale.
    ReplaceDiagram(String),
    /// Replace the image reference wholesale.
    ReplaceImage(String),
    /// Rename the session topic.
    Rename(String),
    /// Pin or unpin the session.
    SetPinned(bool),
}

impl SessionUpdate {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AppendMessage(_) => "append_message",
            Self::AttachFile(_) => "attach_file",
            Self::FileSummarized { .. } => "file_summarized",
            Self::ReplaceDiagram(_) => "replace_diagram",
            Self::ReplaceImage(_) => "replace_image",
            Self::Rename(_) => "rename",
            Self::SetPinned(_) => "set_pinned",
        }
    }
}

/// Applies one update to a session and returns the new value.
pub fn apply(mut session: Session, update: SessionUpdate) -> Session {
    match update {
        SessionUpdate::AppendMessage(message) => session.push_message(message),
        SessionUpdate::AttachFile(file) => {
            session.files.push(file);
        }
        SessionUpdate::FileSummarized { file_id, summary } => {
            match session.files.iter_mut().find(|f| f.id == file_id) {
                Some(file) => file.summary = Some(summary),
                None => {
                    tracing::debug!(
                        "[SessionReducer] Ignoring summary for unknown file: {}",
                        file_id
                    );
                    return session;
                }
            }
        }
        SessionUpdate::ReplaceDiagram(diagram) => session.diagram = Some(diagram),
        SessionUpdate::ReplaceImage(image) => session.image = Some(image),
        SessionUpdate::Rename(topic) => session.topic = topic,
        SessionUpdate::SetPinned(pinned) => session.pinned = pinned,
    }

    session.updated_at = Utc::now().max(session.updated_at);
    session
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn staged_file(id: &str) -> UploadedFile {
        UploadedFile {
            id: id.to_string(),
            name: format!("{id}.pdf"),
            size: 4,
            mime_type: "application/pdf".to_string(),
            uploaded_at: Utc::now(),
            content: "AAAA".to_string(),
            summary: None,
        }
    }

    #[test]
    fn test_append_preserves_order() {
        let session = Session::new("acct", "Recursion");
        let session = apply(session, SessionUpdate::AppendMessage(Message::user("one")));
        let session = apply(session, SessionUpdate::AppendMessage(Message::assistant("two")));

        let contents: Vec<_> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }

    #[test]
    fn test_append_clamps_backwards_timestamp() {
        let session = Session::new("acct", "Clocks");
        let first = Message::user("first");
        let mut second = Message::assistant("second");
        second.created_at = first.created_at - Duration::seconds(30);

        let session = apply(session, SessionUpdate::AppendMessage(first.clone()));
        let session = apply(session, SessionUpdate::AppendMessage(second));

        assert_eq!(session.messages[1].created_at, first.created_at);
        assert!(
            session
                .messages
                .windows(2)
                .all(|w| w[0].created_at <= w[1].created_at)
        );
    }

    #[test]
    fn test_diagram_last_write_wins() {
        let session = Session::new("acct", "Graphs");
        let session = apply(session, SessionUpdate::ReplaceDiagram("graph A".into()));
        let session = apply(session, SessionUpdate::ReplaceDiagram("graph B".into()));

        assert_eq!(session.diagram.as_deref(), Some("graph B"));
    }

    #[test]
    fn test_diagram_and_image_are_independent() {
        let session = Session::new("acct", "Art");
        let session = apply(session, SessionUpdate::ReplaceImage("img-1".into()));
        let session = apply(session, SessionUpdate::ReplaceDiagram("graph".into()));

        assert_eq!(session.image.as_deref(), Some("img-1"));
        assert_eq!(session.diagram.as_deref(), Some("graph"));
    }

    #[test]
    fn test_file_summary_only_touches_matching_file() {
        let session = Session::new("acct", "Files");
        let session = apply(session, SessionUpdate::AttachFile(staged_file("a")));
        let session = apply(session, SessionUpdate::AttachFile(staged_file("b")));
        let session = apply(
            session,
            SessionUpdate::FileSummarized {
                file_id: "b".into(),
                summary: "T".into(),
            },
        );

        assert_eq!(session.files[0].summary, None);
        assert_eq!(session.files[1].summary.as_deref(), Some("T"));
    }

    #[test]
    fn test_unknown_file_summary_is_noop() {
        let session = Session::new("acct", "Files");
        let before = session.clone();
        let after = apply(
            session,
            SessionUpdate::FileSummarized {
                file_id: "missing".into(),
                summary: "T".into(),
            },
        );

        assert_eq!(before, after);
    }
}
