//! REPL command parsing.

use std::path::PathBuf;

/// Slash commands with their usage line, in help order.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/new", "<topic>        Start a new study session"),
    ("/sessions", "             List your sessions (pinned first)"),
    ("/switch", "<n|id>       Open a session from the list"),
    ("/rename", "<topic>      Rename the current session"),
    ("/pin", "[n|id]          Pin or unpin a session (current by default)"),
    ("/upload", "<path>       Attach a document to the current session"),
    ("/diagram", "            Show the current diagram source"),
    ("/image", "              Show the current illustration reference"),
    ("/narration", "[on|off]  Toggle reading answers aloud"),
    ("/audio", "<path>        Save the latest narration audio"),
    ("/status", "             Show what the agents are doing"),
    ("/signup", "<email> [name]  Create an account"),
    ("/login", "<email>       Sign in"),
    ("/logout", "             Sign out"),
    ("/help", "               Show this help"),
    ("/quit", "               Exit"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: a question for the current session.
    Ask(String),
    New(String),
    Sessions,
    Switch(String),
    Rename(String),
    Pin(Option<String>),
    Upload(PathBuf),
    Diagram,
    Image,
    Narration(Option<bool>),
    Audio(PathBuf),
    Status,
    SignUp {
        email: String,
        display_name: String,
    },
    LogIn {
        email: String,
    },
    LogOut,
    Help,
    Quit,
}

/// Parses one input line. Errors carry a usage hint for the user.
pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    if line == "quit" || line == "exit" {
        return Ok(Command::Quit);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Command::Ask(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let required = |usage: &str| {
        if arg.is_empty() {
            Err(format!("Usage: /{} {}", name, usage))
        } else {
            Ok(arg.to_string())
        }
    };
    let optional = || (!arg.is_empty()).then(|| arg.to_string());

    match name {
        "new" => required("<topic>").map(Command::New),
        "sessions" | "ls" => Ok(Command::Sessions),
        "switch" => required("<n|id>").map(Command::Switch),
        "rename" => required("<topic>").map(Command::Rename),
        "pin" => Ok(Command::Pin(optional())),
        "upload" => required("<path>").map(|p| Command::Upload(PathBuf::from(p))),
        "diagram" => Ok(Command::Diagram),
        "image" => Ok(Command::Image),
        "narration" => match arg {
            "" => Ok(Command::Narration(None)),
            "on" => Ok(Command::Narration(Some(true))),
            "off" => Ok(Command::Narration(Some(false))),
            _ => Err("Usage: /narration [on|off]".to_string()),
        },
        "audio" => required("<path>").map(|p| Command::Audio(PathBuf::from(p))),
        "status" => Ok(Command::Status),
        "signup" => {
            let value = required("<email> [display name]")?;
            let (email, display_name) = match value.split_once(char::is_whitespace) {
                Some((email, name)) => (email.to_string(), name.trim().to_string()),
                None => (value, String::new()),
            };
            Ok(Command::SignUp {
                email,
                display_name,
            })
        }
        "login" => required("<email>").map(|email| Command::LogIn { email }),
        "logout" => Ok(Command::LogOut),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" => Ok(Command::Quit),
        other => Err(format!("Unknown command: /{} (try /help)", other)),
    }
}
