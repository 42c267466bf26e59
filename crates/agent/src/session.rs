//! Per-operator session state: the conversation log, the live environment
//! context, and an optional pending question.

use serde::{Deserialize, Serialize};
use sploitgpt_core::context::BootContext;
use sploitgpt_core::message::{ConversationLog, Message};
use std::fmt;
use tokio::sync::watch;

/// Opaque token that ties a `resume` call to the question it answers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeToken(String);

impl ResumeToken {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ResumeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ResumeToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ResumeToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ResumeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A question the model asked that still waits for an answer.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingChoice {
    pub token: ResumeToken,
    pub question: String,
    pub options: Vec<String>,
}

/// One operator's conversation with the agent.
///
/// The context is read through a `watch` channel on every model call, so
/// whoever owns the sender can refresh it (new hosts, a reconnected
/// Metasploit) while the session is alive.
pub struct Session {
    log: ConversationLog,
    context: watch::Receiver<BootContext>,
    pending: Option<PendingChoice>,
}

impl Session {
    pub fn new(context: watch::Receiver<BootContext>) -> Self {
        Self {
            log: ConversationLog::new(),
            context,
            pending: None,
        }
    }

    /// A session whose context never changes.
    pub fn with_context(context: BootContext) -> Self {
        let (_tx, rx) = watch::channel(context);
        Self::new(rx)
    }

    pub fn id(&self) -> &str {
        self.log.id()
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// The most recently published context.
    pub fn context(&self) -> BootContext {
        self.context.borrow().clone()
    }

    pub fn pending_choice(&self) -> Option<&PendingChoice> {
        self.pending.as_ref()
    }

    pub fn is_suspended(&self) -> bool {
        self.pending.is_some()
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.log.append(message);
    }

    pub(crate) fn suspend(&mut self, choice: PendingChoice) {
        self.pending = Some(choice);
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingChoice> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        assert_ne!(ResumeToken::new(), ResumeToken::new());
    }

    #[test]
    fn static_context_survives_dropped_sender() {
        let session = Session::with_context(BootContext {
            hostname: "kali".into(),
            ..Default::default()
        });
        assert_eq!(session.context().hostname, "kali");
        assert!(!session.is_suspended());
        assert!(session.log().is_empty());
    }

    #[test]
    fn context_follows_sender() {
        let (tx, rx) = watch::channel(BootContext::default());
        let session = Session::new(rx);
        tx.send_modify(|ctx| ctx.known_hosts.push("10.0.0.9".into()));
        assert_eq!(session.context().known_hosts, vec!["10.0.0.9"]);
    }
}
