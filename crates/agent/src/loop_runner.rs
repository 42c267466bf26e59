//! The agent turn loop.
//!
//! One instruction becomes one *turn*: the model is called with the system
//! prompt plus the stored history, any tool calls it asks for are run in
//! order, and the results go back to the model until it answers without
//! tools, calls `finish`, asks the operator a question, or fails.
//!
//! A turn is driven lazily by its consumer. Each poll of the returned stream
//! advances the state machine just far enough to produce the next event, so
//! dropping the stream abandons the turn at its current suspension point.

use futures::stream::{self, BoxStream, StreamExt};
use sploitgpt_core::error::AgentError;
use sploitgpt_core::message::{Message, ToolCall};
use sploitgpt_core::provider::{Provider, ProviderRequest};
use sploitgpt_core::tool::{ToolOutput, ToolRegistry};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::prompt::build_system_prompt;
use crate::session::{PendingChoice, ResumeToken, Session};
use crate::stream_event::AgentEvent;

/// Default cap on model calls within a single turn.
pub const DEFAULT_MAX_ROUNDS: u32 = 25;

/// Orchestrates model calls and tool execution for any number of sessions.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// The model to ask for
    model: String,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Maximum model calls per turn
    max_rounds: u32,
}

impl AgentLoop {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            tools,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    /// Set the maximum number of model calls per turn.
    pub fn with_max_rounds(mut self, max: u32) -> Self {
        self.max_rounds = max.max(1);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    /// Start a turn for an operator instruction.
    pub fn process<'a>(
        &'a self,
        session: &'a mut Session,
        instruction: impl Into<String>,
    ) -> BoxStream<'a, AgentEvent> {
        self.process_with_cancel(session, instruction, CancellationToken::new())
    }

    /// Like [`process`](Self::process), but the turn stops with a
    /// "Turn cancelled" error as soon as `cancel` fires.
    pub fn process_with_cancel<'a>(
        &'a self,
        session: &'a mut Session,
        instruction: impl Into<String>,
        cancel: CancellationToken,
    ) -> BoxStream<'a, AgentEvent> {
        let entry = Entry::Instruction(instruction.into());
        Turn::new(self, session, entry, cancel).into_stream()
    }

    /// Answer a pending question and continue the suspended turn.
    pub fn resume<'a>(
        &'a self,
        session: &'a mut Session,
        token: &ResumeToken,
        answer: impl Into<String>,
    ) -> BoxStream<'a, AgentEvent> {
        self.resume_with_cancel(session, token, answer, CancellationToken::new())
    }

    pub fn resume_with_cancel<'a>(
        &'a self,
        session: &'a mut Session,
        token: &ResumeToken,
        answer: impl Into<String>,
        cancel: CancellationToken,
    ) -> BoxStream<'a, AgentEvent> {
        let entry = Entry::Answer {
            token: token.clone(),
            answer: answer.into(),
        };
        Turn::new(self, session, entry, cancel).into_stream()
    }

    /// System message plus the stored history, with the context read fresh.
    fn build_request(&self, session: &Session) -> ProviderRequest {
        let tools = self.tools.definitions();
        let system = build_system_prompt(&session.context(), &tools);

        let mut messages = Vec::with_capacity(session.log().len() + 1);
        messages.push(Message::system(system));
        messages.extend(session.log().snapshot());

        ProviderRequest {
            model: self.model.clone(),
            messages,
            tools,
        }
    }
}

/// How a turn was entered.
enum Entry {
    Instruction(String),
    Answer { token: ResumeToken, answer: String },
}

#[derive(Debug, Clone, PartialEq)]
enum TurnState {
    AwaitingModel,
    HandlingToolCalls,
    Suspended(ResumeToken),
    Done,
    Failed,
}

struct Turn<'a> {
    agent: &'a AgentLoop,
    session: &'a mut Session,
    cancel: CancellationToken,
    entry: Option<Entry>,
    state: TurnState,
    rounds: u32,
    batch: VecDeque<ToolCall>,
    /// Announced with a `command` event but not dispatched yet.
    in_flight: Option<ToolCall>,
    events: VecDeque<AgentEvent>,
}

impl<'a> Turn<'a> {
    fn new(agent: &'a AgentLoop, session: &'a mut Session, entry: Entry, cancel: CancellationToken) -> Self {
        Self {
            agent,
            session,
            cancel,
            entry: Some(entry),
            state: TurnState::AwaitingModel,
            rounds: 0,
            batch: VecDeque::new(),
            in_flight: None,
            events: VecDeque::new(),
        }
    }

    fn into_stream(self) -> BoxStream<'a, AgentEvent> {
        stream::unfold(self, |mut turn| async move {
            let event = turn.next_event().await;
            event.map(|e| (e, turn))
        })
        .boxed()
    }

    async fn next_event(&mut self) -> Option<AgentEvent> {
        loop {
            if let Some(event) = self.events.pop_front() {
                return Some(event);
            }
            if let Some(entry) = self.entry.take() {
                self.enter(entry);
                continue;
            }
            match self.state {
                TurnState::AwaitingModel => self.call_model().await,
                TurnState::HandlingToolCalls => self.step_tool_calls().await,
                TurnState::Suspended(ref token) => {
                    debug!(session_id = %self.session.id(), %token, "Turn suspended");
                    return None;
                }
                TurnState::Done | TurnState::Failed => return None,
            }
        }
    }

    fn enter(&mut self, entry: Entry) {
        match entry {
            Entry::Instruction(text) => {
                if let Some(pending) = self.session.pending_choice() {
                    let question = pending.question.clone();
                    self.fail(AgentError::AwaitingUserChoice { question });
                    return;
                }
                info!(
                    session_id = %self.session.id(),
                    messages = self.session.log().len(),
                    "Processing instruction"
                );
                self.session.append(Message::user(text));
            }
            Entry::Answer { token, answer } => {
                let matches = self.session.pending_choice().map(|p| p.token == token);
                match matches {
                    None => {
                        self.fail(AgentError::NotSuspended);
                        return;
                    }
                    Some(false) => {
                        self.fail(AgentError::InvalidResumeToken);
                        return;
                    }
                    Some(true) => {}
                }
                self.session.take_pending();
                info!(session_id = %self.session.id(), "Resuming with operator answer");
                self.session.append(Message::tool("ask_user", answer));
            }
        }
        self.state = TurnState::AwaitingModel;
    }

    async fn call_model(&mut self) {
        if self.rounds >= self.agent.max_rounds {
            warn!(
                session_id = %self.session.id(),
                rounds = self.rounds,
                "Round limit reached"
            );
            self.fail(AgentError::RoundLimitExceeded {
                limit: self.agent.max_rounds,
            });
            return;
        }
        self.rounds += 1;

        debug!(
            session_id = %self.session.id(),
            round = self.rounds,
            "Calling model"
        );

        let request = self.agent.build_request(&*self.session);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AgentError::Cancelled),
            reply = self.agent.provider.complete(request) => reply.map_err(AgentError::from),
        };

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                self.fail(e);
                return;
            }
        };

        let content = reply.message.content.clone();
        let calls = reply.message.tool_calls.clone();
        self.session
            .append(Message::assistant_with_calls(content.clone(), calls.clone()));

        if !content.is_empty() {
            self.events.push_back(AgentEvent::Message { content });
        }

        if calls.is_empty() {
            debug!(session_id = %self.session.id(), "Model answered without tools");
            self.state = TurnState::Done;
        } else {
            debug!(tool_count = calls.len(), "Executing tool calls");
            self.batch = calls.into();
            self.state = TurnState::HandlingToolCalls;
        }
    }

    /// Announce the next call, or run the one already announced.
    async fn step_tool_calls(&mut self) {
        if let Some(call) = self.in_flight.take() {
            self.dispatch(call).await;
            return;
        }

        let Some(call) = self.batch.pop_front() else {
            self.state = TurnState::AwaitingModel;
            return;
        };

        let announcement = self
            .agent
            .tools
            .get(&call.name)
            .and_then(|tool| tool.announce(&call.arguments));

        match announcement {
            Some(command) => {
                self.events.push_back(AgentEvent::Command { command });
                self.in_flight = Some(call);
            }
            None => self.dispatch(call).await,
        }
    }

    async fn dispatch(&mut self, call: ToolCall) {
        debug!(tool = %call.name, "Dispatching tool call");

        let output = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            output = self.agent.tools.dispatch(&call) => Some(output),
        };

        let Some(output) = output else {
            self.fail(AgentError::Cancelled);
            return;
        };

        match output {
            ToolOutput::Text(text) => {
                self.session.append(Message::tool(call.name.clone(), text.clone()));
                self.events.push_back(AgentEvent::Result { output: text });
            }
            ToolOutput::AskUser { question, options } => {
                let token = ResumeToken::new();
                self.discard_rest_of_batch(&call.name);
                self.session.suspend(PendingChoice {
                    token: token.clone(),
                    question: question.clone(),
                    options: options.clone(),
                });
                info!(session_id = %self.session.id(), %token, "Waiting for operator choice");
                self.events.push_back(AgentEvent::Choice {
                    question,
                    options,
                    token: token.clone(),
                });
                self.state = TurnState::Suspended(token);
            }
            ToolOutput::Finish { summary } => {
                self.discard_rest_of_batch(&call.name);
                info!(session_id = %self.session.id(), "Task finished");
                self.events.push_back(AgentEvent::Done { summary });
                self.state = TurnState::Done;
            }
        }
    }

    fn discard_rest_of_batch(&mut self, after: &str) {
        if !self.batch.is_empty() {
            debug!(
                tool = %after,
                discarded = self.batch.len(),
                "Dropping remaining tool calls"
            );
            self.batch.clear();
        }
    }

    fn fail(&mut self, error: AgentError) {
        warn!(session_id = %self.session.id(), error = %error, "Turn failed");
        self.batch.clear();
        self.in_flight = None;
        self.events.push_back(AgentEvent::Error {
            message: error.to_string(),
        });
        self.state = TurnState::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use sploitgpt_core::context::BootContext;
    use sploitgpt_core::error::ProviderError;
    use sploitgpt_core::message::Role;
    use std::time::Duration;
    use tokio::sync::watch;

    async fn collect(stream: BoxStream<'_, AgentEvent>) -> Vec<AgentEvent> {
        stream.collect().await
    }

    fn agent_with(provider: Arc<SequentialMockProvider>) -> AgentLoop {
        AgentLoop::new(provider, "test-model", Arc::new(test_registry()))
    }

    #[tokio::test]
    async fn terminal_call_then_answer() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response("", vec![call("terminal", r#"{"command":"echo hi"}"#)])),
            Ok(make_text_response("Done.")),
        ]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "list files")).await;

        assert_eq!(
            events,
            vec![
                AgentEvent::Command { command: "echo hi".into() },
                AgentEvent::Result { output: "hi\n".into() },
                AgentEvent::Message { content: "Done.".into() },
            ]
        );

        let roles: Vec<Role> = session.log().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        let tool_msg = &session.log().messages()[2];
        assert_eq!(tool_msg.tool_name.as_deref(), Some("terminal"));
        assert_eq!(tool_msg.content, "hi\n");
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn finish_stops_the_batch() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            "Wrapping up.",
            vec![
                call("finish", r#"{"summary":"all done"}"#),
                call("terminal", r#"{"command":"echo never"}"#),
            ],
        ))]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "wrap up")).await;

        assert_eq!(
            events,
            vec![
                AgentEvent::Message { content: "Wrapping up.".into() },
                AgentEvent::Done { summary: "all done".into() },
            ]
        );
        assert_eq!(provider.call_count(), 1);
        // user + assistant, no tool message for finish
        assert_eq!(session.log().len(), 2);
    }

    #[tokio::test]
    async fn terminal_then_finish_in_one_batch() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            "",
            vec![
                call("terminal", r#"{"command":"echo owned"}"#),
                call("finish", r#"{"summary":"pwned"}"#),
            ],
        ))]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "exploit")).await;

        assert_eq!(
            events,
            vec![
                AgentEvent::Command { command: "echo owned".into() },
                AgentEvent::Result { output: "owned\n".into() },
                AgentEvent::Done { summary: "pwned".into() },
            ]
        );
        assert_eq!(provider.call_count(), 1);
        assert_eq!(session.log().len(), 3);
    }

    #[tokio::test]
    async fn unknown_tool_result_goes_back_to_model() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response("", vec![call("bogus", "{}")])),
            Ok(make_text_response("Sorry.")),
        ]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "do something")).await;

        assert_eq!(
            events,
            vec![
                AgentEvent::Result { output: "Error: Unknown tool 'bogus'".into() },
                AgentEvent::Message { content: "Sorry.".into() },
            ]
        );
        let tool_msg = &session.log().messages()[2];
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.tool_name.as_deref(), Some("bogus"));

        let second = provider.request(1);
        assert_eq!(second.messages.last().unwrap().content, "Error: Unknown tool 'bogus'");
    }

    #[tokio::test]
    async fn empty_reply_emits_nothing() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response(""))]));
        let agent = agent_with(provider);
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "hello")).await;

        assert!(events.is_empty());
        assert_eq!(session.log().len(), 2);
    }

    #[tokio::test]
    async fn model_failure_ends_turn_with_error() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Err(ProviderError::Network(
            "connection refused".into(),
        ))]));
        let agent = agent_with(provider);
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "scan")).await;

        assert_eq!(events.len(), 1);
        match &events[0] {
            AgentEvent::Error { message } => assert!(message.contains("connection refused")),
            other => panic!("expected error, got {other:?}"),
        }
        // the instruction stays in the log
        assert_eq!(session.log().len(), 1);
        assert_eq!(session.log().messages()[0].role, Role::User);
    }

    #[tokio::test]
    async fn round_limit_stops_a_looping_model() {
        let replies = (0..3)
            .map(|_| Ok(make_tool_call_response("", vec![call("terminal", r#"{"command":"echo again"}"#)])))
            .collect();
        let provider = Arc::new(SequentialMockProvider::new(replies));
        let agent = agent_with(provider.clone()).with_max_rounds(2);
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "loop forever")).await;

        assert_eq!(provider.call_count(), 2);
        assert_eq!(
            events.last(),
            Some(&AgentEvent::Error {
                message: AgentError::RoundLimitExceeded { limit: 2 }.to_string()
            })
        );
        let results = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::Result { .. }))
            .count();
        assert_eq!(results, 2);
    }

    #[tokio::test]
    async fn ask_user_suspends_and_resume_continues() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response(
                "",
                vec![
                    call("ask_user", r#"{"question":"Which target?","options":["web","ssh"]}"#),
                    call("terminal", r#"{"command":"echo skipped"}"#),
                ],
            )),
            Ok(make_text_response("Going after ssh.")),
        ]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.process(&mut session, "attack")).await;
        assert_eq!(events.len(), 1);
        let token = match &events[0] {
            AgentEvent::Choice { question, options, token } => {
                assert_eq!(question, "Which target?");
                assert_eq!(options, &vec!["web".to_string(), "ssh".to_string()]);
                token.clone()
            }
            other => panic!("expected choice, got {other:?}"),
        };
        assert!(session.is_suspended());
        assert_eq!(provider.call_count(), 1);

        // a new instruction is refused while the question is open
        let len_before = session.log().len();
        let refused = collect(agent.process(&mut session, "something else")).await;
        assert!(matches!(&refused[..], [AgentEvent::Error { .. }]));
        assert_eq!(session.log().len(), len_before);

        let events = collect(agent.resume(&mut session, &token, "ssh")).await;
        assert_eq!(events, vec![AgentEvent::Message { content: "Going after ssh.".into() }]);
        assert!(!session.is_suspended());

        let answer = &session.log().messages()[2];
        assert_eq!(answer.role, Role::Tool);
        assert_eq!(answer.tool_name.as_deref(), Some("ask_user"));
        assert_eq!(answer.content, "ssh");
    }

    #[tokio::test]
    async fn wrong_token_keeps_suspension() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_tool_call_response(
            "",
            vec![call("ask_user", r#"{"question":"Proceed?","options":["yes","no"]}"#)],
        ))]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        let _ = collect(agent.process(&mut session, "go")).await;
        assert!(session.is_suspended());

        let events = collect(agent.resume(&mut session, &ResumeToken::from("stale"), "yes")).await;
        assert_eq!(
            events,
            vec![AgentEvent::Error {
                message: AgentError::InvalidResumeToken.to_string()
            }]
        );
        assert!(session.is_suspended());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn resume_without_question_is_rejected() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let agent = agent_with(provider);
        let mut session = Session::with_context(BootContext::default());

        let events = collect(agent.resume(&mut session, &ResumeToken::new(), "yes")).await;
        assert_eq!(
            events,
            vec![AgentEvent::Error {
                message: AgentError::NotSuspended.to_string()
            }]
        );
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn cancel_during_model_call() {
        let agent = AgentLoop::new(Arc::new(HangingProvider), "test-model", Arc::new(test_registry()));
        let mut session = Session::with_context(BootContext::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let events = collect(agent.process_with_cancel(&mut session, "scan", cancel)).await;
        assert_eq!(events, vec![AgentEvent::Error { message: "Turn cancelled".into() }]);
        assert_eq!(session.log().len(), 1);
    }

    #[tokio::test]
    async fn dropping_the_stream_abandons_the_turn() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_tool_call_response("", vec![call("terminal", r#"{"command":"echo hi"}"#)])),
            Ok(make_text_response("unused")),
        ]));
        let agent = agent_with(provider.clone());
        let mut session = Session::with_context(BootContext::default());

        {
            let mut stream = agent.process(&mut session, "list files");
            let first = stream.next().await;
            assert_eq!(first, Some(AgentEvent::Command { command: "echo hi".into() }));
        }

        assert_eq!(provider.call_count(), 1);
        // the announced command never ran
        assert_eq!(session.log().len(), 2);
    }

    #[tokio::test]
    async fn context_is_read_on_every_call() {
        let provider = Arc::new(SequentialMockProvider::new(vec![
            Ok(make_text_response("first")),
            Ok(make_text_response("second")),
        ]));
        let agent = agent_with(provider.clone());
        let (tx, rx) = watch::channel(BootContext::default());
        let mut session = Session::new(rx);

        let _ = collect(agent.process(&mut session, "one")).await;
        tx.send_modify(|ctx| ctx.known_hosts.push("10.10.10.3".into()));
        let _ = collect(agent.process(&mut session, "two")).await;

        let first = provider.request(0);
        let second = provider.request(1);
        assert_eq!(first.messages[0].role, Role::System);
        assert!(first.messages[0].content.contains("Known hosts: None\n"));
        assert!(second.messages[0].content.contains("Known hosts: 10.10.10.3"));
        // system + user, then system + user + assistant + user
        assert_eq!(first.messages.len(), 2);
        assert_eq!(second.messages.len(), 4);
    }

    #[tokio::test]
    async fn request_carries_advertised_tools_only() {
        let provider = Arc::new(SequentialMockProvider::new(vec![Ok(make_text_response("ok"))]));
        let mut registry = test_registry();
        registry.set_advertised(["terminal", "finish"]);
        let agent = AgentLoop::new(provider.clone(), "test-model", Arc::new(registry));
        let mut session = Session::with_context(BootContext::default());

        let _ = collect(agent.process(&mut session, "hi")).await;

        let request = provider.request(0);
        assert_eq!(request.model, "test-model");
        let names: Vec<&str> = request.tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["terminal", "finish"]);
    }

    #[test]
    fn max_rounds_is_at_least_one() {
        let provider = Arc::new(SequentialMockProvider::new(vec![]));
        let agent = agent_with(provider).with_max_rounds(0);
        assert_eq!(agent.max_rounds(), 1);
    }
}
