//! The SploitGPT agent loop.
//!
//! The agent follows a **Call → Act → Observe** cycle for every instruction:
//!
//! 1. **Receive** an operator instruction into the session's log
//! 2. **Build the prompt** (fixed rules + fresh environment context + tool catalog + history)
//! 3. **Call the model**
//! 4. **If tool calls**: run them in order, append results, go back to step 3
//! 5. **If `ask_user`**: suspend until the operator answers via `resume`
//! 6. **If `finish` or a plain answer**: end the turn
//!
//! Progress is reported as a stream of [`AgentEvent`]s.

pub mod loop_runner;
pub mod prompt;
pub mod session;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use loop_runner::{AgentLoop, DEFAULT_MAX_ROUNDS};
pub use prompt::build_system_prompt;
pub use session::{PendingChoice, ResumeToken, Session};
pub use stream_event::AgentEvent;
