//! The conversation-turn seam between the orchestrator and a human.
//!
//! Headless runs have no provider; the orchestrator then skips every
//! interactive phase instead of blocking on input.

/// Supplies input lines and displays narrative output during a run.
pub trait TurnProvider: Send {
    /// Display `prompt` and return the next input line.
    ///
    /// `None` means the input stream has ended; the orchestrator treats it
    /// like the user walking away.
    fn request_line(&mut self, prompt: &str) -> Option<String>;

    /// Display narrative output (questions, progress, answers) to the user.
    fn notify(&mut self, text: &str);
}
