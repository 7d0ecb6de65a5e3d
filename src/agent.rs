// Agent self-control: uptime and stop/restart requests from the HTTP surface.

use std::time::Instant;
use tokio::sync::mpsc;

/// Exit status asking the supervisor (systemd, Docker restart policy) to start us again.
pub const RESTART_EXIT_CODE: i32 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentCommand {
    Stop,
    Restart,
}

#[derive(Debug, Clone)]
pub struct AgentControl {
    started_at: Instant,
    commands: mpsc::Sender<AgentCommand>,
}

impl AgentControl {
    pub fn new() -> (Self, mpsc::Receiver<AgentCommand>) {
        let (commands, rx) = mpsc::channel(1);
        (
            Self {
                started_at: Instant::now(),
                commands,
            },
            rx,
        )
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Returns false when the main loop is no longer listening.
    pub fn request(&self, command: AgentCommand) -> bool {
        match self.commands.try_send(command) {
            Ok(()) => true,
            // A command is already pending; the agent is going down either way.
            Err(mpsc::error::TrySendError::Full(_)) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }
}
