// src/engine/core.rs

use super::AppEvent;

/// What the async shell should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreCommand {
    FinalizeWorkflow,
    ReloadWatch,
    StopWatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

/// Map one event to commands. Pure; all side effects happen in the shell.
pub fn step(event: AppEvent) -> Step {
    match event {
        AppEvent::SyncFinished => Step {
            commands: vec![CoreCommand::FinalizeWorkflow],
            keep_running: true,
        },
        AppEvent::ConfigChanged => Step {
            commands: vec![CoreCommand::ReloadWatch],
            keep_running: true,
        },
        AppEvent::ShutdownRequested => Step {
            commands: vec![CoreCommand::StopWatch],
            keep_running: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shutdown_stops_watching_and_exits() {
        let s = step(AppEvent::ShutdownRequested);
        assert_eq!(s.commands, vec![CoreCommand::StopWatch]);
        assert!(!s.keep_running);
    }

    #[test]
    fn signals_map_to_their_handlers() {
        assert_eq!(step(AppEvent::SyncFinished).commands, vec![CoreCommand::FinalizeWorkflow]);
        assert_eq!(step(AppEvent::ConfigChanged).commands, vec![CoreCommand::ReloadWatch]);
    }
}
