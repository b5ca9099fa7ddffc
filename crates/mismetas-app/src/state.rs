// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::commandline::{CommandlineState, InputKey};
use crate::model::{ActiveActivity, DisplayConfig, FrontendState, GoalId, PopulatedGoal};
use std::collections::HashSet;

/// The last-fetched goal hierarchy plus its selection metadata. Replaced
/// wholesale on every applied snapshot, never merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalCache {
    pub populated_goals: Vec<PopulatedGoal>,
    pub selected_goal_id: Option<GoalId>,
    pub focused_goals: HashSet<GoalId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GoalState {
    #[default]
    Unloaded,
    Loaded(GoalCache),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub commandline: CommandlineState,
    pub goals: GoalState,
    pub display: DisplayConfig,
    pub active_activity: ActiveActivity,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            commandline: CommandlineState::Empty,
            goals: GoalState::Unloaded,
            display: DisplayConfig::default(),
            active_activity: ActiveActivity::Goals,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    Key(InputKey),
    ApplySnapshot(Box<FrontendState>),
    ReportError(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    CommandlineChanged(CommandlineState),
    SnapshotApplied,
    ActivityChanged(ActiveActivity),
    ErrorDisplayed(String),
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::Key(key) => {
                let next = self.commandline.apply(key);
                if next == self.commandline {
                    return Vec::new();
                }
                self.commandline = next.clone();
                vec![AppEvent::CommandlineChanged(next)]
            }
            AppCommand::ApplySnapshot(snapshot) => self.apply_snapshot(*snapshot),
            AppCommand::ReportError(message) => {
                self.commandline = CommandlineState::error(message.clone());
                vec![
                    AppEvent::CommandlineChanged(self.commandline.clone()),
                    AppEvent::ErrorDisplayed(message),
                ]
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: FrontendState) -> Vec<AppEvent> {
        let FrontendState {
            goal_state,
            active_activity,
        } = snapshot;

        self.goals = GoalState::Loaded(GoalCache {
            populated_goals: goal_state.populated_goals,
            selected_goal_id: goal_state.selected_goal_id,
            focused_goals: goal_state.focused_goals,
        });
        self.display = goal_state.config.display;

        let mut events = vec![AppEvent::SnapshotApplied];
        if self.active_activity != active_activity {
            self.active_activity = active_activity;
            events.push(AppEvent::ActivityChanged(active_activity));
        }
        events
    }
}
