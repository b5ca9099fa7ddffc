// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GoalId(u32);

impl GoalId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for GoalId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// One node of the backend's materialized goal hierarchy. The layer width
/// and depth fields are layout hints computed by the backend; they pass
/// through this client untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedGoal {
    pub id: GoalId,
    #[serde(rename = "parentGoalId")]
    pub parent_goal_id: Option<GoalId>,
    pub name: String,
    #[serde(rename = "effortToDate")]
    pub effort_to_date: u32,
    #[serde(rename = "effortToComplete")]
    pub effort_to_complete: u32,
    #[serde(rename = "maxChildLayerWidth")]
    pub max_child_layer_width: usize,
    #[serde(rename = "maxChildLayerDepth")]
    pub max_child_depth: usize,
    pub children: Vec<PopulatedGoal>,
}

impl PopulatedGoal {
    pub const fn is_complete(&self) -> bool {
        self.effort_to_date >= self.effort_to_complete
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(rename = "fontSizePixels")]
    pub font_size_pixels: u32,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
    #[serde(rename = "fontColor")]
    pub font_color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            font_size_pixels: 14,
            background_color: "gray".to_owned(),
            font_color: "black".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    pub display: DisplayConfig,
}

/// The goal-state half of a fetched snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSnapshot {
    #[serde(rename = "populatedGoals")]
    pub populated_goals: Vec<PopulatedGoal>,
    #[serde(rename = "selectedGoalId")]
    pub selected_goal_id: Option<GoalId>,
    #[serde(rename = "focusedGoals")]
    pub focused_goals: HashSet<GoalId>,
    pub config: Config,
}

/// The complete authoritative state the backend reports from `fetch`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontendState {
    #[serde(rename = "goalState")]
    pub goal_state: GoalSnapshot,
    #[serde(rename = "activeActivity")]
    pub active_activity: ActiveActivity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActiveActivity {
    Goals,
    Help,
}

impl ActiveActivity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Goals => "Goals",
            Self::Help => "Help",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Goals" => Some(Self::Goals),
            "Help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorAction {
    #[serde(rename = "up")]
    Up,
    #[serde(rename = "down")]
    Down,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "out")]
    Out,
}

impl CursorAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::In => "in",
            Self::Out => "out",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "in" => Some(Self::In),
            "out" => Some(Self::Out),
            _ => None,
        }
    }
}
