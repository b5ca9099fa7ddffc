// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use mismetas_app::{
    ActiveActivity, Config, FrontendState, GoalId, GoalSnapshot, PopulatedGoal,
};
use std::io::Read;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

pub fn goal(id: u32, name: &str, effort_to_date: u32, effort_to_complete: u32) -> PopulatedGoal {
    PopulatedGoal {
        id: GoalId::new(id),
        parent_goal_id: None,
        name: name.to_owned(),
        effort_to_date,
        effort_to_complete,
        max_child_layer_width: 0,
        max_child_depth: 0,
        children: Vec::new(),
    }
}

/// Attaches children and restamps parent ids and layout hints through the
/// whole subtree, the way the backend materializes them.
pub fn with_children(mut parent: PopulatedGoal, children: Vec<PopulatedGoal>) -> PopulatedGoal {
    parent.children = children;
    restamp(&mut parent);
    parent
}

fn restamp(goal: &mut PopulatedGoal) {
    let parent_id = goal.id;
    for child in &mut goal.children {
        child.parent_goal_id = Some(parent_id);
        restamp(child);
    }
    goal.max_child_depth = goal
        .children
        .iter()
        .map(|child| child.max_child_depth + 1)
        .max()
        .unwrap_or(0);
    goal.max_child_layer_width = max_layer_width(goal);
}

fn max_layer_width(goal: &PopulatedGoal) -> usize {
    let mut widest = 0;
    let mut layer: Vec<&PopulatedGoal> = goal.children.iter().collect();
    while !layer.is_empty() {
        widest = widest.max(layer.len());
        layer = layer.iter().flat_map(|g| g.children.iter()).collect();
    }
    widest
}

/// A small believable hierarchy shared by tests and the demo gateway.
pub fn sample_goals() -> Vec<PopulatedGoal> {
    vec![
        with_children(
            goal(1, "Run a marathon", 14, 40),
            vec![
                goal(2, "Build base mileage", 12, 20),
                goal(3, "Weekly speed work", 2, 12),
            ],
        ),
        with_children(
            goal(4, "Learn Spanish", 9, 30),
            vec![
                with_children(
                    goal(5, "Core vocabulary", 6, 10),
                    vec![goal(6, "500 most common words", 6, 8)],
                ),
                goal(7, "Weekly conversation practice", 3, 12),
            ],
        ),
        goal(8, "Ship the budgeting side project", 5, 25),
    ]
}

pub fn snapshot(
    goals: Vec<PopulatedGoal>,
    selected: Option<u32>,
    focused: &[u32],
    activity: ActiveActivity,
) -> FrontendState {
    FrontendState {
        goal_state: GoalSnapshot {
            populated_goals: goals,
            selected_goal_id: selected.map(GoalId::new),
            focused_goals: focused.iter().copied().map(GoalId::new).collect(),
            config: Config::default(),
        },
        active_activity: activity,
    }
}

pub fn sample_snapshot() -> FrontendState {
    snapshot(sample_goals(), Some(1), &[4], ActiveActivity::Goals)
}

/// One canned reply of the scripted mock backend.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Ok,
    Snapshot(Box<FrontendState>),
    NoSnapshot,
    Error(u16, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub body: String,
}

/// tiny_http server that answers exactly `replies.len()` requests in order,
/// recording each one, then shuts down. `finish()` joins the server thread
/// and returns the recording.
pub struct ScriptedBackend {
    base_url: String,
    handle: JoinHandle<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn serve(replies: Vec<ScriptedReply>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock backend: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || {
            let mut recorded = Vec::new();
            for reply in replies {
                let Ok(mut request) = server.recv() else {
                    break;
                };

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                recorded.push(RecordedRequest {
                    method: request.method().to_string(),
                    url: request.url().to_owned(),
                    body,
                });

                let (status, payload) = match &reply {
                    ScriptedReply::Ok => (200_u16, "{}".to_owned()),
                    ScriptedReply::Snapshot(state) => (
                        200_u16,
                        serde_json::to_string(state.as_ref()).unwrap_or_else(|_| "null".to_owned()),
                    ),
                    ScriptedReply::NoSnapshot => (200_u16, "null".to_owned()),
                    ScriptedReply::Error(status, message) => (
                        *status,
                        serde_json::json!({ "error": message }).to_string(),
                    ),
                };

                let response =
                    Response::from_string(payload).with_status_code(tiny_http::StatusCode(status));
                let response = match Header::from_bytes("Content-Type", "application/json") {
                    Ok(header) => response.with_header(header),
                    Err(()) => response,
                };
                let _ = request.respond(response);
            }
            recorded
        });

        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().unwrap_or_default()
    }
}
