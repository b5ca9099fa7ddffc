// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use mismetas_app::{
    ActiveActivity, Config, CursorAction, FrontendState, GoalId, GoalSnapshot, PopulatedGoal,
};
use std::collections::HashSet;

/// In-process gateway for `--demo`: a seeded goal tree with the same wire
/// behavior as the real backend, so the app runs without another process.
/// Selection is an index path into the tree; `up`/`down` move between
/// siblings, `in` descends to the first child, `out` pops to the parent and
/// deselects at the root.
pub struct DemoGateway {
    goals: Vec<PopulatedGoal>,
    selected: Option<Vec<usize>>,
    focused: HashSet<GoalId>,
    activity: ActiveActivity,
    loaded: bool,
}

impl Default for DemoGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoGateway {
    pub fn new() -> Self {
        Self {
            goals: Vec::new(),
            selected: None,
            focused: HashSet::new(),
            activity: ActiveActivity::Goals,
            loaded: false,
        }
    }

    fn selected_goal(&self) -> Option<&PopulatedGoal> {
        node_at(&self.goals, self.selected.as_deref()?)
    }

    fn selected_goal_mut(&mut self) -> Option<&mut PopulatedGoal> {
        let path = self.selected.clone()?;
        node_at_mut(&mut self.goals, &path)
    }
}

impl mismetas_tui::BackendGateway for DemoGateway {
    fn load(&mut self) -> Result<()> {
        if !self.loaded {
            self.goals = seed_goals();
            self.activity = ActiveActivity::Help;
            self.loaded = true;
        }
        Ok(())
    }

    fn fetch(&mut self) -> Result<Option<FrontendState>> {
        if !self.loaded {
            return Ok(None);
        }

        Ok(Some(FrontendState {
            goal_state: GoalSnapshot {
                populated_goals: self.goals.clone(),
                selected_goal_id: self.selected_goal().map(|goal| goal.id),
                focused_goals: self.focused.clone(),
                config: Config::default(),
            },
            active_activity: self.activity,
        }))
    }

    fn app_command(&mut self, command: &str) -> Result<()> {
        let mut words = command.split_whitespace();
        match words.next() {
            Some("help") => {
                self.activity = ActiveActivity::Help;
            }
            Some("goals") => {
                self.activity = ActiveActivity::Goals;
            }
            Some("focus") => {
                let Some(goal) = self.selected_goal() else {
                    bail!("no goal is selected");
                };
                let id = goal.id;
                self.focused.insert(id);
            }
            Some("unfocus") => {
                let Some(goal) = self.selected_goal() else {
                    bail!("no goal is selected");
                };
                let id = goal.id;
                self.focused.remove(&id);
            }
            Some("effort") => {
                let amount: u32 = match words.next().and_then(|raw| raw.parse().ok()) {
                    Some(amount) => amount,
                    None => bail!("usage: effort <amount>"),
                };
                let Some(goal) = self.selected_goal_mut() else {
                    bail!("no goal is selected");
                };
                goal.effort_to_date = goal.effort_to_date.saturating_add(amount);
            }
            Some(other) => bail!("unknown command: {other}"),
            None => bail!("empty command"),
        }
        Ok(())
    }

    fn cursor_action(&mut self, action: CursorAction) -> Result<()> {
        let Some(path) = self.selected.as_mut() else {
            if !self.goals.is_empty() {
                self.selected = Some(vec![0]);
            }
            return Ok(());
        };

        match action {
            CursorAction::Down => {
                let siblings = sibling_count(&self.goals, path);
                if let Some(last) = path.last_mut()
                    && *last + 1 < siblings
                {
                    *last += 1;
                }
            }
            CursorAction::Up => {
                if let Some(last) = path.last_mut()
                    && *last > 0
                {
                    *last -= 1;
                }
            }
            CursorAction::In => {
                let has_children = node_at(&self.goals, path)
                    .map(|goal| !goal.children.is_empty())
                    .unwrap_or(false);
                if has_children {
                    path.push(0);
                }
            }
            CursorAction::Out => {
                if path.len() > 1 {
                    path.pop();
                } else {
                    self.selected = None;
                }
            }
        }
        Ok(())
    }

    fn set_active_activity(&mut self, activity: ActiveActivity) -> Result<()> {
        self.activity = activity;
        Ok(())
    }
}

fn node_at<'a>(goals: &'a [PopulatedGoal], path: &[usize]) -> Option<&'a PopulatedGoal> {
    let (first, rest) = path.split_first()?;
    let mut current = goals.get(*first)?;
    for index in rest {
        current = current.children.get(*index)?;
    }
    Some(current)
}

fn node_at_mut<'a>(goals: &'a mut [PopulatedGoal], path: &[usize]) -> Option<&'a mut PopulatedGoal> {
    let (first, rest) = path.split_first()?;
    let mut current = goals.get_mut(*first)?;
    for index in rest {
        current = current.children.get_mut(*index)?;
    }
    Some(current)
}

/// Sibling count of the node the path points at.
fn sibling_count(goals: &[PopulatedGoal], path: &[usize]) -> usize {
    if path.len() <= 1 {
        return goals.len();
    }
    node_at(goals, &path[..path.len() - 1])
        .map(|parent| parent.children.len())
        .unwrap_or(0)
}

fn demo_goal(
    id: u32,
    name: &str,
    effort_to_date: u32,
    effort_to_complete: u32,
    children: Vec<PopulatedGoal>,
) -> PopulatedGoal {
    let mut goal = PopulatedGoal {
        id: GoalId::new(id),
        parent_goal_id: None,
        name: name.to_owned(),
        effort_to_date,
        effort_to_complete,
        max_child_layer_width: 0,
        max_child_depth: 0,
        children,
    };
    stamp_hints(&mut goal);
    goal
}

fn stamp_hints(goal: &mut PopulatedGoal) {
    let parent_id = goal.id;
    let mut widest = 0;
    let mut deepest = 0;
    for child in &mut goal.children {
        child.parent_goal_id = Some(parent_id);
        deepest = deepest.max(child.max_child_depth + 1);
    }
    let mut layer: Vec<&PopulatedGoal> = goal.children.iter().collect();
    while !layer.is_empty() {
        widest = widest.max(layer.len());
        layer = layer.iter().flat_map(|g| g.children.iter()).collect();
    }
    goal.max_child_layer_width = widest;
    goal.max_child_depth = deepest;
}

fn seed_goals() -> Vec<PopulatedGoal> {
    vec![
        demo_goal(
            1,
            "Run a marathon",
            14,
            40,
            vec![
                demo_goal(2, "Build base mileage", 12, 20, Vec::new()),
                demo_goal(3, "Weekly speed work", 2, 12, Vec::new()),
            ],
        ),
        demo_goal(
            4,
            "Learn Spanish",
            9,
            30,
            vec![
                demo_goal(
                    5,
                    "Core vocabulary",
                    6,
                    10,
                    vec![demo_goal(6, "500 most common words", 6, 8, Vec::new())],
                ),
                demo_goal(7, "Weekly conversation practice", 3, 12, Vec::new()),
            ],
        ),
        demo_goal(8, "Ship the budgeting side project", 5, 25, Vec::new()),
    ]
}
