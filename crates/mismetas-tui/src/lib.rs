// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use mismetas_app::{
    ActiveActivity, AppCommand, AppState, CommandlineState, CursorAction, DisplayConfig,
    FrontendState, GoalId, GoalState, InputKey, PopulatedGoal,
};
use ratatui::Frame;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use std::collections::HashSet;
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

const FOCUS_MARK: &str = "*";
const COMPLETE_MARK: &str = " ✓";
const PENDING_MARK: &str = "…";
const INDENT: &str = "  ";

const HELP_LINES: &[&str] = &[
    "mismetas keys",
    "",
    "  h / j / k / l   move the cursor out / down / up / in",
    "  :               open the commandline",
    "  Enter           submit the typed command",
    "  Esc             clear the commandline or a reported error",
    "  Backspace       delete the last typed character",
    "  q               leave this help view",
    "  Ctrl-q          quit",
    "",
    "commands are handled by the backend; try :help for its command list",
];

/// One backend mutation the dispatch pipeline can issue. `Load` is the
/// startup priming call; the others map one key event each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendInvocation {
    Load,
    AppCommand(String),
    CursorAction(CursorAction),
    SetActiveActivity(ActiveActivity),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    Completed {
        request_id: u64,
        snapshot: Option<FrontendState>,
    },
    Failed {
        request_id: u64,
        error: String,
    },
}

impl DispatchEvent {
    pub const fn request_id(&self) -> u64 {
        match self {
            Self::Completed { request_id, .. } | Self::Failed { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    Dispatch(DispatchEvent),
}

/// Seam to the backend process. Implementations provide the five wire
/// operations; the provided methods implement the invoke-then-refetch
/// discipline and the event-channel handoff. Production gateways override
/// `spawn_invocation` to run the round trip on a worker thread.
pub trait BackendGateway {
    fn load(&mut self) -> Result<()>;
    fn fetch(&mut self) -> Result<Option<FrontendState>>;
    fn app_command(&mut self, command: &str) -> Result<()>;
    fn cursor_action(&mut self, action: CursorAction) -> Result<()>;
    fn set_active_activity(&mut self, activity: ActiveActivity) -> Result<()>;

    /// Runs one invocation and, on success, reads back the authoritative
    /// snapshot. A failed invocation performs no fetch.
    fn run_invocation(
        &mut self,
        invocation: &BackendInvocation,
    ) -> Result<Option<FrontendState>> {
        match invocation {
            BackendInvocation::Load => self.load()?,
            BackendInvocation::AppCommand(command) => self.app_command(command)?,
            BackendInvocation::CursorAction(action) => self.cursor_action(*action)?,
            BackendInvocation::SetActiveActivity(activity) => {
                self.set_active_activity(*activity)?;
            }
        }
        self.fetch()
    }

    fn spawn_invocation(
        &mut self,
        request_id: u64,
        invocation: BackendInvocation,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let event = match self.run_invocation(&invocation) {
            Ok(snapshot) => DispatchEvent::Completed {
                request_id,
                snapshot,
            },
            Err(error) => DispatchEvent::Failed {
                request_id,
                error: error.to_string(),
            },
        };
        tx.send(InternalEvent::Dispatch(event))
            .map_err(|_| anyhow!("dispatch event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ViewData {
    pending: usize,
    next_request_id: u64,
}

pub fn run_app<G: BackendGateway>(state: &mut AppState, gateway: &mut G) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    // Prime the backend session, then pull the first snapshot.
    dispatch_invocation(
        state,
        gateway,
        &mut view_data,
        BackendInvocation::Load,
        &internal_tx,
    );

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, gateway, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

/// Applies completed dispatch tails in arrival order. Overlapping
/// invocations are allowed; every completion carries a full snapshot, so
/// the last one to arrive wins and no merge ever happens.
fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::Dispatch(event) => handle_dispatch_event(state, view_data, event),
        }
    }
}

fn handle_dispatch_event(state: &mut AppState, view_data: &mut ViewData, event: DispatchEvent) {
    view_data.pending = view_data.pending.saturating_sub(1);
    match event {
        DispatchEvent::Completed {
            snapshot: Some(snapshot),
            ..
        } => {
            state.dispatch(AppCommand::ApplySnapshot(Box::new(snapshot)));
        }
        // An absent snapshot means the backend had nothing to report;
        // every cache keeps its previous value.
        DispatchEvent::Completed { snapshot: None, .. } => {}
        DispatchEvent::Failed { error, .. } => {
            state.dispatch(AppCommand::ReportError(error));
        }
    }
}

fn input_key_for(key: KeyEvent) -> Option<InputKey> {
    match key.code {
        KeyCode::Char(c) => Some(InputKey::Char(c)),
        KeyCode::Enter => Some(InputKey::Enter),
        KeyCode::Esc => Some(InputKey::Escape),
        KeyCode::Backspace => Some(InputKey::Backspace),
        KeyCode::Delete => Some(InputKey::Delete),
        _ => None,
    }
}

/// The dispatch pipeline for one key event: submit on Enter while typing,
/// apply the commandline transition regardless, and in navigation mode map
/// cursor keys to backend actions. Returns true when the app should quit.
fn handle_key_event<G: BackendGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    let Some(input) = input_key_for(key) else {
        return false;
    };

    let was_typing = state.commandline.is_typing();
    let mut submitted = false;
    if was_typing
        && input == InputKey::Enter
        && let Some(command) = state.commandline.submission()
    {
        submitted = true;
        dispatch_invocation(
            state,
            gateway,
            view_data,
            BackendInvocation::AppCommand(command),
            internal_tx,
        );
    }

    state.dispatch(AppCommand::Key(input));

    if !was_typing
        && !submitted
        && let Some(invocation) = navigation_invocation(input, state.active_activity)
    {
        dispatch_invocation(state, gateway, view_data, invocation, internal_tx);
    }

    false
}

fn navigation_invocation(input: InputKey, activity: ActiveActivity) -> Option<BackendInvocation> {
    match input {
        InputKey::Char('h') => Some(BackendInvocation::CursorAction(CursorAction::Out)),
        InputKey::Char('j') => Some(BackendInvocation::CursorAction(CursorAction::Down)),
        InputKey::Char('k') => Some(BackendInvocation::CursorAction(CursorAction::Up)),
        InputKey::Char('l') => Some(BackendInvocation::CursorAction(CursorAction::In)),
        InputKey::Char('q') if activity == ActiveActivity::Help => {
            Some(BackendInvocation::SetActiveActivity(ActiveActivity::Goals))
        }
        _ => None,
    }
}

fn dispatch_invocation<G: BackendGateway>(
    state: &mut AppState,
    gateway: &mut G,
    view_data: &mut ViewData,
    invocation: BackendInvocation,
    internal_tx: &Sender<InternalEvent>,
) {
    let request_id = next_request_id(view_data);
    view_data.pending += 1;
    if let Err(error) = gateway.spawn_invocation(request_id, invocation, internal_tx.clone()) {
        view_data.pending = view_data.pending.saturating_sub(1);
        state.dispatch(AppCommand::ReportError(error.to_string()));
    }
}

fn next_request_id(view_data: &mut ViewData) -> u64 {
    view_data.next_request_id = view_data.next_request_id.saturating_add(1);
    view_data.next_request_id
}

fn render(frame: &mut Frame, state: &AppState, view_data: &ViewData) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());

    match state.active_activity {
        ActiveActivity::Goals => render_goals(frame, state, chunks[0]),
        ActiveActivity::Help => render_help(frame, chunks[0]),
    }
    render_commandline(frame, state, view_data, chunks[1]);
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct GoalRow {
    id: GoalId,
    depth: usize,
    name: String,
    effort_to_date: u32,
    effort_to_complete: u32,
    complete: bool,
    focused: bool,
}

impl GoalRow {
    fn text(&self) -> String {
        let indent = INDENT.repeat(self.depth);
        let focus = if self.focused { FOCUS_MARK } else { " " };
        let complete = if self.complete { COMPLETE_MARK } else { "" };
        format!(
            "{indent}{focus}{} {}/{}{complete}",
            self.name, self.effort_to_date, self.effort_to_complete
        )
    }
}

fn goal_rows(goals: &[PopulatedGoal], focused: &HashSet<GoalId>) -> Vec<GoalRow> {
    fn visit(
        goal: &PopulatedGoal,
        depth: usize,
        focused: &HashSet<GoalId>,
        rows: &mut Vec<GoalRow>,
    ) {
        rows.push(GoalRow {
            id: goal.id,
            depth,
            name: goal.name.clone(),
            effort_to_date: goal.effort_to_date,
            effort_to_complete: goal.effort_to_complete,
            complete: goal.is_complete(),
            focused: focused.contains(&goal.id),
        });
        for child in &goal.children {
            visit(child, depth + 1, focused, rows);
        }
    }

    let mut rows = Vec::new();
    for goal in goals {
        visit(goal, 0, focused, &mut rows);
    }
    rows
}

/// Keeps the selected row visible inside `height` lines, preferring to keep
/// it roughly centered.
fn scroll_offset(selected: Option<usize>, row_count: usize, height: usize) -> usize {
    let max_scroll = row_count.saturating_sub(height);
    let Some(index) = selected else {
        return 0;
    };
    index
        .saturating_sub(height.saturating_sub(1) / 2)
        .min(max_scroll)
}

fn render_goals(frame: &mut Frame, state: &AppState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("goals");

    let GoalState::Loaded(cache) = &state.goals else {
        let placeholder = Paragraph::new("waiting for the backend…").block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let rows = goal_rows(&cache.populated_goals, &cache.focused_goals);
    if rows.is_empty() {
        let placeholder = Paragraph::new("no goals yet; create one with the commandline")
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let selected_index = cache
        .selected_goal_id
        .and_then(|id| rows.iter().position(|row| row.id == id));
    let height = usize::from(area.height.saturating_sub(2));
    let scroll = scroll_offset(selected_index, rows.len(), height);

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let style = if Some(index) == selected_index {
                Style::default().add_modifier(Modifier::REVERSED)
            } else if row.complete {
                Style::default().fg(Color::Green)
            } else {
                Style::default()
            };
            Line::from(Span::styled(row.text(), style))
        })
        .collect();

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((scroll as u16, 0));
    frame.render_widget(paragraph, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = HELP_LINES.iter().map(|line| Line::from(*line)).collect();
    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("help"));
    frame.render_widget(paragraph, area);
}

fn render_commandline(frame: &mut Frame, state: &AppState, view_data: &ViewData, area: Rect) {
    let text = commandline_text(&state.commandline, view_data.pending);
    let paragraph = Paragraph::new(text).style(commandline_style(&state.display));
    frame.render_widget(paragraph, area);
}

fn commandline_text(commandline: &CommandlineState, pending: usize) -> String {
    let text = commandline.display_text();
    if pending > 0 {
        format!("{text} {PENDING_MARK}")
    } else {
        text
    }
}

fn commandline_style(display: &DisplayConfig) -> Style {
    let mut style = Style::default();
    if let Some(bg) = parse_color(&display.background_color) {
        style = style.bg(bg);
    }
    if let Some(fg) = parse_color(&display.font_color) {
        style = style.fg(fg);
    }
    style
}

/// Lenient color parsing for the backend-supplied display config; unknown
/// values fall back to the terminal defaults.
fn parse_color(value: &str) -> Option<Color> {
    let normalized = value.trim().to_ascii_lowercase();
    if let Some(hex) = normalized.strip_prefix('#')
        && hex.len() == 6
        && hex.is_ascii()
        && let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&hex[0..2], 16),
            u8::from_str_radix(&hex[2..4], 16),
            u8::from_str_radix(&hex[4..6], 16),
        )
    {
        return Some(Color::Rgb(r, g, b));
    }

    match normalized.as_str() {
        "black" => Some(Color::Black),
        "white" => Some(Color::White),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BackendGateway, BackendInvocation, DispatchEvent, InternalEvent, ViewData,
        commandline_text, goal_rows, handle_key_event, navigation_invocation, parse_color,
        process_internal_events, scroll_offset,
    };
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use mismetas_app::{
        ActiveActivity, AppState, CommandlineState, Config, CursorAction, DisplayConfig,
        FrontendState, GoalId, GoalSnapshot, GoalState, InputKey, PopulatedGoal,
    };
    use ratatui::style::Color;
    use std::collections::HashSet;
    use std::sync::mpsc::{self, Receiver, Sender};

    fn goal(id: u32, name: &str, done: u32, total: u32) -> PopulatedGoal {
        PopulatedGoal {
            id: GoalId::new(id),
            parent_goal_id: None,
            name: name.to_owned(),
            effort_to_date: done,
            effort_to_complete: total,
            max_child_layer_width: 0,
            max_child_depth: 0,
            children: Vec::new(),
        }
    }

    fn snapshot(ids: &[u32], selected: Option<u32>, activity: ActiveActivity) -> FrontendState {
        FrontendState {
            goal_state: GoalSnapshot {
                populated_goals: ids.iter().map(|id| goal(*id, "goal", 0, 5)).collect(),
                selected_goal_id: selected.map(GoalId::new),
                focused_goals: HashSet::new(),
                config: Config::default(),
            },
            active_activity: activity,
        }
    }

    #[derive(Debug, Default)]
    struct TestGateway {
        invocations: Vec<BackendInvocation>,
        fetch_count: usize,
        fetch_results: Vec<Option<FrontendState>>,
        fail_load: Option<String>,
        fail_app_command: Option<String>,
        fail_cursor_action: Option<String>,
    }

    impl TestGateway {
        fn with_fetch(results: Vec<Option<FrontendState>>) -> Self {
            Self {
                fetch_results: results,
                ..Self::default()
            }
        }
    }

    impl BackendGateway for TestGateway {
        fn load(&mut self) -> Result<()> {
            self.invocations.push(BackendInvocation::Load);
            match self.fail_load.take() {
                Some(error) => Err(anyhow!("{error}")),
                None => Ok(()),
            }
        }

        fn fetch(&mut self) -> Result<Option<FrontendState>> {
            self.fetch_count += 1;
            if self.fetch_results.is_empty() {
                Ok(None)
            } else {
                Ok(self.fetch_results.remove(0))
            }
        }

        fn app_command(&mut self, command: &str) -> Result<()> {
            self.invocations
                .push(BackendInvocation::AppCommand(command.to_owned()));
            match self.fail_app_command.take() {
                Some(error) => Err(anyhow!("{error}")),
                None => Ok(()),
            }
        }

        fn cursor_action(&mut self, action: CursorAction) -> Result<()> {
            self.invocations
                .push(BackendInvocation::CursorAction(action));
            match self.fail_cursor_action.take() {
                Some(error) => Err(anyhow!("{error}")),
                None => Ok(()),
            }
        }

        fn set_active_activity(&mut self, activity: ActiveActivity) -> Result<()> {
            self.invocations
                .push(BackendInvocation::SetActiveActivity(activity));
            Ok(())
        }
    }

    fn internal_channel() -> (Sender<InternalEvent>, Receiver<InternalEvent>) {
        mpsc::channel()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn run_key_script(
        state: &mut AppState,
        gateway: &mut TestGateway,
        view_data: &mut ViewData,
        tx: &Sender<InternalEvent>,
        rx: &Receiver<InternalEvent>,
        keys: &[KeyEvent],
    ) {
        for key in keys {
            let _ = handle_key_event(state, gateway, view_data, tx, *key);
            process_internal_events(state, view_data, rx);
        }
    }

    fn type_command(text: &str) -> Vec<KeyEvent> {
        text.chars().map(|c| key(KeyCode::Char(c))).collect()
    }

    #[test]
    fn colon_opens_the_commandline_with_cursor_marker() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char(':'))],
        );

        assert_eq!(state.commandline, CommandlineState::typing(":"));
        assert_eq!(commandline_text(&state.commandline, 0), ":|");
        assert!(gateway.invocations.is_empty());
    }

    #[test]
    fn enter_submits_the_command_with_marker_stripped() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        let mut keys = type_command(":help");
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut gateway, &mut view_data, &tx, &rx, &keys);

        assert_eq!(
            gateway.invocations,
            vec![BackendInvocation::AppCommand("help".to_owned())]
        );
        assert_eq!(state.commandline, CommandlineState::Empty);
    }

    #[test]
    fn commandline_clears_before_the_failure_arrives() {
        let mut state = AppState::default();
        let mut gateway = TestGateway {
            fail_app_command: Some("unknown command".to_owned()),
            ..TestGateway::default()
        };
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &type_command(":frob"),
        );

        let _ = handle_key_event(&mut state, &mut gateway, &mut view_data, &tx, key(KeyCode::Enter));
        // The synchronous transition clears the buffer regardless of the
        // invocation outcome; the failure is still queued.
        assert_eq!(state.commandline, CommandlineState::Empty);

        process_internal_events(&mut state, &mut view_data, &rx);
        assert_eq!(state.commandline, CommandlineState::error("unknown command"));
    }

    #[test]
    fn failed_command_skips_the_refresh() {
        let mut state = AppState::default();
        let mut gateway = TestGateway {
            fail_app_command: Some("unknown command".to_owned()),
            ..TestGateway::default()
        };
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        let mut keys = type_command(":frob");
        keys.push(key(KeyCode::Enter));
        run_key_script(&mut state, &mut gateway, &mut view_data, &tx, &rx, &keys);

        assert_eq!(state.commandline, CommandlineState::error("unknown command"));
        assert_eq!(gateway.fetch_count, 0);
        assert_eq!(state.goals, GoalState::Unloaded);
    }

    #[test]
    fn navigation_keys_map_to_cursor_actions() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::with_fetch(vec![
            Some(snapshot(&[1, 2], Some(1), ActiveActivity::Goals)),
            Some(snapshot(&[1, 2], Some(2), ActiveActivity::Goals)),
        ]);
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char('k')), key(KeyCode::Char('j'))],
        );

        assert_eq!(
            gateway.invocations,
            vec![
                BackendInvocation::CursorAction(CursorAction::Up),
                BackendInvocation::CursorAction(CursorAction::Down),
            ]
        );
        // Each success refetched; the last snapshot's selection is live.
        assert_eq!(gateway.fetch_count, 2);
        let GoalState::Loaded(cache) = &state.goals else {
            panic!("goals should be loaded");
        };
        assert_eq!(cache.selected_goal_id, Some(GoalId::new(2)));
    }

    #[test]
    fn navigation_mapping_covers_all_four_directions() {
        let cases = [
            ('h', CursorAction::Out),
            ('j', CursorAction::Down),
            ('k', CursorAction::Up),
            ('l', CursorAction::In),
        ];
        for (c, action) in cases {
            assert_eq!(
                navigation_invocation(InputKey::Char(c), ActiveActivity::Goals),
                Some(BackendInvocation::CursorAction(action))
            );
        }
        assert_eq!(
            navigation_invocation(InputKey::Char('x'), ActiveActivity::Goals),
            None
        );
        assert_eq!(
            navigation_invocation(InputKey::Enter, ActiveActivity::Goals),
            None
        );
    }

    #[test]
    fn typed_navigation_letters_are_buffer_edits() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::default();
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &type_command(":jjkh"),
        );

        assert_eq!(state.commandline, CommandlineState::typing(":jjkh"));
        assert!(gateway.invocations.is_empty());
        assert_eq!(gateway.fetch_count, 0);
    }

    #[test]
    fn q_leaves_help_but_not_goals() {
        let mut state = AppState {
            active_activity: ActiveActivity::Help,
            ..AppState::default()
        };
        let mut gateway = TestGateway::with_fetch(vec![Some(snapshot(
            &[1],
            None,
            ActiveActivity::Goals,
        ))]);
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char('q'))],
        );
        assert_eq!(
            gateway.invocations,
            vec![BackendInvocation::SetActiveActivity(ActiveActivity::Goals)]
        );
        assert_eq!(state.active_activity, ActiveActivity::Goals);

        // Now in Goals, q maps to nothing.
        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char('q'))],
        );
        assert_eq!(gateway.invocations.len(), 1);
    }

    #[test]
    fn error_state_still_navigates() {
        let mut state = AppState::default();
        state.dispatch(mismetas_app::AppCommand::ReportError("backend down".to_owned()));
        let mut gateway = TestGateway::with_fetch(vec![Some(snapshot(
            &[1],
            Some(1),
            ActiveActivity::Goals,
        ))]);
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char('j'))],
        );

        assert_eq!(
            gateway.invocations,
            vec![BackendInvocation::CursorAction(CursorAction::Down)]
        );
        // The refresh succeeded but only a keypress clears the error text.
        assert_eq!(state.commandline, CommandlineState::error("backend down"));
        assert!(matches!(state.goals, GoalState::Loaded(_)));
    }

    #[test]
    fn absent_snapshot_leaves_every_cache_untouched() {
        let mut state = AppState::default();
        state.dispatch(mismetas_app::AppCommand::ApplySnapshot(Box::new(snapshot(
            &[1, 2],
            Some(1),
            ActiveActivity::Goals,
        ))));
        let before = state.clone();

        let mut gateway = TestGateway::with_fetch(vec![None]);
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        run_key_script(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            &rx,
            &[key(KeyCode::Char('j'))],
        );

        assert_eq!(gateway.fetch_count, 1);
        assert_eq!(state, before);
    }

    #[test]
    fn overlapping_completions_apply_in_arrival_order() {
        let mut state = AppState::default();
        let mut view_data = ViewData {
            pending: 2,
            next_request_id: 2,
        };
        let (tx, rx) = internal_channel();

        // The first-issued request resolves last: its snapshot wins.
        tx.send(InternalEvent::Dispatch(DispatchEvent::Completed {
            request_id: 2,
            snapshot: Some(snapshot(&[1, 2], Some(2), ActiveActivity::Goals)),
        }))
        .expect("send completion");
        tx.send(InternalEvent::Dispatch(DispatchEvent::Completed {
            request_id: 1,
            snapshot: Some(snapshot(&[9], Some(9), ActiveActivity::Goals)),
        }))
        .expect("send completion");

        process_internal_events(&mut state, &mut view_data, &rx);

        let GoalState::Loaded(cache) = &state.goals else {
            panic!("goals should be loaded");
        };
        assert_eq!(cache.selected_goal_id, Some(GoalId::new(9)));
        assert_eq!(view_data.pending, 0);
    }

    #[test]
    fn startup_load_primes_and_fetches() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::with_fetch(vec![Some(snapshot(
            &[1],
            Some(1),
            ActiveActivity::Help,
        ))]);
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        super::dispatch_invocation(
            &mut state,
            &mut gateway,
            &mut view_data,
            BackendInvocation::Load,
            &tx,
        );
        process_internal_events(&mut state, &mut view_data, &rx);

        assert_eq!(gateway.invocations, vec![BackendInvocation::Load]);
        assert_eq!(gateway.fetch_count, 1);
        assert_eq!(state.active_activity, ActiveActivity::Help);
    }

    #[test]
    fn failed_load_surfaces_in_the_commandline() {
        let mut state = AppState::default();
        let mut gateway = TestGateway {
            fail_load: Some("cannot reach http://127.0.0.1:4242".to_owned()),
            ..TestGateway::default()
        };
        let mut view_data = ViewData::default();
        let (tx, rx) = internal_channel();

        super::dispatch_invocation(
            &mut state,
            &mut gateway,
            &mut view_data,
            BackendInvocation::Load,
            &tx,
        );
        process_internal_events(&mut state, &mut view_data, &rx);

        assert_eq!(
            state.commandline,
            CommandlineState::error("cannot reach http://127.0.0.1:4242")
        );
        assert_eq!(gateway.fetch_count, 0);
    }

    #[test]
    fn ctrl_q_quits() {
        let mut state = AppState::default();
        let mut gateway = TestGateway::default();
        let mut view_data = ViewData::default();
        let (tx, _rx) = internal_channel();

        let should_quit = handle_key_event(
            &mut state,
            &mut gateway,
            &mut view_data,
            &tx,
            KeyEvent::new(KeyCode::Char('q'), KeyModifiers::CONTROL),
        );
        assert!(should_quit);
        assert!(gateway.invocations.is_empty());
    }

    #[test]
    fn goal_rows_flatten_depth_first_with_markers() {
        let tree = PopulatedGoal {
            children: vec![
                goal(2, "child a", 5, 5),
                PopulatedGoal {
                    children: vec![goal(4, "grandchild", 0, 2)],
                    ..goal(3, "child b", 1, 4)
                },
            ],
            ..goal(1, "root", 3, 9)
        };
        let focused = HashSet::from([GoalId::new(3)]);

        let rows = goal_rows(&[tree], &focused);
        let ids: Vec<u32> = rows.iter().map(|row| row.id.get()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(rows[0].text(), " root 3/9");
        assert_eq!(rows[1].text(), "   child a 5/5 ✓");
        assert_eq!(rows[2].text(), "  *child b 1/4");
        assert_eq!(rows[3].text(), "     grandchild 0/2");
    }

    #[test]
    fn scroll_keeps_the_selection_visible() {
        assert_eq!(scroll_offset(None, 100, 10), 0);
        assert_eq!(scroll_offset(Some(0), 100, 10), 0);
        assert_eq!(scroll_offset(Some(50), 100, 10), 46);
        assert_eq!(scroll_offset(Some(99), 100, 10), 90);
        assert_eq!(scroll_offset(Some(5), 3, 10), 0);
    }

    #[test]
    fn pending_work_shows_a_marker() {
        let typing = CommandlineState::typing(":ren");
        assert_eq!(commandline_text(&typing, 1), ":ren| …");
        assert_eq!(commandline_text(&typing, 0), ":ren|");
        assert_eq!(commandline_text(&CommandlineState::Empty, 0), "");
    }

    #[test]
    fn colors_parse_names_and_hex() {
        assert_eq!(parse_color("gray"), Some(Color::Gray));
        assert_eq!(parse_color("Grey"), Some(Color::Gray));
        assert_eq!(parse_color("#102030"), Some(Color::Rgb(0x10, 0x20, 0x30)));
        assert_eq!(parse_color("mauvelous"), None);
        assert_eq!(parse_color("#12345"), None);
    }

    #[test]
    fn display_defaults_match_the_backend_contract() {
        let display = DisplayConfig::default();
        assert_eq!(display.font_size_pixels, 14);
        assert_eq!(parse_color(&display.background_color), Some(Color::Gray));
        assert_eq!(parse_color(&display.font_color), Some(Color::Black));
    }
}
