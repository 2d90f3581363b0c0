use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
};
use ratatui::{Frame, Terminal};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::{debug, info};
use ulti_core::adapter::{ConnectionError, TableContent};
use ulti_core::config::AppConfig;
use ulti_core::params::{ConnectionParameters, Password};
use ulti_core::registry::AdapterRegistry;
use ulti_core::worker::{
    spawn_session_worker, SessionCommand, SessionEvent, SessionHandle, WorkerError,
};

const TICK_RATE: Duration = Duration::from_millis(120);
const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const MAX_COLUMN_WIDTH: usize = 32;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Connect,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectFocus {
    Form,
    Databases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowserFocus {
    Tables,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Engine,
    Host,
    Port,
    User,
    Password,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            Self::Engine => Self::Host,
            Self::Host => Self::Port,
            Self::Port => Self::User,
            Self::User => Self::Password,
            Self::Password => Self::Engine,
        }
    }

    fn previous(self) -> Self {
        match self {
            Self::Engine => Self::Password,
            Self::Host => Self::Engine,
            Self::Port => Self::Host,
            Self::User => Self::Port,
            Self::Password => Self::User,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Engine => "Database Type",
            Self::Host => "Host",
            Self::Port => "Port",
            Self::User => "User",
            Self::Password => "Password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectForm {
    engine: String,
    host: String,
    port: String,
    user: String,
    password: String,
    active_field: FormField,
}

impl ConnectForm {
    fn from_config(config: &AppConfig) -> Self {
        Self {
            engine: config.connection.engine.clone(),
            host: config.connection.host.clone(),
            port: config.connection.port.to_string(),
            user: config.connection.user.clone(),
            password: String::new(),
            active_field: FormField::Host,
        }
    }

    fn active_text_mut(&mut self) -> Option<&mut String> {
        match self.active_field {
            FormField::Engine => None,
            FormField::Host => Some(&mut self.host),
            FormField::Port => Some(&mut self.port),
            FormField::User => Some(&mut self.user),
            FormField::Password => Some(&mut self.password),
        }
    }

    fn value(&self, field: FormField) -> String {
        match field {
            FormField::Engine => self.engine.clone(),
            FormField::Host => self.host.clone(),
            FormField::Port => self.port.clone(),
            FormField::User => self.user.clone(),
            FormField::Password => "*".repeat(self.password.chars().count()),
        }
    }
}

/// Searchable database picker shown over the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct DatabaseSelector {
    query: String,
    selected: usize,
}

impl DatabaseSelector {
    fn matches<'a>(&self, databases: &'a [String]) -> Vec<&'a str> {
        let needle = self.query.to_lowercase();
        databases
            .iter()
            .map(String::as_str)
            .filter(|name| name.to_lowercase().contains(&needle))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectionKey {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Msg {
    Quit,
    ToggleHelp,
    NextFocus,
    Submit,
    Back,
    Input(char),
    Backspace,
    Navigate(DirectionKey),
    OpenDatabaseSelector,
    Refresh,
    Tick,
}

#[derive(Debug)]
struct TuiApp {
    registry: AdapterRegistry,
    screen: Screen,
    connect_focus: ConnectFocus,
    browser_focus: BrowserFocus,
    form: ConnectForm,
    connection: Option<ConnectionParameters>,
    testing: Option<ConnectionParameters>,
    databases: Vec<String>,
    selected_database_index: usize,
    tables: Vec<String>,
    selected_table_index: usize,
    content: Option<(String, TableContent)>,
    content_row: usize,
    content_column: usize,
    selector: Option<DatabaseSelector>,
    pending_requests: usize,
    spinner_frame: usize,
    show_help: bool,
    should_quit: bool,
    status_line: String,
}

impl TuiApp {
    fn new(config: &AppConfig, registry: AdapterRegistry) -> Self {
        Self {
            registry,
            screen: Screen::Connect,
            connect_focus: ConnectFocus::Form,
            browser_focus: BrowserFocus::Tables,
            form: ConnectForm::from_config(config),
            connection: None,
            testing: None,
            databases: Vec::new(),
            selected_database_index: 0,
            tables: Vec::new(),
            selected_table_index: 0,
            content: None,
            content_row: 0,
            content_column: 0,
            selector: None,
            pending_requests: 0,
            spinner_frame: 0,
            show_help: false,
            should_quit: false,
            status_line: "Fill in the connection details and press Enter to test".to_string(),
        }
    }

    fn accepts_text(&self) -> bool {
        self.selector.is_some()
            || (self.screen == Screen::Connect && self.connect_focus == ConnectFocus::Form)
    }

    fn is_busy(&self) -> bool {
        self.pending_requests > 0
    }

    fn handle(&mut self, msg: Msg) -> Vec<SessionCommand> {
        let commands = match msg {
            Msg::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Msg::ToggleHelp => {
                self.show_help = !self.show_help;
                Vec::new()
            }
            Msg::Tick => {
                if self.is_busy() {
                    self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
                }
                Vec::new()
            }
            _ if self.selector.is_some() => self.handle_selector(msg),
            _ => match self.screen {
                Screen::Connect => self.handle_connect(msg),
                Screen::Browser => self.handle_browser(msg),
            },
        };
        self.pending_requests += commands.len();
        commands
    }

    fn handle_connect(&mut self, msg: Msg) -> Vec<SessionCommand> {
        match (self.connect_focus, msg) {
            (ConnectFocus::Form, Msg::Submit) => self.test_connection(),
            (ConnectFocus::Form, Msg::NextFocus | Msg::Navigate(DirectionKey::Down)) => {
                self.form.active_field = self.form.active_field.next();
                Vec::new()
            }
            (ConnectFocus::Form, Msg::Navigate(DirectionKey::Up)) => {
                self.form.active_field = self.form.active_field.previous();
                Vec::new()
            }
            (ConnectFocus::Form, Msg::Navigate(direction @ (DirectionKey::Left | DirectionKey::Right))) => {
                if self.form.active_field == FormField::Engine {
                    self.cycle_engine(direction);
                }
                Vec::new()
            }
            (ConnectFocus::Form, Msg::Input(ch)) => {
                if let Some(text) = self.form.active_text_mut() {
                    text.push(ch);
                }
                Vec::new()
            }
            (ConnectFocus::Form, Msg::Backspace) => {
                if let Some(text) = self.form.active_text_mut() {
                    text.pop();
                }
                Vec::new()
            }
            (ConnectFocus::Form, Msg::Back) => {
                if self.databases.is_empty() {
                    self.should_quit = true;
                } else {
                    self.connect_focus = ConnectFocus::Databases;
                }
                Vec::new()
            }
            (ConnectFocus::Databases, Msg::Navigate(direction)) => {
                self.selected_database_index =
                    step(self.selected_database_index, self.databases.len(), direction);
                Vec::new()
            }
            (ConnectFocus::Databases, Msg::Submit) => {
                match self.databases.get(self.selected_database_index) {
                    Some(database) => {
                        self.status_line = format!("Opening database `{database}`...");
                        vec![SessionCommand::SelectDatabase(database.clone())]
                    }
                    None => Vec::new(),
                }
            }
            (ConnectFocus::Databases, Msg::NextFocus | Msg::Back) => {
                self.connect_focus = ConnectFocus::Form;
                Vec::new()
            }
            (ConnectFocus::Databases, Msg::Refresh) => vec![SessionCommand::ListDatabases],
            _ => Vec::new(),
        }
    }

    fn handle_browser(&mut self, msg: Msg) -> Vec<SessionCommand> {
        match msg {
            Msg::NextFocus => {
                self.browser_focus = match self.browser_focus {
                    BrowserFocus::Tables => BrowserFocus::Content,
                    BrowserFocus::Content => BrowserFocus::Tables,
                };
                Vec::new()
            }
            Msg::Navigate(direction) => {
                match self.browser_focus {
                    BrowserFocus::Tables => {
                        self.selected_table_index =
                            step(self.selected_table_index, self.tables.len(), direction);
                    }
                    BrowserFocus::Content => self.scroll_content(direction),
                }
                Vec::new()
            }
            Msg::Submit => match self.tables.get(self.selected_table_index) {
                Some(table) => {
                    self.status_line = format!("Loading `{table}`...");
                    vec![SessionCommand::LoadTable(table.clone())]
                }
                None => Vec::new(),
            },
            Msg::OpenDatabaseSelector => {
                self.selector = Some(DatabaseSelector::default());
                vec![SessionCommand::ListDatabases]
            }
            Msg::Refresh => vec![SessionCommand::ListTables],
            Msg::Back => {
                self.status_line = "Disconnecting...".to_string();
                vec![SessionCommand::Disconnect]
            }
            _ => Vec::new(),
        }
    }

    fn handle_selector(&mut self, msg: Msg) -> Vec<SessionCommand> {
        let Some(selector) = self.selector.as_mut() else {
            return Vec::new();
        };
        let match_count = selector.matches(&self.databases).len();

        match msg {
            Msg::Input(ch) => {
                selector.query.push(ch);
                selector.selected = 0;
            }
            Msg::Backspace => {
                selector.query.pop();
                selector.selected = 0;
            }
            Msg::Navigate(direction) => {
                selector.selected = step(selector.selected, match_count, direction);
            }
            Msg::Back => self.selector = None,
            Msg::Submit => {
                let chosen = selector
                    .matches(&self.databases)
                    .get(selector.selected)
                    .map(|name| (*name).to_string());
                if let Some(database) = chosen {
                    self.selector = None;
                    self.status_line = format!("Switching to `{database}`...");
                    return vec![SessionCommand::SelectDatabase(database)];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn test_connection(&mut self) -> Vec<SessionCommand> {
        if let Some(testing) = &self.testing {
            self.status_line = format!("Still testing connection to {}...", testing.label());
            return Vec::new();
        }
        let factory = match self.registry.factory(&self.form.engine) {
            Ok(factory) => factory,
            Err(error) => {
                self.status_line = format!("Error: {error}");
                return Vec::new();
            }
        };
        let parameters = match ConnectionParameters::parse(
            &self.form.host,
            &self.form.port,
            &self.form.user,
            Password::new(self.form.password.clone()),
        ) {
            Ok(parameters) => parameters,
            Err(error) => {
                self.status_line = format!("Invalid connection details: {error}");
                return Vec::new();
            }
        };

        self.status_line = format!("Testing connection to {}...", parameters.label());
        self.databases.clear();
        self.testing = Some(parameters.clone());
        vec![SessionCommand::Test {
            parameters,
            factory,
        }]
    }

    fn cycle_engine(&mut self, direction: DirectionKey) {
        let engines = self.registry.engines();
        if engines.is_empty() {
            return;
        }
        let current = engines
            .iter()
            .position(|engine| engine.eq_ignore_ascii_case(&self.form.engine))
            .unwrap_or(0);
        let next = match direction {
            DirectionKey::Left | DirectionKey::Up => {
                (current + engines.len() - 1) % engines.len()
            }
            DirectionKey::Right | DirectionKey::Down => (current + 1) % engines.len(),
        };
        self.form.engine = engines[next].to_string();
    }

    fn scroll_content(&mut self, direction: DirectionKey) {
        let Some((_, content)) = &self.content else {
            return;
        };
        match direction {
            DirectionKey::Up | DirectionKey::Down => {
                self.content_row = step(self.content_row, content.rows.len(), direction);
            }
            DirectionKey::Left | DirectionKey::Right => {
                self.content_column = step(self.content_column, content.headers.len(), direction);
            }
        }
    }

    fn apply_event(&mut self, event: SessionEvent) -> Vec<SessionCommand> {
        self.pending_requests = self.pending_requests.saturating_sub(1);

        let commands = match event {
            SessionEvent::TestFinished(Ok(())) => {
                self.connection = self.testing.take();
                self.status_line = "Connection successful!".to_string();
                vec![SessionCommand::ListDatabases]
            }
            SessionEvent::TestFinished(Err(error)) => {
                self.testing = None;
                self.connection = None;
                self.status_line = connection_failure_message(&error);
                Vec::new()
            }
            SessionEvent::Databases(databases) => {
                self.databases = databases;
                self.selected_database_index = 0;
                if self.screen == Screen::Connect && !self.databases.is_empty() {
                    self.connect_focus = ConnectFocus::Databases;
                }
                Vec::new()
            }
            SessionEvent::DatabaseSelected {
                database,
                result: Ok(()),
            } => {
                info!(%database, "database opened");
                if let Some(connection) = self.connection.take() {
                    self.connection = Some(connection.with_database(Some(&database)));
                }
                self.screen = Screen::Browser;
                self.browser_focus = BrowserFocus::Tables;
                self.content = None;
                self.status_line = self.location_label();
                vec![SessionCommand::ListTables]
            }
            SessionEvent::DatabaseSelected {
                database,
                result: Err(error),
            } => {
                self.status_line = format!("Could not open `{database}`: {error}");
                Vec::new()
            }
            SessionEvent::Tables { tables, .. } => {
                self.tables = tables;
                self.selected_table_index = 0;
                if self.tables.is_empty() {
                    self.status_line = format!("{} (no tables)", self.location_label());
                }
                Vec::new()
            }
            SessionEvent::TableLoaded {
                table,
                content: Some(content),
            } => {
                self.content_row = 0;
                self.content_column = 0;
                self.browser_focus = BrowserFocus::Content;
                self.content = Some((table, content));
                self.status_line = self.location_label();
                Vec::new()
            }
            SessionEvent::TableLoaded {
                table,
                content: None,
            } => {
                self.status_line = format!("Could not retrieve data for '{table}'.");
                Vec::new()
            }
            SessionEvent::Disconnected => {
                self.reset_connection();
                self.status_line = "Disconnected".to_string();
                Vec::new()
            }
            SessionEvent::Rejected(error) => {
                self.status_line = format!("Request rejected: {error}");
                Vec::new()
            }
        };
        self.pending_requests += commands.len();
        commands
    }

    fn reset_connection(&mut self) {
        self.screen = Screen::Connect;
        self.connect_focus = ConnectFocus::Form;
        self.connection = None;
        self.testing = None;
        self.databases.clear();
        self.tables.clear();
        self.content = None;
        self.selector = None;
        self.selected_database_index = 0;
        self.selected_table_index = 0;
    }

    fn location_label(&self) -> String {
        let table = self.content.as_ref().map(|(table, _)| table.as_str());
        self.connection.as_ref().map_or_else(
            || "Not Connected".to_string(),
            |connection| connection.location_label(table),
        )
    }
}

fn step(index: usize, len: usize, direction: DirectionKey) -> usize {
    if len == 0 {
        return 0;
    }
    match direction {
        DirectionKey::Up | DirectionKey::Left => index.saturating_sub(1),
        DirectionKey::Down | DirectionKey::Right => (index + 1).min(len - 1),
    }
}

fn connection_failure_message(error: &ConnectionError) -> String {
    match error {
        ConnectionError::AccessDenied => {
            "Connection failed: something is wrong with your user name or password".to_string()
        }
        ConnectionError::UnknownDatabase => "Connection failed: database does not exist".to_string(),
        ConnectionError::NotConnected => "Connection failed: not connected".to_string(),
        ConnectionError::Other(message) => format!("An unexpected error occurred: {message}"),
    }
}

#[must_use]
pub fn ui_name() -> &'static str {
    "ulti-tui"
}

/// Runs the shell until the user quits. Network calls happen on a session
/// worker so the draw loop never blocks on the database.
pub fn run(config: &AppConfig, registry: AdapterRegistry) -> Result<(), TuiError> {
    let runtime = session_runtime()?;
    let mut session = {
        let _guard = runtime.enter();
        spawn_session_worker()
    };

    let mut terminal = setup_terminal()?;
    let run_result = run_loop(&mut terminal, TuiApp::new(config, registry), &mut session);
    let restore_result = restore_terminal(&mut terminal);
    runtime.block_on(session.shutdown());

    if let Err(error) = run_result {
        restore_result?;
        return Err(error);
    }

    restore_result?;
    Ok(())
}

/// Runtime hosting the session worker. Drivers open sockets on it, so IO and
/// timers must both be enabled.
fn session_runtime() -> io::Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("ulti-session")
        .enable_all()
        .build()
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, TuiError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), TuiError> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    mut app: TuiApp,
    session: &mut SessionHandle,
) -> Result<(), TuiError> {
    let mut last_tick = Instant::now();

    loop {
        while let Some(event) = session.try_next_event()? {
            debug!(?event, "session event");
            for command in app.apply_event(event) {
                session.send(command)?;
            }
        }

        terminal.draw(|frame| render(frame, &app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Some(message) = map_key_event(key, app.accepts_text()) {
                        for command in app.handle(message) {
                            session.send(command)?;
                        }
                    }
                }
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.handle(Msg::Tick);
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn render(frame: &mut Frame<'_>, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let activity = if app.is_busy() {
        format!("{} working", SPINNER_FRAMES[app.spinner_frame])
    } else {
        "idle".to_string()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", app.location_label()),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::raw(activity),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("ulti"));
    frame.render_widget(header, chunks[0]);

    match app.screen {
        Screen::Connect => render_connect(frame, app, chunks[1]),
        Screen::Browser => render_browser(frame, app, chunks[1]),
    }

    let hints = match (app.screen, app.connect_focus) {
        (Screen::Connect, ConnectFocus::Form) => {
            "Enter: test connection | Tab/arrows: field | Left/Right: database type | Esc: back"
        }
        (Screen::Connect, ConnectFocus::Databases) => {
            "Enter: open database | arrows: select | r: refresh | Tab: edit connection"
        }
        (Screen::Browser, _) => {
            "Enter: view table | Tab: focus | d: databases | r: refresh | Esc: disconnect | ?: help"
        }
    };
    let footer = Paragraph::new(vec![
        Line::from(hints),
        Line::from(format!("Status: {}", app.status_line)),
    ])
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, chunks[2]);

    if let Some(selector) = &app.selector {
        render_database_selector(frame, app, selector);
    }
    if app.show_help {
        render_help_popup(frame);
    }
}

fn render_connect(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let fields = [
        FormField::Engine,
        FormField::Host,
        FormField::Port,
        FormField::User,
        FormField::Password,
    ];
    let mut lines = vec![Line::from("Connection Details"), Line::from("")];
    for field in fields {
        let active =
            app.connect_focus == ConnectFocus::Form && app.form.active_field == field;
        let marker = if active { ">" } else { " " };
        let line = format!("{marker} {:<14} {}", field.label(), app.form.value(field));
        lines.push(if active {
            Line::styled(line, Style::default().add_modifier(Modifier::BOLD))
        } else {
            Line::from(line)
        });
    }
    let form = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Create Connection"),
    );
    frame.render_widget(form, columns[0]);

    if app.databases.is_empty() {
        let prompt = Paragraph::new("Connect to a server to see its databases.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Databases"));
        frame.render_widget(prompt, columns[1]);
        return;
    }

    let items = app
        .databases
        .iter()
        .map(|name| ListItem::new(name.as_str()))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Databases"))
        .highlight_style(focus_highlight(
            app.connect_focus == ConnectFocus::Databases,
        ))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(app.selected_database_index));
    frame.render_stateful_widget(list, columns[1], &mut state);
}

fn render_browser(frame: &mut Frame<'_>, app: &TuiApp, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(20)])
        .split(area);

    let items = app
        .tables
        .iter()
        .map(|name| ListItem::new(name.as_str()))
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Tables"))
        .highlight_style(focus_highlight(app.browser_focus == BrowserFocus::Tables))
        .highlight_symbol("> ");
    let mut list_state = ListState::default().with_selected(Some(app.selected_table_index));
    frame.render_stateful_widget(list, columns[0], &mut list_state);

    let Some((table, content)) = &app.content else {
        let placeholder = Paragraph::new("Select a table and press Enter to view its rows.")
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Content"));
        frame.render_widget(placeholder, columns[1]);
        return;
    };

    let visible_headers = content
        .headers
        .iter()
        .skip(app.content_column)
        .collect::<Vec<_>>();
    let widths = visible_headers
        .iter()
        .enumerate()
        .map(|(offset, header)| {
            let column = app.content_column + offset;
            let widest = content
                .rows
                .iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.to_string().chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(1)
                .min(MAX_COLUMN_WIDTH);
            Constraint::Length(u16::try_from(widest).unwrap_or(u16::MAX))
        })
        .collect::<Vec<_>>();
    let header_row = Row::new(
        visible_headers
            .iter()
            .map(|header| Cell::from(header.as_str()))
            .collect::<Vec<_>>(),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = content.rows.iter().map(|row| {
        Row::new(
            row.iter()
                .skip(app.content_column)
                .map(|cell| {
                    let style = if cell.is_null() {
                        Style::default().fg(Color::DarkGray)
                    } else {
                        Style::default()
                    };
                    Cell::from(cell.to_string()).style(style)
                })
                .collect::<Vec<_>>(),
        )
    });

    let title = format!("{table} ({} rows)", content.row_count());
    let grid = Table::new(rows, widths)
        .header(header_row)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(focus_highlight(app.browser_focus == BrowserFocus::Content));
    let mut table_state = TableState::default().with_selected(Some(app.content_row));
    frame.render_stateful_widget(grid, columns[1], &mut table_state);
}

fn render_database_selector(frame: &mut Frame<'_>, app: &TuiApp, selector: &DatabaseSelector) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let search = Paragraph::new(if selector.query.is_empty() {
        "Search for a database...".to_string()
    } else {
        selector.query.clone()
    })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Select Database"),
    );
    frame.render_widget(search, sections[0]);

    let items = selector
        .matches(&app.databases)
        .into_iter()
        .map(ListItem::new)
        .collect::<Vec<_>>();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(focus_highlight(true))
        .highlight_symbol("> ");
    let mut state = ListState::default().with_selected(Some(selector.selected));
    frame.render_stateful_widget(list, sections[1], &mut state);
}

fn render_help_popup(frame: &mut Frame<'_>) {
    let area = centered_rect(70, 60, frame.area());
    frame.render_widget(Clear, area);
    let help = Paragraph::new(vec![
        Line::from("Keymap"),
        Line::from("Ctrl+C / Ctrl+Q: quit (q outside text fields)"),
        Line::from("?: toggle help"),
        Line::from("Tab: next field or pane"),
        Line::from("Enter: test connection, open database or view table"),
        Line::from("Esc: back, close popup or disconnect"),
        Line::from("d: switch database"),
        Line::from("r: refresh list"),
        Line::from("Arrows or hjkl: navigation"),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    frame.render_widget(help, area);
}

fn focus_highlight(focused: bool) -> Style {
    if focused {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    }
}

fn centered_rect(width_percent: u16, height_percent: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100_u16 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100_u16 - height_percent) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100_u16 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100_u16 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

fn map_key_event(key: KeyEvent, text_input: bool) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c' | 'q')) => Some(Msg::Quit),
        (_, KeyCode::Tab) => Some(Msg::NextFocus),
        (_, KeyCode::Enter) => Some(Msg::Submit),
        (_, KeyCode::Esc) => Some(Msg::Back),
        (_, KeyCode::Up) => Some(Msg::Navigate(DirectionKey::Up)),
        (_, KeyCode::Down) => Some(Msg::Navigate(DirectionKey::Down)),
        (_, KeyCode::Left) => Some(Msg::Navigate(DirectionKey::Left)),
        (_, KeyCode::Right) => Some(Msg::Navigate(DirectionKey::Right)),
        (_, KeyCode::Backspace) if text_input => Some(Msg::Backspace),
        (_, KeyCode::Char(ch)) if text_input => Some(Msg::Input(ch)),
        (_, KeyCode::Char('q')) => Some(Msg::Quit),
        (_, KeyCode::Char('?')) => Some(Msg::ToggleHelp),
        (_, KeyCode::Char('d')) => Some(Msg::OpenDatabaseSelector),
        (_, KeyCode::Char('r')) => Some(Msg::Refresh),
        (_, KeyCode::Char('k')) => Some(Msg::Navigate(DirectionKey::Up)),
        (_, KeyCode::Char('j')) => Some(Msg::Navigate(DirectionKey::Down)),
        (_, KeyCode::Char('h')) => Some(Msg::Navigate(DirectionKey::Left)),
        (_, KeyCode::Char('l')) => Some(Msg::Navigate(DirectionKey::Right)),
        _ => None,
    }
}
