//! Terminal UI.
//!
//! Interactive reader shell (ratatui + crossterm): a pager for the page
//! content, mouse-driven text selection, the floating icon anchored to a
//! selection, and the positioned info card overlay.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};
use tokio::sync::oneshot;

use crate::agent;
use crate::analysis::{AnalysisResult, Category};
use crate::cache::SessionCache;
use crate::config::Config;
use crate::page::Page;
use crate::selection::{self, CellPos, PageLayout, Selection, SelectionRect};

const ICON_GLYPH: &str = "✦";
const SPINNER_FRAMES: [&str; 4] = ["⠋", "⠙", "⠸", "⠴"];
const HIGHLIGHT_STYLE: Style = Style::new().bg(Color::Yellow).fg(Color::Black);

/// Overlay shown on top of the reader, driven by the selection flow
#[derive(Debug)]
enum Overlay {
    Hidden,
    /// Selection finished; the floating icon invites analysis
    Icon { selection: Selection },
    /// Icon activated; the request is in flight
    Loading { selection: Selection },
    /// Result arrived (or a cache hit)
    Card {
        selection: Selection,
        data: AnalysisResult,
    },
}

/// A request the event loop should dispatch to the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub text: String,
    pub context: String,
}

/// Reader application state. All mutation happens on the UI loop.
pub struct App {
    config: Config,
    page: Page,
    layout: PageLayout,
    scroll: u16,
    /// In-progress mouse drag: anchor and current head, document coords
    drag: Option<(CellPos, CellPos)>,
    overlay: Overlay,
    cache: SessionCache,
    /// Selected text of the single in-flight request, if any
    pending: Option<(String, oneshot::Receiver<AnalysisResult>)>,
    /// Reader pane rect from the last draw, for mouse hit-testing
    body_area: Rect,
    spinner: usize,
    should_quit: bool,
}

impl App {
    pub fn new(page: Page, config: Config) -> Self {
        let layout = PageLayout::build(&page, 80);
        Self {
            config,
            page,
            layout,
            scroll: 0,
            drag: None,
            overlay: Overlay::Hidden,
            cache: SessionCache::new(),
            pending: None,
            body_area: Rect::new(0, 0, 80, 24),
            spinner: 0,
            should_quit: false,
        }
    }

    // --- event handling -------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) -> Option<AnalysisRequest> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.close_overlay(),
            KeyCode::Up | KeyCode::Char('k') => self.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll_by(1),
            KeyCode::PageUp => self.scroll_by(-(self.body_area.height as i32)),
            KeyCode::PageDown => self.scroll_by(self.body_area.height as i32),
            KeyCode::Home => self.scroll = 0,
            KeyCode::End => self.scroll = self.max_scroll(),
            // Keyboard path to the icon, mirroring the click
            KeyCode::Enter => return self.activate_icon(),
            _ => {}
        }
        None
    }

    /// Returns a request when the interaction requires a network call.
    fn handle_mouse(&mut self, mouse: MouseEvent) -> Option<AnalysisRequest> {
        match mouse.kind {
            MouseEventKind::ScrollUp => self.scroll_by(-2),
            MouseEventKind::ScrollDown => self.scroll_by(2),
            MouseEventKind::Down(MouseButton::Left) => {
                if self.icon_hit(mouse.column, mouse.row) {
                    return self.activate_icon();
                }
                if matches!(self.overlay, Overlay::Card { .. } | Overlay::Loading { .. }) {
                    // Clicking outside the card closes it
                    if !self.card_hit(mouse.column, mouse.row) {
                        self.close_overlay();
                    }
                    return None;
                }
                // A new press collapses the previous selection
                self.overlay = Overlay::Hidden;
                if let Some(pos) = self.doc_pos(mouse.column, mouse.row) {
                    self.drag = Some((pos, pos));
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let (Some((anchor, _)), Some(pos)) =
                    (self.drag, self.doc_pos(mouse.column, mouse.row))
                {
                    self.drag = Some((anchor, pos));
                }
            }
            MouseEventKind::Up(MouseButton::Left) => self.finish_drag(),
            _ => {}
        }
        None
    }

    /// On release, turn the drag into a selection and show the icon.
    /// Ignored while a card is open, as in the original flow.
    fn finish_drag(&mut self) {
        let Some((anchor, head)) = self.drag.take() else {
            return;
        };
        if matches!(self.overlay, Overlay::Card { .. } | Overlay::Loading { .. }) {
            return;
        }
        if anchor == head {
            // A plain click deselects
            self.overlay = Overlay::Hidden;
            return;
        }
        match self.layout.resolve(&self.page, anchor, head) {
            Some(selection) => self.overlay = Overlay::Icon { selection },
            None => self.overlay = Overlay::Hidden,
        }
    }

    /// Icon activated: serve from the cache, or hand back a request for the
    /// event loop to dispatch. A cache hit never issues a network call.
    fn activate_icon(&mut self) -> Option<AnalysisRequest> {
        let Overlay::Icon { selection } = &self.overlay else {
            return None;
        };
        let selection = selection.clone();

        if let Some(cached) = self.cache.get(&selection.text) {
            let data = cached.clone();
            self.overlay = Overlay::Card { selection, data };
            return None;
        }

        if self.pending.is_some() {
            // One outstanding request at a time
            return None;
        }

        let request = AnalysisRequest {
            text: selection.text.clone(),
            context: selection.context.clone(),
        };
        self.overlay = Overlay::Loading { selection };
        Some(request)
    }

    /// Record the result of a finished request: cache it, and show the card
    /// if the user is still waiting on this text.
    fn finish_analysis(&mut self, text: &str, result: AnalysisResult) {
        self.cache.insert(text, result.clone());
        if let Overlay::Loading { selection } = &self.overlay {
            if selection.text == text {
                let selection = selection.clone();
                self.overlay = Overlay::Card {
                    selection,
                    data: result,
                };
            }
        }
    }

    /// Poll the in-flight request without blocking the UI loop
    fn poll_pending(&mut self) {
        let Some((text, rx)) = &mut self.pending else {
            return;
        };
        let text = text.clone();
        match rx.try_recv() {
            Ok(result) => {
                self.pending = None;
                self.finish_analysis(&text, result);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                // Task died; substitute the fallback like any other failure
                self.pending = None;
                self.finish_analysis(&text, AnalysisResult::fallback(&text));
            }
        }
    }

    /// Closing discards the overlay and the selection with it
    fn close_overlay(&mut self) {
        self.overlay = Overlay::Hidden;
        self.drag = None;
    }

    fn handle_resize(&mut self) {
        // Coordinates are stale after reflow; drop selection state
        self.close_overlay();
    }

    // --- geometry -------------------------------------------------------

    fn scroll_by(&mut self, delta: i32) {
        let next = self.scroll as i32 + delta;
        self.scroll = next.clamp(0, self.max_scroll() as i32) as u16;
    }

    fn max_scroll(&self) -> u16 {
        (self.layout.line_count() as u16).saturating_sub(self.body_area.height)
    }

    /// Map a screen cell to document coordinates, if inside the reader pane
    fn doc_pos(&self, column: u16, row: u16) -> Option<CellPos> {
        let body = self.body_area;
        if column < body.x
            || column >= body.x + body.width
            || row < body.y
            || row >= body.y + body.height
        {
            return None;
        }
        Some(CellPos {
            x: column - body.x,
            y: row - body.y + self.scroll,
        })
    }

    /// Selection rect translated into screen coordinates, if visible
    fn screen_rect(&self, rect: &SelectionRect) -> Option<SelectionRect> {
        let body = self.body_area;
        let top = self.scroll;
        let bottom = self.scroll + body.height;
        if rect.y >= bottom || rect.y + rect.height <= top {
            return None;
        }
        let y = rect.y.max(top) - top;
        let height = (rect.y + rect.height).min(bottom) - rect.y.max(top);
        Some(SelectionRect {
            x: rect.x + body.x,
            y: y + body.y,
            width: rect.width,
            height,
        })
    }

    fn icon_screen_pos(&self) -> Option<(u16, u16)> {
        let Overlay::Icon { selection } = &self.overlay else {
            return None;
        };
        let rect = self.screen_rect(&selection.rect)?;
        let body = self.body_area;
        let (x, y) = selection::icon_position(
            &SelectionRect {
                x: rect.x - body.x,
                y: rect.y - body.y,
                width: rect.width,
                height: rect.height,
            },
            body.width,
            body.height,
        );
        Some((x + body.x, y + body.y))
    }

    fn icon_hit(&self, column: u16, row: u16) -> bool {
        self.icon_screen_pos() == Some((column, row))
    }

    fn card_screen_rect(&self, content_height: u16) -> Option<Rect> {
        let selection = match &self.overlay {
            Overlay::Loading { selection } | Overlay::Card { selection, .. } => selection,
            _ => return None,
        };
        let body = self.body_area;
        let rect = self
            .screen_rect(&selection.rect)
            .map(|r| SelectionRect {
                x: r.x - body.x,
                y: r.y - body.y,
                width: r.width,
                height: r.height,
            })
            .unwrap_or(SelectionRect {
                x: body.width / 2,
                y: 0,
                width: 1,
                height: 1,
            });

        let card_width = self.config.ui.card_width.min(body.width);
        let card_height = content_height.min(body.height);
        let (x, y) = selection::card_position(
            &rect,
            body.width,
            body.height,
            card_width,
            card_height,
            self.config.ui.card_margin,
        );
        Some(Rect::new(x + body.x, y + body.y, card_width, card_height))
    }

    fn card_hit(&self, column: u16, row: u16) -> bool {
        let height = self.card_content_lines().len() as u16 + 2;
        match self.card_screen_rect(height) {
            Some(rect) => {
                column >= rect.x
                    && column < rect.x + rect.width
                    && row >= rect.y
                    && row < rect.y + rect.height
            }
            None => false,
        }
    }

    /// Rect highlighted in the reader: the live drag span, or the finished
    /// selection backing the overlay
    fn highlight_rect(&self) -> Option<SelectionRect> {
        if let Some((anchor, head)) = self.drag {
            return self
                .layout
                .resolve(&self.page, anchor, head)
                .map(|s| s.rect);
        }
        match &self.overlay {
            Overlay::Icon { selection }
            | Overlay::Loading { selection }
            | Overlay::Card { selection, .. } => Some(selection.rect),
            Overlay::Hidden => None,
        }
    }

    // --- rendering ------------------------------------------------------

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(frame.area());

        self.body_area = chunks[1];
        if self.layout.width() != self.body_area.width && self.body_area.width > 0 {
            self.layout = PageLayout::build(&self.page, self.body_area.width);
            self.scroll = self.scroll.min(self.max_scroll());
        }

        self.draw_header(frame, chunks[0]);
        self.draw_reader(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
        self.draw_icon(frame);
        self.draw_card(frame);
    }

    fn draw_header(&self, frame: &mut Frame<'_>, area: Rect) {
        let header = Line::from(vec![
            Span::styled("glimpse ", Style::new().fg(Color::Magenta).bold()),
            Span::styled(&self.page.title, Style::new().bold()),
            Span::styled(format!("  ({})", self.page.source), Style::new().dim()),
        ]);
        frame.render_widget(
            Paragraph::new(header).block(Block::default().borders(Borders::BOTTOM)),
            area,
        );
    }

    fn draw_reader(&self, frame: &mut Frame<'_>, area: Rect) {
        let highlight = self.highlight_rect();
        let mut lines: Vec<Line> = Vec::with_capacity(area.height as usize);

        for row in 0..area.height {
            let doc_y = self.scroll + row;
            let text = self.layout.line(doc_y as usize);
            lines.push(styled_line(text, doc_y, highlight.as_ref()));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let hint = match self.overlay {
            Overlay::Hidden => "drag to select text",
            Overlay::Icon { .. } => "click ✦ to explain",
            Overlay::Loading { .. } => "analyzing…",
            Overlay::Card { .. } => "Esc to close",
        };
        let footer = Line::from(vec![
            Span::styled(hint, Style::new().fg(Color::Cyan)),
            Span::styled(
                format!("  ·  {} cached  ·  q quit", self.cache.len()),
                Style::new().dim(),
            ),
        ]);
        frame.render_widget(Paragraph::new(footer), area);
    }

    fn draw_icon(&self, frame: &mut Frame<'_>) {
        if let Some((x, y)) = self.icon_screen_pos() {
            let rect = Rect::new(x, y, 1, 1);
            frame.render_widget(Clear, rect);
            frame.render_widget(
                Paragraph::new(ICON_GLYPH)
                    .style(Style::new().fg(Color::Yellow).bg(Color::Black).bold()),
                rect,
            );
        }
    }

    fn draw_card(&self, frame: &mut Frame<'_>) {
        let content = self.card_content_lines();
        if content.is_empty() {
            return;
        }
        let Some(area) = self.card_screen_rect(content.len() as u16 + 2) else {
            return;
        };

        let title = match &self.overlay {
            Overlay::Card { data, .. } => Line::from(vec![
                Span::styled(
                    format!(" {} ", data.category.glyph()),
                    category_style(data.category),
                ),
                Span::styled(
                    format!("{} ", data.category.label()),
                    category_style(data.category),
                ),
            ]),
            _ => Line::from(Span::styled(
                format!(" {} ", SPINNER_FRAMES[self.spinner % SPINNER_FRAMES.len()]),
                Style::new().fg(Color::Yellow),
            )),
        };

        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(content).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::new().fg(Color::DarkGray))
                    .title(title),
            ),
            area,
        );
    }

    /// Inner lines of the card for the current overlay state
    fn card_content_lines(&self) -> Vec<Line<'_>> {
        match &self.overlay {
            Overlay::Loading { selection } => vec![
                Line::from(Span::styled(selection.text.clone(), Style::new().bold())),
                Line::default(),
                Line::from(Span::styled("Thinking…", Style::new().dim())),
            ],
            Overlay::Card { data, .. } => {
                let mut lines = Vec::new();
                lines.push(Line::from(Span::styled(
                    data.title.clone(),
                    Style::new().bold(),
                )));
                lines.push(Line::default());
                for point in &data.summary {
                    lines.push(Line::from(vec![
                        Span::styled("• ", Style::new().fg(Color::DarkGray)),
                        Span::raw(point.clone()),
                    ]));
                }
                if !data.tags.is_empty() {
                    lines.push(Line::default());
                    lines.push(Line::from(Span::styled(
                        data.tags
                            .iter()
                            .map(|t| format!("#{}", t))
                            .collect::<Vec<_>>()
                            .join(" "),
                        Style::new().fg(Color::Magenta),
                    )));
                }
                if !data.external_links.is_empty() {
                    lines.push(Line::default());
                    for link in &data.external_links {
                        lines.push(Line::from(vec![
                            Span::styled("↗ ", Style::new().fg(Color::Blue)),
                            Span::styled(
                                format!("{}: ", link.title),
                                Style::new().fg(Color::Blue),
                            ),
                            Span::styled(link.url.clone(), Style::new().fg(Color::Blue).dim()),
                        ]));
                    }
                }
                lines
            }
            _ => Vec::new(),
        }
    }
}

/// Style one reader line, highlighting the selected span
fn styled_line<'a>(text: &'a str, doc_y: u16, highlight: Option<&SelectionRect>) -> Line<'a> {
    let Some(rect) = highlight else {
        return Line::raw(text);
    };
    if doc_y < rect.y || doc_y >= rect.y + rect.height {
        return Line::raw(text);
    }

    let chars: Vec<char> = text.chars().collect();
    let from = (rect.x as usize).min(chars.len());
    let to = ((rect.x + rect.width) as usize).min(chars.len());
    if from >= to {
        return Line::raw(text);
    }

    let from_b = byte_at(text, from);
    let to_b = byte_at(text, to);
    Line::from(vec![
        Span::raw(&text[..from_b]),
        Span::styled(&text[from_b..to_b], HIGHLIGHT_STYLE),
        Span::raw(&text[to_b..]),
    ])
}

fn byte_at(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

fn category_style(category: Category) -> Style {
    let fg = match category {
        Category::Person => Color::Blue,
        Category::Concept => Color::Magenta,
        Category::Location => Color::Green,
        Category::Organization => Color::Yellow,
        Category::Event => Color::Cyan,
        Category::Technology => Color::LightBlue,
        Category::General => Color::Gray,
    };
    Style::new().fg(fg).bold()
}

// --- terminal session ---------------------------------------------------

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
            teardown_terminal();
            return Err(err);
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(err) => {
                teardown_terminal();
                return Err(err);
            }
        };
        Ok(Self { terminal })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

// --- event loop ---------------------------------------------------------

/// Run the reader on the given page until the user quits.
pub async fn run(page: Page, config: Config) -> anyhow::Result<()> {
    let mut session = TerminalSession::new()?;
    let mut app = App::new(page, config);

    while !app.should_quit {
        app.poll_pending();
        session.terminal.draw(|frame| app.draw(frame))?;

        if event::poll(Duration::from_millis(120))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if let Some(request) = app.handle_key(key) {
                        dispatch(&mut app, request);
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some(request) = app.handle_mouse(mouse) {
                        dispatch(&mut app, request);
                    }
                }
                Event::Resize(_, _) => app.handle_resize(),
                _ => {}
            }
        } else {
            app.spinner = app.spinner.wrapping_add(1);
        }
    }

    Ok(())
}

/// Spawn the single in-flight analysis request
fn dispatch(app: &mut App, request: AnalysisRequest) {
    let (tx, rx) = oneshot::channel();
    let config = app.config.clone();
    let AnalysisRequest { text, context } = request.clone();
    tokio::spawn(async move {
        let result = agent::analyze_or_fallback(&text, &context, &config).await;
        let _ = tx.send(result);
    });
    app.pending = Some((request.text, rx));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let mut app = App::new(Page::demo(), Config::default());
        app.body_area = Rect::new(0, 2, 80, 21);
        app.layout = PageLayout::build(&app.page, 80);
        app
    }

    fn select_span(app: &mut App, x1: u16, x2: u16, y: u16) {
        app.drag = Some((CellPos { x: x1, y }, CellPos { x: x2, y }));
        app.finish_drag();
    }

    fn result_for(title: &str) -> AnalysisResult {
        AnalysisResult {
            title: title.to_string(),
            category: Category::Technology,
            summary: vec!["An explanation.".to_string()],
            tags: vec!["tech".to_string()],
            external_links: Vec::new(),
        }
    }

    #[test]
    fn drag_release_shows_icon() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        assert!(matches!(app.overlay, Overlay::Icon { .. }));
        assert!(app.icon_screen_pos().is_some());
    }

    #[test]
    fn plain_click_collapses_selection() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        select_span(&mut app, 5, 5, 0);
        assert!(matches!(app.overlay, Overlay::Hidden));
    }

    #[test]
    fn activation_misses_cache_and_requests_once() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);

        let request = app.activate_icon();
        assert!(request.is_some());
        assert!(matches!(app.overlay, Overlay::Loading { .. }));

        let request = request.unwrap();
        assert!(!request.text.is_empty());
        assert!(!request.context.is_empty());
    }

    #[test]
    fn result_is_cached_and_shown() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        let request = app.activate_icon().unwrap();

        app.finish_analysis(&request.text, result_for("Term"));
        assert!(matches!(app.overlay, Overlay::Card { .. }));
        assert!(app.cache.contains(&request.text));
    }

    #[test]
    fn cache_hit_skips_network_call() {
        let mut app = test_app();

        select_span(&mut app, 0, 10, 0);
        let request = app.activate_icon().unwrap();
        let text = request.text.clone();
        app.finish_analysis(&text, result_for("Term"));
        app.close_overlay();

        // Identical selection again: no request this time
        select_span(&mut app, 0, 10, 0);
        assert!(app.activate_icon().is_none());
        match &app.overlay {
            Overlay::Card { data, .. } => assert_eq!(data.title, "Term"),
            other => panic!("expected card, got {:?}", other),
        }
    }

    #[test]
    fn new_selection_is_ignored_while_card_open() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        let request = app.activate_icon().unwrap();
        app.finish_analysis(&request.text, result_for("Term"));

        select_span(&mut app, 0, 8, 2);
        assert!(matches!(app.overlay, Overlay::Card { .. }));
    }

    #[test]
    fn stale_result_is_cached_but_not_shown() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        let request = app.activate_icon().unwrap();

        app.close_overlay();
        app.finish_analysis(&request.text, result_for("Term"));

        assert!(matches!(app.overlay, Overlay::Hidden));
        assert!(app.cache.contains(&request.text));
    }

    #[test]
    fn closing_clears_selection_state() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        let request = app.activate_icon().unwrap();
        app.finish_analysis(&request.text, result_for("Term"));

        app.close_overlay();
        assert!(matches!(app.overlay, Overlay::Hidden));
        assert!(app.highlight_rect().is_none());
    }

    #[test]
    fn card_rect_stays_inside_reader_pane() {
        let mut app = test_app();
        select_span(&mut app, 70, 79, 0);
        let request = app.activate_icon().unwrap();
        app.finish_analysis(&request.text, result_for("Edge"));

        let content_height = app.card_content_lines().len() as u16 + 2;
        let rect = app.card_screen_rect(content_height).unwrap();
        let body = app.body_area;
        assert!(rect.x >= body.x);
        assert!(rect.x + rect.width <= body.x + body.width);
        assert!(rect.y >= body.y);
        assert!(rect.y + rect.height <= body.y + body.height);
    }

    #[test]
    fn resize_drops_stale_selection() {
        let mut app = test_app();
        select_span(&mut app, 0, 10, 0);
        app.handle_resize();
        assert!(matches!(app.overlay, Overlay::Hidden));
    }
}
