use std::cell::RefCell;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use clap::Parser;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, terminal};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::{Frame, Terminal};

use term_dock::persist::LayoutStore;
use term_dock::{DockManager, LeafId, PaneContent, WindowKey};

const ANCHOR: &str = "map";
const PANES: [&str; 6] = [
    ANCHOR,
    "sidebar",
    "histogram",
    "scatter",
    "datatable",
    "network",
];

#[derive(Parser, Debug)]
#[command(about = "Dockable panel layout demo")]
struct Cli {
    /// Where the workspace layout is persisted between runs.
    #[arg(long, default_value = "workspace-layout.json")]
    layout_file: PathBuf,

    /// Ignore any persisted layout and start from the default arrangement.
    #[arg(long)]
    reset: bool,

    /// Append tracing output to this file (the alternate screen owns stderr).
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    term_dock::tracing_sub::init_default(cli.log_file.as_deref())?;

    let store = Rc::new(RefCell::new(LayoutStore::new(cli.layout_file)));
    let mut manager = DockManager::new(ANCHOR);
    for name in PANES {
        manager.register(name, Box::new(TextPane::new(name)));
    }
    {
        let store = Rc::clone(&store);
        manager.set_on_layout_change(move |record| {
            store.borrow_mut().schedule(record.clone(), Instant::now());
        });
    }

    let persisted = if cli.reset {
        None
    } else {
        store.borrow().load()
    };
    match persisted {
        Some(record) => manager.mount(record.layout),
        None => manager.mount_default(&[
            WindowKey::from("sidebar"),
            WindowKey::from("datatable"),
        ]),
    }

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    terminal::enable_raw_mode()?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut manager, &store);

    store.borrow_mut().flush().map_err(io::Error::other)?;
    manager.destroy();

    terminal::disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    manager: &mut DockManager,
    store: &Rc<RefCell<LayoutStore>>,
) -> io::Result<()> {
    loop {
        terminal.draw(|frame| manager.render(frame, frame.area()))?;
        store
            .borrow_mut()
            .tick(Instant::now())
            .map_err(io::Error::other)?;

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        let ev = event::read()?;

        if let Event::Key(key) = &ev {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('w') => {
                        if let Some(window) = manager.focused_window() {
                            manager.remove_window(&window);
                        }
                        continue;
                    }
                    _ => {}
                }
            }
            if let KeyCode::Char(digit @ '1'..='6') = key.code {
                let index = digit as usize - '1' as usize;
                manager.add_window(&WindowKey::from(PANES[index]));
                continue;
            }
        }

        // Drag gestures first; whatever the engine leaves alone goes to the
        // focused pane's content.
        if !manager.handle_event(&ev) {
            manager.handle_content_event(&ev);
        }
    }
}

/// Demo pane: a few lines of text with a scroll offset that survives
/// re-docking, since the engine moves contents instead of rebuilding them.
struct TextPane {
    name: &'static str,
    scroll: u16,
    attach_count: u32,
}

impl TextPane {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            scroll: 0,
            attach_count: 0,
        }
    }
}

impl PaneContent for TextPane {
    fn render(&mut self, frame: &mut Frame<'_>, area: Rect, focused: bool) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let mut lines = vec![Line::from(format!("[{}]", self.name))];
        lines.push(Line::from(format!(
            "attached {} time(s), scroll {}",
            self.attach_count, self.scroll
        )));
        lines.push(Line::from(
            "drag tabs to re-dock, drag dividers to resize",
        ));
        for n in 0..64u16 {
            lines.push(Line::from(format!("{} line {n}", self.name)));
        }
        let style = if focused {
            Style::default().add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let body = Paragraph::new(lines).style(style).scroll((self.scroll, 0));
        frame.render_widget(body, area);
    }

    fn handle_event(&mut self, event: &Event) -> bool {
        if let Event::Key(key) = event {
            match key.code {
                KeyCode::Up => {
                    self.scroll = self.scroll.saturating_sub(1);
                    return true;
                }
                KeyCode::Down => {
                    self.scroll = self.scroll.saturating_add(1);
                    return true;
                }
                _ => {}
            }
        }
        false
    }

    fn attached(&mut self, leaf: LeafId) {
        self.attach_count += 1;
        tracing::debug!(pane = self.name, ?leaf, "pane attached");
    }

    fn detached(&mut self) {
        tracing::debug!(pane = self.name, "pane detached");
    }
}
