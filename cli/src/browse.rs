//! Full-screen browse mode: filter, sort and page through incidents.

use crate::actions::{self, Outcome};
use crate::client::ApiClient;
use crate::render;
use crate::state::{BrowseState, View};
use anyhow::Result;
use common::ListParams;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use std::io::{self, Stdout, Write};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Step {
    Continue,
    Quit,
    Create,
    Open(String),
}

pub async fn run(client: &ApiClient) -> Result<()> {
    let mut stdout = io::stdout();
    let mut state = BrowseState::default();
    enter(&mut stdout)?;
    let result = event_loop(client, &mut state, &mut stdout).await;
    leave(&mut stdout)?;
    println!("\n{}", render::success("Goodbye!"));
    result
}

fn enter(out: &mut Stdout) -> Result<()> {
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, Hide)?;
    Ok(())
}

fn leave(out: &mut Stdout) -> Result<()> {
    execute!(out, Show, LeaveAlternateScreen)?;
    disable_raw_mode()?;
    Ok(())
}

fn paint(out: &mut Stdout, lines: &[String]) -> Result<()> {
    queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
    for (row, line) in lines.iter().enumerate() {
        queue!(out, MoveTo(0, row as u16), Print(line))?;
    }
    out.flush()?;
    Ok(())
}

async fn event_loop(client: &ApiClient, state: &mut BrowseState, out: &mut Stdout) -> Result<()> {
    let mut shown: Option<ListParams> = None;
    let mut painted: Vec<String> = Vec::new();

    loop {
        state.tick(Instant::now());

        let params = state.params();
        if shown.as_ref() != Some(&params) {
            state.set_view(View::Loading);
            painted = render::browse(state);
            paint(out, &painted)?;

            let view = match client.list(&params).await {
                Ok(page) => View::Loaded(page),
                Err(e) => View::Failed(format!("{e:#}")),
            };
            state.set_view(view);
            shown = Some(params);
        }

        let lines = render::browse(state);
        if lines != painted {
            paint(out, &lines)?;
            painted = lines;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }

        let outcome = match handle_event(state, event::read()?) {
            Step::Continue => continue,
            Step::Quit => break,
            Step::Create => {
                leave(out)?;
                let outcome = actions::create(client).await;
                enter(out)?;
                outcome
            }
            Step::Open(id) => {
                leave(out)?;
                let outcome = actions::open(client, &id).await;
                enter(out)?;
                outcome
            }
        };

        let now = Instant::now();
        match outcome {
            Ok(Outcome::Done(message)) => state.flash(message, true, now),
            Ok(Outcome::Failed(message)) => state.flash(message, false, now),
            Ok(Outcome::Cancelled) => {}
            Err(e) => state.flash(format!("{e:#}"), false, now),
        }
        // Records may have changed underneath the current page.
        shown = None;
        painted.clear();
    }

    Ok(())
}

fn handle_event(state: &mut BrowseState, event: Event) -> Step {
    let Event::Key(key) = event else {
        return Step::Continue;
    };
    if key.kind != KeyEventKind::Press {
        return Step::Continue;
    }

    let now = Instant::now();
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => return Step::Quit,
        KeyCode::Char('c') if ctrl => return Step::Quit,
        KeyCode::Char('n') if ctrl => return Step::Create,
        KeyCode::Char('s') if ctrl => state.cycle_severity(),
        KeyCode::Char('t') if ctrl => state.cycle_status(),
        KeyCode::Char('o') if ctrl => state.cycle_sort_column(),
        KeyCode::Char('r') if ctrl => state.toggle_sort_order(),
        KeyCode::Char(c) if !ctrl => state.type_char(c, now),
        KeyCode::Backspace => state.backspace(now),
        KeyCode::Tab => state.toggle_focus(),
        KeyCode::Up => state.select_prev(),
        KeyCode::Down => state.select_next(),
        KeyCode::Left | KeyCode::PageUp => state.prev_page(),
        KeyCode::Right | KeyCode::PageDown => state.next_page(),
        KeyCode::Enter => {
            if let Some(incident) = state.selected_incident() {
                return Step::Open(incident.id.clone());
            }
        }
        _ => {}
    }
    Step::Continue
}
