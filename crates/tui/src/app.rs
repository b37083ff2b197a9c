use std::{io, thread, time::Duration};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tokio::{spawn, sync::mpsc, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, error, info, warn};

use memhub_core::{
    config::AppConfig,
    game::{build_preview, DeckSize, Face, FlipOutcome, GameResult, GameSession, Phase},
    models::{HighScoreEntry, MemoryCard},
    scores::{self, ScoreSubmission},
    store::AppStore,
};

const INPUT_POLL: Duration = Duration::from_millis(250);
const MAX_PLAYER_NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Menu,
    Browse,
    DeckSetup,
    Play,
    Scores,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowseMode {
    List,
    Filter,
}

enum AppEvent {
    Input(Event),
    Tick,
    GameTick,
    UserRefreshed(Result<()>),
    CardsRefreshed(Result<()>),
    FavoritesRefreshed(Result<()>),
    FavoriteToggled {
        card_id: String,
        result: Result<bool>,
    },
    DetailLoaded(Result<MemoryCard>),
    ActiveToggled(Result<MemoryCard>),
    ScoresLoaded(DeckSize, Result<Vec<HighScoreEntry>>),
    ScoreSubmitted(Result<HighScoreEntry>),
    LoggedOut(Result<()>),
}

/// Player-name prompt shown after a qualifying run.
#[derive(Debug, Clone)]
struct NamePrompt {
    input: String,
    cursor: usize,
    error: Option<String>,
}

impl NamePrompt {
    fn new(default: String) -> Self {
        let cursor = default.len();
        Self {
            input: default,
            cursor,
            error: None,
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.input.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len);
        self.cursor = next as usize;
    }

    fn insert(&mut self, ch: char) {
        if self.input.len() >= MAX_PLAYER_NAME_LEN {
            return;
        }
        if ch.is_ascii() && !ch.is_ascii_control() {
            self.input.insert(self.cursor, ch);
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.input.len() {
            self.cursor -= 1;
            self.input.remove(self.cursor);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
        }
    }
}

struct PreviewState {
    cards: Vec<MemoryCard>,
    remaining: Duration,
}

struct PlayState {
    session: GameSession,
    cursor: usize,
    preview: Option<PreviewState>,
    result: Option<GameResult>,
    bucket: Option<Vec<HighScoreEntry>>,
    qualifies: Option<bool>,
    name_prompt: Option<NamePrompt>,
    submitted: bool,
}

impl PlayState {
    fn columns(&self) -> usize {
        match self.session.size() {
            DeckSize::Small | DeckSize::Medium => 5,
            DeckSize::Large => 8,
        }
    }
}

/// High-level application state for the terminal frontend.
pub struct MemHubApp {
    config: AppConfig,
    store: AppStore,
    screen: Screen,
    status: String,
    should_quit: bool,
    menu_cursor: usize,
    browse_cursor: usize,
    browse_filter: String,
    browse_mode: BrowseMode,
    detail: Option<MemoryCard>,
    setup_groups: Vec<u32>,
    setup_group_cursor: usize,
    setup_size_cursor: usize,
    setup_notice: Option<String>,
    play: Option<PlayState>,
    scores_bucket_idx: usize,
    scores: Option<Vec<HighScoreEntry>>,
    event_tx: Option<mpsc::Sender<AppEvent>>,
    clock: Option<JoinHandle<()>>,
}

impl MemHubApp {
    pub fn new(config: AppConfig, store: AppStore) -> Self {
        Self {
            config,
            store,
            screen: Screen::Menu,
            status: "Welcome to MemHub".to_string(),
            should_quit: false,
            menu_cursor: 0,
            browse_cursor: 0,
            browse_filter: String::new(),
            browse_mode: BrowseMode::List,
            detail: None,
            setup_groups: Vec::new(),
            setup_group_cursor: 0,
            setup_size_cursor: 0,
            setup_notice: None,
            play: None,
            scores_bucket_idx: 0,
            scores: None,
            event_tx: None,
            clock: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx.clone());
        self.event_tx = Some(event_tx);

        self.spawn_cards_refresh();
        self.spawn_user_refresh();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.should_quit {
                break;
            }

            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }

            if self.should_quit {
                break;
            }
        }

        self.stop_game_clock();
        restore_terminal(&mut terminal)?;
        self.event_tx = None;
        Ok(())
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        let Some(app_event) = maybe_event else {
            return false;
        };
        match app_event {
            AppEvent::Input(Event::Key(key)) => self.handle_key(key),
            AppEvent::Input(_) => {}
            AppEvent::Tick => {}
            AppEvent::GameTick => self.handle_game_tick(),
            AppEvent::UserRefreshed(result) => match result {
                Ok(()) => {
                    if let Some(user) = self.store.user() {
                        self.set_status(format!("Signed in as {}", user.display_name()));
                        self.spawn_favorites_refresh();
                    }
                }
                Err(err) => {
                    warn!("user refresh failed: {err:#}");
                    self.set_status(format!("Could not load session user: {err}"));
                }
            },
            AppEvent::CardsRefreshed(result) => match result {
                Ok(()) => {
                    let active = self.store.active_cards().len();
                    self.set_status(format!("Loaded {active} active cards"));
                }
                Err(err) => {
                    warn!("card refresh failed: {err:#}");
                    self.set_status(format!("Could not load cards: {err}"));
                }
            },
            AppEvent::FavoritesRefreshed(result) => {
                if let Err(err) = result {
                    warn!("favorites refresh failed: {err:#}");
                }
            }
            AppEvent::FavoriteToggled { card_id, result } => match result {
                Ok(true) => self.set_status(format!("Added {card_id} to favorites")),
                Ok(false) => self.set_status(format!("Removed {card_id} from favorites")),
                Err(err) => self.set_status(format!("Favorite update failed: {err}")),
            },
            AppEvent::DetailLoaded(result) => match result {
                Ok(card) => self.detail = Some(card),
                Err(err) => self.set_status(format!("Could not load card: {err}")),
            },
            AppEvent::ActiveToggled(result) => match result {
                Ok(card) => {
                    self.set_status(format!(
                        "{} is now {}",
                        card.name,
                        if card.is_active { "active" } else { "inactive" }
                    ));
                    self.spawn_cards_refresh();
                }
                Err(err) => self.set_status(format!("Could not toggle card: {err}")),
            },
            AppEvent::ScoresLoaded(bucket, result) => self.handle_scores_loaded(bucket, result),
            AppEvent::ScoreSubmitted(result) => match result {
                Ok(entry) => {
                    info!(player = %entry.player_name, "high score stored");
                    self.set_status(format!("High score saved for {}", entry.player_name));
                }
                Err(err) => {
                    // the session stays won; only the submission failed
                    error!("score submission failed: {err:#}");
                    self.set_status(format!("Score submission failed: {err}"));
                }
            },
            AppEvent::LoggedOut(result) => match result {
                Ok(()) => {
                    self.set_status("Signed out".to_string());
                    self.spawn_user_refresh();
                }
                Err(err) => self.set_status(format!("Logout failed: {err}")),
            },
        }
        true
    }

    fn set_status(&mut self, status: String) {
        self.status = status;
    }

    // --- timers -----------------------------------------------------------

    fn start_game_clock(&mut self) {
        self.stop_game_clock();
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let interval = self.config.tick_interval();
        self.clock = Some(spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(AppEvent::GameTick).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// The session owns at most one live clock; every state-exiting
    /// transition (win, reset, leaving the play screen, quit) lands here.
    fn stop_game_clock(&mut self) {
        if let Some(handle) = self.clock.take() {
            handle.abort();
        }
    }

    fn handle_game_tick(&mut self) {
        let tick = self.config.tick_interval();
        let Some(play) = self.play.as_mut() else {
            return;
        };
        if let Some(preview) = play.preview.as_mut() {
            if preview.remaining > tick {
                preview.remaining -= tick;
            } else {
                play.preview = None;
                play.session.start();
            }
            return;
        }
        play.session.tick(tick);
    }

    // --- input ------------------------------------------------------------

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Menu => self.handle_menu_key(key),
            Screen::Browse => self.handle_browse_key(key),
            Screen::DeckSetup => self.handle_setup_key(key),
            Screen::Play => self.handle_play_key(key),
            Screen::Scores => self.handle_scores_key(key),
        }
    }

    fn menu_items(&self) -> Vec<&'static str> {
        let auth = if self.store.is_signed_in() {
            "Logout"
        } else {
            "Login with GitHub"
        };
        vec!["Play", "Browse cards", "High scores", auth, "Quit"]
    }

    fn handle_menu_key(&mut self, key: KeyEvent) {
        let items = self.menu_items().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.menu_cursor = self.menu_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.menu_cursor = (self.menu_cursor + 1).min(items - 1);
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => match self.menu_cursor {
                0 => self.enter_deck_setup(),
                1 => {
                    self.browse_cursor = 0;
                    self.detail = None;
                    self.screen = Screen::Browse;
                }
                2 => {
                    self.screen = Screen::Scores;
                    self.load_scores_bucket();
                }
                3 => {
                    if self.store.is_signed_in() {
                        self.spawn_logout();
                    } else {
                        let url = self.store.client().login_url();
                        self.set_status(format!("Open {url} in a browser, then press 'u'"));
                    }
                }
                _ => self.should_quit = true,
            },
            KeyCode::Char('u') => {
                self.spawn_user_refresh();
                self.spawn_cards_refresh();
                self.set_status("Refreshing session...".to_string());
            }
            _ => {}
        }
    }

    fn filtered_cards(&self) -> Vec<MemoryCard> {
        let needle = self.browse_filter.trim().to_lowercase();
        let cards = self.store.active_cards();
        if needle.is_empty() {
            return cards;
        }
        cards
            .into_iter()
            .filter(|card| {
                card.name.to_lowercase().contains(&needle)
                    || card.match_id.to_string().contains(&needle)
            })
            .collect()
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        if self.browse_mode == BrowseMode::Filter {
            match key.code {
                KeyCode::Esc => {
                    self.browse_filter.clear();
                    self.browse_mode = BrowseMode::List;
                }
                KeyCode::Enter => self.browse_mode = BrowseMode::List,
                KeyCode::Backspace => {
                    self.browse_filter.pop();
                    self.browse_cursor = 0;
                }
                KeyCode::Char(ch) => {
                    self.browse_filter.push(ch);
                    self.browse_cursor = 0;
                }
                _ => {}
            }
            return;
        }

        if self.detail.is_some() {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => self.detail = None,
                _ => {}
            }
            return;
        }

        let count = self.filtered_cards().len();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.browse_cursor = self.browse_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if count > 0 {
                    self.browse_cursor = (self.browse_cursor + 1).min(count - 1);
                }
            }
            KeyCode::Char('/') => self.browse_mode = BrowseMode::Filter,
            KeyCode::Char('f') => {
                if let Some(card) = self.filtered_cards().get(self.browse_cursor) {
                    if self.store.is_signed_in() {
                        self.spawn_toggle_favorite(card.id.clone());
                    } else {
                        self.set_status("Sign in to manage favorites".to_string());
                    }
                }
            }
            KeyCode::Char('a') => {
                if let Some(card) = self.filtered_cards().get(self.browse_cursor) {
                    let owned = self
                        .store
                        .github_id()
                        .is_some_and(|id| id == card.app_user_github_id);
                    if owned {
                        self.spawn_toggle_active(card.id.clone());
                    } else {
                        self.set_status("Only the owner can toggle a card".to_string());
                    }
                }
            }
            KeyCode::Enter => {
                if let Some(card) = self.filtered_cards().get(self.browse_cursor) {
                    self.spawn_detail(card.id.clone());
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::Menu,
            _ => {}
        }
    }

    fn enter_deck_setup(&mut self) {
        self.setup_groups = self.store.deck_groups();
        self.setup_group_cursor = 0;
        self.setup_size_cursor = 0;
        self.setup_notice = if self.setup_groups.is_empty() {
            Some("No active cards available yet - ask for some to be created".to_string())
        } else {
            None
        };
        self.screen = Screen::DeckSetup;
    }

    fn handle_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.setup_group_cursor = self.setup_group_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if !self.setup_groups.is_empty() {
                    self.setup_group_cursor =
                        (self.setup_group_cursor + 1).min(self.setup_groups.len() - 1);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => {
                self.setup_size_cursor = self.setup_size_cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.setup_size_cursor = (self.setup_size_cursor + 1).min(DeckSize::ALL.len() - 1);
            }
            KeyCode::Enter => self.start_play(),
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::Menu,
            _ => {}
        }
    }

    fn start_play(&mut self) {
        let Some(&match_id) = self.setup_groups.get(self.setup_group_cursor) else {
            return;
        };
        let size = DeckSize::ALL[self.setup_size_cursor];
        let candidates = self.store.active_cards_for_group(match_id);
        let mut rng = rand::thread_rng();

        let preview_cards = match build_preview(&candidates, size, &mut rng) {
            Ok(cards) => cards,
            Err(err) => {
                self.setup_notice = Some(err.to_string());
                return;
            }
        };
        let session = match GameSession::deal(
            match_id,
            size,
            &candidates,
            &mut rng,
            self.config.flip_back_delay(),
        ) {
            Ok(session) => session,
            Err(err) => {
                self.setup_notice = Some(err.to_string());
                return;
            }
        };

        debug!(match_id, size = size.card_count(), "dealt new session");
        self.play = Some(PlayState {
            session,
            cursor: 0,
            preview: Some(PreviewState {
                cards: preview_cards,
                remaining: self.config.preview_duration(),
            }),
            result: None,
            bucket: None,
            qualifies: None,
            name_prompt: None,
            submitted: false,
        });
        self.screen = Screen::Play;
        self.start_game_clock();
    }

    fn leave_play(&mut self) {
        self.stop_game_clock();
        self.play = None;
        self.screen = Screen::Menu;
    }

    fn handle_play_key(&mut self, key: KeyEvent) {
        // the name prompt captures all input while open
        if self
            .play
            .as_ref()
            .is_some_and(|play| play.name_prompt.is_some())
        {
            self.handle_prompt_key(key);
            return;
        }

        let Some(play) = self.play.as_mut() else {
            self.screen = Screen::Menu;
            return;
        };

        if play.preview.is_some() {
            match key.code {
                KeyCode::Enter | KeyCode::Char(' ') => {
                    play.preview = None;
                    play.session.start();
                }
                KeyCode::Esc | KeyCode::Char('q') => self.leave_play(),
                _ => {}
            }
            return;
        }

        if play.session.phase() == Phase::Won {
            match key.code {
                KeyCode::Char('n') => {
                    self.stop_game_clock();
                    self.play = None;
                    self.enter_deck_setup();
                }
                KeyCode::Char('s') => {
                    let size = play.session.size();
                    self.stop_game_clock();
                    self.play = None;
                    self.scores_bucket_idx = DeckSize::ALL
                        .iter()
                        .position(|bucket| *bucket == size)
                        .unwrap_or(0);
                    self.screen = Screen::Scores;
                    self.load_scores_bucket();
                }
                KeyCode::Esc | KeyCode::Char('q') => self.leave_play(),
                _ => {}
            }
            return;
        }

        let columns = play.columns();
        let total = play.session.board().len();
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                play.cursor = play.cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                play.cursor = (play.cursor + 1).min(total.saturating_sub(1));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                play.cursor = play.cursor.saturating_sub(columns);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                play.cursor = (play.cursor + columns).min(total.saturating_sub(1));
            }
            KeyCode::Enter | KeyCode::Char(' ') => self.flip_under_cursor(),
            KeyCode::Char('r') => self.start_play(),
            KeyCode::Esc | KeyCode::Char('q') => self.leave_play(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let mut confirmed: Option<String> = None;
        if let Some(prompt) = self
            .play
            .as_mut()
            .and_then(|play| play.name_prompt.as_mut())
        {
            match key.code {
                KeyCode::Enter => match scores::validate_player_name(&prompt.input) {
                    Ok(name) => confirmed = Some(name),
                    Err(err) => prompt.error = Some(err.to_string()),
                },
                KeyCode::Left => prompt.move_cursor(-1),
                KeyCode::Right => prompt.move_cursor(1),
                KeyCode::Home => prompt.cursor = 0,
                KeyCode::End => prompt.cursor = prompt.input.len(),
                KeyCode::Backspace => prompt.backspace(),
                KeyCode::Delete => prompt.delete(),
                KeyCode::Char(ch) => prompt.insert(ch),
                _ => {}
            }
        }
        if key.code == KeyCode::Esc {
            if let Some(play) = self.play.as_mut() {
                play.name_prompt = None;
            }
            self.set_status("Score kept local - not submitted".to_string());
        }
        if let Some(name) = confirmed {
            self.submit_score(name);
        }
    }

    fn flip_under_cursor(&mut self) {
        let Some(play) = self.play.as_mut() else {
            return;
        };
        match play.session.flip(play.cursor) {
            FlipOutcome::Won(result) => {
                // timer freezes with the win; the clock task goes with it
                self.stop_game_clock();
                let size = result.size;
                if let Some(play) = self.play.as_mut() {
                    play.result = Some(result.clone());
                }
                self.set_status(format!("Board cleared in {:.1}s!", result.score_time()));
                self.spawn_scores_load(size);
            }
            FlipOutcome::Matched { card_id } => {
                debug!(%card_id, "pair matched");
            }
            FlipOutcome::Mismatched | FlipOutcome::Flipped | FlipOutcome::Rejected => {}
        }
    }

    fn submit_score(&mut self, name: String) {
        let Some(play) = self.play.as_mut() else {
            return;
        };
        let Some(result) = play.result.clone() else {
            return;
        };
        if play.submitted {
            return;
        }
        play.submitted = true;
        play.name_prompt = None;

        let github_id = self.store.github_id().unwrap_or_default();
        let submission = ScoreSubmission::from_result(&result, name, github_id);
        let client = self.store.client().clone();
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        spawn(async move {
            let sent = client
                .submit_high_score(&submission)
                .await
                .map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::ScoreSubmitted(sent)).await;
        });
    }

    fn handle_scores_loaded(&mut self, bucket: DeckSize, result: Result<Vec<HighScoreEntry>>) {
        let entries = match result {
            Ok(entries) => entries,
            Err(err) => {
                warn!("score fetch failed: {err:#}");
                self.set_status(format!("Could not load high scores: {err}"));
                return;
            }
        };

        if self.screen == Screen::Scores && DeckSize::ALL[self.scores_bucket_idx] == bucket {
            self.scores = Some(entries.clone());
        }

        let default_name = self
            .store
            .user()
            .map(|user| user.display_name().to_string())
            .unwrap_or_default();
        if let Some(play) = self.play.as_mut() {
            if let Some(result) = play.result.as_ref() {
                if result.size == bucket && play.qualifies.is_none() {
                    let earned = scores::qualifies(&entries, result.score_time());
                    play.bucket = Some(entries);
                    play.qualifies = Some(earned);
                    if earned && !play.submitted {
                        play.name_prompt = Some(NamePrompt::new(default_name));
                    }
                }
            }
        }
    }

    fn handle_scores_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => {
                if self.scores_bucket_idx > 0 {
                    self.scores_bucket_idx -= 1;
                    self.load_scores_bucket();
                }
            }
            KeyCode::Right | KeyCode::Char('l') => {
                if self.scores_bucket_idx + 1 < DeckSize::ALL.len() {
                    self.scores_bucket_idx += 1;
                    self.load_scores_bucket();
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => self.screen = Screen::Menu,
            _ => {}
        }
    }

    fn load_scores_bucket(&mut self) {
        self.scores = None;
        let bucket = DeckSize::ALL[self.scores_bucket_idx];
        self.spawn_scores_load(bucket);
    }

    // --- background work --------------------------------------------------

    fn spawn_user_refresh(&self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let store = self.store.clone();
        spawn(async move {
            let result = store.refresh_user().await.map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::UserRefreshed(result)).await;
        });
    }

    fn spawn_cards_refresh(&self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let store = self.store.clone();
        spawn(async move {
            let result = store.refresh_cards().await.map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::CardsRefreshed(result)).await;
        });
    }

    fn spawn_favorites_refresh(&self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let store = self.store.clone();
        spawn(async move {
            let result = store.refresh_favorites().await.map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::FavoritesRefreshed(result)).await;
        });
    }

    fn spawn_toggle_favorite(&self, card_id: String) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let store = self.store.clone();
        spawn(async move {
            let result = store
                .toggle_favorite(&card_id)
                .await
                .map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::FavoriteToggled { card_id, result }).await;
        });
    }

    fn spawn_toggle_active(&self, card_id: String) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.store.client().clone();
        spawn(async move {
            let result = client
                .toggle_active(&card_id)
                .await
                .map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::ActiveToggled(result)).await;
        });
    }

    fn spawn_detail(&self, card_id: String) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let store = self.store.clone();
        spawn(async move {
            let result = store.card_detail(&card_id).await.map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::DetailLoaded(result)).await;
        });
    }

    fn spawn_scores_load(&self, bucket: DeckSize) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.store.client().clone();
        spawn(async move {
            let result = client
                .high_scores(bucket)
                .await
                .map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::ScoresLoaded(bucket, result)).await;
        });
    }

    fn spawn_logout(&self) {
        let Some(tx) = self.event_tx.clone() else {
            return;
        };
        let client = self.store.client().clone();
        spawn(async move {
            let result = client.logout().await.map_err(anyhow::Error::from);
            let _ = tx.send(AppEvent::LoggedOut(result)).await;
        });
    }

    // --- rendering --------------------------------------------------------

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_header(frame, chunks[0]);
        match self.screen {
            Screen::Menu => self.draw_menu(frame, chunks[1]),
            Screen::Browse => self.draw_browse(frame, chunks[1]),
            Screen::DeckSetup => self.draw_setup(frame, chunks[1]),
            Screen::Play => self.draw_play(frame, chunks[1]),
            Screen::Scores => self.draw_scores(frame, chunks[1]),
        }
        self.draw_status(frame, chunks[2]);

        if self.screen == Screen::Browse {
            if let Some(card) = self.detail.clone() {
                self.draw_detail_popup(frame, area, &card);
            }
        }
        if self.screen == Screen::Play {
            if let Some(prompt) = self.play.as_ref().and_then(|play| play.name_prompt.clone()) {
                self.draw_name_prompt(frame, area, &prompt);
            }
        }
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let user = match self.store.user() {
            Some(user) => format!("{} @ MemoryHub", user.display_name()),
            None => "anonymous".to_string(),
        };
        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                " MemHub ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("- memory card matching  "),
            Span::styled(user, Style::default().fg(Color::DarkGray)),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let hints = match self.screen {
            Screen::Menu => "enter select | u refresh | q quit",
            Screen::Browse => "/ filter | f favorite | a toggle active | enter detail | esc back",
            Screen::DeckSetup => "up/down group | left/right size | enter deal | esc back",
            Screen::Play => "arrows move | enter flip | r redeal | esc back",
            Screen::Scores => "left/right bucket | esc back",
        };
        let status = Paragraph::new(Line::from(vec![
            Span::raw(self.status.clone()),
            Span::styled(
                format!("   [{hints}]"),
                Style::default().fg(Color::DarkGray),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(status, area);
    }

    fn draw_menu(&mut self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .menu_items()
            .into_iter()
            .map(|label| ListItem::new(Line::from(label)))
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Menu"))
            .highlight_style(
                Style::default()
                    .bg(Color::Cyan)
                    .fg(Color::Black)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(Some(self.menu_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_browse(&mut self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let filter_label = if self.browse_mode == BrowseMode::Filter {
            format!("Filter: {}_", self.browse_filter)
        } else if self.browse_filter.is_empty() {
            "Filter: (press / to search by name or group)".to_string()
        } else {
            format!("Filter: {}", self.browse_filter)
        };
        frame.render_widget(
            Paragraph::new(filter_label).block(Block::default().borders(Borders::ALL)),
            chunks[0],
        );

        let cards = self.filtered_cards();
        self.browse_cursor = self.browse_cursor.min(cards.len().saturating_sub(1));
        let items: Vec<ListItem> = cards
            .iter()
            .map(|card| {
                let heart = if self.store.is_favorite(&card.id) {
                    "* "
                } else {
                    "  "
                };
                ListItem::new(Line::from(vec![
                    Span::styled(heart.to_string(), Style::default().fg(Color::Red)),
                    Span::raw(format!(
                        "{}  (group {}, by {})",
                        card.name, card.match_id, card.app_user_username
                    )),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Active cards ({})", cards.len())),
            )
            .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        state.select(if cards.is_empty() {
            None
        } else {
            Some(self.browse_cursor)
        });
        frame.render_stateful_widget(list, chunks[1], &mut state);
    }

    fn draw_detail_popup(&self, frame: &mut Frame, area: Rect, card: &MemoryCard) {
        let popup = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup);

        let name = if card.name.is_empty() {
            "(unknown card)"
        } else {
            card.name.as_str()
        };
        let lines = vec![
            Line::from(Span::styled(
                name,
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(format!("Group: {}", card.match_id)),
            Line::from(format!("Active: {}", if card.is_active { "yes" } else { "no" })),
            Line::from(format!("Owner: {}", card.app_user_username)),
            Line::from(format!(
                "Image: {}",
                card.image_url.as_deref().unwrap_or("-")
            )),
            Line::from(""),
            Line::from(card.description.clone()),
        ];
        let detail = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Card detail"));
        frame.render_widget(detail, popup);
    }

    fn draw_setup(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let group_lines: Vec<Line> = if self.setup_groups.is_empty() {
            vec![Line::from("(no groups)")]
        } else {
            self.setup_groups
                .iter()
                .enumerate()
                .map(|(idx, group)| {
                    let count = self.store.active_cards_for_group(*group).len();
                    let label = format!("Group {group}  ({count} cards)");
                    if idx == self.setup_group_cursor {
                        Line::from(Span::styled(
                            format!("> {label}"),
                            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                        ))
                    } else {
                        Line::from(format!("  {label}"))
                    }
                })
                .collect()
        };
        frame.render_widget(
            Paragraph::new(group_lines)
                .block(Block::default().borders(Borders::ALL).title("Deck group")),
            chunks[0],
        );

        let mut size_lines: Vec<Line> = DeckSize::ALL
            .iter()
            .enumerate()
            .map(|(idx, size)| {
                let label = format!("{size}  ({} pairs)", size.pairs());
                if idx == self.setup_size_cursor {
                    Line::from(Span::styled(
                        format!("> {label}"),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(format!("  {label}"))
                }
            })
            .collect();
        if let Some(notice) = self.setup_notice.as_ref() {
            size_lines.push(Line::from(""));
            size_lines.push(Line::from(Span::styled(
                notice.clone(),
                Style::default().fg(Color::Yellow),
            )));
        }
        frame.render_widget(
            Paragraph::new(size_lines)
                .block(Block::default().borders(Borders::ALL).title("Deck size")),
            chunks[1],
        );
    }

    fn draw_play(&self, frame: &mut Frame, area: Rect) {
        let Some(play) = self.play.as_ref() else {
            return;
        };

        if let Some(preview) = play.preview.as_ref() {
            let mut lines = vec![
                Line::from(Span::styled(
                    format!(
                        "Memorize! Starting in {:.0}s (enter to skip)",
                        preview.remaining.as_secs_f64().ceil()
                    ),
                    Style::default().fg(Color::Yellow),
                )),
                Line::from(""),
            ];
            for card in &preview.cards {
                lines.push(Line::from(format!("  {}", card.name)));
            }
            frame.render_widget(
                Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title("Preview")),
                area,
            );
            return;
        }

        let session = &play.session;
        let title = format!(
            "Group {} | {} | {:.1}s | {}/{} matched",
            session.match_id(),
            session.size(),
            session.elapsed().as_secs_f64(),
            session.matched_count(),
            session.board().len()
        );

        let columns = play.columns();
        let mut lines: Vec<Line> = Vec::new();
        for (row_idx, row) in session.board().chunks(columns).enumerate() {
            let mut spans: Vec<Span> = Vec::new();
            for (col_idx, card) in row.iter().enumerate() {
                let index = row_idx * columns + col_idx;
                let label = match card.face {
                    Face::Hidden => "########".to_string(),
                    Face::Flipped | Face::Matched => pad_label(&card.card.name, 8),
                };
                let mut style = match card.face {
                    Face::Hidden => Style::default().fg(Color::DarkGray),
                    Face::Flipped => Style::default().fg(Color::Yellow),
                    Face::Matched => Style::default().fg(Color::Green),
                };
                if index == play.cursor && session.phase() != Phase::Won {
                    style = style.bg(Color::Cyan).fg(Color::Black);
                }
                spans.push(Span::styled(format!(" {label} "), style));
            }
            lines.push(Line::from(spans));
            lines.push(Line::from(""));
        }

        if session.phase() == Phase::Won {
            lines.push(Line::from(Span::styled(
                format!(
                    "You won in {:.1}s!",
                    play.result
                        .as_ref()
                        .map(GameResult::score_time)
                        .unwrap_or_default()
                ),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )));
            let verdict = match (play.qualifies, play.submitted) {
                (_, true) => "Score submitted. n: new game | s: high scores | esc: menu",
                (Some(true), false) => "That's a high score! n: new game | s: scores | esc: menu",
                (Some(false), false) => {
                    "Not fast enough for the board. n: new game | s: scores | esc: menu"
                }
                (None, false) => "Checking the leaderboard...",
            };
            lines.push(Line::from(verdict));
            if let (Some(true), Some(result), Some(entries)) =
                (play.qualifies, play.result.as_ref(), play.bucket.as_ref())
            {
                let rank = entries
                    .iter()
                    .filter(|entry| entry.score_time <= result.score_time())
                    .count()
                    + 1;
                lines.push(Line::from(format!("That would be rank #{rank}")));
            }
        }

        frame.render_widget(
            Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(title)),
            area,
        );
    }

    fn draw_name_prompt(&self, frame: &mut Frame, area: Rect, prompt: &NamePrompt) {
        let popup = centered_rect(50, 30, area);
        frame.render_widget(Clear, popup);

        let mut lines = vec![
            Line::from("Enter a player name for the leaderboard:"),
            Line::from(""),
            Line::from(Span::styled(
                format!("  {}_", prompt.input),
                Style::default().fg(Color::Cyan),
            )),
        ];
        if let Some(error) = prompt.error.as_ref() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "enter: submit | esc: skip",
            Style::default().fg(Color::DarkGray),
        )));

        let modal = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::ALL).title("High score!"));
        frame.render_widget(modal, popup);
    }

    fn draw_scores(&self, frame: &mut Frame, area: Rect) {
        let bucket = DeckSize::ALL[self.scores_bucket_idx];
        let tabs: Vec<Span> = DeckSize::ALL
            .iter()
            .enumerate()
            .map(|(idx, size)| {
                if idx == self.scores_bucket_idx {
                    Span::styled(
                        format!("[{size}] "),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(format!(" {size}  "))
                }
            })
            .collect();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);
        frame.render_widget(
            Paragraph::new(Line::from(tabs)).block(Block::default().borders(Borders::ALL)),
            chunks[0],
        );

        let rows: Vec<Row> = match self.scores.as_ref() {
            Some(entries) if entries.is_empty() => {
                vec![Row::new(vec![
                    Cell::from("-"),
                    Cell::from("No entries yet"),
                    Cell::from("-"),
                    Cell::from("-"),
                ])]
            }
            Some(entries) => entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    Row::new(vec![
                        Cell::from(format!("{}", idx + 1)),
                        Cell::from(entry.player_name.clone()),
                        Cell::from(format!("{:.1}s", entry.score_time)),
                        Cell::from(entry.date.format("%Y-%m-%d").to_string()),
                    ])
                })
                .collect(),
            None => vec![Row::new(vec![
                Cell::from("-"),
                Cell::from("Loading..."),
                Cell::from("-"),
                Cell::from("-"),
            ])],
        };

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Min(16),
                Constraint::Length(10),
                Constraint::Length(12),
            ],
        )
        .header(
            Row::new(vec!["Rank", "Player", "Time", "Date"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("High scores - {bucket}")),
        );
        frame.render_widget(table, chunks[1]);
    }
}

fn pad_label(name: &str, width: usize) -> String {
    let mut label: String = name.chars().take(width).collect();
    while label.chars().count() < width {
        label.push(' ');
    }
    label
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);
    horizontal[1]
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(INPUT_POLL) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_prompt_edits_like_a_line_editor() {
        let mut prompt = NamePrompt::new("Ada".to_string());
        assert_eq!(prompt.cursor, 3);

        prompt.insert('!');
        assert_eq!(prompt.input, "Ada!");
        prompt.backspace();
        assert_eq!(prompt.input, "Ada");

        prompt.move_cursor(-10);
        assert_eq!(prompt.cursor, 0);
        prompt.delete();
        assert_eq!(prompt.input, "da");
        // control characters are ignored
        prompt.insert('\t');
        assert_eq!(prompt.input, "da");
    }

    #[test]
    fn name_prompt_caps_length() {
        let mut prompt = NamePrompt::new(String::new());
        for _ in 0..(MAX_PLAYER_NAME_LEN + 10) {
            prompt.insert('x');
        }
        assert_eq!(prompt.input.len(), MAX_PLAYER_NAME_LEN);
    }

    #[test]
    fn labels_are_padded_and_truncated_to_cell_width() {
        assert_eq!(pad_label("Ada", 8), "Ada     ");
        assert_eq!(pad_label("A very long name", 8), "A very l");
    }
}
