//! Live game session: flip/match state machine, game clock, win detection.
//!
//! The session is deliberately sans-io. The frontend owns a single periodic
//! timer and feeds [`GameSession::tick`]; deferred work (the mismatch
//! flip-back) is a deadline inside the session rather than a detached
//! callback, so resetting the session cancels it and a superseded session
//! can never be mutated by a stale timer.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info};

use crate::{error::GameError, models::MemoryCard, scores};

use super::deck::{build_deck, DeckSize, Face, PlayCard};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Board dealt, clock not running.
    Ready,
    /// Accepting flips, clock running.
    Running,
    /// All pairs matched, clock frozen. Terminal.
    Won,
}

/// Result of a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameResult {
    /// Deck-group the session was played on.
    pub match_id: u32,
    /// Board size, which doubles as the leaderboard bucket.
    pub size: DeckSize,
    /// Final frozen clock value.
    pub elapsed: Duration,
}

impl GameResult {
    /// Elapsed seconds rounded to one decimal, the resolution the
    /// leaderboard stores.
    pub fn score_time(&self) -> f64 {
        scores::round_score(self.elapsed.as_secs_f64())
    }
}

/// Outcome of a single [`GameSession::flip`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum FlipOutcome {
    /// The flip was ignored; state is unchanged.
    Rejected,
    /// First card of a pair turned face up.
    Flipped,
    /// Second card completed a pair; both are now matched.
    Matched {
        /// Identifier of the matched underlying card.
        card_id: String,
    },
    /// Second card did not match; both stay face up until the flip-back
    /// deadline elapses.
    Mismatched,
    /// The match completed the board. Fired exactly once per session.
    Won(GameResult),
}

#[derive(Debug, Clone)]
struct FlipBack {
    first: usize,
    second: usize,
    remaining: Duration,
}

/// A single-player matching game over a dealt board.
#[derive(Debug, Clone)]
pub struct GameSession {
    match_id: u32,
    size: DeckSize,
    board: Vec<PlayCard>,
    flipped: Vec<usize>,
    matched: usize,
    elapsed: Duration,
    flip_back: Option<FlipBack>,
    flip_back_delay: Duration,
    phase: Phase,
}

impl GameSession {
    /// Deal a new session from the active cards of one deck-group.
    pub fn deal(
        match_id: u32,
        size: DeckSize,
        candidates: &[MemoryCard],
        rng: &mut impl Rng,
        flip_back_delay: Duration,
    ) -> Result<Self, GameError> {
        let board = build_deck(candidates, size, rng)?;
        Ok(Self::from_board(match_id, size, board, flip_back_delay))
    }

    /// Build a session over an already-constructed board.
    pub fn from_board(
        match_id: u32,
        size: DeckSize,
        board: Vec<PlayCard>,
        flip_back_delay: Duration,
    ) -> Self {
        debug_assert_eq!(board.len(), size.card_count());
        Self {
            match_id,
            size,
            board,
            flipped: Vec::with_capacity(2),
            matched: 0,
            elapsed: Duration::ZERO,
            flip_back: None,
            flip_back_delay,
            phase: Phase::Ready,
        }
    }

    /// Start the clock. Only valid from [`Phase::Ready`]; otherwise a no-op.
    pub fn start(&mut self) {
        if self.phase == Phase::Ready {
            self.phase = Phase::Running;
            info!(match_id = self.match_id, size = self.size.card_count(), "session started");
        }
    }

    /// Attempt to turn the card at `index` face up.
    ///
    /// Rejected while two cards are pending resolution, outside
    /// [`Phase::Running`], for out-of-range indices, and for cards that are
    /// already face up or matched (including the same physical card twice).
    pub fn flip(&mut self, index: usize) -> FlipOutcome {
        if self.phase != Phase::Running || self.flip_back.is_some() || self.flipped.len() >= 2 {
            return FlipOutcome::Rejected;
        }
        match self.board.get(index) {
            Some(play) if play.face == Face::Hidden => {}
            _ => return FlipOutcome::Rejected,
        }

        self.board[index].face = Face::Flipped;
        self.flipped.push(index);
        if self.flipped.len() < 2 {
            return FlipOutcome::Flipped;
        }

        let (first, second) = (self.flipped[0], self.flipped[1]);
        if self.board[first].card.id == self.board[second].card.id {
            // both halves transition together, atomically
            self.board[first].face = Face::Matched;
            self.board[second].face = Face::Matched;
            self.flipped.clear();
            self.matched += 2;
            let card_id = self.board[first].card.id.clone();

            if self.matched == self.board.len() {
                self.phase = Phase::Won;
                let result = GameResult {
                    match_id: self.match_id,
                    size: self.size,
                    elapsed: self.elapsed,
                };
                info!(
                    match_id = self.match_id,
                    score_time = result.score_time(),
                    "session won"
                );
                return FlipOutcome::Won(result);
            }
            FlipOutcome::Matched { card_id }
        } else {
            debug!(first, second, "mismatch, arming flip-back");
            self.flip_back = Some(FlipBack {
                first,
                second,
                remaining: self.flip_back_delay,
            });
            FlipOutcome::Mismatched
        }
    }

    /// Advance the game clock by one sampling interval.
    ///
    /// While running, elapsed time grows monotonically and a pending
    /// flip-back counts down, reverting both cards to hidden when it
    /// expires. Outside [`Phase::Running`] this is a no-op, so the clock is
    /// frozen the instant the board completes.
    pub fn tick(&mut self, delta: Duration) {
        if self.phase != Phase::Running {
            return;
        }
        self.elapsed += delta;

        if let Some(back) = self.flip_back.as_mut() {
            if back.remaining > delta {
                back.remaining -= delta;
            } else {
                let (first, second) = (back.first, back.second);
                self.board[first].face = Face::Hidden;
                self.board[second].face = Face::Hidden;
                self.flipped.clear();
                self.flip_back = None;
            }
        }
    }

    /// Return the session to [`Phase::Ready`]: clock zeroed, all cards
    /// hidden, any pending flip-back cancelled.
    pub fn reset(&mut self) {
        for play in &mut self.board {
            play.face = Face::Hidden;
        }
        self.flipped.clear();
        self.matched = 0;
        self.elapsed = Duration::ZERO;
        self.flip_back = None;
        self.phase = Phase::Ready;
    }

    /// The dealt board in play order.
    pub fn board(&self) -> &[PlayCard] {
        &self.board
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Deck-group this session draws from.
    pub fn match_id(&self) -> u32 {
        self.match_id
    }

    /// Board size of this session.
    pub fn size(&self) -> DeckSize {
        self.size
    }

    /// Accumulated clock value.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of board positions already matched.
    pub fn matched_count(&self) -> usize {
        self.matched
    }

    /// Whether a mismatched pair is waiting to flip back.
    pub fn flip_back_pending(&self) -> bool {
        self.flip_back.is_some()
    }

    /// Completed-session result, available once won.
    pub fn result(&self) -> Option<GameResult> {
        (self.phase == Phase::Won).then(|| GameResult {
            match_id: self.match_id,
            size: self.size,
            elapsed: self.elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::deck::PairHalf;
    use crate::models::CardCategory;

    const TICK: Duration = Duration::from_millis(100);
    const FLIP_BACK: Duration = Duration::from_millis(1000);

    fn card(id: usize) -> MemoryCard {
        MemoryCard {
            id: format!("card-{id}"),
            name: format!("Card {id}"),
            match_id: 1,
            category: CardCategory::CloudinaryImage,
            description: String::new(),
            is_active: true,
            app_user_github_id: "1".to_string(),
            app_user_username: "tester".to_string(),
            app_user_avatar_url: String::new(),
            app_user_github_url: String::new(),
            image_url: None,
        }
    }

    /// Board laid out pair-by-pair: indices 2k and 2k+1 hold the same card.
    fn ordered_session(pairs: usize) -> GameSession {
        let board: Vec<PlayCard> = (0..pairs)
            .flat_map(|i| {
                [
                    PlayCard {
                        card: card(i),
                        half: PairHalf::A,
                        face: Face::Hidden,
                    },
                    PlayCard {
                        card: card(i),
                        half: PairHalf::B,
                        face: Face::Hidden,
                    },
                ]
            })
            .collect();
        let size = DeckSize::try_from(board.len()).expect("test board must use a bucket size");
        GameSession::from_board(1, size, board, FLIP_BACK)
    }

    fn started_session(pairs: usize) -> GameSession {
        let mut session = ordered_session(pairs);
        session.start();
        session
    }

    #[test]
    fn flips_are_rejected_before_start() {
        let mut session = ordered_session(5);
        assert_eq!(session.flip(0), FlipOutcome::Rejected);
        session.start();
        assert_eq!(session.flip(0), FlipOutcome::Flipped);
    }

    #[test]
    fn matching_pair_resolves_synchronously() {
        let mut session = started_session(5);
        assert_eq!(session.flip(0), FlipOutcome::Flipped);
        assert_eq!(
            session.flip(1),
            FlipOutcome::Matched {
                card_id: "card-0".to_string()
            }
        );
        assert_eq!(session.board()[0].face, Face::Matched);
        assert_eq!(session.board()[1].face, Face::Matched);
        assert_eq!(session.matched_count(), 2);
        // flipped set cleared: a third card flips normally
        assert_eq!(session.flip(2), FlipOutcome::Flipped);
    }

    #[test]
    fn mismatch_stays_visible_until_the_deadline() {
        let mut session = started_session(5);
        session.flip(0);
        assert_eq!(session.flip(2), FlipOutcome::Mismatched);
        assert!(session.flip_back_pending());
        assert_eq!(session.board()[0].face, Face::Flipped);
        assert_eq!(session.board()[2].face, Face::Flipped);

        // halfway through the delay both cards are still face up
        for _ in 0..5 {
            session.tick(TICK);
        }
        assert_eq!(session.board()[0].face, Face::Flipped);
        assert_eq!(session.board()[2].face, Face::Flipped);

        // the rest of the delay elapses and both revert together
        for _ in 0..5 {
            session.tick(TICK);
        }
        assert!(!session.flip_back_pending());
        assert_eq!(session.board()[0].face, Face::Hidden);
        assert_eq!(session.board()[2].face, Face::Hidden);
        // untouched cards were never affected
        assert_eq!(session.board()[1].face, Face::Hidden);
        assert_eq!(session.board()[3].face, Face::Hidden);
    }

    #[test]
    fn third_flip_is_rejected_while_two_are_unresolved() {
        let mut session = started_session(5);
        session.flip(0);
        session.flip(2);
        let faces: Vec<Face> = session.board().iter().map(|play| play.face).collect();

        assert_eq!(session.flip(4), FlipOutcome::Rejected);
        let after: Vec<Face> = session.board().iter().map(|play| play.face).collect();
        assert_eq!(faces, after, "rejected flip must not change any state");
    }

    #[test]
    fn same_card_twice_and_matched_cards_are_no_ops() {
        let mut session = started_session(5);
        session.flip(0);
        assert_eq!(session.flip(0), FlipOutcome::Rejected);

        session.flip(1);
        assert_eq!(session.board()[0].face, Face::Matched);
        assert_eq!(session.flip(0), FlipOutcome::Rejected);
        assert_eq!(session.flip(99), FlipOutcome::Rejected);
    }

    #[test]
    fn completing_the_board_fires_exactly_one_win() {
        let mut session = started_session(5);
        session.tick(TICK);
        session.tick(TICK);

        let mut wins = 0;
        for pair in 0..5 {
            let first = session.flip(pair * 2);
            let second = session.flip(pair * 2 + 1);
            assert_ne!(first, FlipOutcome::Rejected);
            match second {
                FlipOutcome::Won(ref result) => {
                    wins += 1;
                    assert_eq!(result.match_id, 1);
                    assert_eq!(result.size, DeckSize::Small);
                    assert_eq!(result.elapsed, Duration::from_millis(200));
                }
                FlipOutcome::Matched { .. } => {}
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(session.phase(), Phase::Won);

        // the clock is frozen and no further flips are accepted
        session.tick(TICK);
        assert_eq!(session.elapsed(), Duration::from_millis(200));
        assert_eq!(session.flip(0), FlipOutcome::Rejected);
        assert!(session.result().is_some());
    }

    #[test]
    fn clock_is_monotonic_and_only_runs_while_running() {
        let mut session = ordered_session(5);
        session.tick(TICK);
        assert_eq!(session.elapsed(), Duration::ZERO);

        session.start();
        let mut last = Duration::ZERO;
        for _ in 0..7 {
            session.tick(TICK);
            assert!(session.elapsed() > last);
            last = session.elapsed();
        }
        assert_eq!(last, Duration::from_millis(700));

        session.reset();
        assert_eq!(session.elapsed(), Duration::ZERO);
        session.tick(TICK);
        assert_eq!(session.elapsed(), Duration::ZERO, "clock must not advance after reset");
    }

    #[test]
    fn reset_cancels_a_pending_flip_back() {
        let mut session = started_session(5);
        session.flip(0);
        session.flip(2);
        assert!(session.flip_back_pending());

        session.reset();
        assert!(!session.flip_back_pending());
        assert_eq!(session.phase(), Phase::Ready);
        assert!(session.board().iter().all(|play| play.face == Face::Hidden));

        // a stale deadline must not fire into the reset session
        session.start();
        for _ in 0..20 {
            session.tick(TICK);
        }
        assert!(session.board().iter().all(|play| play.face == Face::Hidden));
    }

    #[test]
    fn score_time_rounds_to_one_decimal() {
        let result = GameResult {
            match_id: 1,
            size: DeckSize::Small,
            elapsed: Duration::from_millis(23_449),
        };
        assert!((result.score_time() - 23.4).abs() < f64::EPSILON);

        let result = GameResult {
            match_id: 1,
            size: DeckSize::Small,
            elapsed: Duration::from_millis(23_450),
        };
        assert!((result.score_time() - 23.5).abs() < f64::EPSILON);
    }

    #[test]
    fn deal_rejects_an_undersupplied_group() {
        let cards: Vec<MemoryCard> = (0..3).map(card).collect();
        let mut rng = rand::rngs::mock::StepRng::new(0, 1);
        let err = GameSession::deal(3, DeckSize::Small, &cards, &mut rng, FLIP_BACK).unwrap_err();
        assert!(matches!(err, GameError::InsufficientCards { missing: 2, .. }));
    }
}
