use std::collections::HashMap;

use crosspost_protocol::Platform;

use crate::card::{Card, CardUpdate};

/// Sink for card state, implemented by every front end.
///
/// `update` must only touch the card of `update.platform_id` and must be
/// idempotent: applying the same update twice leaves the same state.
pub trait CardRenderer: Send {
    /// Creates one card per platform, replacing any existing cards.
    fn render(&mut self, platforms: &[Platform]);

    /// Mutates the card of a single platform. Unknown ids are ignored.
    fn update(&mut self, update: &CardUpdate);
}

/// In-memory card projection.
///
/// Cards keep registry order. `revision` increments only when an update
/// actually changes a card, so front ends can skip redundant redraws.
#[derive(Debug, Clone, Default)]
pub struct CardBoard {
    cards: Vec<Card>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl CardBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a board already rendered for `platforms`.
    pub fn with_platforms(platforms: &[Platform]) -> Self {
        let mut board = Self::new();
        board.render(platforms);
        board
    }

    /// Applies an update. Returns `Some(changed)` for known platforms.
    pub fn apply(&mut self, update: &CardUpdate) -> Option<bool> {
        let &idx = self.index.get(&update.platform_id)?;
        let changed = self.cards[idx].apply(update);
        if changed {
            self.revision += 1;
        }
        Some(changed)
    }

    pub fn card(&self, platform_id: &str) -> Option<&Card> {
        self.index.get(platform_id).map(|&idx| &self.cards[idx])
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

impl CardRenderer for CardBoard {
    fn render(&mut self, platforms: &[Platform]) {
        self.cards = platforms.iter().cloned().map(Card::new).collect();
        self.index = self
            .cards
            .iter()
            .enumerate()
            .map(|(idx, card)| (card.platform.id.clone(), idx))
            .collect();
        self.revision += 1;
    }

    fn update(&mut self, update: &CardUpdate) {
        self.apply(update);
    }
}
