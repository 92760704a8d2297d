//! Line-oriented card projection for the terminal.

use std::io::Write;

use crosspost_cards::{Card, CardBoard, CardRenderer, CardUpdate};
use crosspost_protocol::Platform;

/// Renders cards as one line each, reprinting a card whenever it changes.
pub struct TerminalCards<W> {
    board: CardBoard,
    out: W,
}

impl<W: Write + Send> TerminalCards<W> {
    pub fn new(out: W) -> Self {
        Self {
            board: CardBoard::new(),
            out,
        }
    }

    fn print(&mut self, line: String) {
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::warn!("failed to write card: {e}");
        }
    }
}

/// `[icon] Display Name  status  [message]  [link]`
pub fn card_line(card: &Card) -> String {
    let mut line = format!(
        "[{}] {:<22} {}",
        card.platform.icon_ref,
        card.platform.display_name,
        card.status_text()
    );
    if let Some(link) = card.visible_error_link() {
        if let Some(message) = &card.error_message {
            line.push_str(&format!("  {message}"));
        }
        line.push_str(&format!("  details: {link}"));
    }
    line
}

impl<W: Write + Send> CardRenderer for TerminalCards<W> {
    fn render(&mut self, platforms: &[Platform]) {
        self.board.render(platforms);
        let lines: Vec<String> = self.board.cards().iter().map(card_line).collect();
        for line in lines {
            self.print(line);
        }
    }

    fn update(&mut self, update: &CardUpdate) {
        if self.board.apply(update) != Some(true) {
            return;
        }
        if let Some(line) = self.board.card(&update.platform_id).map(card_line) {
            self.print(line);
        }
    }
}
