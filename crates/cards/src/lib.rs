//! Per-platform status cards.
//!
//! A card is the visible projection of one platform's upload progress:
//! header (icon and name), progress percentage, and a footer with the
//! status text and, for failed platforms, a link to the error detail page.
//! The reconciler only talks to the [`CardRenderer`] trait; [`CardBoard`]
//! is the in-memory implementation every front end builds on.

mod board;
mod card;

pub use board::{CardBoard, CardRenderer};
pub use card::{Card, CardUpdate};
