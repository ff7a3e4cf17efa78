//! `ghostbox` - a checkbox that does not want to be clicked
//!
//! A small widget driven by a pure phase state machine. Clicking it too
//! often locks it; persisting summons a ghost; the ghost vanishes and the
//! widget ends either with a restart control or greyed out for good.
//!
//! The [`phase`] module holds the transition table, timers and view flags;
//! [`session`] wires them to a [`view::View`] and an input channel.

pub mod cli;
pub mod config;
pub mod error;
pub mod observability;
pub mod phase;
pub mod session;
pub mod view;
