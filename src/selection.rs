//! Picking a subset of search results.
//!
//! Computing a selection from user input is pure ([`parse_selection`], [`select`]);
//! obtaining that input goes through [`IndexSource`], which a terminal prompt, command
//! line flags or a GUI can each implement without blocking anyone else's event loop.

use async_trait::async_trait;
use log::warn;
use std::collections::BTreeSet;

use crate::clients::{entities::Track, errors::Result};

/// Outcome of parsing a line of user input against a list of `len` items.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Accepted zero-based indices, ascending and without duplicates
    pub indices: Vec<usize>,
    /// Tokens that were not a number in `1..=len`
    pub rejected: Vec<String>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Parse 1-based indices separated by commas and/or whitespace. Out-of-range and
/// non-numeric tokens are dropped with a warning.
pub fn parse_selection(input: &str, len: usize) -> Selection {
    let mut indices = BTreeSet::new();
    let mut rejected = Vec::new();

    for token in input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        match token.parse::<usize>() {
            Ok(n) if (1..=len).contains(&n) => {
                indices.insert(n - 1);
            }
            _ => rejected.push(token.to_string()),
        }
    }

    if !rejected.is_empty() {
        warn!("Ignoring invalid selection {rejected:?}, valid range is 1-{len}");
    }

    Selection {
        indices: indices.into_iter().collect(),
        rejected,
    }
}

/// Keep the tracks picked by `input`, in their original order.
pub fn select(tracks: Vec<Track>, input: &str) -> Vec<Track> {
    let selection = parse_selection(input, tracks.len());
    pick(tracks, &selection)
}

fn pick(tracks: Vec<Track>, selection: &Selection) -> Vec<Track> {
    tracks
        .into_iter()
        .enumerate()
        .filter(|(i, _)| selection.indices.binary_search(i).is_ok())
        .map(|(_, t)| t)
        .collect()
}

/// Numbered lines for showing search results, e.g. `1. 晴天 - 周杰伦`.
pub fn listing(tracks: &[Track]) -> Vec<String> {
    tracks
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {t}", i + 1))
        .collect()
}

/// Where selection input comes from.
#[async_trait]
pub trait IndexSource: Send {
    /// Next line of index input for `tracks`, or `None` when no more input will come.
    async fn next_input(&mut self, tracks: &[Track]) -> Result<Option<String>>;

    /// Interactive sources are asked again when their input selects nothing.
    fn is_interactive(&self) -> bool {
        false
    }
}

/// A fixed selection, e.g. from a command line flag. Yields its input once.
pub struct FixedIndices(Option<String>);

impl FixedIndices {
    pub fn new(input: impl Into<String>) -> Self {
        FixedIndices(Some(input.into()))
    }

    pub fn all(len: usize) -> Self {
        let input = (1..=len)
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",");
        FixedIndices(Some(input))
    }
}

#[async_trait]
impl IndexSource for FixedIndices {
    async fn next_input(&mut self, _tracks: &[Track]) -> Result<Option<String>> {
        Ok(self.0.take())
    }
}

/// Ask `source` for indices until something valid is picked. Non-interactive sources
/// get a single try; an exhausted source ends with an empty selection.
pub async fn choose<S: IndexSource + ?Sized>(
    tracks: Vec<Track>,
    source: &mut S,
) -> Result<Vec<Track>> {
    if tracks.is_empty() {
        return Ok(Vec::new());
    }
    loop {
        let Some(input) = source.next_input(&tracks).await? else {
            return Ok(Vec::new());
        };
        let selection = parse_selection(&input, tracks.len());
        if !selection.is_empty() {
            return Ok(pick(tracks, &selection));
        }
        if !source.is_interactive() {
            return Ok(Vec::new());
        }
        warn!("Nothing selected, please pick at least one track");
    }
}
