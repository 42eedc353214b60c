//! Result-payload schema validation
//!
//! A trainer result file is a JSON mapping with exactly one key,
//! `games_played`, holding an ordered sequence of episode entries.
//! Two schema variants exist: every entry is either exactly
//! `{score, gen_id}` or exactly `{score, gen_id, game_log}`. The
//! variant is fixed by inspecting the first entry, never a version
//! flag, and mixed-variant payloads are rejected.
//!
//! Validation is all-or-nothing and runs once at load time. No
//! downstream component re-inspects raw payload fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// The single recognized top-level payload key.
pub const GAMES_PLAYED_KEY: &str = "games_played";

/// The fixed four-element move alphabet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Move {
    /// Shift up
    Up,
    /// Shift down
    Down,
    /// Shift left
    Left,
    /// Shift right
    Right,
}

impl Move {
    /// Parse a move symbol, `None` for anything outside the alphabet.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "Up" => Some(Self::Up),
            "Down" => Some(Self::Down),
            "Left" => Some(Self::Left),
            "Right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Replay log of one episode: the seed the game was dealt and the
/// ordered moves the agent played. Retained for replay/debugging only;
/// aggregation never consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    /// RNG seed the episode was played with
    pub seed: u64,
    /// Ordered moves drawn from the [`Move`] alphabet
    pub moves: Vec<Move>,
}

/// One played episode's validated outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeRecord {
    /// Final score of the episode
    pub score: f64,
    /// Generation index; non-negative, non-decreasing across the stream
    pub gen_id: u64,
    /// Replay log, present only in the logged schema variant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_log: Option<GameLog>,
}

/// Validate a raw deserialized payload into typed episode records.
///
/// # Errors
///
/// Returns [`Error::SchemaViolation`] naming the offending field on
/// any mismatch: wrong top-level key set, wrong episode field set,
/// mixed schema variants, non-numeric score, negative or decreasing
/// `gen_id`, malformed `game_log`, or a move symbol outside the
/// alphabet.
pub fn validate(raw: &Value) -> Result<Vec<EpisodeRecord>> {
    let top = raw
        .as_object()
        .ok_or_else(|| Error::schema("payload", "root is not a mapping"))?;

    for key in top.keys() {
        if key != GAMES_PLAYED_KEY {
            return Err(Error::schema(key, "unexpected top-level key"));
        }
    }
    let games = top
        .get(GAMES_PLAYED_KEY)
        .ok_or_else(|| Error::schema(GAMES_PLAYED_KEY, "missing"))?
        .as_array()
        .ok_or_else(|| Error::schema(GAMES_PLAYED_KEY, "expected an ordered sequence"))?;

    let mut episodes = Vec::with_capacity(games.len());
    // Schema variant, fixed by the first entry.
    let mut with_log: Option<bool> = None;
    let mut prev_gen: Option<u64> = None;

    for (idx, game) in games.iter().enumerate() {
        let record = game.as_object().ok_or_else(|| {
            Error::schema(GAMES_PLAYED_KEY, format!("entry {idx} is not a mapping"))
        })?;

        let has_log = record.contains_key("game_log");
        match with_log {
            None => with_log = Some(has_log),
            Some(expected) if expected != has_log => {
                return Err(Error::schema(
                    "game_log",
                    format!("entry {idx} disagrees with the schema variant of the first entry"),
                ));
            }
            Some(_) => {}
        }
        for key in record.keys() {
            if key != "score" && key != "gen_id" && key != "game_log" {
                return Err(Error::schema(
                    key.as_str(),
                    format!("unexpected episode field in entry {idx}"),
                ));
            }
        }

        let score = record
            .get("score")
            .ok_or_else(|| Error::schema("score", format!("missing in entry {idx}")))?
            .as_f64()
            .ok_or_else(|| Error::schema("score", format!("entry {idx} is not numeric")))?;

        let gen_id = record
            .get("gen_id")
            .ok_or_else(|| Error::schema("gen_id", format!("missing in entry {idx}")))?
            .as_u64()
            .ok_or_else(|| {
                Error::schema(
                    "gen_id",
                    format!("entry {idx} is not a non-negative integer"),
                )
            })?;
        if let Some(prev) = prev_gen {
            if gen_id < prev {
                return Err(Error::schema(
                    "gen_id",
                    format!("decreased from {prev} to {gen_id} at entry {idx}"),
                ));
            }
        }
        prev_gen = Some(gen_id);

        let game_log = match record.get("game_log") {
            Some(log) => Some(parse_game_log(log, idx)?),
            None => None,
        };

        episodes.push(EpisodeRecord {
            score,
            gen_id,
            game_log,
        });
    }

    Ok(episodes)
}

fn parse_game_log(raw: &Value, idx: usize) -> Result<GameLog> {
    let log = raw
        .as_object()
        .ok_or_else(|| Error::schema("game_log", format!("entry {idx} is not a mapping")))?;

    for key in log.keys() {
        if key != "seed" && key != "moves" {
            return Err(Error::schema(
                key.as_str(),
                format!("unexpected game_log field in entry {idx}"),
            ));
        }
    }

    let seed = log
        .get("seed")
        .ok_or_else(|| Error::schema("seed", format!("missing in game_log of entry {idx}")))?
        .as_u64()
        .ok_or_else(|| {
            Error::schema(
                "seed",
                format!("game_log of entry {idx} is not a non-negative integer"),
            )
        })?;

    let raw_moves = log
        .get("moves")
        .ok_or_else(|| Error::schema("moves", format!("missing in game_log of entry {idx}")))?
        .as_array()
        .ok_or_else(|| Error::schema("moves", format!("entry {idx} is not a sequence")))?;

    let mut moves = Vec::with_capacity(raw_moves.len());
    for symbol in raw_moves {
        let symbol = symbol
            .as_str()
            .ok_or_else(|| Error::schema("moves", format!("non-string move in entry {idx}")))?;
        let mv = Move::from_symbol(symbol).ok_or_else(|| {
            Error::schema(
                "moves",
                format!("illegal move symbol `{symbol}` in entry {idx}"),
            )
        })?;
        moves.push(mv);
    }

    Ok(GameLog { seed, moves })
}
