//! Versioned, checksummed records for the active run and the lifetime stats.
//!
//! A record is the JSON object of the persisted value plus a `version` and a `checksum` field.
//! The checksum covers every other field, the version included, so bumping the version by hand
//! is caught like any other edit.
//!
//! Loading never fails outward. A bad run record is dropped and the session starts fresh; a bad
//! stats record gives up only the fields that cannot be read.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::*;
pub use migrations::*;
pub use storage::*;

mod migrations;
mod storage;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema validation failed: {0}")]
    Schema(String),
    #[error("checksum mismatch")]
    ChecksumMismatch,
    #[error("record has schema version {0}, newer than this build understands")]
    UnsupportedVersion(u64),
    #[error("board is {board:?} but the floor config expects {config:?}")]
    DimensionMismatch { board: Coord2, config: Coord2 },
    #[error("a run in phase {0:?} is not resumed")]
    NotResumable(Phase),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type PersistResult<T> = core::result::Result<T, PersistError>;

impl StorageKey for GameState {
    const KEY: &'static str = "descent-run";
    const VERSION: u64 = 10;
}

impl StorageKey for LifetimeStats {
    const KEY: &'static str = "descent-stats";
    const VERSION: u64 = 3;
}

const CHECKSUM_LEN: usize = 8;

/// 32-bit `h * 31 + c` string hash over the characters of `text`.
pub(crate) fn string_hash(text: &str) -> u32 {
    text.chars()
        .fold(0i32, |hash, c| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(c as i32)
        })
        .unsigned_abs()
}

fn base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.iter().rev().map(|&d| d as char).collect()
}

/// Checksum of a record's fields. Keys are hashed in sorted order, so the result does not
/// depend on how the record was built.
pub fn checksum(fields: &Map<String, Value>) -> String {
    let text = serde_json::to_string(fields).unwrap_or_default();
    let mut sum = base36(string_hash(&text));
    sum.truncate(CHECKSUM_LEN);
    sum
}

/// Serializes `value` into a versioned, checksummed record.
pub fn encode<T: Serialize + StorageKey>(value: &T) -> PersistResult<String> {
    let Value::Object(mut fields) = serde_json::to_value(value)? else {
        return Err(PersistError::Schema("record is not a JSON object".into()));
    };
    fields.insert("version".into(), Value::from(T::VERSION));
    let sum = checksum(&fields);
    fields.insert("checksum".into(), Value::String(sum));
    Ok(serde_json::to_string(&fields)?)
}

/// A record split into its stored version and payload.
#[derive(Debug)]
struct Envelope {
    version: u64,
    payload: Value,
    checksum_ok: bool,
}

impl Envelope {
    fn open(value: Value, current: u64) -> PersistResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(PersistError::Schema("record is not a JSON object".into()));
        };
        // Records written before versioning have no version field.
        let version = match fields.get("version") {
            None => 0,
            Some(version) => version
                .as_u64()
                .ok_or_else(|| PersistError::Schema("version is not an integer".into()))?,
        };
        if version > current {
            return Err(PersistError::UnsupportedVersion(version));
        }

        let checksum_ok = match fields.remove("checksum") {
            Some(Value::String(stored)) => stored == checksum(&fields),
            _ => false,
        };
        fields.remove("version");
        Ok(Self {
            version,
            payload: Value::Object(fields),
            checksum_ok,
        })
    }
}

fn schema_error(err: serde_json::Error) -> PersistError {
    PersistError::Schema(err.to_string())
}

/// Drops relic ids this build does not know, so records from newer builds still load.
fn filter_unknown_relics(mut payload: Value) -> Value {
    let known = |id: &Value| id.as_str().and_then(RelicId::parse).is_some();

    if let Some(relics) = payload
        .pointer_mut("/run/relics")
        .and_then(Value::as_array_mut)
    {
        relics.retain(|relic| {
            let keep = relic.get("id").is_some_and(known);
            if !keep {
                log::warn!("Filtering unknown relic {}", relic["id"]);
            }
            keep
        });
    }
    if let Some(options) = payload
        .pointer_mut("/draftOptions")
        .and_then(Value::as_array_mut)
    {
        options.retain(|id| {
            let keep = known(id);
            if !keep {
                log::warn!("Filtering unknown draft option {}", id);
            }
            keep
        });
    }
    if let Some(armed) = payload.pointer_mut("/run/armed") {
        if !armed.is_null() && !known(armed) {
            *armed = Value::Null;
        }
    }
    payload
}

fn validate_run(state: &GameState) -> PersistResult<()> {
    if !state.phase.is_resumable() {
        return Err(PersistError::NotResumable(state.phase));
    }
    let board = state.board.size();
    let config = state.floor_config.size();
    if board != config {
        return Err(PersistError::DimensionMismatch { board, config });
    }
    if !(1..=MAX_FLOOR).contains(&state.run.current_floor) {
        return Err(PersistError::Schema(format!(
            "floor {} is out of range",
            state.run.current_floor
        )));
    }
    if state.floor_config.mines > state.floor_config.total_cells() {
        return Err(PersistError::Schema("more mines than cells".into()));
    }
    Ok(())
}

/// Parses, verifies, migrates and validates an active-run record.
pub fn decode_run(text: &str) -> PersistResult<GameState> {
    let envelope = Envelope::open(serde_json::from_str(text)?, GameState::VERSION)?;
    if !envelope.checksum_ok {
        return Err(PersistError::ChecksumMismatch);
    }

    let payload = apply_migrations(
        envelope.payload,
        envelope.version,
        GameState::VERSION,
        &RUN_MIGRATIONS,
    );
    let mut state: GameState =
        serde_json::from_value(filter_unknown_relics(payload)).map_err(schema_error)?;
    validate_run(&state)?;
    state.restore_derived();
    Ok(state)
}

/// Writes the active run if its phase can be resumed; other phases are left alone.
pub fn save_run<S: Storage>(storage: &mut S, state: &GameState) -> PersistResult<()> {
    if !state.phase.is_resumable() {
        return Ok(());
    }
    let record = encode(state)?;
    storage.set(GameState::KEY, &record)?;
    Ok(())
}

/// Restores the saved run, discarding a record that fails any check.
pub fn load_run<S: Storage>(storage: &mut S) -> Option<GameState> {
    let record = match storage.get(GameState::KEY) {
        Ok(record) => record?,
        Err(err) => {
            log::warn!("Cannot read saved run: {}", err);
            return None;
        }
    };

    match decode_run(&record) {
        Ok(state) => {
            log::debug!(
                "Resumed run on floor {} in {:?}",
                state.run.current_floor,
                state.phase
            );
            Some(state)
        }
        Err(PersistError::NotResumable(phase)) => {
            log::debug!("Saved run in {:?} is not resumed", phase);
            None
        }
        Err(err) => {
            log::warn!("Discarding saved run: {}", err);
            clear_run(storage);
            None
        }
    }
}

pub fn clear_run<S: Storage>(storage: &mut S) {
    if let Err(err) = storage.remove(GameState::KEY) {
        log::warn!("Cannot clear saved run: {}", err);
    }
}

fn check_stats(stats: LifetimeStats) -> PersistResult<LifetimeStats> {
    if stats.best_floor > MAX_FLOOR {
        return Err(PersistError::Schema(format!(
            "best floor {} is out of range",
            stats.best_floor
        )));
    }
    Ok(stats)
}

/// Recovers the counters that are individually well-formed from a record that failed validation.
fn salvage_stats(raw: &Value) -> LifetimeStats {
    let field = |key: &str, max: f64| {
        raw.get(key)
            .and_then(Value::as_f64)
            .filter(|n| (0.0..=max).contains(n))
            .map(f64::floor)
    };

    LifetimeStats {
        total_runs: field("totalRuns", f64::from(u32::MAX)).map_or(0, |n| n as u32),
        best_floor: field("bestFloor", f64::from(MAX_FLOOR)).map_or(0, |n| n as u8),
        best_score: field("bestScore", u64::MAX as f64).map_or(0, |n| n as u64),
        floors_cleared: field("floorsCleared", f64::from(u32::MAX)).map_or(0, |n| n as u32),
        ..LifetimeStats::default()
    }
}

/// Parses lifetime stats. Never fails: unreadable fields fall back to zero.
pub fn decode_stats(text: &str) -> LifetimeStats {
    let raw: Value = match serde_json::from_str(text) {
        Ok(raw) => raw,
        Err(err) => {
            log::warn!("Stats record is not JSON: {}", err);
            return LifetimeStats::default();
        }
    };

    let decoded = Envelope::open(raw.clone(), LifetimeStats::VERSION).and_then(|envelope| {
        if !envelope.checksum_ok {
            log::warn!("Stats checksum mismatch, using data anyway");
        }
        let payload = apply_migrations(
            envelope.payload,
            envelope.version,
            LifetimeStats::VERSION,
            &STATS_MIGRATIONS,
        );
        check_stats(serde_json::from_value(payload).map_err(schema_error)?)
    });

    decoded.unwrap_or_else(|err| {
        log::warn!("Stats validation failed, salvaging counters: {}", err);
        salvage_stats(&raw)
    })
}

pub fn save_stats<S: Storage>(storage: &mut S, stats: &LifetimeStats) -> PersistResult<()> {
    let record = encode(stats)?;
    storage.set(LifetimeStats::KEY, &record)?;
    Ok(())
}

pub fn load_stats<S: Storage>(storage: &S) -> LifetimeStats {
    match storage.get(LifetimeStats::KEY) {
        Ok(Some(record)) => decode_stats(&record),
        Ok(None) => LifetimeStats::default(),
        Err(err) => {
            log::warn!("Cannot read stats: {}", err);
            LifetimeStats::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn playing() -> GameState {
        GameState::default()
            .reduce(&Action::StartRun {
                ascension: AscensionLevel::NONE,
                seed: RunSeed::new(99),
            })
            .reduce(&Action::Reveal { row: 2, col: 2 })
    }

    fn tamper(record: &str, f: impl FnOnce(&mut Value)) -> String {
        let mut value: Value = serde_json::from_str(record).unwrap();
        f(&mut value);
        value.to_string()
    }

    /// Stamps a hand-built record with the checksum of its fields.
    fn seal(mut value: Value) -> String {
        let fields = value.as_object_mut().unwrap();
        fields.remove("checksum");
        let sum = checksum(fields);
        fields.insert("checksum".into(), json!(sum));
        value.to_string()
    }

    #[test]
    fn checksum_matches_reference_hash() {
        assert_eq!(string_hash(""), 0);
        assert_eq!(string_hash("a"), 97);
        assert_eq!(string_hash("ab"), 97 * 31 + 98);
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
    }

    #[test]
    fn run_record_round_trips() {
        let state = playing();
        let record = encode(&state).unwrap();

        let restored = decode_run(&record).unwrap();

        assert_eq!(restored, state);
    }

    #[test]
    fn edited_record_is_rejected() {
        let record = encode(&playing()).unwrap();
        let edited = tamper(&record, |v| v["run"]["score"] = json!(1_000_000));
        assert!(matches!(
            decode_run(&edited),
            Err(PersistError::ChecksumMismatch)
        ));
    }

    #[test]
    fn version_is_covered_by_checksum() {
        let record = encode(&playing()).unwrap();
        let edited = tamper(&record, |v| v["version"] = json!(9));
        assert!(matches!(
            decode_run(&edited),
            Err(PersistError::ChecksumMismatch)
        ));
    }

    #[test]
    fn future_versions_are_rejected() {
        let record = encode(&playing()).unwrap();
        let edited = tamper(&record, |v| v["version"] = json!(11));
        assert!(matches!(
            decode_run(&edited),
            Err(PersistError::UnsupportedVersion(11))
        ));
    }

    #[test]
    fn finished_runs_are_not_saved() {
        let mut storage = MemoryStorage::new();
        save_run(&mut storage, &GameState::default()).unwrap();
        assert!(!storage.contains(GameState::KEY));
    }

    #[test]
    fn corrupt_run_is_cleared_on_load() {
        let mut storage = MemoryStorage::new();
        storage.set(GameState::KEY, "{\"version\": 10").unwrap();

        assert_eq!(load_run(&mut storage), None);
        assert!(!storage.contains(GameState::KEY));
    }

    fn legacy_run() -> Value {
        let cell = |row: u8, col: u8, mine: bool, state: &str, adjacent: u8| {
            json!({"row": row, "col": col, "isMine": mine, "state": state, "adjacentMines": adjacent})
        };
        json!({
            "phase": "playing",
            "board": [
                [cell(0, 0, true, "hidden", 0), cell(0, 1, false, "revealed", 1)],
                [cell(1, 0, false, "hidden", 1), cell(1, 1, false, "revealed", 1)],
            ],
            "floorConfig": {"floor": 1, "rows": 2, "cols": 2, "mines": 1},
            "minesRemaining": 1,
            "time": 12,
            "isFirstClick": false,
            "isMobile": true,
            "run": {
                "currentFloor": 1,
                "score": 20,
                "activePowerUps": [{"id": "iron-will", "name": "Iron Will"}],
                "ironWillAvailable": true,
                "xRayUsedThisFloor": false,
                "luckyStartUsedThisFloor": false,
                "seed": "ABCDEF"
            },
            "draftOptions": [],
            "dangerCells": [],
            "explodedCell": null,
            "closeCallCell": null
        })
    }

    #[test]
    fn legacy_run_is_migrated() {
        let state = decode_run(&seal(legacy_run())).unwrap();

        assert_eq!(state.phase, Phase::Playing);
        assert_eq!(state.layout, Layout::Compact);
        assert_eq!(state.clock.elapsed, 12);
        assert!(!state.first_click_pending);
        assert_eq!(state.cells_revealed_this_floor, 2);
        assert_eq!(state.run.score, 20);
        assert!(state.run.is_available(RelicId::IronWill));
        assert_eq!(RunSeed::from_share_code("ABCDEF"), Some(state.run.seed));
        assert_eq!(state.mines_remaining(), 1);
    }

    #[test]
    fn run_without_checksum_is_rejected() {
        let mut forged = legacy_run();
        forged["run"]["currentFloor"] = json!(10);
        forged["run"]["score"] = json!(999_999);
        forged["floorConfig"]["floor"] = json!(10);
        assert!(matches!(
            decode_run(&forged.to_string()),
            Err(PersistError::ChecksumMismatch)
        ));

        let mut storage = MemoryStorage::new();
        storage.set(GameState::KEY, &forged.to_string()).unwrap();
        assert_eq!(load_run(&mut storage), None);
        assert!(!storage.contains(GameState::KEY));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let mut state = playing();
        state.floor_config.rows += 1;
        let record = encode(&state).unwrap();
        assert!(matches!(
            decode_run(&record),
            Err(PersistError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn unknown_relics_are_filtered() {
        let mut state = playing();
        state.run.add_relic(RelicId::Peek);
        let record = encode(&state).unwrap();
        let mut value: Value = serde_json::from_str(&record).unwrap();
        value["run"]["relics"]
            .as_array_mut()
            .unwrap()
            .push(json!({"id": "time-warp", "tracker": {"kind": "passive"}}));
        let record = seal(value);

        let restored = decode_run(&record).unwrap();

        assert_eq!(restored.run.relic_ids(), vec![RelicId::Peek]);
    }

    #[test]
    fn stats_round_trip() {
        let mut storage = MemoryStorage::new();
        let stats = LifetimeStats {
            total_runs: 4,
            best_floor: 7,
            best_score: 12_345,
            floors_cleared: 15,
            highest_ascension_unlocked: AscensionLevel::saturating(2),
            highest_ascension_cleared: AscensionLevel::saturating(1),
        };

        save_stats(&mut storage, &stats).unwrap();

        assert_eq!(load_stats(&storage), stats);
    }

    #[test]
    fn stats_with_bad_checksum_are_kept() {
        let record = encode(&LifetimeStats {
            total_runs: 3,
            ..LifetimeStats::default()
        })
        .unwrap();
        let edited = tamper(&record, |v| v["checksum"] = json!("0"));
        assert_eq!(decode_stats(&edited).total_runs, 3);
    }

    #[test]
    fn invalid_stats_salvage_numeric_fields() {
        let record = json!({
            "version": 3,
            "checksum": "x",
            "totalRuns": 5.7,
            "bestFloor": 42,
            "bestScore": 900,
            "floorsCleared": "lots",
            "highestAscensionUnlocked": 9,
        });

        let stats = decode_stats(&record.to_string());

        assert_eq!(
            stats,
            LifetimeStats {
                total_runs: 5,
                best_score: 900,
                ..LifetimeStats::default()
            }
        );
    }

    #[test]
    fn legacy_stats_gain_ascension_fields() {
        let stats = decode_stats(r#"{"totalRuns": 2, "bestFloor": 3, "unlocks": ["peek"]}"#);
        assert_eq!(stats.total_runs, 2);
        assert_eq!(stats.best_floor, 3);
        assert_eq!(stats.highest_ascension_unlocked, AscensionLevel::NONE);
    }
}
