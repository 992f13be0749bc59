//! Schema upgrades for persisted records.
//!
//! Each link takes the JSON shape of one version and returns the next. Links are pure and never
//! look at anything but their input, so a chain can be replayed from any starting version.

use serde_json::{Map, Value, json};

use crate::*;

/// Upgrade from schema version `from` to `from + 1`.
#[derive(Copy, Clone)]
pub struct Migration {
    pub from: u64,
    pub apply: fn(Value) -> Value,
}

impl core::fmt::Debug for Migration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Migration(v{} -> v{})", self.from, self.from + 1)
    }
}

/// Walks `value` from version `from` up to `to`. A version without a link is logged and skipped,
/// leaving the loader's defaults to fill in whatever that link would have added.
pub fn apply_migrations(mut value: Value, from: u64, to: u64, chain: &[Migration]) -> Value {
    for version in from..to {
        match chain.iter().find(|link| link.from == version) {
            Some(link) => value = (link.apply)(value),
            None => log::warn!(
                "Missing migration from v{} to v{}, data may be incomplete",
                version,
                version + 1
            ),
        }
    }
    value
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn or_default(map: &mut Map<String, Value>, key: &str, default: Value) {
    if map.get(key).is_none_or(Value::is_null) {
        map.insert(key.to_owned(), default);
    }
}

fn update(map: &mut Map<String, Value>, key: &str, f: impl FnOnce(Map<String, Value>) -> Value) {
    let inner = object(map.remove(key).unwrap_or(Value::Null));
    map.insert(key.to_owned(), f(inner));
}

pub const RUN_MIGRATIONS: [Migration; 10] = [
    Migration {
        from: 0,
        apply: run_v0_fill_legacy_defaults,
    },
    Migration {
        from: 1,
        apply: run_v1_add_ascension,
    },
    Migration {
        from: 2,
        apply: drop_unlocks,
    },
    Migration {
        from: 3,
        apply: run_v3_relics_by_id,
    },
    Migration {
        from: 4,
        apply: run_v4_usage_trackers,
    },
    Migration {
        from: 5,
        apply: run_v5_numeric_seed,
    },
    Migration {
        from: 6,
        apply: run_v6_trauma_and_targeting,
    },
    Migration {
        from: 7,
        apply: run_v7_floor_clock,
    },
    Migration {
        from: 8,
        apply: run_v8_layout,
    },
    Migration {
        from: 9,
        apply: run_v9_board_topology,
    },
];

pub const STATS_MIGRATIONS: [Migration; 3] = [
    Migration {
        from: 0,
        apply: stats_v0_fill_legacy_defaults,
    },
    Migration {
        from: 1,
        apply: stats_v1_add_ascension,
    },
    Migration {
        from: 2,
        apply: drop_unlocks,
    },
];

fn run_v0_fill_legacy_defaults(value: Value) -> Value {
    let mut s = object(value);
    or_default(&mut s, "phase", json!("start"));
    or_default(&mut s, "board", json!([]));
    or_default(
        &mut s,
        "floorConfig",
        json!({"floor": 1, "rows": 6, "cols": 6, "mines": 6}),
    );
    or_default(&mut s, "minesRemaining", json!(6));
    or_default(&mut s, "time", json!(0));
    or_default(&mut s, "isFirstClick", json!(true));
    or_default(&mut s, "isMobile", json!(false));
    or_default(
        &mut s,
        "run",
        json!({
            "currentFloor": 1,
            "score": 0,
            "activePowerUps": [],
            "ironWillAvailable": true,
            "xRayUsedThisFloor": false,
            "luckyStartUsedThisFloor": false,
            "seed": "LEGACY",
        }),
    );
    or_default(&mut s, "draftOptions", json!([]));
    or_default(&mut s, "dangerCells", json!([]));
    or_default(&mut s, "explodedCell", Value::Null);
    or_default(&mut s, "closeCallCell", Value::Null);
    Value::Object(s)
}

fn run_v1_add_ascension(value: Value) -> Value {
    let mut s = object(value);
    update(&mut s, "run", |mut run| {
        or_default(&mut run, "ascensionLevel", json!(0));
        Value::Object(run)
    });
    Value::Object(s)
}

fn drop_unlocks(value: Value) -> Value {
    let mut s = object(value);
    s.remove("unlocks");
    Value::Object(s)
}

/// Full power-up records become bare ids; names and descriptions come from the catalog.
fn run_v3_relics_by_id(value: Value) -> Value {
    fn ids(list: Option<Value>) -> Value {
        let ids: Vec<Value> = match list {
            Some(Value::Array(items)) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(id) => Some(Value::String(id)),
                    Value::Object(mut record) => record.remove("id"),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Value::Array(ids)
    }

    let mut s = object(value);
    let draft = ids(s.remove("draftOptions"));
    s.insert("draftOptions".to_owned(), draft);
    update(&mut s, "run", |mut run| {
        let relics = ids(run.remove("activePowerUps"));
        run.insert("relicIds".to_owned(), relics);
        Value::Object(run)
    });
    Value::Object(s)
}

/// Per-relic booleans become one usage tracker per owned relic.
fn run_v4_usage_trackers(value: Value) -> Value {
    let mut s = object(value);
    update(&mut s, "run", |mut run| {
        let flag = |run: &mut Map<String, Value>, key: &str| run.remove(key).and_then(|v| v.as_bool());
        let iron_will_used = flag(&mut run, "ironWillAvailable").map(|available| !available);
        let x_ray_used = flag(&mut run, "xRayUsedThisFloor");
        let lucky_used = flag(&mut run, "luckyStartUsedThisFloor");

        let ids = match run.remove("relicIds") {
            Some(Value::Array(ids)) => ids,
            _ => Vec::new(),
        };
        let relics: Vec<Value> = ids
            .into_iter()
            .filter_map(|id| id.as_str().map(str::to_owned))
            .map(|id| {
                let Some(relic) = RelicId::parse(&id) else {
                    return json!({"id": id, "tracker": {"kind": "passive"}});
                };
                let mut owned = OwnedRelic::new(relic);
                let used = match relic {
                    RelicId::IronWill => iron_will_used,
                    RelicId::XRayVision => x_ray_used,
                    RelicId::LuckyStart => lucky_used,
                    _ => None,
                };
                if used == Some(true) {
                    owned.tracker.consume();
                }
                serde_json::to_value(owned).unwrap_or(Value::Null)
            })
            .collect();
        run.insert("relics".to_owned(), Value::Array(relics));
        Value::Object(run)
    });
    Value::Object(s)
}

/// Free-form seed strings become numeric seeds. Share codes keep their value; anything else is
/// hashed into range.
fn run_v5_numeric_seed(value: Value) -> Value {
    let mut s = object(value);
    update(&mut s, "run", |mut run| {
        let seed = match run.remove("seed") {
            Some(Value::Number(n)) => n.as_u64().map_or_else(RunSeed::default, RunSeed::new),
            Some(Value::String(text)) => RunSeed::from_share_code(&text)
                .unwrap_or_else(|| RunSeed::new(u64::from(super::string_hash(&text)))),
            _ => RunSeed::default(),
        };
        run.insert("seed".to_owned(), json!(seed.get()));
        Value::Object(run)
    });
    Value::Object(s)
}

fn run_v6_trauma_and_targeting(value: Value) -> Value {
    let mut s = object(value);
    update(&mut s, "run", |mut run| {
        or_default(&mut run, "traumaStacks", json!(0));
        or_default(&mut run, "floorAttempt", json!(0));
        or_default(&mut run, "armed", Value::Null);
        Value::Object(run)
    });
    Value::Object(s)
}

fn ascension_of(s: &Map<String, Value>) -> AscensionLevel {
    let level = s
        .get("run")
        .and_then(|run| run.get("ascensionLevel"))
        .and_then(Value::as_u64)
        .unwrap_or(0);
    AscensionLevel::saturating(u8::try_from(level).unwrap_or(u8::MAX))
}

fn run_v7_floor_clock(value: Value) -> Value {
    let mut s = object(value);
    let elapsed = s.remove("time").and_then(|t| t.as_u64()).unwrap_or(0);
    let countdown = ascension_of(&s).modifiers().countdown_secs;
    s.insert(
        "clock".to_owned(),
        json!({"elapsed": elapsed, "countdown": countdown}),
    );
    Value::Object(s)
}

fn run_v8_layout(value: Value) -> Value {
    let mut s = object(value);
    let compact = s
        .remove("isMobile")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    s.insert(
        "layout".to_owned(),
        serde_json::to_value(Layout::from_compact(compact)).unwrap_or(Value::Null),
    );
    // Both are derived from the board now.
    s.remove("minesRemaining");
    s.remove("dangerCells");
    Value::Object(s)
}

fn run_v9_board_topology(value: Value) -> Value {
    fn coords(value: Option<Value>) -> Value {
        match value {
            Some(Value::Object(cell)) => match (cell.get("row"), cell.get("col")) {
                (Some(row), Some(col)) => json!([row, col]),
                _ => Value::Null,
            },
            Some(Value::Array(pair)) => Value::Array(pair),
            _ => Value::Null,
        }
    }

    let mut s = object(value);
    let topology = ascension_of(&s).modifiers().topology;

    let cells = s.remove("board").unwrap_or_else(|| json!([]));
    let revealed = cells
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_array)
        .flatten()
        .filter(|cell| {
            cell.get("state").and_then(Value::as_str) == Some("revealed")
                && cell.get("isMine").and_then(Value::as_bool) == Some(false)
        })
        .count();
    s.insert(
        "board".to_owned(),
        json!({"topology": topology, "cells": cells}),
    );

    let first_click_pending = s
        .remove("isFirstClick")
        .and_then(|v| v.as_bool())
        .unwrap_or(true);
    s.insert("firstClickPending".to_owned(), json!(first_click_pending));

    let exploded = coords(s.remove("explodedCell"));
    s.insert("explodedCell".to_owned(), exploded);
    let close_call = coords(s.remove("closeCallCell"));
    s.insert("closeCallCell".to_owned(), close_call);

    or_default(&mut s, "cellsRevealedThisFloor", json!(revealed));
    or_default(&mut s, "revealStamps", json!([]));
    or_default(&mut s, "findings", json!({}));
    Value::Object(s)
}

fn stats_v0_fill_legacy_defaults(value: Value) -> Value {
    let mut s = object(value);
    for key in ["totalRuns", "bestFloor", "bestScore", "floorsCleared"] {
        or_default(&mut s, key, json!(0));
    }
    Value::Object(s)
}

fn stats_v1_add_ascension(value: Value) -> Value {
    let mut s = object(value);
    or_default(&mut s, "highestAscensionUnlocked", json!(0));
    or_default(&mut s, "highestAscensionCleared", json!(0));
    Value::Object(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chains_have_no_gaps() {
        for (i, link) in RUN_MIGRATIONS.iter().enumerate() {
            assert_eq!(link.from, i as u64);
        }
        for (i, link) in STATS_MIGRATIONS.iter().enumerate() {
            assert_eq!(link.from, i as u64);
        }
    }

    #[test]
    fn legacy_booleans_become_trackers() {
        let v3 = json!({
            "run": {
                "activePowerUps": [
                    {"id": "iron-will", "name": "Iron Will"},
                    {"id": "peek"},
                    {"id": "from-the-future"}
                ],
                "ironWillAvailable": false,
                "xRayUsedThisFloor": false,
                "luckyStartUsedThisFloor": false,
                "seed": "LEGACY"
            },
            "draftOptions": [{"id": "survey"}]
        });

        let v5 = apply_migrations(v3, 3, 5, &RUN_MIGRATIONS);

        assert_eq!(v5["draftOptions"], json!(["survey"]));
        let relics = v5["run"]["relics"].as_array().unwrap();
        assert_eq!(relics.len(), 3);
        assert_eq!(
            relics[0],
            json!({"id": "iron-will", "tracker": {"kind": "floor-flag", "used": true}})
        );
        assert_eq!(
            relics[1],
            json!({"id": "peek", "tracker": {"kind": "floor-flag", "used": false}})
        );
        assert_eq!(relics[2]["id"], json!("from-the-future"));
        assert!(v5["run"].get("ironWillAvailable").is_none());
    }

    #[test]
    fn seeds_keep_share_codes() {
        let code = RunSeed::new(123_456).share_code();
        let migrated = run_v5_numeric_seed(json!({"run": {"seed": code}}));
        assert_eq!(migrated["run"]["seed"], json!(123_456));

        let legacy = run_v5_numeric_seed(json!({"run": {"seed": "LEGACY"}}));
        assert!(legacy["run"]["seed"].is_u64());
    }

    #[test]
    fn missing_link_is_skipped() {
        let partial = [STATS_MIGRATIONS[0], STATS_MIGRATIONS[2]];
        let migrated = apply_migrations(json!({"unlocks": []}), 0, 3, &partial);
        assert!(migrated.get("highestAscensionUnlocked").is_none());
        assert!(migrated.get("unlocks").is_none());
        assert_eq!(migrated["totalRuns"], json!(0));
    }
}
