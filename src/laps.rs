//! Per-driver lap statistics.
//!
//! Reduces the raw per-lap table to one `LapStats` per driver: fastest lap,
//! lap count, and the compound run most often. The grouping key is the
//! `Driver` column as provided, case-sensitive; rows without it belong to
//! no group.

use std::collections::HashMap;

use crate::coerce;
use crate::provider::RawTable;

/// Derived statistics for one driver's laps in a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LapStats {
    pub best_lap_sec: Option<f64>,
    pub lap_count: i64,
    pub main_compound: Option<String>,
}

#[derive(Default)]
struct Accumulator {
    best: Option<f64>,
    count: i64,
    // compound -> (occurrences, row index of the latest occurrence)
    compounds: HashMap<String, (i64, usize)>,
}

/// Aggregate a raw lap table into per-driver statistics.
///
/// A missing table (lap fetch failed or session has no laps) yields an
/// empty map; callers then store results without derived lap fields.
pub fn aggregate_laps(laps: Option<&RawTable>) -> HashMap<String, LapStats> {
    let mut groups: HashMap<String, Accumulator> = HashMap::new();

    let Some(table) = laps else {
        return HashMap::new();
    };

    for (index, row) in table.rows().enumerate() {
        let Some(driver) = coerce::to_str(row.field("Driver")) else {
            continue;
        };
        let acc = groups.entry(driver).or_default();

        acc.count += 1;

        if let Some(secs) = coerce::to_seconds(row.field("LapTime")) {
            acc.best = Some(match acc.best {
                Some(best) => best.min(secs),
                None => secs,
            });
        }

        if let Some(compound) = coerce::to_str(row.field("Compound")) {
            let entry = acc.compounds.entry(compound).or_insert((0, index));
            entry.0 += 1;
            entry.1 = index;
        }
    }

    groups
        .into_iter()
        .map(|(driver, acc)| {
            let stats = LapStats {
                best_lap_sec: acc.best,
                lap_count: acc.count,
                main_compound: dominant_compound(acc.compounds),
            };
            (driver, stats)
        })
        .collect()
}

/// Pick the most frequent compound. A label's final count is reached at its
/// last occurrence, so ties go to the label whose last occurrence came first.
fn dominant_compound(compounds: HashMap<String, (i64, usize)>) -> Option<String> {
    compounds
        .into_iter()
        .max_by(|(_, (count_a, last_a)), (_, (count_b, last_b))| {
            count_a.cmp(count_b).then(last_b.cmp(last_a))
        })
        .map(|(compound, _)| compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(value: serde_json::Value) -> RawTable {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_aggregate_two_drivers() {
        let laps = table(json!([
            {"Driver": "A", "LapTime": 90.5, "Compound": "SOFT"},
            {"Driver": "A", "LapTime": 88.2, "Compound": "SOFT"},
            {"Driver": "B", "LapTime": 95.0, "Compound": "HARD"}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats.len(), 2);

        let a = &stats["A"];
        assert_eq!(a.best_lap_sec, Some(88.2));
        assert_eq!(a.lap_count, 2);
        assert_eq!(a.main_compound.as_deref(), Some("SOFT"));

        let b = &stats["B"];
        assert_eq!(b.best_lap_sec, Some(95.0));
        assert_eq!(b.lap_count, 1);
        assert_eq!(b.main_compound.as_deref(), Some("HARD"));
    }

    #[test]
    fn test_lap_count_ignores_missing_fields() {
        let laps = table(json!([
            {"Driver": "A", "LapTime": "1:30.0", "Compound": "SOFT"},
            {"Driver": "A", "LapTime": null},
            {"Driver": "A"}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats["A"].lap_count, 3);
        assert_eq!(stats["A"].best_lap_sec, Some(90.0));
    }

    #[test]
    fn test_rows_without_driver_are_excluded() {
        let laps = table(json!([
            {"Driver": "A", "LapTime": 90.0},
            {"LapTime": 80.0},
            {"Driver": null, "LapTime": 70.0}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats.len(), 1);
        assert_eq!(stats["A"].best_lap_sec, Some(90.0));
    }

    #[test]
    fn test_no_valid_lap_time_yields_absent_best() {
        let laps = table(json!([
            {"Driver": "A", "LapTime": "NaT", "Compound": "MEDIUM"},
            {"Driver": "A", "Compound": "MEDIUM"}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats["A"].best_lap_sec, None);
        assert_eq!(stats["A"].lap_count, 2);
        assert_eq!(stats["A"].main_compound.as_deref(), Some("MEDIUM"));
    }

    #[test]
    fn test_compound_absent_when_column_missing() {
        let laps = table(json!([
            {"Driver": "A", "LapTime": 90.0},
            {"Driver": "A", "LapTime": 91.0}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats["A"].main_compound, None);
    }

    #[test]
    fn test_compound_tie_goes_to_first_reaching_count() {
        // SOFT and MEDIUM both end at 2, but MEDIUM reaches 2 on row 2
        // while SOFT only reaches it on row 3.
        let laps = table(json!([
            {"Driver": "A", "Compound": "SOFT"},
            {"Driver": "A", "Compound": "MEDIUM"},
            {"Driver": "A", "Compound": "MEDIUM"},
            {"Driver": "A", "Compound": "SOFT"}
        ]));

        let stats = aggregate_laps(Some(&laps));
        assert_eq!(stats["A"].main_compound.as_deref(), Some("MEDIUM"));
    }

    #[test]
    fn test_missing_table_degrades_to_empty_map() {
        assert!(aggregate_laps(None).is_empty());
        assert!(aggregate_laps(Some(&table(json!([])))).is_empty());
    }
}
