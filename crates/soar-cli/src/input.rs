//! Loading tasks and traces from JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use soar_core::{Competitor, CompetitorInfo, Fix, Task, TaskDefinition};

/// A trace file is either a bare list of fixes or a competitor record with its fixes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceFile {
    Fixes(Vec<Fix>),
    Competitor {
        #[serde(default)]
        competition_id: Option<String>,
        #[serde(default)]
        pilot: Option<String>,
        #[serde(default)]
        airplane: Option<String>,
        #[serde(default)]
        ranking: Option<u32>,
        fixes: Vec<Fix>,
    },
}

pub fn parse_task(json: &str) -> Result<Task> {
    let definition: TaskDefinition =
        serde_json::from_str(json).context("invalid task definition")?;
    Ok(Task::from_definition(definition)?)
}

pub fn load_task(path: &Path) -> Result<Task> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read task {}", path.display()))?;
    parse_task(&json).with_context(|| format!("failed to load task {}", path.display()))
}

/// Parse a trace; `fallback_id` names the competitor when the file does not.
pub fn parse_competitor(json: &str, fallback_id: &str) -> Result<Competitor> {
    let file: TraceFile = serde_json::from_str(json).context("invalid trace")?;
    let (info, fixes) = match file {
        TraceFile::Fixes(fixes) => (
            CompetitorInfo {
                competition_id: fallback_id.to_string(),
                ..Default::default()
            },
            fixes,
        ),
        TraceFile::Competitor {
            competition_id,
            pilot,
            airplane,
            ranking,
            fixes,
        } => (
            CompetitorInfo {
                competition_id: competition_id.unwrap_or_else(|| fallback_id.to_string()),
                pilot,
                airplane,
                ranking,
            },
            fixes,
        ),
    };
    Ok(Competitor::new(info, fixes))
}

/// Load a trace, naming the competitor after the file stem unless the file says otherwise.
pub fn load_competitor(path: &Path) -> Result<Competitor> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read trace {}", path.display()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    parse_competitor(&json, &stem).with_context(|| format!("failed to load trace {}", path.display()))
}

/// All `*.json` files in `dir`, sorted by name.
pub fn trace_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// The explicit date, else the date of the first recorded fix.
pub fn day_date(explicit: Option<NaiveDate>, competitors: &[Competitor]) -> Result<NaiveDate> {
    if let Some(date) = explicit {
        return Ok(date);
    }
    match competitors.iter().find_map(|competitor| competitor.trace.first()) {
        Some(fix) => Ok(fix.time.date_naive()),
        None => bail!("--date is required when no trace contains fixes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = r#"{
        "type": "aat",
        "t_min_s": 7200,
        "waypoints": [
            {"name": "start", "lat": 52.0, "lon": 5.0, "r_max": 1000.0, "is_line": true, "sector_orientation": "next"},
            {"name": "area", "lat": 52.5, "lon": 5.0, "r_max": 20000.0, "sector_orientation": "symmetrical"},
            {"name": "finish", "lat": 52.0, "lon": 5.0, "r_max": 3000.0, "sector_orientation": "previous", "distance_correction": "shorten_legs"}
        ]
    }"#;

    #[test]
    fn test_parse_task() {
        let task = parse_task(TASK).unwrap();
        assert!(matches!(task, Task::Aat(_)));
        assert_eq!(task.no_legs(), 2);
    }

    #[test]
    fn test_task_with_line_turnpoint_is_rejected() {
        let json = TASK.replace(
            r#""r_max": 20000.0, "sector_orientation""#,
            r#""r_max": 20000.0, "is_line": true, "sector_orientation""#,
        );
        assert!(parse_task(&json).is_err());
    }

    #[test]
    fn test_bare_fix_list_uses_fallback_id() {
        let json = r#"[{"time": "2024-06-01T12:00:00Z", "lat": 52.0, "lon": 5.0, "ENL": 12}]"#;
        let competitor = parse_competitor(json, "PR").unwrap();
        assert_eq!(competitor.competition_id, "PR");
        assert_eq!(competitor.trace.len(), 1);
        assert_eq!(competitor.trace[0].enl, Some(12.0));
    }

    #[test]
    fn test_competitor_record() {
        let json = r#"{
            "competition_id": "HS",
            "pilot": "J. Doe",
            "ranking": 3,
            "fixes": [{"time": "2024-06-01T12:00:00Z", "lat": 52.0, "lon": 5.0}]
        }"#;
        let competitor = parse_competitor(json, "file").unwrap();
        assert_eq!(competitor.competition_id, "HS");
        assert_eq!(competitor.pilot.as_deref(), Some("J. Doe"));
        assert_eq!(competitor.ranking, Some(3));
    }

    #[test]
    fn test_day_date_from_first_fix() {
        let empty = parse_competitor("[]", "AA").unwrap();
        let flown = parse_competitor(
            r#"[{"time": "2024-06-01T12:00:00Z", "lat": 52.0, "lon": 5.0}]"#,
            "BB",
        )
        .unwrap();
        let june_first = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let explicit = NaiveDate::from_ymd_opt(2024, 7, 4).unwrap();

        let competitors = vec![empty, flown];
        assert_eq!(day_date(None, &competitors).unwrap(), june_first);
        assert_eq!(day_date(Some(explicit), &competitors).unwrap(), explicit);
        assert!(day_date(None, &competitors[..1]).is_err());
        assert!(day_date(None, &[]).is_err());
        assert_eq!(day_date(Some(explicit), &[]).unwrap(), explicit);
    }

    #[test]
    fn test_invalid_trace() {
        assert!(parse_competitor(r#"{"fixes": 3}"#, "x").is_err());
    }
}
