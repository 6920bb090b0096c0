//! Deterministic sample rows for seeding a database and for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use super::logs::LogLevel;
use super::{DataSet, Log, ProjectInstance, Translation};
use crate::entity::Audit;

const LEVELS: [LogLevel; 4] = [
    LogLevel::Info,
    LogLevel::Warning,
    LogLevel::Error,
    LogLevel::Debug,
];
const SOURCES: [&str; 3] = ["importer", "translator", "exporter"];
const ENVIRONMENTS: [&str; 3] = ["development", "staging", "production"];
const CULTURES: [&str; 3] = ["en-US", "de-DE", "fr-FR"];

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
        .single()
        .unwrap_or_default()
}

/// `n` logs with ids `1..=n`, one minute apart, every other one finished.
pub fn sample_logs(n: usize) -> Vec<Log> {
    (1..=n)
        .map(|i| {
            let started_at = epoch() + Duration::minutes(i as i64);
            Log {
                id: i as i64,
                level: LEVELS[i % LEVELS.len()],
                source: SOURCES[i % SOURCES.len()].to_string(),
                message: format!("Batch {i} processed"),
                details: (i % 3 == 0).then(|| format!("{} rows touched", i * 10)),
                started_at,
                finished_at: (i % 2 == 0).then(|| started_at + Duration::seconds(i as i64)),
                audit: Audit::new(started_at, "system"),
            }
        })
        .collect()
}

pub fn sample_project_instances(n: usize) -> Vec<ProjectInstance> {
    (1..=n)
        .map(|i| ProjectInstance {
            id: Uuid::from_u128(0x1000 + i as u128),
            tenant: format!("tenant-{}", i % 2 + 1),
            name: format!("Project {i}"),
            description: Some(format!(
                "Instance {i} in {}",
                ENVIRONMENTS[i % ENVIRONMENTS.len()]
            )),
            notes: (i % 4 == 0).then(|| "Pending migration".to_string()),
            environment: ENVIRONMENTS[i % ENVIRONMENTS.len()].to_string(),
            is_active: i % 5 != 0,
            audit: Audit::new(epoch() + Duration::days(i as i64), "admin"),
        })
        .collect()
}

pub fn sample_translations(n: usize) -> Vec<Translation> {
    (1..=n)
        .map(|i| {
            let culture = CULTURES[i % CULTURES.len()];
            Translation {
                id: i as i64,
                key: format!("screen.label_{}", i / CULTURES.len()),
                culture: culture.to_string(),
                value: format!("Label {} ({culture})", i / CULTURES.len()),
                notes: None,
                is_machine_translated: culture != "en-US",
                audit: Audit::new(epoch() + Duration::hours(i as i64), "translator"),
            }
        })
        .collect()
}

pub fn sample_data_sets(n: usize) -> Vec<DataSet> {
    (1..=n)
        .map(|i| DataSet {
            id: Uuid::from_u128(0x2000 + i as u128),
            name: format!("Data set {i}"),
            description: Some(format!("Export of {} rows", i * 100)),
            notes: None,
            row_count: (i * 100) as i64,
            audit: Audit::new(epoch() + Duration::days(i as i64), "analyst"),
        })
        .collect()
}
