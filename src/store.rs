use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use tracing::info;

use crate::models::{ApproveRequest, EmployeeRef, OverridePayload, ScheduleRecord};
use crate::utils::money::role_key;

/// The schedule-data / persistence collaborator. The engine never talks to
/// a database or HTTP API itself; it is handed fully loaded schedules and
/// hands back payloads through this seam.
#[allow(async_fn_in_trait)]
pub trait ScheduleStore {
    async fn fetch_schedule(
        &self,
        schedule_id: u64,
        business_date: NaiveDate,
    ) -> Result<ScheduleRecord>;

    async fn save_overrides(&self, payload: &OverridePayload) -> Result<()>;

    async fn approve_schedule(&self, request: &ApproveRequest) -> Result<()>;
}

/// The employee-directory collaborator backing the "assign to role" picker
/// and custom-receiver job title validation.
#[allow(async_fn_in_trait)]
pub trait EmployeeDirectory {
    async fn active_by_title(&self, job_title: &str) -> Result<Vec<EmployeeRef>>;

    async fn job_titles(&self) -> Result<Vec<String>>;
}

/// File-backed reference store: fetches from a schedule JSON file and
/// writes save/approve artifacts next to it. Used by the demo runner and
/// tests.
pub struct JsonScheduleStore {
    path: PathBuf,
}

impl JsonScheduleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonScheduleStore { path: path.into() }
    }

    pub fn load_record(&self) -> Result<ScheduleRecord> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read schedule file {}", self.path.display()))?;
        let record: ScheduleRecord = serde_json::from_str(&raw)
            .with_context(|| format!("malformed schedule file {}", self.path.display()))?;
        Ok(record)
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("schedule");
        self.path
            .with_file_name(format!("{stem}.{suffix}.json"))
    }

    fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}

impl ScheduleStore for JsonScheduleStore {
    async fn fetch_schedule(
        &self,
        schedule_id: u64,
        business_date: NaiveDate,
    ) -> Result<ScheduleRecord> {
        let record = self.load_record()?;
        if record.schedule_id != schedule_id || record.business_date != business_date {
            bail!(
                "schedule file {} holds {}/{}, requested {}/{}",
                self.path.display(),
                record.schedule_id,
                record.business_date,
                schedule_id,
                business_date
            );
        }
        Ok(record)
    }

    async fn save_overrides(&self, payload: &OverridePayload) -> Result<()> {
        let path = self.sibling("overrides");
        Self::write_json(&path, payload)?;
        info!(schedule_id = payload.schedule_id, path = %path.display(), "overrides persisted");
        Ok(())
    }

    async fn approve_schedule(&self, request: &ApproveRequest) -> Result<()> {
        let path = self.sibling("approved");
        Self::write_json(&path, request)?;
        info!(schedule_id = request.schedule_id, path = %path.display(), "schedule approved");
        Ok(())
    }
}

/// In-memory directory keyed by normalized job title.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    by_title: HashMap<String, Vec<EmployeeRef>>,
}

impl InMemoryDirectory {
    pub fn new(entries: Vec<(String, EmployeeRef)>) -> Self {
        let mut by_title: HashMap<String, Vec<EmployeeRef>> = HashMap::new();
        for (title, employee) in entries {
            by_title.entry(role_key(&title)).or_default().push(employee);
        }
        InMemoryDirectory { by_title }
    }
}

impl EmployeeDirectory for InMemoryDirectory {
    async fn active_by_title(&self, job_title: &str) -> Result<Vec<EmployeeRef>> {
        Ok(self
            .by_title
            .get(&role_key(job_title))
            .cloned()
            .unwrap_or_default())
    }

    async fn job_titles(&self) -> Result<Vec<String>> {
        let mut titles: Vec<String> = self.by_title.keys().cloned().collect();
        titles.sort();
        Ok(titles)
    }
}
