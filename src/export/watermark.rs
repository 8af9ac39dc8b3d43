//! Persisted export watermark.
//!
//! The watermark records when the last export ran and the modification time of
//! every session it exported. It is read once when an export starts and
//! replaced once when it finishes, through a temp file renamed over the old
//! one so an interrupted run leaves the previous state intact.

use crate::model::error::WatermarkError;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// What has already been exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportWatermark {
    /// When the last successful export finished.
    pub last_export_time: Option<DateTime<Utc>>,
    /// Sessions written by the last export.
    pub exported_count: usize,
    /// Where the last export was written.
    pub export_dir: Option<String>,
    /// Session id to file modification time (seconds since the epoch).
    pub sessions: BTreeMap<String, f64>,
}

/// On-disk shape accepted when reading; `lastExportTime` may be naive local time.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WatermarkFile {
    #[serde(default)]
    last_export_time: Option<String>,
    #[serde(default)]
    exported_count: usize,
    #[serde(default)]
    export_dir: Option<String>,
    #[serde(default)]
    sessions: BTreeMap<String, f64>,
}

impl ExportWatermark {
    /// Read the watermark at `path`.
    ///
    /// Returns `Ok(None)` when no file exists. A legacy flat
    /// `{ "<session id>": <mtime> }` map is migrated into `sessions`.
    ///
    /// # Errors
    ///
    /// - `WatermarkError::Io` if the file exists but cannot be read
    /// - `WatermarkError::Corrupt` if it is not UTF-8 or does not decode
    pub fn load(path: &Path) -> Result<Option<Self>, WatermarkError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(WatermarkError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let corrupt = |message: String| WatermarkError::Corrupt {
            path: path.to_path_buf(),
            message,
        };
        let content = String::from_utf8(bytes).map_err(|e| corrupt(e.to_string()))?;
        Self::decode(&content).map(Some).map_err(corrupt)
    }

    fn decode(content: &str) -> Result<Self, String> {
        let value: serde_json::Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let serde_json::Value::Object(map) = &value else {
            return Err("expected a JSON object".to_string());
        };

        let structured = ["sessions", "lastExportTime", "exportedCount", "exportDir"]
            .iter()
            .any(|key| map.contains_key(*key));

        if !structured {
            let mut sessions = BTreeMap::new();
            for (id, mtime) in map {
                let mtime = mtime
                    .as_f64()
                    .ok_or_else(|| format!("legacy entry '{id}' is not a number"))?;
                sessions.insert(id.clone(), mtime);
            }
            return Ok(Self {
                sessions,
                ..Self::default()
            });
        }

        let file: WatermarkFile = serde_json::from_value(value).map_err(|e| e.to_string())?;
        let last_export_time = match file.last_export_time.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                parse_export_time(raw).ok_or_else(|| format!("invalid lastExportTime '{raw}'"))?,
            ),
        };
        Ok(Self {
            last_export_time,
            exported_count: file.exported_count,
            export_dir: file.export_dir,
            sessions: file.sessions,
        })
    }

    /// Atomically replace the file at `path` with this watermark.
    ///
    /// # Errors
    ///
    /// Returns `WatermarkError::Io` if the directory, temp file or rename fails.
    pub fn save(&self, path: &Path) -> Result<(), WatermarkError> {
        let json = serde_json::to_string_pretty(self)?;
        let io_error = |source: std::io::Error| WatermarkError::Io {
            path: path.to_path_buf(),
            source,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_error)?;

        let mut temp = tempfile::NamedTempFile::new_in(&parent).map_err(io_error)?;
        temp.write_all(json.as_bytes()).map_err(io_error)?;
        temp.write_all(b"\n").map_err(io_error)?;
        temp.as_file().sync_all().map_err(io_error)?;
        temp.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    /// True when a session file should be exported again.
    ///
    /// A session with a recorded time is changed when its file is newer than
    /// that record; an unrecorded session when its file is newer than the last
    /// export. Unknown modification times always count as changed.
    pub fn is_changed(&self, session_id: &str, modified: Option<DateTime<Utc>>) -> bool {
        let Some(modified) = modified else {
            return true;
        };
        match self.sessions.get(session_id) {
            Some(recorded) => mtime_seconds(modified) > *recorded,
            None => self.last_export_time.is_none_or(|last| modified > last),
        }
    }

    /// Watermark after a run that exported `exported` (session id, mtime) pairs.
    ///
    /// Entries of sessions not touched by this run are kept.
    pub fn advanced(
        &self,
        finished_at: DateTime<Utc>,
        export_dir: &Path,
        exported: impl IntoIterator<Item = (String, Option<DateTime<Utc>>)>,
    ) -> Self {
        let mut sessions = self.sessions.clone();
        let mut exported_count = 0;
        for (id, modified) in exported {
            sessions.insert(id, modified.map_or(0.0, mtime_seconds));
            exported_count += 1;
        }
        Self {
            last_export_time: Some(finished_at),
            exported_count,
            export_dir: Some(export_dir.display().to_string()),
            sessions,
        }
    }
}

/// Modification time as fractional seconds since the epoch.
pub fn mtime_seconds(modified: DateTime<Utc>) -> f64 {
    modified.timestamp() as f64 + f64::from(modified.timestamp_subsec_nanos()) / 1e9
}

/// RFC 3339, else a naive timestamp interpreted as local time.
fn parse_export_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
