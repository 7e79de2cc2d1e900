//! Trajectory module (§4.5): `start`/`step`/`end`, backed by a per-session
//! scratch file (source of truth during the session) mirrored into the
//! shared store at session boundaries.

use crate::config::Config;
use crate::error::{HookError, HookResult};
use crate::store::{kv, ScratchDir, StoreRoot};
use crate::timeutil;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryStatus {
    InProgress,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub action: String,
    pub success: bool,
    pub quality: f64,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: String,
    pub project: String,
    pub session_id: String,
    pub task: String,
    pub status: TrajectoryStatus,
    #[serde(default)]
    pub steps: Vec<Step>,
    pub started_at: String,
    #[serde(default)]
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub task: String,
    pub success: bool,
    pub steps: usize,
    pub ts: String,
}

const TASK_DESCRIPTION_CAP: usize = 200;

fn active_key(project: &str) -> String {
    format!("trajectory:{project}:active")
}

fn stored_key(project: &str, id: &str) -> String {
    format!("trajectory:{project}:{id}")
}

fn index_key(project: &str) -> String {
    format!("trajectory:{project}:index")
}

fn truncate(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn trajectory_id(project: &str, session_id: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    project.hash(&mut hasher);
    session_id.hash(&mut hasher);
    timeutil::now_rfc3339().hash(&mut hasher);
    format!("{:x}-{}", hasher.finish(), timeutil::now().timestamp_millis())
}

/// **start**: if no active trajectory exists for this session, create one.
/// Idempotent: a second `start` for the same session while one is active
/// returns the existing trajectory instead of abandoning it.
pub fn start(
    scratch: &ScratchDir,
    store: &StoreRoot,
    project: &str,
    session_id: &str,
    task: &str,
) -> HookResult<Trajectory> {
    if let Some(existing) = read_scratch(scratch)? {
        if existing.session_id == session_id && existing.status == TrajectoryStatus::InProgress {
            return Ok(existing);
        }
    }

    let trajectory = Trajectory {
        id: trajectory_id(project, session_id),
        project: project.to_string(),
        session_id: session_id.to_string(),
        task: truncate(task, TASK_DESCRIPTION_CAP),
        status: TrajectoryStatus::InProgress,
        steps: Vec::new(),
        started_at: timeutil::now_rfc3339(),
        success_rate: None,
    };

    write_scratch(scratch, &trajectory)?;
    kv::store(
        &store.memory_store(),
        &active_key(project),
        serde_json::to_value(&trajectory)?,
    )?;
    Ok(trajectory)
}

/// **step**: append a step to the active trajectory. A no-op (logged) if
/// no trajectory is active — a hook should never fail the host turn over
/// a missing learning artifact.
pub fn step(
    scratch: &ScratchDir,
    success: bool,
    quality: Option<f64>,
    action: &str,
) -> HookResult<Option<Trajectory>> {
    let Some(mut trajectory) = read_scratch(scratch)? else {
        tracing::debug!("trajectory step with no active trajectory, ignoring");
        return Ok(None);
    };

    trajectory.steps.push(Step {
        action: action.to_string(),
        success,
        quality: quality.unwrap_or(1.0).clamp(0.0, 1.0),
        timestamp: timeutil::now_rfc3339(),
    });

    write_scratch(scratch, &trajectory)?;
    Ok(Some(trajectory))
}

fn success_rate(steps: &[Step]) -> f64 {
    if steps.is_empty() {
        return 0.0;
    }
    let successes = steps.iter().filter(|s| s.success).count();
    successes as f64 / steps.len().max(1) as f64
}

/// **end**: finalize the active trajectory (if any), store it, prepend a
/// summary to the capped FIFO index, and clear scratch. Returns `None` if
/// there was nothing active (e.g. `Stop` fired with no pre-task hook run).
pub fn end(
    scratch: &ScratchDir,
    store: &StoreRoot,
    config: &Config,
    force_failed: bool,
) -> HookResult<Option<Trajectory>> {
    let Some(mut trajectory) = read_scratch(scratch)? else {
        return Ok(None);
    };

    let rate = success_rate(&trajectory.steps);
    trajectory.success_rate = Some(rate);
    trajectory.status = if force_failed {
        TrajectoryStatus::Failed
    } else {
        TrajectoryStatus::Completed
    };

    kv::store(
        &store.memory_store(),
        &stored_key(&trajectory.project, &trajectory.id),
        serde_json::to_value(&trajectory)?,
    )?;
    kv::remove(&store.memory_store(), &active_key(&trajectory.project))?;

    prepend_index(store, config, &trajectory, rate)?;
    clear_scratch(scratch)?;

    Ok(Some(trajectory))
}

fn prepend_index(
    store: &StoreRoot,
    config: &Config,
    trajectory: &Trajectory,
    rate: f64,
) -> HookResult<()> {
    let key = index_key(&trajectory.project);
    let mut index: Vec<IndexEntry> = kv::retrieve(&store.memory_store(), &key)?
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();

    index.insert(
        0,
        IndexEntry {
            id: trajectory.id.clone(),
            task: trajectory.task.clone(),
            success: rate >= 0.5,
            steps: trajectory.steps.len(),
            ts: timeutil::now_rfc3339(),
        },
    );
    index.truncate(config.trajectory_index_cap);

    kv::store(&store.memory_store(), &key, serde_json::to_value(&index)?)
}

fn read_scratch(scratch: &ScratchDir) -> HookResult<Option<Trajectory>> {
    let path = scratch.active_trajectory();
    match std::fs::read_to_string(&path) {
        Ok(raw) if raw.trim().is_empty() => Ok(None),
        Ok(raw) => Ok(serde_json::from_str(&raw).ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HookError::io(&path, e)),
    }
}

fn write_scratch(scratch: &ScratchDir, trajectory: &Trajectory) -> HookResult<()> {
    let path = scratch.active_trajectory();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HookError::io(parent, e))?;
    }
    std::fs::write(&path, serde_json::to_string(trajectory)?).map_err(|e| HookError::io(&path, e))
}

fn clear_scratch(scratch: &ScratchDir) -> HookResult<()> {
    let path = scratch.active_trajectory();
    match std::fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(HookError::io(&path, e)),
    }
}

/// Read-only status view used by the `trajectory status` subcommand
/// (§4.5 supplement): the active trajectory plus the last N
/// index entries for the project.
pub fn status(
    scratch: &ScratchDir,
    store: &StoreRoot,
    project: &str,
    limit: usize,
) -> HookResult<serde_json::Value> {
    let active = read_scratch(scratch)?;
    let index: Vec<IndexEntry> = kv::retrieve(&store.memory_store(), &index_key(project))?
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default();
    Ok(json!({
        "active": active,
        "recent": index.into_iter().take(limit).collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scratch(dir: &std::path::Path) -> ScratchDir {
        ScratchDir::new(dir.join("scratch"))
    }
    fn store(dir: &std::path::Path) -> StoreRoot {
        StoreRoot::new(dir.join("store"))
    }

    #[test]
    fn full_lifecycle_computes_expected_success_rate() {
        let dir = tempdir().unwrap();
        let sc = scratch(dir.path());
        let st = store(dir.path());
        let cfg = Config::default();

        start(&sc, &st, "demo", "s1", "demo task").unwrap();
        step(&sc, true, Some(1.0), "edit").unwrap();
        step(&sc, false, Some(0.2), "test").unwrap();

        let finished = end(&sc, &st, &cfg, false).unwrap().unwrap();
        assert_eq!(finished.success_rate, Some(0.5));
        assert_eq!(finished.status, TrajectoryStatus::Completed);

        let index: Vec<IndexEntry> = kv::retrieve(&st.memory_store(), "trajectory:demo:index")
            .unwrap()
            .map(|v| serde_json::from_value(v).unwrap())
            .unwrap();
        assert_eq!(index.len(), 1);
        assert!(index[0].success);

        assert!(read_scratch(&sc).unwrap().is_none());
    }

    #[test]
    fn start_is_idempotent_while_active() {
        let dir = tempdir().unwrap();
        let sc = scratch(dir.path());
        let st = store(dir.path());

        let t1 = start(&sc, &st, "demo", "s1", "task a").unwrap();
        let t2 = start(&sc, &st, "demo", "s1", "task b (ignored)").unwrap();
        assert_eq!(t1.id, t2.id);
    }

    #[test]
    fn end_with_no_active_trajectory_is_none() {
        let dir = tempdir().unwrap();
        let sc = scratch(dir.path());
        let st = store(dir.path());
        let cfg = Config::default();
        assert!(end(&sc, &st, &cfg, false).unwrap().is_none());
    }

    #[test]
    fn index_is_capped_fifo() {
        let dir = tempdir().unwrap();
        let sc = scratch(dir.path());
        let st = store(dir.path());
        let mut cfg = Config::default();
        cfg.trajectory_index_cap = 2;

        for i in 0..3 {
            start(&sc, &st, "demo", "s1", &format!("task {i}")).unwrap();
            end(&sc, &st, &cfg, false).unwrap();
        }

        let index: Vec<IndexEntry> = kv::retrieve(&st.memory_store(), "trajectory:demo:index")
            .unwrap()
            .map(|v| serde_json::from_value(v).unwrap())
            .unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index[0].task, "task 2");
    }
}
