//! @ai:module:intent TOML manifest loader for benchmark tasks
//! @ai:module:layer infrastructure
//! @ai:module:public_api TaskLoader, TaskLoaderTrait, TaskManifest
//! @ai:module:stateless true

use crate::config::FilterConfig;
use crate::data::load_csv;
use crate::task::roles::{ColRole, TaskType};
use crate::task::task::Task;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// @ai:intent Trait for loading tasks from a directory of manifests
pub trait TaskLoaderTrait: Send + Sync {
    /// @ai:intent Load all valid tasks, skipping broken manifests
    fn load_all(&self, tasks_dir: &Path) -> Result<Vec<Task>>;

    /// @ai:intent Load tasks matching filter criteria
    fn load_filtered(&self, tasks_dir: &Path, filter: &FilterConfig) -> Result<Vec<Task>>;

    /// @ai:intent Load every manifest, reporting the outcome per file
    fn validate(&self, tasks_dir: &Path) -> Vec<(PathBuf, Result<Task>)>;
}

/// @ai:intent Raw manifest structure from a TOML file
#[derive(Debug, Deserialize)]
pub struct TaskManifest {
    pub task: TaskSection,
    #[serde(default)]
    pub roles: RolesSection,
}

/// @ai:intent `[task]` table of a manifest
#[derive(Debug, Deserialize)]
pub struct TaskSection {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    /// CSV file, relative to the manifest
    pub data: PathBuf,
    pub target: Option<String>,
    pub time: Option<String>,
    pub event: Option<String>,
    pub positive: Option<String>,
    pub primary_key: Option<String>,
}

/// @ai:intent Optional `[roles]` overrides
#[derive(Debug, Default, Deserialize)]
pub struct RolesSection {
    pub group: Option<String>,
    pub weight: Option<String>,
    #[serde(default)]
    pub stratum: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// @ai:intent Loads task definitions from TOML manifests pointing at CSV files
pub struct TaskLoader;

impl TaskLoader {
    pub fn new() -> Self {
        Self
    }

    /// @ai:intent Parse a manifest and build its task
    /// @ai:pre path points to a valid TOML file
    /// @ai:effects fs:read
    pub fn parse_manifest(path: &Path) -> Result<Task> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read task manifest: {}", path.display()))?;

        let manifest: TaskManifest = toml::from_str(&content)
            .with_context(|| format!("Failed to parse task manifest: {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::build(manifest, base)
    }

    fn build(manifest: TaskManifest, base: &Path) -> Result<Task> {
        let section = manifest.task;
        let data_path = base.join(&section.data);
        let backend = load_csv(&data_path, section.primary_key.as_deref())
            .with_context(|| format!("Failed to load data: {}", data_path.display()))?;

        let mut task = match section.task_type {
            TaskType::Classif | TaskType::Regr => {
                let Some(target) = section.target.as_deref() else {
                    bail!("task '{}' needs a target column", section.id);
                };
                if section.task_type == TaskType::Classif {
                    Task::classif(&section.id, backend, target)?
                } else {
                    Task::regr(&section.id, backend, target)?
                }
            }
            TaskType::Surv => {
                let (Some(time), Some(event)) = (section.time.as_deref(), section.event.as_deref())
                else {
                    bail!("survival task '{}' needs time and event columns", section.id);
                };
                Task::surv(&section.id, backend, time, event)?
            }
        };

        if let Some(positive) = &section.positive {
            task.set_positive(positive)?;
        }

        let roles = manifest.roles;
        if let Some(group) = &roles.group {
            task.set_col_roles(group, &[ColRole::Group])?;
        }
        if let Some(weight) = &roles.weight {
            task.set_col_roles(weight, &[ColRole::Weight])?;
        }
        for col in &roles.name {
            task.set_col_roles(col, &[ColRole::Name])?;
        }
        for col in &roles.exclude {
            task.set_col_roles(col, &[])?;
        }
        for col in &roles.stratum {
            let mut current = task.col_roles().roles_of(col);
            current.push(ColRole::Stratum);
            task.set_col_roles(col, &current)?;
        }

        Ok(task)
    }

    /// @ai:intent Find all TOML files in a directory tree
    /// @ai:effects fs:read
    fn find_manifests(tasks_dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(tasks_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "toml")
                    .unwrap_or(false)
            })
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();
        files
    }
}

impl Default for TaskLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLoaderTrait for TaskLoader {
    fn load_all(&self, tasks_dir: &Path) -> Result<Vec<Task>> {
        if !tasks_dir.exists() {
            bail!("Task directory does not exist: {}", tasks_dir.display());
        }

        let mut tasks = Vec::new();
        for path in Self::find_manifests(tasks_dir) {
            match Self::parse_manifest(&path) {
                Ok(task) => tasks.push(task),
                Err(e) => {
                    tracing::warn!("Skipping invalid task manifest {}: {:#}", path.display(), e);
                }
            }
        }

        tasks.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(tasks)
    }

    fn load_filtered(&self, tasks_dir: &Path, filter: &FilterConfig) -> Result<Vec<Task>> {
        let all_tasks = self.load_all(tasks_dir)?;
        Ok(all_tasks
            .into_iter()
            .filter(|task| filter.matches_task(task.id(), task.task_type().as_str()))
            .collect())
    }

    fn validate(&self, tasks_dir: &Path) -> Vec<(PathBuf, Result<Task>)> {
        Self::find_manifests(tasks_dir)
            .into_iter()
            .map(|path| {
                let result = Self::parse_manifest(&path);
                (path, result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    const PATIENTS: &str = "pid,site,age,weight,outcome\n\
                            1,a,50,1.0,sick\n\
                            2,a,61,1.0,healthy\n\
                            3,b,45,2.0,sick\n\
                            4,b,38,1.0,healthy\n";

    #[test]
    fn test_load_task_with_roles() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "patients.csv", PATIENTS);
        write_file(
            temp.path(),
            "patients.toml",
            r#"
[task]
id = "patients"
type = "classif"
data = "patients.csv"
target = "outcome"
positive = "sick"
primary_key = "pid"

[roles]
group = "site"
weight = "weight"
stratum = ["outcome"]
"#,
        );

        let loader = TaskLoader::new();
        let tasks = loader.load_all(temp.path()).unwrap();
        assert_eq!(tasks.len(), 1);

        let task = &tasks[0];
        assert_eq!(task.id(), "patients");
        assert_eq!(task.positive(), Some("sick"));
        assert_eq!(task.feature_names(), &["age".to_string()]);
        assert_eq!(task.col_roles().group, vec!["site".to_string()]);
        assert_eq!(task.col_roles().stratum, vec!["outcome".to_string()]);
        assert_eq!(task.target_names(), &["outcome".to_string()]);
    }

    #[test]
    fn test_invalid_manifest_is_skipped_but_reported() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "patients.csv", PATIENTS);
        write_file(
            temp.path(),
            "broken.toml",
            r#"
[task]
id = "broken"
type = "regr"
data = "patients.csv"
"#,
        );

        let loader = TaskLoader::new();
        assert!(loader.load_all(temp.path()).unwrap().is_empty());

        let report = loader.validate(temp.path());
        assert_eq!(report.len(), 1);
        assert!(report[0].1.is_err());
    }

    #[test]
    fn test_load_filtered_by_type() {
        let temp = TempDir::new().unwrap();
        write_file(temp.path(), "patients.csv", PATIENTS);
        write_file(
            temp.path(),
            "a.toml",
            "[task]\nid = \"age\"\ntype = \"regr\"\ndata = \"patients.csv\"\ntarget = \"age\"\n",
        );
        write_file(
            temp.path(),
            "b.toml",
            "[task]\nid = \"outcome\"\ntype = \"classif\"\ndata = \"patients.csv\"\ntarget = \"outcome\"\n",
        );

        let loader = TaskLoader::new();
        let filter = FilterConfig {
            task_types: Some(vec!["regr".to_string()]),
            ..Default::default()
        };
        let tasks = loader.load_filtered(temp.path(), &filter).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id(), "age");
    }
}
