//! @ai:module:intent Task: a role-annotated view on a shared data backend
//! @ai:module:layer domain
//! @ai:module:public_api Task, Truth
//! @ai:module:stateless false

use crate::data::{Column, ColumnType, DataBackend};
use crate::error::{Error, Result};
use crate::task::roles::{ColRole, ColRoles, RowRole, RowRoles, TaskType};
use ndarray::Array2;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// @ai:intent Ground truth of a set of rows, shaped by task type
#[derive(Debug, Clone, PartialEq)]
pub enum Truth {
    Classes { classes: Vec<String>, codes: Vec<usize> },
    Numeric(Vec<f64>),
    Surv { time: Vec<f64>, event: Vec<bool> },
}

/// @ai:intent Labeled dataset view with column and row roles
///
/// Cloning a task is cheap: the backend is shared and only the role
/// bookkeeping is duplicated. All mutations change the view, never the data.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    task_type: TaskType,
    backend: Arc<DataBackend>,
    col_roles: ColRoles,
    row_roles: RowRoles,
    positive: Option<String>,
}

impl Task {
    /// @ai:intent Create a classification task with a factor or logical target
    /// @ai:effects pure
    pub fn classif(
        id: impl Into<String>,
        backend: impl Into<Arc<DataBackend>>,
        target: &str,
    ) -> Result<Self> {
        Self::new(id, TaskType::Classif, backend, vec![target.to_string()])
    }

    /// @ai:intent Create a regression task with a numeric target
    /// @ai:effects pure
    pub fn regr(
        id: impl Into<String>,
        backend: impl Into<Arc<DataBackend>>,
        target: &str,
    ) -> Result<Self> {
        Self::new(id, TaskType::Regr, backend, vec![target.to_string()])
    }

    /// @ai:intent Create a right-censored survival task from time and event columns
    /// @ai:effects pure
    pub fn surv(
        id: impl Into<String>,
        backend: impl Into<Arc<DataBackend>>,
        time: &str,
        event: &str,
    ) -> Result<Self> {
        Self::new(
            id,
            TaskType::Surv,
            backend,
            vec![time.to_string(), event.to_string()],
        )
    }

    /// @ai:intent Create a task; every non-target column becomes a feature
    /// @ai:pre target columns exist in the backend
    /// @ai:effects pure
    pub fn new(
        id: impl Into<String>,
        task_type: TaskType,
        backend: impl Into<Arc<DataBackend>>,
        targets: Vec<String>,
    ) -> Result<Self> {
        let backend = backend.into();

        for target in &targets {
            if !backend.has_column(target) {
                return Err(Error::UnknownColumn(target.clone()));
            }
        }

        let feature = backend
            .colnames()
            .iter()
            .filter(|c| !targets.contains(c))
            .cloned()
            .collect();

        let mut task = Self {
            id: id.into(),
            task_type,
            row_roles: RowRoles {
                use_rows: backend.row_ids().to_vec(),
                validation: Vec::new(),
            },
            col_roles: ColRoles {
                feature,
                target: targets,
                ..Default::default()
            },
            backend,
            positive: None,
        };

        task.validate_target()?;

        if task.task_type == TaskType::Classif {
            let classes = task.class_names()?;
            if classes.len() == 2 {
                task.positive = Some(classes[0].clone());
            }
        }

        Ok(task)
    }

    fn validate_target(&self) -> Result<()> {
        let targets = &self.col_roles.target;
        let expected = match self.task_type {
            TaskType::Classif | TaskType::Regr => 1,
            TaskType::Surv => 2,
        };
        if targets.len() != expected {
            return Err(Error::InvalidRole(format!(
                "{} task '{}' needs {} target column(s), found {}",
                self.task_type,
                self.id,
                expected,
                targets.len()
            )));
        }

        let first = self.backend.column(&targets[0])?;
        match self.task_type {
            TaskType::Classif => {
                if !matches!(first.column_type(), ColumnType::Factor | ColumnType::Logical) {
                    return Err(Error::TypeMismatch(format!(
                        "classification target '{}' must be factor or logical, is {}",
                        targets[0],
                        first.column_type()
                    )));
                }
            }
            TaskType::Regr => {
                if !matches!(first.column_type(), ColumnType::Numeric | ColumnType::Integer) {
                    return Err(Error::TypeMismatch(format!(
                        "regression target '{}' must be numeric, is {}",
                        targets[0],
                        first.column_type()
                    )));
                }
            }
            TaskType::Surv => {
                if !matches!(first.column_type(), ColumnType::Numeric | ColumnType::Integer) {
                    return Err(Error::TypeMismatch(format!(
                        "survival time '{}' must be numeric, is {}",
                        targets[0],
                        first.column_type()
                    )));
                }
                let event = self.backend.column(&targets[1])?;
                let valid = match event {
                    Column::Logical(_) => true,
                    Column::Integer(values) => values.iter().all(|v| *v == 0 || *v == 1),
                    _ => false,
                };
                if !valid {
                    return Err(Error::TypeMismatch(format!(
                        "survival event '{}' must be logical or 0/1 integer",
                        targets[1]
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    pub fn backend(&self) -> &Arc<DataBackend> {
        &self.backend
    }

    pub fn col_roles(&self) -> &ColRoles {
        &self.col_roles
    }

    pub fn row_roles(&self) -> &RowRoles {
        &self.row_roles
    }

    /// Row ids with the `use` role, in view order.
    pub fn row_ids(&self) -> &[usize] {
        &self.row_roles.use_rows
    }

    pub fn nrow(&self) -> usize {
        self.row_roles.use_rows.len()
    }

    /// Number of active columns: features plus targets.
    pub fn ncol(&self) -> usize {
        self.col_roles.feature.len() + self.col_roles.target.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.col_roles.feature
    }

    pub fn target_names(&self) -> &[String] {
        &self.col_roles.target
    }

    pub fn positive(&self) -> Option<&str> {
        self.positive.as_deref()
    }

    /// @ai:intent Class labels of a classification target in level order
    /// @ai:effects pure
    pub fn class_names(&self) -> Result<Vec<String>> {
        if self.task_type != TaskType::Classif {
            return Err(Error::TypeMismatch(format!(
                "task '{}' is {}, class names need a classification task",
                self.id, self.task_type
            )));
        }
        let column = self.backend.column(&self.col_roles.target[0])?;
        column
            .levels()
            .ok_or_else(|| Error::TypeMismatch("target has no levels".to_string()))
    }

    pub fn positive_index(&self) -> Option<usize> {
        let positive = self.positive.as_ref()?;
        self.class_names()
            .ok()?
            .iter()
            .position(|c| c == positive)
    }

    /// @ai:intent Set the positive class of a binary classification task
    /// @ai:pre task is binary classification and class exists
    /// @ai:effects state:write
    pub fn set_positive(&mut self, class: &str) -> Result<()> {
        let classes = self.class_names()?;
        if classes.len() != 2 {
            return Err(Error::InvalidRole(format!(
                "positive class requires a binary task, '{}' has {} classes",
                self.id,
                classes.len()
            )));
        }
        if !classes.iter().any(|c| c == class) {
            return Err(Error::InvalidRole(format!("unknown class '{}'", class)));
        }
        self.positive = Some(class.to_string());
        Ok(())
    }

    /// @ai:intent Types of the feature columns
    /// @ai:effects pure
    pub fn feature_types(&self) -> Result<Vec<(String, ColumnType)>> {
        self.col_roles
            .feature
            .iter()
            .map(|name| Ok((name.clone(), self.backend.column(name)?.column_type())))
            .collect()
    }

    /// @ai:intent Extract ground truth for the given rows
    /// @ai:effects pure
    pub fn truth(&self, rows: &[usize]) -> Result<Truth> {
        let positions = self.backend.positions(rows)?;
        let target = self.backend.column(&self.col_roles.target[0])?;

        match self.task_type {
            TaskType::Classif => {
                let codes = positions
                    .iter()
                    .map(|&p| {
                        target.code(p).map(|c| c as usize).ok_or_else(|| {
                            Error::InvalidData(format!("missing target in task '{}'", self.id))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Truth::Classes {
                    classes: self.class_names()?,
                    codes,
                })
            }
            TaskType::Regr => Ok(Truth::Numeric(
                positions.iter().map(|&p| target.as_f64(p)).collect(),
            )),
            TaskType::Surv => {
                let event = self.backend.column(&self.col_roles.target[1])?;
                Ok(Truth::Surv {
                    time: positions.iter().map(|&p| target.as_f64(p)).collect(),
                    event: positions.iter().map(|&p| event.as_f64(p) > 0.5).collect(),
                })
            }
        }
    }

    /// @ai:intent Names of model matrix columns, factors expanded per level
    /// @ai:effects pure
    pub fn model_matrix_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for feature in &self.col_roles.feature {
            match self.backend.column(feature)? {
                Column::Factor { levels, .. } => {
                    names.extend(levels.iter().map(|l| format!("{}.{}", feature, l)));
                }
                _ => names.push(feature.clone()),
            }
        }
        Ok(names)
    }

    /// @ai:intent Numeric design matrix over features: factors one-hot, logicals 0/1
    /// @ai:effects pure
    pub fn model_matrix(&self, rows: &[usize]) -> Result<Array2<f64>> {
        let positions = self.backend.positions(rows)?;
        let width = self.model_matrix_names()?.len();
        let mut matrix = Array2::<f64>::zeros((positions.len(), width));

        let mut offset = 0;
        for feature in &self.col_roles.feature {
            let column = self.backend.column(feature)?;
            match column {
                Column::Factor { levels, codes } => {
                    for (i, &p) in positions.iter().enumerate() {
                        match codes[p] {
                            Some(code) => matrix[[i, offset + code as usize]] = 1.0,
                            None => {
                                for j in 0..levels.len() {
                                    matrix[[i, offset + j]] = f64::NAN;
                                }
                            }
                        }
                    }
                    offset += levels.len();
                }
                _ => {
                    for (i, &p) in positions.iter().enumerate() {
                        matrix[[i, offset]] = column.as_f64(p);
                    }
                    offset += 1;
                }
            }
        }

        Ok(matrix)
    }

    /// @ai:intent Observation weights, if a weight column is assigned
    /// @ai:effects pure
    pub fn weights(&self, rows: &[usize]) -> Result<Option<Vec<f64>>> {
        match self.col_roles.weight.first() {
            None => Ok(None),
            Some(col) => {
                let column = self.backend.column(col)?;
                let positions = self.backend.positions(rows)?;
                Ok(Some(positions.iter().map(|&p| column.as_f64(p)).collect()))
            }
        }
    }

    /// @ai:intent Group label per row, if a group column is assigned
    /// @ai:effects pure
    pub fn groups(&self, rows: &[usize]) -> Result<Option<Vec<String>>> {
        match self.col_roles.group.first() {
            None => Ok(None),
            Some(col) => {
                let column = self.backend.column(col)?;
                let positions = self.backend.positions(rows)?;
                Ok(Some(positions.iter().map(|&p| column.label(p)).collect()))
            }
        }
    }

    /// @ai:intent Combined stratum label per row over all stratum columns
    /// @ai:effects pure
    pub fn strata(&self, rows: &[usize]) -> Result<Option<Vec<String>>> {
        if self.col_roles.stratum.is_empty() {
            return Ok(None);
        }
        let positions = self.backend.positions(rows)?;
        let columns = self
            .col_roles
            .stratum
            .iter()
            .map(|c| self.backend.column(c))
            .collect::<Result<Vec<_>>>()?;

        let labels = positions
            .iter()
            .map(|&p| {
                columns
                    .iter()
                    .map(|c| c.label(p))
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect();
        Ok(Some(labels))
    }

    /// @ai:intent Missing value counts of active columns over `use` rows
    /// @ai:effects pure
    pub fn missings(&self) -> Result<Vec<(String, usize)>> {
        let cols: Vec<String> = self
            .col_roles
            .target
            .iter()
            .chain(self.col_roles.feature.iter())
            .cloned()
            .collect();
        self.backend.missings(&cols, &self.row_roles.use_rows)
    }

    /// @ai:intent Restrict the `use` rows to the given row ids
    /// @ai:pre every row id exists in the backend
    /// @ai:effects state:write
    pub fn filter(&mut self, rows: &[usize]) -> Result<()> {
        let mut seen = HashSet::with_capacity(rows.len());
        let mut kept = Vec::with_capacity(rows.len());
        for &row in rows {
            self.backend.position(row)?;
            if seen.insert(row) {
                kept.push(row);
            }
        }
        self.row_roles.use_rows = kept;
        Ok(())
    }

    /// @ai:intent Keep only the named features
    /// @ai:pre every name is currently a feature
    /// @ai:effects state:write
    pub fn select(&mut self, cols: &[String]) -> Result<()> {
        for col in cols {
            if !self.col_roles.feature.contains(col) {
                return Err(Error::UnknownColumn(col.clone()));
            }
        }
        self.col_roles.feature.retain(|f| cols.contains(f));
        Ok(())
    }

    /// @ai:intent Keep only features whose name matches a regular expression
    /// @ai:effects state:write
    pub fn select_grep(&mut self, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)?;
        self.col_roles.feature.retain(|f| regex.is_match(f));
        Ok(())
    }

    /// @ai:intent Replace all roles of a column
    /// @ai:pre column exists; group and weight hold at most one column
    /// @ai:effects state:write
    pub fn set_col_roles(&mut self, col: &str, roles: &[ColRole]) -> Result<()> {
        if !self.backend.has_column(col) {
            return Err(Error::UnknownColumn(col.to_string()));
        }

        let mut updated = self.col_roles.clone();
        updated.remove(col);
        for role in roles {
            let slot = updated.get_mut(*role);
            if !slot.iter().any(|c| c == col) {
                slot.push(col.to_string());
            }
        }

        for role in [ColRole::Group, ColRole::Weight] {
            if updated.get(role).len() > 1 {
                return Err(Error::InvalidRole(format!(
                    "role '{}' can hold at most one column",
                    role.as_str()
                )));
            }
        }

        let previous = std::mem::replace(&mut self.col_roles, updated);
        if let Err(e) = self.validate_target() {
            self.col_roles = previous;
            return Err(e);
        }
        tracing::debug!("Task {}: column '{}' now has roles {:?}", self.id, col, roles);
        Ok(())
    }

    /// @ai:intent Replace the roles of a set of rows
    /// @ai:effects state:write
    pub fn set_row_roles(&mut self, rows: &[usize], roles: &[RowRole]) -> Result<()> {
        let mut moving = HashSet::new();
        let mut distinct = Vec::with_capacity(rows.len());
        for &row in rows {
            self.backend.position(row)?;
            if moving.insert(row) {
                distinct.push(row);
            }
        }
        self.row_roles.use_rows.retain(|r| !moving.contains(r));
        self.row_roles.validation.retain(|r| !moving.contains(r));

        if roles.contains(&RowRole::Use) {
            self.row_roles.use_rows.extend(distinct.iter().copied());
        }
        if roles.contains(&RowRole::Validation) {
            self.row_roles.validation.extend(distinct.iter().copied());
        }
        Ok(())
    }

    /// @ai:intent Content hash of the view: id, type, rows and roles
    /// @ai:effects pure
    pub fn hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(self.task_type.as_str().as_bytes());
        for row in &self.row_roles.use_rows {
            hasher.update(row.to_le_bytes());
        }
        for role in ColRole::ALL {
            hasher.update(role.as_str().as_bytes());
            for col in self.col_roles.get(role) {
                hasher.update(col.as_bytes());
                hasher.update([0u8]);
            }
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn backend() -> DataBackend {
        DataBackend::new(
            vec![
                ("x1".to_string(), Column::Numeric(vec![1.0, 2.0, 3.0, 4.0])),
                ("color".to_string(), Column::factor_from_labels(&["red", "blue", "red", "blue"])),
                ("site".to_string(), Column::Integer(vec![1, 1, 2, 2])),
                ("y".to_string(), Column::factor_from_labels(&["yes", "no", "no", "yes"])),
            ],
            vec![3, 8, 15, 42],
        )
        .unwrap()
    }

    #[test]
    fn test_default_roles() {
        let task = Task::classif("toy", backend(), "y").unwrap();
        assert_eq!(task.target_names(), &["y".to_string()]);
        assert_eq!(task.feature_names().len(), 3);
        assert_eq!(task.row_ids(), &[3, 8, 15, 42]);
        assert_eq!(task.positive(), Some("yes"));
        assert_eq!(task.ncol(), 4);
    }

    #[test]
    fn test_wrong_target_type_rejected() {
        assert!(Task::regr("toy", backend(), "y").is_err());
        assert!(Task::classif("toy", backend(), "x1").is_err());
        assert!(matches!(
            Task::classif("toy", backend(), "nope"),
            Err(Error::UnknownColumn(_))
        ));
    }

    #[test]
    fn test_role_changes_share_backend() {
        let task = Task::classif("toy", backend(), "y").unwrap();
        let mut view = task.clone();
        view.filter(&[42, 3]).unwrap();
        view.set_col_roles("site", &[ColRole::Group]).unwrap();

        assert!(Arc::ptr_eq(task.backend(), view.backend()));
        assert_eq!(view.row_ids(), &[42, 3]);
        assert_eq!(task.nrow(), 4);
        assert_eq!(view.col_roles().group, vec!["site".to_string()]);
        assert!(!view.feature_names().contains(&"site".to_string()));
        assert_ne!(task.hash(), view.hash());
    }

    #[test]
    fn test_filter_unknown_row_is_error() {
        let mut task = Task::classif("toy", backend(), "y").unwrap();
        assert!(matches!(task.filter(&[1]), Err(Error::UnknownRow(1))));
    }

    #[test]
    fn test_removing_target_is_rolled_back() {
        let mut task = Task::classif("toy", backend(), "y").unwrap();
        let result = task.set_col_roles("y", &[ColRole::Feature]);
        assert!(result.is_err());
        assert_eq!(task.target_names(), &["y".to_string()]);
    }

    #[test]
    fn test_truth_and_model_matrix() {
        let task = Task::classif("toy", backend(), "y").unwrap();
        match task.truth(&[8, 42]).unwrap() {
            Truth::Classes { classes, codes } => {
                assert_eq!(classes, vec!["yes".to_string(), "no".to_string()]);
                assert_eq!(codes, vec![1, 0]);
            }
            other => panic!("unexpected truth {:?}", other),
        }

        let names = task.model_matrix_names().unwrap();
        assert_eq!(names, vec!["x1", "color.red", "color.blue", "site"]);
        let mm = task.model_matrix(&[8]).unwrap();
        assert_eq!(mm.row(0).to_vec(), vec![2.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_select_and_grep() {
        let mut task = Task::classif("toy", backend(), "y").unwrap();
        task.select_grep("^x").unwrap();
        assert_eq!(task.feature_names(), &["x1".to_string()]);
        assert!(task.select(&["color".to_string()]).is_err());
    }

    #[test]
    fn test_strata_and_validation_rows() {
        let mut task = Task::classif("toy", backend(), "y").unwrap();
        task.set_col_roles("y", &[ColRole::Target, ColRole::Stratum]).unwrap();
        let strata = task.strata(&[3, 8]).unwrap().unwrap();
        assert_eq!(strata, vec!["yes".to_string(), "no".to_string()]);

        task.set_row_roles(&[15], &[RowRole::Validation]).unwrap();
        assert_eq!(task.row_ids(), &[3, 8, 42]);
        assert_eq!(task.row_roles().validation, vec![15]);
    }

    #[test]
    fn test_repeated_rows_keep_ids_unique() {
        let mut task = Task::classif("toy", backend(), "y").unwrap();
        task.set_row_roles(&[15, 15], &[RowRole::Use, RowRole::Use]).unwrap();
        assert_eq!(task.nrow(), 4);
        assert_eq!(task.row_ids(), &[3, 8, 42, 15]);

        task.set_row_roles(&[8, 8], &[RowRole::Validation]).unwrap();
        assert_eq!(task.row_ids(), &[3, 42, 15]);
        assert_eq!(task.row_roles().validation, vec![8]);

        let mut cv = crate::resampling::Resampling::new(crate::resampling::Strategy::Cv {
            folds: 3,
        })
        .unwrap();
        cv.instantiate(&task, 1).unwrap();
        let mut seen: Vec<usize> = (0..cv.iters())
            .flat_map(|i| cv.test_set(i).unwrap().to_vec())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![3, 15, 42]);
    }

    #[test]
    fn test_surv_task_event_validation() {
        let backend = DataBackend::from_columns(vec![
            ("time".to_string(), Column::Numeric(vec![1.0, 2.0])),
            ("status".to_string(), Column::Integer(vec![1, 0])),
            ("bad".to_string(), Column::Integer(vec![2, 0])),
        ])
        .unwrap();
        let backend = Arc::new(backend);
        let task = Task::surv("s", Arc::clone(&backend), "time", "status").unwrap();
        match task.truth(&[1, 2]).unwrap() {
            Truth::Surv { event, .. } => assert_eq!(event, vec![true, false]),
            other => panic!("unexpected truth {:?}", other),
        }
        assert!(Task::surv("s", backend, "time", "bad").is_err());
    }
}
