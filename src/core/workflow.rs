//! Workflow step engine - In-memory editing of an application's steps.
//!
//! A [`WorkflowDraft`] is opened from the stored steps of one application, edited freely
//! (reorder, add, remove, toggle, outsource, due dates) and then turned into a
//! [`StepDiff`] that the application module persists. After every edit the draft's
//! positions are exactly `0..n-1` in display order.
//!
//! Nothing in this module touches the database.

use crate::entities::application_step;
use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Label given to steps added through [`WorkflowDraft::add_step`].
pub const NEW_STEP_LABEL: &str = "New Step";

/// Identity of a step inside a draft.
///
/// Stored steps keep their database id; steps added in the draft get a temporary key
/// that is only meaningful until the draft is saved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum StepKey {
    /// Step that exists in the database
    Stored(i64),
    /// Step created in this draft, not yet persisted
    Temporary(u64),
}

/// Move direction for [`WorkflowDraft::move_step`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards position 0
    Up,
    /// Towards the end of the list
    Down,
}

/// How a step is presented on the workflow board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepState {
    /// Marked done
    Completed,
    /// The first incomplete step
    Running,
    /// Incomplete, outsourced, and not the running step
    Outsourced,
    /// Anything else
    Pending,
}

/// Read access to the properties the board logic needs.
pub trait StepLike {
    /// Whether the step is done
    fn is_completed(&self) -> bool;
    /// Whether the step is outsourced
    fn is_outsource(&self) -> bool;
}

impl StepLike for application_step::Model {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn is_outsource(&self) -> bool {
        self.is_outsource
    }
}

impl StepLike for DraftStep {
    fn is_completed(&self) -> bool {
        self.is_completed
    }

    fn is_outsource(&self) -> bool {
        self.is_outsource
    }
}

/// Percentage of completed steps, rounded to the nearest integer.
///
/// Returns 0 when there are no steps.
#[must_use]
pub fn calculate_progress(completed: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    // Step counts are tiny and the result is within 0..=100
    let percent = ((completed as f64 / total as f64) * 100.0).round() as i32;
    percent
}

/// Progress of a list of steps, see [`calculate_progress`].
#[must_use]
pub fn progress_of<S: StepLike>(steps: &[S]) -> i32 {
    let completed = steps.iter().filter(|s| s.is_completed()).count();
    calculate_progress(completed, steps.len())
}

/// Index of the first incomplete step. `steps` must be in position order.
#[must_use]
pub fn active_index<S: StepLike>(steps: &[S]) -> Option<usize> {
    steps.iter().position(|s| !s.is_completed())
}

/// Display state of every step. `steps` must be in position order.
#[must_use]
pub fn step_states<S: StepLike>(steps: &[S]) -> Vec<StepState> {
    let active = active_index(steps);
    steps
        .iter()
        .enumerate()
        .map(|(index, step)| {
            if step.is_completed() {
                StepState::Completed
            } else if Some(index) == active {
                StepState::Running
            } else if step.is_outsource() {
                StepState::Outsourced
            } else {
                StepState::Pending
            }
        })
        .collect()
}

/// Sorts stored steps into position order.
#[must_use]
pub fn sorted_steps(mut steps: Vec<application_step::Model>) -> Vec<application_step::Model> {
    steps.sort_by_key(|s| (s.position, s.id));
    steps
}

/// One step as edited in a draft.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftStep {
    /// Stored id or temporary key
    pub key: StepKey,
    /// Task label
    pub label: String,
    /// Optional details
    pub description: Option<String>,
    /// Zero-based position, always equal to the index in the draft
    pub position: i32,
    /// Whether the task is done
    pub is_completed: bool,
    /// Whether the task is outsourced
    pub is_outsource: bool,
    /// Assigned provider
    pub provider_id: Option<i64>,
    /// Assigned provider's display name
    pub outsource_provider: Option<String>,
    /// Due date
    pub expiry_date: Option<NaiveDate>,
}

impl From<&application_step::Model> for DraftStep {
    fn from(step: &application_step::Model) -> Self {
        Self {
            key: StepKey::Stored(step.id),
            label: step.label.clone(),
            description: step.description.clone(),
            position: step.position,
            is_completed: step.is_completed,
            is_outsource: step.is_outsource,
            provider_id: step.provider_id,
            outsource_provider: step.outsource_provider.clone(),
            expiry_date: step.expiry_date,
        }
    }
}

/// A step as submitted by a client that edited the workflow itself.
///
/// `id: None` marks a step that was added in the client's draft.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SubmittedStep {
    /// Stored id, absent for new steps
    #[serde(default)]
    pub id: Option<i64>,
    /// Task label
    pub label: String,
    /// Optional details
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the task is done
    #[serde(default)]
    pub is_completed: bool,
    /// Whether the task is outsourced
    #[serde(default)]
    pub is_outsource: bool,
    /// Assigned provider
    #[serde(default)]
    pub provider_id: Option<i64>,
    /// Assigned provider's display name
    #[serde(default)]
    pub outsource_provider: Option<String>,
    /// Due date
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
}

/// What saving a draft has to do to the stored steps.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepDiff {
    /// Stored ids that are no longer in the draft
    pub removed: Vec<i64>,
    /// Stored steps to overwrite, with their new positions
    pub updated: Vec<(i64, DraftStep)>,
    /// New steps to insert
    pub inserted: Vec<DraftStep>,
}

/// A step that went from incomplete to complete in a draft.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletedStep {
    /// Stored id of the step
    pub step_id: i64,
    /// Step label
    pub label: String,
    /// One-based number of the step in the workflow
    pub step_number: usize,
}

/// Editable copy of one application's steps.
#[derive(Clone, Debug)]
pub struct WorkflowDraft {
    application_id: i64,
    original: Vec<application_step::Model>,
    steps: Vec<DraftStep>,
    next_temporary: u64,
}

impl WorkflowDraft {
    /// Opens a draft from the stored steps, sorted by position and re-indexed.
    #[must_use]
    pub fn open(application_id: i64, stored: Vec<application_step::Model>) -> Self {
        let original = sorted_steps(stored);
        let steps = original.iter().map(DraftStep::from).collect();
        let mut draft = Self {
            application_id,
            original,
            steps,
            next_temporary: 0,
        };
        draft.reindex();
        draft
    }

    /// Builds a draft from a complete step list edited elsewhere, in display order.
    ///
    /// # Errors
    /// Returns `Error::Config` when a submitted id is not one of the application's stored
    /// steps or appears twice.
    pub fn from_submission(
        application_id: i64,
        stored: Vec<application_step::Model>,
        submitted: Vec<SubmittedStep>,
    ) -> Result<Self> {
        let mut draft = Self::open(application_id, stored);
        let known: HashSet<i64> = draft.original.iter().map(|s| s.id).collect();
        let mut seen = HashSet::new();

        let mut steps = Vec::with_capacity(submitted.len());
        for step in submitted {
            let key = match step.id {
                Some(id) if !known.contains(&id) => {
                    return Err(Error::invalid(format!(
                        "Step {id} does not belong to application {application_id}"
                    )));
                }
                Some(id) if !seen.insert(id) => {
                    return Err(Error::invalid(format!("Step {id} submitted twice")));
                }
                Some(id) => StepKey::Stored(id),
                None => draft.next_key(),
            };
            // A step that is not outsourced has no provider
            let (provider_id, outsource_provider) = if step.is_outsource {
                (step.provider_id, step.outsource_provider)
            } else {
                (None, None)
            };
            steps.push(DraftStep {
                key,
                label: step.label,
                description: step.description,
                position: 0,
                is_completed: step.is_completed,
                is_outsource: step.is_outsource,
                provider_id,
                outsource_provider,
                expiry_date: step.expiry_date,
            });
        }

        draft.steps = steps;
        draft.reindex();
        Ok(draft)
    }

    /// Application the draft belongs to.
    #[must_use]
    pub const fn application_id(&self) -> i64 {
        self.application_id
    }

    /// Steps in display order.
    #[must_use]
    pub fn steps(&self) -> &[DraftStep] {
        &self.steps
    }

    /// Stored steps the draft was opened from, in position order.
    #[must_use]
    pub fn original(&self) -> &[application_step::Model] {
        &self.original
    }

    /// Looks a step up by key.
    #[must_use]
    pub fn step(&self, key: StepKey) -> Option<&DraftStep> {
        self.steps.iter().find(|s| s.key == key)
    }

    /// Appends a `New Step` at the end and returns its temporary key.
    pub fn add_step(&mut self) -> StepKey {
        self.add_step_with_label(NEW_STEP_LABEL)
    }

    /// Appends a step with the given label and returns its temporary key.
    pub fn add_step_with_label(&mut self, label: &str) -> StepKey {
        let key = self.next_key();
        self.steps.push(DraftStep {
            key,
            label: label.to_string(),
            description: None,
            position: 0,
            is_completed: false,
            is_outsource: false,
            provider_id: None,
            outsource_provider: None,
            expiry_date: None,
        });
        self.reindex();
        key
    }

    /// Removes a step; returns whether it was present.
    pub fn remove_step(&mut self, key: StepKey) -> bool {
        let before = self.steps.len();
        self.steps.retain(|s| s.key != key);
        self.reindex();
        self.steps.len() != before
    }

    /// Moves the step at `index` one place up or down.
    ///
    /// Returns `false` without changing anything when the move would leave the list.
    pub fn move_step(&mut self, index: usize, direction: Direction) -> bool {
        let target = match direction {
            Direction::Up => index.checked_sub(1),
            Direction::Down => index.checked_add(1),
        };
        let Some(target) = target else {
            return false;
        };
        if index >= self.steps.len() || target >= self.steps.len() {
            return false;
        }

        let moved = self.steps.remove(index);
        self.steps.insert(target, moved);
        self.reindex();
        true
    }

    /// Renames a step.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn set_label(&mut self, key: StepKey, label: impl Into<String>) -> Result<()> {
        self.step_mut(key)?.label = label.into();
        Ok(())
    }

    /// Flips a step's completion flag and returns the new value.
    ///
    /// Completion is not gated: any step can be toggled regardless of its neighbours.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn toggle_completed(&mut self, key: StepKey) -> Result<bool> {
        let step = self.step_mut(key)?;
        step.is_completed = !step.is_completed;
        Ok(step.is_completed)
    }

    /// Sets a step's completion flag.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn set_completed(&mut self, key: StepKey, completed: bool) -> Result<()> {
        self.step_mut(key)?.is_completed = completed;
        Ok(())
    }

    /// Turns outsourcing on or off. Turning it off also clears the provider.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn set_outsource(&mut self, key: StepKey, outsource: bool) -> Result<()> {
        let step = self.step_mut(key)?;
        step.is_outsource = outsource;
        if !outsource {
            step.provider_id = None;
            step.outsource_provider = None;
        }
        Ok(())
    }

    /// Assigns (or with `None` unassigns) a provider; assigning marks the step outsourced.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn assign_provider(&mut self, key: StepKey, provider: Option<(i64, String)>) -> Result<()> {
        let step = self.step_mut(key)?;
        match provider {
            Some((id, name)) => {
                step.is_outsource = true;
                step.provider_id = Some(id);
                step.outsource_provider = Some(name);
            }
            None => {
                step.provider_id = None;
                step.outsource_provider = None;
            }
        }
        Ok(())
    }

    /// Sets or clears a step's due date.
    ///
    /// # Errors
    /// Returns `Error::NotFound` when the key is not in the draft.
    pub fn set_expiry_date(&mut self, key: StepKey, date: Option<NaiveDate>) -> Result<()> {
        self.step_mut(key)?.expiry_date = date;
        Ok(())
    }

    /// Progress of the draft as it stands.
    #[must_use]
    pub fn progress(&self) -> i32 {
        progress_of(&self.steps)
    }

    /// Key of the first incomplete step.
    #[must_use]
    pub fn active_step(&self) -> Option<StepKey> {
        active_index(&self.steps).map(|i| self.steps[i].key)
    }

    /// Display state of every step in order.
    #[must_use]
    pub fn states(&self) -> Vec<StepState> {
        step_states(&self.steps)
    }

    /// Computes the delete/update/insert sets needed to persist the draft.
    #[must_use]
    pub fn diff(&self) -> StepDiff {
        let kept: HashSet<i64> = self
            .steps
            .iter()
            .filter_map(|s| match s.key {
                StepKey::Stored(id) => Some(id),
                StepKey::Temporary(_) => None,
            })
            .collect();

        let removed = self
            .original
            .iter()
            .map(|s| s.id)
            .filter(|id| !kept.contains(id))
            .collect();

        let mut diff = StepDiff {
            removed,
            ..StepDiff::default()
        };
        for step in &self.steps {
            match step.key {
                StepKey::Stored(id) => diff.updated.push((id, step.clone())),
                StepKey::Temporary(_) => diff.inserted.push(step.clone()),
            }
        }
        diff
    }

    /// Stored steps that were incomplete when the draft was opened and are complete now.
    #[must_use]
    pub fn newly_completed(&self) -> Vec<CompletedStep> {
        self.steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| {
                let StepKey::Stored(id) = step.key else {
                    return None;
                };
                if !step.is_completed {
                    return None;
                }
                let was_open = self
                    .original
                    .iter()
                    .any(|o| o.id == id && !o.is_completed);
                was_open.then(|| CompletedStep {
                    step_id: id,
                    label: step.label.clone(),
                    step_number: index + 1,
                })
            })
            .collect()
    }

    fn next_key(&mut self) -> StepKey {
        self.next_temporary += 1;
        StepKey::Temporary(self.next_temporary)
    }

    fn step_mut(&mut self, key: StepKey) -> Result<&mut DraftStep> {
        self.steps
            .iter_mut()
            .find(|s| s.key == key)
            .ok_or_else(|| Error::NotFound {
                entity: "Step",
                id: format!("{key:?}"),
            })
    }

    fn reindex(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            step.position = i32::try_from(index).unwrap_or(i32::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::Utc;

    fn stored(id: i64, label: &str, position: i32, completed: bool) -> application_step::Model {
        application_step::Model {
            id,
            application_id: 1,
            label: label.to_string(),
            description: None,
            position,
            is_completed: completed,
            is_outsource: false,
            provider_id: None,
            outsource_provider: None,
            expiry_date: None,
            created_at: Utc::now(),
        }
    }

    fn labels(draft: &WorkflowDraft) -> Vec<&str> {
        draft.steps().iter().map(|s| s.label.as_str()).collect()
    }

    fn assert_contiguous(draft: &WorkflowDraft) {
        for (index, step) in draft.steps().iter().enumerate() {
            assert_eq!(step.position, i32::try_from(index).unwrap());
        }
    }

    #[test]
    fn test_progress_rounding() {
        assert_eq!(calculate_progress(0, 0), 0);
        assert_eq!(calculate_progress(0, 4), 0);
        assert_eq!(calculate_progress(1, 3), 33);
        assert_eq!(calculate_progress(2, 3), 67);
        assert_eq!(calculate_progress(1, 8), 13);
        assert_eq!(calculate_progress(5, 5), 100);
    }

    #[test]
    fn test_open_sorts_and_reindexes() {
        let draft = WorkflowDraft::open(
            1,
            vec![
                stored(10, "c", 7, false),
                stored(11, "a", 2, false),
                stored(12, "b", 5, false),
            ],
        );
        assert_eq!(labels(&draft), ["a", "b", "c"]);
        assert_contiguous(&draft);
    }

    #[test]
    fn test_move_step_keeps_positions_contiguous() {
        let mut draft = WorkflowDraft::open(
            1,
            vec![
                stored(1, "a", 0, false),
                stored(2, "b", 1, false),
                stored(3, "c", 2, false),
            ],
        );

        assert!(draft.move_step(2, Direction::Up));
        assert_eq!(labels(&draft), ["a", "c", "b"]);
        assert_contiguous(&draft);

        assert!(draft.move_step(0, Direction::Down));
        assert_eq!(labels(&draft), ["c", "a", "b"]);
        assert_contiguous(&draft);

        assert!(!draft.move_step(0, Direction::Up));
        assert!(!draft.move_step(2, Direction::Down));
        assert!(!draft.move_step(9, Direction::Up));
        assert_eq!(labels(&draft), ["c", "a", "b"]);
    }

    #[test]
    fn test_add_and_remove_reindex() {
        let mut draft =
            WorkflowDraft::open(1, vec![stored(1, "a", 0, false), stored(2, "b", 1, false)]);

        let added = draft.add_step();
        assert!(matches!(added, StepKey::Temporary(_)));
        assert_eq!(draft.step(added).unwrap().label, NEW_STEP_LABEL);
        assert_eq!(draft.step(added).unwrap().position, 2);

        assert!(draft.remove_step(StepKey::Stored(1)));
        assert!(!draft.remove_step(StepKey::Stored(1)));
        assert_eq!(labels(&draft), ["b", NEW_STEP_LABEL]);
        assert_contiguous(&draft);
    }

    #[test]
    fn test_temporary_keys_are_unique() {
        let mut draft = WorkflowDraft::open(1, Vec::new());
        let first = draft.add_step();
        let second = draft.add_step();
        assert_ne!(first, second);
    }

    #[test]
    fn test_toggle_does_not_touch_other_steps() {
        let mut draft = WorkflowDraft::open(
            1,
            vec![
                stored(1, "a", 0, false),
                stored(2, "b", 1, true),
                stored(3, "c", 2, false),
            ],
        );
        let before: Vec<DraftStep> = draft.steps().to_vec();

        assert!(draft.toggle_completed(StepKey::Stored(3)).unwrap());

        let after = draft.steps();
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[1]);
        assert!(after[2].is_completed);
    }

    #[test]
    fn test_active_step_and_states() {
        let mut steps = vec![
            stored(1, "a", 0, true),
            stored(2, "b", 1, false),
            stored(3, "c", 2, true),
            stored(4, "d", 3, false),
        ];
        steps[3].is_outsource = true;
        let draft = WorkflowDraft::open(1, steps);

        assert_eq!(draft.active_step(), Some(StepKey::Stored(2)));
        assert_eq!(
            draft.states(),
            [
                StepState::Completed,
                StepState::Running,
                StepState::Completed,
                StepState::Outsourced
            ]
        );
        assert_eq!(draft.progress(), 50);
    }

    #[test]
    fn test_clearing_outsource_clears_provider() {
        let mut draft = WorkflowDraft::open(1, vec![stored(1, "a", 0, false)]);
        let key = StepKey::Stored(1);

        draft
            .assign_provider(key, Some((7, "Typing Centre".to_string())))
            .unwrap();
        let step = draft.step(key).unwrap();
        assert!(step.is_outsource);
        assert_eq!(step.provider_id, Some(7));

        draft.set_outsource(key, false).unwrap();
        let step = draft.step(key).unwrap();
        assert!(!step.is_outsource);
        assert_eq!(step.provider_id, None);
        assert_eq!(step.outsource_provider, None);
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let mut draft = WorkflowDraft::open(1, Vec::new());
        let result = draft.set_label(StepKey::Stored(99), "x");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_diff_partitions_steps() {
        // A is new, B is removed, C is kept
        let mut draft =
            WorkflowDraft::open(1, vec![stored(20, "B", 0, false), stored(30, "C", 1, false)]);
        let a = draft.add_step_with_label("A");
        draft.move_step(2, Direction::Up);
        draft.move_step(1, Direction::Up);
        draft.remove_step(StepKey::Stored(20));

        let diff = draft.diff();
        assert_eq!(diff.removed, [20]);
        assert_eq!(diff.updated.len(), 1);
        assert_eq!(diff.updated[0].0, 30);
        assert_eq!(diff.updated[0].1.position, 1);
        assert_eq!(diff.inserted.len(), 1);
        assert_eq!(diff.inserted[0].key, a);
        assert_eq!(diff.inserted[0].position, 0);
    }

    #[test]
    fn test_newly_completed_skips_temporary_and_already_done() {
        let mut draft = WorkflowDraft::open(
            1,
            vec![
                stored(1, "done before", 0, true),
                stored(2, "done now", 1, false),
                stored(3, "still open", 2, false),
            ],
        );
        let temp = draft.add_step();
        draft.set_completed(temp, true).unwrap();
        draft.set_completed(StepKey::Stored(2), true).unwrap();

        let completed = draft.newly_completed();
        assert_eq!(
            completed,
            [CompletedStep {
                step_id: 2,
                label: "done now".to_string(),
                step_number: 2,
            }]
        );
    }

    #[test]
    fn test_from_submission_validates_ids() {
        let original = vec![stored(1, "a", 0, false), stored(2, "b", 1, false)];
        let submitted = |id: Option<i64>| SubmittedStep {
            id,
            label: "x".to_string(),
            description: None,
            is_completed: false,
            is_outsource: false,
            provider_id: None,
            outsource_provider: None,
            expiry_date: None,
        };

        let draft = WorkflowDraft::from_submission(
            1,
            original.clone(),
            vec![submitted(Some(2)), submitted(None)],
        )
        .unwrap();
        let diff = draft.diff();
        assert_eq!(diff.removed, [1]);
        assert_eq!(diff.updated[0].0, 2);
        assert_eq!(diff.inserted.len(), 1);
        assert_contiguous(&draft);

        let foreign =
            WorkflowDraft::from_submission(1, original.clone(), vec![submitted(Some(99))]);
        assert!(matches!(foreign, Err(Error::Config { .. })));

        let twice = WorkflowDraft::from_submission(
            1,
            original,
            vec![submitted(Some(1)), submitted(Some(1))],
        );
        assert!(matches!(twice, Err(Error::Config { .. })));
    }

    #[test]
    fn test_from_submission_drops_provider_of_in_house_steps() {
        let original = vec![stored(1, "a", 0, false)];
        let submitted = |is_outsource: bool| SubmittedStep {
            id: Some(1),
            label: "a".to_string(),
            description: None,
            is_completed: false,
            is_outsource,
            provider_id: Some(7),
            outsource_provider: Some("Amer Centre".to_string()),
            expiry_date: None,
        };

        let draft =
            WorkflowDraft::from_submission(1, original.clone(), vec![submitted(false)]).unwrap();
        let step = &draft.steps()[0];
        assert!(!step.is_outsource);
        assert_eq!(step.provider_id, None);
        assert_eq!(step.outsource_provider, None);

        let draft = WorkflowDraft::from_submission(1, original, vec![submitted(true)]).unwrap();
        assert_eq!(draft.steps()[0].provider_id, Some(7));
    }
}
