//! Personal records per exercise.

use crate::model::exercise::ExerciseId;
use crate::repo::workout_repo::LoggedSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Best performances of one exercise across logged history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalRecord {
    pub exercise_id: ExerciseId,
    pub heaviest_weight_kg: f64,
    pub most_reps: u32,
    /// Epley estimate of the best set.
    pub best_estimated_one_rep_max: f64,
    pub best_set_volume: f64,
    /// Workout start of the set holding the best estimated one-rep max.
    pub achieved_at: i64,
}

/// Folds logged sets into one record per exercise, ordered by exercise ID.
///
/// Warmups and incomplete sets are skipped.
pub fn personal_records(sets: &[LoggedSet]) -> Vec<PersonalRecord> {
    let mut records: BTreeMap<ExerciseId, PersonalRecord> = BTreeMap::new();
    for logged in sets.iter().filter(|logged| logged.set.counts_toward_totals()) {
        let set = &logged.set;
        let e1rm = set.estimated_one_rep_max();
        let record = records
            .entry(logged.exercise_id)
            .or_insert_with(|| PersonalRecord {
                exercise_id: logged.exercise_id,
                heaviest_weight_kg: set.weight_kg,
                most_reps: set.reps,
                best_estimated_one_rep_max: e1rm,
                best_set_volume: set.volume(),
                achieved_at: logged.workout_started_at,
            });

        record.heaviest_weight_kg = record.heaviest_weight_kg.max(set.weight_kg);
        record.most_reps = record.most_reps.max(set.reps);
        record.best_set_volume = record.best_set_volume.max(set.volume());
        if e1rm > record.best_estimated_one_rep_max {
            record.best_estimated_one_rep_max = e1rm;
            record.achieved_at = logged.workout_started_at;
        }
    }
    records.into_values().collect()
}
