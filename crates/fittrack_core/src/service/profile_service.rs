//! User profile and body-weight use-cases.

use crate::analytics::trend::{classify_weight_trend, weight_change, TrendDirection};
use crate::model::profile::{UserProfile, WeightEntry, WeightEntryId};
use crate::model::validation::ModelValidationError;
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::RepoError;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProfileServiceError {
    WeightEntryNotFound(WeightEntryId),
    Validation(ModelValidationError),
    Repo(RepoError),
}

impl Display for ProfileServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeightEntryNotFound(id) => write!(f, "weight entry not found: {id}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProfileServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::WeightEntryNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ProfileServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::WeightEntryNotFound(id),
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ModelValidationError> for ProfileServiceError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Direction and size of body-weight change over the latest entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightTrend {
    pub direction: TrendDirection,
    pub change_kg: f64,
    /// Entries the trend was computed from.
    pub samples: usize,
}

pub struct ProfileService<R: ProfileRepository> {
    repo: R,
}

impl<R: ProfileRepository> ProfileService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_profile(&self) -> Result<UserProfile, ProfileServiceError> {
        Ok(self.repo.get_profile()?)
    }

    pub fn update_profile(&self, profile: &UserProfile) -> Result<UserProfile, ProfileServiceError> {
        profile.validate()?;
        self.repo.save_profile(profile)?;
        Ok(self.repo.get_profile()?)
    }

    /// Records one body-weight measurement in kilograms.
    pub fn log_weight(
        &self,
        weight_kg: f64,
        recorded_at: i64,
        note: Option<&str>,
    ) -> Result<WeightEntry, ProfileServiceError> {
        let mut entry = WeightEntry::new(weight_kg, recorded_at);
        entry.note = note
            .map(str::trim)
            .filter(|note| !note.is_empty())
            .map(str::to_string);
        entry.validate()?;
        self.repo.add_weight_entry(&entry)?;
        Ok(entry)
    }

    /// Newest entries first.
    pub fn weight_history(&self, limit: Option<u32>) -> Result<Vec<WeightEntry>, ProfileServiceError> {
        Ok(self.repo.list_weight_entries(None, limit)?)
    }

    pub fn delete_weight_entry(&self, id: WeightEntryId) -> Result<(), ProfileServiceError> {
        Ok(self.repo.delete_weight_entry(id)?)
    }

    /// Trend over the newest `window` entries.
    pub fn weight_trend(&self, window: u32) -> Result<WeightTrend, ProfileServiceError> {
        let entries = self.repo.list_weight_entries(None, Some(window))?;
        let change_kg = weight_change(&entries);
        Ok(WeightTrend {
            direction: classify_weight_trend(change_kg),
            change_kg,
            samples: entries.len(),
        })
    }
}
