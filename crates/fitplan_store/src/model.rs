//! Entity model: splits own workouts, workouts own exercises; workout days point at
//! workouts by id only.

use std::collections::HashSet;
use std::ops::Add;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{PlanError, PlanResult};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "deserialize_opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

impl Workout {
    pub(crate) fn exercise_mut(&mut self, exercise_id: &str) -> Option<&mut Exercise> {
        self.exercises.iter_mut().find(|e| e.id == exercise_id)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSplit {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub workouts: Vec<Workout>,
    #[serde(default)]
    pub is_current: bool,
}

impl WorkoutSplit {
    pub fn workout(&self, workout_id: &str) -> Option<&Workout> {
        self.workouts.iter().find(|w| w.id == workout_id)
    }

    pub(crate) fn workout_mut(&mut self, workout_id: &str) -> Option<&mut Workout> {
        self.workouts.iter_mut().find(|w| w.id == workout_id)
    }
}

/// Weak reference from a [`WorkoutDay`] to a [`Workout`] owned by some split.
///
/// Only the id is stored. The workout may be edited or deleted after the reference
/// was taken, so every read goes through [`WorkoutRef::resolve`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct WorkoutRef(#[serde(deserialize_with = "deserialize_id")] String);

impl WorkoutRef {
    pub fn new(workout_id: impl Into<String>) -> Self {
        Self(workout_id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    /// Full scan of every split's workout list.
    pub fn resolve<'a>(&self, splits: &'a [WorkoutSplit]) -> Option<&'a Workout> {
        splits.iter().find_map(|split| split.workout(&self.0))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDay {
    pub date: NaiveDate,
    #[serde(rename = "workoutId")]
    pub workout: WorkoutRef,
    #[serde(default)]
    pub completed: bool,
}

/// Grams of protein, carbs and fat plus calories.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub calories: f64,
}

impl Macros {
    pub fn new(protein: f64, carbs: f64, fat: f64, calories: f64) -> Self {
        Self {
            protein,
            carbs,
            fat,
            calories,
        }
    }

    pub fn is_valid(&self) -> bool {
        [self.protein, self.carbs, self.fat, self.calories]
            .into_iter()
            .all(is_non_negative)
    }

    pub(crate) fn validate(&self) -> PlanResult<()> {
        let fields = [
            ("protein", self.protein),
            ("carbs", self.carbs),
            ("fat", self.fat),
            ("calories", self.calories),
        ];
        for (field, value) in fields {
            if !is_non_negative(value) {
                return Err(PlanError::Validation(format!(
                    "{field} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Add for Macros {
    type Output = Macros;

    fn add(self, rhs: Macros) -> Macros {
        Macros {
            protein: self.protein + rhs.protein,
            carbs: self.carbs + rhs.carbs,
            fat: self.fat + rhs.fat,
            calories: self.calories + rhs.calories,
        }
    }
}

impl std::iter::Sum for Macros {
    fn sum<I: Iterator<Item = Macros>>(iter: I) -> Self {
        iter.fold(Macros::default(), Add::add)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MacroEntry {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub macros: Macros,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPhoto {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub uri: String,
    pub date: NaiveDate,
    pub body_part: String,
    pub pose: String,
}

/// Weak reference from a [`Client`] to the split they were assigned.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SplitRef(String);

impl SplitRef {
    pub fn new(split_id: impl Into<String>) -> Self {
        Self(split_id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }

    pub fn resolve<'a>(&self, splits: &'a [WorkoutSplit]) -> Option<&'a WorkoutSplit> {
        splits.iter().find(|split| split.id == self.0)
    }
}

/// A coached client with macro targets and an optional assigned split.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub macros: Macros,
    /// Written as `""` when unassigned, which is what the mobile app stores.
    #[serde(
        default,
        deserialize_with = "deserialize_split_ref",
        serialize_with = "serialize_split_ref"
    )]
    pub workout_split: Option<SplitRef>,
}

/// Input for adding or replacing an exercise. Defaults match the exercise form:
/// 3 sets of 10 reps at zero weight.
#[derive(Clone, Debug, PartialEq)]
pub struct NewExercise {
    pub name: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
    pub notes: Option<String>,
}

impl Default for NewExercise {
    fn default() -> Self {
        Self {
            name: String::new(),
            sets: 3,
            reps: 10,
            weight: 0.0,
            notes: None,
        }
    }
}

impl NewExercise {
    pub fn new(name: impl Into<String>, sets: u32, reps: u32, weight: f64) -> Self {
        Self {
            name: name.into(),
            sets,
            reps,
            weight,
            notes: None,
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub(crate) fn into_exercise(self, id: String) -> PlanResult<Exercise> {
        let exercise = Exercise {
            id,
            name: self.name.trim().to_string(),
            sets: self.sets,
            reps: self.reps,
            weight: self.weight,
            notes: clean_optional(self.notes.as_deref()),
        };
        validate_exercise(&exercise)?;
        Ok(exercise)
    }
}

pub fn is_valid_exercise(exercise: &Exercise) -> bool {
    validate_exercise(exercise).is_ok()
}

/// Name present, exercises valid and exercise ids unique within the workout.
pub fn is_valid_workout(workout: &Workout) -> bool {
    has_text(&workout.name)
        && workout.exercises.iter().all(is_valid_exercise)
        && unique_ids(workout.exercises.iter().map(|e| e.id.as_str()))
}

/// Name present, workouts valid and workout ids unique within the split.
pub fn is_valid_split(split: &WorkoutSplit) -> bool {
    has_text(&split.name)
        && split.workouts.iter().all(is_valid_workout)
        && unique_ids(split.workouts.iter().map(|w| w.id.as_str()))
}

pub fn is_valid_progress_photo(photo: &ProgressPhoto) -> bool {
    has_text(&photo.uri) && has_text(&photo.body_part) && has_text(&photo.pose)
}

pub fn is_valid_client(client: &Client) -> bool {
    has_text(&client.name) && validate_email(&client.email).is_ok() && client.macros.is_valid()
}

/// Trimmed email with a single `@` between a non-empty local part and domain.
pub(crate) fn validate_email(value: &str) -> PlanResult<String> {
    let email = require_text("client email", value)?;
    let well_formed = !email.contains(char::is_whitespace)
        && matches!(email.split_once('@'), Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
    if !well_formed {
        return Err(PlanError::Validation(format!("invalid client email {email:?}")));
    }
    Ok(email)
}

pub(crate) fn validate_exercise(exercise: &Exercise) -> PlanResult<()> {
    if !has_text(&exercise.name) {
        return Err(PlanError::Validation("exercise name must not be empty".into()));
    }
    if exercise.sets == 0 {
        return Err(PlanError::Validation("sets must be a positive integer".into()));
    }
    if exercise.reps == 0 {
        return Err(PlanError::Validation("reps must be a positive integer".into()));
    }
    if !is_non_negative(exercise.weight) {
        return Err(PlanError::Validation(format!(
            "weight must be a finite non-negative number, got {}",
            exercise.weight
        )));
    }
    Ok(())
}

/// Trimmed copy of a required text field, or a validation error naming the field.
pub(crate) fn require_text(field: &str, value: &str) -> PlanResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PlanError::Validation(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn clean_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    ids.into_iter().all(|id| seen.insert(id))
}

/// Ids written by older builds may be bare numbers.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Blank optional text is stored as absent.
fn deserialize_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn deserialize_split_ref<'de, D>(deserializer: D) -> Result<Option<SplitRef>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_text(deserializer)?.map(SplitRef))
}

fn serialize_split_ref<S>(value: &Option<SplitRef>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_ref().map_or("", SplitRef::id))
}
