//! Planning Store: owns the persisted collections and runs every mutation as
//! validate → apply to a copy → persist, publishing the copy only once the write lands.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::calendar::{CalendarIndex, DayMarker};
use crate::config::Config;
use crate::ids::IdGenerator;
use crate::kv::{FileKeyValueStore, KeyValueStore};
use crate::model::{
    Client, Exercise, MacroEntry, Macros, NewExercise, ProgressPhoto, SplitRef, Workout,
    WorkoutDay, WorkoutRef, WorkoutSplit, clean_optional, require_text, validate_email,
};
use crate::persistence::{CollectionKey, PersistenceAdapter};
use crate::utils::week_bounds;
use crate::{PlanError, PlanResult};

pub const DEFAULT_BODY_PART: &str = "Full Body";
pub const DEFAULT_POSE: &str = "Front";

/// In-memory copy of one persisted collection.
///
/// `write_gate` serializes mutations of this collection until their write settles.
/// Readers only take `state` and are never blocked by an in-flight write.
struct Collection<T> {
    key: CollectionKey,
    state: RwLock<T>,
    write_gate: Arc<Mutex<()>>,
}

impl<T: Clone> Collection<T> {
    fn new(key: CollectionKey, value: T) -> Arc<Self> {
        Arc::new(Self {
            key,
            state: RwLock::new(value),
            write_gate: Arc::new(Mutex::new(())),
        })
    }

    async fn snapshot(&self) -> T {
        self.state.read().await.clone()
    }
}

/// A workout day together with the workout it points at, if that still exists.
#[derive(Clone, Debug, PartialEq)]
pub struct ScheduledWorkout {
    pub day: WorkoutDay,
    pub workout: Option<Workout>,
}

pub struct PlanningStore {
    adapter: PersistenceAdapter,
    ids: IdGenerator,
    splits: Arc<Collection<Vec<WorkoutSplit>>>,
    workout_days: Arc<Collection<BTreeMap<NaiveDate, WorkoutDay>>>,
    macro_entries: Arc<Collection<Vec<MacroEntry>>>,
    progress_photos: Arc<Collection<Vec<ProgressPhoto>>>,
    clients: Arc<Collection<Vec<Client>>>,
}

impl PlanningStore {
    /// Load every collection from `kv`. The store accepts no operation before this
    /// returns.
    pub async fn open(kv: Arc<dyn KeyValueStore>) -> PlanResult<Self> {
        Self::open_with_adapter(PersistenceAdapter::new(kv)).await
    }

    pub async fn open_with_config(config: &Config) -> PlanResult<Self> {
        let kv = FileKeyValueStore::open(&config.data_dir).await?;
        let adapter =
            PersistenceAdapter::new(Arc::new(kv)).with_prefix(config.key_prefix.clone());
        Self::open_with_adapter(adapter).await
    }

    pub async fn open_with_adapter(adapter: PersistenceAdapter) -> PlanResult<Self> {
        let splits: Vec<WorkoutSplit> = adapter.load(CollectionKey::Splits).await?;
        let workout_days: BTreeMap<NaiveDate, WorkoutDay> =
            adapter.load(CollectionKey::WorkoutDays).await?;
        let macro_entries: Vec<MacroEntry> = adapter.load(CollectionKey::MacroEntries).await?;
        let progress_photos: Vec<ProgressPhoto> =
            adapter.load(CollectionKey::ProgressPhotos).await?;
        let clients: Vec<Client> = adapter.load(CollectionKey::Clients).await?;

        let ids = IdGenerator::new();
        for split in &splits {
            ids.observe(&split.id);
            for workout in &split.workouts {
                ids.observe(&workout.id);
                workout.exercises.iter().for_each(|e| ids.observe(&e.id));
            }
        }
        macro_entries.iter().for_each(|e| ids.observe(&e.id));
        progress_photos.iter().for_each(|p| ids.observe(&p.id));
        clients.iter().for_each(|c| ids.observe(&c.id));

        info!(
            splits = splits.len(),
            workout_days = workout_days.len(),
            macro_entries = macro_entries.len(),
            progress_photos = progress_photos.len(),
            clients = clients.len(),
            "planning store loaded"
        );

        Ok(Self {
            adapter,
            ids,
            splits: Collection::new(CollectionKey::Splits, splits),
            workout_days: Collection::new(CollectionKey::WorkoutDays, workout_days),
            macro_entries: Collection::new(CollectionKey::MacroEntries, macro_entries),
            progress_photos: Collection::new(CollectionKey::ProgressPhotos, progress_photos),
            clients: Collection::new(CollectionKey::Clients, clients),
        })
    }

    /// Apply `apply` to a copy of the collection, persist the copy, then publish it.
    ///
    /// An error from `apply` leaves the collection untouched. The write and the publish
    /// run in a spawned task that holds the write gate, so a caller that stops waiting
    /// (timeout, `select!`, aborted task) cannot leave memory ahead of or behind the
    /// substrate. A failed write leaves the last persisted state in place.
    async fn mutate<T, R, F>(
        &self,
        collection: &Arc<Collection<T>>,
        op: &'static str,
        apply: F,
    ) -> PlanResult<R>
    where
        T: Clone + Serialize + Send + Sync + 'static,
        F: FnOnce(&mut T) -> PlanResult<R>,
    {
        let gate = Arc::clone(&collection.write_gate).lock_owned().await;
        let mut next = collection.snapshot().await;
        let out = apply(&mut next)?;

        let adapter = self.adapter.clone();
        let target = Arc::clone(collection);
        let write = tokio::spawn(async move {
            let _gate = gate;
            if let Err(e) = adapter.save(target.key, &next).await {
                warn!(
                    collection = %target.key,
                    op,
                    error = %e,
                    "write failed; keeping last persisted state"
                );
                return Err(e);
            }
            *target.state.write().await = next;
            debug!(collection = %target.key, op, "persisted");
            Ok(())
        });

        match write.await {
            Ok(Ok(())) => Ok(out),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(PlanError::Persistence(format!(
                "{op} on {} did not complete: {e}",
                collection.key
            ))),
        }
    }

    // === Splits ===

    pub async fn create_split(&self, name: &str, description: &str) -> PlanResult<WorkoutSplit> {
        let split = WorkoutSplit {
            id: self.ids.next_id(),
            name: require_text("split name", name)?,
            description: description.trim().to_string(),
            workouts: Vec::new(),
            is_current: false,
        };
        let created = split.clone();
        self.mutate(&self.splits, "create_split", move |splits| {
            splits.push(split);
            Ok(())
        })
        .await?;
        Ok(created)
    }

    pub async fn update_split(
        &self,
        split_id: &str,
        name: &str,
        description: &str,
    ) -> PlanResult<WorkoutSplit> {
        let name = require_text("split name", name)?;
        let description = description.trim().to_string();
        self.mutate(&self.splits, "update_split", move |splits| {
            let split = find_split_mut(splits, split_id)?;
            split.name = name;
            split.description = description;
            Ok(split.clone())
        })
        .await
    }

    /// Make `split_id` the only current split, in a single write.
    pub async fn set_current_split(&self, split_id: &str) -> PlanResult<WorkoutSplit> {
        self.mutate(&self.splits, "set_current_split", move |splits| {
            find_split_mut(splits, split_id)?;
            for split in splits.iter_mut() {
                split.is_current = split.id == split_id;
            }
            find_split_mut(splits, split_id).map(|s| s.clone())
        })
        .await
    }

    /// Remove a split with all its workouts and exercises. Deleting the current split
    /// leaves no split current.
    pub async fn delete_split(&self, split_id: &str) -> PlanResult<WorkoutSplit> {
        self.mutate(&self.splits, "delete_split", move |splits| {
            let index = splits
                .iter()
                .position(|s| s.id == split_id)
                .ok_or_else(|| PlanError::not_found("split", split_id))?;
            Ok(splits.remove(index))
        })
        .await
    }

    // === Workouts ===

    pub async fn add_workout(&self, split_id: &str, name: &str) -> PlanResult<Workout> {
        self.add_workout_with_description(split_id, name, None).await
    }

    pub async fn add_workout_with_description(
        &self,
        split_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> PlanResult<Workout> {
        let workout = Workout {
            id: self.ids.next_id(),
            name: require_text("workout name", name)?,
            description: clean_optional(description),
            exercises: Vec::new(),
        };
        self.mutate(&self.splits, "add_workout", move |splits| {
            let split = find_split_mut(splits, split_id)?;
            split.workouts.push(workout.clone());
            Ok(workout)
        })
        .await
    }

    pub async fn update_workout(
        &self,
        split_id: &str,
        workout_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> PlanResult<Workout> {
        let name = require_text("workout name", name)?;
        let description = clean_optional(description);
        self.mutate(&self.splits, "update_workout", move |splits| {
            let workout = find_workout_mut(splits, split_id, workout_id)?;
            workout.name = name;
            workout.description = description;
            Ok(workout.clone())
        })
        .await
    }

    pub async fn delete_workout(&self, split_id: &str, workout_id: &str) -> PlanResult<Workout> {
        self.mutate(&self.splits, "delete_workout", move |splits| {
            let split = find_split_mut(splits, split_id)?;
            let index = split
                .workouts
                .iter()
                .position(|w| w.id == workout_id)
                .ok_or_else(|| PlanError::not_found("workout", workout_id))?;
            Ok(split.workouts.remove(index))
        })
        .await
    }

    // === Exercises ===

    pub async fn add_exercise(
        &self,
        split_id: &str,
        workout_id: &str,
        exercise: NewExercise,
    ) -> PlanResult<Exercise> {
        let exercise = exercise.into_exercise(self.ids.next_id())?;
        self.mutate(&self.splits, "add_exercise", move |splits| {
            let workout = find_workout_mut(splits, split_id, workout_id)?;
            workout.exercises.push(exercise.clone());
            Ok(exercise)
        })
        .await
    }

    /// Replace an exercise's fields in place; id and position are kept.
    pub async fn update_exercise(
        &self,
        split_id: &str,
        workout_id: &str,
        exercise_id: &str,
        exercise: NewExercise,
    ) -> PlanResult<Exercise> {
        let updated = exercise.into_exercise(exercise_id.to_string())?;
        self.mutate(&self.splits, "update_exercise", move |splits| {
            let workout = find_workout_mut(splits, split_id, workout_id)?;
            let slot = workout
                .exercise_mut(exercise_id)
                .ok_or_else(|| PlanError::not_found("exercise", exercise_id))?;
            *slot = updated.clone();
            Ok(updated)
        })
        .await
    }

    pub async fn delete_exercise(
        &self,
        split_id: &str,
        workout_id: &str,
        exercise_id: &str,
    ) -> PlanResult<Exercise> {
        self.mutate(&self.splits, "delete_exercise", move |splits| {
            let workout = find_workout_mut(splits, split_id, workout_id)?;
            let index = workout
                .exercises
                .iter()
                .position(|e| e.id == exercise_id)
                .ok_or_else(|| PlanError::not_found("exercise", exercise_id))?;
            Ok(workout.exercises.remove(index))
        })
        .await
    }

    // === Scheduling ===

    /// Create or replace the workout day for `date`, not completed.
    pub async fn schedule_workout(
        &self,
        date: NaiveDate,
        workout_id: &str,
    ) -> PlanResult<WorkoutDay> {
        let workout = WorkoutRef::new(workout_id);
        if self.resolve_workout(workout_id).await.is_none() {
            return Err(PlanError::not_found("workout", workout_id));
        }
        let day = WorkoutDay {
            date,
            workout,
            completed: false,
        };
        self.mutate(&self.workout_days, "schedule_workout", move |days| {
            days.insert(date, day.clone());
            Ok(day)
        })
        .await
    }

    pub async fn toggle_completion(&self, date: NaiveDate) -> PlanResult<WorkoutDay> {
        self.mutate(&self.workout_days, "toggle_completion", move |days| {
            let day = days
                .get_mut(&date)
                .ok_or_else(|| PlanError::not_found("workout day", date))?;
            day.completed = !day.completed;
            Ok(day.clone())
        })
        .await
    }

    pub async fn unschedule_workout(&self, date: NaiveDate) -> PlanResult<WorkoutDay> {
        self.mutate(&self.workout_days, "unschedule_workout", move |days| {
            days.remove(&date)
                .ok_or_else(|| PlanError::not_found("workout day", date))
        })
        .await
    }

    /// Remove workout days whose workout no longer exists. Never run implicitly:
    /// deleting a workout leaves its days in place until this is called.
    pub async fn prune_dangling_workout_days(&self) -> PlanResult<Vec<NaiveDate>> {
        let splits = self.splits.snapshot().await;
        self.mutate(&self.workout_days, "prune_dangling_workout_days", move |days| {
            let dangling: Vec<NaiveDate> = days
                .values()
                .filter(|day| day.workout.resolve(&splits).is_none())
                .map(|day| day.date)
                .collect();
            for date in &dangling {
                days.remove(date);
            }
            Ok(dangling)
        })
        .await
    }

    /// Look a workout up across every split. `None` is the normal outcome for a
    /// workout day whose workout was deleted after scheduling.
    pub async fn resolve_workout(&self, workout_id: &str) -> Option<Workout> {
        let splits = self.splits.state.read().await;
        WorkoutRef::new(workout_id).resolve(&splits).cloned()
    }

    pub async fn scheduled_workout(&self, date: NaiveDate) -> Option<ScheduledWorkout> {
        let day = self.workout_day(date).await?;
        let workout = self.resolve_workout(day.workout.id()).await;
        Some(ScheduledWorkout { day, workout })
    }

    // === Nutrition & progress ===

    /// Append a macro entry. Entries on the same date are kept separate.
    pub async fn add_macro_entry(&self, date: NaiveDate, macros: Macros) -> PlanResult<MacroEntry> {
        macros.validate()?;
        let entry = MacroEntry {
            id: self.ids.next_id(),
            date,
            macros,
        };
        self.mutate(&self.macro_entries, "add_macro_entry", move |entries| {
            entries.push(entry.clone());
            Ok(entry)
        })
        .await
    }

    pub async fn add_progress_photo(
        &self,
        date: NaiveDate,
        uri: &str,
        body_part: Option<&str>,
        pose: Option<&str>,
    ) -> PlanResult<ProgressPhoto> {
        let photo = ProgressPhoto {
            id: self.ids.next_id(),
            uri: require_text("photo uri", uri)?,
            date,
            body_part: clean_optional(body_part).unwrap_or_else(|| DEFAULT_BODY_PART.to_string()),
            pose: clean_optional(pose).unwrap_or_else(|| DEFAULT_POSE.to_string()),
        };
        self.mutate(&self.progress_photos, "add_progress_photo", move |photos| {
            photos.push(photo.clone());
            Ok(photo)
        })
        .await
    }

    // === Coaching ===

    /// Append a coached client. `split_id`, when given, must name an existing split;
    /// the client keeps only a weak reference to it.
    pub async fn add_client(
        &self,
        name: &str,
        email: &str,
        targets: Macros,
        split_id: Option<&str>,
    ) -> PlanResult<Client> {
        let name = require_text("client name", name)?;
        let email = validate_email(email)?;
        targets.validate()?;
        let workout_split = match clean_optional(split_id) {
            Some(split_id) => {
                let splits = self.splits.state.read().await;
                if !splits.iter().any(|s| s.id == split_id) {
                    return Err(PlanError::not_found("split", split_id));
                }
                Some(SplitRef::new(split_id))
            }
            None => None,
        };
        let client = Client {
            id: self.ids.next_id(),
            name,
            email,
            macros: targets,
            workout_split,
        };
        self.mutate(&self.clients, "add_client", move |clients| {
            clients.push(client.clone());
            Ok(client)
        })
        .await
    }

    // === Clearing ===

    /// Empty one collection and persist the empty collection.
    pub async fn clear_collection(&self, key: CollectionKey) -> PlanResult<()> {
        match key {
            CollectionKey::Splits => self.mutate(&self.splits, "clear", clear).await,
            CollectionKey::WorkoutDays => self.mutate(&self.workout_days, "clear", clear).await,
            CollectionKey::MacroEntries => self.mutate(&self.macro_entries, "clear", clear).await,
            CollectionKey::ProgressPhotos => {
                self.mutate(&self.progress_photos, "clear", clear).await
            }
            CollectionKey::Clients => self.mutate(&self.clients, "clear", clear).await,
        }
    }

    /// Clear every collection in turn, stopping at the first failure. Collections
    /// already cleared stay cleared.
    pub async fn clear_all(&self) -> PlanResult<()> {
        for key in CollectionKey::ALL {
            self.clear_collection(key).await?;
        }
        info!("all collections cleared");
        Ok(())
    }

    // === Reads ===

    pub async fn splits(&self) -> Vec<WorkoutSplit> {
        self.splits.snapshot().await
    }

    pub async fn split(&self, split_id: &str) -> Option<WorkoutSplit> {
        let splits = self.splits.state.read().await;
        splits.iter().find(|s| s.id == split_id).cloned()
    }

    pub async fn current_split(&self) -> Option<WorkoutSplit> {
        let splits = self.splits.state.read().await;
        splits.iter().find(|s| s.is_current).cloned()
    }

    pub async fn workout_days(&self) -> BTreeMap<NaiveDate, WorkoutDay> {
        self.workout_days.snapshot().await
    }

    pub async fn workout_day(&self, date: NaiveDate) -> Option<WorkoutDay> {
        self.workout_days.state.read().await.get(&date).cloned()
    }

    /// Completed workout days in the Monday–Sunday week containing `date`.
    pub async fn completed_workouts_in_week(&self, date: NaiveDate) -> usize {
        let (monday, sunday) = week_bounds(date);
        let days = self.workout_days.state.read().await;
        days.range(monday..=sunday)
            .filter(|(_, day)| day.completed)
            .count()
    }

    pub async fn macro_entries(&self) -> Vec<MacroEntry> {
        self.macro_entries.snapshot().await
    }

    pub async fn macro_entries_for(&self, date: NaiveDate) -> Vec<MacroEntry> {
        let entries = self.macro_entries.state.read().await;
        entries.iter().filter(|e| e.date == date).cloned().collect()
    }

    /// Sum of the entries on `date`, computed on read.
    pub async fn macro_totals_for(&self, date: NaiveDate) -> Macros {
        let entries = self.macro_entries.state.read().await;
        entries
            .iter()
            .filter(|e| e.date == date)
            .map(|e| e.macros)
            .sum()
    }

    pub async fn progress_photos(&self) -> Vec<ProgressPhoto> {
        self.progress_photos.snapshot().await
    }

    pub async fn progress_photos_for(&self, date: NaiveDate) -> Vec<ProgressPhoto> {
        let photos = self.progress_photos.state.read().await;
        photos.iter().filter(|p| p.date == date).cloned().collect()
    }

    pub async fn clients(&self) -> Vec<Client> {
        self.clients.snapshot().await
    }

    pub async fn client(&self, client_id: &str) -> Option<Client> {
        let clients = self.clients.state.read().await;
        clients.iter().find(|c| c.id == client_id).cloned()
    }

    /// The split assigned to a client, if the client exists and the split was not
    /// deleted since.
    pub async fn client_split(&self, client_id: &str) -> Option<WorkoutSplit> {
        let split_ref = self.client(client_id).await?.workout_split?;
        let splits = self.splits.state.read().await;
        split_ref.resolve(&splits).cloned()
    }

    // === Calendar ===

    pub async fn workout_calendar(&self, index: &CalendarIndex) -> BTreeMap<NaiveDate, DayMarker> {
        let days = self.workout_days.state.read().await;
        index.derive(days.values())
    }

    pub async fn macro_calendar(&self, index: &CalendarIndex) -> BTreeMap<NaiveDate, DayMarker> {
        let entries = self.macro_entries.state.read().await;
        index.derive(entries.iter())
    }

    pub async fn photo_calendar(&self, index: &CalendarIndex) -> BTreeMap<NaiveDate, DayMarker> {
        let photos = self.progress_photos.state.read().await;
        index.derive(photos.iter())
    }
}

fn clear<T: Default>(collection: &mut T) -> PlanResult<()> {
    *collection = T::default();
    Ok(())
}

fn find_split_mut<'a>(
    splits: &'a mut [WorkoutSplit],
    split_id: &str,
) -> PlanResult<&'a mut WorkoutSplit> {
    splits
        .iter_mut()
        .find(|s| s.id == split_id)
        .ok_or_else(|| PlanError::not_found("split", split_id))
}

fn find_workout_mut<'a>(
    splits: &'a mut [WorkoutSplit],
    split_id: &str,
    workout_id: &str,
) -> PlanResult<&'a mut Workout> {
    find_split_mut(splits, split_id)?
        .workout_mut(workout_id)
        .ok_or_else(|| PlanError::not_found("workout", workout_id))
}
