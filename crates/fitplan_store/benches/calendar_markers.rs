use std::sync::Arc;

use chrono::{Days, NaiveDate};
use criterion::{Criterion, criterion_group, criterion_main};
use fitplan_store::config::Config;
use fitplan_store::{CalendarIndex, Macros, MemoryKeyValueStore, PlanningStore};
use tempfile::tempdir;
use tokio::runtime::Builder;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
}

fn bench_workout_calendar(c: &mut Criterion) {
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");

    // a year of scheduled days, every other one completed
    let store = rt.block_on(async {
        let store = PlanningStore::open(Arc::new(MemoryKeyValueStore::new()))
            .await
            .expect("open");
        let split = store.create_split("PPL", "").await.expect("split");
        let workout = store.add_workout(&split.id, "Push").await.expect("workout");
        for offset in 0..365u64 {
            let date = start() + Days::new(offset);
            store.schedule_workout(date, &workout.id).await.expect("schedule");
            if offset % 2 == 0 {
                store.toggle_completion(date).await.expect("toggle");
            }
        }
        store
    });

    let month = CalendarIndex::new(start() + Days::new(40))
        .within_month(2024, 2)
        .expect("month");
    c.bench_function("workout_calendar_month_of_year", |b| {
        b.to_async(&rt).iter(|| async { store.workout_calendar(&month).await })
    });
}

fn bench_file_backed_append(c: &mut Criterion) {
    let rt = Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("tokio runtime");
    let dir = tempdir().expect("tempdir");
    let data_dir = dir.path().to_string_lossy().into_owned();
    let cfg = Config::from_env_with(|k| (k == "FITPLAN_DATA_DIR").then(|| data_dir.clone()))
        .expect("config");
    let store = rt
        .block_on(PlanningStore::open_with_config(&cfg))
        .expect("open");

    c.bench_function("file_backed_add_macro_entry", |b| {
        b.to_async(&rt).iter(|| async {
            store
                .add_macro_entry(start(), Macros::new(30.0, 40.0, 10.0, 360.0))
                .await
                .expect("append")
        })
    });
}

criterion_group!(benches, bench_workout_calendar, bench_file_backed_append);
criterion_main!(benches);
