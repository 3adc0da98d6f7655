//! Calendar Index: a pure date → marker projection over dated records.
//!
//! Nothing here is cached. Callers derive a fresh map after every change to the
//! underlying collection or to the selected date.

use std::collections::BTreeMap;

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::model::{MacroEntry, ProgressPhoto, WorkoutDay};
use crate::{PlanError, PlanResult};

pub const DEFAULT_SUCCESS_COLOR: &str = "#2ecc71";
pub const DEFAULT_PENDING_COLOR: &str = "#e74c3c";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerState {
    Completed,
    Pending,
    /// A plain record with no completion state (macro entry, photo).
    Recorded,
}

/// A record that can be placed on the calendar.
pub trait Dated {
    fn date(&self) -> NaiveDate;
    fn marker_state(&self) -> MarkerState;
}

impl Dated for WorkoutDay {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn marker_state(&self) -> MarkerState {
        if self.completed {
            MarkerState::Completed
        } else {
            MarkerState::Pending
        }
    }
}

impl Dated for MacroEntry {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn marker_state(&self) -> MarkerState {
        MarkerState::Recorded
    }
}

impl Dated for ProgressPhoto {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn marker_state(&self) -> MarkerState {
        MarkerState::Recorded
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerPalette {
    pub success: String,
    pub pending: String,
}

impl Default for MarkerPalette {
    fn default() -> Self {
        Self {
            success: DEFAULT_SUCCESS_COLOR.to_string(),
            pending: DEFAULT_PENDING_COLOR.to_string(),
        }
    }
}

impl MarkerPalette {
    pub fn color_for(&self, state: MarkerState) -> &str {
        match state {
            MarkerState::Pending => &self.pending,
            MarkerState::Completed | MarkerState::Recorded => &self.success,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayMarker {
    pub has_marker: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker_color: Option<String>,
    pub is_selected: bool,
}

#[derive(Clone, Debug)]
pub struct CalendarIndex {
    selected: NaiveDate,
    palette: MarkerPalette,
    window: Option<(NaiveDate, NaiveDate)>,
}

impl CalendarIndex {
    pub fn new(selected: NaiveDate) -> Self {
        Self {
            selected,
            palette: MarkerPalette::default(),
            window: None,
        }
    }

    pub fn with_palette(mut self, palette: MarkerPalette) -> Self {
        self.palette = palette;
        self
    }

    /// Only mark records dated within `start..=end`. The selected date is always
    /// present in the output, inside the window or not.
    pub fn within(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.window = Some(if start <= end {
            (start, end)
        } else {
            (end, start)
        });
        self
    }

    pub fn within_month(self, year: i32, month: u32) -> PlanResult<Self> {
        let first = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| PlanError::Validation(format!("invalid month {year}-{month:02}")))?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(|| PlanError::Validation(format!("month {year}-{month:02} out of range")))?;
        Ok(self.within(first, last))
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn palette(&self) -> &MarkerPalette {
        &self.palette
    }

    /// One marker per date that has at least one record, plus the selected date.
    /// A date with any pending record is drawn as pending.
    pub fn derive<'a, T, I>(&self, records: I) -> BTreeMap<NaiveDate, DayMarker>
    where
        T: Dated + 'a,
        I: IntoIterator<Item = &'a T>,
    {
        let mut states: BTreeMap<NaiveDate, MarkerState> = BTreeMap::new();
        for record in records {
            let date = record.date();
            if !self.in_window(date) {
                continue;
            }
            let state = record.marker_state();
            states
                .entry(date)
                .and_modify(|current| {
                    if state == MarkerState::Pending {
                        *current = MarkerState::Pending;
                    }
                })
                .or_insert(state);
        }

        let mut markers: BTreeMap<NaiveDate, DayMarker> = states
            .into_iter()
            .map(|(date, state)| {
                let marker = DayMarker {
                    has_marker: true,
                    marker_color: Some(self.palette.color_for(state).to_string()),
                    is_selected: date == self.selected,
                };
                (date, marker)
            })
            .collect();

        markers.entry(self.selected).or_insert(DayMarker {
            has_marker: false,
            marker_color: None,
            is_selected: true,
        });
        markers
    }

    fn in_window(&self, date: NaiveDate) -> bool {
        self.window
            .is_none_or(|(start, end)| start <= date && date <= end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Macros, WorkoutRef};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("date")
    }

    fn day(d: &str, completed: bool) -> WorkoutDay {
        WorkoutDay {
            date: date(d),
            workout: WorkoutRef::new("w"),
            completed,
        }
    }

    fn entry(id: &str, d: &str) -> MacroEntry {
        MacroEntry {
            id: id.into(),
            date: date(d),
            macros: Macros::default(),
        }
    }

    #[test]
    fn workout_days_use_completion_colors() {
        let days = [day("2024-03-01", true), day("2024-03-02", false)];
        let markers = CalendarIndex::new(date("2024-03-02")).derive(days.iter());

        assert_eq!(markers.len(), 2);
        let done = &markers[&date("2024-03-01")];
        assert!(done.has_marker);
        assert_eq!(done.marker_color.as_deref(), Some(DEFAULT_SUCCESS_COLOR));
        assert!(!done.is_selected);

        let pending = &markers[&date("2024-03-02")];
        assert_eq!(pending.marker_color.as_deref(), Some(DEFAULT_PENDING_COLOR));
        assert!(pending.is_selected);
    }

    #[test]
    fn selected_date_is_present_without_records() {
        let markers =
            CalendarIndex::new(date("2024-03-05")).derive(std::iter::empty::<&WorkoutDay>());
        assert_eq!(
            markers.get(&date("2024-03-05")),
            Some(&DayMarker {
                has_marker: false,
                marker_color: None,
                is_selected: true
            })
        );
    }

    #[test]
    fn multiple_entries_on_a_date_collapse_to_one_marker() {
        let entries = [
            entry("1", "2024-03-01"),
            entry("2", "2024-03-01"),
            entry("3", "2024-03-09"),
        ];
        let markers = CalendarIndex::new(date("2024-03-20")).derive(entries.iter());
        assert_eq!(markers.len(), 3);
        assert!(markers[&date("2024-03-01")].has_marker);
        assert!(!markers[&date("2024-03-20")].has_marker);
    }

    #[test]
    fn pending_wins_over_completed() {
        struct Rec(NaiveDate, MarkerState);
        impl Dated for Rec {
            fn date(&self) -> NaiveDate {
                self.0
            }
            fn marker_state(&self) -> MarkerState {
                self.1
            }
        }
        let d = date("2024-03-01");
        let recs = [
            Rec(d, MarkerState::Completed),
            Rec(d, MarkerState::Pending),
            Rec(d, MarkerState::Recorded),
        ];
        let markers = CalendarIndex::new(d).derive(recs.iter());
        assert_eq!(markers[&d].marker_color.as_deref(), Some(DEFAULT_PENDING_COLOR));
    }

    #[test]
    fn month_window_filters_but_keeps_selection() {
        let days = [
            day("2024-02-29", false),
            day("2024-03-01", false),
            day("2024-03-31", true),
            day("2024-04-01", true),
        ];
        let index = CalendarIndex::new(date("2024-05-10"))
            .within_month(2024, 3)
            .expect("valid month");
        let markers = index.derive(days.iter());
        let dates: Vec<_> = markers.keys().copied().collect();
        assert_eq!(
            dates,
            vec![date("2024-03-01"), date("2024-03-31"), date("2024-05-10")]
        );
    }

    #[test]
    fn december_window_ends_on_the_31st() {
        let index = CalendarIndex::new(date("2024-12-01"))
            .within_month(2024, 12)
            .unwrap();
        assert_eq!(index.window, Some((date("2024-12-01"), date("2024-12-31"))));
    }

    #[test]
    fn invalid_month_is_rejected() {
        let err = CalendarIndex::new(date("2024-01-01"))
            .within_month(2024, 13)
            .unwrap_err();
        assert!(matches!(err, PlanError::Validation(_)));
    }

    #[test]
    fn custom_palette_is_used() {
        let palette = MarkerPalette {
            success: "green".into(),
            pending: "red".into(),
        };
        let days = [day("2024-03-01", true)];
        let markers = CalendarIndex::new(date("2024-03-01"))
            .with_palette(palette)
            .derive(days.iter());
        assert_eq!(markers[&date("2024-03-01")].marker_color.as_deref(), Some("green"));
    }

    #[test]
    fn marker_serializes_camel_case() {
        let marker = DayMarker {
            has_marker: true,
            marker_color: Some("#fff".into()),
            is_selected: false,
        };
        let value = serde_json::to_value(marker).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"hasMarker": true, "markerColor": "#fff", "isSelected": false})
        );
    }
}
