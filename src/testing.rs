//! Fake collaborators for tests

use crate::{
    calculation::PrayerCalculator,
    console::{InputBox, UserInterface},
    geocode::{Coordinates, Geocoder},
    indicator::StatusIndicator,
    prayer::{NextPrayer, Prayer, PrayerTimes, Schedule},
};
use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::sync::oneshot;

/// Build a schedule with a given next prayer. The times themselves are
/// arbitrary.
pub fn schedule(prayer: Prayer, remaining_seconds: Option<u64>) -> Schedule {
    let at = |time: &str| -> DateTime<Utc> {
        format!("2024-05-24T{time}:00Z").parse().unwrap()
    };
    Schedule {
        date: NaiveDate::from_ymd_opt(2024, 5, 24).unwrap(),
        times: PrayerTimes {
            fajr: at("05:00"),
            sunrise: at("06:20"),
            dhuhr: at("12:15"),
            asr: at("15:30"),
            maghrib: at("18:00"),
            isha: at("19:30"),
        },
        next_fajr: None,
        next: NextPrayer {
            prayer,
            remaining_seconds,
        },
    }
}

#[derive(Debug)]
pub struct FakeGeocoder {
    result: Result<Coordinates, String>,
    calls: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn new(result: Result<Coordinates, String>) -> Arc<Self> {
        Arc::new(Self {
            result,
            calls: Mutex::default(),
        })
    }

    /// Every city that was looked up
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl Geocoder for FakeGeocoder {
    fn geocode(&self, city: &str) -> anyhow::Result<Coordinates> {
        self.calls.lock().unwrap().push(city.to_owned());
        self.result.clone().map_err(|err| anyhow!(err))
    }
}

#[derive(Debug)]
pub struct FakeCalculator {
    result: Mutex<Result<Schedule, String>>,
    calls: Mutex<Vec<Coordinates>>,
}

impl FakeCalculator {
    pub fn new(result: Result<Schedule, String>) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(result),
            calls: Mutex::default(),
        })
    }

    /// Change what the next calculation returns
    pub fn set(&self, result: Result<Schedule, String>) {
        *self.result.lock().unwrap() = result;
    }

    /// Coordinates of every calculation
    pub fn calls(&self) -> Vec<Coordinates> {
        self.calls.lock().unwrap().clone()
    }
}

impl PrayerCalculator for FakeCalculator {
    fn calculate(
        &self,
        _: DateTime<Utc>,
        coordinates: &Coordinates,
    ) -> anyhow::Result<Schedule> {
        self.calls.lock().unwrap().push(coordinates.clone());
        self.result.lock().unwrap().clone().map_err(|err| anyhow!(err))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Info(String),
    Warning(String),
    Error(String),
}

/// Records messages and answers prompts from a script. Once the script runs
/// out, prompts get no answer.
#[derive(Debug, Default)]
pub struct FakeUi {
    answers: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<InputBox>>,
    messages: Mutex<Vec<Message>>,
}

impl FakeUi {
    pub fn with_answers<const N: usize>(answers: [Option<&str>; N]) -> Self {
        Self {
            answers: Mutex::new(
                answers.into_iter().map(|a| a.map(String::from)).collect(),
            ),
            ..Self::default()
        }
    }

    pub fn prompts(&self) -> Vec<InputBox> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().unwrap().clone()
    }
}

impl UserInterface for FakeUi {
    fn show_info(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(Message::Info(message.into()));
    }

    fn show_warning(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(Message::Warning(message.into()));
    }

    fn show_error(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(Message::Error(message.into()));
    }

    fn input_box(&self, input: InputBox) -> oneshot::Receiver<Option<String>> {
        self.prompts.lock().unwrap().push(input);
        let answer = self.answers.lock().unwrap().pop_front().flatten();
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(answer);
        rx
    }
}

/// Indicator that remembers everything written to it
#[derive(Debug, Default)]
pub struct RecordingIndicator {
    state: Mutex<RecordingState>,
}

#[derive(Debug, Default)]
struct RecordingState {
    text: String,
    /// Text at each call to show()
    shown: Vec<String>,
    disposed: bool,
}

impl RecordingIndicator {
    pub fn new() -> Arc<Self> {
        Arc::default()
    }

    pub fn shown(&self) -> Vec<String> {
        self.state.lock().unwrap().shown.clone()
    }

    pub fn last_shown(&self) -> Option<String> {
        self.state.lock().unwrap().shown.last().cloned()
    }

    pub fn is_disposed(&self) -> bool {
        self.state.lock().unwrap().disposed
    }
}

impl StatusIndicator for RecordingIndicator {
    fn set_text(&self, text: &str) {
        self.state.lock().unwrap().text = text.to_owned();
    }

    fn show(&self) {
        let mut state = self.state.lock().unwrap();
        let text = state.text.clone();
        state.shown.push(text);
    }

    fn dispose(&self) {
        self.state.lock().unwrap().disposed = true;
    }
}
