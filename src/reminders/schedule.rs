//! Deadline heap for appointment reminders.
//!
//! Each upcoming appointment contributes one deadline per lead time
//! (`instant - lead`). The heap is rebuilt from scratch whenever the
//! appointment set changes. Deadlines already behind `now` at rebuild time
//! are dropped, so a lead time that has passed never fires late.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

use chrono::{Duration, NaiveDateTime};

use crate::models::Appointment;

/// One pending reminder. Ordered by `at` first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline {
    pub at: NaiveDateTime,
    pub appointment_id: String,
    pub lead_minutes: i64,
    pub title: String,
    pub time: String,
}

impl Deadline {
    /// Platform tag shared by every reminder of one appointment.
    pub fn tag(&self) -> String {
        format!("appointment-{}", self.appointment_id)
    }

    fn key(&self) -> (String, i64, NaiveDateTime) {
        (self.appointment_id.clone(), self.lead_minutes, self.at)
    }
}

pub struct ReminderSchedule {
    lead_minutes: Vec<i64>,
    heap: BinaryHeap<Reverse<Deadline>>,
    /// Fired deadlines that are not yet behind `now`; keeps a rebuild at the
    /// firing instant from re-adding them.
    fired: HashSet<(String, i64, NaiveDateTime)>,
}

impl ReminderSchedule {
    pub fn new(lead_minutes: Vec<i64>) -> Self {
        Self {
            lead_minutes,
            heap: BinaryHeap::new(),
            fired: HashSet::new(),
        }
    }

    pub fn rebuild(&mut self, appointments: &[Appointment], now: NaiveDateTime) {
        self.fired.retain(|(_, _, at)| *at >= now);
        self.heap.clear();

        for appointment in appointments {
            let Some(instant) = appointment.scheduled_at() else {
                tracing::warn!(
                    appointment_id = %appointment.id,
                    "Skipping reminders for appointment with unparseable date/time"
                );
                continue;
            };
            if instant < now {
                continue;
            }

            for &lead in &self.lead_minutes {
                let deadline = Deadline {
                    at: instant - Duration::minutes(lead),
                    appointment_id: appointment.id.clone(),
                    lead_minutes: lead,
                    title: appointment.title.clone(),
                    time: appointment.time.clone(),
                };
                if deadline.at < now || self.fired.contains(&deadline.key()) {
                    continue;
                }
                self.heap.push(Reverse(deadline));
            }
        }

        tracing::debug!(pending = self.heap.len(), "Reminder schedule rebuilt");
    }

    pub fn next_deadline(&self) -> Option<NaiveDateTime> {
        self.heap.peek().map(|Reverse(d)| d.at)
    }

    /// Remove and return every deadline at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: NaiveDateTime) -> Vec<Deadline> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|Reverse(d)| d.at <= now) {
            if let Some(Reverse(deadline)) = self.heap.pop() {
                self.fired.insert(deadline.key());
                due.push(deadline);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// Polling rule: the lead time matching `minutes_diff` exactly, if any.
pub fn due_lead(minutes_diff: i64, lead_minutes: &[i64]) -> Option<i64> {
    lead_minutes.contains(&minutes_diff).then_some(minutes_diff)
}
