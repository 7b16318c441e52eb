use chrono::{DateTime, Utc};
use homematch::config::OutreachConfig;
use homematch::matching::{
    AlertRepository, DraftError, DraftRequest, DraftedMessage, ListingId, MatchAlert,
    MessageDrafter, Notification, NotificationGateway, NotifyError, ProfileId, RepositoryError,
};
use homematch::scheduling::{Schedule, ScheduleId, ScheduleRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertRepository {
    records: Arc<Mutex<HashMap<String, MatchAlert>>>,
}

impl AlertRepository for InMemoryAlertRepository {
    fn insert(&self, alert: MatchAlert) -> Result<MatchAlert, RepositoryError> {
        let mut guard = self.records.lock().expect("alert mutex poisoned");
        if guard.contains_key(&alert.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(alert.id.0.clone(), alert.clone());
        Ok(alert)
    }

    fn update(&self, alert: MatchAlert) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("alert mutex poisoned");
        if guard.contains_key(&alert.id.0) {
            guard.insert(alert.id.0.clone(), alert);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn find_open(
        &self,
        profile_id: &ProfileId,
        listing_id: &ListingId,
    ) -> Result<Option<MatchAlert>, RepositoryError> {
        let guard = self.records.lock().expect("alert mutex poisoned");
        let mut open: Vec<&MatchAlert> = guard
            .values()
            .filter(|alert| {
                &alert.profile_id == profile_id
                    && &alert.listing_id == listing_id
                    && !alert.status.is_terminal()
            })
            .collect();
        open.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(open.first().map(|alert| (*alert).clone()))
    }

    fn open_for_profile(&self, profile_id: &ProfileId) -> Result<Vec<MatchAlert>, RepositoryError> {
        let guard = self.records.lock().expect("alert mutex poisoned");
        Ok(guard
            .values()
            .filter(|alert| &alert.profile_id == profile_id && !alert.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryNotificationGateway {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl NotificationGateway for InMemoryNotificationGateway {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let mut guard = self.events.lock().expect("notification mutex poisoned");
        guard.push(notification);
        Ok(())
    }
}

impl InMemoryNotificationGateway {
    pub(crate) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notification mutex poisoned").clone()
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryScheduleRepository {
    records: Arc<Mutex<HashMap<String, Schedule>>>,
}

impl ScheduleRepository for InMemoryScheduleRepository {
    fn insert(&self, schedule: Schedule) -> Result<Schedule, RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        if guard.contains_key(&schedule.id.0) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(schedule.id.0.clone(), schedule.clone());
        Ok(schedule)
    }

    fn update(&self, schedule: Schedule) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        if guard.contains_key(&schedule.id.0) {
            guard.insert(schedule.id.0.clone(), schedule);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn fetch(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError> {
        let guard = self.records.lock().expect("schedule mutex poisoned");
        Ok(guard.get(&id.0).cloned())
    }

    fn list(&self) -> Result<Vec<Schedule>, RepositoryError> {
        let guard = self.records.lock().expect("schedule mutex poisoned");
        let mut schedules: Vec<Schedule> = guard.values().cloned().collect();
        schedules.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        Ok(schedules)
    }

    fn delete(&self, id: &ScheduleId) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("schedule mutex poisoned");
        guard.remove(&id.0).map(|_| ()).ok_or(RepositoryError::NotFound)
    }
}

/// Stands in for the text-generation collaborator when no model endpoint is
/// configured, so alerts and outreach still flow end to end.
pub(crate) struct OfflineMessageDrafter {
    language: String,
}

impl OfflineMessageDrafter {
    pub(crate) fn new(config: &OutreachConfig) -> Self {
        Self {
            language: config.language.clone(),
        }
    }
}

impl Default for OfflineMessageDrafter {
    fn default() -> Self {
        Self {
            language: "pt-PT".to_string(),
        }
    }
}

impl MessageDrafter for OfflineMessageDrafter {
    fn draft(&self, _request: DraftRequest) -> Result<DraftedMessage, DraftError> {
        if self.language.starts_with("pt") {
            Ok(DraftedMessage {
                subject: "Encontrámos um imóvel que corresponde à sua procura".to_string(),
                body: "Olá! Surgiu um imóvel que encaixa nos critérios que nos deixou. \
                       Diga-nos quando lhe dá jeito e marcamos uma visita."
                    .to_string(),
            })
        } else {
            Ok(DraftedMessage {
                subject: "We found a property matching your search".to_string(),
                body: "Hi! A new listing fits the requirements you left with us. \
                       Let us know when suits you and we will arrange a viewing."
                    .to_string(),
            })
        }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| format!("failed to parse '{raw}' as an RFC 3339 timestamp ({err})"))
}
