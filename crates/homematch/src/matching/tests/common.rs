use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::matching::dispatch::MatchDispatcher;
use crate::matching::domain::{
    IntentFilter, Listing, ListingId, ListingIntent, ListingStatus, ProfileId, PropertyType,
    RequirementProfile,
};
use crate::matching::evaluation::{EvaluationConfig, MatchEngine};
use crate::matching::outreach::{DraftError, DraftRequest, DraftedMessage, MessageDrafter};
use crate::matching::pipeline::MatchPipeline;
use crate::matching::repository::{
    AlertRepository, MatchAlert, Notification, NotificationGateway, NotifyError, RepositoryError,
};
use crate::matching::router::matching_router;

pub(super) fn run_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn profile() -> RequirementProfile {
    RequirementProfile {
        id: ProfileId("prof-001".to_string()),
        buyer_name: "Ana Martins".to_string(),
        budget_min: Some(200_000),
        budget_max: Some(300_000),
        locations: vec!["Lisboa".to_string()],
        property_types: vec![PropertyType::Apartment],
        bedrooms_min: Some(2),
        bedrooms_max: Some(3),
        bathrooms_min: Some(1),
        area_min: Some(70),
        area_max: Some(120),
        intent: IntentFilter::Sale,
        assigned_agent: Some("rita.ferreira".to_string()),
        archived: false,
    }
}

/// Buyer who only cares about price and city.
pub(super) fn budget_location_profile() -> RequirementProfile {
    RequirementProfile {
        id: ProfileId("prof-002".to_string()),
        buyer_name: "Bruno Costa".to_string(),
        budget_min: None,
        budget_max: Some(300_000),
        locations: vec!["Lisboa".to_string()],
        property_types: Vec::new(),
        bedrooms_min: None,
        bedrooms_max: None,
        bathrooms_min: None,
        area_min: None,
        area_max: None,
        intent: IntentFilter::Both,
        assigned_agent: Some("rita.ferreira".to_string()),
        archived: false,
    }
}

pub(super) fn empty_profile() -> RequirementProfile {
    RequirementProfile {
        id: ProfileId("prof-003".to_string()),
        buyer_name: "Carla Nunes".to_string(),
        budget_min: None,
        budget_max: None,
        locations: Vec::new(),
        property_types: Vec::new(),
        bedrooms_min: None,
        bedrooms_max: None,
        bathrooms_min: None,
        area_min: None,
        area_max: None,
        intent: IntentFilter::Both,
        assigned_agent: None,
        archived: false,
    }
}

pub(super) fn listing() -> Listing {
    Listing {
        id: ListingId("lst-001".to_string()),
        title: "T3 remodelado em Campolide".to_string(),
        price: 290_000,
        city: "Lisboa".to_string(),
        address: "Rua de Campolide 44".to_string(),
        state: "Lisboa".to_string(),
        property_type: PropertyType::Apartment,
        bedrooms: 3,
        bathrooms: 2,
        area_sqm: 110,
        intent: ListingIntent::Sale,
        status: ListingStatus::Active,
        listed_at: run_time() - chrono::Duration::days(2),
    }
}

pub(super) fn listing_with(id: &str, price: u64) -> Listing {
    Listing {
        id: ListingId(id.to_string()),
        price,
        ..listing()
    }
}

pub(super) fn engine() -> MatchEngine {
    MatchEngine::new(EvaluationConfig::default())
}

pub(super) fn build_dispatcher() -> (
    MatchDispatcher<MemoryAlerts, MemoryNotifier, StaticDrafter>,
    Arc<MemoryAlerts>,
    Arc<MemoryNotifier>,
) {
    let alerts = Arc::new(MemoryAlerts::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let dispatcher =
        MatchDispatcher::new(alerts.clone(), notifier.clone(), Arc::new(StaticDrafter));
    (dispatcher, alerts, notifier)
}

pub(super) fn build_pipeline() -> (
    MatchPipeline<MemoryAlerts, MemoryNotifier, StaticDrafter>,
    Arc<MemoryAlerts>,
    Arc<MemoryNotifier>,
) {
    let (dispatcher, alerts, notifier) = build_dispatcher();
    let pipeline = MatchPipeline::new(engine(), dispatcher);
    (pipeline, alerts, notifier)
}

pub(super) fn matching_router_with_pipeline(
    pipeline: MatchPipeline<MemoryAlerts, MemoryNotifier, StaticDrafter>,
) -> axum::Router {
    matching_router(Arc::new(pipeline))
}

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    records: Arc<Mutex<HashMap<String, MatchAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn alerts(&self) -> Vec<MatchAlert> {
        let guard = self.records.lock().expect("alert mutex poisoned");
        let mut alerts: Vec<MatchAlert> = guard.values().cloned().collect();
        alerts.sort_by(|a, b| a.id.0.cmp(&b.id.0));
        alerts
    }
}

impl AlertRepository for MemoryAlerts {
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
        if !guard.contains_key(&alert.id.0) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(alert.id.0.clone(), alert);
        Ok(())
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

    fn open_for_profile(
        &self,
        profile_id: &ProfileId,
    ) -> Result<Vec<MatchAlert>, RepositoryError> {
        let guard = self.records.lock().expect("alert mutex poisoned");
        Ok(guard
            .values()
            .filter(|alert| &alert.profile_id == profile_id && !alert.status.is_terminal())
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<Notification>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl NotificationGateway for MemoryNotifier {
    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(notification);
        Ok(())
    }
}

pub(super) struct StaticDrafter;

impl MessageDrafter for StaticDrafter {
    fn draft(&self, _request: DraftRequest) -> Result<DraftedMessage, DraftError> {
        Ok(DraftedMessage {
            subject: "Encontrámos um imóvel para si".to_string(),
            body: "Olá! Temos uma novidade que corresponde à sua procura.".to_string(),
        })
    }
}

pub(super) struct FailingDrafter;

impl MessageDrafter for FailingDrafter {
    fn draft(&self, _request: DraftRequest) -> Result<DraftedMessage, DraftError> {
        Err(DraftError::Unavailable("model endpoint offline".to_string()))
    }
}

pub(super) struct FailingNotifier;

impl NotificationGateway for FailingNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("gateway timeout".to_string()))
    }
}

pub(super) struct ConflictAlerts;

impl AlertRepository for ConflictAlerts {
    fn insert(&self, _alert: MatchAlert) -> Result<MatchAlert, RepositoryError> {
        Err(RepositoryError::Conflict)
    }

    fn update(&self, _alert: MatchAlert) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("read only".to_string()))
    }

    fn find_open(
        &self,
        _profile_id: &ProfileId,
        _listing_id: &ListingId,
    ) -> Result<Option<MatchAlert>, RepositoryError> {
        Ok(None)
    }

    fn open_for_profile(
        &self,
        _profile_id: &ProfileId,
    ) -> Result<Vec<MatchAlert>, RepositoryError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableAlerts;

impl AlertRepository for UnavailableAlerts {
    fn insert(&self, _alert: MatchAlert) -> Result<MatchAlert, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _alert: MatchAlert) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn find_open(
        &self,
        _profile_id: &ProfileId,
        _listing_id: &ListingId,
    ) -> Result<Option<MatchAlert>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn open_for_profile(
        &self,
        _profile_id: &ProfileId,
    ) -> Result<Vec<MatchAlert>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
