//! Lifecycle of recurring match schedules through the public scheduler API:
//! trigger computation, pausing, manual runs, and the periodic tick.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveTime, TimeZone, Utc};

    use homematch::matching::{
        AlertRepository, DraftError, DraftRequest, DraftedMessage, EvaluationConfig, IntentFilter,
        Listing, ListingId, ListingIntent, ListingStatus, MatchAlert, MatchDispatcher, MatchEngine,
        MatchPipeline, MessageDrafter, Notification, NotificationGateway, NotifyError, ProfileId,
        PropertyType, RepositoryError, RequirementProfile,
    };
    use homematch::scheduling::{
        DayOfWeek, Frequency, RecurrenceScheduler, Schedule, ScheduleDraft, ScheduleId,
        ScheduleRepository,
    };

    // 2025-03-10 is a Monday.
    pub(super) fn monday(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, hour, minute, 0)
            .single()
            .expect("valid timestamp")
    }

    pub(super) fn buyer() -> RequirementProfile {
        RequirementProfile {
            id: ProfileId("prof-101".to_string()),
            buyer_name: "Ana Martins".to_string(),
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

    pub(super) fn flat(id: &str, price: u64) -> Listing {
        Listing {
            id: ListingId(id.to_string()),
            title: "T2 na Avenida Almirante Reis".to_string(),
            price,
            city: "Lisboa".to_string(),
            address: "Avenida Almirante Reis 120".to_string(),
            state: "Lisboa".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 2,
            bathrooms: 1,
            area_sqm: 85,
            intent: ListingIntent::Sale,
            status: ListingStatus::Active,
            listed_at: monday(8, 0) - chrono::Duration::days(3),
        }
    }

    pub(super) fn weekly_draft() -> ScheduleDraft {
        ScheduleDraft {
            profile_id: buyer().id,
            frequency: Frequency::Weekly,
            day_of_week: Some(DayOfWeek::Monday),
            day_of_month: None,
            time_of_day: NaiveTime::from_hms_opt(8, 0, 0).expect("valid time"),
            min_score: 60,
        }
    }

    pub(super) fn monthly_draft(day: u8) -> ScheduleDraft {
        ScheduleDraft {
            day_of_week: None,
            day_of_month: Some(day),
            frequency: Frequency::Monthly,
            time_of_day: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            ..weekly_draft()
        }
    }

    #[derive(Default)]
    pub(super) struct MemorySchedules {
        records: Mutex<HashMap<String, Schedule>>,
    }

    impl MemorySchedules {
        pub(super) fn stored(&self, id: &ScheduleId) -> Option<Schedule> {
            self.records.lock().expect("lock").get(&id.0).cloned()
        }
    }

    impl ScheduleRepository for MemorySchedules {
        fn insert(&self, schedule: Schedule) -> Result<Schedule, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if guard.contains_key(&schedule.id.0) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(schedule.id.0.clone(), schedule.clone());
            Ok(schedule)
        }

        fn update(&self, schedule: Schedule) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if !guard.contains_key(&schedule.id.0) {
                return Err(RepositoryError::NotFound);
            }
            guard.insert(schedule.id.0.clone(), schedule);
            Ok(())
        }

        fn fetch(&self, id: &ScheduleId) -> Result<Option<Schedule>, RepositoryError> {
            Ok(self.records.lock().expect("lock").get(&id.0).cloned())
        }

        fn list(&self) -> Result<Vec<Schedule>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
            let mut schedules: Vec<Schedule> = guard.values().cloned().collect();
            schedules.sort_by(|a, b| a.id.0.cmp(&b.id.0));
            Ok(schedules)
        }

        fn delete(&self, id: &ScheduleId) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            guard.remove(&id.0).map(|_| ()).ok_or(RepositoryError::NotFound)
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingAlerts {
        records: Mutex<HashMap<String, MatchAlert>>,
    }

    impl RecordingAlerts {
        pub(super) fn alerts(&self) -> Vec<MatchAlert> {
            let guard = self.records.lock().expect("lock");
            let mut alerts: Vec<MatchAlert> = guard.values().cloned().collect();
            alerts.sort_by(|a, b| a.id.0.cmp(&b.id.0));
            alerts
        }
    }

    impl AlertRepository for RecordingAlerts {
        fn insert(&self, alert: MatchAlert) -> Result<MatchAlert, RepositoryError> {
            let mut guard = self.records.lock().expect("lock");
            if guard.contains_key(&alert.id.0) {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(alert.id.0.clone(), alert.clone());
            Ok(alert)
        }

        fn update(&self, alert: MatchAlert) -> Result<(), RepositoryError> {
            self.records
                .lock()
                .expect("lock")
                .insert(alert.id.0.clone(), alert);
            Ok(())
        }

        fn find_open(
            &self,
            profile_id: &ProfileId,
            listing_id: &ListingId,
        ) -> Result<Option<MatchAlert>, RepositoryError> {
            let guard = self.records.lock().expect("lock");
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
            let guard = self.records.lock().expect("lock");
            Ok(guard
                .values()
                .filter(|alert| &alert.profile_id == profile_id && !alert.status.is_terminal())
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingNotifier {
        events: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub(super) fn events(&self) -> Vec<Notification> {
            self.events.lock().expect("lock").clone()
        }
    }

    impl NotificationGateway for RecordingNotifier {
        fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
            self.events.lock().expect("lock").push(notification);
            Ok(())
        }
    }

    pub(super) struct CannedDrafter;

    impl MessageDrafter for CannedDrafter {
        fn draft(&self, _request: DraftRequest) -> Result<DraftedMessage, DraftError> {
            Ok(DraftedMessage {
                subject: "Novidade na sua procura".to_string(),
                body: "Olá! Surgiu um imóvel que pode interessar.".to_string(),
            })
        }
    }

    pub(super) type TestScheduler =
        RecurrenceScheduler<MemorySchedules, RecordingAlerts, RecordingNotifier, CannedDrafter>;

    pub(super) fn build_scheduler() -> (
        TestScheduler,
        Arc<MemorySchedules>,
        Arc<RecordingAlerts>,
        Arc<RecordingNotifier>,
    ) {
        let schedules = Arc::new(MemorySchedules::default());
        let alerts = Arc::new(RecordingAlerts::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher =
            MatchDispatcher::new(alerts.clone(), notifier.clone(), Arc::new(CannedDrafter));
        let pipeline = Arc::new(MatchPipeline::new(
            MatchEngine::new(EvaluationConfig::default()),
            dispatcher,
        ));
        let scheduler = RecurrenceScheduler::new(schedules.clone(), pipeline);
        (scheduler, schedules, alerts, notifier)
    }
}

mod cadence {
    use super::common::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn weekly_trigger_waits_for_its_slot() {
        let (scheduler, _, _, _) = build_scheduler();

        let schedule = scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");
        assert_eq!(schedule.next_run, monday(8, 0));

        assert!(scheduler.due(monday(7, 30)).expect("due succeeds").is_empty());
        let due = scheduler.due(monday(8, 30)).expect("due succeeds");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, schedule.id);
    }

    #[test]
    fn monthly_anchor_clamps_to_short_months() {
        let (scheduler, _, _, _) = build_scheduler();
        let mid_january = Utc
            .with_ymd_and_hms(2025, 1, 31, 10, 0, 0)
            .single()
            .expect("valid timestamp");

        let schedule = scheduler
            .create(monthly_draft(31), mid_january)
            .expect("create succeeds");

        let expected = Utc
            .with_ymd_and_hms(2025, 2, 28, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        assert_eq!(schedule.next_run, expected);
    }
}

mod lifecycle {
    use super::common::*;
    use chrono::Duration;

    #[test]
    fn paused_schedules_sit_out_the_tick_but_run_now_fires() {
        let (scheduler, schedules, _, notifier) = build_scheduler();
        let schedule = scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");
        scheduler.pause(&schedule.id).expect("pause succeeds");

        let profiles = vec![buyer()];
        let listings = vec![flat("lst-201", 290_000)];
        let tick = scheduler
            .run_due(&profiles, &listings, monday(8, 30))
            .expect("tick succeeds");
        assert!(tick.executed.is_empty());
        assert!(notifier.events().is_empty());

        let report = scheduler
            .run_now(&schedule.id, &profiles, &listings, monday(8, 30))
            .expect("manual run succeeds");
        assert_eq!(report.report.results.len(), 1);
        assert_eq!(notifier.events().len(), 1);

        let stored = schedules.stored(&schedule.id).expect("schedule stored");
        assert!(!stored.active, "a manual run must not resume the schedule");
        assert_eq!(stored.last_run, Some(monday(8, 30)));
    }

    #[test]
    fn resuming_recomputes_a_missed_trigger() {
        let (scheduler, _, _, _) = build_scheduler();
        let schedule = scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");
        scheduler.pause(&schedule.id).expect("pause succeeds");

        let wednesday = monday(10, 0) + Duration::days(2);
        let resumed = scheduler
            .resume(&schedule.id, wednesday)
            .expect("resume succeeds");

        assert!(resumed.active);
        assert_eq!(
            resumed.next_run,
            monday(8, 0) + Duration::days(7),
            "a trigger missed while paused must not fire immediately"
        );
    }

    #[test]
    fn deleted_schedules_are_gone() {
        let (scheduler, schedules, _, _) = build_scheduler();
        let schedule = scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");

        scheduler.delete(&schedule.id).expect("delete succeeds");

        assert!(schedules.stored(&schedule.id).is_none());
        assert!(scheduler.pause(&schedule.id).is_err());
    }
}

mod ticking {
    use super::common::*;
    use chrono::Duration;

    #[test]
    fn due_schedules_run_and_roll_forward() {
        let (scheduler, schedules, _, notifier) = build_scheduler();
        let schedule = scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");

        let now = monday(8, 30);
        let tick = scheduler
            .run_due(&[buyer()], &[flat("lst-201", 290_000)], now)
            .expect("tick succeeds");

        assert_eq!(tick.executed.len(), 1);
        assert!(tick.failures.is_empty());
        let run = &tick.executed[0];
        assert_eq!(run.schedule_id, schedule.id);
        assert_eq!(
            run.batch_id.0,
            format!("{}-{}", schedule.id.0, now.timestamp())
        );
        assert_eq!(notifier.events().len(), 1);

        let stored = schedules.stored(&schedule.id).expect("schedule stored");
        assert_eq!(stored.last_run, Some(now));
        assert_eq!(stored.next_run, monday(8, 0) + Duration::days(7));
    }

    #[test]
    fn successive_ticks_refresh_without_renotifying() {
        let (scheduler, _, alerts, notifier) = build_scheduler();
        scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");
        let profiles = vec![buyer()];
        let listings = vec![flat("lst-201", 290_000)];

        scheduler
            .run_due(&profiles, &listings, monday(8, 30))
            .expect("first tick succeeds");
        let next_week = monday(8, 30) + Duration::days(7);
        let tick = scheduler
            .run_due(&profiles, &listings, next_week)
            .expect("second tick succeeds");

        assert_eq!(tick.executed.len(), 1, "the rolled trigger comes due again");
        assert_eq!(alerts.alerts().len(), 1, "the open alert is refreshed, not duplicated");
        assert_eq!(notifier.events().len(), 1);
    }

    #[test]
    fn schedule_floor_drops_weak_pairs() {
        let (scheduler, _, _, _) = build_scheduler();
        let mut draft = weekly_draft();
        draft.min_score = 80;
        let schedule = scheduler
            .create(draft, monday(7, 0))
            .expect("create succeeds");

        let listings = vec![flat("lst-201", 290_000), flat("lst-202", 340_000)];
        let report = scheduler
            .run_now(&schedule.id, &[buyer()], &listings, monday(8, 30))
            .expect("manual run succeeds");

        let scores: Vec<u8> = report
            .report
            .results
            .iter()
            .map(|result| result.score)
            .collect();
        assert_eq!(scores, vec![100], "the soft-overrun pair sits under the floor");
    }

    #[test]
    fn unknown_profiles_fail_their_schedule_only() {
        let (scheduler, _, _, _) = build_scheduler();
        let mut orphan_draft = weekly_draft();
        orphan_draft.profile_id = homematch::matching::ProfileId("prof-999".to_string());
        scheduler
            .create(weekly_draft(), monday(7, 0))
            .expect("create succeeds");
        scheduler
            .create(orphan_draft, monday(7, 0))
            .expect("create succeeds");

        let tick = scheduler
            .run_due(&[buyer()], &[flat("lst-201", 290_000)], monday(8, 30))
            .expect("tick succeeds");

        assert_eq!(tick.executed.len(), 1);
        assert_eq!(tick.failures.len(), 1);
        assert!(tick.failures[0].error.contains("prof-999"));
    }
}
