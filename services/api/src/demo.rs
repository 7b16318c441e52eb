use crate::infra::{
    parse_timestamp, InMemoryAlertRepository, InMemoryNotificationGateway,
    InMemoryScheduleRepository, OfflineMessageDrafter,
};
use chrono::{DateTime, NaiveTime, Utc};
use clap::Args;
use homematch::config::{AppConfig, OutreachConfig};
use homematch::error::AppError;
use homematch::matching::{
    build_outreach_prompt, describe_requirements, BatchRunReport, DispatchPolicy,
    EvaluationConfig, IntentFilter, Listing, ListingId, ListingIntent, ListingStatus,
    MatchDispatcher, MatchEngine, MatchPipeline, PairDispatch, ProfileId, ProfileRunReport,
    PropertyType, RequirementProfile, RunContext,
};
use homematch::scheduling::{DayOfWeek, Frequency, RecurrenceScheduler, ScheduleDraft};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Evaluation instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Override the ingestion score floor (percent).
    #[arg(long)]
    pub(crate) min_score: Option<u8>,
    /// Skip the recurring-schedule portion of the demo.
    #[arg(long)]
    pub(crate) skip_schedules: bool,
}

#[derive(Args, Debug)]
pub(crate) struct RunDueArgs {
    /// Tick instant (RFC 3339). Defaults to now.
    #[arg(long, value_parser = parse_timestamp)]
    pub(crate) now: Option<DateTime<Utc>>,
    /// Score floor the sample schedules apply (percent).
    #[arg(long, default_value_t = 55)]
    pub(crate) min_score: u8,
}

pub(crate) type DemoPipeline =
    MatchPipeline<InMemoryAlertRepository, InMemoryNotificationGateway, OfflineMessageDrafter>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        now,
        min_score,
        skip_schedules,
    } = args;

    let now = now.unwrap_or_else(Utc::now);
    let outreach = AppConfig::load()?.outreach;
    let profiles = sample_profiles();
    let listings = sample_listings(now);

    let mut policy = DispatchPolicy::ingestion();
    if let Some(floor) = min_score {
        policy.min_score = floor;
    }

    let (pipeline, notifier) = build_pipeline(&outreach);
    let ctx = RunContext::new(format!("demo-{}", now.timestamp()), now);

    println!("Homematch scoring demo");
    println!(
        "Evaluating {} saved profiles against {} listings (batch {})",
        profiles.len(),
        listings.len(),
        ctx.batch_id.0
    );

    let batch = pipeline.run_batch(&profiles, &listings, &policy, &ctx);
    render_batch(&profiles, &listings, &batch, policy.min_score);

    let events = notifier.events();
    if events.is_empty() {
        println!("\nNotifications dispatched: none");
    } else {
        println!("\nNotifications dispatched");
        for notification in &events {
            println!(
                "- [{}] to {}: {}",
                notification.priority.label(),
                notification.recipient,
                notification.message
            );
        }
    }

    render_outreach(&profiles, &listings, &batch, &outreach.language);

    if let Some(profile) = profiles.first() {
        let open = pipeline.open_alerts(&profile.id)?;
        println!("\nOpen alerts for {} ({})", profile.id.0, profile.buyer_name);
        if open.is_empty() {
            println!("- none");
        }
        for alert in &open {
            println!(
                "- {} at {}%: {} [{}]",
                alert.listing_id.0,
                alert.score,
                alert.summary,
                alert.status.label()
            );
        }
    }

    if skip_schedules {
        return Ok(());
    }

    println!("\nRecurring schedule demo");
    let schedules = Arc::new(InMemoryScheduleRepository::default());
    let scheduler = RecurrenceScheduler::new(schedules, pipeline);

    let draft = ScheduleDraft {
        profile_id: profiles[0].id.clone(),
        frequency: Frequency::Weekly,
        day_of_week: Some(DayOfWeek::Monday),
        day_of_month: None,
        time_of_day: sample_time(8),
        min_score: 60,
    };
    let schedule = scheduler.create(draft, now)?;
    println!(
        "- Created {}: weekly on {} at {} (floor {}%), first trigger {}",
        schedule.id.0,
        schedule
            .day_of_week
            .map(|day| day.label())
            .unwrap_or("unset"),
        schedule.time_of_day,
        schedule.min_score,
        schedule.next_run
    );

    let before = notifier.events().len();
    let run = scheduler.run_now(&schedule.id, &profiles, &listings, now)?;
    let after = notifier.events().len();
    println!(
        "- Manual run {}: {} matches, {} open alerts refreshed",
        run.batch_id.0,
        run.report.results.len(),
        run.report
            .dispatches
            .iter()
            .filter(|dispatch| dispatch.dispatched())
            .count()
    );
    println!(
        "- Notifications after the re-run: {} (was {}); open alerts are refreshed, not re-sent",
        after, before
    );
    println!("- Next trigger: {}", run.next_run);

    Ok(())
}

pub(crate) fn run_schedule_tick(args: RunDueArgs) -> Result<(), AppError> {
    let RunDueArgs { now, min_score } = args;

    let now = now.unwrap_or_else(Utc::now);
    let outreach = AppConfig::load()?.outreach;
    let profiles = sample_profiles();
    let listings = sample_listings(now);
    let (pipeline, notifier) = build_pipeline(&outreach);

    let schedules = Arc::new(InMemoryScheduleRepository::default());
    let scheduler = RecurrenceScheduler::new(schedules, pipeline);

    // Seed the sample schedules a week back so the tick has work to do.
    let seeded_at = now - chrono::Duration::days(8);
    let weekly = scheduler.create(
        ScheduleDraft {
            profile_id: profiles[0].id.clone(),
            frequency: Frequency::Weekly,
            day_of_week: Some(DayOfWeek::Monday),
            day_of_month: None,
            time_of_day: sample_time(8),
            min_score,
        },
        seeded_at,
    )?;
    let daily = scheduler.create(
        ScheduleDraft {
            profile_id: profiles[1].id.clone(),
            frequency: Frequency::Daily,
            day_of_week: None,
            day_of_month: None,
            time_of_day: sample_time(9),
            min_score,
        },
        seeded_at,
    )?;

    println!("Homematch schedule tick");
    println!(
        "- {}: weekly on monday at {}, floor {}%",
        weekly.id.0, weekly.time_of_day, weekly.min_score
    );
    println!(
        "- {}: daily at {}, floor {}%",
        daily.id.0, daily.time_of_day, daily.min_score
    );

    let due = scheduler.due(now)?;
    println!("Due at {}: {} schedule(s)", now, due.len());

    let tick = scheduler.run_due(&profiles, &listings, now)?;
    for run in &tick.executed {
        println!(
            "- Executed {} (batch {}): {} matches, {} alerts, next trigger {}",
            run.schedule_id.0,
            run.batch_id.0,
            run.report.results.len(),
            run.report.alerts_raised(),
            run.next_run
        );
    }
    for failure in &tick.failures {
        println!("- {} failed: {}", failure.schedule_id.0, failure.error);
    }

    println!("Notifications dispatched: {}", notifier.events().len());

    Ok(())
}

fn sample_time(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn build_pipeline(outreach: &OutreachConfig) -> (Arc<DemoPipeline>, Arc<InMemoryNotificationGateway>) {
    let alerts = Arc::new(InMemoryAlertRepository::default());
    let notifier = Arc::new(InMemoryNotificationGateway::default());
    let dispatcher = MatchDispatcher::new(
        alerts,
        notifier.clone(),
        Arc::new(OfflineMessageDrafter::new(outreach)),
    )
    .with_language(outreach.language.clone());
    let pipeline = Arc::new(MatchPipeline::new(
        MatchEngine::new(EvaluationConfig::default()),
        dispatcher,
    ));
    (pipeline, notifier)
}

fn render_batch(
    profiles: &[RequirementProfile],
    listings: &[Listing],
    batch: &BatchRunReport,
    floor: u8,
) {
    for report in &batch.reports {
        let Some(profile) = profiles
            .iter()
            .find(|profile| profile.id == report.profile_id)
        else {
            continue;
        };
        render_profile_section(profile, listings, report, floor);
    }

    println!(
        "\nBatch summary: {} processed, {} failed, {} archived profile(s) skipped",
        batch.processed, batch.failed, batch.skipped_archived
    );
    for failure in &batch.errors {
        println!("- {} failed: {}", failure.profile_id.0, failure.error);
    }
}

fn render_profile_section(
    profile: &RequirementProfile,
    listings: &[Listing],
    report: &ProfileRunReport,
    floor: u8,
) {
    println!("\nProfile {} ({})", profile.id.0, profile.buyer_name);
    println!("  Looking for: {}", describe_requirements(profile));
    println!(
        "  Considered {} active listing(s), {} at or above the {}% floor",
        report.considered,
        report.results.len(),
        floor
    );

    for result in &report.results {
        let title = listings
            .iter()
            .find(|listing| listing.id == result.listing_id)
            .map(|listing| listing.title.as_str())
            .unwrap_or("unknown listing");
        let dispatch = report
            .dispatches
            .iter()
            .find(|dispatch| dispatch.listing_id == result.listing_id);
        println!(
            "  - {} {}: {}% [{}]",
            result.listing_id.0,
            title,
            result.score,
            dispatch.map(describe_dispatch).unwrap_or_default()
        );
    }

    if !report.failures.is_empty() {
        println!("  Rejected inputs:");
        for failure in &report.failures {
            println!("  - {}: {}", failure.listing_id.0, failure.error);
        }
    }
}

fn describe_dispatch(dispatch: &PairDispatch) -> String {
    let mut notes: Vec<String> = Vec::new();

    if dispatch.alert_created {
        notes.push("alert raised".to_string());
    } else if dispatch.alert_id.is_some() {
        notes.push("alert refreshed".to_string());
    }
    if dispatch.notified {
        notes.push("handler notified".to_string());
    }
    if let Some(error) = &dispatch.notify_error {
        notes.push(format!("notification failed: {error}"));
    }
    if dispatch.message.is_some() {
        notes.push("outreach drafted".to_string());
    }
    if let Some(error) = &dispatch.draft_error {
        notes.push(format!("draft unavailable: {error}"));
    }

    if notes.is_empty() {
        "below the alert threshold".to_string()
    } else {
        notes.join(", ")
    }
}

fn render_outreach(
    profiles: &[RequirementProfile],
    listings: &[Listing],
    batch: &BatchRunReport,
    language: &str,
) {
    let Some((report, result)) = batch
        .reports
        .iter()
        .find_map(|report| report.results.first().map(|result| (report, result)))
    else {
        return;
    };
    let Some(profile) = profiles
        .iter()
        .find(|profile| profile.id == report.profile_id)
    else {
        return;
    };
    let Some(listing) = listings
        .iter()
        .find(|listing| listing.id == result.listing_id)
    else {
        return;
    };

    println!("\nOutreach drafting ({language})");
    println!("Prompt handed to the drafting collaborator:");
    for line in build_outreach_prompt(profile, listing, result, language).lines() {
        println!("  {line}");
    }

    if let Some(message) = report
        .dispatches
        .iter()
        .find(|dispatch| dispatch.listing_id == result.listing_id)
        .and_then(|dispatch| dispatch.message.as_ref())
    {
        println!("Drafted message:");
        println!("  Subject: {}", message.subject);
        println!("  Body: {}", message.body);
    }
}

fn sample_profiles() -> Vec<RequirementProfile> {
    let ana = RequirementProfile {
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
    };

    let bruno = RequirementProfile {
        id: ProfileId("prof-002".to_string()),
        buyer_name: "Bruno Costa".to_string(),
        budget_min: Some(900),
        budget_max: Some(1_400),
        locations: vec!["Porto".to_string(), "Matosinhos".to_string()],
        property_types: vec![PropertyType::Apartment],
        bedrooms_min: Some(1),
        bedrooms_max: None,
        bathrooms_min: None,
        area_min: None,
        area_max: None,
        intent: IntentFilter::Rent,
        assigned_agent: Some("miguel.santos".to_string()),
        archived: false,
    };

    let carla = RequirementProfile {
        id: ProfileId("prof-003".to_string()),
        buyer_name: "Carla Nunes".to_string(),
        budget_min: None,
        budget_max: Some(450_000),
        locations: vec!["Lisboa".to_string()],
        property_types: Vec::new(),
        bedrooms_min: None,
        bedrooms_max: None,
        bathrooms_min: None,
        area_min: None,
        area_max: None,
        intent: IntentFilter::Both,
        assigned_agent: None,
        archived: true,
    };

    let diogo = RequirementProfile {
        id: ProfileId("prof-004".to_string()),
        buyer_name: "Diogo Ramos".to_string(),
        budget_min: Some(500_000),
        budget_max: Some(350_000),
        locations: vec!["Cascais".to_string()],
        property_types: Vec::new(),
        bedrooms_min: None,
        bedrooms_max: None,
        bathrooms_min: None,
        area_min: None,
        area_max: None,
        intent: IntentFilter::Sale,
        assigned_agent: Some("rita.ferreira".to_string()),
        archived: false,
    };

    vec![ana, bruno, carla, diogo]
}

fn sample_listings(now: DateTime<Utc>) -> Vec<Listing> {
    vec![
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
            listed_at: now - chrono::Duration::days(2),
        },
        Listing {
            id: ListingId("lst-002".to_string()),
            title: "T2 com varanda em Alvalade".to_string(),
            price: 340_000,
            city: "Lisboa".to_string(),
            address: "Avenida de Roma 18".to_string(),
            state: "Lisboa".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 2,
            bathrooms: 1,
            area_sqm: 78,
            intent: ListingIntent::Sale,
            status: ListingStatus::Active,
            listed_at: now - chrono::Duration::days(5),
        },
        Listing {
            id: ListingId("lst-003".to_string()),
            title: "Moradia V4 com jardim em Carcavelos".to_string(),
            price: 850_000,
            city: "Carcavelos".to_string(),
            address: "Rua dos Pescadores 7".to_string(),
            state: "Lisboa".to_string(),
            property_type: PropertyType::House,
            bedrooms: 4,
            bathrooms: 3,
            area_sqm: 210,
            intent: ListingIntent::Sale,
            status: ListingStatus::Active,
            listed_at: now - chrono::Duration::days(9),
        },
        Listing {
            id: ListingId("lst-004".to_string()),
            title: "T2 na Baixa".to_string(),
            price: 265_000,
            city: "Lisboa".to_string(),
            address: "Rua dos Fanqueiros 92".to_string(),
            state: "Lisboa".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 2,
            bathrooms: 1,
            area_sqm: 72,
            intent: ListingIntent::Sale,
            status: ListingStatus::Withdrawn,
            listed_at: now - chrono::Duration::days(30),
        },
        Listing {
            id: ListingId("lst-005".to_string()),
            title: "T2 junto ao metro em Matosinhos".to_string(),
            price: 1_250,
            city: "Matosinhos".to_string(),
            address: "Rua Brito Capelo 310".to_string(),
            state: "Porto".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 2,
            bathrooms: 1,
            area_sqm: 80,
            intent: ListingIntent::Rent,
            status: ListingStatus::Active,
            listed_at: now - chrono::Duration::days(1),
        },
        Listing {
            id: ListingId("lst-006".to_string()),
            title: "Loft no Bonfim".to_string(),
            price: 0,
            city: "Porto".to_string(),
            address: "Rua do Bonfim 55".to_string(),
            state: "Porto".to_string(),
            property_type: PropertyType::Apartment,
            bedrooms: 1,
            bathrooms: 1,
            area_sqm: 60,
            intent: ListingIntent::Rent,
            status: ListingStatus::Active,
            listed_at: now - chrono::Duration::days(1),
        },
    ]
}
