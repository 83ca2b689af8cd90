use crate::infra::{opening_of, parse_date};
use admissions::error::AppError;
use admissions::workflows::admissions::{
    AdmissionDecision, AdmissionsError, AdmissionsService, ApplicationId, ApplicationRequest,
    ApplicationStatements, Clock, DrawOutcome, EligibilityStatus, FixedClock, GradeStandards,
    InMemoryAdmissionsStore, LogFilter, PhaseKind, PhasePlan, Priority, QualificationMetrics,
    QuotaUpdate, ReviewDecision, StudentId, StudentRegistration, TeacherId, TeacherRegistration,
    UserId,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

const REGISTRAR: UserId = UserId(1);

#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RoundArgs {
    /// First day of the admissions round (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) round_start: Option<NaiveDate>,
    /// Seed for the supervisor lottery.
    #[arg(long, default_value_t = 7)]
    pub(crate) seed: u64,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    #[command(flatten)]
    pub(crate) round: RoundArgs,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) round: RoundArgs,
    /// Write the CSV here instead of stdout.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

type DemoService = AdmissionsService<InMemoryAdmissionsStore>;

/// A finished scripted round and the moments worth reporting from it.
pub(crate) struct ScriptedRound {
    pub(crate) service: DemoService,
    pub(crate) refusal: String,
    pub(crate) quota_refusal: String,
    pub(crate) draw: DrawOutcome,
}

struct Cast {
    lin: TeacherId,
    zhao: TeacherId,
    chen: StudentId,
    wu: StudentId,
    sun: StudentId,
}

fn statements(interest: &str) -> ApplicationStatements {
    ApplicationStatements {
        personal_statement: format!("I want to work on {interest}."),
        research_interest: interest.to_string(),
        apply_reason: "the lab's recent publications".to_string(),
    }
}

fn choice(
    student_id: StudentId,
    teacher_id: TeacherId,
    priority: u8,
    interest: &str,
) -> Result<ApplicationRequest, AppError> {
    let priority = Priority::try_from(priority).map_err(AdmissionsError::from)?;
    Ok(ApplicationRequest {
        student_id,
        teacher_id,
        priority,
        statements: statements(interest),
    })
}

fn enroll_supervisor(
    service: &DemoService,
    user: u64,
    name: &str,
    metrics: QualificationMetrics,
    decision: ReviewDecision,
) -> Result<TeacherId, AppError> {
    let teacher = service.register_teacher(TeacherRegistration {
        user_id: UserId(user),
        name: name.to_string(),
        title: Some("Professor".to_string()),
    })?;
    let qualification = service.submit_qualification(teacher.id, metrics)?;
    service.review_qualification(qualification.id, REGISTRAR, decision, None)?;
    Ok(teacher.id)
}

fn enroll_student(
    service: &DemoService,
    user: u64,
    name: &str,
    initial_score: f64,
    retest_score: f64,
    status: EligibilityStatus,
) -> Result<StudentId, AppError> {
    let student = service.register_student(StudentRegistration {
        user_id: UserId(user),
        name: name.to_string(),
        initial_score,
        retest_score,
        phone: None,
        email: Some(format!("{}@grad.example.edu", name.to_lowercase())),
    })?;
    service.review_student(student.id, status, REGISTRAR)?;
    Ok(student.id)
}

fn cast(service: &DemoService) -> Result<Cast, AppError> {
    let lin = enroll_supervisor(
        service,
        20,
        "Dr. Lin",
        QualificationMetrics {
            sci_papers: 2,
            ei_papers: 1,
            core_papers: 3,
            national_projects: 1,
            research_funds: 10.0,
            students_count: 2,
            ..QualificationMetrics::default()
        },
        ReviewDecision::Approved,
    )?;
    let zhao = enroll_supervisor(
        service,
        21,
        "Dr. Zhao",
        QualificationMetrics {
            sci_papers: 3,
            ..QualificationMetrics::default()
        },
        ReviewDecision::Approved,
    )?;
    enroll_supervisor(
        service,
        22,
        "Dr. Abe",
        QualificationMetrics {
            core_papers: 2,
            ..QualificationMetrics::default()
        },
        ReviewDecision::Rejected,
    )?;

    let chen = enroll_student(service, 10, "Chen", 372.0, 86.0, EligibilityStatus::Approved)?;
    let wu = enroll_student(service, 11, "Wu", 358.0, 81.5, EligibilityStatus::Approved)?;
    let sun = enroll_student(service, 12, "Sun", 349.0, 79.0, EligibilityStatus::Approved)?;
    enroll_student(service, 13, "Li", 341.0, 77.0, EligibilityStatus::Approved)?;
    enroll_student(service, 14, "Zhou", 330.0, 70.0, EligibilityStatus::Pending)?;

    Ok(Cast {
        lin,
        zhao,
        chen,
        wu,
        sun,
    })
}

fn accept(service: &DemoService, id: ApplicationId, teacher: TeacherId) -> Result<(), AppError> {
    service.accept_application(id, teacher)?;
    Ok(())
}

/// Replays one admissions round against an in-memory store pinned to `round_start`.
pub(crate) fn scripted_round(round_start: NaiveDate, seed: u64) -> Result<ScriptedRound, AppError> {
    let clock = Arc::new(FixedClock::new(opening_of(round_start)));
    let service = AdmissionsService::with_clock(
        Arc::new(InMemoryAdmissionsStore::new()),
        GradeStandards::default(),
        clock.clone(),
    );

    let opened = clock.now();
    service.open_phase(
        PhasePlan {
            kind: PhaseKind::StudentApplication,
            starts_at: opened,
            ends_at: opened + Duration::days(14),
            notes: "autumn round".to_string(),
        },
        REGISTRAR,
    )?;
    let cast = cast(&service)?;

    let chen = service.submit_application(choice(cast.chen, cast.lin, 1, "compilers")?)?;
    let wu = service.submit_application(choice(cast.wu, cast.zhao, 1, "storage engines")?)?;
    let sun_first =
        service.submit_application(choice(cast.sun, cast.zhao, 1, "network protocols")?)?;
    let refusal = match service.submit_application(choice(cast.sun, cast.lin, 2, "compilers")?) {
        Ok(_) => String::new(),
        Err(err) => err.to_string(),
    };

    clock.advance(Duration::days(1));
    accept(&service, chen.id, cast.lin)?;
    accept(&service, wu.id, cast.zhao)?;
    service.reject_application(sun_first.id, cast.zhao, None)?;
    let sun_second = service.submit_application(choice(cast.sun, cast.lin, 2, "compilers")?)?;
    accept(&service, sun_second.id, cast.lin)?;

    let quota_refusal = match service.update_quota(
        cast.lin,
        QuotaUpdate {
            max_students: 1,
            comment: Some("budget cut".to_string()),
        },
        REGISTRAR,
    ) {
        Ok(_) => String::new(),
        Err(err) => err.to_string(),
    };

    clock.advance(Duration::days(1));
    service.approve_admission(chen.id, REGISTRAR, AdmissionDecision::Approved, None)?;
    service.approve_admission(
        wu.id,
        REGISTRAR,
        AdmissionDecision::Rejected,
        Some("transcript missing".to_string()),
    )?;

    let draw = service.draw_lot(cast.zhao, &mut StdRng::seed_from_u64(seed))?;

    Ok(ScriptedRound {
        service,
        refusal,
        quota_refusal,
        draw,
    })
}

fn round_start(args: &RoundArgs) -> NaiveDate {
    args.round_start.unwrap_or_else(|| Local::now().date_naive())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let start = round_start(&args.round);
    let round = scripted_round(start, args.round.seed)?;
    let service = &round.service;

    println!("Graduate admissions round starting {start}");
    if let Some(phase) = service.current_phase()? {
        println!(
            "Phase in progress: {} ({} to {})",
            phase.kind.label(),
            phase.starts_at.date_naive(),
            phase.ends_at.date_naive()
        );
    }

    println!("\nSupervisors");
    for load in service.supervisor_roster()? {
        let level = load
            .review_level
            .map_or("not graded", |level| level.label());
        println!(
            "- {:<10} {:<12} admitted {}/{} pending {} remaining {}",
            load.name,
            level,
            load.admitted,
            load.max_students,
            load.pending,
            load.remaining
        );
    }

    println!("\nRefusals along the way");
    println!("- second choice while the first is pending: {}", round.refusal);
    println!("- lowering a quota below admitted students: {}", round.quota_refusal);

    let stats = service.application_statistics()?;
    println!(
        "\nApplications: {} total, {} pending, {} approved, {} rejected",
        stats.total, stats.pending, stats.approved, stats.rejected
    );

    let overview = service.pending_admissions()?;
    println!(
        "Admissions: {} supervisor-approved, {} awaiting sign-off, {} admitted, {} declined",
        overview.summary.total,
        overview.summary.awaiting_approval,
        overview.summary.approved,
        overview.summary.rejected
    );

    println!(
        "\nLottery for {}: drew {} (total score {:.1})",
        round.draw.draw.teacher_id, round.draw.candidate.name, round.draw.candidate.total_score
    );

    let logged = service.operation_logs(&LogFilter::default())?.len();
    println!("Operation log entries recorded: {logged}");
    Ok(())
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let round = scripted_round(round_start(&args.round), args.round.seed)?;
    let rows = match args.output {
        Some(path) => {
            let rows = round.service.export_roster(BufWriter::new(File::create(&path)?))?;
            eprintln!("wrote {rows} roster rows to {}", path.display());
            rows
        }
        None => round.service.export_roster(io::stdout().lock())?,
    };
    tracing::debug!(rows, "admissions roster exported");
    Ok(())
}
