//! services/portal/src/bin/portal.rs

use std::io::Write;
use std::sync::Arc;

use portal_lib::{
    adapters::HttpPortalAdapter,
    config::Config,
    error::PortalError,
    presenter::{AttendanceView, CourseCard, DashboardView},
    Page, PageLoad, Portal,
};
use student_portal_core::domain::Credentials;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), PortalError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    info!("Configuration loaded. Portal API at {}", config.base_url);

    // --- 2. Initialize the API Adapter & Controller ---
    let adapter = HttpPortalAdapter::new(config.base_url.clone(), config.request_timeout)?;
    let portal = Portal::new(Arc::new(adapter));

    // --- 3. Log In & Walk the Pages ---
    let (email, password) = config.credentials()?;
    let dashboard = portal.login(Credentials { email, password }).await?;
    if let Some(started) = portal.session_started_at().await {
        info!("Session started at {}", started.to_rfc3339());
    }

    let mut out = std::io::stdout().lock();
    print_dashboard(&mut out, &dashboard)?;

    match portal.navigate(Page::Courses).await {
        Ok(PageLoad::Courses(cards)) => print_courses(&mut out, &cards)?,
        Ok(_) => {}
        Err(e) => warn!("Could not load courses: {}", e),
    }
    match portal.navigate(Page::Attendance).await {
        Ok(PageLoad::Attendance(view)) => print_attendance(&mut out, &view)?,
        Ok(_) => {}
        Err(e) => warn!("Could not load attendance: {}", e),
    }

    // --- 4. Leave the Session ---
    portal.logout().await;
    Ok(())
}

fn print_dashboard(out: &mut impl Write, view: &DashboardView) -> std::io::Result<()> {
    writeln!(out, "Welcome, {} ({})", view.student_name, view.initials)?;
    match &view.finance {
        Some(f) => {
            writeln!(
                out,
                "Fees: total {:.2}, paid {:.2}, overdue {:.2}",
                f.total_amount, f.paid_amount, f.overdue_amount
            )?;
            if f.fee_pending {
                writeln!(out, "  Fees pending: course changes are locked")?;
            }
        }
        None => writeln!(out, "Fees: unavailable")?,
    }
    writeln!(out, "Enrolled courses:")?;
    for course in &view.enrolled {
        writeln!(out, "  {} {}", course.icon, course.name)?;
    }
    writeln!(out, "Instructors:")?;
    for instructor in &view.instructors {
        writeln!(out, "  [{}] {}", instructor.initials, instructor.name)?;
    }
    Ok(())
}

fn print_courses(out: &mut impl Write, cards: &[CourseCard]) -> std::io::Result<()> {
    writeln!(out, "All courses:")?;
    for card in cards {
        writeln!(
            out,
            "  {} {} ({}) - {} [{}] -> {}{}",
            card.icon,
            card.name,
            card.code,
            card.instructor,
            card.badge,
            card.button_label,
            if card.disabled { " (disabled)" } else { "" }
        )?;
    }
    Ok(())
}

fn print_attendance(out: &mut impl Write, view: &AttendanceView) -> std::io::Result<()> {
    writeln!(out, "Attendance:")?;
    for row in &view.rows {
        writeln!(
            out,
            "  {}: {}/{} ({:.1}%) {}",
            row.course_name, row.attended, row.total, row.percentage, row.label
        )?;
    }
    writeln!(
        out,
        "  Overall: {}/{} attended, {} absent ({:.1}%) {}",
        view.overall.total_attended,
        view.overall.total_classes,
        view.overall.total_absent,
        view.overall.percentage,
        view.overall_label
    )
}
