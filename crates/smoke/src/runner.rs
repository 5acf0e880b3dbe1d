//! Runs the smoke checks phase by phase and aggregates a [`SmokeReport`].

use std::future::Future;
use std::time::Instant;

use crate::checks;
use crate::context::{Role, TestRunContext};
use crate::report::{CheckResult, Phase, SmokeReport, TestResult};

/// Switches for a run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Leave out the CSV import phase.
    pub skip_import: bool,
}

/// Run every phase with default options.
pub async fn run(ctx: &mut TestRunContext) -> SmokeReport {
    run_with(ctx, RunOptions::default()).await
}

/// Run the phases in order. Cleanup always runs once the backend answered
/// the health check, whatever failed in between.
pub async fn run_with(ctx: &mut TestRunContext, options: RunOptions) -> SmokeReport {
    let mut report = SmokeReport::default();

    tracing::info!(
        api_url = %ctx.anonymous().base_url(),
        run_id = %ctx.run_id(),
        "Starting smoke run",
    );

    report.push(timed(Phase::Health, "health endpoint", checks::health(ctx)).await);
    if !report.is_success() {
        tracing::error!("Backend is not healthy, stopping");
        return report;
    }

    // ---- auth ----
    report.push(timed(Phase::Auth, "admin login", checks::login(ctx, Role::Admin)).await);
    report.push(
        timed(Phase::Auth, "therapist login", checks::login(ctx, Role::Therapist)).await,
    );
    report.push(timed(Phase::Auth, "client login", checks::login(ctx, Role::Client)).await);
    report.push(
        timed(Phase::Auth, "wrong password rejected", checks::rejects_wrong_password(ctx)).await,
    );
    report.push(
        timed(Phase::Auth, "anonymous access rejected", checks::rejects_anonymous_access(ctx)).await,
    );

    // ---- clients ----
    report.push(timed(Phase::Clients, "create client", checks::create_client(ctx)).await);
    report.push(timed(Phase::Clients, "get client", checks::get_client(ctx)).await);
    report.push(timed(Phase::Clients, "update client", checks::update_client(ctx)).await);
    report.push(timed(Phase::Clients, "list clients", checks::list_clients(ctx)).await);

    // ---- listings ----
    report.push(
        timed(Phase::Therapists, "list therapists", checks::list_therapists(ctx)).await,
    );
    report.push(
        timed(Phase::Appointments, "list appointments", checks::list_appointments(ctx)).await,
    );

    // ---- import ----
    if !options.skip_import {
        report.push(timed(Phase::Import, "csv import", checks::csv_import(ctx)).await);
    }

    // ---- cleanup ----
    for resource in ctx.take_created() {
        let name = format!("delete {}", resource.kind);
        let check = checks::delete_resource(ctx, &resource);
        report.push(timed(Phase::Cleanup, &name, check).await);
    }
    report.push(
        timed(Phase::Cleanup, "deleted client is gone", checks::deleted_client_is_gone(ctx)).await,
    );

    tracing::info!(
        passed = report.passed(),
        failed = report.failed(),
        skipped = report.skipped(),
        "Smoke run finished",
    );
    report
}

async fn timed<F>(phase: Phase, name: &str, check: F) -> TestResult
where
    F: Future<Output = CheckResult>,
{
    let started = Instant::now();
    let result = check.await;
    TestResult::from_check(phase, name, started.elapsed(), result)
}
