//! Individual smoke checks.
//!
//! Each check takes the run context, talks to the backend and returns a
//! [`CheckResult`]. A check that needs something an earlier phase did not
//! provide (a token, a created client) reports itself as skipped.

use std::sync::Arc;

use epd_client::ApiClient;
use epd_core::fields::ImportType;
use epd_import::{ImportConfig, ImportSession, SelectedFile};
use serde_json::{json, Value};

use crate::context::{CreatedResource, Role, TestRunContext};
use crate::report::{Check, CheckResult};
use crate::{ensure, SmokeError};

/// Rows in the generated import file.
const IMPORT_ROWS: u64 = 2;

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health(ctx: &mut TestRunContext) -> CheckResult {
    let status = ctx.anonymous().get_status("/api/health").await?;
    ensure(status == 200, || format!("expected status 200, got {status}"))?;
    Ok(Check::Passed("backend is up".to_string()))
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

/// Log in as `role` and keep the token for later phases.
pub async fn login(ctx: &mut TestRunContext, role: Role) -> CheckResult {
    let credentials = match role {
        Role::Admin => Some(ctx.config.admin.clone()),
        Role::Therapist => ctx.config.therapist.clone(),
        Role::Client => ctx.config.client_user.clone(),
    };
    let Some(credentials) = credentials else {
        return Ok(Check::Skipped(format!("no {role} credentials configured")));
    };

    let session = ctx
        .anonymous()
        .login(&credentials.email, &credentials.password)
        .await?;
    ensure(!session.token.trim().is_empty(), || {
        "login returned an empty token".to_string()
    })?;
    ensure(session.user.role.eq_ignore_ascii_case(role.as_str()), || {
        format!("logged in with role '{}', expected '{role}'", session.user.role)
    })?;

    ctx.set_token(role, session.token);
    Ok(Check::Passed(format!("logged in as {}", credentials.email)))
}

pub async fn rejects_wrong_password(ctx: &mut TestRunContext) -> CheckResult {
    let email = ctx.config.admin.email.clone();
    match ctx
        .anonymous()
        .login(&email, "not-the-password-smoke-test")
        .await
    {
        Ok(_) => Err(SmokeError::Assertion(
            "login with a wrong password succeeded".to_string(),
        )),
        Err(e) => match e.status() {
            Some(status @ (400 | 401 | 403)) => {
                Ok(Check::Passed(format!("rejected with status {status}")))
            }
            _ => Err(e.into()),
        },
    }
}

pub async fn rejects_anonymous_access(ctx: &mut TestRunContext) -> CheckResult {
    let status = ctx.anonymous().get_status("/api/clients").await?;
    ensure(status == 401 || status == 403, || {
        format!("anonymous client list answered {status}, expected 401 or 403")
    })?;
    Ok(Check::Passed(format!("answered {status}")))
}

// ---------------------------------------------------------------------------
// Clients
// ---------------------------------------------------------------------------

pub async fn create_client(ctx: &mut TestRunContext) -> CheckResult {
    let Some(api) = ctx.as_role(Role::Admin) else {
        return Ok(no_admin());
    };

    let body = json!({
        "firstName": "Smoke",
        "lastName": format!("Test {}", ctx.run_id()),
        "email": ctx.unique_email("client"),
        "phone": "0612345678",
        "dateOfBirth": "1990-01-01",
    });
    let created: Value = api.post_json("/api/clients", &body).await?;
    let id = id_of(&created)?;

    ctx.track("client", format!("/api/clients/{id}"));
    ctx.client_id = Some(id.clone());
    Ok(Check::Passed(format!("created client {id}")))
}

pub async fn get_client(ctx: &mut TestRunContext) -> CheckResult {
    let (api, id) = match admin_and_client(ctx) {
        Ok(pair) => pair,
        Err(skip) => return Ok(skip),
    };

    let client: Value = api.get_json(&format!("/api/clients/{id}")).await?;
    let expected = ctx.unique_email("client");
    ensure(client["email"] == expected.as_str(), || {
        format!("expected email {expected}, got {}", client["email"])
    })?;
    Ok(Check::Passed(format!("fetched client {id}")))
}

pub async fn update_client(ctx: &mut TestRunContext) -> CheckResult {
    let (api, id) = match admin_and_client(ctx) {
        Ok(pair) => pair,
        Err(skip) => return Ok(skip),
    };

    let phone = "0687654321";
    let updated: Value = api
        .put_json(&format!("/api/clients/{id}"), &json!({ "phone": phone }))
        .await?;
    ensure(updated["phone"] == phone, || {
        format!("phone not updated, got {}", updated["phone"])
    })?;
    Ok(Check::Passed(format!("updated client {id}")))
}

pub async fn list_clients(ctx: &mut TestRunContext) -> CheckResult {
    let Some(api) = ctx.as_role(Role::Admin) else {
        return Ok(no_admin());
    };

    let listing: Value = api.get_json("/api/clients").await?;
    let items = items_of(&listing)?;
    if let Some(id) = &ctx.client_id {
        ensure(items.iter().any(|c| id_of(c).ok().as_ref() == Some(id)), || {
            format!("created client {id} missing from the list")
        })?;
    }
    Ok(Check::Passed(format!("{} client(s)", items.len())))
}

// ---------------------------------------------------------------------------
// Therapists and appointments
// ---------------------------------------------------------------------------

pub async fn list_therapists(ctx: &mut TestRunContext) -> CheckResult {
    let Some(api) = ctx.as_role(Role::Admin) else {
        return Ok(no_admin());
    };
    let listing: Value = api.get_json("/api/therapists").await?;
    Ok(Check::Passed(format!("{} therapist(s)", items_of(&listing)?.len())))
}

/// Lists appointments as a therapist when one logged in, else as admin.
pub async fn list_appointments(ctx: &mut TestRunContext) -> CheckResult {
    let (role, api) = match ctx.as_role(Role::Therapist) {
        Some(api) => (Role::Therapist, api),
        None => match ctx.as_role(Role::Admin) {
            Some(api) => (Role::Admin, api),
            None => return Ok(no_admin()),
        },
    };
    let listing: Value = api.get_json("/api/appointments").await?;
    Ok(Check::Passed(format!(
        "{} appointment(s) visible to {role}",
        items_of(&listing)?.len()
    )))
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

/// Upload a generated client CSV through an [`ImportSession`] and follow
/// it to a terminal state. Imported clients are tracked for cleanup.
pub async fn csv_import(ctx: &mut TestRunContext) -> CheckResult {
    let Some(api) = ctx.as_role(Role::Admin) else {
        return Ok(no_admin());
    };

    let emails = [ctx.unique_email("import-1"), ctx.unique_email("import-2")];
    let csv = format!(
        "Voornaam,Achternaam,E-mailadres,Telefoon\n\
         Smoke,Import Een,{},0611111111\n\
         Smoke,Import Twee,{},0622222222\n",
        emails[0], emails[1]
    );

    let config = ImportConfig {
        poll_interval: ctx.config.import_poll_interval,
        max_polls: Some(ctx.config.import_max_polls),
        ..Default::default()
    };
    let session = ImportSession::new(Arc::new(api.clone()), ImportType::Clients, config);
    session
        .select_file(SelectedFile::csv(format!("smoke-{}.csv", ctx.run_id()), csv))
        .await?;
    let outcome = session.start_import().await;

    // Rows the backend did import must be cleaned up whatever the outcome.
    let tracked = track_imported_clients(ctx, &api, &emails).await;
    let progress = outcome?;
    let tracked = tracked?;

    ensure(progress.total_rows == IMPORT_ROWS, || {
        format!("expected {IMPORT_ROWS} rows, server counted {}", progress.total_rows)
    })?;
    ensure(progress.failed_rows == 0, || {
        let first = progress
            .errors
            .first()
            .map(|e| format!(": row {} {}", e.row_number, e.message))
            .unwrap_or_default();
        format!("{} row(s) failed{first}", progress.failed_rows)
    })?;

    Ok(Check::Passed(format!(
        "import {} completed, {} row(s) imported, {tracked} tracked for cleanup",
        progress.import_id, progress.successful_rows
    )))
}

async fn track_imported_clients(
    ctx: &mut TestRunContext,
    api: &ApiClient,
    emails: &[String],
) -> Result<usize, SmokeError> {
    let listing: Value = api.get_json("/api/clients").await?;
    let mut tracked = 0;
    for client in items_of(&listing)? {
        let is_ours = client["email"]
            .as_str()
            .is_some_and(|email| emails.iter().any(|e| e == email));
        if is_ours {
            ctx.track("client", format!("/api/clients/{}", id_of(client)?));
            tracked += 1;
        }
    }
    Ok(tracked)
}

// ---------------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------------

pub async fn delete_resource(ctx: &mut TestRunContext, resource: &CreatedResource) -> CheckResult {
    let Some(api) = ctx.as_role(Role::Admin) else {
        return Ok(no_admin());
    };
    api.delete(&resource.path).await?;
    Ok(Check::Passed(format!("deleted {}", resource.path)))
}

pub async fn deleted_client_is_gone(ctx: &mut TestRunContext) -> CheckResult {
    let (api, id) = match admin_and_client(ctx) {
        Ok(pair) => pair,
        Err(skip) => return Ok(skip),
    };
    let status = api.get_status(&format!("/api/clients/{id}")).await?;
    ensure(status == 404, || {
        format!("deleted client {id} still answers {status}")
    })?;
    Ok(Check::Passed(format!("client {id} answers 404")))
}

// ---- private helpers ----

fn no_admin() -> Check {
    Check::Skipped("admin is not logged in".to_string())
}

fn admin_and_client(ctx: &TestRunContext) -> Result<(ApiClient, String), Check> {
    let api = ctx.as_role(Role::Admin).ok_or_else(no_admin)?;
    let id = ctx
        .client_id
        .clone()
        .ok_or_else(|| Check::Skipped("no client was created".to_string()))?;
    Ok((api, id))
}

/// Resource id as a string; the backend uses numeric or string ids.
fn id_of(resource: &Value) -> Result<String, SmokeError> {
    match &resource["id"] {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        other => Err(SmokeError::Assertion(format!(
            "resource has no usable id (got {other})"
        ))),
    }
}

/// A listing is either a bare array or an object with an `items` array.
fn items_of(listing: &Value) -> Result<&Vec<Value>, SmokeError> {
    listing
        .as_array()
        .or_else(|| listing["items"].as_array())
        .ok_or_else(|| SmokeError::Assertion("listing is not an array".to_string()))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn ids_may_be_numbers_or_strings() {
        assert_eq!(id_of(&json!({ "id": 17 })).unwrap(), "17");
        assert_eq!(id_of(&json!({ "id": "c-9" })).unwrap(), "c-9");
        assert_matches!(id_of(&json!({ "name": "x" })), Err(SmokeError::Assertion(_)));
        assert_matches!(id_of(&json!({ "id": "" })), Err(SmokeError::Assertion(_)));
    }

    #[test]
    fn listings_accept_array_or_items() {
        assert_eq!(items_of(&json!([1, 2])).unwrap().len(), 2);
        assert_eq!(items_of(&json!({ "items": [1], "total": 1 })).unwrap().len(), 1);
        assert!(items_of(&json!({ "total": 0 })).is_err());
    }
}
