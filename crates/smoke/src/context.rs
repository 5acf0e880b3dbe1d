//! State shared between the checks of one smoke run.
//!
//! Checks receive the context explicitly. Tokens obtained during the auth
//! phase and resources created along the way live here so later phases
//! can use them and cleanup can remove them.

use std::collections::BTreeMap;

use epd_client::{ApiClient, ApiError};

use crate::config::SmokeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Admin,
    Therapist,
    Client,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Therapist => "therapist",
            Self::Client => "client",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend resource the run created and must delete again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedResource {
    pub kind: &'static str,
    /// Path for `DELETE`, e.g. `/api/clients/17`.
    pub path: String,
}

pub struct TestRunContext {
    pub config: SmokeConfig,
    anonymous: ApiClient,
    tokens: BTreeMap<Role, String>,
    created: Vec<CreatedResource>,
    /// Id of the client created in the clients phase.
    pub client_id: Option<String>,
    run_id: String,
}

impl TestRunContext {
    pub fn new(config: SmokeConfig) -> Result<Self, ApiError> {
        let anonymous = ApiClient::from_config(&config.client)?;
        let run_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        tracing::debug!(run_id = %run_id, "Smoke run context created");
        Ok(Self {
            config,
            anonymous,
            tokens: BTreeMap::new(),
            created: Vec::new(),
            client_id: None,
            run_id,
        })
    }

    /// Client without credentials.
    pub fn anonymous(&self) -> &ApiClient {
        &self.anonymous
    }

    /// Client authenticated as `role`, if that role logged in.
    pub fn as_role(&self, role: Role) -> Option<ApiClient> {
        self.tokens
            .get(&role)
            .map(|token| self.anonymous.clone().with_token(token.clone()))
    }

    pub fn set_token(&mut self, role: Role, token: String) {
        self.tokens.insert(role, token);
    }

    pub fn track(&mut self, kind: &'static str, path: String) {
        tracing::debug!(kind, path = %path, "Tracking created resource");
        self.created.push(CreatedResource { kind, path });
    }

    /// Hand over every tracked resource, most recently created first.
    pub fn take_created(&mut self) -> Vec<CreatedResource> {
        let mut created = std::mem::take(&mut self.created);
        created.reverse();
        created
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Address unique to this run, so repeated runs never collide.
    pub fn unique_email(&self, label: &str) -> String {
        format!("smoke-{label}-{}@example.test", self.run_id)
    }
}
