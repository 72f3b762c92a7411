//! Dashboard state and action orchestration.
//!
//! A [`Dashboard`] owns everything the user sees: the connection state, the form fields, the last
//! fetched record list, per-action progress and user-facing notices. It is an explicit value held
//! by the caller (the CLI shell), never global state.
//!
//! Every action follows `idle -> pending -> succeeded | failed`. A failure is logged, reported as
//! a notice and leaves the action idle; data already on screen is not touched. Records are only
//! replaced, as a whole, when a fetch succeeds.

use crate::config::CoreConfig;
use crate::constants::MAX_NOTICES;
use crate::contract::HealthcareContract;
use crate::error::{DappError, DappResult};
use crate::record::{parse_patient_id, NewRecord, Record};
use crate::session::{self, Session};
use crate::wallet::WalletConnector;
use healthchain_types::Address;
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Outcome of the wallet initialisation task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Pending,
    Connected(Session),
    Failed(String),
}

/// Progress of one user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Pending,
    Succeeded,
}

impl ActionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ActionState::Pending)
    }
}

/// The three dashboard actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetch,
    Add,
    Authorize,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::Fetch => "fetch patient records",
            Action::Add => "add record",
            Action::Authorize => "authorize provider",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Editable form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    PatientId,
    PatientName,
    Diagnosis,
    Treatment,
    ProviderAddress,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::PatientId,
        FormField::PatientName,
        FormField::Diagnosis,
        FormField::Treatment,
        FormField::ProviderAddress,
    ];

    /// Short name used by the interactive shell's `set` command.
    pub fn key(&self) -> &'static str {
        match self {
            FormField::PatientId => "patient-id",
            FormField::PatientName => "name",
            FormField::Diagnosis => "diagnosis",
            FormField::Treatment => "treatment",
            FormField::ProviderAddress => "provider",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FormField::PatientId => "Patient ID",
            FormField::PatientName => "Patient Name",
            FormField::Diagnosis => "Diagnosis",
            FormField::Treatment => "Treatment",
            FormField::ProviderAddress => "Provider Address",
        }
    }
}

impl FromStr for FormField {
    type Err = DappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormField::ALL
            .into_iter()
            .find(|f| f.key() == s.trim())
            .ok_or_else(|| DappError::InvalidInput(format!("unknown field '{s}'")))
    }
}

/// Raw text the user has typed. Only user edits change it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    pub patient_id: String,
    pub patient_name: String,
    pub diagnosis: String,
    pub treatment: String,
    pub provider_address: String,
}

impl FormState {
    pub fn get(&self, field: FormField) -> &str {
        match field {
            FormField::PatientId => &self.patient_id,
            FormField::PatientName => &self.patient_name,
            FormField::Diagnosis => &self.diagnosis,
            FormField::Treatment => &self.treatment,
            FormField::ProviderAddress => &self.provider_address,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::PatientId => self.patient_id = value,
            FormField::PatientName => self.patient_name = value,
            FormField::Diagnosis => self.diagnosis = value,
            FormField::Treatment => self.treatment = value,
            FormField::ProviderAddress => self.provider_address = value,
        }
    }
}

/// The client's view and form state.
pub struct Dashboard {
    cfg: Arc<CoreConfig>,
    connector: WalletConnector,
    connection: ConnectionState,
    contract: Option<Arc<HealthcareContract>>,
    form: FormState,
    records: Vec<Record>,
    fetch_state: ActionState,
    add_state: ActionState,
    authorize_state: ActionState,
    notices: VecDeque<Notice>,
}

impl Dashboard {
    /// Creates a dashboard whose connection is still pending.
    pub fn new(cfg: Arc<CoreConfig>, connector: WalletConnector) -> Self {
        Self {
            cfg,
            connector,
            connection: ConnectionState::Pending,
            contract: None,
            form: FormState::default(),
            records: Vec::new(),
            fetch_state: ActionState::Idle,
            add_state: ActionState::Idle,
            authorize_state: ActionState::Idle,
            notices: VecDeque::new(),
        }
    }

    /// Creates a dashboard and runs the wallet initialisation task.
    ///
    /// Never fails: a refused or missing wallet leaves the dashboard usable, in
    /// [`ConnectionState::Failed`], with the reason reported as a notice.
    pub async fn initialise(cfg: Arc<CoreConfig>, connector: WalletConnector) -> Self {
        let mut dashboard = Self::new(cfg, connector);
        dashboard.connect().await;
        dashboard
    }

    /// Runs (or re-runs) the wallet initialisation task.
    ///
    /// Call again after the wallet switches accounts; the previous session is discarded first.
    pub async fn connect(&mut self) {
        self.connection = ConnectionState::Pending;
        self.contract = None;

        match session::connect(&self.cfg, &self.connector).await {
            Ok(connection) => {
                self.connection = ConnectionState::Connected(connection.session);
                self.contract = Some(connection.contract);
            }
            Err(e) => {
                tracing::error!("Error connecting to wallet: {:?}", e);
                self.notify(
                    NoticeLevel::Error,
                    format!("Error connecting to wallet: {e}"),
                );
                self.connection = ConnectionState::Failed(e.to_string());
            }
        }
    }

    pub fn connection(&self) -> &ConnectionState {
        &self.connection
    }

    pub fn session(&self) -> Option<Session> {
        match &self.connection {
            ConnectionState::Connected(session) => Some(*session),
            _ => None,
        }
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn set_field(&mut self, field: FormField, value: impl Into<String>) {
        self.form.set(field, value);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn action_state(&self, action: Action) -> ActionState {
        match action {
            Action::Fetch => self.fetch_state,
            Action::Add => self.add_state,
            Action::Authorize => self.authorize_state,
        }
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn last_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    /// Fetches records for the patient ID in the form and replaces the list on success.
    pub async fn fetch_patient_records(&mut self) -> DappResult<()> {
        let result = self.try_fetch().await;
        self.settle(Action::Fetch, result, |_| None, |e| {
            format!("Error fetching patient records: {e}")
        })
    }

    async fn try_fetch(&mut self) -> DappResult<()> {
        let contract = self.contract()?;
        let patient_id = parse_patient_id(&self.form.patient_id)?;

        self.fetch_state = ActionState::Pending;
        tracing::info!("fetching records for patient {}", patient_id);
        let records = contract.get_patient_records(patient_id).await?;
        tracing::debug!(?records, "fetched patient records");
        self.records = records;
        Ok(())
    }

    /// Submits `addRecord` from the form fields, then re-fetches that patient's records.
    pub async fn add_record(&mut self) -> DappResult<()> {
        let result = self.try_add().await;
        self.settle(
            Action::Add,
            result,
            |_| Some("Record added successfully".to_string()),
            |e| format!("Error adding record: {e}"),
        )?;

        // The add itself succeeded even if the refresh does not; its failure is reported separately.
        let _ = self.fetch_patient_records().await;
        Ok(())
    }

    async fn try_add(&mut self) -> DappResult<()> {
        let contract = self.contract()?;
        let record = NewRecord::from_form(
            &self.form.patient_id,
            &self.form.patient_name,
            &self.form.diagnosis,
            &self.form.treatment,
        )?;

        self.add_state = ActionState::Pending;
        tracing::info!("adding record for patient {}", record.patient_id);
        contract.add_record(&record).await?;
        Ok(())
    }

    /// Submits `authorizeProvider` for the address in the form.
    ///
    /// Non-owners are stopped before submission as a courtesy; the contract enforces the rule
    /// regardless.
    pub async fn authorize_provider(&mut self) -> DappResult<()> {
        let result = self.try_authorize().await;
        self.settle(
            Action::Authorize,
            result,
            |provider| Some(format!("Provider {provider} authorized successfully")),
            |e| match e {
                DappError::NotOwner => "Only contract owner can call this function".to_string(),
                e if e.is_input_error() => format!("Error authorizing provider: {e}"),
                e => format!("Only contract owner can authorize different providers: {e}"),
            },
        )
        .map(|_| ())
    }

    async fn try_authorize(&mut self) -> DappResult<Address> {
        let contract = self.contract()?;
        let is_owner = self.session().map(|s| s.is_owner()).unwrap_or(false);
        if !is_owner {
            tracing::warn!("authorize provider skipped: connected account is not the owner");
            return Err(DappError::NotOwner);
        }
        let provider = Address::parse(&self.form.provider_address)?;

        self.authorize_state = ActionState::Pending;
        tracing::info!("authorizing provider {}", provider);
        contract.authorize_provider(provider).await?;
        Ok(provider)
    }

    fn contract(&self) -> DappResult<Arc<HealthcareContract>> {
        self.contract.clone().ok_or(DappError::NotConnected)
    }

    /// Moves `action` to its settled state and reports the outcome.
    fn settle<T>(
        &mut self,
        action: Action,
        result: DappResult<T>,
        on_success: impl FnOnce(&T) -> Option<String>,
        on_failure: impl FnOnce(&DappError) -> String,
    ) -> DappResult<T> {
        let state = match &result {
            Ok(value) => {
                tracing::info!("{} succeeded", action);
                if let Some(message) = on_success(value) {
                    self.notify(NoticeLevel::Success, message);
                }
                ActionState::Succeeded
            }
            Err(e) => {
                tracing::error!("{} failed: {:?}", action, e);
                let message = match e {
                    DappError::NotConnected => "Not connected to a wallet".to_string(),
                    e => on_failure(e),
                };
                self.notify(NoticeLevel::Error, message);
                ActionState::Idle
            }
        };

        match action {
            Action::Fetch => self.fetch_state = state,
            Action::Add => self.add_state = state,
            Action::Authorize => self.authorize_state = state,
        }
        result
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            level,
            message: message.into(),
        });
    }
}
