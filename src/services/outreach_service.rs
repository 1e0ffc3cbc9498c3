use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::journalist_service::JournalistService;
use super::repository::Repository;
use super::DomainError;
use crate::database::{to_data, RecordStore, Stored};
use crate::validation::{strip_nulls, Field, RequestSchema, Schema};

pub const SEQUENCES: &str = "outreach_sequences";
pub const RUNS: &str = "outreach_runs";
pub const TRACKING_EVENTS: &str = "tracking_events";

const RUN_NOT_ACTIVE: &str = "RUN_NOT_ACTIVE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub delay_hours: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<SequenceStep>,
    #[serde(default = "default_true")]
    pub stop_on_reply: bool,
}

fn default_true() -> bool {
    true
}

fn step_schema() -> Schema {
    Schema::new(vec![
        Field::string("subject").min(1).max(300),
        Field::string("body").min(1),
        Field::integer("delay_hours").min(0).max(24 * 90).optional(),
    ])
}

fn sequence_schema() -> Schema {
    Schema::new(vec![
        Field::string("name").min(1).max(200),
        Field::string("description").max(2000).optional().nullable(),
        Field::array("steps", step_schema()).max(20).optional(),
        Field::boolean("stop_on_reply").optional(),
    ])
}

impl RequestSchema for Sequence {
    fn schema() -> Schema {
        sequence_schema()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct SequencePatch {
    pub fields: Map<String, Value>,
}

impl RequestSchema for SequencePatch {
    fn schema() -> Schema {
        sequence_schema().partial()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Active,
    Completed,
    Stopped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Active => "active",
            RunStatus::Completed => "completed",
            RunStatus::Stopped => "stopped",
        }
    }
}

/// One journalist moving through a sequence.
///
/// `current_step` is the index of the next step to send; the run completes
/// once it reaches `total_steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub sequence_id: Uuid,
    pub journalist_id: Uuid,
    pub status: RunStatus,
    pub current_step: u32,
    pub total_steps: u32,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartRunInput {
    pub journalist_id: Uuid,
}

impl RequestSchema for StartRunInput {
    fn schema() -> Schema {
        Schema::new(vec![Field::uuid("journalist_id")])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopRunInput {
    pub reason: Option<String>,
}

impl RequestSchema for StopRunInput {
    fn schema() -> Schema {
        Schema::new(vec![Field::string("reason").min(1).max(200).optional().nullable()])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunListQuery {
    pub sequence_id: Option<Uuid>,
    pub status: Option<RunStatus>,
}

impl RequestSchema for RunListQuery {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::uuid("sequence_id").optional(),
            Field::one_of("status", &["active", "completed", "stopped"]).optional(),
        ])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingEventType {
    Open,
    Click,
    Reply,
    Bounce,
}

/// Email provider callback. Unauthenticated; `orgId` and `runId` tie the
/// event to a run when the provider echoes them back.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub event_id: String,
    pub event_type: TrackingEventType,
    pub run_id: Option<Uuid>,
    pub org_id: Option<Uuid>,
}

impl RequestSchema for TrackingEvent {
    fn schema() -> Schema {
        Schema::new(vec![
            Field::string("eventId").min(1).max(200),
            Field::one_of("eventType", &["open", "click", "reply", "bounce"]),
            Field::uuid("runId").optional().nullable(),
            Field::uuid("orgId").optional().nullable(),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingOutcome {
    pub received: bool,
    pub duplicate: bool,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_status: Option<RunStatus>,
}

#[derive(Clone)]
pub struct OutreachService {
    store: Arc<dyn RecordStore>,
    sequences: Repository<Sequence>,
    runs: Repository<Run>,
    journalists: JournalistService,
}

impl OutreachService {
    pub fn new(store: Arc<dyn RecordStore>, journalists: JournalistService) -> Self {
        Self {
            sequences: Repository::new(Arc::clone(&store), SEQUENCES, "sequence"),
            runs: Repository::new(Arc::clone(&store), RUNS, "run"),
            store,
            journalists,
        }
    }

    // Sequences

    pub async fn list_sequences(&self, org_id: Uuid) -> Result<Vec<Stored<Sequence>>, DomainError> {
        self.sequences.select_all(org_id).await
    }

    pub async fn get_sequence(&self, org_id: Uuid, id: Uuid) -> Result<Stored<Sequence>, DomainError> {
        self.sequences.select_one(org_id, id).await
    }

    pub async fn create_sequence(&self, org_id: Uuid, sequence: Sequence) -> Result<Stored<Sequence>, DomainError> {
        let created = self.sequences.create(org_id, &sequence).await?;
        tracing::info!(org_id = %org_id, sequence_id = %created.id, steps = sequence.steps.len(), "sequence created");
        Ok(created)
    }

    pub async fn update_sequence(&self, org_id: Uuid, id: Uuid, patch: SequencePatch) -> Result<Stored<Sequence>, DomainError> {
        self.sequences.update(org_id, id, strip_nulls(patch.fields)).await
    }

    /// Deleting a sequence stops its active runs first
    pub async fn delete_sequence(&self, org_id: Uuid, id: Uuid) -> Result<(), DomainError> {
        self.sequences.select_one(org_id, id).await?;

        let runs = self.runs.select_where(org_id, "sequence_id", &json!(id)).await?;
        for run in runs.iter().filter(|r| r.attributes.status == RunStatus::Active) {
            match self.transition_stop(org_id, run, "sequence_deleted").await {
                Ok(_) | Err(DomainError::InvalidState { code: RUN_NOT_ACTIVE, .. }) => {}
                Err(e) => return Err(e),
            }
        }

        self.sequences.delete(org_id, id).await
    }

    // Runs

    pub async fn start_run(&self, org_id: Uuid, sequence_id: Uuid, input: StartRunInput) -> Result<Stored<Run>, DomainError> {
        let sequence = self.sequences.select_one(org_id, sequence_id).await?;
        if sequence.attributes.steps.is_empty() {
            return Err(DomainError::invalid_state("SEQUENCE_EMPTY", "Sequence has no steps"));
        }
        if !self.journalists.exists(org_id, input.journalist_id).await? {
            return Err(DomainError::not_found("journalist_profile"));
        }

        let run = Run {
            sequence_id,
            journalist_id: input.journalist_id,
            status: RunStatus::Active,
            current_step: 0,
            total_steps: sequence.attributes.steps.len() as u32,
            started_at: Utc::now(),
            completed_at: None,
            stopped_at: None,
            stopped_reason: None,
        };

        let created = self.runs.create(org_id, &run).await?;
        tracing::info!(org_id = %org_id, run_id = %created.id, sequence_id = %sequence_id, "outreach run started");
        Ok(created)
    }

    pub async fn list_runs(&self, org_id: Uuid, query: &RunListQuery) -> Result<Vec<Stored<Run>>, DomainError> {
        let runs = match query.sequence_id {
            Some(sequence_id) => self.runs.select_where(org_id, "sequence_id", &json!(sequence_id)).await?,
            None => self.runs.select_all(org_id).await?,
        };

        Ok(runs
            .into_iter()
            .filter(|r| query.status.map_or(true, |s| r.attributes.status == s))
            .collect())
    }

    pub async fn get_run(&self, org_id: Uuid, id: Uuid) -> Result<Stored<Run>, DomainError> {
        self.runs.select_one(org_id, id).await
    }

    /// Mark the current step as sent and move to the next one
    pub async fn advance_run(&self, org_id: Uuid, id: Uuid) -> Result<Stored<Run>, DomainError> {
        let run = self.runs.select_one(org_id, id).await?;
        ensure_active(&run)?;

        let next_step = run.attributes.current_step + 1;
        let mut patch = Map::new();
        patch.insert("current_step".into(), json!(next_step));
        if next_step >= run.attributes.total_steps {
            patch.insert("status".into(), json!(RunStatus::Completed));
            patch.insert("completed_at".into(), json!(Utc::now()));
        }

        let updated = self.update_active(org_id, &run, Some(run.attributes.current_step), patch).await?;
        tracing::debug!(run_id = %id, step = next_step, status = updated.attributes.status.as_str(), "outreach run advanced");
        Ok(updated)
    }

    pub async fn stop_run(&self, org_id: Uuid, id: Uuid, input: StopRunInput) -> Result<Stored<Run>, DomainError> {
        let run = self.runs.select_one(org_id, id).await?;
        ensure_active(&run)?;
        let reason = input.reason.unwrap_or_else(|| "manual".to_string());
        self.transition_stop(org_id, &run, &reason).await
    }

    async fn transition_stop(&self, org_id: Uuid, run: &Stored<Run>, reason: &str) -> Result<Stored<Run>, DomainError> {
        let mut patch = Map::new();
        patch.insert("status".into(), json!(RunStatus::Stopped));
        patch.insert("stopped_at".into(), json!(Utc::now()));
        patch.insert("stopped_reason".into(), json!(reason));

        let updated = self.update_active(org_id, run, None, patch).await?;
        tracing::info!(run_id = %run.id, reason, "outreach run stopped");
        Ok(updated)
    }

    /// Write `patch` only if the run is still active and, when `step` is
    /// given, still on that step. A run that left `active` in the meantime
    /// is `RUN_NOT_ACTIVE`; one advanced by someone else is `RUN_CONFLICT`.
    async fn update_active(
        &self,
        org_id: Uuid,
        run: &Stored<Run>,
        step: Option<u32>,
        patch: Map<String, Value>,
    ) -> Result<Stored<Run>, DomainError> {
        let mut expected = Map::new();
        expected.insert("status".into(), json!(RunStatus::Active));
        if let Some(step) = step {
            expected.insert("current_step".into(), json!(step));
        }

        if let Some(updated) = self.runs.update_if(org_id, run.id, &expected, patch).await? {
            return Ok(updated);
        }

        let current = self.runs.select_one(org_id, run.id).await?;
        ensure_active(&current)?;
        Err(DomainError::invalid_state("RUN_CONFLICT", "Run was updated concurrently, retry"))
    }

    // Tracking

    /// Record a provider event. Replies stop runs whose sequence asks for it;
    /// bounces always stop the run. A repeated `eventId` is acknowledged
    /// without being applied again.
    ///
    /// The event is stored only after its effect on the run has landed, so a
    /// failed attempt leaves nothing behind and the provider's retry applies it.
    pub async fn record_tracking_event(&self, event: TrackingEvent) -> Result<TrackingOutcome, DomainError> {
        let unmatched = TrackingOutcome {
            received: true,
            duplicate: false,
            matched: false,
            run_status: None,
        };

        let (Some(org_id), Some(run_id)) = (event.org_id, event.run_id) else {
            tracing::debug!(event_id = %event.event_id, "tracking event without run reference");
            return Ok(unmatched);
        };

        let seen = self
            .store
            .select_where(org_id, TRACKING_EVENTS, "event_id", &json!(event.event_id))
            .await?;
        if !seen.is_empty() {
            return Ok(TrackingOutcome {
                duplicate: true,
                ..unmatched
            });
        }

        let run = match self.runs.select_one(org_id, run_id).await {
            Ok(run) => run,
            Err(DomainError::NotFound { .. }) => {
                tracing::warn!(event_id = %event.event_id, run_id = %run_id, "tracking event for unknown run");
                return Ok(unmatched);
            }
            Err(e) => return Err(e),
        };

        let mut status = run.attributes.status;
        if status == RunStatus::Active {
            let stop_reason = match event.event_type {
                TrackingEventType::Bounce => Some("bounce"),
                TrackingEventType::Reply => {
                    let stop_on_reply = match self.sequences.select_one(org_id, run.attributes.sequence_id).await {
                        Ok(sequence) => sequence.attributes.stop_on_reply,
                        Err(DomainError::NotFound { .. }) => true,
                        Err(e) => return Err(e),
                    };
                    stop_on_reply.then_some("reply")
                }
                TrackingEventType::Open | TrackingEventType::Click => None,
            };

            if let Some(reason) = stop_reason {
                status = match self.transition_stop(org_id, &run, reason).await {
                    Ok(stopped) => stopped.attributes.status,
                    Err(DomainError::InvalidState { code: RUN_NOT_ACTIVE, .. }) => {
                        self.runs.select_one(org_id, run_id).await?.attributes.status
                    }
                    Err(e) => return Err(e),
                };
            }
        }

        let stored_event = json!({
            "event_id": event.event_id,
            "event_type": event.event_type,
            "run_id": run_id,
            "received_at": Utc::now(),
        });
        let inserted = self
            .store
            .insert_unique(org_id, TRACKING_EVENTS, "event_id", to_data(&stored_event)?)
            .await?;
        if inserted.is_none() {
            return Ok(TrackingOutcome {
                duplicate: true,
                ..unmatched
            });
        }

        Ok(TrackingOutcome {
            matched: true,
            run_status: Some(status),
            ..unmatched
        })
    }
}

fn ensure_active(run: &Stored<Run>) -> Result<(), DomainError> {
    if run.attributes.status == RunStatus::Active {
        Ok(())
    } else {
        Err(DomainError::invalid_state(
            RUN_NOT_ACTIVE,
            format!("Run is {}", run.attributes.status.as_str()),
        ))
    }
}
