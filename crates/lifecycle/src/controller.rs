//! Incident lifecycle controller.
//!
//! Owns the Open → Assigned → Resolved state machine. Every mutating
//! operation checks, in order: the actor's capabilities, the input, the
//! referenced records, the current status, and finally the actor's assignment.
//! The mutation is then saved against the version that was read, so a
//! concurrent writer turns into a `Conflict` instead of a lost update.

use entities::{Actor, Incident, IncidentStatus, IncidentUpdate, Role};
use incident_store::{IncidentFilter, Store};
use notifier::{NotificationDispatcher, NotificationKind};
use uuid::Uuid;

use crate::{LifecycleError, LifecycleResult};

/// Applies lifecycle transitions to incidents held in a [`Store`].
#[derive(Debug)]
pub struct IncidentController<S> {
    store: S,
    dispatcher: NotificationDispatcher,
}

impl<S: Store> IncidentController<S> {
    /// Creates a controller over `store` that notifies through `dispatcher`.
    pub fn new(store: S, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the notification dispatcher.
    pub fn dispatcher(&self) -> &NotificationDispatcher {
        &self.dispatcher
    }

    /// Files a new incident on behalf of `actor`.
    pub async fn create_incident(
        &self,
        actor: &Actor,
        title: &str,
        description: &str,
    ) -> LifecycleResult<Incident> {
        if !actor.capabilities().can_report {
            return Err(LifecycleError::authorization(format!(
                "role {} cannot file incidents",
                actor.role
            )));
        }

        let title = required("title", title)?;
        let description = required("description", description)?;

        let incident = Incident::new(actor.id, title, description);
        let incident = self.store.save_incident(incident, 0).await?;
        debug_assert!(incident.check_invariants().is_ok());

        tracing::info!(
            incident_id = %incident.id,
            reporter_id = %actor.id,
            "Incident created"
        );

        self.dispatcher
            .dispatch(&actor.email, NotificationKind::Created, &incident);

        Ok(incident)
    }

    /// Assigns an incident to a technician.
    pub async fn assign_incident(
        &self,
        actor: &Actor,
        incident_id: Uuid,
        technician_id: Uuid,
    ) -> LifecycleResult<Incident> {
        if !actor.capabilities().can_assign {
            return Err(LifecycleError::authorization(format!(
                "role {} cannot assign incidents",
                actor.role
            )));
        }

        let mut incident = self.load(incident_id).await?;

        let technician = self
            .store
            .get_user(technician_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("User", technician_id))?;
        if technician.role != Role::Technician {
            return Err(LifecycleError::RoleMismatch {
                user_id: technician_id.to_string(),
                expected: Role::Technician,
                actual: technician.role,
            });
        }

        if incident.status.is_terminal() {
            return Err(LifecycleError::State {
                operation: "assign",
                status: incident.status,
            });
        }

        let expected_version = incident.version;
        let previous = incident.technician_id;
        incident.technician_id = Some(technician.id);
        incident.status = IncidentStatus::Assigned;
        incident.touch();

        let incident = self.store.save_incident(incident, expected_version).await?;
        debug_assert!(incident.check_invariants().is_ok());

        tracing::info!(
            incident_id = %incident.id,
            technician_id = %technician.id,
            previous_technician_id = ?previous,
            actor_id = %actor.id,
            "Incident assigned"
        );

        self.notify_reporter(&incident, NotificationKind::Assigned)
            .await;
        self.dispatcher
            .dispatch(&technician.email, NotificationKind::Assigned, &incident);

        Ok(incident)
    }

    /// Changes the free-text fields of an assigned incident. Sends no
    /// notification.
    pub async fn update_incident(
        &self,
        actor: &Actor,
        incident_id: Uuid,
        update: IncidentUpdate,
    ) -> LifecycleResult<Incident> {
        ensure_can_work(actor, "update")?;
        let update = validate_update(update)?;

        let mut incident = self.load(incident_id).await?;
        ensure_assigned(&incident, "update")?;
        ensure_assignee(actor, &incident)?;

        let expected_version = incident.version;
        update.apply_to(&mut incident);
        incident.touch();

        let incident = self.store.save_incident(incident, expected_version).await?;
        debug_assert!(incident.check_invariants().is_ok());

        tracing::info!(
            incident_id = %incident.id,
            actor_id = %actor.id,
            "Incident updated"
        );

        Ok(incident)
    }

    /// Resolves an assigned incident with the given notes.
    pub async fn resolve_incident(
        &self,
        actor: &Actor,
        incident_id: Uuid,
        notes: &str,
    ) -> LifecycleResult<Incident> {
        ensure_can_work(actor, "resolve")?;
        let notes = required("resolution notes", notes)?;

        let mut incident = self.load(incident_id).await?;
        ensure_assigned(&incident, "resolve")?;
        ensure_assignee(actor, &incident)?;

        let expected_version = incident.version;
        incident.resolution_notes = Some(notes);
        incident.status = IncidentStatus::Resolved;
        incident.touch();
        incident.resolved_at = Some(incident.updated_at);

        let incident = self.store.save_incident(incident, expected_version).await?;
        debug_assert!(incident.check_invariants().is_ok());

        tracing::info!(
            incident_id = %incident.id,
            actor_id = %actor.id,
            "Incident resolved"
        );

        self.notify_reporter(&incident, NotificationKind::Resolved)
            .await;

        Ok(incident)
    }

    /// Gets an incident the actor is allowed to see.
    pub async fn get_incident(&self, actor: &Actor, incident_id: Uuid) -> LifecycleResult<Incident> {
        let incident = self.load(incident_id).await?;
        if !is_visible(actor, &incident) {
            return Err(LifecycleError::authorization(
                "incident is not visible to this user",
            ));
        }
        Ok(incident)
    }

    /// Lists incidents visible to the actor. Non-admin callers are restricted
    /// to their own incidents regardless of the filter they pass.
    pub async fn list_incidents(
        &self,
        actor: &Actor,
        filter: IncidentFilter,
    ) -> LifecycleResult<(Vec<Incident>, u32)> {
        let filter = scope_filter(actor, filter);
        Ok(self.store.list_incidents(filter).await?)
    }

    async fn load(&self, incident_id: Uuid) -> LifecycleResult<Incident> {
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| LifecycleError::not_found("Incident", incident_id))
    }

    async fn notify_reporter(&self, incident: &Incident, kind: NotificationKind) {
        match self.store.get_user(incident.reporter_id).await {
            Ok(Some(reporter)) => self.dispatcher.dispatch(reporter.email, kind, incident),
            Ok(None) => {
                tracing::warn!(
                    incident_id = %incident.id,
                    reporter_id = %incident.reporter_id,
                    kind = %kind,
                    "Reporter not found, skipping notification"
                );
            }
            Err(e) => {
                tracing::warn!(
                    incident_id = %incident.id,
                    kind = %kind,
                    error = %e,
                    "Failed to look up reporter, skipping notification"
                );
            }
        }
    }
}

/// Trims `value` and rejects it if nothing is left.
fn required(field: &str, value: &str) -> LifecycleResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LifecycleError::validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn validate_update(update: IncidentUpdate) -> LifecycleResult<IncidentUpdate> {
    if update.is_empty() {
        return Err(LifecycleError::validation("update contains no fields"));
    }

    Ok(IncidentUpdate {
        title: update.title.as_deref().map(|v| required("title", v)).transpose()?,
        description: update
            .description
            .as_deref()
            .map(|v| required("description", v))
            .transpose()?,
        resolution_notes: update
            .resolution_notes
            .as_deref()
            .map(|v| required("resolution notes", v))
            .transpose()?,
    })
}

fn ensure_can_work(actor: &Actor, operation: &str) -> LifecycleResult<()> {
    if actor.capabilities().can_resolve {
        Ok(())
    } else {
        Err(LifecycleError::authorization(format!(
            "role {} cannot {operation} incidents",
            actor.role
        )))
    }
}

fn ensure_assigned(incident: &Incident, operation: &'static str) -> LifecycleResult<()> {
    if incident.status == IncidentStatus::Assigned {
        Ok(())
    } else {
        Err(LifecycleError::State {
            operation,
            status: incident.status,
        })
    }
}

fn ensure_assignee(actor: &Actor, incident: &Incident) -> LifecycleResult<()> {
    if actor.capabilities().is_unrestricted() || incident.is_assigned_to(actor.id) {
        Ok(())
    } else {
        Err(LifecycleError::authorization(
            "incident is assigned to another technician",
        ))
    }
}

fn is_visible(actor: &Actor, incident: &Incident) -> bool {
    actor.capabilities().is_unrestricted()
        || incident.reporter_id == actor.id
        || incident.is_assigned_to(actor.id)
}

fn scope_filter(actor: &Actor, mut filter: IncidentFilter) -> IncidentFilter {
    let capabilities = actor.capabilities();
    if capabilities.is_unrestricted() {
        return filter;
    }
    if capabilities.can_resolve {
        filter.technician_id = Some(actor.id);
    } else {
        filter.reporter_id = Some(actor.id);
    }
    filter
}
