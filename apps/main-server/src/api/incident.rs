//! Incident API endpoints.

use axum::{Json, extract::State};
use entities::IncidentUpdate;
use incident_store::{IncidentFilter, Store};
use rpc_protocol::{
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
    requests::{
        AssignIncidentRequest, CreateIncidentRequest, GetIncidentRequest, ListIncidentsRequest,
        ResolveIncidentRequest, UpdateIncidentRequest, parse_id,
    },
    responses::{IncidentResponse, ListIncidentsResponse},
};

use crate::error::ServerResult;
use crate::middleware::CurrentUser;
use crate::state::SharedState;

/// Files a new incident.
pub async fn create_incident<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<CreateIncidentRequest>,
) -> ServerResult<Json<IncidentResponse>> {
    let incident = state
        .controller
        .create_incident(&user.actor(), &request.title, &request.description)
        .await?;

    Ok(Json(IncidentResponse { incident }))
}

/// Assigns an incident to a technician.
pub async fn assign_incident<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<AssignIncidentRequest>,
) -> ServerResult<Json<IncidentResponse>> {
    let incident_id = parse_id("incident_id", &request.incident_id)?;
    let technician_id = parse_id("technician_id", &request.technician_id)?;

    let incident = state
        .controller
        .assign_incident(&user.actor(), incident_id, technician_id)
        .await?;

    Ok(Json(IncidentResponse { incident }))
}

/// Edits the text fields of an assigned incident.
pub async fn update_incident<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<UpdateIncidentRequest>,
) -> ServerResult<Json<IncidentResponse>> {
    let incident_id = parse_id("incident_id", &request.incident_id)?;
    let update = IncidentUpdate {
        title: request.title,
        description: request.description,
        resolution_notes: request.resolution_notes,
    };

    let incident = state
        .controller
        .update_incident(&user.actor(), incident_id, update)
        .await?;

    Ok(Json(IncidentResponse { incident }))
}

/// Resolves an assigned incident.
pub async fn resolve_incident<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<ResolveIncidentRequest>,
) -> ServerResult<Json<IncidentResponse>> {
    let incident_id = parse_id("incident_id", &request.incident_id)?;

    let incident = state
        .controller
        .resolve_incident(&user.actor(), incident_id, &request.resolution_notes)
        .await?;

    Ok(Json(IncidentResponse { incident }))
}

/// Gets a single incident.
pub async fn get_incident<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<GetIncidentRequest>,
) -> ServerResult<Json<IncidentResponse>> {
    let incident_id = parse_id("incident_id", &request.incident_id)?;
    let incident = state
        .controller
        .get_incident(&user.actor(), incident_id)
        .await?;

    Ok(Json(IncidentResponse { incident }))
}

/// Lists incidents visible to the caller.
pub async fn list_incidents<S: Store>(
    State(state): State<SharedState<S>>,
    user: CurrentUser,
    Json(request): Json<ListIncidentsRequest>,
) -> ServerResult<Json<ListIncidentsResponse>> {
    let filter = IncidentFilter {
        status: request.status,
        reporter_id: request
            .reporter_id
            .as_deref()
            .map(|id| parse_id("reporter_id", id))
            .transpose()?,
        technician_id: request
            .technician_id
            .as_deref()
            .map(|id| parse_id("technician_id", id))
            .transpose()?,
        limit: Some(request.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE)),
        offset: request.offset,
    };

    let (incidents, total_count) = state
        .controller
        .list_incidents(&user.actor(), filter)
        .await?;

    Ok(Json(ListIncidentsResponse {
        incidents,
        total_count,
    }))
}
