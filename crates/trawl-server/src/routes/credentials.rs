// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Credential management handlers.

use axum::{
	extract::{rejection::JsonRejection, Query, State},
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trawl_common_secret::SecretString;
use trawl_credentials::{Credential, CredentialId, NewCredential};

use crate::{api::AppState, error::ServerError};

/// A credential as shown to API clients. The key itself never leaves the
/// server; `apikey` serializes as `[REDACTED]`.
#[derive(Debug, Serialize)]
pub struct CredentialView {
	pub id: CredentialId,
	pub apikey: SecretString,
	pub apikey_hint: Option<String>,
	pub cx: String,
	pub quotas: u32,
	pub last_reset: DateTime<Utc>,
}

impl From<Credential> for CredentialView {
	fn from(credential: Credential) -> Self {
		Self {
			apikey_hint: credential.api_key.hint(),
			id: credential.id,
			apikey: credential.api_key,
			cx: credential.cx,
			quotas: credential.quota,
			last_reset: credential.last_reset,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
	#[serde(default)]
	pub cx: Option<String>,
	#[serde(default)]
	pub apikey: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteCredentialParams {
	#[serde(default)]
	pub id: Option<String>,
}

/// GET /apikeys
pub async fn list_credentials(State(state): State<AppState>) -> Json<Vec<CredentialView>> {
	let credentials = state.store.list().await;
	Json(credentials.into_iter().map(CredentialView::from).collect())
}

/// POST /apikey - register a credential with the full default quota.
pub async fn create_credential(
	State(state): State<AppState>,
	body: Result<Json<CreateCredentialRequest>, JsonRejection>,
) -> Result<Json<CredentialView>, ServerError> {
	let Json(body) = body.map_err(|e| ServerError::BadRequest(e.body_text()))?;

	let (Some(cx), Some(apikey)) = (non_blank(body.cx), non_blank(body.apikey)) else {
		tracing::warn!("create_credential: missing cx or apikey");
		return Err(ServerError::BadRequest("cx and apikey are required".into()));
	};

	let credential = state
		.store
		.create(NewCredential::new(&apikey, &cx))
		.await;
	tracing::info!(id = %credential.id, cx = %credential.cx, "credential created");
	Ok(Json(credential.into()))
}

/// DELETE /apikey?id=<id>
pub async fn delete_credential(
	State(state): State<AppState>,
	Query(params): Query<DeleteCredentialParams>,
) -> Result<Json<CredentialView>, ServerError> {
	let Some(id) = non_blank(params.id) else {
		return Err(ServerError::BadRequest("id is required".into()));
	};

	let id = CredentialId::new(id);
	let deleted = state
		.store
		.delete(&id)
		.await
		.ok_or_else(|| ServerError::NotFound(format!("credential {id}")))?;
	tracing::info!(id = %deleted.id, "credential deleted");
	Ok(Json(deleted.into()))
}

fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}
