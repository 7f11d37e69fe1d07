//! Store API request handlers.
//!
//! Each public function handles one operation against a single account's
//! entry tree. Path parameters are hex hashes: `{addr}` is the account
//! hash, `{key}` the entry key. Writes verify the client's signature over
//! the entry digest before touching the store.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use skiff_types::wire::UpdateRequest;
use skiff_types::{Entry, Hash, root_hash, signature};
use tracing::{debug, warn};

use crate::AppState;
use crate::error::ApiError;

fn parse_account(addr: &str) -> Result<Hash, ApiError> {
    addr.parse().map_err(|_| ApiError::AccountNotFound)
}

fn parse_key(key: &str) -> Result<Hash, ApiError> {
    key.parse().map_err(|_| ApiError::NotFound)
}

/// Read one entry. Backend failures on the read path collapse to
/// `NotFound` so the boundary never leaks backend state.
fn fetch_entry(state: &AppState, account: &Hash, key: &Hash) -> Result<Json<Entry>, ApiError> {
    state.store.open_db(account).map_err(|_| ApiError::NotFound)?;
    let entry = state
        .store
        .get_entry(account, key)
        .map_err(|_| ApiError::NotFound)?;
    Ok(Json(entry))
}

// -----------------------------------------------------------------------
// GET /account/{addr}/store — root entry
// -----------------------------------------------------------------------

/// Return the account's root entry, the collection summarizing the whole
/// tree. The backend guarantees it exists once the database is open.
pub(crate) async fn get_root(
    State(state): State<AppState>,
    Path(addr): Path<String>,
) -> Result<Json<Entry>, ApiError> {
    let account = parse_account(&addr)?;
    fetch_entry(&state, &account, &root_hash(&account))
}

// -----------------------------------------------------------------------
// GET /account/{addr}/store/{key}
// -----------------------------------------------------------------------

/// Return one entry by key hash.
pub(crate) async fn get_entry(
    State(state): State<AppState>,
    Path((addr, key)): Path<(String, String)>,
) -> Result<Json<Entry>, ApiError> {
    let account = parse_account(&addr)?;
    let key = parse_key(&key)?;
    fetch_entry(&state, &account, &key)
}

// -----------------------------------------------------------------------
// POST /account/{addr}/store/{key}
// -----------------------------------------------------------------------

/// Create or update an entry.
///
/// The body carries `{parent, value, signature, public_key}`. The digest
/// is rebuilt server-side from the key in the URL, the claimed parent, and
/// the payload; the signature must verify against the supplied public key
/// (already bound to the account by the outer authentication layer).
pub(crate) async fn update_entry(
    State(state): State<AppState>,
    Path((addr, key)): Path<(String, String)>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let account = parse_account(&addr)?;
    let key = parse_key(&key)?;

    let request: UpdateRequest =
        serde_json::from_slice(&body).map_err(|err| ApiError::MalformedBody(err.to_string()))?;

    let digest = signature::entry_digest(&key, request.parent.as_ref(), &request.value);
    let verified = request
        .public_key_bytes()
        .is_some_and(|public_key| signature::verify(&public_key, &digest, &request.signature));
    if !verified {
        warn!(account = %account, key = %key, "rejected entry with invalid signature");
        return Err(ApiError::SignatureInvalid);
    }

    let parent = request.parent;
    let entry = Entry::new(key, parent, request.value, request.signature);
    state
        .store
        .set_entry(&account, &key, parent.as_ref(), entry)?;

    debug!(account = %account, key = %key, "entry updated");
    Ok(StatusCode::OK)
}

// -----------------------------------------------------------------------
// DELETE /account/{addr}/store/{key}
// -----------------------------------------------------------------------

/// Remove a leaf entry. Collections must be emptied first; recursive
/// deletion is refused in this iteration.
pub(crate) async fn delete_entry(
    State(state): State<AppState>,
    Path((addr, key)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let account = parse_account(&addr)?;
    let key = parse_key(&key)?;

    state.store.remove_entry(&account, &key, false)?;

    debug!(account = %account, key = %key, "entry deleted");
    Ok(StatusCode::NO_CONTENT)
}
