//! §7 error translation: map a normalized [`PetError`] to the HTTP status
//! and user-facing message the gateway should answer with. Kept here,
//! rather than in the gateway, because "the orchestrator translates error
//! kinds into friendly messages" is explicitly this crate's job.

use deskpet_core::error::PetError;
use deskpet_profile::ProfileError;
use deskpet_sessions::SessionError;

/// Map a profile-store error onto the shared [`PetError`] taxonomy. Can't be
/// a `From` impl (orphan rule: both types live outside this crate), so every
/// call site maps explicitly instead.
pub(crate) fn profile_err(e: ProfileError) -> PetError {
    match e {
        ProfileError::NotFound(id) => PetError::NotFound(id),
        ProfileError::Kv(inner) => inner,
    }
}

/// Same as [`profile_err`] for the session store.
pub(crate) fn session_err(e: SessionError) -> PetError {
    match e {
        SessionError::NotFound(id) => PetError::NotFound(id),
        SessionError::Kv(inner) => inner,
    }
}

/// `(status_code, friendly_message)` for one failed chat turn. Every kind
/// maps to 500 — this service has no case where a provider/validation
/// failure should read as a client-side 4xx, since validation failures are
/// the only 4xx-shaped input and even those read as a normal chat reply
/// failure to the caller.
pub fn translate_error(err: &PetError) -> (u16, &'static str) {
    let status = match err {
        PetError::Validation(_) => 400,
        PetError::NotFound(_) => 404,
        _ => 500,
    };
    (status, err.friendly_message())
}
