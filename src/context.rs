//! Per-call context (spec §4.5, §5, §9): everything a procedure handler
//! needs besides its own decoded arguments.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::AuthContext;
use crate::verifier::WriteVerifier;
use crate::vfs::Vfs;

/// Threaded into every `Procedure::handle` call. Cheap to clone: every field
/// is a shared reference or `Copy`.
#[derive(Clone)]
pub struct CallContext {
    pub xid: u32,
    pub auth: AuthContext,
    pub cancellation: CancellationToken,
    pub write_verifier: WriteVerifier,
    pub store: Arc<dyn Vfs>,
}

impl CallContext {
    pub fn new(
        xid: u32,
        auth: AuthContext,
        cancellation: CancellationToken,
        write_verifier: WriteVerifier,
        store: Arc<dyn Vfs>,
    ) -> Self {
        CallContext { xid, auth, cancellation, write_verifier, store }
    }

    /// True once the call has been cancelled (connection closed, server
    /// shutting down). Checked at the handler entry and again before any
    /// store call (§4.5's shared skeleton).
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
