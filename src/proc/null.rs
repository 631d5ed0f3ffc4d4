//! NULL (procedure 0): no arguments, no reply body. Used for liveness checks.

use async_trait::async_trait;

use crate::context::CallContext;

use super::{log_call, ProcedureObj};

pub struct Null;

#[async_trait]
impl ProcedureObj for Null {
    fn name(&self) -> &'static str {
        "NULL"
    }

    async fn call(&self, ctx: &CallContext, _args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        Some(Vec::new())
    }
}
