//! `delegate: address, args: rest` - hand the slot to a foreign handler

use tracing::debug;

use crate::args::ArgReader;
use crate::error::{Result, VmError};
use crate::vm::Context;

pub(super) fn extruction(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let mut reader = ArgReader::new(args);
    let target = reader.address("extruction.delegate")?;
    let own_args = reader.rest();

    let delegate = ctx
        .host()
        .delegate(&target)
        .ok_or(VmError::UnknownDelegate(target))?;

    debug!(delegate = %hex::encode(target), next_pc = ctx.pc(), "extruction");
    let outcome = delegate.execute(ctx.delegate_call(own_args))?;
    // registers are taken from the outcome, never from before the call
    ctx.reconcile(outcome)
}
