//! Control instructions: jump, deadline, invalidation bits

use primitive_types::U256;
use tracing::debug;

use crate::args::ArgReader;
use crate::error::{Result, VmError};
use crate::journal::{Effect, StorageKey};
use crate::vm::Context;

/// `target: u16`
pub(super) fn jump(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let target = ArgReader::new(args).u16("jump.target")?;
    ctx.jump(target as usize)
}

/// `deadline: u64` unix seconds, inclusive
pub(super) fn deadline(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let deadline = ArgReader::new(args).u64("deadline.timestamp")?;
    let now = ctx.host().timestamp();
    if now > deadline {
        return Err(VmError::DeadlineExpired { deadline, now });
    }
    Ok(())
}

/// `index: u32`; a maker bit can be spent once
pub(super) fn invalidate_bit(ctx: &mut Context<'_>, args: &[u8]) -> Result<()> {
    let index = ArgReader::new(args).u32("invalidate_bit.index")?;
    let key = StorageKey::Bit {
        maker: ctx.query().maker,
        index,
    };
    if ctx.load(&key).is_some_and(|v| !v.is_zero()) {
        return Err(VmError::OrderInvalidated { index });
    }
    debug!(index, "invalidate bit");
    ctx.record(Effect::Store {
        key,
        value: U256::one(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::asm::ProgramBuilder;
    use crate::error::VmError;
    use crate::host::MemoryLedger;
    use crate::instructions::testing::*;
    use crate::journal::StorageKey;
    use primitive_types::U256;

    #[test]
    fn test_deadline_inclusive() {
        let program = ProgramBuilder::new().deadline(100).build().unwrap();

        let ledger = MemoryLedger::new(100);
        assert!(crate::quote(&program, &query(true), U256::one(), &[], &ledger).is_ok());

        let ledger = MemoryLedger::new(101);
        let err = crate::quote(&program, &query(true), U256::one(), &[], &ledger).unwrap_err();
        assert_eq!(err, VmError::DeadlineExpired { deadline: 100, now: 101 });
    }

    #[test]
    fn test_short_deadline_field() {
        let program = ProgramBuilder::new().raw(0x02, &[0, 0, 1]).build().unwrap();
        let ledger = MemoryLedger::new(0);
        let err = crate::quote(&program, &query(true), U256::one(), &[], &ledger).unwrap_err();
        assert!(matches!(err, VmError::MissingArgument { field: "deadline.timestamp", .. }));
    }

    #[test]
    fn test_bit_spent_twice_in_one_run() {
        let program = ProgramBuilder::new()
            .invalidate_bit(4)
            .invalidate_bit(4)
            .build()
            .unwrap();
        let mut ledger = MemoryLedger::new(0);

        // quote mode never writes so both checks see a clear bit
        assert!(crate::quote(&program, &query(true), U256::one(), &[], &ledger).is_ok());

        let err = crate::swap(&program, &query(true), U256::one(), &[], &mut ledger).unwrap_err();
        assert_eq!(err, VmError::OrderInvalidated { index: 4 });
        assert_eq!(ledger.stored(&StorageKey::Bit { maker: MAKER, index: 4 }), None);
    }

    #[test]
    fn test_bits_are_per_maker() {
        let program = ProgramBuilder::new().invalidate_bit(0).build().unwrap();
        let mut ledger = MemoryLedger::new(0);
        ledger.store(StorageKey::Bit { maker: TAKER, index: 0 }, U256::one());
        assert!(crate::quote(&program, &query(true), U256::one(), &[], &ledger).is_ok());
    }
}
