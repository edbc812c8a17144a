//! Built-in contract fixtures

use conform_harness::fixtures::FixtureRegistryBuilder;

/// Counter with `increment(uint256)`, `number()` and `reset()`, emitting
/// `Increment(address indexed sender, uint256 value)`
pub const INCREMENTER: &str = "incrementer";

/// Contract exercising `STOP`, `INVALID` and `REVERT`
///
/// Its constructor stores 7 in slot 0. `test()` returns 42, `test_stop()`
/// halts with no output, `test_invalid()` and `test_revert()` write slot 0
/// and then abort, and `value()` returns slot 0.
pub const OPCODES: &str = "opcodes";

const INCREMENTER_BYTECODE: &str = include_str!("../contracts/incrementer.hex");
const INCREMENTER_ABI: &str = include_str!("../contracts/incrementer.json");
const OPCODES_BYTECODE: &str = include_str!("../contracts/opcodes.hex");
const OPCODES_ABI: &str = include_str!("../contracts/opcodes.json");

/// Register every built-in contract
pub fn register(builder: FixtureRegistryBuilder) -> FixtureRegistryBuilder {
    builder
        .contract(INCREMENTER, INCREMENTER_BYTECODE, INCREMENTER_ABI)
        .contract(OPCODES, OPCODES_BYTECODE, OPCODES_ABI)
}
