//! Lua implementation of [`ScriptEngine`].
//!
//! Each evaluation builds a fresh interpreter with only the `string`,
//! `table` and `math` libraries opened, seeds the decision bindings, runs
//! the script under an instruction and memory budget and reads the bindings
//! back.
//!
//! `result` must convert to JSON without loss: a table is either a sequence
//! `1..n` or has only string keys. Mixed and sparse tables are rejected.
//!
//! Bindings visible to the script:
//!
//! | name         | direction | meaning                                          |
//! |--------------|-----------|--------------------------------------------------|
//! | `event`      | in        | triggering event data                            |
//! | `actionData` | in        | previous step output, `nil` for the entry script |
//! | `nextAction` | out       | step to run next; `""` or `nil` stops            |
//! | `result`     | out       | table handed to the next step as its input       |
//! | `err`        | out       | non-empty string aborts the pipeline             |

use mlua::{HookTriggers, Lua, LuaOptions, LuaSerdeExt, StdLib, Table, Value};
use tracing::{debug, warn};

use reflex_core::Payload;

use crate::engine::{Decision, ScriptEngine};
use crate::error::ScriptError;

/// Default instruction budget for one evaluation.
pub const DEFAULT_INSTRUCTION_LIMIT: u32 = 1_000_000;

/// Default memory budget for one evaluation, in bytes.
pub const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Deepest table nesting accepted in `result`.
const MAX_RESULT_DEPTH: usize = 64;

/// Script engine backed by an embedded Lua 5.4 interpreter.
#[derive(Debug, Clone)]
pub struct LuaScriptEngine {
    instruction_limit: u32,
    memory_limit: usize,
}

impl Default for LuaScriptEngine {
    fn default() -> Self {
        Self::new(DEFAULT_INSTRUCTION_LIMIT)
    }
}

impl LuaScriptEngine {
    pub fn new(instruction_limit: u32) -> Self {
        Self {
            instruction_limit: instruction_limit.max(1),
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }

    /// Cap the memory one evaluation may allocate.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = bytes;
        self
    }

    pub fn instruction_limit(&self) -> u32 {
        self.instruction_limit
    }

    pub fn memory_limit(&self) -> usize {
        self.memory_limit
    }

    fn new_interpreter(&self) -> Result<Lua, ScriptError> {
        let lua = Lua::new_with(
            StdLib::STRING | StdLib::TABLE | StdLib::MATH,
            LuaOptions::default(),
        )
        .map_err(|e| ScriptError::Runtime(format!("failed to create interpreter: {}", e)))?;

        lua.set_memory_limit(self.memory_limit)
            .map_err(|e| ScriptError::Runtime(format!("failed to set memory limit: {}", e)))?;

        let limit = self.instruction_limit;
        lua.set_hook(
            HookTriggers::new().every_nth_instruction(limit),
            move |_lua, _debug| {
                Err(mlua::Error::RuntimeError(format!(
                    "instruction limit exceeded ({limit})"
                )))
            },
        );
        Ok(lua)
    }
}

impl ScriptEngine for LuaScriptEngine {
    fn evaluate(
        &self,
        event: &Payload,
        prior: Option<&Payload>,
        source: &str,
    ) -> Result<Decision, ScriptError> {
        let lua = self.new_interpreter()?;
        let globals = lua.globals();

        seed_bindings(&lua, &globals, event, prior)
            .map_err(|e| ScriptError::Binding(e.to_string()))?;

        debug!(script_len = source.len(), has_prior = prior.is_some(), "Running script");

        if let Err(e) = lua.load(source).set_name("=reaction").exec() {
            warn!(error = %e, "Script execution failed");
            return Err(ScriptError::Runtime(e.to_string()));
        }

        let err = read_string_binding(&globals, "err")?;
        if !err.is_empty() {
            warn!(err = %err, "Script returned error");
            return Err(ScriptError::Declared(err));
        }

        let next = read_string_binding(&globals, "nextAction")?;
        if next.is_empty() {
            return Ok(Decision::Stop);
        }

        let result: Value = globals
            .get("result")
            .map_err(|e| ScriptError::Contract(format!("cannot read 'result': {}", e)))?;
        let input = match result {
            Value::Table(table) => match table_to_json(table, 0)? {
                serde_json::Value::Object(map) => map,
                _ => {
                    return Err(ScriptError::Contract(
                        "'result' is not an object".to_string(),
                    ))
                }
            },
            Value::Nil => {
                return Err(ScriptError::Contract(format!(
                    "nextAction '{}' set without a 'result' table",
                    next
                )))
            }
            other => {
                return Err(ScriptError::Contract(format!(
                    "'result' is a {}, expected a table",
                    other.type_name()
                )))
            }
        };

        Ok(Decision::Continue { next, input })
    }
}

fn seed_bindings(
    lua: &Lua,
    globals: &Table,
    event: &Payload,
    prior: Option<&Payload>,
) -> mlua::Result<()> {
    globals.set("event", lua.to_value(event)?)?;
    match prior {
        Some(data) => globals.set("actionData", lua.to_value(data)?)?,
        None => globals.set("actionData", Value::Nil)?,
    }
    globals.set("nextAction", "")?;
    globals.set("err", "")?;
    Ok(())
}

/// Convert a Lua table to JSON.
///
/// Keys `1..n` with no gaps give an array; string keys give an object; the
/// empty table gives an empty object. Anything else is a contract violation.
fn table_to_json(table: Table, depth: usize) -> Result<serde_json::Value, ScriptError> {
    if depth >= MAX_RESULT_DEPTH {
        return Err(ScriptError::Contract(format!(
            "'result' nests deeper than {} tables",
            MAX_RESULT_DEPTH
        )));
    }

    let mut indexed = Vec::new();
    let mut named = serde_json::Map::new();
    for pair in table.pairs::<Value, Value>() {
        let (key, value) =
            pair.map_err(|e| ScriptError::Contract(format!("cannot read 'result': {}", e)))?;
        match key {
            Value::Integer(i) => indexed.push((i, value_to_json(value, depth)?)),
            Value::String(s) => {
                let key = s
                    .to_str()
                    .map(|s| String::from(&*s))
                    .map_err(|e| ScriptError::Contract(format!("'result' key is not valid UTF-8: {}", e)))?;
                named.insert(key, value_to_json(value, depth)?);
            }
            other => {
                return Err(ScriptError::Contract(format!(
                    "'result' has a {} key",
                    other.type_name()
                )))
            }
        }
    }

    if indexed.is_empty() {
        return Ok(serde_json::Value::Object(named));
    }
    if !named.is_empty() {
        return Err(ScriptError::Contract(
            "'result' mixes sequence and named keys".to_string(),
        ));
    }

    indexed.sort_unstable_by_key(|(i, _)| *i);
    let is_sequence = indexed
        .iter()
        .enumerate()
        .all(|(pos, (i, _))| usize::try_from(*i).is_ok_and(|i| i == pos + 1));
    if !is_sequence {
        return Err(ScriptError::Contract(
            "'result' has a sparse sequence".to_string(),
        ));
    }
    Ok(serde_json::Value::Array(
        indexed.into_iter().map(|(_, v)| v).collect(),
    ))
}

fn value_to_json(value: Value, depth: usize) -> Result<serde_json::Value, ScriptError> {
    match value {
        Value::Boolean(b) => Ok(serde_json::Value::Bool(b)),
        Value::Integer(i) => Ok(serde_json::Value::from(i)),
        Value::Number(n) => serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .ok_or_else(|| ScriptError::Contract(format!("'result' holds non-finite number {}", n))),
        Value::String(s) => s
            .to_str()
            .map(|s| serde_json::Value::String(String::from(&*s)))
            .map_err(|e| ScriptError::Contract(format!("'result' string is not valid UTF-8: {}", e))),
        Value::Table(t) => table_to_json(t, depth + 1),
        // JSON null seeded from event data.
        v if v.is_null() => Ok(serde_json::Value::Null),
        other => Err(ScriptError::Contract(format!(
            "'result' holds a {}",
            other.type_name()
        ))),
    }
}

/// Read an output binding that must be a string. `nil` reads as empty.
fn read_string_binding(globals: &Table, name: &str) -> Result<String, ScriptError> {
    let value: Value = globals
        .get(name)
        .map_err(|e| ScriptError::Contract(format!("cannot read '{}': {}", name, e)))?;
    match value {
        Value::Nil => Ok(String::new()),
        Value::String(s) => {
            let s = s
                .to_str()
                .map_err(|e| ScriptError::Contract(format!("'{}' is not valid UTF-8: {}", name, e)))?;
            Ok(String::from(&*s))
        }
        other => Err(ScriptError::Contract(format!(
            "'{}' is a {}, expected a string",
            name,
            other.type_name()
        ))),
    }
}
