//! Declarative translation tables for the Lua standard library.
//!
//! Calls are looked up by their dotted callee path (`math.floor`,
//! `table.insert`). Anything rooted in a Lua library table that is not
//! listed here has no translation and is rejected.

use crate::symbols::Helper;

/// How a library call is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallRewrite {
    /// Same arguments, different callee: `math.floor(x)` → `Math.floor(x)`.
    Rename(&'static str),
    /// First argument becomes the receiver: `string.upper(s)` → `s.toUpperCase()`.
    Method(&'static str),
    /// First argument becomes the receiver of a property read:
    /// `string.len(s)` → `s.length`.
    Property(&'static str),
    /// Call an imported helper with the same arguments.
    Helper(Helper),
    /// `table.insert(t, v)` → `t.push(v)`; `table.insert(t, i, v)` →
    /// `t.splice(i - 1, 0, v)`.
    TableInsert,
    /// `table.remove(t)` → `t.pop()`; `table.remove(t, i)` →
    /// `t.splice(i - 1, 1)[0]`.
    TableRemove,
    /// `table.concat(t, sep)` → `t.join(sep)`, `""` when omitted.
    TableConcat,
    /// `select("#", ...)` → `args.length`.
    SelectCount,
}

#[derive(Debug, Clone, Copy)]
pub struct LibraryCall {
    pub path: &'static str,
    pub rewrite: CallRewrite,
}

const fn entry(path: &'static str, rewrite: CallRewrite) -> LibraryCall {
    LibraryCall { path, rewrite }
}

pub const LIBRARY_CALLS: &[LibraryCall] = &[
    entry("math.floor", CallRewrite::Rename("Math.floor")),
    entry("math.ceil", CallRewrite::Rename("Math.ceil")),
    entry("math.abs", CallRewrite::Rename("Math.abs")),
    entry("math.max", CallRewrite::Rename("Math.max")),
    entry("math.min", CallRewrite::Rename("Math.min")),
    entry("math.sqrt", CallRewrite::Rename("Math.sqrt")),
    entry("math.sin", CallRewrite::Rename("Math.sin")),
    entry("math.cos", CallRewrite::Rename("Math.cos")),
    entry("math.exp", CallRewrite::Rename("Math.exp")),
    entry("math.log", CallRewrite::Rename("Math.log")),
    entry("tostring", CallRewrite::Rename("String")),
    entry("tonumber", CallRewrite::Rename("Number")),
    entry("print", CallRewrite::Rename("console.log")),
    entry("string.format", CallRewrite::Helper(Helper::Sprintf)),
    entry("string.upper", CallRewrite::Method("toUpperCase")),
    entry("string.lower", CallRewrite::Method("toLowerCase")),
    entry("string.rep", CallRewrite::Method("repeat")),
    entry("string.len", CallRewrite::Property("length")),
    entry("table.insert", CallRewrite::TableInsert),
    entry("table.remove", CallRewrite::TableRemove),
    entry("table.concat", CallRewrite::TableConcat),
    entry("select", CallRewrite::SelectCount),
];

/// Library values that are read rather than called.
pub const LIBRARY_CONSTANTS: &[(&str, &str)] = &[
    ("math.pi", "Math.PI"),
    ("math.huge", "Infinity"),
    ("math.maxinteger", "Number.MAX_SAFE_INTEGER"),
    ("math.mininteger", "Number.MIN_SAFE_INTEGER"),
];

/// String methods called with `s:method(...)`.
pub const STRING_METHODS: &[(&str, CallRewrite)] = &[
    ("upper", CallRewrite::Method("toUpperCase")),
    ("lower", CallRewrite::Method("toLowerCase")),
    ("rep", CallRewrite::Method("repeat")),
    ("len", CallRewrite::Property("length")),
    ("format", CallRewrite::Helper(Helper::Sprintf)),
];

/// Lua globals and library tables. A call rooted here that is not in
/// [`LIBRARY_CALLS`] has no translation.
pub const LUA_GLOBALS: &[&str] = &[
    "assert",
    "collectgarbage",
    "coroutine",
    "debug",
    "dofile",
    "error",
    "getmetatable",
    "io",
    "load",
    "loadstring",
    "math",
    "next",
    "os",
    "pcall",
    "print",
    "rawequal",
    "rawget",
    "rawlen",
    "rawset",
    "require",
    "select",
    "setmetatable",
    "string",
    "table",
    "tonumber",
    "tostring",
    "type",
    "unpack",
    "utf8",
    "xpcall",
];

pub fn lookup_call(path: &str) -> Option<CallRewrite> {
    LIBRARY_CALLS
        .iter()
        .find(|call| call.path == path)
        .map(|call| call.rewrite)
}

pub fn lookup_constant(path: &str) -> Option<&'static str> {
    LIBRARY_CONSTANTS
        .iter()
        .find(|(lua, _)| *lua == path)
        .map(|(_, js)| *js)
}

pub fn lookup_string_method(method: &str) -> Option<CallRewrite> {
    STRING_METHODS
        .iter()
        .find(|(name, _)| *name == method)
        .map(|(_, rewrite)| *rewrite)
}

pub fn is_lua_global(name: &str) -> bool {
    LUA_GLOBALS.contains(&name)
}

/// Whether a call with this result is statically known to produce a string.
pub fn returns_string(rewrite: CallRewrite) -> bool {
    matches!(
        rewrite,
        CallRewrite::Rename("String")
            | CallRewrite::Method(_)
            | CallRewrite::Helper(Helper::Sprintf)
            | CallRewrite::TableConcat
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_call_is_rooted_in_a_global() {
        for call in LIBRARY_CALLS {
            let root = call.path.split('.').next().unwrap();
            assert!(is_lua_global(root), "{} is not rooted in a global", call.path);
        }
    }

    #[test]
    fn test_paths_are_unique() {
        for (i, a) in LIBRARY_CALLS.iter().enumerate() {
            for b in &LIBRARY_CALLS[i + 1..] {
                assert_ne!(a.path, b.path);
            }
        }
    }

    #[test]
    fn test_lookups() {
        assert_eq!(
            lookup_call("math.floor"),
            Some(CallRewrite::Rename("Math.floor"))
        );
        assert_eq!(lookup_call("math.random"), None);
        assert_eq!(lookup_constant("math.huge"), Some("Infinity"));
        assert_eq!(
            lookup_string_method("rep"),
            Some(CallRewrite::Method("repeat"))
        );
    }
}
