//! Per-file translation: lex, parse, lower, resolve imports, emit.

use crate::config::LevportConfig;
use levport_codegen::{JAVASCRIPT_WRITER, Writer};
use levport_lower::{Module, SymbolUsage, lower_chunk, resolve_imports};
use levport_syntax::{Diagnostics, Stage, parse_source};
use tracing::{debug, debug_span};

/// Result of translating one file.
#[derive(Debug, Clone)]
pub struct Translation {
    /// Generated module, `None` when a fatal diagnostic suppressed it.
    pub output: Option<String>,
    pub diagnostics: Diagnostics,
    /// Helpers the file references. Absent when parsing failed.
    pub usage: Option<SymbolUsage>,
}

impl Translation {
    pub fn is_ok(&self) -> bool {
        self.output.is_some()
    }
}

/// Translate one Lua source file. `source_name` is recorded in the header
/// comment of the generated module.
pub fn translate(source: &str, source_name: &str, config: &LevportConfig) -> Translation {
    let _span = debug_span!("translate", file = source_name).entered();
    let mut diagnostics = Diagnostics::new();

    let chunk = match parse_source(source) {
        Ok(chunk) => chunk,
        Err(diagnostic) => {
            debug!(%diagnostic, "syntax error");
            diagnostics.push(diagnostic);
            return Translation {
                output: None,
                diagnostics,
                usage: None,
            };
        }
    };
    debug!(statements = chunk.statements.len(), "parsed");

    let lowered = lower_chunk(&chunk, &mut diagnostics);
    if diagnostics.has_fatal() {
        debug!(
            errors = diagnostics.fatal_count(),
            "output suppressed"
        );
        return Translation {
            output: None,
            diagnostics,
            usage: Some(lowered.usage),
        };
    }

    let imports = resolve_imports(&lowered.usage, &config.imports);
    let entry = &config.output.entry;
    if imports.iter().flat_map(|i| &i.names).any(|name| name == entry) {
        // An import and the export would declare the same binding.
        diagnostics.fatal(
            Stage::Generate,
            1,
            format!("entry function `{entry}` collides with an imported helper"),
        );
        debug!("output suppressed");
        return Translation {
            output: None,
            diagnostics,
            usage: Some(lowered.usage),
        };
    }

    let module = Module {
        source_name: source_name.to_string(),
        imports,
        entry: entry.clone(),
        globals: lowered.globals,
        body: lowered.body,
    };
    let output = JAVASCRIPT_WRITER.write(&module);
    debug!(
        bytes = output.len(),
        warnings = diagnostics.warning_count(),
        "emitted"
    );

    Translation {
        output: Some(output),
        diagnostics,
        usage: Some(lowered.usage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use levport_lower::Helper;

    fn run(source: &str) -> Translation {
        translate(source, "test.lua", &LevportConfig::default())
    }

    #[test]
    fn test_translates_simple_level() {
        let translation = run("des.room({ type = \"ordinary\", filled = 1 })\n");
        let output = translation.output.unwrap();
        assert!(output.starts_with("// Generated by levport from test.lua."));
        assert!(output.contains("import { des, finalize_level } from \"../sp_lev.js\";"));
        assert!(output.contains("  des.room({ type: \"ordinary\", filled: 1 });\n"));
        assert!(output.ends_with("  return finalize_level();\n}\n"));
    }

    #[test]
    fn test_fatal_suppresses_output() {
        let translation = run("for i = 1, rnd(3) do add(i) end");
        assert!(!translation.is_ok());
        assert!(translation.diagnostics.has_fatal());
        assert!(
            translation
                .diagnostics
                .iter()
                .any(|d| d.is_fatal() && d.stage == Stage::Lower)
        );
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let translation = run("local x = ");
        assert!(!translation.is_ok());
        assert!(translation.usage.is_none());
        let first = translation.diagnostics.iter().next().unwrap();
        assert_eq!(first.stage, Stage::Parse);
    }

    #[test]
    fn test_warnings_do_not_suppress_output() {
        let translation = run("local t = {}\nlocal i = 2\ndes.object(t[i])");
        assert!(translation.is_ok());
        assert_eq!(translation.diagnostics.warning_count(), 1);
    }

    #[test]
    fn test_custom_entry_and_imports() {
        let mut config = LevportConfig::default();
        config.output.entry = "build".into();
        config.imports.random = "./random.js".into();
        let translation = translate("des.map(percent(50) and \"a\" or \"b\")", "m.lua", &config);
        let output = translation.output.unwrap();
        assert!(output.contains("export function build() {"));
        assert!(output.contains("import { percent } from \"./levgen_helpers.js\";"));
        assert!(!output.contains("./random.js"));
        assert!(translation.usage.unwrap().is_used(Helper::Percent));
    }

    #[test]
    fn test_entry_colliding_with_import_is_fatal() {
        let mut config = LevportConfig::default();
        config.output.entry = "des".into();
        let translation = translate("des.room()", "m.lua", &config);
        assert!(!translation.is_ok());
        let error = translation.diagnostics.iter().find(|d| d.is_fatal()).unwrap();
        assert_eq!(error.stage, Stage::Generate);
        assert!(error.message.contains("`des`"));

        // Fine once the helper is not imported.
        let translation = translate("x = 1", "m.lua", &config);
        assert!(translation.output.unwrap().contains("export function des() {"));
    }

    #[test]
    fn test_globals_are_declared() {
        let output = run("place = 5\ndes.room(place)").output.unwrap();
        assert!(output.contains("export function generate() {\n  let place;\n  place = 5;\n"));
    }

    #[test]
    fn test_translation_is_deterministic() {
        let source = "local rooms = { \"a\", \"b\" }\n\
                      for _, r in ipairs(rooms) do des.room(r, math.random(1, 4)) end\n";
        let first = run(source).output.unwrap();
        let second = run(source).output.unwrap();
        assert_eq!(first, second);
    }
}
